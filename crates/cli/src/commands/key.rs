//! `mathtutor key` — Save the API key.

pub async fn run(key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (config, tutor) = super::open_tutor().await?;
    tutor.save_credential(key).await?;
    println!(
        "✅ API key saved to {}",
        config.resolved_store_path().display()
    );
    Ok(())
}
