//! `mathtutor stats` — Show per-topic practice statistics.

use mathtutor_core::Grade;
use mathtutor_session::{struggling_topics, STRUGGLE_THRESHOLD};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (_config, tutor) = super::open_tutor().await?;
    let stats = tutor.stats();

    if stats.is_empty() {
        println!("No practice recorded yet. Start with: mathtutor chat --mode practice --grade 6");
        return Ok(());
    }

    println!();
    println!("  {:<28} {:>9} {:>10}  {}", "Topic", "Practiced", "Struggles", "Last practiced");
    println!("  {}", "─".repeat(72));
    for (topic, stat) in stats.iter() {
        println!(
            "  {:<28} {:>9} {:>10}  {}",
            topic,
            stat.count,
            stat.struggles,
            stat.last_practiced_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
        );
    }

    let struggling = struggling_topics(&stats);
    if !struggling.is_empty() {
        println!();
        println!(
            "  Needs extra care (more than {STRUGGLE_THRESHOLD} struggles): {}",
            struggling.join(", ")
        );
    }

    println!();
    for grade in Grade::ALL {
        let suggested = grade.suggested_topics(&stats);
        if !suggested.is_empty() {
            println!("  Suggested for grade {grade}: {}", suggested.join(", "));
        }
    }
    println!();

    Ok(())
}
