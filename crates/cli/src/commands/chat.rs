//! `mathtutor chat` — Interactive tutoring session.
//!
//! Plain lines are sent to the tutor; lines starting with `/` drive the
//! session (grade, mode, topic, attachments).

use std::io::Write;
use std::path::Path;

use mathtutor_attachments::Attachment;
use mathtutor_core::message::Role;
use mathtutor_core::{Grade, Mode};
use mathtutor_session::{SessionState, SkipReason, Tutor, TurnOutcome};
use tokio::io::{self, AsyncBufReadExt, BufReader};

const HELP: &str = "\
  Commands:
    /grade <6-9>        choose or change the grade
    /mode <chat|practice>
    /topics             list this grade's practice topics
    /topic <name|#>     start guided practice on a topic
    /attach <path>      attach an image, PDF or .docx to your next message
    /detach             drop the pending attachment
    /switch             switch between chat and practice (clears the conversation)
    /back               go back one step
    /reset              start over (statistics are kept)
    /stats              show topic statistics
    /key <API_KEY>      save your API key
    /help               show this help
    /quit               leave";

pub async fn run(grade: Option<Grade>, mode: Option<Mode>) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, tutor) = super::open_tutor().await?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║         MathTutor — Interactive Session      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("{HELP}");
    println!();

    if !tutor.has_credential() {
        println!("  ⚠️  No API key configured. Use /key <API_KEY> or `mathtutor key <API_KEY>`.");
        println!();
    }

    if let Some(grade) = grade {
        tutor.choose_grade(grade);
        if let Some(mode) = mode {
            tutor.choose_mode(mode)?;
        }
    }
    let mut shown = 0;
    announce_state(&tutor, &mut shown);

    let mut pending: Option<Attachment> = None;
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        prompt(&tutor, pending.as_ref())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));
            match handle_command(&tutor, name, arg, &mut pending, &mut shown).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => println!("  ⚠️  {e}"),
            }
            continue;
        }

        if !matches!(tutor.state(), SessionState::ActiveChat | SessionState::ActivePractice) {
            println!("  ⚠️  {}", next_step_hint(&tutor));
            continue;
        }

        eprint!("  ...");
        let result = tutor.send_user_turn(line, pending.take()).await;
        eprint!("\r     \r");
        match result {
            Ok(TurnOutcome::Skipped { reason, attachment }) => {
                pending = attachment;
                println!("  ⚠️  {}", skip_message(reason));
            }
            Ok(_) => {}
            Err(e) => println!("  ⚠️  {e}"),
        }
        print_new_messages(&tutor, &mut shown);
    }

    if let Some(attachment) = pending.take() {
        attachment.discard();
    }
    println!("  👋 Goodbye!");
    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

async fn handle_command(
    tutor: &Tutor,
    name: &str,
    arg: &str,
    pending: &mut Option<Attachment>,
    shown: &mut usize,
) -> Result<Flow, Box<dyn std::error::Error>> {
    match name {
        "quit" | "exit" | "q" => return Ok(Flow::Quit),
        "help" => println!("{HELP}"),
        "grade" => {
            let grade: Grade = arg.parse()?;
            tutor.choose_grade(grade);
            *shown = 0;
            announce_state(tutor, shown);
        }
        "mode" => {
            let mode: Mode = arg.parse()?;
            tutor.choose_mode(mode)?;
            announce_state(tutor, shown);
        }
        "topics" => print_topics(tutor),
        "topic" => {
            if tutor.state() != SessionState::ActiveSelectingTopic {
                return Err(next_step_hint(tutor).into());
            }
            let topic = resolve_topic(tutor, arg)?;
            *shown = 0;
            eprint!("  ...");
            let result = tutor.start_guided_topic(&topic).await;
            eprint!("\r     \r");
            print_new_messages(tutor, shown);
            if let TurnOutcome::Skipped { reason, .. } = result? {
                println!("  ⚠️  {}", skip_message(reason));
            }
        }
        "attach" => {
            if arg.is_empty() {
                return Err("usage: /attach <path>".into());
            }
            let attachment = tutor.attach_file(Path::new(arg)).await?;
            println!("  📎 Attached {} ({})", attachment.name(), attachment.mime_type());
            if let Some(previous) = pending.replace(attachment) {
                previous.discard();
            }
        }
        "detach" => match pending.take() {
            Some(attachment) => {
                println!("  Removed {}", attachment.name());
                attachment.discard();
            }
            None => println!("  No pending attachment."),
        },
        "switch" => {
            tutor.switch_mode()?;
            *shown = 0;
            announce_state(tutor, shown);
        }
        "back" => {
            tutor.back()?;
            *shown = 0;
            announce_state(tutor, shown);
        }
        "reset" => {
            tutor.reset();
            *shown = 0;
            if let Some(attachment) = pending.take() {
                attachment.discard();
            }
            announce_state(tutor, shown);
        }
        "stats" => print_stats(tutor),
        "key" => {
            tutor.save_credential(arg).await?;
            println!("  ✅ API key saved.");
        }
        other => return Err(format!("unknown command /{other}, try /help").into()),
    }
    Ok(Flow::Continue)
}

fn prompt(tutor: &Tutor, pending: Option<&Attachment>) -> std::io::Result<()> {
    let label = match (tutor.grade(), tutor.mode(), tutor.active_topic()) {
        (None, _, _) => "  mathtutor > ".to_string(),
        (Some(g), None, _) => format!("  grade {g} > "),
        (Some(g), Some(m), None) => format!("  grade {g} · {m} > "),
        (Some(g), Some(m), Some(t)) => format!("  grade {g} · {m} · {t} > "),
    };
    match pending {
        Some(a) => print!("[📎 {}] {label}", a.name()),
        None => print!("{label}"),
    }
    std::io::stdout().flush()
}

fn announce_state(tutor: &Tutor, shown: &mut usize) {
    print_new_messages(tutor, shown);
    match tutor.state() {
        SessionState::ActiveSelectingTopic => print_topics(tutor),
        SessionState::ActiveChat | SessionState::ActivePractice => {}
        _ => println!("  {}", next_step_hint(tutor)),
    }
}

fn next_step_hint(tutor: &Tutor) -> String {
    match tutor.state() {
        SessionState::NoGrade => "Choose your grade first: /grade 6, 7, 8 or 9".into(),
        SessionState::GradeChosen => "Choose a mode: /mode chat or /mode practice".into(),
        SessionState::ActiveSelectingTopic => "Pick a topic with /topic <name|#>".into(),
        SessionState::ActiveChat => "You are in open chat; use /switch for guided practice".into(),
        SessionState::ActivePractice => "A topic is already active; use /switch to pick another".into(),
    }
}

fn print_topics(tutor: &Tutor) {
    let Some(grade) = tutor.grade() else {
        println!("  Choose a grade first.");
        return;
    };
    let suggested = tutor.suggested_topics();
    println!("  Grade {grade} topics:");
    for (i, topic) in grade.topics().iter().enumerate() {
        let mark = if suggested.contains(topic) { "  ⭐ suggested" } else { "" };
        println!("    {}. {topic}{mark}", i + 1);
    }
}

fn resolve_topic(tutor: &Tutor, arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    let grade = tutor.grade().ok_or("Choose a grade first")?;
    if let Ok(n) = arg.parse::<usize>() {
        return grade
            .topics()
            .get(n.wrapping_sub(1))
            .map(|t| t.to_string())
            .ok_or_else(|| format!("no topic #{n} for grade {grade}").into());
    }
    Ok(arg.to_string())
}

fn print_stats(tutor: &Tutor) {
    let stats = tutor.stats();
    if stats.is_empty() {
        println!("  No practice recorded yet.");
        return;
    }
    for (topic, stat) in stats.iter() {
        println!(
            "  {topic}: practiced {} time(s), {} struggle(s)",
            stat.count, stat.struggles
        );
    }
}

fn print_new_messages(tutor: &Tutor, shown: &mut usize) {
    let messages = tutor.messages();
    for message in messages.iter().skip(*shown) {
        if message.role == Role::Assistant {
            println!();
            for line in message.content.lines() {
                println!("  Tutor > {line}");
            }
            println!();
        }
    }
    *shown = messages.len();
}

fn skip_message(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::EmptyInput => "Type a message or attach a file first.",
        SkipReason::InFlight => "Still waiting for the previous answer.",
        SkipReason::NoCredential => "No API key configured. Use /key <API_KEY>.",
    }
}
