use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use scribe_meetings::session::LifecycleState;
use scribe_meetings::{
    create_router, AppState, CaptureSource, Config, GeminiSummarizer, Session,
    SessionController, SessionStore,
};

#[derive(Parser)]
#[command(name = "scribe-meetings", about = "Meeting recorder with live transcription")]
struct Cli {
    /// Path to a config file (defaults to config/scribe-meetings.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a session until interrupted, then summarize and save
    Record {
        /// Capture source: mic or system
        #[arg(short, long, default_value = "mic")]
        source: CaptureSource,
    },
    /// List stored sessions
    List,
    /// Print one session in full
    Show { id: String },
    /// Delete a stored session
    Delete { id: String },
    /// Run the HTTP control server
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let store = Arc::new(SessionStore::new(config.store_path()));

    match cli.command {
        Command::Record { source } => record(config, store, source).await,
        Command::List => {
            list(&store);
            Ok(())
        }
        Command::Show { id } => show(&store, &id),
        Command::Delete { id } => {
            if store.delete(&id)? {
                println!("Deleted session {}", id);
            } else {
                println!("No session with id {}", id);
            }
            Ok(())
        }
        Command::Serve => serve(config, store).await,
    }
}

fn controller(config: Config, store: Arc<SessionStore>) -> Arc<SessionController> {
    let summarizer = Arc::new(GeminiSummarizer::new(
        config.summary.endpoint.clone(),
        config.summary.model.clone(),
    ));
    Arc::new(SessionController::new(config, store, summarizer))
}

async fn record(config: Config, store: Arc<SessionStore>, source: CaptureSource) -> Result<()> {
    let controller = controller(config, store);
    controller.start(source).await?;
    println!("Recording from {} (press Ctrl-C to stop)", source);

    let mut printed = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(300)) => {}
        }

        let snapshot = controller.snapshot();
        if let Some(message) = session_failure(&snapshot) {
            anyhow::bail!("session failed: {}", message);
        }
        if snapshot.state == LifecycleState::Idle {
            // The capture stream ended and the session already finalized
            println!();
            return Ok(());
        }

        // Print only transcript text that arrived since the last poll
        if snapshot.transcript.len() > printed {
            print!("{}", &snapshot.transcript[printed..]);
            use std::io::Write;
            std::io::stdout().flush().ok();
            printed = snapshot.transcript.len();
        }
    }

    println!("\nStopping...");

    // The session may have failed or finalized in the window between the
    // last poll and the interrupt; report that instead of a stop conflict.
    let snapshot = controller.snapshot();
    if let Some(message) = session_failure(&snapshot) {
        anyhow::bail!("session failed: {}", message);
    }
    if snapshot.state == LifecycleState::Idle {
        println!("Session already finalized");
        return Ok(());
    }

    match controller.stop().await? {
        Some(session) => {
            println!("Saved session '{}' ({})", session.title, session.id);
            if let Some(summary) = &session.summary {
                println!("\n{}", summary.summary);
            }
        }
        None => println!("No speech captured, nothing saved"),
    }
    Ok(())
}

/// The user-facing failure message when the session is in the error state.
fn session_failure(snapshot: &scribe_meetings::StatusSnapshot) -> Option<String> {
    if snapshot.state != LifecycleState::Error {
        return None;
    }
    Some(
        snapshot
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string()),
    )
}

fn list(store: &SessionStore) {
    let sessions = store.list();
    if sessions.is_empty() {
        println!("No sessions recorded yet");
        return;
    }
    for session in sessions {
        println!(
            "{}  {}  {:>5}s  {}",
            session.id,
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.duration_seconds,
            session.title
        );
    }
}

fn show(store: &SessionStore, id: &str) -> Result<()> {
    let session = store
        .get(id)
        .with_context(|| format!("no session with id {}", id))?;
    print_session(&session);
    Ok(())
}

fn print_session(session: &Session) {
    println!("{}", session.title);
    println!(
        "Recorded {} from {} ({} seconds)",
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.source,
        session.duration_seconds
    );
    if let Some(summary) = &session.summary {
        println!("\nSummary:\n{}", summary.summary);
        if !summary.key_points.is_empty() {
            println!("\nKey points:");
            for point in &summary.key_points {
                println!("  - {}", point);
            }
        }
        if !summary.action_items.is_empty() {
            println!("\nAction items:");
            for item in &summary.action_items {
                println!("  - {}", item);
            }
        }
    }
    println!("\nTranscript:\n{}", session.transcript);
}

async fn serve(config: Config, store: Arc<SessionStore>) -> Result<()> {
    let addr = format!("{}:{}", config.service.bind, config.service.port);
    let controller = controller(config, store.clone());
    let state = AppState::new(controller, store);
    let router = create_router(state);

    info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_meetings::StatusSnapshot;

    fn snapshot(state: LifecycleState, error: Option<&str>) -> StatusSnapshot {
        StatusSnapshot {
            state,
            source: CaptureSource::Mic,
            elapsed_secs: 0,
            transcript: String::new(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn failed_session_reports_its_own_message() {
        let snap = snapshot(LifecycleState::Error, Some("microphone unplugged"));
        assert_eq!(session_failure(&snap).as_deref(), Some("microphone unplugged"));
    }

    #[test]
    fn failed_session_without_a_message_still_reports() {
        let snap = snapshot(LifecycleState::Error, None);
        assert_eq!(session_failure(&snap).as_deref(), Some("unknown error"));
    }

    #[test]
    fn healthy_states_are_not_failures() {
        for state in [
            LifecycleState::Idle,
            LifecycleState::Initializing,
            LifecycleState::Recording,
            LifecycleState::Paused,
            LifecycleState::Processing,
        ] {
            assert!(session_failure(&snapshot(state, Some("stale"))).is_none());
        }
    }
}
