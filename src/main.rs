use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use practice_session::commands::{spawn_session, SessionCommand};
use practice_session::config::EngineConfigFile;
use practice_session::data_manager::DataManager;
use practice_session::events::SessionEvent;
use practice_session::issues::TracingIssueLogger;
use practice_session::models::PracticeUser;
use practice_session::navigation::TracingNavigator;
use practice_session::recorder::NullRecorder;
use practice_session::session_actions::{SessionCollaborators, SessionController};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = "practice-data";

#[derive(Parser, Debug)]
#[command(name = "practice-session")]
struct Args {
    /// Optional engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding routines.json and sessions.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Id of the practicing user
    #[arg(long, default_value = "local")]
    user: String,

    /// Routine to play; open practice when omitted
    #[arg(long)]
    routine: Option<String>,

    /// Record audio while practicing
    #[arg(long)]
    record: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,practice_session=info")),
        )
        .init();

    let file = match args.config.as_ref() {
        Some(path) => EngineConfigFile::load(path)?,
        None => EngineConfigFile::default(),
    };
    let config = file.resolve();
    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let store = Arc::new(
        DataManager::new(&data_dir)
            .with_context(|| format!("open practice data in {}", data_dir.display()))?,
    );
    tracing::info!(data_dir = %data_dir.display(), user = %args.user, "starting practice session");

    let collaborators = SessionCollaborators {
        routines: store.clone(),
        records: store,
        recorder: Arc::new(NullRecorder),
        issues: Arc::new(TracingIssueLogger),
        navigator: Arc::new(TracingNavigator),
    };
    let mut controller =
        SessionController::new(PracticeUser::new(args.user.clone()), config, collaborators);
    match args.routine.as_deref() {
        Some(routine_id) => controller.load_routine(routine_id).await?,
        None => controller.load_open_practice().await?,
    }

    let mut events = controller.subscribe();
    let (commands, handle) = spawn_session(controller);
    commands
        .send(SessionCommand::ChooseRecording {
            record: args.record,
        })
        .await
        .context("session task stopped before start")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted; leaving session");
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::TimerTick(tick)) => {
                    tracing::info!(block_index = tick.block_index, remaining = %tick.display_time, "tick");
                }
                Ok(SessionEvent::BlockChanged(changed)) => {
                    tracing::info!(
                        block_index = changed.block_index,
                        content = %changed.block.content,
                        progress = changed.progress_percent,
                        "next block"
                    );
                }
                Ok(SessionEvent::SessionCompleted(summary)) => {
                    tracing::info!(
                        seconds_practiced = summary.seconds_practiced,
                        blocks_completed = summary.blocks_completed,
                        "well done"
                    );
                    break;
                }
                Ok(SessionEvent::AppError(payload)) => {
                    tracing::error!(kind = ?payload.kind, message = %payload.message, "session error");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    // Exit is ignored if the task already finished.
    let _ = commands.send(SessionCommand::Exit).await;
    let snapshot = handle.await.context("session task panicked")?;
    tracing::info!(state = %snapshot.state, "session closed");
    Ok(())
}
