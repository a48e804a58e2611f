pub mod app_error;
pub mod block_sequencer;
pub mod commands;
pub mod config;
pub mod data_manager;
pub mod events;
pub mod issues;
pub mod models;
pub mod navigation;
pub mod recorder;
pub mod recording_handoff;
pub mod repository;
pub mod session_actions;
pub mod session_engine;
pub mod time_format;
pub mod timer_driver;

pub use app_error::{AppError, AppErrorKind};
pub use commands::{spawn_session, SessionCommand};
pub use config::{EngineConfig, EngineConfigFile};
pub use events::SessionEvent;
pub use models::{SessionSnapshot, SessionState};
pub use session_actions::{SessionCollaborators, SessionController};
pub use session_engine::PracticeSession;
