use crate::app_error::AppErrorPayload;
use crate::models::{RoutineBlock, SessionSnapshot, SessionState, SessionSummary};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerTickPayload {
    pub remaining_seconds: u32,
    pub display_time: String,
    pub block_index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockChangedPayload {
    pub block: RoutineBlock,
    pub block_index: usize,
    pub remaining_seconds: u32,
    pub progress_percent: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangedPayload {
    pub state: SessionState,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SessionEvent {
    TimerTick(TimerTickPayload),
    BlockChanged(BlockChangedPayload),
    StateChanged(StateChangedPayload),
    RecordingSaveRequested,
    SessionCompleted(SessionSummary),
    AppError(AppErrorPayload),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::TimerTick(_) => "timer-tick",
            SessionEvent::BlockChanged(_) => "block-changed",
            SessionEvent::StateChanged(_) => "state-changed",
            SessionEvent::RecordingSaveRequested => "recording-save-requested",
            SessionEvent::SessionCompleted(_) => "session-completed",
            SessionEvent::AppError(_) => "app-error",
        }
    }
}

/// Fan-out of session events to whoever renders the session.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            tracing::trace!(event = name, "no subscribers for session event");
        }
    }

    pub fn emit_timer_tick(&self, remaining_seconds: u32, display_time: String, block_index: usize) {
        self.emit(SessionEvent::TimerTick(TimerTickPayload {
            remaining_seconds,
            display_time,
            block_index,
        }));
    }

    pub fn emit_block_changed(
        &self,
        block: RoutineBlock,
        block_index: usize,
        remaining_seconds: u32,
        progress_percent: f32,
    ) {
        self.emit(SessionEvent::BlockChanged(BlockChangedPayload {
            block,
            block_index,
            remaining_seconds,
            progress_percent,
        }));
    }

    pub fn emit_state_changed(&self, snapshot: SessionSnapshot) {
        self.emit(SessionEvent::StateChanged(StateChangedPayload {
            state: snapshot.state,
            snapshot,
        }));
    }

    pub fn emit_recording_save_requested(&self) {
        self.emit(SessionEvent::RecordingSaveRequested);
    }

    pub fn emit_session_completed(&self, summary: SessionSummary) {
        self.emit(SessionEvent::SessionCompleted(summary));
    }

    pub fn emit_app_error(&self, payload: AppErrorPayload) {
        self.emit(SessionEvent::AppError(payload));
    }
}
