use crate::app_error::AppError;
use crate::config::EngineConfig;
use crate::events::{SessionEvent, SessionEvents};
use crate::issues::{Issue, IssueKind, IssueLogger};
use crate::models::{
    LoadedRoutine, PlannedSession, PracticeUser, RecordingArtifact, RecordingSaveOutcome,
    SessionSnapshot, SessionState, OPEN_PRACTICE_ID,
};
use crate::navigation::{NavigationReason, Navigator};
use crate::recorder::AudioRecorder;
use crate::recording_handoff::RecordingHandoff;
use crate::repository::{RoutineRepository, SessionRecordStore};
use crate::session_engine::{AdvanceResult, PracticeSession, SessionError};
use crate::timer_driver::{TimerDriver, TimerTick};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

#[derive(Clone)]
pub struct SessionCollaborators {
    pub routines: Arc<dyn RoutineRepository>,
    pub records: Arc<dyn SessionRecordStore>,
    pub recorder: Arc<dyn AudioRecorder>,
    pub issues: Arc<dyn IssueLogger>,
    pub navigator: Arc<dyn Navigator>,
}

/// Owns one practice session together with its timer driver.
///
/// Every mutation goes through `&mut self`, so ticks and user actions are
/// serialized by whoever drives the controller (see
/// [`run_session`](crate::commands::run_session)). Whenever the engine is
/// `Running` exactly one tick source is active; in every other state none is.
pub struct SessionController {
    user: PracticeUser,
    config: EngineConfig,
    engine: PracticeSession,
    driver: TimerDriver,
    ticks: mpsc::UnboundedReceiver<TimerTick>,
    handoff: RecordingHandoff,
    collaborators: SessionCollaborators,
    events: SessionEvents,
}

impl SessionController {
    pub fn new(
        user: PracticeUser,
        config: EngineConfig,
        collaborators: SessionCollaborators,
    ) -> Self {
        let (driver, ticks) = TimerDriver::new(config.tick_interval);
        let handoff = RecordingHandoff::new(config.save_poll_attempts, config.save_poll_interval);
        let events = SessionEvents::new(config.event_capacity);
        Self {
            user,
            config,
            engine: PracticeSession::new(),
            driver,
            ticks,
            handoff,
            collaborators,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.engine.snapshot()
    }

    pub fn is_timer_active(&self) -> bool {
        self.driver.is_active()
    }

    pub async fn load_routine(&mut self, routine_id: &str) -> Result<(), AppError> {
        self.require_loading()?;
        let fetched = match self
            .collaborators
            .routines
            .fetch_routine(&self.user, routine_id)
            .await
        {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::error!(routine_id, error = %err, "failed to load routine");
                None
            }
        };
        let Some(loaded) = fetched else {
            return Err(self.abort_load(
                routine_id,
                IssueKind::NotFound,
                AppError::routine_not_found(routine_id),
            ));
        };
        if loaded.blocks.is_empty() {
            return Err(self.abort_load(
                routine_id,
                IssueKind::NoBlocks,
                AppError::routine_empty(routine_id),
            ));
        }
        let routine_id = Some(loaded.routine.id.clone());
        self.start_loaded(loaded, routine_id).await
    }

    pub async fn load_open_practice(&mut self) -> Result<(), AppError> {
        self.require_loading()?;
        let loaded = LoadedRoutine::open_practice(self.config.open_practice_minutes);
        self.start_loaded(loaded, None).await
    }

    pub async fn choose_recording(&mut self, record: bool) -> Result<(), AppError> {
        self.engine.choose_recording(record)?;
        if record {
            if let Err(err) = self.collaborators.recorder.begin_recording().await {
                tracing::warn!(error = %err, "recording could not start; continuing without it");
            }
        }
        tracing::info!(record, "practice session started");
        self.sync_driver();
        self.emit_state();
        self.emit_tick();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), AppError> {
        self.engine.pause()?;
        self.sync_driver();
        self.emit_state();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), AppError> {
        self.engine.resume()?;
        self.sync_driver();
        self.emit_state();
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<SessionState, AppError> {
        let state = self.engine.toggle_pause()?;
        self.sync_driver();
        self.emit_state();
        Ok(state)
    }

    pub fn toggle_focus_mode(&mut self) -> bool {
        let focus = self.engine.toggle_focus_mode();
        self.emit_state();
        focus
    }

    pub async fn next(&mut self) -> Result<AdvanceResult, AppError> {
        let recording_active = self.collaborators.recorder.is_recording();
        let result = self.engine.go_to_next(recording_active)?;
        self.handle_advance(result).await;
        Ok(result)
    }

    pub fn previous(&mut self) -> Result<AdvanceResult, AppError> {
        let result = self.engine.go_to_previous()?;
        self.on_block_changed(result);
        Ok(result)
    }

    pub fn jump_to(&mut self, index: usize) -> Result<AdvanceResult, AppError> {
        let result = self.engine.jump_to(index)?;
        self.on_block_changed(result);
        Ok(result)
    }

    /// Waits for the next tick from the live source and applies it. Ticks
    /// queued by a replaced source are skipped.
    pub async fn process_next_tick(&mut self) -> Option<AdvanceResult> {
        loop {
            let tick = self.ticks.recv().await?;
            if let Some(result) = self.handle_tick(tick).await {
                return Some(result);
            }
        }
    }

    pub(crate) async fn recv_tick(&mut self) -> Option<TimerTick> {
        self.ticks.recv().await
    }

    pub(crate) async fn handle_tick(&mut self, tick: TimerTick) -> Option<AdvanceResult> {
        if !self.driver.is_current(&tick) {
            tracing::debug!(generation = tick.generation, "dropping stale tick");
            return None;
        }
        let recording_active = self.collaborators.recorder.is_recording();
        let result = self.engine.tick(recording_active);
        self.emit_tick();
        self.handle_advance(result).await;
        Some(result)
    }

    pub async fn recording_saved(&mut self, outcome: RecordingSaveOutcome) -> Result<(), AppError> {
        self.engine.recording_saved(&outcome)?;
        tracing::info!(recording_id = ?outcome.recording_id(), "recording save finished");
        self.finish().await;
        Ok(())
    }

    /// Stops the recorder without a dialog and waits for its artifact.
    pub async fn save_recording_now(&mut self) -> Result<RecordingArtifact, AppError> {
        let recorder = Arc::clone(&self.collaborators.recorder);
        let artifact = self.handoff.stop_and_save(recorder.as_ref()).await?;
        if self.engine.state() == SessionState::AwaitingRecordingSave {
            let outcome = RecordingSaveOutcome::Saved {
                recording_id: artifact.id.clone(),
            };
            self.recording_saved(outcome).await?;
        }
        Ok(artifact)
    }

    /// Rewinds a completed session; the new run gets its own backend record.
    pub async fn restart(&mut self) -> Result<(), AppError> {
        self.engine.restart()?;
        let routine_id = self
            .engine
            .routine()
            .map(|routine| routine.id.clone())
            .filter(|id| id != OPEN_PRACTICE_ID);
        let backend_session_id = self
            .create_record(routine_id, self.engine.planned_minutes())
            .await;
        self.engine.link_backend_session(backend_session_id);
        tracing::info!(session_id = ?self.engine.backend_session_id(), "session restarted");
        self.sync_driver();
        self.emit_state();
        Ok(())
    }

    /// Cancels the timer and hands control back to the practice listing.
    pub fn exit(mut self) -> SessionSnapshot {
        self.driver.stop();
        let reason = if self.engine.state() == SessionState::Completed {
            NavigationReason::Completed
        } else {
            NavigationReason::Exited
        };
        self.collaborators.navigator.return_to_listing(reason);
        self.engine.snapshot()
    }

    async fn start_loaded(
        &mut self,
        loaded: LoadedRoutine,
        routine_id: Option<String>,
    ) -> Result<(), AppError> {
        if let Err(err) = PracticeSession::validate_routine(&loaded) {
            let id = loaded.routine.id.as_str();
            tracing::warn!(routine_id = %id, error = %err, "routine cannot be played");
            return Err(self.abort_load(
                id,
                IssueKind::InvalidBlocks,
                AppError::routine_invalid(id, err),
            ));
        }

        let backend_session_id = self
            .create_record(routine_id, loaded.total_duration_minutes())
            .await;

        let title = loaded.routine.title.clone();
        self.engine.load(loaded, backend_session_id)?;
        tracing::info!(
            routine = %title,
            blocks = self.engine.block_count(),
            session_id = ?self.engine.backend_session_id(),
            "routine loaded"
        );
        self.emit_state();
        Ok(())
    }

    fn require_loading(&self) -> Result<(), AppError> {
        match self.engine.state() {
            SessionState::Loading => Ok(()),
            state => Err(SessionError::InvalidTransition {
                action: "load a routine",
                state,
            }
            .into()),
        }
    }

    fn abort_load(&self, routine_id: &str, kind: IssueKind, error: AppError) -> AppError {
        self.collaborators
            .issues
            .report(Issue::practice_session(routine_id, kind));
        self.collaborators
            .navigator
            .return_to_listing(NavigationReason::AccessDenied);
        error
    }

    /// Creates the backend record for one run. Failure leaves the run unlinked.
    async fn create_record(&self, routine_id: Option<String>, minutes: u32) -> Option<String> {
        let planned = PlannedSession {
            user_id: self.user.id.clone(),
            routine_id,
            planned_duration_minutes: minutes,
        };
        match self.collaborators.records.create_session(planned).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "session record not created; continuing unlinked");
                None
            }
        }
    }

    async fn handle_advance(&mut self, result: AdvanceResult) {
        match result {
            AdvanceResult::NoChange => {}
            AdvanceResult::BlockAdvanced { .. } => self.on_block_changed(result),
            AdvanceResult::AwaitingRecordingSave => {
                self.driver.stop();
                self.emit_state();
                self.events.emit_recording_save_requested();
                let recorder = Arc::clone(&self.collaborators.recorder);
                if let Err(err) = self.handoff.request_save(recorder.as_ref()).await {
                    tracing::warn!(error = %err, "recording handoff failed; completing without it");
                    if self.engine.abandon_recording().is_ok() {
                        self.finish().await;
                    }
                }
            }
            AdvanceResult::Completed => self.finish().await,
        }
    }

    fn on_block_changed(&mut self, result: AdvanceResult) {
        let AdvanceResult::BlockAdvanced { block_index } = result else {
            return;
        };
        if self.engine.is_timer_running() {
            self.driver.start();
        }
        if let Some(block) = self.engine.current_block().cloned() {
            tracing::info!(block_index, block_id = %block.id, "block changed");
            self.events.emit_block_changed(
                block,
                block_index,
                self.engine.remaining_seconds(),
                self.engine.progress_percent(),
            );
        }
    }

    async fn finish(&mut self) {
        self.driver.stop();
        let summary = self.engine.summary();
        tracing::info!(
            seconds_practiced = summary.seconds_practiced,
            blocks_completed = summary.blocks_completed,
            "practice session completed"
        );
        self.emit_state();
        self.events.emit_session_completed(summary.clone());
        if let Some(session_id) = self.engine.backend_session_id() {
            if let Err(err) = self
                .collaborators
                .records
                .complete_session(session_id, &summary)
                .await
            {
                tracing::warn!(session_id, error = %err, "failed to record session completion");
            }
        }
    }

    fn sync_driver(&mut self) {
        if self.engine.is_timer_running() {
            if !self.driver.is_active() {
                self.driver.start();
            }
        } else {
            self.driver.stop();
        }
    }

    fn emit_state(&self) {
        self.events.emit_state_changed(self.engine.snapshot());
    }

    fn emit_tick(&self) {
        self.events.emit_timer_tick(
            self.engine.remaining_seconds(),
            self.engine.display_time(),
            self.engine.current_index(),
        );
    }
}
