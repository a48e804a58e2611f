use crate::block_sequencer::{BlockSequencer, SequenceStep};
use crate::models::{
    LoadedRoutine, PracticeRoutine, RecordingSaveOutcome, RoutineBlock, SessionSnapshot,
    SessionState, SessionSummary,
};
use crate::recording_handoff::{completion_route, CompletionRoute};
use crate::time_format::format_time;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
    #[error("invalid routine: {0}")]
    InvalidRoutine(String),
    #[error("block index {index} out of range for {block_count} blocks")]
    BlockOutOfRange { index: usize, block_count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceResult {
    NoChange,
    BlockAdvanced { block_index: usize },
    AwaitingRecordingSave,
    Completed,
}

/// One playback attempt at a routine.
///
/// The lifecycle lives in a single [`SessionState`] value; the countdown and
/// cursor are only meaningful once a routine has been loaded. The engine never
/// touches a clock: the caller feeds it one `tick` per elapsed second.
#[derive(Debug)]
pub struct PracticeSession {
    state: SessionState,
    routine: Option<PracticeRoutine>,
    sequencer: Option<BlockSequencer>,
    remaining_seconds: u32,
    focus_mode: bool,
    should_record: bool,
    backend_session_id: Option<String>,
    seconds_practiced: u32,
    blocks_finished: u32,
    recording_id: Option<String>,
}

impl Default for PracticeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Loading,
            routine: None,
            sequencer: None,
            remaining_seconds: 0,
            focus_mode: false,
            should_record: false,
            backend_session_id: None,
            seconds_practiced: 0,
            blocks_finished: 0,
            recording_id: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while the countdown should be ticking.
    pub fn is_timer_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn routine(&self) -> Option<&PracticeRoutine> {
        self.routine.as_ref()
    }

    pub fn current_block(&self) -> Option<&RoutineBlock> {
        self.sequencer.as_ref().map(BlockSequencer::current)
    }

    pub fn current_index(&self) -> usize {
        self.sequencer.as_ref().map_or(0, BlockSequencer::index)
    }

    pub fn block_count(&self) -> usize {
        self.sequencer.as_ref().map_or(0, BlockSequencer::block_count)
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn display_time(&self) -> String {
        format_time(self.remaining_seconds)
    }

    pub fn progress_percent(&self) -> f32 {
        self.sequencer
            .as_ref()
            .map_or(0.0, BlockSequencer::progress_percent)
    }

    pub fn focus_mode(&self) -> bool {
        self.focus_mode
    }

    pub fn should_record(&self) -> bool {
        self.should_record
    }

    pub fn backend_session_id(&self) -> Option<&str> {
        self.backend_session_id.as_deref()
    }

    /// Sum of the loaded blocks' durations.
    pub fn planned_minutes(&self) -> u32 {
        self.sequencer.as_ref().map_or(0, |sequencer| {
            sequencer
                .blocks()
                .iter()
                .map(|block| block.duration_minutes)
                .sum()
        })
    }

    /// Points the session at the backend record of a fresh run.
    pub fn link_backend_session(&mut self, backend_session_id: Option<String>) {
        self.backend_session_id = backend_session_id;
    }

    pub fn load(
        &mut self,
        loaded: LoadedRoutine,
        backend_session_id: Option<String>,
    ) -> Result<(), SessionError> {
        self.require(SessionState::Loading, "load a routine")?;
        Self::validate_routine(&loaded)?;
        let mut blocks = loaded.blocks;
        blocks.sort_by_key(|block| block.order_index);
        let sequencer = BlockSequencer::new(Arc::from(blocks)).ok_or_else(|| {
            SessionError::InvalidRoutine("routine must have at least one block".to_string())
        })?;
        self.remaining_seconds = sequencer.current_duration_seconds();
        self.sequencer = Some(sequencer);
        self.routine = Some(loaded.routine);
        self.backend_session_id = backend_session_id;
        self.state = SessionState::AwaitingRecordingChoice;
        Ok(())
    }

    pub fn choose_recording(&mut self, record: bool) -> Result<(), SessionError> {
        self.require(SessionState::AwaitingRecordingChoice, "choose recording")?;
        self.should_record = record;
        self.state = SessionState::Running;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::Running, "pause")?;
        self.state = SessionState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::Paused, "resume")?;
        self.state = SessionState::Running;
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::Running => self.pause()?,
            SessionState::Paused => self.resume()?,
            state => {
                return Err(SessionError::InvalidTransition {
                    action: "toggle pause",
                    state,
                })
            }
        }
        Ok(self.state)
    }

    pub fn toggle_focus_mode(&mut self) -> bool {
        self.focus_mode = !self.focus_mode;
        self.focus_mode
    }

    /// Applies one elapsed second. Ticks outside `Running` are ignored.
    pub fn tick(&mut self, recording_active: bool) -> AdvanceResult {
        if self.state != SessionState::Running {
            return AdvanceResult::NoChange;
        }
        self.seconds_practiced = self.seconds_practiced.saturating_add(1);
        if self.remaining_seconds > 1 {
            self.remaining_seconds -= 1;
            return AdvanceResult::NoChange;
        }
        self.remaining_seconds = 0;
        self.blocks_finished = self.blocks_finished.saturating_add(1);
        self.advance(recording_active)
    }

    pub fn go_to_next(&mut self, recording_active: bool) -> Result<AdvanceResult, SessionError> {
        self.require_navigable("go to next block")?;
        Ok(self.advance(recording_active))
    }

    pub fn go_to_previous(&mut self) -> Result<AdvanceResult, SessionError> {
        self.require_navigable("go to previous block")?;
        let step = match self.sequencer.as_mut() {
            Some(sequencer) => sequencer.go_to_previous(),
            None => SequenceStep::Unchanged,
        };
        Ok(self.apply_step(step))
    }

    pub fn jump_to(&mut self, index: usize) -> Result<AdvanceResult, SessionError> {
        self.require_navigable("jump to block")?;
        let block_count = self.block_count();
        let step = self
            .sequencer
            .as_mut()
            .and_then(|sequencer| sequencer.jump_to(index))
            .ok_or(SessionError::BlockOutOfRange { index, block_count })?;
        Ok(self.apply_step(step))
    }

    pub fn recording_saved(&mut self, outcome: &RecordingSaveOutcome) -> Result<(), SessionError> {
        self.require(SessionState::AwaitingRecordingSave, "finish recording save")?;
        self.recording_id = outcome.recording_id().map(str::to_string);
        self.state = SessionState::Completed;
        Ok(())
    }

    /// Completes a session whose recording could not be handed off.
    pub fn abandon_recording(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::AwaitingRecordingSave, "abandon recording")?;
        self.state = SessionState::Completed;
        Ok(())
    }

    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::Completed, "restart")?;
        if let Some(sequencer) = self.sequencer.as_mut() {
            self.remaining_seconds = sequencer.rewind();
        }
        self.should_record = false;
        self.seconds_practiced = 0;
        self.blocks_finished = 0;
        self.recording_id = None;
        self.state = SessionState::AwaitingRecordingChoice;
        Ok(())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            seconds_practiced: self.seconds_practiced,
            blocks_completed: self.blocks_finished,
            block_count: self.block_count().try_into().unwrap_or(u32::MAX),
            recording_id: self.recording_id.clone(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            routine_id: self.routine.as_ref().map(|routine| routine.id.clone()),
            routine_title: self.routine.as_ref().map(|routine| routine.title.clone()),
            current_block: self.current_block().cloned(),
            current_block_index: self.current_index(),
            block_count: self.block_count(),
            remaining_seconds: self.remaining_seconds,
            display_time: self.display_time(),
            progress_percent: self.progress_percent(),
            focus_mode: self.focus_mode,
            should_record: self.should_record,
            backend_session_id: self.backend_session_id.clone(),
        }
    }

    fn advance(&mut self, recording_active: bool) -> AdvanceResult {
        let step = match self.sequencer.as_mut() {
            Some(sequencer) => sequencer.go_to_next(),
            None => SequenceStep::Unchanged,
        };
        if step != SequenceStep::Finished {
            return self.apply_step(step);
        }
        match completion_route(self.should_record, recording_active) {
            CompletionRoute::AwaitSave => {
                self.state = SessionState::AwaitingRecordingSave;
                AdvanceResult::AwaitingRecordingSave
            }
            CompletionRoute::Direct => {
                self.state = SessionState::Completed;
                AdvanceResult::Completed
            }
        }
    }

    fn apply_step(&mut self, step: SequenceStep) -> AdvanceResult {
        match step {
            SequenceStep::Moved {
                index,
                duration_seconds,
            } => {
                self.remaining_seconds = duration_seconds;
                AdvanceResult::BlockAdvanced { block_index: index }
            }
            SequenceStep::Unchanged | SequenceStep::Finished => AdvanceResult::NoChange,
        }
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn require_navigable(&self, action: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Running | SessionState::Paused => Ok(()),
            state => Err(SessionError::InvalidTransition { action, state }),
        }
    }

    /// Checks that a routine can be played: at least one block, every
    /// duration positive, order indices unique.
    pub fn validate_routine(loaded: &LoadedRoutine) -> Result<(), SessionError> {
        let blocks = &loaded.blocks;
        if blocks.is_empty() {
            return Err(SessionError::InvalidRoutine(
                "routine must have at least one block".to_string(),
            ));
        }
        if blocks.iter().any(|block| block.duration_minutes == 0) {
            return Err(SessionError::InvalidRoutine(
                "block duration must be at least 1 minute".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if !blocks.iter().all(|block| seen.insert(block.order_index)) {
            return Err(SessionError::InvalidRoutine(
                "block order indices must be unique".to_string(),
            ));
        }
        Ok(())
    }
}
