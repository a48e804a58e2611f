use crate::models::RecordingArtifact;
use crate::recorder::{AudioRecorder, RecorderError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("recording was not ready after {attempts} attempts")]
    SaveTimeout { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRoute {
    Direct,
    AwaitSave,
}

/// Completion waits for a save only when the user opted in and the recorder
/// is still capturing.
pub fn completion_route(should_record: bool, recording_active: bool) -> CompletionRoute {
    if should_record && recording_active {
        CompletionRoute::AwaitSave
    } else {
        CompletionRoute::Direct
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecordingHandoff {
    poll_attempts: u32,
    poll_interval: Duration,
}

impl RecordingHandoff {
    pub fn new(poll_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            poll_attempts: poll_attempts.max(1),
            poll_interval,
        }
    }

    /// Asks the recorder to stop and present its save dialog. The session
    /// stays incomplete until the recorder reports back.
    pub async fn request_save(&self, recorder: &dyn AudioRecorder) -> Result<(), HandoffError> {
        recorder.stop_and_prompt_save().await?;
        tracing::info!("recording stopped; waiting for save dialog");
        Ok(())
    }

    pub async fn stop_and_save(
        &self,
        recorder: &dyn AudioRecorder,
    ) -> Result<RecordingArtifact, HandoffError> {
        recorder.stop().await?;
        for attempt in 1..=self.poll_attempts {
            if let Some(artifact) = recorder.take_recording() {
                tracing::info!(recording_id = %artifact.id, attempt, "recording ready");
                return Ok(artifact);
            }
            if attempt < self.poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        tracing::warn!(attempts = self.poll_attempts, "recording save timed out");
        Err(HandoffError::SaveTimeout {
            attempts: self.poll_attempts,
        })
    }
}
