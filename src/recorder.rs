use crate::models::RecordingArtifact;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    #[error("recorder unavailable: {0}")]
    Unavailable(String),
    #[error("recorder failed: {0}")]
    Failed(String),
}

/// Audio recorder that owns microphone access and the upload of what it
/// captures. Save completion is reported back to the session controller.
#[async_trait]
pub trait AudioRecorder: Send + Sync {
    fn is_recording(&self) -> bool;
    async fn begin_recording(&self) -> Result<(), RecorderError>;
    /// Stops capturing and shows the save dialog to the user.
    async fn stop_and_prompt_save(&self) -> Result<(), RecorderError>;
    /// Stops capturing without any dialog.
    async fn stop(&self) -> Result<(), RecorderError>;
    /// Takes the finished artifact once the recorder has produced it.
    fn take_recording(&self) -> Option<RecordingArtifact>;
}

/// Recorder for hosts without a microphone backend. Never records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

#[async_trait]
impl AudioRecorder for NullRecorder {
    fn is_recording(&self) -> bool {
        false
    }

    async fn begin_recording(&self) -> Result<(), RecorderError> {
        Err(RecorderError::Unavailable(
            "no audio input configured".to_string(),
        ))
    }

    async fn stop_and_prompt_save(&self) -> Result<(), RecorderError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), RecorderError> {
        Ok(())
    }

    fn take_recording(&self) -> Option<RecordingArtifact> {
        None
    }
}
