use crate::data_manager::DataError;
use crate::recording_handoff::HandoffError;
use crate::session_engine::SessionError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppErrorKind {
    Access,
    EmptyContent,
    Session,
    Data,
    Recording,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorPayload {
    pub kind: AppErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
    detail: Option<String>,
    recoverable: bool,
}

impl AppError {
    pub fn with_detail(
        kind: AppErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: Some(detail.into()),
            recoverable,
        }
    }

    pub fn routine_not_found(routine_id: &str) -> Self {
        Self::with_detail(
            AppErrorKind::Access,
            "Practice routine not found",
            format!("routine {routine_id} is missing or not accessible"),
            false,
        )
    }

    pub fn routine_empty(routine_id: &str) -> Self {
        Self::with_detail(
            AppErrorKind::EmptyContent,
            "This routine has no practice blocks",
            format!("routine {routine_id} has no blocks"),
            false,
        )
    }

    pub fn routine_invalid(routine_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::with_detail(
            AppErrorKind::EmptyContent,
            "This routine cannot be played",
            format!("routine {routine_id}: {reason}"),
            false,
        )
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn payload(&self) -> AppErrorPayload {
        AppErrorPayload {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            recoverable: self.recoverable,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        let detail = error.to_string();
        let message = match error {
            SessionError::InvalidTransition { .. } => "That action is not available right now",
            SessionError::BlockOutOfRange { .. } => "That block does not exist in this routine",
            SessionError::InvalidRoutine(_) => {
                return Self::with_detail(
                    AppErrorKind::EmptyContent,
                    "This routine cannot be played",
                    detail,
                    false,
                );
            }
        };
        Self::with_detail(AppErrorKind::Session, message, detail, true)
    }
}

impl From<DataError> for AppError {
    fn from(error: DataError) -> Self {
        let detail = error.to_string();
        let message = match error {
            DataError::Io(_) => "Failed to read or write practice data",
            DataError::Serde(_) => "Practice data is in an unexpected format",
            DataError::SessionNotFound(_) => "Practice session record is missing",
        };
        Self::with_detail(AppErrorKind::Data, message, detail, true)
    }
}

impl From<HandoffError> for AppError {
    fn from(error: HandoffError) -> Self {
        let detail = error.to_string();
        let message = match error {
            HandoffError::Recorder(_) => "The recorder could not be stopped",
            HandoffError::SaveTimeout { .. } => "Timed out waiting for the recording",
        };
        Self::with_detail(AppErrorKind::Recording, message, detail, true)
    }
}
