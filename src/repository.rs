use crate::data_manager::DataResult;
use crate::models::{LoadedRoutine, PlannedSession, PracticeUser, SessionSummary};
use async_trait::async_trait;

#[async_trait]
pub trait RoutineRepository: Send + Sync {
    /// Returns `None` when the routine is missing or not visible to `user`.
    async fn fetch_routine(
        &self,
        user: &PracticeUser,
        routine_id: &str,
    ) -> DataResult<Option<LoadedRoutine>>;
}

#[async_trait]
pub trait SessionRecordStore: Send + Sync {
    /// Creates the backend record a later recording is linked to.
    async fn create_session(&self, planned: PlannedSession) -> DataResult<String>;
    async fn complete_session(&self, session_id: &str, summary: &SessionSummary)
        -> DataResult<()>;
}
