use crate::models::{LoadedRoutine, PlannedSession, PracticeUser, SessionRecord, SessionSummary};
use crate::repository::{RoutineRepository, SessionRecordStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Session record not found: {0}")]
    SessionNotFound(String),
}

pub type DataResult<T> = Result<T, DataError>;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File-backed store for routines and session records.
///
/// Each collection is a pretty-printed JSON array, replaced atomically on
/// every write.
#[derive(Debug, Clone)]
pub struct DataManager {
    routines_path: PathBuf,
    sessions_path: PathBuf,
}

impl DataManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> DataResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let routines_path = base_dir.join("routines.json");
        let sessions_path = base_dir.join("sessions.json");

        let manager = Self {
            routines_path,
            sessions_path,
        };

        if !manager.routines_path.exists() {
            manager.write_json(&manager.routines_path, &Vec::<LoadedRoutine>::new())?;
        }
        if !manager.sessions_path.exists() {
            manager.write_json(&manager.sessions_path, &Vec::<SessionRecord>::new())?;
        }

        Ok(manager)
    }

    pub fn load_routines(&self) -> DataResult<Vec<LoadedRoutine>> {
        self.read_json(&self.routines_path)
    }

    pub fn save_routine(&self, routine: LoadedRoutine) -> DataResult<()> {
        let mut routines = self.load_routines()?;
        if let Some(existing) = routines
            .iter_mut()
            .find(|item| item.routine.id == routine.routine.id)
        {
            *existing = routine;
        } else {
            routines.push(routine);
        }
        self.write_json(&self.routines_path, &routines)
    }

    pub fn load_sessions(&self) -> DataResult<Vec<SessionRecord>> {
        self.read_json(&self.sessions_path)
    }

    pub fn load_sessions_for_user(&self, user_id: &str) -> DataResult<Vec<SessionRecord>> {
        let sessions = self.load_sessions()?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.user_id == user_id)
            .collect())
    }

    pub fn save_session(&self, session: SessionRecord) -> DataResult<()> {
        let mut sessions = self.load_sessions()?;
        if let Some(existing) = sessions.iter_mut().find(|item| item.id == session.id) {
            *existing = session;
        } else {
            sessions.push(session);
        }
        self.write_json(&self.sessions_path, &sessions)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> DataResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> DataResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        match fs::rename(&temp_path, path) {
            Ok(()) => Ok(()),
            Err(_err) if path.exists() => {
                let _ = fs::remove_file(path);
                fs::rename(&temp_path, path).map_err(DataError::from)
            }
            Err(err) => Err(DataError::from(err)),
        }
    }
}

#[async_trait]
impl RoutineRepository for DataManager {
    async fn fetch_routine(
        &self,
        user: &PracticeUser,
        routine_id: &str,
    ) -> DataResult<Option<LoadedRoutine>> {
        let routines = self.load_routines()?;
        Ok(routines
            .into_iter()
            .find(|item| item.routine.id == routine_id)
            .filter(|item| item.is_visible_to(&user.id)))
    }
}

#[async_trait]
impl SessionRecordStore for DataManager {
    async fn create_session(&self, planned: PlannedSession) -> DataResult<String> {
        let record = SessionRecord {
            id: generate_session_id(),
            user_id: planned.user_id,
            routine_id: planned.routine_id,
            planned_duration_minutes: planned.planned_duration_minutes,
            started_at: Utc::now().to_rfc3339(),
            ended_at: None,
            seconds_practiced: None,
            blocks_completed: None,
            recording_id: None,
        };
        let id = record.id.clone();
        self.save_session(record)?;
        Ok(id)
    }

    async fn complete_session(
        &self,
        session_id: &str,
        summary: &SessionSummary,
    ) -> DataResult<()> {
        let mut sessions = self.load_sessions()?;
        let record = sessions
            .iter_mut()
            .find(|item| item.id == session_id)
            .ok_or_else(|| DataError::SessionNotFound(session_id.to_string()))?;
        record.ended_at = Some(Utc::now().to_rfc3339());
        record.seconds_practiced = Some(summary.seconds_practiced);
        record.blocks_completed = Some(summary.blocks_completed);
        record.recording_id = summary.recording_id.clone();
        self.write_json(&self.sessions_path, &sessions)
    }
}

fn generate_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let sequence = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("session-{nanos}-{sequence}-{}", std::process::id())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{DataError, DataManager};
    use crate::models::{
        LoadedRoutine, PlannedSession, PracticeRoutine, PracticeUser, RoutineBlock, SessionSummary,
    };
    use crate::repository::{RoutineRepository, SessionRecordStore};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    pub(crate) fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.push(format!(
            "practice_session_test_{nanos}_{counter}_{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn sample_routine(id: &str, owner: Option<&str>) -> LoadedRoutine {
        LoadedRoutine {
            routine: PracticeRoutine {
                id: id.to_string(),
                title: "Arpeggios".to_string(),
                description: None,
                owner_id: owner.map(str::to_string),
                is_template: false,
                tags: Vec::new(),
            },
            blocks: vec![RoutineBlock {
                id: format!("{id}-block-0"),
                routine_id: id.to_string(),
                order_index: 0,
                block_type: "technique".to_string(),
                content: "Broken chords".to_string(),
                instructions: None,
                duration_minutes: 5,
            }],
        }
    }

    #[test]
    fn new_creates_empty_collections() {
        let dir = temp_dir();
        let manager = DataManager::new(&dir).expect("create manager");

        assert!(dir.join("routines.json").exists());
        assert!(dir.join("sessions.json").exists());
        assert!(manager.load_routines().expect("routines").is_empty());
        assert!(manager.load_sessions().expect("sessions").is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_routine_replaces_existing_entry() {
        let dir = temp_dir();
        let manager = DataManager::new(&dir).expect("create manager");
        manager
            .save_routine(sample_routine("routine-1", None))
            .expect("save");
        let mut updated = sample_routine("routine-1", None);
        updated.routine.title = "Arpeggios II".to_string();
        manager.save_routine(updated).expect("save again");

        let routines = manager.load_routines().expect("load");
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].routine.title, "Arpeggios II");

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn fetch_routine_checks_visibility() {
        let dir = temp_dir();
        let manager = DataManager::new(&dir).expect("create manager");
        manager
            .save_routine(sample_routine("mine", Some("user-1")))
            .expect("save");
        manager
            .save_routine(sample_routine("theirs", Some("user-2")))
            .expect("save");
        let user = PracticeUser::new("user-1");

        assert!(manager
            .fetch_routine(&user, "mine")
            .await
            .expect("fetch")
            .is_some());
        assert!(manager
            .fetch_routine(&user, "theirs")
            .await
            .expect("fetch")
            .is_none());
        assert!(manager
            .fetch_routine(&user, "missing")
            .await
            .expect("fetch")
            .is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn session_records_are_created_and_completed() {
        let dir = temp_dir();
        let manager = DataManager::new(&dir).expect("create manager");
        let id = manager
            .create_session(PlannedSession {
                user_id: "user-1".to_string(),
                routine_id: None,
                planned_duration_minutes: 30,
            })
            .await
            .expect("create session");

        let summary = SessionSummary {
            seconds_practiced: 1800,
            blocks_completed: 1,
            block_count: 1,
            recording_id: Some("rec-1".to_string()),
        };
        manager
            .complete_session(&id, &summary)
            .await
            .expect("complete session");

        let sessions = manager.load_sessions_for_user("user-1").expect("load");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert!(sessions[0].routine_id.is_none());
        assert!(sessions[0].ended_at.is_some());
        assert_eq!(sessions[0].seconds_practiced, Some(1800));
        assert_eq!(sessions[0].recording_id.as_deref(), Some("rec-1"));
        assert!(manager
            .load_sessions_for_user("user-2")
            .expect("load")
            .is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn complete_unknown_session_is_error() {
        let dir = temp_dir();
        let manager = DataManager::new(&dir).expect("create manager");
        let err = manager
            .complete_session("session-x", &SessionSummary::default())
            .await
            .expect_err("should fail");
        assert!(matches!(err, DataError::SessionNotFound(_)));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_reports_serde_error() {
        let dir = temp_dir();
        let manager = DataManager::new(&dir).expect("create manager");
        fs::write(dir.join("routines.json"), "{ not json").expect("write");

        let err = manager.load_routines().expect_err("should fail");
        assert!(matches!(err, DataError::Serde(_)));

        let _ = fs::remove_dir_all(&dir);
    }
}
