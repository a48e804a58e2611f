use serde::{Deserialize, Serialize};

pub const OPEN_PRACTICE_ID: &str = "open-practice";
const OPEN_PRACTICE_BLOCK_ID: &str = "open-practice-block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRoutine {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineBlock {
    pub id: String,
    pub routine_id: String,
    pub order_index: u32,
    pub block_type: String,
    pub content: String,
    #[serde(default)]
    pub instructions: Option<String>,
    pub duration_minutes: u32,
}

impl RoutineBlock {
    pub fn duration_seconds(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }
}

/// A routine together with its blocks, as handed out by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedRoutine {
    pub routine: PracticeRoutine,
    pub blocks: Vec<RoutineBlock>,
}

impl LoadedRoutine {
    /// Single-block pseudo-routine for unstructured practice.
    pub fn open_practice(minutes: u32) -> Self {
        Self {
            routine: PracticeRoutine {
                id: OPEN_PRACTICE_ID.to_string(),
                title: "Open Practice".to_string(),
                description: Some("Unstructured practice time".to_string()),
                owner_id: None,
                is_template: false,
                tags: Vec::new(),
            },
            blocks: vec![RoutineBlock {
                id: OPEN_PRACTICE_BLOCK_ID.to_string(),
                routine_id: OPEN_PRACTICE_ID.to_string(),
                order_index: 0,
                block_type: "open".to_string(),
                content: "Practice freely".to_string(),
                instructions: None,
                duration_minutes: minutes.max(1),
            }],
        }
    }

    pub fn is_open_practice(&self) -> bool {
        self.routine.id == OPEN_PRACTICE_ID
    }

    pub fn total_duration_minutes(&self) -> u32 {
        self.blocks
            .iter()
            .fold(0u32, |acc, block| acc.saturating_add(block.duration_minutes))
    }

    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.routine.is_template
            || self
                .routine
                .owner_id
                .as_deref()
                .map_or(true, |owner| owner == user_id)
    }
}

/// The signed-in user, passed explicitly to whoever needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeUser {
    pub id: String,
}

impl PracticeUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSession {
    pub user_id: String,
    pub routine_id: Option<String>,
    pub planned_duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub routine_id: Option<String>,
    pub planned_duration_minutes: u32,
    pub started_at: String,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub seconds_practiced: Option<u32>,
    #[serde(default)]
    pub blocks_completed: Option<u32>,
    #[serde(default)]
    pub recording_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub seconds_practiced: u32,
    pub blocks_completed: u32,
    pub block_count: u32,
    pub recording_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingArtifact {
    pub id: String,
    pub duration_seconds: u32,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordingSaveOutcome {
    Saved {
        #[serde(rename = "recordingId")]
        recording_id: String,
    },
    Discarded,
}

impl RecordingSaveOutcome {
    pub fn recording_id(&self) -> Option<&str> {
        match self {
            RecordingSaveOutcome::Saved { recording_id } => Some(recording_id),
            RecordingSaveOutcome::Discarded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Loading,
    AwaitingRecordingChoice,
    Running,
    Paused,
    AwaitingRecordingSave,
    Completed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::AwaitingRecordingChoice => "awaiting-recording-choice",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::AwaitingRecordingSave => "awaiting-recording-save",
            SessionState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub routine_id: Option<String>,
    pub routine_title: Option<String>,
    pub current_block: Option<RoutineBlock>,
    pub current_block_index: usize,
    pub block_count: usize,
    pub remaining_seconds: u32,
    pub display_time: String,
    pub progress_percent: f32,
    pub focus_mode: bool,
    pub should_record: bool,
    pub backend_session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{LoadedRoutine, PracticeRoutine, RecordingSaveOutcome, OPEN_PRACTICE_ID};

    fn owned_routine(owner: Option<&str>, is_template: bool) -> LoadedRoutine {
        LoadedRoutine {
            routine: PracticeRoutine {
                id: "routine-1".to_string(),
                title: "Scales".to_string(),
                description: None,
                owner_id: owner.map(str::to_string),
                is_template,
                tags: vec!["warmup".to_string()],
            },
            blocks: Vec::new(),
        }
    }

    #[test]
    fn open_practice_has_single_block() {
        let routine = LoadedRoutine::open_practice(45);
        assert!(routine.is_open_practice());
        assert_eq!(routine.routine.id, OPEN_PRACTICE_ID);
        assert_eq!(routine.blocks.len(), 1);
        assert_eq!(routine.blocks[0].duration_minutes, 45);
        assert_eq!(routine.total_duration_minutes(), 45);
    }

    #[test]
    fn open_practice_never_has_zero_duration() {
        let routine = LoadedRoutine::open_practice(0);
        assert_eq!(routine.blocks[0].duration_minutes, 1);
    }

    #[test]
    fn visibility_follows_owner_and_template_flag() {
        assert!(owned_routine(None, false).is_visible_to("user-1"));
        assert!(owned_routine(Some("user-1"), false).is_visible_to("user-1"));
        assert!(!owned_routine(Some("user-2"), false).is_visible_to("user-1"));
        assert!(owned_routine(Some("user-2"), true).is_visible_to("user-1"));
    }

    #[test]
    fn save_outcome_serializes_with_type_tag() {
        let saved = RecordingSaveOutcome::Saved {
            recording_id: "rec-1".to_string(),
        };
        let json = serde_json::to_value(&saved).expect("serialize");
        assert_eq!(json["type"], "saved");
        assert_eq!(json["recordingId"], "rec-1");
        assert_eq!(saved.recording_id(), Some("rec-1"));
        assert_eq!(RecordingSaveOutcome::Discarded.recording_id(), None);
    }
}
