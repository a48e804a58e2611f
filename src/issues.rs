use serde::Serialize;

pub const PRACTICE_SESSION_PAGE: &str = "practice-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    NotFound,
    NoBlocks,
    InvalidBlocks,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::NotFound => "not-found",
            IssueKind::NoBlocks => "no-blocks",
            IssueKind::InvalidBlocks => "invalid-blocks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub routine_id: String,
    pub page: &'static str,
    pub kind: IssueKind,
}

impl Issue {
    pub fn practice_session(routine_id: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            routine_id: routine_id.into(),
            page: PRACTICE_SESSION_PAGE,
            kind,
        }
    }
}

/// Sink for load failures kept for offline diagnosis.
pub trait IssueLogger: Send + Sync {
    fn report(&self, issue: Issue);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIssueLogger;

impl IssueLogger for TracingIssueLogger {
    fn report(&self, issue: Issue) {
        tracing::warn!(
            routine_id = %issue.routine_id,
            page = issue.page,
            kind = issue.kind.as_str(),
            "practice issue reported"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Issue, IssueKind, PRACTICE_SESSION_PAGE};

    #[test]
    fn issue_carries_page_and_kind() {
        let issue = Issue::practice_session("routine-7", IssueKind::NoBlocks);
        assert_eq!(issue.page, PRACTICE_SESSION_PAGE);
        assert_eq!(issue.kind.as_str(), "no-blocks");

        let json = serde_json::to_value(&issue).expect("serialize");
        assert_eq!(json["routineId"], "routine-7");
        assert_eq!(json["kind"], "no-blocks");

        let invalid = Issue::practice_session("routine-8", IssueKind::InvalidBlocks);
        let json = serde_json::to_value(&invalid).expect("serialize");
        assert_eq!(json["kind"], IssueKind::InvalidBlocks.as_str());
    }
}
