use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Created,
    Updated,
    Deleted,
    StatusChanged,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Created => "created",
            Activity::Updated => "updated",
            Activity::Deleted => "deleted",
            Activity::StatusChanged => "status_changed",
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            Activity::StatusChanged => "status changed",
            other => other.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Money moved or a record was destroyed.
    Critical,
    #[default]
    Important,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
        }
    }
}

/// Records whose changes are written to the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// Event name prefix, e.g. "payroll" in "payroll.status_changed".
    fn entity_type() -> &'static str;

    /// Sentence-case name used in log descriptions.
    fn entity_label() -> &'static str;

    fn subject_id(&self) -> Uuid;

    /// Payment records log every change as critical.
    fn monetary() -> bool {
        false
    }

    fn severity_for(&self, activity: Activity) -> Severity {
        if Self::monetary() || activity == Activity::Deleted {
            Severity::Critical
        } else {
            Severity::Important
        }
    }

    fn event_name(activity: Activity) -> String {
        format!("{}.{}", Self::entity_type(), activity.as_str())
    }

    fn describe(activity: Activity) -> String {
        format!("{} {}", Self::entity_label(), activity.phrase())
    }
}
