//! Tracker tasks mirroring each plan/report instance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which level of the plan hierarchy a tracker task follows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackerTaskType {
    Monthly,
    Weekly,
    Daily,
    Report,
}

impl TrackerTaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerTaskType::Monthly => "monthly",
            TrackerTaskType::Weekly => "weekly",
            TrackerTaskType::Daily => "daily",
            TrackerTaskType::Report => "report",
        }
    }
}

impl std::str::FromStr for TrackerTaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(TrackerTaskType::Monthly),
            "weekly" => Ok(TrackerTaskType::Weekly),
            "daily" => Ok(TrackerTaskType::Daily),
            "report" => Ok(TrackerTaskType::Report),
            other => Err(format!("Unknown task type '{}'", other)),
        }
    }
}

/// Tracker status; the union of every plan level's lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrackerStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl TrackerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::Pending => "pending",
            TrackerStatus::InProgress => "inProgress",
            TrackerStatus::Completed => "completed",
            TrackerStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for TrackerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TrackerStatus::Pending),
            "inProgress" => Ok(TrackerStatus::InProgress),
            "completed" => Ok(TrackerStatus::Completed),
            "rejected" => Ok(TrackerStatus::Rejected),
            other => Err(format!("Unknown task status '{}'", other)),
        }
    }
}

impl From<crate::PlanStatus> for TrackerStatus {
    fn from(status: crate::PlanStatus) -> Self {
        match status {
            crate::PlanStatus::Pending => TrackerStatus::Pending,
            crate::PlanStatus::Completed => TrackerStatus::Completed,
        }
    }
}

impl From<crate::DailyPlanStatus> for TrackerStatus {
    fn from(status: crate::DailyPlanStatus) -> Self {
        match status {
            crate::DailyPlanStatus::Pending => TrackerStatus::Pending,
            crate::DailyPlanStatus::InProgress => TrackerStatus::InProgress,
            crate::DailyPlanStatus::Completed => TrackerStatus::Completed,
            crate::DailyPlanStatus::Rejected => TrackerStatus::Rejected,
        }
    }
}

/// A work item pointing at one plan or report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionTask {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TrackerTaskType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TrackerStatus,
    pub assigned_to: String,
    pub assigned_role: String,
    pub plan_id: String,
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whose task list is being rendered; decides which tracker tasks are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAudience {
    /// Sees everything except reports; daily tasks only while awaiting review
    PlantHead,
    /// Sees only daily and report tasks
    ProductionManager,
    Unrestricted,
}

impl TaskAudience {
    pub fn can_see(&self, task: &ProductionTask) -> bool {
        match self {
            TaskAudience::PlantHead => match task.task_type {
                TrackerTaskType::Report => false,
                TrackerTaskType::Daily => task.status == TrackerStatus::InProgress,
                _ => true,
            },
            TaskAudience::ProductionManager => matches!(
                task.task_type,
                TrackerTaskType::Daily | TrackerTaskType::Report
            ),
            TaskAudience::Unrestricted => true,
        }
    }
}
