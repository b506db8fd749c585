//! Corrective-action records raised by low-achievement report entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ActionPlanStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A corrective action for one report entry that missed the achievement threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub id: String,
    pub daily_report_id: String,
    pub daily_plan_id: String,
    pub department: String,
    pub operator: String,
    pub target_production: u32,
    pub actual_production: u32,
    pub achievement_percentage: f64,
    pub reason: String,
    pub corrective_actions: String,
    pub responsible_person: String,
    pub target_completion_date: String,
    pub status: ActionPlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
