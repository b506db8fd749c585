//! Production plan hierarchy: monthly → weekly → daily → report

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of monthly and weekly plans
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlanStatus {
    #[default]
    Pending,
    Completed,
}

/// Lifecycle of a daily plan (submitted, reviewed by the plant head)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DailyPlanStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl DailyPlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DailyPlanStatus::Pending => "pending",
            DailyPlanStatus::InProgress => "inProgress",
            DailyPlanStatus::Completed => "completed",
            DailyPlanStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for DailyPlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DailyPlanStatus::Pending),
            "inProgress" => Ok(DailyPlanStatus::InProgress),
            "completed" => Ok(DailyPlanStatus::Completed),
            "rejected" => Ok(DailyPlanStatus::Rejected),
            other => Err(format!("Unknown daily plan status '{}'", other)),
        }
    }
}

/// An item line carried down the plan hierarchy.
///
/// `weekly_quantities` keys are `week<start>-<end>` for the week total and
/// `day<N>` for the per-day share.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionItem {
    #[serde(default)]
    pub id: String,
    pub item_code: String,
    pub item_name: String,
    #[serde(default)]
    pub customer_name: String,
    pub monthly_quantity: u32,
    #[serde(default)]
    pub weekly_quantities: BTreeMap<String, u32>,
}

/// One production line of a daily plan or report.
///
/// Plan-side fields are set when the plan is drafted; the actual-side fields
/// stay empty until the report is submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEntry {
    #[serde(default)]
    pub id: String,
    pub dept_name: String,
    pub operator_name: String,
    #[serde(default)]
    pub work: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(default)]
    pub h1_plan: u32,
    #[serde(default)]
    pub h2_plan: u32,
    #[serde(default)]
    pub ot_plan: u32,
    #[serde(default)]
    pub target: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h1_actual: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2_actual: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ot_actual: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_production: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_defect: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrective_actions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_completion_date: Option<String>,
}

impl ProductionEntry {
    /// Sum of the three planned shifts; `None` when it does not fit a `u32`
    pub fn planned_total(&self) -> Option<u32> {
        self.h1_plan.checked_add(self.h2_plan)?.checked_add(self.ot_plan)
    }

    /// Actual output: the shift actuals when they add up to anything,
    /// otherwise the directly reported figure. `None` on overflow.
    pub fn reported_actual(&self) -> Option<u32> {
        let shifts = self
            .h1_actual
            .unwrap_or(0)
            .checked_add(self.h2_actual.unwrap_or(0))?
            .checked_add(self.ot_actual.unwrap_or(0))?;
        if shifts > 0 {
            Some(shifts)
        } else {
            Some(self.actual_production.unwrap_or(0))
        }
    }

    /// Copy of the plan-side fields with every actual zeroed, as a report starts out
    pub fn for_report(&self, id: String) -> Self {
        Self {
            id,
            dept_name: self.dept_name.clone(),
            operator_name: self.operator_name.clone(),
            work: self.work.clone(),
            item_code: self.item_code.clone(),
            h1_plan: self.h1_plan,
            h2_plan: self.h2_plan,
            ot_plan: self.ot_plan,
            target: self.target,
            h1_actual: Some(0),
            h2_actual: Some(0),
            ot_actual: Some(0),
            actual_production: Some(0),
            quality_defect: Some(0),
            production_percentage: Some(0.0),
            reason: Some(String::new()),
            corrective_actions: Some(String::new()),
            responsible_person: Some(String::new()),
            target_completion_date: Some(String::new()),
        }
    }
}

/// A month's production plan; one per (month, year)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub id: String,
    pub title: String,
    pub month: u32,
    pub year: i32,
    pub status: PlanStatus,
    pub assigned_to: String,
    pub assigned_role: String,
    pub deadline: DateTime<Utc>,
    pub week_count: u32,
    pub items: Vec<ProductionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One week of a monthly plan; one per (monthlyPlanId, weekNumber)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlan {
    pub id: String,
    pub title: String,
    pub week_number: u32,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub status: PlanStatus,
    pub monthly_plan_id: String,
    pub assigned_to: String,
    pub assigned_role: String,
    pub items: Vec<ProductionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One working day of a weekly plan; one per (weeklyPlanId, dayNumber)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub id: String,
    pub title: String,
    pub day_number: u32,
    pub date: NaiveDate,
    pub week_number: u32,
    pub weekly_plan_id: String,
    pub status: DailyPlanStatus,
    pub assigned_to: String,
    pub assigned_role: String,
    pub entries: Vec<ProductionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The actuals recorded against an approved daily plan; one per dailyPlanId
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub id: String,
    pub title: String,
    pub daily_plan_id: String,
    pub date: NaiveDate,
    pub status: PlanStatus,
    pub assigned_to: String,
    pub assigned_role: String,
    pub entries: Vec<ProductionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
