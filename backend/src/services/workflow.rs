//! Plan lifecycle transitions
//!
//! Each transition validates the plan's current status, derives the next
//! level where the transition completes a plan, and commits the plan together
//! with its tracker task. Children are derived from the completed plan before
//! it is committed, so a failed derivation leaves the parent open for retry.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::plans::{normalize_items, validate_item};
use super::{require_text, CascadeService, TrackerService};
use crate::config::WorkflowConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    new_id, DailyPlan, DailyPlanStatus, DailyReport, MonthlyPlan, PlanStatus, ProductionEntry,
    ProductionItem, TrackerStatus, TrackerTaskType, WeeklyPlan,
};
use crate::store::{Collection, DocumentStore, Filter};
use shared::{validate_plan_entries, validate_week_count};

#[derive(Clone)]
pub struct WorkflowService {
    monthly: Collection<MonthlyPlan>,
    weekly: Collection<WeeklyPlan>,
    daily: Collection<DailyPlan>,
    reports: Collection<DailyReport>,
    tracker: TrackerService,
    cascade: CascadeService,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMonthlyInput {
    pub items: Option<Vec<ProductionItem>>,
    pub week_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitWeeklyInput {
    pub week_start_date: Option<NaiveDate>,
    pub week_end_date: Option<NaiveDate>,
    pub items: Option<Vec<ProductionItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDailyInput {
    pub entries: Vec<ProductionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RejectDailyInput {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySubmission {
    pub plan: MonthlyPlan,
    pub weekly_plans: Vec<WeeklyPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySubmission {
    pub plan: WeeklyPlan,
    pub daily_plans: Vec<DailyPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyApproval {
    pub plan: DailyPlan,
    pub report: DailyReport,
}

/// What the caller may do with one plan or report in its current state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub status: String,
    pub can_view: bool,
    pub can_submit: bool,
    pub can_approve: bool,
    pub can_reject: bool,
    pub can_delete: bool,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn DocumentStore>, workflow: &WorkflowConfig) -> Self {
        Self {
            monthly: Collection::new(store.clone()),
            weekly: Collection::new(store.clone()),
            daily: Collection::new(store.clone()),
            reports: Collection::new(store.clone()),
            tracker: TrackerService::new(store.clone()),
            cascade: CascadeService::new(store, workflow),
        }
    }

    /// Complete a monthly plan and derive its weekly plans
    pub async fn submit_monthly(&self, id: &str, input: SubmitMonthlyInput) -> AppResult<MonthlySubmission> {
        let mut plan = self.monthly.require(id).await?;
        if plan.status == PlanStatus::Completed {
            return Err(AppError::Precondition(
                "Monthly plan has already been submitted".into(),
            ));
        }

        if let Some(items) = input.items {
            plan.items = normalize_items(items)?;
        }
        if let Some(week_count) = input.week_count {
            validate_week_count(week_count, plan.month, plan.year)
                .map_err(|e| AppError::validation("weekCount", e))?;
            if week_count != plan.week_count && self.has_weekly_plans(&plan.id).await? {
                return Err(AppError::Precondition(
                    "Week count cannot change once weekly plans exist".into(),
                ));
            }
            plan.week_count = week_count;
        }

        let now = Utc::now();
        plan.status = PlanStatus::Completed;
        plan.submitted_at = Some(now);
        plan.updated_at = now;

        let derivation = self.cascade.stage_weekly(&plan).await?;
        if let Err(err) = self
            .tracker
            .update_plan_status(&plan, TrackerTaskType::Monthly, TrackerStatus::Completed, Vec::new())
            .await
        {
            self.cascade.discard(derivation).await;
            return Err(err);
        }

        Ok(MonthlySubmission {
            plan,
            weekly_plans: derivation.plans,
        })
    }

    /// Complete a weekly plan and derive its daily plans
    pub async fn submit_weekly(&self, id: &str, input: SubmitWeeklyInput) -> AppResult<WeeklySubmission> {
        let mut plan = self.weekly.require(id).await?;
        if plan.status == PlanStatus::Completed {
            return Err(AppError::Precondition(
                "Weekly plan has already been submitted".into(),
            ));
        }

        let start = input.week_start_date.unwrap_or(plan.week_start_date);
        let end = input.week_end_date.unwrap_or(plan.week_end_date);
        if start > end {
            return Err(AppError::validation(
                "weekStartDate",
                "Week start date must not be after its end date",
            ));
        }
        plan.week_start_date = start;
        plan.week_end_date = end;

        if let Some(items) = input.items {
            for item in &items {
                validate_item(item)?;
            }
            plan.items = items
                .into_iter()
                .map(|item| ProductionItem {
                    id: if item.id.is_empty() { new_id() } else { item.id.clone() },
                    ..item
                })
                .collect();
        }

        let now = Utc::now();
        plan.status = PlanStatus::Completed;
        plan.submitted_at = Some(now);
        plan.updated_at = now;

        let derivation = self.cascade.stage_daily(&plan).await?;
        if let Err(err) = self
            .tracker
            .update_plan_status(&plan, TrackerTaskType::Weekly, TrackerStatus::Completed, Vec::new())
            .await
        {
            self.cascade.discard(derivation).await;
            return Err(err);
        }

        Ok(WeeklySubmission {
            plan,
            daily_plans: derivation.plans,
        })
    }

    /// Hand a filled daily plan to the plant head for review
    pub async fn submit_daily(&self, id: &str, input: SubmitDailyInput) -> AppResult<DailyPlan> {
        let mut plan = self.daily.require(id).await?;
        if !matches!(plan.status, DailyPlanStatus::Pending | DailyPlanStatus::Rejected) {
            return Err(AppError::Precondition(format!(
                "Daily plan cannot be submitted while {}",
                plan.status.as_str()
            )));
        }
        if input.entries.is_empty() {
            return Err(AppError::validation("entries", "At least one entry is required"));
        }
        validate_plan_entries(&input.entries)
            .map_err(|e| AppError::validation(e.field(), e.to_string()))?;

        let mut entries = Vec::with_capacity(input.entries.len());
        for mut entry in input.entries {
            if entry.id.is_empty() {
                entry.id = new_id();
            }
            entry.target = entry.planned_total().ok_or_else(|| {
                AppError::validation("entries", "Planned quantities exceed the supported range")
            })?;
            entries.push(entry);
        }
        plan.entries = entries;

        let now = Utc::now();
        plan.status = DailyPlanStatus::InProgress;
        plan.submitted_at = Some(now);
        plan.rejected_by = None;
        plan.rejected_at = None;
        plan.rejection_reason = None;
        plan.updated_at = now;

        self.tracker
            .update_plan_status(&plan, TrackerTaskType::Daily, TrackerStatus::InProgress, Vec::new())
            .await?;
        Ok(plan)
    }

    /// Approve a reviewed daily plan and derive its report. Approving a plan
    /// that is already approved returns its existing report.
    pub async fn approve_daily(&self, user: &AuthUser, id: &str) -> AppResult<DailyApproval> {
        let mut plan = self.daily.require(id).await?;

        match plan.status {
            DailyPlanStatus::InProgress => {
                let now = Utc::now();
                plan.status = DailyPlanStatus::Completed;
                plan.approved_by = Some(user.user_id.clone());
                plan.approved_at = Some(now);
                plan.updated_at = now;

                let report = self.cascade.derive_report(&plan).await?;
                self.tracker
                    .update_plan_status(&plan, TrackerTaskType::Daily, TrackerStatus::Completed, Vec::new())
                    .await?;
                Ok(DailyApproval { plan, report })
            }
            DailyPlanStatus::Completed => {
                tracing::warn!("Daily plan {} is already approved", plan.id);
                let report = self.cascade.derive_report(&plan).await?;
                Ok(DailyApproval { plan, report })
            }
            DailyPlanStatus::Pending | DailyPlanStatus::Rejected => Err(AppError::Precondition(
                format!("Daily plan cannot be approved while {}", plan.status.as_str()),
            )),
        }
    }

    pub async fn reject_daily(&self, user: &AuthUser, id: &str, input: RejectDailyInput) -> AppResult<DailyPlan> {
        require_text("reason", &input.reason)?;
        let mut plan = self.daily.require(id).await?;
        if plan.status != DailyPlanStatus::InProgress {
            return Err(AppError::Precondition(format!(
                "Daily plan cannot be rejected while {}",
                plan.status.as_str()
            )));
        }

        let now = Utc::now();
        plan.status = DailyPlanStatus::Rejected;
        plan.rejected_by = Some(user.user_id.clone());
        plan.rejected_at = Some(now);
        plan.rejection_reason = Some(input.reason.trim().to_string());
        plan.updated_at = now;

        self.tracker
            .update_plan_status(&plan, TrackerTaskType::Daily, TrackerStatus::Rejected, Vec::new())
            .await?;
        Ok(plan)
    }

    /// Capability flags for `user` on one plan or report
    pub async fn capabilities(&self, user: &AuthUser, level: TrackerTaskType, id: &str) -> AppResult<Capabilities> {
        let (status, submittable, reviewable) = match level {
            TrackerTaskType::Monthly => {
                let plan = self.monthly.require(id).await?;
                (TrackerStatus::from(plan.status), plan.status == PlanStatus::Pending, false)
            }
            TrackerTaskType::Weekly => {
                let plan = self.weekly.require(id).await?;
                (TrackerStatus::from(plan.status), plan.status == PlanStatus::Pending, false)
            }
            TrackerTaskType::Daily => {
                let plan = self.daily.require(id).await?;
                (
                    TrackerStatus::from(plan.status),
                    matches!(plan.status, DailyPlanStatus::Pending | DailyPlanStatus::Rejected),
                    plan.status == DailyPlanStatus::InProgress,
                )
            }
            TrackerTaskType::Report => {
                let report = self.reports.require(id).await?;
                (TrackerStatus::from(report.status), report.status == PlanStatus::Pending, false)
            }
        };

        let can_review = reviewable && user.has_permission("production", "approve");
        Ok(Capabilities {
            status: status.as_str().to_string(),
            can_view: user.has_permission("production", "read"),
            can_submit: submittable && user.has_permission("production", "update"),
            can_approve: can_review,
            can_reject: can_review,
            can_delete: user.has_permission("production", "delete"),
        })
    }

    async fn has_weekly_plans(&self, monthly_plan_id: &str) -> AppResult<bool> {
        let existing = self
            .weekly
            .find(&Filter::new().eq("monthlyPlanId", monthly_plan_id))
            .await?;
        Ok(!existing.is_empty())
    }
}
