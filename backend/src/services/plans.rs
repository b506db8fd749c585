//! Plan and report stores: creation of monthly plans, lookups, deletes

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, TrackerService};
use crate::config::{Assignee, WorkflowConfig};
use crate::error::{AppError, AppResult};
use crate::models::{
    monthly_key, new_id, ActionPlan, DailyPlan, DailyPlanStatus, DailyReport, MonthlyPlan,
    PlanStatus, ProductionItem, TrackerTaskType, WeeklyPlan,
};
use crate::store::{Collection, Document, DocumentStore, Filter};
use shared::{
    max_week_count, month_name, validate_item_quantity, validate_period, validate_week_count,
};

#[derive(Clone)]
pub struct PlanService {
    store: Arc<dyn DocumentStore>,
    monthly: Collection<MonthlyPlan>,
    weekly: Collection<WeeklyPlan>,
    daily: Collection<DailyPlan>,
    reports: Collection<DailyReport>,
    tracker: TrackerService,
    workflow: WorkflowConfig,
}

/// Input for creating a monthly plan
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMonthlyInput {
    pub month: u32,
    pub year: i32,
    pub week_count: Option<u32>,
    #[serde(default)]
    pub items: Vec<ProductionItem>,
}

/// Documents removed by a full clear
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearSummary {
    pub monthly_plans: u64,
    pub weekly_plans: u64,
    pub daily_plans: u64,
    pub daily_reports: u64,
    pub action_plans: u64,
    pub tasks: u64,
}

/// An item line must name what is produced and keep its quantities in range
pub(crate) fn validate_item(item: &ProductionItem) -> AppResult<()> {
    require_text("itemCode", &item.item_code)?;
    require_text("itemName", &item.item_name)?;
    std::iter::once(item.monthly_quantity)
        .chain(item.weekly_quantities.values().copied())
        .try_for_each(validate_item_quantity)
        .map_err(|e| AppError::validation("items", e))
}

/// Item lines are validated; ids are reassigned and derived quantities dropped.
pub(crate) fn normalize_items(items: Vec<ProductionItem>) -> AppResult<Vec<ProductionItem>> {
    items
        .into_iter()
        .map(|item| {
            validate_item(&item)?;
            Ok(ProductionItem {
                id: new_id(),
                weekly_quantities: Default::default(),
                ..item
            })
        })
        .collect()
}

impl PlanService {
    pub fn new(store: Arc<dyn DocumentStore>, workflow: &WorkflowConfig) -> Self {
        Self {
            monthly: Collection::new(store.clone()),
            weekly: Collection::new(store.clone()),
            daily: Collection::new(store.clone()),
            reports: Collection::new(store.clone()),
            tracker: TrackerService::new(store.clone()),
            workflow: workflow.clone(),
            store,
        }
    }

    // ------------------------------------------------------------------
    // Monthly
    // ------------------------------------------------------------------

    /// Create the plan for a period on behalf of `assigned_to`
    pub async fn create_monthly(&self, assigned_to: &str, input: CreateMonthlyInput) -> AppResult<MonthlyPlan> {
        validate_period(input.month, input.year).map_err(|e| AppError::validation("month", e))?;
        let week_count = input
            .week_count
            .unwrap_or_else(|| max_week_count(input.year, input.month));
        validate_week_count(week_count, input.month, input.year)
            .map_err(|e| AppError::validation("weekCount", e))?;

        let assignee = Assignee {
            user_id: assigned_to.to_string(),
            role_id: self.workflow.assignees.production_manager.role_id.clone(),
        };
        let deadline = Utc::now() + Duration::days(self.workflow.monthly_deadline_days);
        let plan = Self::monthly_draft(
            input.month,
            input.year,
            week_count,
            normalize_items(input.items)?,
            &assignee,
            deadline,
        );

        let (plan, created) = self.insert_monthly(plan).await?;
        if !created {
            return Err(AppError::Duplicate(format!(
                "Monthly plan for {} {}",
                month_name(plan.month),
                plan.year
            )));
        }

        tracing::info!("Created monthly plan {} for {}/{}", plan.id, plan.month, plan.year);
        Ok(plan)
    }

    /// Empty plan for a period created by the scheduler. Returns the existing
    /// plan untouched if the period already has one.
    pub async fn create_scheduled(&self, month: u32, year: i32, now: DateTime<Utc>) -> AppResult<(MonthlyPlan, bool)> {
        validate_period(month, year).map_err(|e| AppError::ValidationError(e.into()))?;
        let week_count = self.workflow.default_week_count.min(max_week_count(year, month));
        let deadline = now + Duration::days(self.workflow.scheduled_monthly_deadline_days);
        let plan = Self::monthly_draft(
            month,
            year,
            week_count,
            Vec::new(),
            &self.workflow.assignees.production_manager,
            deadline,
        );
        self.insert_monthly(plan).await
    }

    pub async fn list_monthly(&self) -> AppResult<Vec<MonthlyPlan>> {
        let mut plans = self.monthly.all().await?;
        plans.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(plans)
    }

    pub async fn get_monthly(&self, id: &str) -> AppResult<MonthlyPlan> {
        self.monthly.require(id).await
    }

    pub async fn monthly_for_period(&self, month: u32, year: i32) -> AppResult<Option<MonthlyPlan>> {
        Ok(self.monthly.get_by_key(&monthly_key(month, year)).await?)
    }

    pub async fn delete_monthly(&self, id: &str) -> AppResult<()> {
        self.delete_with_task::<MonthlyPlan>(id, TrackerTaskType::Monthly).await
    }

    // ------------------------------------------------------------------
    // Weekly
    // ------------------------------------------------------------------

    pub async fn list_weekly(&self) -> AppResult<Vec<WeeklyPlan>> {
        let mut plans = self.weekly.all().await?;
        plans.sort_by(|a, b| (b.year, b.month, a.week_number).cmp(&(a.year, a.month, b.week_number)));
        Ok(plans)
    }

    pub async fn get_weekly(&self, id: &str) -> AppResult<WeeklyPlan> {
        self.weekly.require(id).await
    }

    pub async fn weekly_for_monthly(&self, monthly_plan_id: &str) -> AppResult<Vec<WeeklyPlan>> {
        let mut plans = self
            .weekly
            .find(&Filter::new().eq("monthlyPlanId", monthly_plan_id))
            .await?;
        plans.sort_by_key(|p| p.week_number);
        Ok(plans)
    }

    pub async fn delete_weekly(&self, id: &str) -> AppResult<()> {
        self.delete_with_task::<WeeklyPlan>(id, TrackerTaskType::Weekly).await
    }

    // ------------------------------------------------------------------
    // Daily
    // ------------------------------------------------------------------

    pub async fn list_daily(&self) -> AppResult<Vec<DailyPlan>> {
        let mut plans = self.daily.all().await?;
        plans.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(plans)
    }

    pub async fn get_daily(&self, id: &str) -> AppResult<DailyPlan> {
        self.daily.require(id).await
    }

    pub async fn daily_for_weekly(&self, weekly_plan_id: &str) -> AppResult<Vec<DailyPlan>> {
        let mut plans = self
            .daily
            .find(&Filter::new().eq("weeklyPlanId", weekly_plan_id))
            .await?;
        plans.sort_by_key(|p| p.day_number);
        Ok(plans)
    }

    pub async fn daily_by_status(&self, status: DailyPlanStatus) -> AppResult<Vec<DailyPlan>> {
        let mut plans = self
            .daily
            .find(&Filter::new().eq("status", status.as_str()))
            .await?;
        plans.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(plans)
    }

    pub async fn delete_daily(&self, id: &str) -> AppResult<()> {
        self.delete_with_task::<DailyPlan>(id, TrackerTaskType::Daily).await
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    pub async fn list_reports(&self) -> AppResult<Vec<DailyReport>> {
        let mut reports = self.reports.all().await?;
        reports.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(reports)
    }

    pub async fn get_report(&self, id: &str) -> AppResult<DailyReport> {
        self.reports.require(id).await
    }

    pub async fn report_for_daily(&self, daily_plan_id: &str) -> AppResult<DailyReport> {
        self.reports
            .get_by_key(daily_plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(DailyReport::LABEL.into()))
    }

    pub async fn delete_report(&self, id: &str) -> AppResult<()> {
        self.delete_with_task::<DailyReport>(id, TrackerTaskType::Report).await
    }

    /// Remove every plan, report, action plan and tracker task
    pub async fn clear_all(&self) -> AppResult<ClearSummary> {
        let summary = ClearSummary {
            monthly_plans: self.monthly.clear().await?,
            weekly_plans: self.weekly.clear().await?,
            daily_plans: self.daily.clear().await?,
            daily_reports: self.reports.clear().await?,
            action_plans: Collection::<ActionPlan>::new(self.store.clone()).clear().await?,
            tasks: self.tracker.clear().await?,
        };
        tracing::warn!("Cleared all production data: {:?}", summary);
        Ok(summary)
    }

    fn monthly_draft(
        month: u32,
        year: i32,
        week_count: u32,
        items: Vec<ProductionItem>,
        assignee: &Assignee,
        deadline: DateTime<Utc>,
    ) -> MonthlyPlan {
        let now = Utc::now();
        MonthlyPlan {
            id: new_id(),
            title: format!("Monthly Production Plan - {} {}", month_name(month), year),
            month,
            year,
            status: PlanStatus::Pending,
            assigned_to: assignee.user_id.clone(),
            assigned_role: assignee.role_id.clone(),
            deadline,
            week_count,
            items,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lookup-or-create the plan for its period, then make sure it has a
    /// tracker task. A plan created here is removed again if its task cannot
    /// be written.
    async fn insert_monthly(&self, plan: MonthlyPlan) -> AppResult<(MonthlyPlan, bool)> {
        let (stored, created) = self.monthly.insert_unique(&plan).await?;

        let assignee = Assignee {
            user_id: stored.assigned_to.clone(),
            role_id: stored.assigned_role.clone(),
        };
        let task = TrackerService::draft(
            TrackerTaskType::Monthly,
            &stored.id,
            stored.title.clone(),
            &assignee,
            stored.deadline,
        );
        if let Err(err) = self.tracker.ensure(&task).await {
            if created {
                if let Err(e) = self.monthly.delete(&stored.id).await {
                    tracing::error!("Failed to roll back monthly plan {}: {}", stored.id, e);
                }
            }
            return Err(err);
        }

        Ok((stored, created))
    }

    async fn delete_with_task<P: Document>(&self, id: &str, task_type: TrackerTaskType) -> AppResult<()> {
        Collection::<P>::new(self.store.clone()).require(id).await?;

        let mut ops = vec![Collection::<P>::delete_op(id)];
        ops.extend(self.tracker.delete_op_for(task_type, id).await?);
        self.store.apply(ops).await?;

        tracing::info!("Deleted {} {}", P::LABEL, id);
        Ok(())
    }
}
