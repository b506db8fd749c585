//! Plan cascade: derives the next level of plans from a completed parent
//!
//! Every child is one atomic lookup-or-create on its natural key, so repeated
//! or concurrent derivation for the same parent converges on one set of
//! children. Siblings are created concurrently; if any of them fails, the
//! documents created by that call are removed again before the error is
//! returned. Children that already existed are never touched.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;

use super::TrackerService;
use crate::config::{Assignee, WorkflowConfig};
use crate::error::{AppError, AppResult};
use crate::models::{
    new_id, DailyPlan, DailyPlanStatus, DailyReport, MonthlyPlan, PlanStatus, ProductionEntry,
    ProductionItem, ProductionTask, TrackerTaskType, WeeklyPlan,
};
use crate::store::{Collection, Document, DocumentStore, WriteOp};
use shared::{daily_quantity, distribute_week, split_shifts, week_ranges, WeekRange};

const DEFAULT_DEPARTMENT: &str = "Production";
const DEFAULT_OPERATOR: &str = "Production Team";

#[derive(Clone)]
pub struct CascadeService {
    store: Arc<dyn DocumentStore>,
    tracker: TrackerService,
    workflow: WorkflowConfig,
}

/// A child returned by one derivation call, with the writes that undo
/// whatever this call created for it
struct Derived<P> {
    plan: P,
    undo: Vec<WriteOp>,
}

/// Children of one derivation call and the writes that undo what it created
pub struct Derivation<P> {
    pub plans: Vec<P>,
    undo: Vec<WriteOp>,
}

/// Tracker task parameters for a child
struct TaskSpec<'a> {
    task_type: TrackerTaskType,
    title: String,
    assignee: &'a Assignee,
    deadline: DateTime<Utc>,
}

impl CascadeService {
    pub fn new(store: Arc<dyn DocumentStore>, workflow: &WorkflowConfig) -> Self {
        Self {
            tracker: TrackerService::new(store.clone()),
            workflow: workflow.clone(),
            store,
        }
    }

    /// One weekly plan per week of a completed monthly plan
    pub async fn derive_weekly(&self, monthly: &MonthlyPlan) -> AppResult<Vec<WeeklyPlan>> {
        Ok(self.stage_weekly(monthly).await?.plans)
    }

    /// One daily plan per working day of a completed weekly plan
    pub async fn derive_daily(&self, weekly: &WeeklyPlan) -> AppResult<Vec<DailyPlan>> {
        Ok(self.stage_daily(weekly).await?.plans)
    }

    /// Remove what a derivation created, when its parent could not be committed
    pub async fn discard<P>(&self, derivation: Derivation<P>) {
        self.compensate(derivation.undo).await;
    }

    pub async fn stage_weekly(&self, monthly: &MonthlyPlan) -> AppResult<Derivation<WeeklyPlan>> {
        if monthly.status != PlanStatus::Completed {
            return Err(AppError::Precondition(
                "Monthly plan must be completed before weekly plans are derived".into(),
            ));
        }

        let weeks = week_ranges(monthly.year, monthly.month, monthly.week_count);
        if weeks.is_empty() {
            return Err(AppError::validation(
                "weekCount",
                format!(
                    "Week count {} does not fit {}/{}",
                    monthly.week_count, monthly.month, monthly.year
                ),
            ));
        }

        let now = Utc::now();
        let assignee = &self.workflow.assignees.production_manager;
        let deadline = now + Duration::days(self.workflow.weekly_deadline_days);

        let children = weeks.iter().map(move |week| {
            let draft = self.weekly_draft(monthly, week, assignee, now);
            let spec = TaskSpec {
                task_type: TrackerTaskType::Weekly,
                title: draft.title.clone(),
                assignee,
                deadline,
            };
            self.derive_child(draft, spec)
        });
        let mut derivation = self.settle(join_all(children).await).await?;
        derivation.plans.sort_by_key(|p| p.week_number);

        tracing::info!(
            "Derived {} weekly plans from monthly plan {}",
            derivation.plans.len(),
            monthly.id
        );
        Ok(derivation)
    }

    pub async fn stage_daily(&self, weekly: &WeeklyPlan) -> AppResult<Derivation<DailyPlan>> {
        if weekly.status != PlanStatus::Completed {
            return Err(AppError::Precondition(
                "Weekly plan must be completed before daily plans are derived".into(),
            ));
        }

        let now = Utc::now();
        let assignee = &self.workflow.assignees.production_manager;
        let deadline = now + Duration::hours(self.workflow.daily_deadline_hours);
        let week = WeekRange {
            number: weekly.week_number,
            start: weekly.week_start_date,
            end: weekly.week_end_date,
        };

        let week = &week;
        let children = (1..=self.workflow.days_per_week).map(move |day| {
            let draft = self.daily_draft(weekly, week, day, assignee, now);
            let spec = TaskSpec {
                task_type: TrackerTaskType::Daily,
                title: draft.title.clone(),
                assignee,
                deadline,
            };
            self.derive_child(draft, spec)
        });
        let mut derivation = self.settle(join_all(children).await).await?;
        derivation.plans.sort_by_key(|p| p.day_number);

        tracing::info!(
            "Derived {} daily plans from weekly plan {}",
            derivation.plans.len(),
            weekly.id
        );
        Ok(derivation)
    }

    /// The report of an approved daily plan; the existing one if already derived
    pub async fn derive_report(&self, daily: &DailyPlan) -> AppResult<DailyReport> {
        if daily.status != DailyPlanStatus::Completed {
            return Err(AppError::Precondition(
                "Daily plan must be approved before its report is derived".into(),
            ));
        }

        let now = Utc::now();
        let assignee = &self.workflow.assignees.production_manager;
        let report = DailyReport {
            id: new_id(),
            title: format!("Daily Production Report - {}", daily.title),
            daily_plan_id: daily.id.clone(),
            date: daily.date,
            status: PlanStatus::Pending,
            assigned_to: assignee.user_id.clone(),
            assigned_role: assignee.role_id.clone(),
            entries: daily
                .entries
                .iter()
                .map(|entry| entry.for_report(new_id()))
                .collect(),
            submitted_at: None,
            created_at: now,
            updated_at: now,
        };
        let spec = TaskSpec {
            task_type: TrackerTaskType::Report,
            title: report.title.clone(),
            assignee,
            deadline: now + Duration::hours(self.workflow.report_deadline_hours),
        };

        let derived = self.derive_child(report, spec).await?;
        if derived.undo.is_empty() {
            tracing::warn!("Report for daily plan {} already exists", daily.id);
        } else {
            tracing::info!("Derived report {} from daily plan {}", derived.plan.id, daily.id);
        }
        Ok(derived.plan)
    }

    fn weekly_draft(
        &self,
        monthly: &MonthlyPlan,
        week: &WeekRange,
        assignee: &Assignee,
        now: DateTime<Utc>,
    ) -> WeeklyPlan {
        let items = monthly
            .items
            .iter()
            .map(|item| ProductionItem {
                id: new_id(),
                weekly_quantities: distribute_week(
                    item.monthly_quantity,
                    monthly.week_count,
                    week,
                    self.workflow.days_per_week,
                ),
                ..item.clone()
            })
            .collect();

        WeeklyPlan {
            id: new_id(),
            title: format!("Weekly Production Plan - Week {}", week.number),
            week_number: week.number,
            week_start_date: week.start,
            week_end_date: week.end,
            month: monthly.month,
            year: monthly.year,
            status: PlanStatus::Pending,
            monthly_plan_id: monthly.id.clone(),
            assigned_to: assignee.user_id.clone(),
            assigned_role: assignee.role_id.clone(),
            items,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn daily_draft(
        &self,
        weekly: &WeeklyPlan,
        week: &WeekRange,
        day_number: u32,
        assignee: &Assignee,
        now: DateTime<Utc>,
    ) -> DailyPlan {
        let fallback_days = self.workflow.default_week_count * self.workflow.days_per_week;
        let entries = weekly
            .items
            .iter()
            .map(|item| {
                let shifts = split_shifts(daily_quantity(item, day_number, fallback_days));
                ProductionEntry {
                    id: new_id(),
                    dept_name: DEFAULT_DEPARTMENT.into(),
                    operator_name: DEFAULT_OPERATOR.into(),
                    work: format!("Production of {}", item.item_name),
                    item_code: Some(item.item_code.clone()),
                    h1_plan: shifts.h1,
                    h2_plan: shifts.h2,
                    ot_plan: shifts.ot,
                    target: shifts.total(),
                    ..Default::default()
                }
            })
            .collect();

        DailyPlan {
            id: new_id(),
            title: format!(
                "Daily Production Plan - Day {} (Week {})",
                day_number, weekly.week_number
            ),
            day_number,
            date: week.day(day_number),
            week_number: weekly.week_number,
            weekly_plan_id: weekly.id.clone(),
            status: DailyPlanStatus::Pending,
            assigned_to: assignee.user_id.clone(),
            assigned_role: assignee.role_id.clone(),
            entries,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lookup-or-create one child and its tracker task. If the task cannot be
    /// written, a child created here is removed again.
    async fn derive_child<P: Document>(&self, draft: P, spec: TaskSpec<'_>) -> AppResult<Derived<P>> {
        let (plan, created) = Collection::<P>::new(self.store.clone())
            .insert_unique(&draft)
            .await?;

        let mut undo = Vec::new();
        if created {
            undo.push(Collection::<P>::delete_op(plan.id()));
        } else {
            tracing::debug!("{} {} already exists, reusing it", P::LABEL, plan.id());
        }

        let task = TrackerService::draft(
            spec.task_type,
            plan.id(),
            spec.title,
            spec.assignee,
            spec.deadline,
        );
        match self.tracker.ensure(&task).await {
            Ok((task, true)) => undo.push(Collection::<ProductionTask>::delete_op(&task.id)),
            Ok((_, false)) => {}
            Err(err) => {
                self.compensate(undo).await;
                return Err(err);
            }
        }

        Ok(Derived { plan, undo })
    }

    /// All children, or the first error after undoing what the call created
    async fn settle<P>(&self, results: Vec<AppResult<Derived<P>>>) -> AppResult<Derivation<P>> {
        let mut plans = Vec::with_capacity(results.len());
        let mut undo = Vec::new();
        let mut failure = None;

        for result in results {
            match result {
                Ok(derived) => {
                    undo.extend(derived.undo);
                    plans.push(derived.plan);
                }
                Err(err) if failure.is_none() => failure = Some(err),
                Err(err) => tracing::error!("Additional derivation failure: {}", err),
            }
        }

        match failure {
            Some(err) => {
                self.compensate(undo).await;
                Err(err)
            }
            None => Ok(Derivation { plans, undo }),
        }
    }

    async fn compensate(&self, undo: Vec<WriteOp>) {
        if undo.is_empty() {
            return;
        }
        let count = undo.len();
        match self.store.apply(undo).await {
            Ok(()) => tracing::warn!("Rolled back {} documents of a failed derivation", count),
            Err(e) => tracing::error!("Rollback of {} documents failed: {}", count, e),
        }
    }
}
