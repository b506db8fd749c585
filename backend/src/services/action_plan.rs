//! Corrective-action plans raised by low-achievement report entries

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::require_text;
use crate::error::AppResult;
use crate::models::{new_id, ActionPlan, ActionPlanStatus, DailyReport};
use crate::store::{Collection, DocumentStore, Filter, StoreResult, WriteOp};
use shared::{requires_action_plan, round_percentage};

#[derive(Clone)]
pub struct ActionPlanService {
    plans: Collection<ActionPlan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActionPlanInput {
    pub status: Option<ActionPlanStatus>,
    pub reason: Option<String>,
    pub corrective_actions: Option<String>,
    pub responsible_person: Option<String>,
    pub target_completion_date: Option<String>,
}

impl ActionPlanService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            plans: Collection::new(store),
        }
    }

    /// Action plans for every entry of `report` below the achievement
    /// threshold. Entries must already be validated and carry their
    /// unrounded `percentages`, index for index.
    pub fn build_for_report(&self, report: &DailyReport, percentages: &[f64]) -> Vec<ActionPlan> {
        let now = Utc::now();
        report
            .entries
            .iter()
            .zip(percentages)
            .filter(|(_, percentage)| requires_action_plan(**percentage))
            .map(|(entry, percentage)| ActionPlan {
                id: new_id(),
                daily_report_id: report.id.clone(),
                daily_plan_id: report.daily_plan_id.clone(),
                department: entry.dept_name.clone(),
                operator: entry.operator_name.clone(),
                target_production: entry.target,
                actual_production: entry.actual_production.unwrap_or(0),
                achievement_percentage: round_percentage(*percentage),
                reason: text(&entry.reason),
                corrective_actions: text(&entry.corrective_actions),
                responsible_person: text(&entry.responsible_person),
                target_completion_date: text(&entry.target_completion_date),
                status: ActionPlanStatus::Pending,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    /// Batch writes persisting freshly built action plans
    pub fn insert_ops(&self, plans: &[ActionPlan]) -> StoreResult<Vec<WriteOp>> {
        plans.iter().map(Collection::<ActionPlan>::insert_op).collect()
    }

    pub async fn list(&self) -> AppResult<Vec<ActionPlan>> {
        let mut plans = self.plans.all().await?;
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }

    pub async fn get(&self, id: &str) -> AppResult<ActionPlan> {
        self.plans.require(id).await
    }

    pub async fn by_report(&self, daily_report_id: &str) -> AppResult<Vec<ActionPlan>> {
        Ok(self
            .plans
            .find(&Filter::new().eq("dailyReportId", daily_report_id))
            .await?)
    }

    pub async fn update(&self, id: &str, input: UpdateActionPlanInput) -> AppResult<ActionPlan> {
        let mut plan = self.plans.require(id).await?;

        if let Some(status) = input.status {
            plan.status = status;
        }
        if let Some(reason) = input.reason {
            require_text("reason", &reason)?;
            plan.reason = reason;
        }
        if let Some(actions) = input.corrective_actions {
            require_text("correctiveActions", &actions)?;
            plan.corrective_actions = actions;
        }
        if let Some(person) = input.responsible_person {
            require_text("responsiblePerson", &person)?;
            plan.responsible_person = person;
        }
        if let Some(date) = input.target_completion_date {
            require_text("targetCompletionDate", &date)?;
            plan.target_completion_date = date;
        }
        plan.updated_at = Utc::now();

        self.plans.replace(&plan).await?;
        tracing::info!("Updated action plan {} ({:?})", plan.id, plan.status);
        Ok(plan)
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{production_percentage, PlanStatus, ProductionEntry};

    fn report(entries: Vec<ProductionEntry>) -> DailyReport {
        let now = Utc::now();
        DailyReport {
            id: "r1".into(),
            title: "Daily Production Report".into(),
            daily_plan_id: "d1".into(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            status: PlanStatus::Pending,
            assigned_to: "pm".into(),
            assigned_role: "production_manager".into(),
            entries,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_only_for_low_achievement() {
        let low = ProductionEntry {
            dept_name: "Assembly".into(),
            operator_name: "Ravi".into(),
            target: 300,
            actual_production: Some(200),
            reason: Some(" Line stoppage ".into()),
            corrective_actions: Some("Spare motor".into()),
            responsible_person: Some("Anil".into()),
            target_completion_date: Some("2025-09-05".into()),
            ..Default::default()
        };
        let fine = ProductionEntry {
            dept_name: "Packing".into(),
            operator_name: "Meera".into(),
            target: 100,
            actual_production: Some(90),
            ..Default::default()
        };
        let report = report(vec![low, fine]);
        let percentages: Vec<f64> = report
            .entries
            .iter()
            .map(|e| production_percentage(e.reported_actual().unwrap_or(0), e.target))
            .collect();

        let service = ActionPlanService::new(Arc::new(crate::store::MemoryStore::new()));
        let plans = service.build_for_report(&report, &percentages);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].department, "Assembly");
        assert_eq!(plans[0].achievement_percentage, 66.67);
        assert_eq!(plans[0].reason, "Line stoppage");
        assert_eq!(plans[0].daily_report_id, "r1");
        assert_eq!(plans[0].status, ActionPlanStatus::Pending);
    }
}
