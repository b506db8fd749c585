//! Daily report submission and the corrective-action trigger

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ActionPlanService, TrackerService};
use crate::error::{AppError, AppResult};
use crate::models::{
    new_id, ActionPlan, DailyReport, PlanStatus, ProductionEntry, TrackerStatus, TrackerTaskType,
};
use crate::store::{Collection, DocumentStore};
use shared::{round_percentage, validate_plan_entries, validate_report_entry, EntryValidationError};

#[derive(Clone)]
pub struct ReportService {
    reports: Collection<DailyReport>,
    tracker: TrackerService,
    action_plans: ActionPlanService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportInput {
    pub entries: Vec<ProductionEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedReport {
    pub report: DailyReport,
    pub action_plans: Vec<ActionPlan>,
}

fn entry_error(err: EntryValidationError) -> AppError {
    AppError::validation(err.field(), err.to_string())
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>, action_plans: ActionPlanService) -> Self {
        Self {
            reports: Collection::new(store.clone()),
            tracker: TrackerService::new(store),
            action_plans,
        }
    }

    /// Record actuals for a pending report.
    ///
    /// Every entry is validated before anything is written; an entry below
    /// the achievement threshold must carry its corrective fields and yields
    /// one action plan. The action plans, the completed report and its
    /// tracker task are committed together.
    pub async fn submit(&self, id: &str, input: SubmitReportInput) -> AppResult<SubmittedReport> {
        let mut report = self.reports.require(id).await?;
        if report.status != PlanStatus::Pending {
            return Err(AppError::Precondition(
                "Daily report has already been submitted".into(),
            ));
        }
        if input.entries.is_empty() {
            return Err(AppError::validation("entries", "At least one entry is required"));
        }
        validate_plan_entries(&input.entries).map_err(entry_error)?;

        let mut entries = Vec::with_capacity(input.entries.len());
        let mut percentages = Vec::with_capacity(input.entries.len());
        for mut entry in input.entries {
            if let Some(total) = entry.planned_total().filter(|total| *total > 0) {
                entry.target = total;
            }
            let percentage = validate_report_entry(&entry).map_err(entry_error)?;

            if entry.id.is_empty() {
                entry.id = new_id();
            }
            entry.actual_production = entry.reported_actual();
            entry.production_percentage = Some(round_percentage(percentage));
            entries.push(entry);
            percentages.push(percentage);
        }

        let now = Utc::now();
        report.entries = entries;
        report.status = PlanStatus::Completed;
        report.submitted_at = Some(now);
        report.updated_at = now;

        let action_plans = self.action_plans.build_for_report(&report, &percentages);
        let ops = self.action_plans.insert_ops(&action_plans)?;
        self.tracker
            .update_plan_status(&report, TrackerTaskType::Report, TrackerStatus::Completed, ops)
            .await?;

        tracing::info!(
            "Submitted report {} with {} action plan(s)",
            report.id,
            action_plans.len()
        );
        Ok(SubmittedReport {
            report,
            action_plans,
        })
    }
}
