//! Monthly trigger: creates next month's empty plan on a fixed day
//!
//! The schedule is expressed in a fixed UTC offset. A background task sleeps
//! until the next fire instant, runs [`MonthlyScheduler::trigger_at`], and
//! repeats. The trigger is idempotent, so a manual run through the HTTP
//! surface and the timer may overlap safely.

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::PlanService;
use crate::config::SchedulerConfig;
use crate::error::AppResult;
use crate::models::MonthlyPlan;
use shared::{days_in_month, next_period};

#[derive(Clone)]
pub struct MonthlyScheduler {
    plans: PlanService,
    config: SchedulerConfig,
    last_run: Arc<RwLock<Option<LastRun>>>,
}

/// Result of one trigger run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TriggerOutcome {
    Created { plan: MonthlyPlan },
    AlreadyExists { plan: MonthlyPlan },
}

impl TriggerOutcome {
    pub fn plan(&self) -> &MonthlyPlan {
        match self {
            TriggerOutcome::Created { plan } | TriggerOutcome::AlreadyExists { plan } => plan,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    pub at: DateTime<Utc>,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub initialized: bool,
    pub schedule: String,
    pub last_run: Option<LastRun>,
    pub next_run: Option<DateTime<Utc>>,
}

impl MonthlyScheduler {
    pub fn new(plans: PlanService, config: SchedulerConfig) -> Self {
        Self {
            plans,
            config,
            last_run: Arc::new(RwLock::new(None)),
        }
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.config.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Human-readable schedule, e.g. `day 4 of every month at 16:58 (UTC+05:30)`
    pub fn schedule(&self) -> String {
        format!(
            "day {} of every month at {:02}:{:02} (UTC{})",
            self.config.day_of_month,
            self.config.hour,
            self.config.minute,
            self.offset()
        )
    }

    /// The first fire instant strictly after `now`
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let offset = self.offset();
        let local = now.with_timezone(&offset);

        let this_month = self.fire_in(local.year(), local.month(), offset)?;
        if this_month > now {
            return Some(this_month);
        }
        let (year, month) = next_period(local.year(), local.month());
        self.fire_in(year, month, offset)
    }

    /// Fire instant within one month; the day is capped at the month's length
    fn fire_in(&self, year: i32, month: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let day = self.config.day_of_month.clamp(1, days_in_month(year, month)?);
        let local = NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(self.config.hour, self.config.minute, 0)?;
        offset
            .from_local_datetime(&local)
            .single()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Create the plan for the month after `now` (in the schedule's offset)
    /// unless it already exists.
    pub async fn trigger_at(&self, now: DateTime<Utc>) -> AppResult<TriggerOutcome> {
        let local = now.with_timezone(&self.offset());
        let (year, month) = next_period(local.year(), local.month());

        let result = self.plans.create_scheduled(month, year, now).await;
        let record = match &result {
            Ok((plan, created)) => LastRun {
                at: now,
                outcome: if *created { "created" } else { "alreadyExists" }.into(),
                plan_id: Some(plan.id.clone()),
                error: None,
            },
            Err(e) => LastRun {
                at: now,
                outcome: "failed".into(),
                plan_id: None,
                error: Some(e.to_string()),
            },
        };
        *self.last_run.write().await = Some(record);

        match result {
            Ok((plan, true)) => {
                tracing::info!("Scheduled trigger created monthly plan {} for {}/{}", plan.id, month, year);
                Ok(TriggerOutcome::Created { plan })
            }
            Ok((plan, false)) => {
                tracing::warn!("Monthly plan for {}/{} already exists, nothing to do", month, year);
                Ok(TriggerOutcome::AlreadyExists { plan })
            }
            Err(e) => {
                tracing::error!("Scheduled trigger for {}/{} failed: {}", month, year, e);
                Err(e)
            }
        }
    }

    pub async fn status(&self, now: DateTime<Utc>) -> SchedulerStatus {
        SchedulerStatus {
            initialized: self.config.enabled,
            schedule: self.schedule(),
            last_run: self.last_run.read().await.clone(),
            next_run: self
                .config
                .enabled
                .then(|| self.next_fire_after(now))
                .flatten(),
        }
    }

    /// Run the trigger on schedule until the runtime shuts down
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Monthly scheduler started: {}", self.schedule());
            loop {
                let now = Utc::now();
                let Some(next) = self.next_fire_after(now) else {
                    tracing::error!("Could not compute the next run of {}", self.schedule());
                    return;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                tracing::debug!("Next monthly trigger at {}", next);
                tokio::time::sleep(wait).await;

                // Errors are recorded in the last run and logged by trigger_at
                let _ = self.trigger_at(Utc::now()).await;
            }
        })
    }
}
