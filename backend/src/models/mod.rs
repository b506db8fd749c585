//! Persistence bindings for the production planning models
//!
//! Re-exports models from the shared crate and maps each onto its document
//! collection and natural key.

pub use shared::models::*;

use crate::store::Document;

impl Document for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(format!("uid:{}", self.uid))
    }
}

impl Document for Role {
    const COLLECTION: &'static str = "roles";
    const LABEL: &'static str = "Role";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Permission {
    const COLLECTION: &'static str = "permissions";
    const LABEL: &'static str = "Permission";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(self.key())
    }
}

impl Document for Project {
    const COLLECTION: &'static str = "projects";
    const LABEL: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Task {
    const COLLECTION: &'static str = "tasks";
    const LABEL: &'static str = "Task";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for MonthlyPlan {
    const COLLECTION: &'static str = "monthly_plans";
    const LABEL: &'static str = "Monthly plan";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(monthly_key(self.month, self.year))
    }
}

impl Document for WeeklyPlan {
    const COLLECTION: &'static str = "weekly_plans";
    const LABEL: &'static str = "Weekly plan";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(format!("{}#w{}", self.monthly_plan_id, self.week_number))
    }
}

impl Document for DailyPlan {
    const COLLECTION: &'static str = "daily_plans";
    const LABEL: &'static str = "Daily plan";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(format!("{}#d{}", self.weekly_plan_id, self.day_number))
    }
}

impl Document for DailyReport {
    const COLLECTION: &'static str = "daily_reports";
    const LABEL: &'static str = "Daily report";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(self.daily_plan_id.clone())
    }
}

impl Document for ActionPlan {
    const COLLECTION: &'static str = "action_plans";
    const LABEL: &'static str = "Action plan";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for ProductionTask {
    const COLLECTION: &'static str = "production_tasks";
    const LABEL: &'static str = "Production task";

    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> Option<String> {
        Some(tracker_key(self.task_type, &self.plan_id))
    }
}

/// Natural key of the monthly plan for a period
pub fn monthly_key(month: u32, year: i32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Natural key of the tracker task following a plan or report
pub fn tracker_key(task_type: TrackerTaskType, plan_id: &str) -> String {
    format!("{}:{}", task_type.as_str(), plan_id)
}

/// Fresh opaque identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
