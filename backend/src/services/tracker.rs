//! Tracker tasks: one work item per plan or report instance
//!
//! Plan status changes go through [`TrackerService::update_plan_status`],
//! which writes the plan and its tracker task in one atomic batch so the two
//! cannot drift apart.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Assignee;
use crate::error::{AppError, AppResult};
use crate::models::{
    new_id, tracker_key, ProductionTask, TaskAudience, TrackerStatus, TrackerTaskType,
};
use crate::store::{Collection, Document, DocumentStore, Filter, WriteOp};

#[derive(Clone)]
pub struct TrackerService {
    store: Arc<dyn DocumentStore>,
    tasks: Collection<ProductionTask>,
}

impl TrackerService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            tasks: Collection::new(store.clone()),
            store,
        }
    }

    /// A pending task for `plan_id`, not yet persisted
    pub fn draft(
        task_type: TrackerTaskType,
        plan_id: &str,
        title: String,
        assignee: &Assignee,
        deadline: DateTime<Utc>,
    ) -> ProductionTask {
        let now = Utc::now();
        ProductionTask {
            id: new_id(),
            task_type,
            title,
            description: None,
            status: TrackerStatus::Pending,
            assigned_to: assignee.user_id.clone(),
            assigned_role: assignee.role_id.clone(),
            plan_id: plan_id.to_string(),
            deadline,
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create the task unless one already tracks the same plan. Returns the
    /// stored task and whether this call created it.
    pub async fn ensure(&self, task: &ProductionTask) -> AppResult<(ProductionTask, bool)> {
        let (stored, created) = self.tasks.insert_unique(task).await?;
        if created {
            tracing::debug!("Created {} task {} for plan {}", stored.task_type.as_str(), stored.id, stored.plan_id);
        }
        Ok((stored, created))
    }

    pub async fn get(&self, id: &str) -> AppResult<ProductionTask> {
        self.tasks.require(id).await
    }

    pub async fn for_plan(&self, task_type: TrackerTaskType, plan_id: &str) -> AppResult<Option<ProductionTask>> {
        Ok(self.tasks.get_by_key(&tracker_key(task_type, plan_id)).await?)
    }

    pub async fn list(&self, audience: TaskAudience) -> AppResult<Vec<ProductionTask>> {
        self.query(audience, Filter::new()).await
    }

    pub async fn by_type(&self, audience: TaskAudience, task_type: TrackerTaskType) -> AppResult<Vec<ProductionTask>> {
        self.query(audience, Filter::new().eq("type", task_type.as_str()))
            .await
    }

    pub async fn by_status(&self, audience: TaskAudience, status: TrackerStatus) -> AppResult<Vec<ProductionTask>> {
        self.query(audience, Filter::new().eq("status", status.as_str()))
            .await
    }

    pub async fn by_assignee(&self, audience: TaskAudience, user_id: &str) -> AppResult<Vec<ProductionTask>> {
        self.query(audience, Filter::new().eq("assignedTo", user_id))
            .await
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.tasks.delete(id).await? {
            return Err(AppError::NotFound(ProductionTask::LABEL.into()));
        }
        Ok(())
    }

    pub async fn clear(&self) -> AppResult<u64> {
        Ok(self.tasks.clear().await?)
    }

    /// Persist `plan` (already carrying its new status) together with the
    /// matching status on its tracker task, plus any `extra` writes, in one
    /// atomic batch.
    pub async fn update_plan_status<P: Document>(
        &self,
        plan: &P,
        task_type: TrackerTaskType,
        status: TrackerStatus,
        mut extra: Vec<WriteOp>,
    ) -> AppResult<()> {
        extra.push(Collection::<P>::replace_op(plan)?);

        match self.for_plan(task_type, plan.id()).await? {
            Some(mut task) => {
                task.status = status;
                task.updated_at = Utc::now();
                extra.push(Collection::<ProductionTask>::replace_op(&task)?);
            }
            None => tracing::warn!("No {} task tracks plan {}", task_type.as_str(), plan.id()),
        }

        self.store.apply(extra).await?;
        tracing::info!("{} {} is now {:?}", P::LABEL, plan.id(), status);
        Ok(())
    }

    /// Batch op removing the tracker task of a plan, if any
    pub async fn delete_op_for(&self, task_type: TrackerTaskType, plan_id: &str) -> AppResult<Option<WriteOp>> {
        Ok(self
            .for_plan(task_type, plan_id)
            .await?
            .map(|task| Collection::<ProductionTask>::delete_op(&task.id)))
    }

    async fn query(&self, audience: TaskAudience, filter: Filter) -> AppResult<Vec<ProductionTask>> {
        let mut tasks: Vec<ProductionTask> = self
            .tasks
            .find(&filter)
            .await?
            .into_iter()
            .filter(|t| audience.can_see(t))
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }
}
