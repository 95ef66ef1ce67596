//! Task storage and the updater that writes agent progress into it

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::a2a::{Artifact, Message, Part, Task, TaskState, TaskStatus};

#[derive(Debug)]
struct StoredTask {
    task: Task,
    updated_at: DateTime<Utc>,
}

impl StoredTask {
    fn new(task: Task) -> Self {
        Self {
            task,
            updated_at: Utc::now(),
        }
    }

    /// A task the executor is still driving
    fn in_flight(&self) -> bool {
        self.task.status.state == TaskState::Working
    }
}

/// Tasks held in process memory
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, StoredTask>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().get(task_id).map(|t| t.task.clone())
    }

    pub fn save(&self, task: Task) {
        self.tasks
            .write()
            .insert(task.id.clone(), StoredTask::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Drop tasks untouched for longer than `max_age`, and every task of the
    /// given contexts. Tasks still in flight are kept. Returns the number
    /// removed.
    pub fn evict(&self, max_age: Duration, contexts: &[String]) -> usize {
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let cutoff = Utc::now() - max_age;
        let contexts: HashSet<&str> = contexts.iter().map(String::as_str).collect();

        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|_, stored| {
            stored.in_flight()
                || (stored.updated_at >= cutoff
                    && !contexts.contains(stored.task.context_id.as_str()))
        });
        before - tasks.len()
    }

    fn modify<F>(&self, task_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Task) -> Result<()>,
    {
        let mut tasks = self.tasks.write();
        let stored = tasks
            .get_mut(task_id)
            .with_context(|| format!("Task not found: {}", task_id))?;
        f(&mut stored.task)?;
        stored.updated_at = Utc::now();
        Ok(())
    }
}

/// Publishes status changes and artifacts for one task invocation.
///
/// Once a final update has been written, further updates are refused.
pub struct TaskUpdater {
    store: Arc<InMemoryTaskStore>,
    task_id: String,
    context_id: String,
    finalized: bool,
}

impl TaskUpdater {
    pub fn new(
        store: Arc<InMemoryTaskStore>,
        task_id: impl Into<String>,
        context_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            task_id: task_id.into(),
            context_id: context_id.into(),
            finalized: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn is_final(&self) -> bool {
        self.finalized
    }

    /// Agent text message bound to this task
    pub fn agent_message(&self, text: impl Into<String>) -> Message {
        Message::agent_text(text, &self.context_id, &self.task_id)
    }

    pub fn update_status(
        &mut self,
        state: TaskState,
        message: Option<Message>,
        is_final: bool,
    ) -> Result<()> {
        if self.finalized {
            bail!("Task {} already received its final update", self.task_id);
        }

        self.store.modify(&self.task_id, |task| {
            if task.status.state.is_terminal() {
                bail!("Task {} is already {:?}", task.id, task.status.state);
            }
            if let Some(m) = &message {
                task.history.push(m.clone());
            }
            task.status = TaskStatus::new(state, message);
            Ok(())
        })?;

        debug!(task_id = %self.task_id, ?state, is_final, "Task status updated");
        self.finalized = is_final || state.is_terminal();
        Ok(())
    }

    pub fn add_artifact(&mut self, parts: Vec<Part>, name: impl Into<String>) -> Result<()> {
        if self.finalized {
            bail!("Task {} already received its final update", self.task_id);
        }

        let artifact = Artifact {
            artifact_id: Uuid::new_v4().to_string(),
            name: Some(name.into()),
            parts,
        };
        self.store.modify(&self.task_id, |task| {
            task.artifacts.push(artifact);
            Ok(())
        })
    }

    pub fn complete(&mut self) -> Result<()> {
        self.update_status(TaskState::Completed, None, true)
    }

    pub fn failed(&mut self, message: Message) -> Result<()> {
        self.update_status(TaskState::Failed, Some(message), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::a2a::MessageRole;

    fn user_message(text: &str) -> Message {
        Message {
            role: MessageRole::User,
            parts: vec![Part::text(text)],
            message_id: Uuid::new_v4().to_string(),
            task_id: None,
            context_id: None,
            kind: "message".to_string(),
        }
    }

    fn setup() -> (Arc<InMemoryTaskStore>, TaskUpdater) {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = Task::from_message(&user_message("100 USD in EUR"));
        let updater = TaskUpdater::new(Arc::clone(&store), &task.id, &task.context_id);
        store.save(task);
        (store, updater)
    }

    #[test]
    fn test_working_then_complete() {
        let (store, mut updater) = setup();
        let msg = updater.agent_message("Looking up the exchange rates...");
        updater.update_status(TaskState::Working, Some(msg), false).unwrap();
        updater
            .add_artifact(vec![Part::text("93.5 EUR")], "conversion_result")
            .unwrap();
        updater.complete().unwrap();

        let task = store.get(updater.task_id()).unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts[0].name.as_deref(), Some("conversion_result"));
        assert_eq!(task.history.len(), 2);
        assert!(updater.is_final());
    }

    #[test]
    fn test_no_updates_after_final() {
        let (store, mut updater) = setup();
        let msg = updater.agent_message("Which currency?");
        updater
            .update_status(TaskState::InputRequired, Some(msg), true)
            .unwrap();

        assert!(updater.update_status(TaskState::Working, None, false).is_err());
        assert!(updater.add_artifact(vec![], "late").is_err());
        assert_eq!(
            store.get(updater.task_id()).unwrap().status.state,
            TaskState::InputRequired
        );
    }

    #[test]
    fn test_terminal_task_refuses_new_updater() {
        let (store, mut updater) = setup();
        updater.failed(updater.agent_message("boom")).unwrap();

        let mut second =
            TaskUpdater::new(Arc::clone(&store), updater.task_id(), updater.context_id());
        assert!(second.update_status(TaskState::Working, None, false).is_err());
    }

    #[test]
    fn test_evict_keeps_recent_and_in_flight_tasks() {
        let (store, mut updater) = setup();
        updater.complete().unwrap();
        let done = updater.task_id().to_string();

        let mut running = Task::from_message(&user_message("still converting"));
        running.status = TaskStatus::new(TaskState::Working, None);
        store.save(running.clone());

        for stored in store.tasks.write().values_mut() {
            stored.updated_at = Utc::now() - chrono::Duration::hours(2);
        }
        let fresh = Task::from_message(&user_message("50 USD in GBP"));
        store.save(fresh.clone());

        assert_eq!(store.evict(Duration::from_secs(3600), &[]), 1);
        assert!(store.get(&done).is_none());
        assert!(store.get(&running.id).is_some());
        assert!(store.get(&fresh.id).is_some());
    }

    #[test]
    fn test_evict_drops_tasks_of_evicted_contexts() {
        let (store, mut updater) = setup();
        updater.complete().unwrap();
        let other = Task::from_message(&user_message("50 USD in GBP"));
        store.save(other.clone());

        let removed = store.evict(
            Duration::from_secs(3600),
            &[updater.context_id().to_string()],
        );
        assert_eq!(removed, 1);
        assert!(store.get(updater.task_id()).is_none());
        assert!(store.get(&other.id).is_some());
    }

    #[test]
    fn test_unknown_task() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut updater = TaskUpdater::new(store, "missing", "ctx");
        assert!(updater.complete().is_err());
    }
}
