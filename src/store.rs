//! In-memory task storage.
//!
//! Tasks live for the lifetime of the process; there is no deletion path.
//! Listing returns tasks in insertion order, which the map alone cannot
//! guarantee, so an order vec is kept beside it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::task::Task;

/// Concurrent store of task records.
#[derive(Debug, Default)]
pub struct TaskStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<Uuid, Task>,
    order: Vec<Uuid>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task and return its id.
    pub async fn add(&self, task: Task) -> Uuid {
        let id = task.id;
        let mut inner = self.inner.write().await;
        inner.order.push(id);
        inner.tasks.insert(id, task);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Task> {
        let inner = self.inner.read().await;
        inner.tasks.get(&id).cloned()
    }

    /// All tasks in insertion order.
    pub async fn list(&self) -> Vec<Task> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.tasks.get(id).cloned())
            .collect()
    }

    pub async fn count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.tasks.len()
    }
}

/// Shared task store wrapped in Arc for concurrent access.
pub type SharedTaskStore = Arc<TaskStore>;
