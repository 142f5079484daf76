#![allow(dead_code)]

pub mod range_server;

use std::sync::Mutex;

use rangedl::progress::{ProgressSink, TaskId};

/// Progress sink that records every registration and update for assertions.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub description: String,
    pub total: u64,
    pub updates: Vec<u64>,
}

#[derive(Default)]
pub struct RecordingSink {
    tasks: Mutex<Vec<TaskRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn last_completed(&self, task: TaskId) -> Option<u64> {
        self.tasks
            .lock()
            .unwrap()
            .get(task)
            .and_then(|t| t.updates.last().copied())
    }
}

impl ProgressSink for RecordingSink {
    fn register(&self, description: &str, total_bytes: u64) -> TaskId {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(TaskRecord {
            description: description.to_string(),
            total: total_bytes,
            updates: Vec::new(),
        });
        tasks.len() - 1
    }

    fn set_completed(&self, task: TaskId, completed_bytes: u64) {
        if let Some(t) = self.tasks.lock().unwrap().get_mut(task) {
            t.updates.push(completed_bytes);
        }
    }
}

/// Deterministic pseudo-random body for content checks.
pub fn test_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
