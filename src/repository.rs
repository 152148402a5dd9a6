//! Stored results
//!
//! Past test runs and visualizations live behind a store trait so the API
//! layer gets its persistence injected instead of reaching for globals.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Stored aggregate of one tester-mode batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: i64,
    pub list_size: u32,
    pub max_operations: u32,
    pub test_count: u32,
    pub validation_tests: u32,
    pub performance_tests: u32,
    pub validation_passed: u32,
    pub performance_passed: u32,
    /// Unix epoch seconds.
    pub created_at: u64,
}

/// Insert shape for [`TestRun`]; id and createdAt are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTestRun {
    pub list_size: u32,
    pub max_operations: u32,
    pub test_count: u32,
    pub validation_tests: u32,
    pub performance_tests: u32,
    pub validation_passed: u32,
    pub performance_passed: u32,
}

/// Stored single visualization instance. Numbers and operations are kept as
/// flat text: space-separated values, newline-separated codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationRecord {
    pub id: i64,
    pub list_size: u32,
    pub operations: String,
    pub numbers: String,
    /// Unix epoch seconds.
    pub created_at: u64,
}

/// Insert shape for [`VisualizationRecord`].
#[derive(Debug, Clone)]
pub struct NewVisualization {
    pub list_size: u32,
    pub operations: String,
    pub numbers: String,
}

/// Persistence seam for the API layer.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create_test_run(&self, new: NewTestRun) -> TestRun;
    async fn list_test_runs(&self) -> Vec<TestRun>;
    async fn create_visualization(&self, new: NewVisualization) -> VisualizationRecord;
    async fn list_visualizations(&self) -> Vec<VisualizationRecord>;
}

/// In-memory store. Records live for the lifetime of the process, which is
/// all a local testing tool needs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_test_run_id: i64,
    next_visualization_id: i64,
    test_runs: Vec<TestRun>,
    visualizations: Vec<VisualizationRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn create_test_run(&self, new: NewTestRun) -> TestRun {
        let mut inner = self.inner.lock().await;
        inner.next_test_run_id += 1;
        let record = TestRun {
            id: inner.next_test_run_id,
            list_size: new.list_size,
            max_operations: new.max_operations,
            test_count: new.test_count,
            validation_tests: new.validation_tests,
            performance_tests: new.performance_tests,
            validation_passed: new.validation_passed,
            performance_passed: new.performance_passed,
            created_at: now_epoch_secs(),
        };
        inner.test_runs.push(record.clone());
        record
    }

    async fn list_test_runs(&self) -> Vec<TestRun> {
        self.inner.lock().await.test_runs.clone()
    }

    async fn create_visualization(&self, new: NewVisualization) -> VisualizationRecord {
        let mut inner = self.inner.lock().await;
        inner.next_visualization_id += 1;
        let record = VisualizationRecord {
            id: inner.next_visualization_id,
            list_size: new.list_size,
            operations: new.operations,
            numbers: new.numbers,
            created_at: now_epoch_secs(),
        };
        inner.visualizations.push(record.clone());
        record
    }

    async fn list_visualizations(&self) -> Vec<VisualizationRecord> {
        self.inner.lock().await.visualizations.clone()
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run(list_size: u32) -> NewTestRun {
        NewTestRun {
            list_size,
            max_operations: 700,
            test_count: 100,
            validation_tests: 100,
            performance_tests: 100,
            validation_passed: 97,
            performance_passed: 88,
        }
    }

    #[test]
    fn ids_increase_and_listing_keeps_order() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let first = store.create_test_run(sample_run(10)).await;
            let second = store.create_test_run(sample_run(20)).await;
            assert_eq!(first.id, 1);
            assert_eq!(second.id, 2);

            let all = store.list_test_runs().await;
            assert_eq!(all.len(), 2);
            assert_eq!(all[0].list_size, 10);
            assert_eq!(all[1].list_size, 20);
        });
    }

    #[test]
    fn visualization_ids_count_separately() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.create_test_run(sample_run(5)).await;
            let vis = store
                .create_visualization(NewVisualization {
                    list_size: 3,
                    operations: "sa\nra".to_string(),
                    numbers: "2 1 3".to_string(),
                })
                .await;
            assert_eq!(vis.id, 1);
            assert_eq!(store.list_visualizations().await.len(), 1);
            assert_eq!(store.list_visualizations().await[0].operations, "sa\nra");
        });
    }

    #[test]
    fn wire_format_is_camel_case() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let record = store.create_test_run(sample_run(10)).await;
            let json = serde_json::to_value(&record).unwrap();
            assert!(json.get("listSize").is_some());
            assert!(json.get("validationPassed").is_some());
            assert!(json.get("createdAt").is_some());
        });
    }
}
