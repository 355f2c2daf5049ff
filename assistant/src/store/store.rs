use std::error::Error;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_planner_core::ExamRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for exam store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No exam with this id belongs to the owner
    NotFound(Uuid),
    /// Error occurred inside the storage backend
    StorageError(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Exam not found: {}", id),
            StoreError::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl Error for StoreError {}

/// A persisted exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExam {
    pub id: Uuid,
    /// User the exam belongs to
    pub owner_id: String,
    #[serde(flatten)]
    pub record: ExamRecord,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredExam {
    pub fn new(owner_id: impl Into<String>, record: ExamRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            record,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the exam details, keeping id, owner and completion state
    pub fn replace_record(&mut self, record: ExamRecord) {
        self.record = record;
        self.updated_at = Utc::now();
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
        self.updated_at = Utc::now();
    }
}

/// Owner-scoped exam storage
///
/// Every operation takes the owner id; an exam belonging to someone else is
/// reported as `NotFound`.
#[async_trait]
pub trait ExamStore: Send + Sync + Debug {
    /// Persist a new exam for the owner
    async fn create(&self, owner: &str, record: ExamRecord) -> Result<StoredExam, StoreError>;

    /// Get one exam by id
    async fn get(&self, owner: &str, id: Uuid) -> Result<StoredExam, StoreError>;

    /// List the owner's exams, earliest date first
    async fn list(&self, owner: &str) -> Result<Vec<StoredExam>, StoreError>;

    /// Replace an exam's details
    async fn update(&self, owner: &str, id: Uuid, record: ExamRecord)
        -> Result<StoredExam, StoreError>;

    /// Delete an exam
    async fn delete(&self, owner: &str, id: Uuid) -> Result<(), StoreError>;

    /// Flip the completed flag
    async fn toggle_complete(&self, owner: &str, id: Uuid) -> Result<StoredExam, StoreError>;
}

/// Type alias for Arc-wrapped ExamStore trait objects
pub type ExamStoreRef = Arc<dyn ExamStore>;
