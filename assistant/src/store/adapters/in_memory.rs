use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use exam_planner_core::ExamRecord;
use tracing::debug;
use uuid::Uuid;

use crate::store::store::{ExamStore, StoreError, StoredExam};

/// In-memory implementation of ExamStore
#[derive(Debug, Default, Clone)]
pub struct InMemoryExamStore {
    exams: Arc<RwLock<HashMap<Uuid, StoredExam>>>,
}

impl InMemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageError(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl ExamStore for InMemoryExamStore {
    async fn create(&self, owner: &str, record: ExamRecord) -> Result<StoredExam, StoreError> {
        let exam = StoredExam::new(owner, record);

        let mut exams = self.exams.write().map_err(poisoned)?;
        exams.insert(exam.id, exam.clone());
        debug!(id = %exam.id, owner, "Stored exam");

        Ok(exam)
    }

    async fn get(&self, owner: &str, id: Uuid) -> Result<StoredExam, StoreError> {
        let exams = self.exams.read().map_err(poisoned)?;

        exams
            .get(&id)
            .filter(|exam| exam.owner_id == owner)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, owner: &str) -> Result<Vec<StoredExam>, StoreError> {
        let exams = self.exams.read().map_err(poisoned)?;

        let mut owned: Vec<StoredExam> = exams
            .values()
            .filter(|exam| exam.owner_id == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            (&a.record.date, &a.record.start_time, a.created_at)
                .cmp(&(&b.record.date, &b.record.start_time, b.created_at))
        });

        debug!(owner, count = owned.len(), "Listed exams");
        Ok(owned)
    }

    async fn update(
        &self,
        owner: &str,
        id: Uuid,
        record: ExamRecord,
    ) -> Result<StoredExam, StoreError> {
        let mut exams = self.exams.write().map_err(poisoned)?;

        let exam = exams
            .get_mut(&id)
            .filter(|exam| exam.owner_id == owner)
            .ok_or(StoreError::NotFound(id))?;
        exam.replace_record(record);
        Ok(exam.clone())
    }

    async fn delete(&self, owner: &str, id: Uuid) -> Result<(), StoreError> {
        let mut exams = self.exams.write().map_err(poisoned)?;

        if !exams.get(&id).is_some_and(|exam| exam.owner_id == owner) {
            return Err(StoreError::NotFound(id));
        }
        exams.remove(&id);

        debug!(%id, owner, "Deleted exam");
        Ok(())
    }

    async fn toggle_complete(&self, owner: &str, id: Uuid) -> Result<StoredExam, StoreError> {
        let mut exams = self.exams.write().map_err(poisoned)?;

        let exam = exams
            .get_mut(&id)
            .filter(|exam| exam.owner_id == owner)
            .ok_or(StoreError::NotFound(id))?;
        exam.toggle_completed();
        Ok(exam.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_planner_core::{Category, ExamType};
    use tokio::test;

    fn record(code: &str, date: &str, start: &str) -> ExamRecord {
        ExamRecord {
            code: code.to_string(),
            subject: "Operating Systems".to_string(),
            exam_type: ExamType::EndTerm,
            category: Category::Regular,
            semester: 5,
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: "17:00".to_string(),
        }
    }

    #[test]
    async fn test_create_and_get() {
        let store = InMemoryExamStore::new();

        let exam = store
            .create("student-1", record("CS301", "2025-05-02", "14:00"))
            .await
            .unwrap();
        let fetched = store.get("student-1", exam.id).await.unwrap();

        assert_eq!(fetched, exam);
    }

    #[test]
    async fn test_list_is_owner_scoped_and_date_ordered() {
        let store = InMemoryExamStore::new();
        store.create("student-1", record("B", "2025-05-10", "09:00")).await.unwrap();
        store.create("student-1", record("C", "2025-05-02", "14:00")).await.unwrap();
        store.create("student-1", record("A", "2025-05-02", "09:00")).await.unwrap();
        store.create("student-2", record("Z", "2025-01-01", "09:00")).await.unwrap();

        let codes: Vec<String> = store
            .list("student-1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.record.code)
            .collect();

        assert_eq!(codes, vec!["A", "C", "B"]);
        assert!(store.list("nobody").await.unwrap().is_empty());
    }

    #[test]
    async fn test_other_owner_cannot_touch_exam() {
        let store = InMemoryExamStore::new();
        let exam = store
            .create("student-1", record("CS301", "2025-05-02", "14:00"))
            .await
            .unwrap();

        assert_eq!(
            store.get("student-2", exam.id).await,
            Err(StoreError::NotFound(exam.id))
        );
        assert!(store.delete("student-2", exam.id).await.is_err());
        assert!(store.toggle_complete("student-2", exam.id).await.is_err());
        assert!(store.get("student-1", exam.id).await.is_ok());
    }

    #[test]
    async fn test_update_toggle_and_delete() {
        let store = InMemoryExamStore::new();
        let exam = store
            .create("student-1", record("CS301", "2025-05-02", "14:00"))
            .await
            .unwrap();

        let toggled = store.toggle_complete("student-1", exam.id).await.unwrap();
        assert!(toggled.completed);
        let toggled = store.toggle_complete("student-1", exam.id).await.unwrap();
        assert!(!toggled.completed);

        let updated = store
            .update("student-1", exam.id, record("CS302", "2025-05-03", "10:00"))
            .await
            .unwrap();
        assert_eq!(updated.id, exam.id);
        assert_eq!(updated.record.code, "CS302");

        store.delete("student-1", exam.id).await.unwrap();
        assert_eq!(
            store.delete("student-1", exam.id).await,
            Err(StoreError::NotFound(exam.id))
        );
    }
}
