//! Exam persistence
//!
//! Confirmed exams are owned by a user and stored behind the `ExamStore` trait,
//! so the conversation layer never depends on a particular storage backend.

pub mod adapters;
pub mod store;

pub use adapters::InMemoryExamStore;
pub use store::{ExamStore, ExamStoreRef, StoreError, StoredExam};
