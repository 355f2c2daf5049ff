//! Conversational exam extraction.
//!
//! A stateless, turn-by-turn protocol that gathers exam fields from free text
//! through an external language model. The client holds the partial state and
//! resends it each turn; every turn ends in exactly one [`TurnOutcome`].

pub mod batch;
pub mod conversation;
pub mod guard;
pub mod machine;
pub mod normalizer;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod store;

pub use batch::{commit_batch, commit_records, interpret_batch, BatchTally, EntryRejection};
pub use conversation::Conversation;
pub use guard::TopicalityGuard;
pub use machine::{BatchTurn, ConversationEngine, TurnOutcome, TurnRequest};
pub use normalizer::{normalize, ParseError};
pub use retry::{call_with_retry, RetryOutcome, RetryPolicy};
pub use schema::{validate_candidate, validate_field, FieldError};
pub use store::{ExamStore, ExamStoreRef, InMemoryExamStore, StoreError, StoredExam};
