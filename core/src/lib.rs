// Core exam-planner functionality:
// - Exam domain types shared by every crate
// - API client for Gemini and the extraction provider seam
// - Configuration loading
// - Shared error types

// Export exam module - ExamRecord, enums and partial field data
pub mod exam;
pub use exam::*;

// Export client module - API client for Gemini
pub mod client;
pub use client::*;

// Export provider module - the text-in/text-out extraction seam
pub mod provider;
pub use provider::*;

// Export types module - Gemini request/response data structures
pub mod types;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;
