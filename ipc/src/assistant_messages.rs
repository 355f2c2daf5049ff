use exam_planner_core::{ExamDateEntry, GatheredFields};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A malformed request body. Never reaches the conversation state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Message is required")]
    MissingMessage,
}

/// One conversation turn sent by the client.
///
/// The client owns the conversation state and resends it on every turn.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gathered_fields: Option<GatheredFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_dates: Option<Vec<ExamDateEntry>>,
}

impl AssistantRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Checks the body and splits it into message, gathered fields and exam dates.
    pub fn into_parts(
        self,
    ) -> Result<(String, GatheredFields, Vec<ExamDateEntry>), RequestError> {
        if self.message.trim().is_empty() {
            return Err(RequestError::MissingMessage);
        }
        Ok((
            self.message,
            self.gathered_fields.unwrap_or_default(),
            self.exam_dates.unwrap_or_default(),
        ))
    }
}

/// Status tag of an assistant reply.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    OffTopic,
    Incomplete,
    Complete,
    Error,
}

/// Reply to one conversation turn, in the flat wire shape clients expect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gathered: Option<GatheredFields>,
    /// A single exam object, or an array when several exams completed at once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_dates: Option<Vec<ExamDateEntry>>,
}

// Helper constructors for creating responses easily.
impl AssistantResponse {
    fn bare(status: ResponseStatus) -> Self {
        Self {
            status,
            message: None,
            missing: None,
            gathered: None,
            data: None,
            exam_dates: None,
        }
    }

    pub fn off_topic(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(ResponseStatus::OffTopic)
        }
    }

    pub fn incomplete(
        message: impl Into<String>,
        missing: Vec<String>,
        gathered: GatheredFields,
    ) -> Self {
        Self {
            message: Some(message.into()),
            missing: Some(missing),
            gathered: Some(gathered),
            ..Self::bare(ResponseStatus::Incomplete)
        }
    }

    pub fn complete(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::bare(ResponseStatus::Complete)
        }
    }

    /// Multi-date reply carrying the dates still being gathered.
    pub fn exam_dates(
        status: ResponseStatus,
        message: impl Into<String>,
        exam_dates: Vec<ExamDateEntry>,
    ) -> Self {
        Self {
            message: Some(message.into()),
            exam_dates: Some(exam_dates),
            ..Self::bare(status)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(ResponseStatus::Error)
        }
    }
}
