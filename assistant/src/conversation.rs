use exam_planner_core::{ExamDateEntry, GatheredFields};
use exam_planner_ipc::{AssistantRequest, RequestError};

use crate::machine::{TurnOutcome, TurnRequest};

/// Client-side conversation state.
///
/// Holds what the client must resend on every turn and folds each outcome
/// back in: incomplete turns merge their gathered fields, completed turns
/// reset, multi-date turns replace the pending dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    gathered: GatheredFields,
    exam_dates: Vec<ExamDateEntry>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gathered(&self) -> &GatheredFields {
        &self.gathered
    }

    pub fn exam_dates(&self) -> &[ExamDateEntry] {
        &self.exam_dates
    }

    pub fn is_empty(&self) -> bool {
        self.gathered.is_empty() && self.exam_dates.is_empty()
    }

    /// Builds the request for the next turn.
    pub fn request(&self, message: impl Into<String>) -> TurnRequest {
        TurnRequest::new(message)
            .with_gathered(self.gathered.clone())
            .with_exam_dates(self.exam_dates.clone())
    }

    /// Builds the next turn through the request body checks, rejecting a blank message.
    pub fn try_request(&self, message: impl Into<String>) -> Result<TurnRequest, RequestError> {
        TurnRequest::try_from(AssistantRequest {
            message: message.into(),
            gathered_fields: Some(self.gathered.clone()),
            exam_dates: Some(self.exam_dates.clone()),
        })
    }

    /// Folds a turn outcome into the held state.
    pub fn absorb(&mut self, outcome: &TurnOutcome) {
        match outcome {
            TurnOutcome::Incomplete { gathered, .. } => self.gathered.merge(gathered),
            TurnOutcome::Complete { .. } => self.reset(),
            TurnOutcome::Batch(batch) => self.exam_dates = batch.pending.clone(),
            TurnOutcome::OffTopic { .. } | TurnOutcome::Error { .. } => {}
        }
    }

    pub fn reset(&mut self) {
        self.gathered.clear();
        self.exam_dates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::BatchTurn;
    use serde_json::json;

    fn gathered(value: serde_json::Value) -> GatheredFields {
        serde_json::from_value(value).unwrap()
    }

    fn incomplete(value: serde_json::Value) -> TurnOutcome {
        TurnOutcome::Incomplete {
            gathered: gathered(value),
            missing: vec![],
            message: String::new(),
        }
    }

    #[test]
    fn test_incomplete_turns_accumulate() {
        let mut conversation = Conversation::new();
        conversation.absorb(&incomplete(json!({"code": "CS101", "subject": "DS"})));
        conversation.absorb(&incomplete(json!({"subject": "Data Structures"})));

        assert_eq!(
            conversation.gathered(),
            &gathered(json!({"code": "CS101", "subject": "Data Structures"}))
        );
        let request = conversation.request("March 10");
        assert!(request.is_mid_conversation());
        assert_eq!(request.gathered.len(), 2);
    }

    #[test]
    fn test_blank_message_is_rejected_before_a_turn() {
        let mut conversation = Conversation::new();
        conversation.absorb(&incomplete(json!({"code": "CS101"})));

        assert_eq!(conversation.try_request("   "), Err(RequestError::MissingMessage));
        assert_eq!(conversation.try_request(""), Err(RequestError::MissingMessage));

        let request = conversation.try_request("March 10").unwrap();
        assert_eq!(request, conversation.request("March 10"));
    }

    #[test]
    fn test_errors_leave_state_untouched() {
        let mut conversation = Conversation::new();
        conversation.absorb(&incomplete(json!({"code": "CS101"})));
        let before = conversation.clone();

        conversation.absorb(&TurnOutcome::Error {
            message: "busy".to_string(),
        });
        conversation.absorb(&TurnOutcome::OffTopic {
            message: "no".to_string(),
        });

        assert_eq!(conversation, before);
    }

    #[test]
    fn test_complete_resets() {
        let mut conversation = Conversation::new();
        conversation.absorb(&incomplete(json!({"code": "CS101"})));
        conversation.absorb(&TurnOutcome::Complete { records: vec![] });

        assert!(conversation.is_empty());
        assert!(!conversation.request("next").is_mid_conversation());
    }

    #[test]
    fn test_batch_replaces_pending_dates() {
        let mut conversation = Conversation::new();
        conversation.absorb(&incomplete(json!({"code": "CS101"})));
        conversation.absorb(&TurnOutcome::Batch(BatchTurn {
            confirmed: vec![],
            rejected: vec![],
            pending: vec![ExamDateEntry::new("2025-04-02")],
            message: String::new(),
        }));

        assert!(conversation.gathered().contains("code"));
        assert_eq!(conversation.exam_dates().len(), 1);
        assert_eq!(conversation.request("x").exam_dates[0].date, "2025-04-02");
    }
}
