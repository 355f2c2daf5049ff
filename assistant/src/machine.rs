//! The per-turn conversation state machine.
//!
//! [`ConversationEngine::handle_turn`] takes a message plus the client-held
//! state and yields exactly one [`TurnOutcome`]. The engine keeps nothing
//! between turns; only the provider call can suspend or fail partially,
//! everything after the raw text arrives is pure.

use exam_planner_core::config::PlannerConfig;
use exam_planner_core::{ExamDateEntry, ExamRecord, ExtractionProvider, GatheredFields};
use exam_planner_ipc::{AssistantRequest, AssistantResponse, RequestError, ResponseStatus};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::batch::{interpret_batch, EntryRejection};
use crate::guard::TopicalityGuard;
use crate::normalizer::normalize;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::retry::{call_with_retry, RetryOutcome, RetryPolicy};
use crate::schema::{check_candidate, valid_subset, PayloadStatus};

pub const OFF_TOPIC_MESSAGE: &str =
    "I can only help you manage your exam schedule. Please describe an exam you'd like to add or manage.";
pub const INCOMPLETE_MESSAGE: &str = "I need a few more details to add your exam.";
pub const BUSY_MESSAGE: &str = "AI service is temporarily busy. Please try again in a moment.";
pub const PROVIDER_ERROR_MESSAGE: &str = "AI service error. Please try again later.";
pub const PARSE_ERROR_MESSAGE: &str =
    "AI returned an unexpected response. Please try rephrasing your message.";
pub const INVALID_FORMAT_MESSAGE: &str = "AI returned an invalid response format. Please try again.";

/// Input of one turn: the new message and the state the client resent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnRequest {
    pub message: String,
    pub gathered: GatheredFields,
    pub exam_dates: Vec<ExamDateEntry>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_gathered(mut self, gathered: GatheredFields) -> Self {
        self.gathered = gathered;
        self
    }

    pub fn with_exam_dates(mut self, exam_dates: Vec<ExamDateEntry>) -> Self {
        self.exam_dates = exam_dates;
        self
    }

    /// True when the client already holds partial state for this conversation.
    pub fn is_mid_conversation(&self) -> bool {
        !self.gathered.is_empty() || !self.exam_dates.is_empty()
    }
}

impl TryFrom<AssistantRequest> for TurnRequest {
    type Error = RequestError;

    fn try_from(request: AssistantRequest) -> Result<Self, Self::Error> {
        let (message, gathered, exam_dates) = request.into_parts()?;
        Ok(Self {
            message,
            gathered,
            exam_dates,
        })
    }
}

/// Multi-date turn: records ready to persist and the dates still being gathered.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTurn {
    pub confirmed: Vec<ExamRecord>,
    pub rejected: Vec<EntryRejection>,
    pub pending: Vec<ExamDateEntry>,
    pub message: String,
}

/// Terminal result of one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    OffTopic {
        message: String,
    },
    Incomplete {
        gathered: GatheredFields,
        missing: Vec<String>,
        message: String,
    },
    /// One or more validated records; the client resets its gathered fields.
    Complete {
        records: Vec<ExamRecord>,
    },
    Batch(BatchTurn),
    Error {
        message: String,
    },
}

impl TurnOutcome {
    fn off_topic_default() -> Self {
        TurnOutcome::OffTopic {
            message: OFF_TOPIC_MESSAGE.to_string(),
        }
    }

    fn error(message: &str) -> Self {
        TurnOutcome::Error {
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> ResponseStatus {
        match self {
            TurnOutcome::OffTopic { .. } => ResponseStatus::OffTopic,
            TurnOutcome::Incomplete { .. } => ResponseStatus::Incomplete,
            TurnOutcome::Complete { .. } => ResponseStatus::Complete,
            TurnOutcome::Batch(batch)
                if batch.pending.is_empty() && !batch.confirmed.is_empty() =>
            {
                ResponseStatus::Complete
            }
            TurnOutcome::Batch(_) => ResponseStatus::Incomplete,
            TurnOutcome::Error { .. } => ResponseStatus::Error,
        }
    }

    /// Flattens the outcome into the wire shape.
    pub fn into_response(self) -> AssistantResponse {
        let status = self.status();
        match self {
            TurnOutcome::OffTopic { message } => AssistantResponse::off_topic(message),
            TurnOutcome::Incomplete {
                gathered,
                missing,
                message,
            } => AssistantResponse::incomplete(message, missing, gathered),
            TurnOutcome::Complete { records } => AssistantResponse::complete(records_value(&records)),
            TurnOutcome::Batch(batch) => {
                let mut response = AssistantResponse::exam_dates(status, batch.message, batch.pending);
                if !batch.confirmed.is_empty() {
                    response.data = Some(records_value(&batch.confirmed));
                }
                response
            }
            TurnOutcome::Error { message } => AssistantResponse::error(message),
        }
    }
}

fn records_value(records: &[ExamRecord]) -> Value {
    let value = |r: &ExamRecord| serde_json::to_value(r).unwrap_or(Value::Null);
    match records {
        [single] => value(single),
        many => Value::Array(many.iter().map(value).collect()),
    }
}

fn payload_message(payload: &Map<String, Value>) -> Option<String> {
    payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

/// Drives one conversation turn against an extraction provider.
pub struct ConversationEngine<P> {
    provider: P,
    guard: TopicalityGuard,
    retry: RetryPolicy,
    system_prompt: String,
}

impl<P: ExtractionProvider> ConversationEngine<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            guard: TopicalityGuard::default(),
            retry: RetryPolicy::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Builds an engine using the keyword table, retry settings and prompt from config.
    pub fn from_config(provider: P, config: &PlannerConfig) -> Self {
        let mut engine = Self::new(provider)
            .with_guard(TopicalityGuard::new(config.keywords()))
            .with_retry_policy(RetryPolicy::from(&config.retry));
        if let Some(prompt) = config.system_prompt.as_ref().filter(|p| !p.trim().is_empty()) {
            engine = engine.with_system_prompt(prompt.clone());
        }
        engine
    }

    pub fn with_guard(mut self, guard: TopicalityGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Processes one turn.
    pub async fn handle_turn(&self, request: &TurnRequest) -> TurnOutcome {
        if !request.is_mid_conversation() && !self.guard.is_plausibly_exam_related(&request.message)
        {
            info!("Message rejected by topicality guard, skipping provider call");
            return TurnOutcome::off_topic_default();
        }

        let prompt = build_prompt(
            &self.system_prompt,
            &request.gathered,
            &request.exam_dates,
            &request.message,
        );
        debug!(prompt_len = prompt.len(), "Constructed extraction prompt");

        match call_with_retry(&self.provider, &prompt, &self.retry).await {
            RetryOutcome::Success(raw) => self.interpret(&raw, request),
            RetryOutcome::Busy { attempts, last_error } => {
                error!(error = %last_error, attempts, "Extraction provider busy");
                TurnOutcome::error(BUSY_MESSAGE)
            }
            RetryOutcome::Fatal(e) => {
                error!(error = %e, "Extraction provider failed");
                TurnOutcome::error(PROVIDER_ERROR_MESSAGE)
            }
        }
    }

    /// Interprets raw model text against the request it answers.
    pub fn interpret(&self, raw: &str, request: &TurnRequest) -> TurnOutcome {
        let payload = match normalize(raw) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, raw = %raw, "Failed to parse model response");
                return TurnOutcome::error(PARSE_ERROR_MESSAGE);
            }
        };

        let Some(status) = PayloadStatus::of(&payload) else {
            let body = Value::Object(payload.clone());
            error!(payload = %body, "Model response has no recognized status");
            return TurnOutcome::error(INVALID_FORMAT_MESSAGE);
        };

        if status == PayloadStatus::OffTopic {
            return TurnOutcome::OffTopic {
                message: payload_message(&payload).unwrap_or_else(|| OFF_TOPIC_MESSAGE.to_string()),
            };
        }

        let entries = payload
            .get("examDates")
            .and_then(Value::as_array)
            .filter(|entries| !entries.is_empty() || !request.exam_dates.is_empty());
        if let Some(entries) = entries {
            let batch = interpret_batch(&request.exam_dates, entries, payload_message(&payload));
            info!(
                confirmed = batch.confirmed.len(),
                rejected = batch.rejected.len(),
                pending = batch.pending.len(),
                "Processed multi-date turn"
            );
            return TurnOutcome::Batch(batch);
        }

        match status {
            PayloadStatus::Incomplete => incomplete(&payload, &request.gathered),
            PayloadStatus::Complete => complete(&payload),
            PayloadStatus::OffTopic => TurnOutcome::off_topic_default(),
        }
    }
}

fn incomplete(payload: &Map<String, Value>, prior: &GatheredFields) -> TurnOutcome {
    let mut gathered = prior.clone();

    let extracted = payload
        .get("gathered")
        .and_then(Value::as_object)
        .or_else(|| payload.get("fields").and_then(Value::as_object));
    if let Some(extracted) = extracted {
        let valid = valid_subset(extracted);
        if valid.len() < extracted.len() {
            debug!(
                dropped = extracted.len() - valid.len(),
                "Dropped unknown or invalid gathered fields"
            );
        }
        gathered.absorb(&valid);
    }

    let missing = payload
        .get("missing")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    TurnOutcome::Incomplete {
        gathered,
        missing,
        message: payload_message(payload).unwrap_or_else(|| INCOMPLETE_MESSAGE.to_string()),
    }
}

fn complete(payload: &Map<String, Value>) -> TurnOutcome {
    let candidates: Vec<&Value> = match payload.get("data") {
        Some(Value::Array(items)) if !items.is_empty() => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => {
            let body = Value::Object(payload.clone());
            error!(payload = %body, "Complete response without data");
            return TurnOutcome::error(INVALID_FORMAT_MESSAGE);
        }
    };

    let mut records = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let checked = candidate
            .as_object()
            .ok_or(None)
            .and_then(|object| check_candidate(object).map_err(Some));
        match checked {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!(
                    reason = %reason.map(|r| r.to_string()).unwrap_or_else(|| "not an object".to_string()),
                    candidate = %candidate,
                    "Complete response failed validation"
                );
                return TurnOutcome::error(INVALID_FORMAT_MESSAGE);
            }
        }
    }

    TurnOutcome::Complete { records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;
    use exam_planner_core::{Category, ExamType, ProviderError};
    use serde_json::json;

    fn engine(provider: ScriptedProvider) -> ConversationEngine<ScriptedProvider> {
        ConversationEngine::new(provider)
    }

    fn complete_payload(data: Value) -> String {
        json!({"status": "complete", "data": data}).to_string()
    }

    fn full_exam() -> Value {
        json!({
            "code": "CS101",
            "subject": "Data Structures",
            "examType": "Mid Term",
            "category": "Regular",
            "semester": 2,
            "date": "2025-03-10",
            "startTime": "09:00",
            "endTime": "12:00"
        })
    }

    #[tokio::test]
    async fn test_guard_short_circuits_without_provider_call() {
        let engine = engine(ScriptedProvider::replying(r#"{"status":"incomplete"}"#));

        let outcome = engine.handle_turn(&TurnRequest::new("what's the weather like?")).await;

        assert_eq!(
            outcome,
            TurnOutcome::OffTopic {
                message: OFF_TOPIC_MESSAGE.to_string()
            }
        );
        assert_eq!(engine.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_guard_bypassed_mid_conversation() {
        let engine = engine(ScriptedProvider::replying(
            r#"{"status":"incomplete","missing":["startTime"],"gathered":{"date":"2025-03-10"}}"#,
        ));
        let gathered: GatheredFields = serde_json::from_value(json!({"code": "CS101"})).unwrap();
        let request = TurnRequest::new("March 10").with_gathered(gathered);

        let outcome = engine.handle_turn(&request).await;

        assert_eq!(engine.provider().calls(), 1);
        let prompt = engine.provider().last_prompt().unwrap();
        assert!(prompt.contains("Already gathered fields: {\"code\":\"CS101\"}"));
        assert!(prompt.ends_with("User message: March 10"));
        match outcome {
            TurnOutcome::Incomplete { gathered, message, .. } => {
                assert_eq!(gathered.len(), 2);
                assert_eq!(message, INCOMPLETE_MESSAGE);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_off_topic_uses_default_message() {
        let engine = engine(ScriptedProvider::replying(r#"{"status":"off_topic"}"#));
        let outcome = engine.handle_turn(&TurnRequest::new("add a joke to my schedule")).await;
        assert_eq!(outcome.status(), ResponseStatus::OffTopic);
        assert_eq!(
            outcome,
            TurnOutcome::OffTopic {
                message: OFF_TOPIC_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn test_incomplete_keeps_prior_and_overwrites() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let prior: GatheredFields =
            serde_json::from_value(json!({"code": "CS100", "subject": "Algorithms"})).unwrap();
        let request = TurnRequest::new("actually CS101").with_gathered(prior);

        let outcome = engine.interpret(
            r#"{"status":"incomplete","missing":"date","fields":{"code":"CS101","semester":"3","examType":"Final"},"message":"When is it?"}"#,
            &request,
        );

        match outcome {
            TurnOutcome::Incomplete {
                gathered,
                missing,
                message,
            } => {
                assert_eq!(gathered.get("code"), Some(&json!("CS101")));
                assert_eq!(gathered.get("subject"), Some(&json!("Algorithms")));
                assert_eq!(gathered.get("semester"), Some(&json!(3)));
                assert!(!gathered.contains("examType"));
                assert!(missing.is_empty());
                assert_eq!(message, "When is it?");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_complete_with_array_data() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let mut second = full_exam();
        second["code"] = json!("MA201");
        second["examType"] = json!("End Term");
        second["category"] = json!("Backlog");

        let outcome = engine.interpret(
            &complete_payload(json!([full_exam(), second])),
            &TurnRequest::new("add both"),
        );

        match outcome {
            TurnOutcome::Complete { records } => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[1].exam_type, ExamType::EndTerm);
                assert_eq!(records[1].category, Category::Backlog);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_one_bad_record_fails_the_whole_turn() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let mut bad = full_exam();
        bad["examType"] = json!("mid term");

        let outcome = engine.interpret(
            &complete_payload(json!([full_exam(), bad])),
            &TurnRequest::new("add both"),
        );
        assert_eq!(outcome, TurnOutcome::error(INVALID_FORMAT_MESSAGE));
    }

    #[test]
    fn test_unrecognized_or_missing_status() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let request = TurnRequest::new("add exam");

        for raw in [r#"{"status":"done"}"#, r#"{"data":{}}"#, r#"{"status":null}"#] {
            assert_eq!(
                engine.interpret(raw, &request),
                TurnOutcome::error(INVALID_FORMAT_MESSAGE),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_complete_without_data() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let request = TurnRequest::new("add exam");
        for raw in [r#"{"status":"complete"}"#, r#"{"status":"complete","data":[]}"#] {
            assert_eq!(engine.interpret(raw, &request), TurnOutcome::error(INVALID_FORMAT_MESSAGE));
        }
    }

    #[test]
    fn test_unparsable_response() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let outcome = engine.interpret("Sorry, I can't do that.", &TurnRequest::new("add exam"));
        assert_eq!(outcome, TurnOutcome::error(PARSE_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_fatal_provider_error_is_not_leaked() {
        let engine = engine(ScriptedProvider::new(vec![Err(ProviderError::HttpError {
            status_code: 401,
            message: "API key sk-secret rejected".to_string(),
        })]));

        let outcome = engine.handle_turn(&TurnRequest::new("add my exam")).await;

        assert_eq!(outcome, TurnOutcome::error(PROVIDER_ERROR_MESSAGE));
        assert_eq!(engine.provider().calls(), 1);
    }

    #[test]
    fn test_from_config_uses_custom_keywords_and_prompt() {
        let config = PlannerConfig {
            guard_keywords: Some(vec!["viva".to_string()]),
            system_prompt: Some("CUSTOM".to_string()),
            ..PlannerConfig::default()
        };
        let engine = ConversationEngine::from_config(ScriptedProvider::new(vec![]), &config);
        assert!(engine.guard.is_plausibly_exam_related("viva tomorrow"));
        assert!(!engine.guard.is_plausibly_exam_related("exam tomorrow"));
        assert_eq!(engine.system_prompt, "CUSTOM");
    }

    #[test]
    fn test_empty_exam_dates_keeps_single_exam_flow() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let prior: GatheredFields =
            serde_json::from_value(json!({"subject": "Data Structures"})).unwrap();
        let request = TurnRequest::new("CS101").with_gathered(prior);

        let outcome = engine.interpret(
            r#"{"status":"incomplete","missing":["date"],"gathered":{"code":"CS101"},"examDates":[],"message":"What date?"}"#,
            &request,
        );

        assert_eq!(outcome.status(), ResponseStatus::Incomplete);
        match outcome {
            TurnOutcome::Incomplete {
                gathered, missing, ..
            } => {
                assert_eq!(gathered.get("code"), Some(&json!("CS101")));
                assert_eq!(gathered.get("subject"), Some(&json!("Data Structures")));
                assert_eq!(missing, vec!["date"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_empty_exam_dates_mid_batch_stays_batch() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let request = TurnRequest::new("not sure yet")
            .with_exam_dates(vec![exam_planner_core::ExamDateEntry::new("2025-04-01")]);

        let outcome = engine.interpret(r#"{"status":"incomplete","examDates":[]}"#, &request);

        assert!(matches!(outcome, TurnOutcome::Batch(ref b) if b.pending.len() == 1));
        assert_eq!(outcome.status(), ResponseStatus::Incomplete);
    }

    #[test]
    fn test_empty_batch_is_never_complete() {
        let outcome = TurnOutcome::Batch(BatchTurn {
            confirmed: vec![],
            rejected: vec![],
            pending: vec![],
            message: "nothing".to_string(),
        });
        assert_eq!(outcome.status(), ResponseStatus::Incomplete);
        assert_eq!(outcome.into_response().status, ResponseStatus::Incomplete);
    }

    #[test]
    fn test_non_object_gathered_falls_back_to_fields() {
        let engine = engine(ScriptedProvider::new(vec![]));
        let outcome = engine.interpret(
            r#"{"status":"incomplete","gathered":null,"fields":{"code":"CS101"}}"#,
            &TurnRequest::new("CS101 exam"),
        );

        match outcome {
            TurnOutcome::Incomplete { gathered, .. } => {
                assert_eq!(gathered.get("code"), Some(&json!("CS101")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overloaded_provider_yields_busy() {
        let overloaded = || {
            Err(ProviderError::HttpError {
                status_code: 503,
                message: "API request failed: The model is overloaded".to_string(),
            })
        };
        let engine = engine(ScriptedProvider::new(vec![
            overloaded(),
            overloaded(),
            overloaded(),
            Ok("unreachable".to_string()),
        ]));

        let outcome = engine.handle_turn(&TurnRequest::new("add my exam")).await;

        assert_eq!(outcome, TurnOutcome::error(BUSY_MESSAGE));
        assert_eq!(engine.provider().calls(), 3);
    }

    #[test]
    fn test_single_record_response_is_an_object() {
        let record = crate::schema::validate_candidate(&full_exam()).unwrap();
        let response = TurnOutcome::Complete {
            records: vec![record],
        }
        .into_response();

        assert_eq!(response.status, ResponseStatus::Complete);
        assert_eq!(response.data, Some(full_exam()));
        assert!(response.gathered.is_none());
    }

    #[test]
    fn test_turn_request_from_wire() {
        let request: AssistantRequest = serde_json::from_value(json!({
            "message": "March 10",
            "gatheredFields": {"code": "CS101"}
        }))
        .unwrap();
        let turn = TurnRequest::try_from(request).unwrap();
        assert!(turn.is_mid_conversation());

        let err = TurnRequest::try_from(AssistantRequest::new("")).unwrap_err();
        assert_eq!(err, RequestError::MissingMessage);
    }
}
