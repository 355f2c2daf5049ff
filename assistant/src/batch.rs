//! Multi-date mode: each date gathers its own fields independently and every
//! confirmed date is validated and persisted on its own.

use exam_planner_core::{ExamDateEntry, ExamRecord, GatheredFields};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::machine::BatchTurn;
use crate::schema::{check_candidate, invalid_fields, valid_subset};
use crate::store::{ExamStore, StoredExam};

/// A date that could not be turned into an exam record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRejection {
    pub date: String,
    pub reason: String,
}

/// Aggregate result of persisting a batch; one failure never blocks its siblings.
#[derive(Debug, Default)]
pub struct BatchTally {
    pub succeeded: usize,
    pub failed: usize,
    pub stored: Vec<StoredExam>,
    pub failures: Vec<EntryRejection>,
}

impl BatchTally {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

fn parse_entry(value: &Value) -> Option<ExamDateEntry> {
    let object = value.as_object()?;
    let date = object
        .get("date")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())?;

    let fields = object
        .get("fields")
        .and_then(Value::as_object)
        .map(|f| GatheredFields::from_object(&valid_subset(f)))
        .unwrap_or_default();

    let missing_fields = object
        .get("missingFields")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(ExamDateEntry {
        date: date.to_string(),
        fields,
        missing_fields,
        is_confirmed: object
            .get("isConfirmed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Merges model-reported entries into the client's entries, keyed by date.
///
/// Fields merge last-write-wins; `missingFields` and `isConfirmed` are replaced.
/// Prior dates the model did not mention are kept as they were.
pub fn merge_entries(prior: &[ExamDateEntry], reported: &[Value]) -> Vec<ExamDateEntry> {
    let mut merged = prior.to_vec();

    for value in reported {
        let Some(entry) = parse_entry(value) else {
            warn!(entry = %value, "Skipping exam date entry without a date");
            continue;
        };
        match merged.iter_mut().find(|e| e.date == entry.date) {
            Some(existing) => {
                existing.fields.merge(&entry.fields);
                existing.missing_fields = entry.missing_fields;
                existing.is_confirmed = entry.is_confirmed;
            }
            None => merged.push(entry),
        }
    }

    merged
}

fn candidate_for(entry: &ExamDateEntry) -> Map<String, Value> {
    let mut candidate = entry.fields.to_object();
    candidate
        .entry("date".to_string())
        .or_insert_with(|| Value::String(entry.date.clone()));
    candidate
}

/// Folds the merged entries into confirmed records and still-pending dates.
///
/// A confirmed date that fails validation is counted as rejected and goes back
/// to the pending list unconfirmed, with its missing fields recomputed.
pub fn interpret_batch(
    prior: &[ExamDateEntry],
    reported: &[Value],
    message: Option<String>,
) -> BatchTurn {
    let mut confirmed = Vec::new();
    let mut rejected = Vec::new();
    let mut pending = Vec::new();

    for mut entry in merge_entries(prior, reported) {
        if !entry.is_confirmed {
            pending.push(entry);
            continue;
        }

        let candidate = candidate_for(&entry);
        match check_candidate(&candidate) {
            Ok(record) => confirmed.push(record),
            Err(reason) => {
                warn!(date = %entry.date, reason = %reason, "Confirmed exam date failed validation");
                rejected.push(EntryRejection {
                    date: entry.date.clone(),
                    reason: reason.to_string(),
                });
                entry.is_confirmed = false;
                entry.missing_fields = invalid_fields(&candidate);
                pending.push(entry);
            }
        }
    }

    let message = message.unwrap_or_else(|| default_message(&confirmed, &rejected, &pending));
    BatchTurn {
        confirmed,
        rejected,
        pending,
        message,
    }
}

fn default_message(
    confirmed: &[ExamRecord],
    rejected: &[EntryRejection],
    pending: &[ExamDateEntry],
) -> String {
    let mut parts = Vec::new();
    if !confirmed.is_empty() {
        parts.push(format!("{} exam(s) ready to save.", confirmed.len()));
    }
    if !rejected.is_empty() {
        parts.push(format!("{} exam(s) need corrections.", rejected.len()));
    }
    if !pending.is_empty() {
        parts.push(format!("Still gathering details for {} date(s).", pending.len()));
    }
    if parts.is_empty() {
        "No exam dates to process.".to_string()
    } else {
        parts.join(" ")
    }
}

/// Persists each record independently and tallies the results.
pub async fn commit_records<S>(store: &S, owner: &str, records: &[ExamRecord]) -> BatchTally
where
    S: ExamStore + ?Sized,
{
    let mut tally = BatchTally::default();

    for record in records {
        match store.create(owner, record.clone()).await {
            Ok(stored) => {
                tally.succeeded += 1;
                tally.stored.push(stored);
            }
            Err(e) => {
                error!(error = %e, date = %record.date, code = %record.code, "Failed to persist exam");
                tally.failed += 1;
                tally.failures.push(EntryRejection {
                    date: record.date.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(succeeded = tally.succeeded, failed = tally.failed, "Committed exam records");
    tally
}

/// Persists the confirmed records of a batch turn; its rejected dates count as failures.
pub async fn commit_batch<S>(store: &S, owner: &str, batch: &BatchTurn) -> BatchTally
where
    S: ExamStore + ?Sized,
{
    let mut tally = commit_records(store, owner, &batch.confirmed).await;
    tally.failed += batch.rejected.len();
    tally.failures.extend(batch.rejected.iter().cloned());
    tally
}
