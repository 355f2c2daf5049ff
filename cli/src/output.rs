use anyhow::{Context, Result};
use colored::*;
use exam_planner_assistant::{BatchTally, Conversation, StoredExam, TurnOutcome};
use exam_planner_core::ExamRecord;
use serde::Serialize;
use uuid::Uuid;

/// First eight characters of an exam id, enough to address it in commands.
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

pub fn format_record(record: &ExamRecord) -> String {
    format!(
        "{} {} ({}, {}, semester {}) on {} {}-{}",
        record.code,
        record.subject,
        record.exam_type,
        record.category,
        record.semester,
        record.date,
        record.start_time,
        record.end_time
    )
}

fn assistant_says(message: &str) {
    println!("{}: {}", "Assistant".blue().bold(), message);
}

/// Print one turn outcome to the terminal
pub fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::OffTopic { message } => assistant_says(&message.yellow().to_string()),
        TurnOutcome::Incomplete {
            gathered,
            missing,
            message,
        } => {
            assistant_says(message);
            if !missing.is_empty() {
                println!("  {} {}", "Still needed:".cyan(), missing.join(", "));
            }
            for key in gathered.keys() {
                if let Some(value) = gathered.get(key) {
                    println!("  {}", format!("{}: {}", key, value).dimmed());
                }
            }
        }
        TurnOutcome::Complete { records } => {
            assistant_says(&"Exam details complete.".green().to_string());
            for record in records {
                println!("  {} {}", "+".green().bold(), format_record(record));
            }
        }
        TurnOutcome::Batch(batch) => {
            assistant_says(&batch.message);
            for record in &batch.confirmed {
                println!("  {} {}", "+".green().bold(), format_record(record));
            }
            for rejection in &batch.rejected {
                println!("  {} {}: {}", "!".red().bold(), rejection.date, rejection.reason);
            }
            for entry in &batch.pending {
                let missing = if entry.missing_fields.is_empty() {
                    "awaiting confirmation".to_string()
                } else {
                    format!("needs {}", entry.missing_fields.join(", "))
                };
                println!("  {} {} {}", "~".cyan(), entry.date, missing.dimmed());
            }
        }
        TurnOutcome::Error { message } => {
            eprintln!("{}: {}", "Error".red().bold(), message);
        }
    }
}

pub fn print_tally(tally: &BatchTally) {
    if tally.succeeded > 0 {
        println!("{}", format!("Saved {} exam(s).", tally.succeeded).green());
    }
    if tally.failed > 0 {
        println!("{}", format!("{} exam(s) could not be saved.", tally.failed).red());
    }
}

pub fn print_exams(exams: &[StoredExam]) {
    if exams.is_empty() {
        println!("{}", "No exams scheduled.".dimmed());
        return;
    }
    for exam in exams {
        let mark = if exam.completed {
            "[x]".green()
        } else {
            "[ ]".normal()
        };
        println!("{} {} {}", mark, short_id(&exam.id).dimmed(), format_record(&exam.record));
    }
}

pub fn print_state(conversation: &Conversation) {
    if conversation.is_empty() {
        println!("{}", "No exam in progress.".dimmed());
        return;
    }
    if !conversation.gathered().is_empty() {
        println!("{}", "Gathered so far:".cyan());
        for key in conversation.gathered().keys() {
            if let Some(value) = conversation.gathered().get(key) {
                println!("  {}: {}", key, value);
            }
        }
        println!(
            "  {} {}",
            "missing:".dimmed(),
            conversation.gathered().missing().join(", ")
        );
    }
    for entry in conversation.exam_dates() {
        println!("{} {} ({} field(s))", "Date".cyan(), entry.date, entry.fields.len());
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "exam-planner \"your message\"".green().bold());
    println!("    Describe an exam in one message");
    println!();
    println!("  {}", "exam-planner -i".green().bold());
    println!("    Start an interactive session that remembers partial details");
    println!();
    println!("{}", "Interactive commands:".cyan());
    println!("  /list              List saved exams");
    println!("  /complete <id>     Toggle an exam's completed mark");
    println!("  /delete <id>       Delete an exam");
    println!("  /state             Show the exam details gathered so far");
    println!("  /reset             Forget the exam in progress");
    println!("  exit, quit         End the session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --json             Print responses as JSON");
    println!("  --user <ID>        Owner of the saved exams");
    println!("  --help             Show this help message");
    println!();
}
