use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use exam_planner_assistant::{
    commit_batch, commit_records, BatchTally, Conversation, ConversationEngine, ExamStore,
    TurnOutcome,
};
use exam_planner_core::ExtractionProvider;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::output::{
    print_exams, print_json, print_outcome, print_state, print_tally, print_usage_instructions,
    short_id,
};

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    List,
    Complete(String),
    Delete(String),
    Reset,
    State,
    Message(String),
}

impl Command {
    /// Parses a trimmed, non-empty input line.
    pub fn parse(input: &str) -> Result<Self> {
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Ok(Command::Exit);
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Command::Message(input.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::to_string);

        match (name.as_str(), arg) {
            ("help", _) => Ok(Command::Help),
            ("list", _) => Ok(Command::List),
            ("reset", _) => Ok(Command::Reset),
            ("state", _) => Ok(Command::State),
            ("complete", Some(id)) => Ok(Command::Complete(id)),
            ("delete", Some(id)) => Ok(Command::Delete(id)),
            ("complete" | "delete", None) => bail!("Usage: /{} <id>", name),
            _ => bail!("Unknown command: /{}", name),
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner.set_message("Processing request...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Terminal session: holds the conversation state and owns the exam store.
pub struct App<P, S> {
    engine: ConversationEngine<P>,
    store: S,
    owner: String,
    conversation: Conversation,
    json: bool,
}

impl<P: ExtractionProvider, S: ExamStore> App<P, S> {
    pub fn new(engine: ConversationEngine<P>, store: S, owner: String, json: bool) -> Self {
        Self {
            engine,
            store,
            owner,
            conversation: Conversation::new(),
            json,
        }
    }

    /// Runs one turn, persists whatever it completed and folds it into the session state.
    pub async fn send(&mut self, message: &str) -> Result<TurnOutcome> {
        let request = self.conversation.try_request(message)?;
        debug!(mid_conversation = request.is_mid_conversation(), "Sending turn");

        let progress = (!self.json).then(spinner);
        let outcome = self.engine.handle_turn(&request).await;
        if let Some(progress) = progress {
            progress.finish_and_clear();
        }

        let tally = self.persist(&outcome).await;
        self.conversation.absorb(&outcome);

        if self.json {
            print_json(&outcome.clone().into_response())?;
        } else {
            print_outcome(&outcome);
            if let Some(tally) = &tally {
                print_tally(tally);
            }
        }
        Ok(outcome)
    }

    async fn persist(&self, outcome: &TurnOutcome) -> Option<BatchTally> {
        let tally = match outcome {
            TurnOutcome::Complete { records } => {
                commit_records(&self.store, &self.owner, records).await
            }
            TurnOutcome::Batch(batch) if !batch.confirmed.is_empty() || !batch.rejected.is_empty() => {
                commit_batch(&self.store, &self.owner, batch).await
            }
            _ => return None,
        };
        info!(owner = %self.owner, succeeded = tally.succeeded, failed = tally.failed, "Persisted turn");
        Some(tally)
    }

    /// Finds the owner's exam whose id equals or starts with `token`.
    pub async fn resolve_id(&self, token: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(token) {
            return Ok(id);
        }
        let token = token.to_lowercase();
        let exams = self.store.list(&self.owner).await?;
        let mut matches = exams
            .iter()
            .filter(|exam| exam.id.simple().to_string().starts_with(&token));

        match (matches.next(), matches.next()) {
            (Some(exam), None) => Ok(exam.id),
            (Some(_), Some(_)) => Err(anyhow!("Ambiguous exam id: {}", token)),
            (None, _) => Err(anyhow!("No exam matches id: {}", token)),
        }
    }

    /// Executes a slash command. Returns false when the session should end.
    pub async fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Exit => return Ok(false),
            Command::Help => print_usage_instructions(),
            Command::List => {
                let exams = self.store.list(&self.owner).await?;
                if self.json {
                    print_json(&exams)?;
                } else {
                    print_exams(&exams);
                }
            }
            Command::Complete(token) => {
                let id = self.resolve_id(&token).await?;
                let exam = self.store.toggle_complete(&self.owner, id).await?;
                let state = if exam.completed { "completed" } else { "not completed" };
                println!("Marked {} as {}.", short_id(&exam.id), state);
            }
            Command::Delete(token) => {
                let id = self.resolve_id(&token).await?;
                self.store.delete(&self.owner, id).await?;
                println!("Deleted {}.", short_id(&id));
            }
            Command::Reset => {
                self.conversation.reset();
                println!("Started a new exam.");
            }
            Command::State => {
                if self.json {
                    let state = serde_json::json!({
                        "gatheredFields": self.conversation.gathered(),
                        "examDates": self.conversation.exam_dates(),
                    });
                    print_json(&state)?;
                } else {
                    print_state(&self.conversation);
                }
            }
            Command::Message(message) => {
                self.send(&message).await?;
            }
        }
        Ok(true)
    }

    /// Runs a single query and prints the outcome
    pub async fn run_single_query(&mut self, prompt: &str) -> Result<()> {
        info!("Running single query");
        self.send(prompt).await?;
        Ok(())
    }

    /// Runs an interactive session that keeps partial exam details between messages
    pub async fn run_interactive_chat(&mut self) -> Result<()> {
        if !self.json {
            println!("Describe your exams. Type /help for commands, 'exit' to quit.");
            println!();
        }

        loop {
            if !self.json {
                print!("{}: ", "You".green().bold());
                io::stdout().flush().context("Failed to flush stdout")?;
            }

            let mut input = String::new();
            let read = io::stdin()
                .read_line(&mut input)
                .context("Failed to read input")?;
            if read == 0 {
                break;
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            let keep_going = match Command::parse(input) {
                Ok(command) => self.execute(command).await.unwrap_or_else(|e| {
                    eprintln!("{}: {}", "Error".red().bold(), e);
                    true
                }),
                Err(e) => {
                    eprintln!("{}", e.to_string().yellow());
                    true
                }
            };
            if !keep_going {
                println!("Exiting session.");
                break;
            }

            if !self.json {
                println!();
            }
        }

        Ok(())
    }
}
