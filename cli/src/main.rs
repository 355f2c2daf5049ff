use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use exam_planner_assistant::{ConversationEngine, InMemoryExamStore};
use exam_planner_core::config::PlannerConfig;
use exam_planner_core::GeminiClient;
use tracing::{debug, info};

mod app;
mod cli;
mod logging;
mod output;

use crate::app::App;
use crate::cli::Args;
use crate::output::print_usage_instructions;

/// Loads the config file, then lets command-line flags override it.
fn load_config(args: &Args) -> Result<PlannerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = PlannerConfig::load_from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            dotenvy::dotenv().ok();
            config.apply_env();
            config
        }
        None => PlannerConfig::load().context("Failed to load configuration")?,
    };

    if let Some(api_key) = &args.api_key {
        config.api_key = Some(api_key.clone());
    }
    if let Some(model) = &args.model {
        config.model_name = Some(model.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    logging::init(config.log_level.as_deref(), args.verbose)?;
    debug!(model = ?config.model_name, user = %args.user, "Configuration loaded");

    if !args.interactive && args.prompt.is_none() {
        print_usage_instructions();
        return Ok(());
    }

    let client = match GeminiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", format!("Error initializing Gemini client: {}", e).red());
            return Err(e.into());
        }
    };
    info!(model = client.model_name(), "Gemini client ready");

    let engine = ConversationEngine::from_config(client, &config);
    let mut app = App::new(engine, InMemoryExamStore::new(), args.user.clone(), args.json);

    if args.interactive {
        app.run_interactive_chat().await
    } else if let Some(prompt) = args.prompt {
        app.run_single_query(&prompt).await
    } else {
        Ok(())
    }
}
