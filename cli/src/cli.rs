use clap::Parser;
use std::path::PathBuf;

/// Conversational exam schedule assistant
#[derive(Parser, Debug)]
#[command(name = "exam-planner", author, version, about, long_about = None)]
pub struct Args {
    /// Describe an exam to add, e.g. "CS101 mid term on March 10"
    #[arg(index = 1)]
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Print each turn in the wire JSON shape
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// User id that owns the stored exams
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Gemini API key
    #[arg(short = 'k', long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
