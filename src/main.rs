//! Toolsmith CLI.
//!
//! Usage:
//!   toolsmith init              Write a default config
//!   toolsmith ask <question>    Answer one question
//!   toolsmith chat              Interactive session with history
//!   toolsmith tools             Show the tool catalog
//!   toolsmith runs              Show recent runs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use toolsmith::agent::Agent;
use toolsmith::config::{self, AgentConfig, API_KEY_ENV};
use toolsmith::inference::InferenceClient;
use toolsmith::state::{Database, RunRecord};
use toolsmith::tools::{builtin_registry, ToolRegistry, Workspace};
use toolsmith::types::*;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "toolsmith")]
#[command(version = "0.1.0")]
#[command(about = "Tool-using reasoning agent for API specs and client code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to toolsmith home directory.
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file if none exists.
    Init,

    /// Answer a single question.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start an interactive session that keeps conversation history.
    Chat,

    /// Print the tool catalog shown to the model.
    Tools,

    /// Show recent runs from the run log.
    Runs {
        /// Number of runs to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = match &cli.home {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let config_path = config::config_path(&home_dir);
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => cmd_init(&config_path),
        Commands::Ask { question } => cmd_ask(cfg, &question).await,
        Commands::Chat => cmd_chat(cfg).await,
        Commands::Tools => cmd_tools(&cfg),
        Commands::Runs { limit } => cmd_runs(&cfg, limit),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(config_path: &Path) -> Result<()> {
    if !config::init_config(config_path)? {
        println!(
            "{} Config already exists at {}",
            "!".yellow().bold(),
            config_path.display()
        );
        return Ok(());
    }

    println!(
        "{} Wrote default config to {}",
        ">>>".green().bold(),
        config_path.display()
    );
    println!("    Set `api_key` there or export {}.", API_KEY_ENV);
    Ok(())
}

async fn cmd_ask(cfg: AgentConfig, question: &str) -> Result<()> {
    let (mut agent, db) = bootstrap(cfg.clone())?;

    let result = agent.run(question).await;
    print_result(&result);
    log_run(&db, question, &cfg.model, &result);
    Ok(())
}

async fn cmd_chat(cfg: AgentConfig) -> Result<()> {
    let (mut agent, db) = bootstrap(cfg.clone())?;

    println!(
        "{} Chatting with {} ({} tools). Commands: /history, /clear, /prompt, /exit",
        ">>>".green().bold(),
        cfg.model,
        agent.registry().len(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                agent.clear_history();
                println!("{}", "History cleared.".dimmed());
            }
            "/prompt" => println!("{}", agent.system_prompt().dimmed()),
            "/history" => {
                println!("{}", agent.history_summary().bold());
                for message in agent.history() {
                    println!("  [{}] {}", message.role, preview(&message.content, 120));
                }
            }
            question => {
                let result = agent.run(question).await;
                print_result(&result);
                log_run(&db, question, &cfg.model, &result);
            }
        }
    }

    info!("Chat session ended");
    Ok(())
}

fn cmd_tools(cfg: &AgentConfig) -> Result<()> {
    let registry = build_registry(cfg)?;
    println!("{}", "=== Tools ===".bold());
    println!();
    print!("{}", registry.describe());
    Ok(())
}

fn cmd_runs(cfg: &AgentConfig, limit: usize) -> Result<()> {
    let db = open_database(cfg)?;
    let runs = db.recent_runs(limit)?;

    println!();
    println!(
        "{} ({} total, ${:.4} spent)",
        "=== Recent Runs ===".bold(),
        db.run_count()?,
        db.total_cost()?
    );
    println!();

    if runs.is_empty() {
        println!("  {}", "No runs yet.".dimmed());
        return Ok(());
    }

    for run in runs {
        println!(
            "  {} {} [{}] {} step(s), ${:.4}",
            run.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            colorize_outcome(run.outcome),
            run.model,
            run.steps.len(),
            run.total_cost,
        );
        println!("    Q: {}", preview(&run.question, 100));
        println!("    A: {}", preview(&run.answer, 100));
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap the runtime: credentials, tools, model client, and run log.
fn bootstrap(mut cfg: AgentConfig) -> Result<(Agent, Database)> {
    if config::apply_api_key_env(&mut cfg, std::env::var(API_KEY_ENV).ok()) {
        debug!("Using API key from {}", API_KEY_ENV);
    }

    let registry = Arc::new(build_registry(&cfg)?);
    let model = Arc::new(InferenceClient::from_config(&cfg)?);
    let agent = Agent::new(&cfg, registry, model)?;
    let db = open_database(&cfg)?;

    Ok((agent, db))
}

fn build_registry(cfg: &AgentConfig) -> Result<ToolRegistry> {
    let workspace = Workspace::new(cfg.resolved_workspace_dir());
    Ok(builtin_registry(workspace)?)
}

fn open_database(cfg: &AgentConfig) -> Result<Database> {
    let db_path = cfg.resolved_db_path();
    let db_path = Path::new(&db_path);
    Database::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

/// Failing to log a run never fails the command.
fn log_run(db: &Database, question: &str, model: &str, result: &RunResult) {
    if let Err(e) = db.save_run(&RunRecord::from_result(question, model, result)) {
        warn!("Failed to record run: {}", e);
    }
}

fn print_result(result: &RunResult) {
    println!();
    for (i, step) in result.steps.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).dimmed(), step.thought);
        if let Some(action) = &step.action {
            println!("     {} {}", "->".cyan(), action.cyan());
        }
        if let Some(observation) = &step.observation {
            println!("     {}", preview(observation, 160).dimmed());
        }
    }
    println!();
    println!("{}", result.answer);
    println!();
    println!(
        "  {} | {} iteration(s) | ${:.4}",
        colorize_outcome(result.outcome),
        result.iterations,
        result.total_cost
    );
}

fn colorize_outcome(outcome: RunOutcome) -> String {
    let label = outcome.to_string();
    match outcome {
        RunOutcome::Answered => label.green().to_string(),
        RunOutcome::RepetitionAborted | RunOutcome::IterationBudgetExhausted => {
            label.yellow().to_string()
        }
        RunOutcome::Failed => label.red().to_string(),
    }
}

fn preview(text: &str, cap: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= cap {
        flat
    } else {
        format!("{}...", flat.chars().take(cap).collect::<String>())
    }
}
