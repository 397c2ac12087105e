//! Command-line interface parsing and handling
//!
//! This module parses arguments, sets up diagnostics, and dispatches to the
//! subcommand handlers.

pub mod models;
pub mod prompt;
pub mod pull;
pub mod shell;


use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::api::DaemonClient;
use crate::cli::models::{list_models, remove_model, select_model, show_current_model, show_model};
use crate::cli::prompt::{run_prompt, PromptAttachments};
use crate::cli::pull::pull_model;
use crate::cli::shell::run_shell;
use crate::core::config::Config;
use crate::core::local_models::OllamaCli;
use crate::web::{self, WebState};

#[derive(Parser)]
#[command(name = "llamash")]
#[command(about = "A friendlier front end for a local Ollama daemon")]
#[command(
    long_about = "llamash talks to a locally running Ollama daemon from the command line or \
from your browser. Prompts can carry file and directory contents, and images for multimodal \
models. It also lists, pulls, inspects, and removes models.\n\n\
Environment Variables:\n\
  LLAMASH_DAEMON_URL  Daemon base URL (defaults to http://localhost:11434)\n\
  RUST_LOG            Diagnostic filter (defaults to warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Print debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Read and write settings at this path instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one prompt to the current model and print the answer
    Prompt {
        /// The message to send
        prompt: String,
        /// Append the contents of a file
        #[arg(short = 'f', long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Append every file under a directory
        #[arg(short = 'd', long, value_name = "PATH")]
        directory: Option<PathBuf>,
        /// Attach images (multimodal models only)
        #[arg(short = 'i', long, value_name = "PATH", value_delimiter = ',')]
        images: Vec<PathBuf>,
    },
    /// Start an interactive shell session with a model
    Run {
        /// Model to chat with, e.g. llama3 or qwen2.5-coder:7b
        model: String,
        /// Append the conversation to this file
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<String>,
    },
    /// Download a model and make it the current one
    Pull { model: String },
    /// List models from the public library, or installed ones
    List {
        /// Maximum number of library entries to show
        #[arg(short = 'l', long, default_value_t = crate::core::catalog::DEFAULT_LIMIT)]
        limit: usize,
        /// List locally installed models instead
        #[arg(long)]
        local: bool,
    },
    /// Show information about an installed model
    Show { model: String },
    /// Remove an installed model
    Rm { model: String },
    /// Select the model used by `prompt` and the browser chat
    Select { model: String },
    /// Print the currently selected model
    Model,
    /// Serve the browser chat backend
    Chat {
        /// Port to listen on (overrides the config file)
        #[arg(short = 'p', long)]
        port: Option<u16>,
        /// Do not try to open a browser
        #[arg(long)]
        no_browser: bool,
    },
}

impl Commands {
    fn needs_daemon(&self) -> bool {
        !matches!(self, Commands::Model | Commands::List { .. })
    }
}

/// Shared handles resolved once per invocation.
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    pub client: DaemonClient,
    pub inventory: OllamaCli,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let config_path = config_path.unwrap_or_else(Config::get_config_path);
        let config = Config::load_from_path(&config_path)?;
        let client = DaemonClient::with_timeout(config.daemon_url(), config.request_timeout());
        Ok(Self {
            config_path,
            config,
            client,
            inventory: OllamaCli::default(),
        })
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn print_daemon_hints(base_url: &str) {
    eprintln!("❌ Ollama is not running at {base_url}.");
    eprintln!("💡 Start it with: ollama serve");
    eprintln!("💡 Install it on Linux with: curl -fsSL https://ollama.com/install.sh | sh");
    eprintln!("💡 See https://ollama.com/download for other platforms.");
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let ctx = match Context::load(args.config) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    if args.command.needs_daemon() && !ctx.client.is_running().await {
        print_daemon_hints(ctx.client.base_url());
        std::process::exit(1);
    }

    match args.command {
        Commands::Prompt {
            prompt,
            file,
            directory,
            images,
        } => {
            let attachments = PromptAttachments {
                file,
                directory,
                images,
            };
            run_prompt(&ctx, &prompt, &attachments).await
        }
        Commands::Run { model, log } => run_shell(&ctx, &model, log).await,
        Commands::Pull { model } => pull_model(&ctx, &model).await,
        Commands::List { limit, local } => list_models(&ctx, limit, local).await,
        Commands::Show { model } => show_model(&ctx, &model).await,
        Commands::Rm { model } => remove_model(&ctx, &model).await,
        Commands::Select { model } => select_model(&ctx, &model).await,
        Commands::Model => show_current_model(&ctx),
        Commands::Chat { port, no_browser } => {
            let state = WebState::new(
                ctx.client.clone(),
                ctx.inventory.clone(),
                ctx.config_path.clone(),
            );
            web::serve(state, port.unwrap_or(ctx.config.web_port()), !no_browser).await
        }
    }
}
