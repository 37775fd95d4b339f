use anyhow::Result;
use clap::{Parser, Subcommand};
use lessonmap_core::config::{ConfigOverrides, ENV_API_URL, ENV_GRADE, ENV_MODEL};
use std::path::PathBuf;

mod commands;
mod context;
mod notifier;

use context::AppContext;

#[derive(Parser)]
#[command(name = "lessonmap")]
#[command(about = "LessonMap CLI - AI-generated concept maps for lessons", long_about = None)]
struct Cli {
    /// Lesson server base URL
    #[arg(long, global = true, env = ENV_API_URL)]
    api_url: Option<String>,

    /// Model used for generation and subtopics
    #[arg(long, global = true, env = ENV_MODEL)]
    model: Option<String>,

    /// Grade level (10, 12 or college)
    #[arg(long, global = true, env = ENV_GRADE)]
    grade: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    #[command(flatten)]
    Server(ServerCommands),
}

/// Commands that talk to the lesson server.
#[derive(Subcommand)]
enum ServerCommands {
    /// Request a one-time passcode by email
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Verify the emailed passcode and start a session
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        otp: String,
    },
    /// End the current session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Rename the signed-in user
    Rename { name: String },
    /// Stream a concept map for a topic
    Generate {
        topic: String,
        /// Do not save the finished lesson
        #[arg(long)]
        no_save: bool,
        /// Also write the rendered diagram as SVG
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// List saved lessons
    Lessons,
    /// Show a saved lesson
    Show {
        id: String,
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Show the subtopic content of one node of a saved lesson
    Open { id: String, node_id: String },
    /// Delete a saved lesson
    Delete { id: String },
    /// Delete every saved lesson
    ClearHistory,
    /// Manage cached subtopic content
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove all cached subtopic content
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set a key in the configuration file
    Set { key: String, value: String },
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "lessonmap=debug" } else { "lessonmap=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let overrides = ConfigOverrides {
        api_url: cli.api_url,
        model: cli.model,
        grade: cli.grade,
    };

    match cli.command {
        // config commands work without a reachable server or a session
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(overrides),
            ConfigAction::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Server(command) => {
            let ctx = AppContext::load(overrides)?;
            run(&ctx, command).await
        }
    }
}

async fn run(ctx: &AppContext, command: ServerCommands) -> Result<()> {
    match command {
        ServerCommands::Signin { email, name } => commands::auth::signin(ctx, &email, &name).await,
        ServerCommands::Verify { email, name, otp } => {
            commands::auth::verify(ctx, &email, &name, &otp).await
        }
        ServerCommands::Logout => commands::auth::logout(ctx).await,
        ServerCommands::Whoami => commands::auth::whoami(ctx).await,
        ServerCommands::Rename { name } => commands::auth::rename(ctx, &name).await,
        ServerCommands::Generate { topic, no_save, svg } => {
            commands::lesson::generate(ctx, &topic, !no_save, svg.as_deref()).await
        }
        ServerCommands::Lessons => commands::lesson::list(ctx).await,
        ServerCommands::Show { id, svg } => commands::lesson::show(ctx, &id, svg.as_deref()).await,
        ServerCommands::Open { id, node_id } => commands::lesson::open(ctx, &id, &node_id).await,
        ServerCommands::Delete { id } => commands::lesson::delete(ctx, &id).await,
        ServerCommands::ClearHistory => commands::lesson::clear_history(ctx).await,
        ServerCommands::Cache { action } => match action {
            CacheAction::Clear => commands::cache::clear(ctx).await,
        },
    }
}
