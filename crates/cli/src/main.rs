mod commands;
mod context;
mod exit;
mod interactive;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::*;
use console::style;
use context::CommandContext;
use logging::LoggingConfig;
use tabula_core::{AppConfig, AppConfigTrait};

#[derive(Parser)]
#[command(name = "tabula", version)]
#[command(about = "JSON-driven migrations and seeders for PostgreSQL and MySQL")]
struct Cli {
    /// Root directory holding migrations/, seeders/ and factory/
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Emit logs and results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate {
        /// Only this migration file
        file: Option<String>,

        /// Database backend (pg or mysql)
        #[arg(long)]
        db: Option<String>,
    },

    /// Roll back applied migrations
    #[command(name = "migrate:rollback")]
    Rollback {
        /// Only this migration file
        file: Option<String>,

        #[arg(long)]
        db: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show which migrations are applied
    #[command(name = "migrate:status")]
    Status {
        #[arg(long)]
        db: Option<String>,
    },

    /// Run seeders
    Seed {
        /// Only this seeder file
        file: Option<String>,

        #[arg(long)]
        db: Option<String>,

        /// Skip the confirmation prompt and allow seeding in production
        #[arg(long)]
        force: bool,
    },

    /// Create a new migration document
    #[command(name = "make:migration")]
    MakeMigration {
        name: String,

        #[arg(long)]
        db: Option<String>,
    },

    /// Create a new seeder document
    #[command(name = "make:seeder")]
    MakeSeeder {
        name: String,

        #[arg(long)]
        db: Option<String>,
    },

    /// Create a new factory document
    #[command(name = "make:factory")]
    MakeFactory { name: String },

    /// Print the SQL a migration compiles to
    Compile {
        file: String,

        #[arg(long)]
        db: Option<String>,

        /// Compile the rollback section instead
        #[arg(long)]
        rollback: bool,
    },
}

impl Commands {
    fn db(&self) -> Option<&str> {
        match self {
            Commands::Migrate { db, .. }
            | Commands::Rollback { db, .. }
            | Commands::Status { db }
            | Commands::Seed { db, .. }
            | Commands::MakeMigration { db, .. }
            | Commands::MakeSeeder { db, .. }
            | Commands::Compile { db, .. } => db.as_deref(),
            Commands::MakeFactory { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => exit::SUCCESS,
        Err(err) => {
            tracing::error!(target: "tabula::cli", "{:#}", err);
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            exit::exit_code(&err)
        }
    };
    ExitCode::from(code)
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::init_logging(&LoggingConfig::for_environment(config.environment, &config.log_level).with_json(cli.json))?;

    if let Err(e) = config.validate() {
        tracing::debug!(target: "tabula::cli", "Configuration incomplete: {}", e);
    }

    let ctx = CommandContext::new(config, cli.command.db(), cli.path.as_deref(), cli.json)?;
    tracing::debug!(target: "tabula::cli", "Using {} documents under {}", ctx.backend, ctx.root.display());

    match cli.command {
        Commands::Migrate { file, .. } => migrate::run(&ctx, file.as_deref()).await,
        Commands::Rollback { file, force, .. } => migrate::rollback(&ctx, file.as_deref(), force).await,
        Commands::Status { .. } => migrate::status(&ctx).await,
        Commands::Seed { file, force, .. } => seed::run(&ctx, file.as_deref(), force).await,
        Commands::MakeMigration { name, .. } => make::migration(&ctx, &name).await,
        Commands::MakeSeeder { name, .. } => make::seeder(&ctx, &name).await,
        Commands::MakeFactory { name } => make::factory(&ctx, &name).await,
        Commands::Compile { file, rollback, .. } => migrate::compile(&ctx, &file, rollback).await,
    }
}
