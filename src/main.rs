use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use arena_core::application::services::{BotCommandService, SubmitCommand};
use arena_core::domain::entities::BotCommand;
use arena_core::infrastructure::adapters::ConsoleBackend;
use arena_core::infrastructure::config::Config;
use arena_core::infrastructure::database::SqliteCommandRepository;
use arena_core::ServiceError;

#[derive(Parser)]
#[command(name = "arena-core")]
#[command(about = "Command orchestration core for game backends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// Submit a bot command through idempotent intake
    SubmitCommand {
        /// Idempotency key identifying the intent
        #[arg(long)]
        key: String,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        payload: String,
        /// Player to acknowledge once queued
        #[arg(long)]
        player: Option<String>,
    },
    /// Report a worker attempt; omit --error for success
    RecordAttempt {
        #[arg(long)]
        id: String,
        #[arg(long)]
        error: Option<String>,
    },
    /// Re-enqueue a failed or stranded command
    RetryCommand {
        #[arg(long)]
        id: String,
    },
    /// List stored bot commands
    ListCommands {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    match cli.command {
        Commands::Version => {
            println!("arena-core v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => match config.to_yaml() {
            Ok(yaml) => {
                println!("{}", yaml);
                println!("\nSave this to config.yaml and adjust as needed.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
        command => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to start runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match rt.block_on(run(&config, command)) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("{}", e);
                    if e.local_state_changed() {
                        eprintln!("error: {} (saved locally, safe to retry the sync)", e);
                    } else {
                        eprintln!("error: {}", e);
                    }
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn load_config(path: &str) -> Result<Config, arena_core::ConfigError> {
    if Path::new(path).exists() {
        Config::load(path)
    } else {
        Config::load_env()
    }
}

async fn run(config: &Config, command: Commands) -> Result<(), ServiceError> {
    let repo = Arc::new(SqliteCommandRepository::open(&config.storage.database)?);
    let backend = Arc::new(ConsoleBackend::new(config.service.name.clone()));
    let service = BotCommandService::new(repo, backend.clone())
        .with_notifier(backend)
        .with_provider_timeout(config.provider_timeout());

    match command {
        Commands::SubmitCommand {
            key,
            channel,
            payload,
            player,
        } => {
            let accepted = service
                .handle(SubmitCommand {
                    idempotency_key: key.into(),
                    channel,
                    payload: payload.into_bytes(),
                    player_id: player.map(Into::into),
                })
                .await?;
            if accepted.replayed {
                println!("{} (already completed)", accepted.command_id);
            } else {
                println!("{} accepted", accepted.command_id);
            }
        }
        Commands::RecordAttempt { id, error } => {
            let outcome = match error {
                Some(e) => Err(e),
                None => Ok(()),
            };
            let command = service.record_attempt(&id.into(), outcome).await?;
            print_command(&command);
        }
        Commands::RetryCommand { id } => {
            let command = service.retry(&id.into()).await?;
            print_command(&command);
        }
        Commands::ListCommands { limit, offset } => {
            for command in service.list_commands(limit, offset).await? {
                print_command(&command);
            }
        }
        Commands::Version | Commands::InitConfig => {}
    }
    Ok(())
}

fn print_command(command: &BotCommand) {
    println!(
        "{}  {:<9}  key={}  channel={}  retries={}{}",
        command.id,
        command.state.as_str(),
        command.idempotency_key,
        command.channel,
        command.retry_count,
        command
            .last_error
            .as_deref()
            .map(|e| format!("  error={}", e))
            .unwrap_or_default()
    );
}
