//! Warden CLI - run the bot core against a local console.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden::prelude::*;
use warden::sched::ScheduledTask;

/// Warden - chat moderation bot core
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Run the bot against a local console channel
    Run,

    /// Parse a time expression and show when it would fire
    Time {
        /// The expression, e.g. "every monday 09:00"
        expr: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warden=info",
        1 => "warden=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { force } => cmd_init(force).await,
        Commands::Run => cmd_run().await,
        Commands::Time { expr } => cmd_time(&expr.join(" ")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn cmd_init(force: bool) -> Result<()> {
    let path = config_path();
    if path.exists() && !force {
        return Err(WardenError::internal(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_config(&BotConfig::default()).await?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_time(text: &str) -> Result<()> {
    let catalog = StaticCatalog::english();
    let parser = TimeParser::new(&catalog);
    let Some((mut expr, consumed)) = parser.parse(text) else {
        return Err(WardenError::internal(format!("not a time expression: {text}")));
    };
    expr.auto_complete(&WallClock::now_local());

    let delay = next_fire_delay_ms(
        &expr,
        WallClock::now_local(),
        WallClock::local_offset_minutes(),
    );
    println!("kind:       {:?}", expr.kind());
    println!("normalized: {}", expr.to_text(&catalog));
    println!("consumed:   {consumed} of {} bytes", text.len());
    if delay > 0 {
        println!("fires in:   {} ms", delay);
    } else {
        println!("fires in:   already due ({delay} ms)");
    }
    Ok(())
}

/// Prints outbound messages to the console.
struct ConsoleMessenger;

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, _org: u64, channel: u64, text: &str) -> Result<()> {
        println!("[#{channel}] {text}");
        Ok(())
    }
}

/// Logs unmute tasks; a real deployment lifts the platform mute here.
struct UnmuteLogHandler;

#[async_trait]
impl TaskHandler for UnmuteLogHandler {
    async fn handle(&self, task: &ScheduledTask) -> Result<()> {
        info!(task = %task.key(), "mute lifted");
        Ok(())
    }
}

async fn cmd_run() -> Result<()> {
    let config = load_config().await?;

    let store = Arc::new(FileTaskStore::new(config.tasks_path()));
    store.init().await?;

    let scheduler = TaskScheduler::new(store);
    let messenger: Arc<dyn Messenger> = Arc::new(ConsoleMessenger);
    scheduler
        .register_handler(
            warden::command::remind::REMINDER_KIND,
            Arc::new(ReminderHandler::new(messenger.clone())),
        )
        .await;
    scheduler
        .register_handler(warden::command::mute::UNMUTE_KIND, Arc::new(UnmuteLogHandler))
        .await;

    let tree = Arc::new(ValidationTree::standard());
    let ctx = CommandContext {
        catalog: Arc::new(StaticCatalog::english()),
        scheduler: scheduler.clone(),
        messenger,
        entities: Arc::new(warden::platform::AllowAllResolver),
        org_offset_minutes: config.org_offset_minutes,
    };

    let mut dispatcher = Dispatcher::new(
        config.prefix.clone(),
        tree.clone(),
        ctx,
        Arc::new(warden::platform::OpenGate),
    );
    dispatcher.register(Arc::new(RemindCommand::new(&tree)));
    dispatcher.register(Arc::new(MuteCommand::new(&tree)));

    // Arm timers for whatever survived the last run, then keep
    // reconciling in the background.
    scheduler.sync_tasks().await?;
    let handle = scheduler.start(Duration::from_secs(config.sync_interval_secs));

    info!(prefix = %config.prefix, "warden running; type commands, ctrl-d to exit");

    use tokio::io::AsyncBufReadExt;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        let msg = CommandMessage::local(line);
                        if let Some(reply) = dispatcher.dispatch(&msg).await {
                            println!("{reply}");
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "stdin closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop().await;
    info!("warden stopped");
    Ok(())
}
