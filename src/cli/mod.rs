pub mod daemon_path;
pub mod output;
pub mod process;

use std::{
    env,
    io::{stdout, IsTerminal},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use output::{creatine_message, increment_message, render_status};
use process::{kill_previous_servers, restart_server};
use tracing::level_filters::LevelFilter;

use crate::{
    autostart::ensure_daemon_autostart,
    daemon::{
        start_daemon,
        storage::{entities::Counter, record_storage::RecordStorageImpl, tracker::Tracker},
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::{resolve_application_path, AppPaths},
        event_log::EventLog,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "dailytrack", version, long_about = None)]
#[command(about = "Tracks creatine, water and sunscreen for the day", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Show today's progress")]
    Status,
    #[command(about = "Mark creatine as taken")]
    Creatine {
        #[arg(long, help = "Mark creatine as not taken instead")]
        undo: bool,
    },
    #[command(about = "Add a water bottle")]
    Water,
    #[command(about = "Add a sunscreen application")]
    Sunscreen,
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(long, help = "Don't register the daemon to run at login")]
        no_autostart: bool,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(long, help = "Don't register the daemon to run at login")]
        no_autostart: bool,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let app_dir = resolve_application_path(args.dir.clone())?;
    let paths = AppPaths::new(app_dir.clone());

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &paths.logs(), logging_level, args.log)?;
    let custom_dir = args.dir.is_some().then_some(app_dir.as_path());

    match args.commands {
        Commands::Status => {
            let tracker = open_tracker(&paths).await?;
            let record = tracker.snapshot().await;
            println!("{}", render_status(&record, stdout().is_terminal()));
            Ok(())
        }
        Commands::Creatine { undo } => {
            let tracker = open_tracker(&paths).await?;
            tracker.set_creatine(!undo).await;
            println!("{}", creatine_message(!undo));
            Ok(())
        }
        Commands::Water => add(&paths, Counter::WaterBottles).await,
        Commands::Sunscreen => add(&paths, Counter::SunscreenApplications).await,
        Commands::Init { no_autostart } => {
            let cli = env::current_exe()?;
            restart_server(cli.clone(), custom_dir)?;
            println!("Daemon started");
            if !no_autostart {
                register(&cli, &app_dir).await?;
            }
            Ok(())
        }
        Commands::Serve { no_autostart } => {
            if !no_autostart {
                register(&env::current_exe()?, &app_dir).await?;
            }
            start_daemon(app_dir).await
        }
        Commands::Stop => {
            let stopped = kill_previous_servers(&env::current_exe()?)?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
    }
}

async fn open_tracker(paths: &AppPaths) -> Result<Tracker<RecordStorageImpl>> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let event_log = EventLog::new(paths.event_log(), clock.clone());
    let storage = RecordStorageImpl::new(paths.record_file())?;
    Ok(Tracker::open(storage, event_log, clock).await)
}

async fn add(paths: &AppPaths, counter: Counter) -> Result<()> {
    let tracker = open_tracker(paths).await?;
    let increment = tracker.increment(counter).await;
    println!("{}", increment_message(&increment));
    Ok(())
}

/// Registers the daemon binary next to `cli` for login. Runs off the async workers.
async fn register(cli: &Path, app_dir: &Path) -> Result<()> {
    let daemon = to_daemon_path(cli.to_path_buf());
    let app_dir = app_dir.to_path_buf();
    tokio::task::spawn_blocking(move || ensure_daemon_autostart(&daemon, &app_dir)).await?;
    Ok(())
}
