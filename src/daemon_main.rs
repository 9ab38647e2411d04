// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::env::{self, args};

use anyhow::Result;
use clap::Parser;
use dailytrack::{
    autostart::ensure_daemon_autostart,
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::{resolve_application_path, AppPaths},
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::daemon_runtime,
    },
};

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x00000008;

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = DaemonArgs::parse_from(&command_args);

    if !args.force {
        #[cfg(windows)]
        {
            let mut command_args = command_args;
            println!("Starting detached process");
            use std::os::windows::process::CommandExt;

            command_args.push("--force".into());
            let process_name = env::current_exe()?;
            println!("Process {:?}", process_name);
            let mut command = std::process::Command::new(process_name);
            command.args(command_args.into_iter().skip(1));
            command.creation_flags(DETACHED_PROCESS);
            command.stdin(std::process::Stdio::null());
            command.stdout(std::process::Stdio::null());
            command.stderr(std::process::Stdio::null());
            #[allow(clippy::zombie_processes)]
            command.spawn()?;
            println!("Created daemon");
            return Ok(());
        }
        #[cfg(unix)]
        {
            use daemonize::Daemonize;

            // Resolved before detaching, the child runs from `/`.
            let app_dir = resolve_application_path(args.dir.clone())?;
            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent.inspect_err(|e| {
                        eprintln!("Failed to create daemon on parent side {e:?}")
                    })?;
                    println!("Created daemon");
                    return Ok(());
                }
                daemonize::Outcome::Child(_) => {
                    return run(DaemonArgs {
                        dir: Some(app_dir),
                        ..args
                    })
                }
            }
        }
    }

    run(args)
}

fn run(args: DaemonArgs) -> Result<()> {
    let paths = AppPaths::new(resolve_application_path(args.dir)?);
    enable_logging(DAEMON_PREFIX, &paths.logs(), args.log, args.log_console)?;
    if !args.no_autostart {
        ensure_daemon_autostart(&env::current_exe()?, paths.root());
    }
    daemon_runtime()?.block_on(async move { start_daemon(paths.root().to_path_buf()).await })?;
    Ok(())
}
