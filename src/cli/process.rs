use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Process, Signal, System};
use tracing::{debug, info};

use super::daemon_path::to_daemon_path;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x00000008;

/// A running daemon is either `dailytrack serve` or the `dailytrack-daemon` binary. Other cli
/// invocations like `dailytrack water` are left alone.
fn is_server(process: &Process, cli: &Path) -> bool {
    let Some(exe) = process.exe().filter(|v| v.exists()) else {
        return false;
    };
    if exe == to_daemon_path(cli.to_path_buf()) {
        return true;
    }
    exe == cli && process.cmd().iter().any(|v| v.as_os_str() == OsStr::new("serve"))
}

/// Terminates running daemons. Returns how many were stopped.
pub fn kill_previous_servers(cli: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get the current pid {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if is_server(process, cli) {
            debug!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Shuts down previous daemons and starts `serve` as a detached process.
pub fn restart_server(cli: PathBuf, dir: Option<&Path>) -> Result<()> {
    let stopped = kill_previous_servers(&cli)?;
    info!("Stopped {stopped} previous daemons");

    let mut command = std::process::Command::new(cli);
    command.arg("serve");
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }
    // Autostart is registered by the cli itself.
    command.arg("--no-autostart");

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(DETACHED_PROCESS);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    info!("Spawned daemon {}", child.id());
    Ok(())
}
