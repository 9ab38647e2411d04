//! Registers dailytrack to run when the user logs in. Registration is a one-shot, best-effort
//! side effect of starting the application: it never blocks tracking when it fails.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum AutostartOutcome {
    Installed(PathBuf),
    AlreadyInstalled(PathBuf),
}

/// Registers `exe args..` to run at login, logging instead of failing.
fn ensure_autostart(exe: &Path, args: &[&str]) {
    match register_autostart(exe, args) {
        Ok(AutostartOutcome::Installed(path)) => info!("Registered autostart entry {path:?}"),
        Ok(AutostartOutcome::AlreadyInstalled(path)) => {
            debug!("Autostart entry {path:?} is already up to date")
        }
        Err(e) => warn!("Couldn't register autostart {e:?}"),
    }
}

/// Logins start the daemon binary on `app_dir`. The cli and the daemon both register through
/// here, so they agree on a single entry.
pub fn ensure_daemon_autostart(daemon: &Path, app_dir: &Path) {
    let app_dir = app_dir.display().to_string();
    ensure_autostart(daemon, &daemon_args(&app_dir));
}

fn daemon_args(app_dir: &str) -> [&str; 2] {
    ["--dir", app_dir]
}

pub fn register_autostart(exe: &Path, args: &[&str]) -> Result<AutostartOutcome> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            let dir = env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA is not set"))?
                .join(r"Microsoft\Windows\Start Menu\Programs\Startup");
            install_entry(&dir.join("dailytrack.cmd"), &startup_script(exe, args), None)
        } else if #[cfg(target_os = "macos")] {
            let dir = home()?.join("Library/LaunchAgents");
            install_entry(
                &dir.join("com.user.dailytrack.plist"),
                &launch_agent(exe, args),
                Some(0o644),
            )
        } else {
            let dir = env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| home().map(|home| home.join(".config")))?
                .join("autostart");
            install_entry(
                &dir.join("dailytrack.desktop"),
                &desktop_entry(exe, args),
                Some(0o755),
            )
        }
    }
}

#[cfg(not(windows))]
fn home() -> Result<PathBuf> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("HOME is not set"))
}

/// Writes `contents` to `path` unless it is already there.
pub fn install_entry(path: &Path, contents: &str, mode: Option<u32>) -> Result<AutostartOutcome> {
    match fs::read_to_string(path) {
        Ok(existing) if existing == contents => {
            return Ok(AutostartOutcome::AlreadyInstalled(path.to_path_buf()))
        }
        Ok(_) => debug!("Replacing outdated autostart entry {path:?}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => Err(e)?,
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(AutostartOutcome::Installed(path.to_path_buf()))
}

fn command_line(exe: &Path, args: &[&str]) -> String {
    let mut line = format!("\"{}\"", exe.display());
    for arg in args {
        line.push(' ');
        if arg.contains(char::is_whitespace) {
            line.push_str(&format!("\"{arg}\""));
        } else {
            line.push_str(arg);
        }
    }
    line
}

pub fn desktop_entry(exe: &Path, args: &[&str]) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=Daily Health Tracker\n\
         Exec={}\n\
         Terminal=false\n\
         X-GNOME-Autostart-enabled=true\n",
        command_line(exe, args)
    )
}

pub fn launch_agent(exe: &Path, args: &[&str]) -> String {
    let arguments = std::iter::once(exe.display().to_string())
        .chain(args.iter().map(|v| v.to_string()))
        .map(|v| format!("        <string>{v}</string>\n"))
        .collect::<String>();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
         <plist version=\"1.0\">\n\
         <dict>\n\
         \x20   <key>Label</key>\n\
         \x20   <string>com.user.dailytrack</string>\n\
         \x20   <key>ProgramArguments</key>\n\
         \x20   <array>\n\
         {arguments}\
         \x20   </array>\n\
         \x20   <key>RunAtLoad</key>\n\
         \x20   <true/>\n\
         </dict>\n\
         </plist>\n"
    )
}

pub fn startup_script(exe: &Path, args: &[&str]) -> String {
    format!("@echo off\r\nstart \"\" {}\r\n", command_line(exe, args))
}
