use std::{process::Stdio, time::Duration};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{Notification, Notifier};

/// Extra time given to a helper program on top of the notification timeout.
const COMMAND_GRACE: Duration = Duration::from_secs(5);

/// Shows notifications by running a platform helper program.
pub struct CommandNotifier {
    program: &'static str,
    build_args: fn(&Notification) -> Vec<String>,
    // Some helpers report an auto-closed dialog through a dedicated exit code.
    timeout_exit_code: Option<i32>,
}

impl CommandNotifier {
    /// The desktop's own notification mechanism.
    pub fn system() -> Option<Self> {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "linux")] {
                Some(Self {
                    program: "notify-send",
                    build_args: notify_send_args,
                    timeout_exit_code: None,
                })
            } else if #[cfg(target_os = "macos")] {
                Some(Self {
                    program: "osascript",
                    build_args: osascript_notification_args,
                    timeout_exit_code: None,
                })
            } else if #[cfg(windows)] {
                Some(Self {
                    program: "msg",
                    build_args: msg_args,
                    timeout_exit_code: None,
                })
            } else {
                None
            }
        }
    }

    /// A small window that closes on its own after the notification timeout.
    pub fn popup() -> Option<Self> {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "linux")] {
                Some(Self {
                    program: "zenity",
                    build_args: zenity_args,
                    timeout_exit_code: Some(5),
                })
            } else if #[cfg(target_os = "macos")] {
                Some(Self {
                    program: "osascript",
                    build_args: osascript_dialog_args,
                    timeout_exit_code: None,
                })
            } else {
                None
            }
        }
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    pub fn args(&self, notification: &Notification) -> Vec<String> {
        (self.build_args)(notification)
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        let mut command = Command::new(self.program);
        command
            .args(self.args(&notification))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} for {:?}", self.program, notification.title);
        let output = tokio::time::timeout(notification.timeout + COMMAND_GRACE, command.output())
            .await
            .map_err(|_| anyhow!("{} didn't finish in time", self.program))??;

        match output.status.code() {
            Some(0) => Ok(()),
            Some(code) if Some(code) == self.timeout_exit_code => Ok(()),
            _ => bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }
}

#[cfg(target_os = "linux")]
fn notify_send_args(notification: &Notification) -> Vec<String> {
    vec![
        "--app-name=dailytrack".into(),
        format!("--expire-time={}", notification.timeout.as_millis()),
        notification.title.clone(),
        notification.message.clone(),
    ]
}

#[cfg(target_os = "linux")]
fn zenity_args(notification: &Notification) -> Vec<String> {
    vec![
        "--info".into(),
        format!("--title={}", notification.title),
        format!("--text={}", notification.message),
        format!("--timeout={}", notification.timeout.as_secs().max(1)),
    ]
}

#[cfg(target_os = "macos")]
fn osascript_notification_args(notification: &Notification) -> Vec<String> {
    vec![
        "-e".into(),
        format!(
            "display notification \"{}\" with title \"{}\"",
            apple_script_escape(&notification.message),
            apple_script_escape(&notification.title)
        ),
    ]
}

#[cfg(target_os = "macos")]
fn osascript_dialog_args(notification: &Notification) -> Vec<String> {
    vec![
        "-e".into(),
        format!(
            "display dialog \"{}\" with title \"{}\" buttons {{\"OK\"}} giving up after {}",
            apple_script_escape(&notification.message),
            apple_script_escape(&notification.title),
            notification.timeout.as_secs().max(1)
        ),
    ]
}

#[cfg(target_os = "macos")]
fn apple_script_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(windows)]
fn msg_args(notification: &Notification) -> Vec<String> {
    vec![
        "*".into(),
        format!("/TIME:{}", notification.timeout.as_secs().max(1)),
        format!("{}: {}", notification.title, notification.message),
    ]
}
