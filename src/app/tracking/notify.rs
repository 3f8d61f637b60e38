use std::io::Write;
use std::process::Command as ProcessCommand;

use anyhow::{Context, Result, bail};

use crate::config::NotifierKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notification {
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) priority: u8,
}

impl Notification {
    pub(crate) fn progress(display_title: &str, episode: u32) -> Self {
        Self {
            title: "Progress updated".to_string(),
            message: format!("{display_title}: episode {episode}"),
            priority: 1,
        }
    }
}

/// Best-effort delivery; callers log failures and carry on.
pub(crate) trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

pub(crate) struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let urgency = match notification.priority {
            0 => "low",
            1 => "normal",
            _ => "critical",
        };
        let status = ProcessCommand::new("notify-send")
            .arg("--app-name=anitracker")
            .arg(format!("--urgency={urgency}"))
            .arg(&notification.title)
            .arg(&notification.message)
            .status()
            .context("failed to launch notify-send")?;
        if !status.success() {
            bail!("notify-send exited with {status}");
        }
        Ok(())
    }
}

pub(crate) struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "[{}] {}", notification.title, notification.message)
            .context("failed to write notification to stderr")
    }
}

pub(crate) fn notifier_for(kind: NotifierKind) -> Option<Box<dyn Notifier + Send>> {
    match kind {
        NotifierKind::Desktop => Some(Box::new(DesktopNotifier)),
        NotifierKind::Terminal => Some(Box::new(TerminalNotifier)),
        NotifierKind::Off => None,
    }
}
