use colored::Colorize;
use lessonmap_core::api::{Notification, NotificationLevel, Notifier};

/// Prints notifications to stderr, colored by level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!("[Notify] {}: {}", notification.level, notification.message);
        let line = match notification.level {
            NotificationLevel::Success => format!("✔ {}", notification.message).green(),
            NotificationLevel::Info => notification.message.bright_black(),
            NotificationLevel::Error => format!("✖ {}", notification.message).red(),
        };
        eprintln!("{line}");
    }
}
