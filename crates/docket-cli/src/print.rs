use docket::tracker::NotificationLevel;
use docket::TrackerEvent;

/// One line per event; events without a notification print their state.
pub fn event_line(event: &TrackerEvent) -> String {
    match &event.notification {
        Some(notification) => {
            let level = match notification.level {
                NotificationLevel::Info => "info",
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "error",
            };
            format!(
                "[{}] {}: {} ({})",
                level, notification.title, notification.description, event.record_id
            )
        }
        None => match &event.job_id {
            Some(job_id) => format!("{} {} -> {}", event.record_id, job_id, event.state),
            None => format!("{} -> {}", event.record_id, event.state),
        },
    }
}
