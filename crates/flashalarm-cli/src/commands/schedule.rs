use chrono::Local;
use clap::Subcommand;
use flashalarm_core::schedule::active_window;
use flashalarm_core::{Config, NotificationCenter, REPEAT_BUDGET};
use serde::Serialize;

use super::{find_alarm, open_store};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// List pending notifications, earliest first
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's active window for an alarm
    Window {
        /// Alarm ID (or unique prefix)
        id: String,
    },
    /// Retract every pending notification
    Clear,
}

#[derive(Serialize)]
struct WindowReport {
    alarm_id: String,
    start: String,
    end: String,
    active: bool,
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store()?;

    match action {
        ScheduleAction::Pending { json } => {
            let mut pending = store.scheduler().center().pending();
            pending.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.identifier.cmp(&b.identifier)));
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("nothing pending");
            } else {
                for request in &pending {
                    let at = request.fire_at.with_timezone(&Local);
                    println!("{}  {}  {}", at.format("%Y-%m-%d %H:%M"), request.identifier, request.body);
                }
            }
        }
        ScheduleAction::Window { id } => {
            let config = Config::load()?;
            let alarm = find_alarm(&store, &id)?;
            let now = Local::now();
            let window = active_window(alarm.time, config.snooze_interval_minutes(), REPEAT_BUDGET, &now);
            let report = WindowReport {
                alarm_id: alarm.id.to_string(),
                start: window.start.format("%H:%M").to_string(),
                end: window.end.format("%H:%M").to_string(),
                active: alarm.enabled && window.contains(&now),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ScheduleAction::Clear => {
            store.scheduler_mut().cancel_all();
            println!("pending notifications cleared");
        }
    }
    Ok(())
}
