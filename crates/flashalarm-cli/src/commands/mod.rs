pub mod alarm;
pub mod challenge;
pub mod config;
pub mod schedule;
pub mod watch;

use flashalarm_core::storage::data_dir;
use flashalarm_core::{Alarm, AlarmStore, JsonNotificationCenter, RepeatScheduler};

pub type Store = AlarmStore<JsonNotificationCenter>;

/// Open the alarm list and the shared pending-notification file.
pub fn open_store() -> Result<Store, Box<dyn std::error::Error>> {
    let dir = data_dir()?;
    let center = JsonNotificationCenter::open(dir.join("pending.json"))?;
    let store = AlarmStore::open(dir.join("alarms.json"), RepeatScheduler::new(center))?;
    Ok(store)
}

/// Resolve an id or unique id prefix given on the command line.
pub fn find_alarm(store: &Store, id: &str) -> Result<Alarm, Box<dyn std::error::Error>> {
    store
        .find(id)
        .cloned()
        .ok_or_else(|| format!("no alarm matches '{id}'").into())
}
