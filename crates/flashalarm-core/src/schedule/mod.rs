//! Alarm scheduling: time windows, notification delivery, repeat scheduler.

pub mod notification;
mod scheduler;
pub mod window;

pub use notification::{
    delivery_identifier, delivery_identifiers, DeliveryError, InMemoryNotificationCenter,
    NotificationCenter, NotificationPayload, NotificationRequest,
};
pub use scheduler::{RepeatScheduler, ScheduleEntry, ScheduleReport};
pub use window::{active_window, primary_trigger, repeat_trigger, ActiveWindow, REPEAT_BUDGET};
