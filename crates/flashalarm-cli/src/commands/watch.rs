//! Foreground alarm loop.
//!
//! On start the enabled alarms without pending notifications are
//! rescheduled and a catch-up check surfaces any alarm whose active window
//! contains the current time. Afterwards due notifications are delivered
//! every second through the resolver, and each activation runs its
//! challenge to completion before the alarm is dismissed in the store.

use std::time::Duration;

use chrono::{Local, Utc};
use clap::Args;
use flashalarm_core::{ActiveAlarmResolver, AlarmActivation, AudioLoop, ChallengeEngine, Config};

use super::{open_store, Store};
use crate::terminal::{run_challenge, Input, Output, TerminalBell};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct WatchArgs {
    /// Check once for active or due alarms, then exit
    #[arg(long)]
    once: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

pub fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(watch(args.once, Output::new(args.json)))
}

async fn watch(once: bool, output: Output) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut store = open_store()?;
    store.scheduler_mut().request_permissions();
    let restored = store.reconcile(config.snooze_interval_minutes(), &Local::now())?;
    if !restored.is_empty() {
        tracing::info!(count = restored.len(), "rescheduled alarms without pending notifications");
    }

    let (mut resolver, mut activations) = ActiveAlarmResolver::channel();
    let mut input = Input::spawn();

    resolver.on_activate(store.alarms(), &Local::now(), config.snooze_interval_minutes());
    deliver_due(&mut store, &mut resolver)?;

    if once {
        if let Ok(activation) = activations.try_recv() {
            ring(&mut store, &mut resolver, activation, &mut input, output).await?;
        } else {
            output.note("no active alarm");
        }
        return Ok(());
    }

    output.note("watching for alarms");
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            Some(activation) = activations.recv() => {
                if !ring(&mut store, &mut resolver, activation, &mut input, output).await? {
                    return Err("input closed while an alarm was ringing".into());
                }
            }
            _ = poll.tick() => {
                store.reload()?;
                deliver_due(&mut store, &mut resolver)?;
            }
        }
    }
}

/// Hand every due notification to the resolver.
fn deliver_due(store: &mut Store, resolver: &mut ActiveAlarmResolver) -> Result<(), Box<dyn std::error::Error>> {
    let center = store.scheduler_mut().center_mut();
    center.reload()?;
    let due = center.take_due(Utc::now())?;
    for request in &due {
        resolver.notification_delivered(&request.payload, store.alarms());
    }
    Ok(())
}

/// Run the challenge for an activated alarm and dismiss it.
///
/// Returns `false` if the session ended without a result.
async fn ring(
    store: &mut Store,
    resolver: &mut ActiveAlarmResolver,
    activation: AlarmActivation,
    input: &mut Input,
    output: Output,
) -> Result<bool, Box<dyn std::error::Error>> {
    output.emit(&[activation.to_event()])?;

    // Settings are read when the challenge starts, not when watch started.
    let config = Config::load()?;
    let alarm = activation.alarm;
    let audio = AudioLoop::new(TerminalBell).with_forced_fallback(config.audio.fallback_beep);
    let mut engine = ChallengeEngine::for_alarm(&alarm, config.max_attempts(), audio);

    let outcome = run_challenge(&mut engine, input, output).await?;
    drop(engine);
    resolver.finish(&alarm.id);

    match outcome {
        Some(solved) => {
            // Other processes may have edited either file during the session.
            store.reload()?;
            store.scheduler_mut().center_mut().reload()?;
            store.complete(&alarm.id, solved)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
