use chrono::Local;
use clap::{Args, Subcommand};
use flashalarm_core::{Alarm, AudioLoop, ChallengeConfig, ChallengeEngine, Config, TimeOfDay};

use super::{find_alarm, open_store};
use crate::terminal::{run_challenge, Input, Output, TerminalBell};

#[derive(Args, Default)]
pub struct ChallengeOptions {
    /// Digits per number (1-5)
    #[arg(long)]
    digits: Option<u8>,
    /// Numbers per round (3-20)
    #[arg(long)]
    numbers: Option<u8>,
    /// Seconds each number stays on screen (0.1-3.0)
    #[arg(long)]
    speed: Option<f64>,
}

impl ChallengeOptions {
    /// Overlay the given options on `base`, validating the result.
    fn apply(&self, base: ChallengeConfig) -> Result<ChallengeConfig, Box<dyn std::error::Error>> {
        let config = ChallengeConfig::new(
            self.digits.unwrap_or(base.digit_count()),
            self.numbers.unwrap_or(base.number_count()),
            self.speed.unwrap_or(base.speed_secs()),
        )?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create an alarm
    Add {
        /// Time of day (HH:MM, 24h)
        time: TimeOfDay,
        /// Label shown in the notification
        #[arg(long, default_value = "")]
        label: String,
        /// Sound asset name
        #[arg(long)]
        sound: Option<String>,
        /// Create the alarm disabled
        #[arg(long)]
        disabled: bool,
        /// Allow a single attempt only
        #[arg(long)]
        no_retry: bool,
        #[command(flatten)]
        challenge: ChallengeOptions,
    },
    /// List alarms
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an alarm
    Edit {
        /// Alarm ID (or unique prefix)
        id: String,
        #[arg(long)]
        time: Option<TimeOfDay>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        sound: Option<String>,
        /// Whether a failed answer may be retried
        #[arg(long)]
        repeat_on_failure: Option<bool>,
        #[command(flatten)]
        challenge: ChallengeOptions,
    },
    /// Enable an alarm and schedule its notifications
    Enable {
        /// Alarm ID (or unique prefix)
        id: String,
    },
    /// Disable an alarm and retract its notifications
    Disable {
        /// Alarm ID (or unique prefix)
        id: String,
    },
    /// Delete an alarm
    Delete {
        /// Alarm ID (or unique prefix)
        id: String,
    },
    /// Run an alarm's challenge now, without touching its schedule
    Test {
        /// Alarm ID (or unique prefix)
        id: String,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let snooze = config.snooze_interval_minutes();
    let mut store = open_store()?;
    let now = Local::now();

    match action {
        AlarmAction::Add {
            time,
            label,
            sound,
            disabled,
            no_retry,
            challenge,
        } => {
            let mut alarm = Alarm::new(time, label).with_challenge(challenge.apply(ChallengeConfig::default())?);
            if let Some(sound) = sound {
                alarm = alarm.with_sound(sound);
            }
            alarm.enabled = !disabled;
            alarm.repeat_on_failure = !no_retry;
            store.add(alarm.clone(), snooze, &now)?;
            println!("{}", serde_json::to_string_pretty(&alarm)?);
        }
        AlarmAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(store.alarms())?);
            } else if store.alarms().is_empty() {
                println!("no alarms");
            } else {
                for alarm in store.alarms() {
                    let c = &alarm.challenge;
                    println!(
                        "{}  {}  {:<3}  {}  [{}d x{} @{}s]",
                        alarm.id,
                        alarm.time,
                        if alarm.enabled { "on" } else { "off" },
                        alarm.label,
                        c.digit_count(),
                        c.number_count(),
                        c.speed_secs()
                    );
                }
            }
        }
        AlarmAction::Edit {
            id,
            time,
            label,
            sound,
            repeat_on_failure,
            challenge,
        } => {
            let mut alarm = find_alarm(&store, &id)?;
            if let Some(time) = time {
                alarm.time = time;
            }
            if let Some(label) = label {
                alarm.label = label;
            }
            if let Some(sound) = sound {
                alarm.sound = sound;
            }
            if let Some(repeat) = repeat_on_failure {
                alarm.repeat_on_failure = repeat;
            }
            alarm.challenge = challenge.apply(alarm.challenge)?;
            store.update(alarm.clone(), snooze, &now)?;
            println!("{}", serde_json::to_string_pretty(&alarm)?);
        }
        AlarmAction::Enable { id } => {
            let alarm = find_alarm(&store, &id)?;
            store.set_enabled(&alarm.id, true, snooze, &now)?;
            println!("enabled {}", alarm.id);
        }
        AlarmAction::Disable { id } => {
            let alarm = find_alarm(&store, &id)?;
            store.set_enabled(&alarm.id, false, snooze, &now)?;
            println!("disabled {}", alarm.id);
        }
        AlarmAction::Delete { id } => {
            let alarm = find_alarm(&store, &id)?;
            store.delete(&alarm.id)?;
            println!("deleted {}", alarm.id);
        }
        AlarmAction::Test { id, json } => {
            let alarm = find_alarm(&store, &id)?;
            let audio = AudioLoop::new(TerminalBell).with_forced_fallback(config.audio.fallback_beep);
            let mut engine = ChallengeEngine::for_alarm(&alarm, config.max_attempts(), audio);
            let output = Output::new(json);
            let mut input = Input::spawn();
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_challenge(&mut engine, &mut input, output))?;
        }
    }
    Ok(())
}
