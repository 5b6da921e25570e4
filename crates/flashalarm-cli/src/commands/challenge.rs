use clap::Args;
use flashalarm_core::{AudioLoop, ChallengeConfig, ChallengeEngine, Config, DEFAULT_SOUND};

use crate::terminal::{run_challenge, Input, Output, TerminalBell};

#[derive(Args)]
pub struct ChallengeArgs {
    /// Digits per number (1-5)
    #[arg(long, default_value_t = 1)]
    digits: u8,
    /// Numbers per round (3-20)
    #[arg(long, default_value_t = 5)]
    numbers: u8,
    /// Seconds each number stays on screen (0.1-3.0)
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
    /// Attempts before only abandoning is possible (1-10, defaults to config)
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

pub fn run(args: ChallengeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let challenge = ChallengeConfig::new(args.digits, args.numbers, args.speed)?;
    let max_attempts = match args.max_attempts {
        Some(value) => Config::check_max_attempts(value)?,
        None => config.max_attempts(),
    };

    let audio = AudioLoop::new(TerminalBell).with_forced_fallback(config.audio.fallback_beep);
    let mut engine = ChallengeEngine::new(challenge, DEFAULT_SOUND, max_attempts, audio);
    let output = Output::new(args.json);
    let mut input = Input::spawn();

    let runtime = tokio::runtime::Runtime::new()?;
    if runtime.block_on(run_challenge(&mut engine, &mut input, output))?.is_none() {
        output.note("challenge dismissed");
    }
    Ok(())
}
