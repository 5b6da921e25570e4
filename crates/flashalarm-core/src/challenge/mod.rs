mod engine;
mod operands;
mod session;

pub use engine::{ChallengeEngine, REVEAL_GAP, SUCCESS_DISPLAY_DELAY};
pub use operands::{expected_sum, generate_operands, operand_range};
pub use session::{ChallengeAction, ChallengeSession, ChallengeState};
