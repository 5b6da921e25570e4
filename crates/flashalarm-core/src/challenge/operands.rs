//! Operand generation for flash anzan rounds.

use std::ops::Range;

use rand::Rng;

use crate::alarm::ChallengeConfig;

/// Values an operand with `digit_count` digits is drawn from.
///
/// Multi-digit operands never have a leading zero (`[10^(d-1), 10^d)`);
/// single-digit operands include zero (`[0, 10)`).
pub fn operand_range(digit_count: u8) -> Range<u32> {
    let digits = u32::from(digit_count.clamp(1, 9));
    if digits == 1 {
        0..10
    } else {
        10u32.pow(digits - 1)..10u32.pow(digits)
    }
}

/// Draw a fresh operand sequence for one round.
pub fn generate_operands<R: Rng + ?Sized>(config: &ChallengeConfig, rng: &mut R) -> Vec<u32> {
    let range = operand_range(config.digit_count());
    (0..config.number_count())
        .map(|_| rng.gen_range(range.clone()))
        .collect()
}

pub fn expected_sum(operands: &[u32]) -> u64 {
    operands.iter().map(|&n| u64::from(n)).sum()
}
