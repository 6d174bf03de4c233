//! Two-threshold relay decision.

use super::{RelayState, Thresholds};

/// Next relay state for `temperature`.
///
/// Off turns On at or above the high threshold, On turns Off at or below the
/// low threshold. Anything in between holds the current state, as does a
/// temperature that compares with nothing (NaN).
pub fn next_state(current: RelayState, temperature: f32, thresholds: &Thresholds) -> RelayState {
    match current {
        RelayState::Off if temperature >= thresholds.high() => RelayState::On,
        RelayState::On if temperature <= thresholds.low() => RelayState::Off,
        held => held,
    }
}
