use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use super::hysteresis::next_state;
use super::{ControlError, ControlMode, RelayConfig, RelayState, RelayStatus, Thresholds};
use crate::config::RelayDefaults;
use crate::storage::{ConfigStore, KEY_AUTO_MODE, KEY_RELAY_STATE, KEY_TEMP_HIGH, KEY_TEMP_LOW};

/// Owns the relay output, its configuration and the store it persists to.
///
/// Every accepted change is written through to the store before the call
/// returns. Rejected input changes nothing.
pub struct RelayController<S, O> {
    store: S,
    output: O,
    config: RelayConfig,
}

impl<S: ConfigStore, O: OutputPin> RelayController<S, O> {
    /// Restore the last persisted configuration and drive the output to it.
    ///
    /// Missing or unusable stored values fall back to `defaults`.
    pub fn load(store: S, output: O, defaults: &RelayDefaults) -> Result<Self, ControlError> {
        let fallback = defaults.thresholds()?;

        let state = RelayState::try_from(store.get_u8_or(KEY_RELAY_STATE, defaults.state.into()))
            .unwrap_or_else(|e| {
                warn!("Stored relay state unusable ({}), using {:?}", e, defaults.state);
                defaults.state
            });
        let mode = ControlMode::try_from(store.get_u8_or(KEY_AUTO_MODE, defaults.mode.into()))
            .unwrap_or_else(|e| {
                warn!("Stored control mode unusable ({}), using {:?}", e, defaults.mode);
                defaults.mode
            });
        let (high, low) =
            store.get_f32_pair_or(KEY_TEMP_HIGH, KEY_TEMP_LOW, (fallback.high(), fallback.low()));
        let thresholds = Thresholds::new(high, low).unwrap_or_else(|e| {
            warn!("Stored thresholds {}/{} rejected ({}), using defaults", high, low, e);
            fallback
        });

        let mut controller = Self {
            store,
            output,
            config: RelayConfig {
                state,
                mode,
                thresholds,
            },
        };
        controller.drive(state)?;

        info!(
            "Relay initialized: state={:?} mode={:?} high={} low={}",
            state,
            mode,
            thresholds.high(),
            thresholds.low()
        );
        Ok(controller)
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus::from(&self.config)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Apply a manual state and/or mode change.
    ///
    /// The state is applied first and only while the current mode is manual;
    /// in auto mode it is ignored. A mode change always applies.
    pub fn set_relay(
        &mut self,
        state: Option<RelayState>,
        mode: Option<ControlMode>,
    ) -> Result<RelayStatus, ControlError> {
        if let Some(state) = state {
            match self.config.mode {
                ControlMode::Manual => self.switch(state)?,
                ControlMode::Auto => warn!("Ignoring manual relay {:?} while in auto mode", state),
            }
        }

        if let Some(mode) = mode {
            self.store.persist_u8(KEY_AUTO_MODE, mode.into())?;
            self.config.mode = mode;
            info!("Relay mode set to {:?}", mode);
        }

        Ok(self.status())
    }

    /// [`set_relay`](Self::set_relay) for raw numeric input. Both values are
    /// checked before anything is applied.
    pub fn set_relay_raw(
        &mut self,
        state: Option<u8>,
        mode: Option<u8>,
    ) -> Result<RelayStatus, ControlError> {
        let state = state.map(RelayState::try_from).transpose()?;
        let mode = mode.map(ControlMode::try_from).transpose()?;
        self.set_relay(state, mode)
    }

    /// Validate, persist and adopt a new threshold pair.
    ///
    /// Both values are committed together or not at all.
    pub fn set_thresholds(&mut self, high: f32, low: f32) -> Result<RelayStatus, ControlError> {
        let thresholds = Thresholds::new(high, low).map_err(|e| {
            warn!("Rejected thresholds high={} low={}: {}", high, low, e);
            e
        })?;

        let persisted = self
            .store
            .set_f32(KEY_TEMP_HIGH, high)
            .and_then(|()| self.store.set_f32(KEY_TEMP_LOW, low))
            .and_then(|()| self.store.commit());
        if let Err(e) = persisted {
            self.store.rollback();
            error!("Failed to persist thresholds high={} low={}: {}", high, low, e);
            return Err(e.into());
        }
        self.config.thresholds = thresholds;

        info!("Thresholds set to high={} low={}", high, low);
        Ok(self.status())
    }

    /// Run one hysteresis evaluation. Returns the new state if it changed.
    ///
    /// Does nothing in manual mode.
    pub fn apply_reading(&mut self, temperature: f32) -> Result<Option<RelayState>, ControlError> {
        if self.config.mode != ControlMode::Auto {
            return Ok(None);
        }

        let current = self.config.state;
        let next = next_state(current, temperature, &self.config.thresholds);
        if next == current {
            return Ok(None);
        }

        info!(
            "AUTO: {} C crossed {} threshold, turning relay {:?}",
            temperature,
            if next.is_on() { "high" } else { "low" },
            next
        );
        self.switch(next)?;
        Ok(Some(next))
    }

    /// Give back the store and output.
    pub fn release(self) -> (S, O) {
        (self.store, self.output)
    }

    fn switch(&mut self, state: RelayState) -> Result<(), ControlError> {
        self.drive(state)?;
        self.config.state = state;
        self.store.persist_u8(KEY_RELAY_STATE, state.into())?;
        Ok(())
    }

    fn drive(&mut self, state: RelayState) -> Result<(), ControlError> {
        let result = match state {
            RelayState::On => self.output.set_high(),
            RelayState::Off => self.output.set_low(),
        };
        result.map_err(|e| {
            error!("Failed to drive relay {:?}: {:?}", state, e);
            ControlError::Output
        })
    }
}
