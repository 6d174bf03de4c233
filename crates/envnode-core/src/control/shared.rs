use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::digital::OutputPin;

use super::{ControlError, ControlMode, RelayController, RelayState, RelayStatus};
use crate::storage::ConfigStore;

/// A [`RelayController`] shared between the acquisition loop and the
/// request handlers.
///
/// Each method takes the lock once and releases it before returning, so a
/// status read never observes a half-applied update.
pub struct SharedRelayController<M: RawMutex, S, O> {
    inner: Mutex<M, RefCell<RelayController<S, O>>>,
}

impl<M, S, O> SharedRelayController<M, S, O>
where
    M: RawMutex,
    S: ConfigStore,
    O: OutputPin,
{
    pub fn new(controller: RelayController<S, O>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(controller)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut RelayController<S, O>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn get_relay_status(&self) -> RelayStatus {
        self.with(|controller| controller.status())
    }

    pub fn set_relay(
        &self,
        state: Option<RelayState>,
        mode: Option<ControlMode>,
    ) -> Result<RelayStatus, ControlError> {
        self.with(|controller| controller.set_relay(state, mode))
    }

    pub fn set_relay_raw(&self, state: Option<u8>, mode: Option<u8>) -> Result<RelayStatus, ControlError> {
        self.with(|controller| controller.set_relay_raw(state, mode))
    }

    pub fn set_thresholds(&self, high: f32, low: f32) -> Result<RelayStatus, ControlError> {
        self.with(|controller| controller.set_thresholds(high, low))
    }

    pub fn apply_reading(&self, temperature: f32) -> Result<Option<RelayState>, ControlError> {
        self.with(|controller| controller.apply_reading(temperature))
    }

    pub fn into_inner(self) -> RelayController<S, O> {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayDefaults;
    use crate::storage::{MemoryBlob, PostcardStore};
    use crate::test_support::FakePin;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    #[test]
    fn test_updates_visible_through_shared_handle() {
        let controller = RelayController::load(
            PostcardStore::open(MemoryBlob::new()),
            FakePin::default(),
            &RelayDefaults::default(),
        )
        .unwrap();
        let shared: SharedRelayController<CriticalSectionRawMutex, _, _> =
            SharedRelayController::new(controller);

        shared.set_thresholds(30.0, 25.0).unwrap();
        shared.set_relay_raw(None, Some(1)).unwrap();
        assert_eq!(shared.apply_reading(31.0), Ok(Some(RelayState::On)));

        let status = shared.get_relay_status();
        assert_eq!(status.state, RelayState::On);
        assert_eq!(status.mode, ControlMode::Auto);

        let (_, pin) = shared.into_inner().release();
        assert!(pin.high);
    }
}
