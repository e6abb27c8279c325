//! Virtual fan relay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comfortzone_app::ports::FanActuator;
use comfortzone_domain::error::HardwareError;

use crate::journal::{Journal, JournalEntry};

#[derive(Debug, Default)]
struct FanState {
    on: bool,
    fail_writes: bool,
}

/// Observes and steers a [`VirtualFan`].
#[derive(Debug, Clone, Default)]
pub struct FanHandle(Arc<Mutex<FanState>>);

impl FanHandle {
    /// The physical state: the last command that succeeded.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.lock().on
    }

    /// Make every write fail until cleared. Failed writes leave the relay as
    /// it was.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, FanState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct VirtualFan {
    handle: FanHandle,
    journal: Journal,
}

impl VirtualFan {
    #[must_use]
    pub fn new(journal: Journal) -> Self {
        Self {
            handle: FanHandle::default(),
            journal,
        }
    }

    #[must_use]
    pub fn handle(&self) -> FanHandle {
        self.handle.clone()
    }
}

impl FanActuator for VirtualFan {
    async fn set(&mut self, on: bool) -> Result<(), HardwareError> {
        self.journal.record(JournalEntry::Fan(on));
        let mut state = self.handle.lock();
        if state.fail_writes {
            return Err(HardwareError::Write {
                device: "fan",
                reason: "simulated relay fault".to_string(),
            });
        }
        state.on = on;
        tracing::debug!(on, "virtual fan switched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_switch_and_journal_commands() {
        let journal = Journal::new();
        let mut fan = VirtualFan::new(journal.clone());
        let handle = fan.handle();

        fan.set(true).await.unwrap();
        assert!(handle.is_on());
        fan.set(false).await.unwrap();

        assert!(!handle.is_on());
        assert_eq!(journal.fan_commands(), vec![true, false]);
    }

    #[tokio::test]
    async fn should_keep_state_when_write_fails() {
        let journal = Journal::new();
        let mut fan = VirtualFan::new(journal.clone());
        let handle = fan.handle();
        fan.set(true).await.unwrap();
        handle.fail_writes(true);

        assert!(fan.set(false).await.is_err());
        assert!(handle.is_on());
        assert_eq!(journal.fan_commands(), vec![true, false]);
    }
}
