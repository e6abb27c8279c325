//! Virtual status indicator (stands in for an LED matrix).

use comfortzone_app::ports::{IndicatorState, Notice, StatusIndicator};
use comfortzone_domain::error::HardwareError;

use crate::journal::{Journal, JournalEntry};

pub struct VirtualIndicator {
    journal: Journal,
}

impl VirtualIndicator {
    #[must_use]
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl StatusIndicator for VirtualIndicator {
    async fn show(&mut self, state: IndicatorState) -> Result<(), HardwareError> {
        self.journal.record(JournalEntry::Indicator(state));
        Ok(())
    }

    async fn notify(&mut self, notice: Notice) -> Result<(), HardwareError> {
        tracing::debug!(?notice, "virtual indicator notice");
        self.journal.record(JournalEntry::Notice(notice));
        Ok(())
    }
}
