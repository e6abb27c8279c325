//! Occupancy debounce.
//!
//! Motion marks the space occupied immediately; it is released only once the
//! configured timeout has elapsed without any further motion.

use std::time::{Duration, Instant};

/// Snapshot of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OccupancyState {
    pub occupied: bool,
    /// Monotonic time of the most recent motion edge, if any was ever seen.
    pub last_motion_at: Option<Instant>,
}

/// A change of occupancy reported by [`OccupancyTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyTransition {
    Arrived,
    Departed,
}

#[derive(Debug, Clone)]
pub struct OccupancyTracker {
    timeout: Duration,
    state: OccupancyState,
}

impl OccupancyTracker {
    /// Start unoccupied.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: OccupancyState::default(),
        }
    }

    /// Feed one poll result.
    ///
    /// Every poll with `motion == true` counts as a motion edge and refreshes
    /// `last_motion_at`. Without motion, an occupied tracker is released when
    /// strictly more than `timeout` has passed since the last edge.
    pub fn observe(&mut self, motion: bool, now: Instant) -> Option<OccupancyTransition> {
        if motion {
            self.state.last_motion_at = Some(now);
            if self.state.occupied {
                return None;
            }
            self.state.occupied = true;
            return Some(OccupancyTransition::Arrived);
        }

        if !self.state.occupied {
            return None;
        }
        let expired = self
            .state
            .last_motion_at
            .is_none_or(|at| now.saturating_duration_since(at) > self.timeout);
        if expired {
            self.state.occupied = false;
            Some(OccupancyTransition::Departed)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.state.occupied
    }

    #[must_use]
    pub fn state(&self) -> OccupancyState {
        self.state
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
