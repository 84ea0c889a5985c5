//! Check scheduling derived from impact and priority
//!
//! Intervals are in check-system interval units (minutes with the default
//! `interval_length` of 60).

use mon_model::{Impact, Priority};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckSchedule {
    pub check_interval: u32,
    pub retry_interval: u32,
    pub max_check_attempts: u32,
    pub notification_interval: u32,
    pub notifications_enabled: bool,
}

impl CheckSchedule {
    const fn new(check: u32, retry: u32, attempts: u32, notify: u32) -> Self {
        Self {
            check_interval: check,
            retry_interval: retry,
            max_check_attempts: attempts,
            notification_interval: notify,
            notifications_enabled: true,
        }
    }

    pub fn for_impact(impact: Impact) -> Self {
        match impact {
            Impact::Critical => Self::new(1, 2, 3, 15),
            Impact::High => Self::new(5, 3, 4, 30),
            Impact::Medium => Self::new(10, 5, 5, 60),
            Impact::Low => Self::new(30, 10, 10, 120),
            Impact::None => Self {
                notifications_enabled: false,
                ..Self::new(60, 15, 10, 0)
            },
        }
    }

    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Critical => Self::for_impact(Impact::Critical),
            Priority::High => Self::for_impact(Impact::High),
            Priority::Medium => Self::for_impact(Impact::Medium),
            Priority::Low => Self::for_impact(Impact::Low),
        }
    }

    /// Critical and high impact failures escalate to the contact group.
    pub fn escalates(impact: Impact) -> bool {
        matches!(impact, Impact::Critical | Impact::High)
    }

    /// Schedule for an explicit interval in seconds, e.g. a health endpoint's
    /// declared polling rate. Rounds up to whole minutes.
    pub fn with_interval_secs(self, seconds: u32) -> Self {
        Self {
            check_interval: seconds.div_ceil(60).max(1),
            ..self
        }
    }
}
