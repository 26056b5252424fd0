use std::fmt::{Debug, Formatter};

use itertools::{Either, Itertools};

use crate::{error::AdvisorError, prelude::*};

/// Hour of a day, `0..=23`.
pub type Hour = u32;

pub const HOURS_PER_DAY: Hour = 24;

/// Allowed time-of-day range, both ends inclusive.
///
/// When `start > end`, the range wraps past midnight: `start..=23` followed by `0..=end`.
#[must_use]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct HourRange {
    pub start: Hour,
    pub end: Hour,
}

impl Debug for HourRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00..={:02}:00", self.start, self.end)
    }
}

impl HourRange {
    pub fn try_new(start: Hour, end: Hour) -> Result<Self, AdvisorError> {
        for hour in [start, end] {
            if hour >= HOURS_PER_DAY {
                return Err(AdvisorError::InvalidArgument(format!(
                    "hour must be within 0-23, got {hour}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn wraps_midnight(self) -> bool {
        self.start > self.end
    }

    /// Enumerate the hours in the range order: ascending, or wrapping past midnight.
    pub fn iter(self) -> impl Iterator<Item = Hour> {
        if self.wraps_midnight() {
            Either::Left((self.start..HOURS_PER_DAY).chain(0..=self.end))
        } else {
            Either::Right(self.start..=self.end)
        }
    }

    #[must_use]
    pub fn expand(self) -> Vec<Hour> {
        self.iter().collect_vec()
    }

    #[must_use]
    pub const fn contains(self, hour: Hour) -> bool {
        if self.wraps_midnight() {
            hour >= self.start || hour <= self.end
        } else {
            self.start <= hour && hour <= self.end
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        if self.wraps_midnight() {
            (HOURS_PER_DAY - self.start + self.end + 1) as usize
        } else {
            (self.end - self.start + 1) as usize
        }
    }
}
