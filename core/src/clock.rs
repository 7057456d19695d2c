//! Evaluation date: the "today" every inactivity measure is taken against.
//!
//! RULE: Nothing in the engine reads the system clock.
//! The caller builds an EvaluationDate once and threads it through the run.
//! Only `EvaluationDate::today()` touches the platform clock, and only the
//! runner calls it.

use crate::types::DayCount;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EvaluationDate(NaiveDate);

impl EvaluationDate {
    /// The local calendar date at the moment of the call.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// A fixed date, for reproducible runs and tests.
    pub fn fixed(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Whole days from `earlier` to this date. Negative when `earlier`
    /// lies in the future.
    pub fn days_since(&self, earlier: NaiveDate) -> DayCount {
        (self.0 - earlier).num_days()
    }
}

impl fmt::Display for EvaluationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
