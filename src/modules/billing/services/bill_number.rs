//! Bill number allocation.
//!
//! Format: `BILL` + `YYYYMMDD` + 4-digit zero-padded sequence, where the
//! sequence is the per-day bill count. Four digits is a minimum width: a day
//! with more than 9999 bills widens the suffix instead of wrapping, keeping
//! numbers unique. The authoritative path is a durable atomic counter behind
//! [`DailySequence`]; when that lookup fails, creation is not blocked and a
//! random 4-digit suffix is used instead, trading the uniqueness guarantee
//! for availability.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;

use crate::core::Result;

pub const BILL_NUMBER_PREFIX: &str = "BILL";

/// A durable per-day counter. Implementations must advance atomically so
/// concurrent creations on the same day cannot observe the same value.
#[async_trait]
pub trait DailySequence: Send + Sync {
    /// Advances and returns the sequence for the given day, starting at 1
    async fn next_for(&self, day: NaiveDate) -> Result<u64>;
}

/// Allocates bill numbers. Only invoked for bills that have no number yet;
/// an existing number is never overwritten (the service layer skips
/// allocation entirely on updates).
pub struct BillNumberAllocator {
    sequence: Arc<dyn DailySequence>,
}

impl BillNumberAllocator {
    pub fn new(sequence: Arc<dyn DailySequence>) -> Self {
        Self { sequence }
    }

    /// Produce a bill number for a bill created on `day`.
    ///
    /// Never fails: if the counter is unavailable the random fallback keeps
    /// creation going, with only probabilistic uniqueness. The degradation is
    /// logged so duplicate suffixes can be traced back to it.
    pub async fn allocate(&self, day: NaiveDate) -> String {
        match self.sequence.next_for(day).await {
            Ok(sequence) => format_bill_number(day, sequence),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    %day,
                    "daily bill sequence unavailable, falling back to a random suffix"
                );
                let suffix: u64 = rand::thread_rng().gen_range(0..10_000);
                format_bill_number(day, suffix)
            }
        }
    }
}

/// `BILL` + `YYYYMMDD` + zero-padded sequence, at least 4 digits wide
pub fn format_bill_number(day: NaiveDate, sequence: u64) -> String {
    format!(
        "{}{}{:04}",
        BILL_NUMBER_PREFIX,
        day.format("%Y%m%d"),
        sequence
    )
}
