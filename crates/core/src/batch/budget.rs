//! Positional parameter accounting against the PostgreSQL protocol ceiling.
//!
//! A statement may carry at most [`POSTGRES_PLACEHOLDER_LIMIT`] bound
//! parameters. Bulk writes accumulate rows until 80% of that ceiling
//! ([`FLUSH_THRESHOLD`]) is exceeded, leaving headroom for the trailing
//! partial statement.

use crate::constants::{FLUSH_THRESHOLD, POSTGRES_PLACEHOLDER_LIMIT};

/// Returns `cnt + stride` when that still fits under the placeholder
/// ceiling, otherwise `0` to signal that a fresh statement is needed.
pub fn close_to_placeholder_limit(cnt: usize, stride: usize) -> usize {
    if POSTGRES_PLACEHOLDER_LIMIT.saturating_sub(cnt) < stride {
        return 0;
    }
    cnt + stride
}

/// Running parameter count of the statement being accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderBudget {
    used: usize,
}

impl PlaceholderBudget {
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn charge(&mut self, stride: usize) {
        self.used += stride;
    }

    /// True once the count is above 80% of the protocol ceiling.
    pub fn exceeds_flush_threshold(&self) -> bool {
        self.used > FLUSH_THRESHOLD
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_to_placeholder_limit_under_ceiling() {
        assert_eq!(close_to_placeholder_limit(0, 10), 10);
        assert_eq!(close_to_placeholder_limit(65525, 10), 65535);
    }

    #[test]
    fn test_close_to_placeholder_limit_over_ceiling() {
        assert_eq!(close_to_placeholder_limit(65530, 10), 0);
        assert_eq!(close_to_placeholder_limit(70000, 1), 0);
    }

    #[test]
    fn test_flush_threshold_is_eighty_percent() {
        assert_eq!(FLUSH_THRESHOLD, 52428);

        let mut budget = PlaceholderBudget::default();
        budget.charge(FLUSH_THRESHOLD);
        assert!(!budget.exceeds_flush_threshold());
        budget.charge(1);
        assert!(budget.exceeds_flush_threshold());
        budget.reset();
        assert!(budget.is_empty());
    }
}
