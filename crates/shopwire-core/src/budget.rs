//! Rate budget bookkeeping.
//!
//! GraphQL calls are charged against a leaky bucket of query-cost points that
//! refills at `restoreRate` points per second. REST calls report bucket usage
//! in the `X-Shopify-Shop-Api-Call-Limit` header.

use std::time::Duration;

use crate::response::{ApiResponse, QueryCost};

/// REST call-limit header name.
pub const CALL_LIMIT_HEADER: &str = "x-shopify-shop-api-call-limit";

/// Budget snapshot taken from a GraphQL cost extension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBudget {
    /// Cost of the query just run; the next page is assumed to cost the same.
    pub requested: f64,
    /// Points currently available.
    pub available: f64,
    /// Points restored per second.
    pub restore_rate: f64,
}

impl RateBudget {
    /// Create a snapshot.
    #[must_use]
    pub const fn new(requested: f64, available: f64, restore_rate: f64) -> Self {
        Self {
            requested,
            available,
            restore_rate,
        }
    }

    /// Time to wait before issuing a query of the same cost.
    ///
    /// `ceil((requested - available) / restore_rate)` whole seconds when the
    /// bucket is short, zero otherwise. A non-positive restore rate counts as 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn wait_before_next(&self) -> Duration {
        if self.requested <= self.available {
            return Duration::ZERO;
        }
        let rate = if self.restore_rate > 0.0 {
            self.restore_rate
        } else {
            1.0
        };
        let secs = ((self.requested - self.available) / rate).ceil();
        Duration::from_secs(secs as u64)
    }
}

impl From<&QueryCost> for RateBudget {
    fn from(cost: &QueryCost) -> Self {
        Self::new(
            cost.requested_query_cost,
            cost.throttle_status.currently_available,
            cost.throttle_status.restore_rate,
        )
    }
}

/// Parsed `X-Shopify-Shop-Api-Call-Limit` header, e.g. `32/40`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimit {
    /// Calls currently in the bucket.
    pub used: u32,
    /// Bucket size.
    pub capacity: u32,
}

impl CallLimit {
    /// Parse a header value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (used, capacity) = value.trim().split_once('/')?;
        Some(Self {
            used: used.trim().parse().ok()?,
            capacity: capacity.trim().parse().ok()?,
        })
    }

    /// Read the header from a response.
    #[must_use]
    pub fn from_response(response: &ApiResponse) -> Option<Self> {
        response.header(CALL_LIMIT_HEADER).and_then(Self::parse)
    }

    /// Calls left before the bucket overflows.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_the_missing_points() {
        let budget = RateBudget::new(50.0, 10.0, 5.0);
        assert_eq!(budget.wait_before_next(), Duration::from_secs(8));
    }

    #[test]
    fn rounds_partial_seconds_up() {
        let budget = RateBudget::new(52.0, 10.0, 5.0);
        assert_eq!(budget.wait_before_next(), Duration::from_secs(9));
    }

    #[test]
    fn no_wait_when_budget_suffices() {
        assert_eq!(
            RateBudget::new(50.0, 50.0, 5.0).wait_before_next(),
            Duration::ZERO
        );
        assert_eq!(
            RateBudget::new(10.0, 900.0, 50.0).wait_before_next(),
            Duration::ZERO
        );
    }

    #[test]
    fn zero_restore_rate_stays_finite() {
        assert_eq!(
            RateBudget::new(20.0, 10.0, 0.0).wait_before_next(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn call_limit_header() {
        let limit = CallLimit::parse("32/40").unwrap();
        assert_eq!(limit.used, 32);
        assert_eq!(limit.capacity, 40);
        assert_eq!(limit.remaining(), 8);
        assert!(CallLimit::parse("32").is_none());
        assert!(CallLimit::parse("a/b").is_none());

        let response =
            ApiResponse::status(200).with_header("X-Shopify-Shop-Api-Call-Limit", "1/40");
        assert_eq!(CallLimit::from_response(&response).unwrap().remaining(), 39);
    }
}
