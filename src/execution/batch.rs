//! Batch pricing as a fold.
//!
//! Every item is priced independently; a failed item is recorded and the
//! fold moves on. Nothing here touches storage; the caller persists the
//! successes and can still report a storage failure against the item's index.

use crate::errors::PricingError;
use crate::models::{OptionPricer, PricingRequest, PricingResult};

/// One priced item, with its position in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSuccess {
    pub index: usize,
    pub request: PricingRequest,
    pub result: PricingResult,
}

/// One item the pricer rejected, with its position in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchFailure {
    pub index: usize,
    pub error: PricingError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Priced items in input order
    pub successes: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    fn with_capacity(n: usize) -> Self {
        Self {
            successes: Vec::with_capacity(n),
            failures: Vec::new(),
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    #[inline]
    pub fn successful(&self) -> usize {
        self.successes.len()
    }

    #[inline]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Price every item. Pure function: same inputs, same outcome.
pub fn price_batch(pricer: &dyn OptionPricer, items: &[PricingRequest]) -> BatchOutcome {
    items
        .iter()
        .enumerate()
        .fold(BatchOutcome::with_capacity(items.len()), |mut acc, (index, request)| {
            match pricer.price(request) {
                Ok(result) => acc.successes.push(BatchSuccess {
                    index,
                    request: *request,
                    result,
                }),
                Err(error) => acc.failures.push(BatchFailure { index, error }),
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::BlackScholesMerton;

    #[test]
    fn test_one_invalid_item_does_not_abort() {
        let items = [
            PricingRequest::new(100.0, 100.0, 1.0, 0.05, 0.02, 0.2),
            PricingRequest::new(100.0, 100.0, 1.0, 0.05, 0.02, 0.0),
            PricingRequest::new(120.0, 100.0, 0.5, 0.03, 0.0, 0.3),
        ];
        let outcome = price_batch(&BlackScholesMerton::new(), &items);

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.successful(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].error.field(), "volatility");

        assert_eq!(outcome.successes[0].request, items[0]);
        assert_eq!(outcome.successes[1].request, items[2]);
        assert_eq!(outcome.successes[1].index, 2);
        for s in &outcome.successes {
            assert!(s.result.call_price > 0.0 && s.result.put_price > 0.0);
            assert!(s.result.d1.is_finite() && s.result.d2.is_finite());
        }
    }

    #[test]
    fn test_all_invalid() {
        let items = [
            PricingRequest::new(-1.0, 100.0, 1.0, 0.05, 0.0, 0.2),
            PricingRequest::new(100.0, 100.0, -1.0, 0.05, 0.0, 0.2),
        ];
        let outcome = price_batch(&BlackScholesMerton::new(), &items);
        assert_eq!(outcome.successful(), 0);
        assert_eq!(outcome.failed(), 2);
        assert_eq!(outcome.failures[1].error.field(), "maturity");
    }

    #[test]
    fn test_overflowing_item_counted_as_failure() {
        let items = [
            PricingRequest::new(100.0, 100.0, 1.0, 0.05, 0.0, 0.2),
            PricingRequest::new(100.0, 100.0, 10.0, -100.0, 0.0, 0.2),
        ];
        let outcome = price_batch(&BlackScholesMerton::new(), &items);
        assert_eq!(outcome.successful(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert!(matches!(outcome.failures[0].error, PricingError::NonFinite { .. }));
    }

    #[test]
    fn test_empty_batch() {
        let outcome = price_batch(&BlackScholesMerton::new(), &[]);
        assert_eq!(outcome.total(), 0);
    }
}
