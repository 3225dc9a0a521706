pub mod normal;
pub mod black_scholes;

use crate::errors::PricingError;

/// Pricing models implement this trait.
/// price() must be a pure function: deterministic output from inputs only.
/// Send + Sync required so a single instance can serve concurrent requests.
pub trait OptionPricer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Price a European call and put. Fails only on a violated precondition,
    /// never partially.
    fn price(&self, request: &PricingRequest) -> Result<PricingResult, PricingError>;
}

/// The six market inputs to a pricing call.
///
/// Accepts the short aliases `s0, x, t, r, d, v` on input.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    /// Current price of the underlying
    #[serde(alias = "s0")]
    pub spot: f64,
    /// Exercise price
    #[serde(alias = "x")]
    pub strike: f64,
    /// Time to expiry in years
    #[serde(alias = "t")]
    pub maturity: f64,
    /// Continuously-compounded annual rate, may be negative
    #[serde(alias = "r")]
    pub risk_free_rate: f64,
    /// Continuously-compounded annual yield, may be negative
    #[serde(alias = "d")]
    pub dividend_yield: f64,
    /// Annualized volatility
    #[serde(alias = "v")]
    pub volatility: f64,
}

impl PricingRequest {
    pub fn new(
        spot: f64,
        strike: f64,
        maturity: f64,
        risk_free_rate: f64,
        dividend_yield: f64,
        volatility: f64,
    ) -> Self {
        Self {
            spot,
            strike,
            maturity,
            risk_free_rate,
            dividend_yield,
            volatility,
        }
    }
}

/// Call/put prices plus the two standardized distances they were built from.
/// Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub call_price: f64,
    pub put_price: f64,
    pub d1: f64,
    pub d2: f64,
}
