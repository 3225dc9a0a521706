use crate::errors::PricingError;
use crate::models::normal::StandardNormal;
use crate::models::{OptionPricer, PricingRequest, PricingResult};

/// Black-Scholes-Merton pricing for European options on a dividend-paying
/// underlying.
///
/// d1 = (ln(S/K) + (r - q + sigma^2/2) * T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// C = S * e^(-qT) * N(d1) - K * e^(-rT) * N(d2)
/// P = K * e^(-rT) * N(-d2) - S * e^(-qT) * N(-d1)
///
/// Holds only the immutable N(0, 1) evaluator; one instance can be shared
/// by every request.
#[derive(Debug, Clone, Default)]
pub struct BlackScholesMerton {
    normal: StandardNormal,
}

impl BlackScholesMerton {
    pub fn new() -> Self {
        Self { normal: StandardNormal::new() }
    }

    /// Validate, price, then check every output is finite. All-or-nothing.
    pub fn evaluate(&self, request: &PricingRequest) -> Result<PricingResult, PricingError> {
        validate(request)?;

        let (d1, d2) = d1_d2(request);
        let phi = &self.normal;

        let nd1 = phi.cdf(d1);
        let nd2 = phi.cdf(d2);
        let n_minus_d1 = phi.cdf(-d1);
        let n_minus_d2 = phi.cdf(-d2);

        let dividend_discount = (-request.dividend_yield * request.maturity).exp();
        let rate_discount = (-request.risk_free_rate * request.maturity).exp();

        let s = request.spot;
        let k = request.strike;

        let call_price = s * dividend_discount * nd1 - k * rate_discount * nd2;
        let put_price = k * rate_discount * n_minus_d2 - s * dividend_discount * n_minus_d1;

        // Rates and yields are unbounded, so the discount factors can overflow.
        let outputs = [("callPrice", call_price), ("putPrice", put_price), ("d1", d1), ("d2", d2)];
        if let Some(&(field, value)) = outputs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PricingError::NonFinite { field, value });
        }

        Ok(PricingResult {
            call_price,
            put_price,
            d1,
            d2,
        })
    }
}

impl OptionPricer for BlackScholesMerton {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes-Merton"
    }

    #[inline]
    fn price(&self, request: &PricingRequest) -> Result<PricingResult, PricingError> {
        self.evaluate(request)
    }
}

/// Reject inputs that would divide by zero or take the log of a
/// non-positive number. NaN fails every check.
pub fn validate(request: &PricingRequest) -> Result<(), PricingError> {
    let checks = [
        ("spot", request.spot),
        ("strike", request.strike),
        ("maturity", request.maturity),
        ("volatility", request.volatility),
    ];
    for (field, value) in checks {
        if !(value > 0.0) {
            return Err(PricingError::InvalidParameter { field, value });
        }
    }
    Ok(())
}

/// Standardized distances (d1, d2). Caller must have validated the inputs.
#[inline]
pub fn d1_d2(request: &PricingRequest) -> (f64, f64) {
    let v = request.volatility;
    let t = request.maturity;
    let numerator = (request.spot / request.strike).ln()
        + (request.risk_free_rate - request.dividend_yield + 0.5 * v * v) * t;
    let denominator = v * t.sqrt();
    let d1 = numerator / denominator;
    let d2 = d1 - v * t.sqrt();
    (d1, d2)
}

/// Validate, then price with a fresh evaluator. Servers should hold a
/// [`BlackScholesMerton`] instead.
pub fn price_request(request: &PricingRequest) -> Result<PricingResult, PricingError> {
    BlackScholesMerton::new().evaluate(request)
}

/// Positional form of [`price_request`].
pub fn price(
    spot: f64,
    strike: f64,
    maturity: f64,
    risk_free_rate: f64,
    dividend_yield: f64,
    volatility: f64,
) -> Result<PricingResult, PricingError> {
    price_request(&PricingRequest::new(
        spot,
        strike,
        maturity,
        risk_free_rate,
        dividend_yield,
        volatility,
    ))
}
