//! Random sample calculations for demos and local development.

use crate::db::{self, DbPool};
use crate::errors::AppResult;
use crate::models::{OptionPricer, PricingRequest};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// How far back generated rows may be dated.
const MAX_DAYS_AGO: i64 = 30;
const MAX_HOURS_AGO: i64 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

#[inline]
fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Draw one parameter set inside typical equity-option ranges.
pub fn random_request<R: Rng>(rng: &mut R) -> PricingRequest {
    PricingRequest {
        spot: round_to(rng.gen_range(50.0..=200.0), 2),
        strike: round_to(rng.gen_range(50.0..=200.0), 2),
        maturity: round_to(rng.gen_range(0.1..=5.0), 2),
        risk_free_rate: round_to(rng.gen_range(0.01..=0.10), 4),
        dividend_yield: round_to(rng.gen_range(0.0..=0.05), 4),
        volatility: round_to(rng.gen_range(0.10..=0.50), 4),
    }
}

/// A creation time somewhere in the last month.
pub fn random_created_at<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> DateTime<Utc> {
    let days = rng.gen_range(0..=MAX_DAYS_AGO);
    let hours = rng.gen_range(0..=MAX_HOURS_AGO);
    now - Duration::days(days) - Duration::hours(hours)
}

/// Price and insert `count` random calculations. Items the pricer rejects
/// are skipped, not fatal.
pub fn seed_database<R: Rng>(
    db: &DbPool,
    pricer: &dyn OptionPricer,
    rng: &mut R,
    count: usize,
) -> AppResult<SeedReport> {
    let now = Utc::now();
    let mut report = SeedReport::default();

    for i in 0..count {
        let request = random_request(rng);
        let created_at = random_created_at(rng, now);

        let result = match pricer.price(&request) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(item = i + 1, error = %e, "skipping invalid sample");
                report.skipped += 1;
                continue;
            }
        };

        db::insert_calculation_at(db, &request, &result, created_at)?;
        report.inserted += 1;

        if (i + 1) % 10 == 0 {
            tracing::info!("added {}/{} calculations", i + 1, count);
        }
    }

    Ok(report)
}
