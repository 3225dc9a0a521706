//! European option pricing (Black-Scholes-Merton) with a persisted
//! calculation history served over HTTP.
//!
//! The pricing core lives in [`models`] and has no I/O; everything else
//! is the service around it.

pub mod config;
pub mod db;
pub mod errors;
pub mod execution;
pub mod models;
pub mod seed;
pub mod server;
pub mod state;

pub use errors::PricingError;
pub use models::black_scholes::price;
pub use models::{PricingRequest, PricingResult};
