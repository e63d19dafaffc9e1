#![deny(warnings)]

//! Core domain models and invariants for the car-maker simulation.
//!
//! This crate defines the serializable world state advanced by the engine,
//! the simulation clock, the static class/part catalog and validation helpers
//! that guard money amounts and state invariants.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod model;
pub mod state;

pub use catalog::{
    CarClass, Catalog, CatalogError, EngineFit, Part, PartKind, PartStats, Priority,
    SecondaryMarket,
};
pub use clock::{trading_weeks_remaining, SimClock, TickBoundaries};
pub use config::{EventPolicies, ResolutionPolicy, SimConfig};
pub use model::*;
pub use state::{
    City, EventCounters, Expansion, LifetimeStats, MarketDemand, MonthlyLedger, SimulationState,
    StockLedger, Transient,
};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Validation errors for amounts entering the ledger and for loaded state.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Price or cost must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Factory inventory above its parking lot.
    #[error("factory {0} holds more cars than its parking cap")]
    InventoryOverCap(String),
    /// Listed securities must have a positive price.
    #[error("security {0} has a non-positive price")]
    NonPositivePrice(String),
    /// Efficiency is a percentage.
    #[error("factory {0} efficiency above 100%")]
    EfficiencyOutOfRange(String),
    /// Facilities reference a model that does not exist.
    #[error("unknown car model referenced: {0}")]
    UnknownModel(String),
    /// Portfolio references a security that is not listed.
    #[error("portfolio holds unknown security: {0}")]
    UnknownCompany(String),
    /// Speed multiplier outside the supported range.
    #[error("speed {0} is out of range")]
    SpeedOutOfRange(u32),
}

/// Convert a host-supplied amount into money, rejecting NaN, infinities and
/// negatives. Rounds to cents.
pub fn money_from_f64(v: f64) -> Result<Decimal, ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if v < 0.0 {
        return Err(ValidationError::NegativeMoney);
    }
    Decimal::from_f64(v)
        .map(|d| d.round_dp(2))
        .ok_or(ValidationError::NonFinite)
}

/// Validate cross-entity invariants of a world state.
pub fn validate_state(state: &SimulationState) -> Result<(), ValidationError> {
    if !state.economic_multiplier.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if state.bank.loan < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if let Some(d) = &state.bank.deposit {
        if d.initial_amount < Decimal::ZERO || d.current_amount < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney);
        }
    }
    if state.clock.speed == 0 || state.clock.speed > clock::MAX_SPEED {
        return Err(ValidationError::SpeedOutOfRange(state.clock.speed));
    }
    for f in &state.factories {
        if f.inventory > f.parking_cap() {
            return Err(ValidationError::InventoryOverCap(f.id.0.clone()));
        }
        if f.efficiency > 100 {
            return Err(ValidationError::EfficiencyOutOfRange(f.id.0.clone()));
        }
        if !f.wage_level.is_finite() {
            return Err(ValidationError::NonFinite);
        }
        if let Some(m) = &f.producing_model {
            if state.model(m).is_none() {
                return Err(ValidationError::UnknownModel(m.0.clone()));
            }
        }
    }
    for m in &state.car_models {
        if m.price < Decimal::ZERO || m.production_cost < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney);
        }
        if !m.inflation_sensitivity.is_finite() {
            return Err(ValidationError::NonFinite);
        }
    }
    for c in &state.stock_companies {
        if c.current_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(c.id.0.clone()));
        }
        if !c.volatility.is_finite() {
            return Err(ValidationError::NonFinite);
        }
    }
    for id in state.portfolio.keys() {
        if state.company(id).is_none() {
            return Err(ValidationError::UnknownCompany(id.0.clone()));
        }
    }
    Ok(())
}
