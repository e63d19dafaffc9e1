use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the engine treats an event that could need the player's decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Resolve inside the tick and log the outcome.
    #[default]
    AutoResolve,
    /// Park the event as pending, throttle the clock, and wait for a command.
    RequireConfirmation,
}

/// Resolution policy per event class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPolicies {
    pub domestic_contracts: ResolutionPolicy,
    pub export_contracts: ResolutionPolicy,
    pub crises: ResolutionPolicy,
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// First simulated instant.
    pub start_date: NaiveDateTime,
    /// Cash at game start.
    pub starting_money: Decimal,
    pub events: EventPolicies,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            start_date: NaiveDate::from_ymd_opt(1950, 2, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            starting_money: Decimal::new(5_000_000, 0),
            events: EventPolicies::default(),
        }
    }
}

impl SimConfig {
    /// Parse a YAML config; missing fields take their defaults.
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_in_february_1950() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.start_date.to_string(), "1950-02-01 00:00:00");
        assert_eq!(cfg.starting_money, Decimal::new(5_000_000, 0));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg = SimConfig::from_yaml("rng_seed: 7\nevents:\n  crises: require_confirmation\n").unwrap();
        assert_eq!(cfg.rng_seed, 7);
        assert_eq!(cfg.events.crises, ResolutionPolicy::RequireConfirmation);
        assert_eq!(cfg.events.domestic_contracts, ResolutionPolicy::AutoResolve);
        assert_eq!(cfg.starting_money, Decimal::new(5_000_000, 0));
    }
}
