#![deny(warnings)]

//! Tick-driven simulation engine for the car-maker game.
//!
//! [`Engine`] owns the world state, the static catalog and the RNG. The host
//! calls [`Engine::tick`] every `clock.tick_interval()` and routes player
//! input through [`Engine::apply`].

pub mod auction;
pub mod bank;
pub mod commands;
pub mod events;
pub mod facilities;
pub mod ledger;
pub mod market;
pub mod models;
pub mod production;
pub mod report;
pub mod stocks;

#[cfg(test)]
mod test_support;

pub use commands::{Command, CommandOutcome, ModelDesign, Rejection};
pub use report::{SimSnapshot, Valuation};

use chrono::NaiveDateTime;
use persistence::PersistenceError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use sim_core::{
    AuctionResult, BankruptcyRecord, Catalog, ClassId, ContractHistoryEntry, ContractOffer,
    CrisisEvent, LogDetails, LogKind, MonthlyLedger, SimConfig, SimulationState,
};
use sim_econ::{economic_multiplier, EconError};
use thiserror::Error;
use tracing::{debug, info};

/// Faults that stop a tick or a load. Business-rule refusals are
/// [`Rejection`]s instead.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("numeric fault: {0}")]
    Econ(#[from] EconError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Something that happened during a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    DepositCompounded(Decimal),
    Bankruptcy(BankruptcyRecord),
    ContractFulfilled(ContractHistoryEntry),
    ContractDeclined(ContractOffer),
    OfferPending(ContractOffer),
    CrisisPaid(CrisisEvent),
    CrisisPending(CrisisEvent),
    AuctionStarted { year: i32, land_value: Decimal },
    AuctionResolved(AuctionResult),
    ClassAvailable(ClassId),
}

/// Outcome of one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// False when the clock is paused.
    pub advanced: bool,
    pub date: Option<NaiveDateTime>,
    /// Ledger of the month closed by this tick, if any.
    pub month_closed: Option<MonthlyLedger>,
    pub year_changed: bool,
    pub events: Vec<SimEvent>,
}

pub struct Engine<R: Rng = ChaCha8Rng> {
    state: SimulationState,
    catalog: Catalog,
    config: SimConfig,
    rng: R,
}

impl Engine<ChaCha8Rng> {
    /// Start a new game seeded from `config.rng_seed`.
    pub fn new_game(config: SimConfig, catalog: Catalog) -> Result<Self, SimError> {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self::with_rng(config, catalog, rng)
    }
}

impl<R: Rng> Engine<R> {
    /// Start a new game drawing from `rng`.
    pub fn with_rng(config: SimConfig, catalog: Catalog, mut rng: R) -> Result<Self, SimError> {
        let mut state = SimulationState::new(&config, &catalog);
        let year = state.clock.year();
        state.economic_multiplier = economic_multiplier(year);
        state.stock_companies = stocks::initial_universe(year, &mut rng)?;
        info!(seed = config.rng_seed, year, "new game");
        Ok(Self {
            state,
            catalog,
            config,
            rng,
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Direct access for scenario setup in tests and tools.
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot::capture(&self.state)
    }

    /// Apply a player command. Rejections leave the state untouched.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        let name = format!("{command:?}");
        let outcome = CommandOutcome::from(commands::apply(&mut self.state, &self.catalog, command));
        if let CommandOutcome::Rejected(reason) = &outcome {
            debug!(command = %name, %reason, "command rejected");
        }
        outcome
    }

    /// Advance the clock by one tick and run whatever boundaries it crossed.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        let mut report = TickReport::default();
        if self.state.clock.paused {
            return Ok(report);
        }
        if self.state.transient.has_pending_decision() {
            self.state.clock.throttle();
        }
        let b = self.state.clock.advance();
        report.advanced = true;
        report.date = Some(b.current);
        report.year_changed = b.year_changed;

        let state = &mut self.state;
        let rng = &mut self.rng;
        if b.month_changed {
            state.stock_ledger.month_revenue = Decimal::ZERO;
            state.stock_ledger.month_spend = Decimal::ZERO;
            state.stock_ledger.month_fees = Decimal::ZERO;
        }
        if let Some(interest) = bank::compound_deposit(state, b.current)? {
            report.events.push(SimEvent::DepositCompounded(interest));
        }
        if b.monday_crossed {
            let records = stocks::weekly_update(
                &mut state.stock_companies,
                &mut state.portfolio,
                b.current,
                rng,
            )?;
            for r in records {
                state.push_log(
                    LogKind::Danger,
                    format!(
                        "{} went bankrupt; {} listed in its place at ${}",
                        r.old_company_name, r.new_company_name, r.new_ipo_price
                    ),
                    Some(LogDetails::Bankruptcy(r.clone())),
                );
                report.events.push(SimEvent::Bankruptcy(r));
            }
        }
        state.economic_multiplier = economic_multiplier(state.clock.year());

        if b.month_changed {
            let ledger = ledger::close_month(state, &self.catalog, b.previous, rng)?;
            report.month_closed = Some(ledger);
            let policy = self.config.events.domestic_contracts;
            if let Some(e) = events::maybe_domestic_contract(state, &self.catalog, policy, rng)? {
                report.events.push(e);
            }
        }
        if b.year_changed {
            self.close_year(&mut report.events)?;
        }
        Ok(report)
    }

    fn close_year(&mut self, out: &mut Vec<SimEvent>) -> Result<(), SimError> {
        let state = &mut self.state;
        let rng = &mut self.rng;
        let year = state.clock.year();
        ledger::roll_annual_stats(state);
        state.events.domestic_contracts_this_year = 0;

        let policies = self.config.events;
        if let Some(e) = events::maybe_export_contract(state, &self.catalog, policies.export_contracts, rng)? {
            out.push(e);
        }
        if let Some(e) = events::maybe_crisis(state, policies.crises, rng) {
            out.push(e);
        }
        if state.auction.as_ref().is_some_and(|a| year > a.year) {
            if let Some(e) = auction::resolve_auction(state) {
                out.push(e);
            }
        }
        for class in self.catalog.classes().iter().filter(|c| c.unlock_year == year) {
            state.push_log(
                LogKind::Info,
                format!("Class {} ({}) is now available for research", class.id, class.name),
                None,
            );
            out.push(SimEvent::ClassAvailable(class.id.clone()));
        }
        if let Some(e) = auction::maybe_start_auction(state, year, rng)? {
            out.push(e);
        }
        info!(year, money = %state.money, "year opened");
        Ok(())
    }

    /// Run ticks until `months` month closes have happened. The clock is
    /// resumed first so a freshly loaded game makes progress.
    pub fn run_months(&mut self, months: u32) -> Result<SimSnapshot, SimError> {
        self.state.clock.paused = false;
        let mut closed = 0;
        while closed < months {
            if self.tick()?.month_closed.is_some() {
                closed += 1;
            }
        }
        Ok(self.snapshot())
    }

    /// Full save document for the current state.
    pub fn serialize(&self) -> Result<String, SimError> {
        Ok(persistence::serialize(&self.state)?)
    }

    /// Replace the world with a saved document. On any error the current
    /// state is left as it was. A loaded game is paused with no pending
    /// decision.
    pub fn load_from_data(&mut self, data: &str) -> Result<(), SimError> {
        let loaded = persistence::load_from_str(data)?;
        info!(date = %loaded.clock.date, money = %loaded.money, "game loaded");
        self.state = loaded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::starter_design;
    use sim_core::ResolutionPolicy;

    fn engine() -> Engine {
        Engine::new_game(SimConfig::default(), Catalog::builtin().unwrap()).unwrap()
    }

    #[test]
    fn paused_engine_does_not_move() {
        let mut e = engine();
        assert_eq!(e.apply(Command::TogglePause), CommandOutcome::Applied);
        let date = e.state().clock.date;
        let r = e.tick().unwrap();
        assert!(!r.advanced);
        assert_eq!(e.state().clock.date, date);
    }

    #[test]
    fn new_game_lists_the_stock_universe() {
        let e = engine();
        assert_eq!(e.state().stock_companies.len(), 25);
        assert_eq!(e.state().economic_multiplier, 1.0);
    }

    #[test]
    fn first_month_closes_after_a_month_of_ticks() {
        let mut e = engine();
        let mut ticks = 0;
        loop {
            ticks += 1;
            if e.tick().unwrap().month_closed.is_some() {
                break;
            }
        }
        // February 1950 has 28 days of three ticks each.
        assert_eq!(ticks, 28 * 3);
        assert_eq!(e.state().sales_history[0].month, "1950-02");
    }

    #[test]
    fn same_seed_same_world() {
        let mut a = engine();
        let mut b = engine();
        for e in [&mut a, &mut b] {
            e.apply(Command::CreateCarModel { design: starter_design(9000.0) });
            let model = e.state().car_models[0].id.clone();
            let plant = e.state().factories[0].id.clone();
            e.apply(Command::AssignFactory { id: plant, model: Some(model), target: 60 });
            e.run_months(14).unwrap();
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn pending_decisions_hold_the_clock_at_1x() {
        let mut cfg = SimConfig::default();
        cfg.events.crises = ResolutionPolicy::RequireConfirmation;
        let mut e = Engine::new_game(cfg, Catalog::builtin().unwrap()).unwrap();
        e.state_mut().stats.cars_sold = 20_000;
        e.apply(Command::SetSpeed { speed: 25 });
        e.run_months(11).unwrap();
        assert!(e.state().transient.pending_crisis.is_some());
        assert_eq!(e.state().clock.speed, 1);
        assert!(!e.apply(Command::SetSpeed { speed: 5 }).is_applied());
        assert!(e.apply(Command::PayCrisisCost).is_applied());
        assert!(!e.state().clock.auto_throttled);
    }

    #[test]
    fn failed_load_keeps_the_current_game() {
        let mut e = engine();
        e.run_months(1).unwrap();
        let before = e.state().clone();
        assert!(e.load_from_data("{ not json").is_err());
        assert_eq!(e.state(), &before);
    }

    #[test]
    fn save_round_trip_pauses() {
        let mut e = engine();
        e.run_months(2).unwrap();
        let doc = e.serialize().unwrap();
        let mut other = engine();
        other.load_from_data(&doc).unwrap();
        assert_eq!(other.state().money, e.state().money);
        assert_eq!(other.state().clock.date, e.state().clock.date);
        assert_eq!(other.state().stock_companies, e.state().stock_companies);
        assert!(other.state().clock.paused);
    }
}
