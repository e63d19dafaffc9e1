//! The single mutable world value advanced by the engine.

use crate::{
    AuctionResult, AuctionState, BankState, Catalog, CarModel, ClassId, CompanyId,
    ContractHistoryEntry, ContractOffer, CrisisEvent, Dealership, DealershipId, Factory,
    FactoryId, FacilityStatus, LogDetails, LogEntry, LogKind, PartId, PortfolioItem,
    SalesRecord, SegmentSplit, SimClock, SimConfig, StockCompany, CONTRACT_HISTORY_CAP, LOG_CAP,
    SALES_HISTORY_CAP,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The city buying the cars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub population: u64,
    pub capacity: u64,
    pub base_growth_rate: f64,
    pub min_growth_rate: f64,
    /// Annual growth rate applied at the last month close.
    pub growth_rate: f64,
}

impl Default for City {
    fn default() -> Self {
        Self {
            population: 50_000,
            capacity: 1_600_000,
            base_growth_rate: 0.02,
            min_growth_rate: 0.001,
            growth_rate: 0.02,
        }
    }
}

/// Buyer pool computed at the last month close.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDemand {
    pub total: u32,
    pub segments: SegmentSplit<u32>,
}

/// Result of the last month close.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyLedger {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub wages: Decimal,
    pub maintenance: Decimal,
    pub materials: Decimal,
    pub overhead: Decimal,
    pub loan_payment: Decimal,
    pub units_produced: u64,
    pub units_sold: u64,
}

impl MonthlyLedger {
    pub fn profit(&self) -> Decimal {
        self.revenue - self.expenses
    }
}

/// All-time company counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub cars_produced: u64,
    /// Retail plus fleet units; drives the prestige rank.
    pub cars_sold: u64,
    pub export_units: u64,
    pub export_revenue: Decimal,
    pub contract_units: u64,
    pub contract_revenue: Decimal,
    pub crisis_costs: Decimal,
}

/// Cash flow from stock trading.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StockLedger {
    pub month_revenue: Decimal,
    pub month_spend: Decimal,
    pub month_fees: Decimal,
    pub realized_profit: Decimal,
    pub total_fees: Decimal,
}

/// Once-per-year gates for events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCounters {
    pub domestic_contracts_this_year: u32,
    pub last_export_year: Option<i32>,
    pub last_crisis_year: Option<i32>,
}

/// Facility limits and land auction progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub auction_attempts: u32,
    pub factory_level: u32,
    pub showroom_level: u32,
}

impl Expansion {
    pub fn factory_limit(&self) -> usize {
        9 + 4 * self.factory_level as usize
    }

    pub fn showroom_limit(&self) -> usize {
        14 + 7 * self.showroom_level as usize
    }
}

/// Flags that never survive a save: pending decisions and the last auction
/// result shown to the player.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transient {
    pub pending_offer: Option<ContractOffer>,
    pub pending_crisis: Option<CrisisEvent>,
    pub auction_result: Option<AuctionResult>,
}

impl Transient {
    pub fn has_pending_decision(&self) -> bool {
        self.pending_offer.is_some() || self.pending_crisis.is_some()
    }
}

/// Complete world state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub clock: SimClock,
    pub money: Decimal,
    pub economic_multiplier: f64,
    pub city: City,
    pub market: MarketDemand,
    pub last_month: MonthlyLedger,
    pub stats: LifetimeStats,
    pub stock_ledger: StockLedger,
    pub bank: BankState,
    pub factories: Vec<Factory>,
    pub dealerships: Vec<Dealership>,
    pub car_models: Vec<CarModel>,
    pub stock_companies: Vec<StockCompany>,
    pub portfolio: BTreeMap<CompanyId, PortfolioItem>,
    /// Newest first.
    pub contract_history: Vec<ContractHistoryEntry>,
    /// Oldest first.
    pub sales_history: Vec<SalesRecord>,
    pub unlocked_classes: BTreeSet<ClassId>,
    pub unlocked_parts: BTreeSet<PartId>,
    /// Newest first.
    pub logs: Vec<LogEntry>,
    pub events: EventCounters,
    pub expansion: Expansion,
    /// Open land auction, if any. Durable because it holds escrowed cash.
    pub auction: Option<AuctionState>,
    pub next_id: u64,
    #[serde(skip)]
    pub transient: Transient,
}

impl SimulationState {
    /// Opening position: one factory, one dealership and the free catalog
    /// entries unlocked. The stock universe is left empty for the runtime to
    /// populate.
    pub fn new(config: &SimConfig, catalog: &Catalog) -> Self {
        let (unlocked_classes, unlocked_parts) = catalog.starting_unlocks();
        let mut state = Self {
            clock: SimClock::new(config.start_date),
            money: config.starting_money,
            economic_multiplier: 1.0,
            city: City::default(),
            market: MarketDemand::default(),
            last_month: MonthlyLedger::default(),
            stats: LifetimeStats::default(),
            stock_ledger: StockLedger::default(),
            bank: BankState::default(),
            factories: Vec::new(),
            dealerships: Vec::new(),
            car_models: Vec::new(),
            stock_companies: Vec::new(),
            portfolio: BTreeMap::new(),
            contract_history: Vec::new(),
            sales_history: Vec::new(),
            unlocked_classes,
            unlocked_parts,
            logs: Vec::new(),
            events: EventCounters::default(),
            expansion: Expansion::default(),
            auction: None,
            next_id: 1,
            transient: Transient::default(),
        };
        let factory_id = FactoryId(state.allocate_id("factory"));
        state.factories.push(Factory {
            id: factory_id,
            name: "Main Plant".to_string(),
            level: 1,
            capacity: 100,
            current_production: 0,
            efficiency: 78,
            workers: 50,
            upgrade_cost: Decimal::new(100_000, 0),
            wage_level: 1.0,
            status: FacilityStatus::Active,
            producing_model: None,
            production_target: 50,
            inventory: 0,
        });
        let dealer_id = DealershipId(state.allocate_id("dealer"));
        state.dealerships.push(Dealership {
            id: dealer_id,
            name: "Downtown Showroom".to_string(),
            location: "City Center".to_string(),
            sales_capacity: 30,
            workers: 20,
            sales_this_month: 0,
            upgrade_cost: Decimal::new(50_000, 0),
            level: 1,
            status: FacilityStatus::Active,
        });
        state
    }

    /// Next stable id with the given prefix, e.g. "factory-3".
    pub fn allocate_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Prepend a player-visible log entry, keeping the newest `LOG_CAP`.
    pub fn push_log(&mut self, kind: LogKind, message: impl Into<String>, details: Option<LogDetails>) {
        self.logs.insert(
            0,
            LogEntry {
                date: self.clock.date.date(),
                kind,
                message: message.into(),
                details,
            },
        );
        self.logs.truncate(LOG_CAP);
    }

    /// Prepend a fulfilled contract, keeping the newest entries.
    pub fn push_contract(&mut self, entry: ContractHistoryEntry) {
        self.contract_history.insert(0, entry);
        self.contract_history.truncate(CONTRACT_HISTORY_CAP);
    }

    /// Append a month of results, keeping the most recent months.
    pub fn push_sales_record(&mut self, record: SalesRecord) {
        self.sales_history.push(record);
        if self.sales_history.len() > SALES_HISTORY_CAP {
            let excess = self.sales_history.len() - SALES_HISTORY_CAP;
            self.sales_history.drain(..excess);
        }
    }

    pub fn factory_mut(&mut self, id: &FactoryId) -> Option<&mut Factory> {
        self.factories.iter_mut().find(|f| &f.id == id)
    }

    pub fn dealership_mut(&mut self, id: &DealershipId) -> Option<&mut Dealership> {
        self.dealerships.iter_mut().find(|d| &d.id == id)
    }

    pub fn model(&self, id: &crate::ModelId) -> Option<&CarModel> {
        self.car_models.iter().find(|m| &m.id == id)
    }

    pub fn company(&self, id: &CompanyId) -> Option<&StockCompany> {
        self.stock_companies.iter().find(|c| &c.id == id)
    }

    /// Cars waiting in all factories producing `model`.
    pub fn inventory_of(&self, model: &crate::ModelId) -> u32 {
        self.factories
            .iter()
            .filter(|f| f.producing_model.as_ref() == Some(model))
            .map(|f| f.inventory)
            .sum()
    }

    /// Drain up to `qty` cars of `model` from factories in order; returns the
    /// number actually taken.
    pub fn take_inventory(&mut self, model: &crate::ModelId, qty: u32) -> u32 {
        let mut remaining = qty;
        for f in self
            .factories
            .iter_mut()
            .filter(|f| f.producing_model.as_ref() == Some(model))
        {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(f.inventory);
            f.inventory -= take;
            remaining -= take;
        }
        qty - remaining
    }

    /// Reset decision flags to their resting state, as after a load.
    pub fn reset_transient(&mut self) {
        self.transient = Transient::default();
        self.clock.paused = true;
        self.clock.auto_throttled = false;
    }
}
