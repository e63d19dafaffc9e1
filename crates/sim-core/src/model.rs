//! Durable entities owned by the simulation state.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Catalog id of a car class, e.g. "A" or "RS".
    ClassId
);
string_id!(
    /// Catalog id of a part, e.g. "small-i4".
    PartId
);
string_id!(
    /// Stable id of a factory.
    FactoryId
);
string_id!(
    /// Stable id of a dealership.
    DealershipId
);
string_id!(
    /// Stable id of a car model.
    ModelId
);
string_id!(
    /// Financial identity of a listed security. Changes when a company is
    /// regenerated after bankruptcy.
    CompanyId
);

/// Population segment a buyer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialClass {
    Lower,
    Middle,
    Higher,
}

impl SocialClass {
    pub const ALL: [SocialClass; 3] = [SocialClass::Lower, SocialClass::Middle, SocialClass::Higher];
}

/// A value per social segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentSplit<T> {
    /// Lower-class share.
    pub lower: T,
    /// Middle-class share.
    pub middle: T,
    /// Higher-class share.
    pub higher: T,
}

impl<T: Copy> SegmentSplit<T> {
    pub fn get(&self, class: SocialClass) -> T {
        match class {
            SocialClass::Lower => self.lower,
            SocialClass::Middle => self.middle,
            SocialClass::Higher => self.higher,
        }
    }

    pub fn get_mut(&mut self, class: SocialClass) -> &mut T {
        match class {
            SocialClass::Lower => &mut self.lower,
            SocialClass::Middle => &mut self.middle,
            SocialClass::Higher => &mut self.higher,
        }
    }
}

impl SegmentSplit<u32> {
    pub fn total(&self) -> u32 {
        self.lower + self.middle + self.higher
    }
}

/// Whether a facility is operating. Idle facilities produce or sell nothing
/// and pay 15% of their running costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityStatus {
    #[default]
    Active,
    Idle,
}

impl FacilityStatus {
    pub fn toggled(self) -> Self {
        match self {
            FacilityStatus::Active => FacilityStatus::Idle,
            FacilityStatus::Idle => FacilityStatus::Active,
        }
    }
}

/// A production plant with on-site parking for finished cars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    /// Stable id, e.g. "factory-1".
    pub id: FactoryId,
    /// Display name.
    pub name: String,
    /// Upgrade level, 1..=8.
    pub level: u32,
    /// Nominal cars per month before complexity and efficiency.
    pub capacity: u32,
    /// Units produced in the last month close.
    pub current_production: u32,
    /// Workforce efficiency in percent, `0..=100`.
    pub efficiency: u32,
    /// Headcount paid each month.
    pub workers: u32,
    /// Price of the next upgrade.
    pub upgrade_cost: Decimal,
    /// Wage multiplier raised by wage increases.
    pub wage_level: f64,
    /// Active or idle.
    pub status: FacilityStatus,
    /// Model on the line, if any.
    pub producing_model: Option<ModelId>,
    /// Cars per month the player asks for.
    pub production_target: u32,
    /// Finished cars waiting in the parking lot.
    pub inventory: u32,
}

impl Factory {
    /// Parking lot size: 1200 plus 200 per level above the first.
    pub fn parking_cap(&self) -> u32 {
        1200 + 200 * self.level.saturating_sub(1)
    }

    pub fn is_active(&self) -> bool {
        self.status == FacilityStatus::Active
    }
}

/// A showroom selling cars to the public.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dealership {
    /// Stable id, e.g. "dealer-2".
    pub id: DealershipId,
    /// Display name.
    pub name: String,
    /// Town the showroom is in.
    pub location: String,
    /// Cars the showroom can move per month.
    pub sales_capacity: u32,
    /// Headcount paid each month.
    pub workers: u32,
    /// Cars sold in the last month close.
    pub sales_this_month: u32,
    /// Price of the next upgrade.
    pub upgrade_cost: Decimal,
    /// Upgrade level, 1..=5.
    pub level: u32,
    /// Active or idle.
    pub status: FacilityStatus,
}

impl Dealership {
    pub fn is_active(&self) -> bool {
        self.status == FacilityStatus::Active
    }
}

/// Derived per-unit stats of a car model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarStats {
    /// Engine output rating.
    pub power: u32,
    /// Kerb weight rating.
    pub weight: u32,
    /// Crash safety rating.
    pub safety: u32,
    /// Looks rating; luxury buyers weigh it.
    pub style: u32,
    /// Reliability rating.
    pub reliability: u32,
}

/// Selected parts, stored by stable catalog id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParts {
    /// Engine part.
    pub engine: PartId,
    /// Chassis part.
    pub chassis: PartId,
    /// Body part; must suit the class.
    pub body: PartId,
    /// Interior part.
    pub interior: PartId,
}

impl ModelParts {
    pub fn ids(&self) -> [&PartId; 4] {
        [&self.engine, &self.chassis, &self.body, &self.interior]
    }
}

/// Sales figures for one calendar year.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualStats {
    /// Units sold.
    pub sales: u64,
    /// Retail revenue.
    pub revenue: Decimal,
    /// Revenue minus cost of goods.
    pub profit: Decimal,
    /// Cost of goods sold.
    pub cogs: Decimal,
}

/// A sellable design.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarModel {
    /// Stable id.
    pub id: ModelId,
    /// Display name.
    pub name: String,
    /// Car class the model competes in.
    pub class: ClassId,
    /// Selected parts.
    pub parts: ModelParts,
    /// List price.
    pub price: Decimal,
    /// Base (1950) unit production cost.
    pub production_cost: Decimal,
    /// Derived per-unit stats.
    pub stats: CarStats,
    /// Interior quality points; 10 is neutral for demand.
    pub interior_quality: u32,
    /// Cost-weighted inflation sensitivity of the parts.
    pub inflation_sensitivity: f64,
    /// 0..=150 fit between parts and class.
    pub synergy_score: u32,
    /// Smoothed desirability shown to the player.
    pub popularity: u32,
    /// Units sold in the last month close.
    pub sales_this_month: u32,
    /// Last month's sales by buyer segment.
    pub sales_breakdown: SegmentSplit<u32>,
    /// Units sold since the last structural edit.
    pub total_sales: u64,
    /// Profit since the last structural edit.
    pub total_profit: Decimal,
    /// Year the design was created.
    pub year_introduced: i32,
    /// Running figures for the current year.
    pub this_year: AnnualStats,
    /// Figures for the previous calendar year.
    pub last_year: AnnualStats,
}

/// Listing category used for naming and protection rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockCategory {
    Automotive,
    Technology,
    Energy,
    RawMaterials,
    Logistics,
    Finance,
}

impl fmt::Display for StockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StockCategory::Automotive => "Automotive",
            StockCategory::Technology => "Technology",
            StockCategory::Energy => "Energy",
            StockCategory::RawMaterials => "Raw Materials",
            StockCategory::Logistics => "Logistics",
            StockCategory::Finance => "Finance",
        })
    }
}

/// Sector an ETF tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Automotive,
    Technology,
    HeavyIndustry,
    Energy,
    Logistics,
    /// Broad market; tracks every regular company.
    Finance,
}

/// Multi-year price target of a regular company.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockCycle {
    /// Year the cycle ends and a new one is drawn.
    pub end_year: i32,
    /// Price the company trends toward.
    pub target: Decimal,
}

/// Price history retained per security (~25 years of weeks).
pub const PRICE_HISTORY_CAP: usize = 1300;

/// A listed security. `slot` is stable for the lifetime of the game; `id`
/// changes each time the slot is regenerated after a bankruptcy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockCompany {
    /// Current financial identity.
    pub id: CompanyId,
    /// Stable listing slot, e.g. "energy-0".
    pub slot: String,
    /// Times this slot has been relisted.
    pub generation: u32,
    /// Company name.
    pub name: String,
    /// Listing category.
    pub category: StockCategory,
    /// Sector the company counts toward for ETFs.
    pub sector: Sector,
    /// IPO price.
    pub starting_price: Decimal,
    /// Last weekly price.
    pub current_price: Decimal,
    /// Weekly noise scale, 0.05..=0.20.
    pub volatility: f64,
    /// Shares outstanding.
    pub total_shares: u64,
    /// Weekly prices, oldest first.
    pub history: VecDeque<Decimal>,
    /// Tracks a sector mean instead of a cycle.
    pub is_etf: bool,
    /// Blue chip: never goes bankrupt.
    pub is_protected: bool,
    /// Current multi-year target.
    pub cycle: StockCycle,
    /// Year the current identity listed.
    pub formation_year: i32,
}

impl StockCompany {
    /// Append a price, dropping the oldest entries past the cap.
    pub fn push_price(&mut self, price: Decimal) {
        self.history.push_back(price);
        while self.history.len() > PRICE_HISTORY_CAP {
            self.history.pop_front();
        }
    }
}

/// Shares held in one security.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    /// Shares held.
    pub shares: u64,
    /// Weighted average purchase price.
    pub avg_buy_price: Decimal,
}

/// Outcome of a company going bankrupt and being relisted in the same slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankruptcyRecord {
    /// Slot that was relisted.
    pub slot: String,
    /// Week of the bankruptcy.
    pub date: NaiveDate,
    /// Name of the failed company.
    pub old_company_name: String,
    /// Category of the failed company.
    pub old_category: StockCategory,
    /// IPO price of the failed company.
    pub ipo_price: Decimal,
    /// Years between listing and failure.
    pub years_active: i32,
    /// Player shares wiped out.
    pub shares_lost: u64,
    /// Cost basis of the shares wiped out.
    pub money_lost: Decimal,
    /// Name of the replacement listing.
    pub new_company_name: String,
    /// Category of the replacement.
    pub new_category: StockCategory,
    /// IPO price of the replacement.
    pub new_ipo_price: Decimal,
}

/// A single fixed-rate term deposit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermDeposit {
    /// Amount deposited.
    pub initial_amount: Decimal,
    /// Balance including compounded interest.
    pub current_amount: Decimal,
    /// When the deposit was opened.
    pub start_date: NaiveDateTime,
    /// Last compounding event, if any.
    pub last_compound_date: Option<NaiveDateTime>,
    /// Full years compounded so far.
    pub years_completed: u32,
    /// Annual rate, fixed at 5%.
    pub interest_rate: Decimal,
}

/// Loan and deposit accounts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BankState {
    /// Outstanding loan balance, never negative.
    pub loan: Decimal,
    /// The open term deposit, if any.
    pub deposit: Option<TermDeposit>,
    /// Payment made at the last month close.
    pub last_loan_payment: Decimal,
    /// Interest credited by the most recent compounding event.
    pub last_deposit_interest: Decimal,
}

/// Where a fleet order comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Domestic,
    Export,
}

/// A fleet order waiting for the player's decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractOffer {
    /// Domestic or export.
    pub kind: ContractKind,
    /// Buyer name or country.
    pub contractor: String,
    /// Requested car class.
    pub class: ClassId,
    /// Model that would be delivered.
    pub model_name: String,
    /// Units requested.
    pub requested_qty: u32,
    /// Inflated list price per unit.
    pub base_price: Decimal,
    /// Negotiated price per unit.
    pub price_per_unit: Decimal,
    /// Signed negotiation swing applied to the list price, e.g. -0.12.
    pub negotiation: f64,
    /// Price per unit times quantity.
    pub total_revenue: Decimal,
    /// Class stock when the offer was made.
    pub available_inventory: u32,
    /// When the offer arrived.
    pub offered_on: NaiveDateTime,
}

/// A fulfilled fleet order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractHistoryEntry {
    /// Domestic or export.
    pub kind: ContractKind,
    /// Buyer name or country.
    pub contractor: String,
    /// Delivered car class.
    pub class: ClassId,
    /// Units requested.
    pub requested_qty: u32,
    /// Units delivered.
    pub fulfilled_qty: u32,
    /// Negotiated price per unit.
    pub price_per_unit: Decimal,
    /// Revenue booked.
    pub total_revenue: Decimal,
    /// Class stock before delivery.
    pub inventory_before: u32,
    /// Class stock after delivery.
    pub inventory_after: u32,
    /// Delivery date.
    pub date: NaiveDate,
}

/// Contract history entries retained, newest first.
pub const CONTRACT_HISTORY_CAP: usize = 50;

/// A one-off crisis cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrisisEvent {
    /// Short headline.
    pub title: String,
    /// What happened.
    pub description: String,
    /// Amount charged.
    pub cost: Decimal,
    /// Year the crisis struck.
    pub year: i32,
}

/// An open land auction. The player's bid is held in escrow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuctionState {
    /// Year the auction opened; resolved at the next rollover.
    pub year: i32,
    /// Appraised value of the plot.
    pub land_value: Decimal,
    /// Sealed rival offer.
    pub rival_bid: Decimal,
    /// Player's escrowed bid.
    pub user_bid: Decimal,
}

/// How an auction ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuctionResult {
    /// Year of the auction.
    pub year: i32,
    /// Whether the player took the plot.
    pub won: bool,
    /// Player's final bid.
    pub user_bid: Decimal,
    /// Rival's bid.
    pub rival_bid: Decimal,
}

/// Tone of a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Success,
    Danger,
    Info,
}

/// Structured details of a fleet sale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// Model delivered.
    pub model_name: String,
    /// Units delivered.
    pub quantity: u32,
    /// List price per unit.
    pub base_price: Decimal,
    /// Negotiated price per unit.
    pub final_price: Decimal,
    /// Negotiation swing in percent.
    pub negotiation_percent: f64,
    /// Revenue booked.
    pub total_revenue: Decimal,
    /// Revenue minus cost of goods.
    pub total_profit: Decimal,
}

/// Structured payload attached to a log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDetails {
    Transaction(TransactionDetails),
    Bankruptcy(BankruptcyRecord),
}

/// Player-visible event log line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Game date of the entry.
    pub date: NaiveDate,
    /// Tone of the entry.
    pub kind: LogKind,
    /// Text shown to the player.
    pub message: String,
    /// Structured payload, if any.
    pub details: Option<LogDetails>,
}

/// Log entries retained, newest first.
pub const LOG_CAP: usize = 50;

/// One month of company results, keyed "YYYY-MM".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// "YYYY-MM" of the closed month.
    pub month: String,
    /// Units sold at retail.
    pub sales: u64,
    /// Retail revenue.
    pub revenue: Decimal,
    /// Month expenses.
    pub expenses: Decimal,
}

/// Months of sales history retained.
pub const SALES_HISTORY_CAP: usize = 12;
