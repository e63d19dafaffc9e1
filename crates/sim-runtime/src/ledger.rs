//! Month close: city growth, production, retail, and the company's books.

use crate::bank::service_loan;
use crate::market::run_market;
use crate::production::{factory_complexity, run_production};
use chrono::{Datelike, NaiveDateTime};
use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{Catalog, MonthlyLedger, SalesRecord, SimulationState};
use sim_econ::{
    apply_inflation, dealership_maintenance, dealership_wages, factory_maintenance, factory_wages,
    population_step, scale_floor, EconError,
};
use tracing::info;

/// Payroll and upkeep before the monthly scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningCosts {
    pub wages: Decimal,
    pub maintenance: Decimal,
}

impl RunningCosts {
    /// Share of the nominal figures actually billed each month:
    /// `floor((wages + maintenance) / 3)`, split back into its parts.
    pub fn billed(self) -> (Decimal, Decimal) {
        let three = Decimal::from(3);
        let total = ((self.wages + self.maintenance) / three).floor();
        let wages = (self.wages / three).floor();
        (wages, total - wages)
    }
}

pub fn running_costs(state: &SimulationState, catalog: &Catalog) -> Result<RunningCosts, EconError> {
    let m = state.economic_multiplier;
    let mut costs = RunningCosts::default();
    for f in &state.factories {
        let complexity = factory_complexity(state, catalog, f);
        let active = f.is_active();
        costs.wages += factory_wages(f.workers, m, f.wage_level, complexity, active)?;
        costs.maintenance += factory_maintenance(f.level, m, complexity, active)?;
    }
    for d in &state.dealerships {
        let active = d.is_active();
        costs.wages += dealership_wages(d.workers, m, active)?;
        costs.maintenance += dealership_maintenance(m, active)?;
    }
    Ok(costs)
}

/// Parts and labour for this month's output at inflated unit cost.
pub fn materials_cost(state: &SimulationState) -> Result<Decimal, EconError> {
    let mut total = Decimal::ZERO;
    for f in &state.factories {
        if f.current_production == 0 {
            continue;
        }
        let Some(model) = f.producing_model.as_ref().and_then(|id| state.model(id)) else {
            continue;
        };
        let unit = apply_inflation(model.production_cost, model.inflation_sensitivity, state.economic_multiplier)?;
        total += unit * Decimal::from(f.current_production);
    }
    Ok(total)
}

/// Random administrative overhead, scaled by inflation and plant count.
pub fn overhead<R: Rng>(state: &SimulationState, rng: &mut R) -> Result<Decimal, EconError> {
    let base = Decimal::from(rng.gen_range(10_000..=50_000));
    let plants = state.factories.len().max(1) as f64;
    scale_floor(base, state.economic_multiplier * plants)
}

fn month_key(date: NaiveDateTime) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Close the month that ended at `closed`: grow the city, build, sell and
/// book the result. Returns the month's ledger, which is also stored on the
/// state. Seasonality and the sales-record key come from `closed`, not from
/// the month the clock just entered.
pub fn close_month<R: Rng>(
    state: &mut SimulationState,
    catalog: &Catalog,
    closed: NaiveDateTime,
    rng: &mut R,
) -> Result<MonthlyLedger, EconError> {
    let (population, rate) = population_step(&state.city);
    state.city.population = population;
    state.city.growth_rate = rate;

    let produced = run_production(state, catalog);
    let sales = run_market(state, catalog, closed.month0(), rng)?;

    let (wages, maintenance) = running_costs(state, catalog)?.billed();
    let materials = materials_cost(state)?;
    let overhead = overhead(state, rng)?;
    let loan_payment = service_loan(state);
    let expenses = wages + maintenance + materials + overhead + loan_payment;

    state.money += sales.revenue - expenses;
    let ledger = MonthlyLedger {
        revenue: sales.revenue,
        expenses,
        wages,
        maintenance,
        materials,
        overhead,
        loan_payment,
        units_produced: produced,
        units_sold: u64::from(sales.units_sold),
    };
    state.push_sales_record(SalesRecord {
        month: month_key(closed),
        sales: ledger.units_sold,
        revenue: ledger.revenue,
        expenses: ledger.expenses,
    });
    state.stats.revenue += ledger.revenue;
    state.stats.expenses += ledger.expenses;
    state.stats.cars_produced += ledger.units_produced;
    state.stats.cars_sold += ledger.units_sold;
    state.last_month = ledger.clone();
    info!(
        month = %month_key(closed),
        revenue = %ledger.revenue,
        expenses = %ledger.expenses,
        produced,
        sold = ledger.units_sold,
        "month closed"
    );
    Ok(ledger)
}

/// Roll every model's current-year figures into `last_year`.
pub fn roll_annual_stats(state: &mut SimulationState) {
    for m in &mut state.car_models {
        m.last_year = std::mem::take(&mut m.this_year);
    }
}
