//! Monthly retail market: buyer pools, desirability shares and allocation
//! against showroom throughput and factory inventory.

use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{Catalog, MarketDemand, SegmentSplit, SimulationState, SocialClass};
use sim_econ::{
    apply_inflation, cumulative_split, desirability, market_size, next_popularity,
    scale_breakdown, segment_weights, split_segments, within_sales_guillotine, EconError,
};

/// Retail results of one month.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketOutcome {
    pub units_sold: u32,
    pub revenue: Decimal,
    pub cogs: Decimal,
}

#[derive(Clone, Copy)]
struct Scored {
    desirability: f64,
    weights: SegmentSplit<f64>,
}

/// Per-model demand before throughput and inventory limits.
fn model_demand<R: Rng>(
    scored: &[Option<Scored>],
    buyers: SegmentSplit<u32>,
    rng: &mut R,
) -> Vec<SegmentSplit<u32>> {
    let mut pool = SegmentSplit::<f64>::default();
    for s in scored.iter().flatten() {
        for class in SocialClass::ALL {
            let d = s.desirability * s.weights.get(class);
            if d > 0.0 {
                *pool.get_mut(class) += d;
            }
        }
    }
    scored
        .iter()
        .map(|s| {
            let mut demand = SegmentSplit::<u32>::default();
            let Some(s) = s else { return demand };
            for class in SocialClass::ALL {
                let d = s.desirability * s.weights.get(class);
                let total = pool.get(class);
                if d > 0.0 && total > 0.0 {
                    let jitter = rng.gen_range(0.95..1.05);
                    let units = (f64::from(buyers.get(class)) * d / total * jitter).floor();
                    *demand.get_mut(class) = units.max(0.0) as u32;
                }
            }
            demand
        })
        .collect()
}

/// Run the retail market for the month whose zero-based index is `month0`.
///
/// Models are served in list order against the remaining showroom
/// throughput, so earlier models win on constrained months. Sold units are
/// drained from the factories building each model.
pub fn run_market<R: Rng>(
    state: &mut SimulationState,
    catalog: &Catalog,
    month0: u32,
    rng: &mut R,
) -> Result<MarketOutcome, EconError> {
    let multiplier = state.economic_multiplier;
    let total = market_size(state.city.population, month0, rng.gen_range(0.8..1.2));
    let buyers = split_segments(total);
    state.market = MarketDemand {
        total,
        segments: buyers,
    };

    let mut scored = Vec::with_capacity(state.car_models.len());
    for m in &state.car_models {
        scored.push(match catalog.class(&m.class) {
            Some(class) => Some(Scored {
                desirability: desirability(m, class, multiplier)?,
                weights: segment_weights(class),
            }),
            None => None,
        });
    }
    let demands = model_demand(&scored, buyers, rng);

    let mut remaining: u32 = state
        .dealerships
        .iter()
        .filter(|d| d.is_active())
        .map(|d| d.sales_capacity)
        .sum();
    let mut outcome = MarketOutcome::default();
    for (idx, (demand, score)) in demands.into_iter().zip(&scored).enumerate() {
        let model = &state.car_models[idx];
        let sellable = match catalog.class(&model.class) {
            Some(class) => within_sales_guillotine(model, class, multiplier)?,
            None => false,
        };
        let wanted = if sellable { demand.total() } else { 0 };
        let capped = wanted.min(remaining).min(state.inventory_of(&model.id));
        let unit_cost = apply_inflation(model.production_cost, model.inflation_sensitivity, multiplier)?;
        let id = model.id.clone();
        let sold = state.take_inventory(&id, capped);
        remaining -= sold;

        let units = Decimal::from(sold);
        let model = &mut state.car_models[idx];
        let revenue = model.price * units;
        let cogs = unit_cost * units;
        let profit = revenue - cogs;
        model.sales_this_month = sold;
        model.sales_breakdown = scale_breakdown(demand, sold);
        model.total_sales += u64::from(sold);
        model.total_profit += profit;
        model.this_year.sales += u64::from(sold);
        model.this_year.revenue += revenue;
        model.this_year.profit += profit;
        model.this_year.cogs += cogs;
        if let Some(s) = score {
            model.popularity = next_popularity(model.popularity, s.desirability);
        }

        outcome.units_sold += sold;
        outcome.revenue += revenue;
        outcome.cogs += cogs;
    }

    let weights: Vec<u32> = state
        .dealerships
        .iter()
        .map(|d| if d.is_active() { d.sales_capacity } else { 0 })
        .collect();
    for (d, sold) in state
        .dealerships
        .iter_mut()
        .zip(cumulative_split(outcome.units_sold, &weights))
    {
        d.sales_this_month = sold;
    }
    Ok(outcome)
}
