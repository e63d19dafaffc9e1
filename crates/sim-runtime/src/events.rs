//! Fleet contracts and crises.
//!
//! Each event class follows the configured [`ResolutionPolicy`]: resolved
//! inside the tick, or parked as a pending decision that throttles the clock
//! until the player answers.

use crate::commands::Rejection;
use crate::SimEvent;
use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{
    Catalog, ClassId, ContractHistoryEntry, ContractKind, ContractOffer, CrisisEvent, LogDetails,
    LogKind, ResolutionPolicy, SimulationState, SocialClass, TransactionDetails,
};
use sim_econ::{apply_inflation, contract_unit_price, crisis_multiplier, prestige_rank, EconError};
use tracing::{info, warn};

/// Rank from which civic fleet buyers call.
pub const DOMESTIC_MIN_RANK: u32 = 5;
pub const DOMESTIC_PER_YEAR: u32 = 2;
/// Monthly chance of a domestic enquiry.
pub const DOMESTIC_CHANCE: f64 = 0.1667;
pub const EXPORT_MIN_RANK: u32 = 10;
pub const CRISIS_RANKS: std::ops::RangeInclusive<u32> = 5..=20;

const DOMESTIC_CONTRACTORS: [&str; 40] = [
    "Ministry of Transport",
    "National Police",
    "Ambulance Service",
    "State Post Office",
    "Border Guard",
    "Customs Service",
    "Revenue Administration",
    "Road Transport Inspectorate",
    "Internal Security Agency",
    "Military Logistics Service",
    "State Forests Directorate",
    "Roads and Bridges Authority",
    "State Fire Service",
    "Agricultural Modernisation Agency",
    "Farm Support Office",
    "City Hall",
    "Social Insurance Institution",
    "National Health Fund",
    "State Railways",
    "National Power Company",
    "Central Gasworks",
    "Municipal Waterworks",
    "City Transit Authority",
    "Industrial Development Agency",
    "Air Navigation Services",
    "Meteorological Institute",
    "Statistics Office",
    "Academy of Sciences",
    "Military Property Agency",
    "Research and Development Centre",
    "Thunder Taxi Co.",
    "Panorama Hotels",
    "Concrete-Mix Builders",
    "Survey & Map Ltd.",
    "Whirlwind Couriers",
    "Shield Security",
    "Vision Advertising",
    "Press Publishing Holding",
    "Tele-Com Consortium",
    "Society of Engineers",
];

const EXPORT_COUNTRIES: [&str; 20] = [
    "USA",
    "China",
    "Japan",
    "Germany",
    "India",
    "United Kingdom",
    "France",
    "Brazil",
    "Italy",
    "Canada",
    "South Korea",
    "Australia",
    "Mexico",
    "Spain",
    "Indonesia",
    "Turkey",
    "Netherlands",
    "Saudi Arabia",
    "Switzerland",
    "Poland",
];

const CRISIS_SCENARIOS: [(&str, &str); 25] = [
    ("Assembly line failure", "The main line's control modules must be replaced at once."),
    ("Gearbox recall", "A faulty batch of gearboxes is being fixed at the showrooms."),
    ("Energy price spike", "Industrial power bills were corrected for last year."),
    ("Union settlement", "One-off severance payments keep the peace on the shop floor."),
    ("Wastewater fine", "The environment inspectorate fined a treatment plant fault."),
    ("Tyre store fire", "Losses in the tyre warehouse exceed the insurance cover."),
    ("Ransomware attack", "Design databases had to be recovered and defences hardened."),
    ("Patent lawsuit lost", "Damages paid to a rival over an injection system patent."),
    ("Upholstery store flooded", "A burst pipe soaked the finished upholstery stock."),
    ("Metals shipment stolen", "Rare metals for catalytic converters went missing in transit."),
    ("Advertising blunder", "A national campaign had to be pulled and reworked."),
    ("Safety code overhaul", "Workstations were rebuilt to meet new safety rules."),
    ("Server room cooling failure", "R&D infrastructure needed costly repairs."),
    ("Waste reporting fine", "Paperwork errors in logistics drew a regulator's fine."),
    ("Embezzlement uncovered", "Fraud at a regional branch left a hole in the books."),
    ("Prototype destroyed", "Test rig failure wrecked a prototype during a crash test."),
    ("Paint shop sabotage", "Nozzles had to be cleaned and recalibrated."),
    ("Freight rates surge", "Sea carriers raised their rates overnight."),
    ("Showroom flood", "A plumbing failure flooded the flagship display floor."),
    ("Hail damage", "The factory roof needs new cladding after a storm."),
    ("Robot software patch", "A security flaw forced an urgent robot firmware update."),
    ("Night noise fine", "Neighbours complained about the plant's night shift."),
    ("Golden parachutes", "Departing executives were paid out."),
    ("Faulty lighting", "A batch of workstation lamps failed across the plant."),
    ("Tank leak", "An underground tank leaked and the site must be cleaned up."),
];

/// Base crisis costs before the rank multiplier.
fn crisis_base_cost<R: Rng>(rng: &mut R) -> Decimal {
    Decimal::from(10_000 * rng.gen_range(1..=10))
}

/// Catalog classes for `segment` that have at least one model, in catalog
/// order.
pub fn classes_with_models(state: &SimulationState, catalog: &Catalog, segment: SocialClass) -> Vec<ClassId> {
    catalog
        .classes()
        .iter()
        .filter(|c| c.social_class == segment)
        .filter(|c| state.car_models.iter().any(|m| m.class == c.id))
        .map(|c| c.id.clone())
        .collect()
}

/// Cars of `class` parked across all factories.
pub fn class_inventory(state: &SimulationState, class: &ClassId) -> u32 {
    state
        .factories
        .iter()
        .filter(|f| {
            f.producing_model
                .as_ref()
                .and_then(|id| state.model(id))
                .is_some_and(|m| &m.class == class)
        })
        .map(|f| f.inventory)
        .sum()
}

fn take_class_inventory(state: &mut SimulationState, class: &ClassId, qty: u32) -> u32 {
    let models: Vec<_> = state
        .car_models
        .iter()
        .filter(|m| &m.class == class)
        .map(|m| m.id.clone())
        .collect();
    let mut remaining = qty;
    for f in state.factories.iter_mut() {
        if remaining == 0 {
            break;
        }
        if f.producing_model.as_ref().is_some_and(|id| models.contains(id)) {
            let take = remaining.min(f.inventory);
            f.inventory -= take;
            remaining -= take;
        }
    }
    qty - remaining
}

/// Price a fleet order for the first model of `class`. `None` when the class
/// has no sellable model.
fn build_offer<R: Rng>(
    state: &SimulationState,
    kind: ContractKind,
    contractor: &str,
    class: &ClassId,
    requested_qty: u32,
    now: NaiveDateTime,
    rng: &mut R,
) -> Result<Option<ContractOffer>, EconError> {
    let Some(model) = state.car_models.iter().find(|m| &m.class == class) else {
        return Ok(None);
    };
    if model.price <= Decimal::ZERO {
        return Ok(None);
    }
    let negotiation = rng.gen_range(-0.15..0.15);
    let unit_cost = apply_inflation(
        model.production_cost,
        model.inflation_sensitivity,
        state.economic_multiplier,
    )?;
    let price_per_unit = contract_unit_price(model.price, negotiation, unit_cost)?;
    Ok(Some(ContractOffer {
        kind,
        contractor: contractor.to_string(),
        class: class.clone(),
        model_name: model.name.clone(),
        requested_qty,
        base_price: model.price,
        price_per_unit,
        negotiation,
        total_revenue: price_per_unit * Decimal::from(requested_qty),
        available_inventory: class_inventory(state, class),
        offered_on: now,
    }))
}

fn unit_cost_of(state: &SimulationState, offer: &ContractOffer) -> Result<Decimal, EconError> {
    match state.car_models.iter().find(|m| m.class == offer.class) {
        Some(m) => apply_inflation(m.production_cost, m.inflation_sensitivity, state.economic_multiplier),
        None => Ok(Decimal::ZERO),
    }
}

/// Deliver up to `qty` units of an offer, booking cash, stats, history and a
/// success log. Returns the history entry.
fn fulfill(state: &mut SimulationState, offer: &ContractOffer, qty: u32) -> Result<ContractHistoryEntry, EconError> {
    let unit_cost = unit_cost_of(state, offer)?;
    let before = class_inventory(state, &offer.class);
    let delivered = take_class_inventory(state, &offer.class, qty.min(before));
    let units = Decimal::from(delivered);
    let revenue = offer.price_per_unit * units;
    let profit = revenue - unit_cost * units;

    state.money += revenue;
    state.stats.revenue += revenue;
    state.stats.cars_sold += u64::from(delivered);
    match offer.kind {
        ContractKind::Domestic => {
            state.stats.contract_units += u64::from(delivered);
            state.stats.contract_revenue += revenue;
        }
        ContractKind::Export => {
            state.stats.export_units += u64::from(delivered);
            state.stats.export_revenue += revenue;
        }
    }

    let entry = ContractHistoryEntry {
        kind: offer.kind,
        contractor: offer.contractor.clone(),
        class: offer.class.clone(),
        requested_qty: offer.requested_qty,
        fulfilled_qty: delivered,
        price_per_unit: offer.price_per_unit,
        total_revenue: revenue,
        inventory_before: before,
        inventory_after: before - delivered,
        date: state.clock.date.date(),
    };
    state.push_contract(entry.clone());
    let label = match offer.kind {
        ContractKind::Domestic => "Fleet contract",
        ContractKind::Export => "EXPORT CONTRACT",
    };
    state.push_log(
        LogKind::Success,
        format!(
            "{label}: {} bought {delivered} class {} cars for ${revenue}",
            offer.contractor, offer.class
        ),
        Some(LogDetails::Transaction(TransactionDetails {
            model_name: offer.model_name.clone(),
            quantity: delivered,
            base_price: offer.base_price,
            final_price: offer.price_per_unit,
            negotiation_percent: offer.negotiation,
            total_revenue: revenue,
            total_profit: profit,
        })),
    );
    info!(kind = ?offer.kind, contractor = %offer.contractor, delivered, %revenue, "contract fulfilled");
    Ok(entry)
}

/// Resolve a fresh offer under `policy`.
fn dispatch_offer(
    state: &mut SimulationState,
    offer: ContractOffer,
    policy: ResolutionPolicy,
) -> Result<Option<SimEvent>, EconError> {
    match policy {
        ResolutionPolicy::AutoResolve => {
            if offer.available_inventory >= offer.requested_qty {
                let entry = fulfill(state, &offer, offer.requested_qty)?;
                if offer.kind == ContractKind::Domestic {
                    state.events.domestic_contracts_this_year += 1;
                }
                Ok(Some(SimEvent::ContractFulfilled(entry)))
            } else {
                let who = match offer.kind {
                    ContractKind::Domestic => "domestic contract",
                    ContractKind::Export => "export order",
                };
                state.push_log(
                    LogKind::Info,
                    format!(
                        "Declined {who} from {}: not enough stock ({}/{})",
                        offer.contractor, offer.available_inventory, offer.requested_qty
                    ),
                    None,
                );
                Ok(Some(SimEvent::ContractDeclined(offer)))
            }
        }
        ResolutionPolicy::RequireConfirmation => {
            if state.transient.pending_offer.is_some() {
                return Ok(None);
            }
            if offer.kind == ContractKind::Domestic {
                state.events.domestic_contracts_this_year += 1;
            }
            state.clock.throttle();
            state.transient.pending_offer = Some(offer.clone());
            Ok(Some(SimEvent::OfferPending(offer)))
        }
    }
}

/// Monthly roll for a civic fleet order of a Middle-segment class.
pub fn maybe_domestic_contract<R: Rng>(
    state: &mut SimulationState,
    catalog: &Catalog,
    policy: ResolutionPolicy,
    rng: &mut R,
) -> Result<Option<SimEvent>, EconError> {
    if prestige_rank(state.stats.cars_sold) < DOMESTIC_MIN_RANK
        || state.events.domestic_contracts_this_year >= DOMESTIC_PER_YEAR
    {
        return Ok(None);
    }
    if rng.gen::<f64>() >= DOMESTIC_CHANCE {
        return Ok(None);
    }
    let contractor = DOMESTIC_CONTRACTORS.choose(rng).copied().unwrap_or("City Hall");
    let classes = classes_with_models(state, catalog, SocialClass::Middle);
    let Some(class) = classes.choose(rng) else {
        return Ok(None);
    };
    let qty = rng.gen_range(5..=50);
    let now = state.clock.date;
    match build_offer(state, ContractKind::Domestic, contractor, class, qty, now, rng)? {
        Some(offer) => dispatch_offer(state, offer, policy),
        None => Ok(None),
    }
}

/// Year-start export order for a Higher-segment class. The year counts as
/// used whether or not the order is filled.
pub fn maybe_export_contract<R: Rng>(
    state: &mut SimulationState,
    catalog: &Catalog,
    policy: ResolutionPolicy,
    rng: &mut R,
) -> Result<Option<SimEvent>, EconError> {
    let year = state.clock.year();
    if prestige_rank(state.stats.cars_sold) < EXPORT_MIN_RANK || state.events.last_export_year == Some(year) {
        return Ok(None);
    }
    let classes = classes_with_models(state, catalog, SocialClass::Higher);
    if classes.is_empty() {
        return Ok(None);
    }
    let country = EXPORT_COUNTRIES.choose(rng).copied().unwrap_or("USA");
    let Some(class) = classes.choose(rng) else {
        return Ok(None);
    };
    let qty = rng.gen_range(25..=500);
    let now = state.clock.date;
    let Some(offer) = build_offer(state, ContractKind::Export, country, class, qty, now, rng)? else {
        return Ok(None);
    };
    state.events.last_export_year = Some(year);
    dispatch_offer(state, offer, policy)
}

fn charge_crisis(state: &mut SimulationState, crisis: &CrisisEvent) {
    state.money -= crisis.cost;
    state.stats.expenses += crisis.cost;
    state.stats.crisis_costs += crisis.cost;
    state.push_log(
        LogKind::Danger,
        format!("Crisis: {}. {} Paid ${}", crisis.title, crisis.description, crisis.cost),
        None,
    );
    warn!(title = %crisis.title, cost = %crisis.cost, "crisis paid");
}

/// Once-a-year crisis for established companies. Cash may go negative.
pub fn maybe_crisis<R: Rng>(
    state: &mut SimulationState,
    policy: ResolutionPolicy,
    rng: &mut R,
) -> Option<SimEvent> {
    let year = state.clock.year();
    let rank = prestige_rank(state.stats.cars_sold);
    if !CRISIS_RANKS.contains(&rank) || state.events.last_crisis_year == Some(year) {
        return None;
    }
    let cost = crisis_base_cost(rng) * Decimal::from(crisis_multiplier(rank));
    let (title, description) = CRISIS_SCENARIOS
        .choose(rng)
        .copied()
        .unwrap_or(("Unexpected costs", "An unplanned bill arrived."));
    let crisis = CrisisEvent {
        title: title.to_string(),
        description: description.to_string(),
        cost,
        year,
    };
    state.events.last_crisis_year = Some(year);
    match policy {
        ResolutionPolicy::AutoResolve => {
            charge_crisis(state, &crisis);
            Some(SimEvent::CrisisPaid(crisis))
        }
        ResolutionPolicy::RequireConfirmation => {
            // An unanswered crisis from an earlier year falls due now
            if let Some(overdue) = state.transient.pending_crisis.take() {
                charge_crisis(state, &overdue);
            }
            state.clock.throttle();
            state.transient.pending_crisis = Some(crisis.clone());
            Some(SimEvent::CrisisPending(crisis))
        }
    }
}

fn release_if_clear(state: &mut SimulationState) {
    if !state.transient.has_pending_decision() {
        state.clock.release_throttle();
    }
}

/// Deliver as much of the pending offer as stock allows.
pub fn accept_offer(state: &mut SimulationState) -> Result<(), Rejection> {
    let offer = state
        .transient
        .pending_offer
        .clone()
        .ok_or(Rejection::NoPendingDecision)?;
    fulfill(state, &offer, offer.requested_qty)?;
    state.transient.pending_offer = None;
    release_if_clear(state);
    Ok(())
}

pub fn reject_offer(state: &mut SimulationState) -> Result<(), Rejection> {
    let offer = state
        .transient
        .pending_offer
        .take()
        .ok_or(Rejection::NoPendingDecision)?;
    state.push_log(LogKind::Info, format!("Turned down {}'s order", offer.contractor), None);
    release_if_clear(state);
    Ok(())
}

pub fn pay_crisis(state: &mut SimulationState) -> Result<(), Rejection> {
    let crisis = state
        .transient
        .pending_crisis
        .take()
        .ok_or(Rejection::NoPendingDecision)?;
    charge_crisis(state, &crisis);
    release_if_clear(state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::game_with_model;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{CarModel, ModelId};

    /// A middle-segment model in stock and a rank-5 sales record.
    fn established() -> (SimulationState, Catalog) {
        let (mut s, catalog) = game_with_model();
        let middle = catalog
            .classes()
            .iter()
            .find(|c| c.social_class == SocialClass::Middle)
            .unwrap()
            .id
            .clone();
        let mut m: CarModel = s.car_models[0].clone();
        m.id = ModelId::from("model-mid");
        m.class = middle;
        s.car_models.push(m);
        s.factories[0].producing_model = Some(ModelId::from("model-mid"));
        s.factories[0].inventory = 1000;
        s.stats.cars_sold = 15_000;
        (s, catalog)
    }

    fn roll_domestic(s: &mut SimulationState, catalog: &Catalog, policy: ResolutionPolicy) -> SimEvent {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..500 {
            if let Some(e) = maybe_domestic_contract(s, catalog, policy, &mut rng).unwrap() {
                return e;
            }
        }
        panic!("no contract in 500 months");
    }

    #[test]
    fn domestic_contract_auto_fulfils_from_stock() {
        let (mut s, catalog) = established();
        let money = s.money;
        let SimEvent::ContractFulfilled(entry) = roll_domestic(&mut s, &catalog, ResolutionPolicy::AutoResolve) else {
            panic!("expected fulfilment");
        };
        assert_eq!(entry.fulfilled_qty, entry.requested_qty);
        assert!((5..=50).contains(&entry.requested_qty));
        assert_eq!(s.factories[0].inventory, 1000 - entry.requested_qty);
        assert_eq!(s.money, money + entry.total_revenue);
        assert_eq!(s.events.domestic_contracts_this_year, 1);
        assert_eq!(s.stats.cars_sold, 15_000 + u64::from(entry.requested_qty));
        assert_eq!(s.contract_history.len(), 1);
        assert!(matches!(s.logs[0].details, Some(LogDetails::Transaction(_))));
    }

    #[test]
    fn short_stock_declines_without_side_effects() {
        let (mut s, catalog) = established();
        s.factories[0].inventory = 2;
        let money = s.money;
        assert!(matches!(
            roll_domestic(&mut s, &catalog, ResolutionPolicy::AutoResolve),
            SimEvent::ContractDeclined(_)
        ));
        assert_eq!(s.money, money);
        assert_eq!(s.factories[0].inventory, 2);
        assert_eq!(s.events.domestic_contracts_this_year, 0);
    }

    #[test]
    fn low_rank_gets_no_calls() {
        let (mut s, catalog) = established();
        s.stats.cars_sold = 100;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..200 {
            assert!(maybe_domestic_contract(&mut s, &catalog, ResolutionPolicy::AutoResolve, &mut rng)
                .unwrap()
                .is_none());
        }
    }

    #[test]
    fn confirmation_policy_parks_the_offer() {
        let (mut s, catalog) = established();
        s.clock.set_speed(10);
        assert!(matches!(
            roll_domestic(&mut s, &catalog, ResolutionPolicy::RequireConfirmation),
            SimEvent::OfferPending(_)
        ));
        assert_eq!(s.clock.speed, 1);
        assert!(s.clock.auto_throttled);
        let requested = s.transient.pending_offer.as_ref().unwrap().requested_qty;
        s.factories[0].inventory = 3;
        accept_offer(&mut s).unwrap();
        assert!(s.transient.pending_offer.is_none());
        assert!(!s.clock.auto_throttled);
        assert_eq!(s.contract_history[0].fulfilled_qty, 3.min(requested));
        assert_eq!(s.factories[0].inventory, 0);
        assert_eq!(accept_offer(&mut s), Err(Rejection::NoPendingDecision));
    }

    #[test]
    fn crisis_cost_scales_with_rank() {
        let (mut s, _) = established();
        s.stats.cars_sold = 25_000; // rank 6
        let money = s.money;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let Some(SimEvent::CrisisPaid(c)) = maybe_crisis(&mut s, ResolutionPolicy::AutoResolve, &mut rng) else {
            panic!("expected a crisis");
        };
        assert_eq!(c.cost % Decimal::from(40_000), Decimal::ZERO);
        assert!(c.cost >= Decimal::from(40_000) && c.cost <= Decimal::from(400_000));
        assert_eq!(s.money, money - c.cost);
        assert_eq!(s.logs[0].kind, LogKind::Danger);
        assert!(maybe_crisis(&mut s, ResolutionPolicy::AutoResolve, &mut rng).is_none());
    }

    #[test]
    fn pending_crisis_is_paid_on_confirmation() {
        let (mut s, _) = established();
        let money = s.money;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        maybe_crisis(&mut s, ResolutionPolicy::RequireConfirmation, &mut rng).unwrap();
        assert_eq!(s.money, money);
        let cost = s.transient.pending_crisis.as_ref().unwrap().cost;
        pay_crisis(&mut s).unwrap();
        assert_eq!(s.money, money - cost);
        assert_eq!(s.stats.crisis_costs, cost);
    }

    #[test]
    fn unanswered_crisis_is_charged_before_the_next_one() {
        let (mut s, _) = established();
        let money = s.money;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        maybe_crisis(&mut s, ResolutionPolicy::RequireConfirmation, &mut rng).unwrap();
        let first = s.transient.pending_crisis.as_ref().unwrap().cost;

        s.clock.date += chrono::Duration::days(366);
        assert_eq!(s.clock.year(), 1951);
        let Some(SimEvent::CrisisPending(second)) =
            maybe_crisis(&mut s, ResolutionPolicy::RequireConfirmation, &mut rng)
        else {
            panic!("expected a second crisis");
        };
        assert_eq!(second.year, 1951);
        assert_eq!(s.money, money - first);
        assert_eq!(s.stats.crisis_costs, first);
        assert_eq!(s.transient.pending_crisis.as_ref(), Some(&second));

        pay_crisis(&mut s).unwrap();
        assert_eq!(s.money, money - first - second.cost);
    }

    #[test]
    fn export_marks_the_year_even_when_declined() {
        let (mut s, catalog) = established();
        let higher = catalog
            .classes()
            .iter()
            .find(|c| c.social_class == SocialClass::Higher)
            .unwrap()
            .id
            .clone();
        s.car_models[1].class = higher;
        s.factories[0].inventory = 10;
        s.stats.cars_sold = 130_000;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let event = maybe_export_contract(&mut s, &catalog, ResolutionPolicy::AutoResolve, &mut rng).unwrap();
        assert!(matches!(event, Some(SimEvent::ContractDeclined(_))));
        assert_eq!(s.events.last_export_year, Some(1950));
        assert!(maybe_export_contract(&mut s, &catalog, ResolutionPolicy::AutoResolve, &mut rng)
            .unwrap()
            .is_none());
    }
}
