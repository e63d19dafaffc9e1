//! Factories, showrooms, research and expansion permits.

use crate::commands::Rejection;
use rust_decimal::Decimal;
use sim_core::{
    Catalog, ClassId, Dealership, DealershipId, FacilityStatus, FactoryId, LogKind, ModelId, PartId,
    SimulationState,
};
use sim_econ::{expansion_cost, scale_floor};
use tracing::info;

pub const DEALERSHIP_PRICE: i64 = 75_000;
pub const MAX_DEALERSHIP_LEVEL: u32 = 5;
pub const MAX_FACTORY_LEVEL: u32 = 8;
/// First year expansion permits are sold.
pub const EXPANSION_YEAR: i32 = 2025;

fn ensure_funds(state: &SimulationState, cost: Decimal) -> Result<(), Rejection> {
    if state.money < cost {
        return Err(Rejection::InsufficientFunds {
            needed: cost,
            available: state.money,
        });
    }
    Ok(())
}

pub fn buy_dealership(state: &mut SimulationState) -> Result<(), Rejection> {
    let limit = state.expansion.showroom_limit();
    if state.dealerships.len() >= limit {
        return Err(Rejection::LimitReached {
            kind: "showroom",
            limit,
        });
    }
    let cost = Decimal::new(DEALERSHIP_PRICE, 0);
    ensure_funds(state, cost)?;
    state.money -= cost;
    let id = DealershipId(state.allocate_id("dealer"));
    let name = format!("Showroom {}", state.dealerships.len() + 1);
    state.dealerships.push(Dealership {
        id,
        name: name.clone(),
        location: "New Location".to_string(),
        sales_capacity: 20,
        workers: 20,
        sales_this_month: 0,
        upgrade_cost: Decimal::new(50_000, 0),
        level: 1,
        status: FacilityStatus::Active,
    });
    state.push_log(LogKind::Success, format!("Opened {name} for ${cost}"), None);
    Ok(())
}

pub fn upgrade_dealership(state: &mut SimulationState, id: &DealershipId) -> Result<(), Rejection> {
    let money = state.money;
    let d = state
        .dealership_mut(id)
        .ok_or_else(|| Rejection::unknown("dealership", id))?;
    if d.level >= MAX_DEALERSHIP_LEVEL {
        return Err(Rejection::MaxLevel {
            kind: "dealership",
            level: MAX_DEALERSHIP_LEVEL,
        });
    }
    let cost = d.upgrade_cost;
    if money < cost {
        return Err(Rejection::InsufficientFunds {
            needed: cost,
            available: money,
        });
    }
    let next = next_upgrade_cost(cost)?;
    d.level += 1;
    d.sales_capacity += 10;
    d.upgrade_cost = next;
    state.money -= cost;
    Ok(())
}

pub fn toggle_dealership(state: &mut SimulationState, id: &DealershipId) -> Result<(), Rejection> {
    let d = state
        .dealership_mut(id)
        .ok_or_else(|| Rejection::unknown("dealership", id))?;
    d.status = d.status.toggled();
    Ok(())
}

pub fn upgrade_factory(state: &mut SimulationState, id: &FactoryId) -> Result<(), Rejection> {
    let money = state.money;
    let f = state
        .factory_mut(id)
        .ok_or_else(|| Rejection::unknown("factory", id))?;
    if f.level >= MAX_FACTORY_LEVEL {
        return Err(Rejection::MaxLevel {
            kind: "factory",
            level: MAX_FACTORY_LEVEL,
        });
    }
    let cost = f.upgrade_cost;
    if money < cost {
        return Err(Rejection::InsufficientFunds {
            needed: cost,
            available: money,
        });
    }
    let next = next_upgrade_cost(cost)?;
    f.level += 1;
    f.capacity += 10;
    f.workers += 5;
    f.upgrade_cost = next;
    state.money -= cost;
    Ok(())
}

pub fn toggle_factory(state: &mut SimulationState, id: &FactoryId) -> Result<(), Rejection> {
    let f = state
        .factory_mut(id)
        .ok_or_else(|| Rejection::unknown("factory", id))?;
    f.status = f.status.toggled();
    Ok(())
}

/// +5 efficiency points (capped at 100) for a permanent 5% wage rise.
pub fn raise_wages(state: &mut SimulationState, id: &FactoryId) -> Result<(), Rejection> {
    let f = state
        .factory_mut(id)
        .ok_or_else(|| Rejection::unknown("factory", id))?;
    if f.efficiency >= 100 {
        return Err(Rejection::MaxEfficiency);
    }
    f.efficiency = (f.efficiency + 5).min(100);
    f.wage_level += 0.05;
    Ok(())
}

/// Point a factory at a model (or none) with a monthly target. Cars already
/// parked stay in the lot.
pub fn assign_factory(
    state: &mut SimulationState,
    id: &FactoryId,
    model: Option<ModelId>,
    target: u32,
) -> Result<(), Rejection> {
    if let Some(m) = &model {
        if state.model(m).is_none() {
            return Err(Rejection::unknown("model", m));
        }
    }
    let f = state
        .factory_mut(id)
        .ok_or_else(|| Rejection::unknown("factory", id))?;
    f.producing_model = model;
    f.production_target = target;
    Ok(())
}

pub fn unlock_class(state: &mut SimulationState, catalog: &Catalog, id: &ClassId) -> Result<(), Rejection> {
    let class = catalog.class(id).ok_or_else(|| Rejection::unknown("class", id))?;
    if state.unlocked_classes.contains(id) {
        return Err(Rejection::AlreadyUnlocked {
            kind: "class",
            id: id.to_string(),
        });
    }
    if state.clock.year() < class.unlock_year {
        return Err(Rejection::TooEarly(class.unlock_year));
    }
    ensure_funds(state, class.research_cost)?;
    state.money -= class.research_cost;
    state.unlocked_classes.insert(id.clone());
    state.push_log(LogKind::Success, format!("Research complete: {} class", class.name), None);
    Ok(())
}

pub fn unlock_part(state: &mut SimulationState, catalog: &Catalog, id: &PartId) -> Result<(), Rejection> {
    let part = catalog.part(id).ok_or_else(|| Rejection::unknown("part", id))?;
    if state.unlocked_parts.contains(id) {
        return Err(Rejection::AlreadyUnlocked {
            kind: "part",
            id: id.to_string(),
        });
    }
    if state.clock.year() < part.unlock_year {
        return Err(Rejection::TooEarly(part.unlock_year));
    }
    ensure_funds(state, part.research_cost)?;
    state.money -= part.research_cost;
    state.unlocked_parts.insert(id.clone());
    state.push_log(LogKind::Success, format!("New component: {}", part.label), None);
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionKind {
    /// +4 factory slots per level.
    Factories,
    /// +7 showroom slots per level.
    Showrooms,
}

pub fn expansion_price(state: &SimulationState, kind: ExpansionKind) -> Result<Decimal, Rejection> {
    let (base, level) = match kind {
        ExpansionKind::Factories => (Decimal::new(500_000_000, 0), state.expansion.factory_level),
        ExpansionKind::Showrooms => (Decimal::new(250_000_000, 0), state.expansion.showroom_level),
    };
    Ok(expansion_cost(base, level)?)
}

pub fn purchase_expansion(state: &mut SimulationState, kind: ExpansionKind) -> Result<(), Rejection> {
    if state.clock.year() < EXPANSION_YEAR {
        return Err(Rejection::TooEarly(EXPANSION_YEAR));
    }
    let cost = expansion_price(state, kind)?;
    ensure_funds(state, cost)?;
    state.money -= cost;
    let level = match kind {
        ExpansionKind::Factories => {
            state.expansion.factory_level += 1;
            state.expansion.factory_level
        }
        ExpansionKind::Showrooms => {
            state.expansion.showroom_level += 1;
            state.expansion.showroom_level
        }
    };
    info!(?kind, level, %cost, "expansion purchased");
    state.push_log(
        LogKind::Success,
        format!(
            "Expansion level {level}: limits now {} factories, {} showrooms",
            state.expansion.factory_limit(),
            state.expansion.showroom_limit()
        ),
        None,
    );
    Ok(())
}

/// Floor of `cost × 1.5`, the price step after each upgrade.
pub fn next_upgrade_cost(cost: Decimal) -> Result<Decimal, Rejection> {
    Ok(scale_floor(cost, 1.5)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::SimConfig;

    fn state() -> (SimulationState, Catalog) {
        let catalog = Catalog::builtin().unwrap();
        (SimulationState::new(&SimConfig::default(), &catalog), catalog)
    }

    #[test]
    fn dealership_purchase_and_upgrades() {
        let (mut s, _) = state();
        buy_dealership(&mut s).unwrap();
        assert_eq!(s.dealerships.len(), 2);
        assert_eq!(s.money, Decimal::new(4_925_000, 0));
        let id = s.dealerships[1].id.clone();
        for _ in 0..4 {
            upgrade_dealership(&mut s, &id).unwrap();
        }
        let d = &s.dealerships[1];
        assert_eq!((d.level, d.sales_capacity), (5, 60));
        assert!(matches!(
            upgrade_dealership(&mut s, &id),
            Err(Rejection::MaxLevel { level: 5, .. })
        ));
    }

    #[test]
    fn showroom_limit_applies() {
        let (mut s, _) = state();
        s.money = Decimal::new(100_000_000, 0);
        for _ in 1..14 {
            buy_dealership(&mut s).unwrap();
        }
        assert!(matches!(
            buy_dealership(&mut s),
            Err(Rejection::LimitReached { limit: 14, .. })
        ));
    }

    #[test]
    fn factory_upgrade_steps() {
        let (mut s, _) = state();
        let id = s.factories[0].id.clone();
        upgrade_factory(&mut s, &id).unwrap();
        let f = &s.factories[0];
        assert_eq!((f.level, f.capacity, f.workers), (2, 110, 55));
        assert_eq!(f.upgrade_cost, Decimal::new(150_000, 0));
        assert_eq!(f.parking_cap(), 1400);
        assert_eq!(next_upgrade_cost(f.upgrade_cost).unwrap(), Decimal::new(225_000, 0));
    }

    #[test]
    fn wage_raises_cap_efficiency() {
        let (mut s, _) = state();
        let id = s.factories[0].id.clone();
        for _ in 0..5 {
            raise_wages(&mut s, &id).unwrap();
        }
        assert_eq!(s.factories[0].efficiency, 100);
        assert!((s.factories[0].wage_level - 1.25).abs() < 1e-9);
        assert_eq!(raise_wages(&mut s, &id), Err(Rejection::MaxEfficiency));
    }

    #[test]
    fn research_is_gated_by_year_and_cash() {
        let (mut s, catalog) = state();
        let late = catalog
            .classes()
            .iter()
            .find(|c| c.unlock_year > 1950)
            .unwrap()
            .id
            .clone();
        assert!(matches!(unlock_class(&mut s, &catalog, &late), Err(Rejection::TooEarly(_))));
        let sedan = PartId::from("sedan");
        unlock_part(&mut s, &catalog, &sedan).unwrap();
        assert!(s.unlocked_parts.contains(&sedan));
        assert_eq!(s.money, Decimal::new(4_980_000, 0));
        assert!(matches!(
            unlock_part(&mut s, &catalog, &sedan),
            Err(Rejection::AlreadyUnlocked { .. })
        ));
    }

    #[test]
    fn expansions_wait_for_the_modern_era() {
        let (mut s, _) = state();
        assert_eq!(
            purchase_expansion(&mut s, ExpansionKind::Factories),
            Err(Rejection::TooEarly(EXPANSION_YEAR))
        );
        s.clock.date = chrono::NaiveDate::from_ymd_opt(2030, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        s.money = Decimal::new(2_000_000_000, 0);
        purchase_expansion(&mut s, ExpansionKind::Factories).unwrap();
        assert_eq!(s.expansion.factory_limit(), 13);
        assert_eq!(
            expansion_price(&s, ExpansionKind::Factories).unwrap(),
            Decimal::new(600_000_000, 0)
        );
        purchase_expansion(&mut s, ExpansionKind::Showrooms).unwrap();
        assert_eq!(s.expansion.showroom_limit(), 21);
    }
}
