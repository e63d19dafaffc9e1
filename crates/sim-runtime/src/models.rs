//! Car model design from catalog parts.

use crate::commands::Rejection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    money_from_f64, AnnualStats, CarClass, CarModel, CarStats, Catalog, ClassId, ModelId,
    ModelParts, Part, PartKind, SegmentSplit, SimulationState,
};
use sim_econ::{model_base_cost, synergy_score, weighted_sensitivity};

/// Reliability every fresh design starts with.
const BASE_RELIABILITY: u32 = 80;

/// Player input for creating or editing a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDesign {
    pub name: String,
    pub class: ClassId,
    pub parts: ModelParts,
    pub price: f64,
}

/// Values derived from a validated design.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedDesign {
    pub price: Decimal,
    pub production_cost: Decimal,
    pub stats: CarStats,
    pub interior_quality: u32,
    pub inflation_sensitivity: f64,
    pub synergy_score: u32,
}

fn resolve_part<'a>(
    state: &SimulationState,
    catalog: &'a Catalog,
    id: &sim_core::PartId,
    kind: PartKind,
) -> Result<&'a Part, Rejection> {
    let part = catalog.part(id).ok_or_else(|| Rejection::unknown("part", id))?;
    if part.kind != kind {
        return Err(Rejection::InvalidDesign(format!("{id} is not a {kind:?} part")));
    }
    if !state.unlocked_parts.contains(id) {
        return Err(Rejection::NotUnlocked {
            kind: "part",
            id: id.to_string(),
        });
    }
    Ok(part)
}

fn resolve_class<'a>(
    state: &SimulationState,
    catalog: &'a Catalog,
    id: &ClassId,
) -> Result<&'a CarClass, Rejection> {
    let class = catalog.class(id).ok_or_else(|| Rejection::unknown("class", id))?;
    if !state.unlocked_classes.contains(id) {
        return Err(Rejection::NotUnlocked {
            kind: "class",
            id: id.to_string(),
        });
    }
    Ok(class)
}

/// Validate a design against the catalog and unlocks, deriving stats,
/// base cost, inflation sensitivity and synergy.
pub fn derive_design(
    state: &SimulationState,
    catalog: &Catalog,
    design: &ModelDesign,
) -> Result<DerivedDesign, Rejection> {
    if design.name.trim().is_empty() {
        return Err(Rejection::InvalidDesign("name is empty".into()));
    }
    let price = money_from_f64(design.price)?;
    if price <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount);
    }
    let class = resolve_class(state, catalog, &design.class)?;
    let parts = [
        resolve_part(state, catalog, &design.parts.engine, PartKind::Engine)?,
        resolve_part(state, catalog, &design.parts.chassis, PartKind::Chassis)?,
        resolve_part(state, catalog, &design.parts.body, PartKind::Body)?,
        resolve_part(state, catalog, &design.parts.interior, PartKind::Interior)?,
    ];
    let stats = parts.iter().fold(
        CarStats {
            reliability: BASE_RELIABILITY,
            ..CarStats::default()
        },
        |acc, p| CarStats {
            power: acc.power + p.stats.power,
            weight: acc.weight + p.stats.weight,
            safety: acc.safety + p.stats.safety,
            style: acc.style + p.stats.style,
            reliability: acc.reliability,
        },
    );
    Ok(DerivedDesign {
        price,
        production_cost: model_base_cost(&parts, class.complexity)?,
        stats,
        interior_quality: parts[3].stats.style,
        inflation_sensitivity: weighted_sensitivity(&parts)?,
        synergy_score: synergy_score(class, &parts, &design.parts.body),
    })
}

pub fn create_model(
    state: &mut SimulationState,
    catalog: &Catalog,
    design: ModelDesign,
) -> Result<ModelId, Rejection> {
    let derived = derive_design(state, catalog, &design)?;
    let id = ModelId(state.allocate_id("model"));
    state.car_models.push(CarModel {
        id: id.clone(),
        name: design.name,
        class: design.class,
        parts: design.parts,
        price: derived.price,
        production_cost: derived.production_cost,
        stats: derived.stats,
        interior_quality: derived.interior_quality,
        inflation_sensitivity: derived.inflation_sensitivity,
        synergy_score: derived.synergy_score,
        popularity: 50,
        sales_this_month: 0,
        sales_breakdown: SegmentSplit::default(),
        total_sales: 0,
        total_profit: Decimal::ZERO,
        year_introduced: state.clock.year(),
        this_year: AnnualStats::default(),
        last_year: AnnualStats::default(),
    });
    Ok(id)
}

/// Replace a model's design. Changing the class or any part resets its
/// sales counters; a rename or price change does not.
pub fn update_model(
    state: &mut SimulationState,
    catalog: &Catalog,
    id: &ModelId,
    design: ModelDesign,
) -> Result<(), Rejection> {
    let derived = derive_design(state, catalog, &design)?;
    let year = state.clock.year();
    let model = state
        .car_models
        .iter_mut()
        .find(|m| &m.id == id)
        .ok_or_else(|| Rejection::unknown("model", id))?;
    let structural = model.class != design.class || model.parts != design.parts;
    model.name = design.name;
    model.class = design.class;
    model.parts = design.parts;
    model.price = derived.price;
    model.production_cost = derived.production_cost;
    model.stats = derived.stats;
    model.interior_quality = derived.interior_quality;
    model.inflation_sensitivity = derived.inflation_sensitivity;
    model.synergy_score = derived.synergy_score;
    if structural {
        model.sales_this_month = 0;
        model.sales_breakdown = SegmentSplit::default();
        model.total_sales = 0;
        model.total_profit = Decimal::ZERO;
        model.year_introduced = year;
    }
    Ok(())
}

/// Remove a model no factory is building.
pub fn delete_model(state: &mut SimulationState, id: &ModelId) -> Result<(), Rejection> {
    if state.model(id).is_none() {
        return Err(Rejection::unknown("model", id));
    }
    if state
        .factories
        .iter()
        .any(|f| f.producing_model.as_ref() == Some(id))
    {
        return Err(Rejection::ModelInUse(id.to_string()));
    }
    state.car_models.retain(|m| &m.id != id);
    Ok(())
}
