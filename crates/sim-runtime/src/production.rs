//! Monthly factory output.

use sim_core::{Catalog, Factory, SimulationState};

/// Manufacturing complexity of whatever `factory` builds; 1.0 when it has no
/// model assigned.
pub fn factory_complexity(state: &SimulationState, catalog: &Catalog, factory: &Factory) -> f64 {
    factory
        .producing_model
        .as_ref()
        .and_then(|id| state.model(id))
        .and_then(|m| catalog.class(&m.class))
        .map(|c| c.complexity)
        .filter(|c| c.is_finite() && *c > 0.0)
        .unwrap_or(1.0)
}

/// Units `factory` adds this month. Complexity divides nominal capacity,
/// efficiency scales what is left, and the parking lot caps the result.
pub fn factory_output(factory: &Factory, complexity: f64) -> u32 {
    if !factory.is_active() || factory.producing_model.is_none() {
        return 0;
    }
    let effective = (f64::from(factory.capacity) / complexity).floor() as u64;
    let max_production = (effective * u64::from(factory.efficiency) / 100) as u32;
    let space = factory.parking_cap().saturating_sub(factory.inventory);
    factory.production_target.min(max_production).min(space)
}

/// Run every factory for one month. Returns total units produced.
pub fn run_production(state: &mut SimulationState, catalog: &Catalog) -> u64 {
    let outputs: Vec<u32> = state
        .factories
        .iter()
        .map(|f| factory_output(f, factory_complexity(state, catalog, f)))
        .collect();
    let mut total = 0u64;
    for (f, out) in state.factories.iter_mut().zip(outputs) {
        f.current_production = out;
        f.inventory += out;
        total += u64::from(out);
    }
    total
}
