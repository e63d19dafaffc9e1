//! Fixtures shared by unit tests.

use crate::models::{create_model, ModelDesign};
use sim_core::{Catalog, ClassId, ModelId, ModelParts, PartId, SimConfig, SimulationState};

pub fn starter_design(price: f64) -> ModelDesign {
    ModelDesign {
        name: "Runabout".into(),
        class: ClassId::from("A"),
        parts: ModelParts {
            engine: PartId::from("small-i4"),
            chassis: PartId::from("frame"),
            body: PartId::from("small"),
            interior: PartId::from("spartan"),
        },
        price,
    }
}

/// Fresh game with a 9000 starter car assigned to the main plant.
pub fn game_with_model() -> (SimulationState, Catalog) {
    let catalog = Catalog::builtin().unwrap();
    let mut s = SimulationState::new(&SimConfig::default(), &catalog);
    let id = create_model(&mut s, &catalog, starter_design(9000.0)).unwrap();
    s.factories[0].producing_model = Some(id);
    (s, catalog)
}

pub fn starter_model_id(s: &SimulationState) -> ModelId {
    s.car_models[0].id.clone()
}
