//! Static car-class and part catalogs.
//!
//! The built-in catalog is embedded from `assets/catalog/*.yaml` and parsed
//! once at engine construction. It is read-only for the lifetime of a game.

use crate::{ClassId, PartId, SocialClass};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

const BUILTIN_CLASSES: &str = include_str!("../../../assets/catalog/car_classes.yaml");
const BUILTIN_PARTS: &str = include_str!("../../../assets/catalog/parts.yaml");

/// What a class's buyers care about most.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Economy,
    Reliability,
    Power,
    Comfort,
    Safety,
    Luxury,
    Performance,
    Status,
    ToWork,
    Standard,
    Family,
}

/// Additional buyer segment for a class, at reduced desirability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecondaryMarket {
    pub social_class: SocialClass,
    pub multiplier: f64,
}

/// Engine-power fit for a class: ordered `(max_power_inclusive, multiplier)`
/// bands, with `above` applying past the last band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineFit {
    pub bands: Vec<(u32, f64)>,
    pub above: f64,
}

impl EngineFit {
    /// Desirability multiplier for an engine of `power`.
    pub fn multiplier(&self, power: u32) -> f64 {
        self.bands
            .iter()
            .find(|(max, _)| power <= *max)
            .map(|(_, m)| *m)
            .unwrap_or(self.above)
    }
}

impl Default for EngineFit {
    fn default() -> Self {
        Self {
            bands: Vec::new(),
            above: 1.0,
        }
    }
}

fn one() -> f64 {
    1.0
}

/// A car class: price band, buyers and manufacturing difficulty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarClass {
    pub id: ClassId,
    pub name: String,
    /// Lower edge of the expected price band (1950 dollars).
    pub min_price: Decimal,
    /// Upper edge of the expected price band; linear penalty above it.
    pub max_price: Decimal,
    /// Quartic penalty above this price.
    pub hard_cap: Decimal,
    /// Complexity multiplier: divides factory capacity, scales unit cost,
    /// wages and maintenance.
    #[serde(default = "one")]
    pub complexity: f64,
    pub priority: Priority,
    pub social_class: SocialClass,
    pub unlock_year: i32,
    #[serde(default)]
    pub secondary_markets: Vec<SecondaryMarket>,
    #[serde(default = "one")]
    pub inflation_sensitivity: f64,
    pub research_cost: Decimal,
    #[serde(default)]
    pub required_body_types: Vec<PartId>,
    #[serde(default)]
    pub preferred_tags: Vec<String>,
    #[serde(default)]
    pub forbidden_tags: Vec<String>,
    #[serde(default)]
    pub engine_fit: EngineFit,
}

/// Slot a part occupies on a car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Engine,
    Chassis,
    Body,
    Interior,
}

/// Stat contributions of a part. Missing stats contribute zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartStats {
    pub power: u32,
    pub weight: u32,
    pub safety: u32,
    pub style: u32,
}

/// A purchasable component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub label: String,
    pub kind: PartKind,
    pub cost: Decimal,
    pub unlock_year: i32,
    pub research_cost: Decimal,
    #[serde(default)]
    pub stats: PartStats,
    #[serde(default = "one")]
    pub inflation_sensitivity: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Part {
    /// Whether any of this part's tags appears in `tags`.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// YAML could not be parsed into catalog entries.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Two entries share an id.
    #[error("duplicate catalog id: {0}")]
    Duplicate(String),
    /// A class requires a body type that is not a body part.
    #[error("class {class} requires unknown body type {body}")]
    UnknownBody { class: String, body: String },
    /// Price band must satisfy 0 < min <= max < hard cap.
    #[error("class {0} has an invalid price band")]
    InvalidPriceBand(String),
}

/// Immutable class and part tables, in catalog order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    classes: Vec<CarClass>,
    parts: Vec<Part>,
}

impl Catalog {
    /// Parse and validate the catalog embedded in the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CLASSES, BUILTIN_PARTS)
    }

    /// Parse and validate a catalog from YAML documents.
    pub fn from_yaml(classes: &str, parts: &str) -> Result<Self, CatalogError> {
        let classes: Vec<CarClass> = serde_yaml::from_str(classes)?;
        let parts: Vec<Part> = serde_yaml::from_str(parts)?;
        let catalog = Self { classes, parts };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for c in &self.classes {
            if !seen.insert(c.id.0.as_str()) {
                return Err(CatalogError::Duplicate(c.id.0.clone()));
            }
            if c.min_price <= Decimal::ZERO
                || c.min_price > c.max_price
                || c.max_price >= c.hard_cap
            {
                return Err(CatalogError::InvalidPriceBand(c.id.0.clone()));
            }
        }
        let mut seen = BTreeSet::new();
        for p in &self.parts {
            if !seen.insert(p.id.0.as_str()) {
                return Err(CatalogError::Duplicate(p.id.0.clone()));
            }
        }
        for c in &self.classes {
            for body in &c.required_body_types {
                match self.part(body) {
                    Some(p) if p.kind == PartKind::Body => {}
                    _ => {
                        return Err(CatalogError::UnknownBody {
                            class: c.id.0.clone(),
                            body: body.0.clone(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// All classes in catalog order.
    pub fn classes(&self) -> &[CarClass] {
        &self.classes
    }

    /// All parts in catalog order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn class(&self, id: &ClassId) -> Option<&CarClass> {
        self.classes.iter().find(|c| &c.id == id)
    }

    pub fn part(&self, id: &PartId) -> Option<&Part> {
        self.parts.iter().find(|p| &p.id == id)
    }

    /// Parts of a given kind, in catalog order.
    pub fn parts_of(&self, kind: PartKind) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(move |p| p.kind == kind)
    }

    /// Ids of classes and parts that are free at game start.
    pub fn starting_unlocks(&self) -> (BTreeSet<ClassId>, BTreeSet<PartId>) {
        let classes = self
            .classes
            .iter()
            .filter(|c| c.research_cost.is_zero())
            .map(|c| c.id.clone())
            .collect();
        let parts = self
            .parts
            .iter()
            .filter(|p| p.research_cost.is_zero())
            .map(|p| p.id.clone())
            .collect();
        (classes, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let cat = Catalog::builtin().unwrap();
        assert_eq!(cat.classes().len(), 12);
        assert_eq!(cat.parts_of(PartKind::Engine).count(), 14);
        assert_eq!(cat.parts_of(PartKind::Chassis).count(), 5);
        assert_eq!(cat.parts_of(PartKind::Body).count(), 11);
        assert_eq!(cat.parts_of(PartKind::Interior).count(), 6);
        let a = cat.class(&ClassId::from("A")).unwrap();
        assert_eq!(a.hard_cap, Decimal::new(11_500, 0));
        assert_eq!(a.social_class, SocialClass::Lower);
    }

    #[test]
    fn starting_unlocks_are_the_free_entries() {
        let cat = Catalog::builtin().unwrap();
        let (classes, parts) = cat.starting_unlocks();
        assert_eq!(classes.into_iter().collect::<Vec<_>>(), vec![ClassId::from("A")]);
        let parts: Vec<_> = parts.into_iter().map(|p| p.0).collect();
        assert_eq!(parts, vec!["frame", "small", "small-i4", "spartan"]);
    }

    #[test]
    fn engine_fit_bands_are_inclusive() {
        let cat = Catalog::builtin().unwrap();
        let s = cat.class(&ClassId::from("S")).unwrap();
        assert_eq!(s.engine_fit.multiplier(159), 0.4);
        assert_eq!(s.engine_fit.multiplier(160), 0.9);
        assert_eq!(s.engine_fit.multiplier(349), 1.0);
        assert_eq!(s.engine_fit.multiplier(350), 1.3);
    }

    #[test]
    fn rejects_unknown_body() {
        let classes = r#"
- id: Z
  name: Broken
  min_price: 1
  max_price: 2
  hard_cap: 3
  priority: economy
  social_class: lower
  unlock_year: 1950
  research_cost: 0
  required_body_types: [hovercraft]
"#;
        let err = Catalog::from_yaml(classes, "[]").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownBody { .. }));
    }

    #[test]
    fn rejects_inverted_price_band() {
        let classes = r#"
- { id: Z, name: Broken, min_price: 5, max_price: 2, hard_cap: 3, priority: economy, social_class: lower, unlock_year: 1950, research_cost: 0 }
"#;
        let err = Catalog::from_yaml(classes, "[]").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPriceBand(_)));
    }
}
