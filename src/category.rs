//! Building categories and the raw-category classification table

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Canonical production-building category a recipe runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Category {
    Crafting,
    SpaceCrafting,
    Smelting,
    Chemistry,
    OilProcessing,
    FuelRefining,
    EquipmentChange,
    Centrifuging,
    SpaceManufacturing,
    RocketBuilding,
    SpaceCollider,
    SpaceMaterialisation,
    Arcosphere,
    SpaceAstrometrics,
    SpaceSupercomputing,
    SpaceMechanical,
    SpaceThermodynamics,
    SpaceBiochemical,
    SpaceGenetics,
    SpaceElectromagnetics,
    HardRecycling,
    SpaceGrowth,
    SpaceGravimetrics,
    SpaceDecontamination,
    DeliveryCannon,
    DeliveryCannonWeapon,
    Nexus,
    LifeSupport,
    SpaceLaser,
    SpaceAccelerator,
    SpaceObservation,
    SpacePlasma,
    Pulverising,
    SpaceRadiation,
    SpaceElevator,
    BigTurbine,
    SpaceshipAntimatterEngine,
    SpaceshipIonEngine,
    SpaceshipRocketEngine,
    CondenserTurbine,
    Melting,
    Casting,
    ElectricBoiling,
    SpaceRadiator,
    SpaceHypercooling,
}

impl Category {
    pub const ALL: [Category; 45] = [
        Category::Crafting,
        Category::SpaceCrafting,
        Category::Smelting,
        Category::Chemistry,
        Category::OilProcessing,
        Category::FuelRefining,
        Category::EquipmentChange,
        Category::Centrifuging,
        Category::SpaceManufacturing,
        Category::RocketBuilding,
        Category::SpaceCollider,
        Category::SpaceMaterialisation,
        Category::Arcosphere,
        Category::SpaceAstrometrics,
        Category::SpaceSupercomputing,
        Category::SpaceMechanical,
        Category::SpaceThermodynamics,
        Category::SpaceBiochemical,
        Category::SpaceGenetics,
        Category::SpaceElectromagnetics,
        Category::HardRecycling,
        Category::SpaceGrowth,
        Category::SpaceGravimetrics,
        Category::SpaceDecontamination,
        Category::DeliveryCannon,
        Category::DeliveryCannonWeapon,
        Category::Nexus,
        Category::LifeSupport,
        Category::SpaceLaser,
        Category::SpaceAccelerator,
        Category::SpaceObservation,
        Category::SpacePlasma,
        Category::Pulverising,
        Category::SpaceRadiation,
        Category::SpaceElevator,
        Category::BigTurbine,
        Category::SpaceshipAntimatterEngine,
        Category::SpaceshipIonEngine,
        Category::SpaceshipRocketEngine,
        Category::CondenserTurbine,
        Category::Melting,
        Category::Casting,
        Category::ElectricBoiling,
        Category::SpaceRadiator,
        Category::SpaceHypercooling,
    ];

    /// The tag used for this category in recipe data and config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Crafting => "crafting",
            Category::SpaceCrafting => "space-crafting",
            Category::Smelting => "smelting",
            Category::Chemistry => "chemistry",
            Category::OilProcessing => "oil-processing",
            Category::FuelRefining => "fuel-refining",
            Category::EquipmentChange => "equipment-change",
            Category::Centrifuging => "centrifuging",
            Category::SpaceManufacturing => "space-manufacturing",
            Category::RocketBuilding => "rocket-building",
            Category::SpaceCollider => "space-collider",
            Category::SpaceMaterialisation => "space-materialisation",
            Category::Arcosphere => "arcosphere",
            Category::SpaceAstrometrics => "space-astrometrics",
            Category::SpaceSupercomputing => "space-supercomputing",
            Category::SpaceMechanical => "space-mechanical",
            Category::SpaceThermodynamics => "space-thermodynamics",
            Category::SpaceBiochemical => "space-biochemical",
            Category::SpaceGenetics => "space-genetics",
            Category::SpaceElectromagnetics => "space-electromagnetics",
            Category::HardRecycling => "hard-recycling",
            Category::SpaceGrowth => "space-growth",
            Category::SpaceGravimetrics => "space-gravimetrics",
            Category::SpaceDecontamination => "space-decontamination",
            Category::DeliveryCannon => "delivery-cannon",
            Category::DeliveryCannonWeapon => "delivery-cannon-weapon",
            Category::Nexus => "nexus",
            Category::LifeSupport => "lifesupport",
            Category::SpaceLaser => "space-laser",
            Category::SpaceAccelerator => "space-accelerator",
            Category::SpaceObservation => "space-observation",
            Category::SpacePlasma => "space-plasma",
            Category::Pulverising => "pulverising",
            Category::SpaceRadiation => "space-radiation",
            Category::SpaceElevator => "space-elevator",
            Category::BigTurbine => "big-turbine",
            Category::SpaceshipAntimatterEngine => "spaceship-antimatter-engine",
            Category::SpaceshipIonEngine => "spaceship-ion-engine",
            Category::SpaceshipRocketEngine => "spaceship-rocket-engine",
            Category::CondenserTurbine => "condenser-turbine",
            Category::Melting => "melting",
            Category::Casting => "casting",
            Category::ElectricBoiling => "se-electric-boiling",
            Category::SpaceRadiator => "space-radiator",
            Category::SpaceHypercooling => "space-hypercooling",
        }
    }

    /// Whether buildings of this category can only be placed in orbit.
    pub fn is_space(self) -> bool {
        self.as_str().starts_with("space")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a tag that is not one of the canonical category names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown building category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for &'static str {
    fn from(category: Category) -> Self {
        category.as_str()
    }
}

/// A regex family rule, e.g. every `*-crafting*` variant maps to crafting.
#[derive(Debug)]
struct FamilyRule {
    pattern: Regex,
    category: Category,
    /// Raw names containing this marker never match the rule.
    excluding: Option<&'static str>,
}

const FAMILY_RULES: &[(&str, Category, Option<&str>)] = &[
    (r"^space-supercomputing-\d+$", Category::SpaceSupercomputing, None),
    (r"^space-observation(?:-[a-z0-9]+)+$", Category::SpaceObservation, None),
    (r"^(?:[a-z0-9]+-)*crafting(?:-[a-z0-9]+)*$", Category::Crafting, Some("space")),
];

/// Maps raw category strings from recipe data onto [`Category`].
///
/// Lookup order is exact canonical name, then configured aliases, then the
/// regex family rules. Anything left over is rejected.
#[derive(Debug)]
pub struct CategoryTable {
    aliases: BTreeMap<String, Category>,
    rules: Vec<FamilyRule>,
}

impl CategoryTable {
    pub fn new(aliases: &BTreeMap<String, Category>) -> Result<Self, CatalogError> {
        let mut rules = Vec::with_capacity(FAMILY_RULES.len());
        for &(pattern, category, excluding) in FAMILY_RULES {
            rules.push(FamilyRule {
                pattern: Regex::new(pattern)?,
                category,
                excluding,
            });
        }

        Ok(Self {
            aliases: aliases.clone(),
            rules,
        })
    }

    /// Classify a raw category string, or `None` if nothing maps it.
    pub fn classify(&self, raw: &str) -> Option<Category> {
        if let Ok(category) = raw.parse::<Category>() {
            return Some(category);
        }
        if let Some(&category) = self.aliases.get(raw) {
            return Some(category);
        }

        self.rules
            .iter()
            .find(|rule| {
                rule.pattern.is_match(raw) && rule.excluding.is_none_or(|marker| !raw.contains(marker))
            })
            .map(|rule| rule.category)
    }

    /// Like [`CategoryTable::classify`], but attributes failures to a recipe.
    pub fn resolve(&self, recipe: &str, raw: &str) -> Result<Category, CatalogError> {
        self.classify(raw).ok_or_else(|| CatalogError::UnknownCategory {
            recipe: recipe.to_string(),
            raw: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        let aliases = BTreeMap::from([
            ("kiln".to_string(), Category::Smelting),
            ("core-fragment-processing".to_string(), Category::Pulverising),
        ]);
        CategoryTable::new(&aliases).unwrap()
    }

    #[test]
    fn canonical_tags_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn exact_names_and_aliases() {
        let table = table();
        assert_eq!(table.classify("smelting"), Some(Category::Smelting));
        assert_eq!(table.classify("kiln"), Some(Category::Smelting));
        assert_eq!(table.classify("core-fragment-processing"), Some(Category::Pulverising));
        assert_eq!(table.classify("space-crafting"), Some(Category::SpaceCrafting));
    }

    #[test]
    fn crafting_family_excludes_space_variants() {
        let table = table();
        assert_eq!(table.classify("advanced-crafting"), Some(Category::Crafting));
        assert_eq!(table.classify("crafting-with-fluid"), Some(Category::Crafting));
        assert_eq!(table.classify("space-crafting-extra"), None);
    }

    #[test]
    fn numbered_space_families() {
        let table = table();
        assert_eq!(table.classify("space-supercomputing-3"), Some(Category::SpaceSupercomputing));
        assert_eq!(table.classify("space-observation-gammaray"), Some(Category::SpaceObservation));
    }

    #[test]
    fn unmapped_category_is_an_error() {
        let err = table().resolve("widget", "teleporting").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCategory { ref raw, .. } if raw == "teleporting"));
    }

    #[test]
    fn space_grouping() {
        assert!(Category::SpaceRadiation.is_space());
        assert!(Category::SpaceshipIonEngine.is_space());
        assert!(!Category::Smelting.is_space());
    }
}
