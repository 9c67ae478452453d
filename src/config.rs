//! Calculator configuration, loaded from an optional TOML file

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Throughput multiplier for one building category.
///
/// Either a bare multiplier or a machine description whose multiplier is
/// `base_speed * (1 + speed_modules * speed_module_bonus)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeedSetting {
    Multiplier(f64),
    Machine {
        base_speed: f64,
        #[serde(default)]
        speed_modules: u32,
    },
}

impl SpeedSetting {
    pub fn multiplier(&self, speed_module_bonus: f64) -> f64 {
        match *self {
            SpeedSetting::Multiplier(m) => m,
            SpeedSetting::Machine {
                base_speed,
                speed_modules,
            } => base_speed * (1.0 + speed_modules as f64 * speed_module_bonus),
        }
    }
}

/// Data-card recycling: junk byproduct re-formatted into a usable intermediate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JunkRecycling {
    pub enabled: bool,
    pub junk_item: String,
    pub processing_recipe: String,
    pub recovered_item: String,
}

impl Default for JunkRecycling {
    fn default() -> Self {
        Self {
            enabled: true,
            junk_item: "se-junk-data".to_string(),
            processing_recipe: "se-formatting-1".to_string(),
            recovered_item: "se-empty-data".to_string(),
        }
    }
}

/// Two-stage coolant loop whose hot stage is left as a placeholder input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoolantLoop {
    pub enabled: bool,
    pub hot_item: String,
    pub warm_recipe: String,
}

impl Default for CoolantLoop {
    fn default() -> Self {
        Self {
            enabled: true,
            hot_item: "se-space-coolant-hot".to_string(),
            warm_recipe: "se-space-coolant-warm".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target_resource: String,
    /// Items per second.
    pub target_rate: f64,
    pub forbidden_items: BTreeSet<String>,
    /// Item name -> name of the recipe that should produce it instead.
    pub alternate_keys: BTreeMap<String, String>,
    /// Recipe name -> product used as its main product.
    pub alternate_product_keys: BTreeMap<String, String>,
    /// Recipes whose ingredient edges are treated as raw inputs.
    pub recycling_skip_set: BTreeSet<String>,
    /// Insight kind (energy, material, ...) -> tier used for aliasing.
    pub insight_tiers: BTreeMap<String, u32>,
    pub speed_module_bonus: f64,
    pub category_speed: BTreeMap<Category, SpeedSetting>,
    pub category_aliases: BTreeMap<String, Category>,
    pub max_depth: usize,
    pub junk_recycling: JunkRecycling,
    pub coolant_loop: CoolantLoop,
}

fn machine(base_speed: f64, speed_modules: u32) -> SpeedSetting {
    SpeedSetting::Machine {
        base_speed,
        speed_modules,
    }
}

fn owned_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn owned_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_resource: "se-data-storage-substrate".to_string(),
            target_rate: 10.0,
            forbidden_items: owned_set(&[
                "equipment-gantry-insert",
                "equipment-gantry-remove",
                "fuel-processing",
                "se-energy-transmitter-emitter-fixed",
                "se-energy-transmitter-injector-fixed",
            ]),
            alternate_keys: owned_map(&[
                ("electronic-circuit", "electronic-circuit-stone"),
                ("petroleum-gas", "basic-oil-processing"),
                ("glass", "glass-from-sand"),
                ("sand", "sand-from-stone"),
                ("solid-fuel", "solid-fuel-from-petroleum-gas"),
                ("light-oil", "advanced-oil-processing"),
                ("heavy-oil", "oil-processing-heavy"),
                ("se-space-coolant-warm", "se-radiating-space-coolant-normal"),
                ("se-space-coolant-hot", "se-space-coolant"),
                ("se-data-storage-substrate-cleaned", "se-data-storage-substrate-cleaned-chemical"),
                ("se-holmium-plate", "se-holmium-ingot-to-plate"),
                ("se-bio-sludge", "se-bio-sludge-from-wood"),
                ("se-beryllium-plate", "se-beryllium-ingot-to-plate"),
            ]),
            alternate_product_keys: owned_map(&[("se-formatting-1", "se-empty-data")]),
            recycling_skip_set: owned_set(&[
                "se-space-coolant-hot",
                "se-vulcanite-enriched",
                "se-vitamelange-extract",
            ]),
            insight_tiers: ["energy", "biological", "astronomic", "material"]
                .iter()
                .map(|kind| (kind.to_string(), 1))
                .collect(),
            speed_module_bonus: 0.3,
            category_speed: BTreeMap::from([
                (Category::Smelting, machine(4.0, 4)),
                (Category::Crafting, machine(1.25, 4)),
                (Category::OilProcessing, machine(1.0, 3)),
                (Category::Chemistry, machine(1.0, 3)),
                (Category::SpaceCrafting, machine(1.25, 4)),
                (Category::SpaceSupercomputing, machine(1.0, 2)),
                (Category::SpaceManufacturing, machine(10.0, 6)),
                (Category::SpaceBiochemical, machine(4.0, 4)),
                (Category::SpaceRadiation, machine(1.0, 2)),
                (Category::SpaceDecontamination, machine(2.0, 4)),
                (Category::Pulverising, machine(2.0, 4)),
                (Category::Casting, machine(1.0, 2)),
                (Category::SpacePlasma, machine(1.0, 4)),
                (Category::SpaceObservation, machine(2.0, 4)),
            ]),
            category_aliases: BTreeMap::from([
                ("kiln".to_string(), Category::Smelting),
                ("core-fragment-processing".to_string(), Category::Pulverising),
            ]),
            max_depth: 64,
            junk_recycling: JunkRecycling::default(),
            coolant_loop: CoolantLoop::default(),
        }
    }
}

/// Science pack name fragment -> simulation recipe providing significant data.
const SIGNIFICANT_DATA: &[(&str, &str)] = &[
    ("energy-science-pack", "se-simulation-s"),
    ("material-science-pack", "se-simulation-m"),
    ("biological-science-pack", "se-simulation-b"),
    ("astronomic-science-pack", "se-simulation-a"),
];

impl Config {
    /// Load from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_rate.is_finite() && self.target_rate > 0.0,
            "target_rate must be positive, got {}",
            self.target_rate
        );
        ensure!(self.max_depth > 0, "max_depth must be at least 1");
        ensure!(
            self.speed_module_bonus.is_finite() && self.speed_module_bonus >= 0.0,
            "speed_module_bonus must be non-negative"
        );
        for (category, setting) in &self.category_speed {
            let multiplier = setting.multiplier(self.speed_module_bonus);
            ensure!(
                multiplier.is_finite() && multiplier > 0.0,
                "speed multiplier for {category} must be positive, got {multiplier}"
            );
        }
        Ok(())
    }

    /// Multiplier applied to a building's base throughput; 1.0 when unconfigured.
    pub fn speed_multiplier(&self, category: Category) -> f64 {
        self.category_speed
            .get(&category)
            .map_or(1.0, |setting| setting.multiplier(self.speed_module_bonus))
    }

    /// Alternate keys in effect when planning for `target`.
    ///
    /// Adds the insight tier aliases and, for science pack targets, the
    /// simulation recipe that supplies significant data.
    pub fn alternate_keys_for(&self, target: &str) -> BTreeMap<String, String> {
        let mut keys = self.alternate_keys.clone();

        for (kind, tier) in &self.insight_tiers {
            keys.insert(format!("se-{kind}-insight"), format!("se-{kind}-insight-{tier}"));
        }
        if let Some(tier) = self.insight_tiers.get("astronomic") {
            keys.insert(
                "se-astrometric-data".to_string(),
                format!("se-astrometric-analysis-multispectral-{tier}"),
            );
        }

        if let Some((_, simulation)) = SIGNIFICANT_DATA.iter().find(|(pack, _)| target.contains(pack)) {
            keys.insert("se-significant-data".to_string(), simulation.to_string());
        }

        keys
    }

    /// Placeholder input whose demand is deferred to the coolant loop pass.
    pub fn deferred_item(&self) -> Option<&str> {
        self.coolant_loop
            .enabled
            .then_some(self.coolant_loop.hot_item.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        config.validate().unwrap();
    }

    #[test]
    fn speed_settings_accept_plain_and_machine_forms() {
        let config: Config = toml::from_str(
            r#"
            speed_module_bonus = 0.5
            [category_speed]
            smelting = 2.0
            crafting = { base_speed = 0.75, speed_modules = 2 }
            "#,
        )
        .unwrap();
        assert_eq!(config.speed_multiplier(Category::Smelting), 2.0);
        assert_eq!(config.speed_multiplier(Category::Crafting), 1.5);
        assert_eq!(config.speed_multiplier(Category::Chemistry), 1.0);
    }

    #[test]
    fn default_machine_speeds() {
        let config = Config::default();
        assert!((config.speed_multiplier(Category::Smelting) - 8.8).abs() < 1e-9);
        assert!((config.speed_multiplier(Category::SpaceManufacturing) - 28.0).abs() < 1e-9);
        assert_eq!(config.speed_multiplier(Category::Nexus), 1.0);
    }

    #[test]
    fn unknown_category_in_config_is_rejected() {
        assert!(toml::from_str::<Config>("[category_speed]\nteleporting = 2.0").is_err());
        assert!(toml::from_str::<Config>("bogus_option = 1").is_err());
    }

    #[test]
    fn target_dependent_aliases() {
        let config = Config::default();
        let keys = config.alternate_keys_for("se-energy-science-pack-2");
        assert_eq!(keys["se-significant-data"], "se-simulation-s");
        assert_eq!(keys["se-energy-insight"], "se-energy-insight-1");
        assert_eq!(keys["se-astrometric-data"], "se-astrometric-analysis-multispectral-1");

        let keys = config.alternate_keys_for("se-data-storage-substrate");
        assert!(!keys.contains_key("se-significant-data"));
    }

    #[test]
    fn invalid_rate_fails_validation() {
        let config = Config {
            target_rate: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabled_coolant_loop_has_no_deferred_item() {
        let config: Config = toml::from_str("[coolant_loop]\nenabled = false").unwrap();
        assert_eq!(config.deferred_item(), None);
        assert_eq!(Config::default().deferred_item(), Some("se-space-coolant-hot"));
    }
}
