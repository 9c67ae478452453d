//! One planning run: traverse, correct, size facilities

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::category::Category;
use crate::config::Config;
use crate::correction::{EPSILON, apply_corrections};
use crate::error::PlanError;
use crate::facilities::{RecipeFacilities, compute_facilities};
use crate::traversal::{Accumulators, Sign, Traversal};

/// Result of planning one target resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionPlan {
    pub target_resource: String,
    pub target_rate: f64,
    /// Net consumption per raw input; only positive demand is listed.
    pub raw_resources: BTreeMap<String, f64>,
    pub recipes: BTreeMap<String, RecipeFacilities>,
    pub buildings_total: BTreeMap<Category, u64>,
    pub byproducts: BTreeMap<String, f64>,
}

/// Plan `rate` items per second of `target`.
///
/// All accumulators live for this call only, so runs are independent.
pub fn run(catalog: &Catalog, config: &Config, target: &str, rate: f64) -> Result<ProductionPlan, PlanError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(PlanError::InvalidRate(rate));
    }
    let recipe = catalog
        .get(target)
        .ok_or_else(|| PlanError::UnknownTarget(target.to_string()))?;

    let traversal = Traversal::new(catalog, config);
    let mut acc = Accumulators::default();
    traversal.traverse(recipe, rate, &mut acc, 0, Sign::Forward)?;
    apply_corrections(&traversal, config, &mut acc)?;

    let facilities = compute_facilities(catalog, config, &acc.recipes_per_second)?;
    info!(
        target,
        rate,
        recipes = facilities.recipes.len(),
        raw_inputs = acc.raw_resources_per_second.len(),
        "plan complete"
    );

    let Accumulators {
        raw_resources_per_second,
        byproducts_per_second,
        ..
    } = acc;

    Ok(ProductionPlan {
        target_resource: target.to_string(),
        target_rate: rate,
        raw_resources: raw_resources_per_second
            .into_iter()
            .filter(|(_, v)| *v > EPSILON)
            .collect(),
        recipes: facilities.recipes,
        buildings_total: facilities.buildings_total,
        byproducts: byproducts_per_second,
    })
}

impl ProductionPlan {
    pub fn total_buildings(&self) -> u64 {
        self.buildings_total.values().sum()
    }
}

fn header(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "=== {title} ===")
}

impl fmt::Display for ProductionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target: {} @ {:.2}/s", self.target_resource, self.target_rate)?;
        writeln!(f)?;

        header(f, "Raw Resources")?;
        for (name, rate) in &self.raw_resources {
            writeln!(f, "  {name}: {rate:.2}")?;
        }
        writeln!(f)?;

        header(f, "Buildings Per Recipe")?;
        for (label, space) in [("Planet/Moon", false), ("Space", true)] {
            writeln!(f, "{label}:")?;
            for (name, r) in self.recipes.iter().filter(|(_, r)| r.category.is_space() == space) {
                writeln!(
                    f,
                    "  {name}: {} {}, items per second: {:.2}",
                    r.building_count, r.category, r.rate
                )?;
            }
        }
        writeln!(f)?;

        header(f, "Buildings Total")?;
        for (label, space) in [("Planet/Moon", false), ("Space", true)] {
            writeln!(f, "{label}:")?;
            for (category, count) in self.buildings_total.iter().filter(|(c, _)| c.is_space() == space) {
                writeln!(f, "  {category}: {count}")?;
            }
        }
        writeln!(f, "  total: {}", self.total_buildings())?;
        writeln!(f)?;

        header(f, "Byproducts")?;
        for (name, rate) in &self.byproducts {
            writeln!(f, "  {name}: {rate:.2}")?;
        }

        Ok(())
    }
}
