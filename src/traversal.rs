//! Recursive expansion of a recipe into per-recipe throughput, raw inputs
//! and byproducts

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::trace;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::PlanError;
use crate::models::Recipe;

/// Direction of a traversal. Backward walks subtract what forward walks add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Forward,
    Backward,
}

impl Sign {
    pub fn factor(self) -> f64 {
        match self {
            Sign::Forward => 1.0,
            Sign::Backward => -1.0,
        }
    }
}

/// Running totals for one planning run. Keys are never removed.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Accumulators {
    /// Net output per recipe, in main-product items per second.
    pub recipes_per_second: BTreeMap<String, f64>,
    /// Net consumption of inputs with no backing recipe.
    pub raw_resources_per_second: BTreeMap<String, f64>,
    /// Net production of non-main outputs.
    pub byproducts_per_second: BTreeMap<String, f64>,
    /// Demand for placeholder inputs settled by a correction pass.
    pub deferred_per_second: BTreeMap<String, f64>,
}

fn accumulate(map: &mut BTreeMap<String, f64>, key: &str, delta: f64) {
    *map.entry(key.to_string()).or_default() += delta;
}

impl Accumulators {
    pub fn recipe_rate(&self, name: &str) -> f64 {
        self.recipes_per_second.get(name).copied().unwrap_or(0.0)
    }

    #[cfg(test)]
    pub fn raw_rate(&self, name: &str) -> f64 {
        self.raw_resources_per_second.get(name).copied().unwrap_or(0.0)
    }

    pub fn byproduct_rate(&self, name: &str) -> f64 {
        self.byproducts_per_second.get(name).copied().unwrap_or(0.0)
    }
}

/// Walks recipe trees against a fixed catalog and rule set.
#[derive(Debug, Clone, Copy)]
pub struct Traversal<'a> {
    catalog: &'a Catalog,
    recycling_skip_set: &'a BTreeSet<String>,
    deferred_item: Option<&'a str>,
    max_depth: usize,
}

impl<'a> Traversal<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a Config) -> Self {
        Self {
            catalog,
            recycling_skip_set: &config.recycling_skip_set,
            deferred_item: config.deferred_item(),
            max_depth: config.max_depth,
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Add (or with [`Sign::Backward`], subtract) the requirements of
    /// producing `rate` main products per second of `recipe`.
    pub fn traverse(
        &self,
        recipe: &Recipe,
        rate: f64,
        acc: &mut Accumulators,
        depth: usize,
        sign: Sign,
    ) -> Result<(), PlanError> {
        if depth > self.max_depth {
            return Err(PlanError::GraphCycle {
                recipe: recipe.name.clone(),
                depth,
            });
        }
        trace!(depth, rate, "{}{}", " ".repeat(depth * 3), recipe.name);

        let main = self.catalog.main_product(recipe)?;
        let unit_yield = main.expected_yield();
        if unit_yield <= 0.0 {
            return Err(PlanError::DegenerateRecipe {
                recipe: recipe.name.clone(),
                reason: format!(
                    "main product '{}' yields {} x {} per craft",
                    main.name, main.amount, main.probability
                ),
            });
        }
        let factor = sign.factor();

        accumulate(&mut acc.recipes_per_second, &recipe.name, factor * rate);

        for product in recipe.products.values().filter(|p| p.name != main.name) {
            accumulate(
                &mut acc.byproducts_per_second,
                &product.name,
                factor * rate * product.expected_yield() / unit_yield,
            );
        }

        for ingredient in &recipe.ingredients {
            let ingredient_rate = ingredient.amount * rate / unit_yield;

            match self.catalog.get(&ingredient.name) {
                Some(sub) if !self.recycling_skip_set.contains(&sub.name) => {
                    self.traverse(sub, ingredient_rate, acc, depth + 1, sign)?;
                }
                _ if self.deferred_item == Some(ingredient.name.as_str()) => {
                    acc.raw_resources_per_second
                        .entry(ingredient.name.clone())
                        .or_insert(0.0);
                    accumulate(&mut acc.deferred_per_second, &ingredient.name, factor * ingredient_rate);
                }
                _ => accumulate(
                    &mut acc.raw_resources_per_second,
                    &ingredient.name,
                    factor * ingredient_rate,
                ),
            }
        }

        Ok(())
    }
}
