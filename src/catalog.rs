//! The recipe catalog: validated recipes keyed by the item they produce

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, info, warn};

use crate::category::CategoryTable;
use crate::config::Config;
use crate::error::{CatalogError, PlanError};
use crate::models::{Product, Recipe, RecipeRecord};

/// Category tag of non-craftable entries in recipe dumps.
const FIXED_RECIPE: &str = "fixed-recipe";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub loaded: usize,
    pub forbidden: usize,
    pub fixed: usize,
    pub aliased: usize,
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Catalog: {} recipes ({} aliased). Skipped: {} forbidden, {} fixed",
            self.loaded, self.aliased, self.forbidden, self.fixed
        )
    }
}

/// Read-only mapping from item name to the recipe that produces it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    recipes: HashMap<String, Recipe>,
    alternate_products: BTreeMap<String, String>,
}

impl Catalog {
    /// Build the catalog for planning `target` from raw records.
    ///
    /// Alternate keys are applied first: the preferred recipe's body is moved
    /// under the aliased item name. Forbidden names and fixed recipes are then
    /// dropped and every remaining record is validated.
    pub fn build(records: Vec<RecipeRecord>, config: &Config, target: &str) -> Result<(Self, CatalogStats), CatalogError> {
        let categories = CategoryTable::new(&config.category_aliases)?;
        let mut stats = CatalogStats::default();

        let mut raw: BTreeMap<String, RecipeRecord> =
            records.into_iter().map(|record| (record.name.clone(), record)).collect();

        for (key, preferred) in config.alternate_keys_for(target) {
            match raw.remove(&preferred) {
                Some(mut record) => {
                    debug!(item = %key, recipe = %preferred, "using alternate recipe");
                    record.name = key.clone();
                    raw.insert(key, record);
                    stats.aliased += 1;
                }
                None => warn!(item = %key, recipe = %preferred, "alternate recipe not in data, keeping default"),
            }
        }

        let mut recipes = HashMap::with_capacity(raw.len());
        for (name, record) in raw {
            if config.forbidden_items.contains(&name) {
                stats.forbidden += 1;
                continue;
            }
            if record.category == FIXED_RECIPE {
                stats.fixed += 1;
                continue;
            }
            recipes.insert(name, Recipe::from_record(&record, &categories)?);
        }
        stats.loaded = recipes.len();
        info!("{stats}");

        Ok((
            Self {
                recipes,
                alternate_products: config.alternate_product_keys.clone(),
            },
            stats,
        ))
    }

    /// Assemble a catalog from already validated recipes.
    #[cfg(test)]
    pub fn from_recipes(
        recipes: impl IntoIterator<Item = Recipe>,
        alternate_products: BTreeMap<String, String>,
    ) -> Self {
        Self {
            recipes: recipes.into_iter().map(|r| (r.name.clone(), r)).collect(),
            alternate_products,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Resolve the product a recipe's throughput is measured in.
    ///
    /// Tries the recipe's explicit main product, then the product named like
    /// the recipe, then the configured alternate product key.
    pub fn main_product<'r>(&self, recipe: &'r Recipe) -> Result<&'r Product, PlanError> {
        recipe
            .main_product
            .as_ref()
            .and_then(|name| recipe.products.get(name))
            .or_else(|| recipe.products.get(&recipe.name))
            .or_else(|| {
                self.alternate_products
                    .get(&recipe.name)
                    .and_then(|name| recipe.products.get(name))
            })
            .ok_or_else(|| PlanError::RecipeResolution {
                recipe: recipe.name.clone(),
            })
    }
}
