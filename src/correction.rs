//! Correction passes run after the initial traversal
//!
//! Recycling loops are not followed by the traversal. Instead each known loop
//! is netted out here with signed traversals over the same accumulators.
//! Coolant must run last since recycling recipes consume coolant too.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PlanError;
use crate::traversal::{Accumulators, Sign, Traversal};

/// Rates below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Run every enabled correction pass in order.
pub fn apply_corrections(traversal: &Traversal<'_>, config: &Config, acc: &mut Accumulators) -> Result<(), PlanError> {
    if config.junk_recycling.enabled {
        recycle_junk(traversal, config, acc)?;
    }
    reconcile_byproducts(traversal, acc)?;
    if config.coolant_loop.enabled {
        close_coolant_loop(traversal, config, acc)?;
    }
    Ok(())
}

/// Junk cards are re-formatted into blank cards, so that much of the blank
/// card demand was counted twice.
fn recycle_junk(traversal: &Traversal<'_>, config: &Config, acc: &mut Accumulators) -> Result<(), PlanError> {
    let rules = &config.junk_recycling;
    let junk_rate = acc.byproduct_rate(&rules.junk_item);
    if junk_rate <= EPSILON {
        return Ok(());
    }

    let catalog = traversal.catalog();
    let processing = catalog
        .get(&rules.processing_recipe)
        .ok_or_else(|| PlanError::UnknownRecipe(rules.processing_recipe.clone()))?;
    let recovered = processing
        .products
        .get(&rules.recovered_item)
        .ok_or_else(|| PlanError::RecipeResolution {
            recipe: processing.name.clone(),
        })?;
    let recovered_recipe = catalog
        .get(&rules.recovered_item)
        .ok_or_else(|| PlanError::UnknownRecipe(rules.recovered_item.clone()))?;

    let recovered_rate = junk_rate * recovered.probability;
    info!(
        junk = %rules.junk_item,
        junk_rate,
        recovered_rate,
        "recycling junk into {}", rules.recovered_item
    );

    traversal.traverse(recovered_recipe, recovered_rate, acc, 0, Sign::Backward)?;
    acc.recipes_per_second
        .insert(rules.processing_recipe.clone(), junk_rate);
    Ok(())
}

/// Anything produced as a byproduct and also crafted on purpose is crafted
/// that much less.
fn reconcile_byproducts(traversal: &Traversal<'_>, acc: &mut Accumulators) -> Result<(), PlanError> {
    let names: Vec<String> = acc.byproducts_per_second.keys().cloned().collect();

    for name in names {
        if !acc.recipes_per_second.contains_key(&name) {
            continue;
        }
        let rate = acc.byproduct_rate(&name);
        if rate <= EPSILON {
            continue;
        }
        let Some(recipe) = traversal.catalog().get(&name) else {
            debug!(item = %name, "byproduct matches a recipe outside the catalog");
            continue;
        };

        info!(item = %name, rate, "netting byproduct against its own recipe");
        traversal.traverse(recipe, rate, acc, 0, Sign::Backward)?;
    }
    Ok(())
}

/// Hot coolant demand not covered by the warm stage is supplied by running
/// the hot stage for the shortage.
fn close_coolant_loop(traversal: &Traversal<'_>, config: &Config, acc: &mut Accumulators) -> Result<(), PlanError> {
    let rules = &config.coolant_loop;
    let demand = acc
        .deferred_per_second
        .get(&rules.hot_item)
        .copied()
        .unwrap_or(0.0);
    if demand <= EPSILON {
        return Ok(());
    }

    let shortage = demand - acc.recipe_rate(&rules.warm_recipe);
    if shortage <= EPSILON {
        debug!(demand, "coolant loop already balanced");
        return Ok(());
    }

    let Some(hot) = traversal.catalog().get(&rules.hot_item) else {
        warn!(shortage, "no recipe for {}, counting it as a raw input", rules.hot_item);
        *acc.raw_resources_per_second
            .entry(rules.hot_item.clone())
            .or_default() += shortage;
        return Ok(());
    };
    info!(demand, shortage, "supplying {} shortage", rules.hot_item);
    traversal.traverse(hot, shortage, acc, 0, Sign::Forward)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::catalog::Catalog;
    use crate::category::CategoryTable;
    use crate::models::{Recipe, RecipeRecord};

    fn catalog_of(records: &[RecipeRecord], alternate_products: &[(&str, &str)]) -> Catalog {
        let table = CategoryTable::new(&BTreeMap::new()).unwrap();
        Catalog::from_recipes(
            records.iter().map(|r| Recipe::from_record(r, &table).unwrap()),
            alternate_products
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn plan(catalog: &Catalog, config: &Config, target: &str, rate: f64) -> Accumulators {
        let traversal = Traversal::new(catalog, config);
        let mut acc = Accumulators::default();
        traversal
            .traverse(catalog.get(target).unwrap(), rate, &mut acc, 0, Sign::Forward)
            .unwrap();
        apply_corrections(&traversal, config, &mut acc).unwrap();
        acc
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn junk_cards_offset_blank_card_demand() {
        let catalog = catalog_of(
            &[
                RecipeRecord::new("card", "space-supercomputing", 10.0)
                    .with_ingredient("se-empty-data", 1.0)
                    .with_product("card", 1.0)
                    .with_product_chance("se-junk-data", 1.0, 0.5),
                RecipeRecord::new("se-empty-data", "space-crafting", 1.0)
                    .with_ingredient("plastic-bar", 1.0)
                    .with_product("se-empty-data", 1.0),
                RecipeRecord::new("se-formatting-1", "space-supercomputing", 2.0)
                    .with_ingredient("se-junk-data", 1.0)
                    .with_product_chance("se-empty-data", 1.0, 0.8),
            ],
            &[("se-formatting-1", "se-empty-data")],
        );

        let acc = plan(&catalog, &Config::default(), "card", 10.0);
        assert_close(acc.byproduct_rate("se-junk-data"), 5.0);
        assert_close(acc.recipe_rate("se-empty-data"), 6.0);
        assert_close(acc.raw_rate("plastic-bar"), 6.0);
        assert_close(acc.recipe_rate("se-formatting-1"), 5.0);
    }

    #[test]
    fn byproduct_that_is_also_crafted_is_netted() {
        let catalog = catalog_of(
            &[
                RecipeRecord::new("T", "crafting", 1.0)
                    .with_ingredient("X", 1.0)
                    .with_ingredient("Y", 1.0)
                    .with_product("T", 1.0),
                RecipeRecord::new("X", "chemistry", 1.0)
                    .with_ingredient("ore", 1.0)
                    .with_product("X", 1.0)
                    .with_product_chance("Y", 1.0, 0.5),
                RecipeRecord::new("Y", "smelting", 1.0)
                    .with_ingredient("coal", 1.0)
                    .with_product("Y", 1.0),
            ],
            &[],
        );

        let acc = plan(&catalog, &Config::default(), "T", 2.0);
        assert_close(acc.recipe_rate("X"), 2.0);
        assert_close(acc.recipe_rate("Y"), 1.0);
        assert_close(acc.raw_rate("coal"), 1.0);
        assert_close(acc.raw_rate("ore"), 2.0);
        assert_close(acc.byproduct_rate("Y"), 1.0);
    }

    fn coolant_records(warm_direct: Option<f64>) -> Vec<RecipeRecord> {
        let mut target = RecipeRecord::new("A", "space-thermodynamics", 1.0)
            .with_fluid_ingredient("se-space-coolant-hot", 10.0)
            .with_product("A", 1.0);
        if let Some(amount) = warm_direct {
            target = target.with_fluid_ingredient("se-space-coolant-warm", amount);
        }
        vec![
            target,
            RecipeRecord::new("se-space-coolant-hot", "space-thermodynamics", 10.0)
                .with_fluid_ingredient("se-space-coolant-warm", 1.0)
                .with_product("se-space-coolant-hot", 1.0),
            RecipeRecord::new("se-space-coolant-warm", "space-radiator", 10.0)
                .with_fluid_ingredient("se-space-coolant-hot", 1.0)
                .with_product("se-space-coolant-warm", 1.0),
        ]
    }

    #[test]
    fn coolant_shortage_runs_hot_stage() {
        let catalog = catalog_of(&coolant_records(None), &[]);
        let acc = plan(&catalog, &Config::default(), "A", 1.0);
        assert_close(acc.recipe_rate("se-space-coolant-hot"), 10.0);
        assert_close(acc.recipe_rate("se-space-coolant-warm"), 10.0);
        assert_close(acc.raw_rate("se-space-coolant-hot"), 0.0);
    }

    #[test]
    fn coolant_shortage_discounts_warm_stage() {
        let catalog = catalog_of(&coolant_records(Some(4.0)), &[]);
        let acc = plan(&catalog, &Config::default(), "A", 1.0);
        // demand 10 direct + 4 via the warm stage, minus 4 warm already running
        assert_close(acc.recipe_rate("se-space-coolant-hot"), 10.0);
        assert_close(acc.recipe_rate("se-space-coolant-warm"), 14.0);
    }

    #[test]
    fn coolant_loop_without_skip_hits_depth_guard() {
        let catalog = catalog_of(&coolant_records(None), &[]);
        let mut config = Config::default();
        config.coolant_loop.enabled = false;
        config.recycling_skip_set.clear();
        config.max_depth = 8;

        let traversal = Traversal::new(&catalog, &config);
        let mut acc = Accumulators::default();
        let err = traversal
            .traverse(catalog.get("A").unwrap(), 1.0, &mut acc, 0, Sign::Forward)
            .unwrap_err();
        assert!(matches!(err, PlanError::GraphCycle { .. }));
    }

    #[test]
    fn missing_hot_stage_falls_back_to_raw() {
        let records = coolant_records(None);
        let catalog = catalog_of(&[records[0].clone()], &[]);
        let acc = plan(&catalog, &Config::default(), "A", 2.0);
        assert_close(acc.raw_rate("se-space-coolant-hot"), 20.0);
    }

    #[test]
    fn missing_processing_recipe_is_reported() {
        let catalog = catalog_of(
            &[RecipeRecord::new("card", "space-supercomputing", 10.0)
                .with_ingredient("chip", 1.0)
                .with_product("card", 1.0)
                .with_product_chance("se-junk-data", 1.0, 0.5)],
            &[],
        );
        let config = Config::default();
        let traversal = Traversal::new(&catalog, &config);
        let mut acc = Accumulators::default();
        traversal
            .traverse(catalog.get("card").unwrap(), 1.0, &mut acc, 0, Sign::Forward)
            .unwrap();
        let err = apply_corrections(&traversal, &config, &mut acc).unwrap_err();
        assert!(matches!(err, PlanError::UnknownRecipe(ref name) if name == "se-formatting-1"));
    }
}
