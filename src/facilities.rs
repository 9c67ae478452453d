//! Building counts derived from net recipe throughput

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::category::Category;
use crate::config::Config;
use crate::correction::EPSILON;
use crate::error::PlanError;
use crate::models::{Product, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeFacilities {
    pub building_count: u64,
    pub category: Category,
    /// Net main-product items per second.
    pub rate: f64,
}

/// Relative tolerance, in ulps, for treating a quotient as a whole number.
const ULP_SLACK: f64 = 4.0;

/// Buildings needed to sustain `rate` main products per second.
///
/// Always rounds up and never returns 0 for a positive rate. A quotient
/// within a few ulps of a whole number counts as that number, so division
/// noise such as `0.3 / 0.1` does not add a building; anything further
/// above rounds up.
pub fn building_count(recipe: &Recipe, main: &Product, rate: f64, speed_multiplier: f64) -> Result<u64, PlanError> {
    let building_items_per_second = main.amount / recipe.cycle_time;
    let effective_rate = building_items_per_second * speed_multiplier;
    if !effective_rate.is_finite() || effective_rate <= 0.0 {
        return Err(PlanError::DegenerateRecipe {
            recipe: recipe.name.clone(),
            reason: format!("a building makes {effective_rate} '{}' per second", main.name),
        });
    }

    let exact = rate / effective_rate;
    let nearest = exact.round();
    let count = if (exact - nearest).abs() <= ULP_SLACK * f64::EPSILON * nearest.max(1.0) {
        nearest
    } else {
        exact.ceil()
    };
    Ok(count.max(1.0) as u64)
}

/// Per-recipe building counts and per-category totals.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Facilities {
    pub recipes: BTreeMap<String, RecipeFacilities>,
    pub buildings_total: BTreeMap<Category, u64>,
}

/// Size every recipe with positive net throughput.
pub fn compute_facilities(
    catalog: &Catalog,
    config: &Config,
    recipes_per_second: &BTreeMap<String, f64>,
) -> Result<Facilities, PlanError> {
    let mut facilities = Facilities::default();

    for (name, &rate) in recipes_per_second {
        if rate <= EPSILON {
            continue;
        }
        let recipe = catalog
            .get(name)
            .ok_or_else(|| PlanError::UnknownRecipe(name.clone()))?;
        let main = catalog.main_product(recipe)?;
        let count = building_count(recipe, main, rate, config.speed_multiplier(recipe.category))?;

        *facilities.buildings_total.entry(recipe.category).or_default() += count;
        facilities.recipes.insert(
            name.clone(),
            RecipeFacilities {
                building_count: count,
                category: recipe.category,
                rate,
            },
        );
    }

    Ok(facilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryTable;
    use crate::models::RecipeRecord;
    use proptest::prelude::*;

    fn recipe(record: RecipeRecord) -> Recipe {
        Recipe::from_record(&record, &CategoryTable::new(&BTreeMap::new()).unwrap()).unwrap()
    }

    fn gear() -> Recipe {
        recipe(
            RecipeRecord::new("gear", "crafting", 0.5)
                .with_ingredient("iron-plate", 2.0)
                .with_product("gear", 1.0),
        )
    }

    #[test]
    fn count_rounds_up() {
        let gear = gear();
        let main = &gear.products["gear"];
        // one building makes 2 gears/s
        assert_eq!(building_count(&gear, main, 4.0, 1.0).unwrap(), 2);
        assert_eq!(building_count(&gear, main, 4.1, 1.0).unwrap(), 3);
        assert_eq!(building_count(&gear, main, 4.1, 2.0).unwrap(), 2);
        assert_eq!(building_count(&gear, main, 0.001, 1.0).unwrap(), 1);
    }

    #[test]
    fn float_noise_does_not_add_a_building() {
        let plate = recipe(RecipeRecord::new("plate", "smelting", 1.0).with_product("plate", 0.1));
        let main = &plate.products["plate"];
        assert_eq!(building_count(&plate, main, 0.3, 1.0).unwrap(), 3);
        assert_eq!(building_count(&plate, main, 0.7, 1.0).unwrap(), 7);
    }

    #[test]
    fn overshoot_past_a_whole_number_adds_a_building() {
        let gear = gear();
        let main = &gear.products["gear"];
        // 3 + 1e-10 buildings' worth
        assert_eq!(building_count(&gear, main, 6.0 + 2e-10, 1.0).unwrap(), 4);
        assert_eq!(building_count(&gear, main, 6.0 + 2e-9, 1.0).unwrap(), 4);
    }

    #[test]
    fn zero_amount_main_product_is_degenerate() {
        let broken = recipe(RecipeRecord::new("void", "crafting", 1.0).with_product("void", 0.0));
        let main = &broken.products["void"];
        assert!(matches!(
            building_count(&broken, main, 1.0, 1.0),
            Err(PlanError::DegenerateRecipe { .. })
        ));
    }

    #[test]
    fn totals_by_category_skip_netted_recipes() {
        let catalog = Catalog::from_recipes(
            [
                recipe(RecipeRecord::new("A", "crafting", 1.0).with_product("A", 1.0)),
                recipe(RecipeRecord::new("B", "crafting", 1.0).with_product("B", 1.0)),
                recipe(RecipeRecord::new("C", "smelting", 2.0).with_product("C", 1.0)),
            ],
            BTreeMap::new(),
        );
        let config = Config {
            category_speed: BTreeMap::new(),
            ..Config::default()
        };
        let rates = BTreeMap::from([
            ("A".to_string(), 3.0),
            ("B".to_string(), 1.5),
            ("C".to_string(), 0.0),
        ]);

        let facilities = compute_facilities(&catalog, &config, &rates).unwrap();
        assert_eq!(facilities.recipes["A"].building_count, 3);
        assert_eq!(facilities.recipes["B"].building_count, 2);
        assert!(!facilities.recipes.contains_key("C"));
        assert_eq!(facilities.buildings_total[&Category::Crafting], 5);
        assert!(!facilities.buildings_total.contains_key(&Category::Smelting));
    }

    proptest! {
        #[test]
        fn count_is_monotonic_and_positive(
            a in 0.001f64..500.0,
            b in 0.001f64..500.0,
            speed in 0.5f64..30.0,
        ) {
            let gear = gear();
            let main = &gear.products["gear"];
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let n_low = building_count(&gear, main, low, speed).unwrap();
            let n_high = building_count(&gear, main, high, speed).unwrap();
            prop_assert!(n_low >= 1);
            prop_assert!(n_low <= n_high);
            prop_assert!(n_high as f64 * 2.0 * speed >= high - 1e-6);
        }
    }
}
