//! Data models for recipes, ingredients and products
//!
//! `*Record` types are the raw shapes as found in recipe dumps and in the
//! database. [`Recipe::from_record`] validates a record into the typed
//! entities the traversal works on.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::category::{Category, CategoryTable};
use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub amount_min: Option<f64>,
    #[serde(default)]
    pub amount_max: Option<f64>,
}

/// A recipe as exported by a recipe dumper, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Filled from the dump key when absent.
    #[serde(default)]
    pub name: String,
    pub category: String,
    #[serde(deserialize_with = "products_map_or_list")]
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub ingredients: Vec<IngredientRecord>,
    /// Seconds per craft cycle.
    #[serde(alias = "spid", alias = "cycle_time")]
    pub energy: f64,
    /// Name of the main product; dumps may write the whole product object.
    #[serde(
        default,
        deserialize_with = "main_product_name_or_object",
        skip_serializing_if = "Option::is_none"
    )]
    pub main_product: Option<String>,
}

fn default_kind() -> String {
    "item".to_string()
}

fn default_probability() -> f64 {
    1.0
}

/// Dumpers disagree on whether products are a list or a map keyed by name.
fn products_map_or_list<'de, D>(deserializer: D) -> Result<Vec<ProductRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(BTreeMap<String, ProductRecord>),
        List(Vec<ProductRecord>),
    }

    Ok(match Shape::deserialize(deserializer)? {
        Shape::Map(map) => map.into_values().collect(),
        Shape::List(list) => list,
    })
}

fn main_product_name_or_object<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Name(String),
        Product(ProductRecord),
    }

    Ok(Option::<Shape>::deserialize(deserializer)?.map(|shape| match shape {
        Shape::Name(name) => name,
        Shape::Product(product) => product.name,
    }))
}

impl RecipeRecord {
    pub fn new(name: impl Into<String>, category: impl Into<String>, energy: f64) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            products: Vec::new(),
            ingredients: Vec::new(),
            energy,
            main_product: None,
        }
    }

    pub fn with_ingredient(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.ingredients.push(IngredientRecord {
            name: name.into(),
            kind: default_kind(),
            amount: Some(amount),
        });
        self
    }

    pub fn with_fluid_ingredient(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.ingredients.push(IngredientRecord {
            name: name.into(),
            kind: "fluid".to_string(),
            amount: Some(amount),
        });
        self
    }

    pub fn with_product(self, name: impl Into<String>, amount: f64) -> Self {
        self.with_product_chance(name, amount, 1.0)
    }

    pub fn with_product_chance(mut self, name: impl Into<String>, amount: f64, probability: f64) -> Self {
        self.products.push(ProductRecord {
            name: name.into(),
            kind: default_kind(),
            amount: Some(amount),
            probability,
            amount_min: None,
            amount_max: None,
        });
        self
    }

    #[cfg(test)]
    pub fn with_product_range(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.products.push(ProductRecord {
            name: name.into(),
            kind: default_kind(),
            amount: None,
            probability: 1.0,
            amount_min: Some(min),
            amount_max: Some(max),
        });
        self
    }

    pub fn with_main_product(mut self, name: impl Into<String>) -> Self {
        self.main_product = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Item,
    Fluid,
}

impl ItemKind {
    fn parse(recipe: &str, item: &str, kind: &str) -> Result<Self, CatalogError> {
        match kind {
            "item" => Ok(ItemKind::Item),
            "fluid" => Ok(ItemKind::Fluid),
            other => Err(CatalogError::UnknownItemKind {
                recipe: recipe.to_string(),
                item: item.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub kind: ItemKind,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub name: String,
    pub kind: ItemKind,
    /// Expected amount per craft; the midpoint for ranged products.
    pub amount: f64,
    pub probability: f64,
}

impl Product {
    /// Expected quantity per craft cycle (amount x probability).
    pub fn expected_yield(&self) -> f64 {
        self.amount * self.probability
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub category: Category,
    pub products: BTreeMap<String, Product>,
    pub ingredients: Vec<Ingredient>,
    /// Seconds per craft cycle.
    pub cycle_time: f64,
    /// Explicit main product, overriding the name match.
    pub main_product: Option<String>,
}

impl Recipe {
    /// Validate a raw record, rejecting anything the traversal could not use.
    pub fn from_record(record: &RecipeRecord, categories: &CategoryTable) -> Result<Self, CatalogError> {
        let recipe = record.name.as_str();
        let invalid = |detail: String| CatalogError::InvalidRecord {
            recipe: recipe.to_string(),
            detail,
        };

        if !record.energy.is_finite() || record.energy <= 0.0 {
            return Err(CatalogError::DegenerateRecipe {
                recipe: recipe.to_string(),
                reason: format!("cycle time {} is not positive", record.energy),
            });
        }
        if record.products.is_empty() {
            return Err(invalid("recipe has no products".to_string()));
        }

        let category = categories.resolve(recipe, &record.category)?;

        let mut products = BTreeMap::new();
        for raw in &record.products {
            let amount = match (raw.amount_min, raw.amount_max) {
                (Some(min), Some(max)) if max < min => {
                    return Err(invalid(format!(
                        "product '{}' has amount_max {} below amount_min {}",
                        raw.name, max, min
                    )));
                }
                (Some(min), Some(max)) => min + (max - min) / 2.0,
                (None, None) => raw.amount.ok_or_else(|| CatalogError::MissingAmount {
                    recipe: recipe.to_string(),
                    entry: "product",
                    item: raw.name.clone(),
                })?,
                _ => {
                    return Err(invalid(format!(
                        "product '{}' has only one of amount_min/amount_max",
                        raw.name
                    )));
                }
            };
            if !amount.is_finite() || amount < 0.0 {
                return Err(invalid(format!("product '{}' has amount {}", raw.name, amount)));
            }
            if !(0.0..=1.0).contains(&raw.probability) {
                return Err(invalid(format!(
                    "product '{}' has probability {} outside [0, 1]",
                    raw.name, raw.probability
                )));
            }

            let product = Product {
                name: raw.name.clone(),
                kind: ItemKind::parse(recipe, &raw.name, &raw.kind)?,
                amount,
                probability: raw.probability,
            };
            if products.insert(raw.name.clone(), product).is_some() {
                return Err(invalid(format!("product '{}' listed twice", raw.name)));
            }
        }

        let mut ingredients = Vec::with_capacity(record.ingredients.len());
        for raw in &record.ingredients {
            let amount = raw.amount.ok_or_else(|| CatalogError::MissingAmount {
                recipe: recipe.to_string(),
                entry: "ingredient",
                item: raw.name.clone(),
            })?;
            if !amount.is_finite() || amount < 0.0 {
                return Err(invalid(format!("ingredient '{}' has amount {}", raw.name, amount)));
            }
            ingredients.push(Ingredient {
                name: raw.name.clone(),
                kind: ItemKind::parse(recipe, &raw.name, &raw.kind)?,
                amount,
            });
        }

        if let Some(main) = &record.main_product {
            if !products.contains_key(main) {
                return Err(invalid(format!("main product '{main}' is not among its products")));
            }
        }

        Ok(Self {
            name: record.name.clone(),
            category,
            products,
            ingredients,
            cycle_time: record.energy,
            main_product: record.main_product.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        CategoryTable::new(&BTreeMap::new()).unwrap()
    }

    #[test]
    fn ranged_product_uses_expected_value() {
        let record = RecipeRecord::new("se-core-fragment", "smelting", 2.0).with_product_range("se-core-fragment", 1.0, 4.0);
        let recipe = Recipe::from_record(&record, &table()).unwrap();
        assert_eq!(recipe.products["se-core-fragment"].amount, 2.5);
    }

    #[test]
    fn products_parse_from_map_or_list() {
        let as_map = r#"{
            "category": "smelting", "energy": 3.2,
            "products": {"iron-plate": {"name": "iron-plate", "type": "item", "amount": 1, "probability": 1}},
            "ingredients": [{"name": "iron-ore", "type": "item", "amount": 1}]
        }"#;
        let as_list = r#"{
            "category": "smelting", "spid": 3.2,
            "products": [{"name": "iron-plate", "type": "item", "amount": 1}],
            "ingredients": [{"name": "iron-ore", "type": "item", "amount": 1}]
        }"#;
        let a: RecipeRecord = serde_json::from_str(as_map).unwrap();
        let b: RecipeRecord = serde_json::from_str(as_list).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.products[0].probability, 1.0);
    }

    #[test]
    fn missing_ingredient_amount_is_rejected() {
        let mut record = RecipeRecord::new("gear", "crafting", 0.5).with_product("gear", 1.0);
        record.ingredients.push(IngredientRecord {
            name: "iron-plate".to_string(),
            kind: "item".to_string(),
            amount: None,
        });
        let err = Recipe::from_record(&record, &table()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingAmount { entry: "ingredient", .. }));
    }

    #[test]
    fn zero_cycle_time_is_degenerate() {
        let record = RecipeRecord::new("gear", "crafting", 0.0).with_product("gear", 1.0);
        let err = Recipe::from_record(&record, &table()).unwrap_err();
        assert!(matches!(err, CatalogError::DegenerateRecipe { .. }));
    }

    #[test]
    fn half_open_range_and_bad_probability_are_rejected() {
        let mut record = RecipeRecord::new("ore", "pulverising", 1.0).with_product("ore", 1.0);
        record.products[0].amount_min = Some(1.0);
        assert!(matches!(
            Recipe::from_record(&record, &table()),
            Err(CatalogError::InvalidRecord { .. })
        ));

        let record = RecipeRecord::new("ore", "pulverising", 1.0).with_product_chance("ore", 1.0, 1.5);
        assert!(matches!(
            Recipe::from_record(&record, &table()),
            Err(CatalogError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        let mut record = RecipeRecord::new("gear", "crafting", 0.5).with_product("gear", 1.0);
        record.products[0].kind = "virtual".to_string();
        assert!(matches!(
            Recipe::from_record(&record, &table()),
            Err(CatalogError::UnknownItemKind { .. })
        ));
    }

    #[test]
    fn explicit_main_product_must_exist() {
        let record = RecipeRecord::new("basic-oil-processing", "oil-processing", 5.0)
            .with_product("petroleum-gas", 45.0)
            .with_main_product("heavy-oil");
        assert!(Recipe::from_record(&record, &table()).is_err());
    }
}
