//! Database schema and operations

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;

use crate::models::{IngredientRecord, ProductRecord, RecipeRecord};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Raw recipe records, validated only when a catalog is built
        CREATE TABLE IF NOT EXISTS recipes (
            name TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            energy REAL NOT NULL,
            main_product TEXT
        );

        CREATE TABLE IF NOT EXISTS recipe_products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_name TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            amount REAL,
            probability REAL NOT NULL,
            amount_min REAL,
            amount_max REAL
        );

        -- Ingredient order matters for display, so keep the position
        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_name TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            amount REAL,
            PRIMARY KEY (recipe_name, position)
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_products_recipe ON recipe_products(recipe_name);
        CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_name);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a recipe together with its products and ingredients
pub fn upsert_record(conn: &Connection, record: &RecipeRecord) -> Result<()> {
    conn.execute("DELETE FROM recipe_products WHERE recipe_name = ?1", [&record.name])?;
    conn.execute("DELETE FROM recipe_ingredients WHERE recipe_name = ?1", [&record.name])?;
    conn.execute(
        "INSERT OR REPLACE INTO recipes (name, category, energy, main_product)
         VALUES (?1, ?2, ?3, ?4)",
        (&record.name, &record.category, record.energy, &record.main_product),
    )?;

    for product in &record.products {
        conn.execute(
            "INSERT INTO recipe_products (recipe_name, name, kind, amount, probability, amount_min, amount_max)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                &record.name,
                &product.name,
                &product.kind,
                product.amount,
                product.probability,
                product.amount_min,
                product.amount_max,
            ),
        )?;
    }

    for (position, ingredient) in record.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_name, position, name, kind, amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &record.name,
                position as i64,
                &ingredient.name,
                &ingredient.kind,
                ingredient.amount,
            ),
        )?;
    }
    Ok(())
}

/// Clear all imported recipes (for re-import)
pub fn clear_recipes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_ingredients;
        DELETE FROM recipe_products;
        DELETE FROM recipes;
        "#,
    )?;
    Ok(())
}

fn load_products(conn: &Connection, recipe: Option<&str>) -> Result<HashMap<String, Vec<ProductRecord>>> {
    let mut stmt = conn.prepare(
        "SELECT recipe_name, name, kind, amount, probability, amount_min, amount_max
         FROM recipe_products
         WHERE ?1 IS NULL OR recipe_name = ?1
         ORDER BY id",
    )?;

    let rows = stmt.query_map([recipe], |row| {
        Ok((
            row.get::<_, String>(0)?,
            ProductRecord {
                name: row.get(1)?,
                kind: row.get(2)?,
                amount: row.get(3)?,
                probability: row.get(4)?,
                amount_min: row.get(5)?,
                amount_max: row.get(6)?,
            },
        ))
    })?;

    let mut products: HashMap<String, Vec<ProductRecord>> = HashMap::new();
    for row in rows {
        let (recipe_name, product) = row?;
        products.entry(recipe_name).or_default().push(product);
    }
    Ok(products)
}

fn load_ingredients(conn: &Connection, recipe: Option<&str>) -> Result<HashMap<String, Vec<IngredientRecord>>> {
    let mut stmt = conn.prepare(
        "SELECT recipe_name, name, kind, amount
         FROM recipe_ingredients
         WHERE ?1 IS NULL OR recipe_name = ?1
         ORDER BY recipe_name, position",
    )?;

    let rows = stmt.query_map([recipe], |row| {
        Ok((
            row.get::<_, String>(0)?,
            IngredientRecord {
                name: row.get(1)?,
                kind: row.get(2)?,
                amount: row.get(3)?,
            },
        ))
    })?;

    let mut ingredients: HashMap<String, Vec<IngredientRecord>> = HashMap::new();
    for row in rows {
        let (recipe_name, ingredient) = row?;
        ingredients.entry(recipe_name).or_default().push(ingredient);
    }
    Ok(ingredients)
}

fn load(conn: &Connection, recipe: Option<&str>) -> Result<Vec<RecipeRecord>> {
    let mut products = load_products(conn, recipe)?;
    let mut ingredients = load_ingredients(conn, recipe)?;

    let mut stmt = conn.prepare(
        "SELECT name, category, energy, main_product
         FROM recipes
         WHERE ?1 IS NULL OR name = ?1
         ORDER BY name",
    )?;

    let rows = stmt.query_map([recipe], |row| {
        Ok(RecipeRecord {
            name: row.get(0)?,
            category: row.get(1)?,
            products: Vec::new(),
            ingredients: Vec::new(),
            energy: row.get(2)?,
            main_product: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut record = row?;
        record.products = products.remove(&record.name).unwrap_or_default();
        record.ingredients = ingredients.remove(&record.name).unwrap_or_default();
        results.push(record);
    }
    Ok(results)
}

/// Load every stored recipe record
pub fn load_records(conn: &Connection) -> Result<Vec<RecipeRecord>> {
    load(conn, None)
}

/// Load a single recipe record by name
pub fn get_record(conn: &Connection, name: &str) -> Result<Option<RecipeRecord>> {
    Ok(load(conn, Some(name))?.into_iter().next())
}

/// List all stored recipe names
pub fn list_recipe_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM recipes ORDER BY name")?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List distinct raw categories with the number of recipes in each
pub fn list_categories(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) FROM recipes GROUP BY category ORDER BY category",
    )?;

    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Number of stored recipes
pub fn count_recipes(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
    Ok(count as usize)
}
