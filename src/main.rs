//! Recipe Production Calculator
//!
//! A production chain calculator for Factorio and Space Exploration recipe
//! trees: raw inputs, per-recipe rates, byproducts and building counts.

mod catalog;
mod category;
mod config;
mod correction;
mod error;
mod facilities;
mod import;
mod models;
mod plan;
mod store;
mod traversal;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::Catalog;
use crate::category::CategoryTable;
use crate::config::Config;
use crate::models::RecipeRecord;

#[derive(Parser)]
#[command(name = "recipe-calculator")]
#[command(about = "Production chain calculator for Factorio / Space Exploration recipes")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "recipes.db")]
    database: PathBuf,

    /// Path to a TOML config file (defaults are used without one)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import recipe dumps (a JSON file or a directory of them)
    Import {
        /// Path to a recipe dump file or directory
        path: PathBuf,

        /// Clear existing recipes before import
        #[arg(long)]
        clear: bool,
    },

    /// Calculate the production chain for a target resource
    Calc {
        /// Target resource to produce (config target_resource if omitted)
        resource: Option<String>,

        /// Target production rate in items per second
        #[arg(short, long)]
        rate: Option<f64>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all recipes in the database
    ListRecipes,

    /// List raw building categories and how they classify
    ListCategories,

    /// Show details for a specific recipe
    Recipe {
        /// Recipe name
        name: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without a recipe dump)
    LoadSample,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let conn = Connection::open(&cli.database)?;
    store::init_schema(&conn)?;

    match cli.command {
        Commands::Import { path, clear } => {
            if clear {
                tracing::info!("Clearing existing recipes...");
                store::clear_recipes(&conn)?;
            }

            let stats = import::import_to_database(&conn, &path)?;
            println!("{}", stats);
            println!("Database now holds {} recipes", store::count_recipes(&conn)?);
        }

        Commands::Calc {
            resource,
            rate,
            json,
        } => {
            let target = resource.unwrap_or_else(|| config.target_resource.clone());
            let rate = rate.unwrap_or(config.target_rate);

            let records = store::load_records(&conn)?;
            if records.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
                return Ok(());
            }

            let (catalog, _) = Catalog::build(records, &config, &target)?;
            let plan = plan::run(&catalog, &config, &target, rate)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan);
            }
        }

        Commands::ListRecipes => {
            let names = store::list_recipe_names(&conn)?;
            if names.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("Recipes:");
                for name in names {
                    println!("  {}", name);
                }
            }
        }

        Commands::ListCategories => {
            let table = CategoryTable::new(&config.category_aliases)?;
            let categories = store::list_categories(&conn)?;
            if categories.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<36} {:>8}  {}", "Category", "Recipes", "Building");
                println!("{}", "-".repeat(70));
                for (raw, count) in categories {
                    let building = match table.classify(&raw) {
                        Some(category) => category.to_string(),
                        None => "UNMAPPED".to_string(),
                    };
                    println!("{:<36} {:>8}  {}", raw, count, building);
                }
            }
        }

        Commands::Recipe { name } => match store::get_record(&conn, &name)? {
            Some(record) => print_record(&record, &config),
            None => println!("Recipe '{}' not found", name),
        },

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn print_record(record: &RecipeRecord, config: &Config) {
    println!("Recipe: {}", record.name);
    println!("  Category: {}", record.category);
    println!("  Cycle time: {}s", record.energy);
    if let Some(main) = &record.main_product {
        println!("  Main product: {}", main);
    } else if let Some(main) = config.alternate_product_keys.get(&record.name) {
        println!("  Main product: {} (configured)", main);
    }

    if !record.ingredients.is_empty() {
        println!("  Ingredients:");
        for i in &record.ingredients {
            match i.amount {
                Some(amount) => println!("    {} x {} ({})", amount, i.name, i.kind),
                None => println!("    ? x {} ({})", i.name, i.kind),
            }
        }
    }

    println!("  Products:");
    for p in &record.products {
        let amount = match (p.amount_min, p.amount_max, p.amount) {
            (Some(min), Some(max), _) => format!("{}-{}", min, max),
            (_, _, Some(amount)) => amount.to_string(),
            _ => "?".to_string(),
        };
        if p.probability < 1.0 {
            println!("    {} x {} ({}) @ {}%", amount, p.name, p.kind, p.probability * 100.0);
        } else {
            println!("    {} x {} ({})", amount, p.name, p.kind);
        }
    }
}

/// Load a small vanilla circuit chain for testing without a recipe dump
fn load_sample_data(conn: &Connection) -> Result<()> {
    store::clear_recipes(conn)?;

    let recipes = [
        RecipeRecord::new("iron-plate", "smelting", 3.2)
            .with_ingredient("iron-ore", 1.0)
            .with_product("iron-plate", 1.0),
        RecipeRecord::new("copper-plate", "smelting", 3.2)
            .with_ingredient("copper-ore", 1.0)
            .with_product("copper-plate", 1.0),
        RecipeRecord::new("iron-gear-wheel", "crafting", 0.5)
            .with_ingredient("iron-plate", 2.0)
            .with_product("iron-gear-wheel", 1.0),
        RecipeRecord::new("copper-cable", "crafting", 0.5)
            .with_ingredient("copper-plate", 1.0)
            .with_product("copper-cable", 2.0),
        RecipeRecord::new("electronic-circuit", "crafting", 0.5)
            .with_ingredient("iron-plate", 1.0)
            .with_ingredient("copper-cable", 3.0)
            .with_product("electronic-circuit", 1.0),
        // Stored under its recipe name; the petroleum-gas alternate key moves it.
        RecipeRecord::new("basic-oil-processing", "oil-processing", 5.0)
            .with_fluid_ingredient("crude-oil", 100.0)
            .with_product("petroleum-gas", 45.0),
        RecipeRecord::new("plastic-bar", "chemistry", 1.0)
            .with_fluid_ingredient("petroleum-gas", 20.0)
            .with_ingredient("coal", 1.0)
            .with_product("plastic-bar", 2.0),
        RecipeRecord::new("advanced-circuit", "crafting", 6.0)
            .with_ingredient("electronic-circuit", 2.0)
            .with_ingredient("plastic-bar", 2.0)
            .with_ingredient("copper-cable", 4.0)
            .with_product("advanced-circuit", 1.0),
        RecipeRecord::new("uranium-processing", "centrifuging", 12.0)
            .with_ingredient("uranium-ore", 10.0)
            .with_product_chance("uranium-235", 1.0, 0.007)
            .with_product_chance("uranium-238", 1.0, 0.993)
            .with_main_product("uranium-238"),
    ];

    let tx = conn.unchecked_transaction()?;
    for recipe in &recipes {
        store::upsert_record(&tx, recipe)?;
    }
    tx.commit()?;

    tracing::info!("Loaded {} sample recipes", recipes.len());
    Ok(())
}
