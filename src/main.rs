//! Recipe Chain Calculator
//!
//! Resolves production chains over a crafting recipe graph: rates, machine
//! counts, layout levels, removal closures and summary trees.

mod calculator;
mod catalog;
mod chain;
mod config;
mod db;
mod error;
mod models;
mod needs;
mod prune;
mod solver;
mod summary;

#[cfg(test)]
mod testutil;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;
use rusqlite::Connection;

use crate::calculator::ResolveRequest;
use crate::catalog::Catalog;
use crate::config::{NEGLIGIBLE_RATE, SINGULAR_PIVOT, SolverConfig};
use crate::models::{NeedsMap, RecipeChoices};

#[derive(Parser)]
#[command(name = "recipe-chain")]
#[command(about = "Production chain resolver for crafting recipe graphs")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, default_value = "recipes.db", global = true)]
    database: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Target, rate and recipe selection shared by every resolving command
#[derive(Args)]
struct ResolveArgs {
    /// Item to produce (e.g., "Steel", "Oxygen")
    item: String,

    /// Target production rate in units per minute
    #[arg(short, long, default_value = "60.0")]
    rate: f64,

    /// Select an alternate recipe, as ITEM=INDEX (see `recipes ITEM`)
    #[arg(short, long = "select", value_parser = parse_selection)]
    selections: Vec<(String, usize)>,

    /// Add waste disposal entries for unconsumed byproducts
    #[arg(long)]
    dispose_byproducts: bool,

    /// Rates at or below this are treated as not produced
    #[arg(long, default_value_t = NEGLIGIBLE_RATE)]
    negligible_rate: f64,

    /// Pivots below this make the system unsolvable
    #[arg(long, default_value_t = SINGULAR_PIVOT)]
    singular_pivot: f64,
}

impl ResolveArgs {
    fn config(&self) -> SolverConfig {
        SolverConfig {
            negligible_rate: self.negligible_rate,
            singular_pivot: self.singular_pivot,
        }
    }

    fn resolve(&self, catalog: &Catalog) -> Result<NeedsMap> {
        let mut choices = RecipeChoices::new();
        for (item, index) in &self.selections {
            choices.select(item.clone(), *index);
        }
        let config = self.config();
        let request = ResolveRequest::new(&self.item, self.rate);

        let mut needs = match calculator::resolve(catalog, &request, &choices, &config) {
            Ok(needs) => needs,
            Err(e) if e.is_invalid_request() => bail!("Invalid request: {}", e),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot resolve {} @ {}/min", self.item, self.rate));
            }
        };

        if self.dispose_byproducts {
            let added = needs::add_waste_disposal(catalog, &mut needs, config.negligible_rate);
            info!("Added {} waste disposal entries", added.len());
        }
        Ok(needs)
    }
}

fn parse_selection(s: &str) -> Result<(String, usize), String> {
    let (item, index) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ITEM=INDEX, got '{}'", s))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("invalid recipe index '{}': {}", index, e))?;
    Ok((item.trim().to_string(), index))
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the production chain for a target item
    Calc {
        #[command(flatten)]
        resolve: ResolveArgs,

        /// Show the production tree
        #[arg(short, long)]
        tree: bool,

        /// Print the needs map as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what disappears when an item is removed from a resolved chain
    Prune {
        #[command(flatten)]
        resolve: ResolveArgs,

        /// Item to remove
        #[arg(long)]
        remove: String,
    },

    /// Show the summary tree with shared and waste items
    Summary {
        #[command(flatten)]
        resolve: ResolveArgs,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List candidate recipes for an item, with their selection index
    Recipes {
        /// Item ID
        item: String,
    },

    /// List all buildings in the database
    ListBuildings,

    /// List all items in the database
    ListItems,

    /// Show details for a specific building
    Building {
        /// Building ID
        id: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Calc {
            resolve,
            tree,
            json,
        } => {
            let catalog = db::load_catalog(&conn)?;
            let needs = resolve.resolve(&catalog)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&needs)?);
                return Ok(());
            }

            if tree {
                if let Some(root) = summary::build_tree(&resolve.item, &needs) {
                    println!("Production chain:\n");
                    println!("{}", summary::format_tree(&root, &catalog, 0));
                }
            }

            println!("{:<24} {:>12} {:>10} {:>6}", "Item", "Rate (/min)", "Machines", "Level");
            println!("{}", "-".repeat(55));
            let mut entries: Vec<_> = needs.entries().collect();
            entries.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.item_id.cmp(&b.item_id)));
            for e in entries {
                let machines = if e.is_raw {
                    "raw".to_string()
                } else {
                    format!("{:.2}", e.machine_count)
                };
                println!(
                    "{:<24} {:>12.3} {:>10} {:>6}",
                    catalog.item_name(&e.item_id),
                    e.rate,
                    machines,
                    e.level
                );
            }
            println!();

            let summary = calculator::summarize_chain(&needs, &catalog);
            println!("{}", summary);
        }

        Commands::Prune { resolve, remove } => {
            let catalog = db::load_catalog(&conn)?;
            let mut needs = resolve.resolve(&catalog)?;
            if !needs.contains(&remove) {
                bail!("'{}' is not part of the chain for {}", remove, resolve.item);
            }

            let removed = prune::remove_with_dependencies(&remove, &mut needs);
            println!("Removing {} removes {} items:", remove, removed.len());
            for id in &removed {
                println!("  - {}", catalog.item_name(id));
            }
            println!("Remaining:");
            for e in needs.entries() {
                println!("  {} @ {:.3}/min", catalog.item_name(&e.item_id), e.rate);
            }
        }

        Commands::Summary { resolve, json } => {
            let catalog = db::load_catalog(&conn)?;
            let needs = resolve.resolve(&catalog)?;
            let analysis = summary::analyze(&needs);

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
                return Ok(());
            }

            if let Some(root) = &analysis.tree {
                println!("{}", summary::format_tree(root, &catalog, 0));
            }
            if !analysis.shared_items.is_empty() {
                println!("Shared items:");
                for shared in &analysis.shared_items {
                    println!(
                        "  {} (used by {})",
                        catalog.item_name(&shared.item_id),
                        shared.consumers.join(", ")
                    );
                }
            }
            if !analysis.waste_items.is_empty() {
                println!("Waste items:");
                for waste in &analysis.waste_items {
                    print!("{}", summary::format_tree(waste, &catalog, 1));
                }
            }
        }

        Commands::Recipes { item } => {
            let catalog = db::load_catalog(&conn)?;
            if catalog.item(&item).is_none() {
                bail!("Item '{}' not found", item);
            }
            let recipes = catalog.recipes_for(&item);
            if recipes.is_empty() {
                println!("{} is a raw material (no recipe produces it)", item);
            }
            for (index, recipe) in recipes.iter().enumerate() {
                let side = |amounts: &[models::ItemAmount]| {
                    amounts
                        .iter()
                        .map(|a| format!("{} {}", a.amount, a.item_id))
                        .collect::<Vec<_>>()
                        .join(" + ")
                };
                println!(
                    "[{}] {} ({}, {}s): {} -> {}",
                    index,
                    catalog.building_name(&recipe.building_id),
                    recipe.mode,
                    recipe.time_s,
                    side(&recipe.ingredients),
                    side(&recipe.products)
                );
            }
        }

        Commands::ListBuildings => {
            let buildings = db::list_buildings(&conn)?;
            if buildings.is_empty() {
                println!("No buildings in database. Run 'load-sample' first.");
            } else {
                println!("{:<30} {:>10}", "Building", "Power (W)");
                println!("{}", "-".repeat(41));
                for b in buildings {
                    println!("{:<30} {:>10.0}", b.name, b.power_watts);
                }
            }
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'load-sample' first.");
            } else {
                for i in items {
                    println!(
                        "  {:<20} {:<12} {}",
                        i.id,
                        i.category.as_deref().unwrap_or("-"),
                        i.transport.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Building { id } => {
            let catalog = db::load_catalog(&conn)?;
            if let Some(b) = catalog.building(&id) {
                println!("Building: {}", b.name);
                println!("  ID: {}", b.id);
                if let Some(category) = &b.category {
                    println!("  Category: {}", category);
                }
                println!("  Power: {}W", b.power_watts);
                for mode in &b.modes {
                    println!("  Mode {}:", mode.name);
                    for recipe in &mode.recipes {
                        println!("    Recipe #{} ({}s)", recipe.id, recipe.time_s);
                        for i in &recipe.ingredients {
                            println!("      in:  {} x{}", i.item_id, i.amount);
                        }
                        for p in &recipe.products {
                            println!("      out: {} x{}", p.item_id, p.amount);
                        }
                    }
                }
            } else {
                println!("Building '{}' not found", id);
            }
        }

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

/// Load a small sample catalog with alternates, byproducts and a pump
fn load_sample_data(conn: &Connection) -> Result<()> {
    use crate::models::{Building, Item, ItemAmount, Recipe};

    db::clear_catalog(conn)?;

    let items = [
        ("Water", "Water", "Liquid", "Pipe"),
        ("DirtyWater", "Polluted Water", "Liquid", "Pipe"),
        ("Sand", "Sand", "Mineral", "Belt"),
        ("ToxicSand", "Polluted Dirt", "Mineral", "Belt"),
        ("Algae", "Algae", "Organic", "Belt"),
        ("Oxygen", "Oxygen", "Gas", "Pipe"),
        ("Hydrogen", "Hydrogen", "Gas", "Pipe"),
        ("IronOre", "Iron Ore", "Ore", "Belt"),
        ("Iron", "Iron", "Metal", "Belt"),
        ("Coal", "Coal", "Mineral", "Belt"),
        ("RefinedCarbon", "Refined Carbon", "Mineral", "Belt"),
        ("Fossil", "Fossil", "Mineral", "Belt"),
        ("Lime", "Lime", "Mineral", "Belt"),
        ("SedimentaryRock", "Sedimentary Rock", "Mineral", "Belt"),
        ("Steel", "Steel", "Metal", "Belt"),
    ];
    for (id, name, category, transport) in items {
        db::upsert_item(
            conn,
            &Item {
                id: id.to_string(),
                name: name.to_string(),
                category: Some(category.to_string()),
                transport: Some(transport.to_string()),
            },
        )?;
    }

    // (id, name, power, [(mode, time_s, ingredients, products)])
    type SampleRecipe = (&'static str, f64, &'static [(&'static str, f64)], &'static [(&'static str, f64)]);
    let buildings: [(&str, &str, f64, &[SampleRecipe]); 7] = [
        ("LiquidPump", "Liquid Pump", -240.0, &[("Pump", 1.0, &[], &[("Water", 10.0)])]),
        (
            "Electrolyzer",
            "Electrolyzer",
            -120.0,
            &[("Electrolysis", 1.0, &[("Water", 1.0)], &[("Oxygen", 0.888), ("Hydrogen", 0.112)])],
        ),
        (
            "AlgaeHabitat",
            "Algae Terrarium",
            0.0,
            &[(
                "Photosynthesis",
                1.0,
                &[("Algae", 0.03), ("Water", 0.3)],
                &[("Oxygen", 0.04), ("DirtyWater", 0.29)],
            )],
        ),
        (
            "WaterPurifier",
            "Water Sieve",
            -120.0,
            &[("Filter", 1.0, &[("DirtyWater", 5.0), ("Sand", 1.0)], &[("Water", 5.0), ("ToxicSand", 0.2)])],
        ),
        (
            "Kiln",
            "Kiln",
            -240.0,
            &[("Carbon", 40.0, &[("Coal", 100.0)], &[("RefinedCarbon", 100.0)])],
        ),
        (
            "RockCrusher",
            "Rock Granulator",
            -240.0,
            &[("Lime", 40.0, &[("Fossil", 100.0)], &[("Lime", 5.0), ("SedimentaryRock", 95.0)])],
        ),
        (
            "MetalRefinery",
            "Metal Refinery",
            -1200.0,
            &[
                ("Iron", 40.0, &[("IronOre", 100.0)], &[("Iron", 100.0)]),
                (
                    "Steel",
                    40.0,
                    &[("Iron", 70.0), ("RefinedCarbon", 20.0), ("Lime", 10.0)],
                    &[("Steel", 100.0)],
                ),
            ],
        ),
    ];

    let amounts = |pairs: &[(&str, f64)]| -> Vec<ItemAmount> {
        pairs.iter().map(|(id, amount)| ItemAmount::new(*id, *amount)).collect()
    };

    let mut recipe_count = 0;
    for (id, name, power_watts, recipes) in buildings {
        db::upsert_building(
            conn,
            &Building {
                id: id.to_string(),
                name: name.to_string(),
                category: None,
                power_watts,
                modes: Vec::new(),
            },
        )?;
        for (mode, time_s, ingredients, products) in recipes {
            db::insert_recipe(
                conn,
                &Recipe {
                    id: 0,
                    building_id: id.to_string(),
                    mode: mode.to_string(),
                    time_s: *time_s,
                    ingredients: amounts(ingredients),
                    products: amounts(products),
                },
            )?;
            recipe_count += 1;
        }
    }

    info!("Loaded {} sample buildings with {} recipes", buildings.len(), recipe_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        load_sample_data(&conn).unwrap();
        db::load_catalog(&conn).unwrap()
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("Oxygen=1").unwrap(), ("Oxygen".to_string(), 1));
        assert_eq!(parse_selection(" Water = 0 ").unwrap(), ("Water".to_string(), 0));
        assert!(parse_selection("Oxygen").is_err());
        assert!(parse_selection("Oxygen=x").is_err());
    }

    #[test]
    fn test_sample_steel_chain_resolves() {
        let catalog = sample_catalog();
        let needs = calculator::resolve(
            &catalog,
            &ResolveRequest::new("Steel", 150.0),
            &RecipeChoices::new(),
            &SolverConfig::default(),
        )
        .unwrap();

        let steel = needs.get("Steel").unwrap();
        assert!(steel.is_target);
        // 100 steel per 40s = 150/min per refinery
        assert!((steel.machine_count - 1.0).abs() < 1e-9);
        assert!((needs.get("Iron").unwrap().rate - 105.0).abs() < 1e-9);
        assert!((needs.get("Fossil").unwrap().rate - 300.0).abs() < 1e-9);
        assert!(needs.get("IronOre").unwrap().is_raw);
        assert_eq!(needs.get("IronOre").unwrap().level, 2);
    }

    #[test]
    fn test_sample_oxygen_alternate_uses_terrarium() {
        let catalog = sample_catalog();
        let oxygen = catalog.recipes_for("Oxygen");
        assert_eq!(oxygen.len(), 2);
        assert_eq!(oxygen[1].building_id, "AlgaeHabitat");

        let choices: RecipeChoices = [("Oxygen".to_string(), 1)].into_iter().collect();
        let needs = calculator::resolve(
            &catalog,
            &ResolveRequest::new("Oxygen", 2.4),
            &choices,
            &SolverConfig::default(),
        )
        .unwrap();

        assert!(needs.contains("Algae"));
        let water = needs.get("Water").unwrap();
        // The pump recipe has no ingredients, so water counts as raw
        assert!(water.is_raw);
        assert_eq!(water.selected, Some(0));
    }
}
