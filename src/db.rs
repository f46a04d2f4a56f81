//! Database schema and operations

use anyhow::Result;
use rusqlite::Connection;

use crate::catalog::Catalog;
use crate::models::{Building, Item, ItemAmount, Mode, Recipe};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            transport TEXT
        );

        CREATE TABLE IF NOT EXISTS buildings (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            power_watts REAL NOT NULL DEFAULT 0
        );

        -- One row per recipe; a building's modes are the distinct mode names
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building_id TEXT NOT NULL,
            mode TEXT NOT NULL,
            time_s REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE TABLE IF NOT EXISTS recipe_products (
            recipe_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_building ON recipes(building_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_products_item ON recipe_products(item_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name, category, transport) VALUES (?1, ?2, ?3, ?4)",
        (&item.id, &item.name, &item.category, &item.transport),
    )?;
    Ok(())
}

/// Insert or replace a building.
///
/// Modes are not written here; they come from the recipes inserted for it.
pub fn upsert_building(conn: &Connection, building: &Building) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO buildings (id, name, category, power_watts) VALUES (?1, ?2, ?3, ?4)",
        (
            &building.id,
            &building.name,
            &building.category,
            building.power_watts,
        ),
    )?;
    Ok(())
}

/// Insert a recipe with its ingredients and products, returning the new id.
///
/// `recipe.id` is ignored; the database assigns it.
pub fn insert_recipe(conn: &Connection, recipe: &Recipe) -> Result<i64> {
    conn.execute(
        "INSERT INTO recipes (building_id, mode, time_s) VALUES (?1, ?2, ?3)",
        (&recipe.building_id, &recipe.mode, recipe.time_s),
    )?;
    let recipe_id = conn.last_insert_rowid();

    for (position, ingredient) in recipe.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, position, item_id, amount)
             VALUES (?1, ?2, ?3, ?4)",
            (recipe_id, position as i64, &ingredient.item_id, ingredient.amount),
        )?;
    }
    for (position, product) in recipe.products.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_products (recipe_id, position, item_id, amount)
             VALUES (?1, ?2, ?3, ?4)",
            (recipe_id, position as i64, &product.item_id, product.amount),
        )?;
    }

    Ok(recipe_id)
}

/// Clear the whole catalog (for reloading)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_products;
        DELETE FROM recipe_ingredients;
        DELETE FROM recipes;
        DELETE FROM buildings;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// List all items in the database
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare("SELECT id, name, category, transport FROM items ORDER BY name")?;

    let rows = stmt.query_map([], |row| {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            transport: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all buildings in the database, without their modes
pub fn list_buildings(conn: &Connection) -> Result<Vec<Building>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, power_watts FROM buildings ORDER BY name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Building {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            power_watts: row.get(3)?,
            modes: Vec::new(),
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn load_amounts(conn: &Connection, table: &str, recipe_id: i64) -> Result<Vec<ItemAmount>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT item_id, amount FROM {table} WHERE recipe_id = ?1 ORDER BY position"
    ))?;

    let rows = stmt.query_map([recipe_id], |row| {
        Ok(ItemAmount {
            item_id: row.get(0)?,
            amount: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load the whole catalog.
///
/// Buildings keep insertion order, modes the order their first recipe was
/// inserted, and recipes their id order. This is the order alternates are
/// offered in.
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let items = list_items(conn)?;

    let mut stmt = conn.prepare(
        "SELECT id, name, category, power_watts FROM buildings ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Building {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            power_watts: row.get(3)?,
            modes: Vec::new(),
        })
    })?;
    let mut buildings = Vec::new();
    for row in rows {
        buildings.push(row?);
    }

    let mut stmt = conn.prepare(
        "SELECT id, building_id, mode, time_s FROM recipes WHERE building_id = ?1 ORDER BY id",
    )?;
    for building in &mut buildings {
        let rows = stmt.query_map([&building.id], |row| {
            Ok(Recipe {
                id: row.get(0)?,
                building_id: row.get(1)?,
                mode: row.get(2)?,
                time_s: row.get(3)?,
                ingredients: Vec::new(),
                products: Vec::new(),
            })
        })?;

        for row in rows {
            let mut recipe = row?;
            recipe.ingredients = load_amounts(conn, "recipe_ingredients", recipe.id)?;
            recipe.products = load_amounts(conn, "recipe_products", recipe.id)?;

            match building.modes.iter_mut().find(|m| m.name == recipe.mode) {
                Some(mode) => mode.recipes.push(recipe),
                None => building.modes.push(Mode {
                    name: recipe.mode.clone(),
                    recipes: vec![recipe],
                }),
            }
        }
    }

    Ok(Catalog::new(items, buildings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::recipe;

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_string(),
            category: None,
            transport: Some("Belt".to_string()),
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_load_catalog_groups_recipes_into_modes() {
        let conn = setup();
        for id in ["Iron", "IronOre", "Steel", "Carbon"] {
            upsert_item(&conn, &item(id)).unwrap();
        }
        upsert_building(
            &conn,
            &Building {
                id: "MetalRefinery".to_string(),
                name: "Metal Refinery".to_string(),
                category: None,
                power_watts: -1200.0,
                modes: Vec::new(),
            },
        )
        .unwrap();

        let mut iron = recipe(40.0, &[("IronOre", 100.0)], &[("Iron", 100.0)]);
        iron.building_id = "MetalRefinery".to_string();
        iron.mode = "Iron".to_string();
        let mut steel = recipe(40.0, &[("Iron", 70.0), ("Carbon", 30.0)], &[("Steel", 100.0)]);
        steel.building_id = "MetalRefinery".to_string();
        steel.mode = "Steel".to_string();

        let iron_id = insert_recipe(&conn, &iron).unwrap();
        let steel_id = insert_recipe(&conn, &steel).unwrap();
        assert!(steel_id > iron_id);

        let catalog = load_catalog(&conn).unwrap();
        let refinery = catalog.building("MetalRefinery").unwrap();
        assert_eq!(refinery.modes.len(), 2);
        assert_eq!(refinery.modes[0].name, "Iron");
        assert_eq!(refinery.modes[1].name, "Steel");

        let steel_recipes = catalog.recipes_for("Steel");
        assert_eq!(steel_recipes.len(), 1);
        assert_eq!(steel_recipes[0].id, steel_id);
        assert_eq!(steel_recipes[0].ingredients[0].item_id, "Iron");
        assert_eq!(steel_recipes[0].ingredients[1].item_id, "Carbon");
        assert!(catalog.contains_item("Carbon"));
        assert_eq!(catalog.item("Carbon").unwrap().transport.as_deref(), Some("Belt"));
    }

    #[test]
    fn test_clear_catalog_empties_tables() {
        let conn = setup();
        upsert_item(&conn, &item("Water")).unwrap();
        clear_catalog(&conn).unwrap();

        assert!(list_items(&conn).unwrap().is_empty());
        assert!(list_buildings(&conn).unwrap().is_empty());
    }
}
