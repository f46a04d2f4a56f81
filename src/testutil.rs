//! Catalog fixtures shared by unit tests

use crate::catalog::Catalog;
use crate::models::{Building, Item, ItemAmount, Mode, Recipe};

pub fn recipe(time_s: f64, ingredients: &[(&str, f64)], products: &[(&str, f64)]) -> Recipe {
    Recipe {
        id: 0,
        building_id: String::new(),
        mode: "Default".to_string(),
        time_s,
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| ItemAmount::new(*id, *amount))
            .collect(),
        products: products
            .iter()
            .map(|(id, amount)| ItemAmount::new(*id, *amount))
            .collect(),
    }
}

/// A building with a single mode holding `recipes`
pub fn building(id: &str, recipes: Vec<Recipe>) -> Building {
    powered_building(id, 0.0, recipes)
}

pub fn powered_building(id: &str, power_watts: f64, recipes: Vec<Recipe>) -> Building {
    let recipes = recipes
        .into_iter()
        .map(|mut r| {
            r.building_id = id.to_string();
            r
        })
        .collect();
    Building {
        id: id.to_string(),
        name: id.to_string(),
        category: None,
        power_watts,
        modes: vec![Mode {
            name: "Default".to_string(),
            recipes,
        }],
    }
}

pub fn catalog(items: &[&str], buildings: Vec<Building>) -> Catalog {
    let items = items
        .iter()
        .map(|id| Item {
            id: id.to_string(),
            name: id.to_string(),
            category: None,
            transport: None,
        })
        .collect();
    Catalog::new(items, buildings)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
