//! In-memory recipe catalog and the item → recipe reverse index

use std::collections::{BTreeMap, HashMap};

use crate::models::{Building, Item, Recipe};

/// Loaded reference data for one session
pub struct Catalog {
    items: BTreeMap<String, Item>,
    buildings: Vec<Building>,
    /// (building, mode, recipe) positions of every recipe producing an item
    by_product: HashMap<String, Vec<(usize, usize, usize)>>,
}

impl Catalog {
    pub fn new(items: Vec<Item>, buildings: Vec<Building>) -> Self {
        let mut by_product: HashMap<String, Vec<(usize, usize, usize)>> = HashMap::new();

        for (b, building) in buildings.iter().enumerate() {
            for (m, mode) in building.modes.iter().enumerate() {
                for (r, recipe) in mode.recipes.iter().enumerate() {
                    let mut seen: Vec<&str> = Vec::new();
                    for product in &recipe.products {
                        // A recipe listing the same product twice is still one candidate
                        if seen.contains(&product.item_id.as_str()) {
                            continue;
                        }
                        seen.push(&product.item_id);
                        by_product
                            .entry(product.item_id.clone())
                            .or_default()
                            .push((b, m, r));
                    }
                }
            }
        }

        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            buildings,
            by_product,
        }
    }

    /// Candidate recipes producing `item_id`, in catalog order.
    ///
    /// An empty list means the item is a raw material.
    pub fn recipes_for(&self, item_id: &str) -> Vec<&Recipe> {
        self.by_product
            .get(item_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&(b, m, r)| &self.buildings[b].modes[m].recipes[r])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.get(item_id)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.items.contains_key(item_id)
    }

    pub fn building(&self, building_id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == building_id)
    }

    /// Display name for an item, falling back to its id
    pub fn item_name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.items.get(item_id).map_or(item_id, |i| i.name.as_str())
    }

    pub fn building_name<'a>(&'a self, building_id: &'a str) -> &'a str {
        self.building(building_id)
            .map_or(building_id, |b| b.name.as_str())
    }
}
