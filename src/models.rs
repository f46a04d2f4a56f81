//! Data models for catalog reference data and resolved production records

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub transport: Option<String>, // Belt, Pipe, ...
}

/// An `{itemId, amount}` pair on either side of a recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAmount {
    pub item_id: String,
    pub amount: f64,
}

impl ItemAmount {
    pub fn new(item_id: impl Into<String>, amount: f64) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub building_id: String,
    pub mode: String,
    pub time_s: f64,
    pub ingredients: Vec<ItemAmount>,
    pub products: Vec<ItemAmount>,
}

impl Recipe {
    /// The output that drives production of `item_id`.
    ///
    /// Falls back to the first product when the recipe does not list the
    /// item itself.
    pub fn product_for(&self, item_id: &str) -> Option<&ItemAmount> {
        self.products
            .iter()
            .find(|p| p.item_id == item_id)
            .or_else(|| self.products.first())
    }

    /// Units per minute of `amount` for a single machine running this recipe
    pub fn per_minute(&self, amount: f64) -> f64 {
        amount / (self.time_s / 60.0)
    }
}

#[derive(Debug, Clone)]
pub struct Mode {
    pub name: String,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone)]
pub struct Building {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub power_watts: f64, // Negative = consumes, Positive = generates
    pub modes: Vec<Mode>,
}

/// Which candidate recipe is active for each item.
///
/// Items without an entry have no explicit selection and use the first
/// candidate.
#[derive(Debug, Clone, Default)]
pub struct RecipeChoices(HashMap<String, usize>);

impl RecipeChoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, item_id: impl Into<String>, index: usize) {
        self.0.insert(item_id.into(), index);
    }

    pub fn choice(&self, item_id: &str) -> Option<usize> {
        self.0.get(item_id).copied()
    }
}

impl FromIterator<(String, usize)> for RecipeChoices {
    fn from_iter<T: IntoIterator<Item = (String, usize)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Pick the active recipe among `candidates`.
///
/// An out-of-range index selects nothing, which makes the item raw.
pub fn select_recipe<'a>(
    candidates: &[&'a Recipe],
    choice: Option<usize>,
) -> Option<(usize, &'a Recipe)> {
    let index = choice.unwrap_or(0);
    candidates.get(index).map(|recipe| (index, *recipe))
}

/// Production record for one item of a resolved chain
#[derive(Debug, Clone, Serialize)]
pub struct NeedEntry {
    pub item_id: String,
    /// Units per minute
    pub rate: f64,
    pub level: usize,
    pub is_raw: bool,
    pub is_target: bool,
    pub recipes: Vec<Recipe>,
    pub selected: Option<usize>,
    pub machine_count: f64,
    pub is_waste_disposal: bool,
}

impl NeedEntry {
    pub fn selected_recipe(&self) -> Option<&Recipe> {
        self.selected.and_then(|i| self.recipes.get(i))
    }

    /// Ingredient ids of the selected recipe, empty for raw entries
    pub fn ingredient_ids(&self) -> impl Iterator<Item = &str> {
        self.selected_recipe()
            .into_iter()
            .flat_map(|r| r.ingredients.iter().map(|i| i.item_id.as_str()))
    }
}

/// Resolved production records keyed by item id
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct NeedsMap(BTreeMap<String, NeedEntry>);

impl NeedsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: NeedEntry) {
        self.0.insert(entry.item_id.clone(), entry);
    }

    pub fn get(&self, item_id: &str) -> Option<&NeedEntry> {
        self.0.get(item_id)
    }

    pub fn get_mut(&mut self, item_id: &str) -> Option<&mut NeedEntry> {
        self.0.get_mut(item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.0.contains_key(item_id)
    }

    pub fn remove(&mut self, item_id: &str) -> Option<NeedEntry> {
        self.0.remove(item_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &NeedEntry> {
        self.0.values()
    }

    pub fn target(&self) -> Option<&NeedEntry> {
        self.0.values().find(|e| e.is_target)
    }
}
