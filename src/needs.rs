//! Needs map population, level assignment and byproduct disposal

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::catalog::Catalog;
use crate::models::{NeedEntry, NeedsMap, RecipeChoices, select_recipe};
use crate::solver::LinearSystem;

/// Turn a solved system into per-item production records.
///
/// Items whose solved rate is at or below `negligible_rate` are omitted.
pub fn populate(
    catalog: &Catalog,
    system: &LinearSystem,
    solution: &[f64],
    choices: &RecipeChoices,
    target: &str,
    negligible_rate: f64,
) -> NeedsMap {
    let mut needs = NeedsMap::new();

    for (item_id, &rate) in system.items.iter().zip(solution) {
        if rate <= negligible_rate {
            debug!("Omitting {} with negligible rate {:.3e}", item_id, rate);
            continue;
        }

        let recipes = catalog.recipes_for(item_id);
        let selected = select_recipe(&recipes, choices.choice(item_id));
        let is_raw = selected.is_none_or(|(_, r)| r.ingredients.is_empty());

        let machine_count = match selected {
            Some((_, recipe)) if !is_raw => recipe
                .product_for(item_id)
                .map_or(0.0, |p| rate / recipe.per_minute(p.amount)),
            _ => 0.0,
        };

        needs.insert(NeedEntry {
            item_id: item_id.clone(),
            rate,
            level: 0,
            is_raw,
            is_target: item_id == target,
            recipes: recipes.into_iter().cloned().collect(),
            selected: selected.map(|(i, _)| i),
            machine_count,
            is_waste_disposal: false,
        });
    }

    needs
}

/// Assign every reachable entry the depth of its longest path from `target`.
///
/// Entries already placed at the proposed depth or deeper are not revisited;
/// a shorter earlier placement is raised. Items on the current path are not
/// descended into again, which stops recursion through cycles.
pub fn assign_levels(target: &str, needs: &mut NeedsMap) {
    let mut levels: HashMap<String, usize> = HashMap::new();
    let mut path: HashSet<String> = HashSet::new();
    visit_level(target, 0, needs, &mut levels, &mut path);

    for (item_id, level) in levels {
        if let Some(entry) = needs.get_mut(&item_id) {
            entry.level = level;
        }
    }
}

fn visit_level(
    item_id: &str,
    level: usize,
    needs: &NeedsMap,
    levels: &mut HashMap<String, usize>,
    path: &mut HashSet<String>,
) {
    if path.contains(item_id) {
        return;
    }
    if levels.get(item_id).is_some_and(|&known| known >= level) {
        return;
    }
    let Some(entry) = needs.get(item_id) else {
        return;
    };

    levels.insert(item_id.to_string(), level);
    path.insert(item_id.to_string());
    for ingredient in entry.ingredient_ids() {
        if needs.contains(ingredient) {
            visit_level(ingredient, level + 1, needs, levels, path);
        }
    }
    path.remove(item_id);
}

/// Output of the non-driving products of every selected recipe, summed per item
pub fn byproducts(needs: &NeedsMap) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();

    for entry in needs.entries().filter(|e| !e.is_raw) {
        let Some(recipe) = entry.selected_recipe() else {
            continue;
        };
        let driving = recipe.product_for(&entry.item_id).map(|p| p.item_id.as_str());

        for product in &recipe.products {
            if Some(product.item_id.as_str()) == driving {
                continue;
            }
            *totals.entry(product.item_id.clone()).or_default() +=
                recipe.per_minute(product.amount) * entry.machine_count;
        }
    }

    totals
}

/// Add a waste disposal entry for every byproduct that nothing in the chain consumes.
///
/// Byproducts consumed by a selected recipe in the chain are skipped, even
/// when their own entry was dropped for a negligible rate.
///
/// Returns the ids of the entries added.
pub fn add_waste_disposal(catalog: &Catalog, needs: &mut NeedsMap, negligible_rate: f64) -> Vec<String> {
    let mut added = Vec::new();

    let consumed: HashSet<String> = needs
        .entries()
        .flat_map(|e| e.ingredient_ids().map(str::to_string))
        .collect();

    for (item_id, rate) in byproducts(needs) {
        if needs.contains(&item_id) || consumed.contains(&item_id) || rate <= negligible_rate {
            continue;
        }

        let level = needs
            .entries()
            .filter(|e| {
                e.selected_recipe()
                    .is_some_and(|r| r.products.iter().any(|p| p.item_id == item_id))
            })
            .map(|e| e.level + 1)
            .max()
            .unwrap_or(0);

        debug!("Disposing of {:.3}/min byproduct {}", rate, item_id);
        needs.insert(NeedEntry {
            item_id: item_id.clone(),
            rate,
            level,
            is_raw: true,
            is_target: false,
            recipes: catalog.recipes_for(&item_id).into_iter().cloned().collect(),
            selected: None,
            machine_count: 0.0,
            is_waste_disposal: true,
        });
        added.push(item_id);
    }

    added
}
