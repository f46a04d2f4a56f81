//! Discovery of the items taking part in a production chain

use std::collections::BTreeSet;

use log::debug;

use crate::catalog::Catalog;
use crate::models::{RecipeChoices, select_recipe};

/// Collect every item reachable from `target` through selected recipes.
///
/// Raw materials are included but never expanded. The discovered-set check
/// makes the walk terminate on cyclic recipe graphs.
pub fn discover_chain(catalog: &Catalog, target: &str, choices: &RecipeChoices) -> BTreeSet<String> {
    let mut discovered = BTreeSet::new();
    let mut stack = vec![target.to_string()];

    while let Some(item_id) = stack.pop() {
        if discovered.contains(&item_id) {
            continue;
        }

        let recipes = catalog.recipes_for(&item_id);
        if let Some((_, recipe)) = select_recipe(&recipes, choices.choice(&item_id)) {
            for ingredient in &recipe.ingredients {
                if !stack.contains(&ingredient.item_id) {
                    stack.push(ingredient.item_id.clone());
                }
            }
        }
        discovered.insert(item_id);
    }

    debug!("Discovered {} items in chain for {}", discovered.len(), target);
    discovered
}
