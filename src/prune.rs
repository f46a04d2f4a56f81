//! Cascading removal of a node and the dependencies only it needed

use std::collections::BTreeSet;

use log::debug;

use crate::models::NeedsMap;

/// Items to remove when `root` is deleted from `needs`.
///
/// An ingredient is removed only when no surviving entry's selected recipe
/// still consumes it. Ingredients kept this way are not expanded further.
pub fn find_closure(root: &str, needs: &NeedsMap) -> BTreeSet<String> {
    let mut removed = BTreeSet::from([root.to_string()]);
    let mut work = vec![root.to_string()];

    while let Some(item_id) = work.pop() {
        let Some(entry) = needs.get(&item_id) else {
            continue;
        };
        if entry.is_raw || entry.selected_recipe().is_none() {
            continue;
        }

        for ingredient in entry.ingredient_ids() {
            if removed.contains(ingredient) {
                continue;
            }

            let still_needed = needs
                .entries()
                .filter(|other| other.item_id != item_id && !removed.contains(&other.item_id))
                .any(|other| other.ingredient_ids().any(|i| i == ingredient));

            if !still_needed {
                removed.insert(ingredient.to_string());
                work.push(ingredient.to_string());
            }
        }
    }

    removed
}

/// Delete `root` and its unshared dependencies from `needs`, returning what went
pub fn remove_with_dependencies(root: &str, needs: &mut NeedsMap) -> BTreeSet<String> {
    let closure = find_closure(root, needs);
    for item_id in &closure {
        needs.remove(item_id);
    }
    debug!("Removed {} entries starting from {}", closure.len(), root);
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemAmount, NeedEntry, Recipe};

    fn entry(item_id: &str, ingredients: &[&str]) -> NeedEntry {
        let recipes = if ingredients.is_empty() {
            Vec::new()
        } else {
            vec![Recipe {
                id: 0,
                building_id: "Factory".to_string(),
                mode: "Default".to_string(),
                time_s: 1.0,
                ingredients: ingredients.iter().map(|i| ItemAmount::new(*i, 1.0)).collect(),
                products: vec![ItemAmount::new(item_id, 1.0)],
            }]
        };
        NeedEntry {
            item_id: item_id.to_string(),
            rate: 1.0,
            level: 0,
            is_raw: ingredients.is_empty(),
            is_target: false,
            selected: (!recipes.is_empty()).then_some(0),
            recipes,
            machine_count: 1.0,
            is_waste_disposal: false,
        }
    }

    fn needs(entries: Vec<NeedEntry>) -> NeedsMap {
        let mut needs = NeedsMap::new();
        for e in entries {
            needs.insert(e);
        }
        needs
    }

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shared_ingredient_survives() {
        let needs = needs(vec![
            entry("Top", &["A", "B"]),
            entry("A", &["X"]),
            entry("B", &["X"]),
            entry("X", &[]),
        ]);

        assert_eq!(find_closure("A", &needs), ids(&["A"]));
    }

    #[test]
    fn test_exclusive_ingredient_is_removed() {
        let needs = needs(vec![
            entry("Top", &["A", "B"]),
            entry("A", &["Y"]),
            entry("B", &["X"]),
            entry("Y", &["Ore"]),
            entry("X", &[]),
            entry("Ore", &[]),
        ]);

        assert_eq!(find_closure("A", &needs), ids(&["A", "Y", "Ore"]));
    }

    #[test]
    fn test_sharing_inside_closure_does_not_protect() {
        // Both consumers of X are removed, so X goes too
        let needs = needs(vec![
            entry("A", &["B", "X"]),
            entry("B", &["X"]),
            entry("X", &[]),
        ]);

        assert_eq!(find_closure("A", &needs), ids(&["A", "B", "X"]));
    }

    #[test]
    fn test_raw_root_removes_only_itself() {
        let needs = needs(vec![entry("A", &["X"]), entry("X", &[])]);
        assert_eq!(find_closure("X", &needs), ids(&["X"]));
    }

    #[test]
    fn test_remove_with_dependencies_mutates_map() {
        let mut needs = needs(vec![
            entry("Top", &["A", "B"]),
            entry("A", &["Y"]),
            entry("B", &[]),
            entry("Y", &[]),
        ]);

        let removed = remove_with_dependencies("A", &mut needs);
        assert_eq!(removed, ids(&["A", "Y"]));
        assert_eq!(needs.len(), 2);
        assert!(needs.contains("Top"));
        assert!(needs.contains("B"));
    }
}
