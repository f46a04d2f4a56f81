//! Recursive summary view of a resolved chain with shared and waste analysis

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{NeedEntry, NeedsMap};

#[derive(Debug, Clone, Serialize)]
pub struct FlowRate {
    pub item_id: String,
    pub rate: f64,
}

/// Building and per-item flows of the recipe feeding a tree node
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub building_id: String,
    pub machine_count: f64,
    pub ingredients: Vec<FlowRate>,
    pub products: Vec<FlowRate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryNode {
    pub item_id: String,
    pub rate: f64,
    pub is_raw: bool,
    pub is_waste_disposal: bool,
    pub recipe: Option<RecipeView>,
    pub children: Vec<SummaryNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedItem {
    pub item_id: String,
    pub consumers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainAnalysis {
    pub tree: Option<SummaryNode>,
    pub shared_items: Vec<SharedItem>,
    pub waste_items: Vec<SummaryNode>,
}

/// Build the tree rooted at `target`.
///
/// Each branch carries its own copy of the path, so an item can appear in
/// several branches while a cycle within one branch is cut.
pub fn build_tree(target: &str, needs: &NeedsMap) -> Option<SummaryNode> {
    build_node(target, needs, &HashSet::new())
}

fn build_node(item_id: &str, needs: &NeedsMap, path: &HashSet<String>) -> Option<SummaryNode> {
    if path.contains(item_id) {
        return None;
    }
    let entry = needs.get(item_id)?;

    let mut path = path.clone();
    path.insert(item_id.to_string());

    let children = entry
        .ingredient_ids()
        .filter(|ingredient| needs.contains(ingredient))
        .filter_map(|ingredient| build_node(ingredient, needs, &path))
        .collect();

    Some(SummaryNode {
        item_id: entry.item_id.clone(),
        rate: entry.rate,
        is_raw: entry.is_raw,
        is_waste_disposal: entry.is_waste_disposal,
        recipe: recipe_view(entry),
        children,
    })
}

fn recipe_view(entry: &NeedEntry) -> Option<RecipeView> {
    if entry.is_raw {
        return None;
    }
    let recipe = entry.selected_recipe()?;
    let scale = |amount: f64| recipe.per_minute(amount) * entry.machine_count;

    Some(RecipeView {
        building_id: recipe.building_id.clone(),
        machine_count: entry.machine_count,
        ingredients: recipe
            .ingredients
            .iter()
            .map(|i| FlowRate {
                item_id: i.item_id.clone(),
                rate: scale(i.amount),
            })
            .collect(),
        products: recipe
            .products
            .iter()
            .map(|p| FlowRate {
                item_id: p.item_id.clone(),
                rate: scale(p.amount),
            })
            .collect(),
    })
}

/// Tree of the target plus items consumed by more than one entry and waste entries
pub fn analyze(needs: &NeedsMap) -> ChainAnalysis {
    let target = needs.target().map(|t| t.item_id.as_str());
    let tree = target.and_then(|t| build_tree(t, needs));

    let mut consumers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for entry in needs.entries() {
        for ingredient in entry.ingredient_ids() {
            if needs.contains(ingredient) {
                consumers.entry(ingredient).or_default().insert(&entry.item_id);
            }
        }
    }

    let shared_items = consumers
        .into_iter()
        .filter(|(item_id, by)| by.len() > 1 && Some(*item_id) != target)
        .map(|(item_id, by)| SharedItem {
            item_id: item_id.to_string(),
            consumers: by.into_iter().map(str::to_string).collect(),
        })
        .collect();

    let waste_items = needs
        .entries()
        .filter(|e| e.is_waste_disposal)
        .filter_map(|e| build_tree(&e.item_id, needs))
        .collect();

    ChainAnalysis {
        tree,
        shared_items,
        waste_items,
    }
}

/// Format a summary tree as an indented listing
pub fn format_tree(node: &SummaryNode, catalog: &Catalog, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);
    let name = catalog.item_name(&node.item_id);

    match &node.recipe {
        None if node.is_waste_disposal => {
            output.push_str(&format!("{}x {} @ {:.3}/min (waste)\n", prefix, name, node.rate));
        }
        None => {
            output.push_str(&format!("{}→ {} @ {:.3}/min (raw input)\n", prefix, name, node.rate));
        }
        Some(recipe) => {
            output.push_str(&format!(
                "{}{} @ {:.3}/min: {:.2}x {}\n",
                prefix,
                name,
                node.rate,
                recipe.machine_count,
                catalog.building_name(&recipe.building_id)
            ));
            for ingredient in &recipe.ingredients {
                output.push_str(&format!(
                    "{}  needs {} @ {:.3}/min\n",
                    prefix,
                    catalog.item_name(&ingredient.item_id),
                    ingredient.rate
                ));
            }
            for child in &node.children {
                output.push_str(&format_tree(child, catalog, indent + 2));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{ResolveRequest, resolve};
    use crate::config::SolverConfig;
    use crate::models::RecipeChoices;
    use crate::needs::add_waste_disposal;
    use crate::testutil::*;

    fn gear_catalog() -> Catalog {
        catalog(
            &["Gear", "Rod", "Plate", "Ore"],
            vec![
                building("Assembler", vec![recipe(5.0, &[("Plate", 2.0), ("Rod", 1.0)], &[("Gear", 1.0)])]),
                building("Lathe", vec![recipe(2.0, &[("Plate", 1.0)], &[("Rod", 2.0)])]),
                building("Smelter", vec![recipe(3.0, &[("Ore", 1.0)], &[("Plate", 1.0)])]),
            ],
        )
    }

    fn resolved(catalog: &Catalog, target: &str, rate: f64) -> NeedsMap {
        resolve(
            catalog,
            &ResolveRequest::new(target, rate),
            &RecipeChoices::new(),
            &SolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_tree_repeats_items_across_branches() {
        let catalog = gear_catalog();
        let needs = resolved(&catalog, "Gear", 12.0);
        let tree = build_tree("Gear", &needs).unwrap();

        assert_eq!(tree.item_id, "Gear");
        assert_eq!(tree.children.len(), 2);
        // Plate appears directly under Gear and again under Rod
        assert_eq!(tree.children[0].item_id, "Plate");
        assert_eq!(tree.children[1].item_id, "Rod");
        assert_eq!(tree.children[1].children[0].item_id, "Plate");
    }

    #[test]
    fn test_recipe_view_scales_flows_by_machines() {
        let catalog = gear_catalog();
        let needs = resolved(&catalog, "Gear", 12.0);
        let tree = build_tree("Gear", &needs).unwrap();

        let recipe = tree.recipe.as_ref().unwrap();
        assert_eq!(recipe.building_id, "Assembler");
        assert_close(recipe.machine_count, 1.0);
        assert_close(recipe.ingredients[0].rate, 24.0);
        assert_close(recipe.ingredients[1].rate, 12.0);
        assert_close(recipe.products[0].rate, 12.0);

        let ore = &tree.children[0].children[0];
        assert_eq!(ore.item_id, "Ore");
        assert!(ore.is_raw);
        assert!(ore.recipe.is_none());
    }

    #[test]
    fn test_cycle_is_cut_per_path() {
        let catalog = catalog(
            &["A", "B", "Ore"],
            vec![
                building("MakesA", vec![recipe(1.0, &[("B", 1.0)], &[("A", 1.0)])]),
                building("MakesB", vec![recipe(1.0, &[("A", 0.5), ("Ore", 1.0)], &[("B", 1.0)])]),
            ],
        );
        let needs = resolved(&catalog, "A", 10.0);
        let tree = build_tree("A", &needs).unwrap();

        let b = &tree.children[0];
        assert_eq!(b.item_id, "B");
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].item_id, "Ore");
    }

    #[test]
    fn test_analyze_reports_shared_items() {
        let catalog = gear_catalog();
        let needs = resolved(&catalog, "Gear", 12.0);
        let analysis = analyze(&needs);

        assert!(analysis.tree.is_some());
        assert_eq!(analysis.shared_items.len(), 1);
        assert_eq!(analysis.shared_items[0].item_id, "Plate");
        assert_eq!(analysis.shared_items[0].consumers, vec!["Gear", "Rod"]);
        assert!(analysis.waste_items.is_empty());
    }

    #[test]
    fn test_analyze_collects_waste_separately() {
        let catalog = catalog(
            &["Water", "Oxygen", "Hydrogen"],
            vec![building(
                "Electrolyzer",
                vec![recipe(1.0, &[("Water", 1.0)], &[("Oxygen", 0.8), ("Hydrogen", 0.2)])],
            )],
        );
        let mut needs = resolved(&catalog, "Oxygen", 48.0);
        add_waste_disposal(&catalog, &mut needs, 1e-6);

        let analysis = analyze(&needs);
        let tree = analysis.tree.unwrap();
        assert!(tree.children.iter().all(|c| c.item_id != "Hydrogen"));
        assert_eq!(analysis.waste_items.len(), 1);
        assert_eq!(analysis.waste_items[0].item_id, "Hydrogen");
        assert!(analysis.waste_items[0].is_waste_disposal);
    }

    #[test]
    fn test_format_tree_lists_machines_and_raw_inputs() {
        let catalog = gear_catalog();
        let needs = resolved(&catalog, "Gear", 12.0);
        let text = format_tree(&build_tree("Gear", &needs).unwrap(), &catalog, 0);

        assert!(text.starts_with("Gear @ 12.000/min: 1.00x Assembler\n"));
        assert!(text.contains("→ Ore @"));
        assert!(text.contains("(raw input)"));
    }
}
