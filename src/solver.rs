//! Mass-balance formulation of a chain and its Gauss-Jordan solution

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::catalog::Catalog;
use crate::models::{RecipeChoices, select_recipe};

/// Square system `matrix · x = demand` over the items of one chain.
///
/// Column `i` is the net output of `items[i]`; row `j` balances what is
/// produced of `items[j]` against what every recipe in the chain consumes.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    pub matrix: Vec<Vec<f64>>,
    pub demand: Vec<f64>,
    pub items: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LinearSystem {
    pub fn index_of(&self, item_id: &str) -> Option<usize> {
        self.positions.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Build the system for `items`, with `target_rate` as the only external demand
pub fn build_system(
    catalog: &Catalog,
    items: &BTreeSet<String>,
    target: &str,
    target_rate: f64,
    choices: &RecipeChoices,
) -> LinearSystem {
    let items: Vec<String> = items.iter().cloned().collect();
    let positions: HashMap<String, usize> = items
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect();

    let n = items.len();
    let mut matrix = vec![vec![0.0; n]; n];
    let mut demand = vec![0.0; n];

    if let Some(&t) = positions.get(target) {
        demand[t] = target_rate;
    }

    for (i, item_id) in items.iter().enumerate() {
        matrix[i][i] = 1.0;

        let recipes = catalog.recipes_for(item_id);
        let Some((_, recipe)) = select_recipe(&recipes, choices.choice(item_id)) else {
            continue;
        };
        let Some(product) = recipe.product_for(item_id) else {
            continue;
        };

        for ingredient in &recipe.ingredients {
            if let Some(&j) = positions.get(&ingredient.item_id) {
                matrix[j][i] -= ingredient.amount / product.amount;
            }
        }
    }

    debug!("Built {}x{} system for {}", n, n, target);
    LinearSystem {
        matrix,
        demand,
        items,
        positions,
    }
}

/// Solve `matrix · x = vector` by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `None` when a pivot falls below `singular_pivot`.
pub fn solve(matrix: &[Vec<f64>], vector: &[f64], singular_pivot: f64) -> Option<Vec<f64>> {
    let n = vector.len();
    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .zip(vector)
        .map(|(row, &b)| {
            let mut row = row.clone();
            row.push(b);
            row
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .unwrap_or(col);

        if aug[pivot_row][col].abs() < singular_pivot {
            return None;
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col].clone();
        for (r, row) in aug.iter_mut().enumerate() {
            if r == col {
                continue;
            }
            let factor = row[col] / pivot[col];
            if factor == 0.0 {
                continue;
            }
            for (value, p) in row.iter_mut().zip(&pivot).skip(col) {
                *value -= factor * p;
            }
        }
    }

    Some((0..n).map(|i| aug[i][n] / aug[i][i]).collect())
}
