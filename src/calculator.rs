//! Production chain calculator logic

use std::collections::HashMap;

use log::{debug, warn};

use crate::catalog::Catalog;
use crate::chain::discover_chain;
use crate::config::SolverConfig;
use crate::error::ResolveError;
use crate::models::{NeedsMap, RecipeChoices};
use crate::needs::{assign_levels, populate};
use crate::solver::{build_system, solve};

/// A target item and the rate it should be produced at, in units per minute
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub target: String,
    pub rate: f64,
}

impl ResolveRequest {
    pub fn new(target: impl Into<String>, rate: f64) -> Self {
        Self {
            target: target.into(),
            rate,
        }
    }

    fn validate(&self, catalog: &Catalog) -> Result<(), ResolveError> {
        if self.target.is_empty() {
            return Err(ResolveError::MissingTarget);
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ResolveError::InvalidRate(self.rate));
        }
        if !catalog.contains_item(&self.target) {
            return Err(ResolveError::UnknownItem(self.target.clone()));
        }
        Ok(())
    }
}

/// Resolve the full production chain for a request.
///
/// Every failure is terminal: no partial needs map is returned.
pub fn resolve(
    catalog: &Catalog,
    request: &ResolveRequest,
    choices: &RecipeChoices,
    config: &SolverConfig,
) -> Result<NeedsMap, ResolveError> {
    request.validate(catalog)?;
    let target = request.target.as_str();

    let items = discover_chain(catalog, target, choices);
    if items.is_empty() {
        return Err(ResolveError::EmptyChain(target.to_string()));
    }

    let system = build_system(catalog, &items, target, request.rate, choices);
    let Some(solution) = solve(&system.matrix, &system.demand, config.singular_pivot) else {
        warn!("Singular system for {} over {} items", target, system.len());
        return Err(ResolveError::Unsolvable(target.to_string()));
    };

    let mut needs = populate(catalog, &system, &solution, choices, target, config.negligible_rate);
    if !needs.contains(target) {
        warn!("Target {} resolved to a negligible rate", target);
        return Err(ResolveError::EmptyChain(target.to_string()));
    }
    assign_levels(target, &mut needs);

    debug!("Resolved {} entries for {} @ {}/min", needs.len(), target, request.rate);
    Ok(needs)
}

/// Summary of a production chain calculation
#[derive(Debug)]
pub struct ChainSummary {
    pub target_item: String,
    pub target_rate: f64,
    pub total_power_consumption: f64,
    pub total_power_generation: f64,
    pub net_power: f64,
    pub building_counts: Vec<(String, f64)>,
    pub raw_inputs: Vec<(String, f64)>,
    pub waste_outputs: Vec<(String, f64)>,
}

/// Generate a summary of a resolved chain
pub fn summarize_chain(needs: &NeedsMap, catalog: &Catalog) -> ChainSummary {
    let mut building_counts: HashMap<String, f64> = HashMap::new();
    let mut raw_inputs = Vec::new();
    let mut waste_outputs = Vec::new();
    let mut power_consumption = 0.0;
    let mut power_generation = 0.0;

    for entry in needs.entries() {
        let name = catalog.item_name(&entry.item_id).to_string();
        if entry.is_waste_disposal {
            waste_outputs.push((name, entry.rate));
            continue;
        }
        if entry.is_raw {
            raw_inputs.push((name, entry.rate));
            continue;
        }

        let Some(recipe) = entry.selected_recipe() else {
            continue;
        };
        let building_name = catalog.building_name(&recipe.building_id).to_string();
        *building_counts.entry(building_name).or_default() += entry.machine_count;

        let power = catalog
            .building(&recipe.building_id)
            .map_or(0.0, |b| b.power_watts * entry.machine_count);
        if power < 0.0 {
            power_consumption += -power;
        } else {
            power_generation += power;
        }
    }

    let mut building_list: Vec<_> = building_counts.into_iter().collect();
    building_list.sort_by(|a, b| a.0.cmp(&b.0));
    raw_inputs.sort_by(|a, b| a.0.cmp(&b.0));
    waste_outputs.sort_by(|a, b| a.0.cmp(&b.0));

    let target = needs.target();
    ChainSummary {
        target_item: target.map_or_else(String::new, |t| catalog.item_name(&t.item_id).to_string()),
        target_rate: target.map_or(0.0, |t| t.rate),
        total_power_consumption: power_consumption,
        total_power_generation: power_generation,
        net_power: power_generation - power_consumption,
        building_counts: building_list,
        raw_inputs,
        waste_outputs,
    }
}

impl std::fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f, "Target: {} @ {:.3}/min", self.target_item, self.target_rate)?;
        writeln!(f)?;

        writeln!(f, "Machines required:")?;
        for (name, count) in &self.building_counts {
            writeln!(f, "  {:.2}x {}", count, name)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (name, rate) in &self.raw_inputs {
            writeln!(f, "  {} @ {:.3}/min", name, rate)?;
        }
        writeln!(f)?;

        if !self.waste_outputs.is_empty() {
            writeln!(f, "Waste to dispose of:")?;
            for (name, rate) in &self.waste_outputs {
                writeln!(f, "  {} @ {:.3}/min", name, rate)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Power:")?;
        writeln!(f, "  Consumption: {:.0}W", self.total_power_consumption)?;
        writeln!(f, "  Generation:  {:.0}W", self.total_power_generation)?;
        writeln!(f, "  Net:         {:.0}W", self.net_power)?;

        Ok(())
    }
}
