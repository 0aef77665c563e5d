use crate::output::{print_json, print_table};
use anyhow::Context;
use buildplan_core::intervention::{Intervention, InterventionRegistry, Lifetime};
use buildplan_core::manager::DecisionManager;
use buildplan_core::store::FileStore;
use buildplan_core::strategy::StrategyLoader;
use std::path::Path;

/// List the run's register. With `available`, interventions already planned
/// by initial conditions or pre-specified planning are left out.
pub fn run(root: &Path, run_name: &str, available: bool, json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let config = store
        .read_run(run_name)
        .with_context(|| format!("failed to load run '{run_name}'"))?;

    let manager = DecisionManager::new(
        store,
        config.timesteps.clone(),
        run_name,
        &config.sector_models,
        &StrategyLoader::new(),
    )
    .with_context(|| format!("failed to set up decisions for run '{run_name}'"))?;

    let registry: InterventionRegistry = if available {
        manager.available_interventions()
    } else {
        manager.registry().clone()
    };

    if json {
        let list: Vec<&Intervention> = registry.iter().collect();
        return print_json(&list);
    }

    if registry.is_empty() {
        println!("No interventions.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = registry
        .iter()
        .map(|i| vec![i.name.clone(), lifetime_label(i)])
        .collect();
    print_table(&["NAME", "LIFETIME"], &rows);
    Ok(())
}

fn lifetime_label(intervention: &Intervention) -> String {
    match intervention.lifetime() {
        Ok(Lifetime::Years(n)) => format!("{n} years"),
        Ok(Lifetime::Infinite) => "infinite".to_string(),
        Err(_) => "invalid".to_string(),
    }
}
