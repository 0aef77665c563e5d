use crate::output::{print_json, print_table};
use anyhow::Context;
use buildplan_core::store::{FileStore, Store};
use buildplan_core::types::{Decision, Iteration, StateEntry, Timestep};
use std::path::Path;

pub fn run(
    root: &Path,
    run_name: &str,
    timestep: Timestep,
    iteration: Iteration,
    json: bool,
) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let entries = store
        .read_state(run_name, timestep, iteration)
        .with_context(|| format!("failed to read state of run '{run_name}'"))?;
    let decisions: Vec<Decision> = entries.iter().filter_map(StateEntry::to_decision).collect();

    if json {
        return print_json(&decisions);
    }

    if decisions.is_empty() {
        println!("No interventions active at timestep {timestep}, iteration {iteration}.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = decisions
        .iter()
        .map(|d| vec![d.name.clone(), d.build_year.to_string()])
        .collect();
    print_table(&["NAME", "BUILD YEAR"], &rows);
    Ok(())
}
