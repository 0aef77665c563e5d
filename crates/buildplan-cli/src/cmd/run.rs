use crate::output::{print_json, print_table};
use anyhow::Context;
use buildplan_core::manager::DecisionManager;
use buildplan_core::store::FileStore;
use buildplan_core::strategy::StrategyLoader;
use buildplan_core::types::Bundle;
use std::path::Path;

pub fn run(root: &Path, run_name: &str, max_bundles: Option<usize>, json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let config = store
        .read_run(run_name)
        .with_context(|| format!("failed to load run '{run_name}'"))?;

    let loader = StrategyLoader::new();
    let mut manager = DecisionManager::new(
        store,
        config.timesteps.clone(),
        run_name,
        &config.sector_models,
        &loader,
    )
    .with_context(|| format!("failed to set up decisions for run '{run_name}'"))?;

    let mut bundles: Vec<Bundle> = Vec::new();
    for bundle in manager.decision_loop().take(max_bundles.unwrap_or(usize::MAX)) {
        let bundle = bundle.context("decision step failed")?;
        tracing::info!(
            iterations = ?bundle.decision_iterations,
            timesteps = ?bundle.timesteps,
            "bundle written"
        );
        bundles.push(bundle);
    }

    if json {
        #[derive(serde::Serialize)]
        struct RunOutput<'a> {
            run: &'a str,
            bundles: &'a [Bundle],
            planned_interventions: Vec<&'a str>,
        }
        return print_json(&RunOutput {
            run: run_name,
            bundles: &bundles,
            planned_interventions: manager
                .planned_interventions()
                .iter()
                .map(String::as_str)
                .collect(),
        });
    }

    let rows: Vec<Vec<String>> = bundles
        .iter()
        .map(|b| {
            vec![
                join(&b.decision_iterations),
                join(&b.timesteps),
                b.decision_links
                    .as_ref()
                    .map(|links| {
                        links
                            .iter()
                            .map(|(i, parent)| format!("{i}<-{parent}"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["ITERATIONS", "TIMESTEPS", "LINKS"], &rows);
    println!();
    println!(
        "{} bundle(s) written for run '{run_name}', {} intervention(s) planned.",
        bundles.len(),
        manager.planned_interventions().len()
    );
    Ok(())
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
