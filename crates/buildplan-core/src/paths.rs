use crate::types::{Iteration, Timestep};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const RUNS_DIR: &str = "runs";
pub const INTERVENTIONS_DIR: &str = "interventions";
pub const INITIAL_CONDITIONS_DIR: &str = "initial_conditions";
pub const STRATEGIES_DIR: &str = "strategies";
pub const MODELS_DIR: &str = "models";
pub const RESULTS_DIR: &str = "results";

const YAML_EXT: &str = "yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn run_config_path(root: &Path, run: &str) -> PathBuf {
    root.join(RUNS_DIR).join(format!("{run}.{YAML_EXT}"))
}

pub fn interventions_path(root: &Path, model: &str) -> PathBuf {
    root.join(INTERVENTIONS_DIR)
        .join(format!("{model}.{YAML_EXT}"))
}

pub fn initial_conditions_path(root: &Path, model: &str) -> PathBuf {
    root.join(INITIAL_CONDITIONS_DIR)
        .join(format!("{model}.{YAML_EXT}"))
}

pub fn strategies_path(root: &Path, run: &str) -> PathBuf {
    root.join(STRATEGIES_DIR).join(format!("{run}.{YAML_EXT}"))
}

pub fn models_dir(root: &Path) -> PathBuf {
    root.join(MODELS_DIR)
}

pub fn state_path(root: &Path, run: &str, timestep: Timestep, iteration: Iteration) -> PathBuf {
    root.join(RESULTS_DIR)
        .join(run)
        .join(format!("decision_{iteration}"))
        .join(format!("state_{timestep}.{YAML_EXT}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
