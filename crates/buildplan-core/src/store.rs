//! Storage collaborators.
//!
//! The decision core reads interventions, strategies and initial conditions
//! through [`Store`] and writes one state record list per
//! `(run, timestep, iteration)`. [`FileStore`] keeps everything as YAML under
//! a project directory; [`MemoryStore`] keeps it in maps.

use crate::config::{RunConfig, StrategyConfig};
use crate::error::{PlanError, Result};
use crate::intervention::Intervention;
use crate::io;
use crate::paths;
use crate::types::{Iteration, PlannedIntervention, StateEntry, Timestep};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub trait Store {
    /// Interventions declared by a sector model, keyed by name.
    fn read_interventions(&self, model: &str) -> Result<BTreeMap<String, Intervention>>;

    fn read_strategies(&self, run: &str) -> Result<Vec<StrategyConfig>>;

    /// Historical interventions of every sector model in the run.
    fn read_all_initial_conditions(&self, run: &str) -> Result<Vec<PlannedIntervention>>;

    fn write_state(
        &mut self,
        state: &[StateEntry],
        run: &str,
        timestep: Timestep,
        iteration: Iteration,
    ) -> Result<()>;

    /// Fails with [`PlanError::StateNotFound`] if nothing was written for the key.
    fn read_state(&self, run: &str, timestep: Timestep, iteration: Iteration)
        -> Result<Vec<StateEntry>>;

    /// Folder against which relative strategy `path`s are resolved.
    fn model_base_folder(&self) -> PathBuf;
}

fn state_not_found(run: &str, timestep: Timestep, iteration: Iteration) -> PlanError {
    PlanError::StateNotFound {
        run: run.to_string(),
        timestep,
        iteration,
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    interventions: BTreeMap<String, BTreeMap<String, Intervention>>,
    strategies: BTreeMap<String, Vec<StrategyConfig>>,
    initial_conditions: BTreeMap<String, Vec<PlannedIntervention>>,
    states: BTreeMap<(String, Timestep, Iteration), Vec<StateEntry>>,
    base_folder: PathBuf,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.base_folder = folder.into();
        self
    }

    pub fn with_interventions<I>(mut self, model: &str, interventions: I) -> Self
    where
        I: IntoIterator<Item = Intervention>,
    {
        let entry = self.interventions.entry(model.to_string()).or_default();
        for i in interventions {
            entry.insert(i.name.clone(), i);
        }
        self
    }

    pub fn with_strategies(mut self, run: &str, strategies: Vec<StrategyConfig>) -> Self {
        self.strategies.insert(run.to_string(), strategies);
        self
    }

    pub fn with_initial_conditions(
        mut self,
        run: &str,
        planned: Vec<PlannedIntervention>,
    ) -> Self {
        self.initial_conditions.insert(run.to_string(), planned);
        self
    }

    /// Every `(timestep, iteration)` written for `run`, in key order.
    pub fn written_keys(&self, run: &str) -> Vec<(Timestep, Iteration)> {
        self.states
            .keys()
            .filter(|(r, _, _)| r == run)
            .map(|(_, t, i)| (*t, *i))
            .collect()
    }
}

impl Store for MemoryStore {
    fn read_interventions(&self, model: &str) -> Result<BTreeMap<String, Intervention>> {
        Ok(self.interventions.get(model).cloned().unwrap_or_default())
    }

    fn read_strategies(&self, run: &str) -> Result<Vec<StrategyConfig>> {
        Ok(self.strategies.get(run).cloned().unwrap_or_default())
    }

    fn read_all_initial_conditions(&self, run: &str) -> Result<Vec<PlannedIntervention>> {
        Ok(self.initial_conditions.get(run).cloned().unwrap_or_default())
    }

    fn write_state(
        &mut self,
        state: &[StateEntry],
        run: &str,
        timestep: Timestep,
        iteration: Iteration,
    ) -> Result<()> {
        self.states
            .insert((run.to_string(), timestep, iteration), state.to_vec());
        Ok(())
    }

    fn read_state(
        &self,
        run: &str,
        timestep: Timestep,
        iteration: Iteration,
    ) -> Result<Vec<StateEntry>> {
        self.states
            .get(&(run.to_string(), timestep, iteration))
            .cloned()
            .ok_or_else(|| state_not_found(run, timestep, iteration))
    }

    fn model_base_folder(&self) -> PathBuf {
        self.base_folder.clone()
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// YAML files under a project root, laid out as described in [`paths`].
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read_run(&self, run: &str) -> Result<RunConfig> {
        RunConfig::load(&self.root, run)
    }
}

impl Store for FileStore {
    fn read_interventions(&self, model: &str) -> Result<BTreeMap<String, Intervention>> {
        let path = paths::interventions_path(&self.root, model);
        let list: Vec<Intervention> = io::read_yaml_opt(&path)?.unwrap_or_default();
        Ok(list.into_iter().map(|i| (i.name.clone(), i)).collect())
    }

    fn read_strategies(&self, run: &str) -> Result<Vec<StrategyConfig>> {
        let path = paths::strategies_path(&self.root, run);
        Ok(io::read_yaml_opt(&path)?.unwrap_or_default())
    }

    fn read_all_initial_conditions(&self, run: &str) -> Result<Vec<PlannedIntervention>> {
        let config = self.read_run(run)?;
        let mut planned = Vec::new();
        for model in &config.sector_models {
            let path = paths::initial_conditions_path(&self.root, model);
            let list: Vec<PlannedIntervention> = io::read_yaml_opt(&path)?.unwrap_or_default();
            planned.extend(list);
        }
        Ok(planned)
    }

    fn write_state(
        &mut self,
        state: &[StateEntry],
        run: &str,
        timestep: Timestep,
        iteration: Iteration,
    ) -> Result<()> {
        io::write_yaml(&paths::state_path(&self.root, run, timestep, iteration), state)
    }

    fn read_state(
        &self,
        run: &str,
        timestep: Timestep,
        iteration: Iteration,
    ) -> Result<Vec<StateEntry>> {
        let path = paths::state_path(&self.root, run, timestep, iteration);
        io::read_yaml_opt(&path)?.ok_or_else(|| state_not_found(run, timestep, iteration))
    }

    fn model_base_folder(&self) -> PathBuf {
        paths::models_dir(&self.root)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
