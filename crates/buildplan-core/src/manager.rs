//! Decision manager.
//!
//! Owns the intervention register and the strategies of one model run,
//! hands out [`Bundle`]s of work through [`DecisionManager::decision_loop`]
//! and writes the post-decision state for every `(timestep, iteration)` of
//! a bundle before the bundle reaches the caller.
//!
//! Post-decision state is the previous state, screened for interventions
//! past their lifetime, joined with the new decisions of every strategy.
//! The previous state comes from the dynamic strategy when one is
//! configured, otherwise from pre-specified planning.

use crate::config::StrategyConfig;
use crate::error::{PlanError, Result};
use crate::intervention::{self, Intervention, InterventionRegistry};
use crate::results::ResultsHandle;
use crate::store::Store;
use crate::strategy::{DecisionStrategy, PreSpecified, StrategyLoader, StrategySpec};
use crate::types::{Bundle, Decision, Iteration, PlannedIntervention, StateEntry, Timestep};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// DecisionManager
// ---------------------------------------------------------------------------

pub struct DecisionManager<S: Store> {
    store: S,
    run_name: String,
    timesteps: Vec<Timestep>,
    registry: InterventionRegistry,
    planned_interventions: BTreeSet<String>,
    pre_spec_planning: Option<PreSpecified>,
    decision_module: Option<Box<dyn DecisionStrategy>>,
}

impl<S: Store> DecisionManager<S> {
    /// Build the register from every sector model's interventions and set up
    /// the run's strategies.
    ///
    /// Fails with [`PlanError::MixedStrategyTypes`] when more than one
    /// non-pre-specified strategy type is configured.
    pub fn new(
        store: S,
        timesteps: Vec<Timestep>,
        run_name: impl Into<String>,
        sector_models: &[String],
        loader: &StrategyLoader,
    ) -> Result<Self> {
        let run_name = run_name.into();
        validate_timesteps(&run_name, &timesteps)?;

        let mut models = Vec::with_capacity(sector_models.len());
        for model in sector_models {
            models.push(store.read_interventions(model)?);
        }
        let registry = InterventionRegistry::merge(models);

        let strategies = store.read_strategies(&run_name)?;
        info!(run = %run_name, "{} strategies found", strategies.len());

        let mut manager = Self {
            store,
            run_name,
            timesteps,
            registry,
            planned_interventions: BTreeSet::new(),
            pre_spec_planning: None,
            decision_module: None,
        };
        manager.set_up_pre_spec_planning(&strategies)?;
        manager.set_up_decision_modules(&strategies, loader)?;
        Ok(manager)
    }

    fn set_up_pre_spec_planning(&mut self, strategies: &[StrategyConfig]) -> Result<()> {
        let mut planned: Vec<PlannedIntervention> =
            self.store.read_all_initial_conditions(&self.run_name)?;

        for (index, strategy) in strategies.iter().enumerate() {
            if strategy.is_pre_specified() {
                info!(
                    "Adding {} planned interventions to pre-specified-planning {}",
                    strategy.interventions.len(),
                    index
                );
                planned.extend(strategy.interventions.iter().cloned());
            }
        }

        if !planned.is_empty() {
            self.planned_interventions = planned.iter().map(|p| p.name.clone()).collect();
            self.pre_spec_planning = Some(PreSpecified::new(
                self.timesteps.clone(),
                self.registry.clone(),
                planned,
            ));
        }
        Ok(())
    }

    fn set_up_decision_modules(
        &mut self,
        strategies: &[StrategyConfig],
        loader: &StrategyLoader,
    ) -> Result<()> {
        let types: BTreeSet<&str> = strategies
            .iter()
            .filter(|s| !s.is_pre_specified())
            .map(|s| s.strategy_type.as_str())
            .collect();
        if types.len() > 1 {
            return Err(PlanError::MixedStrategyTypes(
                types.into_iter().map(str::to_string).collect(),
            ));
        }

        for strategy in strategies.iter().filter(|s| !s.is_pre_specified()) {
            let classname =
                strategy
                    .classname
                    .clone()
                    .ok_or_else(|| PlanError::MissingStrategyField {
                        strategy_type: strategy.strategy_type.clone(),
                        field: "classname",
                    })?;
            let base_folder = self.store.model_base_folder();
            let spec = StrategySpec {
                name: format!("{}_{}", classname, strategy.strategy_type),
                path: match strategy.path.as_deref() {
                    Some(path) => base_folder.join(path),
                    None => base_folder,
                },
                strategy_type: strategy.strategy_type.clone(),
                classname,
                timesteps: self.timesteps.clone(),
                registry: self.available_interventions(),
                options: strategy.options.clone(),
            };

            if let Some(previous) = &self.decision_module {
                warn!(
                    replaced = previous.name(),
                    by = %spec.name,
                    "only one strategy of a type is used; keeping the last configured"
                );
            }
            debug!(name = %spec.name, "Trying to load strategy");
            self.decision_module = Some(loader.load(spec)?);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------------

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn timesteps(&self) -> &[Timestep] {
        &self.timesteps
    }

    pub fn registry(&self) -> &InterventionRegistry {
        &self.registry
    }

    pub fn planned_interventions(&self) -> &BTreeSet<String> {
        &self.planned_interventions
    }

    pub fn pre_spec_planning(&self) -> Option<&PreSpecified> {
        self.pre_spec_planning.as_ref()
    }

    pub fn decision_module(&self) -> Option<&dyn DecisionStrategy> {
        self.decision_module.as_deref()
    }

    /// Register entries that are not already planned.
    pub fn available_interventions(&self) -> InterventionRegistry {
        self.registry.available(&self.planned_interventions)
    }

    pub fn get_intervention(&self, name: &str) -> Result<&Intervention> {
        self.registry.get(name)
    }

    pub fn update_planned_interventions<'d, I>(&mut self, decisions: I)
    where
        I: IntoIterator<Item = &'d Decision>,
    {
        self.planned_interventions
            .extend(decisions.into_iter().map(|d| d.name.clone()));
    }

    // ---------------------------------------------------------------------------
    // Decision loop
    // ---------------------------------------------------------------------------

    /// Lazily produce bundles of work. Each bundle's state is persisted
    /// before it is yielded; the caller runs its simulations before pulling
    /// the next one.
    ///
    /// Without a dynamic strategy there is exactly one bundle: iteration 0
    /// over every timestep.
    pub fn decision_loop(&mut self) -> DecisionLoop<'_, S> {
        debug!("Calling decision loop");
        DecisionLoop {
            manager: self,
            finished: false,
        }
    }

    fn save_bundle_decisions(&mut self, bundle: &Bundle) -> Result<()> {
        for (iteration, timestep) in bundle.pairs() {
            self.get_and_save_decisions(iteration, timestep)?;
        }
        Ok(())
    }

    /// Collect decisions for `(timestep, iteration)` from every strategy and
    /// write the post-decision state.
    pub fn get_and_save_decisions(&mut self, iteration: Iteration, timestep: Timestep) -> Result<()> {
        let view = ResultsHandle::new(
            &self.store,
            &self.run_name,
            &self.timesteps,
            timestep,
            iteration,
        );

        let previous = if let Some(module) = &self.decision_module {
            module.get_previous_state(&view)?
        } else if let Some(pre_spec) = &self.pre_spec_planning {
            pre_spec.get_previous_state(&view)?
        } else {
            Vec::new()
        };
        let pre_decision_state = screen_expired(&self.registry, previous, timestep)?;
        debug!(
            "Pre-decision state at timestep {} and iteration {}: {:?}",
            timestep, iteration, pre_decision_state
        );

        let mut new_decisions = BTreeSet::new();
        if let Some(module) = self.decision_module.as_mut() {
            new_decisions.extend(module.get_decision(&view)?);
        }
        if let Some(pre_spec) = self.pre_spec_planning.as_mut() {
            new_decisions.extend(pre_spec.get_decision(&view)?);
        }
        debug!(
            "New decisions at timestep {} and iteration {}: {:?}",
            timestep, iteration, new_decisions
        );

        let post_decision_state: BTreeSet<Decision> =
            pre_decision_state.union(&new_decisions).cloned().collect();
        check_build_years(&post_decision_state)?;
        self.update_planned_interventions(&new_decisions);
        debug!(
            "Post-decision state at timestep {} and iteration {}: {:?}",
            timestep, iteration, post_decision_state
        );

        let mut entries: Vec<StateEntry> = post_decision_state.iter().map(StateEntry::from).collect();
        if entries.is_empty() {
            entries.push(StateEntry::placeholder());
        }
        debug!("Writing state for timestep {} and iteration {}", timestep, iteration);
        self.store
            .write_state(&entries, &self.run_name, timestep, iteration)
    }
}

// ---------------------------------------------------------------------------
// DecisionLoop
// ---------------------------------------------------------------------------

/// Iterator returned by [`DecisionManager::decision_loop`]. Stops after the
/// first error.
pub struct DecisionLoop<'m, S: Store> {
    manager: &'m mut DecisionManager<S>,
    finished: bool,
}

impl<S: Store> Iterator for DecisionLoop<'_, S> {
    type Item = Result<Bundle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let bundle = match self.manager.decision_module.as_mut() {
            Some(module) => match module.next_bundle() {
                Some(bundle) => bundle,
                None => {
                    self.finished = true;
                    return None;
                }
            },
            None => {
                self.finished = true;
                Bundle::new(vec![0], self.manager.timesteps.clone())
            }
        };
        debug!("Bundle returned: {:?}", bundle);

        if let Err(e) = self.manager.save_bundle_decisions(&bundle) {
            self.finished = true;
            return Some(Err(e));
        }
        Some(Ok(bundle))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_timesteps(run: &str, timesteps: &[Timestep]) -> Result<()> {
    if timesteps.is_empty() {
        return Err(PlanError::InvalidRunConfig(format!("run '{run}' has no timesteps")));
    }
    if timesteps.windows(2).any(|w| w[0] >= w[1]) {
        return Err(PlanError::InvalidRunConfig(format!(
            "run '{run}' timesteps must be strictly increasing"
        )));
    }
    Ok(())
}

/// Drop decisions whose intervention is past its lifetime at `timestep`.
fn screen_expired(
    registry: &InterventionRegistry,
    state: Vec<Decision>,
    timestep: Timestep,
) -> Result<BTreeSet<Decision>> {
    let mut kept = BTreeSet::new();
    for decision in state {
        let lifetime = registry.lifetime_of(&decision.name)?;
        if intervention::within_lifetime(decision.build_year, timestep, lifetime) {
            kept.insert(decision);
        }
    }
    Ok(kept)
}

/// An intervention may appear once per state; two build years for one name
/// means two strategies disagree.
fn check_build_years(state: &BTreeSet<Decision>) -> Result<()> {
    let mut years: BTreeMap<&str, Vec<Timestep>> = BTreeMap::new();
    for d in state {
        years.entry(d.name.as_str()).or_default().push(d.build_year);
    }
    match years.into_iter().find(|(_, y)| y.len() > 1) {
        Some((name, years)) => Err(PlanError::ConflictingBuildYears {
            name: name.to_string(),
            years,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
