use super::{DecisionHistory, DecisionStrategy};
use crate::config::PRE_SPECIFIED_PLANNING;
use crate::error::{PlanError, Result};
use crate::intervention::{self, InterventionRegistry, Lifetime};
use crate::results::ResultsView;
use crate::types::{Bundle, BuildYear, Decision, Iteration, PlannedIntervention, Timestep};

/// Replays a fixed schedule of historical and planned builds.
///
/// A planned intervention is part of the decisions at a timestep when it is
/// both buildable (its build year falls before the next modelled timestep)
/// and still within its technical lifetime.
pub struct PreSpecified {
    timesteps: Vec<Timestep>,
    registry: InterventionRegistry,
    planned: Vec<PlannedIntervention>,
    history: DecisionHistory,
    issued: bool,
}

impl PreSpecified {
    pub fn new(
        timesteps: Vec<Timestep>,
        registry: InterventionRegistry,
        planned: Vec<PlannedIntervention>,
    ) -> Self {
        Self {
            timesteps,
            registry,
            planned,
            history: DecisionHistory::new(PRE_SPECIFIED_PLANNING),
            issued: false,
        }
    }

    pub fn planned(&self) -> &[PlannedIntervention] {
        &self.planned
    }

    /// True when `build_year` is earlier than the timestep following
    /// `timestep` (or `timestep + 1` at the end of the run).
    ///
    /// With timesteps `[2005, 2010, 2015, 2020]` a build in 2011 is
    /// buildable from 2010 onwards.
    pub fn buildable(&self, name: &str, build_year: &BuildYear, timestep: Timestep) -> Result<bool> {
        let build_year = build_year.to_year(name)?;
        let index = self
            .timesteps
            .iter()
            .position(|&t| t == timestep)
            .ok_or(PlanError::TimestepNotModelled(timestep))?;
        let next_year = self
            .timesteps
            .get(index + 1)
            .copied()
            .unwrap_or_else(|| timestep.saturating_add(1));
        Ok(build_year < next_year)
    }

    /// True while `timestep <= build_year + lifetime`.
    pub fn within_lifetime(
        &self,
        name: &str,
        build_year: &BuildYear,
        timestep: Timestep,
        lifetime: Lifetime,
    ) -> Result<bool> {
        let build_year = build_year.to_year(name)?;
        Ok(intervention::within_lifetime(build_year, timestep, lifetime))
    }

    /// State at the previous timestep for `iteration`, defaulting to the
    /// view's own iteration. Empty at the first timestep or when nothing was
    /// stored for the previous timestep.
    pub fn previous_state_at(
        &self,
        view: &dyn ResultsView,
        iteration: Option<Iteration>,
    ) -> Result<Vec<Decision>> {
        let prev_timestep = match view.previous_timestep() {
            Ok(t) => t,
            Err(PlanError::NoPreviousTimestep(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let prev_iteration = iteration.unwrap_or_else(|| view.decision_iteration());
        match view.get_state(prev_timestep, prev_iteration) {
            Ok(state) => Ok(state),
            Err(PlanError::StateNotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

impl DecisionStrategy for PreSpecified {
    fn name(&self) -> &str {
        PRE_SPECIFIED_PLANNING
    }

    fn registry(&self) -> &InterventionRegistry {
        &self.registry
    }

    fn history(&self) -> &DecisionHistory {
        &self.history
    }

    fn next_bundle(&mut self) -> Option<Bundle> {
        if self.issued {
            return None;
        }
        self.issued = true;
        Some(Bundle::new(vec![0], self.timesteps.clone()))
    }

    fn get_decision(&mut self, view: &dyn ResultsView) -> Result<Vec<Decision>> {
        let timestep = view.current_timestep();
        let mut decisions = Vec::new();
        for planned in &self.planned {
            let build_year = planned.build_year.to_year(&planned.name)?;
            let lifetime = self.registry.lifetime_of(&planned.name)?;
            if self.buildable(&planned.name, &planned.build_year, timestep)?
                && intervention::within_lifetime(build_year, timestep, lifetime)
            {
                decisions.push(Decision::new(planned.name.clone(), build_year));
            }
        }
        Ok(decisions)
    }

    fn get_previous_state(&self, view: &dyn ResultsView) -> Result<Vec<Decision>> {
        self.previous_state_at(view, None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
