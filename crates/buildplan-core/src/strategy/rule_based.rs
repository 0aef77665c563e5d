use super::{DecisionHistory, DecisionStrategy, StrategySpec};
use crate::error::{PlanError, Result};
use crate::intervention::InterventionRegistry;
use crate::results::ResultsView;
use crate::types::{Bundle, Decision, Iteration, Timestep};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Decision logic driven by [`RuleBased`].
///
/// Called once per `(timestep, iteration)`. Marking the context satisfied
/// moves the search on to the next timestep, or ends it at the last one.
pub trait Rules: Send {
    fn decide(&mut self, cx: &mut RuleContext<'_>, view: &dyn ResultsView) -> Result<Vec<Decision>>;
}

/// What rules see of the search while deciding.
pub struct RuleContext<'a> {
    pub current_timestep: Timestep,
    pub current_iteration: Iteration,
    registry: &'a InterventionRegistry,
    history: &'a mut DecisionHistory,
    satisfied: &'a mut bool,
}

impl RuleContext<'_> {
    pub fn satisfy(&mut self) {
        *self.satisfied = true;
    }

    pub fn is_satisfied(&self) -> bool {
        *self.satisfied
    }

    pub fn registry(&self) -> &InterventionRegistry {
        self.registry
    }

    pub fn history(&self) -> &DecisionHistory {
        self.history
    }

    pub fn available_interventions(&self) -> InterventionRegistry {
        self.registry.available(self.history.names())
    }

    /// Add decisions to the strategy's history. Fails if any intervention
    /// was already decided.
    pub fn record(&mut self, decisions: &[Decision]) -> Result<()> {
        self.history.record_all(decisions)
    }
}

/// Never decides and never satisfies; the search only advances when the
/// satisfied flag is set from outside.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRules;

impl Rules for NoRules {
    fn decide(&mut self, _cx: &mut RuleContext<'_>, _view: &dyn ResultsView) -> Result<Vec<Decision>> {
        Ok(Vec::new())
    }
}

/// Runs a fixed number of iterations at every timestep.
#[derive(Debug, Clone)]
pub struct IterationLimit {
    max_iterations: u32,
    seen: BTreeMap<Timestep, u32>,
}

impl IterationLimit {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            seen: BTreeMap::new(),
        }
    }
}

impl Rules for IterationLimit {
    fn decide(&mut self, cx: &mut RuleContext<'_>, _view: &dyn ResultsView) -> Result<Vec<Decision>> {
        let count = self.seen.entry(cx.current_timestep).or_insert(0);
        *count += 1;
        if *count >= self.max_iterations {
            cx.satisfy();
        }
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// RuleBased
// ---------------------------------------------------------------------------

/// Searches one `(iteration, timestep)` at a time.
///
/// While unsatisfied every bundle is a fresh iteration at the current
/// timestep. Once satisfied, the current iteration is recorded as final for
/// the timestep and the search moves to the next timestep, linking its first
/// iteration back to that final one. Satisfied at the last timestep ends the
/// search.
pub struct RuleBased<R: Rules = NoRules> {
    name: String,
    timesteps: Vec<Timestep>,
    registry: InterventionRegistry,
    history: DecisionHistory,
    rules: R,
    satisfied: bool,
    current_timestep: Timestep,
    current_iteration: Iteration,
    /// Final iteration reached at each finished timestep.
    max_iteration_by_timestep: BTreeMap<Timestep, Iteration>,
}

impl<R: Rules> RuleBased<R> {
    pub fn new(
        name: impl Into<String>,
        timesteps: Vec<Timestep>,
        registry: InterventionRegistry,
        rules: R,
    ) -> Result<Self> {
        let name = name.into();
        let first = *timesteps
            .first()
            .ok_or_else(|| PlanError::InvalidRunConfig(format!("strategy '{name}' has no timesteps")))?;
        Ok(Self {
            history: DecisionHistory::new(name.clone()),
            name,
            timesteps,
            registry,
            rules,
            satisfied: false,
            current_timestep: first,
            current_iteration: 0,
            max_iteration_by_timestep: BTreeMap::from([(first, 0)]),
        })
    }

    pub fn first_timestep(&self) -> Timestep {
        self.timesteps[0]
    }

    pub fn last_timestep(&self) -> Timestep {
        self.timesteps[self.timesteps.len() - 1]
    }

    pub fn current_timestep(&self) -> Timestep {
        self.current_timestep
    }

    pub fn current_iteration(&self) -> Iteration {
        self.current_iteration
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn set_satisfied(&mut self, satisfied: bool) {
        self.satisfied = satisfied;
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn next_timestep(&self) -> Option<Timestep> {
        let index = self.current_index()?;
        self.timesteps.get(index + 1).copied()
    }

    pub fn previous_timestep(&self) -> Option<Timestep> {
        let index = self.current_index()?;
        index.checked_sub(1).map(|i| self.timesteps[i])
    }

    /// Final iteration recorded for the timestep before the current one.
    pub fn previous_year_iteration(&self) -> Option<Iteration> {
        self.previous_timestep()
            .and_then(|t| self.max_iteration_by_timestep.get(&t).copied())
    }

    fn current_index(&self) -> Option<usize> {
        self.timesteps
            .iter()
            .position(|&t| t == self.current_timestep)
    }

    fn make_bundle(&self) -> Bundle {
        let bundle = Bundle::new(vec![self.current_iteration], vec![self.current_timestep]);
        match self.previous_year_iteration() {
            Some(parent) if self.current_timestep != self.first_timestep() => {
                bundle.with_link(self.current_iteration, parent)
            }
            _ => bundle,
        }
    }
}

impl<R: Rules> DecisionStrategy for RuleBased<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn registry(&self) -> &InterventionRegistry {
        &self.registry
    }

    fn history(&self) -> &DecisionHistory {
        &self.history
    }

    fn next_bundle(&mut self) -> Option<Bundle> {
        if self.satisfied {
            let next = self.next_timestep()?;
            self.max_iteration_by_timestep
                .insert(self.current_timestep, self.current_iteration);
            self.satisfied = false;
            self.current_timestep = next;
        }
        self.current_iteration += 1;
        let bundle = self.make_bundle();
        tracing::debug!(
            timestep = self.current_timestep,
            iteration = self.current_iteration,
            "rule-based bundle"
        );
        Some(bundle)
    }

    fn get_decision(&mut self, view: &dyn ResultsView) -> Result<Vec<Decision>> {
        let mut cx = RuleContext {
            current_timestep: self.current_timestep,
            current_iteration: self.current_iteration,
            registry: &self.registry,
            history: &mut self.history,
            satisfied: &mut self.satisfied,
        };
        self.rules.decide(&mut cx, view)
    }

    fn get_previous_state(&self, view: &dyn ResultsView) -> Result<Vec<Decision>> {
        if self.current_timestep == self.first_timestep() {
            return Ok(Vec::new());
        }
        match (self.previous_timestep(), self.previous_year_iteration()) {
            (Some(t), Some(i)) => view.get_state(t, i),
            _ => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in constructors
// ---------------------------------------------------------------------------

pub(super) fn load_rule_based(spec: StrategySpec) -> Result<Box<dyn DecisionStrategy>> {
    let strategy = RuleBased::new(spec.name, spec.timesteps, spec.registry, NoRules)?;
    Ok(Box::new(strategy))
}

pub(super) fn load_iteration_limit(spec: StrategySpec) -> Result<Box<dyn DecisionStrategy>> {
    let max_iterations = spec.option_u32("max_iterations")?.unwrap_or(1);
    if max_iterations == 0 {
        return Err(PlanError::InvalidStrategyOption {
            option: "max_iterations".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let rules = IterationLimit::new(max_iterations);
    let strategy = RuleBased::new(spec.name, spec.timesteps, spec.registry, rules)?;
    Ok(Box::new(strategy))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
