//! Decision strategies.
//!
//! A strategy is pulled for [`Bundle`]s of work and asked, per
//! `(timestep, iteration)`, for the state it carries forward and the
//! decisions it adds. [`PreSpecified`] replays a fixed build schedule;
//! [`RuleBased`] searches one iteration at a time until its rules are
//! satisfied. Other strategies are plugged in through [`StrategyLoader`].

pub mod pre_specified;
pub mod rule_based;

pub use pre_specified::PreSpecified;
pub use rule_based::{IterationLimit, NoRules, RuleBased, RuleContext, Rules};

use crate::config::RULE_BASED;
use crate::error::{PlanError, Result};
use crate::intervention::{Intervention, InterventionRegistry};
use crate::results::ResultsView;
use crate::types::{Bundle, Decision, Timestep};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// DecisionStrategy
// ---------------------------------------------------------------------------

pub trait DecisionStrategy: Send {
    fn name(&self) -> &str;

    /// Register of interventions this strategy may decide on.
    fn registry(&self) -> &InterventionRegistry;

    fn history(&self) -> &DecisionHistory;

    /// Next unit of work, or `None` once the strategy has nothing left.
    /// Keeps returning `None` after exhaustion.
    fn next_bundle(&mut self) -> Option<Bundle>;

    /// Decisions contributed at the view's current timestep and iteration.
    fn get_decision(&mut self, view: &dyn ResultsView) -> Result<Vec<Decision>>;

    /// State carried forward from the preceding timestep.
    fn get_previous_state(&self, view: &dyn ResultsView) -> Result<Vec<Decision>>;

    /// Register entries not yet in this strategy's decision history.
    fn available_interventions(&self) -> InterventionRegistry {
        self.registry().available(self.history().names())
    }

    fn get_intervention(&self, name: &str) -> Result<&Intervention> {
        self.registry().get(name)
    }
}

// ---------------------------------------------------------------------------
// DecisionHistory
// ---------------------------------------------------------------------------

/// Names of interventions a strategy has decided on. Deciding the same
/// intervention twice is a [`PlanError::DuplicateDecision`].
#[derive(Debug, Clone, Default)]
pub struct DecisionHistory {
    owner: String,
    names: BTreeSet<String>,
}

impl DecisionHistory {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            names: BTreeSet::new(),
        }
    }

    pub fn record(&mut self, name: &str) -> Result<()> {
        if self.names.contains(name) {
            return Err(self.duplicate(name));
        }
        self.names.insert(name.to_string());
        Ok(())
    }

    /// Record every decision, or none of them if any name is a duplicate.
    pub fn record_all(&mut self, decisions: &[Decision]) -> Result<()> {
        let mut batch = BTreeSet::new();
        for d in decisions {
            if self.names.contains(&d.name) || !batch.insert(d.name.as_str()) {
                return Err(self.duplicate(&d.name));
            }
        }
        self.names.extend(batch.into_iter().map(str::to_string));
        tracing::debug!(owner = %self.owner, size = self.names.len(), "decision history updated");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn duplicate(&self, name: &str) -> PlanError {
        PlanError::DuplicateDecision {
            strategy: self.owner.clone(),
            name: name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// StrategyLoader
// ---------------------------------------------------------------------------

/// Everything a strategy constructor receives.
#[derive(Debug, Clone)]
pub struct StrategySpec {
    pub strategy_type: String,
    pub classname: String,
    /// Store base folder joined with the configured path.
    pub path: PathBuf,
    pub timesteps: Vec<Timestep>,
    /// Interventions not already planned when the strategy was loaded.
    pub registry: InterventionRegistry,
    /// `<classname>_<strategy_type>`
    pub name: String,
    pub options: BTreeMap<String, serde_yaml::Value>,
}

impl StrategySpec {
    pub fn option_u32(&self, key: &str) -> Result<Option<u32>> {
        let Some(value) = self.options.get(key) else {
            return Ok(None);
        };
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| PlanError::InvalidStrategyOption {
                option: key.to_string(),
                reason: format!("expected a non-negative integer, got {value:?}"),
            })
    }
}

pub type StrategyConstructor = fn(StrategySpec) -> Result<Box<dyn DecisionStrategy>>;

/// Maps `(strategy_type, classname)` to a constructor.
pub struct StrategyLoader {
    constructors: BTreeMap<(String, String), StrategyConstructor>,
}

impl StrategyLoader {
    /// A loader with no constructors registered.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A loader with the built-in rule-based strategies registered.
    pub fn new() -> Self {
        let mut loader = Self::empty();
        loader.register(RULE_BASED, "RuleBased", rule_based::load_rule_based);
        loader.register(RULE_BASED, "IterationLimit", rule_based::load_iteration_limit);
        loader
    }

    pub fn register(
        &mut self,
        strategy_type: impl Into<String>,
        classname: impl Into<String>,
        constructor: StrategyConstructor,
    ) {
        self.constructors
            .insert((strategy_type.into(), classname.into()), constructor);
    }

    pub fn is_registered(&self, strategy_type: &str, classname: &str) -> bool {
        self.constructors
            .contains_key(&(strategy_type.to_string(), classname.to_string()))
    }

    pub fn load(&self, spec: StrategySpec) -> Result<Box<dyn DecisionStrategy>> {
        let key = (spec.strategy_type.clone(), spec.classname.clone());
        let constructor = self
            .constructors
            .get(&key)
            .ok_or_else(|| PlanError::UnknownStrategy {
                strategy_type: key.0.clone(),
                classname: key.1.clone(),
            })?;
        tracing::debug!(name = %spec.name, path = %spec.path.display(), "loading strategy");
        constructor(spec)
    }
}

impl Default for StrategyLoader {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
