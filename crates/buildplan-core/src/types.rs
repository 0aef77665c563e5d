use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A modelled year.
pub type Timestep = i64;

/// Decision iteration id. Distinguishes alternative decision attempts at the
/// same or different timesteps.
pub type Iteration = u32;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The choice to activate a named intervention in a given build year.
///
/// Ordering is `(build_year, name)`, which is also the persisted order of a
/// post-decision state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Decision {
    pub build_year: Timestep,
    pub name: String,
}

impl Decision {
    pub fn new(name: impl Into<String>, build_year: Timestep) -> Self {
        Self {
            build_year,
            name: name.into(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.build_year)
    }
}

// ---------------------------------------------------------------------------
// BuildYear / PlannedIntervention
// ---------------------------------------------------------------------------

/// Build year as written in planning data. Only coerced to a [`Timestep`]
/// when a strategy evaluates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildYear {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl BuildYear {
    /// Coerce to a whole year. Fractional years are truncated.
    pub fn to_year(&self, name: &str) -> Result<Timestep> {
        match self {
            BuildYear::Integer(y) => Ok(*y),
            BuildYear::Float(f) if f.is_finite() => Ok(f.trunc() as Timestep),
            BuildYear::Float(f) => Err(PlanError::InvalidBuildYear {
                name: name.to_string(),
                value: f.to_string(),
            }),
            BuildYear::Text(s) => s.trim().parse::<Timestep>().map_err(|_| {
                PlanError::BuildYearType {
                    name: name.to_string(),
                    found: format!("text '{s}'"),
                }
            }),
        }
    }
}

impl From<Timestep> for BuildYear {
    fn from(year: Timestep) -> Self {
        BuildYear::Integer(year)
    }
}

impl fmt::Display for BuildYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildYear::Integer(y) => write!(f, "{y}"),
            BuildYear::Float(v) => write!(f, "{v}"),
            BuildYear::Text(s) => f.write_str(s),
        }
    }
}

/// A historical or pre-specified build, as read from initial conditions or
/// a `pre-specified-planning` strategy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedIntervention {
    pub name: String,
    pub build_year: BuildYear,
}

impl PlannedIntervention {
    pub fn new(name: impl Into<String>, build_year: impl Into<BuildYear>) -> Self {
        Self {
            name: name.into(),
            build_year: build_year.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StateEntry (persisted format)
// ---------------------------------------------------------------------------

/// One record of a persisted state file.
///
/// An empty state is stored as a single placeholder record with an empty
/// name and no build year, never as an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub name: String,
    #[serde(default)]
    pub build_year: Option<Timestep>,
}

impl StateEntry {
    pub fn placeholder() -> Self {
        Self {
            name: String::new(),
            build_year: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.build_year.is_none()
    }

    pub fn to_decision(&self) -> Option<Decision> {
        match self.build_year {
            Some(year) if !self.name.is_empty() => Some(Decision::new(self.name.clone(), year)),
            _ => None,
        }
    }
}

impl From<&Decision> for StateEntry {
    fn from(d: &Decision) -> Self {
        Self {
            name: d.name.clone(),
            build_year: Some(d.build_year),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// A unit of schedulable work: every listed decision iteration is run for
/// every listed timestep.
///
/// `decision_links` maps an iteration of this bundle to the iteration whose
/// state it extends. It is only present when the bundle does not start at
/// the first timestep of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub decision_iterations: Vec<Iteration>,
    pub timesteps: Vec<Timestep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_links: Option<BTreeMap<Iteration, Iteration>>,
}

impl Bundle {
    pub fn new(decision_iterations: Vec<Iteration>, timesteps: Vec<Timestep>) -> Self {
        Self {
            decision_iterations,
            timesteps,
            decision_links: None,
        }
    }

    pub fn with_link(mut self, iteration: Iteration, parent: Iteration) -> Self {
        self.decision_links
            .get_or_insert_with(BTreeMap::new)
            .insert(iteration, parent);
        self
    }

    /// The iteration that `iteration` extends, if linked.
    pub fn parent_of(&self, iteration: Iteration) -> Option<Iteration> {
        self.decision_links
            .as_ref()
            .and_then(|links| links.get(&iteration).copied())
    }

    /// All `(iteration, timestep)` pairs, iteration-major.
    pub fn pairs(&self) -> impl Iterator<Item = (Iteration, Timestep)> + '_ {
        self.decision_iterations
            .iter()
            .flat_map(move |&i| self.timesteps.iter().map(move |&t| (i, t)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
