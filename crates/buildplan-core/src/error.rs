use crate::types::{Iteration, Timestep};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("intervention '{0}' is not found in the register of interventions")]
    InterventionNotFound(String),

    #[error("model run not found: {0}")]
    RunNotFound(String),

    #[error("no state stored for run '{run}' at timestep {timestep}, iteration {iteration}")]
    StateNotFound {
        run: String,
        timestep: Timestep,
        iteration: Iteration,
    },

    #[error("no previous timestep before {0}")]
    NoPreviousTimestep(Timestep),

    #[error("timestep {0} is not in the model run timesteps")]
    TimestepNotModelled(Timestep),

    #[error("decision '{name}' already exists in the decision history of {strategy}")]
    DuplicateDecision { strategy: String, name: String },

    #[error("intervention '{name}' decided with conflicting build years {years:?}")]
    ConflictingBuildYears { name: String, years: Vec<Timestep> },

    #[error("cannot use more than one type of strategy simultaneously: {}", .0.join(", "))]
    MixedStrategyTypes(Vec<String>),

    #[error("no strategy registered for type '{strategy_type}' with classname '{classname}'")]
    UnknownStrategy {
        strategy_type: String,
        classname: String,
    },

    #[error("strategy of type '{strategy_type}' is missing required field '{field}'")]
    MissingStrategyField {
        strategy_type: String,
        field: &'static str,
    },

    #[error("invalid strategy option '{option}': {reason}")]
    InvalidStrategyOption { option: String, reason: String },

    #[error("build year of '{name}' should be an integer but is {found}")]
    BuildYearType { name: String, found: String },

    #[error("build year of '{name}' must be a valid integer, received {value}")]
    InvalidBuildYear { name: String, value: String },

    #[error("lifetime of '{name}' cannot be negative, received {value}")]
    NegativeLifetime { name: String, value: i64 },

    #[error("invalid run configuration: {0}")]
    InvalidRunConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
