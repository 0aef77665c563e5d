use crate::error::{PlanError, Result};
use crate::paths;
use crate::types::{PlannedIntervention, Timestep};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const PRE_SPECIFIED_PLANNING: &str = "pre-specified-planning";
pub const RULE_BASED: &str = "rule-based";

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// A model run: which sector models take part and over which timesteps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub timesteps: Vec<Timestep>,
    pub sector_models: Vec<String>,
}

impl RunConfig {
    pub fn new(
        name: impl Into<String>,
        timesteps: Vec<Timestep>,
        sector_models: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            timesteps,
            sector_models,
        }
    }

    pub fn load(root: &Path, run: &str) -> Result<Self> {
        let path = paths::run_config_path(root, run);
        if !path.exists() {
            return Err(PlanError::RunNotFound(run.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let config: RunConfig = serde_yaml::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::run_config_path(root, &self.name), self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timesteps.is_empty() {
            return Err(PlanError::InvalidRunConfig(format!(
                "run '{}' has no timesteps",
                self.name
            )));
        }
        if let Some(pair) = self.timesteps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PlanError::InvalidRunConfig(format!(
                "run '{}' timesteps must be strictly increasing ({} then {})",
                self.name, pair[0], pair[1]
            )));
        }
        if self.sector_models.is_empty() {
            return Err(PlanError::InvalidRunConfig(format!(
                "run '{}' has no sector models",
                self.name
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StrategyConfig
// ---------------------------------------------------------------------------

/// A strategy entry of a model run.
///
/// `pre-specified-planning` entries list their interventions directly;
/// other types name a `classname` (and optionally a `path`) for the
/// strategy loader to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(alias = "type")]
    pub strategy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interventions: Vec<PlannedIntervention>,
    /// Strategy-specific parameters, passed through to the constructor.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_yaml::Value>,
}

impl StrategyConfig {
    pub fn pre_specified(interventions: Vec<PlannedIntervention>) -> Self {
        Self {
            strategy_type: PRE_SPECIFIED_PLANNING.to_string(),
            classname: None,
            path: None,
            description: None,
            interventions,
            options: BTreeMap::new(),
        }
    }

    pub fn dynamic(strategy_type: impl Into<String>, classname: impl Into<String>) -> Self {
        Self {
            strategy_type: strategy_type.into(),
            classname: Some(classname.into()),
            path: None,
            description: None,
            interventions: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn is_pre_specified(&self) -> bool {
        self.strategy_type == PRE_SPECIFIED_PLANNING
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildYear;
    use tempfile::TempDir;

    #[test]
    fn run_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let run = RunConfig::new(
            "energy_central",
            vec![2010, 2015, 2020],
            vec!["energy_demand".to_string()],
        );
        run.save(dir.path()).unwrap();

        let loaded = RunConfig::load(dir.path(), "energy_central").unwrap();
        assert_eq!(loaded, run);
    }

    #[test]
    fn missing_run_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            RunConfig::load(dir.path(), "nope"),
            Err(PlanError::RunNotFound(ref r)) if r == "nope"
        ));
    }

    #[test]
    fn timesteps_must_increase() {
        let run = RunConfig::new("r", vec![2010, 2010], vec!["m".to_string()]);
        assert!(matches!(run.validate(), Err(PlanError::InvalidRunConfig(_))));

        let run = RunConfig::new("r", vec![], vec!["m".to_string()]);
        assert!(matches!(run.validate(), Err(PlanError::InvalidRunConfig(_))));

        let run = RunConfig::new("r", vec![2010], vec![]);
        assert!(matches!(run.validate(), Err(PlanError::InvalidRunConfig(_))));
    }

    #[test]
    fn strategy_records_parse() {
        let yaml = r#"
- type: pre-specified-planning
  description: build nuclear
  interventions:
    - {name: nuclear_large, build_year: 2012}
- strategy_type: rule-based
  classname: IterationLimit
  path: planning/rules.py
  options: {max_iterations: 3}
"#;
        let strategies: Vec<StrategyConfig> = serde_yaml::from_str(yaml).unwrap();
        assert!(strategies[0].is_pre_specified());
        assert_eq!(
            strategies[0].interventions[0].build_year,
            BuildYear::Integer(2012)
        );
        assert!(!strategies[1].is_pre_specified());
        assert_eq!(strategies[1].classname.as_deref(), Some("IterationLimit"));
        assert_eq!(
            strategies[1].options.get("max_iterations"),
            Some(&serde_yaml::Value::from(3))
        );
    }
}
