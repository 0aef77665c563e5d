use crate::error::{PlanError, Result};
use crate::types::Timestep;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Lifetime
// ---------------------------------------------------------------------------

/// How long an intervention stays active after its build year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Years(u64),
    Infinite,
}

/// Active while `timestep <= build_year + lifetime`.
pub fn within_lifetime(build_year: Timestep, timestep: Timestep, lifetime: Lifetime) -> bool {
    match lifetime {
        Lifetime::Infinite => true,
        Lifetime::Years(years) => {
            let years = i64::try_from(years).unwrap_or(i64::MAX);
            timestep <= build_year.saturating_add(years)
        }
    }
}

/// Persisted `technical_lifetime` attribute: `{value: 40, units: years}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalLifetime {
    pub value: serde_yaml::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl TechnicalLifetime {
    pub fn years(years: u64) -> Self {
        Self {
            value: serde_yaml::Value::from(years),
            units: Some("years".to_string()),
        }
    }

    /// Interpret the raw value. Numbers are truncated to whole years; a
    /// string must hold an integer. Anything else is an infinite lifetime,
    /// and a negative whole number of years is an error.
    pub fn lifetime(&self, name: &str) -> Result<Lifetime> {
        let years = match &self.value {
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(v) => Some(v),
                None => n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64),
            },
            serde_yaml::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match years {
            Some(v) if v < 0 => Err(PlanError::NegativeLifetime {
                name: name.to_string(),
                value: v,
            }),
            Some(v) => Ok(Lifetime::Years(v as u64)),
            _ => Ok(Lifetime::Infinite),
        }
    }
}

// ---------------------------------------------------------------------------
// Intervention
// ---------------------------------------------------------------------------

/// A candidate asset. Fields other than name and lifetime are carried along
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub name: String,
    pub technical_lifetime: TechnicalLifetime,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_yaml::Value>,
}

impl Intervention {
    pub fn new(name: impl Into<String>, lifetime_years: u64) -> Self {
        Self {
            name: name.into(),
            technical_lifetime: TechnicalLifetime::years(lifetime_years),
            attributes: BTreeMap::new(),
        }
    }

    pub fn lifetime(&self) -> Result<Lifetime> {
        self.technical_lifetime.lifetime(&self.name)
    }
}

// ---------------------------------------------------------------------------
// InterventionRegistry
// ---------------------------------------------------------------------------

/// Read-only register of interventions keyed by name.
///
/// Cloning shares the underlying map; there are no mutation methods, a new
/// registry is built instead.
#[derive(Debug, Clone, Default)]
pub struct InterventionRegistry {
    entries: Arc<BTreeMap<String, Intervention>>,
}

impl InterventionRegistry {
    pub fn new(entries: BTreeMap<String, Intervention>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Merge the interventions declared by several models. A later model's
    /// entry replaces an earlier one with the same name.
    pub fn merge<I>(models: I) -> Self
    where
        I: IntoIterator<Item = BTreeMap<String, Intervention>>,
    {
        let mut entries = BTreeMap::new();
        for model in models {
            entries.extend(model);
        }
        Self::new(entries)
    }

    pub fn get(&self, name: &str) -> Result<&Intervention> {
        self.entries
            .get(name)
            .ok_or_else(|| PlanError::InterventionNotFound(name.to_string()))
    }

    pub fn lifetime_of(&self, name: &str) -> Result<Lifetime> {
        self.get(name)?.lifetime()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intervention> {
        self.entries.values()
    }

    /// Snapshot of the entries whose names are not in `excluding`.
    pub fn available(&self, excluding: &BTreeSet<String>) -> InterventionRegistry {
        let entries = self
            .entries
            .iter()
            .filter(|(name, _)| !excluding.contains(*name))
            .map(|(name, i)| (name.clone(), i.clone()))
            .collect();
        Self::new(entries)
    }
}

impl FromIterator<Intervention> for InterventionRegistry {
    fn from_iter<T: IntoIterator<Item = Intervention>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|i| (i.name.clone(), i)).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lifetime_of(yaml: &str) -> Result<Lifetime> {
        let tl: TechnicalLifetime = serde_yaml::from_str(yaml).unwrap();
        tl.lifetime("x")
    }

    #[test]
    fn lifetime_parsing() {
        assert_eq!(lifetime_of("value: 10").unwrap(), Lifetime::Years(10));
        assert_eq!(lifetime_of("value: 12.9").unwrap(), Lifetime::Years(12));
        assert_eq!(lifetime_of("value: '25'").unwrap(), Lifetime::Years(25));
        assert_eq!(lifetime_of("value: forever").unwrap(), Lifetime::Infinite);
        assert_eq!(lifetime_of("value: ~").unwrap(), Lifetime::Infinite);
        assert_eq!(lifetime_of("value: .inf").unwrap(), Lifetime::Infinite);
        // A fractional string is not a whole number of years.
        assert_eq!(lifetime_of("value: '12.9'").unwrap(), Lifetime::Infinite);
    }

    #[test]
    fn small_negative_fraction_truncates_to_zero() {
        assert_eq!(lifetime_of("value: -0.5").unwrap(), Lifetime::Years(0));
        assert!(matches!(
            lifetime_of("value: '-3'"),
            Err(PlanError::NegativeLifetime { .. })
        ));
    }

    #[test]
    fn negative_lifetime_is_rejected() {
        assert!(matches!(
            lifetime_of("value: -1"),
            Err(PlanError::NegativeLifetime { .. })
        ));
    }

    #[test]
    fn within_lifetime_is_inclusive() {
        assert!(within_lifetime(2011, 2015, Lifetime::Years(5)));
        assert!(within_lifetime(2011, 2016, Lifetime::Years(5)));
        assert!(!within_lifetime(2011, 2020, Lifetime::Years(5)));
        assert!(within_lifetime(2011, 3000, Lifetime::Infinite));
    }

    #[test]
    fn intervention_keeps_opaque_attributes() {
        let yaml = "name: reservoir\ntechnical_lifetime: {value: 80, units: years}\ncapital_cost: {value: 1234}\nlocation: oxford\n";
        let i: Intervention = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(i.lifetime().unwrap(), Lifetime::Years(80));
        assert!(i.attributes.contains_key("capital_cost"));
        assert!(i.attributes.contains_key("location"));
    }

    #[test]
    fn registry_get_and_not_found() {
        let reg: InterventionRegistry = [Intervention::new("a", 10)].into_iter().collect();
        assert_eq!(reg.get("a").unwrap().name, "a");
        assert!(matches!(
            reg.get("b"),
            Err(PlanError::InterventionNotFound(ref n)) if n == "b"
        ));
    }

    #[test]
    fn registry_available_excludes_names() {
        let reg: InterventionRegistry = [
            Intervention::new("a", 10),
            Intervention::new("b", 10),
            Intervention::new("c", 10),
        ]
        .into_iter()
        .collect();
        let excluding: BTreeSet<String> = ["b".to_string()].into_iter().collect();
        let available = reg.available(&excluding);
        assert_eq!(available.names().collect::<Vec<_>>(), vec!["a", "c"]);
        // Source registry is untouched.
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn merge_prefers_later_models() {
        let first: BTreeMap<_, _> = [("a".to_string(), Intervention::new("a", 10))].into();
        let second: BTreeMap<_, _> = [
            ("a".to_string(), Intervention::new("a", 20)),
            ("b".to_string(), Intervention::new("b", 5)),
        ]
        .into();
        let reg = InterventionRegistry::merge([first, second]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.lifetime_of("a").unwrap(), Lifetime::Years(20));
    }
}
