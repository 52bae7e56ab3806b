//! Task types and definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Override key holding the raw, unparsed command-line arguments of a task
pub const OVERRIDES_UNPARSED: &str = "__overrides_unparsed__";

/// Task overrides (parsed CLI options plus the reserved unparsed argument list)
pub type Overrides = Map<String, Value>;

/// Identifies a unit of work: a target on a project, optionally with a configuration
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReference {
    /// Project name
    pub project: String,
    /// Target name (e.g., "build", "test")
    pub target: String,
    /// Named configuration (e.g., "production")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

impl TargetReference {
    /// Create a new target reference
    pub fn new(project: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            target: target.into(),
            configuration: None,
        }
    }

    /// Set the configuration
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// Parse a reference from `project:target[:configuration]` format.
    ///
    /// A target containing `:` must be double-quoted (`app:"build:prod"`).
    pub fn parse(s: &str) -> Option<Self> {
        let (project, rest) = s.split_once(':')?;
        if project.is_empty() || rest.is_empty() {
            return None;
        }

        let (target, configuration) = if let Some(quoted) = rest.strip_prefix('"') {
            let (target, after) = quoted.split_once('"')?;
            match after {
                "" => (target, None),
                _ => (target, Some(after.strip_prefix(':')?)),
            }
        } else {
            match rest.split_once(':') {
                Some((target, configuration)) => (target, Some(configuration)),
                None => (rest, None),
            }
        };

        if target.is_empty() || configuration.is_some_and(str::is_empty) {
            return None;
        }

        Some(Self {
            project: project.to_string(),
            target: target.to_string(),
            configuration: configuration.map(String::from),
        })
    }
}

impl fmt::Display for TargetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.target)?;
        if let Some(configuration) = &self.configuration {
            write!(f, ":{}", configuration)?;
        }
        Ok(())
    }
}

/// A concrete, schedulable invocation of a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id within a task graph
    pub id: String,
    /// Target being run
    pub target: TargetReference,
    /// Resolved overrides
    pub overrides: Overrides,
}

impl Task {
    /// Create a task; the id is derived from the target reference.
    ///
    /// The unparsed-arguments key is always present afterwards.
    pub fn new(target: TargetReference, mut overrides: Overrides) -> Self {
        overrides
            .entry(OVERRIDES_UNPARSED)
            .or_insert_with(|| Value::Array(Vec::new()));
        Self {
            id: target.to_string(),
            target,
            overrides,
        }
    }

    /// Create a task whose only overrides are the raw command-line arguments
    pub fn with_unparsed_args<I, S>(target: TargetReference, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(|a| Value::String(a.into())).collect();
        let mut overrides = Overrides::new();
        overrides.insert(OVERRIDES_UNPARSED.to_string(), Value::Array(args));
        Self::new(target, overrides)
    }

    /// The raw command-line arguments the task was started with
    pub fn unparsed_args(&self) -> Vec<String> {
        match self.overrides.get(OVERRIDES_UNPARSED) {
            Some(Value::Array(args)) => args
                .iter()
                .map(|a| match a {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
