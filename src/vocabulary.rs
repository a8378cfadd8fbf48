//! Reference vocabularies and water-quality standards.
//!
//! A [`Vocabulary`] is loaded once per run (from `--config` or the built-in
//! `config/vocabulary.yaml`) and only ever read afterwards. It maps the lab's
//! `Param` labels onto analyte codes, destination tables, analysis methods,
//! ranked test methods and unit overrides, and holds the per-analyte bounds
//! used by the standards check.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::convert::ChemistryTable;

const BUILTIN_VOCABULARY: &str = include_str!("../config/vocabulary.yaml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Vocabulary {
    #[serde(default = "default_not_detected_marker")]
    pub not_detected_marker: String,
    pub categories: BTreeMap<String, CategoryRule>,
    #[serde(default)]
    pub standards: BTreeMap<String, Bounds>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    pub analyte: String,
    pub table: ChemistryTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Accepted test methods, most preferred first. Empty accepts any test.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

fn default_not_detected_marker() -> String {
    "ND".to_string()
}

impl Vocabulary {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_VOCABULARY).context("Parsing built-in vocabulary")
    }

    /// Loads `path` as JSON when it has a `.json` extension, YAML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening vocabulary file {path:?}"))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let vocabulary = if is_json {
            let parsed: Vocabulary =
                serde_json::from_str(&raw).context("Parsing vocabulary JSON")?;
            parsed.validated()?
        } else {
            Self::from_yaml_str(&raw)?
        };
        Ok(vocabulary)
    }

    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                Self::load(path).with_context(|| format!("Loading vocabulary from {path:?}"))
            }
            None => Self::builtin(),
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let parsed: Vocabulary = serde_yaml::from_str(raw).context("Parsing vocabulary YAML")?;
        parsed.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.not_detected_marker.is_empty() {
            bail!("not_detected_marker must not be empty");
        }
        for (param, rule) in &self.categories {
            if rule.analyte.trim().is_empty() {
                bail!("Category '{param}' has an empty analyte code");
            }
            for (idx, test) in rule.tests.iter().enumerate() {
                if rule.tests[..idx].contains(test) {
                    bail!("Category '{param}' lists test '{test}' more than once");
                }
            }
        }
        for (analyte, bounds) in &self.standards {
            if bounds.lower.is_nan() || bounds.upper.is_nan() {
                bail!("Standard for '{analyte}' has a NaN bound");
            }
            if bounds.lower > bounds.upper {
                return Err(anyhow!(
                    "Standard for '{analyte}' has lower bound {} above upper bound {}",
                    bounds.lower,
                    bounds.upper
                ));
            }
        }
        Ok(self)
    }

    pub fn category(&self, param: &str) -> Option<&CategoryRule> {
        self.categories.get(param)
    }

    pub fn analyte(&self, param: &str) -> Option<&str> {
        self.category(param).map(|rule| rule.analyte.as_str())
    }

    pub fn method(&self, param: &str) -> Option<&str> {
        self.category(param).and_then(|rule| rule.method.as_deref())
    }

    pub fn table(&self, param: &str) -> Option<ChemistryTable> {
        self.category(param).map(|rule| rule.table)
    }

    pub fn units_override(&self, param: &str) -> Option<&str> {
        self.category(param).and_then(|rule| rule.units.as_deref())
    }

    /// Configured test vocabulary for `param`, or `None` when any test is accepted.
    pub fn tests(&self, param: &str) -> Option<&[String]> {
        self.category(param)
            .map(|rule| rule.tests.as_slice())
            .filter(|tests| !tests.is_empty())
    }

    /// Rank of `test` within the priority list of `param`; 0 when the
    /// category accepts any test, `None` when the test is not accepted.
    pub fn test_priority(&self, param: &str, test: &str) -> Option<usize> {
        match self.tests(param) {
            Some(tests) => tests.iter().position(|candidate| candidate == test),
            None => Some(0),
        }
    }

    pub fn bounds(&self, analyte: &str) -> Option<Bounds> {
        self.standards.get(analyte).copied()
    }
}
