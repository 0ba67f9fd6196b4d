use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Map of model name to the highest version that model has reached.
/// A missing entry means the model has never been migrated.
pub type ModelVersions = BTreeMap<String, ModelVersion>;

/// A model schema version: dot-separated non-negative integers, compared
/// numerically component by component. Missing trailing components count
/// as zero, so `1.1` and `1.1.0` are equal.
#[derive(Debug, Clone)]
pub struct ModelVersion {
    components: Vec<u64>,
    text: String,
}

impl ModelVersion {
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(anyhow!("model version must not be empty"));
        }

        let components = input
            .split('.')
            .map(|component| {
                component
                    .parse::<u64>()
                    .with_context(|| format!("invalid model version component: '{component}'"))
            })
            .collect::<Result<Vec<u64>>>()
            .with_context(|| format!("invalid model version: '{input}'"))?;

        Ok(Self {
            components,
            text: input.to_string(),
        })
    }

    /// The version of a model that has never been migrated.
    pub fn zero() -> Self {
        Self {
            components: vec![0],
            text: "0".to_string(),
        }
    }

    /// True iff `self` strictly follows `other` in the version order.
    pub fn after(&self, other: &Self) -> bool {
        self > other
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for ModelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ModelVersion {}

impl PartialOrd for ModelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.components.len().max(other.components.len());
        for index in 0..width {
            match self.component(index).cmp(&other.component(index)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for ModelVersion {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(D::Error::custom)
    }
}
