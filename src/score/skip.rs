use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tools whose arguments are never compared; only their presence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkipSet(BTreeSet<String>);

impl SkipSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Load from a JSON array of names, or from plain text with one name per line
    /// (blank lines and `#` comments ignored).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let set = Self::parse(&raw)?;
        tracing::info!(tools = set.len(), path = %path.as_ref().display(), "loaded skip list");
        Ok(set)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim_start().starts_with('[') {
            let names: Vec<String> = serde_json::from_str(raw)?;
            return Ok(Self::new(names));
        }
        Ok(Self::new(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        ))
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.0.contains(tool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
