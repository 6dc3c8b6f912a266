use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED: &str = "other";

/// One reporting axis, e.g. topology or difficulty, recognised by substrings of the task id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDimension {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScheme {
    pub dimensions: Vec<CategoryDimension>,
}

impl Default for CategoryScheme {
    fn default() -> Self {
        let dim = |name: &str, tags: &[&str]| CategoryDimension {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        Self {
            dimensions: vec![
                dim("topology", &["parallel", "sequential", "single", "mixed"]),
                dim("difficulty", &["easy", "medium", "hard"]),
            ],
        }
    }
}

impl CategoryScheme {
    /// Dimension name → category for `task_id`. The first listed tag found in the id wins.
    pub fn categorize(&self, task_id: &str) -> BTreeMap<String, String> {
        self.dimensions
            .iter()
            .map(|dim| {
                let category = dim
                    .tags
                    .iter()
                    .find(|tag| task_id.contains(tag.as_str()))
                    .cloned()
                    .unwrap_or_else(|| UNCATEGORIZED.to_string());
                (dim.name.clone(), category)
            })
            .collect()
    }
}
