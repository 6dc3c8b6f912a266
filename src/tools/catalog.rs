use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::{
    error::{Result, bench_error::BenchError},
    tools::ToolDescriptor,
};

/// Read-only set of every tool a session may be offered. Shared across tasks behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new(descriptors: Vec<ToolDescriptor>) -> Result<Self> {
        let mut tools = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if tools.insert(name.clone(), descriptor).is_some() {
                return Err(
                    BenchError::Configuration(format!("duplicate tool in catalog: {name}")).into(),
                );
            }
        }
        Ok(Self { tools })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let descriptors: Vec<ToolDescriptor> = serde_json::from_str(&raw)?;
        let catalog = Self::new(descriptors)?;
        tracing::info!(tools = catalog.len(), path = %path.as_ref().display(), "loaded tool catalog");
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> BTreeSet<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve a list of names to descriptors, failing on the first unknown tool.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<ToolDescriptor>> {
        names
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| {
                    BenchError::Configuration(format!("tool not in catalog: {name}")).into()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name.to_string(), format!("{name} tool"), json!({}))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = ToolCatalog::new(vec![descriptor("a"), descriptor("a")]);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_keeps_requested_order() {
        let catalog = ToolCatalog::new(vec![descriptor("a"), descriptor("b")]).unwrap();
        let resolved = catalog.resolve(&["b".into(), "a".into()]).unwrap();
        assert_eq!(resolved[0].name, "b");
        assert_eq!(resolved[1].name, "a");
        assert!(catalog.resolve(&["zzz".into()]).is_err());
    }

    #[test]
    fn load_reads_schema_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let body = json!([
            {"name": "get_weather", "description": "Weather lookup", "parameters": {"type": "object"}},
            {"name": "noop"}
        ]);
        std::fs::write(&path, body.to_string()).unwrap();

        let catalog = ToolCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("get_weather").unwrap().argument_schema, json!({"type": "object"}));
        assert_eq!(catalog.get("noop").unwrap().description, "");
    }
}
