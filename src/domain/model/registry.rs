//! Static model registry built once from a declarative model table

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::entity::{
    Capability, CapabilityFlags, ModelDefinition, PricingEntry, Provider, ResolvedModel,
};
use super::version;
use crate::domain::DomainError;

const BUILTIN_MODEL_TABLE: &str = include_str!("../../../config/models.toml");

#[derive(Debug, Deserialize)]
struct ModelTable {
    models: Vec<ModelTableEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelTableEntry {
    alias: String,
    provider: Provider,
    model_ids: Vec<String>,
    #[serde(default)]
    pricing: PricingEntry,
    #[serde(default)]
    capabilities: CapabilityFlags,
}

/// Read-only lookup from model names (aliases or versioned ids) to their definitions
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    definitions: Vec<ModelDefinition>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Registry backed by the model table shipped with the crate
    pub fn builtin() -> Result<Self, DomainError> {
        Self::from_toml_str(BUILTIN_MODEL_TABLE)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read model table '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, DomainError> {
        let table: ModelTable = toml::from_str(contents).map_err(|e| {
            DomainError::configuration(format!("Invalid model table: {}", e))
        })?;

        let mut registry = Self {
            definitions: Vec::with_capacity(table.models.len()),
            index: HashMap::new(),
        };

        for entry in table.models {
            registry.insert(entry)?;
        }

        debug!(
            aliases = registry.definitions.len(),
            names = registry.index.len(),
            "Model registry loaded"
        );

        Ok(registry)
    }

    fn insert(&mut self, entry: ModelTableEntry) -> Result<(), DomainError> {
        let ModelTableEntry {
            alias,
            provider,
            model_ids,
            pricing,
            capabilities,
        } = entry;

        if capabilities.system_message && capabilities.developer_message {
            return Err(DomainError::configuration(format!(
                "Model '{}' declares both system and developer message support",
                alias
            )));
        }

        let most_recent_id = version::most_recent(&alias, &model_ids)
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::configuration(format!("Model '{}' has no versioned ids", alias))
            })?;

        let position = self.definitions.len();
        for name in std::iter::once(&alias).chain(model_ids.iter()) {
            match self.index.get(name) {
                Some(existing) if *existing != position => {
                    return Err(DomainError::configuration(format!(
                        "Model name '{}' is registered more than once",
                        name
                    )));
                }
                _ => {
                    self.index.insert(name.clone(), position);
                }
            }
        }

        self.definitions.push(ModelDefinition::new(
            alias,
            provider,
            model_ids,
            capabilities,
            pricing,
            most_recent_id,
        ));

        Ok(())
    }

    /// Resolve an alias to its most recent versioned id, or accept a versioned id as is
    pub fn resolve(&self, name: &str) -> Result<ResolvedModel, DomainError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| DomainError::unknown_model(name))?;

        let model_id = if definition.alias() == name {
            definition.most_recent_id()
        } else {
            name
        };

        Ok(ResolvedModel {
            requested: name.to_string(),
            alias: definition.alias().to_string(),
            model_id: model_id.to_string(),
            provider: definition.provider(),
            capabilities: *definition.capabilities(),
            pricing: *definition.pricing(),
        })
    }

    pub fn definition(&self, name: &str) -> Option<&ModelDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn definitions(&self) -> &[ModelDefinition] {
        &self.definitions
    }

    pub fn alias_of(&self, name: &str) -> Option<&str> {
        self.definition(name).map(ModelDefinition::alias)
    }

    pub fn provider_of(&self, name: &str) -> Option<Provider> {
        self.definition(name).map(ModelDefinition::provider)
    }

    pub fn pricing_for(&self, name: &str) -> Option<&PricingEntry> {
        self.definition(name).map(ModelDefinition::pricing)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every alias and versioned id supporting the capability, sorted
    pub fn supported_models(&self, capability: Capability) -> Vec<String> {
        let mut names: Vec<String> = self
            .index
            .iter()
            .filter(|&(_, &i)| self.definitions[i].capabilities().supports(capability))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
