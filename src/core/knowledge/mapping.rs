use crate::core::graph::NodeRole;
use crate::core::knowledge::transforms::Transform;
use crate::core::platform::Platform;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMapping {
    pub source_param: String,
    pub target_param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

/// How one node type on a source platform becomes a node type on a target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub source_type: String,
    pub target_type: String,
    #[serde(default)]
    pub parameter_mappings: Vec<ParameterMapping>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub requires_generative_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
}

/// Parameters produced by a rule plus the source parameters it did not cover.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedParameters {
    pub parameters: Map<String, Value>,
    pub dropped: Vec<String>,
}

impl MappingRule {
    /// Build target parameters: defaults first, then every mapped source parameter.
    pub fn map_parameters(&self, source: &Map<String, Value>) -> MappedParameters {
        let mut parameters = self.defaults.clone();
        for mapping in &self.parameter_mappings {
            if let Some(value) = source.get(&mapping.source_param) {
                let value = mapping
                    .transform
                    .map(|transform| transform.apply(value))
                    .unwrap_or_else(|| value.clone());
                parameters.insert(mapping.target_param.clone(), value);
            }
        }
        let dropped = source
            .keys()
            .filter(|key| {
                !self
                    .parameter_mappings
                    .iter()
                    .any(|mapping| &mapping.source_param == *key)
            })
            .cloned()
            .collect();
        MappedParameters {
            parameters,
            dropped,
        }
    }
}

/// Native node a generic HTTP call can be replaced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownService {
    pub name: String,
    pub url_prefix: String,
    pub n8n_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyTypes {
    pub n8n: Option<String>,
    pub make: Option<String>,
    pub zapier: Option<String>,
}

impl FamilyTypes {
    fn get(&self, platform: Platform) -> Option<&String> {
        match platform {
            Platform::N8n => self.n8n.as_ref(),
            Platform::Make => self.make.as_ref(),
            Platform::Zapier => self.zapier.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyParameter {
    pub n8n: Option<String>,
    pub make: Option<String>,
    pub zapier: Option<String>,
    /// Transform applied when the value lands on the keyed platform.
    #[serde(default)]
    pub transforms: HashMap<Platform, Transform>,
}

impl FamilyParameter {
    fn name(&self, platform: Platform) -> Option<&String> {
        match platform {
            Platform::N8n => self.n8n.as_ref(),
            Platform::Make => self.make.as_ref(),
            Platform::Zapier => self.zapier.as_ref(),
        }
    }
}

/// Equivalent node types across platforms, expanded into pairwise rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFamily {
    pub key: String,
    pub role: NodeRole,
    pub types: FamilyTypes,
    #[serde(default)]
    pub parameters: Vec<FamilyParameter>,
    #[serde(default)]
    pub requires_generative_fallback: bool,
}

impl NodeFamily {
    pub fn expand(&self) -> Vec<MappingRule> {
        let mut rules = Vec::new();
        for source in Platform::ALL {
            for target in Platform::ALL {
                if source == target {
                    continue;
                }
                let (Some(source_type), Some(target_type)) =
                    (self.types.get(source), self.types.get(target))
                else {
                    continue;
                };
                let parameter_mappings = self
                    .parameters
                    .iter()
                    .filter_map(|param| {
                        Some(ParameterMapping {
                            source_param: param.name(source)?.clone(),
                            target_param: param.name(target)?.clone(),
                            transform: param.transforms.get(&target).copied(),
                        })
                    })
                    .collect();
                rules.push(MappingRule {
                    source_platform: source,
                    target_platform: target,
                    source_type: source_type.clone(),
                    target_type: target_type.clone(),
                    parameter_mappings,
                    defaults: Map::new(),
                    requires_generative_fallback: self.requires_generative_fallback,
                    role: Some(self.role),
                });
            }
        }
        rules
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    #[serde(default)]
    pub families: Vec<NodeFamily>,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
    #[serde(default)]
    pub known_services: Vec<KnownService>,
}

type RuleKey = (Platform, Platform, String);

/// Read-only rule index keyed by `(source, target, sourceType)`.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    rules: HashMap<RuleKey, MappingRule>,
    known_services: Vec<KnownService>,
}

impl MappingTable {
    pub fn from_document(document: MappingDocument) -> Self {
        let mut rules = HashMap::new();
        for family in &document.families {
            for rule in family.expand() {
                rules.insert(key_of(&rule), rule);
            }
        }
        // Explicit rules win over family expansion.
        for rule in document.rules {
            rules.insert(key_of(&rule), rule);
        }
        Self {
            rules,
            known_services: document.known_services,
        }
    }

    /// Exact-match lookup; no fuzzy matching.
    pub fn lookup(&self, source: Platform, target: Platform, source_type: &str) -> Option<&MappingRule> {
        self.rules.get(&(source, target, source_type.to_string()))
    }

    pub fn known_services(&self) -> &[KnownService] {
        &self.known_services
    }

    /// Known service whose prefix matches `url`, longest prefix first.
    pub fn service_for_url(&self, url: &str) -> Option<&KnownService> {
        self.known_services
            .iter()
            .filter(|service| url.starts_with(&service.url_prefix))
            .max_by_key(|service| service.url_prefix.len())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn key_of(rule: &MappingRule) -> RuleKey {
    (rule.source_platform, rule.target_platform, rule.source_type.clone())
}
