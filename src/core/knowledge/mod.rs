//! Static capability and mapping tables.
//!
//! Both tables are JSON documents compiled into the binary and optionally replaced by
//! files named in the `[knowledge]` config section. They are loaded once and shared
//! read-only behind an `Arc`.

use crate::core::error::AppError;
use crate::core::platform::Platform;
use crate::core::types::ErrorCategory;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod capabilities;
pub mod mapping;
pub mod transforms;

pub use capabilities::{
    CapabilityDocument, CapabilitySet, Difficulty, ErrorHandlingGranularity, PlatformCapabilities,
    TranslationPath,
};
pub use mapping::{KnownService, MappedParameters, MappingDocument, MappingRule, MappingTable, ParameterMapping};
pub use transforms::Transform;

const BUILTIN_CAPABILITIES: &str = include_str!("../../../data/capabilities.json");
const BUILTIN_MAPPINGS: &str = include_str!("../../../data/mappings.json");

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {origin} document: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("capability table has a max node limit of zero for {0}")]
    ZeroLimit(Platform),
}

impl From<KnowledgeError> for AppError {
    fn from(err: KnowledgeError) -> Self {
        let suggestion = match &err {
            KnowledgeError::Read { .. } => "check the [knowledge] paths in flowbridge.toml",
            KnowledgeError::Parse { .. } => "validate the JSON document against the bundled data/ files",
            KnowledgeError::ZeroLimit(_) => "set maxNodes to a positive number",
        };
        AppError::with_source(ErrorCategory::KnowledgeError, err.to_string(), Box::new(err))
            .with_code("FLOW-KNOWLEDGE-001")
            .with_suggestion(suggestion)
    }
}

/// Capability sets, translation paths and mapping rules for every platform.
#[derive(Debug, Clone)]
pub struct PlatformKnowledge {
    capabilities: CapabilityDocument,
    mappings: MappingTable,
}

impl PlatformKnowledge {
    /// Tables bundled with the binary.
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_json(BUILTIN_CAPABILITIES, BUILTIN_MAPPINGS)
    }

    pub fn from_json(capabilities: &str, mappings: &str) -> Result<Self, KnowledgeError> {
        let capabilities: CapabilityDocument =
            serde_json::from_str(capabilities).map_err(|source| KnowledgeError::Parse {
                origin: "capabilities".to_string(),
                source,
            })?;
        let mappings: MappingDocument =
            serde_json::from_str(mappings).map_err(|source| KnowledgeError::Parse {
                origin: "mappings".to_string(),
                source,
            })?;
        Self::from_documents(capabilities, mappings)
    }

    pub fn from_documents(
        capabilities: CapabilityDocument,
        mappings: MappingDocument,
    ) -> Result<Self, KnowledgeError> {
        for platform in Platform::ALL {
            if capabilities.platforms.get(platform).max_nodes == 0 {
                return Err(KnowledgeError::ZeroLimit(platform));
            }
        }
        Ok(Self {
            capabilities,
            mappings: MappingTable::from_document(mappings),
        })
    }

    /// Load tables, replacing each bundled document whose override path is given.
    pub fn load(capabilities: Option<&Path>, mappings: Option<&Path>) -> Result<Self, KnowledgeError> {
        let capabilities = match capabilities {
            Some(path) => read(path)?,
            None => BUILTIN_CAPABILITIES.to_string(),
        };
        let mappings = match mappings {
            Some(path) => read(path)?,
            None => BUILTIN_MAPPINGS.to_string(),
        };
        let knowledge = Self::from_json(&capabilities, &mappings)?;
        tracing::debug!(rules = knowledge.mappings.len(), "loaded platform knowledge");
        Ok(knowledge)
    }

    pub fn capabilities(&self, platform: Platform) -> &CapabilitySet {
        self.capabilities.platforms.get(platform)
    }

    pub fn lookup_rule(&self, source: Platform, target: Platform, source_type: &str) -> Option<&MappingRule> {
        self.mappings.lookup(source, target, source_type)
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn translation_path(&self, source: Platform, target: Platform) -> Option<&TranslationPath> {
        self.capabilities
            .translation_paths
            .iter()
            .find(|path| path.source == source && path.target == target)
    }
}

fn read(path: &Path) -> Result<String, KnowledgeError> {
    std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
        path: path.to_path_buf(),
        source,
    })
}
