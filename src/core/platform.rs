//! The closed set of automation platforms a workflow can be translated between.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported automation platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    N8n,
    Make,
    Zapier,
}

/// Connection topology a platform's documents use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topology {
    /// Node array plus a name-keyed adjacency map; fan-out allowed.
    AdjacencyMap,
    /// Ordered module array with numeric ids; branching through routers.
    SequentialArray,
    /// Ordered step array; no branching at all.
    LinearChain,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::N8n, Platform::Make, Platform::Zapier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::N8n => "n8n",
            Platform::Make => "make",
            Platform::Zapier => "zapier",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::N8n => "n8n",
            Platform::Make => "Make (Integromat)",
            Platform::Zapier => "Zapier",
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Platform::N8n => Topology::AdjacencyMap,
            Platform::Make => Topology::SequentialArray,
            Platform::Zapier => Topology::LinearChain,
        }
    }

    /// Vendor term for a single unit of work.
    pub fn unit_noun(&self) -> &'static str {
        match self {
            Platform::N8n => "node",
            Platform::Make => "module",
            Platform::Zapier => "step",
        }
    }

    /// Parse a platform tag, producing the structured error used across the tool surface.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        value.parse().map_err(|_: UnknownPlatform| {
            AppError::new(
                ErrorCategory::PlatformError,
                format!("unknown platform '{}'", value),
            )
            .with_code("FLOW-PLATFORM-001")
            .with_suggestion("supported platforms are n8n, make, zapier")
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform(pub String);

impl fmt::Display for UnknownPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown platform '{}'", self.0)
    }
}

impl std::error::Error for UnknownPlatform {}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "n8n" => Ok(Platform::N8n),
            "make" | "integromat" | "make.com" => Ok(Platform::Make),
            "zapier" => Ok(Platform::Zapier),
            _ => Err(UnknownPlatform(value.to_string())),
        }
    }
}

/// Render a `source → target` path label.
pub fn translation_path(source: Platform, target: Platform) -> String {
    format!("{} → {}", source, target)
}
