pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod fallback;
pub mod feasibility;
pub mod graph;
pub mod knowledge;
pub mod optimizer;
pub mod platform;
pub mod platforms;
pub mod tools;
pub mod types;

pub use config::{ConfigLoader, FlowbridgeConfig};
pub use engine::{BatchResult, EngineSettings, TranslationEngine, TranslationOptions, TranslationRequest, TranslationResult};
pub use error::AppError;
pub use fallback::{DisabledFallback, GenerativeFallback};
pub use feasibility::{FeasibilityCheck, FeasibilityChecker};
pub use knowledge::PlatformKnowledge;
pub use platform::Platform;
pub use tools::ToolService;
pub use types::*;
