//! Target-specific post-translation passes.
//!
//! Every pass is a pure function of its input and must be idempotent: feeding a pass its
//! own output returns that output unchanged.

use crate::core::knowledge::PlatformKnowledge;
use crate::core::platforms::{make, n8n, zapier, PlatformWorkflow};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// n8n workflows with more nodes than this get a documentation note.
    pub documentation_threshold: usize,
    /// Zapier gets a pacing delay after every N side-effecting actions.
    pub pacing_interval: usize,
    pub pacing_delay_seconds: u64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            documentation_threshold: 10,
            pacing_interval: 3,
            pacing_delay_seconds: 1,
        }
    }
}

pub struct PassContext<'a> {
    pub knowledge: &'a PlatformKnowledge,
    pub settings: &'a OptimizerSettings,
}

/// A single optimization over one platform's document type.
pub trait OptimizationPass<W> {
    fn name(&self) -> &'static str;
    fn apply(&self, workflow: W, context: &PassContext<'_>) -> W;
}

#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub workflow: PlatformWorkflow,
    /// Names of the passes that changed the document.
    pub applied: Vec<String>,
}

pub struct PlatformOptimizer {
    knowledge: Arc<PlatformKnowledge>,
    settings: OptimizerSettings,
}

impl PlatformOptimizer {
    pub fn new(knowledge: Arc<PlatformKnowledge>, settings: OptimizerSettings) -> Self {
        Self { knowledge, settings }
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    pub fn optimize(&self, workflow: PlatformWorkflow) -> OptimizationReport {
        let context = PassContext {
            knowledge: &self.knowledge,
            settings: &self.settings,
        };
        match workflow {
            PlatformWorkflow::N8n(doc) => {
                let (doc, applied) = run_passes(doc, &n8n::optimize::passes(), &context);
                OptimizationReport {
                    workflow: PlatformWorkflow::N8n(doc),
                    applied,
                }
            }
            PlatformWorkflow::Make(doc) => {
                let (doc, applied) = run_passes(doc, &make::optimize::passes(), &context);
                OptimizationReport {
                    workflow: PlatformWorkflow::Make(doc),
                    applied,
                }
            }
            PlatformWorkflow::Zapier(doc) => {
                let (doc, applied) = run_passes(doc, &zapier::optimize::passes(), &context);
                OptimizationReport {
                    workflow: PlatformWorkflow::Zapier(doc),
                    applied,
                }
            }
        }
    }
}

fn run_passes<W: Clone + PartialEq>(
    workflow: W,
    passes: &[Box<dyn OptimizationPass<W>>],
    context: &PassContext<'_>,
) -> (W, Vec<String>) {
    let mut current = workflow;
    let mut applied = Vec::new();
    for pass in passes {
        let next = pass.apply(current.clone(), context);
        if next != current {
            tracing::debug!(pass = pass.name(), "optimization pass changed workflow");
            applied.push(pass.name().to_string());
        }
        current = next;
    }
    (current, applied)
}
