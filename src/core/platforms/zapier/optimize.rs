use super::{draft_status, ZapierStep, ZapierStepType, ZapierZap, CONDITION_PARAM};
use crate::core::optimizer::{OptimizationPass, PassContext};
use serde_json::{json, Map};

const FILTER_APP: &str = "filter";
const DELAY_APP: &str = "delay";

pub fn passes() -> Vec<Box<dyn OptimizationPass<ZapierZap>>> {
    vec![
        Box::new(LinearStepFilter),
        Box::new(ConditionFilterSteps),
        Box::new(RateLimitPacing),
        Box::new(DraftStatus),
    ]
}

/// Keep only trigger and action steps.
pub struct LinearStepFilter;

impl OptimizationPass<ZapierZap> for LinearStepFilter {
    fn name(&self) -> &'static str {
        "linear_step_filter"
    }

    fn apply(&self, mut zap: ZapierZap, _context: &PassContext<'_>) -> ZapierZap {
        zap.steps.retain(|step| {
            let keep = matches!(step.step_type, ZapierStepType::Trigger | ZapierStepType::Action);
            if !keep {
                tracing::debug!(step = %step.id, "dropping non-linear zapier step");
            }
            keep
        });
        zap
    }
}

/// Move a step's branch condition into a filter step placed right before it.
pub struct ConditionFilterSteps;

impl OptimizationPass<ZapierZap> for ConditionFilterSteps {
    fn name(&self) -> &'static str {
        "condition_filters"
    }

    fn apply(&self, zap: ZapierZap, _context: &PassContext<'_>) -> ZapierZap {
        let mut steps = Vec::with_capacity(zap.steps.len());
        for mut step in zap.steps {
            if let Some(condition) = step.parameters.remove(CONDITION_PARAM) {
                let mut parameters = Map::new();
                parameters.insert("conditions".to_string(), condition);
                steps.push(ZapierStep {
                    id: format!("{}-filter", step.id),
                    step_type: ZapierStepType::Action,
                    app: FILTER_APP.to_string(),
                    event: "only_continue_if".to_string(),
                    title: None,
                    parameters,
                });
            }
            steps.push(step);
        }
        ZapierZap { steps, ..zap }
    }
}

/// Insert a delay after every Nth side-effecting action.
pub struct RateLimitPacing;

impl RateLimitPacing {
    fn paces(step: &ZapierStep) -> bool {
        step.step_type == ZapierStepType::Action
            && !matches!(step.app.as_str(), FILTER_APP | DELAY_APP | "formatter" | "paths")
    }
}

impl OptimizationPass<ZapierZap> for RateLimitPacing {
    fn name(&self) -> &'static str {
        "rate_limit_pacing"
    }

    fn apply(&self, zap: ZapierZap, context: &PassContext<'_>) -> ZapierZap {
        let interval = context.settings.pacing_interval;
        if interval == 0 {
            return zap;
        }
        let total = zap.steps.len();
        let mut steps = Vec::with_capacity(total);
        let mut actions = 0usize;
        let mut iter = zap.steps.into_iter().enumerate().peekable();
        while let Some((position, step)) = iter.next() {
            let counts = Self::paces(&step);
            let id = step.id.clone();
            steps.push(step);
            if !counts {
                continue;
            }
            actions += 1;
            let is_last = position + 1 == total;
            let already_paced = iter.peek().is_some_and(|(_, next)| next.app == DELAY_APP);
            if actions % interval == 0 && !is_last && !already_paced {
                let mut parameters = Map::new();
                parameters.insert(
                    "delay_for_value".to_string(),
                    json!(context.settings.pacing_delay_seconds.to_string()),
                );
                parameters.insert("delay_for_unit".to_string(), json!("seconds"));
                steps.push(ZapierStep {
                    id: format!("{}-delay", id),
                    step_type: ZapierStepType::Action,
                    app: DELAY_APP.to_string(),
                    event: "delay_for".to_string(),
                    title: None,
                    parameters,
                });
            }
        }
        ZapierZap { steps, ..zap }
    }
}

/// Translated zaps never go live unreviewed.
pub struct DraftStatus;

impl OptimizationPass<ZapierZap> for DraftStatus {
    fn name(&self) -> &'static str {
        "draft_status"
    }

    fn apply(&self, mut zap: ZapierZap, _context: &PassContext<'_>) -> ZapierZap {
        zap.status = draft_status();
        zap
    }
}
