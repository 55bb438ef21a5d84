use super::{is_side_effecting, MakeModule, MakeScenario};
use crate::core::optimizer::{OptimizationPass, PassContext};
use serde_json::{json, Map, Value};

pub const MODULE_SPACING: u64 = 300;
pub const ROUTE_SPACING: u64 = 150;

pub fn passes() -> Vec<Box<dyn OptimizationPass<MakeScenario>>> {
    vec![Box::new(DesignerLayout), Box::new(ErrorHandlerRecommendations)]
}

/// Designer coordinates by position: columns follow the flow, each extra route gets a lane.
pub struct DesignerLayout;

impl DesignerLayout {
    fn layout(flow: &mut [MakeModule], first_column: u64, lane: &mut u64) {
        let row = *lane;
        for (offset, module) in flow.iter_mut().enumerate() {
            let column = first_column + offset as u64;
            let designer = module
                .metadata
                .entry("designer")
                .or_insert_with(|| Value::Object(Map::new()));
            if !designer.is_object() {
                *designer = Value::Object(Map::new());
            }
            if let Value::Object(designer) = designer {
                designer.insert("x".to_string(), json!(column * MODULE_SPACING));
                designer.insert("y".to_string(), json!(row * ROUTE_SPACING));
            }
            for (route_index, route) in module.routes.iter_mut().enumerate() {
                if route_index > 0 {
                    *lane += 1;
                }
                Self::layout(&mut route.flow, column + 1, lane);
            }
        }
    }
}

impl OptimizationPass<MakeScenario> for DesignerLayout {
    fn name(&self) -> &'static str {
        "designer_layout"
    }

    fn apply(&self, mut scenario: MakeScenario, _context: &PassContext<'_>) -> MakeScenario {
        let mut lane = 0;
        Self::layout(&mut scenario.flow, 0, &mut lane);
        scenario
    }
}

/// Recommend error handlers for side-effecting modules in scenario metadata.
///
/// Informational only: no handler modules are added.
pub struct ErrorHandlerRecommendations;

impl ErrorHandlerRecommendations {
    fn collect(flow: &[MakeModule], recommendations: &mut Vec<Value>) {
        for module in flow {
            if is_side_effecting(&module.module) && !module.extra.contains_key("onerror") {
                recommendations.push(json!({
                    "moduleId": module.id,
                    "module": module.module,
                    "suggestion": "Attach a Resume or Ignore error handler so one failed call does not stop the scenario",
                }));
            }
            for route in &module.routes {
                Self::collect(&route.flow, recommendations);
            }
        }
    }
}

impl OptimizationPass<MakeScenario> for ErrorHandlerRecommendations {
    fn name(&self) -> &'static str {
        "error_handler_recommendations"
    }

    fn apply(&self, mut scenario: MakeScenario, _context: &PassContext<'_>) -> MakeScenario {
        let mut recommendations = Vec::new();
        Self::collect(&scenario.flow, &mut recommendations);
        if !recommendations.is_empty() {
            scenario.metadata.insert(
                "errorHandling".to_string(),
                json!({ "recommendations": recommendations }),
            );
        }
        scenario
    }
}
