//! Make scenarios: a sequential module array with numeric ids, branching through routers.

use crate::core::error::AppError;
use crate::core::graph::{GraphNode, NodeRole, WorkflowGraph};
use crate::core::platform::Platform;
use crate::core::platforms::{
    local_type_name, malformed, split_app_event, BuildOptions, BuildOutput, NodeKind, PlatformAdapter,
    PlatformWorkflow,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

pub mod optimize;

pub const ROUTER_MODULE: &str = "builtin:BasicRouter";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeScenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flow: Vec<MakeModule>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeModule {
    pub id: u64,
    pub module: String,
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub mapper: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<MakeRoute>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Error handler routes (`onerror`) and other module-level extras.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeRoute {
    #[serde(default)]
    pub flow: Vec<MakeModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

fn default_version() -> u64 {
    1
}

impl MakeModule {
    pub fn is_router(&self) -> bool {
        self.module == ROUTER_MODULE
    }
}

/// Count executable modules, descending into router routes.
pub fn count_modules(flow: &[MakeModule]) -> usize {
    flow.iter()
        .map(|module| {
            let own = usize::from(!module.is_router());
            own + module
                .routes
                .iter()
                .map(|route| count_modules(&route.flow))
                .sum::<usize>()
        })
        .sum()
}

/// Modules whose action changes state in an external system.
pub fn is_side_effecting(module: &str) -> bool {
    const VERBS: [&str; 11] = [
        "create", "send", "add", "update", "delete", "upsert", "post", "upload", "action", "insert", "publish",
    ];
    let local = local_type_name(module).to_lowercase();
    module != ROUTER_MODULE && VERBS.iter().any(|verb| local.starts_with(verb))
}

impl MakeScenario {
    pub fn to_graph(&self) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new(self.name.clone());
        decode_flow(&self.flow, &mut graph, &[], 0, None, true);
        graph
    }
}

fn decode_flow(
    flow: &[MakeModule],
    graph: &mut WorkflowGraph,
    entry: &[usize],
    entry_slot: usize,
    entry_condition: Option<&Value>,
    top_level: bool,
) {
    let mut tails = entry.to_vec();
    let mut slot = entry_slot;
    let mut condition = entry_condition.cloned();
    for (position, module) in flow.iter().enumerate() {
        if module.is_router() {
            for (route_index, route) in module.routes.iter().enumerate() {
                decode_flow(&route.flow, graph, &tails, route_index, route.filter.as_ref(), false);
            }
            slot = 0;
            condition = None;
            continue;
        }

        let role = if top_level && position == 0 {
            NodeRole::Trigger
        } else {
            NodeRole::Action
        };
        let index = graph.add_node(module_to_node(module, role));
        let guard = condition.take().or_else(|| module.filter.clone());
        for &tail in &tails {
            graph.add_edge(tail, index, slot, guard.clone());
        }
        tails = vec![index];
        slot = 0;
    }
}

fn module_to_node(module: &MakeModule, role: NodeRole) -> GraphNode {
    let mut parameters = module.parameters.clone();
    if let Some(mapper) = &module.mapper {
        for (key, value) in mapper {
            parameters.insert(key.clone(), value.clone());
        }
    }
    let designer = module.metadata.get("designer");
    let name = designer
        .and_then(|d| d.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| module.module.clone());

    let mut node = GraphNode::new(module.id.to_string(), name, module.module.clone(), parameters, role);
    node.position = designer.and_then(|d| Some([d.get("x")?.as_f64()?, d.get("y")?.as_f64()?]));
    node.settings = module.extra.clone();
    node.settings.insert("version".to_string(), json!(module.version));
    node
}

enum Slot {
    Module { node: usize, parent: Option<usize> },
    Router { routes: Vec<Vec<Slot>> },
}

/// Emission plan shared by key assignment and document building so both agree on ids.
struct FlowPlan {
    flow: Vec<Slot>,
    warnings: Vec<String>,
}

struct Planner<'a> {
    graph: &'a WorkflowGraph,
    emitted: HashSet<usize>,
    warnings: Vec<String>,
}

impl<'a> Planner<'a> {
    fn plan(graph: &'a WorkflowGraph) -> FlowPlan {
        let mut planner = Planner {
            graph,
            emitted: HashSet::new(),
            warnings: Vec::new(),
        };
        let mut flow = Vec::new();
        let starts = graph.roots().into_iter().chain(graph.traversal_order());
        for start in starts {
            if planner.emitted.contains(&start) {
                continue;
            }
            if !flow.is_empty() {
                planner.warnings.push(format!(
                    "'{}' is not connected to the trigger; it was appended to the main flow",
                    graph.nodes[start].name
                ));
            }
            let chain = planner.chain(start, None);
            flow.extend(chain);
        }
        FlowPlan {
            flow,
            warnings: planner.warnings,
        }
    }

    fn chain(&mut self, start: usize, parent: Option<usize>) -> Vec<Slot> {
        let mut slots = Vec::new();
        let mut current = start;
        let mut parent = parent;
        loop {
            self.emitted.insert(current);
            slots.push(Slot::Module { node: current, parent });

            let mut successors = self.graph.successors(current);
            let mut seen = HashSet::new();
            successors.retain(|next| seen.insert(*next));

            let mut open = Vec::new();
            for next in successors {
                if self.emitted.contains(&next) {
                    self.warn_merge(current, next);
                } else {
                    open.push(next);
                }
            }

            match open.len() {
                0 => break,
                1 => {
                    parent = Some(current);
                    current = open[0];
                }
                _ => {
                    let mut routes = Vec::new();
                    for next in open {
                        // An earlier route may already have emitted this node.
                        if self.emitted.contains(&next) {
                            self.warn_merge(current, next);
                            continue;
                        }
                        routes.push(self.chain(next, Some(current)));
                    }
                    if routes.len() == 1 {
                        slots.extend(routes.remove(0));
                    } else {
                        slots.push(Slot::Router { routes });
                    }
                    break;
                }
            }
        }
        slots
    }

    fn warn_merge(&mut self, from: usize, to: usize) {
        self.warnings.push(format!(
            "'{}' is also reached from '{}'; Make keeps it only in its first route",
            self.graph.nodes[to].name, self.graph.nodes[from].name
        ));
    }
}

/// Module and router ids, shared by key assignment and document building.
struct IdPlan {
    modules: Vec<Option<u64>>,
    /// Router ids in emission (pre-)order.
    routers: Vec<u64>,
}

impl IdPlan {
    /// Sequential ids in emission order, or the source module ids when
    /// `keep_source_keys` is set and every key is a distinct number. Routers
    /// synthesized on top of kept ids are numbered after the highest one.
    fn new(graph: &WorkflowGraph, flow: &[Slot], options: BuildOptions) -> Self {
        let mut plan = IdPlan {
            modules: vec![None; graph.len()],
            routers: Vec::new(),
        };
        match source_ids(graph).filter(|_| options.keep_source_keys) {
            Some(kept) => {
                let mut next_id = kept.iter().copied().max().unwrap_or(0) + 1;
                plan.modules = kept.into_iter().map(Some).collect();
                plan.number_routers(flow, &mut next_id);
            }
            None => {
                let mut next_id = 1;
                plan.number_all(flow, &mut next_id);
            }
        }
        plan
    }

    fn number_all(&mut self, flow: &[Slot], next_id: &mut u64) {
        for slot in flow {
            let id = *next_id;
            *next_id += 1;
            match slot {
                Slot::Module { node, .. } => self.modules[*node] = Some(id),
                Slot::Router { routes } => {
                    self.routers.push(id);
                    for route in routes {
                        self.number_all(route, next_id);
                    }
                }
            }
        }
    }

    fn number_routers(&mut self, flow: &[Slot], next_id: &mut u64) {
        for slot in flow {
            if let Slot::Router { routes } = slot {
                self.routers.push(*next_id);
                *next_id += 1;
                for route in routes {
                    self.number_routers(route, next_id);
                }
            }
        }
    }
}

fn source_ids(graph: &WorkflowGraph) -> Option<Vec<u64>> {
    let ids: Vec<u64> = graph
        .nodes
        .iter()
        .map(|node| node.key.parse().ok())
        .collect::<Option<_>>()?;
    let distinct: HashSet<u64> = ids.iter().copied().collect();
    (distinct.len() == ids.len()).then_some(ids)
}

/// Static values go to `parameters`; anything templated goes to `mapper`.
fn split_parameters(parameters: &Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut statics = Map::new();
    let mut mapped = Map::new();
    for (key, value) in parameters {
        if value.to_string().contains("{{") {
            mapped.insert(key.clone(), value.clone());
        } else {
            statics.insert(key.clone(), value.clone());
        }
    }
    (statics, mapped)
}

struct Emitter<'a> {
    graph: &'a WorkflowGraph,
    options: BuildOptions,
    ids: IdPlan,
    next_router: usize,
}

impl Emitter<'_> {
    fn emit(&mut self, flow: &[Slot]) -> Vec<MakeModule> {
        flow.iter().map(|slot| self.emit_slot(slot)).collect()
    }

    fn emit_slot(&mut self, slot: &Slot) -> MakeModule {
        match slot {
            Slot::Module { node, parent } => {
                let id = self.ids.modules[*node].unwrap_or_default();
                self.module(id, *node, *parent)
            }
            Slot::Router { routes } => {
                let id = self.ids.routers.get(self.next_router).copied().unwrap_or_default();
                self.next_router += 1;
                self.router(id, routes)
            }
        }
    }

    fn router(&mut self, id: u64, routes: &[Vec<Slot>]) -> MakeModule {
        MakeModule {
            id,
            module: ROUTER_MODULE.to_string(),
            version: 1,
            parameters: Map::new(),
            mapper: None,
            filter: None,
            routes: routes
                .iter()
                .map(|route| MakeRoute {
                    flow: self.emit(route),
                    filter: None,
                })
                .collect(),
            metadata: designer(0.0, 0.0, None),
            extra: Map::new(),
        }
    }

    fn module(&self, id: u64, index: usize, parent: Option<usize>) -> MakeModule {
        let node = &self.graph.nodes[index];
        let (parameters, mapper) = split_parameters(&node.parameters);
        let filter = parent.and_then(|parent| {
            self.graph
                .edges
                .iter()
                .find(|edge| edge.from == parent && edge.to == index)
                .and_then(|edge| edge.condition.clone())
        });
        let mut extra = node.settings.clone();
        let version = extra
            .remove("version")
            .and_then(|v| v.as_u64())
            .unwrap_or_else(default_version);
        let [x, y] = node.position.unwrap_or([0.0, 0.0]);
        let name = self.options.preserve_names.then(|| node.name.clone());
        MakeModule {
            id,
            module: node.type_id.clone(),
            version,
            parameters,
            mapper: Some(mapper),
            filter,
            routes: Vec::new(),
            metadata: designer(x, y, name),
            extra,
        }
    }
}

fn designer(x: f64, y: f64, name: Option<String>) -> Map<String, Value> {
    let mut designer = Map::new();
    designer.insert("x".to_string(), json!(x as i64));
    designer.insert("y".to_string(), json!(y as i64));
    if let Some(name) = name {
        designer.insert("name".to_string(), json!(name));
    }
    let mut metadata = Map::new();
    metadata.insert("designer".to_string(), Value::Object(designer));
    metadata
}

fn scenario_metadata() -> Map<String, Value> {
    let metadata = json!({
        "version": 1,
        "scenario": {
            "roundtrips": 1,
            "maxErrors": 3,
            "autoCommit": true,
            "autoCommitTriggerLast": true,
            "sequential": false,
            "confidential": false,
            "dataloss": false,
            "dlq": false,
            "freshVariables": false
        },
        "designer": {"orphans": []}
    });
    match metadata {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub struct MakeAdapter;

impl PlatformAdapter for MakeAdapter {
    fn platform(&self) -> Platform {
        Platform::Make
    }

    fn decode(&self, document: &Value) -> Result<WorkflowGraph, AppError> {
        let scenario: MakeScenario =
            serde_json::from_value(document.clone()).map_err(|err| malformed(Platform::Make, err))?;
        Ok(scenario.to_graph())
    }

    fn classify(&self, type_id: &str) -> NodeKind {
        let (app, action) = split_app_event(type_id);
        let action = action.to_lowercase();
        match (app, action.as_str()) {
            (_, _) if type_id == ROUTER_MODULE => NodeKind::Conditional,
            ("builtin", "basicfeeder" | "basicrepeater") => NodeKind::Loop,
            ("builtin", "ignore" | "resume" | "rollback" | "commit" | "break") => NodeKind::ErrorHandler,
            ("code" | "javascript" | "python", _) => NodeKind::Code,
            ("scenario-service", _) | (_, "runscenario" | "callscenario") => NodeKind::SubWorkflow,
            ("http", _) => NodeKind::Http,
            ("webhook" | "gateway", _) => NodeKind::Trigger,
            (_, action) if action.starts_with("watch") => NodeKind::Trigger,
            (_, action) if action.contains("iterator") => NodeKind::Loop,
            _ => NodeKind::Other,
        }
    }

    fn handles_errors(&self, settings: &Map<String, Value>) -> bool {
        settings
            .get("onerror")
            .and_then(Value::as_array)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    fn node_keys(&self, graph: &WorkflowGraph, options: BuildOptions) -> Vec<String> {
        let plan = Planner::plan(graph);
        IdPlan::new(graph, &plan.flow, options)
            .modules
            .into_iter()
            .map(|id| id.map(|id| id.to_string()).unwrap_or_default())
            .collect()
    }

    fn build(&self, graph: &WorkflowGraph, options: BuildOptions) -> BuildOutput {
        let plan = Planner::plan(graph);
        let mut warnings = plan.warnings;
        if options.keep_source_keys && source_ids(graph).is_none() {
            warnings.push("module ids in the source are not distinct numbers; modules were renumbered".to_string());
        }
        let mut emitter = Emitter {
            graph,
            options,
            ids: IdPlan::new(graph, &plan.flow, options),
            next_router: 0,
        };
        let flow = emitter.emit(&plan.flow);
        BuildOutput {
            workflow: PlatformWorkflow::Make(MakeScenario {
                name: graph.name.clone(),
                flow,
                metadata: scenario_metadata(),
            }),
            warnings,
        }
    }
}
