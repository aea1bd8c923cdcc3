//! Edge and node validation for [`ExchangeGraph`]

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::exchange_graph::{EdgeId, EdgeState, ExchangeEdge, ExchangeGraph, ProcessKey, ProcessNode};
use crate::models::{Direction, EntityKind, EntityRecord, VersionString, process};
use crate::resolver::{Resolution, Resolver};
use crate::store::StoreRegistry;
use crate::validation::DEFAULT_MAX_CONCURRENT_LOOKUPS;

/// State of one edge after a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeReport {
    pub id: usize,
    #[serde(flatten)]
    pub edge: ExchangeEdge,
    pub state: EdgeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Resolution and reference-flow completeness of one process node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub process: ProcessKey,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<VersionString>,
    /// The process declares at least one quantitative-reference exchange
    pub reference_complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphReport {
    pub edges: Vec<EdgeReport>,
    pub nodes: Vec<NodeReport>,
    pub feedback_loops: Vec<Vec<ProcessKey>>,
}

impl GraphReport {
    /// True when any edge is in a state that must be repaired
    pub fn has_blocking(&self) -> bool {
        self.edges.iter().any(|edge| edge.state.is_blocking())
    }

    pub fn count(&self, state: EdgeState) -> usize {
        self.edges.iter().filter(|edge| edge.state == state).count()
    }

    /// Nodes that resolved but declare no reference flow
    pub fn incomplete_nodes(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|node| !node.reference_complete)
    }
}

struct EdgeCheck {
    state: EdgeState,
    detail: Option<String>,
}

impl EdgeCheck {
    fn new(state: EdgeState, detail: impl Into<String>) -> Self {
        Self {
            state,
            detail: Some(detail.into()),
        }
    }
}

/// The exchange an edge endpoint is bound to
enum Endpoint {
    Missing(String),
    Found {
        direction: Option<Direction>,
        flow_id: Option<String>,
    },
}

impl ExchangeGraph {
    /// Validate every edge in a fresh run and report on the whole graph
    pub async fn validate(&mut self, stores: &StoreRegistry) -> GraphReport {
        let resolver = Resolver::new(stores.clone());
        self.validate_with(&resolver).await
    }

    /// Validate every edge using an existing run's resolver
    pub async fn validate_with(&mut self, resolver: &Resolver) -> GraphReport {
        let edges = self.graph.edge_indices().collect();
        self.check_edges(resolver, edges).await;
        self.report(resolver).await
    }

    /// Validate only edges that are still unvalidated; returns how many were checked
    pub async fn validate_pending(&mut self, resolver: &Resolver) -> usize {
        let pending: Vec<EdgeId> = self
            .graph
            .edge_indices()
            .filter(|id| self.graph[*id].state == EdgeState::Unvalidated)
            .collect();
        let count = pending.len();
        self.check_edges(resolver, pending).await;
        count
    }

    /// Current edge states plus per-node resolution, without revalidating edges
    pub async fn report(&self, resolver: &Resolver) -> GraphReport {
        let edges = self
            .graph
            .edge_indices()
            .filter_map(|id| {
                let binding = &self.graph[id];
                self.edge(id).map(|edge| EdgeReport {
                    id: id.index(),
                    edge,
                    state: binding.state,
                    detail: binding.detail.clone(),
                })
            })
            .collect();

        let nodes = stream::iter(self.graph.node_weights())
            .map(|node| node_report(resolver, node))
            .buffered(DEFAULT_MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await;

        GraphReport {
            edges,
            nodes,
            feedback_loops: self.feedback_loops(),
        }
    }

    async fn check_edges(&mut self, resolver: &Resolver, ids: Vec<EdgeId>) {
        let checks: Vec<(EdgeId, EdgeCheck)> = {
            let graph = &*self;
            stream::iter(ids)
                .map(move |id| async move { (id, graph.check_edge(resolver, id).await) })
                .buffered(DEFAULT_MAX_CONCURRENT_LOOKUPS)
                .collect()
                .await
        };

        let checked = checks.len();
        let mut blocking = 0;
        for (id, check) in checks {
            if check.state.is_blocking() {
                blocking += 1;
            }
            if let Some(binding) = self.graph.edge_weight_mut(id) {
                binding.state = check.state;
                binding.detail = check.detail;
            }
        }
        info!(
            "Validated {} edge(s), {} need repair",
            checked, blocking
        );
    }

    async fn check_edge(&self, resolver: &Resolver, id: EdgeId) -> EdgeCheck {
        let Some((source, target)) = self.graph.edge_endpoints(id) else {
            return EdgeCheck::new(EdgeState::EndpointMissing, "edge no longer exists");
        };
        let binding = &self.graph[id];

        let (source_end, target_end) = futures::join!(
            endpoint(resolver, &self.graph[source], &binding.source_slot),
            endpoint(resolver, &self.graph[target], &binding.target_slot)
        );

        let check = classify(source_end, target_end);
        debug!(
            "Edge {} is {}",
            self.edge(id).map(|edge| edge.to_string()).unwrap_or_default(),
            check.state
        );
        check
    }
}

fn classify(source: Endpoint, target: Endpoint) -> EdgeCheck {
    let (source_direction, source_flow) = match source {
        Endpoint::Missing(reason) => return EdgeCheck::new(EdgeState::EndpointMissing, reason),
        Endpoint::Found { direction, flow_id } => (direction, flow_id),
    };
    let (target_direction, target_flow) = match target {
        Endpoint::Missing(reason) => return EdgeCheck::new(EdgeState::EndpointMissing, reason),
        Endpoint::Found { direction, flow_id } => (direction, flow_id),
    };

    if source_direction != Some(Direction::Output) {
        return EdgeCheck::new(
            EdgeState::DirectionMismatch,
            format!("source exchange is {}", describe_direction(source_direction)),
        );
    }
    if target_direction != Some(Direction::Input) {
        return EdgeCheck::new(
            EdgeState::DirectionMismatch,
            format!("target exchange is {}", describe_direction(target_direction)),
        );
    }

    match (source_flow, target_flow) {
        (Some(source_flow), Some(target_flow)) if source_flow != target_flow => EdgeCheck::new(
            EdgeState::FlowDescriptorMismatch,
            format!("source moves flow {source_flow}, target expects {target_flow}"),
        ),
        _ => EdgeCheck {
            state: EdgeState::Valid,
            detail: None,
        },
    }
}

fn describe_direction(direction: Option<Direction>) -> String {
    match direction {
        Some(direction) => format!("an {direction}"),
        None => "missing a direction".to_string(),
    }
}

async fn endpoint(resolver: &Resolver, node: &ProcessNode, slot: &str) -> Endpoint {
    let record = match resolve_process(resolver, node).await {
        Ok(record) => record,
        Err(reason) => return Endpoint::Missing(reason),
    };

    let exchanges = process::exchanges(&record);
    match process::find_exchange(&exchanges, slot) {
        Some(exchange) => Endpoint::Found {
            direction: exchange.direction,
            flow_id: exchange
                .flow
                .as_ref()
                .filter(|flow| !flow.is_blank())
                .map(|flow| flow.ref_id.clone()),
        },
        None => Endpoint::Missing(format!("process {} has no exchange {slot}", node.key)),
    }
}

/// Resolve a node to a process record; any failure is reported as a reason
async fn resolve_process(resolver: &Resolver, node: &ProcessNode) -> Result<Arc<EntityRecord>, String> {
    let reference = &node.reference;
    match resolver
        .resolve(EntityKind::Process, &reference.ref_id, &reference.ref_version)
        .await
    {
        Ok(Resolution::Found(record)) if record.kind == EntityKind::Process => Ok(record),
        Ok(Resolution::Found(record)) => Err(format!("{} is a {}, not a process", node.key, record.kind)),
        Ok(Resolution::NotFound) => Err(format!("process {} does not exist", node.key)),
        Ok(Resolution::VersionNotFound { .. }) => {
            Err(format!("process {} does not exist at that version", node.key))
        }
        Err(e) => Err(format!("process {} could not be resolved: {e}", node.key)),
    }
}

async fn node_report(resolver: &Resolver, node: &ProcessNode) -> NodeReport {
    match resolve_process(resolver, node).await {
        Ok(record) => NodeReport {
            process: node.key.clone(),
            resolved: true,
            resolved_version: Some(record.version.clone()),
            reference_complete: process::exchanges(&record)
                .iter()
                .any(|exchange| exchange.quantitative_reference),
        },
        Err(_) => NodeReport {
            process: node.key.clone(),
            resolved: false,
            resolved_version: None,
            reference_complete: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityReference, RefVersion};
    use crate::store::MemoryStore;
    use serde_json::{Value, json};

    fn version() -> VersionString {
        VersionString::parse("01.00.000").unwrap()
    }

    fn key(id: &str) -> ProcessKey {
        ProcessKey::new(id, RefVersion::Pinned(version()))
    }

    fn process_record(id: &str, exchanges: Value) -> EntityRecord {
        EntityRecord::new(
            EntityKind::Process,
            id,
            version(),
            json!({ "processDataSet": { "exchanges": { "exchange": exchanges } } }),
        )
    }

    fn exchange(slot: &str, direction: &str, flow: &str) -> Value {
        json!({
            "@dataSetInternalID": slot,
            "exchangeDirection": direction,
            "referenceToFlowDataSet": { "@refObjectId": flow, "@type": "flow data set" }
        })
    }

    fn two_process_graph() -> (ExchangeGraph, EdgeId) {
        let mut graph = ExchangeGraph::new();
        for id in ["a", "b"] {
            graph
                .add_process(EntityReference::new(id, EntityKind::Process, RefVersion::Pinned(version())))
                .unwrap();
        }
        let edge = graph
            .add_edge(ExchangeEdge::new(key("a"), "3", key("b"), "7"))
            .unwrap();
        (graph, edge)
    }

    fn registry(store: &MemoryStore) -> StoreRegistry {
        StoreRegistry::shared(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_direction_change_flips_edge_on_next_pass() {
        let store = MemoryStore::new();
        store.insert(process_record("a", json!([exchange("3", "Output", "steel")])));
        store.insert(process_record("b", json!([exchange("7", "Input", "steel")])));
        let (mut graph, edge) = two_process_graph();

        let report = graph.validate(&registry(&store)).await;
        assert_eq!(graph.edge_state(edge), Some(EdgeState::Valid));
        assert!(!report.has_blocking());

        store.insert(process_record("a", json!([exchange("3", "Input", "steel")])));
        let report = graph.validate(&registry(&store)).await;
        assert_eq!(graph.edge_state(edge), Some(EdgeState::DirectionMismatch));
        assert!(report.has_blocking());
        // edges are flagged, never dropped
        assert_eq!(graph.edge_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_slot_or_process_is_endpoint_missing() {
        let store = MemoryStore::new();
        store.insert(process_record("a", json!([exchange("4", "Output", "steel")])));
        store.insert(process_record("b", json!([exchange("7", "Input", "steel")])));
        let (mut graph, edge) = two_process_graph();

        graph.validate(&registry(&store)).await;
        assert_eq!(graph.edge_state(edge), Some(EdgeState::EndpointMissing));
        assert!(graph.edge_detail(edge).unwrap().contains("no exchange 3"));

        store.remove_version("b", &version());
        store.insert(process_record("a", json!([exchange("3", "Output", "steel")])));
        graph.validate(&registry(&store)).await;
        assert_eq!(graph.edge_state(edge), Some(EdgeState::EndpointMissing));
    }

    #[tokio::test]
    async fn test_transport_failure_is_endpoint_missing() {
        let store = MemoryStore::new();
        store.insert(process_record("a", json!([exchange("3", "Output", "steel")])));
        store.insert(process_record("b", json!([exchange("7", "Input", "steel")])));
        store.fail_on("b");
        let (mut graph, edge) = two_process_graph();

        let report = graph.validate(&registry(&store)).await;
        assert_eq!(graph.edge_state(edge), Some(EdgeState::EndpointMissing));
        assert!(!report.nodes[1].resolved);
    }

    #[tokio::test]
    async fn test_different_flows_are_non_blocking() {
        let store = MemoryStore::new();
        store.insert(process_record("a", json!([exchange("3", "output", "steel")])));
        store.insert(process_record("b", json!([exchange("7", "input", "scrap")])));
        let (mut graph, edge) = two_process_graph();

        let report = graph.validate(&registry(&store)).await;
        assert_eq!(graph.edge_state(edge), Some(EdgeState::FlowDescriptorMismatch));
        assert!(!report.has_blocking());
    }

    #[tokio::test]
    async fn test_validate_pending_skips_checked_edges() {
        let store = MemoryStore::new();
        store.insert(process_record("a", json!([exchange("3", "Output", "steel")])));
        store.insert(process_record("b", json!([exchange("7", "Input", "steel")])));
        let (mut graph, edge) = two_process_graph();

        let resolver = Resolver::new(registry(&store));
        assert_eq!(graph.validate_pending(&resolver).await, 1);
        assert_eq!(graph.validate_pending(&resolver).await, 0);

        graph.invalidate_process(&key("b")).unwrap();
        assert_eq!(graph.edge_state(edge), Some(EdgeState::Unvalidated));
        assert_eq!(graph.validate_pending(&resolver).await, 1);
        assert_eq!(graph.edge_state(edge), Some(EdgeState::Valid));
    }

    #[tokio::test]
    async fn test_node_report_tracks_reference_flow() {
        let store = MemoryStore::new();
        let mut with_reference = exchange("3", "Output", "steel");
        with_reference["quantitativeReference"] = json!(true);
        store.insert(process_record("a", json!([with_reference])));
        store.insert(process_record("b", json!([exchange("7", "Input", "steel")])));
        let (mut graph, _) = two_process_graph();

        let report = graph.validate(&registry(&store)).await;

        assert!(report.nodes.iter().all(|node| node.resolved));
        let incomplete: Vec<&ProcessKey> = report.incomplete_nodes().map(|n| &n.process).collect();
        assert_eq!(incomplete, vec![&key("b")]);
    }

    #[tokio::test]
    async fn test_shared_process_is_fetched_once_per_pass() {
        let store = MemoryStore::new();
        store.insert(process_record(
            "a",
            json!([exchange("1", "Output", "steel"), exchange("2", "Output", "steel")]),
        ));
        store.insert(process_record(
            "b",
            json!([exchange("1", "Input", "steel"), exchange("2", "Input", "steel")]),
        ));
        let (mut graph, _) = two_process_graph();
        graph.add_edge(ExchangeEdge::new(key("a"), "1", key("b"), "1")).unwrap();
        graph.add_edge(ExchangeEdge::new(key("a"), "2", key("b"), "2")).unwrap();

        let report = graph.validate(&registry(&store)).await;

        assert_eq!(report.count(EdgeState::Valid), 2);
        assert_eq!(report.count(EdgeState::EndpointMissing), 1);
        assert_eq!(store.calls().fetch_count("a", &version()), 1);
        assert_eq!(store.calls().fetch_count("b", &version()), 1);
    }
}
