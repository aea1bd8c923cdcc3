use petgraph::Direction as EdgeDirection;
use petgraph::algo::kosaraju_scc;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, EdgeRef};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::GraphError;
use crate::models::{EntityKind, EntityReference, ModelDocument, RefVersion, ReferenceShape};

/// Stable handle to an edge; survives removal of other edges and nodes
pub type EdgeId = EdgeIndex;

/// Identity of a process node within one model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey {
    pub id: String,
    pub version: RefVersion,
}

impl ProcessKey {
    pub fn new(id: impl Into<String>, version: RefVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    pub fn of(reference: &EntityReference) -> Self {
        Self::new(reference.ref_id.clone(), reference.ref_version.clone())
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl Serialize for ProcessKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Validation state of one edge.
///
/// Every edge starts `Unvalidated` and returns there whenever it is
/// created or one of its endpoint processes changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeState {
    Unvalidated,
    Valid,
    /// An endpoint process or its exchange slot could not be found
    EndpointMissing,
    /// The source slot is not an output or the target slot is not an input
    DirectionMismatch,
    /// Both slots resolve but move different flows; informational only
    FlowDescriptorMismatch,
}

impl EdgeState {
    pub fn is_blocking(&self) -> bool {
        matches!(self, EdgeState::EndpointMissing | EdgeState::DirectionMismatch)
    }
}

impl fmt::Display for EdgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EdgeState::Unvalidated => "unvalidated",
            EdgeState::Valid => "valid",
            EdgeState::EndpointMissing => "endpoint missing",
            EdgeState::DirectionMismatch => "direction mismatch",
            EdgeState::FlowDescriptorMismatch => "flow descriptor mismatch",
        };
        f.write_str(label)
    }
}

/// An exchange binding between two processes of the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeEdge {
    pub source: ProcessKey,
    /// Internal id of an output exchange of `source`
    pub source_slot: String,
    pub target: ProcessKey,
    /// Internal id of an input exchange of `target`
    pub target_slot: String,
}

impl ExchangeEdge {
    pub fn new(
        source: ProcessKey,
        source_slot: impl Into<String>,
        target: ProcessKey,
        target_slot: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_slot: source_slot.into(),
            target,
            target_slot: target_slot.into(),
        }
    }
}

impl fmt::Display for ExchangeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.source, self.source_slot, self.target, self.target_slot
        )
    }
}

#[derive(Debug, Clone)]
pub(super) struct ProcessNode {
    pub(super) key: ProcessKey,
    pub(super) reference: EntityReference,
}

#[derive(Debug, Clone)]
pub(super) struct EdgeBinding {
    pub(super) source_slot: String,
    pub(super) target_slot: String,
    pub(super) state: EdgeState,
    pub(super) detail: Option<String>,
}

/// Process nodes and exchange edges of one life-cycle model
#[derive(Debug, Default)]
pub struct ExchangeGraph {
    pub(super) graph: StableDiGraph<ProcessNode, EdgeBinding>,
    index: HashMap<ProcessKey, NodeIndex>,
}

impl ExchangeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph described by a model document.
    ///
    /// Every edge endpoint must name a node of the document.
    pub fn from_document(document: &ModelDocument) -> Result<Self, GraphError> {
        let mut graph = Self::new();

        for (index, node) in document.nodes.iter().enumerate() {
            let reference =
                process_reference(node).map_err(|reason| GraphError::InvalidNode { index, reason })?;
            graph.add_process(reference)?;
        }

        for (index, edge) in document.edges.iter().enumerate() {
            let source = process_reference(&edge.source_process)
                .map_err(|reason| GraphError::InvalidEdge { index, reason })?;
            let target = process_reference(&edge.target_process)
                .map_err(|reason| GraphError::InvalidEdge { index, reason })?;

            graph.add_edge(ExchangeEdge::new(
                ProcessKey::of(&source),
                edge.source_output_flow_internal_id.trim(),
                ProcessKey::of(&target),
                edge.target_input_flow_internal_id.trim(),
            ))?;
        }

        debug!(
            "Loaded model with {} processes and {} edges",
            graph.process_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    pub fn add_process(&mut self, reference: EntityReference) -> Result<ProcessKey, GraphError> {
        let key = ProcessKey::of(&reference);
        if self.index.contains_key(&key) {
            return Err(GraphError::DuplicateProcess(key));
        }

        let node = self.graph.add_node(ProcessNode {
            key: key.clone(),
            reference,
        });
        self.index.insert(key.clone(), node);
        Ok(key)
    }

    /// Remove a process. Refused while any edge still touches it.
    pub fn remove_process(&mut self, key: &ProcessKey) -> Result<EntityReference, GraphError> {
        let node = self.node(key)?;
        let edges = self.incident_edges(node).len();
        if edges > 0 {
            return Err(GraphError::ProcessInUse {
                process: key.clone(),
                edges,
            });
        }

        self.index.remove(key);
        self.graph
            .remove_node(node)
            .map(|removed| removed.reference)
            .ok_or_else(|| GraphError::UnknownProcess(key.clone()))
    }

    /// Connect two processes. The new edge starts out unvalidated.
    pub fn add_edge(&mut self, edge: ExchangeEdge) -> Result<EdgeId, GraphError> {
        let source = self.node(&edge.source)?;
        let target = self.node(&edge.target)?;

        let duplicate = self.graph.edges_connecting(source, target).any(|existing| {
            existing.weight().source_slot == edge.source_slot
                && existing.weight().target_slot == edge.target_slot
        });
        if duplicate {
            return Err(GraphError::DuplicateEdge {
                from: edge.source,
                from_slot: edge.source_slot,
                to: edge.target,
                to_slot: edge.target_slot,
            });
        }

        debug!("Adding edge {edge}");
        Ok(self.graph.add_edge(
            source,
            target,
            EdgeBinding {
                source_slot: edge.source_slot,
                target_slot: edge.target_slot,
                state: EdgeState::Unvalidated,
                detail: None,
            },
        ))
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<ExchangeEdge, GraphError> {
        let edge = self.edge(id).ok_or(GraphError::UnknownEdge(id.index()))?;
        self.graph.remove_edge(id);
        debug!("Removed edge {edge}");
        Ok(edge)
    }

    /// Point a process node at another version of the same process.
    ///
    /// Its exchange list may differ, so every incident edge is reset.
    pub fn set_process_version(
        &mut self,
        key: &ProcessKey,
        version: RefVersion,
    ) -> Result<ProcessKey, GraphError> {
        let node = self.node(key)?;
        let new_key = ProcessKey::new(key.id.clone(), version.clone());
        if new_key == *key {
            return Ok(new_key);
        }
        if self.index.contains_key(&new_key) {
            return Err(GraphError::DuplicateProcess(new_key));
        }

        let weight = &mut self.graph[node];
        weight.key = new_key.clone();
        weight.reference.ref_version = version;
        self.index.remove(key);
        self.index.insert(new_key.clone(), node);
        self.reset_edges(node);
        Ok(new_key)
    }

    /// Mark every edge touching `key` as unvalidated; returns how many were reset
    pub fn invalidate_process(&mut self, key: &ProcessKey) -> Result<usize, GraphError> {
        let node = self.node(key)?;
        Ok(self.reset_edges(node))
    }

    pub fn contains(&self, key: &ProcessKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn process(&self, key: &ProcessKey) -> Option<&EntityReference> {
        let node = self.index.get(key)?;
        Some(&self.graph[*node].reference)
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessKey> {
        self.graph.node_weights().map(|node| &node.key)
    }

    pub fn process_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edge(&self, id: EdgeId) -> Option<ExchangeEdge> {
        let (source, target) = self.graph.edge_endpoints(id)?;
        let binding = self.graph.edge_weight(id)?;
        Some(ExchangeEdge {
            source: self.graph[source].key.clone(),
            source_slot: binding.source_slot.clone(),
            target: self.graph[target].key.clone(),
            target_slot: binding.target_slot.clone(),
        })
    }

    pub fn edge_state(&self, id: EdgeId) -> Option<EdgeState> {
        self.graph.edge_weight(id).map(|binding| binding.state)
    }

    /// Why the last validation pass put the edge in its current state
    pub fn edge_detail(&self, id: EdgeId) -> Option<&str> {
        self.graph.edge_weight(id)?.detail.as_deref()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.graph.edge_indices().collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, ExchangeEdge)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(|id| self.edge(id).map(|edge| (id, edge)))
    }

    /// Processes feeding directly into `key`
    pub fn upstream(&self, key: &ProcessKey) -> Vec<&ProcessKey> {
        self.neighbours(key, EdgeDirection::Incoming)
    }

    /// Processes `key` feeds directly into
    pub fn downstream(&self, key: &ProcessKey) -> Vec<&ProcessKey> {
        self.neighbours(key, EdgeDirection::Outgoing)
    }

    /// Every process reachable downstream of `key`, breadth first.
    ///
    /// Includes `key` itself only when it sits on a loop.
    pub fn reachable_from(&self, key: &ProcessKey) -> Vec<&ProcessKey> {
        let Some(&start) = self.index.get(key) else {
            return Vec::new();
        };

        let mut reached = Vec::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            if node != start {
                reached.push(&self.graph[node].key);
            }
        }

        let on_loop = self
            .graph
            .neighbors_directed(start, EdgeDirection::Incoming)
            .any(|pred| pred == start || reached.contains(&&self.graph[pred].key));
        if on_loop {
            reached.push(&self.graph[start].key);
        }
        reached
    }

    /// Groups of processes that feed back into themselves.
    ///
    /// Loops are legal in a model; this is informational.
    pub fn feedback_loops(&self) -> Vec<Vec<ProcessKey>> {
        let mut loops: Vec<Vec<ProcessKey>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.find_edge(component[0], component[0]).is_some()
            })
            .map(|component| {
                let mut keys: Vec<ProcessKey> =
                    component.into_iter().map(|n| self.graph[n].key.clone()).collect();
                keys.sort_by_key(|key| key.to_string());
                keys
            })
            .collect();
        loops.sort_by_key(|keys| keys[0].to_string());
        loops
    }

    fn node(&self, key: &ProcessKey) -> Result<NodeIndex, GraphError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::UnknownProcess(key.clone()))
    }

    fn neighbours(&self, key: &ProcessKey, direction: EdgeDirection) -> Vec<&ProcessKey> {
        let Some(&node) = self.index.get(key) else {
            return Vec::new();
        };

        let mut keys: Vec<&ProcessKey> = Vec::new();
        for neighbour in self.graph.neighbors_directed(node, direction) {
            let neighbour_key = &self.graph[neighbour].key;
            if !keys.contains(&neighbour_key) {
                keys.push(neighbour_key);
            }
        }
        keys
    }

    fn incident_edges(&self, node: NodeIndex) -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = self
            .graph
            .edges_directed(node, EdgeDirection::Outgoing)
            .chain(self.graph.edges_directed(node, EdgeDirection::Incoming))
            .map(|edge| edge.id())
            .collect();
        edges.sort();
        edges.dedup();
        edges
    }

    fn reset_edges(&mut self, node: NodeIndex) -> usize {
        let edges = self.incident_edges(node);
        for id in &edges {
            if let Some(binding) = self.graph.edge_weight_mut(*id) {
                binding.state = EdgeState::Unvalidated;
                binding.detail = None;
            }
        }
        debug!("Reset {} edge(s) of {}", edges.len(), self.graph[node].key);
        edges.len()
    }
}

/// Read a model node or edge endpoint as a process reference.
///
/// Model exports often omit the type tag on process nodes, so a bare id
/// field is accepted as a process.
fn process_reference(object: &Map<String, Value>) -> Result<EntityReference, String> {
    let shapes = ReferenceShape::defaults();

    if let Some(reference) = shapes.iter().find_map(|shape| shape.extract(object)) {
        if reference.ref_type != EntityKind::Process {
            return Err(format!("declared as a {} reference", reference.ref_type));
        }
        if reference.is_blank() {
            return Err("reference has no id".to_string());
        }
        return Ok(reference);
    }

    shapes
        .iter()
        .find_map(|shape| {
            let id = object.get(&shape.id_field)?.as_str()?.trim();
            if id.is_empty() {
                return None;
            }
            let version = object.get(&shape.version_field).and_then(Value::as_str);
            Some(EntityReference::new(
                id,
                EntityKind::Process,
                RefVersion::from_field(version),
            ))
        })
        .ok_or_else(|| "no process id".to_string())
}
