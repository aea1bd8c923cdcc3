//! Life-cycle-model exchange graph
//!
//! Nodes are process references keyed by `(id, version)`; edges bind one
//! process's output exchange to another process's input exchange. Cycles
//! are legal.

mod check;
mod exchange_graph;

pub use check::{EdgeReport, GraphReport, NodeReport};
pub use exchange_graph::{EdgeId, EdgeState, ExchangeEdge, ExchangeGraph, ProcessKey};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("process {0} is not part of the model")]
    UnknownProcess(ProcessKey),

    #[error("process {0} is already part of the model")]
    DuplicateProcess(ProcessKey),

    #[error("edge {0} does not exist")]
    UnknownEdge(usize),

    #[error("{from}/{from_slot} -> {to}/{to_slot} is already connected")]
    DuplicateEdge {
        from: ProcessKey,
        from_slot: String,
        to: ProcessKey,
        to_slot: String,
    },

    #[error("process {process} still has {edges} connected edge(s)")]
    ProcessInUse { process: ProcessKey, edges: usize },

    #[error("model node {index} is not a process reference: {reason}")]
    InvalidNode { index: usize, reason: String },

    #[error("model edge {index} has an invalid endpoint: {reason}")]
    InvalidEdge { index: usize, reason: String },
}
