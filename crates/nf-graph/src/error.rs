use nf_core::{ConnectionId, CoreError, DataType, NodeId, NoteId};

use crate::port::PortType;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("no publisher registered under {0:?}")]
    UnknownPublisher(String),
    #[error("publisher {publisher:?} has no node type {node_type:?}")]
    UnknownNodeType { publisher: String, node_type: String },
    #[error("no builder registered for widget {0:?}")]
    UnknownWidgetType(String),
    #[error("invalid widget config: {0}")]
    InvalidWidgetConfig(String),
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("note {0} not found")]
    NoteNotFound(NoteId),
    #[error("connection {0} not found")]
    ConnectionNotFound(ConnectionId),
    #[error("node {node} has no widget {index}")]
    WidgetNotFound { node: NodeId, index: usize },
    #[error("node {node} has no {kind:?} port {index}")]
    PortOutOfRange {
        node: NodeId,
        kind: PortType,
        index: usize,
    },
    #[error("cannot connect {output:?} output to {input:?} input")]
    TypeMismatch { output: DataType, input: DataType },
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
