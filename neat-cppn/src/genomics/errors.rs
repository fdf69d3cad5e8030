use crate::{ConnectionKey, NodeKey};

use thiserror::Error;

/// An error type indicating an invalid genome
/// configuration value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenomeError {
    #[error("unknown activation function {0:?}")]
    UnknownActivation(String),
    #[error("unknown aggregation function {0:?}")]
    UnknownAggregation(String),
    #[error("invalid initial connection {0:?}")]
    InvalidInitialConnection(String),
    #[error("invalid structural mutation surer {0:?} (expected default, true or false)")]
    InvalidStructuralMutationSurer(String),
    #[error("invalid attribute init type {0:?} (expected gaussian or uniform)")]
    InvalidInitType(String),
}

/// An error type indicating a failure
/// to carry out a structural mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    /// There is no enabled connection to split.
    #[error("node mutation on genome without enabled connections")]
    NoConnectionToSplit,
    /// The genome has no node to connect to.
    #[error("connection mutation on genome without nodes")]
    EmptyGenome,
    /// Only output nodes remain.
    #[error("node deletion on genome without hidden nodes")]
    NoHiddenNode,
    /// There is no connection to delete.
    #[error("connection deletion on genome without connections")]
    NoConnection,
    /// The chosen connection already exists.
    #[error("connection {0:?} already exists")]
    DuplicateConnection(ConnectionKey),
    /// The chosen connection would join two output nodes.
    #[error("connection {0:?} joins two output nodes")]
    OutputToOutput(ConnectionKey),
    /// The chosen connection would close a cycle in a feed-forward genome.
    #[error("connection {0:?} creates a cycle")]
    CreatesCycle(ConnectionKey),
    /// A gene was added between unknown nodes.
    #[error("connection between nonexistent endpoint(s) {0} -> {1}")]
    NonexistentEndpoints(NodeKey, NodeKey),
}
