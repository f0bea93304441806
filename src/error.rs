//! Crate-wide error taxonomy
//!
//! Structural failures (malformed records, disconnected graphs, inconsistent
//! alignments) are deterministic functions of the input data. Callers that
//! iterate over a corpus catch them at the sentence boundary, log, and move
//! on; they are never worth retrying.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A token line did not have the 10 tab-separated CoNLL-U fields.
    #[error("malformed CoNLL-U record: expected 10 fields, found {found} in {line:?}")]
    MalformedRecord { found: usize, line: String },

    /// A required `# key = value` comment was absent from the record.
    #[error("missing sentence metadata: no `# {field} = ` comment found")]
    MissingMetadata { field: &'static str },

    /// BFS from the virtual root never visited the node. Signals a malformed
    /// tree (or an alignment index pointing outside the sentence).
    #[error("node {node:?} is unreachable from the root")]
    UnreachableNode { node: String },

    /// No path between two nodes that both exist. The input was not a single
    /// connected tree.
    #[error("dependency graph is not connected: no path from {from:?} to {to:?}")]
    DisconnectedGraph { from: String, to: String },

    /// An alignment token that is not `<idx>-<idx>` with optional `X` sides.
    #[error("malformed alignment token {token:?}")]
    MalformedAlignment { token: String },

    /// An endpoint that is neither unaligned nor present in the reconciled
    /// alignment map. Upstream alignment data omitted an edge.
    #[error("node {node:?} is neither unaligned nor present in the reconciled alignment")]
    AlignmentInconsistency { node: String },

    /// Empty candidate set passed to the minimum-depth search. One-to-many
    /// groups are non-empty by construction, so this is a caller bug.
    #[error("empty candidate set for minimum-depth search")]
    NoMinimumFound,

    /// Parallel corpora whose sentence ids do not pair up.
    #[error("parallel corpora do not line up: {0}")]
    CorpusMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
