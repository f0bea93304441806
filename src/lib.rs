//! udalign: cross-lingual dependency-path analysis for parallel UD treebanks
//!
//! Parses CoNLL-U sentence pairs, reconciles many-to-many word alignments
//! into a canonical one-to-one edge set, and aggregates statistics about how
//! syntactic dependency paths in the source language correspond to paths in
//! the target language.
//!
//! Pipeline: `conllu` -> `graph` -> `alignment` -> `analysis` -> `stats`,
//! with `store` as the boundary to whatever holds the sentence records.

pub mod alignment; // Alignment parsing and one-to-many reconciliation
pub mod analysis; // Cross-lingual path comparison and the corpus counter
pub mod conllu; // CoNLL-U record parsing and corpus record reading
pub mod error;
pub mod graph; // Dependency graph, BFS depth and labeled shortest paths
pub mod stats; // Entropy statistics, CSV export, report-by-example
pub mod store; // Sentence-record contract boundary

// Python bindings
#[cfg(feature = "pyo3")]
pub mod python;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Re-exports for convenience
pub use alignment::{ReconciledAlignment, parse_alignment, reconcile};
pub use analysis::{
    AnalysisOptions, PathCounter, SentencePair, analyze_corpus, extract_path_pairs,
};
pub use conllu::{
    NodeInfo, ParseOptions, RecordReader, Sentence, extract_raw_sentences, parse_record,
};
pub use error::AnalysisError;
pub use graph::{DepGraph, Direction, Edge, PathStep, joined_labels, strip_directions};
pub use stats::{LabelStats, edge_label_report, label_stats, summarize, write_csv};
pub use store::{MemoryStore, SentenceRecord, SentenceStore};
