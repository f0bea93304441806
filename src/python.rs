//! Python bindings for udalign
//!
//! Thin PyO3 layer mirroring how the analysis was originally driven from
//! Python: parse a record, reconcile an alignment, extract paths, run a
//! corpus pass. Results come back as plain Python structures.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::alignment::reconcile;
use crate::analysis::{AnalysisOptions, SentencePair, analyze_corpus, extract_path_pairs};
use crate::conllu::{ParseOptions, extract_raw_sentences, parse_record};
use crate::error::AnalysisError;
use crate::graph::strip_directions;
use crate::stats::summarize;
use crate::store::SentenceRecord;

impl From<AnalysisError> for PyErr {
    fn from(err: AnalysisError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn options(skip_ellipsis_nodes: bool, skip_cconj_targets: bool) -> AnalysisOptions {
    AnalysisOptions {
        parse: ParseOptions {
            skip_ellipsis_nodes,
        },
        skip_cconj_targets,
    }
}

/// Node table of one record: key -> (wordform, pos, relation, parent).
#[pyfunction]
#[pyo3(signature = (record, skip_ellipsis_nodes = true))]
fn parse_conllu(
    record: &str,
    skip_ellipsis_nodes: bool,
) -> PyResult<HashMap<String, (String, String, String, String)>> {
    let sentence = parse_record(record, &ParseOptions {
        skip_ellipsis_nodes,
    })?;
    Ok(sentence
        .nodes
        .into_iter()
        .map(|(key, node)| {
            (
                key,
                (node.wordform, node.pos, node.relation, node.parent),
            )
        })
        .collect())
}

/// Labeled path between two nodes as (relation, direction) pairs.
#[pyfunction]
fn shortest_path(record: &str, from: &str, to: &str) -> PyResult<Vec<(String, String)>> {
    let sentence = parse_record(record, &ParseOptions::default())?;
    let path = sentence.graph.shortest_path(from, to)?;
    Ok(path
        .into_iter()
        .map(|step| (step.relation, step.direction.as_str().to_string()))
        .collect())
}

/// Reconciled alignment as (unaligned_source, unaligned_target, edges).
#[pyfunction]
fn reconcile_alignment(
    alignment: &str,
    source_record: &str,
    target_record: &str,
) -> PyResult<(Vec<String>, Vec<String>, Vec<(String, String)>)> {
    let parse = ParseOptions::default();
    let source = parse_record(source_record, &parse)?;
    let target = parse_record(target_record, &parse)?;
    let reconciled = reconcile(alignment, &source.graph, &target.graph)?;
    Ok((
        reconciled.unaligned_source,
        reconciled.unaligned_target,
        reconciled.edges,
    ))
}

/// (source label, joined target path) observations of one sentence pair.
#[pyfunction]
#[pyo3(signature = (source_record, target_record, alignment, skip_cconj_targets = true))]
fn sentence_pair_paths(
    source_record: &str,
    target_record: &str,
    alignment: &str,
    skip_cconj_targets: bool,
) -> PyResult<Vec<(String, String)>> {
    let record = SentenceRecord {
        document_id: String::new(),
        sentence_id: String::new(),
        source: source_record.to_string(),
        target: target_record.to_string(),
        alignment: alignment.to_string(),
        verified: true,
    };
    let opts = options(true, skip_cconj_targets);
    let pair = SentencePair::from_record(&record, &opts)?;
    Ok(extract_path_pairs(&pair, &opts)?)
}

/// Full corpus pass over (source, target, alignment, verified) tuples.
/// Returns rows of the statistics table as
/// (path, count, entropy, probs, paths).
#[pyfunction]
#[pyo3(signature = (records, skip_cconj_targets = true))]
fn analyze(
    records: Vec<(String, String, String, bool)>,
    skip_cconj_targets: bool,
) -> PyResult<Vec<(String, u64, f64, Vec<f64>, Vec<String>)>> {
    let records: Vec<SentenceRecord> = records
        .into_iter()
        .enumerate()
        .map(|(i, (source, target, alignment, verified))| SentenceRecord {
            document_id: String::new(),
            sentence_id: i.to_string(),
            source,
            target,
            alignment,
            verified,
        })
        .collect();
    let opts = options(true, skip_cconj_targets);
    let counter = analyze_corpus(records.iter(), &opts);
    Ok(summarize(&counter)
        .into_iter()
        .map(|row| {
            (
                row.label,
                row.count,
                row.entropy,
                row.top_probs.to_vec(),
                row.top_paths.to_vec(),
            )
        })
        .collect())
}

/// Source and target sentence texts of a record.
#[pyfunction]
fn raw_sentences(record: &str) -> PyResult<(String, String)> {
    Ok(extract_raw_sentences(record)?)
}

/// Directionless labels of a path returned by `shortest_path`.
#[pyfunction]
fn strip_path_directions(path: Vec<(String, String)>) -> Vec<String> {
    let steps: Vec<crate::graph::PathStep> = path
        .into_iter()
        .map(|(relation, direction)| crate::graph::PathStep {
            relation,
            direction: if direction == "down" {
                crate::graph::Direction::Down
            } else {
                crate::graph::Direction::Up
            },
        })
        .collect();
    strip_directions(&steps)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[pymodule]
fn udalign(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_conllu, m)?)?;
    m.add_function(wrap_pyfunction!(shortest_path, m)?)?;
    m.add_function(wrap_pyfunction!(reconcile_alignment, m)?)?;
    m.add_function(wrap_pyfunction!(sentence_pair_paths, m)?)?;
    m.add_function(wrap_pyfunction!(analyze, m)?)?;
    m.add_function(wrap_pyfunction!(raw_sentences, m)?)?;
    m.add_function(wrap_pyfunction!(strip_path_directions, m)?)?;
    Ok(())
}
