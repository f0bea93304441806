//! CoNLL-U record parsing
//!
//! Turns one serialized sentence record into a node table plus a symmetric
//! dependency graph, and reads blank-line-separated records from strings or
//! (optionally gzipped) files.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use crate::error::AnalysisError;
use crate::graph::{DepGraph, NodeKey};
use flate2::read::GzDecoder;
use memchr::{memchr, memchr_iter};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::Path;

/// Fields kept per token: FORM, UPOS, and the dependency that attaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub wordform: String,
    pub pos: String,
    pub relation: String,
    pub parent: NodeKey,
}

/// One parsed sentence: the node table and the dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Sentence {
    pub nodes: FxHashMap<NodeKey, NodeInfo>,
    pub graph: DepGraph,
}

/// Parser configuration.
///
/// Multiword-token ranges (`4-5`) are always excluded. Ellipsis nodes
/// (`4.1`) sit outside the primary tree and are excluded by default; the
/// path-entropy extraction over source-only corpora may keep them.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub skip_ellipsis_nodes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            skip_ellipsis_nodes: true,
        }
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(10);
    let mut start = 0;
    for tab in memchr_iter(b'\t', bytes) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Parses the token lines of one record into a [`Sentence`].
///
/// Comment lines are skipped; every token line must carry the 10
/// tab-separated CoNLL-U fields, of which ID, FORM, UPOS, HEAD, and DEPREL
/// are used.
pub fn parse_record(record: &str, options: &ParseOptions) -> Result<Sentence, AnalysisError> {
    let mut sentence = Sentence::default();
    for line in record.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_fields(line);
        if fields.len() != 10 {
            return Err(AnalysisError::MalformedRecord {
                found: fields.len(),
                line: line.to_string(),
            });
        }
        let key = fields[0];
        // Compound surface keys cover multiword tokens (aux, du, ...);
        // decimal keys are hidden nodes inserted for orphan handling.
        if memchr(b'-', key.as_bytes()).is_some() {
            continue;
        }
        if options.skip_ellipsis_nodes && memchr(b'.', key.as_bytes()).is_some() {
            continue;
        }
        let wordform = fields[1];
        let pos = fields[3];
        let parent = fields[6];
        let relation = fields[7];
        sentence.nodes.insert(
            key.to_string(),
            NodeInfo {
                wordform: wordform.to_string(),
                pos: pos.to_string(),
                relation: relation.to_string(),
                parent: parent.to_string(),
            },
        );
        sentence.graph.add_dependency(key, parent, relation);
    }
    Ok(sentence)
}

/// Extracts the source and target sentence texts from a target-language
/// record's comments (`# text_en = ` and `# text = ` respectively).
pub fn extract_raw_sentences(record: &str) -> Result<(String, String), AnalysisError> {
    let mut source = None;
    let mut target = None;
    for line in record.lines() {
        if let Some(value) = line.strip_prefix("# text = ") {
            target = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("# text_en = ") {
            source = Some(value.to_string());
        }
    }
    let target = target.ok_or(AnalysisError::MissingMetadata { field: "text" })?;
    let source = source.ok_or(AnalysisError::MissingMetadata { field: "text_en" })?;
    Ok((source, target))
}

/// Document and sentence ids of one record, when present.
pub fn record_ids(record: &str) -> (Option<String>, Option<String>) {
    let mut document_id = None;
    let mut sentence_id = None;
    for line in record.lines() {
        if let Some(value) = line
            .strip_prefix("# newdoc id = ")
            .or_else(|| line.strip_prefix("# newdoc_id = "))
        {
            document_id = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("# sent_id = ") {
            sentence_id = Some(value.to_string());
            break;
        }
    }
    (document_id, sentence_id)
}

/// Iterator over blank-line-separated records, yielding the raw text of
/// each (comments included).
pub struct RecordReader<R: BufRead> {
    lines: Lines<R>,
}

impl RecordReader<BufReader<Cursor<String>>> {
    pub fn from_str(text: &str) -> Self {
        let reader = BufReader::new(Cursor::new(text.to_string()));
        Self {
            lines: reader.lines(),
        }
    }
}

impl RecordReader<Box<dyn BufRead>> {
    /// Opens a corpus file; `.gz` paths are decompressed transparently.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self {
            lines: reader.lines(),
        })
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = String::new();
        loop {
            match self.lines.next() {
                None => {
                    if chunk.is_empty() {
                        return None;
                    }
                    // Last record without a trailing blank line.
                    return Some(Ok(chunk));
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        if chunk.is_empty() {
                            continue; // leading or repeated blank lines
                        }
                        return Some(Ok(chunk));
                    }
                    if !chunk.is_empty() {
                        chunk.push('\n');
                    }
                    chunk.push_str(&line);
                }
            }
        }
    }
}

/// Collects every record of an in-memory corpus.
pub fn read_records(text: &str) -> Result<Vec<String>, AnalysisError> {
    RecordReader::from_str(text)
        .collect::<Result<Vec<_>, _>>()
        .map_err(AnalysisError::from)
}
