//! Sentence-record storage boundary
//!
//! The analysis consumes already-materialized (source text, target text,
//! alignment string) triples and does not care where they came from. This
//! module defines that contract: the record type, a store trait with the
//! select/update operations the manual-verification frontend needs, an
//! in-memory implementation, and loaders for JSON-lines dumps and raw
//! parallel corpora.

use crate::conllu::{RecordReader, record_ids};
use crate::error::AnalysisError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One sentence pair as stored: both CoNLL-U texts, the raw alignment
/// string, and whether a human has verified the alignment. Only verified
/// records enter the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub document_id: String,
    pub sentence_id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub alignment: String,
    #[serde(default)]
    pub verified: bool,
}

/// Select/update operations over sentence records, keyed by
/// (document id, sentence id).
pub trait SentenceStore {
    fn get(&self, document_id: &str, sentence_id: &str) -> Option<&SentenceRecord>;

    /// Replaces the alignment string; returns false when no such record.
    fn set_alignment(&mut self, document_id: &str, sentence_id: &str, alignment: &str) -> bool;

    /// Flips the verification flag; returns false when no such record.
    fn set_verified(&mut self, document_id: &str, sentence_id: &str, verified: bool) -> bool;

    /// All verified records, in insertion order.
    fn verified_records(&self) -> Vec<&SentenceRecord>;
}

/// In-memory store preserving corpus order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<SentenceRecord>,
    index: FxHashMap<(String, String), usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: SentenceRecord) {
        let key = (record.document_id.clone(), record.sentence_id.clone());
        match self.index.get(&key) {
            Some(&position) => self.records[position] = record,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn records(&self) -> &[SentenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads one JSON-encoded [`SentenceRecord`] per line.
    pub fn from_json_lines<R: BufRead>(reader: R) -> Result<Self, AnalysisError> {
        let mut store = Self::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            store.insert(serde_json::from_str(&line)?);
        }
        Ok(store)
    }

    /// Pairs two parallel CoNLL-U corpora by (`newdoc id`, `sent_id`) and
    /// attaches per-sentence alignment lines given in source-corpus order.
    /// Records start out unverified.
    pub fn from_parallel_corpora(
        source_corpus: &str,
        target_corpus: &str,
        alignments: &[&str],
    ) -> Result<Self, AnalysisError> {
        let source_chunks: Vec<String> =
            RecordReader::from_str(source_corpus).collect::<Result<_, _>>()?;
        let target_chunks: Vec<String> =
            RecordReader::from_str(target_corpus).collect::<Result<_, _>>()?;
        if source_chunks.len() != target_chunks.len() {
            return Err(AnalysisError::CorpusMismatch(format!(
                "{} source records vs {} target records",
                source_chunks.len(),
                target_chunks.len()
            )));
        }
        if source_chunks.len() != alignments.len() {
            return Err(AnalysisError::CorpusMismatch(format!(
                "{} records vs {} alignment lines",
                source_chunks.len(),
                alignments.len()
            )));
        }

        let mut target_by_id: FxHashMap<(String, String), &String> = FxHashMap::default();
        let mut current_doc = String::new();
        for chunk in &target_chunks {
            let (doc, sent) = record_ids(chunk);
            if let Some(doc) = doc {
                current_doc = doc;
            }
            let sent = sent.ok_or_else(|| {
                AnalysisError::CorpusMismatch("target record without sent_id".to_string())
            })?;
            target_by_id.insert((current_doc.clone(), sent), chunk);
        }

        let mut store = Self::new();
        current_doc = String::new();
        for (chunk, alignment) in source_chunks.iter().zip(alignments) {
            let (doc, sent) = record_ids(chunk);
            if let Some(doc) = doc {
                current_doc = doc;
            }
            let sent = sent.ok_or_else(|| {
                AnalysisError::CorpusMismatch("source record without sent_id".to_string())
            })?;
            let key = (current_doc.clone(), sent);
            let target = target_by_id.get(&key).ok_or_else(|| {
                AnalysisError::CorpusMismatch(format!(
                    "no target record for ({}, {})",
                    key.0, key.1
                ))
            })?;
            store.insert(SentenceRecord {
                document_id: key.0,
                sentence_id: key.1,
                source: chunk.clone(),
                target: (*target).clone(),
                alignment: alignment.to_string(),
                verified: false,
            });
        }
        Ok(store)
    }
}

impl SentenceStore for MemoryStore {
    fn get(&self, document_id: &str, sentence_id: &str) -> Option<&SentenceRecord> {
        let key = (document_id.to_string(), sentence_id.to_string());
        self.index.get(&key).map(|&position| &self.records[position])
    }

    fn set_alignment(&mut self, document_id: &str, sentence_id: &str, alignment: &str) -> bool {
        let key = (document_id.to_string(), sentence_id.to_string());
        match self.index.get(&key) {
            Some(&position) => {
                self.records[position].alignment = alignment.to_string();
                true
            }
            None => false,
        }
    }

    fn set_verified(&mut self, document_id: &str, sentence_id: &str, verified: bool) -> bool {
        let key = (document_id.to_string(), sentence_id.to_string());
        match self.index.get(&key) {
            Some(&position) => {
                self.records[position].verified = verified;
                true
            }
            None => false,
        }
    }

    fn verified_records(&self) -> Vec<&SentenceRecord> {
        self.records.iter().filter(|r| r.verified).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(sentence_id: &str, verified: bool) -> SentenceRecord {
        SentenceRecord {
            document_id: "d01".to_string(),
            sentence_id: sentence_id.to_string(),
            source: "1\ta\t_\tX\t_\t_\t0\troot\t_\t_".to_string(),
            target: "1\tb\t_\tX\t_\t_\t0\troot\t_\t_".to_string(),
            alignment: "0-0".to_string(),
            verified,
        }
    }

    #[test]
    fn test_get_and_update() {
        let mut store = MemoryStore::new();
        store.insert(sample_record("s1", false));
        assert!(store.get("d01", "s1").is_some());
        assert!(store.get("d01", "s2").is_none());

        assert!(store.set_alignment("d01", "s1", "0-0 1-1"));
        assert!(store.set_verified("d01", "s1", true));
        let record = store.get("d01", "s1").unwrap();
        assert_eq!(record.alignment, "0-0 1-1");
        assert!(record.verified);

        assert!(!store.set_alignment("d01", "missing", "0-0"));
        assert!(!store.set_verified("d01", "missing", true));
    }

    #[test]
    fn test_verified_records_filter_and_order() {
        let mut store = MemoryStore::new();
        store.insert(sample_record("s1", true));
        store.insert(sample_record("s2", false));
        store.insert(sample_record("s3", true));
        let verified = store.verified_records();
        assert_eq!(verified.len(), 2);
        assert_eq!(verified[0].sentence_id, "s1");
        assert_eq!(verified[1].sentence_id, "s3");
    }

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut store = MemoryStore::new();
        store.insert(sample_record("s1", false));
        let mut replacement = sample_record("s1", true);
        replacement.alignment = "0-0 1-1".to_string();
        store.insert(replacement);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("d01", "s1").unwrap().alignment, "0-0 1-1");
    }

    #[test]
    fn test_from_json_lines() {
        let line = serde_json::to_string(&sample_record("s1", true)).unwrap();
        let data = format!("{line}\n\n");
        let store = MemoryStore::from_json_lines(data.as_bytes()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("d01", "s1").unwrap().verified);
    }

    #[test]
    fn test_from_parallel_corpora() {
        let source = "# newdoc id = d01\n# sent_id = s1\n\
            1\ta\t_\tX\t_\t_\t0\troot\t_\t_\n\n\
            # sent_id = s2\n1\tb\t_\tX\t_\t_\t0\troot\t_\t_\n";
        let target = "# newdoc id = d01\n# sent_id = s1\n\
            1\tc\t_\tX\t_\t_\t0\troot\t_\t_\n\n\
            # sent_id = s2\n1\td\t_\tX\t_\t_\t0\troot\t_\t_\n";
        let store =
            MemoryStore::from_parallel_corpora(source, target, &["0-0", "0-0"]).unwrap();
        assert_eq!(store.len(), 2);
        let record = store.get("d01", "s2").unwrap();
        assert!(record.target.contains("\td\t"));
        assert!(!record.verified);
    }

    #[test]
    fn test_from_parallel_corpora_mismatched_ids() {
        let source = "# newdoc id = d01\n# sent_id = s1\n\
            1\ta\t_\tX\t_\t_\t0\troot\t_\t_\n";
        let target = "# newdoc id = d01\n# sent_id = s9\n\
            1\tc\t_\tX\t_\t_\t0\troot\t_\t_\n";
        let err = MemoryStore::from_parallel_corpora(source, target, &["0-0"]).unwrap_err();
        assert!(matches!(err, AnalysisError::CorpusMismatch(_)));
    }
}
