//! Cross-lingual path comparison
//!
//! For every unordered pair of reconciled alignment edges, compares the
//! dependency path between the two source nodes with the path between their
//! aligned target nodes. Only single-relation source paths are kept; the
//! corpus-wide outcome is a counter over `(source label, target path)`
//! pairs.

use crate::alignment::{ReconciledAlignment, reconcile};
use crate::conllu::{ParseOptions, Sentence, extract_raw_sentences, parse_record};
use crate::error::AnalysisError;
use crate::graph::{joined_labels, strip_directions};
use crate::store::SentenceRecord;
use lasso::{Rodeo, Spur};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// Knobs for a corpus pass.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub parse: ParseOptions,
    /// Drop edge pairs touching a `CCONJ` target node. Coordinating
    /// conjunctions were not aligned for some language pairs, so they only
    /// contribute noise there. On by default.
    pub skip_cconj_targets: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            skip_cconj_targets: true,
        }
    }
}

/// Both parses of a sentence pair plus its reconciled alignment.
#[derive(Debug, Clone)]
pub struct SentencePair {
    pub source: Sentence,
    pub target: Sentence,
    pub alignment: ReconciledAlignment,
}

impl SentencePair {
    /// Parses both sides of a record and reconciles its alignment.
    pub fn from_record(
        record: &SentenceRecord,
        options: &AnalysisOptions,
    ) -> Result<Self, AnalysisError> {
        let source = parse_record(&record.source, &options.parse)?;
        let target = parse_record(&record.target, &options.parse)?;
        let alignment = reconcile(&record.alignment, &source.graph, &target.graph)?;
        Ok(Self {
            source,
            target,
            alignment,
        })
    }
}

/// Corpus-wide `(source label, target path)` counter.
///
/// Owned by the batch: created before the pass, read for statistics after,
/// then discarded. Labels and joined target paths are interned, so a corpus
/// with thousands of sentences stores each distinct string once.
#[derive(Default)]
pub struct PathCounter {
    interner: Rodeo,
    counts: FxHashMap<(Spur, Spur), u64>,
}

impl std::fmt::Debug for PathCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCounter")
            .field("keys", &self.counts.len())
            .finish()
    }
}

impl PathCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, source_label: &str, target_path: &str) {
        let key = (
            self.interner.get_or_intern(source_label),
            self.interner.get_or_intern(target_path),
        );
        *self.counts.entry(key).or_default() += 1;
    }

    pub fn extend<I, A, B>(&mut self, observations: I)
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        for (label, path) in observations {
            self.record(label.as_ref(), path.as_ref());
        }
    }

    pub fn get(&self, source_label: &str, target_path: &str) -> u64 {
        let (Some(label), Some(path)) = (
            self.interner.get(source_label),
            self.interner.get(target_path),
        ) else {
            return 0;
        };
        self.counts.get(&(label, path)).copied().unwrap_or(0)
    }

    /// Number of distinct `(source label, target path)` keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.counts.iter().map(|((label, path), count)| {
            (
                self.interner.resolve(label),
                self.interner.resolve(path),
                *count,
            )
        })
    }

    /// Distinct single-edge source labels, sorted for deterministic output.
    pub fn source_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .counts
            .keys()
            .map(|(label, _)| self.interner.resolve(label))
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// The conditional distribution of target paths for one source label,
    /// as `(target path, count)` pairs.
    pub fn counterparts(&self, source_label: &str) -> Vec<(&str, u64)> {
        let Some(label) = self.interner.get(source_label) else {
            return Vec::new();
        };
        self.counts
            .iter()
            .filter(|((l, _), _)| *l == label)
            .map(|((_, path), count)| (self.interner.resolve(path), *count))
            .collect()
    }

    /// Total observations for one source label.
    pub fn total(&self, source_label: &str) -> u64 {
        self.counterparts(source_label)
            .iter()
            .map(|(_, count)| count)
            .sum()
    }
}

/// Extracts all `(source label, joined target path)` observations from one
/// sentence pair.
///
/// Pairs whose source path spans more than one relation are discarded; the
/// analysis characterizes single-edge source dependencies only. Two source
/// nodes collapsing onto one target node yield an empty target path.
pub fn extract_path_pairs(
    pair: &SentencePair,
    options: &AnalysisOptions,
) -> Result<Vec<(String, String)>, AnalysisError> {
    let edges = &pair.alignment.edges;
    let mut observations = Vec::new();
    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            let (source_a, target_a) = (&edges[i].0, &edges[i].1);
            let (source_b, target_b) = (&edges[j].0, &edges[j].1);
            let pos_a = target_pos(pair, target_a)?;
            let pos_b = target_pos(pair, target_b)?;
            if options.skip_cconj_targets && (pos_a == "CCONJ" || pos_b == "CCONJ") {
                continue;
            }
            let source_path = pair.source.graph.shortest_path(source_a, source_b)?;
            let labels = strip_directions(&source_path);
            if labels.len() != 1 {
                continue;
            }
            let target_path = pair.target.graph.shortest_path(target_a, target_b)?;
            observations.push((labels[0].to_string(), joined_labels(&target_path)));
        }
    }
    Ok(observations)
}

fn target_pos<'a>(pair: &'a SentencePair, key: &str) -> Result<&'a str, AnalysisError> {
    pair.target
        .nodes
        .get(key)
        .map(|node| node.pos.as_str())
        .ok_or_else(|| AnalysisError::AlignmentInconsistency {
            node: key.to_string(),
        })
}

/// Runs a full corpus pass over verified records.
///
/// A structural failure in one record is logged together with the record's
/// position and raw sentence texts, and that record is skipped; the
/// aggregation continues. The counter is only updated after a record has
/// been processed completely, so a failing record contributes nothing.
pub fn analyze_corpus<'a, I>(records: I, options: &AnalysisOptions) -> PathCounter
where
    I: IntoIterator<Item = &'a SentenceRecord>,
{
    let mut counter = PathCounter::new();
    for (index, record) in records.into_iter().enumerate() {
        if !record.verified {
            continue;
        }
        let observations = SentencePair::from_record(record, options)
            .and_then(|pair| extract_path_pairs(&pair, options));
        match observations {
            Ok(observations) => {
                debug!(index = index + 1, pairs = observations.len(), "record processed");
                counter.extend(observations);
            }
            Err(error) => {
                let text = extract_raw_sentences(&record.target)
                    .map(|(source, target)| format!("{source} || {target}"))
                    .unwrap_or_else(|_| record.target.clone());
                warn!(
                    index = index + 1,
                    %error,
                    alignment = %record.alignment,
                    sentences = %text,
                    "skipping record"
                );
            }
        }
    }
    counter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SentenceRecord;
    use pretty_assertions::assert_eq;

    fn record(source: &str, target: &str, alignment: &str, verified: bool) -> SentenceRecord {
        SentenceRecord {
            document_id: "d01".to_string(),
            sentence_id: "s1".to_string(),
            source: source.to_string(),
            target: target.to_string(),
            alignment: alignment.to_string(),
            verified,
        }
    }

    const DET_SOURCE: &str = "# text_en = The dog\n\
        1\tThe\t_\tDET\t_\t_\t2\tdet\t_\t_\n\
        2\tdog\t_\tNOUN\t_\t_\t0\troot\t_\t_\n";
    const DET_TARGET: &str = "# text = Le chien\n\
        # text_en = The dog\n\
        1\tLe\t_\tDET\t_\t_\t2\tdet\t_\t_\n\
        2\tchien\t_\tNOUN\t_\t_\t0\troot\t_\t_\n";

    #[test]
    fn test_end_to_end_det_example() {
        let record = record(DET_SOURCE, DET_TARGET, "0-0 1-1", true);
        let options = AnalysisOptions::default();
        let pair = SentencePair::from_record(&record, &options).unwrap();
        assert_eq!(
            pair.alignment.edges,
            vec![
                ("1".to_string(), "1".to_string()),
                ("2".to_string(), "2".to_string()),
            ]
        );
        let counter = analyze_corpus([&record], &options);
        assert_eq!(counter.get("det", "det"), 1);
        assert_eq!(counter.len(), 1);
    }

    #[test]
    fn test_unverified_records_are_ignored() {
        let record = record(DET_SOURCE, DET_TARGET, "0-0 1-1", false);
        let counter = analyze_corpus([&record], &AnalysisOptions::default());
        assert!(counter.is_empty());
    }

    #[test]
    fn test_malformed_alignment_leaves_counter_unmodified() {
        let good = record(DET_SOURCE, DET_TARGET, "0-0 1-1", true);
        let bad = record(DET_SOURCE, DET_TARGET, "1", true);
        let counter = analyze_corpus([&bad, &good], &AnalysisOptions::default());
        assert_eq!(counter.get("det", "det"), 1);
        assert_eq!(counter.len(), 1);
    }

    #[test]
    fn test_disconnected_record_is_skipped() {
        // Node 1 hangs off a parent id outside the sentence, so the graph
        // has two components and the 1-2 path query fails.
        let broken = "# text_en = broken\n\
            1\ta\t_\tDET\t_\t_\t9\tdet\t_\t_\n\
            2\tb\t_\tNOUN\t_\t_\t0\troot\t_\t_\n";
        let bad = record(broken, DET_TARGET, "0-0 1-1", true);
        let good = record(DET_SOURCE, DET_TARGET, "0-0 1-1", true);
        let counter = analyze_corpus([&bad, &good], &AnalysisOptions::default());
        assert_eq!(counter.get("det", "det"), 1);
    }

    #[test]
    fn test_multi_hop_source_paths_are_discarded() {
        let source = "# text_en = The big dog\n\
            1\tThe\t_\tDET\t_\t_\t3\tdet\t_\t_\n\
            2\tbig\t_\tADJ\t_\t_\t3\tamod\t_\t_\n\
            3\tdog\t_\tNOUN\t_\t_\t0\troot\t_\t_\n";
        let target = "# text = Le gros chien\n\
            1\tLe\t_\tDET\t_\t_\t3\tdet\t_\t_\n\
            2\tgros\t_\tADJ\t_\t_\t3\tamod\t_\t_\n\
            3\tchien\t_\tNOUN\t_\t_\t0\troot\t_\t_\n";
        let record = record(source, target, "0-0 1-1 2-2", true);
        let counter = analyze_corpus([&record], &AnalysisOptions::default());
        // det->amod between nodes 1 and 2 is two hops and is dropped.
        assert_eq!(counter.get("det", "det"), 1);
        assert_eq!(counter.get("amod", "amod"), 1);
        assert_eq!(counter.len(), 2);
    }

    #[test]
    fn test_cconj_targets_skipped() {
        let source = "# text_en = dogs and cats\n\
            1\tdogs\t_\tNOUN\t_\t_\t0\troot\t_\t_\n\
            2\tand\t_\tCCONJ\t_\t_\t3\tcc\t_\t_\n\
            3\tcats\t_\tNOUN\t_\t_\t1\tconj\t_\t_\n";
        let target = "# text = chiens et chats\n\
            1\tchiens\t_\tNOUN\t_\t_\t0\troot\t_\t_\n\
            2\tet\t_\tCCONJ\t_\t_\t3\tcc\t_\t_\n\
            3\tchats\t_\tNOUN\t_\t_\t1\tconj\t_\t_\n";
        let record = record(source, target, "0-0 1-1 2-2", true);

        let keeping = AnalysisOptions {
            skip_cconj_targets: false,
            ..AnalysisOptions::default()
        };
        let with_cconj = analyze_corpus([&record], &keeping);
        assert_eq!(with_cconj.get("cc", "cc"), 1);

        let without = analyze_corpus([&record], &AnalysisOptions::default());
        assert_eq!(without.get("cc", "cc"), 0);
        assert_eq!(without.get("conj", "conj"), 1);
        assert_eq!(without.len(), 1);
    }

    #[test]
    fn test_single_reconciled_edge_yields_no_pairs() {
        // Both source words align to the single target word.
        let source = DET_SOURCE;
        let target = "# text = Chien\n\
            1\tChien\t_\tNOUN\t_\t_\t0\troot\t_\t_\n";
        // Sources {1,2} -> target 1: many-to-one by target, collapsed to
        // the shallower source 2; only one reconciled edge, no pairs.
        let record = record(source, target, "0-0 1-0", true);
        let counter = analyze_corpus([&record], &AnalysisOptions::default());
        assert!(counter.is_empty());
    }

    #[test]
    fn test_alignment_index_outside_target_is_skipped() {
        // Target index 4 normalises to key "5", which the two-token target
        // sentence does not have.
        let bad = record(DET_SOURCE, DET_TARGET, "0-0 1-4", true);
        let options = AnalysisOptions::default();
        let pair = SentencePair::from_record(&bad, &options).unwrap();
        let err = extract_path_pairs(&pair, &options).unwrap_err();
        assert!(matches!(err, AnalysisError::AlignmentInconsistency { node } if node == "5"));

        let good = record(DET_SOURCE, DET_TARGET, "0-0 1-1", true);
        let counter = analyze_corpus([&bad, &good], &options);
        assert_eq!(counter.get("det", "det"), 1);
        assert_eq!(counter.len(), 1);
    }

    #[test]
    fn test_counter_accessors() {
        let mut counter = PathCounter::new();
        counter.record("det", "det");
        counter.record("det", "case->det");
        counter.record("det", "det");
        counter.record("nsubj", "nsubj");
        assert_eq!(counter.total("det"), 3);
        assert_eq!(counter.source_labels(), vec!["det", "nsubj"]);
        let mut counterparts = counter.counterparts("det");
        counterparts.sort_unstable();
        assert_eq!(counterparts, vec![("case->det", 1), ("det", 2)]);
        assert_eq!(counter.get("absent", "absent"), 0);
    }
}
