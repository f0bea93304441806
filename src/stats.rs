//! Entropy statistics and reporting
//!
//! Consumes the corpus-wide path counter: per-source-label Shannon entropy
//! over the conditional target-path distribution with the top three
//! counterparts, CSV export of the resulting table, and a qualitative
//! report mode that groups concrete sentence pairs by outcome category.

use crate::analysis::{AnalysisOptions, PathCounter, SentencePair};
use crate::conllu::Sentence;
use crate::error::AnalysisError;
use crate::graph::{joined_labels, numeric_key};
use crate::store::SentenceRecord;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::io::Write;
use tracing::warn;

/// One row of the statistics table: a single-edge source relation label and
/// the shape of its target-path distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStats {
    pub label: String,
    pub count: u64,
    pub entropy: f64,
    pub top_probs: [f64; 3],
    pub top_paths: [String; 3],
}

/// Statistics for one source label. Counterpart ties sort by path string,
/// so the top-3 selection does not depend on map iteration order.
pub fn label_stats(label: &str, counter: &PathCounter) -> LabelStats {
    let mut counterparts = counter.counterparts(label);
    counterparts.sort_unstable_by_key(|(path, count)| (Reverse(*count), *path));
    let total: u64 = counterparts.iter().map(|(_, count)| count).sum();

    let mut entropy = 0.0;
    if total > 0 {
        for (_, count) in &counterparts {
            let probability = *count as f64 / total as f64;
            entropy -= probability * probability.log2();
        }
    }

    let mut top_probs = [0.0; 3];
    let mut top_paths = [const { String::new() }; 3];
    for (i, (path, count)) in counterparts.iter().take(3).enumerate() {
        top_probs[i] = *count as f64 / total as f64;
        top_paths[i] = path.to_string();
    }

    LabelStats {
        label: label.to_string(),
        count: total,
        entropy,
        top_probs,
        top_paths,
    }
}

/// One row per distinct source label, in sorted label order.
pub fn summarize(counter: &PathCounter) -> Vec<LabelStats> {
    counter
        .source_labels()
        .into_iter()
        .map(|label| label_stats(label, counter))
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes the statistics table in the layout of the original export:
/// `path,count,entropy,prob1,prob2,prob3,path1,path2,path3`.
pub fn write_csv<W: Write>(rows: &[LabelStats], writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "path,count,entropy,prob1,prob2,prob3,path1,path2,path3")?;
    for row in rows {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            csv_field(&row.label),
            row.count,
            row.entropy,
            row.top_probs[0],
            row.top_probs[1],
            row.top_probs[2],
            csv_field(&row.top_paths[0]),
            csv_field(&row.top_paths[1]),
            csv_field(&row.top_paths[2]),
        )?;
    }
    Ok(())
}

fn sorted_keys(sentence: &Sentence) -> Vec<&str> {
    let mut keys: Vec<&str> = sentence.nodes.keys().map(String::as_str).collect();
    keys.sort_unstable_by_key(|k| numeric_key(k));
    keys
}

fn render_example(
    source: &Sentence,
    target: &Sentence,
    source_endpoints: (&str, &str),
    target_endpoints: (&str, &str),
) -> String {
    let mut rendered_source = Vec::new();
    for key in sorted_keys(source) {
        let wordform = &source.nodes[key].wordform;
        if key == source_endpoints.0 || key == source_endpoints.1 {
            rendered_source.push(format!("<b>{wordform}</b>"));
        } else {
            rendered_source.push(wordform.clone());
        }
    }
    let mut rendered_target = Vec::new();
    for key in sorted_keys(target) {
        let wordform = &target.nodes[key].wordform;
        if key == target_endpoints.0 || key == target_endpoints.1 {
            rendered_target.push(format!("<b>{wordform}</b>"));
        } else {
            rendered_target.push(wordform.clone());
        }
    }
    format!("{} -> {}", rendered_source.join(" "), rendered_target.join(" "))
}

fn report_record(
    pair: &SentencePair,
    path_str: &str,
    index: usize,
    groups: &mut FxHashMap<String, Vec<String>>,
) -> Result<(), AnalysisError> {
    // One-to-one edges plus each member of a many-to-one group mapped to
    // its target anchor. One-to-many source anchors are excluded below.
    let mut alignment_map: FxHashMap<&str, &str> = FxHashMap::default();
    for (source, target) in &pair.alignment.one_to_one {
        alignment_map.insert(source.as_str(), target.as_str());
    }
    for (anchor, sources) in &pair.alignment.one_to_many_target {
        for source in sources {
            alignment_map.insert(source.as_str(), anchor.as_str());
        }
    }
    let accounted: FxHashSet<&str> = alignment_map
        .keys()
        .copied()
        .chain(pair.alignment.unaligned_source.iter().map(String::as_str))
        .collect();

    let keys = sorted_keys(&pair.source);
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            let (head, tail) = (keys[i], keys[j]);
            let path = pair.source.graph.shortest_path(head, tail)?;
            if joined_labels(&path) != path_str {
                continue;
            }
            if pair.alignment.is_many_source_anchor(head)
                || pair.alignment.is_many_source_anchor(tail)
            {
                continue;
            }
            let head_unaligned = pair.alignment.is_unaligned_source(head);
            let tail_unaligned = pair.alignment.is_unaligned_source(tail);

            let (category, target_head, target_tail);
            if head_unaligned && tail_unaligned {
                category = "Both endpoints unaligned".to_string();
                target_head = "";
                target_tail = "";
            } else if !accounted.contains(head) || !accounted.contains(tail) {
                // Asemantical attachments (pseudo-amod and the like), or an
                // upstream alignment omission.
                let missing = if accounted.contains(head) { tail } else { head };
                let error = AnalysisError::AlignmentInconsistency {
                    node: missing.to_string(),
                };
                warn!(index, %error, "endpoint missing from alignment, pair skipped");
                continue;
            } else if head_unaligned {
                category = "One endpoint unaligned".to_string();
                target_head = "";
                target_tail = alignment_map[tail];
            } else if tail_unaligned {
                category = "One endpoint unaligned".to_string();
                target_head = alignment_map[head];
                target_tail = "";
            } else {
                target_head = alignment_map[head];
                target_tail = alignment_map[tail];
                if target_head == target_tail {
                    category = "Nodes collapsed".to_string();
                } else {
                    let target_path =
                        pair.target.graph.shortest_path(target_head, target_tail)?;
                    category = joined_labels(&target_path);
                }
            }

            let example = render_example(
                &pair.source,
                &pair.target,
                (head, tail),
                (target_head, target_tail),
            );
            groups.entry(category).or_default().push(example);
        }
    }
    Ok(())
}

/// Groups concrete sentence pairs whose source dependency path equals
/// `path_str` by outcome category, largest group first. Records with
/// structural failures are logged and skipped.
pub fn edge_label_report<'a, I>(
    records: I,
    path_str: &str,
    options: &AnalysisOptions,
) -> Vec<(String, Vec<String>)>
where
    I: IntoIterator<Item = &'a SentenceRecord>,
{
    let mut groups: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for (index, record) in records.into_iter().enumerate() {
        if !record.verified {
            continue;
        }
        let outcome = SentencePair::from_record(record, options)
            .and_then(|pair| report_record(&pair, path_str, index + 1, &mut groups));
        if let Err(error) = outcome {
            warn!(
                index = index + 1,
                %error,
                alignment = %record.alignment,
                "skipping record in edge-label report"
            );
        }
    }
    let mut result: Vec<(String, Vec<String>)> = groups.into_iter().collect();
    result.sort_by(|(key_a, group_a), (key_b, group_b)| {
        group_b
            .len()
            .cmp(&group_a.len())
            .then_with(|| key_a.cmp(key_b))
    });
    result
}
