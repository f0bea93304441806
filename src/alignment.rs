//! Word-alignment parsing and reconciliation
//!
//! Raw alignments are whitespace-separated `i-j` tokens with 0-based
//! indices; `X` on either side marks an unaligned word. Reconciliation
//! normalizes indices to the 1-based string keys used by the graphs,
//! partitions the edges by degree, and collapses each one-to-many group to
//! a single representative edge chosen by minimum depth in the many side's
//! graph.

use crate::error::AnalysisError;
use crate::graph::{DepGraph, NodeKey, numeric_key};
use rustc_hash::FxHashMap;

/// One raw alignment edge after index normalization. `"X"` survives
/// normalization untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEdge {
    pub source: NodeKey,
    pub target: NodeKey,
}

/// Converts a 0-based alignment index to a 1-based node key.
fn normalise_key(token: &str, full: &str) -> Result<NodeKey, AnalysisError> {
    if token == "X" {
        return Ok("X".to_string());
    }
    // atoi stops at the first non-digit, so the whole token must be checked.
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AnalysisError::MalformedAlignment {
            token: full.to_string(),
        });
    }
    match atoi::atoi::<u64>(token.as_bytes()) {
        Some(index) => Ok((index + 1).to_string()),
        None => Err(AnalysisError::MalformedAlignment {
            token: full.to_string(),
        }),
    }
}

/// Parses a raw alignment string into normalized edges. A token without
/// exactly one hyphen, or with a side that is neither an index nor `X`,
/// is malformed.
pub fn parse_alignment(alignment: &str) -> Result<Vec<RawEdge>, AnalysisError> {
    let mut edges = Vec::new();
    for token in alignment.split_whitespace() {
        let mut parts = token.split('-');
        let (Some(source), Some(target), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AnalysisError::MalformedAlignment {
                token: token.to_string(),
            });
        };
        edges.push(RawEdge {
            source: normalise_key(source, token)?,
            target: normalise_key(target, token)?,
        });
    }
    Ok(edges)
}

/// The reconciled form of a sentence pair's alignment.
///
/// The partition over nodes is total and disjoint: every aligned node is
/// either unaligned, the anchor or a member of exactly one one-to-many
/// group, or an endpoint of exactly one one-to-one edge.
#[derive(Debug, Clone, Default)]
pub struct ReconciledAlignment {
    /// Source keys aligned to `X`.
    pub unaligned_source: Vec<NodeKey>,
    /// Target keys aligned to `X`.
    pub unaligned_target: Vec<NodeKey>,
    /// Source anchors with their multiple target counterparts, in ascending
    /// numeric anchor order.
    pub one_to_many_source: Vec<(NodeKey, Vec<NodeKey>)>,
    /// Target anchors with their multiple source counterparts, in ascending
    /// numeric anchor order.
    pub one_to_many_target: Vec<(NodeKey, Vec<NodeKey>)>,
    /// Edges with degree 1 on both sides, before collapse.
    pub one_to_one: Vec<(NodeKey, NodeKey)>,
    /// `one_to_one` plus one representative edge per collapsed group,
    /// sorted ascending by the numeric value of the source key.
    pub edges: Vec<(NodeKey, NodeKey)>,
}

impl ReconciledAlignment {
    pub fn is_many_source_anchor(&self, key: &str) -> bool {
        self.one_to_many_source.iter().any(|(anchor, _)| anchor == key)
    }

    pub fn is_unaligned_source(&self, key: &str) -> bool {
        self.unaligned_source.iter().any(|k| k == key)
    }
}

fn group_push(groups: &mut Vec<(NodeKey, Vec<NodeKey>)>, anchor: &str, member: &str) {
    if let Some((_, members)) = groups.iter_mut().find(|(a, _)| a == anchor) {
        members.push(member.to_string());
    } else {
        groups.push((anchor.to_string(), vec![member.to_string()]));
    }
}

/// Reconciles a raw alignment against the two dependency graphs.
///
/// Degree counts decide the partition. An edge whose source has degree > 1
/// always routes into the by-source group map, even when its target side
/// looks one-to-one locally; only then is the target degree consulted.
/// Each group is then collapsed to `(anchor, minimum-depth counterpart)`.
pub fn reconcile(
    alignment: &str,
    source_graph: &DepGraph,
    target_graph: &DepGraph,
) -> Result<ReconciledAlignment, AnalysisError> {
    let raw = parse_alignment(alignment)?;

    let mut source_degrees: FxHashMap<&str, u32> = FxHashMap::default();
    let mut target_degrees: FxHashMap<&str, u32> = FxHashMap::default();
    let mut result = ReconciledAlignment::default();
    let mut real_edges = Vec::new();

    for edge in &raw {
        if edge.source == "X" {
            if edge.target != "X" {
                result.unaligned_target.push(edge.target.clone());
            }
        } else if edge.target == "X" {
            result.unaligned_source.push(edge.source.clone());
        } else {
            *source_degrees.entry(edge.source.as_str()).or_default() += 1;
            *target_degrees.entry(edge.target.as_str()).or_default() += 1;
            real_edges.push(edge);
        }
    }

    for edge in real_edges {
        if source_degrees[edge.source.as_str()] > 1 {
            group_push(&mut result.one_to_many_source, &edge.source, &edge.target);
        } else if target_degrees[edge.target.as_str()] > 1 {
            group_push(&mut result.one_to_many_target, &edge.target, &edge.source);
        } else {
            result.one_to_one.push((edge.source.clone(), edge.target.clone()));
        }
    }
    result
        .one_to_many_source
        .sort_unstable_by_key(|(anchor, _)| numeric_key(anchor));
    result
        .one_to_many_target
        .sort_unstable_by_key(|(anchor, _)| numeric_key(anchor));

    // Collapse each group to the counterpart nearest the root.
    result.edges = result.one_to_one.clone();
    for (anchor, targets) in &result.one_to_many_source {
        let representative = target_graph.minimum_depth_node(targets)?;
        result.edges.push((anchor.clone(), representative));
    }
    for (anchor, sources) in &result.one_to_many_target {
        let representative = source_graph.minimum_depth_node(sources)?;
        result.edges.push((representative, anchor.clone()));
    }
    // Downstream pairwise extraction enumerates combinations of this list,
    // so the ordering is part of the contract.
    result
        .edges
        .sort_unstable_by_key(|(source, _)| numeric_key(source));

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph(relations: &[&str]) -> DepGraph {
        // 0 -> 1 -> 2 -> ... with the given labels.
        let mut graph = DepGraph::new();
        for (i, relation) in relations.iter().enumerate() {
            let child = (i + 1).to_string();
            let parent = i.to_string();
            graph.add_dependency(&child, &parent, relation);
        }
        graph
    }

    #[test]
    fn test_parse_alignment_normalises_indices() {
        let edges = parse_alignment("0-0 1-2 X-3 4-X").unwrap();
        assert_eq!(
            edges,
            vec![
                RawEdge {
                    source: "1".into(),
                    target: "1".into()
                },
                RawEdge {
                    source: "2".into(),
                    target: "3".into()
                },
                RawEdge {
                    source: "X".into(),
                    target: "4".into()
                },
                RawEdge {
                    source: "5".into(),
                    target: "X".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_alignment_rejects_missing_hyphen() {
        let err = parse_alignment("1").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedAlignment { token } if token == "1"));
    }

    #[test]
    fn test_parse_alignment_rejects_extra_hyphen() {
        let err = parse_alignment("1-2-3").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedAlignment { .. }));
    }

    #[test]
    fn test_parse_alignment_rejects_garbage_index() {
        let err = parse_alignment("a-2").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedAlignment { token } if token == "a-2"));
    }

    #[test]
    fn test_parse_alignment_rejects_trailing_garbage_index() {
        // A digit prefix must not be enough; the whole side is the index.
        let err = parse_alignment("1a-2").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedAlignment { token } if token == "1a-2"));
        let err = parse_alignment("1-2b").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedAlignment { token } if token == "1-2b"));
    }

    #[test]
    fn test_reconcile_partition() {
        let source = chain_graph(&["root", "a", "b", "c"]);
        let target = chain_graph(&["root", "x", "y", "z"]);
        // After normalization: (1,1) one-to-one; 2 -> {2,3} one-to-many by
        // source; 4 unaligned; target 4 unaligned.
        let reconciled = reconcile("0-0 1-1 1-2 3-X X-3", &source, &target).unwrap();
        assert_eq!(reconciled.one_to_one, vec![("1".to_string(), "1".to_string())]);
        assert_eq!(reconciled.unaligned_source, vec!["4".to_string()]);
        assert_eq!(reconciled.unaligned_target, vec!["4".to_string()]);
        assert_eq!(reconciled.one_to_many_source.len(), 1);
        assert_eq!(reconciled.one_to_many_source[0].0, "2");
        assert_eq!(
            reconciled.one_to_many_source[0].1,
            vec!["2".to_string(), "3".to_string()]
        );
        assert!(reconciled.one_to_many_target.is_empty());
    }

    #[test]
    fn test_reconcile_collapses_to_shallowest() {
        let source = chain_graph(&["root", "a"]);
        let target = chain_graph(&["root", "x", "y"]);
        // Source 1 aligns to targets {2, 3}; target "2" is shallower.
        let reconciled = reconcile("0-1 0-2 1-0", &source, &target).unwrap();
        assert_eq!(
            reconciled.edges,
            vec![
                ("1".to_string(), "2".to_string()),
                ("2".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_reconcile_many_to_one_target() {
        let source = chain_graph(&["root", "a", "b"]);
        let target = chain_graph(&["root"]);
        // Sources {2, 3} both align to target 1; source "2" is shallower.
        let reconciled = reconcile("1-0 2-0", &source, &target).unwrap();
        assert_eq!(reconciled.one_to_many_target.len(), 1);
        assert_eq!(reconciled.edges, vec![("2".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_reconcile_source_degree_wins() {
        // Source 1 has degree 2 and target 1 has degree 2; the 1-1 edge
        // must land in the by-source map, not the by-target one.
        let source = chain_graph(&["root", "a"]);
        let target = chain_graph(&["root", "x"]);
        let reconciled = reconcile("0-0 0-1 1-0", &source, &target).unwrap();
        assert_eq!(reconciled.one_to_many_source.len(), 1);
        assert_eq!(reconciled.one_to_many_source[0].0, "1");
        assert_eq!(reconciled.one_to_many_target.len(), 1);
        assert_eq!(reconciled.one_to_many_target[0].0, "1");
        assert!(reconciled.one_to_one.is_empty());
    }

    #[test]
    fn test_reconcile_edges_sorted_by_numeric_source_key() {
        let source = chain_graph(&["root", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let target = chain_graph(&["root", "x", "y", "z", "u", "v", "w", "p", "q", "r", "s"]);
        let reconciled = reconcile("10-10 1-1 9-9 2-2", &source, &target).unwrap();
        let sources: Vec<&str> = reconciled.edges.iter().map(|(s, _)| s.as_str()).collect();
        // Numeric order, not lexicographic ("10" < "2" lexicographically).
        assert_eq!(sources, vec!["2", "3", "10", "11"]);
    }
}
