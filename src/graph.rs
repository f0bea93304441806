//! Dependency graph structure and queries
//!
//! A sentence is a labeled tree rooted at the virtual node `"0"`. The graph
//! is stored as symmetric adjacency lists: a `parent -> child` dependency
//! contributes an `up` edge on the child and a `down` edge on the parent, so
//! BFS can walk in both directions without consulting the node table.
//!
//! Node keys are the 1-based CoNLL-U token positions kept as strings, which
//! matches the keys used by alignment data.

use crate::error::AnalysisError;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// 1-based token position within one sentence; `"0"` is the virtual root.
pub type NodeKey = String;

/// Which way an edge points relative to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards the parent.
    Up,
    /// Towards a child.
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// The same edge seen from the other endpoint.
    pub fn flip(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One adjacency entry: the neighbor plus the labeled, directed dependency
/// connecting to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub node: NodeKey,
    pub relation: String,
    pub direction: Direction,
}

/// One step of a walk between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub relation: String,
    pub direction: Direction,
}

impl PathStep {
    fn from_edge(edge: &Edge) -> Self {
        Self {
            relation: edge.relation.clone(),
            direction: edge.direction,
        }
    }
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.relation, self.direction)
    }
}

/// Drops directions, keeping only the relation labels of a path.
pub fn strip_directions(path: &[PathStep]) -> Vec<&str> {
    path.iter().map(|step| step.relation.as_str()).collect()
}

/// Renders a path as `label->label->...` without directions. An empty path
/// renders as the empty string.
pub fn joined_labels(path: &[PathStep]) -> String {
    strip_directions(path).join("->")
}

/// Parses a node key as a number for sorting and tie-breaking. The virtual
/// root and all real keys are numeric after normalization; anything else
/// sorts last.
pub fn numeric_key(key: &str) -> u64 {
    atoi::atoi::<u64>(key.as_bytes()).unwrap_or(u64::MAX)
}

/// Adjacency-list dependency graph for one sentence.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    adjacency: FxHashMap<NodeKey, Vec<Edge>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a `parent -> child` dependency symmetrically: `up` on the
    /// child's list, `down` on the parent's.
    pub fn add_dependency(&mut self, child: &str, parent: &str, relation: &str) {
        self.adjacency
            .entry(child.to_string())
            .or_default()
            .push(Edge {
                node: parent.to_string(),
                relation: relation.to_string(),
                direction: Direction::Up,
            });
        self.adjacency
            .entry(parent.to_string())
            .or_default()
            .push(Edge {
                node: child.to_string(),
                relation: relation.to_string(),
                direction: Direction::Down,
            });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.adjacency.contains_key(key)
    }

    pub fn neighbors(&self, key: &str) -> &[Edge] {
        self.adjacency.get(key).map_or(&[], Vec::as_slice)
    }

    /// Number of nodes, counting the virtual root if any edge touches it.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of edges from the virtual root to `node`; the root's direct
    /// children have depth 1.
    pub fn node_depth(&self, node: &str) -> Result<usize, AnalysisError> {
        let mut queue = VecDeque::new();
        let mut visited = FxHashSet::default();
        queue.push_back(("0", 0usize));
        visited.insert("0");
        while let Some((current, depth)) = queue.pop_front() {
            for edge in self.neighbors(current) {
                if edge.node == node {
                    return Ok(depth + 1);
                }
                if visited.insert(edge.node.as_str()) {
                    queue.push_back((edge.node.as_str(), depth + 1));
                }
            }
        }
        Err(AnalysisError::UnreachableNode {
            node: node.to_string(),
        })
    }

    /// Labeled shortest path from `from` to `to`. The graph is a tree, so
    /// the path is unique; BFS gives O(V+E) and a deterministic walk.
    /// Returns an empty path when the endpoints coincide.
    pub fn shortest_path<'s>(
        &'s self,
        from: &'s str,
        to: &str,
    ) -> Result<Vec<PathStep>, AnalysisError> {
        if from == to {
            return Ok(Vec::new());
        }
        let mut queue = VecDeque::new();
        let mut visited = FxHashSet::default();
        // Predecessor link plus the edge used to reach each visited node.
        let mut sources: FxHashMap<&str, (&str, &Edge)> = FxHashMap::default();
        queue.push_back(from);
        visited.insert(from);
        while let Some(current) = queue.pop_front() {
            for edge in self.neighbors(current) {
                if edge.node == to {
                    let mut path = vec![PathStep::from_edge(edge)];
                    let mut node = current;
                    while let Some(&(prev, prev_edge)) = sources.get(node) {
                        path.push(PathStep::from_edge(prev_edge));
                        node = prev;
                    }
                    path.reverse();
                    return Ok(path);
                }
                if visited.insert(edge.node.as_str()) {
                    sources.insert(edge.node.as_str(), (current, edge));
                    queue.push_back(edge.node.as_str());
                }
            }
        }
        Err(AnalysisError::DisconnectedGraph {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Picks the candidate closest to the root (most syntactically central).
    /// Depth ties break towards the smallest numeric key, a fixed policy
    /// rather than an artifact of map iteration order.
    pub fn minimum_depth_node<S: AsRef<str>>(
        &self,
        candidates: &[S],
    ) -> Result<NodeKey, AnalysisError> {
        let mut ordered: Vec<&str> = candidates.iter().map(AsRef::as_ref).collect();
        ordered.sort_unstable_by_key(|k| numeric_key(k));
        let mut best: Option<(usize, &str)> = None;
        for key in ordered {
            let depth = self.node_depth(key)?;
            if best.is_none_or(|(min_depth, _)| depth < min_depth) {
                best = Some((depth, key));
            }
        }
        match best {
            Some((_, key)) => Ok(key.to_string()),
            None => Err(AnalysisError::NoMinimumFound),
        }
    }
}
