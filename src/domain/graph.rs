//! The directed graph of wikilinks between notes.
//!
//! Nodes are notes, numbered by their position in path order. An edge runs
//! from the linking note to the linked note. A wikilink target resolves
//! against note paths first (`[[Project/hub]]` finds `Project/hub.md`) and
//! then against titles; when several notes share a title, the first in path
//! order wins.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use petgraph::{Direction, algo::tarjan_scc, graphmap::DiGraphMap};
use serde::Serialize;

use crate::domain::Note;

const HTML_TEMPLATE: &str = include_str!("graph.html");

/// A note in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Index of the note in path order.
    pub id: usize,
    /// The graph title (first H1, or the file stem).
    pub title: String,
    /// The note path relative to the notebook root, `/`-separated.
    pub path: String,
}

/// A link between two notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Edge {
    /// The linking note.
    pub source: usize,
    /// The linked note.
    pub target: usize,
}

/// A wikilink whose target matches no note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    /// The note containing the link.
    pub source: usize,
    /// The normalised target that failed to resolve.
    pub target: String,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    notebook_path: &'a str,
    node_count: usize,
    edge_count: usize,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    nodes: &'a [Node],
    edges: Vec<Edge>,
    metadata: Metadata<'a>,
}

/// The link graph of a notebook.
#[derive(Debug, Clone)]
pub struct LinkGraph {
    notebook_path: String,
    nodes: Vec<Node>,
    graph: DiGraphMap<usize, ()>,
    broken: Vec<BrokenLink>,
}

impl LinkGraph {
    /// Builds the graph for `notes`, which live under `notebook_path`.
    ///
    /// The notes may be in any order; node ids follow path order.
    #[must_use]
    pub fn build(notebook_path: &Path, notes: &[Note]) -> Self {
        let mut sorted: Vec<&Note> = notes.iter().collect();
        sorted.sort_by(|a, b| a.path().cmp(b.path()));

        let mut nodes = Vec::with_capacity(sorted.len());
        let mut by_title: HashMap<String, usize> = HashMap::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut graph = DiGraphMap::with_capacity(sorted.len(), sorted.len() * 2);

        for (id, note) in sorted.iter().enumerate() {
            let title = note.graph_title();
            by_title.entry(title.clone()).or_insert(id);
            let key = note.link_key();
            by_key.insert(key, id);
            nodes.push(Node {
                id,
                title,
                path: posix(note.path()),
            });
            graph.add_node(id);
        }

        let mut broken = Vec::new();
        for (source, note) in sorted.iter().enumerate() {
            for link in note.wikilinks() {
                if link.target.is_empty() {
                    continue;
                }
                let resolved = by_key
                    .get(&link.target)
                    .or_else(|| by_title.get(&link.target))
                    .copied();
                match resolved {
                    Some(target) if target == source => {}
                    Some(target) => {
                        graph.add_edge(source, target, ());
                    }
                    None => {
                        tracing::debug!(
                            "unresolved link [[{}]] in {}",
                            link.target,
                            note.path().display()
                        );
                        broken.push(BrokenLink {
                            source,
                            target: link.target,
                        });
                    }
                }
            }
        }

        Self {
            notebook_path: notebook_path.display().to_string(),
            nodes,
            graph,
            broken,
        }
    }

    /// All nodes, in id order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node with the given id.
    #[must_use]
    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Finds a node by its `/`-separated relative path.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.path == path)
    }

    /// All edges, sorted by `(source, target)`.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .graph
            .all_edges()
            .map(|(source, target, ())| Edge { source, target })
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Links that didn't resolve to a note, in discovery order.
    #[must_use]
    pub fn broken_links(&self) -> &[BrokenLink] {
        &self.broken
    }

    /// Notes linked from `id`, in id order.
    #[must_use]
    pub fn outgoing(&self, id: usize) -> Vec<usize> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Notes linking to `id`, in id order.
    #[must_use]
    pub fn backlinks(&self, id: usize) -> Vec<usize> {
        self.neighbours(id, Direction::Incoming)
    }

    fn neighbours(&self, id: usize, direction: Direction) -> Vec<usize> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }
        let mut ids: Vec<usize> = self.graph.neighbors_directed(id, direction).collect();
        ids.sort_unstable();
        ids
    }

    /// Notes with no links in either direction.
    #[must_use]
    pub fn orphans(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| {
                self.graph
                    .neighbors_directed(node.id, Direction::Outgoing)
                    .next()
                    .is_none()
                    && self
                        .graph
                        .neighbors_directed(node.id, Direction::Incoming)
                        .next()
                        .is_none()
            })
            .collect()
    }

    /// Hub notes: notes linking to at least `min_out` other notes, with
    /// their outgoing link counts, most-linking first.
    #[must_use]
    pub fn hubs(&self, min_out: usize) -> Vec<(&Node, usize)> {
        let mut hubs: Vec<(&Node, usize)> = self
            .nodes
            .iter()
            .map(|node| {
                let out = self
                    .graph
                    .neighbors_directed(node.id, Direction::Outgoing)
                    .count();
                (node, out)
            })
            .filter(|&(_, out)| out > 0 && out >= min_out)
            .collect();
        hubs.sort_by(|(a, a_out), (b, b_out)| b_out.cmp(a_out).then(a.id.cmp(&b.id)));
        hubs
    }

    /// Groups of notes that link to each other in a loop, each sorted by id.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Counts of notes per top-level folder (`""` for the notebook root).
    #[must_use]
    pub fn folder_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            let folder = node
                .path
                .split_once('/')
                .map(|(folder, _)| folder.to_string())
                .unwrap_or_default();
            *counts.entry(folder).or_insert(0) += 1;
        }
        counts
    }

    fn document(&self) -> Document<'_> {
        Document {
            nodes: &self.nodes,
            edges: self.edges(),
            metadata: Metadata {
                notebook_path: &self.notebook_path,
                node_count: self.nodes.len(),
                edge_count: self.edge_count(),
            },
        }
    }

    /// The graph as pretty-printed JSON:
    /// `{ nodes, edges, metadata: { notebook_path, node_count, edge_count } }`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.document())
    }

    /// A standalone HTML page that draws the graph with d3.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn render_html(&self) -> serde_json::Result<String> {
        // `</` would end the script element early
        let json = serde_json::to_string(&self.document())?.replace("</", "<\\/");
        Ok(HTML_TEMPLATE.replace("__GRAPH_JSON__", &json))
    }
}

fn posix(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
