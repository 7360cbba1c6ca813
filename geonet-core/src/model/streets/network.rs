use geo::Point;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use super::components::{StreetEdge, StreetNode};
use crate::model::WeightMode;

/// Node position stored in the spatial index together with its graph index
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Planar primal street graph.
///
/// An undirected multigraph: parallel edges and self-loops are kept as
/// separate edge records. Nodes and edges live in the petgraph arena and are
/// referenced by index only.
#[derive(Debug, Clone)]
pub struct StreetGraph {
    pub(crate) graph: UnGraph<StreetNode, StreetEdge>,
    pub(crate) rtree: RTree<IndexedPoint>,
}

impl Default for StreetGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StreetGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            rtree: RTree::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn graph(&self) -> &UnGraph<StreetNode, StreetEdge> {
        &self.graph
    }

    pub fn node(&self, node: NodeIndex) -> Option<&StreetNode> {
        self.graph.node_weight(node)
    }

    pub fn edge(&self, edge: EdgeIndex) -> Option<&StreetEdge> {
        self.graph.edge_weight(edge)
    }

    pub fn edge_endpoints(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(edge)
    }

    /// Iterates edges in insertion order as `(index, start, end, weight)`
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, NodeIndex, NodeIndex, &StreetEdge)> {
        self.graph
            .edge_references()
            .map(|edge| (edge.id(), edge.source(), edge.target(), edge.weight()))
    }

    /// Nearest graph node to `point` and its euclidean distance
    pub fn nearest_node(&self, point: &Point<f64>) -> Option<(NodeIndex, f64)> {
        let query = [point.x(), point.y()];
        self.rtree.nearest_neighbor(&query).map(|nearest| {
            let [x, y] = *nearest.geom();
            (nearest.data, (x - query[0]).hypot(y - query[1]))
        })
    }

    pub(crate) fn add_node(&mut self, point: Point<f64>) -> NodeIndex {
        let index = self.graph.add_node(StreetNode { geometry: point });
        self.rtree
            .insert(IndexedPoint::new([point.x(), point.y()], index));
        index
    }

    pub(crate) fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, edge: StreetEdge) -> EdgeIndex {
        self.graph.add_edge(a, b, edge)
    }

    /// Builds the adjacency used by the shortest-path kernels
    pub fn neighbourhood(&self, mode: WeightMode) -> Neighbourhood {
        Neighbourhood::from_graph(self, mode)
    }
}

/// Compressed adjacency of a [`StreetGraph`] for path searches.
///
/// Each node lists its distinct neighbours once, with the cheapest cost among
/// the parallel edges that join them. Self-loops never lie on a shortest path
/// and are dropped.
#[derive(Debug, Clone)]
pub struct Neighbourhood {
    offsets: Vec<usize>,
    targets: Vec<usize>,
    costs: Vec<f64>,
}

impl Neighbourhood {
    fn from_graph(streets: &StreetGraph, mode: WeightMode) -> Self {
        let node_count = streets.node_count();

        let mut arcs: Vec<(usize, usize, f64)> = Vec::with_capacity(streets.edge_count() * 2);
        for edge in streets.graph.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            if a == b {
                continue;
            }
            let cost = edge.weight().cost(mode);
            arcs.push((a, b, cost));
            arcs.push((b, a, cost));
        }

        arcs.sort_unstable_by(|x, y| {
            x.0.cmp(&y.0)
                .then(x.1.cmp(&y.1))
                .then(x.2.total_cmp(&y.2))
        });
        arcs.dedup_by_key(|arc| (arc.0, arc.1));

        let mut offsets = vec![0; node_count + 1];
        for &(from, _, _) in &arcs {
            offsets[from + 1] += 1;
        }
        for i in 0..node_count {
            offsets[i + 1] += offsets[i];
        }

        let (targets, costs) = arcs.into_iter().map(|(_, to, cost)| (to, cost)).unzip();

        Self {
            offsets,
            targets,
            costs,
        }
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Distinct neighbours of `node` with their traversal cost
    pub fn neighbours(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[node]..self.offsets[node + 1];
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.costs[range].iter().copied())
    }
}
