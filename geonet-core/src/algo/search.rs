//! Single-source shortest path kernels over a [`Neighbourhood`].
//!
//! One [`SearchSpace`] is allocated per worker thread and reset between
//! sources, only touching the nodes the previous search reached.

use std::{cmp::Ordering, collections::BinaryHeap, collections::VecDeque};

use fixedbitset::FixedBitSet;

use crate::model::Neighbourhood;

#[derive(Debug, Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    node: usize,
}

impl Eq for State {}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap)
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// How edge costs are read during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Dijkstra over the stored edge costs
    Weighted,
    /// Breadth-first search, every edge counts as one hop
    Unweighted,
}

/// Reusable buffers for one shortest-path search at a time
#[derive(Debug, Clone)]
pub struct SearchSpace {
    dist: Vec<f64>,
    sigma: Vec<f64>,
    preds: Vec<Vec<usize>>,
    settled: FixedBitSet,
    /// Nodes in the order they were settled (non-decreasing distance)
    order: Vec<usize>,
    touched: Vec<usize>,
    heap: BinaryHeap<State>,
    queue: VecDeque<usize>,
}

impl SearchSpace {
    pub fn new(node_count: usize) -> Self {
        Self {
            dist: vec![f64::INFINITY; node_count],
            sigma: vec![0.0; node_count],
            preds: vec![Vec::new(); node_count],
            settled: FixedBitSet::with_capacity(node_count),
            order: Vec::new(),
            touched: Vec::new(),
            heap: BinaryHeap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Settled nodes of the last search, closest first. The source is first.
    pub fn reached(&self) -> &[usize] {
        &self.order
    }

    /// Distance of `node` from the last source, infinite if not reached
    pub fn distance(&self, node: usize) -> f64 {
        self.dist[node]
    }

    /// Number of shortest paths from the last source to `node`. Only
    /// maintained when the search tracked paths.
    pub fn path_count(&self, node: usize) -> f64 {
        self.sigma[node]
    }

    /// Runs a search from `source`.
    ///
    /// With `max_cost` set, only nodes at distance `<= max_cost` are settled.
    /// With `track_paths`, path counts and shortest-path predecessors are
    /// recorded for dependency accumulation.
    pub fn explore(
        &mut self,
        hood: &Neighbourhood,
        source: usize,
        traversal: Traversal,
        max_cost: Option<f64>,
        track_paths: bool,
    ) {
        self.reset();

        self.dist[source] = 0.0;
        self.sigma[source] = 1.0;
        self.touched.push(source);

        match traversal {
            Traversal::Weighted => self.dijkstra(hood, source, max_cost, track_paths),
            Traversal::Unweighted => self.bfs(hood, source, max_cost, track_paths),
        }
    }

    fn dijkstra(
        &mut self,
        hood: &Neighbourhood,
        source: usize,
        max_cost: Option<f64>,
        track_paths: bool,
    ) {
        let limit = max_cost.unwrap_or(f64::INFINITY);

        self.heap.push(State {
            cost: 0.0,
            node: source,
        });

        while let Some(State { cost, node }) = self.heap.pop() {
            // Skip stale heap entries
            if self.settled.contains(node) || cost > self.dist[node] {
                continue;
            }

            self.settled.insert(node);
            self.order.push(node);

            for (next, weight) in hood.neighbours(node) {
                if self.settled.contains(next) {
                    continue;
                }

                let next_cost = cost + weight;
                if next_cost > limit {
                    continue;
                }

                let best = self.dist[next];
                if next_cost < best {
                    if best.is_infinite() {
                        self.touched.push(next);
                    }
                    self.dist[next] = next_cost;
                    if track_paths {
                        self.sigma[next] = self.sigma[node];
                        self.preds[next].clear();
                        self.preds[next].push(node);
                    }
                    self.heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                } else if track_paths && next_cost == best {
                    self.sigma[next] += self.sigma[node];
                    self.preds[next].push(node);
                }
            }
        }
    }

    fn bfs(&mut self, hood: &Neighbourhood, source: usize, max_cost: Option<f64>, track_paths: bool) {
        let limit = max_cost.unwrap_or(f64::INFINITY);

        self.queue.push_back(source);

        while let Some(node) = self.queue.pop_front() {
            self.settled.insert(node);
            self.order.push(node);

            let next_hops = self.dist[node] + 1.0;
            if next_hops > limit {
                continue;
            }

            for (next, _) in hood.neighbours(node) {
                if self.dist[next].is_infinite() {
                    self.dist[next] = next_hops;
                    self.touched.push(next);
                    self.queue.push_back(next);
                }
                if track_paths && self.dist[next] == next_hops {
                    self.sigma[next] += self.sigma[node];
                    self.preds[next].push(node);
                }
            }
        }
    }

    /// Brandes dependency accumulation for the last path-tracking search.
    ///
    /// Adds the pair dependencies of every reached node except the source to
    /// `scores`. `delta` must be all zeros and is left all zeros.
    pub fn accumulate_dependencies(&self, delta: &mut [f64], scores: &mut [f64]) {
        let Some((&source, _)) = self.order.split_first() else {
            return;
        };

        for &node in self.order.iter().rev() {
            let coefficient = (1.0 + delta[node]) / self.sigma[node];
            for &pred in &self.preds[node] {
                delta[pred] += self.sigma[pred] * coefficient;
            }
            if node != source {
                scores[node] += delta[node];
            }
        }

        for &node in &self.order {
            delta[node] = 0.0;
        }
    }

    fn reset(&mut self) {
        for &node in &self.touched {
            self.dist[node] = f64::INFINITY;
            self.sigma[node] = 0.0;
            self.preds[node].clear();
            self.settled.set(node, false);
        }
        self.touched.clear();
        self.order.clear();
        self.heap.clear();
        self.queue.clear();
    }
}
