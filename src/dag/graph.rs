// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, JobConfig, JobId};
use crate::dag::cycle::find_cycle;
use crate::errors::{JobgraphError, Result};

/// Reserved id of the synthetic root node.
pub const ROOT_ID: &str = "root";

/// Index of a node inside [`Graph`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Graph form of a job.
///
/// Edges are index sets into the owning graph's arena, so dependency and
/// dependent links never own each other.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: JobId,
    pub job: JobConfig,
    /// Nodes that must complete before this one may start.
    pub dependencies: BTreeSet<NodeIndex>,
    /// Nodes waiting on this one.
    pub dependents: BTreeSet<NodeIndex>,
}

impl Node {
    fn new(id: JobId, job: JobConfig) -> Self {
        Self {
            id,
            job,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }
}

/// Immutable dependency graph built from a [`ConfigFile`].
///
/// Node indices follow job-id order (the config's job map is sorted), which
/// makes every traversal over the graph deterministic.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    root: Node,
    index: HashMap<JobId, NodeIndex>,
}

impl Graph {
    /// Build and validate the graph for a configuration.
    ///
    /// Fails with:
    /// - [`JobgraphError::NoJobs`] when the job map is empty,
    /// - [`JobgraphError::DependencyNotFound`] when a `needs` entry names an
    ///   unknown job,
    /// - [`JobgraphError::CircularDependency`] when the jobs form a cycle.
    pub fn build(cfg: &ConfigFile) -> Result<Self> {
        if cfg.jobs.is_empty() {
            return Err(JobgraphError::NoJobs);
        }

        let mut nodes = Vec::with_capacity(cfg.jobs.len());
        let mut index = HashMap::with_capacity(cfg.jobs.len());
        for (id, job) in cfg.jobs.iter() {
            index.insert(id.clone(), NodeIndex(nodes.len()));
            nodes.push(Node::new(id.clone(), job.clone()));
        }

        for (id, job) in cfg.jobs.iter() {
            let node = index[id];
            for need in job.needs.iter() {
                let dep = *index
                    .get(need)
                    .ok_or_else(|| JobgraphError::DependencyNotFound {
                        job: id.clone(),
                        dependency: need.clone(),
                    })?;

                nodes[node.0].dependencies.insert(dep);
                nodes[dep.0].dependents.insert(node);
            }
        }

        let mut root = Node::new(ROOT_ID.to_string(), JobConfig::default());
        root.dependents = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.dependencies.is_empty())
            .map(|(i, _)| NodeIndex(i))
            .collect();

        // Every node has a dependency, so every node sits on or behind a
        // cycle. Give the detector somewhere to start.
        if root.dependents.is_empty() {
            warn!("no job is free of dependencies; graph must contain a cycle");
            root.dependents.insert(NodeIndex(0));
        }

        let graph = Self { nodes, root, index };

        if let Some(cycle) = find_cycle(&graph) {
            let path = cycle
                .iter()
                .map(|i| graph.node(*i).id.as_str())
                .collect::<Vec<_>>()
                .join("->");
            return Err(JobgraphError::CircularDependency(path));
        }

        debug!(
            jobs = graph.len(),
            roots = graph.root.dependents.len(),
            "built dependency graph"
        );
        Ok(graph)
    }

    /// Number of job nodes (the root is not counted).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The synthetic entry node. Its dependents are the initial frontier.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx.0]
    }

    /// Find a node by job id.
    pub fn lookup(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// All job nodes with their indices, in job-id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIndex(i), n))
    }

    /// Group nodes into execution waves: wave 0 holds the jobs with no
    /// dependencies, wave N the jobs whose dependencies all sit in earlier
    /// waves. Ids are sorted inside each wave.
    pub fn layers(&self) -> Vec<Vec<NodeIndex>> {
        let mut remaining: Vec<usize> = self.nodes.iter().map(|n| n.dependencies.len()).collect();
        let mut current: Vec<NodeIndex> = self.root.dependents.iter().copied().collect();
        let mut layers = Vec::new();

        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for idx in current.iter() {
                for dependent in self.node(*idx).dependents.iter() {
                    remaining[dependent.0] -= 1;
                    if remaining[dependent.0] == 0 {
                        next.insert(*dependent);
                    }
                }
            }
            layers.push(std::mem::take(&mut current));
            current = next.into_iter().collect();
        }

        layers
    }
}
