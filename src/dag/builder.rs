// src/dag/builder.rs

//! Expands a root job into an [`ExecutionGraph`].
//!
//! Depth-first from the root: each job is materialised once (diamonds
//! collapse to a single node), jobs on the current DFS path are marked so
//! a cycle is reported instead of looping, and the retry policy of every
//! node is resolved and validated before anything runs.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::config::model::JobOverride;
use crate::config::validate::{retry_delay_from_secs, validate_tries};
use crate::dag::graph::{DependsOn, ExecutionGraph, GraphNode};
use crate::errors::{JobdagError, Result};
use crate::job::{JobCatalog, JobId, JobSpec};

/// Retry policy applied while building.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Tries for jobs that set none.
    pub default_tries: u32,
    /// Retry delay (seconds) for jobs that set none.
    pub default_retry_delay: f64,
    /// Per-job overrides keyed by job name; these win over spec values.
    pub overrides: BTreeMap<String, JobOverride>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            default_tries: 3,
            default_retry_delay: 1.0,
            overrides: BTreeMap::new(),
        }
    }
}

/// Build the execution graph for `root`, consuming the catalog.
pub fn build_graph(catalog: JobCatalog, root: JobId, options: &BuildOptions) -> Result<ExecutionGraph> {
    let root_index = catalog.index_of(root).ok_or_else(|| {
        JobdagError::UnknownJob(format!("root {root} is not part of the catalog"))
    })?;

    let builder = GraphBuilder::new(catalog, options);
    builder.build(root_index)
}

struct GraphBuilder<'a> {
    options: &'a BuildOptions,
    names: Vec<String>,
    /// Per job: dependency slots, or the foreign handle that did not resolve.
    deps: Vec<Vec<std::result::Result<usize, JobId>>>,
    slots: Vec<Option<JobSpec>>,
    graph: DiGraph<GraphNode, DependsOn>,
    materialized: HashMap<usize, NodeIndex>,
    on_path: HashSet<usize>,
    path: Vec<usize>,
}

impl<'a> GraphBuilder<'a> {
    fn new(catalog: JobCatalog, options: &'a BuildOptions) -> Self {
        let mut names = Vec::with_capacity(catalog.len());
        let mut deps = Vec::with_capacity(catalog.len());

        for index in 0..catalog.len() {
            let spec = catalog.spec_at(index);
            names.push(spec.map(|s| s.name.clone()).unwrap_or_default());
            deps.push(
                spec.map(|s| {
                    s.deps
                        .iter()
                        .map(|&dep| catalog.index_of(dep).ok_or(dep))
                        .collect()
                })
                .unwrap_or_default(),
            );
        }

        Self {
            options,
            names,
            deps,
            slots: catalog.into_slots(),
            graph: DiGraph::new(),
            materialized: HashMap::new(),
            on_path: HashSet::new(),
            path: Vec::new(),
        }
    }

    fn build(mut self, root: usize) -> Result<ExecutionGraph> {
        let root_node = self.visit(root)?;

        let unreached = self.slots.iter().filter(|slot| slot.is_some()).count();
        if unreached > 0 {
            debug!(
                root = %self.names[root],
                unreached,
                "jobs not reachable from the root are left out of the graph"
            );
        }

        for name in self.options.overrides.keys() {
            if !self.materialized.keys().any(|&i| self.names[i] == *name) {
                return Err(JobdagError::ConfigError(format!(
                    "override for job '{name}', which is not part of the graph rooted at '{}'",
                    self.names[root]
                )));
            }
        }

        debug!(
            root = %self.names[root],
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "job graph built"
        );

        Ok(ExecutionGraph::from_parts(self.graph, root_node))
    }

    fn visit(&mut self, index: usize) -> Result<NodeIndex> {
        if let Some(&node) = self.materialized.get(&index) {
            return Ok(node);
        }

        if self.on_path.contains(&index) {
            return Err(JobdagError::DagCycle(self.describe_cycle(index)));
        }

        self.on_path.insert(index);
        self.path.push(index);

        let deps = self.deps[index].clone();
        let mut dep_nodes: Vec<NodeIndex> = Vec::with_capacity(deps.len());
        for dep in deps {
            let dep_index = match dep {
                Ok(i) if i == index => {
                    return Err(JobdagError::SelfDependency(self.names[index].clone()));
                }
                Ok(i) => i,
                Err(foreign) => {
                    return Err(JobdagError::UnknownJob(format!(
                        "job '{}' depends on {foreign}, which is not part of its catalog",
                        self.names[index]
                    )));
                }
            };

            let node = self.visit(dep_index)?;
            if !dep_nodes.contains(&node) {
                dep_nodes.push(node);
            }
        }

        self.path.pop();
        self.on_path.remove(&index);

        let spec = self.slots[index].take().ok_or_else(|| {
            JobdagError::Other(anyhow::anyhow!(
                "job '{}' was materialised twice",
                self.names[index]
            ))
        })?;

        let node = self.materialize(spec)?;
        let idx = self.graph.add_node(node);
        for dep in dep_nodes {
            self.graph.add_edge(idx, dep, DependsOn);
        }
        self.materialized.insert(index, idx);

        Ok(idx)
    }

    /// Resolve the effective retry policy: override > spec > default.
    fn materialize(&self, spec: JobSpec) -> Result<GraphNode> {
        let overrides = self.options.overrides.get(&spec.name);

        let tries = overrides
            .and_then(|o| o.tries)
            .or(spec.tries)
            .unwrap_or(self.options.default_tries);
        let tries = validate_tries(&spec.name, tries)?;

        let delay = overrides
            .and_then(|o| o.retry_delay)
            .or(spec.retry_delay)
            .unwrap_or(self.options.default_retry_delay);
        let retry_delay = retry_delay_from_secs(&spec.name, delay)?;

        Ok(GraphNode::new(spec, tries, retry_delay))
    }

    fn describe_cycle(&self, index: usize) -> String {
        let start = self.path.iter().position(|&i| i == index).unwrap_or(0);
        self.path[start..]
            .iter()
            .chain(std::iter::once(&index))
            .map(|&i| self.names[i].as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::NodeStatus;
    use crate::job::JobSpec;
    use std::time::Duration;

    fn options() -> BuildOptions {
        BuildOptions::default()
    }

    #[test]
    fn diamond_collapses_to_one_shared_node() {
        let mut catalog = JobCatalog::new();
        let z = catalog.add(JobSpec::dummy("Z")).unwrap();
        let x = catalog.add(JobSpec::dummy("X").after(z)).unwrap();
        let y = catalog.add(JobSpec::dummy("Y").after(z)).unwrap();
        let root = catalog.add(JobSpec::dummy("Root").after(x).after(y)).unwrap();

        let graph = build_graph(catalog, root, &options()).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependents_of("Z"), vec!["X", "Y"]);
        assert_eq!(graph.dependencies_of("Root"), vec!["X", "Y"]);
        assert_eq!(graph.root().name(), "Root");
    }

    #[test]
    fn discovery_order_puts_dependencies_first() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A")).unwrap();
        let b = catalog.add(JobSpec::dummy("B").after(a)).unwrap();
        let c = catalog.add(JobSpec::dummy("C")).unwrap();
        let root = catalog.add(JobSpec::dummy("Root").after(b).after(c)).unwrap();

        let graph = build_graph(catalog, root, &options()).unwrap();
        let order: Vec<&str> = graph.nodes().map(|n| n.name()).collect();

        assert_eq!(order, vec!["A", "B", "C", "Root"]);
    }

    #[test]
    fn two_node_cycle_is_rejected_with_path() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A")).unwrap();
        let b = catalog.add(JobSpec::dummy("B").after(a)).unwrap();
        catalog.depends_on(a, b).unwrap();

        let err = build_graph(catalog, a, &options()).unwrap_err();
        match err {
            JobdagError::DagCycle(path) => assert_eq!(path, "A -> B -> A"),
            other => panic!("expected DagCycle, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_rejected() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A")).unwrap();
        catalog.depends_on(a, a).unwrap();

        let err = build_graph(catalog, a, &options()).unwrap_err();
        assert!(matches!(err, JobdagError::SelfDependency(name) if name == "A"));
    }

    #[test]
    fn foreign_dependency_is_an_unknown_job() {
        let mut other = JobCatalog::new();
        let foreign = other.add(JobSpec::dummy("elsewhere")).unwrap();

        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A").after(foreign)).unwrap();

        let err = build_graph(catalog, a, &options()).unwrap_err();
        assert!(matches!(err, JobdagError::UnknownJob(msg) if msg.contains("'A'")));
    }

    #[test]
    fn invalid_tries_and_delays_are_rejected() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A").with_tries(0)).unwrap();
        let err = build_graph(catalog, a, &options()).unwrap_err();
        assert!(matches!(err, JobdagError::InvalidTries { tries: 0, .. }));

        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A").with_retry_delay(-0.5)).unwrap();
        let err = build_graph(catalog, a, &options()).unwrap_err();
        assert!(matches!(err, JobdagError::InvalidRetryDelay { .. }));
    }

    #[test]
    fn policy_precedence_is_override_then_spec_then_default() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A").with_tries(7)).unwrap();
        let b = catalog.add(JobSpec::dummy("B").with_tries(7)).unwrap();
        let root = catalog.add(JobSpec::dummy("Root").after(a).after(b)).unwrap();

        let mut opts = options();
        opts.default_retry_delay = 0.0;
        opts.overrides.insert(
            "B".to_string(),
            JobOverride {
                tries: Some(2),
                retry_delay: Some(0.5),
            },
        );

        let graph = build_graph(catalog, root, &opts).unwrap();
        assert_eq!(graph.node("A").unwrap().tries(), 7);
        assert_eq!(graph.node("B").unwrap().tries(), 2);
        assert_eq!(graph.node("B").unwrap().retry_delay(), Duration::from_millis(500));
        assert_eq!(graph.node("Root").unwrap().tries(), 3);
        assert_eq!(graph.node("Root").unwrap().retry_delay(), Duration::ZERO);
    }

    #[test]
    fn override_for_job_outside_graph_is_rejected() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A")).unwrap();
        catalog.add(JobSpec::dummy("Unrelated")).unwrap();

        let mut opts = options();
        opts.overrides
            .insert("Unrelated".to_string(), JobOverride::default());

        let err = build_graph(catalog, a, &opts).unwrap_err();
        assert!(matches!(err, JobdagError::ConfigError(msg) if msg.contains("Unrelated")));
    }

    #[test]
    fn initial_status_depends_on_dependencies() {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A")).unwrap();
        let root = catalog.add(JobSpec::dummy("Root").after(a)).unwrap();

        let graph = build_graph(catalog, root, &options()).unwrap();
        assert_eq!(graph.node("A").unwrap().status(), NodeStatus::Ready);
        assert_eq!(graph.node("Root").unwrap().status(), NodeStatus::Blocked);
    }
}
