//! # Dependency Graph
//!
//! Keepers reference the keepers of the modules they depend on, so they
//! have to be built in dependency order. Each module declares its
//! dependencies up front; this graph sorts them once and rejects cycles.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::domain::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Module dependency graph, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<(String, Vec<String>)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `module` with its direct dependencies.
    pub fn add(&mut self, module: impl Into<String>, dependencies: &[String]) -> &mut Self {
        self.nodes.push((module.into(), dependencies.to_vec()));
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topological order: every module comes after all of its dependencies.
    ///
    /// Ties are broken by declaration order, so the result is deterministic.
    pub fn sort(&self) -> Result<Vec<String>, RegistryError> {
        let edges: BTreeMap<&str, &[String]> = self
            .nodes
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.as_slice()))
            .collect();

        for (name, deps) in &self.nodes {
            if let Some(dep) = deps.iter().find(|d| !edges.contains_key(d.as_str())) {
                return Err(RegistryError::UnknownDependency {
                    module: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        fn visit<'a>(
            name: &'a str,
            edges: &BTreeMap<&'a str, &'a [String]>,
            marks: &mut BTreeMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
            order: &mut Vec<String>,
        ) -> Result<(), RegistryError> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(name.to_string());
                    return Err(RegistryError::DependencyCycle(cycle));
                }
                None => {}
            }

            marks.insert(name, Mark::Visiting);
            path.push(name);
            for dep in edges.get(name).copied().unwrap_or_default() {
                visit(dep.as_str(), edges, marks, path, order)?;
            }
            path.pop();
            marks.insert(name, Mark::Done);
            order.push(name.to_string());
            Ok(())
        }

        let mut marks = BTreeMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = BTreeSet::new();
        for (name, _) in &self.nodes {
            if !seen.insert(name.as_str()) {
                return Err(RegistryError::DuplicateModule(name.clone()));
            }
            visit(name, &edges, &mut marks, &mut Vec::new(), &mut order)?;
        }

        debug!("[Registry] Dependency order: {}", order.join(", "));
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn deps(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let mut graph = DependencyGraph::new();
        graph
            .add("mint", &deps(&["staking", "bank"]))
            .add("staking", &deps(&["auth", "bank"]))
            .add("bank", &deps(&["auth"]))
            .add("auth", &[]);

        assert_eq!(graph.sort().unwrap(), deps(&["auth", "bank", "staking", "mint"]));
    }

    #[test]
    fn test_independent_modules_keep_declaration_order() {
        let mut graph = DependencyGraph::new();
        graph.add("params", &[]).add("capability", &[]).add("upgrade", &[]);
        assert_eq!(graph.sort().unwrap(), deps(&["params", "capability", "upgrade"]));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = DependencyGraph::new();
        graph
            .add("a", &deps(&["b"]))
            .add("b", &deps(&["c"]))
            .add("c", &deps(&["a"]));

        assert_eq!(
            graph.sort().unwrap_err(),
            RegistryError::DependencyCycle(deps(&["a", "b", "c", "a"]))
        );
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add("gov", &deps(&["gov"]));
        assert!(matches!(graph.sort(), Err(RegistryError::DependencyCycle(_))));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add("slashing", &deps(&["staking"]));
        assert_eq!(
            graph.sort().unwrap_err(),
            RegistryError::UnknownDependency {
                module: "slashing".to_string(),
                dependency: "staking".to_string(),
            }
        );
    }

    proptest! {
        // Edges only point from higher to lower indices, so any such graph
        // is acyclic and must sort with every dependency first.
        #[test]
        fn prop_sorted_order_respects_edges(
            edges in proptest::collection::vec((1usize..12, 0usize..12), 0..40)
        ) {
            let n = 12;
            let mut adjacency: Vec<Vec<String>> = vec![Vec::new(); n];
            for (from, to) in edges {
                if to < from {
                    adjacency[from].push(format!("m{to}"));
                }
            }

            let mut graph = DependencyGraph::new();
            for (i, d) in adjacency.iter().enumerate().rev() {
                graph.add(format!("m{i}"), d);
            }
            let order = graph.sort().unwrap();
            prop_assert_eq!(order.len(), n);

            let position: BTreeMap<&str, usize> =
                order.iter().enumerate().map(|(i, m)| (m.as_str(), i)).collect();
            for (i, d) in adjacency.iter().enumerate() {
                let name = format!("m{i}");
                for dep in d {
                    prop_assert!(position[dep.as_str()] < position[name.as_str()]);
                }
            }
        }
    }
}
