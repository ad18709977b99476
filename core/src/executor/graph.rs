use std::collections::{HashMap, HashSet};

use crate::executor::types::TaskSpec;

/// Dependency adjacency of a single batch.
///
/// Edges pointing outside the batch are dropped: they can't close a cycle
/// among the submitted tasks.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Dependency edges: task_id -> list of dependencies (in-batch only)
    pub edges: HashMap<String, Vec<String>>,

    /// Original insertion order (for stable output)
    insertion_order: Vec<String>,
}

impl DependencyGraph {
    pub fn from_tasks(tasks: &[TaskSpec]) -> Self {
        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let mut edges = HashMap::with_capacity(tasks.len());
        let mut insertion_order = Vec::with_capacity(tasks.len());

        for task in tasks {
            let deps: Vec<String> = task
                .dependencies
                .iter()
                .filter(|d| ids.contains(d.as_str()))
                .cloned()
                .collect();
            edges.insert(task.id.clone(), deps);
            insertion_order.push(task.id.clone());
        }

        Self {
            edges,
            insertion_order,
        }
    }

    /// True if `task_id` can reach itself through dependency edges.
    pub fn is_cyclic(&self, task_id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<&str> = self
            .edges
            .get(task_id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(node) = stack.pop() {
            if node == task_id {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(deps) = self.edges.get(node) {
                stack.extend(deps.iter().map(String::as_str));
            }
        }

        false
    }

    /// Every task that participates in a cycle, in insertion order.
    pub fn cyclic_tasks(&self) -> Vec<String> {
        self.insertion_order
            .iter()
            .filter(|id| self.is_cyclic(id))
            .cloned()
            .collect()
    }

    /// One cycle path for diagnostics, e.g. `a -> b -> a`.
    pub fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(stack.join(" -> "));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        if let Some(dependencies) = self.edges.get(node) {
            for dep in dependencies {
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }
}

/// Split a batch into `(parallel, sequential)`, both in input order.
///
/// Parallel: `parallelizable == true` and not part of a dependency cycle.
pub fn partition(tasks: &[TaskSpec]) -> (Vec<TaskSpec>, Vec<TaskSpec>) {
    let graph = DependencyGraph::from_tasks(tasks);
    let cyclic: HashSet<String> = graph.cyclic_tasks().into_iter().collect();

    if let Some(path) = graph.detect_cycle() {
        tracing::debug!(
            cycle = %path,
            demoted = cyclic.len(),
            "dependency cycle found; cyclic tasks run sequentially"
        );
    }

    tasks
        .iter()
        .cloned()
        .partition(|t| t.parallelizable && !cyclic.contains(&t.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tasks: &[TaskSpec]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_mutual_cycle_is_demoted() {
        let tasks = vec![
            TaskSpec::new("a", "").parallel().depends_on(["b"]),
            TaskSpec::new("b", "").parallel().depends_on(["a"]),
            TaskSpec::new("c", "").parallel(),
        ];
        let (parallel, sequential) = partition(&tasks);
        assert_eq!(ids(&parallel), vec!["c"]);
        assert_eq!(ids(&sequential), vec!["a", "b"]);
    }

    #[test]
    fn test_self_loop_is_demoted() {
        let tasks = vec![TaskSpec::new("a", "").parallel().depends_on(["a"])];
        let (parallel, sequential) = partition(&tasks);
        assert!(parallel.is_empty());
        assert_eq!(ids(&sequential), vec!["a"]);
    }

    #[test]
    fn test_task_leading_into_cycle_stays_parallel() {
        // x depends on the a<->b cycle but is not itself on it.
        let tasks = vec![
            TaskSpec::new("x", "").parallel().depends_on(["a"]),
            TaskSpec::new("a", "").parallel().depends_on(["b"]),
            TaskSpec::new("b", "").parallel().depends_on(["a"]),
        ];
        let graph = DependencyGraph::from_tasks(&tasks);
        assert_eq!(graph.cyclic_tasks(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unknown_dependencies_are_ignored() {
        let tasks = vec![TaskSpec::new("a", "").parallel().depends_on(["missing"])];
        let (parallel, _) = partition(&tasks);
        assert_eq!(ids(&parallel), vec!["a"]);
    }

    #[test]
    fn test_non_parallelizable_goes_sequential() {
        let tasks = vec![TaskSpec::new("a", ""), TaskSpec::new("b", "").parallel()];
        let (parallel, sequential) = partition(&tasks);
        assert_eq!(ids(&parallel), vec!["b"]);
        assert_eq!(ids(&sequential), vec!["a"]);
    }

    #[test]
    fn test_long_cycle_path() {
        let tasks = vec![
            TaskSpec::new("a", "").depends_on(["b"]),
            TaskSpec::new("b", "").depends_on(["c"]),
            TaskSpec::new("c", "").depends_on(["a"]),
        ];
        let graph = DependencyGraph::from_tasks(&tasks);
        assert_eq!(graph.detect_cycle().as_deref(), Some("a -> b -> c -> a"));
        assert_eq!(graph.cyclic_tasks().len(), 3);
    }
}
