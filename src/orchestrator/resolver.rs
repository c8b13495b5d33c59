//! Dependency-satisfaction evaluation.

use std::collections::HashSet;

use tracing::debug;

use crate::manifest::{DependencyGraph, TaskRef};

/// Computes the tasks eligible to run: pending, not already tracked as an
/// active process, with every dependency id present in `completed`.
///
/// Tasks are returned in manifest order; ordering only affects log
/// readability. A dependency id that never appears in the graph blocks its
/// task forever, and tasks in a dependency cycle starve silently. Graph
/// well-formedness is the planner's job, not the engine's.
pub fn find_executable(graph: &DependencyGraph, active: &HashSet<String>) -> Vec<TaskRef> {
    let completed: HashSet<&str> = graph.completed.iter().map(String::as_str).collect();

    let mut executable = Vec::new();

    for task_id in &graph.pending {
        if active.contains(task_id) {
            continue;
        }

        let deps = graph
            .dependencies
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if deps.iter().all(|dep| completed.contains(dep.as_str())) {
            executable.push(TaskRef {
                id: task_id.clone(),
                dependencies: deps.to_vec(),
            });
        } else {
            let missing: Vec<&str> = deps
                .iter()
                .map(String::as_str)
                .filter(|dep| !completed.contains(dep))
                .collect();
            debug!(task_id, missing = ?missing, "Task waiting for dependencies");
        }
    }

    executable
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph(
        pending: &[&str],
        completed: &[&str],
        deps: &[(&str, &[&str])],
    ) -> DependencyGraph {
        DependencyGraph {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            in_progress: Vec::new(),
            completed: completed.iter().map(|s| s.to_string()).collect(),
            dependencies: deps
                .iter()
                .map(|(id, d)| (id.to_string(), d.iter().map(|s| s.to_string()).collect()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn ids(tasks: &[TaskRef]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_no_deps_is_executable() {
        let g = graph(&["a"], &[], &[("a", &[])]);
        assert_eq!(ids(&find_executable(&g, &HashSet::new())), ["a"]);
    }

    #[test]
    fn test_unsatisfied_dep_blocks() {
        let g = graph(&["b"], &[], &[("b", &["a"])]);
        assert!(find_executable(&g, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_satisfied_deps_release() {
        let g = graph(&["b"], &["a"], &[("b", &["a"])]);
        assert_eq!(ids(&find_executable(&g, &HashSet::new())), ["b"]);
    }

    #[test]
    fn test_active_task_excluded() {
        let g = graph(&["a"], &[], &[("a", &[])]);
        let active: HashSet<String> = ["a".to_string()].into();
        assert!(find_executable(&g, &active).is_empty());
    }

    #[test]
    fn test_unknown_dependency_blocks_forever() {
        let g = graph(&["c"], &["a", "b"], &[("c", &["z"])]);
        for _ in 0..10 {
            assert!(find_executable(&g, &HashSet::new()).is_empty());
        }
    }

    #[test]
    fn test_cycle_starves_both_tasks() {
        let g = graph(&["a", "b"], &[], &[("a", &["b"]), ("b", &["a"])]);
        assert!(find_executable(&g, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_manifest_order_preserved() {
        let g = graph(
            &["w", "x", "y"],
            &[],
            &[("w", &[]), ("x", &[]), ("y", &[])],
        );
        assert_eq!(ids(&find_executable(&g, &HashSet::new())), ["w", "x", "y"]);
    }

    #[test]
    fn test_missing_dependency_list_treated_as_empty() {
        // Task id listed in pending but absent from the dependency map.
        let g = graph(&["a"], &[], &[]);
        assert_eq!(ids(&find_executable(&g, &HashSet::new())), ["a"]);
    }
}
