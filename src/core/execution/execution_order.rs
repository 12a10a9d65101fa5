use std::collections::{BTreeSet, HashMap};

/// Manages topological sorting and execution order calculation for processes
pub struct ExecutionOrderBuilder;

/// Outcome of a failed sort: the nodes that sit on (or behind) a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected {
    pub nodes: Vec<usize>,
}

impl ExecutionOrderBuilder {
    /// Analyzes the dependency graph to build a topologically sorted execution
    /// order organized into stages. Nodes inside one stage do not depend on
    /// each other and can be fired concurrently.
    /// Uses modified Kahn's algorithm to detect cycles and ensure deterministic execution.
    pub fn build_execution_order_stages(
        node_count: usize,
        edges: &[(usize, usize)],
    ) -> Result<Vec<Vec<usize>>, CycleDetected> {
        let mut adj_list: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut in_degree: HashMap<usize, usize> = (0..node_count).map(|n| (n, 0)).collect();

        for &(source, target) in edges {
            if source >= node_count || target >= node_count {
                continue;
            }
            adj_list.entry(source).or_default().push(target);
            if let Some(degree) = in_degree.get_mut(&target) {
                *degree += 1;
            }
        }

        let mut stages = Vec::new();
        let mut processed_count = 0;

        while processed_count < node_count {
            // Find all nodes with zero in-degree (current stage)
            let mut current_stage: Vec<usize> = in_degree
                .iter()
                .filter(|(_, &degree)| degree == 0)
                .map(|(&id, _)| id)
                .collect();

            if current_stage.is_empty() {
                let remaining: BTreeSet<usize> = in_degree.keys().copied().collect();
                return Err(CycleDetected {
                    nodes: remaining.into_iter().collect(),
                });
            }

            // Sort stage for deterministic results
            current_stage.sort_unstable();

            for node in &current_stage {
                in_degree.remove(node);
                processed_count += 1;

                if let Some(neighbors) = adj_list.get(node) {
                    for neighbor in neighbors {
                        if let Some(degree) = in_degree.get_mut(neighbor) {
                            *degree -= 1;
                        }
                    }
                }
            }

            stages.push(current_stage);
        }

        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_execution_order_stages_simple() {
        // A -> B -> C
        let stages = ExecutionOrderBuilder::build_execution_order_stages(3, &[(0, 1), (1, 2)])
            .expect("Should build execution order");

        assert_eq!(stages, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_build_execution_order_stages_parallel() {
        // A -> B, A -> C, B -> D, C -> D
        let stages =
            ExecutionOrderBuilder::build_execution_order_stages(4, &[(0, 1), (0, 2), (1, 3), (2, 3)])
                .expect("Should build execution order");

        assert_eq!(stages, vec![vec![0], vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_build_execution_order_stages_cycle_detection() {
        // A -> B -> A, C downstream of the cycle
        let result = ExecutionOrderBuilder::build_execution_order_stages(3, &[(0, 1), (1, 0), (1, 2)]);
        assert_eq!(result, Err(CycleDetected { nodes: vec![0, 1, 2] }));
    }
}
