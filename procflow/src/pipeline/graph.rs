//! Dependency graph derived from slot references between stages.
//!
//! Every parameter bound to another stage's output is an edge from the
//! consumer to the producer. The graph is checked before anything runs:
//! references must name a stage of the same pipeline, point at a slot that
//! stage actually owns, and point backwards in declaration order.

use crate::errors::{ConfigurationError, CycleDetectedError, PipelineError};
use crate::stages::Stage;
use crate::utils::validate_unique_names;
use std::collections::{BTreeSet, HashMap};

/// Validated dependencies between the stages of one pipeline.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    upstream: Vec<BTreeSet<usize>>,
    execution_order: Vec<usize>,
}

impl DependencyGraph {
    /// Builds and validates the graph for `stages` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for duplicate stage names, references
    /// to stages or slots outside the pipeline, self references and forward
    /// references, and [`CycleDetectedError`] when references form a cycle.
    pub fn build(stages: &[Stage]) -> Result<Self, PipelineError> {
        validate_unique_names(stages.iter().map(Stage::name))?;

        let names: Vec<String> = stages.iter().map(|s| s.name().to_string()).collect();
        let positions: HashMap<&str, usize> = stages
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.name(), pos))
            .collect();

        let mut upstream = vec![BTreeSet::new(); stages.len()];
        for (pos, stage) in stages.iter().enumerate() {
            for (param_index, slot_ref) in stage.dependencies() {
                let owned_by = positions.get(slot_ref.stage()).copied().filter(|&producer| {
                    stages[producer]
                        .outputs()
                        .get(slot_ref.index())
                        .is_some_and(|slot| slot.ptr_eq(slot_ref.slot()))
                });
                let Some(producer) = owned_by else {
                    return Err(ConfigurationError::unknown_stage_ref(stage.name(), slot_ref.stage())
                        .with_context("param_index", param_index)
                        .with_context("output_index", slot_ref.index())
                        .into());
                };
                if producer == pos {
                    return Err(ConfigurationError::self_ref(stage.name())
                        .with_context("param_index", param_index)
                        .into());
                }
                upstream[pos].insert(producer);
            }
        }

        if let Some(cycle) = find_cycle(&upstream) {
            let path = cycle.into_iter().map(|pos| names[pos].clone()).collect();
            return Err(CycleDetectedError::new(path).into());
        }

        for (pos, deps) in upstream.iter().enumerate() {
            if let Some(&later) = deps.iter().find(|&&producer| producer > pos) {
                return Err(ConfigurationError::forward_ref(&names[pos], &names[later]).into());
            }
        }

        let execution_order = topological_order(&upstream);
        Ok(Self {
            names,
            upstream,
            execution_order,
        })
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.names.len()
    }

    /// Returns stage positions in the order they must execute.
    #[must_use]
    pub fn execution_order(&self) -> &[usize] {
        &self.execution_order
    }

    /// Returns stage names in the order they must execute.
    #[must_use]
    pub fn execution_names(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .map(|&pos| self.names[pos].as_str())
            .collect()
    }

    /// Returns the names of the stages `stage` reads from.
    #[must_use]
    pub fn upstream_of(&self, stage: &str) -> Vec<&str> {
        self.names
            .iter()
            .position(|n| n == stage)
            .map(|pos| {
                self.upstream[pos]
                    .iter()
                    .map(|&p| self.names[p].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Depth-first search for a cycle, visiting stages in declaration order.
///
/// Returns the cycle as positions, first and last entries equal.
fn find_cycle(upstream: &[BTreeSet<usize>]) -> Option<Vec<usize>> {
    fn dfs(
        node: usize,
        upstream: &[BTreeSet<usize>],
        visited: &mut [bool],
        on_path: &mut [bool],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        visited[node] = true;
        on_path[node] = true;
        path.push(node);

        for &dep in &upstream[node] {
            if on_path[dep] {
                let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(dep);
                return Some(cycle);
            }
            if !visited[dep] {
                if let Some(cycle) = dfs(dep, upstream, visited, on_path, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        on_path[node] = false;
        None
    }

    let mut visited = vec![false; upstream.len()];
    let mut on_path = vec![false; upstream.len()];
    let mut path = Vec::new();
    (0..upstream.len()).find_map(|node| {
        if visited[node] {
            None
        } else {
            dfs(node, upstream, &mut visited, &mut on_path, &mut path)
        }
    })
}

/// Orders stages so every producer precedes its consumers.
///
/// Stages are visited in declaration order, which makes the result
/// deterministic and equal to declaration order for a valid pipeline.
fn topological_order(upstream: &[BTreeSet<usize>]) -> Vec<usize> {
    fn visit(node: usize, upstream: &[BTreeSet<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
        if visited[node] {
            return;
        }
        visited[node] = true;
        for &dep in &upstream[node] {
            visit(dep, upstream, visited, order);
        }
        order.push(node);
    }

    let mut visited = vec![false; upstream.len()];
    let mut order = Vec::with_capacity(upstream.len());
    for node in 0..upstream.len() {
        visit(node, upstream, &mut visited, &mut order);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SlotRef, ValueSlot};
    use crate::errors::codes;
    use crate::params::Parameter;
    use crate::testing::ConstOperation;
    use std::sync::Arc;

    fn source(name: &str) -> Stage {
        Stage::new(name, Arc::new(ConstOperation::new(1)), vec![]).unwrap()
    }

    fn consumer(name: &str, inputs: Vec<SlotRef>) -> Stage {
        let params = inputs
            .into_iter()
            .map(|slot_ref| Parameter::int().bound_to(slot_ref))
            .collect::<Vec<_>>();
        let op = crate::testing::RecordingOperation::new("sum", params.len());
        Stage::new(name, Arc::new(op), params).unwrap()
    }

    #[test]
    fn test_linear_chain_order() {
        let a = source("a");
        let b = consumer("b", vec![a.output(0).unwrap()]);
        let c = consumer("c", vec![b.output(0).unwrap(), a.output(0).unwrap()]);

        let graph = DependencyGraph::build(&[a, b, c]).unwrap();
        assert_eq!(graph.execution_names(), vec!["a", "b", "c"]);
        assert_eq!(graph.upstream_of("c"), vec!["a", "b"]);
        assert!(graph.upstream_of("missing").is_empty());
        assert_eq!(graph.stage_count(), 3);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let a = source("a");
        let b = consumer("b", vec![a.output(0).unwrap()]);

        let err = DependencyGraph::build(&[b, a]).unwrap_err();
        assert_eq!(err.code(), Some(codes::REF_FORWARD));
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let outside = source("outside");
        let b = consumer("b", vec![outside.output(0).unwrap()]);

        let err = DependencyGraph::build(&[source("a"), b]).unwrap_err();
        assert_eq!(err.code(), Some(codes::REF_UNKNOWN_STAGE));
    }

    #[test]
    fn test_foreign_slot_with_same_name_rejected() {
        let impostor = SlotRef::new("a", 0, ValueSlot::new());
        let b = consumer("b", vec![impostor]);

        let err = DependencyGraph::build(&[source("a"), b]).unwrap_err();
        assert_eq!(err.code(), Some(codes::REF_UNKNOWN_STAGE));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut a = consumer("a", vec![SlotRef::new("x", 0, ValueSlot::new())]);
        let own = a.output(0).unwrap();
        a.param_mut(0).unwrap().bind(own);

        let err = DependencyGraph::build(&[a]).unwrap_err();
        assert_eq!(err.code(), Some(codes::REF_SELF));
    }

    #[test]
    fn test_cycle_rejected() {
        let a_seed = source("seed");
        let mut a = consumer("a", vec![a_seed.output(0).unwrap()]);
        let b = consumer("b", vec![a.output(0).unwrap()]);
        a.param_mut(0).unwrap().bind(b.output(0).unwrap());

        let err = DependencyGraph::build(&[a_seed, a, b]).unwrap_err();
        match err {
            PipelineError::CycleDetected(cycle) => {
                assert_eq!(cycle.cycle_path, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = DependencyGraph::build(&[source("a"), source("a")]).unwrap_err();
        assert_eq!(err.code(), Some(codes::STAGE_NAME_DUPLICATE));
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let upstream = vec![BTreeSet::from([2]), BTreeSet::new(), BTreeSet::from([1])];
        assert_eq!(topological_order(&upstream), vec![1, 2, 0]);
        assert_eq!(find_cycle(&upstream), None);
    }
}
