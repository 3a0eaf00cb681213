//! Stage dependency graph (spec.md §4.E): the built-in pipeline is
//! match → relationship → {symbolic lane, audio lane} → final-validate,
//! but the DAG is general so additional stages can slot in.

use crate::error::StageError;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct StageNode {
    pub name: String,
    pub depends_on: Vec<String>,
    /// Output subdirectory this stage writes into, for overlap detection.
    pub output_subdir: String,
    /// Non-critical stages whose failure doesn't cascade to their dependents
    /// when the run is configured with `continue_on_non_critical_failure`
    /// (spec.md §4.E). Critical by default.
    pub critical: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StageDag {
    nodes: Vec<StageNode>,
}

impl StageDag {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add_stage(&mut self, node: StageNode) {
        self.nodes.push(node);
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Drops the named stages from the graph, e.g. ones already served from cache.
    /// Any remaining stage that depended on a removed one treats it as satisfied.
    pub fn remove_stages(&mut self, names: &[String]) {
        self.nodes.retain(|n| !names.contains(&n.name));
    }

    fn by_name(&self) -> HashMap<&str, &StageNode> {
        self.nodes.iter().map(|n| (n.name.as_str(), n)).collect()
    }

    pub fn node(&self, name: &str) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Every stage that transitively depends on `name`, directly or through
    /// another dependent, used to cascade a failure to `skipped` (spec.md
    /// §4.E: "dependents cascade to skipped").
    pub fn transitive_dependents(&self, name: &str) -> HashSet<String> {
        let mut direct: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in &self.nodes {
            for dep in &node.depends_on {
                direct.entry(dep.as_str()).or_default().push(node.name.as_str());
            }
        }

        let mut result = HashSet::new();
        let mut stack = vec![name];
        while let Some(current) = stack.pop() {
            if let Some(children) = direct.get(current) {
                for &child in children {
                    if result.insert(child.to_string()) {
                        stack.push(child);
                    }
                }
            }
        }
        result
    }

    /// Kahn's algorithm; any stage name appearing in `depends_on` but not
    /// present as a node is treated as already-satisfied (external input).
    pub fn sequential_order(&self) -> Result<Vec<String>, StageError> {
        let by_name = self.by_name();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for node in &self.nodes {
            in_degree.entry(node.name.as_str()).or_insert(0);
            for dep in &node.depends_on {
                if by_name.contains_key(dep.as_str()) {
                    *in_degree.entry(node.name.as_str()).or_insert(0) += 1;
                    dependents.entry(dep.as_str()).or_default().push(node.name.as_str());
                }
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        ready.sort();

        let mut order = Vec::new();
        while let Some(name) = ready.pop() {
            order.push(name.to_string());
            if let Some(next) = dependents.get(name) {
                let mut newly_ready = Vec::new();
                for dependent in next {
                    let degree = in_degree.get_mut(dependent).expect("tracked node");
                    *degree -= 1;
                    if *degree == 0 {
                        newly_ready.push(*dependent);
                    }
                }
                ready.extend(newly_ready);
                ready.sort();
            }
        }

        if order.len() != self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .map(|n| n.name.clone())
                .find(|n| !order.contains(n))
                .unwrap_or_default();
            return Err(StageError::CyclicDag { stage: stuck });
        }

        Ok(order)
    }

    /// Groups stages into waves: within a wave, every stage is dependency-ready
    /// and has no `output_subdir` overlap with another stage in the same wave,
    /// so all members of a wave can run concurrently.
    pub fn parallel_batches(&self) -> Result<Vec<Vec<String>>, StageError> {
        let order = self.sequential_order()?;
        let by_name = self.by_name();
        let mut completed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&str> = order.iter().map(|s| s.as_str()).collect();
        let mut batches = Vec::new();

        while !remaining.is_empty() {
            let mut batch: Vec<&str> = Vec::new();
            let mut used_subdirs: HashSet<&str> = HashSet::new();

            for &name in &remaining {
                let node = by_name[name];
                let deps_satisfied = node
                    .depends_on
                    .iter()
                    .all(|dep| !by_name.contains_key(dep.as_str()) || completed.contains(dep.as_str()));
                if !deps_satisfied {
                    continue;
                }
                if used_subdirs.contains(node.output_subdir.as_str()) {
                    continue;
                }
                used_subdirs.insert(node.output_subdir.as_str());
                batch.push(name);
            }

            if batch.is_empty() {
                let stuck = remaining.first().map(|s| s.to_string()).unwrap_or_default();
                return Err(StageError::CyclicDag { stage: stuck });
            }

            for &name in &batch {
                completed.insert(name);
            }
            remaining.retain(|name| !batch.contains(name));
            batches.push(batch.into_iter().map(|s| s.to_string()).collect());
        }

        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, deps: &[&str], subdir: &str) -> StageNode {
        StageNode {
            name: name.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            output_subdir: subdir.to_string(),
            critical: true,
        }
    }

    #[test]
    fn linear_chain_orders_by_dependency() {
        let mut dag = StageDag::new();
        dag.add_stage(node("match", &[], "match"));
        dag.add_stage(node("relationship", &["match"], "relationship"));
        dag.add_stage(node("validate", &["relationship"], "validate"));

        let order = dag.sequential_order().unwrap();
        assert_eq!(order, vec!["match", "relationship", "validate"]);
    }

    #[test]
    fn independent_lanes_batch_together() {
        let mut dag = StageDag::new();
        dag.add_stage(node("match", &[], "match"));
        dag.add_stage(node("relationship", &["match"], "relationship"));
        dag.add_stage(node("symbolic", &["relationship"], "symbolic"));
        dag.add_stage(node("audio", &["relationship"], "audio"));
        dag.add_stage(node("validate", &["symbolic", "audio"], "validate"));

        let batches = dag.parallel_batches().unwrap();
        assert_eq!(batches[0], vec!["match"]);
        assert_eq!(batches[1], vec!["relationship"]);
        let mut lane_batch = batches[2].clone();
        lane_batch.sort();
        assert_eq!(lane_batch, vec!["audio", "symbolic"]);
        assert_eq!(batches[3], vec!["validate"]);
    }

    #[test]
    fn overlapping_output_subdirs_cannot_share_a_wave() {
        let mut dag = StageDag::new();
        dag.add_stage(node("a", &[], "shared"));
        dag.add_stage(node("b", &[], "shared"));

        let batches = dag.parallel_batches().unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn transitive_dependents_follows_the_full_downstream_chain() {
        let mut dag = StageDag::new();
        dag.add_stage(node("match", &[], "match"));
        dag.add_stage(node("relationship", &["match"], "relationship"));
        dag.add_stage(node("symbolic", &["relationship"], "symbolic"));
        dag.add_stage(node("audio", &["relationship"], "audio"));
        dag.add_stage(node("validate", &["symbolic", "audio"], "validate"));

        let mut dependents: Vec<String> = dag.transitive_dependents("match").into_iter().collect();
        dependents.sort();
        assert_eq!(dependents, vec!["audio", "relationship", "symbolic", "validate"]);

        let mut leaf_dependents: Vec<String> = dag.transitive_dependents("validate").into_iter().collect();
        leaf_dependents.sort();
        assert!(leaf_dependents.is_empty());
    }

    #[test]
    fn a_cycle_is_reported() {
        let mut dag = StageDag::new();
        dag.add_stage(node("a", &["b"], "a"));
        dag.add_stage(node("b", &["a"], "b"));

        let err = dag.sequential_order().unwrap_err();
        assert!(matches!(err, StageError::CyclicDag { .. }));
    }
}
