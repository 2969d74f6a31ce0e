//! Project graph.
//!
//! [`TaskGraph`] is the validated, index-addressed view of a task list:
//! precedence links resolved to indices, cycles broken, inseparable
//! chains linked.
//!
//! # Cycle breaking
//! Input graphs occasionally contain circuits. They are broken
//! deterministically: a depth-first circuit search walks tasks in input
//! order, and the first back edge it meets is removed. The search repeats
//! until none are left. Removed edges are logged and kept for reporting.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.3-22.4

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::warn;

use super::{EdgeType, Task, Time};
use crate::error::{Result, ScheduleError};
use crate::validation::{validate_input, ValidationError, ValidationErrorKind};

/// A resolved precedence link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Parent task index.
    pub parent: usize,
    /// Extra delay after the parent's finish.
    pub lag: Time,
    /// Link type.
    pub edge_type: EdgeType,
}

/// Validated project graph.
///
/// # Example
///
/// ```
/// use u_project::models::{Task, TaskGraph, WorkerReq};
///
/// let graph = TaskGraph::new(vec![
///     Task::new("A").with_worker_req(WorkerReq::new("driver", 4.0, 1, 2)),
///     Task::new("B").with_parent("A"),
/// ])
/// .unwrap();
///
/// assert_eq!(graph.len(), 2);
/// assert_eq!(graph.children(0), &[1]);
/// assert_eq!(graph.topological_order(), vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    parents: Vec<Vec<ParentLink>>,
    children: Vec<Vec<usize>>,
    inseparable_son: Vec<Option<usize>>,
    inseparable_parent: Vec<Option<usize>>,
    removed_edges: Vec<(String, String)>,
}

impl TaskGraph {
    /// Builds the graph, breaking precedence cycles.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidInput`] when ids are duplicated, parents are
    /// unknown, worker bounds are malformed, or inseparable chains are
    /// ambiguous or cannot be ordered.
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        validate_input(&tasks).map_err(ScheduleError::InvalidInput)?;

        let index: HashMap<String, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut parents: Vec<Vec<ParentLink>> = tasks
            .iter()
            .map(|task| {
                let mut links: Vec<ParentLink> = Vec::with_capacity(task.parents.len());
                for p in &task.parents {
                    let parent = index[p.parent_id.as_str()];
                    // Keep the first link per parent
                    if links.iter().all(|l| l.parent != parent) {
                        links.push(ParentLink {
                            parent,
                            lag: p.lag,
                            edge_type: p.edge_type,
                        });
                    }
                }
                links
            })
            .collect();

        let mut removed_edges = Vec::new();
        while let Some((parent, child)) = find_back_edge(&parents) {
            warn!(
                parent = %tasks[parent].id,
                child = %tasks[child].id,
                "precedence cycle detected, removing edge"
            );
            parents[child].retain(|l| l.parent != parent);
            removed_edges.push((tasks[parent].id.clone(), tasks[child].id.clone()));
        }

        let children = children_of(&parents);

        let n = tasks.len();
        let mut inseparable_son = vec![None; n];
        let mut inseparable_parent = vec![None; n];
        for (child, links) in parents.iter().enumerate() {
            if let Some(link) = links
                .iter()
                .find(|l| l.edge_type == EdgeType::InseparableFinishStart)
            {
                inseparable_son[link.parent] = Some(child);
                inseparable_parent[child] = Some(link.parent);
            }
        }

        let graph = Self {
            tasks,
            index,
            parents,
            children,
            inseparable_son,
            inseparable_parent,
            removed_edges,
        };

        let heads = (0..graph.len()).filter(|&i| !graph.is_inseparable_son(i)).count();
        if graph.contracted_order().len() != heads {
            return Err(ScheduleError::InvalidInput(vec![ValidationError::new(
                ValidationErrorKind::InvalidInseparableChain,
                "Inseparable chains depend on each other circularly",
            )]));
        }

        Ok(graph)
    }

    /// Number of tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no tasks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, in input order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Task at an index.
    #[inline]
    pub fn task(&self, index: usize) -> &Task {
        &self.tasks[index]
    }

    /// Index of a task id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Resolved parent links of a task (after cycle breaking).
    pub fn parents(&self, index: usize) -> &[ParentLink] {
        &self.parents[index]
    }

    /// Child indices of a task, ascending.
    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    /// The task this one is inseparably chained to, if any.
    pub fn inseparable_parent(&self, index: usize) -> Option<usize> {
        self.inseparable_parent[index]
    }

    /// Whether the task is a non-head member of an inseparable chain.
    #[inline]
    pub fn is_inseparable_son(&self, index: usize) -> bool {
        self.inseparable_parent[index].is_some()
    }

    /// Head of the chain the task belongs to (itself when unchained).
    pub fn chain_head(&self, mut index: usize) -> usize {
        while let Some(p) = self.inseparable_parent[index] {
            index = p;
        }
        index
    }

    /// The chain starting at `head`: `[head, son, grandson, ...]`.
    pub fn inseparable_chain(&self, head: usize) -> Vec<usize> {
        let mut chain = vec![head];
        let mut cur = head;
        while let Some(son) = self.inseparable_son[cur] {
            chain.push(son);
            cur = son;
        }
        chain
    }

    /// Edges removed by cycle breaking, as `(parent_id, child_id)`.
    pub fn removed_edges(&self) -> &[(String, String)] {
        &self.removed_edges
    }

    /// Sorted, de-duplicated worker kinds required anywhere in the graph.
    pub fn worker_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .tasks
            .iter()
            .flat_map(|t| t.worker_reqs.iter().map(|r| r.kind.clone()))
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Parents of the whole chain headed by `head`, excluding intra-chain
    /// links.
    pub fn chain_external_parents(&self, head: usize) -> Vec<usize> {
        let chain = self.inseparable_chain(head);
        let mut result: Vec<usize> = chain
            .iter()
            .flat_map(|&m| self.parents[m].iter().map(|l| l.parent))
            .filter(|p| !chain.contains(p))
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// A precedence-feasible order with every chain kept contiguous.
    ///
    /// Kahn's algorithm over chain heads; ties go to the smallest index.
    pub fn topological_order(&self) -> Vec<usize> {
        self.contracted_order()
            .into_iter()
            .flat_map(|head| self.inseparable_chain(head))
            .collect()
    }

    /// Chain heads in topological order of the contracted graph.
    ///
    /// Shorter than the number of heads when chains form a circuit.
    fn contracted_order(&self) -> Vec<usize> {
        self.contracted_order_by(|head| Reverse(head))
    }

    /// Kahn's algorithm over chain heads, popping the largest `key` first.
    pub(crate) fn contracted_order_by<K: Ord>(&self, key: impl Fn(usize) -> K) -> Vec<usize> {
        let n = self.len();
        let mut indegree = vec![0usize; n];
        let mut unit_children: Vec<Vec<usize>> = vec![Vec::new(); n];

        for head in (0..n).filter(|&i| !self.is_inseparable_son(i)) {
            for p in self.chain_external_parents(head) {
                unit_children[self.chain_head(p)].push(head);
                indegree[head] += 1;
            }
        }

        let mut heap: BinaryHeap<(K, usize)> = (0..n)
            .filter(|&i| !self.is_inseparable_son(i) && indegree[i] == 0)
            .map(|i| (key(i), i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some((_, head)) = heap.pop() {
            order.push(head);
            for &child in &unit_children[head] {
                indegree[child] -= 1;
                if indegree[child] == 0 {
                    heap.push((key(child), child));
                }
            }
        }
        order
    }
}

fn children_of(parents: &[Vec<ParentLink>]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); parents.len()];
    for (child, links) in parents.iter().enumerate() {
        for link in links {
            children[link.parent].push(child);
        }
    }
    children
}

/// Finds the first back edge `(parent, child)` of a depth-first search.
///
/// Roots are visited in index order, children in ascending order, so the
/// result is deterministic.
fn find_back_edge(parents: &[Vec<ParentLink>]) -> Option<(usize, usize)> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        OnStack,
        Done,
    }

    let children = children_of(parents);
    let mut mark = vec![Mark::New; parents.len()];

    for root in 0..parents.len() {
        if mark[root] != Mark::New {
            continue;
        }
        // (node, position of the next child to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        mark[root] = Mark::OnStack;

        while let Some(&mut (node, ref mut pos)) = stack.last_mut() {
            if let Some(&child) = children[node].get(*pos) {
                *pos += 1;
                match mark[child] {
                    Mark::OnStack => return Some((node, child)),
                    Mark::New => {
                        mark[child] = Mark::OnStack;
                        stack.push((child, 0));
                    }
                    Mark::Done => {}
                }
            } else {
                mark[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    None
}
