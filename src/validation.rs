//! Input and result validation.
//!
//! [`validate_input`] checks the structural integrity of a task list
//! before a graph is built. Detects:
//! - Duplicate IDs
//! - Unknown or self-referencing parents
//! - Malformed worker requirements
//! - Ambiguous inseparable chains
//! - Contradictory zone requirements within one task
//!
//! [`validate_zone_reqs`] checks required zone statuses against the cost
//! table of a [`ZoneConfiguration`].
//!
//! [`validate_schedule`] re-checks a finished schedule against the graph,
//! the contractor capacities and the zone claims. Cycles are not an input
//! error: [`TaskGraph::new`](crate::models::TaskGraph::new) breaks them.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    Contractor, EdgeType, Schedule, Task, TaskGraph, Time, Violation, ZoneConfiguration,
    ZoneTransition, STATUS_ANY,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// A precedence link names an unknown task or the task itself.
    InvalidPredecessor,
    /// Worker bounds or volume are malformed.
    InvalidWorkerBounds,
    /// A task has several inseparable parents, or a parent several
    /// inseparable sons, or chains depend on each other circularly.
    InvalidInseparableChain,
    /// One zone is required in two different statuses.
    ConflictingZoneRequirements,
    /// A zone is required in a status its cost table does not cover.
    UnknownZoneStatus,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a task list.
///
/// Checks:
/// 1. No duplicate task IDs
/// 2. Every parent exists and differs from the task
/// 3. Every worker requirement has `1 ≤ max_count`, `min_count ≤ max_count`,
///    a finite non-negative volume, and a kind used only once per task
/// 4. At most one inseparable parent per task and one inseparable son per
///    parent
/// 5. No zone required in two concrete statuses by the same task
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(tasks: &[Task]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut task_ids = HashSet::new();
    for task in tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
    }

    let mut inseparable_sons: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        for link in &task.parents {
            if link.parent_id == task.id {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!("Task '{}' lists itself as a parent", task.id),
                ));
            } else if !task_ids.contains(link.parent_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!(
                        "Task '{}' references unknown parent '{}'",
                        task.id, link.parent_id
                    ),
                ));
            }
        }

        let inseparable: Vec<&str> = task
            .parents
            .iter()
            .filter(|l| l.edge_type == EdgeType::InseparableFinishStart)
            .map(|l| l.parent_id.as_str())
            .collect();
        if inseparable.len() > 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInseparableChain,
                format!("Task '{}' has {} inseparable parents", task.id, inseparable.len()),
            ));
        }
        for parent in inseparable {
            *inseparable_sons.entry(parent).or_default() += 1;
        }

        validate_worker_reqs(task, &mut errors);
        validate_task_zone_reqs(task, &mut errors);
    }

    let mut crowded: Vec<_> = inseparable_sons.into_iter().filter(|&(_, n)| n > 1).collect();
    crowded.sort_unstable();
    for (parent, n) in crowded {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidInseparableChain,
            format!("Task '{parent}' has {n} inseparable sons"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_worker_reqs(task: &Task, errors: &mut Vec<ValidationError>) {
    let mut kinds = HashSet::new();
    for req in &task.worker_reqs {
        if !kinds.insert(req.kind.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkerBounds,
                format!("Task '{}' requires kind '{}' twice", task.id, req.kind),
            ));
        }
        if req.max_count == 0 || req.min_count > req.max_count {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkerBounds,
                format!(
                    "Task '{}' has bounds [{}, {}] for kind '{}'",
                    task.id, req.min_count, req.max_count, req.kind
                ),
            ));
        }
        if !req.volume.is_finite() || req.volume < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkerBounds,
                format!(
                    "Task '{}' has volume {} for kind '{}'",
                    task.id, req.volume, req.kind
                ),
            ));
        }
    }
}

fn validate_task_zone_reqs(task: &Task, errors: &mut Vec<ValidationError>) {
    let mut statuses: HashMap<&str, usize> = HashMap::new();
    for req in task.zone_reqs.iter().filter(|r| r.required_status != STATUS_ANY) {
        match statuses.insert(req.kind.as_str(), req.required_status) {
            Some(prev) if prev != req.required_status => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ConflictingZoneRequirements,
                    format!(
                        "Task '{}' needs zone '{}' in statuses {} and {}",
                        task.id, req.kind, prev, req.required_status
                    ),
                ));
            }
            _ => {}
        }
    }
}

/// Checks zone requirements against a zone configuration.
///
/// Every concrete status required of a configured zone must have a row in
/// the cost table. Requirements on unconfigured zones are left to the
/// scheduler, which reports them as
/// [`ScheduleError::UnknownZone`](crate::error::ScheduleError::UnknownZone).
pub fn validate_zone_reqs(tasks: &[Task], zone_config: &ZoneConfiguration) -> ValidationResult {
    let errors: Vec<ValidationError> = tasks
        .iter()
        .flat_map(|task| task.zone_reqs.iter().map(move |req| (task, req)))
        .filter(|(_, req)| zone_config.has_zone(&req.kind) && !zone_config.has_status(req.required_status))
        .map(|(task, req)| {
            ValidationError::new(
                ValidationErrorKind::UnknownZoneStatus,
                format!(
                    "Task '{}' needs zone '{}' in status {}, but only {} statuses are configured",
                    task.id,
                    req.kind,
                    req.required_status,
                    zone_config.statuses_available()
                ),
            )
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks a schedule against the graph, capacities and zone claims.
///
/// Checks:
/// 1. Every parent link holds (unplaced parents count as violated)
/// 2. No pool is used beyond its contractor's capacity at any time
/// 3. Overlapping zone claims agree on the status, every concrete zone
///    requirement is claimed in that status, and no claim in another
///    status overlaps a paid status switch
/// 4. Assigned counts reach `min_count`; unchained tasks also stay within
///    `max_count`
///
/// # Returns
/// `Ok(())` if the schedule is feasible, `Err(violations)` otherwise.
pub fn validate_schedule(
    schedule: &Schedule,
    graph: &TaskGraph,
    contractors: &[Contractor],
    zone_config: &ZoneConfiguration,
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    check_precedence(schedule, graph, &mut violations);
    check_capacity(schedule, contractors, &mut violations);
    check_zones(schedule, graph, zone_config, &mut violations);
    check_worker_bounds(schedule, graph, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_precedence(schedule: &Schedule, graph: &TaskGraph, violations: &mut Vec<Violation>) {
    for task in schedule.iter() {
        let head = graph.chain_head(task.task_index);
        for link in graph.parents(task.task_index) {
            let parent_id = &graph.task(link.parent).id;
            let Some(parent) = schedule.get(link.parent) else {
                violations.push(Violation::precedence_violation(
                    &task.task_id,
                    format!("parent '{parent_id}' is not scheduled"),
                ));
                continue;
            };
            let earliest = if link.edge_type == EdgeType::InseparableFinishStart
                || graph.chain_head(link.parent) == head
            {
                parent.end
            } else {
                parent.min_child_start_time() + link.lag
            };
            if task.start < earliest {
                violations.push(Violation::precedence_violation(
                    &task.task_id,
                    format!(
                        "starts at {} but parent '{parent_id}' allows {earliest}",
                        task.start
                    ),
                ));
            }
        }
    }
}

fn check_capacity(schedule: &Schedule, contractors: &[Contractor], violations: &mut Vec<Violation>) {
    // (contractor, kind) -> [(time, delta)]
    let mut events: BTreeMap<(&str, &str), Vec<(Time, i64)>> = BTreeMap::new();
    for task in schedule.iter().filter(|t| t.end > t.start) {
        for worker in task.workers.iter().filter(|w| w.count > 0) {
            let entry = events
                .entry((worker.contractor_id.as_str(), worker.kind.as_str()))
                .or_default();
            entry.push((task.start, worker.count as i64));
            entry.push((task.end, -(worker.count as i64)));
        }
    }

    for ((contractor_id, kind), mut deltas) in events {
        let capacity = contractors
            .iter()
            .find(|c| c.id == contractor_id)
            .map(|c| c.capacity(kind))
            .unwrap_or(0) as i64;
        // Releases before acquisitions at the same instant
        deltas.sort_unstable();
        let mut used = 0;
        for (time, delta) in deltas {
            used += delta;
            if used > capacity {
                violations.push(Violation::capacity_exceeded(
                    format!("{contractor_id}/{kind}"),
                    format!("{used} workers in use at {time}, capacity {capacity}"),
                ));
                break;
            }
        }
    }
}

fn check_zones(
    schedule: &Schedule,
    graph: &TaskGraph,
    zone_config: &ZoneConfiguration,
    violations: &mut Vec<Violation>,
) {
    // zone -> [(start, end, status, head id)]
    let mut claims: BTreeMap<&str, Vec<(Time, Time, usize, &str)>> = BTreeMap::new();
    let mut switches: Vec<(&ZoneTransition, &str)> = Vec::new();

    for head in (0..graph.len()).filter(|&i| !graph.is_inseparable_son(i)) {
        let chain = graph.inseparable_chain(head);
        let (Some(first), Some(last)) = (
            schedule.get(head),
            chain.last().and_then(|&m| schedule.get(m)),
        ) else {
            continue;
        };
        let (start, end) = (first.start, last.end);
        if end <= start {
            continue;
        }

        for &member in &chain {
            for req in &graph.task(member).zone_reqs {
                let claimed = last.zones_post.iter().find(|z| z.name == req.kind);
                match claimed {
                    Some(z) if zone_config.match_status(req.required_status, z.status) => {}
                    Some(z) => violations.push(Violation::zone_mismatch(
                        &req.kind,
                        format!(
                            "task '{}' needs status {} but zone is claimed in {}",
                            graph.task(member).id,
                            req.required_status,
                            z.status
                        ),
                    )),
                    None => violations.push(Violation::zone_mismatch(
                        &req.kind,
                        format!("task '{}' holds no claim on the zone", graph.task(member).id),
                    )),
                }
            }
        }
        for zone in &last.zones_post {
            claims
                .entry(zone.name.as_str())
                .or_default()
                .push((start, end, zone.status, first.task_id.as_str()));
        }
        switches.extend(first.zones_pre.iter().map(|z| (z, first.task_id.as_str())));
    }

    // Nothing else may hold the zone in another status while it switches
    for (switch, owner) in switches {
        let Some(windows) = claims.get(switch.name.as_str()) else {
            continue;
        };
        for &(s, e, status, holder) in windows {
            let overlaps = s < switch.end_time && switch.start_time < e;
            if overlaps && status != switch.to_status && status != STATUS_ANY {
                violations.push(Violation::zone_mismatch(
                    &switch.name,
                    format!(
                        "'{holder}' holds status {status} while '{owner}' switches {} -> {} on [{}, {})",
                        switch.from_status, switch.to_status, switch.start_time, switch.end_time
                    ),
                ));
            }
        }
    }

    for (zone, mut windows) in claims {
        windows.sort_unstable();
        for (i, a) in windows.iter().enumerate() {
            for b in windows[i + 1..].iter().take_while(|b| b.0 < a.1) {
                if a.2 != b.2 && a.2 != STATUS_ANY && b.2 != STATUS_ANY {
                    violations.push(Violation::zone_mismatch(
                        zone,
                        format!(
                            "'{}' holds status {} while '{}' holds {} on [{}, {})",
                            a.3,
                            a.2,
                            b.3,
                            b.2,
                            b.0,
                            a.1.min(b.1)
                        ),
                    ));
                }
            }
        }
    }
}

fn check_worker_bounds(schedule: &Schedule, graph: &TaskGraph, violations: &mut Vec<Violation>) {
    for task in schedule.iter() {
        let chained = graph.is_inseparable_son(task.task_index)
            || graph.inseparable_chain(task.task_index).len() > 1;
        for req in &graph.task(task.task_index).worker_reqs {
            let count = task.worker_count(&req.kind);
            if count < req.min_count || (!chained && count > req.max_count) {
                violations.push(Violation::worker_bounds(
                    &task.task_id,
                    format!(
                        "{count} '{}' assigned, bounds [{}, {}]",
                        req.kind, req.min_count, req.max_count
                    ),
                ));
            }
        }
    }
}
