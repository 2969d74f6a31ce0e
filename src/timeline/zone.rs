//! Zone timeline.
//!
//! Each zone keeps an [`EventLedger`] of claims. A claim opens with a
//! START event and closes with an END event, both carrying the claimed
//! status. The derived state after every event tells whether the zone is
//! occupied and which status it is in:
//!
//! - while claims are open, the status of the most recently opened one;
//! - in a gap, the status of the last closed claim (or the initial one).
//!
//! # Search
//! For one requirement, a forward scan from the candidate start `t`:
//! 1. Occupied with a wrong status: jump to the next checkpoint.
//! 2. Free with a wrong ambient status: either pay the transition
//!    (`time_costs[from][to]`, started no earlier than the gap and the
//!    floor) or wait for the next checkpoint, whichever is sooner. A tie
//!    waits.
//! 3. Any checkpoint inside `[t, t + exec)` with a wrong status moves `t`
//!    onto it and the scan repeats.
//! 4. The first claim opening after the window must still be reachable:
//!    if it needs another status, the switch has to fit between the end
//!    of the window and its start. Otherwise `t` moves past that claim.
//!
//! Several requirements are reconciled with a queue: when one pushes the
//! start later, every requirement accepted at the old start is queued
//! again. The start never decreases, so both loops terminate.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use super::ledger::{Event, EventLedger, EventType};
use crate::error::{Result, ScheduleError};
use crate::models::{Time, Zone, ZoneConfiguration, ZoneReq, ZoneTransition, STATUS_ANY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZoneState {
    occupied: bool,
    status: usize,
}

#[derive(Debug, Clone)]
struct ZoneLedger {
    events: EventLedger<usize>,
    states: Vec<ZoneState>,
}

impl ZoneLedger {
    fn new(initial_status: usize) -> Self {
        Self {
            events: EventLedger::new(initial_status),
            states: vec![ZoneState {
                occupied: false,
                status: initial_status,
            }],
        }
    }

    fn recompute(&mut self) {
        let mut open: Vec<(i64, usize)> = Vec::new();
        let mut ambient = STATUS_ANY;
        self.states = self
            .events
            .iter()
            .map(|e| {
                match e.event_type {
                    EventType::Initial => ambient = e.payload,
                    EventType::Start => open.push((e.seq_id, e.payload)),
                    EventType::End => {
                        if let Some(pos) = open.iter().rposition(|&(seq, _)| seq == e.seq_id) {
                            open.remove(pos);
                        }
                        ambient = e.payload;
                    }
                }
                ZoneState {
                    occupied: !open.is_empty(),
                    status: open.last().map(|&(_, s)| s).unwrap_or(ambient),
                }
            })
            .collect();
    }

    fn state_at(&self, time: Time) -> (usize, ZoneState) {
        let idx = self.events.last_at_or_before(time);
        (idx, self.states[idx])
    }

    fn next_time(&self, idx: usize) -> Time {
        match self.events.next_time(idx) {
            Some(time) => time,
            None => panic!("zone ledger ends inside an open claim"),
        }
    }
}

/// Status ledger of every configured zone.
///
/// # Example
///
/// ```
/// use u_project::models::{ZoneConfiguration, ZoneReq};
/// use u_project::timeline::ZoneTimeline;
///
/// let config = ZoneConfiguration::new(vec![vec![0, 0, 0], vec![0, 1, 1], vec![0, 1, 1]])
///     .with_zone("road", 1);
/// let timeline = ZoneTimeline::new(&config);
///
/// // Switching road from status 1 to 2 takes one tick
/// let start = timeline
///     .find_min_start_time(&[ZoneReq::new("road", 2)], 0, 5)
///     .unwrap();
/// assert_eq!(start, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ZoneTimeline {
    config: ZoneConfiguration,
    zones: HashMap<String, ZoneLedger>,
}

impl ZoneTimeline {
    /// Creates one ledger per configured zone, in its initial status.
    pub fn new(config: &ZoneConfiguration) -> Self {
        let zones = config
            .start_statuses
            .iter()
            .map(|(name, &status)| (name.clone(), ZoneLedger::new(status)))
            .collect();
        Self {
            config: config.clone(),
            zones,
        }
    }

    /// The configuration this timeline was built from.
    pub fn config(&self) -> &ZoneConfiguration {
        &self.config
    }

    /// Whether `zone` is tracked.
    pub fn has_zone(&self, zone: &str) -> bool {
        self.zones.contains_key(zone)
    }

    /// Status of `zone` at `time`, after every event at that time.
    pub fn status_at(&self, zone: &str, time: Time) -> Option<usize> {
        self.zones.get(zone).map(|l| l.state_at(time).1.status)
    }

    /// Whether some claim holds `zone` at `time`.
    pub fn is_occupied(&self, zone: &str, time: Time) -> bool {
        self.zones
            .get(zone)
            .map(|l| l.state_at(time).1.occupied)
            .unwrap_or(false)
    }

    /// Earliest start `≥ parent_time` at which every requirement holds for
    /// `exec_time`.
    ///
    /// # Errors
    /// [`ScheduleError::UnknownZone`] if a requirement names an
    /// unconfigured zone.
    pub fn find_min_start_time(
        &self,
        zone_reqs: &[ZoneReq],
        parent_time: Time,
        exec_time: Time,
    ) -> Result<Time> {
        self.find_min_start_time_from(zone_reqs, parent_time, parent_time, exec_time)
    }

    /// Like [`find_min_start_time`](Self::find_min_start_time), but starts
    /// the scan at `start` while letting transitions begin as early as
    /// `floor`.
    pub fn find_min_start_time_from(
        &self,
        zone_reqs: &[ZoneReq],
        start: Time,
        floor: Time,
        exec_time: Time,
    ) -> Result<Time> {
        // One requirement per zone; the last stated status wins
        let mut grouped: Vec<(&str, usize)> = Vec::with_capacity(zone_reqs.len());
        for req in zone_reqs {
            if !self.zones.contains_key(&req.kind) {
                return Err(ScheduleError::UnknownZone(req.kind.clone()));
            }
            match grouped.iter_mut().find(|(kind, _)| *kind == req.kind) {
                Some(entry) => entry.1 = req.required_status,
                None => grouped.push((req.kind.as_str(), req.required_status)),
            }
        }

        let mut queue: VecDeque<(&str, usize)> = grouped.into_iter().collect();
        let mut accepted: Vec<(&str, usize)> = Vec::new();
        let mut start = start;

        while let Some((zone, status)) = queue.pop_front() {
            let found = self.find_earliest_time_slot(&self.zones[zone], start, floor, exec_time, status);
            debug_assert!(found >= start, "zone search moved backwards: {found} < {start}");

            if accepted.is_empty() || found == start {
                accepted.push((zone, status));
            } else {
                trace!(
                    zone,
                    from = start,
                    to = found,
                    requeued = accepted.len(),
                    "zone requirement pushed start"
                );
                queue.extend(accepted.drain(..));
                accepted.push((zone, status));
            }
            start = found;
        }

        Ok(start)
    }

    fn find_earliest_time_slot(
        &self,
        ledger: &ZoneLedger,
        start: Time,
        floor: Time,
        exec_time: Time,
        required_status: usize,
    ) -> Time {
        let mut t = start;
        loop {
            let (idx, state) = ledger.state_at(t);
            let wanted = if required_status == STATUS_ANY {
                state.status
            } else {
                required_status
            };

            if !self.config.match_status(wanted, state.status) {
                if state.occupied {
                    t = ledger.next_time(idx);
                    continue;
                }
                let gap_start = ledger.events.time(idx).max(floor);
                let changed = t.max(gap_start + self.config.change_cost(state.status, wanted));
                match ledger.events.next_time(idx) {
                    Some(next) if next <= changed => {
                        t = next;
                        continue;
                    }
                    _ => t = changed,
                }
            }

            let window_end = t + exec_time;
            let conflict = (idx + 1..ledger.events.len())
                .take_while(|&j| ledger.events.time(j) < window_end)
                .find(|&j| {
                    ledger.events.is_group_end(j)
                        && !self.config.match_status(wanted, ledger.states[j].status)
                });

            if let Some(j) = conflict {
                let next = ledger.events.time(j);
                debug_assert!(next > t, "zone scan did not advance");
                t = next;
                continue;
            }

            // The next claim must still have time to switch away from `wanted`
            let squeezed = (idx + 1..ledger.events.len())
                .filter_map(|j| ledger.events.get(j).map(|e| (j, e)))
                .skip_while(|(_, e)| e.time < window_end)
                .find(|(_, e)| e.event_type == EventType::Start)
                .filter(|(_, e)| {
                    exec_time > 0
                        && !self.config.match_status(wanted, e.payload)
                        && window_end + self.config.change_cost(wanted, e.payload) > e.time
                });
            match squeezed {
                Some((j, _)) => t = ledger.next_time(j),
                None => return t,
            }
        }
    }

    /// Commits claims on `zones` for `[start, start + exec_time)`.
    ///
    /// A zone stated as [`STATUS_ANY`] is claimed in whatever status it
    /// holds at `start`. Returns the paid transitions and the statuses
    /// left behind. Zero-length claims are not recorded.
    ///
    /// # Panics
    /// If the left boundary is occupied with another status, or a
    /// checkpoint inside the window disagrees with the claim.
    pub fn update(
        &mut self,
        task_index: usize,
        zones: &[Zone],
        start: Time,
        exec_time: Time,
    ) -> (Vec<ZoneTransition>, Vec<Zone>) {
        let mut zones_pre = Vec::new();
        let mut zones_post = Vec::new();
        if exec_time <= 0 {
            return (zones_pre, zones_post);
        }

        for zone in zones {
            let ledger = match self.zones.get_mut(&zone.name) {
                Some(ledger) => ledger,
                None => panic!("zone '{}' is not configured", zone.name),
            };
            let (idx, state) = ledger.state_at(start);
            let claimed = if zone.status == STATUS_ANY {
                state.status
            } else {
                zone.status
            };

            assert!(
                !state.occupied || self.config.match_status(claimed, state.status),
                "zone '{}' at t={start} holds status {} but task {task_index} claims {claimed}",
                zone.name,
                state.status
            );
            let end = start + exec_time;
            for j in (idx + 1..ledger.events.len()).take_while(|&j| ledger.events.time(j) < end) {
                if ledger.events.is_group_end(j) {
                    assert!(
                        self.config.match_status(claimed, ledger.states[j].status),
                        "zone '{}' switches to status {} at t={} inside task {task_index}",
                        zone.name,
                        ledger.states[j].status,
                        ledger.events.time(j)
                    );
                }
            }

            if !state.occupied && claimed != STATUS_ANY && state.status != claimed {
                let cost = self.config.change_cost(state.status, claimed);
                zones_pre.push(ZoneTransition {
                    name: zone.name.clone(),
                    from_status: state.status,
                    to_status: claimed,
                    start_time: start - cost,
                    end_time: start,
                });
            }

            let seq_id = task_index as i64;
            ledger.events.insert(Event {
                seq_id,
                event_type: EventType::Start,
                time: start,
                payload: claimed,
            });
            ledger.events.insert(Event {
                seq_id,
                event_type: EventType::End,
                time: end,
                payload: claimed,
            });
            ledger.recompute();
            zones_post.push(Zone::new(zone.name.clone(), claimed));
        }

        (zones_pre, zones_post)
    }
}
