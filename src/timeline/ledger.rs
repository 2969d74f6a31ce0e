//! Sorted event ledger.
//!
//! Events are kept in a `Vec` ordered by `(time, seq_id, priority)` and
//! located with `partition_point`. An [`EventType::Initial`] event always
//! sorts first; a bare time lookup sorts after every event at its time.
//!
//! Events sharing a time form a *group*. Timelines derive a state after
//! every event, but only the state after the last event of a group (the
//! group end) is observable.

use crate::models::Time;

/// Kind of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Ledger origin, carrying the initial state.
    Initial,
    /// A claim opens.
    Start,
    /// A claim closes.
    End,
}

impl EventType {
    /// Tie-break priority within one `(time, seq_id)`.
    #[inline]
    pub fn priority(self) -> i8 {
        match self {
            EventType::Initial => -1,
            EventType::End => 0,
            EventType::Start => 1,
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<P> {
    /// Claim identifier (tie-break within a time).
    pub seq_id: i64,
    /// Event kind.
    pub event_type: EventType,
    /// Event time.
    pub time: Time,
    /// Timeline-specific payload (a worker count, a zone status).
    pub payload: P,
}

/// Composite ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey(Time, i64, i8);

impl<P> Event<P> {
    fn key(&self) -> EventKey {
        match self.event_type {
            EventType::Initial => EventKey(Time::MIN, i64::MIN, EventType::Initial.priority()),
            t => EventKey(self.time, self.seq_id, t.priority()),
        }
    }
}

/// Search key for a bare time point: after every event at `time`.
#[inline]
fn search_key(time: Time) -> EventKey {
    EventKey(time, i64::MAX, i8::MAX)
}

/// Time-ordered event list with binary search.
#[derive(Debug, Clone)]
pub struct EventLedger<P> {
    events: Vec<Event<P>>,
}

impl<P> EventLedger<P> {
    /// Creates a ledger holding only the initial event at t=0.
    pub fn new(initial: P) -> Self {
        Self {
            events: vec![Event {
                seq_id: -1,
                event_type: EventType::Initial,
                time: 0,
                payload: initial,
            }],
        }
    }

    /// Number of events, including the initial one.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false: the initial event is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event at position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&Event<P>> {
        self.events.get(i)
    }

    /// Time of event `i`.
    #[inline]
    pub fn time(&self, i: usize) -> Time {
        self.events[i].time
    }

    /// Events in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = &Event<P>> {
        self.events.iter()
    }

    /// Inserts an event after all equal keys and returns its position.
    pub fn insert(&mut self, event: Event<P>) -> usize {
        let key = event.key();
        let pos = self.events.partition_point(|e| e.key() <= key);
        self.events.insert(pos, event);
        pos
    }

    /// Number of events sorting at or before the search key for `time`.
    pub fn bisect_right(&self, time: Time) -> usize {
        let key = search_key(time);
        self.events.partition_point(|e| e.key() <= key)
    }

    /// Position of the last event at or before `time`.
    ///
    /// Never fails: the initial event sorts before every search key.
    #[inline]
    pub fn last_at_or_before(&self, time: Time) -> usize {
        self.bisect_right(time) - 1
    }

    /// Whether event `i` closes its time group.
    #[inline]
    pub fn is_group_end(&self, i: usize) -> bool {
        i + 1 == self.events.len() || self.events[i + 1].time != self.events[i].time
    }

    /// Time of the first event after `i`, if any.
    #[inline]
    pub fn next_time(&self, i: usize) -> Option<Time> {
        self.events.get(i + 1).map(|e| e.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(seq_id: i64, event_type: EventType, time: Time) -> Event<u32> {
        Event {
            seq_id,
            event_type,
            time,
            payload: 1,
        }
    }

    #[test]
    fn test_initial_sorts_first() {
        let mut ledger = EventLedger::new(5u32);
        ledger.insert(event(0, EventType::Start, 0));
        assert_eq!(ledger.get(0).unwrap().event_type, EventType::Initial);
        assert_eq!(ledger.get(1).unwrap().event_type, EventType::Start);
    }

    #[test]
    fn test_ordering_by_seq_then_priority() {
        let mut ledger = EventLedger::new(0u32);
        ledger.insert(event(2, EventType::Start, 5));
        ledger.insert(event(1, EventType::Start, 5));
        ledger.insert(event(1, EventType::End, 5));

        let order: Vec<(i64, EventType)> = ledger
            .iter()
            .skip(1)
            .map(|e| (e.seq_id, e.event_type))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, EventType::End),
                (1, EventType::Start),
                (2, EventType::Start)
            ]
        );
    }

    #[test]
    fn test_lookup_after_same_time_events() {
        let mut ledger = EventLedger::new(0u32);
        ledger.insert(event(0, EventType::Start, 3));
        ledger.insert(event(0, EventType::End, 7));
        ledger.insert(event(9, EventType::Start, 7));

        assert_eq!(ledger.bisect_right(2), 1);
        assert_eq!(ledger.bisect_right(3), 2);
        assert_eq!(ledger.bisect_right(7), 4);
        assert_eq!(ledger.last_at_or_before(0), 0);
        assert_eq!(ledger.last_at_or_before(6), 1);
    }

    #[test]
    fn test_group_end() {
        let mut ledger = EventLedger::new(0u32);
        ledger.insert(event(0, EventType::Start, 4));
        ledger.insert(event(1, EventType::Start, 4));
        ledger.insert(event(0, EventType::End, 6));

        assert!(ledger.is_group_end(0));
        assert!(!ledger.is_group_end(1));
        assert!(ledger.is_group_end(2));
        assert!(ledger.is_group_end(3));
        assert_eq!(ledger.next_time(2), Some(6));
        assert_eq!(ledger.next_time(3), None);
    }

    #[test]
    fn test_priorities() {
        assert!(EventType::Initial.priority() < EventType::End.priority());
        assert!(EventType::End.priority() < EventType::Start.priority());
    }
}
