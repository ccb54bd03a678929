use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, PoisonError},
};
use time::OffsetDateTime;

///
/// EventState
/// Process-wide, in-memory translation counters.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub collections: BTreeMap<String, CollectionCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            collections: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Entry points
    pub translations: u64,
    pub translations_with_errors: u64,

    // Path rejections by kind
    pub unknown_fields: u64,
    pub access_denied: u64,
    pub polymorphic_traversals: u64,
    pub invalid_values: u64,

    // Relationship hops
    pub subqueries: u64,
    pub subquery_ids: u64,
    pub subqueries_capped: u64,
    pub subquery_cache_hits: u64,

    pub operators_skipped: u64,
}

///
/// CollectionCounters
/// Sub-query activity against one related collection.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CollectionCounters {
    pub subqueries: u64,
    pub ids_returned: u64,
    pub capped: u64,
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Counters, when the current window started at or after the requested
    /// window start.
    pub counters: Option<EventState>,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

fn now_millis() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or_default()
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Reset all counters and open a new window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    with_state(|m| {
        let counters = match window_start_ms {
            Some(start) if start > m.window_start_ms => None,
            _ => Some(m.clone()),
        };

        EventReport { counters }
    })
}
