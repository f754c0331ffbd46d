//! Sync state machine.
//!
//! # Responsibility
//! - Track connectivity status and the remote-apply guard.
//! - Decide when a local change needs a debounced remote write.
//! - Translate between `DashboardState` and remote document fields.
//!
//! # Invariants
//! - While `ApplyPhase::ApplyingRemote` is set, local changes are never
//!   scheduled for writing.
//! - A local state whose canonical text equals `last_saved` is never written.
//! - Every reschedule moves the deadline to `now + debounce`.
//! - `Error` is re-entrant: the next successful write returns to `Connected`.
//!
//! The engine performs no I/O of its own beyond the calls it is handed a
//! `DocumentStore` for; timing is supplied by the caller.

use crate::config::DashboardConfig;
use crate::model::state::{Aggregate, AggregateSet, DashboardState};
use crate::repo::kv_repo::KvStore;
use crate::service::dashboard_store::DashboardStore;
use crate::sync::document::{
    DocumentPath, DocumentSnapshot, DocumentStore, RemoteError, Subscription,
    CLIENT_UPDATED_AT_FIELD,
};
use crate::sync::sanitize::strip_absent;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::time::Instant;

/// Connectivity state exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl SyncStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Whether a remote snapshot is currently being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Idle,
    ApplyingRemote,
}

/// Outcome of reporting a local change to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    /// The change came from a remote apply and must not bounce back.
    Suppressed,
    /// Local state already matches the last saved remote state.
    Unchanged,
    /// A write is pending at `deadline`.
    Scheduled { deadline: Instant },
}

pub struct SyncEngine {
    document: DocumentPath,
    debounce: Duration,
    status: SyncStatus,
    phase: ApplyPhase,
    last_saved: Option<String>,
    deadline: Option<Instant>,
}

impl SyncEngine {
    pub fn new(document: DocumentPath, debounce: Duration) -> Self {
        Self {
            document,
            debounce,
            status: SyncStatus::Disconnected,
            phase: ApplyPhase::Idle,
            last_saved: None,
            deadline: None,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.document.clone(), config.debounce)
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn phase(&self) -> ApplyPhase {
        self.phase
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Opens the single subscription. On failure the engine enters `Error`
    /// and the caller keeps working offline.
    pub fn connect(&mut self, remote: &dyn DocumentStore) -> Option<Subscription> {
        self.status = SyncStatus::Connecting;
        info!(
            "event=sync_connect module=sync status=start path={}",
            self.document
        );
        match remote.subscribe(&self.document) {
            Ok(subscription) => {
                self.status = SyncStatus::Connected;
                info!(
                    "event=sync_connect module=sync status=ok path={}",
                    self.document
                );
                Some(subscription)
            }
            Err(err) => {
                self.fail("sync_connect", format!("subscribe failed: {err}"));
                None
            }
        }
    }

    /// Records that the snapshot stream ended.
    pub fn mark_subscription_closed(&mut self) {
        self.fail("sync_subscription", RemoteError::SubscriptionClosed.to_string());
    }

    /// Overwrites every known aggregate present in `snapshot`.
    ///
    /// Enters `ApplyingRemote`; the caller must call
    /// [`finish_apply`](Self::finish_apply) once the resulting change cascade
    /// has been observed. Snapshots without content are ignored.
    pub fn apply_snapshot<S: KvStore>(
        &mut self,
        snapshot: &DocumentSnapshot,
        store: &mut DashboardStore<S>,
    ) -> Vec<Aggregate> {
        if !snapshot.has_content() {
            debug!("event=sync_apply module=sync status=skip reason=empty_snapshot");
            return Vec::new();
        }

        let set = decode_aggregates(&snapshot.data);
        if set.is_empty() {
            debug!("event=sync_apply module=sync status=skip reason=no_known_fields");
            return Vec::new();
        }

        self.phase = ApplyPhase::ApplyingRemote;
        let applied = store.replace_aggregates(set);

        // A pending local write still has content the remote has not seen.
        if self.deadline.is_none() {
            match store.state().canonical_json() {
                Ok(canonical) => self.last_saved = Some(canonical),
                Err(err) => warn!(
                    "event=sync_apply module=sync status=error error_code=canonical_failed error={err}"
                ),
            }
        }
        info!(
            "event=sync_apply module=sync status=ok fields={}",
            applied
                .iter()
                .map(|aggregate| aggregate.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        applied
    }

    /// Leaves the remote-apply phase.
    pub fn finish_apply(&mut self) {
        self.phase = ApplyPhase::Idle;
    }

    /// Reports a local state change observed at `now`.
    pub fn on_local_change(&mut self, state: &DashboardState, now: Instant) -> ChangeDecision {
        if self.phase == ApplyPhase::ApplyingRemote {
            debug!("event=sync_local_change module=sync status=skip reason=applying_remote");
            return ChangeDecision::Suppressed;
        }

        let canonical = match state.canonical_json() {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!(
                    "event=sync_local_change module=sync status=error error_code=canonical_failed error={err}"
                );
                return ChangeDecision::Unchanged;
            }
        };
        if self.last_saved.as_deref() == Some(canonical.as_str()) {
            debug!("event=sync_local_change module=sync status=skip reason=unchanged");
            return ChangeDecision::Unchanged;
        }

        let deadline = now + self.debounce;
        self.deadline = Some(deadline);
        debug!(
            "event=sync_local_change module=sync status=ok debounce_ms={}",
            self.debounce.as_millis()
        );
        ChangeDecision::Scheduled { deadline }
    }

    /// Whether the pending write's quiet period has elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Writes every aggregate to the remote document as a merge.
    ///
    /// Clears the pending deadline whatever the outcome. Returns `Ok(false)`
    /// when the state already matches `last_saved` and nothing was sent.
    pub fn flush(
        &mut self,
        state: &DashboardState,
        remote: &dyn DocumentStore,
        client_now_ms: i64,
    ) -> Result<bool, RemoteError> {
        self.deadline = None;

        let canonical = state
            .canonical_json()
            .map_err(|err| RemoteError::Rejected(format!("encode failed: {err}")))?;
        if self.last_saved.as_deref() == Some(canonical.as_str()) {
            debug!("event=sync_write module=sync status=skip reason=unchanged");
            return Ok(false);
        }

        let fields = encode_fields(state, client_now_ms)
            .map_err(|err| RemoteError::Rejected(format!("encode failed: {err}")))?;
        match remote.merge_write(&self.document, fields) {
            Ok(()) => {
                self.last_saved = Some(canonical);
                if self.status != SyncStatus::Connected {
                    info!(
                        "event=sync_status module=sync status=ok from={} to=connected",
                        self.status
                    );
                }
                self.status = SyncStatus::Connected;
                info!(
                    "event=sync_write module=sync status=ok path={} bytes={}",
                    self.document,
                    self.last_saved.as_ref().map_or(0, String::len)
                );
                Ok(true)
            }
            Err(err) => {
                self.fail("sync_write", format!("write failed: {err}"));
                Err(err)
            }
        }
    }

    /// Drops the pending write, if any. Returns whether one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Releases engine state for a closing surface.
    pub fn shutdown(&mut self) {
        if self.cancel_pending() {
            info!("event=sync_shutdown module=sync status=ok pending_write=cancelled");
        }
        self.phase = ApplyPhase::Idle;
        self.status = SyncStatus::Disconnected;
    }

    fn fail(&mut self, event: &str, message: String) {
        error!("event={event} module=sync status=error error={message}");
        self.status = SyncStatus::Error(message);
    }
}

/// Serializes `state` as remote fields with absent values stripped.
pub fn encode_fields(
    state: &DashboardState,
    client_now_ms: i64,
) -> serde_json::Result<Map<String, Value>> {
    let mut fields = match strip_absent(serde_json::to_value(state)?) {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.insert(
        CLIENT_UPDATED_AT_FIELD.to_string(),
        Value::from(client_now_ms),
    );
    Ok(fields)
}

/// Decodes every known aggregate present in `data`.
///
/// Fields decode independently: a malformed field is logged and skipped
/// while the others still apply. Unknown fields are ignored.
///
/// Items carrying XP below 1 are dropped so they can never move the counter
/// backwards.
pub fn decode_aggregates(data: &Map<String, Value>) -> AggregateSet {
    let mut set = AggregateSet {
        xp: decode_xp(data),
        tasks: decode_field(data, Aggregate::Tasks),
        daily: decode_field(data, Aggregate::Daily),
        top: decode_field(data, Aggregate::Top),
        todos: decode_field(data, Aggregate::Todos),
        leads: decode_field(data, Aggregate::Leads),
    };
    if let Some(tasks) = set.tasks.as_mut() {
        retain_positive_xp(tasks, Aggregate::Tasks, |task| task.xp);
    }
    if let Some(daily) = set.daily.as_mut() {
        retain_positive_xp(&mut daily.items, Aggregate::Daily, |item| item.xp);
    }
    if let Some(top) = set.top.as_mut() {
        retain_positive_xp(&mut top.items, Aggregate::Top, |item| item.xp);
    }
    set
}

fn retain_positive_xp<T>(items: &mut Vec<T>, aggregate: Aggregate, xp: impl Fn(&T) -> i64) {
    let before = items.len();
    items.retain(|item| xp(item) >= 1);
    let dropped = before - items.len();
    if dropped > 0 {
        warn!(
            "event=sync_decode module=sync status=partial field={} reason=non_positive_xp dropped={}",
            aggregate.as_str(),
            dropped
        );
    }
}

fn decode_xp(data: &Map<String, Value>) -> Option<i64> {
    let value = data.get(Aggregate::Xp.as_str())?;
    if value.is_null() {
        return None;
    }
    let decoded = value
        .as_i64()
        .or_else(|| value.as_f64().map(|xp| xp.round() as i64));
    if decoded.is_none() {
        warn!("event=sync_decode module=sync status=skip field=xp reason=not_a_number");
    }
    decoded
}

fn decode_field<T: DeserializeOwned>(
    data: &Map<String, Value>,
    aggregate: Aggregate,
) -> Option<T> {
    let value = data.get(aggregate.as_str())?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(
                "event=sync_decode module=sync status=skip field={} error={}",
                aggregate.as_str(),
                err
            );
            None
        }
    }
}
