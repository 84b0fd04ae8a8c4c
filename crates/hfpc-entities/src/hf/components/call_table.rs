use std::collections::HashMap;

use hfpc_core::{Call, CallId, CallState, MonoTime, OUTGOING_CALL_ID};

/// Result of one reconciliation pass
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// One entry per call whose externally visible state changed this pass.
    /// Terminated calls are reported with state Terminated.
    pub changed: Vec<Call>,
    /// The speculative outgoing call outlived its confirm timeout. The
    /// session must send one terminate command; the table is already
    /// cleared and all calls reported as terminated.
    pub stuck_outgoing: bool,
}

/// Authoritative set of calls of one session, keyed by peer-assigned id.
/// Holds at most one sentinel-id entry (an unconfirmed outgoing call).
#[derive(Default)]
pub struct CallTable {
    calls: HashMap<CallId, Call>,
}

impl CallTable {
    pub fn new() -> Self {
        Self {
            calls: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn get(&self, id: CallId) -> Option<&Call> {
        self.calls.get(&id)
    }

    pub fn has_sentinel(&self) -> bool {
        self.calls.contains_key(&OUTGOING_CALL_ID)
    }

    /// True if any call matches the predicate
    pub fn any<F: Fn(&Call) -> bool>(&self, pred: F) -> bool {
        self.calls.values().any(pred)
    }

    /// All calls, sorted by id for stable iteration
    pub fn snapshot(&self) -> Vec<Call> {
        let mut v: Vec<Call> = self.calls.values().cloned().collect();
        v.sort_by_key(|c| c.id);
        v
    }

    /// Register a speculative outgoing call under the sentinel id.
    /// Refused while one is already pending.
    pub fn insert_outgoing(&mut self, number: String, now: MonoTime) -> Option<&Call> {
        if self.has_sentinel() {
            tracing::warn!("insert_outgoing: dial already pending, refusing");
            return None;
        }
        let call = Call::new_outgoing(number, now);
        self.calls.insert(OUTGOING_CALL_ID, call);
        self.calls.get(&OUTGOING_CALL_ID)
    }

    /// Drop the speculative outgoing call (dial rejected by the peer).
    /// Returns it with state Terminated for notification.
    pub fn remove_sentinel(&mut self) -> Option<Call> {
        self.calls.remove(&OUTGOING_CALL_ID).map(|mut c| {
            c.state = CallState::Terminated;
            c
        })
    }

    /// Terminate everything locally (session teardown or stuck-call
    /// recovery). Clears the table, returns the calls with state Terminated.
    pub fn force_terminate_all(&mut self) -> Vec<Call> {
        let mut terminated: Vec<Call> = self
            .calls
            .drain()
            .map(|(_, mut c)| {
                c.state = CallState::Terminated;
                c
            })
            .collect();
        terminated.sort_by_key(|c| c.id);
        terminated
    }

    /// Fold one full current-call listing into the table.
    ///
    /// Partitions the reported ids against the known ones into added,
    /// removed and retained. An unconfirmed outgoing call is matched to the
    /// lowest added id; if nothing arrives for it within
    /// `confirm_timeout_ms` the whole table is cleared for recovery.
    /// Exactly one changed entry is produced per affected call.
    pub fn reconcile(
        &mut self,
        mut snapshot: HashMap<CallId, Call>,
        now: MonoTime,
        confirm_timeout_ms: u64,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        // The peer must never report the sentinel id
        if snapshot.remove(&OUTGOING_CALL_ID).is_some() {
            tracing::warn!("reconcile: peer reported the reserved call id, dropped");
        }

        let mut added: Vec<CallId> = snapshot
            .keys()
            .filter(|id| !self.calls.contains_key(id))
            .copied()
            .collect();
        added.sort_unstable();

        let mut removed: Vec<CallId> = self
            .calls
            .keys()
            .filter(|&&id| id != OUTGOING_CALL_ID && !snapshot.contains_key(&id))
            .copied()
            .collect();
        removed.sort_unstable();

        let mut retained: Vec<CallId> = self
            .calls
            .keys()
            .filter(|&&id| id != OUTGOING_CALL_ID && snapshot.contains_key(&id))
            .copied()
            .collect();
        retained.sort_unstable();

        // Match the unconfirmed outgoing call to the first new id the peer
        // reports. If none shows up within the timeout, the dial is
        // considered lost: terminate everything and start afresh.
        if let Some(sentinel) = self.calls.get(&OUTGOING_CALL_ID) {
            if let Some(&new_id) = added.first() {
                let age = sentinel.created.age(now);
                tracing::debug!(
                    "reconcile: outgoing call confirmed as id {} after {} ms",
                    new_id,
                    age
                );
                self.calls.remove(&OUTGOING_CALL_ID);
                if let Some(call) = snapshot.remove(&new_id) {
                    self.calls.insert(new_id, call.clone());
                    outcome.changed.push(call);
                }
                added.retain(|&id| id != new_id);
            } else if sentinel.created.age(now) >= confirm_timeout_ms as i64 {
                tracing::warn!(
                    "reconcile: outgoing call unconfirmed after {} ms, recovering",
                    confirm_timeout_ms
                );
                outcome.changed.append(&mut self.force_terminate_all());
                outcome.stuck_outgoing = true;
                return outcome;
            }
        }

        // Removed: peer no longer lists them
        for id in removed {
            if let Some(mut call) = self.calls.remove(&id) {
                call.state = CallState::Terminated;
                outcome.changed.push(call);
            }
        }

        // Added: new calls from the peer
        for id in added {
            if let Some(call) = snapshot.remove(&id) {
                self.calls.insert(id, call.clone());
                outcome.changed.push(call);
            }
        }

        // Retained: report only when a visible field moved
        for id in retained {
            let reported = match snapshot.remove(&id) {
                Some(c) => c,
                None => continue,
            };
            let known = match self.calls.get_mut(&id) {
                Some(c) => c,
                None => continue,
            };
            if known.state != reported.state
                || known.number != reported.number
                || known.multiparty != reported.multiparty
            {
                known.state = reported.state;
                known.number = reported.number;
                known.multiparty = reported.multiparty;
                outcome.changed.push(known.clone());
            }
        }

        outcome
    }
}
