use crate::{CallId, MonoTime, OUTGOING_CALL_ID};

/// Call state as reported by the peer in current-call listings
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CallState {
    Active,
    Held,
    Dialing,
    Alerting,
    Incoming,
    Waiting,
    HeldByResponseAndHold,
    /// Local-only state, set when a call leaves the table
    Terminated,
}

impl CallState {
    /// States in which the peer is ringing us or a call is waiting
    pub fn is_ringing(self) -> bool {
        matches!(self, CallState::Incoming | CallState::Waiting)
    }

    /// States of a not-yet-established outgoing call
    pub fn is_outgoing_pending(self) -> bool {
        matches!(self, CallState::Dialing | CallState::Alerting)
    }
}

/// A single call tracked by a session.
/// Lives in the session call table from the first listing that reports it
/// (or from the dial request, under [`OUTGOING_CALL_ID`]) until it is
/// reconciled out or the session tears down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub id: CallId,
    pub state: CallState,
    /// Phone number, may be empty if the peer withholds it
    pub number: String,
    pub multiparty: bool,
    pub outgoing: bool,
    pub in_band_ring: bool,
    /// Stack time at which this call entered the table
    pub created: MonoTime,
}

impl Call {
    pub fn new(id: CallId, state: CallState, number: String, now: MonoTime) -> Self {
        Self {
            id,
            state,
            number,
            multiparty: false,
            outgoing: false,
            in_band_ring: false,
            created: now,
        }
    }

    /// Speculative outgoing call created on a dial request, before the peer
    /// has assigned it an id.
    pub fn new_outgoing(number: String, now: MonoTime) -> Self {
        Self {
            id: OUTGOING_CALL_ID,
            state: CallState::Dialing,
            number,
            multiparty: false,
            outgoing: true,
            in_band_ring: false,
            created: now,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == OUTGOING_CALL_ID
    }
}
