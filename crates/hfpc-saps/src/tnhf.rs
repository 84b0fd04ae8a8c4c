// Service primitives for the TNHF-SAP (HF client <-> user).
// Indications are notifications to observers; the action request is the
// message-borne form of the HF client's public action surface.
#![allow(unused)]
use hfpc_core::{AudioState, BdAddr, Call, CallId, HfState};

use crate::bthf::{ChldFeatures, PeerFeatures};

/// User-requested operation on a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HfAction {
    Connect,
    Disconnect,
    ConnectAudio,
    DisconnectAudio,
    Dial(String),
    AcceptCall,
    RejectCall,
    /// None terminates whatever call is current
    TerminateCall(Option<CallId>),
    HoldCall,
    PrivateMode(CallId),
    ExplicitTransfer,
    SendDtmf(char),
    VoiceRecognition(bool),
    SetAudioRouteAllowed(bool),
    SetAudioPolicy(AudioPolicy),
}

/// Tunable audio/polling behavior, settable at runtime per session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AudioPolicy {
    /// Keep querying the call list at the short interval while a call is up
    pub poll_during_call: bool,
}

#[derive(Debug)]
pub struct TnhfActionReq {
    pub peer: BdAddr,
    pub action: HfAction,
}

// ---- Notifications (HF client -> observers) ----

/// A call appeared, changed or terminated. Carries the full call record;
/// terminated calls are reported once with state Terminated.
#[derive(Debug)]
pub struct TnhfCallChangedInd {
    pub peer: BdAddr,
    pub call: Call,
}

#[derive(Debug)]
pub struct TnhfConnStateInd {
    pub peer: BdAddr,
    pub prev: HfState,
    pub state: HfState,
    /// Negotiated features, present on the transition into Connected
    pub features: Option<(PeerFeatures, ChldFeatures)>,
}

#[derive(Debug)]
pub struct TnhfAudioStateInd {
    pub peer: BdAddr,
    pub prev: AudioState,
    pub state: AudioState,
    /// Valid when state is Connected
    pub wideband: bool,
}

/// Ambient indicator updates, broadcast independently on change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorUpdate {
    NetworkAvailable(bool),
    Roaming(bool),
    Signal(u8),
    Battery(u8),
    OperatorName(String),
    InBandRing(bool),
    VoiceRecognition(bool),
    SubscriberNumber(String),
}

#[derive(Debug)]
pub struct TnhfIndicatorInd {
    pub peer: BdAddr,
    pub update: IndicatorUpdate,
}

/// Unsolicited RING forwarded to observers
#[derive(Debug)]
pub struct TnhfRingInd {
    pub peer: BdAddr,
}
