// Service primitives for the AUDIO-SAP (HF client -> audio sink).
// The sink internals are out of scope; these carry just enough for a
// platform audio backend to act on.
#![allow(unused)]
use hfpc_core::BdAddr;

/// Route (or un-route) SCO audio through the platform audio path.
/// Sent only on actual 0->1 / 1->0 transitions of the process-wide
/// routing flag.
#[derive(Debug)]
pub struct AudioRouteReq {
    pub peer: BdAddr,
    pub enable: bool,
    /// Sink sample rate for the negotiated codec, valid when enabling
    pub sample_rate_hz: u32,
}

/// Acquire or release transient audio focus for the call audio stream
#[derive(Debug)]
pub struct AudioFocusReq {
    pub peer: BdAddr,
    pub acquire: bool,
}

/// Set the platform stream volume, native domain
#[derive(Debug)]
pub struct AudioVolumeReq {
    pub peer: BdAddr,
    pub volume: u8,
}
