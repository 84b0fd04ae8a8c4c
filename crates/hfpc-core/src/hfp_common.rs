/// SAPs between the entities of the stack
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Sap {
    /// Transport / HF client: requests down, indications up
    BthfSap,
    /// HF client -> audio sink: routing, focus and volume
    AudioSap,
    /// HF client -> user: notifications; user -> HF client: actions
    TnhfSap,

    /// Custom SAP for inter-entity control messages
    Control,
}

/// Service-level connection state of a session, as exposed to observers
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HfState {
    Disconnected,
    Connecting,
    Connected,
    AudioOn,
}

/// State of the SCO audio leg
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioState {
    Disconnected,
    Connecting,
    Connected,
}

/// Negotiated SCO codec
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScoCodec {
    Cvsd,
    Msbc,
}

impl ScoCodec {
    pub fn sample_rate_hz(self) -> u32 {
        match self {
            ScoCodec::Cvsd => 8000,
            ScoCodec::Msbc => 16000,
        }
    }

    pub fn wideband(self) -> bool {
        self == ScoCodec::Msbc
    }
}

/// Which gain a volume value applies to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VolumeTarget {
    Speaker,
    Microphone,
}
