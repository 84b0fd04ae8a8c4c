// Service primitives for the BTHF-SAP (transport <-> HF client).
// Requests flow down to the transport, indications flow up. Requests are
// fire-and-forget: the transport accepts them for processing and reports
// completion asynchronously through the indication stream.
#![allow(unused)]
use hfpc_core::{AudioState, BdAddr, CallId, CallState, ScoCodec, VolumeTarget};

/// Connection state of the service-level link as reported by the transport
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportConnState {
    Disconnected,
    Connecting,
    /// RFCOMM up, SLC negotiation still in progress
    Connected,
    /// SLC established, feature bits valid
    SlcConnected,
}

/// Result of a single AT command, in arrival order
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CmdResult {
    Ok,
    Error,
    /// Extended error with CME code
    CmeError(u16),
}

impl CmdResult {
    pub fn is_ok(self) -> bool {
        self == CmdResult::Ok
    }
}

/// Three-way-calling operations (AT+CHLD)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChldOp {
    /// 0: release all held, or reject waiting
    ReleaseHeld,
    /// 1: release active, accept other
    ReleaseActiveAcceptOther,
    /// 1x: release the given call only
    ReleaseSpecific(CallId),
    /// 2: hold active, accept other
    HoldActiveAcceptOther,
    /// 2x: private consultation with the given call
    PrivateConsult(CallId),
    /// 3: merge into multiparty
    Merge,
    /// 4: connect held and active, drop out (explicit call transfer)
    MergeDetach,
}

/// Commands the HF client may ask the transport to send.
/// The wire grammar is the transport's business; these are semantic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// ATD
    Dial(String),
    /// ATA
    Answer,
    /// AT+CHUP
    Terminate,
    /// AT+CHLD
    Chld(ChldOp),
    /// AT+VTS
    Dtmf(char),
    /// AT+NREC=0
    NrecDisable,
    /// AT+VGS, HF domain 0..15
    SpeakerVolume(u8),
    /// AT+VGM, HF domain 0..15
    MicVolume(u8),
    /// AT+CNUM
    SubscriberInfo,
    /// AT+COPS?
    OperatorName,
    /// AT+BVRA
    VoiceRecognition(bool),
    /// Vendor capability probe (AT+XAPL-style), best effort
    VendorProbe,
}

/// Peer (AG) feature bits as negotiated at SLC time
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PeerFeatures {
    pub three_way_calling: bool,
    pub ec_nr: bool,
    pub voice_recognition: bool,
    pub in_band_ring: bool,
    pub reject_call: bool,
    pub enhanced_call_status: bool,
    pub enhanced_call_control: bool,
}

impl PeerFeatures {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            three_way_calling: bits & 0x01 != 0,
            ec_nr: bits & 0x02 != 0,
            voice_recognition: bits & 0x04 != 0,
            in_band_ring: bits & 0x08 != 0,
            reject_call: bits & 0x20 != 0,
            enhanced_call_status: bits & 0x40 != 0,
            enhanced_call_control: bits & 0x80 != 0,
        }
    }
}

/// Per-operation CHLD capability bits as negotiated at SLC time
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ChldFeatures {
    pub release_held: bool,
    pub release_active_accept: bool,
    pub release_specific: bool,
    pub hold_active_accept: bool,
    pub private_consult: bool,
    pub merge: bool,
    pub merge_detach: bool,
}

impl ChldFeatures {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            release_held: bits & 0x01 != 0,
            release_active_accept: bits & 0x02 != 0,
            release_specific: bits & 0x04 != 0,
            hold_active_accept: bits & 0x08 != 0,
            private_consult: bits & 0x10 != 0,
            merge: bits & 0x20 != 0,
            merge_detach: bits & 0x40 != 0,
        }
    }
}

// ---- Requests (HF client -> transport) ----

#[derive(Debug)]
pub struct BthfConnectReq {
    pub peer: BdAddr,
}

#[derive(Debug)]
pub struct BthfDisconnectReq {
    pub peer: BdAddr,
}

#[derive(Debug)]
pub struct BthfConnectAudioReq {
    pub peer: BdAddr,
}

#[derive(Debug)]
pub struct BthfDisconnectAudioReq {
    pub peer: BdAddr,
}

#[derive(Debug)]
pub struct BthfSendCommandReq {
    pub peer: BdAddr,
    pub command: AtCommand,
}

/// Ask the peer for a full current-call listing (AT+CLCC cycle).
/// The transport answers with one BthfCurrentCallInd per call, terminated
/// by a BthfCmdResultInd.
#[derive(Debug)]
pub struct BthfQueryCallsReq {
    pub peer: BdAddr,
}

// ---- Indications (transport -> HF client) ----

#[derive(Debug)]
pub struct BthfConnStateInd {
    pub peer: BdAddr,
    pub state: TransportConnState,
    /// Raw AG feature bits, valid for SlcConnected
    pub peer_features: u32,
    /// Raw CHLD capability bits, valid for SlcConnected
    pub chld_features: u32,
}

#[derive(Debug)]
pub struct BthfAudioStateInd {
    pub peer: BdAddr,
    pub state: AudioState,
    /// Valid when state is Connected
    pub codec: ScoCodec,
}

/// One entry of a current-call listing
#[derive(Debug)]
pub struct BthfCurrentCallInd {
    pub peer: BdAddr,
    pub index: CallId,
    pub state: CallState,
    pub number: String,
    pub multiparty: bool,
    pub outgoing: bool,
}

#[derive(Debug)]
pub struct BthfCmdResultInd {
    pub peer: BdAddr,
    pub result: CmdResult,
}

#[derive(Debug)]
pub struct BthfNetworkStateInd {
    pub peer: BdAddr,
    pub available: bool,
}

#[derive(Debug)]
pub struct BthfNetworkRoamingInd {
    pub peer: BdAddr,
    pub roaming: bool,
}

#[derive(Debug)]
pub struct BthfNetworkSignalInd {
    pub peer: BdAddr,
    /// 0..5
    pub signal: u8,
}

#[derive(Debug)]
pub struct BthfBatteryLevelInd {
    pub peer: BdAddr,
    /// 0..5
    pub level: u8,
}

#[derive(Debug)]
pub struct BthfOperatorNameInd {
    pub peer: BdAddr,
    pub name: String,
}

/// Change of call/callsetup/callheld CIEV indicator. The values themselves
/// are not trusted; any change triggers a call listing query.
#[derive(Debug)]
pub struct BthfCallIndicatorInd {
    pub peer: BdAddr,
}

/// Unsolicited RING from the peer
#[derive(Debug)]
pub struct BthfRingInd {
    pub peer: BdAddr,
}

#[derive(Debug)]
pub struct BthfInBandRingInd {
    pub peer: BdAddr,
    pub enabled: bool,
}

#[derive(Debug)]
pub struct BthfVrStateInd {
    pub peer: BdAddr,
    pub active: bool,
}

/// Peer-initiated gain change (+VGS / +VGM), HF domain 0..15
#[derive(Debug)]
pub struct BthfVolumeInd {
    pub peer: BdAddr,
    pub target: VolumeTarget,
    pub volume: u8,
}

/// +CNUM response
#[derive(Debug)]
pub struct BthfSubscriberInfoInd {
    pub peer: BdAddr,
    pub number: String,
}
