use serde::Deserialize;
use std::sync::{Arc, RwLock};

/// The transport backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TransportBackend {
    Undefined,
    /// No native stack attached, events injected externally. For testing
    None,
    /// Native HCI-based Bluetooth stack
    Hci,
}

/// Transport I/O configuration
#[derive(Debug, Clone)]
pub struct CfgTransport {
    pub backend: TransportBackend,
}

impl Default for CfgTransport {
    fn default() -> Self {
        Self {
            backend: TransportBackend::Undefined,
        }
    }
}

/// Audio sink and volume configuration
#[derive(Debug, Clone)]
pub struct CfgAudio {
    /// Lowest value of the native volume domain
    pub native_vol_min: u8,
    /// Highest value of the native volume domain
    pub native_vol_max: u8,
    /// Initial speaker gain, HF domain 0..15
    pub default_speaker_vol: u8,
    /// Initial microphone gain, HF domain 0..15
    pub default_mic_vol: u8,
    /// Whether SCO audio may be routed at all. Settable per session at runtime
    pub route_allowed: bool,
}

impl Default for CfgAudio {
    fn default() -> Self {
        Self {
            native_vol_min: 0,
            native_vol_max: 10,
            default_speaker_vol: 7,
            default_mic_vol: 7,
            route_allowed: true,
        }
    }
}

/// Call handling timeouts and polling intervals
#[derive(Debug, Clone)]
pub struct CfgCallPolicy {
    /// How long a session may sit in Connecting before it is torn down
    pub connecting_timeout_ms: u64,
    /// How long an unconfirmed outgoing call may linger before recovery
    pub outgoing_confirm_timeout_ms: u64,
    /// Call listing query interval while calls exist
    pub query_interval_ms: u64,
    /// Shortened interval while a call is incoming/waiting
    pub query_interval_ringing_ms: u64,
    /// Keep polling at the short interval during established calls
    pub poll_during_call: bool,
}

impl Default for CfgCallPolicy {
    fn default() -> Self {
        Self {
            connecting_timeout_ms: 10_000,
            outgoing_confirm_timeout_ms: 10_000,
            query_interval_ms: 2_000,
            query_interval_ringing_ms: 500,
            poll_during_call: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StackConfig {
    pub debug_log: Option<String>,

    pub transport: CfgTransport,
    pub audio: CfgAudio,
    pub call_policy: CfgCallPolicy,
}

impl StackConfig {
    pub fn new() -> Self {
        StackConfig {
            debug_log: None,
            transport: CfgTransport::default(),
            audio: CfgAudio::default(),
            call_policy: CfgCallPolicy::default(),
        }
    }

    /// Validate that all required configuration fields are properly set.
    pub fn validate(&self) -> Result<(), &str> {
        match self.transport.backend {
            TransportBackend::None => {} // For testing
            TransportBackend::Hci => {}
            TransportBackend::Undefined => {
                return Err("transport backend must be defined");
            }
        };

        if self.audio.native_vol_max <= self.audio.native_vol_min {
            return Err("audio native volume range must be non-empty");
        }
        if self.audio.default_speaker_vol > 15 || self.audio.default_mic_vol > 15 {
            return Err("default volumes must be within the HF domain 0..15");
        }

        if self.call_policy.connecting_timeout_ms == 0
            || self.call_policy.outgoing_confirm_timeout_ms == 0
        {
            return Err("call policy timeouts must be nonzero");
        }
        if self.call_policy.query_interval_ms == 0
            || self.call_policy.query_interval_ringing_ms == 0
        {
            return Err("call query intervals must be nonzero");
        }

        Ok(())
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable, stack-editable state (mutex-protected).
#[derive(Debug, Clone)]
pub struct StackState {
    /// Process-wide "SCO audio is routed" flag. Edge-triggered: the audio
    /// coordinator only touches the platform route on actual transitions.
    pub audio_routed: bool,
}

impl Default for StackState {
    fn default() -> Self {
        Self {
            audio_routed: false,
        }
    }
}

/// Global shared configuration: immutable config + mutable state.
#[derive(Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<StackConfig>,
    /// Mutable state guarded with RwLock (write by the stack, read by others).
    state: Arc<RwLock<StackState>>,
}

impl SharedConfig {
    pub fn from_config(cfg: StackConfig) -> Self {
        Self::from_parts(cfg, StackState::default())
    }

    pub fn from_parts(cfg: StackConfig, state: StackState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid stack configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<StackConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, StackState> {
        self.state.read().expect("StackState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, StackState> {
        self.state.write().expect("StackState RwLock blocked")
    }
}
