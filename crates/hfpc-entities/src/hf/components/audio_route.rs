use hfpc_config::SharedConfig;
use hfpc_core::ScoCodec;

/// HF protocol volume domain (AT+VGS / AT+VGM)
pub const HF_VOLUME_MIN: u8 = 0;
pub const HF_VOLUME_MAX: u8 = 15;

/// Linear rescale between two integer volume domains.
/// Endpoints map exactly; out-of-range input is clamped first.
fn rescale(v: u8, in_min: u8, in_max: u8, out_min: u8, out_max: u8) -> u8 {
    let v = v.clamp(in_min, in_max);
    let range_in = (in_max - in_min) as u32;
    let range_out = (out_max - out_min) as u32;
    out_min + ((range_out * (v - in_min) as u32) / range_in) as u8
}

/// HF domain (0..15) to the configured native domain
pub fn hf_to_native_vol(v: u8, config: &SharedConfig) -> u8 {
    let audio = &config.config().audio;
    rescale(
        v,
        HF_VOLUME_MIN,
        HF_VOLUME_MAX,
        audio.native_vol_min,
        audio.native_vol_max,
    )
}

/// Native domain to the HF domain (0..15)
pub fn native_to_hf_vol(v: u8, config: &SharedConfig) -> u8 {
    let audio = &config.config().audio;
    rescale(
        v,
        audio.native_vol_min,
        audio.native_vol_max,
        HF_VOLUME_MIN,
        HF_VOLUME_MAX,
    )
}

/// Flip the process-wide routing flag on. Returns true only on an actual
/// 0->1 transition; only then may the platform route be touched.
pub fn claim_route(config: &SharedConfig) -> bool {
    let mut state = config.state_write();
    if state.audio_routed {
        false
    } else {
        state.audio_routed = true;
        true
    }
}

/// Flip the process-wide routing flag off, unconditionally reflecting the
/// last caller. Returns true only on an actual 1->0 transition.
pub fn release_route(config: &SharedConfig) -> bool {
    let mut state = config.state_write();
    let was_routed = state.audio_routed;
    state.audio_routed = false;
    was_routed
}

/// Per-session audio leg state: negotiated codec and last known gains
pub struct AudioRoute {
    codec: ScoCodec,
    /// Speaker gain, HF domain 0..15
    pub speaker_vol: u8,
    /// Microphone gain, HF domain 0..15
    pub mic_vol: u8,
}

impl AudioRoute {
    pub fn new(config: &SharedConfig) -> Self {
        let audio = &config.config().audio;
        Self {
            codec: ScoCodec::Cvsd,
            speaker_vol: audio.default_speaker_vol,
            mic_vol: audio.default_mic_vol,
        }
    }

    pub fn set_codec(&mut self, codec: ScoCodec) {
        self.codec = codec;
    }

    pub fn codec(&self) -> ScoCodec {
        self.codec
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.codec.sample_rate_hz()
    }

    pub fn wideband(&self) -> bool {
        self.codec.wideband()
    }
}
