use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::stack_config::{
    CfgAudio, CfgCallPolicy, CfgTransport, SharedConfig, StackConfig, StackState, TransportBackend,
};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.1";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref tr) = root.transport {
        if !tr.extra.is_empty() {
            return Err(format!("Unrecognized fields: transport::{:?}", sorted_keys(&tr.extra)).into());
        }
    }
    if let Some(ref au) = root.audio {
        if !au.extra.is_empty() {
            return Err(format!("Unrecognized fields: audio::{:?}", sorted_keys(&au.extra)).into());
        }
    }
    if let Some(ref cp) = root.call_policy {
        if !cp.extra.is_empty() {
            return Err(
                format!("Unrecognized fields: call_policy::{:?}", sorted_keys(&cp.extra)).into(),
            );
        }
    }

    // Build config from required and optional values
    let mut cfg = StackConfig {
        debug_log: root.debug_log,
        transport: CfgTransport::default(),
        audio: CfgAudio::default(),
        call_policy: CfgCallPolicy::default(),
    };

    if let Some(tr) = root.transport {
        apply_transport_patch(&mut cfg.transport, tr);
    }
    if let Some(au) = root.audio {
        apply_audio_patch(&mut cfg.audio, au);
    }
    if let Some(cp) = root.call_policy {
        apply_call_policy_patch(&mut cfg.call_policy, cp);
    }

    Ok(SharedConfig::from_parts(cfg, StackState::default()))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_transport_patch(dst: &mut CfgTransport, src: TransportDto) {
    dst.backend = src.backend;
}

fn apply_audio_patch(dst: &mut CfgAudio, src: AudioDto) {
    if let Some(v) = src.native_vol_min {
        dst.native_vol_min = v;
    }
    if let Some(v) = src.native_vol_max {
        dst.native_vol_max = v;
    }
    if let Some(v) = src.default_speaker_vol {
        dst.default_speaker_vol = v;
    }
    if let Some(v) = src.default_mic_vol {
        dst.default_mic_vol = v;
    }
    if let Some(v) = src.route_allowed {
        dst.route_allowed = v;
    }
}

fn apply_call_policy_patch(dst: &mut CfgCallPolicy, src: CallPolicyDto) {
    if let Some(v) = src.connecting_timeout_ms {
        dst.connecting_timeout_ms = v;
    }
    if let Some(v) = src.outgoing_confirm_timeout_ms {
        dst.outgoing_confirm_timeout_ms = v;
    }
    if let Some(v) = src.query_interval_ms {
        dst.query_interval_ms = v;
    }
    if let Some(v) = src.query_interval_ringing_ms {
        dst.query_interval_ringing_ms = v;
    }
    if let Some(v) = src.poll_during_call {
        dst.poll_during_call = v;
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    transport: Option<TransportDto>,

    #[serde(default)]
    audio: Option<AudioDto>,

    #[serde(default)]
    call_policy: Option<CallPolicyDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct TransportDto {
    pub backend: TransportBackend,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct AudioDto {
    pub native_vol_min: Option<u8>,
    pub native_vol_max: Option<u8>,
    pub default_speaker_vol: Option<u8>,
    pub default_mic_vol: Option<u8>,
    pub route_allowed: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct CallPolicyDto {
    pub connecting_timeout_ms: Option<u64>,
    pub outgoing_confirm_timeout_ms: Option<u64>,
    pub query_interval_ms: Option<u64>,
    pub query_interval_ringing_ms: Option<u64>,
    pub poll_during_call: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let cfg = from_toml_str(
            r#"
            config_version = "0.1"

            [transport]
            backend = "None"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.config().transport.backend, TransportBackend::None);
        assert_eq!(cfg.config().call_policy.connecting_timeout_ms, 10_000);
        assert!(!cfg.state_read().audio_routed);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let res = from_toml_str(
            r#"
            config_version = "0.1"
            bogus = 1

            [transport]
            backend = "None"
            "#,
        );
        assert!(res.is_err());

        let res = from_toml_str(
            r#"
            config_version = "0.1"

            [transport]
            backend = "None"

            [audio]
            loudness = 11
            "#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let res = from_toml_str(
            r#"
            config_version = "9.9"

            [transport]
            backend = "None"
            "#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_sections_applied() {
        let cfg = from_toml_str(
            r#"
            config_version = "0.1"

            [transport]
            backend = "None"

            [audio]
            native_vol_max = 100
            default_speaker_vol = 9

            [call_policy]
            connecting_timeout_ms = 5000
            poll_during_call = true
            "#,
        )
        .unwrap();
        let c = cfg.config();
        assert_eq!(c.audio.native_vol_max, 100);
        assert_eq!(c.audio.default_speaker_vol, 9);
        assert_eq!(c.call_policy.connecting_timeout_ms, 5000);
        assert!(c.call_policy.poll_during_call);
        // Untouched fields keep defaults
        assert_eq!(c.call_policy.query_interval_ms, 2000);
    }
}
