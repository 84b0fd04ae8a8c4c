mod common;

use common::{default_test_config, ComponentTest};
use hfpc_core::hfp_entities::HfpEntity;
use hfpc_core::{debug, AudioState, BdAddr, HfState, ScoCodec, VolumeTarget};
use hfpc_saps::bthf::{
    BthfAudioStateInd, BthfCmdResultInd, BthfConnStateInd, BthfVolumeInd, CmdResult,
    TransportConnState,
};
use hfpc_saps::sapmsg::{HfpMsg, HfpMsgInner};
use hfpc_saps::tnhf::HfAction;

const PEER: BdAddr = BdAddr::new([0x00, 0x1B, 0xDC, 0xF2, 0x1A, 0x0B]);

const AG_FEATURES: u32 = 0x01 | 0x02 | 0x08 | 0x40;
const CHLD_FEATURES: u32 = 0x7F;

fn setup() -> ComponentTest {
    debug::setup_logging_verbose();
    let config = default_test_config();
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![
        HfpEntity::Transport,
        HfpEntity::Telephony,
        HfpEntity::Broadcast,
        HfpEntity::Audio,
    ]);
    test
}

fn establish_slc(test: &mut ComponentTest) {
    test.submit_action(PEER, HfAction::Connect);
    test.run_stack(Some(1));
    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::SlcConnected,
        peer_features: AG_FEATURES,
        chld_features: CHLD_FEATURES,
    }));
    test.run_stack(Some(1));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connected);

    // Flush the on-entry command burst
    for _ in 0..5 {
        test.submit_ind(HfpMsgInner::BthfCmdResultInd(BthfCmdResultInd {
            peer: PEER,
            result: CmdResult::Ok,
        }));
    }
    test.run_stack(Some(1));
    test.dump_sinks();
}

fn submit_audio_state(test: &mut ComponentTest, state: AudioState, codec: ScoCodec) {
    test.submit_ind(HfpMsgInner::BthfAudioStateInd(BthfAudioStateInd {
        peer: PEER,
        state,
        codec,
    }));
}

fn route_requests(msgs: &[HfpMsg]) -> Vec<(bool, u32)> {
    msgs.iter()
        .filter_map(|m| match &m.msg {
            HfpMsgInner::AudioRouteReq(req) => Some((req.enable, req.sample_rate_hz)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_audio_up_and_down_wideband() {
    let mut test = setup();
    establish_slc(&mut test);

    test.submit_action(PEER, HfAction::ConnectAudio);
    test.run_stack(Some(1));
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfConnectAudioReq(_))));

    submit_audio_state(&mut test, AudioState::Connecting, ScoCodec::Cvsd);
    test.run_stack(Some(1));
    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfAudioStateInd(ind) if ind.state == AudioState::Connecting
    )));

    // SCO up with mSBC: sink volume, focus, then the platform route
    submit_audio_state(&mut test, AudioState::Connected, ScoCodec::Msbc);
    test.run_stack(Some(1));

    let audio = test.dump_sink(HfpEntity::Audio);
    // Default speaker gain 7 on 0..15 maps to 4 on the native 0..10
    assert!(matches!(
        audio[0].msg,
        HfpMsgInner::AudioVolumeReq(ref req) if req.volume == 4
    ));
    assert!(matches!(
        audio[1].msg,
        HfpMsgInner::AudioFocusReq(ref req) if req.acquire
    ));
    assert_eq!(route_requests(&audio), vec![(true, 16000)]);
    assert!(test.get_shared_config().state_read().audio_routed);

    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfAudioStateInd(ind)
            if ind.state == AudioState::Connected && ind.wideband
    )));
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfConnStateInd(ind) if ind.state == HfState::AudioOn
    )));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::AudioOn);
    assert_eq!(test.hf_client().audio_state(PEER), AudioState::Connected);

    // SCO down: unroute, release focus, back to Connected
    submit_audio_state(&mut test, AudioState::Disconnected, ScoCodec::Msbc);
    test.run_stack(Some(1));

    let audio = test.dump_sink(HfpEntity::Audio);
    assert_eq!(route_requests(&audio), vec![(false, 16000)]);
    assert!(audio.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::AudioFocusReq(req) if !req.acquire
    )));
    assert!(!test.get_shared_config().state_read().audio_routed);

    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfAudioStateInd(ind)
            if ind.state == AudioState::Disconnected && !ind.wideband
    )));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connected);
}

#[test]
fn test_audio_refused_when_route_disallowed() {
    let mut test = setup();
    establish_slc(&mut test);

    test.submit_action(PEER, HfAction::SetAudioRouteAllowed(false));
    test.run_stack(Some(1));

    // Local audio connect is refused outright
    test.submit_action(PEER, HfAction::ConnectAudio);
    test.run_stack(Some(1));
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(!transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfConnectAudioReq(_))));

    // A peer-initiated SCO is torn down immediately
    submit_audio_state(&mut test, AudioState::Connected, ScoCodec::Cvsd);
    test.run_stack(Some(1));

    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectAudioReq(_))));
    let audio = test.dump_sink(HfpEntity::Audio);
    assert!(audio.is_empty());
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connected);
    assert!(!test.get_shared_config().state_read().audio_routed);
}

#[test]
fn test_route_flag_already_claimed() {
    let mut test = setup();
    establish_slc(&mut test);

    // Another session already holds the platform route
    test.get_shared_config().state_write().audio_routed = true;

    submit_audio_state(&mut test, AudioState::Connected, ScoCodec::Cvsd);
    test.run_stack(Some(1));

    // Volume and focus as usual, but no route request
    let audio = test.dump_sink(HfpEntity::Audio);
    assert!(audio
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::AudioVolumeReq(_))));
    assert!(audio
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::AudioFocusReq(_))));
    assert!(route_requests(&audio).is_empty());
    assert_eq!(test.hf_client().connection_state(PEER), HfState::AudioOn);

    // Teardown reflects the last caller: the flag drops and the route
    // disable goes out
    submit_audio_state(&mut test, AudioState::Disconnected, ScoCodec::Cvsd);
    test.run_stack(Some(1));
    let audio = test.dump_sink(HfpEntity::Audio);
    assert_eq!(route_requests(&audio), vec![(false, 8000)]);
    assert!(!test.get_shared_config().state_read().audio_routed);
}

#[test]
fn test_disconnect_waits_for_audio_teardown() {
    let mut test = setup();
    establish_slc(&mut test);

    submit_audio_state(&mut test, AudioState::Connected, ScoCodec::Cvsd);
    test.run_stack(Some(1));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::AudioOn);
    test.dump_sinks();

    // Disconnect while audio is up: only the audio leg is dropped now
    test.submit_action(PEER, HfAction::Disconnect);
    test.run_stack(Some(1));
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectAudioReq(_))));
    assert!(!transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectReq(_))));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::AudioOn);

    // Audio gone: the held-back disconnect goes out
    submit_audio_state(&mut test, AudioState::Disconnected, ScoCodec::Cvsd);
    test.run_stack(Some(1));
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectReq(_))));

    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::Disconnected,
        peer_features: 0,
        chld_features: 0,
    }));
    test.run_stack(Some(1));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Disconnected);
}

#[test]
fn test_peer_volume_forwarded_to_sink() {
    let mut test = setup();
    establish_slc(&mut test);

    // +VGS 15 maps to the native maximum
    test.submit_ind(HfpMsgInner::BthfVolumeInd(BthfVolumeInd {
        peer: PEER,
        target: VolumeTarget::Speaker,
        volume: 15,
    }));
    test.run_stack(Some(1));
    let audio = test.dump_sink(HfpEntity::Audio);
    assert_eq!(audio.len(), 1);
    assert!(matches!(
        audio[0].msg,
        HfpMsgInner::AudioVolumeReq(ref req) if req.volume == 10
    ));

    // Microphone gain is tracked but has no sink counterpart
    test.submit_ind(HfpMsgInner::BthfVolumeInd(BthfVolumeInd {
        peer: PEER,
        target: VolumeTarget::Microphone,
        volume: 3,
    }));
    test.run_stack(Some(1));
    let audio = test.dump_sink(HfpEntity::Audio);
    assert!(audio.is_empty());
}
