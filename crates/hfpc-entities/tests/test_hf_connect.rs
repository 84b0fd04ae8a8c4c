mod common;

use common::{default_test_config, ComponentTest};
use hfpc_core::hfp_entities::HfpEntity;
use hfpc_core::{debug, BdAddr, HfState};
use hfpc_saps::bthf::{AtCommand, BthfBatteryLevelInd, BthfConnStateInd, TransportConnState};
use hfpc_saps::sapmsg::HfpMsgInner;
use hfpc_saps::tnhf::{HfAction, IndicatorUpdate};

const PEER: BdAddr = BdAddr::new([0x00, 0x1B, 0xDC, 0xF2, 0x1A, 0x0B]);

/// AG feature bits: three-way, EC/NR, in-band ring, enhanced call status
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

#[test]
fn test_connect_reaches_slc() {
    let mut test = setup();

    // Local connect request
    test.submit_action(PEER, HfAction::Connect);
    test.run_stack(Some(1));

    let transport = test.dump_sink(HfpEntity::Transport);
    assert_eq!(transport.len(), 1);
    assert!(matches!(transport[0].msg, HfpMsgInner::BthfConnectReq(_)));

    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert_eq!(broadcast.len(), 1);
    let HfpMsgInner::TnhfConnStateInd(ref ind) = broadcast[0].msg else {
        panic!("expected connection state notification");
    };
    assert_eq!(ind.prev, HfState::Disconnected);
    assert_eq!(ind.state, HfState::Connecting);
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connecting);

    // SLC comes up with the negotiated features
    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::SlcConnected,
        peer_features: AG_FEATURES,
        chld_features: CHLD_FEATURES,
    }));
    test.run_stack(Some(1));

    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connected);
    let features = test.hf_client().features(PEER).expect("features cached");
    assert!(features.0.enhanced_call_status);
    assert!(features.0.three_way_calling);
    assert!(features.1.merge);

    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    let HfpMsgInner::TnhfConnStateInd(ref ind) = broadcast[0].msg else {
        panic!("expected connection state notification");
    };
    assert_eq!(ind.state, HfState::Connected);
    assert!(ind.features.is_some());

    // On-entry command burst, in order: NREC off, volume sync, subscriber
    // number, vendor probe
    let transport = test.dump_sink(HfpEntity::Transport);
    let commands: Vec<AtCommand> = transport
        .iter()
        .filter_map(|m| match &m.msg {
            HfpMsgInner::BthfSendCommandReq(req) => Some(req.command.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        commands,
        vec![
            AtCommand::NrecDisable,
            AtCommand::SpeakerVolume(7),
            AtCommand::MicVolume(7),
            AtCommand::SubscriberInfo,
            AtCommand::VendorProbe,
        ]
    );

    // In-band ring capability and battery level are rebroadcast
    let updates: Vec<&IndicatorUpdate> = broadcast
        .iter()
        .filter_map(|m| match &m.msg {
            HfpMsgInner::TnhfIndicatorInd(ind) => Some(&ind.update),
            _ => None,
        })
        .collect();
    assert!(updates.contains(&&IndicatorUpdate::InBandRing(true)));
    assert!(updates.contains(&&IndicatorUpdate::Battery(0)));
}

#[test]
fn test_missing_enhanced_call_status_is_fatal() {
    let mut test = setup();

    test.submit_action(PEER, HfAction::Connect);
    test.run_stack(Some(1));
    test.dump_sinks();

    // Peer without enhanced call status (bit absent)
    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::SlcConnected,
        peer_features: 0x01 | 0x02,
        chld_features: CHLD_FEATURES,
    }));
    test.run_stack(Some(1));

    // Transport told to disconnect, session fell back to Disconnected
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectReq(_))));

    // A Connected notification must never have been emitted
    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    for msg in &broadcast {
        if let HfpMsgInner::TnhfConnStateInd(ind) = &msg.msg {
            assert_ne!(ind.state, HfState::Connected);
        }
    }
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfConnStateInd(ind) if ind.state == HfState::Disconnected
    )));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Disconnected);
}

#[test]
fn test_connecting_timeout() {
    let mut test = setup();

    test.submit_action(PEER, HfAction::Connect);
    test.run_stack(Some(1));
    test.dump_sinks();

    // Nothing happens before the deadline
    test.router.advance_millis(9_000);
    test.run_stack(Some(1));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connecting);
    test.dump_sinks();

    // Past the deadline the session is abandoned
    test.router.advance_millis(2_000);
    test.run_stack(Some(1));

    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectReq(_))));
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Disconnected);
}

#[test]
fn test_indicators_deferred_while_connecting() {
    let mut test = setup();

    test.submit_action(PEER, HfAction::Connect);
    test.run_stack(Some(1));
    test.dump_sinks();

    // Battery report arrives mid-handshake: held back
    test.submit_ind(HfpMsgInner::BthfBatteryLevelInd(BthfBatteryLevelInd {
        peer: PEER,
        level: 3,
    }));
    test.run_stack(Some(1));
    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert!(broadcast.is_empty());

    // Once the SLC resolves, the deferred report is replayed
    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::SlcConnected,
        peer_features: AG_FEATURES,
        chld_features: CHLD_FEATURES,
    }));
    test.run_stack(Some(1));

    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfIndicatorInd(ind) if ind.update == IndicatorUpdate::Battery(3)
    )));
    assert_eq!(test.hf_client().indicators(PEER).unwrap().battery, 3);
}

#[test]
fn test_actions_deferred_while_connecting() {
    let mut test = setup();

    test.submit_action(PEER, HfAction::Connect);
    test.run_stack(Some(1));
    test.dump_sinks();

    // A disconnect mid-handshake is held back, nothing reaches the transport
    test.submit_action(PEER, HfAction::Disconnect);
    test.run_stack(Some(1));
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport.is_empty());
    assert_eq!(test.hf_client().connection_state(PEER), HfState::Connecting);

    // Once the SLC resolves, the deferred disconnect replays against the
    // Connected state
    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::SlcConnected,
        peer_features: AG_FEATURES,
        chld_features: CHLD_FEATURES,
    }));
    test.run_stack(Some(1));

    let broadcast = test.dump_sink(HfpEntity::Broadcast);
    assert!(broadcast.iter().any(|m| matches!(
        &m.msg,
        HfpMsgInner::TnhfConnStateInd(ind) if ind.state == HfState::Connected
    )));
    let transport = test.dump_sink(HfpEntity::Transport);
    assert!(transport
        .iter()
        .any(|m| matches!(m.msg, HfpMsgInner::BthfDisconnectReq(_))));
}

#[test]
fn test_disconnect_is_idempotent() {
    let mut test = setup();

    // Disconnect for a device we never connected: rejected, no notifications
    test.submit_action(PEER, HfAction::Disconnect);
    test.run_stack(Some(1));
    assert!(test.dump_sinks().is_empty());

    // Repeated transport disconnect indications produce nothing either
    test.submit_ind(HfpMsgInner::BthfConnStateInd(BthfConnStateInd {
        peer: PEER,
        state: TransportConnState::Disconnected,
        peer_features: 0,
        chld_features: 0,
    }));
    test.run_stack(Some(1));
    assert!(test.dump_sinks().is_empty());
}

#[test]
fn test_events_for_unknown_device_ignored() {
    let mut test = setup();

    let other = BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    test.submit_ind(HfpMsgInner::BthfBatteryLevelInd(BthfBatteryLevelInd {
        peer: other,
        level: 5,
    }));
    test.run_stack(Some(1));
    assert!(test.dump_sinks().is_empty());
    assert_eq!(test.hf_client().connection_state(other), HfState::Disconnected);
}
