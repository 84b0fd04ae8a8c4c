use std::collections::HashMap;
use std::mem;

use hfpc_config::SharedConfig;
use hfpc_core::{
    hfp_entities::HfpEntity, AudioState, BdAddr, Call, CallId, CallState, HfState, MonoTime, Sap,
    ScoCodec, VolumeTarget,
};
use hfpc_saps::audio::{AudioFocusReq, AudioRouteReq, AudioVolumeReq};
use hfpc_saps::bthf::*;
use hfpc_saps::tnhf::*;
use hfpc_saps::{HfpMsg, HfpMsgInner};

use crate::hf::components::audio_route::{
    claim_route, hf_to_native_vol, release_route, AudioRoute,
};
use crate::hf::components::call_table::CallTable;
use crate::hf::components::command_queue::{CommandQueue, PendingAction};
use crate::hf::components::indicators::AmbientIndicators;
use crate::MessageQueue;

/// Per-peer HF session: the connection state machine and everything owned
/// by it (call table, command queue, indicator cache, audio leg).
///
/// Created on entering Connecting, destroyed by the HF client once it
/// returns to Disconnected.
pub struct HfSession {
    config: SharedConfig,
    peer: BdAddr,
    now: MonoTime,

    state: HfState,
    audio_state: AudioState,

    calls: CallTable,
    /// Call listing being accumulated during the current query cycle
    listing: HashMap<CallId, Call>,
    cmd_queue: CommandQueue,
    indicators: AmbientIndicators,
    /// Negotiated at SLC time, immutable for the lifetime of the session
    features: Option<(PeerFeatures, ChldFeatures)>,
    audio: AudioRoute,

    audio_route_allowed: bool,
    poll_during_call: bool,

    /// Messages held back until the current state resolves, replayed in
    /// original order on the next state transition
    deferred: Vec<HfpMsg>,

    connecting_since: Option<MonoTime>,
    next_query_at: Option<MonoTime>,
    query_outstanding: bool,
}

impl HfSession {
    pub fn new(config: SharedConfig, peer: BdAddr, now: MonoTime) -> Self {
        let audio = AudioRoute::new(&config);
        let audio_route_allowed = config.config().audio.route_allowed;
        let poll_during_call = config.config().call_policy.poll_during_call;
        Self {
            config,
            peer,
            now,
            state: HfState::Disconnected,
            audio_state: AudioState::Disconnected,
            calls: CallTable::new(),
            listing: HashMap::new(),
            cmd_queue: CommandQueue::new(),
            indicators: AmbientIndicators::default(),
            features: None,
            audio,
            audio_route_allowed,
            poll_during_call,
            deferred: Vec::new(),
            connecting_since: None,
            next_query_at: None,
            query_outstanding: false,
        }
    }

    // ─── Read-only query surface ──────────────────────────────────

    pub fn state(&self) -> HfState {
        self.state
    }

    pub fn audio_state(&self) -> AudioState {
        self.audio_state
    }

    pub fn current_calls(&self) -> Vec<Call> {
        self.calls.snapshot()
    }

    pub fn features(&self) -> Option<(PeerFeatures, ChldFeatures)> {
        self.features
    }

    pub fn indicators(&self) -> AmbientIndicators {
        self.indicators.clone()
    }

    // ─── Message entry points ─────────────────────────────────────

    pub fn rx_prim(&mut self, queue: &mut MessageQueue, message: HfpMsg) {
        // Indicator events arriving mid-handshake are replayed once
        // Connecting resolves
        if self.state == HfState::Connecting && Self::deferrable_while_connecting(&message.msg) {
            tracing::debug!(
                "{}: deferring {:?} while connecting",
                self.peer,
                message.msg
            );
            self.deferred.push(message);
            return;
        }

        match message.msg {
            HfpMsgInner::BthfConnStateInd(ind) => self.rx_conn_state(queue, ind),
            HfpMsgInner::BthfAudioStateInd(ind) => self.rx_audio_state(queue, ind),
            HfpMsgInner::BthfCurrentCallInd(ind) => self.rx_current_call(ind),
            HfpMsgInner::BthfCmdResultInd(ind) => self.rx_cmd_result(queue, ind),
            HfpMsgInner::BthfNetworkStateInd(ind) => self.rx_network_state(queue, ind),
            HfpMsgInner::BthfNetworkRoamingInd(ind) => self.rx_roaming(queue, ind),
            HfpMsgInner::BthfNetworkSignalInd(ind) => self.rx_signal(queue, ind),
            HfpMsgInner::BthfBatteryLevelInd(ind) => self.rx_battery(queue, ind),
            HfpMsgInner::BthfOperatorNameInd(ind) => self.rx_operator(queue, ind),
            HfpMsgInner::BthfCallIndicatorInd(ind) => self.rx_call_indicator(queue, ind),
            HfpMsgInner::BthfRingInd(ind) => self.rx_ring(queue, ind),
            HfpMsgInner::BthfInBandRingInd(ind) => self.rx_in_band_ring(queue, ind),
            HfpMsgInner::BthfVrStateInd(ind) => self.rx_vr_state(queue, ind),
            HfpMsgInner::BthfVolumeInd(ind) => self.rx_volume(queue, ind),
            HfpMsgInner::BthfSubscriberInfoInd(ind) => self.rx_subscriber(queue, ind),
            HfpMsgInner::TnhfActionReq(req) => {
                let accepted = self.handle_action(queue, req.action.clone());
                if !accepted {
                    tracing::debug!("{}: action {:?} rejected in {:?}", self.peer, req.action, self.state);
                }
            }
            other => {
                tracing::warn!("{}: unexpected message {:?}", self.peer, other);
            }
        }
    }

    fn deferrable_while_connecting(msg: &HfpMsgInner) -> bool {
        matches!(
            msg,
            HfpMsgInner::BthfNetworkStateInd(_)
                | HfpMsgInner::BthfNetworkRoamingInd(_)
                | HfpMsgInner::BthfNetworkSignalInd(_)
                | HfpMsgInner::BthfBatteryLevelInd(_)
                | HfpMsgInner::BthfCallIndicatorInd(_)
                | HfpMsgInner::BthfRingInd(_)
        )
    }

    /// Single entry for the action surface. Returns whether the action can
    /// be attempted in the current state; completion is reported through
    /// notifications.
    pub fn handle_action(&mut self, queue: &mut MessageQueue, action: HfAction) -> bool {
        // Connection-shaped actions wait out the handshake
        if self.state == HfState::Connecting && Self::connection_action(&action) {
            tracing::debug!("{}: deferring {:?} while connecting", self.peer, action);
            self.defer_action(action);
            return true;
        }

        match action {
            HfAction::Connect => self.request_connect(queue),
            HfAction::Disconnect => self.request_disconnect(queue),
            HfAction::ConnectAudio => self.request_connect_audio(queue),
            HfAction::DisconnectAudio => self.request_disconnect_audio(queue),
            HfAction::Dial(number) => self.request_dial(queue, number),
            HfAction::AcceptCall => self.request_accept(queue),
            HfAction::RejectCall => self.request_reject(queue),
            HfAction::TerminateCall(id) => self.request_terminate(queue, id),
            HfAction::HoldCall => self.request_hold(queue),
            HfAction::PrivateMode(id) => self.request_private_mode(queue, id),
            HfAction::ExplicitTransfer => self.request_explicit_transfer(queue),
            HfAction::SendDtmf(c) => self.request_dtmf(queue, c),
            HfAction::VoiceRecognition(enable) => self.request_voice_recognition(queue, enable),
            HfAction::SetAudioRouteAllowed(allowed) => {
                self.set_audio_route_allowed(queue, allowed);
                true
            }
            HfAction::SetAudioPolicy(policy) => {
                self.poll_during_call = policy.poll_during_call;
                true
            }
        }
    }

    fn connection_action(action: &HfAction) -> bool {
        matches!(
            action,
            HfAction::Connect
                | HfAction::Disconnect
                | HfAction::ConnectAudio
                | HfAction::DisconnectAudio
        )
    }

    fn defer_action(&mut self, action: HfAction) {
        self.deferred.push(HfpMsg::new(
            Sap::TnhfSap,
            HfpEntity::Control,
            HfpEntity::Hf,
            self.now,
            HfpMsgInner::TnhfActionReq(TnhfActionReq {
                peer: self.peer,
                action,
            }),
        ));
    }

    // ─── Actions ──────────────────────────────────────────────────

    fn request_connect(&mut self, queue: &mut MessageQueue) -> bool {
        match self.state {
            HfState::Disconnected => {
                self.push_transport(
                    queue,
                    HfpMsgInner::BthfConnectReq(BthfConnectReq { peer: self.peer }),
                );
                self.enter_connecting(queue);
                true
            }
            // Already connected (or connecting, deferred above)
            _ => false,
        }
    }

    fn request_disconnect(&mut self, queue: &mut MessageQueue) -> bool {
        match self.state {
            // Idempotent no-op
            HfState::Disconnected => true,
            HfState::Connecting => unreachable!("deferred in handle_action"),
            HfState::Connected => {
                self.push_transport(
                    queue,
                    HfpMsgInner::BthfDisconnectReq(BthfDisconnectReq { peer: self.peer }),
                );
                true
            }
            HfState::AudioOn => {
                // Tear the audio leg down first; the disconnect replays
                // once audio is gone
                tracing::debug!("{}: disconnect while audio up, tearing down audio first", self.peer);
                self.push_transport(
                    queue,
                    HfpMsgInner::BthfDisconnectAudioReq(BthfDisconnectAudioReq { peer: self.peer }),
                );
                self.defer_action(HfAction::Disconnect);
                true
            }
        }
    }

    fn request_connect_audio(&mut self, queue: &mut MessageQueue) -> bool {
        if self.state != HfState::Connected {
            return false;
        }
        if !self.audio_route_allowed {
            tracing::warn!("{}: audio route not allowed, refusing audio connect", self.peer);
            return false;
        }
        self.push_transport(
            queue,
            HfpMsgInner::BthfConnectAudioReq(BthfConnectAudioReq { peer: self.peer }),
        );
        true
    }

    fn request_disconnect_audio(&mut self, queue: &mut MessageQueue) -> bool {
        if self.state != HfState::AudioOn {
            return false;
        }
        self.push_transport(
            queue,
            HfpMsgInner::BthfDisconnectAudioReq(BthfDisconnectAudioReq { peer: self.peer }),
        );
        true
    }

    fn request_dial(&mut self, queue: &mut MessageQueue, number: String) -> bool {
        if !self.is_slc_up() {
            return false;
        }
        let in_band = self.indicators.in_band_ring;
        let Some(call) = self.calls.insert_outgoing(number.clone(), self.now) else {
            return false;
        };
        let mut call = call.clone();
        call.in_band_ring = in_band;
        self.notify_call_changed(queue, &call);
        self.send_command(queue, AtCommand::Dial(number.clone()), PendingAction::Dial(number));
        true
    }

    fn request_accept(&mut self, queue: &mut MessageQueue) -> bool {
        if !self.is_slc_up() {
            return false;
        }
        if self.calls.any(|c| c.state == CallState::Incoming) {
            self.send_command(queue, AtCommand::Answer, PendingAction::Answer);
            return true;
        }
        if self.calls.any(|c| c.state == CallState::Waiting) && self.chld().hold_active_accept {
            self.send_command(
                queue,
                AtCommand::Chld(ChldOp::HoldActiveAcceptOther),
                PendingAction::Answer,
            );
            return true;
        }
        false
    }

    fn request_reject(&mut self, queue: &mut MessageQueue) -> bool {
        if !self.is_slc_up() {
            return false;
        }
        if self.calls.any(|c| c.state == CallState::Incoming) {
            self.send_command(queue, AtCommand::Terminate, PendingAction::Reject);
            return true;
        }
        if self.calls.any(|c| c.state == CallState::Waiting) && self.chld().release_held {
            self.send_command(
                queue,
                AtCommand::Chld(ChldOp::ReleaseHeld),
                PendingAction::Reject,
            );
            return true;
        }
        false
    }

    fn request_terminate(&mut self, queue: &mut MessageQueue, id: Option<CallId>) -> bool {
        if !self.is_slc_up() {
            return false;
        }
        match id {
            None => {
                if !self.calls.any(|c| {
                    c.state == CallState::Active || c.state.is_outgoing_pending()
                }) {
                    return false;
                }
                self.send_command(queue, AtCommand::Terminate, PendingAction::Terminate);
                true
            }
            Some(id) => {
                let Some(call) = self.calls.get(id) else {
                    return false;
                };
                // Release a specific leg where the peer supports it,
                // otherwise fall back to plain hangup
                let cmd = if !call.is_sentinel()
                    && self.peer_features().enhanced_call_control
                    && self.chld().release_specific
                {
                    AtCommand::Chld(ChldOp::ReleaseSpecific(id))
                } else {
                    AtCommand::Terminate
                };
                self.send_command(queue, cmd, PendingAction::Terminate);
                true
            }
        }
    }

    fn request_hold(&mut self, queue: &mut MessageQueue) -> bool {
        if !self.is_slc_up() {
            return false;
        }
        let holdable = self.calls.any(|c| c.state == CallState::Active)
            || self.calls.any(|c| c.state == CallState::Held);
        if !holdable || !self.chld().hold_active_accept {
            return false;
        }
        self.send_command(
            queue,
            AtCommand::Chld(ChldOp::HoldActiveAcceptOther),
            PendingAction::Hold,
        );
        true
    }

    fn request_private_mode(&mut self, queue: &mut MessageQueue, id: CallId) -> bool {
        if !self.is_slc_up() || !self.chld().private_consult {
            return false;
        }
        let Some(call) = self.calls.get(id) else {
            return false;
        };
        if !call.multiparty {
            return false;
        }
        self.send_command(
            queue,
            AtCommand::Chld(ChldOp::PrivateConsult(id)),
            PendingAction::PrivateMode,
        );
        true
    }

    fn request_explicit_transfer(&mut self, queue: &mut MessageQueue) -> bool {
        if !self.is_slc_up() || !self.chld().merge_detach {
            return false;
        }
        if !self.calls.any(|c| c.state == CallState::Held) {
            return false;
        }
        self.send_command(
            queue,
            AtCommand::Chld(ChldOp::MergeDetach),
            PendingAction::ExplicitTransfer,
        );
        true
    }

    fn request_dtmf(&mut self, queue: &mut MessageQueue, c: char) -> bool {
        if !self.is_slc_up() || !self.calls.any(|c| c.state == CallState::Active) {
            return false;
        }
        if !c.is_ascii_digit() && !matches!(c, '*' | '#' | 'A'..='D') {
            tracing::warn!("{}: invalid DTMF character {:?}", self.peer, c);
            return false;
        }
        self.send_command(queue, AtCommand::Dtmf(c), PendingAction::Dtmf);
        true
    }

    fn request_voice_recognition(&mut self, queue: &mut MessageQueue, enable: bool) -> bool {
        if !self.is_slc_up() || !self.peer_features().voice_recognition {
            return false;
        }
        self.send_command(
            queue,
            AtCommand::VoiceRecognition(enable),
            PendingAction::VoiceRecognition,
        );
        true
    }

    fn set_audio_route_allowed(&mut self, queue: &mut MessageQueue, allowed: bool) {
        self.audio_route_allowed = allowed;
        if !allowed && self.state == HfState::AudioOn {
            tracing::info!("{}: audio route disallowed, dropping audio leg", self.peer);
            self.push_transport(
                queue,
                HfpMsgInner::BthfDisconnectAudioReq(BthfDisconnectAudioReq { peer: self.peer }),
            );
        }
    }

    // ─── Transport indications ────────────────────────────────────

    fn rx_conn_state(&mut self, queue: &mut MessageQueue, ind: BthfConnStateInd) {
        tracing::debug!("{}: <- {:?}", self.peer, ind);
        match ind.state {
            TransportConnState::Connecting | TransportConnState::Connected => {
                if self.state == HfState::Disconnected {
                    // Incoming connection accepted by the transport
                    self.enter_connecting(queue);
                } else {
                    tracing::debug!(
                        "{}: transport {:?} while {:?}, no transition",
                        self.peer,
                        ind.state,
                        self.state
                    );
                }
            }
            TransportConnState::SlcConnected => {
                if self.state != HfState::Connecting {
                    tracing::warn!("{}: SLC indication while {:?}, ignored", self.peer, self.state);
                    return;
                }
                let peer_features = PeerFeatures::from_bits(ind.peer_features);
                let chld_features = ChldFeatures::from_bits(ind.chld_features);
                if !peer_features.enhanced_call_status {
                    // Mandatory feature: without per-call status the call
                    // table cannot be kept truthful. Fatal to the session.
                    tracing::error!(
                        "{}: peer lacks enhanced call status, dropping session",
                        self.peer
                    );
                    self.push_transport(
                        queue,
                        HfpMsgInner::BthfDisconnectReq(BthfDisconnectReq { peer: self.peer }),
                    );
                    self.enter_disconnected(queue);
                    return;
                }
                self.enter_connected(queue, peer_features, chld_features);
            }
            TransportConnState::Disconnected => {
                self.enter_disconnected(queue);
            }
        }
    }

    fn rx_audio_state(&mut self, queue: &mut MessageQueue, ind: BthfAudioStateInd) {
        tracing::debug!("{}: <- {:?}", self.peer, ind);
        match ind.state {
            AudioState::Connecting => {
                if self.state == HfState::Connected {
                    self.set_audio_state(queue, AudioState::Connecting);
                } else {
                    tracing::warn!(
                        "{}: audio connecting while {:?}, ignored",
                        self.peer,
                        self.state
                    );
                }
            }
            AudioState::Connected => match self.state {
                HfState::Connected => {
                    if !self.audio_route_allowed {
                        tracing::warn!(
                            "{}: audio connected but routing disallowed, tearing down",
                            self.peer
                        );
                        self.set_audio_state(queue, AudioState::Disconnected);
                        self.push_transport(
                            queue,
                            HfpMsgInner::BthfDisconnectAudioReq(BthfDisconnectAudioReq {
                                peer: self.peer,
                            }),
                        );
                        return;
                    }
                    self.enter_audio_on(queue, ind.codec);
                }
                HfState::AudioOn => {
                    tracing::warn!("{}: duplicate audio connected indication", self.peer);
                }
                _ => {
                    tracing::warn!(
                        "{}: audio connected while {:?}, ignored",
                        self.peer,
                        self.state
                    );
                }
            },
            AudioState::Disconnected => {
                if self.state == HfState::AudioOn {
                    self.exit_audio_on(queue);
                } else {
                    // Audio setup failed before it was up
                    self.set_audio_state(queue, AudioState::Disconnected);
                }
            }
        }
    }

    fn rx_current_call(&mut self, ind: BthfCurrentCallInd) {
        if !self.is_slc_up() {
            tracing::warn!("{}: call listing entry while {:?}, ignored", self.peer, self.state);
            return;
        }
        let mut call = Call::new(ind.index, ind.state, ind.number, self.now);
        call.multiparty = ind.multiparty;
        call.outgoing = ind.outgoing;
        call.in_band_ring = self.indicators.in_band_ring;
        if self.listing.insert(ind.index, call).is_some() {
            tracing::debug!("{}: call {} listed twice in one cycle", self.peer, ind.index);
        }
    }

    fn rx_cmd_result(&mut self, queue: &mut MessageQueue, ind: BthfCmdResultInd) {
        let Some(action) = self.cmd_queue.pop() else {
            tracing::warn!(
                "{}: command result {:?} with no outstanding command",
                self.peer,
                ind.result
            );
            return;
        };
        tracing::debug!("{}: <- {:?} for {:?}", self.peer, ind.result, action);

        match action {
            PendingAction::QueryCalls => {
                self.query_outstanding = false;
                if ind.result.is_ok() {
                    self.reconcile_calls(queue);
                } else {
                    tracing::warn!("{}: call listing query failed: {:?}", self.peer, ind.result);
                    self.listing.clear();
                    self.rearm_query_timer();
                }
            }
            PendingAction::Dial(number) => {
                if ind.result.is_ok() {
                    // Confirm the speculative call as soon as possible
                    self.query_calls(queue);
                } else {
                    tracing::warn!(
                        "{}: dial {} rejected by peer: {:?}",
                        self.peer,
                        number,
                        ind.result
                    );
                    if let Some(call) = self.calls.remove_sentinel() {
                        self.notify_call_changed(queue, &call);
                    }
                }
            }
            other => {
                if !ind.result.is_ok() {
                    tracing::warn!("{}: {:?} failed: {:?}", self.peer, other, ind.result);
                }
            }
        }
    }

    fn rx_network_state(&mut self, queue: &mut MessageQueue, ind: BthfNetworkStateInd) {
        if self.indicators.set_network_available(ind.available) {
            self.notify_indicator(queue, IndicatorUpdate::NetworkAvailable(ind.available));
            if ind.available && self.is_slc_up() {
                // Operator name becomes meaningful once registered
                self.send_command(queue, AtCommand::OperatorName, PendingAction::OperatorName);
            }
        }
    }

    fn rx_roaming(&mut self, queue: &mut MessageQueue, ind: BthfNetworkRoamingInd) {
        if self.indicators.set_roaming(ind.roaming) {
            self.notify_indicator(queue, IndicatorUpdate::Roaming(ind.roaming));
        }
    }

    fn rx_signal(&mut self, queue: &mut MessageQueue, ind: BthfNetworkSignalInd) {
        if self.indicators.set_signal(ind.signal) {
            self.notify_indicator(queue, IndicatorUpdate::Signal(ind.signal));
        }
    }

    fn rx_battery(&mut self, queue: &mut MessageQueue, ind: BthfBatteryLevelInd) {
        if self.indicators.set_battery(ind.level) {
            self.notify_indicator(queue, IndicatorUpdate::Battery(ind.level));
        }
    }

    fn rx_operator(&mut self, queue: &mut MessageQueue, ind: BthfOperatorNameInd) {
        if self.indicators.set_operator_name(ind.name.clone()) {
            self.notify_indicator(queue, IndicatorUpdate::OperatorName(ind.name));
        }
    }

    fn rx_call_indicator(&mut self, queue: &mut MessageQueue, _ind: BthfCallIndicatorInd) {
        // The indicator values themselves are not trusted; any movement
        // triggers a fresh listing
        if self.is_slc_up() {
            self.query_calls(queue);
        }
    }

    fn rx_ring(&mut self, queue: &mut MessageQueue, _ind: BthfRingInd) {
        self.push_broadcast(
            queue,
            HfpMsgInner::TnhfRingInd(TnhfRingInd { peer: self.peer }),
        );
        if self.is_slc_up() {
            self.query_calls(queue);
        }
    }

    fn rx_in_band_ring(&mut self, queue: &mut MessageQueue, ind: BthfInBandRingInd) {
        if self.indicators.set_in_band_ring(ind.enabled) {
            self.notify_indicator(queue, IndicatorUpdate::InBandRing(ind.enabled));
        }
    }

    fn rx_vr_state(&mut self, queue: &mut MessageQueue, ind: BthfVrStateInd) {
        if self.indicators.set_vr_active(ind.active) {
            self.notify_indicator(queue, IndicatorUpdate::VoiceRecognition(ind.active));
        }
    }

    fn rx_volume(&mut self, queue: &mut MessageQueue, ind: BthfVolumeInd) {
        match ind.target {
            VolumeTarget::Speaker => {
                self.audio.speaker_vol = ind.volume.min(15);
                let native = hf_to_native_vol(self.audio.speaker_vol, &self.config);
                self.push_audio(
                    queue,
                    HfpMsgInner::AudioVolumeReq(AudioVolumeReq {
                        peer: self.peer,
                        volume: native,
                    }),
                );
            }
            VolumeTarget::Microphone => {
                self.audio.mic_vol = ind.volume.min(15);
            }
        }
    }

    fn rx_subscriber(&mut self, queue: &mut MessageQueue, ind: BthfSubscriberInfoInd) {
        if self.indicators.set_subscriber_number(ind.number.clone()) {
            self.notify_indicator(queue, IndicatorUpdate::SubscriberNumber(ind.number));
        }
    }

    // ─── Call listing / reconciliation ────────────────────────────

    fn query_calls(&mut self, queue: &mut MessageQueue) {
        if self.query_outstanding {
            tracing::debug!("{}: call listing query already outstanding", self.peer);
            return;
        }
        self.listing.clear();
        self.query_outstanding = true;
        self.push_transport(
            queue,
            HfpMsgInner::BthfQueryCallsReq(BthfQueryCallsReq { peer: self.peer }),
        );
        self.cmd_queue.push(PendingAction::QueryCalls);
    }

    fn reconcile_calls(&mut self, queue: &mut MessageQueue) {
        let listing = mem::take(&mut self.listing);
        let timeout = self.config.config().call_policy.outgoing_confirm_timeout_ms;
        let outcome = self.calls.reconcile(listing, self.now, timeout);

        for call in &outcome.changed {
            self.notify_call_changed(queue, call);
        }
        if outcome.stuck_outgoing {
            // Best effort: tell the peer to drop whatever it thinks the
            // dial produced
            self.send_command(queue, AtCommand::Terminate, PendingAction::Terminate);
        }
        self.rearm_query_timer();
    }

    fn rearm_query_timer(&mut self) {
        if self.calls.is_empty() {
            self.next_query_at = None;
            return;
        }
        let policy = &self.config.config().call_policy;
        let interval = if self.calls.any(|c| c.state.is_ringing()) || self.poll_during_call {
            policy.query_interval_ringing_ms
        } else {
            policy.query_interval_ms
        };
        self.next_query_at = Some(self.now.add_millis(interval));
    }

    // ─── Timers ───────────────────────────────────────────────────

    pub fn tick_start(&mut self, queue: &mut MessageQueue, now: MonoTime) {
        self.now = now;

        if self.state == HfState::Connecting {
            let timeout = self.config.config().call_policy.connecting_timeout_ms;
            if let Some(since) = self.connecting_since {
                if since.age(now) >= timeout as i64 {
                    tracing::warn!("{}: connect timed out after {} ms", self.peer, timeout);
                    self.push_transport(
                        queue,
                        HfpMsgInner::BthfDisconnectReq(BthfDisconnectReq { peer: self.peer }),
                    );
                    self.enter_disconnected(queue);
                    return;
                }
            }
        }

        if let Some(at) = self.next_query_at {
            if at <= now && self.is_slc_up() {
                self.next_query_at = None;
                self.query_calls(queue);
            }
        }
    }

    // ─── State transitions ────────────────────────────────────────

    fn is_slc_up(&self) -> bool {
        matches!(self.state, HfState::Connected | HfState::AudioOn)
    }

    fn peer_features(&self) -> PeerFeatures {
        self.features.map(|(p, _)| p).unwrap_or_default()
    }

    fn chld(&self) -> ChldFeatures {
        self.features.map(|(_, c)| c).unwrap_or_default()
    }

    fn enter_connecting(&mut self, queue: &mut MessageQueue) {
        self.connecting_since = Some(self.now);
        self.set_state(queue, HfState::Connecting, None);
    }

    fn enter_connected(
        &mut self,
        queue: &mut MessageQueue,
        peer_features: PeerFeatures,
        chld_features: ChldFeatures,
    ) {
        tracing::info!(
            "{}: SLC up, features {:?} chld {:?}",
            self.peer,
            peer_features,
            chld_features
        );
        self.features = Some((peer_features, chld_features));
        self.connecting_since = None;
        self.set_state(queue, HfState::Connected, Some((peer_features, chld_features)));

        // On-entry command burst. Each is answered by one result event
        if peer_features.ec_nr {
            self.send_command(queue, AtCommand::NrecDisable, PendingAction::NrecDisable);
        }
        self.send_command(
            queue,
            AtCommand::SpeakerVolume(self.audio.speaker_vol),
            PendingAction::VolumeSync,
        );
        self.send_command(
            queue,
            AtCommand::MicVolume(self.audio.mic_vol),
            PendingAction::VolumeSync,
        );
        self.send_command(queue, AtCommand::SubscriberInfo, PendingAction::SubscriberInfo);
        self.send_command(queue, AtCommand::VendorProbe, PendingAction::VendorProbe);

        // Observers resync: ring routing needs the in-band capability, and
        // the last battery level may predate the connection
        self.indicators.set_in_band_ring(peer_features.in_band_ring);
        self.notify_indicator(queue, IndicatorUpdate::InBandRing(peer_features.in_band_ring));
        self.notify_indicator(queue, IndicatorUpdate::Battery(self.indicators.battery));
    }

    fn enter_disconnected(&mut self, queue: &mut MessageQueue) {
        if self.state == HfState::Disconnected {
            // Idempotent: repeat indications produce no notifications
            return;
        }

        if self.state == HfState::AudioOn {
            self.teardown_audio_leg(queue);
        }

        for call in self.calls.force_terminate_all() {
            self.notify_call_changed(queue, &call);
        }

        if !self.cmd_queue.is_empty() {
            tracing::debug!(
                "{}: dropping {} outstanding commands",
                self.peer,
                self.cmd_queue.len()
            );
            self.cmd_queue.clear();
        }
        self.listing.clear();
        self.indicators.reset();
        self.features = None;
        self.connecting_since = None;
        self.next_query_at = None;
        self.query_outstanding = false;

        self.set_state(queue, HfState::Disconnected, None);
    }

    fn enter_audio_on(&mut self, queue: &mut MessageQueue, codec: ScoCodec) {
        self.audio.set_codec(codec);
        tracing::info!(
            "{}: audio up, codec {:?} ({} Hz)",
            self.peer,
            codec,
            self.audio.sample_rate_hz()
        );

        // Sink volume, transient focus, then the platform route (only on a
        // true 0->1 transition of the process-wide flag)
        let native = hf_to_native_vol(self.audio.speaker_vol, &self.config);
        self.push_audio(
            queue,
            HfpMsgInner::AudioVolumeReq(AudioVolumeReq {
                peer: self.peer,
                volume: native,
            }),
        );
        self.push_audio(
            queue,
            HfpMsgInner::AudioFocusReq(AudioFocusReq {
                peer: self.peer,
                acquire: true,
            }),
        );
        if claim_route(&self.config) {
            self.push_audio(
                queue,
                HfpMsgInner::AudioRouteReq(AudioRouteReq {
                    peer: self.peer,
                    enable: true,
                    sample_rate_hz: self.audio.sample_rate_hz(),
                }),
            );
        } else {
            tracing::debug!("{}: audio already routed, route request suppressed", self.peer);
        }

        self.set_audio_state(queue, AudioState::Connected);
        self.set_state(queue, HfState::AudioOn, None);
    }

    fn exit_audio_on(&mut self, queue: &mut MessageQueue) {
        self.teardown_audio_leg(queue);
        self.set_state(queue, HfState::Connected, None);
    }

    fn teardown_audio_leg(&mut self, queue: &mut MessageQueue) {
        if release_route(&self.config) {
            self.push_audio(
                queue,
                HfpMsgInner::AudioRouteReq(AudioRouteReq {
                    peer: self.peer,
                    enable: false,
                    sample_rate_hz: self.audio.sample_rate_hz(),
                }),
            );
        }
        self.push_audio(
            queue,
            HfpMsgInner::AudioFocusReq(AudioFocusReq {
                peer: self.peer,
                acquire: false,
            }),
        );
        self.set_audio_state(queue, AudioState::Disconnected);
    }

    fn set_state(
        &mut self,
        queue: &mut MessageQueue,
        new: HfState,
        features: Option<(PeerFeatures, ChldFeatures)>,
    ) {
        let prev = self.state;
        if prev == new {
            return;
        }
        tracing::info!(ts = ?self.now, "{}: {:?} -> {:?}", self.peer, prev, new);
        self.state = new;
        self.push_broadcast(
            queue,
            HfpMsgInner::TnhfConnStateInd(TnhfConnStateInd {
                peer: self.peer,
                prev,
                state: new,
                features,
            }),
        );

        // Replay whatever waited for this state to resolve, in original
        // order, after the notification
        for msg in self.deferred.drain(..) {
            queue.push_back(msg);
        }
    }

    fn set_audio_state(&mut self, queue: &mut MessageQueue, new: AudioState) {
        let prev = self.audio_state;
        if prev == new {
            return;
        }
        self.audio_state = new;
        self.push_broadcast(
            queue,
            HfpMsgInner::TnhfAudioStateInd(TnhfAudioStateInd {
                peer: self.peer,
                prev,
                state: new,
                wideband: new == AudioState::Connected && self.audio.wideband(),
            }),
        );
    }

    // ─── Message builders ─────────────────────────────────────────

    fn send_command(&mut self, queue: &mut MessageQueue, command: AtCommand, pending: PendingAction) {
        tracing::debug!("{}: -> {:?}", self.peer, command);
        self.push_transport(
            queue,
            HfpMsgInner::BthfSendCommandReq(BthfSendCommandReq {
                peer: self.peer,
                command,
            }),
        );
        self.cmd_queue.push(pending);
    }

    fn notify_call_changed(&self, queue: &mut MessageQueue, call: &Call) {
        tracing::info!(
            ts = ?self.now,
            "{}: call {} {:?} {}",
            self.peer,
            call.id,
            call.state,
            call.number
        );
        queue.push_back(HfpMsg::new(
            Sap::TnhfSap,
            HfpEntity::Hf,
            HfpEntity::Telephony,
            self.now,
            HfpMsgInner::TnhfCallChangedInd(TnhfCallChangedInd {
                peer: self.peer,
                call: call.clone(),
            }),
        ));
    }

    fn notify_indicator(&self, queue: &mut MessageQueue, update: IndicatorUpdate) {
        self.push_broadcast(
            queue,
            HfpMsgInner::TnhfIndicatorInd(TnhfIndicatorInd {
                peer: self.peer,
                update,
            }),
        );
    }

    fn push_transport(&self, queue: &mut MessageQueue, inner: HfpMsgInner) {
        queue.push_back(HfpMsg::new(
            Sap::BthfSap,
            HfpEntity::Hf,
            HfpEntity::Transport,
            self.now,
            inner,
        ));
    }

    fn push_audio(&self, queue: &mut MessageQueue, inner: HfpMsgInner) {
        queue.push_back(HfpMsg::new(
            Sap::AudioSap,
            HfpEntity::Hf,
            HfpEntity::Audio,
            self.now,
            inner,
        ));
    }

    fn push_broadcast(&self, queue: &mut MessageQueue, inner: HfpMsgInner) {
        queue.push_back(HfpMsg::new(
            Sap::TnhfSap,
            HfpEntity::Hf,
            HfpEntity::Broadcast,
            self.now,
            inner,
        ));
    }
}
