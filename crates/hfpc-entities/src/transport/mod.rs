//! Transport entity bridging the native Bluetooth stack into the router.
//!
//! Native stack callbacks run on their own threads; they hand parsed
//! indications to a channel which this entity drains at tick start, so the
//! HF client only ever sees one serialized stream. Requests go the other
//! way as commands on a second channel, fire-and-forget.

use crossbeam_channel::{unbounded, Receiver, Sender};

use hfpc_config::SharedConfig;
use hfpc_core::{hfp_entities::HfpEntity, BdAddr, MonoTime, Sap};
use hfpc_saps::bthf::AtCommand;
use hfpc_saps::{HfpMsg, HfpMsgInner};

use crate::{HfpEntityTrait, MessageQueue};

/// Command for the native side, mirrors the BTHF-SAP requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Connect(BdAddr),
    Disconnect(BdAddr),
    ConnectAudio(BdAddr),
    DisconnectAudio(BdAddr),
    SendCommand(BdAddr, AtCommand),
    QueryCalls(BdAddr),
}

/// An already-parsed indication from the native side. Must wrap one of the
/// `Bthf*Ind` primitives; anything else is dropped with a warning.
#[derive(Debug)]
pub struct TransportEvent(pub HfpMsgInner);

pub struct TransportEntity {
    _config: SharedConfig,
    now: MonoTime,

    /// Receive events from the native side
    event_receiver: Receiver<TransportEvent>,
    /// Handed out to the native side for event injection
    event_sender: Sender<TransportEvent>,

    /// Send commands to the native side
    command_sender: Sender<TransportCommand>,
    /// Handed out to the native side (or kept by tests)
    command_receiver: Receiver<TransportCommand>,
}

impl TransportEntity {
    pub fn new(config: SharedConfig) -> Self {
        let (event_sender, event_receiver) = unbounded::<TransportEvent>();
        let (command_sender, command_receiver) = unbounded::<TransportCommand>();
        Self {
            _config: config,
            now: MonoTime::default(),
            event_receiver,
            event_sender,
            command_sender,
            command_receiver,
        }
    }

    /// Injection handle for the native side. Events land in the router
    /// stream at the next tick.
    pub fn event_sender(&self) -> Sender<TransportEvent> {
        self.event_sender.clone()
    }

    /// Command stream for the native side
    pub fn command_receiver(&self) -> Receiver<TransportCommand> {
        self.command_receiver.clone()
    }

    fn is_indication(msg: &HfpMsgInner) -> bool {
        matches!(
            msg,
            HfpMsgInner::BthfConnStateInd(_)
                | HfpMsgInner::BthfAudioStateInd(_)
                | HfpMsgInner::BthfCurrentCallInd(_)
                | HfpMsgInner::BthfCmdResultInd(_)
                | HfpMsgInner::BthfNetworkStateInd(_)
                | HfpMsgInner::BthfNetworkRoamingInd(_)
                | HfpMsgInner::BthfNetworkSignalInd(_)
                | HfpMsgInner::BthfBatteryLevelInd(_)
                | HfpMsgInner::BthfOperatorNameInd(_)
                | HfpMsgInner::BthfCallIndicatorInd(_)
                | HfpMsgInner::BthfRingInd(_)
                | HfpMsgInner::BthfInBandRingInd(_)
                | HfpMsgInner::BthfVrStateInd(_)
                | HfpMsgInner::BthfVolumeInd(_)
                | HfpMsgInner::BthfSubscriberInfoInd(_)
        )
    }

    fn send_command(&self, command: TransportCommand) {
        tracing::debug!("-> {:?}", command);
        if let Err(e) = self.command_sender.send(command) {
            tracing::warn!("native side gone, dropping command: {}", e);
        }
    }
}

impl HfpEntityTrait for TransportEntity {
    fn entity(&self) -> HfpEntity {
        HfpEntity::Transport
    }

    fn set_config(&mut self, config: SharedConfig) {
        self._config = config;
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: HfpMsg) {
        match message.msg {
            HfpMsgInner::BthfConnectReq(req) => {
                self.send_command(TransportCommand::Connect(req.peer));
            }
            HfpMsgInner::BthfDisconnectReq(req) => {
                self.send_command(TransportCommand::Disconnect(req.peer));
            }
            HfpMsgInner::BthfConnectAudioReq(req) => {
                self.send_command(TransportCommand::ConnectAudio(req.peer));
            }
            HfpMsgInner::BthfDisconnectAudioReq(req) => {
                self.send_command(TransportCommand::DisconnectAudio(req.peer));
            }
            HfpMsgInner::BthfSendCommandReq(req) => {
                self.send_command(TransportCommand::SendCommand(req.peer, req.command));
            }
            HfpMsgInner::BthfQueryCallsReq(req) => {
                self.send_command(TransportCommand::QueryCalls(req.peer));
            }
            other => {
                tracing::warn!("rx_prim: unexpected message {:?}", other);
            }
        }
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, now: MonoTime) {
        self.now = now;

        // Drain everything the native side produced since the last tick
        while let Ok(event) = self.event_receiver.try_recv() {
            if !Self::is_indication(&event.0) {
                tracing::warn!("dropping non-indication event {:?}", event.0);
                continue;
            }
            tracing::trace!("<- {:?}", event.0);
            queue.push_back(HfpMsg::new(
                Sap::BthfSap,
                HfpEntity::Transport,
                HfpEntity::Hf,
                now,
                event.0,
            ));
        }
    }
}
