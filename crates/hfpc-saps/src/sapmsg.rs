use hfpc_core::hfp_entities::HfpEntity;
use hfpc_core::MonoTime;
use hfpc_core::Sap;

use crate::audio::*;
use crate::bthf::*;
use crate::tnhf::*;

/// Exhaustive list of primitive structs for use in the HfpMsg struct
#[derive(Debug)]
pub enum HfpMsgInner {
    // BTHF-SAP requests
    BthfConnectReq(BthfConnectReq),
    BthfDisconnectReq(BthfDisconnectReq),
    BthfConnectAudioReq(BthfConnectAudioReq),
    BthfDisconnectAudioReq(BthfDisconnectAudioReq),
    BthfSendCommandReq(BthfSendCommandReq),
    BthfQueryCallsReq(BthfQueryCallsReq),

    // BTHF-SAP indications
    BthfConnStateInd(BthfConnStateInd),
    BthfAudioStateInd(BthfAudioStateInd),
    BthfCurrentCallInd(BthfCurrentCallInd),
    BthfCmdResultInd(BthfCmdResultInd),
    BthfNetworkStateInd(BthfNetworkStateInd),
    BthfNetworkRoamingInd(BthfNetworkRoamingInd),
    BthfNetworkSignalInd(BthfNetworkSignalInd),
    BthfBatteryLevelInd(BthfBatteryLevelInd),
    BthfOperatorNameInd(BthfOperatorNameInd),
    BthfCallIndicatorInd(BthfCallIndicatorInd),
    BthfRingInd(BthfRingInd),
    BthfInBandRingInd(BthfInBandRingInd),
    BthfVrStateInd(BthfVrStateInd),
    BthfVolumeInd(BthfVolumeInd),
    BthfSubscriberInfoInd(BthfSubscriberInfoInd),

    // TNHF-SAP (user <-> HF client)
    TnhfActionReq(TnhfActionReq),
    TnhfCallChangedInd(TnhfCallChangedInd),
    TnhfConnStateInd(TnhfConnStateInd),
    TnhfAudioStateInd(TnhfAudioStateInd),
    TnhfIndicatorInd(TnhfIndicatorInd),
    TnhfRingInd(TnhfRingInd),

    // AUDIO-SAP
    AudioRouteReq(AudioRouteReq),
    AudioFocusReq(AudioFocusReq),
    AudioVolumeReq(AudioVolumeReq),
}

#[derive(Debug)]
pub struct HfpMsg {
    pub sap: Sap,
    pub src: HfpEntity,
    pub dest: HfpEntity,
    /// Stack time at the time the message was created
    pub t: MonoTime,

    pub msg: HfpMsgInner,
}

impl HfpMsg {
    pub fn new(
        sap: Sap,
        src: HfpEntity,
        dest: HfpEntity,
        t_submit: MonoTime,
        msg: HfpMsgInner,
    ) -> Self {
        Self {
            sap,
            src,
            dest,
            t: t_submit,
            msg,
        }
    }

    pub fn get_source(&self) -> &HfpEntity {
        &self.src
    }
    pub fn get_dest(&self) -> &HfpEntity {
        &self.dest
    }
    pub fn get_sap(&self) -> &Sap {
        &self.sap
    }
}
