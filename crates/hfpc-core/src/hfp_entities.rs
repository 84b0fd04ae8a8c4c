// Entities registered with the message router
#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum HfpEntity {
    /// Bridge to the native Bluetooth stack
    Transport,
    /// The HF client itself (sessions, calls, indicators)
    Hf,
    /// Audio sink: routing, focus and volume
    Audio,
    /// Observer of call-changed notifications
    Telephony,
    /// Observer of connection-state and indicator notifications
    Broadcast,

    /// Source of user actions. SAP determines routing
    Control,
}
