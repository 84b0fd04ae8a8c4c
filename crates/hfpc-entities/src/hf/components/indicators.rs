/// Last known ambient state of the peer. Pure data holder: all setters
/// return whether the value actually moved, so the session only broadcasts
/// real changes.
#[derive(Debug, Clone, Default)]
pub struct AmbientIndicators {
    pub network_available: bool,
    pub roaming: bool,
    /// 0..5
    pub signal: u8,
    /// 0..5
    pub battery: u8,
    pub operator_name: String,
    pub in_band_ring: bool,
    pub vr_active: bool,
    pub subscriber_number: String,
}

impl AmbientIndicators {
    pub fn set_network_available(&mut self, v: bool) -> bool {
        let changed = self.network_available != v;
        self.network_available = v;
        changed
    }

    pub fn set_roaming(&mut self, v: bool) -> bool {
        let changed = self.roaming != v;
        self.roaming = v;
        changed
    }

    pub fn set_signal(&mut self, v: u8) -> bool {
        let changed = self.signal != v;
        self.signal = v;
        changed
    }

    pub fn set_battery(&mut self, v: u8) -> bool {
        let changed = self.battery != v;
        self.battery = v;
        changed
    }

    pub fn set_operator_name(&mut self, v: String) -> bool {
        let changed = self.operator_name != v;
        self.operator_name = v;
        changed
    }

    pub fn set_in_band_ring(&mut self, v: bool) -> bool {
        let changed = self.in_band_ring != v;
        self.in_band_ring = v;
        changed
    }

    pub fn set_vr_active(&mut self, v: bool) -> bool {
        let changed = self.vr_active != v;
        self.vr_active = v;
        changed
    }

    pub fn set_subscriber_number(&mut self, v: String) -> bool {
        let changed = self.subscriber_number != v;
        self.subscriber_number = v;
        changed
    }

    pub fn reset(&mut self) {
        *self = AmbientIndicators::default();
    }
}
