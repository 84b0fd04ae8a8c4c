use core::fmt;
use std::str::FromStr;

/// 48-bit Bluetooth device address, stored big-endian (as printed).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for BdAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("invalid BdAddr: {}", s));
        }
        for (i, part) in parts.iter().enumerate() {
            bytes[i] =
                u8::from_str_radix(part, 16).map_err(|_| format!("invalid BdAddr: {}", s))?;
        }
        Ok(BdAddr(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let addr: BdAddr = "00:1B:DC:F2:1A:0B".parse().unwrap();
        assert_eq!(addr.bytes(), [0x00, 0x1B, 0xDC, 0xF2, 0x1A, 0x0B]);
        assert_eq!(format!("{}", addr), "00:1B:DC:F2:1A:0B");

        assert!("00:1B:DC".parse::<BdAddr>().is_err());
        assert!("00:1B:DC:F2:1A:ZZ".parse::<BdAddr>().is_err());
    }
}
