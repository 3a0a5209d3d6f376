//! Structured ledger address

use super::{CellError, CellResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tonlib_core::TonAddress;

/// Standard internal address: workchain + 256-bit account id
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    workchain: i8,
    hash: [u8; 32],
}

/// Flags carried by the user-friendly text form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendlyFlags {
    pub bounceable: bool,
    pub test_only: bool,
}

fn invalid(input: &str, reason: impl fmt::Display) -> CellError {
    CellError::InvalidAddress {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl Address {
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash_part(&self) -> &[u8; 32] {
        &self.hash
    }

    /// The same address as the cell layer stores it
    pub fn to_ton_address(&self) -> TonAddress {
        TonAddress::new(self.workchain as i32, &self.hash)
    }

    /// `<workchain>:<hex>`, the form the ledger API accepts in paths
    pub fn to_raw_string(&self) -> String {
        self.to_ton_address().to_hex()
    }

    /// Checksummed base64url form
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        self.to_ton_address()
            .to_base64_url_flags(!bounceable, test_only)
    }

    pub fn parse_raw(input: &str) -> CellResult<Self> {
        let parsed = TonAddress::from_hex_str(input).map_err(|e| invalid(input, e))?;
        Self::try_from(&parsed).map_err(|e| invalid(input, e))
    }

    pub fn parse_friendly(input: &str) -> CellResult<(Self, FriendlyFlags)> {
        let parsed = if input.contains('-') || input.contains('_') {
            TonAddress::from_base64_url_flags(input)
        } else {
            TonAddress::from_base64_std_flags(input)
        };
        let (parsed, non_bounceable, non_production) = parsed.map_err(|e| invalid(input, e))?;
        let addr = Self::try_from(&parsed).map_err(|e| invalid(input, e))?;
        Ok((
            addr,
            FriendlyFlags {
                bounceable: !non_bounceable,
                test_only: non_production,
            },
        ))
    }
}

impl TryFrom<&TonAddress> for Address {
    type Error = String;

    fn try_from(addr: &TonAddress) -> Result<Self, Self::Error> {
        let workchain = i8::try_from(addr.workchain)
            .map_err(|_| format!("workchain {} out of range", addr.workchain))?;
        Ok(Self::new(workchain, addr.hash_part))
    }
}

impl From<&Address> for TonAddress {
    fn from(addr: &Address) -> Self {
        addr.to_ton_address()
    }
}

impl FromStr for Address {
    type Err = CellError;

    /// Accepts both the raw and the user-friendly form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s).map(|(addr, _)| addr)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly(true, false))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_raw_string())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_raw_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";

    #[test]
    fn test_known_friendly_form() {
        let addr: Address = RAW.parse().unwrap();
        let friendly = addr.to_friendly(true, false);
        assert!(friendly.starts_with("EQ"));
        assert!(addr.to_friendly(false, false).starts_with("UQ"));
        assert!(addr.to_friendly(false, true).starts_with("0Q"));

        let std_form = friendly.replace('-', "+").replace('_', "/");
        let (parsed, flags) = Address::parse_friendly(&std_form).unwrap();
        assert_eq!(parsed, addr);
        assert!(flags.bounceable);
    }

    #[test]
    fn test_raw_roundtrip() {
        let addr: Address = RAW.parse().unwrap();
        assert_eq!(addr.workchain(), 0);
        assert_eq!(addr.to_raw_string(), RAW);
    }

    #[test]
    fn test_friendly_roundtrip_keeps_flags() {
        let addr: Address = RAW.parse().unwrap();
        let friendly = addr.to_friendly(false, true);
        assert_eq!(friendly.len(), 48);
        let (parsed, flags) = Address::parse_friendly(&friendly).unwrap();
        assert_eq!(parsed, addr);
        assert!(!flags.bounceable);
        assert!(flags.test_only);
    }

    #[test]
    fn test_masterchain_workchain() {
        let addr = Address::new(-1, [7u8; 32]);
        let parsed: Address = addr.to_raw_string().parse().unwrap();
        assert_eq!(parsed.workchain(), -1);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("0:abcd".parse::<Address>().is_err());
        assert!("zz:00".parse::<Address>().is_err());
        assert!("EQ-short".parse::<Address>().is_err());

        let addr: Address = RAW.parse().unwrap();
        let mut friendly = addr.to_friendly(true, false).into_bytes();
        friendly[10] = if friendly[10] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(friendly).unwrap();
        assert!(tampered.parse::<Address>().is_err());
    }
}
