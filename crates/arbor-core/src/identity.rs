//! Switch identity
//!
//! Switches are identified by a plain unsigned integer. The ordering of
//! identities is part of the protocol: the lowest surviving ID becomes
//! the root of the spanning tree, and equal-cost paths are broken in
//! favour of the lower-ID neighbour.

use std::str::FromStr;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Identity of a switch in the topology
///
/// Serialized transparently so it can be used as a JSON object key in
/// scenario files (`{"1": [2, 3]}`).
#[derive(
    Debug, Display, From, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SwitchId(pub u32);

impl SwitchId {
    /// Create a new switch identity
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Generate identities `1..=count`
    pub fn range_to(count: u32) -> Vec<Self> {
        (1..=count).map(Self).collect()
    }

    /// Get the underlying integer
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl FromStr for SwitchId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| IdentityError::InvalidFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_id_ordering() {
        assert!(SwitchId(1) < SwitchId(2));
        assert!(SwitchId(10) > SwitchId(9));
        assert_eq!(SwitchId::new(4), SwitchId::from(4));
    }

    #[test]
    fn test_switch_id_range() {
        let ids = SwitchId::range_to(3);
        assert_eq!(ids, vec![SwitchId(1), SwitchId(2), SwitchId(3)]);
        assert!(SwitchId::range_to(0).is_empty());
    }

    #[test]
    fn test_switch_id_display() {
        assert_eq!(SwitchId(7).to_string(), "7");
        assert_eq!(format!("{} - {}", SwitchId(1), SwitchId(2)), "1 - 2");
    }

    #[test]
    fn test_switch_id_parse() {
        assert_eq!("12".parse::<SwitchId>().unwrap(), SwitchId(12));
        assert_eq!(" 3 ".parse::<SwitchId>().unwrap(), SwitchId(3));
        assert!("abc".parse::<SwitchId>().is_err());
        assert!("-1".parse::<SwitchId>().is_err());
    }
}
