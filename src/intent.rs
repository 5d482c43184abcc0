use std::fmt;

use serde::{Deserialize, Serialize};

use crate::param::ContractParam;
use crate::primitives::UInt160;

/// Permissions granted to a called contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallFlags(pub u8);

impl CallFlags {
    pub const NONE: Self = Self(0);
    pub const READ_STATES: Self = Self(0b0001);
    pub const WRITE_STATES: Self = Self(0b0010);
    pub const ALLOW_CALL: Self = Self(0b0100);
    pub const ALLOW_NOTIFY: Self = Self(0b1000);

    pub const STATES: Self = Self(Self::READ_STATES.0 | Self::WRITE_STATES.0);
    pub const READ_ONLY: Self = Self(Self::READ_STATES.0 | Self::ALLOW_CALL.0);
    pub const ALL: Self = Self(Self::STATES.0 | Self::ALLOW_CALL.0 | Self::ALLOW_NOTIFY.0);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether only known flag bits are set.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 & !Self::ALL.0 == 0
    }
}

impl Default for CallFlags {
    #[inline]
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for CallFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for CallFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::NONE => "None",
            Self::READ_STATES => "ReadStates",
            Self::WRITE_STATES => "WriteStates",
            Self::ALLOW_CALL => "AllowCall",
            Self::ALLOW_NOTIFY => "AllowNotify",
            Self::STATES => "States",
            Self::READ_ONLY => "ReadOnly",
            Self::ALL => "All",
            Self(bits) => return write!(f, "0b{bits:04b}"),
        };
        f.write_str(name)
    }
}

/// A single contract invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIntent {
    pub script_hash: UInt160,
    pub operation: String,
    #[serde(default)]
    pub args: Vec<ContractParam>,
    #[serde(default)]
    pub call_flags: CallFlags,
}

impl CallIntent {
    pub fn new<T: Into<String>>(script_hash: UInt160, operation: T) -> Self {
        Self {
            script_hash,
            operation: operation.into(),
            args: Vec::new(),
            call_flags: CallFlags::ALL,
        }
    }

    pub fn with_args<I: IntoIterator<Item = ContractParam>>(mut self, args: I) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    pub fn with_call_flags(mut self, call_flags: CallFlags) -> Self {
        self.call_flags = call_flags;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flags() {
        assert_eq!(CallFlags::default(), CallFlags::ALL);
        assert_eq!(CallFlags::ALL.bits(), 15);
        assert_eq!(CallFlags::READ_ONLY.bits(), 5);
        assert!(CallFlags::ALL.contains(CallFlags::ALLOW_NOTIFY));
        assert!(!CallFlags::READ_ONLY.contains(CallFlags::WRITE_STATES));
        assert!(!CallFlags(0x10).is_valid());
        assert_eq!(CallFlags::READ_STATES | CallFlags::ALLOW_CALL, CallFlags::READ_ONLY);
        assert_eq!(CallFlags::STATES.to_string(), "States");
        assert_eq!(CallFlags(6).to_string(), "0b0110");
    }

    #[test]
    fn intent_json() -> anyhow::Result<()> {
        let intent = CallIntent::new("ef4073a0f2b305a38ec4050e4d3d28bc40ea63f5".parse()?, "symbol");
        let value = serde_json::to_value(&intent)?;
        assert_eq!(
            value,
            json!({
                "scriptHash": "ef4073a0f2b305a38ec4050e4d3d28bc40ea63f5",
                "operation": "symbol",
                "args": [],
                "callFlags": 15,
            })
        );

        let parsed: CallIntent = serde_json::from_value(json!({
            "scriptHash": "0xef4073a0f2b305a38ec4050e4d3d28bc40ea63f5",
            "operation": "balanceOf",
            "args": [{ "type": "Hash160", "value": "5b7074e873973a6ed3708862f219a6fbf4d1c411" }],
        }))?;
        assert_eq!(parsed.call_flags, CallFlags::ALL);
        assert_eq!(parsed.args.len(), 1);
        Ok(())
    }
}
