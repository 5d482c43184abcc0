use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::Num;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScriptError;
use crate::primitives::{PublicKey, UInt160, UInt256};
use crate::util::decode_hex;

/// Type tag of a contract argument.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContractParamType {
    Any = 0x00,
    Boolean = 0x10,
    Integer = 0x11,
    ByteArray = 0x12,
    String = 0x13,
    Hash160 = 0x14,
    Hash256 = 0x15,
    PublicKey = 0x16,
    Signature = 0x17,
    Array = 0x20,
    Map = 0x22,
    InteropInterface = 0x30,
    Void = 0xff,
}

impl ContractParamType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::ByteArray => "ByteArray",
            Self::String => "String",
            Self::Hash160 => "Hash160",
            Self::Hash256 => "Hash256",
            Self::PublicKey => "PublicKey",
            Self::Signature => "Signature",
            Self::Array => "Array",
            Self::Map => "Map",
            Self::InteropInterface => "InteropInterface",
            Self::Void => "Void",
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::Any,
            0x10 => Self::Boolean,
            0x11 => Self::Integer,
            0x12 => Self::ByteArray,
            0x13 => Self::String,
            0x14 => Self::Hash160,
            0x15 => Self::Hash256,
            0x16 => Self::PublicKey,
            0x17 => Self::Signature,
            0x20 => Self::Array,
            0x22 => Self::Map,
            0x30 => Self::InteropInterface,
            0xff => Self::Void,
            _ => return None,
        })
    }
}

impl fmt::Display for ContractParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractParamType {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_owned()))
            .map_err(|_| ScriptError::InvalidArgument(format!("unknown type `{s}`").into()))
    }
}

/// Typed contract argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ContractParamJson", into = "ContractParamJson")]
pub enum ContractParam {
    Any(Option<String>),
    Boolean(bool),
    Integer(BigInt),
    ByteArray(Vec<u8>),
    String(String),
    Hash160(UInt160),
    Hash256(UInt256),
    PublicKey(PublicKey),
    Array(Vec<ContractParam>),
    Void,
}

impl ContractParam {
    pub fn any() -> Self {
        Self::Any(None)
    }

    pub fn string<T: Into<String>>(value: T) -> Self {
        Self::String(value.into())
    }

    pub fn boolean(value: bool) -> Self {
        Self::Boolean(value)
    }

    pub fn integer<T: Into<BigInt>>(value: T) -> Self {
        Self::Integer(value.into())
    }

    /// Parses a decimal integer, dropping any fractional part.
    pub fn integer_str(value: &str) -> Result<Self, ScriptError> {
        let value = value.trim();
        let int_part = match value.split_once('.') {
            Some((int_part, fraction)) if fraction.chars().all(|c| c.is_ascii_digit()) => {
                int_part
            }
            Some(_) => return Err(ScriptError::InvalidInteger(value.into())),
            None => value,
        };

        let int_part = match int_part {
            "" | "-" => return Err(ScriptError::InvalidInteger(value.into())),
            s => s.strip_prefix('+').unwrap_or(s),
        };

        BigInt::from_str_radix(int_part, 10)
            .map(Self::Integer)
            .map_err(|_| ScriptError::InvalidInteger(value.into()))
    }

    pub fn byte_array(hex: &str) -> Result<Self, ScriptError> {
        decode_hex(hex).map(Self::ByteArray)
    }

    pub fn hash160(hex: &str) -> Result<Self, ScriptError> {
        hex.parse().map(Self::Hash160)
    }

    pub fn hash256(hex: &str) -> Result<Self, ScriptError> {
        hex.parse().map(Self::Hash256)
    }

    pub fn public_key(hex: &str) -> Result<Self, ScriptError> {
        hex.parse().map(Self::PublicKey)
    }

    pub fn array<I: IntoIterator<Item = ContractParam>>(items: I) -> Self {
        Self::Array(items.into_iter().collect())
    }

    pub fn param_type(&self) -> ContractParamType {
        match self {
            Self::Any(_) => ContractParamType::Any,
            Self::Boolean(_) => ContractParamType::Boolean,
            Self::Integer(_) => ContractParamType::Integer,
            Self::ByteArray(_) => ContractParamType::ByteArray,
            Self::String(_) => ContractParamType::String,
            Self::Hash160(_) => ContractParamType::Hash160,
            Self::Hash256(_) => ContractParamType::Hash256,
            Self::PublicKey(_) => ContractParamType::PublicKey,
            Self::Array(_) => ContractParamType::Array,
            Self::Void => ContractParamType::Void,
        }
    }

    pub fn as_array(&self) -> Option<&[ContractParam]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn from_json(value: Value) -> Result<Self, ScriptError> {
        let json: ContractParamJson = serde_json::from_value(value)
            .map_err(|e| ScriptError::InvalidArgument(e.to_string().into()))?;
        Self::try_from(json)
    }

    pub fn to_json(&self) -> Value {
        // NOTE: serialization of the JSON shape never fails
        serde_json::to_value(ContractParamJson::from(self.clone())).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ContractParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any(None) | Self::Void => f.write_str("null"),
            Self::Any(Some(value)) | Self::String(value) => write!(f, "{value:?}"),
            Self::Boolean(value) => fmt::Display::fmt(value, f),
            Self::Integer(value) => fmt::Display::fmt(value, f),
            Self::ByteArray(value) => write!(f, "x{{{}}}", hex::encode(value)),
            Self::Hash160(value) => write!(f, "0x{value}"),
            Self::Hash256(value) => write!(f, "0x{value}"),
            Self::PublicKey(value) => fmt::Display::fmt(value, f),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for ContractParam {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<BigInt> for ContractParam {
    fn from(value: BigInt) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for ContractParam {
    fn from(value: i64) -> Self {
        Self::Integer(value.into())
    }
}

impl From<&str> for ContractParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<UInt160> for ContractParam {
    fn from(value: UInt160) -> Self {
        Self::Hash160(value)
    }
}

impl From<UInt256> for ContractParam {
    fn from(value: UInt256) -> Self {
        Self::Hash256(value)
    }
}

impl From<PublicKey> for ContractParam {
    fn from(value: PublicKey) -> Self {
        Self::PublicKey(value)
    }
}

impl From<Vec<ContractParam>> for ContractParam {
    fn from(value: Vec<ContractParam>) -> Self {
        Self::Array(value)
    }
}

/// RPC representation: `{"type": "<name>", "value": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContractParamJson {
    #[serde(rename = "type")]
    ty: ContractParamType,
    #[serde(default)]
    value: Value,
}

impl TryFrom<ContractParamJson> for ContractParam {
    type Error = ScriptError;

    fn try_from(json: ContractParamJson) -> Result<Self, Self::Error> {
        fn invalid(ty: ContractParamType, value: &Value) -> ScriptError {
            let reason = match value {
                Value::Null => format!("{ty} requires a value"),
                value => format!("{value} is not convertible to {ty}"),
            };
            ScriptError::InvalidArgument(reason.into())
        }

        let ContractParamJson { ty, value } = json;
        match (ty, value) {
            (ContractParamType::Any, Value::Null) => Ok(Self::Any(None)),
            (ContractParamType::Any, Value::String(s)) => Ok(Self::Any(Some(s))),
            (ContractParamType::Boolean, Value::Bool(b)) => Ok(Self::Boolean(b)),
            (ContractParamType::Boolean, Value::Number(n)) => {
                Ok(Self::Boolean(n.as_f64().is_some_and(|n| n != 0.0)))
            }
            (ContractParamType::Boolean, Value::String(s)) => match s.as_str() {
                "true" | "1" => Ok(Self::Boolean(true)),
                "false" | "0" | "" => Ok(Self::Boolean(false)),
                _ => Err(invalid(ty, &Value::String(s))),
            },
            (ContractParamType::Integer, Value::String(s)) => Self::integer_str(&s),
            (ContractParamType::Integer, Value::Number(n)) => {
                if let Some(n) = n.as_i64() {
                    Ok(Self::integer(n))
                } else if let Some(n) = n.as_u64() {
                    Ok(Self::integer(n))
                } else {
                    Self::integer_str(&n.to_string())
                }
            }
            (ContractParamType::ByteArray, Value::String(s)) => Self::byte_array(&s),
            (ContractParamType::String, Value::String(s)) => Ok(Self::String(s)),
            (ContractParamType::Hash160, Value::String(s)) => Self::hash160(&s),
            (ContractParamType::Hash256, Value::String(s)) => Self::hash256(&s),
            (ContractParamType::PublicKey, Value::String(s)) => Self::public_key(&s),
            (ContractParamType::Array, Value::Array(items)) => items
                .into_iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            (ContractParamType::Void, Value::Null) => Ok(Self::Void),
            (
                ContractParamType::Signature
                | ContractParamType::Map
                | ContractParamType::InteropInterface,
                _,
            ) => Err(ScriptError::UnsupportedArgument(ty.name())),
            (ty, value) => Err(invalid(ty, &value)),
        }
    }
}

impl From<ContractParam> for ContractParamJson {
    fn from(param: ContractParam) -> Self {
        let ty = param.param_type();
        let value = match param {
            ContractParam::Any(None) | ContractParam::Void => Value::Null,
            ContractParam::Any(Some(s)) | ContractParam::String(s) => Value::String(s),
            ContractParam::Boolean(b) => Value::Bool(b),
            ContractParam::Integer(n) => Value::String(n.to_string()),
            ContractParam::ByteArray(bytes) => Value::String(hex::encode(bytes)),
            ContractParam::Hash160(hash) => Value::String(hash.to_string()),
            ContractParam::Hash256(hash) => Value::String(hash.to_string()),
            ContractParam::PublicKey(key) => Value::String(key.to_string()),
            ContractParam::Array(items) => {
                Value::Array(items.iter().map(ContractParam::to_json).collect())
            }
        };
        Self { ty, value }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn integer_strings() -> anyhow::Result<()> {
        assert_eq!(ContractParam::integer_str("12")?, ContractParam::integer(12));
        assert_eq!(ContractParam::integer_str("12.7")?, ContractParam::integer(12));
        assert_eq!(ContractParam::integer_str("-5.1")?, ContractParam::integer(-5));
        assert_eq!(
            ContractParam::integer_str("123456789012345678901234567890")?,
            ContractParam::Integer("123456789012345678901234567890".parse()?)
        );
        assert!(ContractParam::integer_str("abc").is_err());
        assert!(ContractParam::integer_str("1.2.3").is_err());
        assert!(ContractParam::integer_str("").is_err());
        Ok(())
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = ContractParam::hash160("abcd").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(ContractParam::public_key(&"02".repeat(32)).is_err());
        assert!(ContractParam::hash256(&"00".repeat(32)).is_ok());
    }

    #[test]
    fn json_shape() -> anyhow::Result<()> {
        let param = ContractParam::array([
            ContractParam::string("transfer"),
            ContractParam::integer(100),
            ContractParam::boolean(true),
            ContractParam::hash160("5b7074e873973a6ed3708862f219a6fbf4d1c411")?,
            ContractParam::byte_array("0102")?,
            ContractParam::any(),
        ]);

        let value = serde_json::to_value(&param)?;
        assert_eq!(
            value,
            json!({
                "type": "Array",
                "value": [
                    { "type": "String", "value": "transfer" },
                    { "type": "Integer", "value": "100" },
                    { "type": "Boolean", "value": true },
                    { "type": "Hash160", "value": "5b7074e873973a6ed3708862f219a6fbf4d1c411" },
                    { "type": "ByteArray", "value": "0102" },
                    { "type": "Any", "value": null },
                ]
            })
        );

        let parsed: ContractParam = serde_json::from_value(value)?;
        assert_eq!(parsed, param);
        Ok(())
    }

    #[test]
    fn json_coercions() -> anyhow::Result<()> {
        let parse = |value: Value| ContractParam::from_json(value);

        assert_eq!(
            parse(json!({ "type": "Integer", "value": 42 }))?,
            ContractParam::integer(42)
        );
        assert_eq!(
            parse(json!({ "type": "Integer", "value": "7.9" }))?,
            ContractParam::integer(7)
        );
        assert_eq!(
            parse(json!({ "type": "Boolean", "value": 1 }))?,
            ContractParam::boolean(true)
        );
        assert_eq!(parse(json!({ "type": "Void" }))?, ContractParam::Void);

        let missing = parse(json!({ "type": "String" })).unwrap_err();
        assert_eq!(missing.kind(), crate::ErrorKind::InvalidArgument);

        let void_with_value = parse(json!({ "type": "Void", "value": "x" }));
        assert!(void_with_value.is_err());

        let map = parse(json!({ "type": "Map", "value": [] })).unwrap_err();
        assert!(matches!(map, ScriptError::UnsupportedArgument("Map")));
        Ok(())
    }

    #[test]
    fn type_names() -> anyhow::Result<()> {
        assert_eq!("Hash160".parse::<ContractParamType>()?, ContractParamType::Hash160);
        assert!("Hash161".parse::<ContractParamType>().is_err());
        assert_eq!(ContractParamType::from_u8(0x16), Some(ContractParamType::PublicKey));
        assert_eq!(ContractParamType::Void as u8, 0xff);
        Ok(())
    }
}
