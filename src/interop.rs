use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use ahash::HashMap;

use crate::error::ScriptError;
use crate::util::decode_hex;

/// Identifier of a host function, as carried in the `SYSCALL` operand.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ServiceCode(pub [u8; 4]);

impl ServiceCode {
    /// `System.Contract.Call`
    pub const CONTRACT_CALL: Self = Self([0x62, 0x7d, 0x5b, 0x52]);
    /// `System.Crypto.CheckSig`
    pub const CHECK_SIG: Self = Self([0x56, 0xe7, 0xb3, 0x27]);
    /// `System.Crypto.CheckMultisig`
    pub const CHECK_MULTISIG: Self = Self([0x9e, 0xd0, 0xdc, 0x3a]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 4]>::try_from(bytes).ok().map(Self)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Known service with this code, if any.
    pub fn service(&self) -> Option<&'static InteropService> {
        InteropService::by_code(*self)
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service() {
            Some(service) => write!(f, "ServiceCode({self}, {})", service.name),
            None => write!(f, "ServiceCode({self})"),
        }
    }
}

impl FromStr for ServiceCode {
    type Err = ScriptError;

    /// Accepts either a service name or the hex encoded code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(service) = InteropService::by_name(s) {
            return Ok(service.code);
        }

        let bytes = decode_hex(s).map_err(|_| ScriptError::UnknownService(s.into()))?;
        Self::from_slice(&bytes).ok_or(ScriptError::InvalidLength {
            what: "service code",
            expected: 4,
            actual: bytes.len(),
        })
    }
}

/// How the price of a service call is computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServicePrice {
    Fixed(u64),
    /// Price for each byte of the stored item.
    PerByte(u64),
    /// `CheckSig` price for each required signature.
    PerSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropService {
    pub name: &'static str,
    pub code: ServiceCode,
    pub price: ServicePrice,
}

impl InteropService {
    pub fn all() -> &'static [InteropService] {
        SERVICES
    }

    pub fn by_code(code: ServiceCode) -> Option<&'static Self> {
        static MAP: OnceLock<HashMap<ServiceCode, &'static InteropService>> = OnceLock::new();
        MAP.get_or_init(|| SERVICES.iter().map(|s| (s.code, s)).collect())
            .get(&code)
            .copied()
    }

    pub fn by_name(name: &str) -> Option<&'static Self> {
        static MAP: OnceLock<HashMap<&'static str, &'static InteropService>> = OnceLock::new();
        MAP.get_or_init(|| SERVICES.iter().map(|s| (s.name, s)).collect())
            .get(name)
            .copied()
    }

    /// Price of the `CheckSig` service, the unit of multisig pricing.
    pub fn check_sig_price() -> u64 {
        CHECK_SIG_PRICE
    }
}

const CHECK_SIG_PRICE: u64 = 1 << 15;

macro_rules! services {
    ($($name:literal => [$($b:literal),+], $price:expr;)+) => {
        &[$(InteropService {
            name: $name,
            code: ServiceCode([$($b),+]),
            price: $price,
        }),+]
    };
}

use ServicePrice::{Fixed, PerByte, PerSignature};

static SERVICES: &[InteropService] = services! {
    "System.Contract.Call" => [0x62, 0x7d, 0x5b, 0x52], Fixed(1 << 15);
    "System.Contract.CallNative" => [0x1a, 0xf7, 0x7b, 0x67], Fixed(0);
    "System.Contract.GetCallFlags" => [0x95, 0xda, 0x3a, 0x81], Fixed(1 << 10);
    "System.Contract.CreateStandardAccount" => [0xcf, 0x99, 0x87, 0x02], Fixed(1 << 8);
    "System.Contract.CreateMultisigAccount" => [0x6a, 0x33, 0xe9, 0x09], Fixed(1 << 8);

    "System.Crypto.CheckSig" => [0x56, 0xe7, 0xb3, 0x27], Fixed(CHECK_SIG_PRICE);
    "System.Crypto.CheckMultisig" => [0x9e, 0xd0, 0xdc, 0x3a], PerSignature;

    "System.Iterator.Next" => [0x9c, 0x08, 0xed, 0x9c], Fixed(1 << 15);
    "System.Iterator.Value" => [0xf3, 0x54, 0xbf, 0x1d], Fixed(1 << 4);

    "System.Runtime.Platform" => [0xb2, 0x79, 0xfc, 0xf6], Fixed(1 << 3);
    "System.Runtime.GetNetwork" => [0xc5, 0xfb, 0xa0, 0xe0], Fixed(1 << 3);
    "System.Runtime.GetTrigger" => [0xe9, 0x7d, 0x38, 0xa0], Fixed(1 << 3);
    "System.Runtime.GetTime" => [0xb7, 0xc3, 0x88, 0x03], Fixed(1 << 3);
    "System.Runtime.GetScriptContainer" => [0x2d, 0x51, 0x08, 0x30], Fixed(1 << 3);
    "System.Runtime.GetExecutingScriptHash" => [0xdb, 0xfe, 0xa8, 0x74], Fixed(1 << 4);
    "System.Runtime.GetCallingScriptHash" => [0x39, 0x53, 0x6e, 0x3c], Fixed(1 << 4);
    "System.Runtime.GetEntryScriptHash" => [0xf9, 0xb4, 0xe2, 0x38], Fixed(1 << 4);
    "System.Runtime.CheckWitness" => [0xf8, 0x27, 0xec, 0x8c], Fixed(1 << 10);
    "System.Runtime.GetInvocationCounter" => [0x84, 0x27, 0x11, 0x43], Fixed(1 << 4);
    "System.Runtime.Log" => [0xcf, 0xe7, 0x47, 0x96], Fixed(1 << 15);
    "System.Runtime.Notify" => [0x95, 0x01, 0x6f, 0x61], Fixed(1 << 15);
    "System.Runtime.GetNotifications" => [0x27, 0x43, 0x35, 0xf1], Fixed(1 << 12);
    "System.Runtime.GasLeft" => [0x14, 0x88, 0xd8, 0xce], Fixed(1 << 4);
    "System.Runtime.BurnGas" => [0xc3, 0x5a, 0x8c, 0xbc], Fixed(1 << 4);

    "System.Storage.GetContext" => [0x9b, 0xf6, 0x67, 0xce], Fixed(1 << 4);
    "System.Storage.GetReadOnlyContext" => [0xf6, 0xb4, 0x6b, 0xe2], Fixed(1 << 4);
    "System.Storage.AsReadOnly" => [0x76, 0x4c, 0xbf, 0xe9], Fixed(1 << 4);
    "System.Storage.Get" => [0x92, 0x5d, 0xe8, 0x31], Fixed(1 << 15);
    "System.Storage.Find" => [0xdf, 0x30, 0xb8, 0x9a], Fixed(1 << 15);
    "System.Storage.Put" => [0xe6, 0x3f, 0x18, 0x84], PerByte(100_000);
    "System.Storage.Delete" => [0x2f, 0x58, 0xc5, 0xed], Fixed(1 << 15);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() -> anyhow::Result<()> {
        let call = InteropService::by_code(ServiceCode::CONTRACT_CALL).unwrap();
        assert_eq!(call.name, "System.Contract.Call");
        assert_eq!(call.price, ServicePrice::Fixed(32768));

        let put = InteropService::by_name("System.Storage.Put").unwrap();
        assert_eq!(put.code.to_string(), "e63f1884");
        assert_eq!(put.price, ServicePrice::PerByte(100_000));

        assert_eq!(
            "System.Crypto.CheckMultisig".parse::<ServiceCode>()?,
            ServiceCode::CHECK_MULTISIG
        );
        assert_eq!("56e7b327".parse::<ServiceCode>()?, ServiceCode::CHECK_SIG);
        assert!("System.Nope".parse::<ServiceCode>().is_err());
        assert!("0102".parse::<ServiceCode>().is_err());
        assert!(InteropService::by_code(ServiceCode([0; 4])).is_none());
        Ok(())
    }

    #[test]
    fn table_has_unique_entries() {
        let services = InteropService::all();
        for (i, a) in services.iter().enumerate() {
            for b in &services[i + 1..] {
                assert_ne!(a.code, b.code, "{} / {}", a.name, b.name);
                assert_ne!(a.name, b.name);
            }
        }
    }
}
