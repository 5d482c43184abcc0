use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::ScriptError;
use crate::interop::{InteropService, ServiceCode, ServicePrice};
use crate::opcode::OpCode;
use crate::token::OpToken;

/// Default N3 execution fee factor.
pub const DEFAULT_FEE_FACTOR: u32 = 30;

/// Estimates execution fees of finished scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeCalculator {
    factor: BigUint,
    storage_size: Option<u64>,
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_FACTOR)
    }
}

impl FeeCalculator {
    pub fn new<T: Into<BigUint>>(factor: T) -> Self {
        Self {
            factor: factor.into(),
            storage_size: None,
        }
    }

    /// Sets the item size used to price `System.Storage.Put`.
    pub fn with_storage_size(mut self, size: u64) -> Self {
        self.storage_size = Some(size);
        self
    }

    pub fn factor(&self) -> &BigUint {
        &self.factor
    }

    /// Total fee of the script in datoshi.
    pub fn calculate(&self, tokens: &[OpToken]) -> Result<BigUint, ScriptError> {
        Ok(self.base_cost(tokens)? * &self.factor)
    }

    pub fn calculate_script(&self, script: &[u8]) -> Result<BigUint, ScriptError> {
        self.calculate(&OpToken::from_script(script)?)
    }

    /// Sum of instruction and service prices before the fee factor is applied.
    pub fn base_cost(&self, tokens: &[OpToken]) -> Result<BigUint, ScriptError> {
        let mut total = BigUint::zero();
        for index in 0..tokens.len() {
            total += self.token_cost(tokens, index)?;
        }
        Ok(total)
    }

    fn token_cost(&self, tokens: &[OpToken], index: usize) -> Result<BigUint, ScriptError> {
        let token = &tokens[index];
        let mut cost = BigUint::from(token.code.price());

        let service_code = match (token.code, token.operand.as_deref()) {
            (OpCode::SYSCALL, Some(operand)) => ServiceCode::from_slice(operand),
            _ => None,
        };
        // Malformed service operands are priced as a plain instruction
        let Some(code) = service_code else {
            return Ok(cost);
        };

        let service = InteropService::by_code(code)
            .ok_or_else(|| ScriptError::UnknownService(code.to_string().into()))?;

        match service.price {
            ServicePrice::Fixed(price) => cost += price,
            ServicePrice::PerByte(price) => {
                let size = self
                    .storage_size
                    .ok_or(ScriptError::MissingServiceParam(service.name))?;
                cost += BigUint::from(size) * price;
            }
            ServicePrice::PerSignature => {
                let threshold = multisig_threshold(tokens, index)?;
                cost += BigUint::from(threshold) * InteropService::check_sig_price();
            }
        }

        Ok(cost)
    }
}

/// Total fee of `script` with the specified fee factor.
pub fn calculate_execution_fee(script: &[u8], factor: u32) -> Result<BigUint, ScriptError> {
    FeeCalculator::new(factor).calculate_script(script)
}

/// Finds the signing threshold of the `CheckMultisig` call at `index`.
///
/// Expects `<threshold> <key>{n} <n> SYSCALL` right before the call.
fn multisig_threshold(tokens: &[OpToken], index: usize) -> Result<u64, ScriptError> {
    const MALFORMED: ScriptError = ScriptError::StructuralMismatch("malformed multisig check");

    let int_at = |i: Option<usize>| -> Result<u64, ScriptError> {
        let token = i.and_then(|i| tokens.get(i)).ok_or(MALFORMED)?;
        token.parse_int()?.to_u64().ok_or(MALFORMED)
    };

    let key_count = int_at(index.checked_sub(1))?;
    let threshold_index = usize::try_from(key_count)
        .ok()
        .and_then(|key_count| index.checked_sub(key_count)?.checked_sub(2));
    int_at(threshold_index)
}
