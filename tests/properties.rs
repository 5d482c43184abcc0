//! Property-based tests for the script codec.
//!
//! Properties covered:
//!   - Splitting a script into tokens and writing them back is lossless.
//!   - Integer pushes use the smallest available encoding.
//!   - Calls built by the assembler decompile to the same calls.
//!   - Multisig checks cost one signature check per required signature.
//!   - Fees of concatenated scripts add up, signature checks included.
//!   - Multisig scripts expose their threshold and keys.
//!   - Disassembly listings assemble back to the same script.

use neovm_asm::{
    construct_multisig_verification_script, create_script, disassemble,
    get_public_keys_from_verification_script, get_signing_threshold_from_verification_script,
    is_multisig_contract, is_signature_contract, signature_verification_script,
    tokens_to_script, CallIntent, Code, ContractParam, FeeCalculator, OpCode, OpToken,
    PublicKey, ScriptBuilder, ScriptParser, UInt160,
};
use num_bigint::BigInt;
use proptest::prelude::*;

const SIMPLE_OPS: [OpCode; 8] = [
    OpCode::NOP,
    OpCode::DUP,
    OpCode::DROP,
    OpCode::SWAP,
    OpCode::ADD,
    OpCode::PUSHNULL,
    OpCode::PUSHT,
    OpCode::PUSHF,
];

#[derive(Debug, Clone)]
enum Item {
    Int(i128),
    Data(Vec<u8>),
    Op(usize),
    CheckSig(PublicKey),
    CheckMultisig(usize, Vec<PublicKey>),
}

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![
        4 => any::<i128>().prop_map(Item::Int),
        4 => proptest::collection::vec(any::<u8>(), 1..300).prop_map(Item::Data),
        4 => (0..SIMPLE_OPS.len()).prop_map(Item::Op),
        1 => public_key().prop_map(Item::CheckSig),
        1 => proptest::collection::vec(public_key(), 1..=20)
            .prop_flat_map(|keys| (1..=keys.len(), Just(keys)))
            .prop_map(|(threshold, keys)| Item::CheckMultisig(threshold, keys)),
    ]
}

fn build_script(items: &[Item]) -> Vec<u8> {
    let mut builder = ScriptBuilder::new();
    for item in items {
        match item {
            Item::Int(value) => {
                builder.emit_number(&BigInt::from(*value)).unwrap();
            }
            Item::Data(bytes) => {
                builder.emit_bytes(bytes).unwrap();
            }
            Item::Op(index) => {
                builder.emit(SIMPLE_OPS[*index], None);
            }
            Item::CheckSig(key) => {
                let mut script = builder.build();
                script.extend(signature_verification_script(key).unwrap());
                builder = ScriptBuilder::from_script(script);
            }
            Item::CheckMultisig(threshold, keys) => {
                let mut script = builder.build();
                script.extend(construct_multisig_verification_script(*threshold, keys).unwrap());
                builder = ScriptBuilder::from_script(script);
            }
        }
    }
    builder.build()
}

fn arg() -> impl Strategy<Value = ContractParam> {
    let leaf = prop_oneof![
        Just(ContractParam::any()),
        any::<bool>().prop_map(ContractParam::boolean),
        any::<i128>().prop_map(ContractParam::integer),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(ContractParam::ByteArray),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        proptest::collection::vec(inner, 0..4).prop_map(ContractParam::array)
    })
}

fn intent() -> impl Strategy<Value = CallIntent> {
    (
        any::<[u8; 20]>(),
        "[a-zA-Z]{1,16}",
        proptest::collection::vec(arg(), 0..6),
    )
        .prop_map(|(hash, operation, args)| CallIntent::new(UInt160(hash), operation).with_args(args))
}

fn public_key() -> impl Strategy<Value = PublicKey> {
    (any::<bool>(), any::<[u8; 32]>()).prop_map(|(odd, x)| {
        let mut key = [0u8; 33];
        key[0] = if odd { 0x03 } else { 0x02 };
        key[1..].copy_from_slice(&x);
        PublicKey(key)
    })
}

/// Smallest operand width holding a signed value.
fn min_width(value: i128) -> usize {
    [1usize, 2, 4, 8, 16]
        .into_iter()
        .find(|&width| {
            let bits = width as u32 * 8;
            bits == 128 || (value >= -(1i128 << (bits - 1)) && value < (1i128 << (bits - 1)))
        })
        .unwrap_or(16)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_tokens_roundtrip(items in proptest::collection::vec(item(), 0..32)) {
        let script = build_script(&items);
        let tokens = OpToken::from_script(&script).unwrap();
        prop_assert_eq!(tokens_to_script(&tokens).unwrap(), script);

        let size = tokens.iter().map(OpToken::size).sum::<usize>();
        prop_assert_eq!(size, tokens_to_script(&tokens).unwrap().len());
    }

    #[test]
    fn prop_integer_push_is_minimal(value in any::<i128>()) {
        let token = OpToken::for_integer(value).unwrap();
        prop_assert_eq!(token.parse_int().unwrap(), BigInt::from(value));

        if (-1..=16).contains(&value) {
            prop_assert!(token.operand.is_none(), "small ints are single opcodes");
            prop_assert_eq!(token.size(), 1);
        } else {
            let operand = token.operand.as_deref().unwrap_or_default();
            prop_assert_eq!(operand.len(), min_width(value));
        }

        let mut builder = ScriptBuilder::new();
        builder.emit_number(&BigInt::from(value)).unwrap();
        prop_assert_eq!(builder.build(), token.to_bytes().unwrap());
    }

    #[test]
    fn prop_calls_decompile(intents in proptest::collection::vec(intent(), 1..4)) {
        let script = create_script(&intents).unwrap();
        let decompiled = ScriptParser::new(&script).to_script_params().unwrap();
        prop_assert_eq!(decompiled, intents);
    }

    #[test]
    fn prop_fee_of_checks(
        (threshold, keys) in proptest::collection::vec(public_key(), 1..=20)
            .prop_flat_map(|keys| (1..=keys.len(), Just(keys)))
    ) {
        let calculator = FeeCalculator::new(1u32);
        let single = signature_verification_script(&keys[0]).unwrap();
        let check_sig = calculator.calculate_script(&single).unwrap() - OpCode::PUSHDATA1.price();

        let multisig = construct_multisig_verification_script(threshold, &keys).unwrap();
        let multisig = calculator.calculate_script(&multisig).unwrap();

        let pushes = OpCode::PUSHDATA1.price() * keys.len() as u64
            + OpToken::for_integer(threshold).unwrap().code.price()
            + OpToken::for_integer(keys.len()).unwrap().code.price();
        prop_assert_eq!(multisig, check_sig * threshold + pushes);
    }

    #[test]
    fn prop_fees_are_additive(
        a in proptest::collection::vec(item(), 0..16),
        b in proptest::collection::vec(item(), 0..16),
    ) {
        let calculator = FeeCalculator::default();
        let (a, b) = (build_script(&a), build_script(&b));

        let joined = [a.as_slice(), b.as_slice()].concat();
        let total = calculator.calculate_script(&joined).unwrap();
        let parts = calculator.calculate_script(&a).unwrap()
            + calculator.calculate_script(&b).unwrap();
        prop_assert_eq!(total, parts);
    }

    #[test]
    fn prop_multisig_roundtrip(
        (threshold, keys) in proptest::collection::vec(public_key(), 1..=20)
            .prop_flat_map(|keys| (1..=keys.len(), Just(keys)))
    ) {
        let script = construct_multisig_verification_script(threshold, &keys).unwrap();
        prop_assert!(is_multisig_contract(&script));
        prop_assert!(!is_signature_contract(&script));
        prop_assert_eq!(get_signing_threshold_from_verification_script(&script).unwrap(), threshold);
        prop_assert_eq!(get_public_keys_from_verification_script(&script).unwrap(), keys);
    }

    #[test]
    fn prop_disasm_reassembles(items in proptest::collection::vec(item(), 0..32)) {
        let script = build_script(&items);
        let listing = disassemble(&script).unwrap();
        prop_assert_eq!(Code::assemble(&listing).unwrap(), script);
    }
}
