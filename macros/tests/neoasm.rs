use neovm_asm_macros::neoasm;

#[test]
fn contract_call() {
    const SCRIPT: &[u8] = neoasm!(
        "PUSH0",
        "PACK",
        r#"PUSHDATA "symbol""#,
        "PUSHINT 15 // all call flags",
        "PUSHDATA x{f563ea40bc283d4d0e05c48ea305b3f2a07340ef}",
        "SYSCALL System.Contract.Call",
    );

    assert_eq!(
        hex::encode(SCRIPT),
        "10c00c0673796d626f6c1f0c14f563ea40bc283d4d0e05c48ea305b3f2a07340ef41627d5b52"
    );
}

#[test]
fn matches_runtime_assembler() -> anyhow::Result<()> {
    let script = neoasm!("NOP", "JMP 3", "ABORT", "PUSH1", "RET");
    assert_eq!(
        script.as_slice(),
        neovm_asm::Code::assemble("NOP\nJMP 3\nABORT\nPUSH1\nRET")?
    );
    Ok(())
}

#[test]
fn empty_listing() {
    let script: &[u8] = neoasm!();
    assert!(script.is_empty());
}
