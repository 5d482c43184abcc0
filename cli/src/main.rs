use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use argh::FromArgs;
use console::style;
use neovm_asm::{FeeCalculator, ScriptParser, VerificationScript, DEFAULT_FEE_FACTOR};
use unicode_width::UnicodeWidthStr;

use crate::util::*;

mod util;

fn main() -> ExitCode {
    let ArgsOrVersion::<App>(app) = argh::from_env();
    init_logger();

    let res = match app.cmd {
        Cmd::Build(cmd) => cmd.run(),
        Cmd::Disasm(cmd) => cmd.run(),
        Cmd::Decompile(cmd) => cmd.run(),
        Cmd::Fee(cmd) => cmd.run(),
        Cmd::Classify(cmd) => cmd.run(),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {e}");
    }
}

/// Neo N3 VM assembler
#[derive(FromArgs)]
struct App {
    #[argh(subcommand)]
    cmd: Cmd,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Cmd {
    Build(CmdBuild),
    Disasm(CmdDisasm),
    Decompile(CmdDecompile),
    Fee(CmdFee),
    Classify(CmdClassify),
}

/// Assembles a listing into a hex encoded script
#[derive(FromArgs)]
#[argh(subcommand, name = "build")]
struct CmdBuild {
    /// path to the input file with assembly code
    #[argh(positional)]
    input: PathBuf,
    /// optional path to the output file
    #[argh(option, short = 'o')]
    out: Option<PathBuf>,
    /// output build info as JSON
    #[argh(switch)]
    json: bool,
}

impl CmdBuild {
    fn run(self) -> Result<()> {
        let code = std::fs::read_to_string(&self.input).with_context(|| {
            format!(
                "Failed to read assembly code from `{}`",
                self.input.display()
            )
        })?;

        let out = match self.out {
            Some(path) => path,
            None => {
                let mut out = self.input.clone();
                out.set_extension("hex");
                out
            }
        };
        anyhow::ensure!(self.input != out, "Output file must not be an input file");

        let span = tracing::info_span!("build", input = %self.input.display());
        let _guard = span.enter();
        tracing::debug!(len = code.len(), "parsing listing");

        let meta = SourceMeta::new(&code);

        let parsed = neovm_asm::Code::parse(&code);
        if !parsed.parser_errors().is_empty() {
            for error in parsed.parser_errors() {
                if let Some(error) = error.as_report(&self.input, &code, &meta) {
                    eprintln!("{error}\n");
                }
            }

            print_asm_errors(&self.input, &code, &meta, &parsed.check());
            anyhow::bail!("Build failed");
        }

        let parsed = parsed.try_into_valid()?;
        tracing::debug!(instructions = parsed.len(), "assembling");

        let script = match parsed.assemble() {
            Ok(script) => script,
            Err(_) => {
                print_asm_errors(&self.input, &code, &meta, &parsed.check());
                anyhow::bail!("Build failed");
            }
        };

        let mut file = std::fs::File::create(&out)
            .with_context(|| format!("Failed to open output file `{}`", out.display()))?;
        file.write_all(hex::encode(&script).as_bytes())
            .context("Failed to write the script")?;

        let fee = FeeCalculator::default().calculate_script(&script).ok();
        tracing::info!(size = script.len(), ?fee, "script assembled");

        if !self.json && std::io::stdin().is_terminal() {
            eprintln!(
                "Script path:\t{}\n\
                Script size:\t{}\n\
                Execution fee:\t{}",
                out.display(),
                script.len(),
                fee.map(|fee| fee.to_string())
                    .unwrap_or_else(|| "unknown".to_owned()),
            );
        } else {
            let output = serde_json::to_string_pretty(&serde_json::json!({
                "script_path": out.display().to_string(),
                "script": hex::encode(&script),
                "size": script.len(),
                "fee": fee.map(|fee| fee.to_string()),
            }))?;
            println!("{output}");
        }
        Ok(())
    }
}

/// Prints a script as an assembly listing
#[derive(FromArgs)]
#[argh(subcommand, name = "disasm")]
struct CmdDisasm {
    /// hex encoded script, `-` to read it from stdin
    #[argh(positional)]
    script: String,
}

impl CmdDisasm {
    fn run(self) -> Result<()> {
        let script = read_script(&self.script)?;
        tracing::debug!(size = script.len(), "disassembling");

        let listing = neovm_asm::disassemble(&script).context("Failed to disassemble")?;
        print!("{listing}");
        Ok(())
    }
}

/// Recovers contract calls from a script
#[derive(FromArgs)]
#[argh(subcommand, name = "decompile")]
struct CmdDecompile {
    /// hex encoded script, `-` to read it from stdin
    #[argh(positional)]
    script: String,
}

impl CmdDecompile {
    fn run(self) -> Result<()> {
        let script = read_script(&self.script)?;

        let intents = ScriptParser::new(&script)
            .to_script_params()
            .context("Failed to decompile the script")?;
        tracing::debug!(calls = intents.len(), "script decompiled");

        println!("{}", serde_json::to_string_pretty(&intents)?);
        Ok(())
    }
}

/// Estimates the execution fee of a script
#[derive(FromArgs)]
#[argh(subcommand, name = "fee")]
struct CmdFee {
    /// hex encoded script, `-` to read it from stdin
    #[argh(positional)]
    script: String,
    /// execution fee factor
    #[argh(option, default = "DEFAULT_FEE_FACTOR")]
    fee_factor: u32,
    /// size in bytes of stored items, required for `System.Storage.Put`
    #[argh(option)]
    storage_size: Option<u64>,
    /// output the fee as JSON
    #[argh(switch)]
    json: bool,
}

impl CmdFee {
    fn run(self) -> Result<()> {
        let script = read_script(&self.script)?;

        let mut calculator = FeeCalculator::new(self.fee_factor);
        if let Some(size) = self.storage_size {
            calculator = calculator.with_storage_size(size);
        }

        let tokens = neovm_asm::OpToken::from_script(&script).context("Invalid script")?;
        let base = calculator
            .base_cost(&tokens)
            .context("Failed to estimate the fee")?;
        let fee = &base * calculator.factor();
        tracing::debug!(tokens = tokens.len(), %base, %fee, "fee estimated");

        if self.json {
            let output = serde_json::to_string_pretty(&serde_json::json!({
                "base_cost": base.to_string(),
                "fee_factor": self.fee_factor,
                "fee": fee.to_string(),
            }))?;
            println!("{output}");
        } else {
            println!("{fee}");
        }
        Ok(())
    }
}

/// Detects standard verification scripts
#[derive(FromArgs)]
#[argh(subcommand, name = "classify")]
struct CmdClassify {
    /// hex encoded script, `-` to read it from stdin
    #[argh(positional)]
    script: String,
    /// output the result as JSON
    #[argh(switch)]
    json: bool,
}

impl CmdClassify {
    fn run(self) -> Result<()> {
        let script = read_script(&self.script)?;

        let output = match VerificationScript::classify(&script) {
            VerificationScript::Signature(key) => serde_json::json!({
                "type": "signature",
                "key": key,
            }),
            VerificationScript::Multisig { threshold, keys } => serde_json::json!({
                "type": "multisig",
                "threshold": threshold,
                "keys": keys,
            }),
            VerificationScript::Other => serde_json::json!({ "type": "other" }),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            match output["type"].as_str() {
                Some("signature") => println!("signature: {}", output["key"]),
                Some("multisig") => println!(
                    "multisig: {} of {}",
                    output["threshold"],
                    output["keys"].as_array().map(Vec::len).unwrap_or_default()
                ),
                _ => println!("other"),
            }
        }
        Ok(())
    }
}

fn read_script(arg: &str) -> Result<Vec<u8>> {
    let text = if arg == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read script from stdin")?;
        text
    } else {
        arg.to_owned()
    };

    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(text).context("Invalid hex script")
}

fn print_asm_errors(
    path: &Path,
    code: &str,
    meta: &SourceMeta,
    errors: &[neovm_asm::AsmError],
) {
    for error in errors {
        match error {
            neovm_asm::AsmError::Multiple(errors) => print_asm_errors(path, code, meta, errors),
            neovm_asm::AsmError::ArgTypeMismatch {
                found: neovm_asm::ArgType::Invalid,
                ..
            } => continue,
            _ => {
                if let Some(error) = error.as_report(path, code, meta) {
                    eprintln!("{error}\n");
                }
            }
        }
    }
}

trait AsReport {
    fn as_report<'a>(
        &'a self,
        path: &'a Path,
        code: &'a str,
        meta: &'a SourceMeta,
    ) -> Option<Report<'a>>;
}

impl AsReport for neovm_asm::ParserError {
    fn as_report<'a>(
        &'a self,
        path: &'a Path,
        code: &'a str,
        meta: &'a SourceMeta,
    ) -> Option<Report<'a>> {
        let span = self.span()?;
        Some(Report {
            start: meta.byte_index_to_position(span.start).ok()?,
            end: meta.byte_index_to_position(span.end).ok()?,
            file_name: path,
            code,
            origin: "parser",
            error: self,
        })
    }
}

impl AsReport for neovm_asm::AsmError {
    fn as_report<'a>(
        &'a self,
        path: &'a Path,
        code: &'a str,
        meta: &'a SourceMeta,
    ) -> Option<Report<'a>> {
        let span = self.span();
        Some(Report {
            start: meta.byte_index_to_position(span.start).ok()?,
            end: meta.byte_index_to_position(span.end).ok()?,
            file_name: path,
            code,
            origin: "asm",
            error: self,
        })
    }
}

struct Report<'a> {
    start: Position,
    end: Position,
    file_name: &'a Path,
    code: &'a str,
    origin: &'a str,
    error: &'a dyn std::fmt::Display,
}

impl std::fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let line_number = (self.start.line + 1).to_string();
        let offset_len = line_number.len();
        let offset = format!("{:offset_len$}", "");

        let arrow = style("-->").blue().bold();
        let block = style("|").blue().bold();
        let line_number = style(line_number).blue().bold();

        let line = self.code[self.start.first_char_pos..self.start.last_char_pos].trim_end();
        let word_start = std::cmp::min(self.start.character, line.len());
        let word_end = if self.end.line == self.start.line {
            self.end.character
        } else {
            line.len()
        };
        let word_end = word_end.clamp(word_start, line.len());
        let (line_start, rest) = line.split_at(word_start);
        let (underlined, line_end) = rest.split_at(word_end - word_start);

        let line_start_len = UnicodeWidthStr::width(line_start);
        let underlined_len = std::cmp::max(UnicodeWidthStr::width(underlined), 1);

        write!(
            f,
            "{}{}\n\
            {offset}{arrow} {}:{}:{}\n\
            {offset} {block}\n\
            {line_number} {block} {}{}{}\n\
            {offset} {block} {:line_start_len$}{}\n\
            {offset} {block}",
            style(format!("error[{}]: ", self.origin)).red(),
            style(self.error).bold(),
            self.file_name.display(),
            self.start.line + 1,
            self.start.character + 1,
            line_start,
            style(underlined).red(),
            line_end,
            "",
            style(format!("{:^>1$}", "", underlined_len)).red(),
        )
    }
}
