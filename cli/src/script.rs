use anyhow::{Context, Result};
use clap::Subcommand;

use wasm_txbuilder::bitcoin::{PublicKey, ScriptBuf};
use wasm_txbuilder::control_block;
use wasm_txbuilder::opcodes::{script_from_asm, script_to_asm};

#[derive(Subcommand)]
pub enum ScriptCommand {
    /// Disassemble a hex script into opcode names and pushes
    Asm {
        /// Script bytes as hex
        hex: String,
    },
    /// Assemble opcode names and hex pushes into script hex
    Compile {
        /// Space-separated tokens, e.g. "OP_DUP OP_HASH160 <hex> OP_EQUALVERIFY OP_CHECKSIG"
        asm: String,
    },
    /// Serialize a taproot control block for a script-path spend
    ControlBlock {
        /// Internal public key (33-byte compressed hex)
        public_key: String,
        /// Concatenated 32-byte merkle path hashes as hex
        #[arg(default_value = "")]
        merkle_path: String,
    },
}

fn asm(hex_script: &str) -> Result<String> {
    let script = ScriptBuf::from_hex(hex_script).context("invalid script hex")?;
    Ok(script_to_asm(&script)?)
}

fn compile(asm: &str) -> Result<String> {
    Ok(script_from_asm(asm)?.to_hex_string())
}

fn build_control_block(public_key: &str, merkle_path: &str) -> Result<String> {
    let public_key: PublicKey = public_key.parse().context("invalid public key")?;
    let merkle_path = hex::decode(merkle_path).context("invalid merkle path hex")?;
    Ok(hex::encode(control_block::build(&public_key, &merkle_path)))
}

pub fn handle_command(command: ScriptCommand) -> Result<()> {
    let output = match command {
        ScriptCommand::Asm { hex } => asm(&hex)?,
        ScriptCommand::Compile { asm } => compile(&asm)?,
        ScriptCommand::ControlBlock {
            public_key,
            merkle_path,
        } => build_control_block(&public_key, &merkle_path)?,
    };
    println!("{}", output);
    Ok(())
}
