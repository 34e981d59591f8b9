//! Static opcode table and transaction constants.
//!
//! The forward table maps every mnemonic to its byte value. Two byte values
//! carry two mnemonics each (177 is both `OP_NOP2` and `OP_CHECKLOCKTIMEVERIFY`,
//! 178 is both `OP_NOP3` and `OP_CHECKSEQUENCEVERIFY`). Both forward entries are
//! kept; the reverse lookup is last-entry-wins, so it yields the timelock names.
//! Which meaning applies is decided by script position, not by this table.

use crate::bitcoin::blockdata::opcodes::Opcode;
use crate::bitcoin::blockdata::script::{Builder, Instruction, PushBytesBuf};
use crate::bitcoin::{Script, ScriptBuf};
use crate::error::TxBuilderError;

pub const OPCODES: &[(&str, u8)] = &[
    ("OP_0", 0),
    ("OP_PUSHDATA1", 76),
    ("OP_PUSHDATA2", 77),
    ("OP_PUSHDATA4", 78),
    ("OP_1NEGATE", 79),
    ("OP_RESERVED", 80),
    ("OP_1", 81),
    ("OP_2", 82),
    ("OP_3", 83),
    ("OP_4", 84),
    ("OP_5", 85),
    ("OP_6", 86),
    ("OP_7", 87),
    ("OP_8", 88),
    ("OP_9", 89),
    ("OP_10", 90),
    ("OP_11", 91),
    ("OP_12", 92),
    ("OP_13", 93),
    ("OP_14", 94),
    ("OP_15", 95),
    ("OP_16", 96),
    ("OP_NOP", 97),
    ("OP_VER", 98),
    ("OP_IF", 99),
    ("OP_NOTIF", 100),
    ("OP_VERIF", 101),
    ("OP_VERNOTIF", 102),
    ("OP_ELSE", 103),
    ("OP_ENDIF", 104),
    ("OP_VERIFY", 105),
    ("OP_RETURN", 106),
    ("OP_TOALTSTACK", 107),
    ("OP_FROMALTSTACK", 108),
    ("OP_2DROP", 109),
    ("OP_2DUP", 110),
    ("OP_3DUP", 111),
    ("OP_2OVER", 112),
    ("OP_2ROT", 113),
    ("OP_2SWAP", 114),
    ("OP_IFDUP", 115),
    ("OP_DEPTH", 116),
    ("OP_DROP", 117),
    ("OP_DUP", 118),
    ("OP_NIP", 119),
    ("OP_OVER", 120),
    ("OP_PICK", 121),
    ("OP_ROLL", 122),
    ("OP_ROT", 123),
    ("OP_SWAP", 124),
    ("OP_TUCK", 125),
    ("OP_CAT", 126),
    ("OP_SUBSTR", 127),
    ("OP_LEFT", 128),
    ("OP_RIGHT", 129),
    ("OP_SIZE", 130),
    ("OP_INVERT", 131),
    ("OP_AND", 132),
    ("OP_OR", 133),
    ("OP_XOR", 134),
    ("OP_EQUAL", 135),
    ("OP_EQUALVERIFY", 136),
    ("OP_RESERVED1", 137),
    ("OP_RESERVED2", 138),
    ("OP_1ADD", 139),
    ("OP_1SUB", 140),
    ("OP_2MUL", 141),
    ("OP_2DIV", 142),
    ("OP_NEGATE", 143),
    ("OP_ABS", 144),
    ("OP_NOT", 145),
    ("OP_0NOTEQUAL", 146),
    ("OP_ADD", 147),
    ("OP_SUB", 148),
    ("OP_MUL", 149),
    ("OP_DIV", 150),
    ("OP_MOD", 151),
    ("OP_LSHIFT", 152),
    ("OP_RSHIFT", 153),
    ("OP_BOOLAND", 154),
    ("OP_BOOLOR", 155),
    ("OP_NUMEQUAL", 156),
    ("OP_NUMEQUALVERIFY", 157),
    ("OP_NUMNOTEQUAL", 158),
    ("OP_LESSTHAN", 159),
    ("OP_GREATERTHAN", 160),
    ("OP_LESSTHANOREQUAL", 161),
    ("OP_GREATERTHANOREQUAL", 162),
    ("OP_MIN", 163),
    ("OP_MAX", 164),
    ("OP_WITHIN", 165),
    ("OP_RIPEMD160", 166),
    ("OP_SHA1", 167),
    ("OP_SHA256", 168),
    ("OP_HASH160", 169),
    ("OP_HASH256", 170),
    ("OP_CODESEPARATOR", 171),
    ("OP_CHECKSIG", 172),
    ("OP_CHECKSIGVERIFY", 173),
    ("OP_CHECKMULTISIG", 174),
    ("OP_CHECKMULTISIGVERIFY", 175),
    ("OP_NOP1", 176),
    ("OP_NOP2", 177),
    ("OP_CHECKLOCKTIMEVERIFY", 177),
    ("OP_NOP3", 178),
    ("OP_CHECKSEQUENCEVERIFY", 178),
    ("OP_NOP4", 179),
    ("OP_NOP5", 180),
    ("OP_NOP6", 181),
    ("OP_NOP7", 182),
    ("OP_NOP8", 183),
    ("OP_NOP9", 184),
    ("OP_NOP10", 185),
    ("OP_CHECKSIGADD", 186),
    ("OP_PUBKEYHASH", 253),
    ("OP_PUBKEY", 254),
    ("OP_INVALIDOPCODE", 255),
];

// Sighash flags
pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_FORKID: u32 = 0x40;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
pub const SIGHASH_BASE_MASK: u32 = 0x1f;

// Transaction version and sequence defaults, little-endian as serialized.
pub const DEFAULT_VERSION: [u8; 4] = [0x02, 0x00, 0x00, 0x00];
pub const LEGACY_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
pub const DEFAULT_SEQUENCE: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
pub const LOCKTIME_SEQUENCE: [u8; 4] = [0xfe, 0xff, 0xff, 0xff];
pub const RBF_SEQUENCE: [u8; 4] = [0xfd, 0xff, 0xff, 0xff];

/// Consensus limit on a single push, and so on a P2SH redeem script.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Lock time values below this are block heights, at or above are unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// How an absolute lock time value is interpreted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TimelockType {
    BlockHeight,
    Timestamp,
}

impl TimelockType {
    pub fn of(lock_time: u32) -> TimelockType {
        if lock_time < LOCKTIME_THRESHOLD {
            TimelockType::BlockHeight
        } else {
            TimelockType::Timestamp
        }
    }
}

// Script type tags
pub const TAG_P2PK: &str = "p2pk";
pub const TAG_P2PKH: &str = "p2pkh";
pub const TAG_P2SH_P2PK: &str = "p2shP2pk";
pub const TAG_P2SH_P2PKH: &str = "p2shP2pkh";
pub const TAG_P2WPKH: &str = "p2wpkh";
pub const TAG_P2SH_P2WPKH: &str = "p2shP2wpkh";
pub const TAG_P2SH: &str = "p2sh";
pub const TAG_P2WSH: &str = "p2wsh";
pub const TAG_P2SH_P2WSH: &str = "p2shP2wsh";

/// Byte value for a mnemonic.
pub fn opcode_by_name(name: &str) -> Option<u8> {
    OPCODES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| *value)
}

/// Mnemonic for a byte value. Colliding values resolve to the last table entry.
pub fn name_by_opcode(value: u8) -> Option<&'static str> {
    OPCODES
        .iter()
        .rev()
        .find(|(_, v)| *v == value)
        .map(|(name, _)| *name)
}

/// Render a script as space separated mnemonics and hex pushes.
pub fn script_to_asm(script: &Script) -> Result<String, TxBuilderError> {
    let mut parts = Vec::new();
    for instruction in script.instructions() {
        let instruction =
            instruction.map_err(|e| TxBuilderError::InvalidScript(format!("{}", e)))?;
        match instruction {
            Instruction::PushBytes(bytes) if bytes.is_empty() => parts.push("OP_0".to_string()),
            Instruction::PushBytes(bytes) => parts.push(hex::encode(bytes.as_bytes())),
            Instruction::Op(op) => {
                let value = op.to_u8();
                parts.push(match name_by_opcode(value) {
                    Some(name) => name.to_string(),
                    None => format!("OP_UNKNOWN_{}", value),
                });
            }
        }
    }
    Ok(parts.join(" "))
}

/// Parse the output of [`script_to_asm`] back into a script.
pub fn script_from_asm(asm: &str) -> Result<ScriptBuf, TxBuilderError> {
    let mut builder = Builder::new();
    for token in asm.split_whitespace() {
        if let Some(value) = opcode_by_name(token) {
            builder = builder.push_opcode(Opcode::from(value));
            continue;
        }
        let bytes = hex::decode(token).map_err(|_| {
            TxBuilderError::InvalidScript(format!("'{}' is neither an opcode nor hex", token))
        })?;
        let push = PushBytesBuf::try_from(bytes)
            .map_err(|e| TxBuilderError::InvalidScript(format!("{}", e)))?;
        builder = builder.push_slice(push);
    }
    Ok(builder.into_script())
}
