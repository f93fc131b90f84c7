//! Script encodings: whitespace separated ASM text and a compact bytecode.
//!
//! In bytecode every opcode is its single byte value, while literals are length prefixed:
//! `0x01..=0x4b` carry the length directly, `0x4c` is followed by a one byte length and `0x4d`
//! by a two byte little endian length. Literal payloads are UTF-8 text.

use crate::TxScriptError;
use crate::opcodes::OpCode;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Selects the encoding of a buffer handed to [`decode`]
pub const ASM_FLAG_BYTECODE: u8 = 0x00;
pub const ASM_FLAG_TEXT: u8 = 0x01;

const OP_DATA_MAX: u8 = 0x4b;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScriptToken {
    Op(OpCode),
    Data(String),
}

impl Display for ScriptToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptToken::Op(opcode) => write!(f, "{opcode}"),
            ScriptToken::Data(data) => f.write_str(data),
        }
    }
}

impl FromStr for ScriptToken {
    type Err = TxScriptError;

    /// Tokens starting with `OP_` (in any case) must name a known opcode, anything else is a literal.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("OP_") => Ok(ScriptToken::Op(token.parse()?)),
            _ => Ok(ScriptToken::Data(token.to_string())),
        }
    }
}

impl From<OpCode> for ScriptToken {
    fn from(opcode: OpCode) -> Self {
        ScriptToken::Op(opcode)
    }
}

pub fn parse_asm(script: &str) -> Result<Vec<ScriptToken>, TxScriptError> {
    script.split_whitespace().map(ScriptToken::from_str).collect()
}

pub fn to_asm(tokens: &[ScriptToken]) -> String {
    tokens.iter().join(" ")
}

/// Decodes a script buffer according to `flag`
pub fn decode(buffer: &[u8], flag: u8) -> Result<Vec<ScriptToken>, TxScriptError> {
    match flag {
        ASM_FLAG_BYTECODE => decode_bytecode(buffer),
        ASM_FLAG_TEXT => parse_asm(std::str::from_utf8(buffer).map_err(|_| TxScriptError::MalformedPushData)?),
        flag => Err(TxScriptError::InvalidAsmFlag(flag)),
    }
}

fn take<'a>(buffer: &'a [u8], offset: usize, length: usize) -> Result<&'a [u8], TxScriptError> {
    let remaining = buffer.len() - offset;
    match remaining >= length {
        true => Ok(&buffer[offset..offset + length]),
        false => Err(TxScriptError::MalformedPush(length, remaining)),
    }
}

fn decode_bytecode(buffer: &[u8]) -> Result<Vec<ScriptToken>, TxScriptError> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    while offset < buffer.len() {
        let byte = buffer[offset];
        offset += 1;
        let length = match byte {
            1..=OP_DATA_MAX => byte as usize,
            OP_PUSHDATA1 => {
                let length = take(buffer, offset, 1)?[0] as usize;
                offset += 1;
                length
            }
            OP_PUSHDATA2 => {
                let bytes = take(buffer, offset, 2)?;
                offset += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            _ => {
                let opcode = OpCode::from_value(byte).ok_or_else(|| TxScriptError::InvalidOpcode(format!("{byte:#04x}")))?;
                tokens.push(ScriptToken::Op(opcode));
                continue;
            }
        };
        let data = take(buffer, offset, length)?;
        offset += length;
        let data = std::str::from_utf8(data).map_err(|_| TxScriptError::MalformedPushData)?;
        tokens.push(ScriptToken::Data(data.to_string()));
    }
    Ok(tokens)
}

/// Encodes tokens to bytecode with the shortest push prefix for each literal
pub fn encode(tokens: &[ScriptToken]) -> Result<Vec<u8>, TxScriptError> {
    let mut buffer = Vec::new();
    for token in tokens {
        match token {
            ScriptToken::Op(opcode) => buffer.push(opcode.value()),
            ScriptToken::Data(data) => {
                let bytes = data.as_bytes();
                match bytes.len() {
                    len @ 1..=0x4b => buffer.push(len as u8),
                    len @ (0 | 0x4c..=0xff) => buffer.extend([OP_PUSHDATA1, len as u8]),
                    len if len <= u16::MAX as usize => {
                        buffer.push(OP_PUSHDATA2);
                        buffer.extend((len as u16).to_le_bytes());
                    }
                    len => return Err(TxScriptError::ElementTooBig(len, u16::MAX as usize)),
                }
                buffer.extend_from_slice(bytes);
            }
        }
    }
    Ok(buffer)
}
