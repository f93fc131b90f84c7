use crate::{
    MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_TOKENS,
    asm::{self, ScriptToken},
    data_stack::serialize_number,
    opcodes::OpCode,
};
use num_bigint::BigInt;
use thiserror::Error;

/// DEFAULT_SCRIPT_ALLOC is the default number of tokens reserved for a script
/// being built by the ScriptBuilder. The vector grows as needed.
const DEFAULT_SCRIPT_ALLOC: usize = 32;

#[derive(Error, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ScriptBuilderError {
    #[error("adding opcode {0} would exceed the maximum allowed script length of {MAX_SCRIPT_TOKENS} tokens")]
    OpCodeRejected(OpCode),

    #[error("adding {0} opcodes would exceed the maximum allowed script length of {MAX_SCRIPT_TOKENS} tokens")]
    OpCodesRejected(usize),

    #[error("adding data would exceed the maximum allowed script length of {MAX_SCRIPT_TOKENS} tokens")]
    DataRejected,

    #[error("adding a data element of {0} characters exceeds the maximum allowed script element size of {MAX_SCRIPT_ELEMENT_SIZE}")]
    ElementExceedsMaxSize(usize),

    #[error("adding integer {0} would exceed the maximum allowed script length of {MAX_SCRIPT_TOKENS} tokens")]
    IntegerRejected(i64),
}
pub type ScriptBuilderResult<T> = std::result::Result<T, ScriptBuilderError>;

/// ScriptBuilder provides a facility for building custom scripts. It allows
/// you to push opcodes, numbers and data while respecting canonical encoding. In
/// general it does not ensure the script will execute correctly, however any
/// pushes which would exceed the script engine limits and are therefore
/// guaranteed not to execute are rejected.
///
/// For example, the following builds a settlement window check:
///
/// ```
/// use collider_txscript::opcodes::OpCode::*;
/// use collider_txscript::script_builder::{ScriptBuilderResult, ScriptBuilder};
/// fn build_deposit_window(deposit: i64, settle: i64) -> ScriptBuilderResult<String> {
///     Ok(ScriptBuilder::new()
///         .add_i64(0)?
///         .add_i64(0)?
///         .add_i64(deposit)?
///         .add_i64(settle)?
///         .add_op(OpDepSet)?
///         .add_i64(2)?
///         .add_op(OpNumEqual)?
///         .to_asm())
/// }
/// assert_eq!(build_deposit_window(0x32, 0x64).unwrap(), "OP_0 OP_0 32 64 OP_DEPSET OP_2 OP_NUMEQUAL");
/// ```
pub struct ScriptBuilder {
    script: Vec<ScriptToken>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self { script: Vec::with_capacity(DEFAULT_SCRIPT_ALLOC) }
    }

    pub fn script(&self) -> &[ScriptToken] {
        &self.script
    }

    pub fn drain(&mut self) -> Vec<ScriptToken> {
        std::mem::take(&mut self.script)
    }

    /// Pushes the passed opcode to the end of the script. The script will not
    /// be modified if pushing the opcode would exceed the maximum script length.
    pub fn add_op(&mut self, opcode: OpCode) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() >= MAX_SCRIPT_TOKENS {
            return Err(ScriptBuilderError::OpCodeRejected(opcode));
        }

        self.script.push(opcode.into());
        Ok(self)
    }

    pub fn add_ops(&mut self, opcodes: &[OpCode]) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() + opcodes.len() > MAX_SCRIPT_TOKENS {
            return Err(ScriptBuilderError::OpCodesRejected(opcodes.len()));
        }

        self.script.extend(opcodes.iter().copied().map(ScriptToken::from));
        Ok(self)
    }

    /// Pushes a literal. Literals longer than [`MAX_SCRIPT_ELEMENT_SIZE`] are rejected since
    /// the engine refuses to execute them.
    pub fn add_data(&mut self, data: &str) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() >= MAX_SCRIPT_TOKENS {
            return Err(ScriptBuilderError::DataRejected);
        }
        if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptBuilderError::ElementExceedsMaxSize(data.len()));
        }

        self.script.push(ScriptToken::Data(data.to_string()));
        Ok(self)
    }

    /// Pushes a number, using OP_0..OP_3 and OP_1NEGATE where one fits.
    pub fn add_i64(&mut self, val: i64) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() >= MAX_SCRIPT_TOKENS {
            return Err(ScriptBuilderError::IntegerRejected(val));
        }

        let opcode = match val {
            -1 => Some(OpCode::Op1Negate),
            0 => Some(OpCode::Op0),
            1 => Some(OpCode::Op1),
            2 => Some(OpCode::Op2),
            3 => Some(OpCode::Op3),
            _ => None,
        };
        match opcode {
            Some(opcode) => self.add_op(opcode),
            None => self.add_data(&serialize_number(&BigInt::from(val))),
        }
    }

    /// Pushes an arbitrary precision number in its canonical hex form.
    pub fn add_number(&mut self, val: &BigInt) -> ScriptBuilderResult<&mut Self> {
        self.add_data(&serialize_number(val))
    }

    pub fn to_asm(&self) -> String {
        asm::to_asm(&self.script)
    }

    /// Bytecode encoding of the script, see [`asm::encode`]
    pub fn to_bytes(&self) -> Vec<u8> {
        asm::encode(&self.script).expect("script elements are bounded by MAX_SCRIPT_ELEMENT_SIZE")
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
