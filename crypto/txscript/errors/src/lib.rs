use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum TxScriptError {
    #[error("data push requires {0} bytes, but script only has {1} remaining")]
    MalformedPush(usize, usize),
    #[error("data push is not valid UTF-8 text")]
    MalformedPushData,
    #[error("unknown script encoding flag {0:#04x}")]
    InvalidAsmFlag(u8),
    #[error("combined stack size {0} > max allowed {1}")]
    StackSizeExceeded(usize, usize),
    #[error("attempt to execute invalid opcode {0}")]
    InvalidOpcode(String),
    #[error("attempt to read from empty stack")]
    EmptyStack,
    #[error("opcode requires at least {0} but stack has only {1}")]
    InvalidStackOperation(usize, usize),
    // The final stack entry is false
    #[error("false stack entry at end of script execution")]
    EvalFalse,
    #[error("script returned early")]
    EarlyReturn,
    #[error("script ran, but verification failed")]
    VerifyError,
    #[error("malformed opcode arguments: {0}")]
    MalformedArgs(String),
    #[error("stack entry {0:?} is not a number")]
    NotANumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("opcode requires {0} in the script environment")]
    MissingEnvironment(&'static str),
    #[error("encountered invalid state while running script: {0}")]
    InvalidState(String),
    #[error("exceeded max operation limit of {0}")]
    TooManyOperations(usize),
    #[error("element size {0} exceeds max allowed size {1}")]
    ElementTooBig(usize, usize),
    #[error("script of {0} tokens exceeded maximum allowed size of {1}")]
    ScriptSize(usize, usize),
}
