#[macro_use]
mod macros;

use crate::data_stack::DataStack;
use crate::{MAX_SHIFT_BITS, NO_COST_OPCODE, TxScriptEngine, TxScriptError};
use collider_hashes::HashAlgorithm;
use core::cmp::{max, min};
use log::warn;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub(crate) type OpCodeResult = Result<(), TxScriptError>;

impl OpCode {
    /// Constant pushes do not count toward the operations limit
    pub fn is_push_opcode(self) -> bool {
        self.value() <= NO_COST_OPCODE
    }

    /// Reserved opcodes are part of the instruction set but execute as no-ops
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            OpCode::OpHttpStatus | OpCode::OpHttpSelect | OpCode::OpOrdType | OpCode::OpRateMarket | OpCode::OpMyLx | OpCode::OpNonceLockBl
        )
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for OpCode {
    type Err = TxScriptError;

    /// Case-insensitive mnemonic lookup
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpCode::from_mnemonic(&s.to_ascii_uppercase()).ok_or_else(|| TxScriptError::InvalidOpcode(s.to_string()))
    }
}

#[inline]
fn push_number(number: i64, vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.push_item(number);
    Ok(())
}

#[inline]
fn push_bool(value: bool, vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
    vm.dstack.push_item(value);
    Ok(())
}

#[inline]
fn verify_top(vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
    let [value]: [bool; 1] = vm.dstack.pop_items()?;
    match value {
        true => Ok(()),
        false => Err(TxScriptError::VerifyError),
    }
}

#[inline]
fn unary_op(vm: &mut TxScriptEngine<'_>, op: impl FnOnce(BigInt) -> BigInt) -> OpCodeResult {
    let [value]: [BigInt; 1] = vm.dstack.pop_items()?;
    vm.dstack.push_item(op(value));
    Ok(())
}

#[inline]
fn binary_op(vm: &mut TxScriptEngine<'_>, op: impl FnOnce(BigInt, BigInt) -> Result<BigInt, TxScriptError>) -> OpCodeResult {
    let [a, b]: [BigInt; 2] = vm.dstack.pop_items()?;
    vm.dstack.push_item(op(a, b)?);
    Ok(())
}

#[inline]
fn compare_op(vm: &mut TxScriptEngine<'_>, op: impl FnOnce(&BigInt, &BigInt) -> bool) -> OpCodeResult {
    let [a, b]: [BigInt; 2] = vm.dstack.pop_items()?;
    push_bool(op(&a, &b), vm)
}

#[inline]
fn hash_op(vm: &mut TxScriptEngine<'_>, algorithm: HashAlgorithm) -> OpCodeResult {
    let [data] = vm.dstack.pop_raw()?;
    let digest = vm.ctx.crypto.hash(algorithm, data.as_bytes());
    vm.dstack.push(hex::encode(digest));
    Ok(())
}

fn shift_amount(amount: &BigInt) -> Result<usize, TxScriptError> {
    amount
        .to_usize()
        .filter(|bits| *bits <= MAX_SHIFT_BITS)
        .ok_or_else(|| TxScriptError::MalformedArgs(format!("shift amount {amount} is outside 0..={MAX_SHIFT_BITS}")))
}

/// Resolves the PICK / ROLL depth: `n = 1` addresses the top item
fn stack_index(n: i64, len: usize) -> Result<usize, TxScriptError> {
    match usize::try_from(n) {
        Ok(n) if n >= 1 && n <= len => Ok(len - n),
        _ => Err(TxScriptError::InvalidStackOperation(max(n, 0) as usize, len)),
    }
}

fn reserved(opcode: OpCode) -> OpCodeResult {
    warn!("{opcode} is reserved and executes as a no-op");
    Ok(())
}

/*
The following is the implementation and metadata of all opcodes. Each opcode has a unique
mnemonic and byte value (the template makes it impossible to register either twice) and
execution code.

The syntax is the following:
```ignore
opcode OpCodeName<id, "OP_MNEMONIC">(vm) {
    code;
    block
}
// OR
opcode |"OP_ALIAS"| OpCodeName<id, "OP_MNEMONIC">(vm) statement
```

You can access the engine using the `vm` variable.

Implementation details in `opcodes/macros.rs`.
*/
opcode_list! {

    // Constants.
    opcode |"OP_FALSE"| Op0<0x00, "OP_0">(vm) push_number(0, vm)
    opcode Op1Negate<0x4f, "OP_1NEGATE">(vm) push_number(-1, vm)
    opcode |"OP_TRUE"| Op1<0x51, "OP_1">(vm) push_number(1, vm)
    opcode Op2<0x52, "OP_2">(vm) push_number(2, vm)
    opcode Op3<0x53, "OP_3">(vm) push_number(3, vm)

    // Control opcodes.
    opcode OpNop<0x61, "OP_NOP">(vm) Ok(())
    opcode OpVerify<0x69, "OP_VERIFY">(vm) verify_top(vm)
    opcode OpReturn<0x6a, "OP_RETURN">(vm) Err(TxScriptError::EarlyReturn)

    // Stack opcodes.
    opcode Op2Drop<0x6d, "OP_2DROP">(vm) vm.dstack.drop_items::<2>()
    opcode Op2Dup<0x6e, "OP_2DUP">(vm) vm.dstack.dup_items::<2>()
    opcode Op3Dup<0x6f, "OP_3DUP">(vm) vm.dstack.dup_items::<3>()
    opcode Op2Over<0x70, "OP_2OVER">(vm) vm.dstack.over_items::<2>()
    opcode Op2Rot<0x71, "OP_2ROT">(vm) vm.dstack.rot_items::<2>()
    opcode Op2Swap<0x72, "OP_2SWAP">(vm) vm.dstack.swap_items::<2>()
    opcode OpIfDup<0x73, "OP_IFDUP">(vm) {
        let [result]: [bool; 1] = vm.dstack.peek_items()?;
        if result {
            vm.dstack.dup_items::<1>()?;
        }
        Ok(())
    }
    opcode OpDepth<0x74, "OP_DEPTH">(vm) push_number(vm.dstack.len() as i64, vm)
    opcode OpDrop<0x75, "OP_DROP">(vm) vm.dstack.drop_items::<1>()
    opcode OpDup<0x76, "OP_DUP">(vm) vm.dstack.dup_items::<1>()
    opcode OpNip<0x77, "OP_NIP">(vm) {
        let [_, top] = vm.dstack.pop_raw()?;
        vm.dstack.push(top);
        Ok(())
    }
    opcode OpOver<0x78, "OP_OVER">(vm) vm.dstack.over_items::<1>()
    opcode OpPick<0x79, "OP_PICK">(vm) {
        let [n]: [i64; 1] = vm.dstack.pop_items()?;
        let index = stack_index(n, vm.dstack.len())?;
        let item = vm.dstack[index].clone();
        vm.dstack.push(item);
        Ok(())
    }
    opcode OpRoll<0x7a, "OP_ROLL">(vm) {
        let [n]: [i64; 1] = vm.dstack.pop_items()?;
        let index = stack_index(n, vm.dstack.len())?;
        let item = vm.dstack.remove(index);
        vm.dstack.push(item);
        Ok(())
    }
    opcode OpRot<0x7b, "OP_ROT">(vm) vm.dstack.rot_items::<1>()
    opcode OpSwap<0x7c, "OP_SWAP">(vm) vm.dstack.swap_items::<1>()
    opcode OpTuck<0x7d, "OP_TUCK">(vm) {
        let [second, top] = vm.dstack.pop_raw()?;
        vm.dstack.extend([top.clone(), second, top]);
        Ok(())
    }
    opcode OpSize<0x82, "OP_SIZE">(vm) {
        let [item] = vm.dstack.peek_raw()?;
        push_number(item.len() as i64, vm)
    }

    // Bitwise opcodes.
    opcode OpInvert<0x83, "OP_INVERT">(vm) unary_op(vm, |value| !value)
    opcode OpAnd<0x84, "OP_AND">(vm) binary_op(vm, |a, b| Ok(a & b))
    opcode OpOr<0x85, "OP_OR">(vm) binary_op(vm, |a, b| Ok(a | b))
    opcode OpXor<0x86, "OP_XOR">(vm) binary_op(vm, |a, b| Ok(a ^ b))
    opcode OpEqual<0x87, "OP_EQUAL">(vm) {
        let [a, b] = vm.dstack.pop_raw()?;
        push_bool(a == b, vm)
    }
    opcode OpEqualVerify<0x88, "OP_EQUALVERIFY">(vm) {
        OpCode::OpEqual.execute(vm)?;
        verify_top(vm)
    }

    // Numeric related opcodes.
    opcode Op1Add<0x8b, "OP_1ADD">(vm) unary_op(vm, |value| value + 1)
    opcode Op1Sub<0x8c, "OP_1SUB">(vm) unary_op(vm, |value| value - 1)
    opcode Op2Mul<0x8d, "OP_2MUL">(vm) unary_op(vm, |value| value * 2)
    opcode Op2Div<0x8e, "OP_2DIV">(vm) unary_op(vm, |value| value / 2)
    opcode OpNegate<0x8f, "OP_NEGATE">(vm) unary_op(vm, |value| -value)
    opcode OpAbs<0x90, "OP_ABS">(vm) unary_op(vm, |value| value.abs())
    opcode OpNot<0x91, "OP_NOT">(vm) unary_op(vm, |value| if value.is_zero() { BigInt::one() } else { BigInt::zero() })
    opcode Op0NotEqual<0x92, "OP_0NOTEQUAL">(vm) unary_op(vm, |value| if value.is_zero() { BigInt::zero() } else { BigInt::one() })
    opcode OpAdd<0x93, "OP_ADD">(vm) binary_op(vm, |a, b| Ok(a + b))
    opcode OpSub<0x94, "OP_SUB">(vm) binary_op(vm, |a, b| Ok(a - b))
    opcode OpMul<0x95, "OP_MUL">(vm) binary_op(vm, |a, b| Ok(a * b))
    opcode OpDiv<0x96, "OP_DIV">(vm) binary_op(vm, |a, b| match b.is_zero() {
        true => Err(TxScriptError::DivisionByZero),
        false => Ok(a / b),
    })
    opcode OpMod<0x97, "OP_MOD">(vm) binary_op(vm, |a, b| match b.is_zero() {
        true => Err(TxScriptError::DivisionByZero),
        false => Ok(a % b),
    })
    opcode OpLShift<0x98, "OP_LSHIFT">(vm) binary_op(vm, |a, b| Ok(a << shift_amount(&b)?))
    opcode OpRShift<0x99, "OP_RSHIFT">(vm) binary_op(vm, |a, b| Ok(a >> shift_amount(&b)?))
    opcode OpBoolAnd<0x9a, "OP_BOOLAND">(vm) compare_op(vm, |a, b| !a.is_zero() && !b.is_zero())
    opcode OpBoolOr<0x9b, "OP_BOOLOR">(vm) compare_op(vm, |a, b| !a.is_zero() || !b.is_zero())
    opcode OpNumEqual<0x9c, "OP_NUMEQUAL">(vm) compare_op(vm, |a, b| a == b)
    opcode OpNumEqualVerify<0x9d, "OP_NUMEQUALVERIFY">(vm) {
        OpCode::OpNumEqual.execute(vm)?;
        verify_top(vm)
    }
    opcode OpNumNotEqual<0x9e, "OP_NUMNOTEQUAL">(vm) compare_op(vm, |a, b| a != b)
    opcode OpLessThan<0x9f, "OP_LESSTHAN">(vm) compare_op(vm, |a, b| a < b)
    opcode OpGreaterThan<0xa0, "OP_GREATERTHAN">(vm) compare_op(vm, |a, b| a > b)
    opcode OpLessThanOrEqual<0xa1, "OP_LESSTHANOREQUAL">(vm) compare_op(vm, |a, b| a <= b)
    opcode OpGreaterThanOrEqual<0xa2, "OP_GREATERTHANOREQUAL">(vm) compare_op(vm, |a, b| a >= b)
    opcode OpMin<0xa3, "OP_MIN">(vm) binary_op(vm, |a, b| Ok(min(a, b)))
    opcode OpMax<0xa4, "OP_MAX">(vm) binary_op(vm, |a, b| Ok(max(a, b)))
    opcode OpWithin<0xa5, "OP_WITHIN">(vm) {
        let [x, lower, upper]: [BigInt; 3] = vm.dstack.pop_items()?;
        push_bool(lower <= x && x < upper, vm)
    }

    // Crypto opcodes.
    opcode OpRipemd160<0xa6, "OP_RIPEMD160">(vm) hash_op(vm, HashAlgorithm::Ripemd160)
    opcode OpSha1<0xa7, "OP_SHA1">(vm) hash_op(vm, HashAlgorithm::Sha1)
    opcode OpSha256<0xa8, "OP_SHA256">(vm) hash_op(vm, HashAlgorithm::Sha256)
    opcode OpHash160<0xa9, "OP_HASH160">(vm) hash_op(vm, HashAlgorithm::Hash160)
    opcode OpHash256<0xaa, "OP_HASH256">(vm) hash_op(vm, HashAlgorithm::Hash256)
    opcode OpCheckSig<0xac, "OP_CHECKSIG">(vm) {
        let [message, signature, pub_key] = vm.dstack.pop_raw()?;
        let valid = vm.op_check_sig(&message, &signature, &pub_key);
        push_bool(valid, vm)
    }
    opcode OpCheckSigVerify<0xad, "OP_CHECKSIGVERIFY">(vm) {
        OpCode::OpCheckSig.execute(vm)?;
        verify_top(vm)
    }
    opcode OpCheckMultiSig<0xae, "OP_CHECKMULTISIG">(vm) {
        let valid = vm.op_check_multisig()?;
        push_bool(valid, vm)
    }
    opcode OpCheckMultiSigVerify<0xaf, "OP_CHECKMULTISIGVERIFY">(vm) {
        OpCode::OpCheckMultiSig.execute(vm)?;
        verify_top(vm)
    }
    opcode OpBlake2bl<0xb0, "OP_BLAKE2BL">(vm) hash_op(vm, HashAlgorithm::Blake2bl)
    opcode OpBlake2bls<0xb1, "OP_BLAKE2BLS">(vm) hash_op(vm, HashAlgorithm::Blake2bls)
    opcode OpBlake2blc<0xb2, "OP_BLAKE2BLC">(vm) hash_op(vm, HashAlgorithm::Blake2blc)
    opcode OpCheckSigNoData<0xb3, "OP_CHECKSIGNODATA">(vm) {
        let valid = vm.op_check_sig_no_data()?;
        push_bool(valid, vm)
    }
    opcode OpCheckSigNoDataVerify<0xb4, "OP_CHECKSIGNODATAVERIFY">(vm) {
        OpCode::OpCheckSigNoData.execute(vm)?;
        verify_top(vm)
    }

    // Settlement opcodes.
    opcode OpMakerColl<0xc0, "OP_MAKERCOLL">(vm) {
        let outcome = vm.op_maker_coll()?;
        vm.dstack.push_item(outcome as i64);
        Ok(())
    }
    opcode OpDepSet<0xc1, "OP_DEPSET">(vm) {
        let stage = vm.op_dep_set()?;
        vm.dstack.push_item(stage as i64);
        Ok(())
    }
    opcode OpSchnack<0xc2, "OP_SCHNACK">(vm) {
        let valid = vm.op_schnack()?;
        push_bool(valid, vm)
    }
    opcode OpCallback<0xc3, "OP_CALLBACK">(vm) {
        let valid = vm.op_callback()?;
        push_bool(valid, vm)
    }
    opcode OpMonoid<0xc4, "OP_MONOID">(vm) {
        let valid = vm.op_monoid()?;
        push_bool(valid, vm)
    }
    opcode OpMonad<0xc5, "OP_MONAD">(vm) {
        let valid = vm.op_monad()?;
        push_bool(valid, vm)
    }
    opcode OpMonadSplit<0xc6, "OP_MONADSPLIT">(vm) {
        let valid = vm.op_monad_split()?;
        push_bool(valid, vm)
    }
    opcode OpMinUnitValue<0xc7, "OP_MINUNITVALUE">(vm) {
        let valid = vm.op_min_unit_value()?;
        push_bool(valid, vm)
    }
    opcode OpX<0xc8, "OP_X">(vm) {
        let valid = vm.op_x()?;
        push_bool(valid, vm)
    }
    opcode OpEmergency<0xc9, "OP_EMERGENCY">(vm) {
        let valid = vm.op_emergency()?;
        push_bool(valid, vm)
    }

    // Broadcast and reserved opcodes.
    opcode OpQ<0xd0, "OP_Q">(vm) {
        match vm.op_q()? {
            Some(accepted) => push_bool(accepted, vm),
            None => Ok(()),
        }
    }
    opcode OpHttpStatus<0xd1, "OP_HTTPSTATUS">(vm) reserved(OpCode::OpHttpStatus)
    opcode OpHttpSelect<0xd2, "OP_HTTPSELECT">(vm) reserved(OpCode::OpHttpSelect)
    opcode OpOrdType<0xd3, "OP_ORDTYPE">(vm) reserved(OpCode::OpOrdType)
    opcode OpRateMarket<0xd4, "OP_RATEMARKET">(vm) reserved(OpCode::OpRateMarket)
    opcode OpMyLx<0xd5, "OP_MYLX">(vm) reserved(OpCode::OpMyLx)
    opcode OpNonceLockBl<0xd6, "OP_NONCELOCKBL">(vm) reserved(OpCode::OpNonceLockBl)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asm::parse_asm;
    use crate::caches::Cache;
    use crate::engine_context::EngineContext;
    use crate::environment::ScriptEnvironment;
    use crate::{InvalidReason, ScriptVerdict};
    use std::collections::HashSet;

    struct TestCase {
        script: &'static str,
        stack: Result<Vec<&'static str>, TxScriptError>,
    }

    fn run_success_test_cases(tests: Vec<TestCase>) {
        let sig_cache = Cache::new(0);
        let env = ScriptEnvironment::new();
        for TestCase { script, stack } in tests {
            let tokens = parse_asm(script).unwrap_or_else(|err| panic!("script {script:?} does not parse: {err}"));
            let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache));
            let verdict = vm.execute(&tokens);
            match stack {
                Ok(expected) => {
                    assert!(!matches!(verdict, ScriptVerdict::Faulted(_)), "script {script:?} faulted: {verdict}");
                    assert_eq!(vm.stack(), expected.iter().map(|x| x.to_string()).collect::<Vec<_>>(), "script {script:?}");
                }
                Err(err) => assert_eq!(verdict, ScriptVerdict::Faulted(err), "script {script:?}"),
            }
        }
    }

    #[test]
    fn test_opcode_table_is_consistent() {
        let mut values = HashSet::new();
        let mut mnemonics = HashSet::new();
        for opcode in OpCode::ALL {
            assert!(values.insert(opcode.value()), "duplicate value for {opcode}");
            assert!(mnemonics.insert(opcode.mnemonic()), "duplicate mnemonic {opcode}");
            assert_eq!(OpCode::from_value(opcode.value()), Some(*opcode));
            assert_eq!(opcode.mnemonic().parse::<OpCode>(), Ok(*opcode));
            assert_eq!(opcode.mnemonic().to_lowercase().parse::<OpCode>(), Ok(*opcode));
            // Push ranges are reserved for data in the bytecode encoding
            assert!(!(0x01..=0x4e).contains(&opcode.value()), "{opcode} collides with data pushes");
        }
        assert_eq!(OpCode::ALL.len(), 90);
        assert_eq!("OP_FALSE".parse::<OpCode>(), Ok(OpCode::Op0));
        assert_eq!("op_true".parse::<OpCode>(), Ok(OpCode::Op1));
        assert_eq!("OP_BOGUS".parse::<OpCode>(), Err(TxScriptError::InvalidOpcode("OP_BOGUS".to_string())));
        assert_eq!(OpCode::from_value(0xff), None);
        assert_eq!(codes::OpCheckSig, 0xac);
    }

    #[test]
    fn test_constants() {
        run_success_test_cases(vec![
            TestCase { script: "OP_0 OP_FALSE", stack: Ok(vec!["0", "0"]) },
            TestCase { script: "OP_1 OP_TRUE OP_2 OP_3", stack: Ok(vec!["1", "1", "2", "3"]) },
            TestCase { script: "OP_1NEGATE", stack: Ok(vec!["-1"]) },
            TestCase { script: "OP_NOP", stack: Ok(vec![]) },
        ]);
    }

    #[test]
    fn test_stack_opcodes() {
        run_success_test_cases(vec![
            TestCase { script: "1 2 3 OP_DROP", stack: Ok(vec!["1", "2"]) },
            TestCase { script: "1 2 3 OP_2DROP", stack: Ok(vec!["1"]) },
            TestCase { script: "1 2 OP_DUP", stack: Ok(vec!["1", "2", "2"]) },
            TestCase { script: "1 2 OP_2DUP", stack: Ok(vec!["1", "2", "1", "2"]) },
            TestCase { script: "1 2 3 OP_3DUP", stack: Ok(vec!["1", "2", "3", "1", "2", "3"]) },
            TestCase { script: "1 2 OP_OVER", stack: Ok(vec!["1", "2", "1"]) },
            TestCase { script: "1 2 3 4 OP_2OVER", stack: Ok(vec!["1", "2", "3", "4", "1", "2"]) },
            TestCase { script: "1 2 3 OP_ROT", stack: Ok(vec!["2", "3", "1"]) },
            TestCase { script: "1 2 3 4 5 6 OP_2ROT", stack: Ok(vec!["3", "4", "5", "6", "1", "2"]) },
            TestCase { script: "1 2 OP_SWAP", stack: Ok(vec!["2", "1"]) },
            TestCase { script: "1 2 3 4 OP_2SWAP", stack: Ok(vec!["3", "4", "1", "2"]) },
            TestCase { script: "1 2 OP_TUCK", stack: Ok(vec!["2", "1", "2"]) },
            TestCase { script: "1 2 OP_NIP", stack: Ok(vec!["2"]) },
            TestCase { script: "0 OP_IFDUP 1 OP_IFDUP", stack: Ok(vec!["0", "1", "1"]) },
            TestCase { script: "a b OP_DEPTH", stack: Ok(vec!["a", "b", "2"]) },
            TestCase { script: "abcdef OP_SIZE", stack: Ok(vec!["abcdef", "6"]) },
            TestCase { script: "1 OP_NIP", stack: Err(TxScriptError::InvalidStackOperation(2, 1)) },
            TestCase { script: "OP_DUP", stack: Err(TxScriptError::EmptyStack) },
            TestCase { script: "1 2 3 OP_2OVER", stack: Err(TxScriptError::InvalidStackOperation(4, 3)) },
        ]);
    }

    #[test]
    fn test_pick_and_roll() {
        run_success_test_cases(vec![
            TestCase { script: "a b c 1 OP_PICK", stack: Ok(vec!["a", "b", "c", "c"]) },
            TestCase { script: "a b c 3 OP_PICK", stack: Ok(vec!["a", "b", "c", "a"]) },
            TestCase { script: "a b c 1 OP_ROLL", stack: Ok(vec!["a", "b", "c"]) },
            TestCase { script: "a b c 2 OP_ROLL", stack: Ok(vec!["a", "c", "b"]) },
            TestCase { script: "a b c 3 OP_ROLL", stack: Ok(vec!["b", "c", "a"]) },
            TestCase { script: "a b c 4 OP_PICK", stack: Err(TxScriptError::InvalidStackOperation(4, 3)) },
            TestCase { script: "a b c 0 OP_ROLL", stack: Err(TxScriptError::InvalidStackOperation(0, 3)) },
            TestCase { script: "a b c -1 OP_PICK", stack: Err(TxScriptError::InvalidStackOperation(0, 3)) },
            TestCase { script: "a b c xyz OP_PICK", stack: Err(TxScriptError::NotANumber("xyz".to_string())) },
        ]);
    }

    #[test]
    fn test_dup_equal() {
        run_success_test_cases(vec![
            TestCase { script: "0xdeadbeef OP_DUP OP_EQUAL", stack: Ok(vec!["1"]) },
            TestCase { script: "a A OP_EQUAL", stack: Ok(vec!["0"]) },
            TestCase { script: "a a OP_EQUALVERIFY", stack: Ok(vec![]) },
            TestCase { script: "a b OP_EQUALVERIFY", stack: Err(TxScriptError::VerifyError) },
        ]);
    }

    #[test]
    fn test_arithmetic() {
        run_success_test_cases(vec![
            TestCase { script: "a OP_1ADD", stack: Ok(vec!["b"]) },
            TestCase { script: "0 OP_1SUB", stack: Ok(vec!["-1"]) },
            TestCase { script: "-8 OP_2MUL", stack: Ok(vec!["-10"]) },
            TestCase { script: "-5 OP_2DIV", stack: Ok(vec!["-2"]) },
            TestCase { script: "ff OP_NEGATE OP_ABS", stack: Ok(vec!["ff"]) },
            TestCase { script: "0 OP_NOT 5 OP_NOT", stack: Ok(vec!["1", "0"]) },
            TestCase { script: "0 OP_0NOTEQUAL -3 OP_0NOTEQUAL", stack: Ok(vec!["0", "1"]) },
            TestCase { script: "ffffffffffffffff 1 OP_ADD", stack: Ok(vec!["10000000000000000"]) },
            TestCase { script: "a 14 OP_SUB", stack: Ok(vec!["-a"]) },
            TestCase { script: "10 10 OP_MUL", stack: Ok(vec!["100"]) },
            TestCase { script: "-7 2 OP_DIV", stack: Ok(vec!["-3"]) },
            TestCase { script: "-7 2 OP_MOD", stack: Ok(vec!["-1"]) },
            TestCase { script: "1 0 OP_DIV", stack: Err(TxScriptError::DivisionByZero) },
            TestCase { script: "1 0 OP_MOD", stack: Err(TxScriptError::DivisionByZero) },
            TestCase { script: "1 8 OP_LSHIFT", stack: Ok(vec!["100"]) },
            TestCase { script: "100 4 OP_RSHIFT", stack: Ok(vec!["10"]) },
            TestCase { script: "1 100 OP_LSHIFT", stack: Ok(vec!["10000000000000000000000000000000000000000000000000000000000000000"]) },
            TestCase {
                script: "1 101 OP_LSHIFT",
                stack: Err(TxScriptError::MalformedArgs("shift amount 257 is outside 0..=256".to_string())),
            },
            TestCase { script: "1 -1 OP_RSHIFT", stack: Err(TxScriptError::MalformedArgs("shift amount -1 is outside 0..=256".to_string())) },
            TestCase { script: "1 0 OP_BOOLAND 1 0 OP_BOOLOR", stack: Ok(vec!["0", "1"]) },
            TestCase { script: "3 7 OP_MIN 3 7 OP_MAX", stack: Ok(vec!["3", "7"]) },
            TestCase { script: "3 3 a OP_WITHIN a 3 a OP_WITHIN", stack: Ok(vec!["1", "0"]) },
        ]);
    }

    #[test]
    fn test_bitwise() {
        run_success_test_cases(vec![
            TestCase { script: "0 OP_INVERT", stack: Ok(vec!["-1"]) },
            TestCase { script: "c a OP_AND", stack: Ok(vec!["8"]) },
            TestCase { script: "c a OP_OR", stack: Ok(vec!["e"]) },
            TestCase { script: "c a OP_XOR", stack: Ok(vec!["6"]) },
            TestCase { script: "-1 f0 OP_AND", stack: Ok(vec!["f0"]) },
        ]);
    }

    #[test]
    fn test_comparison() {
        run_success_test_cases(vec![
            TestCase { script: "0xa a OP_NUMEQUAL", stack: Ok(vec!["1"]) },
            TestCase { script: "0xa a OP_EQUAL", stack: Ok(vec!["0"]) },
            TestCase { script: "1 2 OP_NUMNOTEQUAL", stack: Ok(vec!["1"]) },
            TestCase { script: "1 2 OP_LESSTHAN 1 2 OP_GREATERTHAN", stack: Ok(vec!["1", "0"]) },
            TestCase { script: "2 2 OP_LESSTHANOREQUAL 1 2 OP_GREATERTHANOREQUAL", stack: Ok(vec!["1", "0"]) },
            TestCase { script: "1 1 OP_NUMEQUALVERIFY", stack: Ok(vec![]) },
            TestCase { script: "1 2 OP_NUMEQUALVERIFY", stack: Err(TxScriptError::VerifyError) },
            TestCase { script: "1 zz OP_LESSTHAN", stack: Err(TxScriptError::NotANumber("zz".to_string())) },
        ]);
    }

    #[test]
    fn test_hashes() {
        run_success_test_cases(vec![
            TestCase { script: "abc OP_SHA256", stack: Ok(vec!["ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"]) },
            TestCase { script: "abc OP_SHA1", stack: Ok(vec!["a9993e364706816aba3e25717850c26c9cd0d89d"]) },
            TestCase { script: "abc OP_RIPEMD160", stack: Ok(vec!["8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"]) },
            TestCase { script: "OP_SHA256", stack: Err(TxScriptError::EmptyStack) },
        ]);
    }

    #[test]
    fn test_chained_hashes_use_digest_bytes() {
        let sig_cache = Cache::new(0);
        let env = ScriptEnvironment::new();
        for (script, expected) in [
            ("abc OP_HASH256", hex::encode(collider_hashes::hash256(b"abc"))),
            ("abc OP_HASH160", hex::encode(collider_hashes::hash160(b"abc"))),
            ("abc OP_BLAKE2BLC", hex::encode(collider_hashes::blake2bls(&collider_hashes::blake2bl(b"abc")))),
            ("abc OP_BLAKE2BLS", hex::encode(collider_hashes::blake2bls(b"abc"))),
        ] {
            let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache));
            assert!(vm.evaluate_asm(script).is_valid(), "script {script}");
            assert_eq!(vm.stack(), [expected], "script {script}");
        }
    }

    #[test]
    fn test_reserved_opcodes_are_noops() {
        run_success_test_cases(vec![TestCase {
            script: "1 OP_HTTPSTATUS OP_HTTPSELECT OP_ORDTYPE OP_RATEMARKET OP_MYLX OP_NONCELOCKBL",
            stack: Ok(vec!["1"]),
        }]);
        assert!(OpCode::ALL.iter().filter(|op| op.is_reserved()).count() == 6);
    }

    #[test]
    fn test_return_is_invalid_not_faulted() {
        let sig_cache = Cache::new(0);
        let env = ScriptEnvironment::new();
        let mut vm = TxScriptEngine::new(&env, EngineContext::new(&sig_cache));
        assert_eq!(vm.evaluate_asm("OP_1 OP_RETURN OP_1"), ScriptVerdict::Invalid(InvalidReason::EarlyReturn));
        assert_eq!(vm.stack(), ["1".to_string()]);
    }
}
