use crate::TxScriptError;
use core::fmt::Debug;
use core::ops::{Deref, DerefMut};
use num_bigint::BigInt;
use num_traits::{Num, ToPrimitive, Zero};

/// Bounds of the multi-value pop: counts outside fall back to a single pop
pub const POP_N_MIN: usize = 2;
pub const POP_N_MAX: usize = 128;
/// Bounds of the non-destructive lookback: counts outside fall back to a single peek
pub const LOOKBACK_MIN: usize = 2;
pub const LOOKBACK_MAX: usize = 5;

/// The operand stack. Items are kept in their canonical text form: numbers as hex,
/// everything else (hashes, addresses, signatures) verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack(Vec<String>);

impl Stack {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// The top item, left in place
    pub fn peek(&self) -> Result<&str, TxScriptError> {
        self.0.last().map(String::as_str).ok_or(TxScriptError::EmptyStack)
    }
}

impl Deref for Stack {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Stack {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<String>> for Stack {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

/// A popped stack item, tagged by the accessor used to read it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackValue {
    Number(BigInt),
    Raw(String),
}

impl StackValue {
    pub fn as_number(&self) -> Option<&BigInt> {
        match self {
            StackValue::Number(n) => Some(n),
            StackValue::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            StackValue::Raw(s) => Some(s),
            StackValue::Number(_) => None,
        }
    }
}

pub trait DataStack {
    fn pop_items<const SIZE: usize, T: Debug>(&mut self) -> Result<[T; SIZE], TxScriptError>
    where
        String: OpcodeData<T>;
    fn peek_items<const SIZE: usize, T: Debug>(&self) -> Result<[T; SIZE], TxScriptError>
    where
        String: OpcodeData<T>;
    fn pop_raw<const SIZE: usize>(&mut self) -> Result<[String; SIZE], TxScriptError>;
    fn peek_raw<const SIZE: usize>(&self) -> Result<[String; SIZE], TxScriptError>;
    fn push_item<T: Debug>(&mut self, item: T)
    where
        String: OpcodeData<T>;
    fn pop_value(&mut self, numeric: bool) -> Result<StackValue, TxScriptError>;
    fn pop_n(&mut self, n: usize) -> Result<Vec<String>, TxScriptError>;
    fn lookback(&self, n: usize) -> Result<Vec<String>, TxScriptError>;
    fn drop_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError>;
    fn dup_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError>;
    fn over_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError>;
    fn rot_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError>;
    fn swap_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError>;
}

pub trait OpcodeData<T> {
    fn deserialize(&self) -> Result<T, TxScriptError>;
    fn serialize(from: &T) -> Self;
}

/// Parses the canonical hex form. Accepts an optional sign and `0x` prefix in either case;
/// the empty string is zero.
pub fn deserialize_number(item: &str) -> Result<BigInt, TxScriptError> {
    if item.is_empty() {
        return Ok(BigInt::zero());
    }
    let (negative, unsigned) = match item.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, item),
    };
    let digits = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")).unwrap_or(unsigned);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TxScriptError::NotANumber(item.to_string()));
    }
    let value = BigInt::from_str_radix(digits, 16).map_err(|_| TxScriptError::NotANumber(item.to_string()))?;
    Ok(if negative { -value } else { value })
}

#[inline]
pub fn serialize_number(number: &BigInt) -> String {
    number.to_str_radix(16)
}

/// Truthiness of a stack item: numbers are true when non-zero, other text when non-empty.
pub fn is_true(item: &str) -> bool {
    match deserialize_number(item) {
        Ok(number) => !number.is_zero(),
        Err(_) => !item.is_empty(),
    }
}

impl OpcodeData<BigInt> for String {
    #[inline]
    fn deserialize(&self) -> Result<BigInt, TxScriptError> {
        deserialize_number(self)
    }

    #[inline]
    fn serialize(from: &BigInt) -> Self {
        serialize_number(from)
    }
}

impl OpcodeData<i64> for String {
    #[inline]
    fn deserialize(&self) -> Result<i64, TxScriptError> {
        let number = deserialize_number(self)?;
        number.to_i64().ok_or_else(|| TxScriptError::MalformedArgs(format!("numeric value {self} does not fit in 64 bits")))
    }

    #[inline]
    fn serialize(from: &i64) -> Self {
        serialize_number(&BigInt::from(*from))
    }
}

impl OpcodeData<u128> for String {
    #[inline]
    fn deserialize(&self) -> Result<u128, TxScriptError> {
        let number = deserialize_number(self)?;
        number.to_u128().ok_or_else(|| TxScriptError::MalformedArgs(format!("numeric value {self} is not an unsigned 128 bit amount")))
    }

    #[inline]
    fn serialize(from: &u128) -> Self {
        serialize_number(&BigInt::from(*from))
    }
}

impl OpcodeData<bool> for String {
    #[inline]
    fn deserialize(&self) -> Result<bool, TxScriptError> {
        Ok(is_true(self))
    }

    #[inline]
    fn serialize(from: &bool) -> Self {
        match from {
            true => "1".to_string(),
            false => "0".to_string(),
        }
    }
}

impl OpcodeData<String> for String {
    #[inline]
    fn deserialize(&self) -> Result<String, TxScriptError> {
        Ok(self.clone())
    }

    #[inline]
    fn serialize(from: &String) -> Self {
        from.clone()
    }
}

impl Stack {
    #[inline]
    fn check_len(&self, required: usize) -> Result<(), TxScriptError> {
        match self.len() {
            0 if required > 0 => Err(TxScriptError::EmptyStack),
            len if len < required => Err(TxScriptError::InvalidStackOperation(required, len)),
            _ => Ok(()),
        }
    }
}

impl DataStack for Stack {
    #[inline]
    fn pop_items<const SIZE: usize, T: Debug>(&mut self) -> Result<[T; SIZE], TxScriptError>
    where
        String: OpcodeData<T>,
    {
        self.check_len(SIZE)?;
        let len = self.0.len();
        Ok(<[T; SIZE]>::try_from(self.0.split_off(len - SIZE).iter().map(|v| v.deserialize()).collect::<Result<Vec<T>, _>>()?)
            .expect("Already exact item"))
    }

    #[inline]
    fn peek_items<const SIZE: usize, T: Debug>(&self) -> Result<[T; SIZE], TxScriptError>
    where
        String: OpcodeData<T>,
    {
        self.check_len(SIZE)?;
        Ok(<[T; SIZE]>::try_from(self[self.len() - SIZE..].iter().map(|v| v.deserialize()).collect::<Result<Vec<T>, _>>()?)
            .expect("Already exact item"))
    }

    #[inline]
    fn pop_raw<const SIZE: usize>(&mut self) -> Result<[String; SIZE], TxScriptError> {
        self.check_len(SIZE)?;
        let len = self.0.len();
        Ok(<[String; SIZE]>::try_from(self.0.split_off(len - SIZE)).expect("Already exact item"))
    }

    #[inline]
    fn peek_raw<const SIZE: usize>(&self) -> Result<[String; SIZE], TxScriptError> {
        self.check_len(SIZE)?;
        Ok(<[String; SIZE]>::try_from(self[self.len() - SIZE..].to_vec()).expect("Already exact item"))
    }

    #[inline]
    fn push_item<T: Debug>(&mut self, item: T)
    where
        String: OpcodeData<T>,
    {
        self.0.push(OpcodeData::serialize(&item));
    }

    fn pop_value(&mut self, numeric: bool) -> Result<StackValue, TxScriptError> {
        let [item] = self.pop_raw()?;
        match numeric {
            true => Ok(StackValue::Number(deserialize_number(&item)?)),
            false => Ok(StackValue::Raw(item)),
        }
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<String>, TxScriptError> {
        let n = if (POP_N_MIN..=POP_N_MAX).contains(&n) { n } else { 1 };
        self.check_len(n)?;
        let len = self.0.len();
        Ok(self.0.split_off(len - n))
    }

    fn lookback(&self, n: usize) -> Result<Vec<String>, TxScriptError> {
        let n = if (LOOKBACK_MIN..=LOOKBACK_MAX).contains(&n) { n } else { 1 };
        self.check_len(n)?;
        Ok(self[self.len() - n..].to_vec())
    }

    #[inline]
    fn drop_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError> {
        self.check_len(SIZE)?;
        let len = self.0.len();
        self.0.truncate(len - SIZE);
        Ok(())
    }

    #[inline]
    fn dup_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError> {
        self.check_len(SIZE)?;
        let len = self.0.len();
        self.0.extend_from_within(len - SIZE..);
        Ok(())
    }

    #[inline]
    fn over_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError> {
        self.check_len(2 * SIZE)?;
        let len = self.0.len();
        self.0.extend_from_within(len - 2 * SIZE..len - SIZE);
        Ok(())
    }

    #[inline]
    fn rot_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError> {
        self.check_len(3 * SIZE)?;
        let len = self.0.len();
        let drained = self.0.drain(len - 3 * SIZE..len - 2 * SIZE).collect::<Vec<String>>();
        self.0.extend(drained);
        Ok(())
    }

    #[inline]
    fn swap_items<const SIZE: usize>(&mut self) -> Result<(), TxScriptError> {
        self.check_len(2 * SIZE)?;
        let len = self.0.len();
        let drained = self.0.drain(len - 2 * SIZE..len - SIZE).collect::<Vec<String>>();
        self.0.extend(drained);
        Ok(())
    }
}
