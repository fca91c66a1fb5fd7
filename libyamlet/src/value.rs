//! Yamlet value representation.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut, Neg};

/// A parsed document value.
#[derive(Clone)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit floating-point number.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    Sequence(Vec<Value>),
    /// Mapping with unique keys.
    Mapping(Mapping),
}

static NULL: Value = Value::Null;

/// Key-value pairs with unique keys, iterated in insertion order.
///
/// Keys may be any value, including collections. Equality ignores order.
/// Lookups go through a hash index, so `Int(1)` and `Double(1.0)` are the
/// same key.
#[derive(Clone, Default)]
pub struct Mapping {
    entries: Vec<(Value, Value)>,
    index: HashMap<u64, Vec<usize>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, hash: u64, key: &Value) -> Option<usize> {
        self.index
            .get(&hash)?
            .iter()
            .copied()
            .find(|&i| self.entries[i].0 == *key)
    }

    fn push(&mut self, hash: u64, key: Value, value: Value) -> usize {
        let i = self.entries.len();
        self.entries.push((key, value));
        self.index.entry(hash).or_default().push(i);
        i
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let i = self.position(key_hash(key), key)?;
        Some(&self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        let i = self.position(key_hash(key), key)?;
        Some(&mut self.entries[i].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Add an entry unless its key is already present, in which case the
    /// rejected entry is handed back.
    pub fn try_insert(&mut self, key: Value, value: Value) -> Result<(), (Value, Value)> {
        let hash = key_hash(&key);
        if self.position(hash, &key).is_some() {
            return Err((key, value));
        }
        self.push(hash, key, value);
        Ok(())
    }

    /// Set the value under `key`, returning the value it replaces.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        let hash = key_hash(&key);
        match self.position(hash, &key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.push(hash, key, value);
                None
            }
        }
    }

    /// The value under `key`, inserting `Null` first when it is missing.
    pub fn entry_or_null(&mut self, key: Value) -> &mut Value {
        let hash = key_hash(&key);
        let i = match self.position(hash, &key) {
            Some(i) => i,
            None => self.push(hash, key, Value::Null),
        };
        &mut self.entries[i].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

fn key_hash(key: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_value(key, &mut hasher);
    hasher.finish()
}

/// Hash consistent with `Value` equality: numbers hash by their `f64`
/// value with `-0.0` folded into `0.0`, and mappings hash independently of
/// entry order.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Int(n) => hash_number(*n as f64, state),
        Value::Double(n) => hash_number(*n, state),
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Sequence(seq) => {
            4u8.hash(state);
            seq.len().hash(state);
            for item in seq {
                hash_value(item, state);
            }
        }
        Value::Mapping(map) => {
            5u8.hash(state);
            map.len().hash(state);
            let sum = map.iter().fold(0u64, |sum, (k, v)| {
                let mut entry = DefaultHasher::new();
                hash_value(k, &mut entry);
                hash_value(v, &mut entry);
                sum.wrapping_add(entry.finish())
            });
            sum.hash(state);
        }
    }
}

fn hash_number<H: Hasher>(n: f64, state: &mut H) {
    2u8.hash(state);
    let n = if n == 0.0 { 0.0 } else { n };
    n.to_bits().hash(state);
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |o| o == v))
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Value {
    /// Returns `true` if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int`, or a `Double` with an
    /// integral value in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Double(d)
                if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64 =>
            {
                Some(*d as i64)
            }
            _ => None,
        }
    }

    /// Returns the number as a float if this is a `Double` or an `Int`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a reference to the elements if this is a `Sequence`.
    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Returns a reference to the mapping if this is a `Mapping`.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Number of elements of a sequence or entries of a mapping; zero for
    /// scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Sequence(seq) => seq.len(),
            Value::Mapping(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a mapping entry by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping()?.get(&Value::from(key))
    }
}

// Lookups never fail: a missing index or key, or indexing into a scalar,
// yields `Null`.

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        match self {
            Value::Sequence(seq) => seq.get(index).unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

impl Index<&Value> for Value {
    type Output = Value;

    fn index(&self, key: &Value) -> &Value {
        match self {
            Value::Mapping(map) => map.get(key).unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

// Writes never fail either: the target is replaced by an empty collection
// of the right kind when needed, and missing slots are filled with `Null`.

impl IndexMut<usize> for Value {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        if !matches!(self, Value::Sequence(_)) {
            *self = Value::Sequence(Vec::new());
        }
        match self {
            Value::Sequence(seq) => {
                if seq.len() <= index {
                    seq.resize(index + 1, Value::Null);
                }
                &mut seq[index]
            }
            _ => unreachable!(),
        }
    }
}

impl IndexMut<&Value> for Value {
    fn index_mut(&mut self, key: &Value) -> &mut Value {
        if !matches!(self, Value::Mapping(_)) {
            *self = Value::Mapping(Mapping::new());
        }
        match self {
            Value::Mapping(map) => map.entry_or_null(key.clone()),
            _ => unreachable!(),
        }
    }
}

impl IndexMut<&str> for Value {
    fn index_mut(&mut self, key: &str) -> &mut Value {
        &mut self[&Value::from(key)]
    }
}

/// Numeric negation. `-Int(i64::MIN)` becomes a `Double`; anything that is
/// not a number negates to `Null`.
impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        match self {
            Value::Int(n) => n
                .checked_neg()
                .map_or(Value::Double(-(n as f64)), Value::Int),
            Value::Double(n) => Value::Double(-n),
            _ => Value::Null,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

fn write_double(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, ".nan")
    } else if n.is_infinite() {
        if n > 0.0 {
            write!(f, ".inf")
        } else {
            write!(f, "-.inf")
        }
    } else {
        write!(f, "{:?}", n)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\u{:04X}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

/// Single-line flow rendering. A value whose mapping keys are all strings
/// parses back to an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => write_double(f, *n),
            Value::String(s) => write_quoted(f, s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{:?}", n)
                }
            }
            Value::String(s) => write!(f, "{:?}", s),
            Value::Sequence(seq) => f.debug_list().entries(seq).finish(),
            Value::Mapping(map) => write!(f, "{:?}", map),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(seq: Vec<Value>) -> Self {
        Value::Sequence(seq)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}
