//! Typed parameter storage for operations.
//!
//! Every operation carries a [`ParameterDict`]: an insertion-ordered map of
//! declared keys, each with a [`ParamKind`], an optional current value, and
//! a *live* flag. Live parameters may be written while the operation is
//! attached and are pushed straight into the native object; all others are
//! frozen once attached.
//!
//! Per-particle-type values (shape sizes, per-type settings) live in a
//! [`TypeParameter`], which learns the set of valid type names when the
//! registry broadcasts them.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::ParamError;

/// Declared type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Signed integer.
    Int,
    /// Floating point. Integer values are widened on write.
    Float,
    /// UTF-8 string.
    Str,
    /// Boolean flag.
    Bool,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Bool => f.write_str("bool"),
        }
    }
}

/// A parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    Str(String),
    /// Boolean value.
    Bool(bool),
}

impl ParamValue {
    /// The kind of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Int(_) => ParamKind::Int,
            Self::Float(_) => ParamKind::Float,
            Self::Str(_) => ParamKind::Str,
            Self::Bool(_) => ParamKind::Bool,
        }
    }

    /// Integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce this value to `kind`, or report a mismatch against `name`.
    fn coerce(self, name: &str, kind: ParamKind) -> Result<Self, ParamError> {
        match (self, kind) {
            (Self::Int(v), ParamKind::Float) => Ok(Self::Float(v as f64)),
            (v, k) if v.kind() == k => Ok(v),
            (v, k) => Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: k,
                found: v.kind(),
            }),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    kind: ParamKind,
    value: Option<ParamValue>,
    live: bool,
}

/// Ordered, typed key/value store staged by an operation before (and,
/// for live keys, during) attachment.
///
/// Keys must be declared before they can be written. Writes are validated
/// against the declared kind; unknown keys are rejected.
///
/// ```
/// use corral_core::{ParamKind, ParameterDict};
///
/// let mut params = ParameterDict::new();
/// params.declare("xmax", ParamKind::Float, false);
/// params.set("xmax", 2).unwrap(); // widened to 2.0
/// assert_eq!(params.float("xmax").unwrap(), 2.0);
/// assert!(params.set("dx", 0.1).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ParameterDict {
    entries: IndexMap<String, Entry>,
}

impl ParameterDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a key with no value. Redeclaring resets the entry.
    pub fn declare(&mut self, name: &str, kind: ParamKind, live: bool) {
        self.entries.insert(
            name.to_string(),
            Entry {
                kind,
                value: None,
                live,
            },
        );
    }

    /// Declare a key and give it an initial value.
    pub fn declare_with(
        &mut self,
        name: &str,
        kind: ParamKind,
        live: bool,
        value: impl Into<ParamValue>,
    ) -> Result<(), ParamError> {
        self.declare(name, kind, live);
        self.set(name, value)
    }

    /// Declare a key whose kind is taken from its initial value.
    pub fn declare_value(&mut self, name: &str, live: bool, value: impl Into<ParamValue>) {
        let value = value.into();
        self.entries.insert(
            name.to_string(),
            Entry {
                kind: value.kind(),
                value: Some(value),
                live,
            },
        );
    }

    /// Validate `value` for `name` without storing it.
    ///
    /// Returns the value coerced to the declared kind.
    pub fn check(&self, name: &str, value: impl Into<ParamValue>) -> Result<ParamValue, ParamError> {
        let entry = self.entry(name)?;
        value.into().coerce(name, entry.kind)
    }

    /// Validate and store a value.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        let coerced = self.check(name, value)?;
        if let Some(entry) = self.entries.get_mut(name) {
            entry.value = Some(coerced);
        }
        Ok(())
    }

    /// Current value of a key, `None` if unset or undeclared.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name).and_then(|e| e.value.as_ref())
    }

    /// Declared kind of a key.
    pub fn kind(&self, name: &str) -> Option<ParamKind> {
        self.entries.get(name).map(|e| e.kind)
    }

    /// Whether the key may be written while attached.
    pub fn is_live(&self, name: &str) -> Result<bool, ParamError> {
        Ok(self.entry(name)?.live)
    }

    /// Whether the key is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Float value of a key.
    pub fn float(&self, name: &str) -> Result<f64, ParamError> {
        self.required(name)?
            .as_float()
            .ok_or_else(|| self.mismatch(name, ParamKind::Float))
    }

    /// Integer value of a key.
    pub fn int(&self, name: &str) -> Result<i64, ParamError> {
        self.required(name)?
            .as_int()
            .ok_or_else(|| self.mismatch(name, ParamKind::Int))
    }

    /// String value of a key.
    pub fn str(&self, name: &str) -> Result<&str, ParamError> {
        let value = self.required(name)?;
        value
            .as_str()
            .ok_or_else(|| self.mismatch(name, ParamKind::Str))
    }

    /// Boolean value of a key.
    pub fn bool(&self, name: &str) -> Result<bool, ParamError> {
        self.required(name)?
            .as_bool()
            .ok_or_else(|| self.mismatch(name, ParamKind::Bool))
    }

    /// Fail with [`ParamError::Missing`] on the first declared key that
    /// has no value.
    pub fn require_complete(&self) -> Result<(), ParamError> {
        match self.entries.iter().find(|(_, e)| e.value.is_none()) {
            Some((name, _)) => Err(ParamError::Missing { name: name.clone() }),
            None => Ok(()),
        }
    }

    /// All `(key, value)` pairs with a value, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .filter_map(|(k, e)| e.value.as_ref().map(|v| (k.as_str(), v)))
    }

    /// Declared keys, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of declared keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Result<&Entry, ParamError> {
        self.entries.get(name).ok_or_else(|| ParamError::UnknownKey {
            name: name.to_string(),
        })
    }

    fn required(&self, name: &str) -> Result<&ParamValue, ParamError> {
        self.entry(name)?
            .value
            .as_ref()
            .ok_or_else(|| ParamError::Missing {
                name: name.to_string(),
            })
    }

    fn mismatch(&self, name: &str, expected: ParamKind) -> ParamError {
        ParamError::KindMismatch {
            name: name.to_string(),
            expected,
            found: self.kind(name).unwrap_or(expected),
        }
    }
}

/// A parameter with one value per particle type.
///
/// Values may be set for any type name before the registry broadcasts the
/// simulation's types. [`cache_types`](Self::cache_types) then rejects
/// values for unknown types, and [`require_complete`](Self::require_complete)
/// insists every known type resolves to a value (explicit or default).
#[derive(Clone, Debug)]
pub struct TypeParameter {
    name: String,
    kind: ParamKind,
    default: Option<ParamValue>,
    values: IndexMap<String, ParamValue>,
    types: Option<SmallVec<[String; 4]>>,
}

impl TypeParameter {
    /// A type parameter with no default.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            values: IndexMap::new(),
            types: None,
        }
    }

    /// Set the value used for types without an explicit entry.
    pub fn with_default(mut self, value: impl Into<ParamValue>) -> Result<Self, ParamError> {
        self.default = Some(value.into().coerce(&self.name, self.kind)?);
        Ok(self)
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind of every value.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Set the value for one particle type.
    ///
    /// Once types are cached, unknown type names are rejected.
    pub fn set(&mut self, type_name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        if let Some(types) = &self.types {
            if !types.iter().any(|t| t == type_name) {
                return Err(ParamError::UnknownType {
                    name: self.name.clone(),
                    type_name: type_name.to_string(),
                });
            }
        }
        let key = format!("{}[{}]", self.name, type_name);
        let coerced = value.into().coerce(&key, self.kind)?;
        self.values.insert(type_name.to_string(), coerced);
        Ok(())
    }

    /// Value for a type: the explicit entry, else the default.
    pub fn get(&self, type_name: &str) -> Option<&ParamValue> {
        self.values.get(type_name).or(self.default.as_ref())
    }

    /// Record the simulation's type names and validate existing entries.
    pub fn cache_types(&mut self, types: &[String]) -> Result<(), ParamError> {
        if let Some(stray) = self.values.keys().find(|k| !types.iter().any(|t| t == *k)) {
            return Err(ParamError::UnknownType {
                name: self.name.clone(),
                type_name: stray.clone(),
            });
        }
        self.types = Some(types.iter().cloned().collect());
        Ok(())
    }

    /// Type names seen at the last broadcast, if any.
    pub fn cached_types(&self) -> Option<&[String]> {
        self.types.as_deref()
    }

    /// Fail if types were never cached or any cached type has no value.
    pub fn require_complete(&self) -> Result<(), ParamError> {
        let Some(types) = &self.types else {
            return Err(ParamError::Missing {
                name: format!("{}[*]", self.name),
            });
        };
        match types.iter().find(|t| self.get(t).is_none()) {
            Some(t) => Err(ParamError::Missing {
                name: format!("{}[{}]", self.name, t),
            }),
            None => Ok(()),
        }
    }

    /// Resolved `(type, value)` pairs for every cached type that has one.
    pub fn resolved(&self) -> Vec<(&str, &ParamValue)> {
        match &self.types {
            Some(types) => types
                .iter()
                .filter_map(|t| self.get(t).map(|v| (t.as_str(), v)))
                .collect(),
            None => Vec::new(),
        }
    }
}
