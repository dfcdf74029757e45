//! Runtime values and the converter contract.

use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};
use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

use crate::context::Ctx;
use crate::error::{ParseError, RuntimeError, TypeError};
use crate::func::Func;
use crate::object::Object;

/// String rendering of [`Value::Nil`].
pub const NIL_STRING: &str = "nil";

/// Conversions every value supports.
///
/// Conversions either succeed or fail with a [`RuntimeError`]; they never
/// silently produce a default. Host-defined kinds wrapped in
/// [`Value::Custom`] implement this trait directly.
pub trait Converter {
    /// Magnitude as a truncating 64-bit integer.
    fn int(&self, ctx: &Ctx) -> Result<i64, RuntimeError>;
    /// Magnitude as a 64-bit float.
    fn float(&self, ctx: &Ctx) -> Result<f64, RuntimeError>;
    /// Textual representation.
    fn string(&self, ctx: &Ctx) -> Result<String, RuntimeError>;
    /// Truthiness.
    fn bool(&self, ctx: &Ctx) -> Result<bool, RuntimeError>;
    /// Host-native escape hatch.
    fn native(&self, ctx: &Ctx) -> Result<NativeValue, RuntimeError>;
}

/// Canonical kind of a value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum TypeTag {
    Nil,
    Bool,
    Number,
    String,
    Object,
    Func,
    Custom,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Runtime values of the language.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    Func(Func),
    /// Host-defined kind; its type tag is always `"custom"`.
    Custom(Rc<dyn Converter>),
}

/// Return the type tag of `v` as a string.
pub fn type_of(v: &Value) -> &'static str {
    v.type_tag().as_str()
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn custom(c: impl Converter + 'static) -> Self {
        Value::Custom(Rc::new(c))
    }

    /// The single place where kind-based branching is decided.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Nil => TypeTag::Nil,
            Value::Bool(_) => TypeTag::Bool,
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Object(_) => TypeTag::Object,
            Value::Func(_) => TypeTag::Func,
            Value::Custom(_) => TypeTag::Custom,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Func> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Address of the shared allocation for identity-compared kinds.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(o) => Some(o.identity()),
            Value::Func(f) => Some(f.identity()),
            Value::Custom(c) => Some(Rc::as_ptr(c) as *const () as usize),
            _ => None,
        }
    }

    /// Pretty-print the value for debug logs.
    pub fn dump(&self) -> String {
        match self {
            Value::Nil => "[Nil]".to_string(),
            Value::Bool(b) => format!("{} (Bool)", b),
            Value::Number(n) => format!("{} (Number)", format_number(*n)),
            Value::String(s) => format!("\"{}\" (String)", s),
            Value::Object(o) => format!("{} (Object)", o.dump()),
            Value::Func(f) => format!("<func {}> (Func)", f.name()),
            Value::Custom(_) => "<custom> (Custom)".to_string(),
        }
    }

    pub(crate) fn native_inner(
        &self,
        ctx: &Ctx,
        seen: &mut Vec<usize>,
    ) -> Result<NativeValue, RuntimeError> {
        match self {
            Value::Object(o) => o.native_inner(ctx, seen),
            other => other.native(ctx),
        }
    }
}

impl Converter for Value {
    fn int(&self, ctx: &Ctx) -> Result<i64, RuntimeError> {
        match self {
            Value::Nil => Err(TypeError::unary(TypeTag::Nil, "int").into()),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Number(n) => Ok(n.trunc() as i64),
            Value::String(s) => parse_int(s),
            Value::Object(o) => o.convert_int(ctx),
            Value::Func(f) => f.convert_int(ctx),
            Value::Custom(c) => c.int(ctx),
        }
    }

    fn float(&self, ctx: &Ctx) -> Result<f64, RuntimeError> {
        match self {
            Value::Nil => Err(TypeError::unary(TypeTag::Nil, "float").into()),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(*n),
            Value::String(s) => parse_float(s),
            Value::Object(o) => o.convert_float(ctx),
            Value::Func(f) => f.convert_float(ctx),
            Value::Custom(c) => c.float(ctx),
        }
    }

    fn string(&self, ctx: &Ctx) -> Result<String, RuntimeError> {
        match self {
            Value::Nil => Ok(NIL_STRING.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::String(s) => Ok(s.to_string()),
            Value::Object(o) => o.convert_string(ctx),
            Value::Func(f) => f.convert_string(ctx),
            Value::Custom(c) => c.string(ctx),
        }
    }

    fn bool(&self, ctx: &Ctx) -> Result<bool, RuntimeError> {
        match self {
            Value::Nil => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::String(s) => Ok(!s.is_empty()),
            Value::Object(o) => o.convert_bool(ctx),
            Value::Func(f) => f.convert_bool(ctx),
            Value::Custom(c) => c.bool(ctx),
        }
    }

    fn native(&self, ctx: &Ctx) -> Result<NativeValue, RuntimeError> {
        match self {
            Value::Nil => Ok(NativeValue::Nil),
            Value::Bool(b) => Ok(NativeValue::Bool(*b)),
            Value::Number(n) => Ok(NativeValue::Number(*n)),
            Value::String(s) => Ok(NativeValue::String(s.to_string())),
            Value::Object(o) => o.native_inner(ctx, &mut Vec::new()),
            Value::Func(f) => Ok(NativeValue::Handle(f.identity())),
            Value::Custom(c) => c.native(ctx),
        }
    }
}

/// Raw equality: content for primitives, identity for shared kinds.
/// This never calls meta-methods; use a `Comparer` for script semantics.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Custom(a), Value::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Func> for Value {
    fn from(f: Func) -> Self {
        Value::Func(f)
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Shortest decimal rendering that round-trips, never in exponent form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { '+' } else { '-' };
        format!("{}Inf", sign)
    } else {
        format!("{}", n)
    }
}

/// Decimal integer literal with an optional sign; nothing else.
pub fn parse_int(text: &str) -> Result<i64, RuntimeError> {
    text.parse::<i64>().map_err(|e| {
        ParseError {
            text: text.to_string(),
            target: "int",
            reason: e.to_string(),
        }
        .into()
    })
}

/// Standard float grammar, exponents included.
pub fn parse_float(text: &str) -> Result<f64, RuntimeError> {
    text.parse::<f64>().map_err(|e| {
        ParseError {
            text: text.to_string(),
            target: "float",
            reason: e.to_string(),
        }
        .into()
    })
}

// ---------------------------------------------------------------------------
// NativeValue
// ---------------------------------------------------------------------------

/// Host-side representation returned by [`Converter::native`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    /// Object entries in storage order.
    Map(Vec<(NativeValue, NativeValue)>),
    /// Opaque identity of a function, a custom value or a cyclic object.
    Handle(usize),
}

impl NativeValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            NativeValue::Nil => serde_json::Value::Null,
            NativeValue::Bool(b) => serde_json::Value::Bool(*b),
            NativeValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            NativeValue::String(s) => serde_json::Value::String(s.clone()),
            NativeValue::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.key_string(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
            NativeValue::Handle(h) => serde_json::Value::String(format!("<handle {:#x}>", h)),
        }
    }

    fn key_string(&self) -> String {
        match self {
            NativeValue::String(s) => s.clone(),
            NativeValue::Number(n) => format_number(*n),
            NativeValue::Nil => NIL_STRING.to_string(),
            NativeValue::Bool(b) => b.to_string(),
            other => other.to_json().to_string(),
        }
    }
}

impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
