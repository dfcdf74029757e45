//! Language-level intrinsic functions.
//!
//! Every builtin is built on the converter contract and the meta-method
//! protocol; none of them inspects object storage beyond `len` and `keys`.

use tracing::debug;

use crate::config::CoreConfig;
use crate::context::Ctx;
use crate::error::{RuntimeError, TypeError};
use crate::func::Func;
use crate::object::{MetaMethod, Object};
use crate::recover::{protected_call, PanicPolicy};
use crate::values::{parse_float, type_of, Converter, TypeTag, Value};

/// Names under which [`BuiltinMod::module`] exposes the builtins.
pub const BUILTIN_NAMES: [&str; 8] = [
    "len", "keys", "type", "bool", "string", "number", "panic", "recover",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinMod {
    panic_policy: PanicPolicy,
}

impl BuiltinMod {
    pub fn new(config: &CoreConfig) -> Self {
        Self::with_policy(config.recover.panic_policy)
    }

    pub fn with_policy(panic_policy: PanicPolicy) -> Self {
        Self { panic_policy }
    }

    /// Length of a value: entry count for objects, byte length of the string
    /// conversion for everything else, `0` for nil.
    pub fn len(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        let n = match v {
            Value::Nil => 0,
            Value::Object(o) => o.len(),
            other => other.string(ctx)?.len(),
        };
        Ok(Value::Number(n as f64))
    }

    /// Keys of an object as a sequence object, unless the object provides
    /// its own `__keys`, whose result is returned as is.
    pub fn keys(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        let Some(o) = v.as_object() else {
            return Err(TypeError::unary(v.type_tag(), "keys").into());
        };
        if let Some(custom) = o.call_meta_method(ctx, MetaMethod::Keys, &[])? {
            return Ok(custom);
        }
        Ok(Value::Object(Object::from_list(o.keys())))
    }

    pub fn type_of(&self, v: &Value) -> Value {
        Value::str(type_of(v))
    }

    pub fn bool(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        v.bool(ctx).map(Value::Bool)
    }

    pub fn string(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        v.string(ctx).map(Value::from)
    }

    pub fn number(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        match v {
            Value::Number(_) => Ok(v.clone()),
            Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => parse_float(s).map(Value::Number),
            Value::Object(o) => {
                if let Some(res) = o.call_meta_method(ctx, MetaMethod::Float, &[])? {
                    return res.float(ctx).map(Value::Number);
                }
                if let Some(res) = o.call_meta_method(ctx, MetaMethod::Int, &[])? {
                    return res.int(ctx).map(|n| Value::Number(n as f64));
                }
                Err(TypeError::unary(TypeTag::Object, "number").into())
            }
            Value::Custom(c) => c.float(ctx).map(Value::Number),
            Value::Nil | Value::Func(_) => Err(TypeError::unary(v.type_tag(), "number").into()),
        }
    }

    /// Raise `v` if it is truthy; a falsy value is a no-op.
    pub fn panic(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        if v.bool(ctx)? {
            return Err(RuntimeError::Raised(v.clone()));
        }
        Ok(Value::Nil)
    }

    /// Call `f` with no arguments and turn anything it raises into a value.
    pub fn recover(&self, ctx: &Ctx, f: &Value) -> Result<Value, RuntimeError> {
        let Some(func) = f.as_func() else {
            return Err(TypeError::unary(f.type_tag(), "call").into());
        };
        debug!(func = func.name(), "entering recover boundary");
        protected_call(self.panic_policy, || func.call(ctx, &[]))
    }

    /// An object holding every builtin as a native function, keyed by name.
    pub fn module(&self) -> Object {
        let bi = *self;
        let m = Object::new();
        m.set("len", Func::native("len", move |ctx, args| bi.len(ctx, &arg(args))));
        m.set("keys", Func::native("keys", move |ctx, args| bi.keys(ctx, &arg(args))));
        m.set("type", Func::native("type", move |_, args| Ok(bi.type_of(&arg(args)))));
        m.set("bool", Func::native("bool", move |ctx, args| bi.bool(ctx, &arg(args))));
        m.set("string", Func::native("string", move |ctx, args| bi.string(ctx, &arg(args))));
        m.set("number", Func::native("number", move |ctx, args| bi.number(ctx, &arg(args))));
        m.set("panic", Func::native("panic", move |ctx, args| bi.panic(ctx, &arg(args))));
        m.set("recover", Func::native("recover", move |ctx, args| bi.recover(ctx, &arg(args))));
        m
    }
}

/// First argument, nil when missing.
fn arg(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or_default()
}
