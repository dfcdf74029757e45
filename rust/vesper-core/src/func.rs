//! Callable values.

use std::fmt;
use std::rc::Rc;

use crate::context::Ctx;
use crate::error::{RuntimeError, TypeError};
use crate::object::{invoke_meta, MetaMethod, Object};
use crate::values::{Converter, TypeTag, Value};

/// Signature of host-native functions.
pub type NativeFn = dyn Fn(&Ctx, &[Value]) -> Result<Value, RuntimeError>;

/// Hook through which the interpreter exposes script-defined functions.
pub trait ScriptFunction {
    fn call(&self, ctx: &Ctx, this: Option<&Value>, args: &[Value]) -> Result<Value, RuntimeError>;
}

enum Callable {
    Native(Box<NativeFn>),
    Script(Box<dyn ScriptFunction>),
}

struct FuncInner {
    name: String,
    callable: Callable,
    props: Object,
}

/// A shared callable value, compared by identity.
///
/// Every function also owns a property object. Conversion meta-methods
/// (`__string`, `__bool`, `__int`, `__float`) stored there override the
/// default conversions, the same way they do for objects.
#[derive(Clone)]
pub struct Func(Rc<FuncInner>);

impl Func {
    pub fn native(
        name: impl Into<String>,
        f: impl Fn(&Ctx, &[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        Self::build(name.into(), Callable::Native(Box::new(f)))
    }

    pub fn script(name: impl Into<String>, f: impl ScriptFunction + 'static) -> Self {
        Self::build(name.into(), Callable::Script(Box::new(f)))
    }

    fn build(name: String, callable: Callable) -> Self {
        Func(Rc::new(FuncInner {
            name,
            callable,
            props: Object::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_native(&self) -> bool {
        matches!(self.0.callable, Callable::Native(_))
    }

    pub fn props(&self) -> &Object {
        &self.0.props
    }

    pub fn call(&self, ctx: &Ctx, args: &[Value]) -> Result<Value, RuntimeError> {
        self.invoke(ctx, None, args)
    }

    /// Call with a receiver. Native functions capture their state instead and
    /// ignore `this`.
    pub fn call_method(&self, ctx: &Ctx, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        self.invoke(ctx, Some(this), args)
    }

    fn invoke(&self, ctx: &Ctx, this: Option<&Value>, args: &[Value]) -> Result<Value, RuntimeError> {
        ctx.check()?;
        match &self.0.callable {
            Callable::Native(f) => f(ctx, args),
            Callable::Script(f) => f.call(ctx, this, args),
        }
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Func) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn meta(&self, ctx: &Ctx, mm: MetaMethod) -> Result<Option<Value>, RuntimeError> {
        invoke_meta(ctx, &self.0.props, &Value::Func(self.clone()), mm, &[])
    }

    pub(crate) fn convert_int(&self, ctx: &Ctx) -> Result<i64, RuntimeError> {
        match self.meta(ctx, MetaMethod::Int)? {
            Some(v) => v.int(ctx),
            None => Err(TypeError::unary(TypeTag::Func, "int").into()),
        }
    }

    pub(crate) fn convert_float(&self, ctx: &Ctx) -> Result<f64, RuntimeError> {
        match self.meta(ctx, MetaMethod::Float)? {
            Some(v) => v.float(ctx),
            None => Err(TypeError::unary(TypeTag::Func, "float").into()),
        }
    }

    pub(crate) fn convert_string(&self, ctx: &Ctx) -> Result<String, RuntimeError> {
        match self.meta(ctx, MetaMethod::String)? {
            Some(v) => v.string(ctx),
            None => Ok(format!("<func {} ({:#x})>", self.name(), self.identity())),
        }
    }

    pub(crate) fn convert_bool(&self, ctx: &Ctx) -> Result<bool, RuntimeError> {
        match self.meta(ctx, MetaMethod::Bool)? {
            Some(v) => v.bool(ctx),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.0.name)
            .field("native", &self.is_native())
            .finish()
    }
}
