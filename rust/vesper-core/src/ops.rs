//! Arithmetic operator dispatch.
//!
//! Resolution order for a binary operator:
//!
//! 1. two numbers: float arithmetic (`mod` truncates both operands first);
//! 2. `add` on two strings: concatenation;
//! 3. left operand is an object with `__<op>`: `left.__<op>(right, true)`;
//! 4. right operand is an object with `__<op>`: `right.__<op>(left, false)`;
//! 5. otherwise a [`TypeError`].

use strum::{Display, EnumIter, IntoStaticStr};
use tracing::trace;

use crate::context::Ctx;
use crate::error::{RuntimeError, TypeError};
use crate::object::MetaMethod;
use crate::values::{Converter, TypeTag, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn meta(self) -> MetaMethod {
        match self {
            BinaryOp::Add => MetaMethod::Add,
            BinaryOp::Sub => MetaMethod::Sub,
            BinaryOp::Mul => MetaMethod::Mul,
            BinaryOp::Div => MetaMethod::Div,
            BinaryOp::Mod => MetaMethod::Mod,
        }
    }
}

/// Arithmetic contract consumed by the interpreter.
pub trait Arithmetic {
    fn add(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError>;
    fn sub(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError>;
    fn mul(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError>;
    fn div(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError>;
    fn modulo(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError>;
    fn unm(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError>;
}

/// The standard arithmetic rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultArithmetic;

impl DefaultArithmetic {
    pub fn binary_op(
        &self,
        ctx: &Ctx,
        l: &Value,
        r: &Value,
        op: BinaryOp,
    ) -> Result<Value, RuntimeError> {
        ctx.check()?;
        let (lt, rt) = (l.type_tag(), r.type_tag());
        match (lt, rt) {
            (TypeTag::Number, TypeTag::Number) => return number_op(ctx, l, r, op),
            (TypeTag::String, TypeTag::String) if op == BinaryOp::Add => {
                let mut s = l.string(ctx)?;
                s.push_str(&r.string(ctx)?);
                return Ok(Value::from(s));
            }
            _ => {}
        }
        if let Some(lo) = l.as_object() {
            let args = [r.clone(), Value::Bool(true)];
            if let Some(v) = lo.call_meta_method(ctx, op.meta(), &args)? {
                return Ok(v);
            }
        }
        if let Some(ro) = r.as_object() {
            let args = [l.clone(), Value::Bool(false)];
            if let Some(v) = ro.call_meta_method(ctx, op.meta(), &args)? {
                return Ok(v);
            }
        }
        trace!(op = op.name(), %lt, %rt, "no arithmetic rule applies");
        Err(TypeError::binary(lt, rt, op.name()).into())
    }
}

fn number_op(ctx: &Ctx, l: &Value, r: &Value, op: BinaryOp) -> Result<Value, RuntimeError> {
    let n = match op {
        BinaryOp::Add => l.float(ctx)? + r.float(ctx)?,
        BinaryOp::Sub => l.float(ctx)? - r.float(ctx)?,
        BinaryOp::Mul => l.float(ctx)? * r.float(ctx)?,
        BinaryOp::Div => l.float(ctx)? / r.float(ctx)?,
        // Remainder of the truncated operands, sign of the dividend.
        BinaryOp::Mod => {
            let (x, y) = (l.int(ctx)?, r.int(ctx)?);
            if y == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            x.wrapping_rem(y) as f64
        }
    };
    Ok(Value::Number(n))
}

impl Arithmetic for DefaultArithmetic {
    fn add(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        self.binary_op(ctx, l, r, BinaryOp::Add)
    }

    fn sub(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        self.binary_op(ctx, l, r, BinaryOp::Sub)
    }

    fn mul(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        self.binary_op(ctx, l, r, BinaryOp::Mul)
    }

    fn div(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        self.binary_op(ctx, l, r, BinaryOp::Div)
    }

    fn modulo(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        self.binary_op(ctx, l, r, BinaryOp::Mod)
    }

    fn unm(&self, ctx: &Ctx, v: &Value) -> Result<Value, RuntimeError> {
        ctx.check()?;
        let vt = v.type_tag();
        if vt == TypeTag::Number {
            return Ok(Value::Number(-v.float(ctx)?));
        }
        if let Some(o) = v.as_object() {
            if let Some(res) = o.call_meta_method(ctx, MetaMethod::Unm, &[])? {
                return Ok(res);
            }
        }
        Err(TypeError::unary(vt, "unm").into())
    }
}
