//! Error types raised by conversions, dispatchers and builtins.
//!
//! Every fallible operation in this crate returns `Result<_, RuntimeError>`.
//! Unwinding stops only at the `recover` builtin, which normalizes the error
//! back into a [`Value`].

use std::rc::Rc;

use thiserror::Error;

use crate::values::{TypeTag, Value};

/// An operator or conversion was applied to operand kinds it does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type error: {op} not allowed with {}", operands(.left, .right))]
pub struct TypeError {
    op: &'static str,
    left: TypeTag,
    right: Option<TypeTag>,
}

impl TypeError {
    pub fn new(left: TypeTag, right: Option<TypeTag>, op: &'static str) -> Self {
        Self { op, left, right }
    }

    pub fn unary(left: TypeTag, op: &'static str) -> Self {
        Self::new(left, None, op)
    }

    pub fn binary(left: TypeTag, right: TypeTag, op: &'static str) -> Self {
        Self::new(left, Some(right), op)
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn left(&self) -> TypeTag {
        self.left
    }

    pub fn right(&self) -> Option<TypeTag> {
        self.right
    }
}

fn operands(left: &TypeTag, right: &Option<TypeTag>) -> String {
    match right {
        Some(right) => format!("types {} and {}", left, right),
        None => format!("type {}", left),
    }
}

/// A string did not hold a valid numeric literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error: cannot convert {text:?} to {target}: {reason}")]
pub struct ParseError {
    pub text: String,
    pub target: &'static str,
    pub reason: String,
}

/// Every failure that can unwind out of the value core.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("division by zero")]
    DivisionByZero,
    /// A script-level `panic` carrying its payload.
    #[error("panic: {0:?}")]
    Raised(Value),
    /// An error produced by host code, e.g. a native function.
    #[error("{0}")]
    Host(Rc<dyn std::error::Error>),
    #[error("meta-method nesting exceeded {0} levels")]
    MetaDepthExceeded(usize),
    #[error("execution cancelled")]
    Cancelled,
    #[error("execution deadline exceeded")]
    DeadlineExceeded,
}

impl RuntimeError {
    /// Wrap a host error so that it can travel through the dispatchers.
    pub fn host(err: impl std::error::Error + 'static) -> Self {
        RuntimeError::Host(Rc::new(err))
    }

    /// True for illegal conversions and unresolved operators, including
    /// malformed numeric strings.
    pub fn is_type_error(&self) -> bool {
        matches!(self, RuntimeError::Type(_) | RuntimeError::Parse(_))
    }

    /// Host signals that `recover` must never swallow.
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            RuntimeError::Cancelled | RuntimeError::DeadlineExceeded
        )
    }

    pub fn raised_value(&self) -> Option<&Value> {
        match self {
            RuntimeError::Raised(v) => Some(v),
            _ => None,
        }
    }
}
