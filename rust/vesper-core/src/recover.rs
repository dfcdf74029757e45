//! The protected-call boundary behind the `recover` builtin.
//!
//! Script failures travel as `Err(RuntimeError)` and are turned back into
//! values here. Native functions may also panic; those panics are caught at
//! the same boundary according to a [`PanicPolicy`], so they never unwind
//! into the interpreter loop.
//!
//! Payload normalization:
//!
//! - a raised script value is returned unchanged;
//! - any other runtime or host error becomes its message as a string;
//! - a native panic becomes its message, or the rendering of a primitive
//!   payload, or `"unknown panic payload"`.
//!
//! Cancellation and deadline errors are host signals and always propagate.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::values::Value;

/// Policy for native panics reaching a `recover` boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanicPolicy {
    /// Catch the panic and return its payload as a value.
    #[default]
    #[serde(rename = "catch")]
    CatchAndReturn,

    /// Catch the panic, log it, then behave like `CatchAndReturn`.
    #[serde(rename = "log")]
    LogAndContinue,

    /// Do not catch panics. Useful when debugging native code and the full
    /// backtrace is wanted.
    #[serde(rename = "abort")]
    Abort,
}

/// Turn an error that reached a recover boundary into a value.
pub fn error_to_value(err: RuntimeError) -> Value {
    match err {
        RuntimeError::Raised(v) => v,
        other => Value::from(other.to_string()),
    }
}

macro_rules! render_primitive {
    ($payload:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(v) = $payload.downcast_ref::<$ty>() {
                return Some(v.to_string());
            }
        )+
    };
}

fn render_payload(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return Some((*s).to_string());
    }
    render_primitive!(
        payload, String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
        usize, f32, f64,
    );
    None
}

/// Extract a value from a native panic payload.
pub fn panic_payload_to_value(payload: Box<dyn Any + Send>) -> Value {
    let message = render_payload(payload.as_ref()).unwrap_or_else(|| "unknown panic payload".to_string());
    Value::from(message)
}

/// Run `f` inside a protected scope and normalize whatever it raises.
pub fn protected_call(
    policy: PanicPolicy,
    f: impl FnOnce() -> Result<Value, RuntimeError>,
) -> Result<Value, RuntimeError> {
    let outcome = match policy {
        PanicPolicy::Abort => f(),
        PanicPolicy::CatchAndReturn | PanicPolicy::LogAndContinue => {
            match catch_unwind(AssertUnwindSafe(f)) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let value = panic_payload_to_value(payload);
                    if policy == PanicPolicy::LogAndContinue {
                        warn!(payload = ?value, "recovered from native panic");
                    }
                    return Ok(value);
                }
            }
        }
    };
    match outcome {
        Ok(v) => Ok(v),
        Err(err) if err.is_interrupt() => Err(err),
        Err(err) => {
            debug!(%err, "recovered");
            Ok(error_to_value(err))
        }
    }
}
