//! Vesper value core: runtime values, conversion rules and operator dispatch.
//!
//! Every value the interpreter touches is a [`Value`]. Values convert to
//! host representations through the [`Converter`] contract, combine through
//! an [`Arithmetic`] dispatcher and order through a [`Comparer`]. Objects
//! override all three by storing functions under reserved `__`-prefixed keys
//! (see [`MetaMethod`]).

pub mod builtins;
pub mod compare;
pub mod config;
pub mod context;
pub mod error;
pub mod func;
pub mod object;
pub mod ops;
pub mod recover;
pub mod values;

pub use builtins::BuiltinMod;
pub use compare::{Comparer, DefaultComparer};
pub use config::{ConfigError, CoreConfig};
pub use context::{CancelToken, Ctx};
pub use error::{ParseError, RuntimeError, TypeError};
pub use func::{Func, ScriptFunction};
pub use object::{MetaMethod, Object, ObjectStore, Table};
pub use ops::{Arithmetic, BinaryOp, DefaultArithmetic};
pub use recover::{protected_call, PanicPolicy};
pub use values::{type_of, Converter, NativeValue, TypeTag, Value};
