//! Objects and the meta-method protocol.
//!
//! An [`Object`] is a shared handle to some [`ObjectStore`]. The dispatchers
//! never look at the storage layout: they only use `get`/`set`/`len`/`keys`
//! and the reserved `"__name"` keys, so alternative stores can be plugged in
//! with [`Object::from_store`].
//!
//! A meta-method is simply a [`Func`] stored under a reserved string key.
//! Looking one up is a capability probe: a missing key, or a key holding
//! something that is not callable, means "fall through to the next rule",
//! never failure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use strum::{EnumCount, EnumIter};
use tracing::trace;

use crate::context::Ctx;
use crate::error::{RuntimeError, TypeError};
use crate::func::Func;
use crate::values::{format_number, Converter, NativeValue, TypeTag, Value};

/// Reserved meta-method names consumed by the value core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum MetaMethod {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Unm,
    Cmp,
    Bool,
    String,
    Int,
    Float,
    Keys,
}

impl MetaMethod {
    pub fn name(self) -> &'static str {
        match self {
            MetaMethod::Add => "__add",
            MetaMethod::Sub => "__sub",
            MetaMethod::Mul => "__mul",
            MetaMethod::Div => "__div",
            MetaMethod::Mod => "__mod",
            MetaMethod::Unm => "__unm",
            MetaMethod::Cmp => "__cmp",
            MetaMethod::Bool => "__bool",
            MetaMethod::String => "__string",
            MetaMethod::Int => "__int",
            MetaMethod::Float => "__float",
            MetaMethod::Keys => "__keys",
        }
    }
}

// ---------------------------------------------------------------------------
// Storage contract
// ---------------------------------------------------------------------------

/// Storage behind an [`Object`] handle.
///
/// Mutation goes through `&self`: stores use interior mutability because an
/// object is shared by every holder of the handle. The host serializes
/// writers; stores need no locking.
pub trait ObjectStore {
    fn get(&self, key: &Value) -> Option<Value>;
    /// Insert or replace `key`. Storing `Nil` removes the entry.
    fn set(&self, key: Value, value: Value);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Own keys in the store's iteration order.
    fn keys(&self) -> Vec<Value>;
    fn entries(&self) -> Vec<(Value, Value)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.get(&k).map(|v| (k, v)))
            .collect()
    }
}

/// Hash key wrapper giving values their key semantics: content equality for
/// primitives (`0` and `-0` are the same key, as are all NaNs) and identity
/// for objects, funcs and custom values.
#[derive(Clone)]
struct ValueKey(Value);

fn number_key_bits(n: f64) -> u64 {
    if n == 0.0 {
        0
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Number(a), Value::Number(b)) => number_key_bits(*a) == number_key_bits(*b),
            (a, b) => a == b,
        }
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.type_tag().hash(state);
        match &self.0 {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => number_key_bits(*n).hash(state),
            Value::String(s) => s.hash(state),
            other => other.identity().hash(state),
        }
    }
}

/// Default insertion-ordered store.
#[derive(Default)]
pub struct Table {
    inner: RefCell<TableInner>,
}

#[derive(Default)]
struct TableInner {
    entries: Vec<(Value, Value)>,
    index: HashMap<ValueKey, usize>,
}

impl TableInner {
    fn remove(&mut self, key: &ValueKey) {
        let Some(pos) = self.index.remove(key) else {
            return;
        };
        self.entries.remove(pos);
        for (i, (k, _)) in self.entries.iter().enumerate().skip(pos) {
            self.index.insert(ValueKey(k.clone()), i);
        }
    }
}

impl ObjectStore for Table {
    fn get(&self, key: &Value) -> Option<Value> {
        let inner = self.inner.borrow();
        inner
            .index
            .get(&ValueKey(key.clone()))
            .map(|&i| inner.entries[i].1.clone())
    }

    fn set(&self, key: Value, value: Value) {
        let mut inner = self.inner.borrow_mut();
        let vk = ValueKey(key);
        if value.is_nil() {
            inner.remove(&vk);
            return;
        }
        match inner.index.get(&vk).copied() {
            Some(i) => inner.entries[i].1 = value,
            None => {
                let i = inner.entries.len();
                inner.entries.push((vk.0.clone(), value));
                inner.index.insert(vk, i);
            }
        }
    }

    fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    fn keys(&self) -> Vec<Value> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        self.inner.borrow().entries.clone()
    }
}

// ---------------------------------------------------------------------------
// Object handle
// ---------------------------------------------------------------------------

/// Shared, mutable mapping from values to values.
#[derive(Clone)]
pub struct Object(Rc<dyn ObjectStore>);

impl Object {
    /// An empty object backed by the default [`Table`].
    pub fn new() -> Self {
        Self::from_store(Table::default())
    }

    pub fn from_store(store: impl ObjectStore + 'static) -> Self {
        Object(Rc::new(store))
    }

    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        let obj = Self::new();
        for (k, v) in entries {
            obj.set(k, v);
        }
        obj
    }

    /// An object acting as a sequence: keys `0, 1, …` in order.
    pub fn from_list(items: impl IntoIterator<Item = Value>) -> Self {
        let obj = Self::new();
        for (i, item) in items.into_iter().enumerate() {
            obj.set(Value::Number(i as f64), item);
        }
        obj
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<Value> {
        self.0.get(&Value::str(key))
    }

    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) {
        self.0.set(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.keys()
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.entries()
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        self.identity() == other.identity()
    }

    /// Probe for a meta-method without calling it.
    pub fn meta_method(&self, mm: MetaMethod) -> Option<Func> {
        match self.get_str(mm.name()) {
            Some(Value::Func(f)) => Some(f),
            _ => None,
        }
    }

    /// Call the meta-method `mm` with `args` if the object defines it.
    /// `Ok(None)` means the object does not participate.
    pub fn call_meta_method(
        &self,
        ctx: &Ctx,
        mm: MetaMethod,
        args: &[Value],
    ) -> Result<Option<Value>, RuntimeError> {
        invoke_meta(ctx, self, &Value::Object(self.clone()), mm, args)
    }

    pub(crate) fn convert_int(&self, ctx: &Ctx) -> Result<i64, RuntimeError> {
        match self.call_meta_method(ctx, MetaMethod::Int, &[])? {
            Some(v) => v.int(ctx),
            None => Err(TypeError::unary(TypeTag::Object, "int").into()),
        }
    }

    pub(crate) fn convert_float(&self, ctx: &Ctx) -> Result<f64, RuntimeError> {
        match self.call_meta_method(ctx, MetaMethod::Float, &[])? {
            Some(v) => v.float(ctx),
            None => Err(TypeError::unary(TypeTag::Object, "float").into()),
        }
    }

    pub(crate) fn convert_string(&self, ctx: &Ctx) -> Result<String, RuntimeError> {
        match self.call_meta_method(ctx, MetaMethod::String, &[])? {
            Some(v) => v.string(ctx),
            None => Ok(self.dump()),
        }
    }

    pub(crate) fn convert_bool(&self, ctx: &Ctx) -> Result<bool, RuntimeError> {
        match self.call_meta_method(ctx, MetaMethod::Bool, &[])? {
            Some(v) => v.bool(ctx),
            None => Ok(true),
        }
    }

    /// Structural rendering of the entries, `{}` when empty. Nested objects
    /// are rendered structurally as well; cycles print as `{...}`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, &mut Vec::new());
        out
    }

    fn dump_into(&self, out: &mut String, seen: &mut Vec<usize>) {
        let id = self.identity();
        if seen.contains(&id) {
            out.push_str("{...}");
            return;
        }
        seen.push(id);
        out.push('{');
        for (i, (k, v)) in self.entries().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            dump_entry(k, out, seen);
            out.push_str(": ");
            dump_entry(v, out, seen);
        }
        out.push('}');
        seen.pop();
    }

    pub(crate) fn native_inner(
        &self,
        ctx: &Ctx,
        seen: &mut Vec<usize>,
    ) -> Result<NativeValue, RuntimeError> {
        let id = self.identity();
        if seen.contains(&id) {
            return Ok(NativeValue::Handle(id));
        }
        seen.push(id);
        let mut entries = Vec::with_capacity(self.len());
        for (k, v) in self.entries() {
            entries.push((k.native_inner(ctx, seen)?, v.native_inner(ctx, seen)?));
        }
        seen.pop();
        Ok(NativeValue::Map(entries))
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

fn dump_entry(v: &Value, out: &mut String, seen: &mut Vec<usize>) {
    match v {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) => {
            let _ = write!(out, "{:?}", s);
        }
        Value::Object(o) => o.dump_into(out, seen),
        Value::Func(f) => {
            let _ = write!(out, "<func {}>", f.name());
        }
        Value::Custom(_) => out.push_str("<custom>"),
    }
}

/// Look up `mm` in `holder` and call it with `this` as receiver.
pub(crate) fn invoke_meta(
    ctx: &Ctx,
    holder: &Object,
    this: &Value,
    mm: MetaMethod,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let Some(func) = holder.meta_method(mm) else {
        return Ok(None);
    };
    let _guard = ctx.enter_meta()?;
    trace!(meta = mm.name(), func = func.name(), "calling meta-method");
    func.call_method(ctx, this, args).map(Some)
}
