//! Ordering of values.
//!
//! Values of the same kind compare naturally. Values of different kinds have
//! no natural order, so after giving objects a chance through `__cmp` the
//! result comes from a fixed cross-kind matrix. The matrix values are a
//! compatibility contract and must not be changed.

use std::cmp::Ordering;

use tracing::trace;

use crate::context::Ctx;
use crate::error::RuntimeError;
use crate::object::{MetaMethod, Object};
use crate::values::{Converter, TypeTag, Value};

const KINDS: usize = 7;

/// `UNEQ_MATRIX[left][right]`, indexed by [`TypeTag`] discriminant in the
/// order nil, bool, number, string, object, func, custom.
#[rustfmt::skip]
pub const UNEQ_MATRIX: [[i8; KINDS]; KINDS] = [
    //  nil bool number string object func custom
    [   0,  -1,  -1,    -1,    -1,    -1,  -1], // nil
    [   1,   0,  -1,    -1,    -1,    -1,  -1], // bool
    [   1,   1,   0,    -1,    -1,     1,   1], // number
    [   1,   1,   1,     0,     1,     1,   1], // string
    [   1,   1,   1,    -1,     0,     1,   1], // object
    [   1,   1,  -1,    -1,    -1,     0,   1], // func
    [   1,   1,  -1,    -1,    -1,    -1,   0], // custom
];

/// Arbitrary but stable order between two kinds.
pub fn cross_kind_order(l: TypeTag, r: TypeTag) -> Ordering {
    UNEQ_MATRIX[l as usize][r as usize].cmp(&0)
}

/// Comparer contract consumed by the interpreter.
pub trait Comparer {
    fn cmp(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Ordering, RuntimeError>;

    fn equals(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<bool, RuntimeError> {
        Ok(self.cmp(ctx, l, r)? == Ordering::Equal)
    }
}

/// The standard comparison rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultComparer;

fn meta_cmp(
    ctx: &Ctx,
    o: &Object,
    other: &Value,
    is_left: bool,
) -> Result<Option<Ordering>, RuntimeError> {
    let args = [other.clone(), Value::Bool(is_left)];
    match o.call_meta_method(ctx, MetaMethod::Cmp, &args)? {
        Some(v) => Ok(Some(v.int(ctx)?.cmp(&0))),
        None => Ok(None),
    }
}

impl DefaultComparer {
    fn same_kind(&self, ctx: &Ctx, kind: TypeTag, l: &Value, r: &Value) -> Result<Ordering, RuntimeError> {
        let ord = match kind {
            TypeTag::Nil => Ordering::Equal,
            TypeTag::Number => {
                let (lf, rf) = (l.float(ctx)?, r.float(ctx)?);
                // An unordered pair (NaN) falls through to Greater.
                if lf == rf {
                    Ordering::Equal
                } else if lf < rf {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            TypeTag::String => l.string(ctx)?.cmp(&r.string(ctx)?),
            TypeTag::Bool => l.bool(ctx)?.cmp(&r.bool(ctx)?),
            TypeTag::Func => {
                if l.native(ctx)? == r.native(ctx)? {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }
            TypeTag::Object => {
                if let (Some(lo), Some(ro)) = (l.as_object(), r.as_object()) {
                    if let Some(ord) = meta_cmp(ctx, lo, r, true)? {
                        return Ok(ord);
                    }
                    if let Some(ord) = meta_cmp(ctx, ro, l, false)? {
                        return Ok(ord);
                    }
                }
                if l == r {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }
            TypeTag::Custom => {
                if l == r {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }
        };
        Ok(ord)
    }
}

impl Comparer for DefaultComparer {
    fn cmp(&self, ctx: &Ctx, l: &Value, r: &Value) -> Result<Ordering, RuntimeError> {
        ctx.check()?;
        let (lt, rt) = (l.type_tag(), r.type_tag());
        if lt == rt {
            return self.same_kind(ctx, lt, l, r);
        }
        let meta = if let Some(lo) = l.as_object() {
            meta_cmp(ctx, lo, r, true)?
        } else if let Some(ro) = r.as_object() {
            meta_cmp(ctx, ro, l, false)?
        } else {
            None
        };
        if let Some(ord) = meta {
            return Ok(ord);
        }
        trace!(%lt, %rt, "cross-kind comparison from matrix");
        Ok(cross_kind_order(lt, rt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::Func;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn matrix_dimensions_match_kinds() {
        assert_eq!(TypeTag::COUNT, KINDS);
        for (i, tag) in TypeTag::iter().enumerate() {
            assert_eq!(tag as usize, i);
        }
    }

    #[test]
    fn matrix_is_antisymmetric_with_zero_diagonal() {
        for a in TypeTag::iter() {
            for b in TypeTag::iter() {
                let ab = UNEQ_MATRIX[a as usize][b as usize];
                let ba = UNEQ_MATRIX[b as usize][a as usize];
                if a == b {
                    assert_eq!(ab, 0, "{} vs itself", a);
                } else {
                    assert_eq!(ab, -ba, "{} vs {}", a, b);
                    assert_ne!(ab, 0, "{} vs {}", a, b);
                }
            }
        }
    }

    #[test]
    fn nil_sorts_first_and_string_last() {
        for t in TypeTag::iter().filter(|t| *t != TypeTag::Nil) {
            assert_eq!(cross_kind_order(TypeTag::Nil, t), Ordering::Less);
        }
        for t in TypeTag::iter().filter(|t| *t != TypeTag::String) {
            assert_eq!(cross_kind_order(TypeTag::String, t), Ordering::Greater);
        }
    }

    #[test]
    fn same_kind_primitives() {
        let ctx = Ctx::background();
        let c = DefaultComparer;
        assert_eq!(c.cmp(&ctx, &Value::Nil, &Value::Nil).unwrap(), Ordering::Equal);
        assert_eq!(
            c.cmp(&ctx, &Value::Number(1.0), &Value::Number(2.0)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            c.cmp(&ctx, &Value::str("b"), &Value::str("a")).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            c.cmp(&ctx, &Value::Bool(true), &Value::Bool(false)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            c.cmp(&ctx, &Value::Number(f64::NAN), &Value::Number(1.0)).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn funcs_compare_by_identity() {
        let ctx = Ctx::background();
        let c = DefaultComparer;
        let f = Value::Func(Func::native("f", |_, _| Ok(Value::Nil)));
        let g = Value::Func(Func::native("g", |_, _| Ok(Value::Nil)));
        assert_eq!(c.cmp(&ctx, &f, &f.clone()).unwrap(), Ordering::Equal);
        assert_eq!(c.cmp(&ctx, &f, &g).unwrap(), Ordering::Less);
        assert_eq!(c.cmp(&ctx, &g, &f).unwrap(), Ordering::Less);
    }

    #[test]
    fn objects_without_cmp_use_identity() {
        let ctx = Ctx::background();
        let c = DefaultComparer;
        let a = Value::Object(Object::new());
        let b = Value::Object(Object::new());
        assert!(c.equals(&ctx, &a, &a.clone()).unwrap());
        assert_eq!(c.cmp(&ctx, &a, &b).unwrap(), Ordering::Less);
    }

    #[test]
    fn cross_kind_uses_matrix() {
        let ctx = Ctx::background();
        let c = DefaultComparer;
        assert_eq!(
            c.cmp(&ctx, &Value::Number(1.0), &Value::str("1")).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            c.cmp(&ctx, &Value::Bool(true), &Value::Nil).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            c.cmp(&ctx, &Value::Object(Object::new()), &Value::Number(9.0)).unwrap(),
            Ordering::Greater
        );
    }
}
