//! Integration tests for the converter contract.
//!
//! Covers primitive conversions, string parsing, object and func conversion
//! meta-methods, custom values and the native escape hatch.

use vesper_core::{Converter, Ctx, Func, NativeValue, Object, RuntimeError, TypeTag, Value};

fn ctx() -> Ctx {
    Ctx::background()
}

// ===========================================================================
// Bool
// ===========================================================================

#[test]
fn bool_conversions_are_zero_or_one() {
    let ctx = ctx();
    for (b, n, s) in [(true, 1, "true"), (false, 0, "false")] {
        let v = Value::Bool(b);
        assert_eq!(v.int(&ctx).unwrap(), n);
        assert_eq!(v.float(&ctx).unwrap(), n as f64);
        assert_eq!(v.string(&ctx).unwrap(), s);
        assert_eq!(v.bool(&ctx).unwrap(), b);
        assert_eq!(v.native(&ctx).unwrap(), NativeValue::Bool(b));
    }
}

// ===========================================================================
// String parsing
// ===========================================================================

#[test]
fn integer_strings_round_trip() {
    let ctx = ctx();
    for n in [0_i64, 1, -1, 42, -999, i64::MAX, i64::MIN] {
        let v = Value::from(n.to_string());
        assert_eq!(v.int(&ctx).unwrap(), n);
    }
}

#[test]
fn malformed_integer_strings_fail() {
    let ctx = ctx();
    for text in ["", "a9", "-999.23", "1e2", " 7"] {
        let err = Value::str(text).int(&ctx).unwrap_err();
        assert!(err.is_type_error(), "{:?} gave {}", text, err);
        assert!(matches!(err, RuntimeError::Parse(_)));
    }
}

#[test]
fn float_strings_parse() {
    let ctx = ctx();
    assert_eq!(Value::str("1e2").float(&ctx).unwrap(), 100.0);
    assert_eq!(Value::str("-999.00000").float(&ctx).unwrap(), -999.0);
    assert_eq!(Value::str("3.1415").float(&ctx).unwrap(), 3.1415);
    let err = Value::str("abc").float(&ctx).unwrap_err();
    assert!(err.is_type_error());
    assert!(err.to_string().contains("\"abc\""));
}

#[test]
fn string_truthiness_is_non_empty() {
    let ctx = ctx();
    assert!(!Value::str("").bool(&ctx).unwrap());
    assert!(Value::str("false").bool(&ctx).unwrap());
    assert!(Value::str("0").bool(&ctx).unwrap());
}

// ===========================================================================
// Objects
// ===========================================================================

#[test]
fn object_without_meta_methods() {
    let ctx = ctx();
    let o = Value::Object(Object::from_entries([("a", 1)]));
    assert!(o.bool(&ctx).unwrap());
    assert_eq!(o.string(&ctx).unwrap(), r#"{"a": 1}"#);
    assert!(o.int(&ctx).unwrap_err().is_type_error());
    assert!(o.float(&ctx).unwrap_err().is_type_error());
    assert_eq!(
        o.native(&ctx).unwrap(),
        NativeValue::Map(vec![(NativeValue::String("a".into()), NativeValue::Number(1.0))])
    );
}

#[test]
fn object_meta_methods_results_are_converted_again() {
    let ctx = ctx();
    let o = Object::new();
    o.set("__int", Func::native("", |_, _| Ok(Value::str("12"))));
    o.set("__float", Func::native("", |_, _| Ok(Value::str("1.5"))));
    o.set("__string", Func::native("", |_, _| Ok(Value::Number(2.0))));
    let v = Value::Object(o);
    assert_eq!(v.int(&ctx).unwrap(), 12);
    assert_eq!(v.float(&ctx).unwrap(), 1.5);
    assert_eq!(v.string(&ctx).unwrap(), "2");
}

#[test]
fn meta_method_errors_propagate() {
    let ctx = ctx();
    let o = Object::new();
    o.set("__bool", Func::native("", |_, _| Err(RuntimeError::DivisionByZero)));
    let err = Value::Object(o).bool(&ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::DivisionByZero));
}

#[test]
fn self_recursive_meta_method_hits_depth_limit() {
    let ctx = Ctx::background().with_max_meta_depth(8);
    let o = Object::new();
    let this = o.clone();
    o.set(
        "__string",
        Func::native("loop", move |ctx, _| {
            Value::Object(this.clone()).string(ctx).map(Value::from)
        }),
    );
    let err = Value::Object(o).string(&ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::MetaDepthExceeded(8)));
}

#[test]
fn depth_is_released_after_each_call() {
    let ctx = Ctx::background().with_max_meta_depth(1);
    let o = Object::new();
    o.set("__int", Func::native("", |_, _| Ok(Value::Number(1.0))));
    let v = Value::Object(o);
    for _ in 0..3 {
        assert_eq!(v.int(&ctx).unwrap(), 1);
    }
}

// ===========================================================================
// Funcs
// ===========================================================================

#[test]
fn func_string_override_through_props() {
    let ctx = ctx();
    let f = Func::native("f", |_, _| Ok(Value::Nil));
    f.props().set("__string", Func::native("", |_, _| Ok(Value::str("custom"))));
    assert_eq!(Value::Func(f).string(&ctx).unwrap(), "custom");
}

#[test]
fn func_native_is_a_handle() {
    let ctx = ctx();
    let f = Func::native("f", |_, _| Ok(Value::Nil));
    assert_eq!(
        Value::Func(f.clone()).native(&ctx).unwrap(),
        NativeValue::Handle(f.identity())
    );
}

// ===========================================================================
// Custom values
// ===========================================================================

struct Celsius(f64);

impl Converter for Celsius {
    fn int(&self, _ctx: &Ctx) -> Result<i64, RuntimeError> {
        Ok(self.0 as i64)
    }

    fn float(&self, _ctx: &Ctx) -> Result<f64, RuntimeError> {
        Ok(self.0)
    }

    fn string(&self, _ctx: &Ctx) -> Result<String, RuntimeError> {
        Ok(format!("{}°C", self.0))
    }

    fn bool(&self, _ctx: &Ctx) -> Result<bool, RuntimeError> {
        Ok(true)
    }

    fn native(&self, _ctx: &Ctx) -> Result<NativeValue, RuntimeError> {
        Ok(NativeValue::Number(self.0))
    }
}

#[test]
fn custom_values_delegate_to_their_converter() {
    let ctx = ctx();
    let v = Value::custom(Celsius(21.5));
    assert_eq!(v.type_tag(), TypeTag::Custom);
    assert_eq!(v.int(&ctx).unwrap(), 21);
    assert_eq!(v.float(&ctx).unwrap(), 21.5);
    assert_eq!(v.string(&ctx).unwrap(), "21.5°C");
    assert_eq!(v.native(&ctx).unwrap(), NativeValue::Number(21.5));
    assert_eq!(v, v.clone());
    assert_ne!(v, Value::custom(Celsius(21.5)));
}

#[test]
fn native_to_json() {
    let ctx = ctx();
    let o = Object::from_entries([("name", Value::str("x")), ("n", Value::Number(2.0))]);
    let json = Value::Object(o).native(&ctx).unwrap().to_json();
    assert_eq!(json, serde_json::json!({"name": "x", "n": 2.0}));
}
