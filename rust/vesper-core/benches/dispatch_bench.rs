use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vesper_core::{
    Arithmetic, BinaryOp, Comparer, Ctx, DefaultArithmetic, DefaultComparer, Func, Object, Value,
};

fn arithmetic_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");
    let ctx = Ctx::background();
    let ar = DefaultArithmetic;

    // Number fast path
    let (a, b) = (Value::Number(3.5), Value::Number(1.25));
    for op in [BinaryOp::Add, BinaryOp::Div, BinaryOp::Mod] {
        group.bench_with_input(BenchmarkId::new("number", op), &op, |bch, &op| {
            bch.iter(|| black_box(ar.binary_op(&ctx, black_box(&a), black_box(&b), op).unwrap()));
        });
    }

    // String concatenation
    let (s, t) = (Value::str("hello, "), Value::str("world"));
    group.bench_function("string_concat", |bch| {
        bch.iter(|| black_box(ar.add(&ctx, black_box(&s), black_box(&t)).unwrap()));
    });

    // Object meta-method fallback
    let obj = Object::new();
    obj.set("__add", Func::native("add", |_, args| Ok(args[0].clone())));
    let o = Value::Object(obj);
    group.bench_function("meta_add", |bch| {
        bch.iter(|| black_box(ar.add(&ctx, black_box(&o), black_box(&a)).unwrap()));
    });

    group.finish();
}

fn compare_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    let ctx = Ctx::background();
    let cmp = DefaultComparer;

    let pairs = [
        ("number", Value::Number(1.0), Value::Number(2.0)),
        ("string", Value::str("abc"), Value::str("abd")),
        ("cross_kind", Value::Number(1.0), Value::str("1")),
    ];
    for (name, l, r) in &pairs {
        group.bench_with_input(BenchmarkId::new("cmp", name), &(l, r), |bch, (l, r)| {
            bch.iter(|| black_box(cmp.cmp(&ctx, black_box(l), black_box(r)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, arithmetic_benchmark, compare_benchmark);
criterion_main!(benches);
