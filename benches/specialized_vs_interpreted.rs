//! Benchmark comparing specialized code vs the tree-walking interpreter
//!
//! Measures call throughput for the two engines on the same resolved
//! functions, plus the one-off cost of lowering and loading a unit.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hotpath::backend::bytecode::compile;
use hotpath::backend::runtime::{call_function, Args, Kwargs};
use hotpath::backend::*;
use std::sync::Arc;
use std::time::Duration;

/// def chain(x): return x + 0 + 1 + ... + (depth - 1)
fn build_addition_chain(depth: usize) -> Arc<ResolvedFunction> {
    let mut expr = Expression::local("x", 0);
    for i in 0..depth {
        expr = Expression::add(expr, Expression::int(i as i64));
    }
    ResolvedFunction::builder("chain")
        .param("x")
        .stmt(Statement::ret(expr))
        .build()
}

/// def walk(xs, f):
///     for x in xs: f(x + 1)
fn build_loop() -> Arc<ResolvedFunction> {
    ResolvedFunction::builder("walk")
        .param("xs")
        .param("f")
        .locals(3)
        .stmt(Statement::for_each(
            Identifier::local("x", 2),
            Expression::local("xs", 0),
            vec![Statement::expr(Expression::call(
                Expression::local("f", 1),
                vec![Expression::add(Expression::local("x", 2), Expression::int(1))],
            ))],
        ))
        .build()
}

fn engines(def: &Arc<ResolvedFunction>, specializer: &Specializer) -> [(&'static str, Arc<Callable>); 2] {
    [
        ("interpreted", Callable::new(Arc::clone(def), Arc::new(Interpreter))),
        ("specialized", specializer.specialize(def)),
    ]
}

fn run(thread: &Thread, callable: &Arc<Callable>, args: &[Value]) -> EvalResult<Value> {
    let args: Args = args.iter().cloned().collect();
    call_function(thread, callable, args, Kwargs::new())
}

// ============================================================================
// Benchmark 1: Arithmetic
// ============================================================================

fn bench_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");
    group.measurement_time(Duration::from_secs(5));

    let specializer = Specializer::default();
    let thread = Thread::new();
    let args = [Value::Int(1)];

    for depth in [5, 20, 100].iter() {
        let def = build_addition_chain(*depth);
        group.throughput(Throughput::Elements(*depth as u64));

        for (engine, callable) in engines(&def, &specializer) {
            group.bench_with_input(BenchmarkId::new(engine, depth), &callable, |b, callable| {
                b.iter(|| run(&thread, black_box(callable), &args))
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark 2: Loops with calls
// ============================================================================

fn bench_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop");
    group.measurement_time(Duration::from_secs(5));

    let specializer = Specializer::default();
    let thread = Thread::new();
    let def = build_loop();
    let sink = Value::Builtin(Builtin::new("sink", |_thread: &Thread, _args: &[Value]| Ok(Value::None)));

    for len in [10, 100, 1000].iter() {
        let xs = Value::list((0..*len as i64).map(Value::Int).collect());
        let args = [xs, sink.clone()];
        group.throughput(Throughput::Elements(*len as u64));

        for (engine, callable) in engines(&def, &specializer) {
            group.bench_with_input(BenchmarkId::new(engine, len), &callable, |b, callable| {
                b.iter(|| run(&thread, black_box(callable), &args))
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark 3: Compilation overhead
// ============================================================================

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");

    let specializer = Specializer::default();
    let small = build_addition_chain(5);
    let large = build_addition_chain(200);

    group.bench_function("small/lower", |b| b.iter(|| compile(black_box(&small))));
    group.bench_function("large/lower", |b| b.iter(|| compile(black_box(&large))));
    group.bench_function("small/lower+load", |b| b.iter(|| specializer.compile(black_box(&small))));
    group.bench_function("large/lower+load", |b| b.iter(|| specializer.compile(black_box(&large))));

    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_arithmetic, bench_loop, bench_compilation);

criterion_main!(benches);
