//! Constant Evaluator Benchmarks
//!
//! The evaluator sits on the peephole optimizer's hot path: every
//! candidate instruction pair is folded speculatively. These benchmarks
//! track the scalar fold, the 16-lane vector fanout and the expression
//! composition step.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vc4_alu::expression::{Expression, ExpressionInputs};
use vc4_alu::instruction::Instruction;
use vc4_alu::opcodes::{OP_ADD, OP_FADD, OP_FMUL, OP_V8ADDS};
use vc4_core::{ContainerValue, Literal, Local, Value, TYPE_FLOAT, TYPE_INT32};

// =============================================================================
// Benchmark Helpers
// =============================================================================

fn int(value: i32) -> Value {
    Value::literal(Literal::from_signed(value), TYPE_INT32)
}

/// A 16-lane container with distinct per-lane literals.
fn vector16() -> Value {
    Value::container(
        ContainerValue {
            elements: (0..16).map(|lane| int(lane * 3 + 1)).collect(),
        },
        TYPE_INT32.to_vector_type(16),
    )
}

// =============================================================================
// Evaluation Benchmarks
// =============================================================================

fn bench_scalar_fold(c: &mut Criterion) {
    let a = int(0x1234_5678);
    let b = int(0x0F0F_0F0F);
    c.bench_function("eval_scalar_add", |bench| {
        bench.iter(|| OP_ADD.evaluate(black_box(&a), black_box(Some(&b))))
    });
    c.bench_function("eval_scalar_v8adds", |bench| {
        bench.iter(|| OP_V8ADDS.evaluate(black_box(&a), black_box(Some(&b))))
    });
}

fn bench_vector_fanout(c: &mut Criterion) {
    let a = vector16();
    let b = vector16();
    c.bench_function("eval_vector16_add", |bench| {
        bench.iter(|| OP_ADD.evaluate(black_box(&a), black_box(Some(&b))))
    });
}

fn bench_expression_combine(c: &mut Criterion) {
    let a = Value::local(std::sync::Arc::new(Local::new(1, "a")), TYPE_FLOAT);
    let t0 = Value::local(std::sync::Arc::new(Local::new(2, "t0")), TYPE_FLOAT);
    let factor = Value::literal(Literal::from_real(3.0), TYPE_FLOAT);

    let mut produce = Instruction::operation(OP_FMUL, a.clone(), factor);
    produce.output = Some(t0.clone());
    let mut inputs = ExpressionInputs::default();
    inputs.insert(
        t0.check_local().unwrap().id,
        Expression::from_instruction(&produce).unwrap(),
    );
    let consume =
        Expression::from_instruction(&Instruction::operation(OP_FADD, t0, a)).unwrap();

    c.bench_function("expression_combine_fmul_fusion", |bench| {
        bench.iter(|| black_box(&consume).combine_with(black_box(&inputs)))
    });
}

criterion_group!(
    benches,
    bench_scalar_fold,
    bench_vector_fanout,
    bench_expression_combine
);
criterion_main!(benches);
