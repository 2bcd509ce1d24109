//! Matrix-vector product benchmarks for explicit, sparse and composite
//! operators.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linop::{CsrMatrix, DataType, LinearOperator, Matrix};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: [usize; 3] = [64, 256, 1024];

fn random_dense(rng: &mut StdRng, n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0))
}

/// Tridiagonal plus a few random entries per row
fn random_sparse(rng: &mut StdRng, n: usize) -> CsrMatrix {
    let mut triplets = Vec::with_capacity(n * 6);
    for i in 0..n {
        triplets.push((i, i, 4.0));
        if i > 0 {
            triplets.push((i, i - 1, -1.0));
        }
        if i + 1 < n {
            triplets.push((i, i + 1, -1.0));
        }
        for _ in 0..3 {
            triplets.push((i, rng.gen_range(0..n), rng.gen_range(-0.1..0.1)));
        }
    }
    CsrMatrix::from_triplets(n, n, &triplets).unwrap()
}

fn bench_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_matvec");
    let mut rng = StdRng::seed_from_u64(1);
    for n in SIZES {
        let a = Matrix::dense(random_dense(&mut rng, n));
        let x = DVector::from_element(n, 1.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(a.matvec(black_box(&x)).unwrap()))
        });
    }
    group.finish();
}

fn bench_sparse(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_matvec");
    let mut rng = StdRng::seed_from_u64(2);
    for n in SIZES {
        let a = Matrix::sparse(random_sparse(&mut rng, n * 16));
        let x = DVector::from_element(n * 16, 1.0);
        group.bench_with_input(BenchmarkId::from_parameter(n * 16), &n, |b, _| {
            b.iter(|| black_box(a.matvec(black_box(&x)).unwrap()))
        });
    }
    group.finish();
}

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_matvec");
    let mut rng = StdRng::seed_from_u64(3);
    for n in SIZES {
        let a = Matrix::dense(random_dense(&mut rng, n));
        let s = Matrix::sparse(random_sparse(&mut rng, n));
        // (2 A + S) Sᵀ + I, kept lazy
        let op = (&(&(&a * 2.0) + &s).unwrap() * &s.transpose()).unwrap();
        let op = (&op + &LinearOperator::identity(n, DataType::F64)).unwrap();
        let x = DVector::from_element(n, 1.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(op.matvec(black_box(&x)).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dense, bench_sparse, bench_composite);
criterion_main!(benches);
