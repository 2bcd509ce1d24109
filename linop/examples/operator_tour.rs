//! A walk through the operator API: explicit matrices, sparse storage,
//! matrix-free operators, lazy arithmetic and random variables.
//!
//! Run with `RUST_LOG=debug` to see which quantities fall back to dense
//! materialization.

use linop::{
    broadcast_matvec, CsrMatrix, DataType, LinearOperator, Matrix, NormOrd, Normal,
    RandomVariable,
};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> linop::Result<()> {
    // Explicit dense matrix
    let a = Matrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0])?;
    println!("{a}");
    println!("A x = {}", a.matvec(&DVector::from_vec(vec![1.0, 2.0, 3.0]))?.transpose());

    // Sparse storage behaves the same
    let s = Matrix::sparse(CsrMatrix::from_triplets(
        3,
        3,
        &[(0, 0, 1.0), (1, 2, -1.0), (2, 1, 2.0)],
    )?);
    println!("{s} with {} stored entries", s.as_matrix().map_or(0, |m| m.nnz()));

    // Matrix-free: a forward difference, never stored
    let diff = LinearOperator::builder((3, 3), DataType::F64)
        .name("ForwardDifference")
        .matmul(broadcast_matvec(|v: &DVector<f64>| {
            DVector::from_fn(v.len(), |i, _| {
                if i + 1 < v.len() {
                    v[i + 1] - v[i]
                } else {
                    -v[i]
                }
            })
        }))
        .build()?;
    println!("{diff}");
    println!("dense form:{}", diff.todense()?);

    // Arithmetic builds lazy composites
    let b = (&(&a * 2.0) + &diff)?;
    let c = (&b * &s.transpose())?;
    println!("{b}");
    println!("{c}");
    println!("C x = {}", c.matvec(&DVector::from_element(3, 1.0))?.transpose());
    println!("(Cᵀ)ᵀ == C: {}", c.transpose().transpose().todense()? == c.todense()?);

    // Derived quantities are cached on the operator
    println!("trace(A) = {}", a.trace()?);
    println!("det(A) = {}", a.det()?);
    println!("cond(A) = {}", a.cond(NormOrd::Two)?);
    println!("A⁻¹ e₀ = {}", a.inv()?.matvec(&DVector::from_vec(vec![1.0, 0.0, 0.0]))?.transpose());

    // Pushing a Gaussian through an operator
    let x: RandomVariable =
        Normal::from_dense(DVector::from_vec(vec![1.0, 0.0, -1.0]), DMatrix::identity(3, 3))?
            .into();
    let y = diff.apply_rv(&x)?;
    println!("mean of D x: {}", y.mean().transpose());
    println!("cov of D x:{}", y.cov()?);

    let mut rng = StdRng::seed_from_u64(0);
    let z = a.apply_rv(&x)?;
    println!("five draws of A x:{}", z.sample(&mut rng, 5)?);
    Ok(())
}
