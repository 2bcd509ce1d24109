use approx::assert_relative_eq;
use linop::{
    broadcast_matvec, config, Axis, Config, CsrMatrix, DataType, Embedding, LinearOperator,
    LinopError, Matrix, NormOrd, Normal, Property, RandomVariable, Selection,
};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_dense(rng: &mut StdRng, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}

fn opaque(a: DMatrix<f64>) -> LinearOperator {
    let shape = a.shape();
    LinearOperator::builder(shape, DataType::F64)
        .matmul(move |x| Ok(&a * x))
        .build()
        .unwrap()
}

#[test]
fn dense_and_sparse_agree() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut triplets = Vec::new();
    for _ in 0..40 {
        triplets.push((rng.gen_range(0..20), rng.gen_range(0..15), rng.gen_range(-1.0..1.0)));
    }
    let csr = CsrMatrix::from_triplets(20, 15, &triplets).unwrap();
    let dense = Matrix::dense(csr.to_dense());
    let sparse = Matrix::sparse(csr);

    let x = random_dense(&mut rng, 15, 4);
    assert_relative_eq!(
        dense.matmat(&x).unwrap(),
        sparse.matmat(&x).unwrap(),
        epsilon = 1e-12
    );

    let y = random_dense(&mut rng, 3, 20);
    assert_relative_eq!(
        dense.rmatmat(&y).unwrap(),
        sparse.rmatmat(&y).unwrap(),
        epsilon = 1e-12
    );
    assert_eq!(
        dense.transpose().todense().unwrap(),
        sparse.transpose().todense().unwrap()
    );
}

#[test]
fn matrix_free_operator_matches_its_dense_form() {
    let shift = LinearOperator::builder((4, 4), DataType::F64)
        .matmul(broadcast_matvec(|v: &DVector<f64>| {
            DVector::from_fn(v.len(), |i, _| v[(i + 1) % v.len()])
        }))
        .build()
        .unwrap();

    let dense = shift.todense().unwrap();
    let x = DMatrix::from_fn(4, 2, |i, j| (i + 4 * j) as f64);
    assert_eq!(shift.matmat(&x).unwrap(), &dense * &x);
    let ones = DVector::from_element(4, 1.0);
    assert_eq!(shift.rmatvec(&ones).unwrap(), ones);
    assert_relative_eq!(shift.det().unwrap().abs(), 1.0, epsilon = 1e-12);
    assert_eq!(shift.rank().unwrap(), 4);
    assert_relative_eq!(shift.trace().unwrap(), 0.0);
}

#[test]
fn lazy_arithmetic_matches_dense_arithmetic() {
    let mut rng = StdRng::seed_from_u64(5);
    let a_dense = random_dense(&mut rng, 5, 5);
    let b_dense = random_dense(&mut rng, 5, 3);
    let c_dense = random_dense(&mut rng, 5, 5);

    let a = opaque(a_dense.clone());
    let b = Matrix::dense(b_dense.clone());
    let c = opaque(c_dense.clone());

    let op = (&(&(&a * 2.0) - &c).unwrap() * &b).unwrap();
    let expected = (&a_dense * 2.0 - &c_dense) * &b_dense;
    assert_eq!(op.shape(), (5, 3));
    assert_relative_eq!(op.todense().unwrap(), expected, epsilon = 1e-12);
    assert_relative_eq!(
        op.transpose().todense().unwrap(),
        expected.transpose(),
        epsilon = 1e-12
    );

    let x = random_dense(&mut rng, 4, 3);
    assert_relative_eq!(
        op.apply(&x, Axis::Rows).unwrap(),
        &x * expected.transpose(),
        epsilon = 1e-12
    );
}

#[test]
fn derived_quantities_of_composites() {
    let a = Matrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]).unwrap();
    a.set_property(Property::Symmetric, Some(true)).unwrap();
    let i = LinearOperator::identity(3, DataType::F64);

    let shifted = (&a + &(&i * 2.0)).unwrap();
    assert_relative_eq!(shifted.trace().unwrap(), 15.0, epsilon = 1e-12);
    assert_eq!(shifted.is_symmetric(), Some(true));

    let dense = a.todense().unwrap();
    let det = dense.clone().determinant();
    assert_relative_eq!(a.det().unwrap(), det, epsilon = 1e-9);
    assert_relative_eq!((&a * 3.0).det().unwrap(), 27.0 * det, epsilon = 1e-9);
    assert_relative_eq!(a.inv().unwrap().det().unwrap(), 1.0 / det, epsilon = 1e-9);
    assert_relative_eq!(
        a.inv().unwrap().todense().unwrap() * &dense,
        DMatrix::identity(3, 3),
        epsilon = 1e-12
    );
    assert!(a.cond(NormOrd::Fro).unwrap() >= a.cond(NormOrd::Two).unwrap() - 1e-12);

    let l = a.cholesky(true).unwrap().todense().unwrap();
    assert_relative_eq!(&l * l.transpose(), dense, epsilon = 1e-12);
    assert_eq!(a.is_positive_definite(), Some(true));
}

#[test]
fn selection_and_embedding() {
    let a = Matrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let select = Selection::new(vec![2, 0], (2, 3)).unwrap();
    let picked = (&select * &a).unwrap();
    assert_eq!(
        picked.todense().unwrap(),
        DMatrix::from_row_slice(2, 2, &[5.0, 6.0, 1.0, 2.0])
    );

    let embed = Embedding::new(vec![0, 1], vec![2, 0], (3, 2), 0.0).unwrap();
    let back = (&embed * &picked).unwrap();
    assert_eq!(
        back.todense().unwrap(),
        DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 0.0, 0.0, 5.0, 6.0])
    );
}

#[test]
fn shape_errors_are_reported() {
    let a = Matrix::from_row_slice(2, 3, &[0.0; 6]).unwrap();
    assert!(matches!(
        a.matvec(&DVector::zeros(2)),
        Err(LinopError::DimensionMismatch { expected: 3, got: 2 })
    ));
    assert!(matches!(a.det(), Err(LinopError::NotSquare((2, 3)))));
    assert!((&a + &a.transpose()).is_err());
}

#[test]
fn gaussian_pushforward() {
    let a = Matrix::from_row_slice(2, 3, &[1.0, 0.0, 1.0, 0.0, 2.0, 0.0]).unwrap();
    let x: RandomVariable = Normal::from_dense(
        DVector::from_vec(vec![1.0, 2.0, 3.0]),
        DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 0.5, 2.0])),
    )
    .unwrap()
    .into();

    let y = a.apply_rv(&x).unwrap();
    assert_eq!(y.mean(), DVector::from_vec(vec![4.0, 4.0]));
    assert_relative_eq!(
        y.cov().unwrap(),
        DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 2.0]),
        epsilon = 1e-12
    );

    let RandomVariable::Normal(normal) = &y else {
        panic!("expected a normal");
    };
    let mut rng = StdRng::seed_from_u64(3);
    let draws = normal.sample(&mut rng, 10_000).unwrap();
    let mean = draws.column_mean();
    assert_relative_eq!(mean[0], 4.0, epsilon = 0.1);
    assert_relative_eq!(mean[1], 4.0, epsilon = 0.1);
}

#[test]
fn lazy_products_follow_the_active_config() {
    let a = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]).unwrap();
    let lazy = config::with_config(Config::default().with_lazy_matrix_matrix_matmul(true), || {
        (&a * &a).unwrap()
    });
    assert!(lazy.as_matrix().is_none());
    assert!((&a * &a).unwrap().as_matrix().is_some());
    assert_eq!(lazy.todense().unwrap(), DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 1.0]));
}

#[test]
fn files_roundtrip_through_the_public_api() {
    let path = std::env::temp_dir().join(format!("linop-tour-{}.lnop", std::process::id()));
    let a = Matrix::sparse(CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 5.0)]).unwrap());
    a.set_property(Property::Symmetric, Some(true)).unwrap();

    linop::write_matrix(&path, &a).unwrap();
    let b = linop::read_matrix(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(b.todense().unwrap(), a.todense().unwrap());
    assert_eq!(b.is_symmetric(), Some(true));
    assert_relative_eq!(b.logabsdet().unwrap(), 10f64.ln(), epsilon = 1e-12);
}
