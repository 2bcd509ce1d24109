use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use linop::{
    read_header, read_matrix, write_matrix, CsrMatrix, LinearOperator, Matrix, NormOrd, Property,
    Selection,
};
use linop_core::parse_range;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(about = "linop - inspect and apply linear operators stored in .lnop files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show shape, data type, storage and property flags
    Info {
        /// Operator file
        file: PathBuf,
    },
    /// Compute trace, determinant, rank, condition number and eigenvalues
    Derive {
        /// Operator file
        file: PathBuf,

        /// Norm for the condition number (2, -2, 1, -1, inf, -inf, fro)
        #[arg(long, default_value = "2", allow_hyphen_values = true)]
        norm: NormOrd,
    },
    /// Apply the operator to a vector
    Apply {
        /// Operator file
        file: PathBuf,

        /// Comma-separated entries of the vector
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        vector: Vec<f64>,

        /// Compute xᵀ A instead of A x
        #[arg(long)]
        transpose: bool,
    },
    /// Print a range of rows through a selection operator
    Select {
        /// Operator file
        file: PathBuf,

        /// Row range (format: start:end)
        #[arg(long)]
        rows: String,
    },
    /// Write a random symmetric positive definite matrix
    RandomSpd {
        /// Dimension
        n: usize,

        /// Output file
        out: PathBuf,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Off-diagonal density; writes CSR storage when given
        #[arg(long)]
        density: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start_time = std::time::Instant::now();

    match &cli.command {
        Commands::Info { file } => handle_info(file)?,
        Commands::Derive { file, norm } => handle_derive(file, *norm)?,
        Commands::Apply {
            file,
            vector,
            transpose,
        } => handle_apply(file, vector, *transpose)?,
        Commands::Select { file, rows } => handle_select(file, rows)?,
        Commands::RandomSpd {
            n,
            out,
            seed,
            density,
        } => handle_random_spd(*n, out, *seed, *density)?,
    }

    log::info!("Completed in {:.2?}", start_time.elapsed());
    Ok(())
}

fn load(file: &Path) -> anyhow::Result<LinearOperator> {
    read_matrix(file).with_context(|| format!("failed to read {}", file.display()))
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    }
}

fn handle_info(file: &Path) -> anyhow::Result<()> {
    let header = read_header(file)?;
    let op = load(file)?;

    println!("Operator Info:");
    println!("  File: {}", file.display());
    println!("  Shape: {} x {}", op.nrows(), op.ncols());
    println!("  Data type: {}", op.dtype());
    if let Some(format) = header.storage_format() {
        println!("  Storage: {format}");
    }
    println!("  Stored elements: {}", header.nnz);
    for property in Property::ALL {
        println!("  {property}: {}", flag(op.property(property)));
    }
    Ok(())
}

fn handle_derive(file: &Path, norm: NormOrd) -> anyhow::Result<()> {
    let op = load(file)?;
    println!("{op}");
    println!("  rank: {}", op.rank()?);

    if !op.is_square() {
        println!("  (non-square operator: trace, determinant and spectrum are undefined)");
        return Ok(());
    }

    println!("  trace: {}", op.trace()?);
    println!("  det: {}", op.det()?);
    println!("  logabsdet: {}", op.logabsdet()?);
    println!("  cond({norm}): {}", op.cond(norm)?);
    println!("  eigenvalues:");
    for value in op.eigvals()?.iter() {
        if value.im == 0.0 {
            println!("    {}", value.re);
        } else {
            println!("    {} {:+}i", value.re, value.im);
        }
    }
    Ok(())
}

fn handle_apply(file: &Path, vector: &[f64], transpose: bool) -> anyhow::Result<()> {
    let op = load(file)?;
    let x = DVector::from_column_slice(vector);
    let y = if transpose {
        op.rmatvec(&x)?
    } else {
        op.matvec(&x)?
    };

    let entries: Vec<String> = y.iter().map(|v| v.to_string()).collect();
    println!("{}", entries.join(", "));
    Ok(())
}

fn handle_select(file: &Path, rows: &str) -> anyhow::Result<()> {
    let op = load(file)?;
    let range = parse_range(rows).map_err(|e| anyhow::anyhow!("invalid row range {rows}: {e}"))?;
    if range.end > op.nrows() {
        bail!("row range {rows} exceeds {} rows", op.nrows());
    }

    let selection = Selection::new(range.clone().collect(), (range.len(), op.nrows()))?;
    let picked = selection.compose(&op)?.todense()?;

    println!("Rows {rows} of {op}:");
    for (row, values) in range.zip(picked.row_iter()) {
        let entries: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        println!("  {row}: [{}]", entries.join(", "));
    }
    Ok(())
}

fn handle_random_spd(n: usize, out: &Path, seed: u64, density: Option<f64>) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);

    let op = match density {
        Some(density) => {
            if !(0.0..=1.0).contains(&density) {
                bail!("density must lie in [0, 1], got {density}");
            }
            // Symmetric off-diagonal pattern with a dominant diagonal
            let mut triplets = Vec::new();
            let mut row_sums = vec![0.0; n];
            for i in 0..n {
                for j in (i + 1)..n {
                    if rng.gen_bool(density) {
                        let value: f64 = rng.gen_range(-1.0..1.0);
                        triplets.push((i, j, value));
                        triplets.push((j, i, value));
                        row_sums[i] += value.abs();
                        row_sums[j] += value.abs();
                    }
                }
            }
            for (i, sum) in row_sums.into_iter().enumerate() {
                triplets.push((i, i, sum + 1.0));
            }
            Matrix::sparse(CsrMatrix::from_triplets(n, n, &triplets)?)
        }
        None => {
            let b = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
            let a = &b * b.transpose() + DMatrix::identity(n, n) * n as f64;
            Matrix::dense(a)
        }
    };
    op.set_property(Property::Symmetric, Some(true))?;
    op.set_property(Property::PositiveDefinite, Some(true))?;

    write_matrix(out, &op).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {op} to {}", out.display());
    Ok(())
}
