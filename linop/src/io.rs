//! Binary operator files
//!
//! Explicit matrices are stored as a 96-byte [`LinopHeader`] followed by
//! 8-byte aligned arrays:
//!
//! - dense: row-major values in the file's data type
//! - CSR: values, then `u64` column indices, then `u64` row pointers
//!
//! Arrays use the native byte order of the writer. Reading memory-maps the
//! file when the `mmap` feature is enabled.

use crate::error::{LinopError, Result};
use crate::operator::LinearOperator;
use crate::operators::{Matrix, Storage};
use crate::sparse::CsrMatrix;
use bytemuck::Pod;
use linop_core::validation::format::validate_offset_alignment;
use linop_core::validation::{
    align_to_8, validate_alignment, validate_array_bounds, validate_csr_layout,
    validate_dense_layout, validate_region,
};
use linop_core::{CoreError, DataType, Element, LinopHeader, Property, StorageFormat};
use log::debug;
#[cfg(feature = "mmap")]
use memmap2::MmapOptions;
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

fn encode<T: Element>(values: impl Iterator<Item = f64>, out: &mut Vec<u8>) {
    let typed: Vec<T> = values.map(T::from_f64).collect();
    out.extend_from_slice(bytemuck::cast_slice(&typed));
}

fn encode_values(dtype: DataType, values: impl Iterator<Item = f64>, out: &mut Vec<u8>) {
    match dtype {
        DataType::F32 => encode::<f32>(values, out),
        DataType::F64 => encode::<f64>(values, out),
        DataType::I32 => encode::<i32>(values, out),
        DataType::I64 => encode::<i64>(values, out),
        DataType::U32 => encode::<u32>(values, out),
        DataType::U64 => encode::<u64>(values, out),
    }
}

/// Typed view of `bytes`, copied out when the buffer is misaligned for `T`
fn decode<T: Pod>(bytes: &[u8]) -> Result<Vec<T>> {
    validate_array_bounds::<T>(bytes.len())?;
    if validate_alignment::<T>(bytes.as_ptr()).is_ok() {
        return Ok(bytemuck::cast_slice::<u8, T>(bytes).to_vec());
    }
    Ok(bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

fn decode_as_f64<T: Element>(bytes: &[u8]) -> Result<Vec<f64>> {
    Ok(decode::<T>(bytes)?.into_iter().map(T::to_f64).collect())
}

fn decode_values(dtype: DataType, bytes: &[u8]) -> Result<Vec<f64>> {
    match dtype {
        DataType::F32 => decode_as_f64::<f32>(bytes),
        DataType::F64 => decode_as_f64::<f64>(bytes),
        DataType::I32 => decode_as_f64::<i32>(bytes),
        DataType::I64 => decode_as_f64::<i64>(bytes),
        DataType::U32 => decode_as_f64::<u32>(bytes),
        DataType::U64 => decode_as_f64::<u64>(bytes),
    }
}

fn decode_indices(bytes: &[u8]) -> Result<Vec<usize>> {
    decode::<u64>(bytes)?
        .into_iter()
        .map(|index| {
            usize::try_from(index).map_err(|_| LinopError::from(CoreError::ArraySizeOverflow))
        })
        .collect()
}

/// Pad `out` with zeros to the next array boundary and return its length
fn pad(out: &mut Vec<u8>) -> u64 {
    out.resize(align_to_8(out.len()), 0);
    out.len() as u64
}

fn encode_indices(indices: &[usize], out: &mut Vec<u8>) {
    let wide: Vec<u64> = indices.iter().map(|&index| index as u64).collect();
    out.extend_from_slice(bytemuck::cast_slice(&wide));
}

/// Serialize an explicit matrix into the file layout
pub fn encode_matrix(op: &LinearOperator) -> Result<Vec<u8>> {
    let matrix = op.as_matrix().ok_or_else(|| {
        LinopError::InvalidArgument(format!("only explicit matrices can be written, got {op}"))
    })?;

    let dtype = op.dtype();
    let mut header = LinopHeader::new();
    header.data_type = dtype.to_u8();
    header.structure_flags = op.properties().to_flags();
    header.nrows = op.nrows() as u64;
    header.ncols = op.ncols() as u64;
    header.nnz = matrix.nnz() as u64;

    let mut out = vec![0u8; LinopHeader::SIZE];
    header.values_offset = pad(&mut out);

    match matrix.storage() {
        Storage::Dense(a) => {
            header.format_type = StorageFormat::Dense.to_u8();
            encode_values(dtype, a.transpose().iter().copied(), &mut out);
            header.values_size = out.len() as u64 - header.values_offset;
            header.indices_offset = pad(&mut out);
            header.pointers_offset = header.indices_offset;
        }
        Storage::Sparse(a) => {
            header.format_type = StorageFormat::Csr.to_u8();
            encode_values(dtype, a.values().iter().copied(), &mut out);
            header.values_size = out.len() as u64 - header.values_offset;

            header.indices_offset = pad(&mut out);
            encode_indices(a.indices(), &mut out);
            header.indices_size = out.len() as u64 - header.indices_offset;

            header.pointers_offset = pad(&mut out);
            encode_indices(a.indptr(), &mut out);
            header.pointers_size = out.len() as u64 - header.pointers_offset;
        }
    }

    out[..LinopHeader::SIZE].copy_from_slice(&header.to_bytes_array());
    Ok(out)
}

/// Write an explicit matrix to `path`
pub fn write_matrix<P: AsRef<Path>>(path: P, op: &LinearOperator) -> Result<()> {
    let bytes = encode_matrix(op)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(&bytes)?;
    debug!(
        "Wrote {op} to {} ({} bytes)",
        path.as_ref().display(),
        bytes.len()
    );
    Ok(())
}

/// Read only the header of an operator file
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<LinopHeader> {
    let mut file = File::open(path)?;
    let mut header_bytes = [0u8; LinopHeader::SIZE];
    file.read_exact(&mut header_bytes)?;
    Ok(LinopHeader::from_bytes(&header_bytes)?)
}

fn region(bytes: &[u8], offset: u64, size: u64) -> Result<&[u8]> {
    validate_region(offset, size, bytes.len())?;
    let start = usize::try_from(offset).map_err(|_| CoreError::ArraySizeOverflow)?;
    validate_offset_alignment(start, 8)?;
    Ok(&bytes[start..start + size as usize])
}

fn dimension(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| LinopError::from(CoreError::ArraySizeOverflow))
}

/// Deserialize an explicit matrix from the file layout
pub fn decode_matrix(bytes: &[u8]) -> Result<LinearOperator> {
    let header = LinopHeader::from_bytes(bytes)?;
    let format = header
        .storage_format()
        .ok_or(CoreError::UnsupportedFormat)?;
    let dtype = header.dtype().ok_or(CoreError::UnsupportedDataType)?;
    let (nrows, ncols) = (dimension(header.nrows)?, dimension(header.ncols)?);

    let values_bytes = region(bytes, header.values_offset, header.values_size)?;

    let storage = match format {
        StorageFormat::Dense => {
            validate_dense_layout(header.nrows, header.ncols, header.values_size, dtype.size_bytes())?;
            let values = decode_values(dtype, values_bytes)?;
            Storage::Dense(DMatrix::from_row_slice(nrows, ncols, &values))
        }
        StorageFormat::Csr => {
            validate_csr_layout(
                header.nrows,
                header.nnz,
                header.values_size,
                header.indices_size,
                header.pointers_size,
                dtype.size_bytes(),
            )?;
            let values = decode_values(dtype, values_bytes)?;
            let indices =
                decode_indices(region(bytes, header.indices_offset, header.indices_size)?)?;
            let indptr =
                decode_indices(region(bytes, header.pointers_offset, header.pointers_size)?)?;
            Storage::Sparse(CsrMatrix::from_raw_parts(nrows, ncols, indptr, indices, values)?)
        }
    };

    let op = Matrix::from_storage(storage, dtype, None);
    let properties = header.properties();
    for property in Property::ALL {
        if let Some(value) = properties.get(property) {
            op.set_property(property, Some(value))?;
        }
    }
    Ok(op)
}

/// Read an explicit matrix from `path`
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<LinearOperator> {
    let file = File::open(path.as_ref())?;

    #[cfg(feature = "mmap")]
    let op = {
        // SAFETY: read-only mapping; the contents are validated before use
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        decode_matrix(&mmap)?
    };

    #[cfg(not(feature = "mmap"))]
    let op = {
        let mut bytes = Vec::new();
        (&file).read_to_end(&mut bytes)?;
        decode_matrix(&bytes)?
    };

    debug!("Read {op} from {}", path.as_ref().display());
    Ok(op)
}
