mod matrix;
mod storage;
mod vector;

use std::io;

pub use matrix::{Matrix, MatrixRef, OwnedMatrix};
pub use storage::Storage;
pub use vector::{OwnedVector, Vector, VectorRef};

use crate::{
    ParamErr, Result,
    scalar::{Values, ValuesMut},
};

/// Writes `values` at the start of `out` and returns what is left of it.
///
/// # Returns
/// A `RangeError` if `out` is shorter than `values`, nothing is written in that case.
pub(crate) fn copy_values<'b>(
    name: &str,
    values: Values<'_>,
    out: ValuesMut<'b>,
) -> Result<ValuesMut<'b>> {
    let needed = values.len();
    let available = out.len();

    let (mut head, tail) = out.split_at(needed).ok_or_else(|| ParamErr::RangeError {
        name: name.to_string(),
        needed,
        available,
    })?;

    head.copy_from(values);
    Ok(tail)
}

/// Fails with a `SizeMismatch` unless the buffer handed to `name` has exactly `expected` elements.
pub(crate) fn check_len(name: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(ParamErr::SizeMismatch {
            name: name.to_string(),
            got,
            expected,
        });
    }

    Ok(())
}

/// Returns `rows * cols` or a `ShapeMismatch` when that doesn't fit in a `usize`.
pub(crate) fn element_count(name: &str, (rows, cols): (usize, usize)) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or_else(|| ParamErr::shape(name, "element count overflows usize"))
}

pub(crate) fn write_values(values: Values<'_>, store: &mut dyn io::Write) -> Result<()> {
    store.write_all(values.as_bytes())?;
    Ok(())
}

pub(crate) fn read_values(mut values: ValuesMut<'_>, store: &mut dyn io::Read) -> Result<()> {
    store.read_exact(values.as_bytes_mut())?;
    Ok(())
}
