use std::{fmt, io};

use rand::RngCore;

use crate::{
    Layout, ParamErr, Parameters, Result,
    scalar::{Values, ValuesMut},
};

/// An owned, type erased node of a parameter tree.
pub type BoxedValue<'a> = Box<dyn ParameterValue<'a> + 'a>;

/// The capabilities every node of a parameter tree has, be it a leaf or a composite.
///
/// `'a` is the lifetime of the storage the node aliases, owned trees are `'static`. A node's
/// values are always visited in the same canonical order, which is the order they are laid out
/// in any flat buffer built from it.
pub trait ParameterValue<'a>: fmt::Debug {
    /// The node's name, unique among its siblings.
    fn name(&self) -> &str;

    /// Returns the amount of scalar elements this node and its descendants represent.
    fn parameter_count(&self) -> usize;

    /// Describes the shape of this node.
    fn layout(&self) -> Layout;

    /// Writes this node's values in canonical order at the start of `out`.
    ///
    /// # Arguments
    /// * `out` - The destination buffer, it may be longer than this node.
    ///
    /// # Returns
    /// The part of `out` that was not written or a `RangeError` if `out` is too short, in which
    /// case nothing of this node was written.
    fn copy_to<'b>(&self, out: ValuesMut<'b>) -> Result<ValuesMut<'b>>;

    /// Builds a node of the same shape that aliases `buf` instead of owning its values.
    ///
    /// # Arguments
    /// * `buf` - The buffer to alias, its length must be exactly `parameter_count()`.
    ///
    /// # Returns
    /// The new view or a `SizeMismatch` error.
    fn compatible_ref<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>>;

    /// Builds a view over `buf` like `compatible_ref` and writes this node's current values into
    /// it.
    ///
    /// The returned node still aliases `buf`, the caller keeps owning the storage.
    fn compatible_copy<'b>(&self, mut buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        let expected = self.parameter_count();
        if buf.len() != expected {
            return Err(ParamErr::SizeMismatch {
                name: self.name().to_string(),
                got: buf.len(),
                expected,
            });
        }

        self.copy_to(buf.reborrow())?;
        self.compatible_ref(buf)
    }

    /// Sets every value to `value`.
    fn fill(&mut self, value: f64);

    /// Sets every value to a uniform sample of `[-|limit|, |limit|]` drawn from `rng`.
    fn random_fill(&mut self, limit: f64, rng: &mut dyn RngCore);

    /// Adds `other`'s values element wise.
    fn add_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()>;

    /// Subtracts `other`'s values element wise.
    fn sub_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()>;

    /// Multiplies every value by `factor`.
    fn scale(&mut self, factor: f64);

    /// Returns the euclidean norm of all the values.
    fn two_norm(&self) -> f64;

    /// Takes a step of length `learning_rate` against `other`, that is `self -= lr * other`.
    fn update(&mut self, other: &dyn ParameterValue<'_>, learning_rate: f64) -> Result<()>;

    /// Writes the values, never the shape, to `store`.
    fn serialize(&self, store: &mut dyn io::Write) -> Result<()>;

    /// Reads the values of the already established shape back from `store`.
    fn reconstitute(&mut self, store: &mut dyn io::Read) -> Result<()>;

    fn parameters(&self) -> Result<&Parameters<'a>> {
        Err(ParamErr::wrong_kind(self.name(), "composite"))
    }

    fn parameters_mut(&mut self) -> Result<&mut Parameters<'a>> {
        Err(ParamErr::wrong_kind(self.name(), "composite"))
    }

    fn vector(&self) -> Result<&dyn VectorParameter> {
        Err(ParamErr::wrong_kind(self.name(), "vector"))
    }

    fn vector_mut(&mut self) -> Result<&mut dyn VectorParameter> {
        Err(ParamErr::wrong_kind(self.name(), "vector"))
    }

    fn matrix(&self) -> Result<&dyn MatrixParameter> {
        Err(ParamErr::wrong_kind(self.name(), "matrix"))
    }

    fn matrix_mut(&mut self) -> Result<&mut dyn MatrixParameter> {
        Err(ParamErr::wrong_kind(self.name(), "matrix"))
    }
}

/// Read and write access to a one dimensional leaf.
pub trait VectorParameter: fmt::Debug {
    fn len(&self) -> usize;

    fn values(&self) -> Values<'_>;

    fn values_mut(&mut self) -> ValuesMut<'_>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<f64> {
        self.values().get(index)
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(ParamErr::IndexOutOfRange { index, len });
        }

        match self.values_mut() {
            ValuesMut::F32(s) => s[index] = value as f32,
            ValuesMut::F64(s) => s[index] = value,
        }

        Ok(())
    }
}

/// Read and write access to a two dimensional, row major leaf.
pub trait MatrixParameter: fmt::Debug {
    /// Returns `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    fn values(&self) -> Values<'_>;

    fn values_mut(&mut self) -> ValuesMut<'_>;

    fn get(&self, row: usize, col: usize) -> Option<f64> {
        let (rows, cols) = self.shape();
        if row >= rows || col >= cols {
            return None;
        }

        self.values().get(row * cols + col)
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let (rows, cols) = self.shape();
        if row >= rows {
            return Err(ParamErr::IndexOutOfRange {
                index: row,
                len: rows,
            });
        }
        if col >= cols {
            return Err(ParamErr::IndexOutOfRange {
                index: col,
                len: cols,
            });
        }

        let i = row * cols + col;
        match self.values_mut() {
            ValuesMut::F32(s) => s[i] = value as f32,
            ValuesMut::F64(s) => s[i] = value,
        }

        Ok(())
    }

    /// Returns the values of the `row`-th row widened to `f64`.
    fn row(&self, row: usize) -> Result<Vec<f64>> {
        let (rows, cols) = self.shape();
        if row >= rows {
            return Err(ParamErr::IndexOutOfRange {
                index: row,
                len: rows,
            });
        }

        Ok(self.values().iter().skip(row * cols).take(cols).collect())
    }
}
