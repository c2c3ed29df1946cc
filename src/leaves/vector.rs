use std::{io, mem};

use rand::RngCore;

use super::{Storage, check_len, copy_values, read_values, write_values};
use crate::{
    BoxedValue, Layout, ParamErr, ParameterValue, Result, Scalar, VectorParameter,
    scalar::{Values, ValuesMut},
};

/// A vector leaf that owns its values.
pub type OwnedVector<T> = Vector<Vec<T>>;

/// A vector leaf aliasing a range of a buffer owned elsewhere.
pub type VectorRef<'b, T> = Vector<&'b mut [T]>;

/// A one dimensional leaf of a parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<S> {
    name: String,
    data: S,
}

impl<S: Storage> Vector<S> {
    /// Creates a new `Vector`.
    ///
    /// # Arguments
    /// * `name` - The name of the leaf.
    /// * `data` - The storage holding the values.
    ///
    /// # Returns
    /// A new `Vector` instance.
    pub fn new(name: impl Into<String>, data: S) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn as_slice(&self) -> &[S::Elem] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [S::Elem] {
        self.data.as_mut_slice()
    }

    pub fn into_inner(self) -> S {
        self.data
    }

    /// Exchanges names with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.name, &mut other.name);
    }

    fn combine(&mut self, other: &dyn ParameterValue<'_>, alpha: f64) -> Result<()> {
        let theirs = other
            .vector()
            .map_err(|_| ParamErr::shape(&self.name, "the other operand is not a vector"))?;

        if theirs.len() != self.as_slice().len() {
            return Err(ParamErr::shape(&self.name, "vector lengths differ"));
        }

        <S::Elem as Scalar>::wrap_mut(self.data.as_mut_slice()).axpy(alpha, theirs.values());
        Ok(())
    }
}

impl<T: Scalar> Vector<Vec<T>> {
    /// Creates a new `Vector` of `len` zeroes.
    pub fn zeros(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, vec![T::default(); len])
    }
}

impl<S: Storage> VectorParameter for Vector<S> {
    fn len(&self) -> usize {
        self.data.as_slice().len()
    }

    fn values(&self) -> Values<'_> {
        <S::Elem as Scalar>::wrap(self.data.as_slice())
    }

    fn values_mut(&mut self) -> ValuesMut<'_> {
        <S::Elem as Scalar>::wrap_mut(self.data.as_mut_slice())
    }
}

impl<'a, S: Storage + 'a> ParameterValue<'a> for Vector<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_count(&self) -> usize {
        self.data.as_slice().len()
    }

    fn layout(&self) -> Layout {
        Layout::Vector {
            name: self.name.clone(),
            len: self.parameter_count(),
        }
    }

    fn copy_to<'b>(&self, out: ValuesMut<'b>) -> Result<ValuesMut<'b>> {
        copy_values(&self.name, VectorParameter::values(self), out)
    }

    fn compatible_ref<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        check_len(&self.name, buf.len(), self.parameter_count())?;

        let view: BoxedValue<'b> = match buf {
            ValuesMut::F32(s) => Box::new(Vector::new(self.name.clone(), s)),
            ValuesMut::F64(s) => Box::new(Vector::new(self.name.clone(), s)),
        };

        Ok(view)
    }

    fn fill(&mut self, value: f64) {
        VectorParameter::values_mut(self).fill(value);
    }

    fn random_fill(&mut self, limit: f64, rng: &mut dyn RngCore) {
        VectorParameter::values_mut(self).random_fill(limit, rng);
    }

    fn add_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.combine(other, 1.)
    }

    fn sub_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.combine(other, -1.)
    }

    fn scale(&mut self, factor: f64) {
        VectorParameter::values_mut(self).scale(factor);
    }

    fn two_norm(&self) -> f64 {
        VectorParameter::values(self).sum_squares().sqrt()
    }

    fn update(&mut self, other: &dyn ParameterValue<'_>, learning_rate: f64) -> Result<()> {
        self.combine(other, -learning_rate)
    }

    fn serialize(&self, store: &mut dyn io::Write) -> Result<()> {
        write_values(VectorParameter::values(self), store)
    }

    fn reconstitute(&mut self, store: &mut dyn io::Read) -> Result<()> {
        read_values(VectorParameter::values_mut(self), store)
    }

    fn vector(&self) -> Result<&dyn VectorParameter> {
        Ok(self)
    }

    fn vector_mut(&mut self) -> Result<&mut dyn VectorParameter> {
        Ok(self)
    }
}
