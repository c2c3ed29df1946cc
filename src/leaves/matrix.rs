use std::{io, mem};

use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use rand::RngCore;

use super::{Storage, check_len, copy_values, element_count, read_values, write_values};
use crate::{
    BoxedValue, Layout, MatrixParameter, ParamErr, ParameterValue, Result, Scalar,
    scalar::{Values, ValuesMut},
};

/// A matrix leaf that owns its values.
pub type OwnedMatrix<T> = Matrix<Vec<T>>;

/// A matrix leaf aliasing a range of a buffer owned elsewhere.
pub type MatrixRef<'b, T> = Matrix<&'b mut [T]>;

/// A two dimensional leaf of a parameter tree, its values are stored in row major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<S> {
    name: String,
    rows: usize,
    cols: usize,
    data: S,
}

impl<S: Storage> Matrix<S> {
    /// Creates a new `Matrix`.
    ///
    /// # Arguments
    /// * `name` - The name of the leaf.
    /// * `dim` - The amount of rows and columns.
    /// * `data` - The storage holding the values in row major order.
    ///
    /// # Returns
    /// A new `Matrix` instance, a `SizeMismatch` error if `data` doesn't hold exactly
    /// `rows * cols` elements or a `ShapeMismatch` error if that product overflows.
    pub fn new(name: impl Into<String>, dim: (usize, usize), data: S) -> Result<Self> {
        let name = name.into();
        let expected = element_count(&name, dim)?;
        check_len(&name, data.as_slice().len(), expected)?;

        Ok(Self {
            name,
            rows: dim.0,
            cols: dim.1,
            data,
        })
    }

    pub fn as_slice(&self) -> &[S::Elem] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [S::Elem] {
        self.data.as_mut_slice()
    }

    /// Gives a view of the values as an `ndarray` matrix.
    pub fn view(&self) -> Result<ArrayView2<'_, S::Elem>> {
        let len = self.data.as_slice().len();
        ArrayView2::from_shape((self.rows, self.cols), self.data.as_slice()).map_err(|_| {
            ParamErr::SizeMismatch {
                name: self.name.clone(),
                got: len,
                expected: self.rows * self.cols,
            }
        })
    }

    /// Gives a mutable view of the values as an `ndarray` matrix.
    pub fn view_mut(&mut self) -> Result<ArrayViewMut2<'_, S::Elem>> {
        let len = self.data.as_slice().len();
        let expected = self.rows * self.cols;
        let name = &self.name;

        ArrayViewMut2::from_shape((self.rows, self.cols), self.data.as_mut_slice()).map_err(|_| {
            ParamErr::SizeMismatch {
                name: name.clone(),
                got: len,
                expected,
            }
        })
    }

    /// Exchanges names with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.name, &mut other.name);
    }

    fn combine(&mut self, other: &dyn ParameterValue<'_>, alpha: f64) -> Result<()> {
        let theirs = other
            .matrix()
            .map_err(|_| ParamErr::shape(&self.name, "the other operand is not a matrix"))?;

        if theirs.shape() != (self.rows, self.cols) {
            return Err(ParamErr::shape(&self.name, "matrix dimensions differ"));
        }

        <S::Elem as Scalar>::wrap_mut(self.data.as_mut_slice()).axpy(alpha, theirs.values());
        Ok(())
    }
}

impl<T: Scalar> Matrix<Vec<T>> {
    /// Creates a new `rows x cols` matrix of zeroes.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if `rows * cols` overflows.
    pub fn zeros(name: impl Into<String>, dim: (usize, usize)) -> Result<Self> {
        let name = name.into();
        let len = element_count(&name, dim)?;

        Ok(Self {
            name,
            rows: dim.0,
            cols: dim.1,
            data: vec![T::default(); len],
        })
    }

    /// Creates a new `Matrix` owning a copy of `array`'s values.
    pub fn from_array(name: impl Into<String>, array: &Array2<T>) -> Self {
        Self {
            name: name.into(),
            rows: array.nrows(),
            cols: array.ncols(),
            data: array.iter().copied().collect(),
        }
    }
}

impl<S: Storage> MatrixParameter for Matrix<S> {
    fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn values(&self) -> Values<'_> {
        <S::Elem as Scalar>::wrap(self.data.as_slice())
    }

    fn values_mut(&mut self) -> ValuesMut<'_> {
        <S::Elem as Scalar>::wrap_mut(self.data.as_mut_slice())
    }
}

impl<'a, S: Storage + 'a> ParameterValue<'a> for Matrix<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_count(&self) -> usize {
        self.rows * self.cols
    }

    fn layout(&self) -> Layout {
        Layout::Matrix {
            name: self.name.clone(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    fn copy_to<'b>(&self, out: ValuesMut<'b>) -> Result<ValuesMut<'b>> {
        copy_values(&self.name, MatrixParameter::values(self), out)
    }

    fn compatible_ref<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        let dim = (self.rows, self.cols);

        let view: BoxedValue<'b> = match buf {
            ValuesMut::F32(s) => Box::new(Matrix::new(self.name.clone(), dim, s)?),
            ValuesMut::F64(s) => Box::new(Matrix::new(self.name.clone(), dim, s)?),
        };

        Ok(view)
    }

    fn fill(&mut self, value: f64) {
        MatrixParameter::values_mut(self).fill(value);
    }

    fn random_fill(&mut self, limit: f64, rng: &mut dyn RngCore) {
        MatrixParameter::values_mut(self).random_fill(limit, rng);
    }

    fn add_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.combine(other, 1.)
    }

    fn sub_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.combine(other, -1.)
    }

    fn scale(&mut self, factor: f64) {
        MatrixParameter::values_mut(self).scale(factor);
    }

    fn two_norm(&self) -> f64 {
        MatrixParameter::values(self).sum_squares().sqrt()
    }

    fn update(&mut self, other: &dyn ParameterValue<'_>, learning_rate: f64) -> Result<()> {
        self.combine(other, -learning_rate)
    }

    fn serialize(&self, store: &mut dyn io::Write) -> Result<()> {
        write_values(MatrixParameter::values(self), store)
    }

    fn reconstitute(&mut self, store: &mut dyn io::Read) -> Result<()> {
        read_values(MatrixParameter::values_mut(self), store)
    }

    fn matrix(&self) -> Result<&dyn MatrixParameter> {
        Ok(self)
    }

    fn matrix_mut(&mut self) -> Result<&mut dyn MatrixParameter> {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn new_checks_the_dimensions() {
        assert!(matches!(
            Matrix::new("w", (2, 2), vec![0f32; 3]),
            Err(ParamErr::SizeMismatch {
                got: 3,
                expected: 4,
                ..
            })
        ));
    }

    #[test]
    fn overflowing_dimensions_are_rejected() {
        assert!(matches!(
            Matrix::new("w", (usize::MAX, 2), Vec::<f32>::new()),
            Err(ParamErr::ShapeMismatch { .. })
        ));
        assert!(matches!(
            OwnedMatrix::<f64>::zeros("w", (2, usize::MAX)),
            Err(ParamErr::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn from_array_keeps_row_major_order() {
        let m = Matrix::from_array("w", &array![[1f32, 2., 3.], [4., 5., 6.]]);

        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.as_slice(), [1., 2., 3., 4., 5., 6.]);
        assert_eq!(m.get(1, 0), Some(4.));
        assert_eq!(m.row(0).unwrap(), vec![1., 2., 3.]);
    }

    #[test]
    fn view_mut_writes_through() {
        let mut m = OwnedMatrix::<f64>::zeros("w", (2, 2)).unwrap();
        m.view_mut().unwrap()[[1, 0]] = 3.;

        assert_eq!(m.as_slice(), [0., 0., 3., 0.]);
        assert_eq!(m.view().unwrap()[[1, 0]], 3.);
    }

    #[test]
    fn compatible_ref_keeps_the_dimensions() {
        let m = OwnedMatrix::<f32>::zeros("w", (2, 3)).unwrap();
        let mut buf = [0f64; 6];

        let view = m.compatible_ref(ValuesMut::from(&mut buf[..])).unwrap();
        assert_eq!(view.matrix().unwrap().shape(), (2, 3));
        assert!(matches!(view.vector(), Err(ParamErr::WrongKind { .. })));
    }

    #[test]
    fn compatible_ref_rejects_a_short_buffer() {
        let m = OwnedMatrix::<f32>::zeros("w", (2, 3)).unwrap();
        let mut buf = [0f32; 5];

        assert!(matches!(
            m.compatible_ref(ValuesMut::from(&mut buf[..])),
            Err(ParamErr::SizeMismatch { .. })
        ));
    }

    #[test]
    fn add_assign_requires_the_same_dimensions() {
        let mut a = OwnedMatrix::<f32>::zeros("w", (2, 3)).unwrap();
        let b = OwnedMatrix::<f32>::zeros("w", (3, 2)).unwrap();
        assert!(matches!(
            a.add_assign(&b),
            Err(ParamErr::ShapeMismatch { .. })
        ));

        let mut c = Matrix::from_array("w", &array![[1f32, 1.], [1., 1.]]);
        c.add_assign(&Matrix::from_array("w", &array![[1f64, 2.], [3., 4.]]))
            .unwrap();
        assert_eq!(c.as_slice(), [2., 3., 4., 5.]);
    }

    #[test]
    fn set_checks_rows_and_columns() {
        let mut m = OwnedMatrix::<f32>::zeros("w", (2, 2)).unwrap();
        m.set(0, 1, 1.).unwrap();
        assert_eq!(m.as_slice(), [0., 1., 0., 0.]);

        assert!(matches!(
            m.set(2, 0, 1.),
            Err(ParamErr::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(m.get(0, 2).is_none());
    }
}
