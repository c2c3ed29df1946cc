use std::fmt;

use bytemuck::Pod;
use rand::{Rng, RngCore};
use rayon::prelude::*;

use crate::{ParamErr, Result};

/// The element precisions a parameter buffer can hold.
pub trait Scalar: Pod + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Converts from the wide exchange type, rounding to this precision.
    fn from_f64(value: f64) -> Self;

    /// Converts into the wide exchange type, this never loses precision.
    fn to_f64(self) -> f64;

    fn wrap(values: &[Self]) -> Values<'_>;

    fn wrap_mut(values: &mut [Self]) -> ValuesMut<'_>;
}

impl Scalar for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn wrap(values: &[Self]) -> Values<'_> {
        Values::F32(values)
    }

    fn wrap_mut(values: &mut [Self]) -> ValuesMut<'_> {
        ValuesMut::F32(values)
    }
}

impl Scalar for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn wrap(values: &[Self]) -> Values<'_> {
        Values::F64(values)
    }

    fn wrap_mut(values: &mut [Self]) -> ValuesMut<'_> {
        ValuesMut::F64(values)
    }
}

/// A read-only contiguous run of parameter values of either precision.
#[derive(Debug, Clone, Copy)]
pub enum Values<'s> {
    F32(&'s [f32]),
    F64(&'s [f64]),
}

impl<'s> Values<'s> {
    pub fn len(&self) -> usize {
        match self {
            Values::F32(s) => s.len(),
            Values::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `i`-th value widened to `f64`.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            Values::F32(s) => s.get(i).map(|&v| v.to_f64()),
            Values::F64(s) => s.get(i).copied(),
        }
    }

    pub fn iter(self) -> impl Iterator<Item = f64> + 's {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Collects the values widened to `f64`.
    pub fn to_vec(self) -> Vec<f64> {
        self.iter().collect()
    }

    pub fn sum_squares(&self) -> f64 {
        fn sum<T: Scalar>(s: &[T]) -> f64 {
            s.iter().map(|&v| v.to_f64() * v.to_f64()).sum()
        }

        match self {
            Values::F32(s) => sum(s),
            Values::F64(s) => sum(s),
        }
    }

    /// The raw native-endian bytes of the values.
    pub fn as_bytes(&self) -> &'s [u8] {
        match *self {
            Values::F32(s) => bytemuck::cast_slice(s),
            Values::F64(s) => bytemuck::cast_slice(s),
        }
    }
}

impl<'s> From<&'s [f32]> for Values<'s> {
    fn from(value: &'s [f32]) -> Self {
        Values::F32(value)
    }
}

impl<'s> From<&'s [f64]> for Values<'s> {
    fn from(value: &'s [f64]) -> Self {
        Values::F64(value)
    }
}

/// A mutable contiguous run of parameter values of either precision.
///
/// This is the buffer handed to `copy_to` and `compatible_ref`, the borrow it carries is what
/// ties every reference view to the storage it aliases.
#[derive(Debug)]
pub enum ValuesMut<'s> {
    F32(&'s mut [f32]),
    F64(&'s mut [f64]),
}

impl<'s> ValuesMut<'s> {
    pub fn len(&self) -> usize {
        match self {
            ValuesMut::F32(s) => s.len(),
            ValuesMut::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_values(&self) -> Values<'_> {
        match self {
            ValuesMut::F32(s) => Values::F32(s),
            ValuesMut::F64(s) => Values::F64(s),
        }
    }

    /// Borrows the same buffer again for a shorter lifetime.
    pub fn reborrow(&mut self) -> ValuesMut<'_> {
        match self {
            ValuesMut::F32(s) => ValuesMut::F32(s),
            ValuesMut::F64(s) => ValuesMut::F64(s),
        }
    }

    /// Splits the buffer in two at `mid`.
    ///
    /// # Returns
    /// `None` if `mid` is greater than the length of the buffer.
    pub fn split_at(self, mid: usize) -> Option<(ValuesMut<'s>, ValuesMut<'s>)> {
        if mid > self.len() {
            return None;
        }

        Some(match self {
            ValuesMut::F32(s) => {
                let (head, tail) = s.split_at_mut(mid);
                (ValuesMut::F32(head), ValuesMut::F32(tail))
            }
            ValuesMut::F64(s) => {
                let (head, tail) = s.split_at_mut(mid);
                (ValuesMut::F64(head), ValuesMut::F64(tail))
            }
        })
    }

    /// Narrows the buffer to the half open range `[first, last)`.
    ///
    /// # Returns
    /// A `RangeError` if the range is inverted or ends past the buffer.
    pub fn range(self, first: usize, last: usize) -> Result<ValuesMut<'s>> {
        let len = self.len();
        if first > last || last > len {
            return Err(ParamErr::RangeError {
                name: format!("[{first}, {last})"),
                needed: last.max(first),
                available: len,
            });
        }

        Ok(match self {
            ValuesMut::F32(s) => ValuesMut::F32(&mut s[first..last]),
            ValuesMut::F64(s) => ValuesMut::F64(&mut s[first..last]),
        })
    }

    pub fn fill(&mut self, value: f64) {
        match self {
            ValuesMut::F32(s) => s.par_iter_mut().for_each(|v| *v = f32::from_f64(value)),
            ValuesMut::F64(s) => s.par_iter_mut().for_each(|v| *v = value),
        }
    }

    pub fn scale(&mut self, factor: f64) {
        fn scale<T: Scalar>(s: &mut [T], factor: f64) {
            s.par_iter_mut()
                .for_each(|v| *v = T::from_f64(v.to_f64() * factor));
        }

        match self {
            ValuesMut::F32(s) => scale(s, factor),
            ValuesMut::F64(s) => scale(s, factor),
        }
    }

    /// Draws every value uniformly from `[-|limit|, |limit|]`.
    pub fn random_fill(&mut self, limit: f64, rng: &mut dyn RngCore) {
        fn fill<T: Scalar>(s: &mut [T], limit: f64, rng: &mut dyn RngCore) {
            for v in s.iter_mut() {
                let unit: f64 = rng.random();
                *v = T::from_f64(limit * (2. * unit - 1.));
            }
        }

        let limit = limit.abs();
        match self {
            ValuesMut::F32(s) => fill(s, limit, rng),
            ValuesMut::F64(s) => fill(s, limit, rng),
        }
    }

    /// Computes `self[i] += alpha * other[i]` for every element.
    ///
    /// The caller guarantees both runs have the same length.
    pub fn axpy(&mut self, alpha: f64, other: Values<'_>) {
        fn axpy<T: Scalar, U: Scalar>(dst: &mut [T], alpha: f64, src: &[U]) {
            dst.par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(d, &s)| *d = T::from_f64(d.to_f64() + alpha * s.to_f64()));
        }

        match (self, other) {
            (ValuesMut::F32(d), Values::F32(s)) => axpy(d, alpha, s),
            (ValuesMut::F32(d), Values::F64(s)) => axpy(d, alpha, s),
            (ValuesMut::F64(d), Values::F32(s)) => axpy(d, alpha, s),
            (ValuesMut::F64(d), Values::F64(s)) => axpy(d, alpha, s),
        }
    }

    /// Overwrites the first `src.len()` elements with `src`, converting the precision if needed.
    ///
    /// The caller guarantees `src.len() <= self.len()`.
    pub fn copy_from(&mut self, src: Values<'_>) {
        fn copy<T: Scalar, U: Scalar>(dst: &mut [T], src: &[U]) {
            dst.iter_mut()
                .zip(src)
                .for_each(|(d, &s)| *d = T::from_f64(s.to_f64()));
        }

        match (self, src) {
            (ValuesMut::F32(d), Values::F32(s)) => d[..s.len()].copy_from_slice(s),
            (ValuesMut::F64(d), Values::F64(s)) => d[..s.len()].copy_from_slice(s),
            (ValuesMut::F32(d), Values::F64(s)) => copy(d, s),
            (ValuesMut::F64(d), Values::F32(s)) => copy(d, s),
        }
    }

    /// The raw native-endian bytes of the values.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            ValuesMut::F32(s) => bytemuck::cast_slice_mut(s),
            ValuesMut::F64(s) => bytemuck::cast_slice_mut(s),
        }
    }
}

impl<'s> From<&'s mut [f32]> for ValuesMut<'s> {
    fn from(value: &'s mut [f32]) -> Self {
        ValuesMut::F32(value)
    }
}

impl<'s> From<&'s mut [f64]> for ValuesMut<'s> {
    fn from(value: &'s mut [f64]) -> Self {
        ValuesMut::F64(value)
    }
}

impl<'s> From<&'s mut Vec<f32>> for ValuesMut<'s> {
    fn from(value: &'s mut Vec<f32>) -> Self {
        ValuesMut::F32(value)
    }
}

impl<'s> From<&'s mut Vec<f64>> for ValuesMut<'s> {
    fn from(value: &'s mut Vec<f64>) -> Self {
        ValuesMut::F64(value)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn split_at_rejects_a_mid_past_the_end() {
        let mut buf = [0f32; 3];
        assert!(ValuesMut::from(&mut buf[..]).split_at(4).is_none());

        let (head, tail) = ValuesMut::from(&mut buf[..]).split_at(1).unwrap();
        assert_eq!(head.len(), 1);
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn range_rejects_inverted_and_out_of_bounds_ranges() {
        let mut buf = [0f64; 4];
        assert!(matches!(
            ValuesMut::from(&mut buf[..]).range(3, 1),
            Err(ParamErr::RangeError { .. })
        ));
        assert!(matches!(
            ValuesMut::from(&mut buf[..]).range(2, 5),
            Err(ParamErr::RangeError { .. })
        ));
        assert_eq!(ValuesMut::from(&mut buf[..]).range(1, 3).unwrap().len(), 2);
    }

    #[test]
    fn axpy_mixes_precisions() {
        let mut dst = [1f32, 2., 3.];
        let src = [0.5f64, 0.5, 0.5];
        ValuesMut::from(&mut dst[..]).axpy(-2., Values::from(&src[..]));
        assert_eq!(dst, [0., 1., 2.]);
    }

    #[test]
    fn copy_from_writes_a_prefix() {
        let mut dst = [9f64; 4];
        let src = [1f32, 2.];
        ValuesMut::from(&mut dst[..]).copy_from(Values::from(&src[..]));
        assert_eq!(dst, [1., 2., 9., 9.]);
    }

    #[test]
    fn random_fill_stays_within_the_limit() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut buf = vec![0f32; 256];
        ValuesMut::from(&mut buf).random_fill(-0.5, &mut rng);

        assert!(buf.iter().all(|v| v.abs() <= 0.5));
        assert!(buf.iter().any(|&v| v != 0.));
    }

    #[test]
    fn bytes_cover_every_element() {
        let values = [1f64, 2.];
        assert_eq!(Values::from(&values[..]).as_bytes().len(), 16);
    }
}
