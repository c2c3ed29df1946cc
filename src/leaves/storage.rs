use std::fmt;

use crate::Scalar;

/// Contiguous element storage backing a leaf.
///
/// Owned leaves hold a `Vec<T>` or `Box<[T]>`, reference leaves hold a `&mut [T]` into a buffer
/// owned by someone else.
pub trait Storage: fmt::Debug {
    type Elem: Scalar;

    fn as_slice(&self) -> &[Self::Elem];

    fn as_mut_slice(&mut self) -> &mut [Self::Elem];
}

impl<T: Scalar> Storage for Vec<T> {
    type Elem = T;

    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T: Scalar> Storage for Box<[T]> {
    type Elem = T;

    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T: Scalar> Storage for &mut [T] {
    type Elem = T;

    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}
