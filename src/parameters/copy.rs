use std::{
    io,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use log::debug;
use rand::RngCore;

use super::Parameters;
use crate::{
    BoxedValue, Layout, Matrix, ParamErr, ParameterValue, Result, Scalar, Vector,
    scalar::{Values, ValuesMut},
};

/// A composite owning fresh `T` storage for every leaf of the tree it was copied from.
///
/// It has the source's names and shape and shares nothing with it. It is a `Parameters` in every
/// respect: it dereferences to one and reports one through `parameters()`, so copies nest inside
/// other owned trees and pair with them in binary operations.
#[derive(Debug)]
pub struct ParametersCopy<T: Scalar> {
    tree: Parameters<'static>,
    elem: PhantomData<T>,
}

impl<T: Scalar> ParametersCopy<T> {
    /// Creates a new `ParametersCopy` holding `source`'s current values.
    ///
    /// # Arguments
    /// * `source` - The tree to copy.
    ///
    /// # Returns
    /// A new `ParametersCopy` instance or a `ShapeMismatch` error if `source` holds a node that is
    /// neither a composite, a vector nor a matrix.
    pub fn new(source: &Parameters<'_>) -> Result<Self> {
        let tree = copy_tree::<T>(source)?;
        debug!(name = source.name(), params = tree.parameter_count(); "copied parameter tree");

        Ok(Self {
            tree,
            elem: PhantomData,
        })
    }

    /// Creates a zero filled copy of the shape `layout` describes, ready to be reconstituted.
    ///
    /// # Returns
    /// A `WrongKind` error if `layout` doesn't describe a composite.
    pub fn from_layout(layout: &Layout) -> Result<Self> {
        Ok(Self {
            tree: layout.build_owned_tree::<T>()?,
            elem: PhantomData,
        })
    }

    /// Collects the values in canonical order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut values = vec![T::default(); self.tree.parameter_count()];
        self.tree.copy_to(T::wrap_mut(&mut values))?;
        Ok(values)
    }

    pub fn into_inner(self) -> Parameters<'static> {
        self.tree
    }
}

fn copy_tree<T: Scalar>(source: &Parameters<'_>) -> Result<Parameters<'static>> {
    let mut tree = source.empty_like();
    for (i, child) in source.iter().enumerate() {
        tree.add(i, copy_node::<T>(child)?)?;
    }

    Ok(tree)
}

fn copy_node<T: Scalar>(node: &dyn ParameterValue<'_>) -> Result<BoxedValue<'static>> {
    fn collect<T: Scalar>(values: Values<'_>) -> Vec<T> {
        values.iter().map(T::from_f64).collect()
    }

    if let Ok(params) = node.parameters() {
        return Ok(Box::new(copy_tree::<T>(params)?));
    }
    if let Ok(vector) = node.vector() {
        return Ok(Box::new(Vector::new(node.name(), collect::<T>(vector.values()))));
    }
    if let Ok(matrix) = node.matrix() {
        let data = collect::<T>(matrix.values());
        return Ok(Box::new(Matrix::new(node.name(), matrix.shape(), data)?));
    }

    Err(ParamErr::shape(node.name(), "unsupported node kind"))
}

impl<T: Scalar> Deref for ParametersCopy<T> {
    type Target = Parameters<'static>;

    fn deref(&self) -> &Self::Target {
        &self.tree
    }
}

impl<T: Scalar> DerefMut for ParametersCopy<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tree
    }
}

impl<T: Scalar> ParameterValue<'static> for ParametersCopy<T> {
    fn name(&self) -> &str {
        self.tree.name()
    }

    fn parameter_count(&self) -> usize {
        self.tree.parameter_count()
    }

    fn layout(&self) -> Layout {
        self.tree.layout()
    }

    fn copy_to<'b>(&self, out: ValuesMut<'b>) -> Result<ValuesMut<'b>> {
        self.tree.copy_to(out)
    }

    fn compatible_ref<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        self.tree.compatible_ref(buf)
    }

    fn compatible_copy<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        self.tree.compatible_copy(buf)
    }

    fn fill(&mut self, value: f64) {
        self.tree.fill(value);
    }

    fn random_fill(&mut self, limit: f64, rng: &mut dyn RngCore) {
        self.tree.random_fill(limit, rng);
    }

    fn add_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.tree.add_assign(other)
    }

    fn sub_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.tree.sub_assign(other)
    }

    fn scale(&mut self, factor: f64) {
        self.tree.scale(factor);
    }

    fn two_norm(&self) -> f64 {
        self.tree.two_norm()
    }

    fn update(&mut self, other: &dyn ParameterValue<'_>, learning_rate: f64) -> Result<()> {
        self.tree.update(other, learning_rate)
    }

    fn serialize(&self, store: &mut dyn io::Write) -> Result<()> {
        self.tree.serialize(store)
    }

    fn reconstitute(&mut self, store: &mut dyn io::Read) -> Result<()> {
        self.tree.reconstitute(store)
    }

    fn parameters(&self) -> Result<&Parameters<'static>> {
        Ok(&self.tree)
    }

    fn parameters_mut(&mut self) -> Result<&mut Parameters<'static>> {
        Ok(&mut self.tree)
    }
}
