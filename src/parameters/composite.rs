use std::{
    collections::{HashMap, hash_map::Entry},
    io, mem,
};

use log::{debug, trace};
use rand::RngCore;

use super::ParametersRef;
use crate::{
    BoxedValue, Layer, Layout, ParamErr, ParameterValue, Result,
    scalar::ValuesMut,
};

/// The element wise binary operations a composite forwards to its children.
#[derive(Debug, Clone, Copy)]
enum Combine {
    Add,
    Sub,
    Update(f64),
}

impl Combine {
    fn apply(
        self,
        node: &mut (dyn ParameterValue<'_> + '_),
        other: &dyn ParameterValue<'_>,
    ) -> Result<()> {
        match self {
            Combine::Add => node.add_assign(other),
            Combine::Sub => node.sub_assign(other),
            Combine::Update(learning_rate) => node.update(other, learning_rate),
        }
    }
}

/// An ordered, named collection of parameter nodes.
///
/// The order the children are added in is the order their values are laid out in any flat buffer
/// built from the tree, it never changes. Dropping a `Parameters` drops all of its children.
#[derive(Debug, Default)]
pub struct Parameters<'a> {
    name: String,
    params: Vec<BoxedValue<'a>>,
    by_name: HashMap<String, usize>,
}

impl<'a> Parameters<'a> {
    /// Creates a new empty `Parameters`.
    ///
    /// # Arguments
    /// * `name` - The name of the composite.
    ///
    /// # Returns
    /// A new `Parameters` instance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Appends `param` to the children and takes ownership of it.
    ///
    /// # Arguments
    /// * `index` - Where the caller expects the child to land, only used for diagnostics.
    /// * `param` - The child node.
    ///
    /// # Returns
    /// A `DuplicateName` error if a sibling already uses `param`'s name, `param` is dropped and
    /// the tree is left untouched in that case.
    pub fn add(&mut self, index: usize, param: BoxedValue<'a>) -> Result<&mut Self> {
        let position = self.params.len();

        match self.by_name.entry(param.name().to_string()) {
            Entry::Occupied(entry) => {
                debug!(parent = self.name.as_str(), child = entry.key().as_str(); "rejected duplicate parameter name");
                return Err(ParamErr::DuplicateName {
                    name: entry.key().clone(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(position);
            }
        }

        if index != position {
            debug!(parent = self.name.as_str(), hint = index, position = position; "index hint differs from the child's position");
        }

        self.params.push(param);
        Ok(self)
    }

    /// Boxes `param` and appends it to the children, see `add`.
    pub fn push<P>(&mut self, param: P) -> Result<&mut Self>
    where
        P: ParameterValue<'a> + 'a,
    {
        let index = self.params.len();
        self.add(index, Box::new(param))
    }

    /// Adds the parameter tree exposed by `layer` as a child.
    ///
    /// # Arguments
    /// * `index` - Where the caller expects the child to land, only used for diagnostics.
    /// * `layer` - The layer whose weights the new child aliases.
    pub fn add_subparams<L>(&mut self, index: usize, layer: &'a mut L) -> Result<&mut Self>
    where
        L: Layer + ?Sized,
    {
        let params = layer.parameters()?;
        self.add(index, Box::new(params))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|param| param.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn ParameterValue<'a> + 'a)> {
        self.params.iter().map(|param| param.as_ref())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn child(&self, index: usize) -> Result<&(dyn ParameterValue<'a> + 'a)> {
        self.params
            .get(index)
            .map(|param| param.as_ref())
            .ok_or(ParamErr::IndexOutOfRange {
                index,
                len: self.params.len(),
            })
    }

    pub fn child_mut(&mut self, index: usize) -> Result<&mut (dyn ParameterValue<'a> + 'a)> {
        let len = self.params.len();
        match self.params.get_mut(index) {
            Some(param) => Ok(param.as_mut()),
            None => Err(ParamErr::IndexOutOfRange { index, len }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ParameterValue<'a> + 'a)> {
        let index = self.index_of(name)?;
        self.params.get(index).map(|param| param.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn ParameterValue<'a> + 'a)> {
        let index = self.index_of(name)?;
        match self.params.get_mut(index) {
            Some(param) => Some(param.as_mut()),
            None => None,
        }
    }

    /// Returns the composite interface of the `index`-th child.
    ///
    /// # Arguments
    /// * `index` - The position of the child.
    /// * `name` - The name the caller expects the child to have, only used for diagnostics.
    ///
    /// # Returns
    /// An `IndexOutOfRange` error if there is no such child or a `WrongKind` error if the child
    /// is a leaf.
    pub fn subparams(&self, index: usize, name: &str) -> Result<&Parameters<'a>> {
        let child = self.child(index)?;
        if child.name() != name {
            debug!(parent = self.name.as_str(), expected = name, actual = child.name(); "subparams name differs from the child's name");
        }

        child.parameters()
    }

    /// Mutable version of `subparams`.
    pub fn subparams_mut(&mut self, index: usize, name: &str) -> Result<&mut Parameters<'a>> {
        let parent = self.name.clone();
        let child = self.child_mut(index)?;
        if child.name() != name {
            debug!(parent = parent.as_str(), expected = name, actual = child.name(); "subparams name differs from the child's name");
        }

        child.parameters_mut()
    }

    /// Drops every child.
    pub fn clear(&mut self) {
        self.params.clear();
        self.by_name.clear();
    }

    /// Exchanges names and children with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.name, &mut other.name);
        mem::swap(&mut self.params, &mut other.params);
        mem::swap(&mut self.by_name, &mut other.by_name);
    }

    /// Returns a composite with this one's name and no children.
    ///
    /// Children are never cloned, copying the values of a tree is done through
    /// `compatible_copy` or `ParametersCopy`.
    pub fn empty_like<'b>(&self) -> Parameters<'b> {
        Parameters::new(self.name.clone())
    }

    /// Builds a reference tree of the same shape over `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to partition among the children, its length must be exactly
    ///   `parameter_count()`.
    ///
    /// # Returns
    /// The new view or a `SizeMismatch` error.
    pub fn reference<'b>(&self, buf: impl Into<ValuesMut<'b>>) -> Result<ParametersRef<'b>> {
        self.partition(buf.into(), |param, head| param.compatible_ref(head))
    }

    /// Writes this tree's values into `buf` and builds a reference tree of the same shape over
    /// it.
    ///
    /// `buf` stays owned by the caller, the returned tree only aliases it.
    pub fn copy_into<'b>(&self, buf: impl Into<ValuesMut<'b>>) -> Result<ParametersRef<'b>> {
        self.partition(buf.into(), |param, head| param.compatible_copy(head))
    }

    /// Splits `buf` among the children in their stored order and builds a node of each one's
    /// shape over its part.
    fn partition<'b, F>(&self, buf: ValuesMut<'b>, mut build: F) -> Result<ParametersRef<'b>>
    where
        F: FnMut(&(dyn ParameterValue<'a> + 'a), ValuesMut<'b>) -> Result<BoxedValue<'b>>,
    {
        let expected = self.parameter_count();
        if buf.len() != expected {
            return Err(ParamErr::SizeMismatch {
                name: self.name.clone(),
                got: buf.len(),
                expected,
            });
        }

        let mut result = Parameters::new(self.name.clone());
        let mut rest = buf;

        for (i, param) in self.params.iter().enumerate() {
            let n = param.parameter_count();
            let available = rest.len();
            let (head, tail) = rest.split_at(n).ok_or_else(|| ParamErr::SizeMismatch {
                name: param.name().to_string(),
                got: available,
                expected: n,
            })?;

            result.add(i, build(param.as_ref(), head)?)?;
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(ParamErr::SizeMismatch {
                name: self.name.clone(),
                got: expected + rest.len(),
                expected,
            });
        }

        trace!(name = self.name.as_str(), params = expected; "built reference tree");
        Ok(ParametersRef::new(result))
    }

    fn combine(&mut self, other: &dyn ParameterValue<'_>, op: Combine) -> Result<()> {
        let theirs = other
            .parameters()
            .map_err(|_| ParamErr::shape(&self.name, "the other operand is not a composite"))?;

        if theirs.len() != self.len() {
            return Err(ParamErr::shape(&self.name, "child counts differ"));
        }

        for (mine, theirs) in self.params.iter().zip(&theirs.params) {
            if mine.name() != theirs.name() {
                return Err(ParamErr::shape(mine.name(), "child names differ"));
            }
            if mine.parameter_count() != theirs.parameter_count() {
                return Err(ParamErr::shape(mine.name(), "parameter counts differ"));
            }
        }

        for (mine, theirs) in self.params.iter_mut().zip(&theirs.params) {
            op.apply(mine.as_mut(), theirs.as_ref())?;
        }

        Ok(())
    }
}

impl<'a> ParameterValue<'a> for Parameters<'a> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_count(&self) -> usize {
        self.params.iter().map(|param| param.parameter_count()).sum()
    }

    fn layout(&self) -> Layout {
        Layout::Composite {
            name: self.name.clone(),
            children: self.params.iter().map(|param| param.layout()).collect(),
        }
    }

    fn copy_to<'b>(&self, out: ValuesMut<'b>) -> Result<ValuesMut<'b>> {
        let needed = self.parameter_count();
        if needed > out.len() {
            return Err(ParamErr::RangeError {
                name: self.name.clone(),
                needed,
                available: out.len(),
            });
        }

        let mut rest = out;
        for param in &self.params {
            rest = param.copy_to(rest)?;
        }

        Ok(rest)
    }

    fn compatible_ref<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        Ok(self.reference(buf)?.into())
    }

    fn compatible_copy<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        Ok(self.copy_into(buf)?.into())
    }

    fn fill(&mut self, value: f64) {
        for param in &mut self.params {
            param.fill(value);
        }
    }

    fn random_fill(&mut self, limit: f64, rng: &mut dyn RngCore) {
        for param in &mut self.params {
            param.random_fill(limit, rng);
        }
    }

    fn add_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.combine(other, Combine::Add)
    }

    fn sub_assign(&mut self, other: &dyn ParameterValue<'_>) -> Result<()> {
        self.combine(other, Combine::Sub)
    }

    fn scale(&mut self, factor: f64) {
        for param in &mut self.params {
            param.scale(factor);
        }
    }

    fn two_norm(&self) -> f64 {
        self.params
            .iter()
            .map(|param| param.two_norm().powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn update(&mut self, other: &dyn ParameterValue<'_>, learning_rate: f64) -> Result<()> {
        self.combine(other, Combine::Update(learning_rate))
    }

    fn serialize(&self, store: &mut dyn io::Write) -> Result<()> {
        for param in &self.params {
            param.serialize(store)?;
        }

        Ok(())
    }

    fn reconstitute(&mut self, store: &mut dyn io::Read) -> Result<()> {
        for param in &mut self.params {
            param.reconstitute(store)?;
        }

        Ok(())
    }

    fn parameters(&self) -> Result<&Parameters<'a>> {
        Ok(self)
    }

    fn parameters_mut(&mut self) -> Result<&mut Parameters<'a>> {
        Ok(self)
    }
}
