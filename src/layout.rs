use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
    BoxedValue, Matrix, ParamErr, Parameters, Result, Scalar, Vector,
    leaves::{check_len, element_count},
    scalar::ValuesMut,
};

/// Describes the shape of a parameter tree: names, kinds and dimensions, never values.
///
/// A layout maps a flat buffer onto the named leaves of a tree, leaves are laid out one after
/// the other in the same order the tree stores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    Vector {
        name: String,
        len: usize,
    },
    Matrix {
        name: String,
        rows: usize,
        cols: usize,
    },
    Composite {
        name: String,
        children: Vec<Layout>,
    },
}

impl Layout {
    pub fn name(&self) -> &str {
        match self {
            Layout::Vector { name, .. }
            | Layout::Matrix { name, .. }
            | Layout::Composite { name, .. } => name,
        }
    }

    /// Returns the amount of scalar elements the described tree holds.
    ///
    /// Saturates at `usize::MAX` for layouts that `validate` rejects.
    pub fn parameter_count(&self) -> usize {
        match self {
            Layout::Vector { len, .. } => *len,
            Layout::Matrix { rows, cols, .. } => rows.saturating_mul(*cols),
            Layout::Composite { children, .. } => children
                .iter()
                .fold(0usize, |total, child| total.saturating_add(child.parameter_count())),
        }
    }

    /// Checks that the element count of every node fits in a `usize`.
    ///
    /// # Returns
    /// The element count or a `ShapeMismatch` error naming the first node that overflows.
    pub fn validate(&self) -> Result<usize> {
        let count = match self {
            Layout::Vector { len, .. } => Some(*len),
            Layout::Matrix { name, rows, cols } => Some(element_count(name, (*rows, *cols))?),
            Layout::Composite { children, .. } => {
                let mut total = Some(0usize);
                for child in children {
                    let count = child.validate()?;
                    total = total.and_then(|total| total.checked_add(count));
                }
                total
            }
        };

        count.ok_or_else(|| ParamErr::shape(self.name(), "element count overflows usize"))
    }

    /// Whether `other` describes a tree whose values correspond one to one with this one's.
    ///
    /// Kinds, dimensions and child names must agree at every level, the root names are ignored.
    pub fn conforms(&self, other: &Layout) -> bool {
        match (self, other) {
            (Layout::Vector { len: a, .. }, Layout::Vector { len: b, .. }) => a == b,
            (
                Layout::Matrix {
                    rows: ar, cols: ac, ..
                },
                Layout::Matrix {
                    rows: br, cols: bc, ..
                },
            ) => (ar, ac) == (br, bc),
            (Layout::Composite { children: a, .. }, Layout::Composite { children: b, .. }) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(a, b)| a.name() == b.name() && a.conforms(b))
            }
            _ => false,
        }
    }

    /// Lists the range every leaf occupies in a flat buffer.
    ///
    /// # Returns
    /// The leaves' paths, their names joined by `/` starting at the root, and their ranges in
    /// canonical order.
    pub fn offsets(&self) -> Vec<(String, Range<usize>)> {
        let mut offsets = Vec::new();
        self.collect_offsets("", 0, &mut offsets);
        offsets
    }

    fn collect_offsets(
        &self,
        prefix: &str,
        start: usize,
        offsets: &mut Vec<(String, Range<usize>)>,
    ) -> usize {
        let path = if prefix.is_empty() {
            self.name().to_string()
        } else {
            format!("{prefix}/{}", self.name())
        };

        match self {
            Layout::Composite { children, .. } => children
                .iter()
                .fold(start, |start, child| child.collect_offsets(&path, start, offsets)),
            leaf => {
                let end = start.saturating_add(leaf.parameter_count());
                offsets.push((path, start..end));
                end
            }
        }
    }

    /// Builds a tree of the described shape that aliases `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to alias, its length must be exactly `parameter_count()`.
    ///
    /// # Returns
    /// The root of the new tree or a `SizeMismatch` error.
    pub fn build_ref<'b>(&self, buf: ValuesMut<'b>) -> Result<BoxedValue<'b>> {
        check_len(self.name(), buf.len(), self.parameter_count())?;

        let node: BoxedValue<'b> = match (self, buf) {
            (Layout::Vector { name, .. }, ValuesMut::F32(s)) => Box::new(Vector::new(name, s)),
            (Layout::Vector { name, .. }, ValuesMut::F64(s)) => Box::new(Vector::new(name, s)),
            (Layout::Matrix { name, rows, cols }, ValuesMut::F32(s)) => {
                Box::new(Matrix::new(name, (*rows, *cols), s)?)
            }
            (Layout::Matrix { name, rows, cols }, ValuesMut::F64(s)) => {
                Box::new(Matrix::new(name, (*rows, *cols), s)?)
            }
            (Layout::Composite { .. }, buf) => Box::new(self.build_tree(buf)?),
        };

        Ok(node)
    }

    /// Builds a composite of the described shape that aliases `buf`.
    ///
    /// # Returns
    /// A `WrongKind` error if this layout doesn't describe a composite, a `SizeMismatch` error
    /// if `buf` doesn't hold exactly `parameter_count()` elements.
    pub fn build_tree<'b>(&self, buf: ValuesMut<'b>) -> Result<Parameters<'b>> {
        let Layout::Composite { name, children } = self else {
            return Err(ParamErr::wrong_kind(self.name(), "composite"));
        };

        check_len(name, buf.len(), self.parameter_count())?;

        let mut params = Parameters::new(name.clone());
        let mut rest = buf;

        for (i, child) in children.iter().enumerate() {
            let n = child.parameter_count();
            let available = rest.len();
            let (head, tail) = rest.split_at(n).ok_or_else(|| ParamErr::SizeMismatch {
                name: child.name().to_string(),
                got: available,
                expected: n,
            })?;

            params.add(i, child.build_ref(head)?)?;
            rest = tail;
        }

        Ok(params)
    }

    /// Builds a zero filled tree of the described shape that owns its values.
    ///
    /// # Returns
    /// The root of the new tree, a `ShapeMismatch` error if the layout doesn't validate or a
    /// `DuplicateName` error if two siblings share a name.
    pub fn build_owned<T: Scalar>(&self) -> Result<BoxedValue<'static>> {
        self.validate()?;
        self.owned_node::<T>()
    }

    /// Builds a zero filled composite of the described shape that owns its values.
    ///
    /// # Returns
    /// A `WrongKind` error if this layout doesn't describe a composite, otherwise the same as
    /// `build_owned`.
    pub fn build_owned_tree<T: Scalar>(&self) -> Result<Parameters<'static>> {
        self.validate()?;
        self.owned_tree::<T>()
    }

    fn owned_node<T: Scalar>(&self) -> Result<BoxedValue<'static>> {
        let node: BoxedValue<'static> = match self {
            Layout::Vector { name, len } => Box::new(Vector::<Vec<T>>::zeros(name, *len)),
            Layout::Matrix { name, rows, cols } => {
                Box::new(Matrix::<Vec<T>>::zeros(name, (*rows, *cols))?)
            }
            Layout::Composite { .. } => Box::new(self.owned_tree::<T>()?),
        };

        Ok(node)
    }

    fn owned_tree<T: Scalar>(&self) -> Result<Parameters<'static>> {
        let Layout::Composite { name, children } = self else {
            return Err(ParamErr::wrong_kind(self.name(), "composite"));
        };

        let mut params = Parameters::new(name.clone());
        for (i, child) in children.iter().enumerate() {
            params.add(i, child.owned_node::<T>()?)?;
        }

        Ok(params)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a layout and rejects it unless it validates.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let layout: Layout = serde_json::from_str(json)?;
        layout.validate().map_err(serde::de::Error::custom)?;
        Ok(layout)
    }
}
