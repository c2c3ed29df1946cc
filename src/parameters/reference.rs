use std::ops::{Deref, DerefMut};

use super::Parameters;
use crate::BoxedValue;

/// A composite whose leaves alias a caller owned buffer.
///
/// It behaves exactly like the `Parameters` it wraps, writes through it land in the buffer, and it
/// can't outlive the borrow of that buffer.
#[derive(Debug)]
pub struct ParametersRef<'b>(Parameters<'b>);

impl<'b> ParametersRef<'b> {
    pub(crate) fn new(params: Parameters<'b>) -> Self {
        Self(params)
    }

    pub fn into_inner(self) -> Parameters<'b> {
        self.0
    }
}

impl<'b> Deref for ParametersRef<'b> {
    type Target = Parameters<'b>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'b> DerefMut for ParametersRef<'b> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'b> From<ParametersRef<'b>> for BoxedValue<'b> {
    fn from(value: ParametersRef<'b>) -> Self {
        Box::new(value.0)
    }
}
