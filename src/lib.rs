pub mod error;
pub mod layer;
pub mod layout;
pub mod leaves;
pub mod parameters;
pub mod scalar;
pub mod value;

pub use error::{ParamErr, Result};
pub use layer::Layer;
pub use layout::Layout;
pub use leaves::{Matrix, MatrixRef, OwnedMatrix, OwnedVector, Storage, Vector, VectorRef};
pub use parameters::{Parameters, ParametersCopy, ParametersRef};
pub use scalar::{Scalar, Values, ValuesMut};
pub use value::{BoxedValue, MatrixParameter, ParameterValue, VectorParameter};
