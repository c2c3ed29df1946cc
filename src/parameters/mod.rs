mod composite;
mod copy;
mod reference;

pub use composite::Parameters;
pub use copy::ParametersCopy;
pub use reference::ParametersRef;
