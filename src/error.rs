use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire parameter tree module.
pub type Result<T> = std::result::Result<T, ParamErr>;

/// The parameter tree's error type.
///
/// Every operation either meets its full contract or returns one of these, composite operations
/// never roll back the children they already visited.
#[derive(Debug)]
pub enum ParamErr {
    /// A buffer's length disagrees with the parameter count of the node it was handed to.
    SizeMismatch {
        name: String,
        got: usize,
        expected: usize,
    },
    /// A range is inverted or a write would go past the end of the supplied buffer.
    RangeError {
        name: String,
        needed: usize,
        available: usize,
    },
    /// A sibling with the same name already exists.
    DuplicateName { name: String },
    /// A shape specific accessor was called on a node of another kind.
    WrongKind {
        name: String,
        expected: &'static str,
    },
    /// A child or element index outside the valid range.
    IndexOutOfRange { index: usize, len: usize },
    /// The two operands of a binary operation do not correspond element for element.
    ShapeMismatch {
        name: String,
        reason: &'static str,
    },
    Io(io::Error),
}

impl ParamErr {
    pub(crate) fn shape(name: &str, reason: &'static str) -> Self {
        Self::ShapeMismatch {
            name: name.to_string(),
            reason,
        }
    }

    pub(crate) fn wrong_kind(name: &str, expected: &'static str) -> Self {
        Self::WrongKind {
            name: name.to_string(),
            expected,
        }
    }
}

impl Display for ParamErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamErr::SizeMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for `{name}`: got a buffer of {got} elements, expected {expected}"
            ),
            ParamErr::RangeError {
                name,
                needed,
                available,
            } => write!(
                f,
                "range error for `{name}`: needed {needed} elements but only {available} are available"
            ),
            ParamErr::DuplicateName { name } => {
                write!(f, "a parameter named `{name}` already exists")
            }
            ParamErr::WrongKind { name, expected } => {
                write!(f, "`{name}` is not a {expected} parameter")
            }
            ParamErr::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for length {len}")
            }
            ParamErr::ShapeMismatch { name, reason } => {
                write!(f, "shape mismatch at `{name}`: {reason}")
            }
            ParamErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for ParamErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParamErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParamErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
