mod error;
mod v1;
mod validator;

pub use error::{NameKind, ValidationError};
pub use validator::{is_identifier, validate};
