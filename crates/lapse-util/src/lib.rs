//! Small helpers the timing exercises lean on: nested lookups and per-instance memoization.

mod error;
pub use error::PathError;

mod nested;
pub use nested::{get_path, safely_get};

mod memo;
pub use memo::Memo;
