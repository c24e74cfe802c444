//! Plain data types shared by the lapse crates.
//!
//! Nothing in here performs I/O or touches the async runtime.

mod domain;
pub use domain::*;

mod event;
pub use event::*;
