#![forbid(unsafe_code)]

mod entry;
mod index;
mod store;

pub use entry::{Entry, Value};
pub use store::{GetPolicy, Store};
