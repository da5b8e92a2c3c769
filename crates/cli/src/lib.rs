#![forbid(unsafe_code)]

mod client;

pub use client::{Client, ClientError, StoredValue};
