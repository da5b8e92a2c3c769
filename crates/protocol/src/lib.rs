#![forbid(unsafe_code)]

mod command;
mod frame;
mod reply;

pub use command::Command;
pub use frame::Frame;
pub use reply::Reply;
