//! Line-oriented request/response protocol spoken with the build tool
//!
//! One JSON object per line in each direction. The process speaks first,
//! announcing the commands it understands; every later response echoes the
//! ID of the request it answers.

pub mod handler;
pub mod message;

pub use handler::{HandlerStats, RequestHandler};
pub use message::{Command, Request, Response};
