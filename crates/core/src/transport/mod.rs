//! Download transport abstraction.
//!
//! A transport turns a URL into a payload on local disk. It hands out a
//! [`TaskId`] for each transfer and later reports progress and exactly one
//! terminal event (completed with a temporary path, or failed) on a channel.
//! Where the payload finally lands is not the transport's concern.

mod config;
mod http;
mod types;

pub use config::HttpTransportConfig;
pub use http::HttpTransport;
pub use types::*;
