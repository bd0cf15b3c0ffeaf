//! vMail common definitions

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
//
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

/// targets for log! macro
pub mod log_channels {
    /// content handle (repository reads & writes)
    pub const CONTENT: &str = "server::common::content";
}

mod address;
mod content;
/// raw message header helpers.
pub mod headers;
mod mail;
mod queue;
mod recipients;
mod repository;
mod state;

pub use address::Address;
pub use content::{Content, RetryPolicy};
pub use mail::{Attributes, Mail};
pub use queue::{MailQueue, QueueError};
pub use recipients::Recipients;
pub use repository::{MemoryRepository, Repository, RepositoryError};
pub use state::State;

/// create a collection (map or set) from a list of elements.
#[macro_export]
macro_rules! collection {
    // map-like
    ($($k:expr => $v:expr),* $(,)?) => {{
        use std::iter::{Iterator, IntoIterator};
        Iterator::collect(IntoIterator::into_iter([$(($k, $v),)*]))
    }};
    // set-like
    ($($v:expr),* $(,)?) => {{
        use std::iter::{Iterator, IntoIterator};
        Iterator::collect(IntoIterator::into_iter([$($v,)*]))
    }};
}

/// re-exported dependencies
pub mod re {
    pub use addr;
    pub use anyhow;
    pub use async_trait;
    pub use log;
    pub use serde_json;
}
