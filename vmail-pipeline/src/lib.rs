//! vMail processing pipeline
//!
//! A mail goes through named processors. Each processor is an ordered list of
//! steps: a matcher selects the recipients a step applies to, and a mailet
//! acts on the mail for them. The routing engine moves the mail from a
//! processor to another until it is discarded or dropped.

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
//
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

mod log_channels {
    pub const ENGINE: &str = "server::pipeline::engine";
    pub const PROCESSOR: &str = "server::pipeline::processor";
    pub const MAILET: &str = "server::pipeline::mailet";
}

mod context;
mod engine;
/// actions of a step.
pub mod mailet;
/// selection of the recipients a step applies to.
pub mod matcher;
mod processor;
mod registry;

pub use context::{MailetContext, ServerIdentity};
pub use engine::{Disposition, PassReport, RoutingEngine};
pub use mailet::{Mailet, Outcome, Parameters};
pub use matcher::Matcher;
pub use processor::{Processor, Step, Transition};
pub use registry::Registry;

#[cfg(test)]
mod tests;
