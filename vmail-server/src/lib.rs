//! vMail server
//!
//! The processing side of the mail transfer agent: the queue between the
//! front-ends and the workers, the content repositories, and the workers
//! running the mails through the pipeline.

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
    /// mails handed over by the front-ends
    pub const INTAKE: &str = "server::intake";
    /// mails dropped in the pickup directory
    pub const PICKUP: &str = "server::processes::pickup";
    /// content repositories
    pub const REPOSITORY: &str = "server::repository";
    /// processing runtime
    pub const RUNTIME: &str = "server::runtime";
    /// processing workers
    pub const SPOOL: &str = "server::processes::spool";
}

mod intake;
mod management;
mod memory_queue;
mod runtime;
mod repository {
    pub mod file;
}
/// processes running on the server's runtimes.
pub mod processes {
    /// json files of the pickup directory handed over to the intake.
    pub mod pickup;
    /// workers taking the queued mails through the pipeline.
    pub mod spool;
}

pub use intake::{DeliveryRejected, Intake};
pub use management::{ManagementReader, QueueSnapshot};
pub use memory_queue::MemoryQueue;
pub use repository::file::FileRepository;
pub use runtime::start_runtime;

#[cfg(test)]
mod tests;

/// re-exported module
pub mod re {
    pub use tokio;
}
