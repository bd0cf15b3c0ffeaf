//! vMail testing utilities

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

/// Config shortcut
pub mod config;

/// Repositories counting or failing their operations
pub mod repository;

/// Mailet recording its calls
pub mod mailet;
