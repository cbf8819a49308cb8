#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod characters;
pub mod config;
pub mod gateway;
pub mod providers;
pub mod relay;
pub mod transcripts;

pub use config::Config;
