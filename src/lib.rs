#![forbid(unsafe_code)]

pub mod batch;
pub mod chapter;
pub mod cli;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod formats;
pub mod gemini;
pub mod logging;
pub mod pipeline;
pub mod status;
pub mod store;
pub mod translate;
