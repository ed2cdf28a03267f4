//! Turn a YouTube video transcript into platform-tailored social media posts.
//!
//! The [`Pipeline`] fetches captions, composes an instruction, lets a
//! tool-calling agent write one post per platform, and decodes the result
//! into [`Post`]s. Shells (the bundled CLI or anything else) only call
//! [`Pipeline::run`].

pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use crate::core::{Pipeline, Post};
pub use error::{Error, ErrorReport, Result};
