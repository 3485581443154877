#![deny(missing_docs)]

//! Rust bindings for the MeCab C API.
//!
//! MeCab is loaded at runtime from a dynamic library, so no C toolchain or
//! MeCab headers are needed at build time.
//!
//! ## Quick Start
//! ```no_run
//! use mecab_rs::{Mecab, TaggerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut mecab = Mecab::new(TaggerConfig::default())?;
//!     print!("{}", mecab.parse("すもももももももものうち")?);
//!     for node in mecab.parse_records("東京都に住む")? {
//!         println!("{} ({} bytes)", node.surface, node.length);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Options
//! Tagger options are either structured ([`TaggerConfig`]) or a raw MeCab
//! command line passed through unchanged:
//!
//! ```no_run
//! use mecab_rs::{Mecab, MecabConfig, TaggerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MecabConfig::default()
//!         .with_library_path("/usr/lib/x86_64-linux-gnu/libmecab.so.2")
//!         .with_options(TaggerConfig::default().with_nbest(3));
//!     let mut mecab = Mecab::from_config(config)?;
//!     for node in mecab.parse_records("東京都")? {
//!         println!("path {}: {}", node.path, node.surface);
//!     }
//!
//!     let _raw = Mecab::new("-Owakati")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Records
//! - Records never include BOS/EOS sentinels.
//! - Surfaces are exact byte slices of the input; `length` is in bytes.
//! - Feature strings are filled only when an output format type or node
//!   format is configured, or when forced via
//!   [`MecabConfig::with_feature_extraction`].
//!
//! ## Environment Variables
//! - `MECAB_PATH`: explicit dynamic library path.

mod config;
mod constants;
mod decoder;
mod dictionary;
mod discovery;
mod error;
mod handle;
mod model;
mod native;
mod options;
mod runtime;
mod types;

pub use constants::*;
pub use error::{MecabError, Result};
pub use model::{DictionaryInfo, DictionaryType, MorphNode, NodeStat};
pub use options::{OptionValue, TaggerConfig, TaggerOptions};
pub use runtime::{Mecab, MecabLibrary};
pub use types::{MecabConfig, ParseMode};

#[cfg(test)]
mod test_support;
