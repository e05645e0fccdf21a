#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

//! # cilcover
//!
//! Command dispatch and reflection-resolution front end for a
//! test-generation engine operating over compiled .NET assemblies.
//!
//! The crate answers one question well: given an imprecise, user-supplied
//! string and a loaded assembly image, which exact type or method did the
//! user mean? Around that it provides the five command modes of a
//! test-generation runner — entry point, all public methods, single type,
//! single method (by name or metadata token), namespace — and the dispatch
//! contract towards the engine that does the actual exploration.
//!
//! ## What lives here
//!
//! - [`metadata`] — eager, minimal ECMA-335 image loading: the Module,
//!   TypeDef and MethodDef tables, the `#Strings`/`#GUID` heaps, and the
//!   PE/Cor20 envelope. Loading builds a full-name index and a per-module
//!   token index once; resolution never rescans raw bytes.
//! - [`resolve`] — the resolution semantics: exact match first, then
//!   substring with shortest-name preference for types; token probing or
//!   dotted name fragments with first-type-wins for methods.
//! - [`cli`] — the five subcommands, shared options, and the dispatch
//!   pipeline invoking exactly one [`engine::TestEngine`] entry point per
//!   invocation.
//! - [`engine`] — the trait boundary to the external exploration engine,
//!   plus the [`engine::Statistics`] it yields.
//! - [`report`] — the one-shot statistics report emitter.
//!
//! The exploration engine itself — symbolic execution, test rendering,
//! replay — is out of scope; embedders implement [`engine::TestEngine`]
//! and hand it to [`cli::run`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use cilcover::metadata::AssemblyImage;
//! use cilcover::resolve;
//!
//! let image = AssemblyImage::from_file("Sample.dll".as_ref())?;
//! let widget = resolve::resolve_type(&image, "Widget")?;
//! println!("resolved to {} ({})", widget.full_name(), widget.token());
//! # Ok::<(), cilcover::Error>(())
//! ```
//!
//! A full embedding — argument parsing, engine wiring, exit codes — is
//! shown in `demos/runner.rs`.

#[macro_use]
mod error;
pub(crate) mod utils;

pub mod cli;
pub mod engine;
pub mod metadata;
pub mod options;
pub mod report;
pub mod resolve;

pub use error::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
