//! # CLI Module
//!
//! Tooling around a handler tree, exposed through the `fsroute` binary.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print every route the tree produces, with the import reference and file behind it:
//!
//! ```bash
//! fsroute routes --base unit-test/v1 --handlers 'src/handlers/**/*_controller.rs'
//! ```
//!
//! ### `generate-openapi`
//!
//! Write an OpenAPI document for the tree, one file per format:
//!
//! ```bash
//! fsroute generate-openapi \
//!     --base unit-test/v1 \
//!     --handlers src/handlers \
//!     --output docs \
//!     --format json,yml \
//!     --delete
//! ```
//!
//! Existing output files are merged: generated operations replace their counterparts,
//! everything else is kept unless `--delete` drops paths the tree no longer has.
//!
//! ## Usage from Code
//!
//! The stock binary has no handler modules registered, so it documents paths only. A
//! service can ship its own binary that passes its registry:
//!
//! ```rust,ignore
//! use clap::Parser;
//! use fsroute::cli::{run_cli, Cli};
//!
//! run_cli(Cli::parse(), std::sync::Arc::new(my_service::registry()))?;
//! ```

mod commands;
mod openapi;


pub use commands::{print_routes, run_cli, Cli, Commands};
pub use openapi::{OpenApiGenerator, OutputFormat, SECURITY_SCHEME};
