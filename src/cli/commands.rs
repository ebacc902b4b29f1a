use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::openapi::{OpenApiGenerator, OutputFormat};
use crate::config::RouterConfig;
use crate::module::ModuleRegistry;
use crate::resolver::Resolver;

/// Command-line interface for fsroute
#[derive(Parser, Debug)]
#[command(name = "fsroute")]
#[command(about = "Inspect filesystem-routed handler trees", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the route table derived from a handler tree
    Routes {
        /// Base path prepended to every route (e.g. `unit-test/v1`)
        #[arg(long)]
        base: String,

        /// Handler directory or glob (e.g. `src/handlers/**/*_controller.rs`)
        #[arg(long)]
        handlers: String,
    },
    /// Write an OpenAPI document describing the handler tree
    GenerateOpenapi {
        /// Base path prepended to every route
        #[arg(long)]
        base: String,

        /// Handler directory or glob
        #[arg(long)]
        handlers: String,

        /// Directory the `openapi.<format>` files are written to
        #[arg(long, default_value = "openapi")]
        output: PathBuf,

        /// Output formats, comma-separated
        #[arg(long, value_enum, num_args = 1.., value_delimiter = ',', default_value = "yml")]
        format: Vec<OutputFormat>,

        /// Remove paths of an existing document that no handler produces anymore
        #[arg(long, default_value_t = false)]
        delete: bool,
    },
}

/// Execute a parsed command against the handler modules in `registry`.
///
/// Host binaries pass their own registry so `generate-openapi` can document the
/// requirements their handlers declare; with an empty registry only paths are listed.
///
/// # Errors
///
/// Returns an error if the handler tree cannot be indexed or an output file cannot be
/// written.
pub fn run_cli(cli: Cli, registry: Arc<ModuleRegistry>) -> Result<()> {
    match cli.command {
        Commands::Routes { base, handlers } => {
            let resolver = Resolver::new(&RouterConfig::new(base, handlers), registry)?;
            print_routes(&resolver, &mut io::stdout().lock())
        }
        Commands::GenerateOpenapi {
            base,
            handlers,
            output,
            format,
            delete,
        } => {
            let generator = OpenApiGenerator::new(&base, &handlers, registry)?;
            for file in generator.write(&output, &format, delete)? {
                println!("{}", file.display());
            }
            Ok(())
        }
    }
}

/// One line per route: methods (when the module is registered), path, import reference.
pub fn print_routes(resolver: &Resolver, out: &mut impl Write) -> Result<()> {
    let base = resolver.base_path();
    let loader = resolver.loader();
    for route in resolver.routes()? {
        let methods = if loader.registry().contains(&route.import_reference) {
            loader
                .load_reference(&route.file_path, &route.import_reference)
                .map(|module| {
                    module
                        .methods()
                        .iter()
                        .map(|(method, _)| method.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_else(|_| "-".to_string())
        } else {
            "-".to_string()
        };
        let path = [base, route.route.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        writeln!(
            out,
            "{methods:<24} /{path:<40} {} ({})",
            route.import_reference,
            route.file_path.display()
        )?;
    }
    Ok(())
}
