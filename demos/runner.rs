//! Minimal embedding of the cilcover front end.
//!
//! Parses the real command line, loads and resolves targets through the
//! library, and wires in a placeholder engine that only reports what it
//! would explore. Swap [`PlanOnlyEngine`] for a real [`TestEngine`]
//! implementation to get an actual runner.
//!
//! ```text
//! cargo run --example runner -- type Widget Sample.dll -v info
//! ```

use std::io::Write;

use clap::Parser;

use cilcover::cli::{self, Cli};
use cilcover::engine::{Statistics, TestEngine};
use cilcover::metadata::{AssemblyImage, MethodRef, TypeRef};
use cilcover::options::{ExplorationOptions, Verbosity};
use cilcover::Result;

/// Engine stand-in that explores nothing and reports zero statistics.
struct PlanOnlyEngine;

impl PlanOnlyEngine {
    fn plan(&self, what: &str) -> Result<Statistics> {
        log::info!("would explore {what}");
        Ok(Statistics::default())
    }
}

impl TestEngine for PlanOnlyEngine {
    fn cover_entry_point(
        &self,
        image: &AssemblyImage,
        args: Option<&[String]>,
        _options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.plan(&format!(
            "entry point of {} (args: {:?})",
            image.path().display(),
            args
        ))
    }

    fn cover_and_run_entry_point(
        &self,
        image: &AssemblyImage,
        args: Option<&[String]>,
        options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.cover_entry_point(image, args, options)
    }

    fn cover_assembly(
        &self,
        image: &AssemblyImage,
        _single_file: bool,
        _options: &ExplorationOptions,
    ) -> Result<Statistics> {
        let public_types = image.types().filter(TypeRef::is_public).count();
        self.plan(&format!(
            "{} public types of {}",
            public_types,
            image.path().display()
        ))
    }

    fn cover_and_run_assembly(
        &self,
        image: &AssemblyImage,
        single_file: bool,
        options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.cover_assembly(image, single_file, options)
    }

    fn cover_type(&self, ty: &TypeRef<'_>, _options: &ExplorationOptions) -> Result<Statistics> {
        self.plan(&format!("type {} ({})", ty.full_name(), ty.token()))
    }

    fn cover_and_run_type(
        &self,
        ty: &TypeRef<'_>,
        options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.cover_type(ty, options)
    }

    fn cover_method(
        &self,
        method: &MethodRef<'_>,
        _options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.plan(&format!(
            "method {} ({})",
            method.full_name(),
            method.token()
        ))
    }

    fn cover_and_run_method(
        &self,
        method: &MethodRef<'_>,
        options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.cover_method(method, options)
    }

    fn cover_namespace(
        &self,
        types: &[TypeRef<'_>],
        _options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.plan(&format!("{} namespace types", types.len()))
    }

    fn cover_and_run_namespace(
        &self,
        types: &[TypeRef<'_>],
        options: &ExplorationOptions,
    ) -> Result<Statistics> {
        self.cover_namespace(types, options)
    }
}

fn log_level(verbosity: Verbosity) -> log::LevelFilter {
    match verbosity {
        Verbosity::Quiet => log::LevelFilter::Off,
        Verbosity::Critical | Verbosity::Error => log::LevelFilter::Error,
        Verbosity::Warning => log::LevelFilter::Warn,
        Verbosity::Info => log::LevelFilter::Info,
        Verbosity::Trace => log::LevelFilter::Trace,
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.options.verbosity))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let mut stdout = std::io::stdout();
    if let Err(error) = cli::run(&cli, &PlanOnlyEngine, &mut stdout) {
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}
