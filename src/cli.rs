//! Command routing and dispatch.
//!
//! Five mutually exclusive subcommands, one per exploration target shape,
//! sharing one global option set. `run` drives the whole pipeline for one
//! invocation: build options, load the assembly, resolve the target, hand it
//! to exactly one engine entry point, render the report. Load and resolution
//! failures short-circuit before the engine is ever reached.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::engine::{Statistics, TestEngine};
use crate::metadata::{AssemblyImage, MethodRef, TypeRef};
use crate::options::{ExplorationMode, ExplorationOptions, SearchStrategy, Verbosity};
use crate::resolve::{resolve_method, resolve_namespace, resolve_type};
use crate::{report, Result};

/// cilcover - test generation front end for .NET assemblies
#[derive(Debug, Parser)]
#[command(name = "cilcover", version, about, long_about = None)]
pub struct Cli {
    /// Options shared by every subcommand.
    #[command(flatten)]
    pub options: SharedOptions,

    /// The selected command mode.
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Args)]
pub struct SharedOptions {
    /// Time for test generation in seconds. Negative value means no timeout.
    #[arg(short = 't', long, global = true, default_value_t = -1, allow_negative_numbers = true)]
    pub timeout: i64,

    /// Path to a model file for the AI searcher.
    #[arg(short = 'm', long, global = true, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Timeout for the SMT solver in seconds. Negative value means no timeout.
    #[arg(
        long,
        alias = "st",
        global = true,
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    pub solver_timeout: i64,

    /// Path where unit tests will be generated.
    #[arg(short = 'o', long, global = true, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Render generated tests as a standalone test project.
    #[arg(long, global = true)]
    pub render_tests: bool,

    /// Reproduce generated tests and report run statistics instead.
    #[arg(long, global = true)]
    pub run_tests: bool,

    /// Strategy the symbolic virtual machine uses for branch selection.
    #[arg(long = "strat", global = true, value_enum, default_value_t = SearchStrategy::Bfs)]
    pub strat: SearchStrategy,

    /// Determines which messages are displayed in output.
    #[arg(short = 'v', long, global = true, value_enum, default_value_t = Verbosity::Quiet)]
    pub verbosity: Verbosity,

    /// Terminate exploration of states which have visited the same loop
    /// entry or method more times than this value.
    #[arg(long = "rec-threshold", alias = "rt", global = true, default_value_t = 0)]
    pub rec_threshold: u32,

    /// Determines which mode is used for exploration.
    #[arg(
        long = "exploration-mode",
        alias = "em",
        global = true,
        value_enum,
        default_value_t = ExplorationMode::Sili
    )]
    pub exploration_mode: ExplorationMode,

    /// Emit the report as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,
}

impl SharedOptions {
    /// Freeze the parsed options into the immutable engine configuration.
    #[must_use]
    pub fn to_exploration_options(&self) -> ExplorationOptions {
        ExplorationOptions {
            timeout: self.timeout,
            solver_timeout: self.solver_timeout,
            output_dir: self.output.clone(),
            model_path: self.model.clone(),
            search_strategy: self.strat,
            verbosity: self.verbosity,
            recursion_threshold: self.rec_threshold,
            exploration_mode: self.exploration_mode,
            render_tests: self.render_tests,
            run_tests: self.run_tests,
        }
    }
}

/// The five mutually exclusive command modes, one per exploration target.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate test coverage from the entry point of the assembly
    /// (the assembly must contain a Main method).
    EntryPoint {
        /// Path to the target assembly.
        #[arg(value_name = "ASSEMBLY")]
        assembly: PathBuf,

        /// Command line arguments for the entry point.
        #[arg(value_name = "ARGS")]
        args: Vec<String>,

        /// Ignore the literal arguments and force the engine to generate
        /// various input console arguments.
        #[arg(long)]
        unknown_args: bool,
    },

    /// Generate unit tests for all public methods of all public types of
    /// the assembly.
    AllPublicMethods {
        /// Path to the target assembly.
        #[arg(value_name = "ASSEMBLY")]
        assembly: PathBuf,

        /// Emit one combined rendering instead of one file per type.
        #[arg(long, hide = true)]
        single_file: bool,
    },

    /// Generate unit tests for all public methods of the specified type.
    Type {
        /// Full or partial name of the type.
        #[arg(value_name = "CLASS")]
        class_name: String,

        /// Path to the target assembly.
        #[arg(value_name = "ASSEMBLY")]
        assembly: PathBuf,
    },

    /// Try to resolve and generate unit test coverage for the specified
    /// method, by name or metadata token.
    Method {
        /// Method name or metadata token (decimal or 0x-prefixed hex).
        #[arg(value_name = "METHOD")]
        method_name: String,

        /// Path to the target assembly.
        #[arg(value_name = "ASSEMBLY")]
        assembly: PathBuf,
    },

    /// Try to resolve and generate unit test coverage for all public
    /// methods of the specified namespace.
    Namespace {
        /// Namespace prefix to cover.
        #[arg(value_name = "NAMESPACE")]
        namespace_name: String,

        /// Path to the target assembly.
        #[arg(value_name = "ASSEMBLY")]
        assembly: PathBuf,
    },
}

/// The resolved unit of work for one invocation; exactly one is produced
/// per command, borrowing the image loaded for it.
pub enum ExplorationTarget<'a> {
    /// Explore from the assembly entry point; `None` arguments let the
    /// engine synthesize them.
    EntryPoint {
        /// The loaded assembly
        image: &'a AssemblyImage,
        /// Literal program arguments, unless `--unknown-args` cleared them
        args: Option<Vec<String>>,
    },
    /// Explore all public methods of all public types.
    AllPublicMethods {
        /// The loaded assembly
        image: &'a AssemblyImage,
        /// Emit one combined rendering
        single_file: bool,
    },
    /// Explore the public methods of one resolved type.
    SingleType(TypeRef<'a>),
    /// Explore one resolved method or constructor.
    SingleMethod(MethodRef<'a>),
    /// Explore all types under a namespace prefix, in enumeration order.
    Namespace(Vec<TypeRef<'a>>),
}

/// Invoke exactly one engine entry point for the target.
///
/// The run flag alone decides between the generate-only and the
/// generate-and-run variant; never both, never neither.
///
/// # Errors
/// Propagates the engine's failure unchanged.
pub fn dispatch(
    engine: &dyn TestEngine,
    target: &ExplorationTarget<'_>,
    options: &ExplorationOptions,
) -> Result<Statistics> {
    match target {
        ExplorationTarget::EntryPoint { image, args } => {
            if options.run_tests {
                engine.cover_and_run_entry_point(image, args.as_deref(), options)
            } else {
                engine.cover_entry_point(image, args.as_deref(), options)
            }
        }
        ExplorationTarget::AllPublicMethods { image, single_file } => {
            if options.run_tests {
                engine.cover_and_run_assembly(image, *single_file, options)
            } else {
                engine.cover_assembly(image, *single_file, options)
            }
        }
        ExplorationTarget::SingleType(ty) => {
            if options.run_tests {
                engine.cover_and_run_type(ty, options)
            } else {
                engine.cover_type(ty, options)
            }
        }
        ExplorationTarget::SingleMethod(method) => {
            if options.run_tests {
                engine.cover_and_run_method(method, options)
            } else {
                engine.cover_method(method, options)
            }
        }
        ExplorationTarget::Namespace(types) => {
            if options.run_tests {
                engine.cover_and_run_namespace(types, options)
            } else {
                engine.cover_namespace(types, options)
            }
        }
    }
}

fn emit(statistics: &Statistics, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        report::render_json(statistics, out)
    } else {
        report::render(statistics, out)
    }
}

/// Execute one parsed command end to end.
///
/// Options are frozen first; the assembly is loaded once; the target is
/// resolved; the engine is called exactly once; the report is rendered
/// exactly once on success.
///
/// # Errors
/// Load failures ([`crate::Error::Load`]), resolution failures, and engine
/// failures, each of which terminates the invocation before any later
/// stage. [`crate::Error::exit_code`] maps them to distinct process exit
/// codes.
pub fn run(cli: &Cli, engine: &dyn TestEngine, out: &mut dyn Write) -> Result<()> {
    let options = cli.options.to_exploration_options();

    let statistics = match &cli.command {
        Command::EntryPoint {
            assembly,
            args,
            unknown_args,
        } => {
            let image = AssemblyImage::from_file(assembly)?;
            let args = if *unknown_args { None } else { Some(args.clone()) };
            dispatch(
                engine,
                &ExplorationTarget::EntryPoint {
                    image: &image,
                    args,
                },
                &options,
            )?
        }
        Command::AllPublicMethods {
            assembly,
            single_file,
        } => {
            let image = AssemblyImage::from_file(assembly)?;
            dispatch(
                engine,
                &ExplorationTarget::AllPublicMethods {
                    image: &image,
                    single_file: *single_file,
                },
                &options,
            )?
        }
        Command::Type {
            class_name,
            assembly,
        } => {
            let image = AssemblyImage::from_file(assembly)?;
            let ty = resolve_type(&image, class_name)?;
            log::debug!("resolved type {} to {}", class_name, ty.full_name());
            dispatch(engine, &ExplorationTarget::SingleType(ty), &options)?
        }
        Command::Method {
            method_name,
            assembly,
        } => {
            let image = AssemblyImage::from_file(assembly)?;
            let method = resolve_method(&image, method_name)?;
            log::debug!(
                "resolved method {} to {} ({})",
                method_name,
                method.full_name(),
                method.token()
            );
            dispatch(engine, &ExplorationTarget::SingleMethod(method), &options)?
        }
        Command::Namespace {
            namespace_name,
            assembly,
        } => {
            let image = AssemblyImage::from_file(assembly)?;
            let types = resolve_namespace(&image, namespace_name)?;
            log::debug!(
                "resolved namespace {} to {} types",
                namespace_name,
                types.len()
            );
            dispatch(engine, &ExplorationTarget::Namespace(types), &options)?
        }
    };

    emit(&statistics, cli.options.json, out)
}
