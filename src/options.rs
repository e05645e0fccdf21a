//! Exploration configuration forwarded to the engine.
//!
//! [`ExplorationOptions`] is built once, before any resolution starts, and
//! never mutates afterwards. Timeouts are opaque to this layer — negative
//! means unbounded and the engine alone enforces them.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

/// Branch-selection strategy of the symbolic virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Breadth-first over the execution tree
    #[default]
    Bfs,
    /// Depth-first over the execution tree
    Dfs,
    /// Prefer states closest to uncovered code
    ShortestDistance,
    /// Randomized shortest-distance
    RandomShortestDistance,
    /// Prefer states contributing new coverage
    ContributedCoverage,
    /// Execution-tree interleaving
    ExecutionTree,
    /// Execution tree combined with contributed coverage
    ExecutionTreeContributedCoverage,
    /// Round-robin over several strategies
    Interleaved,
    /// Guidance-model driven; requires `--model`
    Ai,
}

/// Which messages the engine prints while exploring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    /// No output at all
    #[default]
    Quiet,
    /// Critical failures only
    Critical,
    /// Errors
    Error,
    /// Errors and warnings
    Warning,
    /// Progress information
    Info,
    /// Full tracing
    Trace,
}

/// How the engine explores the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExplorationMode {
    /// Symbolic interpretation (SILI)
    #[default]
    Sili,
    /// Coverage-guided fuzzing only
    Fuzzer,
    /// Symbolic interpretation interleaved with fuzzing
    Interleaved,
}

/// Immutable configuration shared by every command mode.
///
/// Fully constructed from the parsed command line before any assembly is
/// loaded or any query resolved; never changed afterwards.
#[derive(Debug, Clone)]
pub struct ExplorationOptions {
    /// Time budget for test generation in seconds; negative means unbounded
    pub timeout: i64,
    /// Time budget for the SMT solver in seconds; negative means unbounded
    pub solver_timeout: i64,
    /// Directory where the engine writes generated tests
    pub output_dir: PathBuf,
    /// Path to a guidance model for the AI searcher
    pub model_path: Option<PathBuf>,
    /// Branch-selection strategy
    pub search_strategy: SearchStrategy,
    /// Engine output verbosity
    pub verbosity: Verbosity,
    /// Drop states revisiting the same loop entry or method more often than this
    pub recursion_threshold: u32,
    /// Exploration mode
    pub exploration_mode: ExplorationMode,
    /// Render generated tests as a standalone test project
    pub render_tests: bool,
    /// Execute generated tests and report run statistics
    pub run_tests: bool,
}

impl Default for ExplorationOptions {
    fn default() -> Self {
        ExplorationOptions {
            timeout: -1,
            solver_timeout: -1,
            output_dir: PathBuf::from("."),
            model_path: None,
            search_strategy: SearchStrategy::default(),
            verbosity: Verbosity::default(),
            recursion_threshold: 0,
            exploration_mode: ExplorationMode::default(),
            render_tests: false,
            run_tests: false,
        }
    }
}
