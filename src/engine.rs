//! The exploration engine contract.
//!
//! Test generation itself — symbolic exploration, rendering, replay — lives
//! outside this crate. [`TestEngine`] is the seam: one generate-only and one
//! generate-and-run entry point per target shape, every call yielding a
//! [`Statistics`] value exactly once. The engine owns all artifacts it
//! writes to the configured output directory and is alone responsible for
//! honoring the timeouts it is handed.

use serde::Serialize;
use std::time::Duration;

use crate::metadata::{AssemblyImage, MethodRef, TypeRef};
use crate::options::ExplorationOptions;
use crate::Result;

/// Result statistics of one engine invocation.
///
/// Produced once by the engine, consumed exactly once by the report
/// emitter; immutable in between. The `tests_passed`/`tests_failed` pair is
/// populated only by the generate-and-run entry points.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    /// Number of unit tests generated
    pub tests_generated: usize,
    /// Number of error-reproducing tests generated
    pub errors_found: usize,
    /// Symbolic machine steps taken
    pub steps: u64,
    /// States dropped before reaching a terminal point
    pub incomplete_states: usize,
    /// Statement coverage of the explored targets, when computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,
    /// Wall-clock duration of the engine call
    pub elapsed: Duration,
    /// Generated tests that reproduced successfully (run mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<usize>,
    /// Generated tests that failed to reproduce (run mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_failed: Option<usize>,
}

/// External test-generation engine.
///
/// Five target shapes, each with a generate-only and a generate-and-run
/// variant. The dispatcher invokes exactly one of these per command, gated
/// solely by the run flag; implementations must not assume any call
/// ordering or shared state between invocations.
pub trait TestEngine {
    /// Generate tests from the assembly entry point. `args` of `None` lets
    /// the engine synthesize command-line arguments.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_entry_point(
        &self,
        image: &AssemblyImage,
        args: Option<&[String]>,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// [`TestEngine::cover_entry_point`], then run the generated tests.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_and_run_entry_point(
        &self,
        image: &AssemblyImage,
        args: Option<&[String]>,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// Generate tests for all public methods of all public types.
    /// `single_file` asks for one combined rendering.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_assembly(
        &self,
        image: &AssemblyImage,
        single_file: bool,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// [`TestEngine::cover_assembly`], then run the generated tests.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_and_run_assembly(
        &self,
        image: &AssemblyImage,
        single_file: bool,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// Generate tests for all public methods of one type.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_type(&self, ty: &TypeRef<'_>, options: &ExplorationOptions) -> Result<Statistics>;

    /// [`TestEngine::cover_type`], then run the generated tests.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_and_run_type(
        &self,
        ty: &TypeRef<'_>,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// Generate tests for one method or constructor.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_method(
        &self,
        method: &MethodRef<'_>,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// [`TestEngine::cover_method`], then run the generated tests.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_and_run_method(
        &self,
        method: &MethodRef<'_>,
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// Generate tests for all public methods of the given namespace types.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_namespace(
        &self,
        types: &[TypeRef<'_>],
        options: &ExplorationOptions,
    ) -> Result<Statistics>;

    /// [`TestEngine::cover_namespace`], then run the generated tests.
    ///
    /// # Errors
    /// Engine-defined failures surface as [`crate::Error::Engine`].
    fn cover_and_run_namespace(
        &self,
        types: &[TypeRef<'_>],
        options: &ExplorationOptions,
    ) -> Result<Statistics>;
}
