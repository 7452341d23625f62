#![warn(missing_docs)]
//! Backend trait and output plumbing for glslx.
//!
//! Defines the [`Backend`] trait that all code emitters implement, along
//! with supporting types ([`BackendOptions`], [`BackendOutput`],
//! [`BackendError`]), the shared front half of every backend
//! ([`prepare`]) and a [`BackendRegistry`] for target dispatch.

use std::fmt::{self, Debug};

use glslx_analysis::{BuiltinTable, TypeError, infer_module};
use glslx_autodiff::{DerivativeOptions, ModuleError, differentiate_module};
use glslx_ir::Module;

/// A backend that turns a glslx module into target-specific output.
pub trait Backend: Debug + Send + Sync {
    /// Human-readable name (e.g. "GLSL").
    fn name(&self) -> &str;

    /// Target identifiers this backend handles.
    fn targets(&self) -> &[&str];

    /// Compile a module to backend-specific output.
    fn compile(
        &self,
        module: &Module,
        opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError>;
}

/// Options passed to a backend during compilation.
///
/// The default emits the module as written: no simplification and no
/// derivatives. Derivatives are always simplified by the differentiator
/// itself.
#[derive(Clone, Debug, Default)]
pub struct BackendOptions {
    /// Run the simplifier over every function before emission. This may
    /// regroup floating-point arithmetic, so it is opt-in.
    pub simplify: bool,
    /// Replace the module by its derivatives before emission.
    pub derivatives: Option<DerivativeOptions>,
}

impl fmt::Display for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackendOptions {{ simplify: {}, derivatives: ", self.simplify)?;
        match &self.derivatives {
            Some(d) => write!(f, "{:?} }}", d.input),
            None => f.write_str("off }"),
        }
    }
}

/// The output produced by a backend.
#[derive(Clone, Debug)]
pub struct BackendOutput {
    /// One or more output files.
    pub files: Vec<OutputFile>,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl BackendOutput {
    /// The text of the first text file, if any.
    pub fn text(&self) -> Option<&str> {
        self.files.iter().find_map(|file| match &file.content {
            OutputContent::Text(text) => Some(text.as_str()),
        })
    }
}

impl fmt::Display for BackendOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s), {} diagnostic(s)",
            self.files.len(),
            self.diagnostics.len()
        )
    }
}

/// A single output file.
#[derive(Clone, Debug)]
pub struct OutputFile {
    /// Suggested filename (e.g. "module.glsl").
    pub name: String,
    /// The file content.
    pub content: OutputContent,
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Content of an output file.
#[derive(Clone, Debug)]
pub enum OutputContent {
    /// UTF-8 source text.
    Text(String),
}

impl fmt::Display for OutputContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "Text({} chars)", s.len()),
        }
    }
}

/// A non-fatal diagnostic message from a backend.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Severity level for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// A warning that does not prevent compilation.
    Warning,
    /// An informational note.
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "Warning",
            Self::Info => "Info",
        })
    }
}

/// Errors that can occur during backend compilation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The module does not type-check.
    #[error(transparent)]
    Type(#[from] TypeError),
    /// A requested derivative could not be produced.
    #[error(transparent)]
    Derivative(#[from] ModuleError),
    /// The module uses a construct the target cannot express.
    #[error("unsupported at `{node}`: {message}")]
    Unsupported {
        /// What is missing.
        message: String,
        /// The offending node rendered as GLSL.
        node: String,
    },
}

/// A module ready for emission, with the diagnostics gathered on the way.
#[derive(Clone, Debug)]
pub struct Prepared {
    /// The annotated (and possibly differentiated and simplified) module.
    pub module: Module,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Type-checks `module` and applies the requested passes.
///
/// Every backend runs this first so that emitters only ever see fully
/// annotated trees.
pub fn prepare(module: &Module, opts: &BackendOptions) -> Result<Prepared, BackendError> {
    let mut diagnostics = Vec::new();
    let mut module = match &opts.derivatives {
        Some(derivatives) => {
            let derived = differentiate_module(module, derivatives)?;
            diagnostics.extend(derived.skipped.iter().map(|skipped| Diagnostic {
                level: DiagnosticLevel::Warning,
                message: format!(
                    "skipped derivative of `{}` with respect to `{}`: {}",
                    skipped.function, skipped.parameter, skipped.error
                ),
            }));
            derived.module
        }
        None => infer_module(module, BuiltinTable::shared())?,
    };
    if opts.simplify && glslx_opt::Simplifier::default().run_module(&mut module) {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Info,
            message: "simplified expressions".into(),
        });
    }
    log::debug!(
        "prepared module: {} items, {} diagnostics",
        module.items.len(),
        diagnostics.len()
    );
    Ok(Prepared {
        module,
        diagnostics,
    })
}

/// Registry of available backends, used for target dispatch.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Creates a registry pre-populated with the GLSL backend.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(GlslBackend));
        reg
    }

    /// Registers a backend.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    /// Finds a backend that handles the given target identifier.
    pub fn find(&self, target: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.targets().contains(&target))
            .map(|b| &**b)
    }

    /// Lists all supported target identifiers.
    pub fn list_targets(&self) -> Vec<&str> {
        self.backends
            .iter()
            .flat_map(|b| b.targets().iter().copied())
            .collect()
    }
}

/// Built-in backend that renders the module back to GLSL using
/// [`glslx_ir::dump_module`].
#[derive(Debug)]
pub struct GlslBackend;

impl Backend for GlslBackend {
    fn name(&self) -> &str {
        "GLSL"
    }

    fn targets(&self) -> &[&str] {
        &["glsl"]
    }

    fn compile(
        &self,
        module: &Module,
        opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        let prepared = prepare(module, opts)?;
        Ok(BackendOutput {
            files: vec![OutputFile {
                name: "module.glsl".into(),
                content: OutputContent::Text(glslx_ir::dump_module(&prepared.module)),
            }],
            diagnostics: prepared.diagnostics,
        })
    }
}
