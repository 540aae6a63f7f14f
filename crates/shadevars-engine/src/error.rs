use std::path::PathBuf;

use thiserror::Error;

use crate::value::Variant;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The `assets/` folder could not be found or was invalid.
    #[error("could not locate assets/ starting from {}", .start_dir.display())]
    AssetsNotFound { start_dir: PathBuf },

    /// I/O error reading or writing a file.
    #[error("I/O error for {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    /// JSON parse error for a file.
    #[error("JSON parse error for {}: {source}", .path.display())]
    Json { path: PathBuf, source: serde_json::Error },

    /// Config is syntactically valid but semantically invalid.
    #[error("invalid config {}: {msg}", .path.display())]
    InvalidConfig { path: PathBuf, msg: String },

    /// A uniform payload or vars-file record could not be parsed.
    #[error("{}", fmt_parse(.line, .msg))]
    Parse { line: Option<usize>, msg: String },

    /// The GL driver reported a uniform type the value model has no variant for.
    #[error("unsupported GL uniform type 0x{0:04X}")]
    UnsupportedGlType(u32),

    /// A texture image could not be read or decoded.
    #[error("failed to load resource {}: {msg}", .path.display())]
    ResourceLoad { path: PathBuf, msg: String },

    /// A value was written into a binding of a different variant.
    #[error("uniform '{name}' is {expected:?}, got {got:?}")]
    VariantMismatch {
        name: String,
        expected: Variant,
        got: Variant,
    },

    /// Compiler/linker output, passed through untouched. `stage` says which step produced it.
    #[error("{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// A GL object could not be created.
    #[error("GL error: {0}")]
    Gl(String),
}

fn fmt_parse(line: &Option<usize>, msg: &str) -> String {
    match line {
        Some(n) => format!("parse error on line {n}: {msg}"),
        None => format!("parse error: {msg}"),
    }
}

impl EngineError {
    /// Payload-level parse failure (no line context yet).
    pub fn parse(msg: impl Into<String>) -> Self {
        EngineError::Parse {
            line: None,
            msg: msg.into(),
        }
    }

    /// Attach a 1-based line number to a parse error; other errors pass through.
    pub fn at_line(self, n: usize) -> Self {
        match self {
            EngineError::Parse { msg, .. } => EngineError::Parse { line: Some(n), msg },
            other => other,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, EngineError::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex shader compile",
            ShaderStage::Fragment => "fragment shader compile",
            ShaderStage::Link => "program link",
        })
    }
}
