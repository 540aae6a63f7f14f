//! Shader uniform reflection and persistence.
//!
//! A `Registry` discovers the uniforms a linked program exposes, keeps their values across
//! recompiles, pushes them every frame and saves/loads them as `.vars` text files.

pub mod logging;

pub mod assets;
pub mod builtins;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod gl;
pub mod gl_types;
pub mod introspect;
pub mod keyed;
pub mod registry;
pub mod target;
pub mod value;
pub mod variable;

pub use assets::AssetsRoot;
pub use builtins::{Builtin, BuiltinMatrix};
pub use config::{load_viewer_config, ConfigMode, ViewerConfig};
pub use error::{EngineError, Result, ShaderStage};
pub use events::RegistryEvent;
pub use gl::{compile_program, GlBackend, GlProgram};
pub use registry::{MergeReport, Registry, RemoveOutcome};
pub use value::{UniformValue, Variant};
pub use variable::{UniformKey, UniformVariable};
