//! GL uniform type enum <-> value variant.

use crate::error::{EngineError, Result};
use crate::value::Variant;

/// Every GL uniform type the value model accepts, with the variant it becomes.
pub const GL_TYPE_TABLE: [(u32, Variant); 6] = [
    (glow::FLOAT, Variant::Scalar),
    (glow::FLOAT_VEC2, Variant::Vec2),
    (glow::FLOAT_VEC3, Variant::Vec3),
    (glow::FLOAT_MAT4, Variant::Mat4),
    (glow::SAMPLER_2D, Variant::Texture2D),
    (glow::SAMPLER_CUBE, Variant::TextureCube),
];

/// Map a type reported by `glGetActiveUniform`.
///
/// An unknown type means the shader uses something this build cannot represent; callers treat
/// it as fatal for the program being installed.
pub fn map_gl_type(gl_type: u32) -> Result<Variant> {
    GL_TYPE_TABLE
        .iter()
        .find(|(t, _)| *t == gl_type)
        .map(|(_, v)| *v)
        .ok_or(EngineError::UnsupportedGlType(gl_type))
}

impl Variant {
    /// GL type this variant is uploaded as. `Time` goes up as a plain float.
    pub fn gl_type(self) -> u32 {
        match self {
            Variant::Scalar | Variant::Time => glow::FLOAT,
            Variant::Vec2 => glow::FLOAT_VEC2,
            Variant::Vec3 => glow::FLOAT_VEC3,
            Variant::Mat4 => glow::FLOAT_MAT4,
            Variant::Texture2D => glow::SAMPLER_2D,
            Variant::TextureCube => glow::SAMPLER_CUBE,
        }
    }

    /// The variant a shader would report for a binding of this variant.
    pub fn binding_variant(self) -> Variant {
        match self {
            Variant::Time => Variant::Scalar,
            v => v,
        }
    }
}
