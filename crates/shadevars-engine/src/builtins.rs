//! Built-in uniforms owned by the rendering context.
//!
//! These exist for the lifetime of a `Registry`, are fed directly by the host (camera, clock,
//! mouse, viewport) and are never deleted, merged from a vars file or parked as permanent.

use crate::config::BuiltinTextures;
use crate::error::{EngineError, Result};
use crate::value::{UniformValue, Variant};
use crate::variable::{UniformKey, UniformVariable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Skybox,
    Model,
    Projection,
    View,
    Mvp,
    Time,
    Size,
    Mouse,
    NormalMap,
}

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Builtin::Skybox,
        Builtin::Model,
        Builtin::Projection,
        Builtin::View,
        Builtin::Mvp,
        Builtin::Time,
        Builtin::Size,
        Builtin::Mouse,
        Builtin::NormalMap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Skybox => "skybox",
            Builtin::Model => "model",
            Builtin::Projection => "projection",
            Builtin::View => "view",
            Builtin::Mvp => "mvp",
            Builtin::Time => "time",
            Builtin::Size => "size",
            Builtin::Mouse => "mouse",
            Builtin::NormalMap => "normalMap",
        }
    }

    pub fn variant(self) -> Variant {
        match self {
            Builtin::Skybox => Variant::TextureCube,
            Builtin::Model | Builtin::Projection | Builtin::View | Builtin::Mvp => Variant::Mat4,
            Builtin::Time => Variant::Time,
            Builtin::Size => Variant::Vec2,
            Builtin::Mouse => Variant::Vec3,
            Builtin::NormalMap => Variant::Texture2D,
        }
    }

    pub fn key(self) -> UniformKey {
        UniformKey::new(self.name(), self.variant())
    }

    /// The built-in a key refers to, either by its own identity or by the binding a shader
    /// would report for it (`time` is declared as a plain `float`).
    pub fn for_key(key: &UniformKey) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| {
            key.name == b.name()
                && (key.variant == b.variant() || key.variant == b.variant().binding_variant())
        })
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Matrix built-ins the camera feeds every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMatrix {
    Model,
    View,
    Projection,
    Mvp,
}

impl From<BuiltinMatrix> for Builtin {
    fn from(m: BuiltinMatrix) -> Self {
        match m {
            BuiltinMatrix::Model => Builtin::Model,
            BuiltinMatrix::View => Builtin::View,
            BuiltinMatrix::Projection => Builtin::Projection,
            BuiltinMatrix::Mvp => Builtin::Mvp,
        }
    }
}

/// Storage for every `Builtin`, initialised once per rendering context.
#[derive(Debug, Clone)]
pub struct StaticSet {
    vars: Vec<UniformVariable>,
}

impl StaticSet {
    pub fn new(textures: &BuiltinTextures) -> Self {
        let vars = Builtin::ALL
            .into_iter()
            .map(|b| {
                let value = match b {
                    Builtin::Skybox => UniformValue::texture_cube(textures.skybox.clone()),
                    Builtin::NormalMap => UniformValue::texture_2d(textures.normal_map.clone()),
                    other => other.variant().default_value(),
                };
                UniformVariable::new(b.name(), value)
            })
            .collect();
        Self { vars }
    }

    pub fn get(&self, b: Builtin) -> &UniformVariable {
        &self.vars[b.index()]
    }

    pub(crate) fn get_mut(&mut self, b: Builtin) -> &mut UniformVariable {
        &mut self.vars[b.index()]
    }

    /// Overwrite a built-in's payload in place.
    pub fn set(&mut self, b: Builtin, value: &UniformValue) -> Result<()> {
        let var = self.get_mut(b);
        if var.variant() != value.variant() {
            return Err(EngineError::VariantMismatch {
                name: b.name().to_string(),
                expected: var.variant(),
                got: value.variant(),
            });
        }
        var.set_value(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Builtin, &UniformVariable)> {
        Builtin::ALL.into_iter().zip(self.vars.iter())
    }
}

impl Default for StaticSet {
    fn default() -> Self {
        Self::new(&BuiltinTextures::default())
    }
}
