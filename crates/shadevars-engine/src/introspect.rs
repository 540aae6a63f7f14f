//! Active-uniform discovery for a compiled program.

use crate::error::Result;
use crate::gl_types::map_gl_type;
use crate::value::Variant;
use crate::variable::UniformKey;

/// Names with this prefix belong to GLSL itself and are never exposed.
pub const RESERVED_PREFIX: &str = "gl_";

/// One entry as the driver reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUniform {
    pub name: String,
    pub gl_type: u32,
    pub size: i32,
}

/// A linked program that can enumerate its active uniforms, in driver order.
pub trait ActiveUniformSource {
    fn active_uniforms(&self) -> Vec<RawUniform>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUniform {
    pub name: String,
    pub variant: Variant,
    pub array_size: u32,
}

impl DiscoveredUniform {
    pub fn key(&self) -> UniformKey {
        UniformKey::new(self.name.clone(), self.variant)
    }
}

/// List the program's uniforms in driver enumeration order, minus reserved names.
///
/// Fails on the first type the value model cannot represent.
pub fn introspect(src: &dyn ActiveUniformSource) -> Result<Vec<DiscoveredUniform>> {
    let mut out = Vec::new();
    for raw in src.active_uniforms() {
        if raw.name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        let variant = map_gl_type(raw.gl_type)?;
        out.push(DiscoveredUniform {
            name: raw.name,
            variant,
            array_size: u32::try_from(raw.size).unwrap_or(0).max(1),
        });
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::EngineError;

    /// Fixed list standing in for a linked program.
    #[derive(Debug, Clone, Default)]
    pub struct FakeProgram(pub Vec<RawUniform>);

    impl FakeProgram {
        pub fn with(mut self, name: &str, gl_type: u32, size: i32) -> Self {
            self.0.push(RawUniform {
                name: name.into(),
                gl_type,
                size,
            });
            self
        }
    }

    impl ActiveUniformSource for FakeProgram {
        fn active_uniforms(&self) -> Vec<RawUniform> {
            self.0.clone()
        }
    }

    #[test]
    fn keeps_driver_order_and_skips_reserved() {
        let prog = FakeProgram::default()
            .with("zeta", glow::FLOAT, 1)
            .with("gl_ModelViewMatrix", glow::FLOAT_MAT4, 1)
            .with("alpha", glow::FLOAT_VEC3, 1)
            .with("weights[0]", glow::FLOAT, 4);
        let found = introspect(&prog).unwrap();
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "weights[0]"]);
        assert_eq!(found[1].variant, Variant::Vec3);
        assert_eq!(found[2].array_size, 4);
    }

    #[test]
    fn is_idempotent() {
        let prog = FakeProgram::default()
            .with("b", glow::SAMPLER_2D, 1)
            .with("a", glow::SAMPLER_CUBE, 1);
        assert_eq!(introspect(&prog).unwrap(), introspect(&prog).unwrap());
    }

    #[test]
    fn reserved_names_are_skipped_before_type_mapping() {
        let prog = FakeProgram::default().with("gl_Odd", glow::FLOAT_VEC4, 1);
        assert!(introspect(&prog).unwrap().is_empty());
    }

    #[test]
    fn unsupported_type_aborts() {
        let prog = FakeProgram::default()
            .with("ok", glow::FLOAT, 1)
            .with("tint", glow::FLOAT_VEC4, 1);
        assert!(matches!(
            introspect(&prog),
            Err(EngineError::UnsupportedGlType(glow::FLOAT_VEC4))
        ));
    }
}
