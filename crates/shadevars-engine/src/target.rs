//! Upload seam between the registry and a bound GPU program.
//!
//! `GlBackend` implements this over glow; tests use an in-memory recorder.

use crate::error::Result;
use crate::value::{TextureHandle, CUBE_FACES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    Texture2D,
    Cube,
}

/// Sequential texture unit allocator, reset once per push.
#[derive(Debug, Clone)]
pub struct TextureUnits {
    next: u32,
}

impl TextureUnits {
    pub fn new(first: u32) -> Self {
        Self { next: first }
    }

    pub fn take(&mut self) -> u32 {
        let u = self.next;
        self.next += 1;
        u
    }
}

/// Something uniform values can be written into: a bound program plus a texture loader.
pub trait UniformTarget {
    fn set_scalar(&mut self, name: &str, v: f32);
    fn set_vec2(&mut self, name: &str, v: [f32; 2]);
    fn set_vec3(&mut self, name: &str, v: [f32; 3]);
    /// `cols` is column-major.
    fn set_mat4(&mut self, name: &str, cols: &[f32; 16]);

    fn load_texture_2d(&mut self, path: &str) -> Result<TextureHandle>;
    /// Faces are top, bottom, left, right, front, back.
    fn load_texture_cube(&mut self, faces: &[String; CUBE_FACES]) -> Result<TextureHandle>;

    fn bind_sampler(&mut self, name: &str, kind: SamplerKind, unit: u32, tex: TextureHandle);
}

#[cfg(test)]
pub(crate) mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::error::EngineError;

    /// Records every call; textures "load" unless `fail_textures` is set.
    #[derive(Debug, Default)]
    pub struct RecordingTarget {
        pub scalars: Vec<(String, f32)>,
        pub vec2s: Vec<(String, [f32; 2])>,
        pub vec3s: Vec<(String, [f32; 3])>,
        pub mat4s: Vec<(String, [f32; 16])>,
        pub samplers: Vec<(String, SamplerKind, u32)>,
        pub texture_loads: usize,
        pub fail_textures: bool,
    }

    impl RecordingTarget {
        fn next_texture(&mut self, what: &str) -> Result<TextureHandle> {
            self.texture_loads += 1;
            if self.fail_textures {
                return Err(EngineError::ResourceLoad {
                    path: what.into(),
                    msg: "not found".into(),
                });
            }
            let id = u32::try_from(self.texture_loads).unwrap_or(u32::MAX);
            Ok(TextureHandle(NonZeroU32::new(id).unwrap()))
        }
    }

    impl UniformTarget for RecordingTarget {
        fn set_scalar(&mut self, name: &str, v: f32) {
            self.scalars.push((name.into(), v));
        }
        fn set_vec2(&mut self, name: &str, v: [f32; 2]) {
            self.vec2s.push((name.into(), v));
        }
        fn set_vec3(&mut self, name: &str, v: [f32; 3]) {
            self.vec3s.push((name.into(), v));
        }
        fn set_mat4(&mut self, name: &str, cols: &[f32; 16]) {
            self.mat4s.push((name.into(), *cols));
        }
        fn load_texture_2d(&mut self, path: &str) -> Result<TextureHandle> {
            self.next_texture(path)
        }
        fn load_texture_cube(&mut self, faces: &[String; CUBE_FACES]) -> Result<TextureHandle> {
            self.next_texture(&faces[0])
        }
        fn bind_sampler(&mut self, name: &str, kind: SamplerKind, unit: u32, _tex: TextureHandle) {
            self.samplers.push((name.into(), kind, unit));
        }
    }

    #[test]
    fn units_are_handed_out_in_order() {
        let mut u = TextureUnits::new(2);
        assert_eq!((u.take(), u.take(), u.take()), (2, 3, 4));
    }
}
