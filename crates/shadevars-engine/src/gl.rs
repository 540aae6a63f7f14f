//! glow implementation of the upload and introspection seams.

use std::collections::HashMap;
use std::path::Path;

use glow::HasContext;

use crate::assets::AssetsRoot;
use crate::error::{EngineError, Result, ShaderStage};
use crate::introspect::{ActiveUniformSource, RawUniform};
use crate::logi;
use crate::target::{SamplerKind, UniformTarget};
use crate::value::{TextureHandle, CUBE_FACES};

/// GL targets for cube faces, in the order faces are stored: top, bottom, left, right, front,
/// back.
pub const CUBE_FACE_TARGETS: [u32; CUBE_FACES] = [
    glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
    glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
    glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
    glow::TEXTURE_CUBE_MAP_POSITIVE_X,
    glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
    glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TextureSource {
    Flat(String),
    Cube([String; CUBE_FACES]),
}

/// Owns every texture created for sampler uniforms, keyed by source path(s).
///
/// Textures are shared between uniforms that point at the same file(s) and live until
/// `delete_textures`.
pub struct GlBackend {
    assets: AssetsRoot,
    textures: HashMap<TextureSource, glow::NativeTexture>,
}

impl GlBackend {
    pub fn new(assets: AssetsRoot) -> Self {
        Self {
            assets,
            textures: HashMap::new(),
        }
    }

    /// Upload target for `program`, which must be current (`use_program`) while pushing.
    pub fn bind<'a>(
        &'a mut self,
        gl: &'a glow::Context,
        program: glow::NativeProgram,
    ) -> BoundProgram<'a> {
        BoundProgram {
            gl,
            program,
            backend: self,
        }
    }

    pub fn delete_textures(&mut self, gl: &glow::Context) {
        let n = self.textures.len();
        for (_, tex) in self.textures.drain() {
            unsafe { gl.delete_texture(tex) };
        }
        if n > 0 {
            logi!("GL", "deleted {n} textures");
        }
    }

    fn load(&mut self, gl: &glow::Context, src: TextureSource) -> Result<TextureHandle> {
        if let Some(tex) = self.textures.get(&src) {
            return Ok(TextureHandle(tex.0));
        }
        let tex = match &src {
            TextureSource::Flat(path) => upload_2d(gl, &self.assets.resolve(path))?,
            TextureSource::Cube(faces) => {
                let paths = faces.clone().map(|f| self.assets.resolve(f));
                upload_cube(gl, &paths)?
            }
        };
        self.textures.insert(src, tex);
        Ok(TextureHandle(tex.0))
    }
}

fn decode_rgba(path: &Path) -> Result<image::RgbaImage> {
    let img = image::open(path).map_err(|e| EngineError::ResourceLoad {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })?;
    Ok(img.to_rgba8())
}

fn dims(path: &Path, img: &image::RgbaImage) -> Result<(i32, i32)> {
    let too_big = || EngineError::ResourceLoad {
        path: path.to_path_buf(),
        msg: format!("image too large: {}x{}", img.width(), img.height()),
    };
    let w = i32::try_from(img.width()).map_err(|_| too_big())?;
    let h = i32::try_from(img.height()).map_err(|_| too_big())?;
    Ok((w, h))
}

fn create_texture(gl: &glow::Context) -> Result<glow::NativeTexture> {
    unsafe { gl.create_texture() }.map_err(|e| EngineError::Gl(format!("create_texture: {e}")))
}

fn upload_2d(gl: &glow::Context, path: &Path) -> Result<glow::NativeTexture> {
    // GL's origin is bottom-left.
    let img = image::imageops::flip_vertical(&decode_rgba(path)?);
    let (w, h) = dims(path, &img)?;
    let tex = create_texture(gl)?;
    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, Some(tex));
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR_MIPMAP_LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA as i32,
            w,
            h,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(Some(img.as_raw().as_slice())),
        );
        gl.generate_mipmap(glow::TEXTURE_2D);
        gl.bind_texture(glow::TEXTURE_2D, None);
    }
    logi!("GL", "texture {} ({w}x{h})", path.display());
    Ok(tex)
}

fn upload_cube(gl: &glow::Context, faces: &[std::path::PathBuf; CUBE_FACES]) -> Result<glow::NativeTexture> {
    // Decode everything first so a bad face doesn't leave a half-built texture.
    let mut images = Vec::with_capacity(CUBE_FACES);
    for path in faces {
        let img = decode_rgba(path)?;
        let wh = dims(path, &img)?;
        images.push((img, wh));
    }

    let tex = create_texture(gl)?;
    unsafe {
        gl.bind_texture(glow::TEXTURE_CUBE_MAP, Some(tex));
        for (target, (img, (w, h))) in CUBE_FACE_TARGETS.iter().zip(&images) {
            gl.tex_image_2d(
                *target,
                0,
                glow::RGBA as i32,
                *w,
                *h,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(img.as_raw().as_slice())),
            );
        }
        gl.tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_WRAP_R, glow::CLAMP_TO_EDGE as i32);
        gl.bind_texture(glow::TEXTURE_CUBE_MAP, None);
    }
    logi!("GL", "cube map {}", faces[0].display());
    Ok(tex)
}

/// A program plus the backend's texture cache, ready to receive uniform values.
pub struct BoundProgram<'a> {
    gl: &'a glow::Context,
    program: glow::NativeProgram,
    backend: &'a mut GlBackend,
}

impl BoundProgram<'_> {
    fn location(&self, name: &str) -> Option<glow::NativeUniformLocation> {
        unsafe { self.gl.get_uniform_location(self.program, name) }
    }
}

impl UniformTarget for BoundProgram<'_> {
    fn set_scalar(&mut self, name: &str, v: f32) {
        if let Some(loc) = self.location(name) {
            unsafe { self.gl.uniform_1_f32(Some(&loc), v) };
        }
    }

    fn set_vec2(&mut self, name: &str, v: [f32; 2]) {
        if let Some(loc) = self.location(name) {
            unsafe { self.gl.uniform_2_f32(Some(&loc), v[0], v[1]) };
        }
    }

    fn set_vec3(&mut self, name: &str, v: [f32; 3]) {
        if let Some(loc) = self.location(name) {
            unsafe { self.gl.uniform_3_f32(Some(&loc), v[0], v[1], v[2]) };
        }
    }

    fn set_mat4(&mut self, name: &str, cols: &[f32; 16]) {
        if let Some(loc) = self.location(name) {
            unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&loc), false, cols) };
        }
    }

    fn load_texture_2d(&mut self, path: &str) -> Result<TextureHandle> {
        self.backend
            .load(self.gl, TextureSource::Flat(path.to_string()))
    }

    fn load_texture_cube(&mut self, faces: &[String; CUBE_FACES]) -> Result<TextureHandle> {
        self.backend.load(self.gl, TextureSource::Cube(faces.clone()))
    }

    fn bind_sampler(&mut self, name: &str, kind: SamplerKind, unit: u32, tex: TextureHandle) {
        let target = match kind {
            SamplerKind::Texture2D => glow::TEXTURE_2D,
            SamplerKind::Cube => glow::TEXTURE_CUBE_MAP,
        };
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target, Some(glow::NativeTexture(tex.0)));
        }
        if let Some(loc) = self.location(name) {
            unsafe { self.gl.uniform_1_i32(Some(&loc), unit as i32) };
        }
    }
}

/// Introspection view of a linked program.
pub struct GlProgram<'a> {
    pub gl: &'a glow::Context,
    pub program: glow::NativeProgram,
}

impl ActiveUniformSource for GlProgram<'_> {
    fn active_uniforms(&self) -> Vec<RawUniform> {
        unsafe {
            let n = self.gl.get_active_uniforms(self.program);
            (0..n)
                .filter_map(|i| self.gl.get_active_uniform(self.program, i))
                .map(|u| RawUniform {
                    name: u.name,
                    gl_type: u.utype,
                    size: u.size,
                })
                .collect()
        }
    }
}

/// Compile and link a vertex/fragment pair. Compiler and linker logs end up in the error.
pub fn compile_program(gl: &glow::Context, vert_src: &str, frag_src: &str) -> Result<glow::NativeProgram> {
    unsafe {
        let vs = gl
            .create_shader(glow::VERTEX_SHADER)
            .map_err(|e| EngineError::Gl(format!("create vertex shader: {e}")))?;
        gl.shader_source(vs, vert_src);
        gl.compile_shader(vs);
        if !gl.get_shader_compile_status(vs) {
            let log = gl.get_shader_info_log(vs);
            gl.delete_shader(vs);
            return Err(EngineError::ShaderCompile {
                stage: ShaderStage::Vertex,
                log,
            });
        }

        let fs = match gl.create_shader(glow::FRAGMENT_SHADER) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(EngineError::Gl(format!("create fragment shader: {e}")));
            }
        };
        gl.shader_source(fs, frag_src);
        gl.compile_shader(fs);
        if !gl.get_shader_compile_status(fs) {
            let log = gl.get_shader_info_log(fs);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(EngineError::ShaderCompile {
                stage: ShaderStage::Fragment,
                log,
            });
        }

        let program = match gl.create_program() {
            Ok(p) => p,
            Err(e) => {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(EngineError::Gl(format!("create program: {e}")));
            }
        };
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        let linked = gl.get_program_link_status(program);
        let log = if linked { String::new() } else { gl.get_program_info_log(program) };
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !linked {
            gl.delete_program(program);
            return Err(EngineError::ShaderCompile {
                stage: ShaderStage::Link,
                log,
            });
        }
        Ok(program)
    }
}
