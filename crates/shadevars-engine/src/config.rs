use std::path::{Path, PathBuf};

use crate::assets::{read_to_string_result, AssetsRoot};
use crate::error::EngineError;
use crate::value::CUBE_FACES;

/// How strictly to interpret/validate config files.
///
/// - `Lenient` is forward-compatible: unknown fields are ignored and missing optional
///   keys fall back to defaults.
/// - `Strict` is fail-fast: unknown fields and unsupported versions become errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Lenient,
    Strict,
}

/// Typed view of `assets/viewer.json`.
///
/// Versioning: `version` defaults to 1 when omitted.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ViewerJson {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub vert: Option<String>,

    #[serde(default)]
    pub frag: Option<String>,

    /// Where `save`/`load` hotkeys read and write uniform values.
    #[serde(default)]
    pub vars_file: Option<String>,

    /// Skybox faces: top, bottom, left, right, front, back.
    #[serde(default)]
    pub skybox: Option<Vec<String>>,

    #[serde(default)]
    pub normal_map: Option<String>,

    /// First texture unit handed to sampler uniforms; lower units belong to the host.
    #[serde(default)]
    pub first_texture_unit: Option<u32>,

    /// Load `vars_file` once the first program is installed.
    #[serde(default)]
    pub autoload_vars: Option<bool>,
}

/// Strict version of `ViewerJson` that fails on unknown fields.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ViewerJsonStrict {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub vert: Option<String>,
    #[serde(default)]
    pub frag: Option<String>,
    #[serde(default)]
    pub vars_file: Option<String>,
    #[serde(default)]
    pub skybox: Option<Vec<String>>,
    #[serde(default)]
    pub normal_map: Option<String>,
    #[serde(default)]
    pub first_texture_unit: Option<u32>,
    #[serde(default)]
    pub autoload_vars: Option<bool>,
}

impl From<ViewerJsonStrict> for ViewerJson {
    fn from(s: ViewerJsonStrict) -> Self {
        ViewerJson {
            version: s.version,
            vert: s.vert,
            frag: s.frag,
            vars_file: s.vars_file,
            skybox: s.skybox,
            normal_map: s.normal_map,
            first_texture_unit: s.first_texture_unit,
            autoload_vars: s.autoload_vars,
        }
    }
}

fn default_version() -> u32 {
    1
}

pub const DEFAULT_FIRST_TEXTURE_UNIT: u32 = 2;

/// Default skybox, relative to the assets dir.
pub const DEFAULT_SKYBOX: [&str; CUBE_FACES] = [
    "skybox/posy.jpg",
    "skybox/negy.jpg",
    "skybox/negx.jpg",
    "skybox/posx.jpg",
    "skybox/posz.jpg",
    "skybox/negz.jpg",
];

pub const DEFAULT_NORMAL_MAP: &str = "images/brickwall_normal.jpg";

/// Resolved viewer settings, all paths absolute against the assets dir.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Where this config came from (may not exist when defaults were used).
    pub path: PathBuf,
    pub vert_path: PathBuf,
    pub frag_path: PathBuf,
    pub vars_path: PathBuf,
    pub skybox: [String; CUBE_FACES],
    pub normal_map: String,
    pub first_texture_unit: u32,
    pub autoload_vars: bool,
}

/// Paths handed to the built-in texture uniforms.
///
/// These stay relative (as written in config): the GL backend resolves them against the
/// assets dir when the texture is first bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinTextures {
    pub skybox: [String; CUBE_FACES],
    pub normal_map: String,
}

impl Default for BuiltinTextures {
    fn default() -> Self {
        Self {
            skybox: DEFAULT_SKYBOX.map(String::from),
            normal_map: DEFAULT_NORMAL_MAP.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn builtin_textures(&self) -> BuiltinTextures {
        BuiltinTextures {
            skybox: self.skybox.clone(),
            normal_map: self.normal_map.clone(),
        }
    }
}

/// Load `assets/viewer(.<os>).json`. A missing file yields defaults.
pub fn load_viewer_config(assets: &AssetsRoot) -> Result<ViewerConfig, EngineError> {
    load_viewer_config_with_mode(assets, ConfigMode::Lenient)
}

pub fn load_viewer_config_with_mode(
    assets: &AssetsRoot,
    mode: ConfigMode,
) -> Result<ViewerConfig, EngineError> {
    let path = assets.pick_platform_json("viewer");
    let vj = if path.exists() {
        let data = read_to_string_result(&path)?;
        parse_viewer_json(&path, &data, mode)?
    } else {
        parse_viewer_json(&path, "{}", mode)?
    };
    resolve_viewer_config(assets, path, vj)
}

/// Parse viewer JSON text in the requested mode.
pub fn parse_viewer_json(path: &Path, data: &str, mode: ConfigMode) -> Result<ViewerJson, EngineError> {
    let json_err = |e| EngineError::Json {
        path: path.to_path_buf(),
        source: e,
    };
    let vj: ViewerJson = match mode {
        ConfigMode::Lenient => serde_json::from_str(data).map_err(json_err)?,
        ConfigMode::Strict => serde_json::from_str::<ViewerJsonStrict>(data)
            .map_err(json_err)?
            .into(),
    };

    if mode == ConfigMode::Strict && vj.version != 1 {
        return Err(EngineError::InvalidConfig {
            path: path.to_path_buf(),
            msg: format!("unsupported viewer.json version {} (expected 1)", vj.version),
        });
    }
    Ok(vj)
}

fn resolve_viewer_config(
    assets: &AssetsRoot,
    path: PathBuf,
    vj: ViewerJson,
) -> Result<ViewerConfig, EngineError> {
    let skybox = match vj.skybox {
        None => DEFAULT_SKYBOX.map(String::from),
        Some(list) => {
            let n = list.len();
            <[String; CUBE_FACES]>::try_from(list).map_err(|_| EngineError::InvalidConfig {
                path: path.clone(),
                msg: format!("skybox needs {CUBE_FACES} face paths, got {n}"),
            })?
        }
    };

    Ok(ViewerConfig {
        vert_path: assets.resolve(vj.vert.as_deref().unwrap_or("shaders/default.vert")),
        frag_path: assets.resolve(vj.frag.as_deref().unwrap_or("shaders/default.frag")),
        vars_path: assets.resolve(vj.vars_file.as_deref().unwrap_or("default.vars")),
        skybox,
        normal_map: vj.normal_map.unwrap_or_else(|| DEFAULT_NORMAL_MAP.to_string()),
        first_texture_unit: vj.first_texture_unit.unwrap_or(DEFAULT_FIRST_TEXTURE_UNIT),
        autoload_vars: vj.autoload_vars.unwrap_or(true),
        path,
    })
}
