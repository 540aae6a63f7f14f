//! Typed uniform values.
//!
//! `UniformValue` is a closed set of variants. Every variant except `Time` has a text form
//! (used by the vars file and by editors) and every variant knows how to upload itself through a
//! [`UniformTarget`].
//!
//! Invariant: a value never changes variant. Writes go through [`UniformValue::assign`], which
//! rejects a payload of a different variant.

use std::num::NonZeroU32;

use crate::error::{EngineError, Result};
use crate::logw;
use crate::target::{SamplerKind, TextureUnits, UniformTarget};

/// Number of faces in a cube map, in the order top, bottom, left, right, front, back.
pub const CUBE_FACES: usize = 6;

pub const IDENTITY4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// The kind of a uniform value, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Scalar,
    Vec2,
    Vec3,
    Mat4,
    Time,
    Texture2D,
    TextureCube,
}

impl Variant {
    pub const ALL: [Variant; 7] = [
        Variant::Scalar,
        Variant::Vec2,
        Variant::Vec3,
        Variant::Mat4,
        Variant::Time,
        Variant::Texture2D,
        Variant::TextureCube,
    ];

    /// Tag used in the vars file. `Time` has no text form.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Variant::Scalar => Some("float"),
            Variant::Vec2 => Some("float2"),
            Variant::Vec3 => Some("float3"),
            Variant::Mat4 => Some("mat4"),
            Variant::Time => None,
            Variant::Texture2D => Some("tex2d"),
            Variant::TextureCube => Some("texcube"),
        }
    }

    pub fn from_tag(tag: &str) -> Result<Variant> {
        Variant::ALL
            .into_iter()
            .find(|v| v.tag() == Some(tag))
            .ok_or_else(|| EngineError::parse(format!("unknown uniform type tag '{tag}'")))
    }

    /// Whether values of this variant can be written to and read from text.
    pub fn is_serializable(self) -> bool {
        self.tag().is_some()
    }

    /// Fresh value for a newly discovered uniform.
    pub fn default_value(self) -> UniformValue {
        match self {
            Variant::Scalar => UniformValue::Scalar(0.0),
            Variant::Vec2 => UniformValue::Vec2([0.0; 2]),
            Variant::Vec3 => UniformValue::Vec3([0.0; 3]),
            Variant::Mat4 => UniformValue::Mat4(IDENTITY4),
            Variant::Time => UniformValue::Time(0.0),
            Variant::Texture2D => UniformValue::Texture2D {
                path: String::new(),
                state: TextureState::default(),
            },
            Variant::TextureCube => UniformValue::TextureCube {
                faces: Default::default(),
                state: TextureState::default(),
            },
        }
    }
}

/// Opaque GPU texture name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub NonZeroU32);

/// Whether a texture value has been resolved to a GPU texture yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureState {
    /// Not attempted yet; loading happens on the next upload.
    #[default]
    Pending,
    Bound(TextureHandle),
    /// Image missing or unreadable. Stays unbound until the path changes.
    Missing,
}

#[derive(Debug, Clone)]
pub enum UniformValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    /// Row-major, as typed by the caller.
    Mat4([f32; 16]),
    /// Seconds since the owning registry's clock was last reset.
    Time(f32),
    Texture2D {
        path: String,
        state: TextureState,
    },
    TextureCube {
        faces: [String; CUBE_FACES],
        state: TextureState,
    },
}

// GPU state is not part of a value's identity.
impl PartialEq for UniformValue {
    fn eq(&self, other: &Self) -> bool {
        use UniformValue::*;
        match (self, other) {
            (Scalar(a), Scalar(b)) => a == b,
            (Vec2(a), Vec2(b)) => a == b,
            (Vec3(a), Vec3(b)) => a == b,
            (Mat4(a), Mat4(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Texture2D { path: a, .. }, Texture2D { path: b, .. }) => a == b,
            (TextureCube { faces: a, .. }, TextureCube { faces: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl UniformValue {
    pub fn variant(&self) -> Variant {
        match self {
            UniformValue::Scalar(_) => Variant::Scalar,
            UniformValue::Vec2(_) => Variant::Vec2,
            UniformValue::Vec3(_) => Variant::Vec3,
            UniformValue::Mat4(_) => Variant::Mat4,
            UniformValue::Time(_) => Variant::Time,
            UniformValue::Texture2D { .. } => Variant::Texture2D,
            UniformValue::TextureCube { .. } => Variant::TextureCube,
        }
    }

    pub fn texture_2d(path: impl Into<String>) -> Self {
        UniformValue::Texture2D {
            path: path.into(),
            state: TextureState::Pending,
        }
    }

    pub fn texture_cube(faces: [String; CUBE_FACES]) -> Self {
        UniformValue::TextureCube {
            faces,
            state: TextureState::Pending,
        }
    }

    /// Parse the text form of a `variant` payload.
    pub fn parse(variant: Variant, text: &str) -> Result<Self> {
        match variant {
            Variant::Scalar => {
                let [x] = parse_floats::<1>(text)?;
                Ok(UniformValue::Scalar(x))
            }
            Variant::Vec2 => Ok(UniformValue::Vec2(parse_floats(text)?)),
            Variant::Vec3 => Ok(UniformValue::Vec3(parse_floats(text)?)),
            Variant::Mat4 => Ok(UniformValue::Mat4(parse_floats(text)?)),
            Variant::Time => Err(EngineError::parse("time uniforms have no text form")),
            Variant::Texture2D => {
                check_path(text, false)?;
                Ok(UniformValue::texture_2d(text))
            }
            Variant::TextureCube => {
                let parts: Vec<&str> = text.split(',').collect();
                if parts.len() != CUBE_FACES {
                    return Err(EngineError::parse(format!(
                        "cube map needs {CUBE_FACES} comma-separated paths, got {}",
                        parts.len()
                    )));
                }
                check_path(text, false)?;
                let faces: [String; CUBE_FACES] = std::array::from_fn(|i| parts[i].to_string());
                Ok(UniformValue::texture_cube(faces))
            }
        }
    }

    /// Text form of the payload. Fails for `Time` and for paths the text form cannot carry.
    pub fn format(&self) -> Result<String> {
        match self {
            UniformValue::Scalar(x) => Ok(join_floats(std::slice::from_ref(x))),
            UniformValue::Vec2(v) => Ok(join_floats(v)),
            UniformValue::Vec3(v) => Ok(join_floats(v)),
            UniformValue::Mat4(m) => Ok(join_floats(m)),
            UniformValue::Time(_) => Err(EngineError::parse("time uniforms have no text form")),
            UniformValue::Texture2D { path, .. } => {
                check_path(path, false)?;
                Ok(path.clone())
            }
            UniformValue::TextureCube { faces, .. } => {
                for f in faces {
                    check_path(f, true)?;
                }
                Ok(faces.join(","))
            }
        }
    }

    /// Overwrite this payload with `other`'s. The variant must match.
    ///
    /// Texture state is kept when the path is unchanged so an already bound texture is not
    /// reloaded; a new path goes back to `Pending`.
    pub fn assign(&mut self, other: &UniformValue) -> Result<()> {
        use UniformValue::*;
        match (self, other) {
            (Scalar(a), Scalar(b)) => *a = *b,
            (Vec2(a), Vec2(b)) => *a = *b,
            (Vec3(a), Vec3(b)) => *a = *b,
            (Mat4(a), Mat4(b)) => *a = *b,
            (Time(a), Time(b)) => *a = *b,
            (Texture2D { path, state }, Texture2D { path: p, .. }) => {
                if path != p {
                    path.clone_from(p);
                    *state = TextureState::Pending;
                }
            }
            (TextureCube { faces, state }, TextureCube { faces: f, .. }) => {
                if faces != f {
                    faces.clone_from(f);
                    *state = TextureState::Pending;
                }
            }
            (me, _) => {
                return Err(EngineError::VariantMismatch {
                    name: String::new(),
                    expected: me.variant(),
                    got: other.variant(),
                })
            }
        }
        Ok(())
    }

    pub fn texture_state(&self) -> Option<TextureState> {
        match self {
            UniformValue::Texture2D { state, .. } | UniformValue::TextureCube { state, .. } => {
                Some(*state)
            }
            _ => None,
        }
    }

    /// Push this value to the bound program under `name`.
    ///
    /// Matrices are transposed here: storage is row-major, GL wants column-major. Textures are
    /// loaded lazily on first upload; a load failure is logged once and leaves the sampler
    /// unbound.
    pub fn upload(&mut self, name: &str, units: &mut TextureUnits, target: &mut dyn UniformTarget) {
        match self {
            UniformValue::Scalar(x) | UniformValue::Time(x) => target.set_scalar(name, *x),
            UniformValue::Vec2(v) => target.set_vec2(name, *v),
            UniformValue::Vec3(v) => target.set_vec3(name, *v),
            UniformValue::Mat4(m) => target.set_mat4(name, &transpose(m)),
            UniformValue::Texture2D { path, state } => {
                if *state == TextureState::Pending {
                    *state = if path.is_empty() {
                        TextureState::Missing
                    } else {
                        resolve(name, target.load_texture_2d(path))
                    };
                }
                if let TextureState::Bound(h) = *state {
                    target.bind_sampler(name, SamplerKind::Texture2D, units.take(), h);
                }
            }
            UniformValue::TextureCube { faces, state } => {
                if *state == TextureState::Pending {
                    *state = if faces.iter().all(|f| f.is_empty()) {
                        TextureState::Missing
                    } else {
                        resolve(name, target.load_texture_cube(faces))
                    };
                }
                if let TextureState::Bound(h) = *state {
                    target.bind_sampler(name, SamplerKind::Cube, units.take(), h);
                }
            }
        }
    }
}

fn resolve(name: &str, loaded: Result<TextureHandle>) -> TextureState {
    match loaded {
        Ok(h) => TextureState::Bound(h),
        Err(e) => {
            logw!("UNIFORM", "{name}: texture left unbound: {e}");
            TextureState::Missing
        }
    }
}

/// Row-major <-> column-major.
pub fn transpose(m: &[f32; 16]) -> [f32; 16] {
    std::array::from_fn(|i| m[(i % 4) * 4 + i / 4])
}

fn parse_floats<const N: usize>(text: &str) -> Result<[f32; N]> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != N {
        return Err(EngineError::parse(format!(
            "expected {N} comma-separated numbers, got {}",
            parts.len()
        )));
    }
    let mut out = [0.0f32; N];
    for (slot, p) in out.iter_mut().zip(parts) {
        *slot = p
            .trim()
            .parse::<f32>()
            .map_err(|e| EngineError::parse(format!("bad number '{}': {e}", p.trim())))?;
    }
    Ok(out)
}

// `{}` on f32 is the shortest text that parses back to the same bits.
fn join_floats(v: &[f32]) -> String {
    v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
}

fn check_path(p: &str, cube_face: bool) -> Result<()> {
    if p.contains(['\n', '\r']) {
        return Err(EngineError::parse("texture path contains a line break"));
    }
    if cube_face && p.contains(',') {
        return Err(EngineError::parse(format!("cube face path '{p}' contains a comma")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::tests::RecordingTarget;
    use proptest::prelude::*;

    fn any_value() -> impl Strategy<Value = UniformValue> {
        let f = -1.0e6f32..1.0e6f32;
        let path = "[a-zA-Z0-9_./: -]{0,24}";
        prop_oneof![
            f.clone().prop_map(UniformValue::Scalar),
            prop::array::uniform2(f.clone()).prop_map(UniformValue::Vec2),
            prop::array::uniform3(f.clone()).prop_map(UniformValue::Vec3),
            prop::array::uniform16(f).prop_map(UniformValue::Mat4),
            path.prop_map(UniformValue::texture_2d),
            prop::array::uniform6(path).prop_map(UniformValue::texture_cube),
        ]
    }

    proptest! {
        #[test]
        fn text_form_round_trips(v in any_value()) {
            let text = v.format().unwrap();
            let back = UniformValue::parse(v.variant(), &text).unwrap();
            prop_assert_eq!(back, v);
        }
    }

    #[test]
    fn tags_are_unique_and_time_has_none() {
        for v in Variant::ALL {
            match v.tag() {
                Some(t) => assert_eq!(Variant::from_tag(t).unwrap(), v),
                None => assert_eq!(v, Variant::Time),
            }
        }
        assert!(Variant::from_tag("float4").unwrap_err().is_parse());
    }

    #[test]
    fn time_has_no_text_form() {
        assert!(UniformValue::parse(Variant::Time, "1.5").is_err());
        assert!(UniformValue::Time(1.5).format().is_err());
    }

    #[test]
    fn vector_arity_is_fixed() {
        assert!(UniformValue::parse(Variant::Vec2, "1,2,3").is_err());
        assert!(UniformValue::parse(Variant::Vec3, "1,2").is_err());
        assert!(UniformValue::parse(Variant::Scalar, "").is_err());
        assert!(UniformValue::parse(Variant::Mat4, "1,0,0,0").is_err());
        assert_eq!(
            UniformValue::parse(Variant::Vec3, " 1, 2.5 ,-3").unwrap(),
            UniformValue::Vec3([1.0, 2.5, -3.0])
        );
    }

    #[test]
    fn cube_map_needs_exactly_six_paths() {
        assert!(UniformValue::parse(Variant::TextureCube, "a,b,c,d,e").is_err());
        assert!(UniformValue::parse(Variant::TextureCube, "a,b,c,d,e,f,g").is_err());
        let v = UniformValue::parse(Variant::TextureCube, "t,b,l,r,f,k").unwrap();
        assert_eq!(v.format().unwrap(), "t,b,l,r,f,k");
    }

    #[test]
    fn identity_uploads_unchanged() {
        let mut v = UniformValue::parse(Variant::Mat4, "1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1").unwrap();
        let mut t = RecordingTarget::default();
        v.upload("model", &mut TextureUnits::new(0), &mut t);
        assert_eq!(t.mat4s, vec![("model".to_string(), IDENTITY4)]);
    }

    #[test]
    fn matrix_is_transposed_on_upload() {
        let text = "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16";
        let mut v = UniformValue::parse(Variant::Mat4, text).unwrap();
        let mut t = RecordingTarget::default();
        v.upload("view", &mut TextureUnits::new(0), &mut t);

        let expected = [
            1.0, 5.0, 9.0, 13.0, 2.0, 6.0, 10.0, 14.0, 3.0, 7.0, 11.0, 15.0, 4.0, 8.0, 12.0, 16.0,
        ];
        assert_eq!(t.mat4s[0].1, expected);
        // storage and text form are untouched
        assert_eq!(v.format().unwrap(), text);
    }

    #[test]
    fn assign_keeps_variant() {
        let mut v = UniformValue::Vec2([0.0, 0.0]);
        v.assign(&UniformValue::Vec2([1.0, 2.0])).unwrap();
        assert_eq!(v, UniformValue::Vec2([1.0, 2.0]));
        assert!(v.assign(&UniformValue::Scalar(1.0)).is_err());
        assert_eq!(v.variant(), Variant::Vec2);
    }

    #[test]
    fn assign_resets_texture_only_when_path_changes() {
        let h = TextureHandle(NonZeroU32::new(7).unwrap());
        let mut v = UniformValue::Texture2D {
            path: "a.png".into(),
            state: TextureState::Bound(h),
        };
        v.assign(&UniformValue::texture_2d("a.png")).unwrap();
        assert_eq!(v.texture_state(), Some(TextureState::Bound(h)));
        v.assign(&UniformValue::texture_2d("b.png")).unwrap();
        assert_eq!(v.texture_state(), Some(TextureState::Pending));
    }

    #[test]
    fn missing_texture_is_not_fatal_and_not_retried() {
        let mut v = UniformValue::texture_2d("nope.png");
        let mut t = RecordingTarget {
            fail_textures: true,
            ..Default::default()
        };
        let mut units = TextureUnits::new(2);
        v.upload("albedo", &mut units, &mut t);
        v.upload("albedo", &mut units, &mut t);
        assert_eq!(v.texture_state(), Some(TextureState::Missing));
        assert_eq!(t.texture_loads, 1);
        assert!(t.samplers.is_empty());
    }

    #[test]
    fn empty_texture_path_is_skipped() {
        let mut v = Variant::TextureCube.default_value();
        let mut t = RecordingTarget::default();
        v.upload("sky", &mut TextureUnits::new(2), &mut t);
        assert_eq!(t.texture_loads, 0);
        assert_eq!(v.texture_state(), Some(TextureState::Missing));
    }
}
