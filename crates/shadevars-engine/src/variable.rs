use std::fmt;

use crate::error::{EngineError, Result};
use crate::value::{UniformValue, Variant};

/// Identity of a binding point. A name reused with a different type is a different binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformKey {
    pub name: String,
    pub variant: Variant,
}

impl UniformKey {
    pub fn new(name: impl Into<String>, variant: Variant) -> Self {
        Self {
            name: name.into(),
            variant,
        }
    }
}

impl fmt::Display for UniformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant.tag() {
            Some(tag) => write!(f, "{}:{}", self.name, tag),
            None => write!(f, "{}:time", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformVariable {
    name: String,
    value: UniformValue,
    /// Keep this value in the vars file even when the active shader stops using it.
    pub permanent: bool,
    /// 1 for non-array uniforms.
    pub array_size: u32,
}

impl UniformVariable {
    pub fn new(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            value,
            permanent: false,
            array_size: 1,
        }
    }

    pub fn with_default(name: impl Into<String>, variant: Variant) -> Self {
        Self::new(name, variant.default_value())
    }

    pub fn permanent(mut self, yes: bool) -> Self {
        self.permanent = yes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> Variant {
        self.value.variant()
    }

    pub fn key(&self) -> UniformKey {
        UniformKey::new(self.name.clone(), self.variant())
    }

    pub fn value(&self) -> &UniformValue {
        &self.value
    }

    /// Mutable access for uploads, which only touch GPU-side texture state.
    pub(crate) fn value_mut(&mut self) -> &mut UniformValue {
        &mut self.value
    }

    /// Replace the payload in place; the variant must match.
    pub fn set_value(&mut self, v: &UniformValue) -> Result<()> {
        self.value.assign(v).map_err(|e| match e {
            EngineError::VariantMismatch { expected, got, .. } => EngineError::VariantMismatch {
                name: self.name.clone(),
                expected,
                got,
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_variant() {
        let a = UniformVariable::with_default("color", Variant::Vec3);
        let b = UniformVariable::with_default("color", Variant::Vec2);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "color:float3");
    }

    #[test]
    fn set_value_names_the_variable_on_mismatch() {
        let mut v = UniformVariable::with_default("gain", Variant::Scalar);
        let err = v.set_value(&UniformValue::Vec2([1.0, 2.0])).unwrap_err();
        assert_eq!(err.to_string(), "uniform 'gain' is Scalar, got Vec2");
    }
}
