//! Vars file codec.
//!
//! One uniform per line:
//!
//! ```text
//! <name> <tag> <permanent 0|1> <payload>
//! ```
//!
//! Fields are separated by a single space and the payload runs to the end of the line, so
//! texture paths may contain spaces. Blank lines are ignored. There is no header.
//!
//! Array sizes are not stored; they come from introspection.

use std::path::Path;

use crate::assets::read_to_string_result;
use crate::error::{EngineError, Result};
use crate::value::{UniformValue, Variant};
use crate::variable::UniformVariable;

/// Encode a single record, without a trailing newline.
pub fn encode_record(var: &UniformVariable) -> Result<String> {
    let name = var.name();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(EngineError::parse(format!("uniform name '{name}' cannot be stored")));
    }
    let tag = var
        .variant()
        .tag()
        .ok_or_else(|| EngineError::parse(format!("uniform '{name}' has no text form")))?;
    let payload = var.value().format()?;
    Ok(format!("{name} {tag} {} {payload}", u8::from(var.permanent)))
}

/// Encode every serializable variable, in iteration order. `Time` values are skipped.
pub fn encode<'a>(vars: impl IntoIterator<Item = &'a UniformVariable>) -> Result<String> {
    encode_counted(vars).map(|(text, _)| text)
}

fn encode_counted<'a>(vars: impl IntoIterator<Item = &'a UniformVariable>) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut n = 0;
    for v in vars {
        if !v.variant().is_serializable() {
            continue;
        }
        out.push_str(&encode_record(v)?);
        out.push('\n');
        n += 1;
    }
    Ok((out, n))
}

/// Decode a single non-blank record.
pub fn decode_record(line: &str) -> Result<UniformVariable> {
    let mut fields = line.splitn(4, ' ');
    let name = fields.next().unwrap_or_default();
    let tag = fields
        .next()
        .ok_or_else(|| EngineError::parse("missing type tag"))?;
    let perm = fields
        .next()
        .ok_or_else(|| EngineError::parse("missing permanent flag"))?;
    let payload = fields.next().unwrap_or_default();

    if name.is_empty() {
        return Err(EngineError::parse("missing uniform name"));
    }
    let variant = Variant::from_tag(tag)?;
    let permanent = match perm {
        "0" => false,
        "1" => true,
        other => {
            return Err(EngineError::parse(format!(
                "permanent flag must be 0 or 1, got '{other}'"
            )))
        }
    };
    let value = UniformValue::parse(variant, payload)?;
    Ok(UniformVariable::new(name, value).permanent(permanent))
}

/// Decode a whole file. Any bad record fails the whole decode.
pub fn decode(text: &str) -> Result<Vec<UniformVariable>> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| decode_record(l).map_err(|e| e.at_line(i + 1)))
        .collect()
}

pub fn read_vars_file(path: &Path) -> Result<Vec<UniformVariable>> {
    let text = read_to_string_result(path)?;
    decode(&text)
}

/// Encode first, then write through a sibling temp file so a failed save leaves the old file.
/// Returns the number of records written.
pub fn write_vars_file<'a>(
    path: &Path,
    vars: impl IntoIterator<Item = &'a UniformVariable>,
) -> Result<usize> {
    let (text, n) = encode_counted(vars)?;
    let tmp = path.with_extension("vars.tmp");
    let io = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, text).map_err(io)?;
    std::fs::rename(&tmp, path).map_err(io)?;
    Ok(n)
}
