//! Config validation (friendly errors)
//!
//! Purpose:
//! - Catch common misconfigurations early
//! - Explain *what* is wrong, *where* it lives, and *what to do*
//! - Keep the viewer running where possible by falling back safely

use std::collections::BTreeSet;

use shadevars_engine::{logi, logw, loge, ViewerConfig};

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Warn,
    Error,
}

impl ValidationIssue {
    pub fn warn(path: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        Self { level: IssueLevel::Warn, path: path.into(), message: message.into(), hint }
    }
    pub fn error(path: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        Self { level: IssueLevel::Error, path: path.into(), message: message.into(), hint }
    }
}

pub fn emit_issues(tag: &str, issues: &[ValidationIssue]) {
    for it in issues {
        let hint = it.hint.as_deref().map(|h| format!(" (hint: {h})")).unwrap_or_default();
        match it.level {
            IssueLevel::Warn => logw!(tag, "{}: {}{}", it.path, it.message, hint),
            IssueLevel::Error => loge!(tag, "{}: {}{}", it.path, it.message, hint),
        }
    }
}

/// Emit a one-line summary even when there are zero issues.
pub fn emit_summary(tag: &str, label: &str, issues: &[ValidationIssue]) {
    let warns = issues.iter().filter(|i| i.level == IssueLevel::Warn).count();
    let errs = issues.iter().filter(|i| i.level == IssueLevel::Error).count();
    if errs == 0 && warns == 0 {
        logi!(tag, "validation: {label} OK (0 issues)");
    } else {
        logw!(tag, "validation: {label} issues found (errors={errs} warnings={warns})");
    }
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.level == IssueLevel::Error)
}

const KNOWN_KEYS: [&str; 8] = [
    "version",
    "vert",
    "frag",
    "vars_file",
    "skybox",
    "normal_map",
    "first_texture_unit",
    "autoload_vars",
];

/// Shape checks on raw viewer.json, before typed parsing.
pub fn validate_viewer_json(v: &serde_json::Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let Some(obj) = v.as_object() else {
        issues.push(ValidationIssue::error(
            "viewer.json:/",
            "top level must be an object",
            Some("expected: { \"frag\": \"shaders/default.frag\", ... }".into()),
        ));
        return issues;
    };

    let known: BTreeSet<&str> = KNOWN_KEYS.into_iter().collect();
    for k in obj.keys() {
        if !known.contains(k.as_str()) {
            issues.push(ValidationIssue::warn(
                format!("viewer.json:/{}", escape_ptr(k)),
                format!("unknown key '{k}' is ignored"),
                Some(format!("known keys: {}", KNOWN_KEYS.join(", "))),
            ));
        }
    }

    for k in ["vert", "frag", "vars_file", "normal_map"] {
        if let Some(val) = obj.get(k) {
            match val.as_str() {
                Some(s) if s.trim().is_empty() => issues.push(ValidationIssue::error(
                    format!("viewer.json:/{k}"),
                    "path is empty",
                    Some("remove the key to use the default".into()),
                )),
                Some(_) => {}
                None => issues.push(ValidationIssue::error(
                    format!("viewer.json:/{k}"),
                    "expected a string path",
                    None,
                )),
            }
        }
    }

    if let Some(sky) = obj.get("skybox") {
        match sky.as_array() {
            Some(faces) if faces.len() != 6 => issues.push(ValidationIssue::error(
                "viewer.json:/skybox",
                format!("expected 6 face paths, got {}", faces.len()),
                Some("order: top, bottom, left, right, front, back".into()),
            )),
            Some(faces) => {
                for (i, f) in faces.iter().enumerate() {
                    if f.as_str().is_some_and(|s| s.contains(',')) {
                        issues.push(ValidationIssue::error(
                            format!("viewer.json:/skybox/{i}"),
                            "face paths cannot contain ','",
                            Some("commas separate faces in .vars files".into()),
                        ));
                    }
                }
            }
            None => issues.push(ValidationIssue::error(
                "viewer.json:/skybox",
                "expected an array of 6 paths",
                None,
            )),
        }
    }

    if let Some(u) = obj.get("first_texture_unit") {
        match u.as_u64() {
            Some(0) => issues.push(ValidationIssue::warn(
                "viewer.json:/first_texture_unit",
                "unit 0 is shared with host textures",
                Some("2 leaves units 0 and 1 to the viewer".into()),
            )),
            Some(_) => {}
            None => issues.push(ValidationIssue::error(
                "viewer.json:/first_texture_unit",
                "expected a non-negative integer",
                None,
            )),
        }
    }

    issues
}

/// Check the files a resolved config points at.
pub fn validate_paths(cfg: &ViewerConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (key, p) in [("vert", &cfg.vert_path), ("frag", &cfg.frag_path)] {
        if !p.is_file() {
            issues.push(ValidationIssue::error(
                format!("viewer.json:/{key}"),
                format!("shader not found: {}", p.display()),
                Some("paths are relative to the assets dir".into()),
            ));
        }
    }
    if !cfg.vars_path.is_file() {
        issues.push(ValidationIssue::warn(
            "viewer.json:/vars_file",
            format!("{} does not exist yet", cfg.vars_path.display()),
            Some("press S in the viewer to create it".into()),
        ));
    }
    issues
}

// JSON Pointer escaping for friendly paths
fn escape_ptr(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}
