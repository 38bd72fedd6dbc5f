// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML frontmatter codec for `_walk.md`, `issue.md`, and result files.
//!
//! Documents are `---\n<yaml>\n---\n\n<body>`. The body may be empty, in
//! which case the trailing blank line is omitted.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Split a document into its raw YAML header and body.
pub fn split(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---\n")?;
    let (yaml, body) = match rest.split_once("\n---\n") {
        Some(parts) => parts,
        None => (rest.strip_suffix("\n---")?, ""),
    };
    Some((yaml, body.strip_prefix('\n').unwrap_or(body)))
}

/// Parse a frontmatter document into a typed header and its body.
pub fn parse<T: DeserializeOwned>(path: &Path, text: &str) -> Result<(T, String), StoreError> {
    let (yaml, body) =
        split(text).ok_or_else(|| StoreError::malformed(path, "missing frontmatter delimiters"))?;
    let header: T =
        serde_yaml::from_str(yaml).map_err(|e| StoreError::malformed(path, e.to_string()))?;
    Ok((header, body.to_string()))
}

/// Read and parse a frontmatter file.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<(T, String), StoreError> {
    let text = std::fs::read_to_string(path)?;
    parse(path, &text)
}

/// Render a typed header and body as a frontmatter document.
pub fn render<T: Serialize>(header: &T, body: &str) -> Result<String, StoreError> {
    let yaml = serde_yaml::to_string(header)
        .map_err(|e| StoreError::malformed("<header>", format!("serialize header: {e}")))?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 16);
    out.push_str("---\n");
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

/// Render and write a frontmatter file.
pub fn write<T: Serialize>(path: &Path, header: &T, body: &str) -> Result<(), StoreError> {
    let text = render(header, body)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
