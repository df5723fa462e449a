//! Formula validation: confirm a formula is well-formed before use.
//!
//! Validation is side-effect free (no network, no writes). Rejections
//! name the failing field and the reason so the operator can fix the
//! formula file directly.

use log::debug;
use reqwest::Url;

use super::Formula;
use crate::checksum::SHA256_HEX_LEN;
use crate::deps::find_executable;
use crate::runtime::Runtime;

/// A rejected formula field, with the reason.
#[derive(Debug, PartialEq)]
pub enum ValidationError {
    /// `name` is empty or contains characters outside `[a-z0-9._-]`.
    Name(String),
    /// `homepage` is present but not a well-formed URL.
    Homepage(String),
    /// `source.url` is malformed, has an unsupported scheme, or lacks an
    /// archive file name.
    SourceUrl(String),
    /// `source.sha256` has the wrong length or alphabet for SHA-256.
    Checksum(String),
    /// A declared dependency identifier is empty or contains whitespace.
    Dependency(String),
    /// The recipe's build-orchestration tool is not available on PATH.
    RecipeTool(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Name(reason) => write!(f, "invalid field 'name': {}", reason),
            ValidationError::Homepage(reason) => {
                write!(f, "invalid field 'homepage': {}", reason)
            }
            ValidationError::SourceUrl(reason) => {
                write!(f, "invalid field 'source.url': {}", reason)
            }
            ValidationError::Checksum(reason) => {
                write!(f, "invalid field 'source.sha256': {}", reason)
            }
            ValidationError::Dependency(reason) => {
                write!(f, "invalid field 'dependencies': {}", reason)
            }
            ValidationError::RecipeTool(tool) => {
                write!(
                    f,
                    "invalid field 'recipe.tool': '{}' is not available on PATH",
                    tool
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a candidate formula. Returns the first failing field.
#[tracing::instrument(skip(runtime, formula))]
pub fn validate<R: Runtime>(runtime: &R, formula: &Formula) -> Result<(), ValidationError> {
    validate_name(&formula.name)?;

    if let Some(homepage) = &formula.homepage {
        Url::parse(homepage).map_err(|e| ValidationError::Homepage(e.to_string()))?;
    }

    validate_source_url(&formula.source.url)?;
    validate_sha256(&formula.source.sha256)?;

    for dep in formula
        .dependencies
        .build
        .iter()
        .chain(formula.dependencies.runtime.iter())
    {
        validate_dependency(dep)?;
    }

    // Install steps must reference an executable available in the target
    // environment. The tool is probed once; all three steps invoke it.
    if find_executable(runtime, &formula.recipe.tool).is_none() {
        return Err(ValidationError::RecipeTool(formula.recipe.tool.clone()));
    }

    debug!("Formula '{}' is well-formed", formula.name);
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Name("must not be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::Name(format!(
            "'{}' contains characters outside [a-z0-9._-]",
            name
        )));
    }
    Ok(())
}

fn validate_source_url(url: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(url).map_err(|e| ValidationError::SourceUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::SourceUrl(format!(
                "unsupported scheme '{}'",
                other
            )));
        }
    }
    let file_name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if file_name.is_empty() {
        return Err(ValidationError::SourceUrl(
            "URL has no archive file name".to_string(),
        ));
    }
    Ok(())
}

fn validate_sha256(digest: &str) -> Result<(), ValidationError> {
    if digest.len() != SHA256_HEX_LEN {
        return Err(ValidationError::Checksum(format!(
            "expected {} hex characters, got {}",
            SHA256_HEX_LEN,
            digest.len()
        )));
    }
    if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::Checksum(
            "contains non-hexadecimal characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_dependency(identifier: &str) -> Result<(), ValidationError> {
    if identifier.is_empty() {
        return Err(ValidationError::Dependency(
            "identifier must not be empty".to_string(),
        ));
    }
    if identifier.chars().any(char::is_whitespace) {
        return Err(ValidationError::Dependency(format!(
            "identifier '{}' contains whitespace",
            identifier
        )));
    }
    Ok(())
}
