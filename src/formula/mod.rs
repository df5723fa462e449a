//! The formula data model: a declarative record describing one software
//! release (where to fetch it, how to verify it, what it needs, and the
//! fixed three-step recipe that builds it).
//!
//! A formula is authored once per release and never mutated afterwards; a
//! new release is a new formula file with its own URL/checksum pair.

pub mod validate;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runtime::Runtime;

/// Archive extensions understood by the installer, longest first so that
/// `.tar.gz` wins over `.gz`.
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".zip"];

/// A declarative package record for one immutable release.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Explicit release version. Usually omitted: the version is embedded
    /// in the source URL and inferred from it.
    #[serde(default)]
    pub version: Option<String>,
    pub source: Source,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub recipe: Recipe,
}

/// Where the release archive lives and what its bytes must hash to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Source {
    pub url: String,
    pub sha256: String,
}

/// Declared dependency identifiers. Build dependencies are tools that
/// must be present while building; runtime dependencies are declared for
/// the external resolver and never probed here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Dependencies {
    #[serde(default)]
    pub build: Vec<String>,
    #[serde(default)]
    pub runtime: Vec<String>,
}

/// The build-orchestration tool and extra configure arguments. The
/// three-step configure/build/install structure itself is fixed and not
/// configurable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Recipe {
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default)]
    pub configure_args: Vec<String>,
}

fn default_tool() -> String {
    "cmake".to_string()
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe {
            tool: default_tool(),
            configure_args: Vec::new(),
        }
    }
}

impl Formula {
    /// Parse a formula from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let formula: Formula = toml::from_str(content).context("Failed to parse formula TOML")?;
        Ok(formula)
    }

    /// Load a formula file through the runtime.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read formula at {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid formula file {:?}", path))
    }

    /// The archive file name: the final path segment of the source URL,
    /// query string stripped.
    pub fn archive_file_name(&self) -> Result<String> {
        let without_query = self.source.url.split(['?', '#']).next().unwrap_or_default();
        let name = without_query.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return Err(anyhow!(
                "Source URL has no file name component: {}",
                self.source.url
            ));
        }
        Ok(name.to_string())
    }

    /// The release version: explicit when declared, otherwise inferred
    /// from the version embedded in the archive file name
    /// (`<name>-<version>.tar.gz`).
    pub fn version(&self) -> Result<String> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }

        let file_name = self.archive_file_name()?;
        let stem = strip_archive_extension(&file_name).ok_or_else(|| {
            anyhow!(
                "Cannot infer version: unrecognized archive extension in '{}'",
                file_name
            )
        })?;

        let version = stem
            .strip_prefix(&format!("{}-", self.name))
            .unwrap_or(stem);
        if version.is_empty() {
            return Err(anyhow!(
                "Cannot infer version from archive name '{}'",
                file_name
            ));
        }
        Ok(version.to_string())
    }
}

/// Strip a known archive extension, returning the stem, or None if the
/// name does not end in a recognized extension.
pub fn strip_archive_extension(file_name: &str) -> Option<&str> {
    ARCHIVE_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;

    pub(crate) const QVM_FFMPEG: &str = r#"
name = "qvm-ffmpeg"
description = "Quran Video Maker (FFmpeg)"
homepage = "https://github.com/ashaltu/quran-video-maker-ffmpeg"

[source]
url = "https://github.com/ashaltu/quran-video-maker-ffmpeg/releases/download/v0.0.0-test3-g/qvm-ffmpeg-v0.0.0-test3-g.tar.gz"
sha256 = "fd120000aa167dba7e996a36e0bd3e2c5589805c65fb028ce72f8f441e4e9c69"

[dependencies]
build = ["cmake", "pkg-config"]
runtime = ["ffmpeg", "freetype", "harfbuzz", "cpr", "nlohmann-json", "cxxopts"]
"#;

    #[test]
    fn test_parse_full_formula() {
        let formula = Formula::parse(QVM_FFMPEG).unwrap();
        assert_eq!(formula.name, "qvm-ffmpeg");
        assert_eq!(
            formula.description.as_deref(),
            Some("Quran Video Maker (FFmpeg)")
        );
        assert_eq!(formula.dependencies.build, vec!["cmake", "pkg-config"]);
        assert_eq!(formula.dependencies.runtime.len(), 6);
        // Recipe omitted: defaults to cmake with no extra configure args
        assert_eq!(formula.recipe.tool, "cmake");
        assert!(formula.recipe.configure_args.is_empty());
    }

    #[test]
    fn test_parse_missing_source_fails() {
        let result = Formula::parse("name = \"tool\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_recipe_override() {
        let formula = Formula::parse(
            r#"
name = "tool"
[source]
url = "https://example.com/tool-v1.0.0.tar.gz"
sha256 = "0000000000000000000000000000000000000000000000000000000000000000"
[recipe]
tool = "cmake3"
configure_args = ["-DWITH_DOCS=OFF"]
"#,
        )
        .unwrap();
        assert_eq!(formula.recipe.tool, "cmake3");
        assert_eq!(formula.recipe.configure_args, vec!["-DWITH_DOCS=OFF"]);
    }

    #[test]
    fn test_archive_file_name() {
        let formula = Formula::parse(QVM_FFMPEG).unwrap();
        assert_eq!(
            formula.archive_file_name().unwrap(),
            "qvm-ffmpeg-v0.0.0-test3-g.tar.gz"
        );
    }

    #[test]
    fn test_archive_file_name_strips_query() {
        let mut formula = Formula::parse(QVM_FFMPEG).unwrap();
        formula.source.url = "https://example.com/dl/tool-v2.zip?token=abc".to_string();
        assert_eq!(formula.archive_file_name().unwrap(), "tool-v2.zip");
    }

    #[test]
    fn test_version_inferred_from_url() {
        let formula = Formula::parse(QVM_FFMPEG).unwrap();
        assert_eq!(formula.version().unwrap(), "v0.0.0-test3-g");
    }

    #[test]
    fn test_version_inferred_for_next_revision() {
        // Two revisions differ only in URL/checksum; each carries its own version
        let mut formula = Formula::parse(QVM_FFMPEG).unwrap();
        formula.source.url =
            "https://github.com/ashaltu/quran-video-maker-ffmpeg/releases/download/v0.1.0/qvm-ffmpeg-v0.1.0.tar.gz"
                .to_string();
        assert_eq!(formula.version().unwrap(), "v0.1.0");
    }

    #[test]
    fn test_version_explicit_overrides_inference() {
        let mut formula = Formula::parse(QVM_FFMPEG).unwrap();
        formula.version = Some("v9.9.9".to_string());
        assert_eq!(formula.version().unwrap(), "v9.9.9");
    }

    #[test]
    fn test_version_unrecognized_extension_fails() {
        let mut formula = Formula::parse(QVM_FFMPEG).unwrap();
        formula.source.url = "https://example.com/tool-v1.tar.xz".to_string();
        assert!(formula.version().is_err());
    }

    #[test]
    fn test_strip_archive_extension() {
        assert_eq!(strip_archive_extension("a-v1.tar.gz"), Some("a-v1"));
        assert_eq!(strip_archive_extension("a-v1.tgz"), Some("a-v1"));
        assert_eq!(strip_archive_extension("a-v1.zip"), Some("a-v1"));
        assert_eq!(strip_archive_extension("a-v1.tar.xz"), None);
    }

    #[test]
    fn test_load_through_runtime() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok(QVM_FFMPEG.to_string()));

        let formula = Formula::load(&runtime, &PathBuf::from("qvm-ffmpeg.toml")).unwrap();
        assert_eq!(formula.name, "qvm-ffmpeg");
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not = [valid".to_string()));

        let result = Formula::load(&runtime, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }
}
