//! Module to load a repair project manifest.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use error_stack::{bail, ensure, IntoReport, Report, ResultExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Could not read repair manifest")]
pub struct ManifestError;

pub type Result<T, E = ManifestError> = error_stack::Result<T, E>;

/// Default compiler invocation; `{src}` expands to the variant's source
/// files, `{out}` to the binary the tests run.
pub const DEFAULT_COMPILE_COMMAND: &str = "cc -o {out} {src}";

/// Contains everything needed to attempt a repair: the buggy sources, how
/// to compile them, and the test suite that tells good variants from bad
/// ones.
///
/// Positive tests pass on the original program; negative tests encode the
/// bug and fail on it. Test entries are shell commands in which `{out}`
/// expands to the compiled variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepairManifest {
    /// The source files of the program under repair.
    pub program: Vec<PathBuf>,
    pub compile_command: String,
    pub positive_tests: Vec<String>,
    pub negative_tests: Vec<String>,
}

impl Default for RepairManifest {
    fn default() -> Self {
        Self {
            program: Vec::new(),
            compile_command: DEFAULT_COMPILE_COMMAND.to_string(),
            positive_tests: Vec::new(),
            negative_tests: Vec::new(),
        }
    }
}

impl RepairManifest {
    /// Build a manifest around a single source file, with no tests wired
    /// up yet.
    pub fn for_single_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            program: vec![path.into()],
            ..Self::default()
        }
    }

    /// Load a manifest.
    ///
    /// A `.json` file is parsed (comments allowed), with relative program
    /// paths resolved against the manifest's directory. A bare `.c` file
    /// becomes a single-file manifest. Anything else is rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            path.is_file(),
            Report::new(ManifestError)
                .attach_printable(format!("Couldn't find the manifest at: {path:?}"))
        );
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("c") => Ok(Self::for_single_file(path)),
            Some("json") => {
                let mut contents = String::new();
                BufReader::new(
                    File::open(path)
                        .into_report()
                        .change_context(ManifestError)?,
                )
                .read_to_string(&mut contents)
                .into_report()
                .change_context(ManifestError)?;

                let stripped = json_comments::StripComments::new(contents.as_bytes());
                let mut manifest: RepairManifest = serde_json::from_reader(stripped)
                    .into_report()
                    .change_context(ManifestError)
                    .attach_printable_lazy(|| format!("while parsing {path:?}"))?;

                if let Some(dir) = path.parent() {
                    for source in &mut manifest.program {
                        if source.is_relative() {
                            *source = dir.join(&*source);
                        }
                    }
                }
                manifest.validate()?;
                Ok(manifest)
            }
            _ => bail!(
                Report::new(ManifestError)
                    .attach_printable(format!("Not a program or manifest file: {path:?}"))
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.program.is_empty(),
            Report::new(ManifestError).attach_printable("The manifest names no source files")
        );
        if self.positive_tests.is_empty() {
            tracing::warn!(
                "The manifest has no positive tests; every variant will score as a repair"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_manifests_resolve_relative_sources() {
        let dir = std::env::temp_dir().join(format!("mend-manifest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let manifest_path = dir.join("project.json");
        std::fs::write(
            &manifest_path,
            r#"{
                // the buggy program
                "program": ["buggy.c"],
                "positive-tests": ["sh p1.sh {out}"],
                "negative-tests": ["sh n1.sh {out}"]
            }"#,
        )
        .unwrap();

        let manifest = RepairManifest::from_file(&manifest_path).unwrap();
        assert_eq!(manifest.program, vec![dir.join("buggy.c")]);
        assert_eq!(manifest.compile_command, DEFAULT_COMPILE_COMMAND);
        assert_eq!(manifest.positive_tests.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_manifest_extensions_are_rejected() {
        assert!(RepairManifest::from_file("project.toml").is_err());
    }
}
