//! Signed jar handling
//!
//! Instrumenting a signed archive invalidates its signature. The configured
//! [`SignedJarHandling`] decides what happens to such artifacts; unsigned
//! artifacts always proceed.

use crate::error::{PrepError, PrepResult};
use crate::source::Artifact;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use zip::ZipArchive;

/// Signature block extensions that accompany a `.SF` file
const SIGNATURE_BLOCK_EXTENSIONS: &[&str] = &["RSA", "DSA", "EC"];

/// Strategy applied to signed archives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignedJarHandling {
    /// Transform anyway; the signature becomes invalid
    #[default]
    Instrument,
    /// Leave the archive untouched
    Skip,
    /// Report the archive as a failure
    Fail,
}

/// Outcome of consulting the signed jar policy for one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedJarDecision {
    Proceed,
    PassThrough,
    Abort,
}

impl SignedJarHandling {
    /// Decide what to do with `artifact`.
    ///
    /// Reads the archive's central directory, so this blocks on file I/O.
    pub fn decide(&self, artifact: &Artifact) -> PrepResult<SignedJarDecision> {
        if *self == Self::Instrument || !artifact.is_archive() {
            return Ok(SignedJarDecision::Proceed);
        }

        if !is_signed_archive(&artifact.path)? {
            return Ok(SignedJarDecision::Proceed);
        }

        debug!("{} is signed, applying {} strategy", artifact, self);
        Ok(self.decide_signed())
    }

    /// Decision for an artifact already known to be signed
    pub fn decide_signed(&self) -> SignedJarDecision {
        match self {
            Self::Instrument => SignedJarDecision::Proceed,
            Self::Skip => SignedJarDecision::PassThrough,
            Self::Fail => SignedJarDecision::Abort,
        }
    }
}

impl FromStr for SignedJarHandling {
    type Err = PrepError;

    fn from_str(s: &str) -> PrepResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "instrument" => Ok(Self::Instrument),
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            _ => Err(PrepError::invalid_entry(
                "--signedjarhandlingstrategy",
                format!(
                    "unknown strategy '{}', expected instrument, skip or fail",
                    s
                ),
            )),
        }
    }
}

impl fmt::Display for SignedJarHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instrument => "instrument",
            Self::Skip => "skip",
            Self::Fail => "fail",
        };
        write!(f, "{}", name)
    }
}

/// Check whether an archive carries a jar signature: a `META-INF/*.SF`
/// signature file plus a matching signature block.
pub fn is_signed_archive(path: &Path) -> PrepResult<bool> {
    let file = File::open(path)
        .map_err(|e| PrepError::io(format!("opening archive {}", path.display()), e))?;
    let archive = ZipArchive::new(file).map_err(|e| PrepError::InvalidArchive {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut has_signature_file = false;
    let mut has_signature_block = false;

    for name in archive.file_names() {
        let upper = name.to_ascii_uppercase();
        let Some(entry) = upper.strip_prefix("META-INF/") else {
            continue;
        };
        if entry.contains('/') {
            continue;
        }
        match entry.rsplit_once('.') {
            Some((_, "SF")) => has_signature_file = true,
            Some((_, ext)) if SIGNATURE_BLOCK_EXTENSIONS.contains(&ext) => {
                has_signature_block = true
            }
            _ => {}
        }
    }

    Ok(has_signature_file && has_signature_block)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    pub(crate) fn write_jar(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for entry in entries {
            zip.start_file(*entry, options).unwrap();
            zip.write_all(&[0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
        }
        zip.finish().unwrap();
    }

    pub(crate) fn write_signed_jar(path: &Path) {
        write_jar(
            path,
            &[
                "META-INF/MANIFEST.MF",
                "META-INF/SIGNER.SF",
                "META-INF/SIGNER.RSA",
                "com/example/App.class",
            ],
        );
    }

    #[test]
    fn detects_signed_archive() {
        let dir = TempDir::new().unwrap();
        let signed = dir.path().join("signed.jar");
        write_signed_jar(&signed);
        let plain = dir.path().join("plain.jar");
        write_jar(&plain, &["META-INF/MANIFEST.MF", "com/example/App.class"]);

        assert!(is_signed_archive(&signed).unwrap());
        assert!(!is_signed_archive(&plain).unwrap());
    }

    #[test]
    fn signature_file_alone_is_not_signed() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("partial.jar");
        write_jar(&jar, &["META-INF/SIGNER.SF", "com/example/App.class"]);

        assert!(!is_signed_archive(&jar).unwrap());
    }

    #[test]
    fn decisions_for_signed_archive() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("signed.jar");
        write_signed_jar(&jar);
        let artifact = Artifact::source(&jar, "");

        assert_eq!(
            SignedJarHandling::Instrument.decide(&artifact).unwrap(),
            SignedJarDecision::Proceed
        );
        assert_eq!(
            SignedJarHandling::Skip.decide(&artifact).unwrap(),
            SignedJarDecision::PassThrough
        );
        assert_eq!(
            SignedJarHandling::Fail.decide(&artifact).unwrap(),
            SignedJarDecision::Abort
        );
    }

    #[test]
    fn unsigned_always_proceeds() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("plain.jar");
        write_jar(&jar, &["com/example/App.class"]);
        let artifact = Artifact::source(&jar, "");

        assert_eq!(
            SignedJarHandling::Fail.decide(&artifact).unwrap(),
            SignedJarDecision::Proceed
        );
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"not a zip").unwrap();

        let err = SignedJarHandling::Skip
            .decide(&Artifact::source(&jar, ""))
            .unwrap_err();
        assert!(matches!(err, PrepError::InvalidArchive { .. }));
    }

    #[test]
    fn parse_strategy() {
        assert_eq!(
            "SKIP".parse::<SignedJarHandling>().unwrap(),
            SignedJarHandling::Skip
        );
        assert!("ignore".parse::<SignedJarHandling>().is_err());
    }
}
