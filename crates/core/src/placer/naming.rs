//! Alternate file name generation for the rename policy.

use std::ffi::{OsStr, OsString};

use rand::Rng;

/// Separator between the original stem and the generated suffix.
pub const SUFFIX_SEPARATOR: &str = "-";

/// Produces candidate file names for a payload whose destination is taken.
///
/// Candidates are only probabilistically unique; the placer checks each one
/// before using it.
pub trait NameGenerator: Send + Sync {
    /// Returns a file name (no directory) built from `stem` and `extension`.
    fn candidate(&self, stem: &OsStr, extension: Option<&OsStr>) -> OsString;
}

/// Appends `-` and a run of random uppercase letters to the stem.
///
/// `report.pdf` becomes e.g. `report-KQZMTRA.pdf`; a name without an
/// extension gets no trailing dot.
#[derive(Debug, Clone)]
pub struct RandomSuffixGenerator {
    len: usize,
}

impl RandomSuffixGenerator {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for RandomSuffixGenerator {
    fn default() -> Self {
        Self::new(7)
    }
}

impl NameGenerator for RandomSuffixGenerator {
    fn candidate(&self, stem: &OsStr, extension: Option<&OsStr>) -> OsString {
        compose(stem, &random_letters(self.len), extension)
    }
}

/// Builds `<stem>-<suffix>[.<extension>]`.
pub(crate) fn compose(stem: &OsStr, suffix: &str, extension: Option<&OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(SUFFIX_SEPARATOR);
    name.push(suffix);
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Returns `len` letters drawn uniformly from `A..=Z`.
pub fn random_letters(len: usize) -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.random_range(b'A'..=b'Z') as char)
        .take(len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn is_suffix(s: &str) -> bool {
        s.len() == 7 && s.bytes().all(|b| b.is_ascii_uppercase())
    }

    #[test]
    fn test_random_letters() {
        let letters = random_letters(32);
        assert_eq!(letters.len(), 32);
        assert!(letters.bytes().all(|b| b.is_ascii_uppercase()));
        assert!(random_letters(0).is_empty());
    }

    #[test]
    fn test_candidate_keeps_extension() {
        let generator = RandomSuffixGenerator::default();
        let path = Path::new("/downloads/foo.zip");

        let name = generator.candidate(path.file_stem().unwrap(), path.extension());
        let name = name.to_str().unwrap();

        let rest = name.strip_prefix("foo-").unwrap();
        let suffix = rest.strip_suffix(".zip").unwrap();
        assert!(is_suffix(suffix), "unexpected suffix in {}", name);
    }

    #[test]
    fn test_candidate_without_extension() {
        let generator = RandomSuffixGenerator::default();
        let name = generator.candidate(OsStr::new("README"), None);
        let name = name.to_str().unwrap();

        assert!(is_suffix(name.strip_prefix("README-").unwrap()));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_compose_multi_dot_name() {
        let path = Path::new("archive.tar.gz");
        let name = compose(path.file_stem().unwrap(), "ABCDEFG", path.extension());
        assert_eq!(name, OsString::from("archive.tar-ABCDEFG.gz"));
    }

    #[test]
    fn test_compose_empty_extension_is_kept_verbatim() {
        let path = Path::new("notes.");
        let name = compose(path.file_stem().unwrap(), "ABCDEFG", path.extension());
        assert_eq!(name, OsString::from("notes-ABCDEFG."));
    }

    #[test]
    fn test_custom_length() {
        let generator = RandomSuffixGenerator::new(3);
        let name = generator.candidate(OsStr::new("a"), Some(OsStr::new("b")));
        assert_eq!(name.len(), "a-XXX.b".len());
    }
}
