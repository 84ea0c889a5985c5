//! Normalized path handling
//!
//! Local artifact paths and remote POSIX paths share one representation so
//! that a remote destination can be derived from a local layout by string
//! joins alone.

use std::fmt;
use std::path::{Path, PathBuf};

/// A path normalized to forward slashes with redundant separators collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: clean(&path.as_ref().to_string_lossy()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join a relative segment. A leading slash on `segment` is ignored so
    /// that remote absolute paths can be re-rooted under a local directory.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let segment = segment.trim_start_matches('/');
        if self.inner.is_empty() {
            return Self::new(segment);
        }
        Self {
            inner: clean(&format!("{}/{}", self.inner, segment)),
        }
    }

    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            Some(idx) => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            None => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.inner
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let idx = name.rfind('.')?;
        if idx == 0 { None } else { Some(&name[idx + 1..]) }
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

fn clean(raw: &str) -> String {
    let raw = raw.replace('\\', "/");
    let absolute = raw.starts_with('/');
    let parts: Vec<&str> = raw
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", joined),
        (false, _) => joined,
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/etc//nagios/./objects/", "/etc/nagios/objects")]
    #[case("conf\\hosts.cfg", "conf/hosts.cfg")]
    #[case("/", "/")]
    #[case("", "")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(NormalizedPath::new(input).as_str(), expected);
    }

    #[test]
    fn join_reroots_absolute_segments() {
        let root = NormalizedPath::new("/tmp/hosts/web-01");
        let joined = root.join("/etc/nagios/objects/hosts.cfg");
        assert_eq!(joined.as_str(), "/tmp/hosts/web-01/etc/nagios/objects/hosts.cfg");
    }

    #[test]
    fn parent_and_file_name() {
        let path = NormalizedPath::new("/var/lib/nagiosql/import/services.cfg");
        assert_eq!(path.file_name(), Some("services.cfg"));
        assert_eq!(path.extension(), Some("cfg"));
        assert_eq!(path.parent().unwrap().as_str(), "/var/lib/nagiosql/import");
        assert_eq!(NormalizedPath::new("/etc").parent().unwrap().as_str(), "/");
    }

    #[test]
    fn dotfile_has_no_extension() {
        assert_eq!(NormalizedPath::new(".monforge").extension(), None);
    }
}
