//! State paths and their canonical string form.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Separator used by the canonical form of a path.
pub const SEPARATOR: char = '.';

/// An ordered list of segments addressing a location in the store graph.
///
/// Segments of any displayable type are coerced to strings. The canonical
/// form is the segments joined with `.`; two paths are equal iff their
/// canonical strings are equal, so `["a.b"]` and `["a", "b"]` address the same
/// location. The empty path denotes the store root.
#[derive(Clone, Debug, Default)]
pub struct StatePath {
    segments: Vec<String>,
    canonical: String,
}

impl StatePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pathstate::StatePath;
    ///
    /// let p = StatePath::new(["user", "fName"]);
    /// assert_eq!(p.as_str(), "user.fName");
    ///
    /// let numeric = StatePath::new([4, 5]);
    /// assert_eq!(numeric.as_str(), "4.5");
    /// ```
    pub fn new<I>(segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let segments: Vec<String> = segments.into_iter().map(|s| s.to_string()).collect();
        let canonical = segments.join(".");
        Self {
            segments,
            canonical,
        }
    }

    /// Parse a canonical (dot-joined) string. `""` is the root.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        Self::new(s.split(SEPARATOR))
    }

    /// The segments as supplied by the caller.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Canonical dot-joined form; also the subscription key.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Number of supplied segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if no segments were supplied.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of a direct child key.
    #[must_use]
    pub fn child(&self, key: impl ToString) -> StatePath {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        StatePath::new(segments)
    }
}

impl PartialEq for StatePath {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for StatePath {}

impl Hash for StatePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl From<&str> for StatePath {
    fn from(s: &str) -> Self {
        StatePath::parse(s)
    }
}

impl From<Vec<String>> for StatePath {
    fn from(segments: Vec<String>) -> Self {
        StatePath::new(segments)
    }
}

impl From<&[&str]> for StatePath {
    fn from(segments: &[&str]) -> Self {
        StatePath::new(segments.iter().copied())
    }
}

/// Macro for building paths from a segment list.
///
/// # Example
///
/// ```rust
/// use pathstate::path;
///
/// let p = path!["podium", 3, "title"];
/// assert_eq!(p.as_str(), "podium.3.title");
/// assert!(path![].is_root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::StatePath::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::StatePath::new([$(::std::string::ToString::to_string(&$segment)),+])
    };
}
