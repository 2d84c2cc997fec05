//! Request target sanitizing.
//!
//! Turns a raw request target such as `/report%20v2.txt?x=1` into a path
//! inside the storage root. Everything here is string work; nothing touches
//! the filesystem.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Outcome of validating a single filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCheck<'a> {
    /// The name may be used as-is inside the storage root.
    Valid(&'a str),
    /// The name contains a separator, a `..` sequence or a NUL byte.
    Invalid,
}

/// A request target resolved against the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The empty name: the caller serves the index resource.
    Index,
    /// A stored file.
    File {
        /// Decoded filename.
        name: String,
        /// `root.join(name)`.
        path: PathBuf,
    },
}

/// The request target could not be turned into a safe filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPath(pub String);

/// Validate a decoded filename.
///
/// Rejects `/`, `\` and `..` anywhere in the name, not just as whole
/// segments, so `a..b` is refused as well as `../a`.
pub fn validate_name(name: &str) -> NameCheck<'_> {
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        NameCheck::Invalid
    } else {
        NameCheck::Valid(name)
    }
}

/// Percent-decode the path component of a request target and strip the
/// leading separator. The query string, if any, is dropped.
pub fn candidate_name(raw_target: &str) -> Result<Cow<'_, str>, InvalidPath> {
    let path = raw_target.split(['?', '#']).next().unwrap_or("");
    let path = path.strip_prefix('/').unwrap_or(path);

    urlencoding::decode(path).map_err(|_| InvalidPath(raw_target.to_string()))
}

/// Resolve a raw request target against `root`.
pub fn resolve(root: &Path, raw_target: &str) -> Result<Resolved, InvalidPath> {
    let candidate = candidate_name(raw_target)?;

    if candidate.is_empty() {
        return Ok(Resolved::Index);
    }

    match validate_name(&candidate) {
        NameCheck::Valid(name) => Ok(Resolved::File {
            name: name.to_string(),
            path: root.join(name),
        }),
        NameCheck::Invalid => Err(InvalidPath(candidate.into_owned())),
    }
}
