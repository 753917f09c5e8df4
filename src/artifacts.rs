// src/artifacts.rs

//! Artifact collection: expand glob patterns against the filesystem after a
//! command succeeds.
//!
//! Patterns are compiled with `globset` (`*` stays within one path component,
//! `**` spans directories). Expansion walks from the literal prefix of each
//! pattern, so `out/**/*.xml` only reads below `out/`.

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::errors::{AgentError, Result};
use crate::fs::FileSystem;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Compile a single artifact pattern, mapping failures to
/// [`AgentError::InvalidArtifactPattern`].
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|source| AgentError::InvalidArtifactPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Expand `patterns` relative to `cwd` and return every matching file.
///
/// Matches are sorted within a pattern and concatenated in pattern order.
/// A file matched by two patterns appears twice.
pub fn collect(fs: &dyn FileSystem, patterns: &[String], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();

    for pattern in patterns {
        let mut found = expand(fs, pattern, cwd)?;
        found.sort();
        debug!(%pattern, count = found.len(), "expanded artifact pattern");
        matches.extend(found);
    }

    Ok(matches)
}

fn expand(fs: &dyn FileSystem, pattern: &str, cwd: &Path) -> Result<Vec<PathBuf>> {
    let (prefix, rest) = split_literal_prefix(Path::new(pattern));
    // Only the pattern is glob syntax; `cwd` is always taken literally.
    let base = cwd.join(prefix);

    if rest.is_empty() {
        // Nothing to expand; but still reject a malformed pattern.
        compile_pattern(pattern)?;
        return Ok(if fs.is_file(&base) { vec![base] } else { Vec::new() });
    }

    let matcher = compile_pattern(&rest.join("/")).map_err(|err| match err {
        AgentError::InvalidArtifactPattern { source, .. } => AgentError::InvalidArtifactPattern {
            pattern: pattern.to_string(),
            source,
        },
        other => other,
    })?;

    let depth = if rest.iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(rest.len())
    };

    let mut out = Vec::new();
    walk(fs, &base, &base, depth, &matcher, &mut out);
    Ok(out)
}

/// Split a path into the directory before the first component containing
/// glob syntax, and the components from there on.
fn split_literal_prefix(path: &Path) -> (PathBuf, Vec<String>) {
    let mut base = PathBuf::new();
    let mut rest = Vec::new();

    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        let literal = matches!(component, Component::RootDir | Component::Prefix(_))
            || !text.contains(GLOB_META);
        if rest.is_empty() && literal {
            base.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }

    (base, rest)
}

fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    dir: &Path,
    depth: Option<usize>,
    matcher: &GlobMatcher,
    out: &mut Vec<PathBuf>,
) {
    let entries = match fs.read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries {
        if fs.is_file(&entry) {
            let matched = entry
                .strip_prefix(root)
                .is_ok_and(|rel| matcher.is_match(rel));
            if matched {
                out.push(entry);
            }
        } else if fs.is_dir(&entry) {
            // An unbounded walk never enters linked directories; a link back
            // to an ancestor would repeat the tree until ELOOP.
            if depth.is_none() && fs.is_symlink(&entry) {
                debug!(dir = %entry.display(), "not following symlinked directory");
                continue;
            }
            match depth {
                None => walk(fs, root, &entry, None, matcher, out),
                Some(d) if d > 1 => walk(fs, root, &entry, Some(d - 1), matcher, out),
                Some(_) => {}
            }
        }
    }
}
