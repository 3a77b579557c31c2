//! Replace the marked statistics block inside a README.

use crate::error::{Result, StatsError};
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::NamedTempFile;
use tracing::debug;

pub const START_MARKER: &str = "<!-- README-STATS:START -->";
pub const END_MARKER: &str = "<!-- README-STATS:END -->";

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<!-- ?README-STATS:START ?-->.*?<!-- ?README-STATS:END ?-->")
            .expect("marker pattern is valid")
    })
}

/// Replace everything between the first marker pair with `blob`.
///
/// Text before the start marker and after the end marker is kept as is;
/// the markers themselves are rewritten in canonical form.
pub fn splice(contents: &str, blob: &str) -> Result<String> {
    let block = block_pattern().find(contents).ok_or_else(|| {
        StatsError::Splice(format!(
            "could not find a {START_MARKER} ... {END_MARKER} block"
        ))
    })?;

    let mut out = String::with_capacity(contents.len() + blob.len());
    out.push_str(&contents[..block.start()]);
    out.push_str(START_MARKER);
    out.push('\n');
    out.push_str(blob);
    out.push_str(END_MARKER);
    out.push_str(&contents[block.end()..]);
    Ok(out)
}

/// Splice `blob` into the file at `path`, replacing it atomically.
///
/// On any error the original file is left untouched.
pub fn update_readme(path: &Path, blob: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path)?;
    let updated = splice(&contents, blob)?;
    if updated == contents {
        debug!(path = %path.display(), "README already up to date");
        return Ok(());
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = std::fs::metadata(path)?.permissions();
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(updated.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path)?;
    debug!(path = %path.display(), bytes = updated.len(), "README updated");
    Ok(())
}
