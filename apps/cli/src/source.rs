//! Loading documents from JSON files and naming their output files.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use pressmark_shared::{Document, PressError, Result};
use regex::Regex;
use tracing::{debug, warn};

/// A document together with the file it was read from.
#[derive(Debug)]
pub(crate) struct SourceDocument {
    pub path: PathBuf,
    pub doc: Document,
}

/// Documents read from the input, plus the files that could not be read.
#[derive(Debug, Default)]
pub(crate) struct Loaded {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<(PathBuf, PressError)>,
}

impl Loaded {
    pub(crate) fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.failures.is_empty()
    }
}

/// Read one `.json` document, or every `.json` document in a directory
/// (sorted by file name).
///
/// A file that cannot be read or parsed is recorded in
/// [`Loaded::failures`] and the rest still load. Only a directory that
/// cannot be listed is an error.
pub(crate) fn load_documents(input: &Path) -> Result<Loaded> {
    let paths = if input.is_dir() {
        let entries = std::fs::read_dir(input).map_err(|e| PressError::io(input, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PressError::io(input, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        paths
    } else {
        vec![input.to_path_buf()]
    };

    debug!(count = paths.len(), input = %input.display(), "loading documents");

    let mut loaded = Loaded::default();
    for path in paths {
        match read_document(&path) {
            Ok(doc) => loaded.documents.push(SourceDocument { path, doc }),
            Err(e) => {
                warn!(source = %path.display(), error = %e, "document could not be loaded");
                loaded.failures.push((path, e));
            }
        }
    }
    Ok(loaded)
}

fn read_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|e| PressError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| PressError::parse(format!("{}: {e}", path.display())))
}

/// Output file name (without extension) for a document.
///
/// Prefers the configured property, then a slug of the title, then the
/// source file stem.
pub(crate) fn output_stem(source: &SourceDocument, filename_field: &str) -> String {
    source
        .doc
        .property_str(filename_field)
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(slugify(&source.doc.title)).filter(|s| !s.is_empty()))
        .or_else(|| {
            source
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "untitled".to_string())
}

/// Lowercase, with runs of anything but letters and digits collapsed to `-`.
fn slugify(s: &str) -> String {
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

    NON_WORD_RE
        .replace_all(&s.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}
