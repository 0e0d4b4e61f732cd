//! The header-dependency database.
//!
//! Parses Makefile-format `.d` files as emitted by `clang -MMD -MF`,
//! persists a `{header -> last-known mtime}` snapshot across builds as
//! pretty-printed JSON, and answers "has this source's header set changed
//! since the last build" for the concrete targets that query it.
//!
//! Two tables are kept in memory for the duration of a build: the
//! reference table `R` (what was true last time, loaded once, read-only)
//! and the observed table `O` (what's true now, populated lazily and
//! guarded by a single mutex).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use filetime::FileTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque monotonic mtime tick, or the sentinel meaning "file is missing".
pub type MtimeTick = i64;

/// Sentinel value for a header that could not be stat'd.
pub const MISSING: MtimeTick = -1;

fn mtime_of(path: &Path) -> MtimeTick {
    match fs::metadata(path) {
        Ok(meta) => {
            let ft = FileTime::from_last_modification_time(&meta);
            ft.seconds()
        }
        Err(_) => MISSING,
    }
}

/// One row of the on-disk snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbEntry {
    fpath: String,
    ts: MtimeTick,
}

/// Default extensions treated as headers when parsing a `.d` file.
fn default_header_exts() -> Vec<String> {
    vec!["h".to_string(), "hh".to_string(), "hpp".to_string()]
}

fn has_header_ext(path: &str, exts: &[String]) -> bool {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) => exts.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// The persisted header-dependency database for one build.
pub struct DependencyDb {
    header_exts: Vec<String>,
    /// Reference table, loaded once at construction, never mutated again.
    reference: HashMap<String, MtimeTick>,
    /// Observed table, append-only for the duration of the build, guarded
    /// by a single mutex with critical sections kept to a handful of
    /// insertions per `.d` file.
    observed: Mutex<HashMap<String, MtimeTick>>,
}

impl DependencyDb {
    /// Load `db_path` if it exists. Any parse error, malformed entry
    /// (`fpath` empty, `ts == 0`), or duplicate key invalidates the whole
    /// file: the reference table starts empty rather than partially
    /// populated, so a corrupt database can never produce a false
    /// up-to-date answer — the next build just rebuilds everything.
    pub fn new(db_path: &Path, header_exts: Option<Vec<String>>) -> Self {
        let reference = load_reference_table(db_path).unwrap_or_default();
        DependencyDb {
            header_exts: header_exts.unwrap_or_else(default_header_exts),
            reference,
            observed: Mutex::new(HashMap::new()),
        }
    }

    /// Parse `dep_file_path`; for every header discovered, insert its
    /// current on-disk mtime into `O` if not already present. Thread-safe:
    /// concurrent callers with disjoint header sets all succeed, and
    /// re-insertion of an already-observed key is a no-op (first
    /// observation wins for this build).
    pub fn update_depends(&self, dep_file_path: &Path) {
        let headers = self.parse_dep_file(dep_file_path);
        let mut observed = self.observed.lock().unwrap();
        for header in headers {
            observed
                .entry(header.clone())
                .or_insert_with(|| mtime_of(Path::new(&header)));
        }
    }

    /// Insert-if-absent as in `update_depends`, then answer whether any
    /// discovered header is either absent from `R` or present with a
    /// different mtime than the one just recorded in `O`.
    ///
    /// `source_ts` is accepted for API symmetry with callers that have
    /// already compared source vs. object vs. dep-file mtimes before
    /// asking this question, but it is intentionally never read here:
    /// header staleness is decided purely from the reference and observed
    /// tables, so a source's own timestamp carries no information this
    /// check needs.
    pub fn are_depends_outdated(&self, dep_file_path: &Path, source_ts: MtimeTick) -> bool {
        let _ = source_ts;
        let headers = self.parse_dep_file(dep_file_path);
        let mut observed = self.observed.lock().unwrap();

        let mut outdated = false;
        for header in &headers {
            let current = *observed
                .entry(header.clone())
                .or_insert_with(|| mtime_of(Path::new(header)));

            match self.reference.get(header) {
                None => outdated = true,
                // Exact equality, not `<`: a header whose mtime moved
                // backwards (e.g. a restored file) still counts as
                // changed.
                Some(&prev) if prev != current => outdated = true,
                _ => {}
            }
        }
        outdated
    }

    /// Serialize `O` as a stable `[{fpath, ts}, ...]` array, pretty-printed
    /// JSON, written only if the bytes would differ from what's on disk.
    pub fn save(&self, db_path: &Path) -> Result<()> {
        let observed = self.observed.lock().unwrap();
        let mut entries: Vec<DbEntry> = observed
            .iter()
            .map(|(fpath, &ts)| DbEntry {
                fpath: fpath.clone(),
                ts,
            })
            .collect();
        entries.sort_by(|a, b| a.fpath.cmp(&b.fpath));

        let json = serde_json::to_string_pretty(&entries)?;
        write_if_different(db_path, json.as_bytes())?;
        Ok(())
    }

    /// Parse a Makefile-format dependency fragment, scanning character-wise
    /// over the file contents.
    ///
    /// Skips runs of whitespace and backslashes outside of tokens (line
    /// continuations are noise). Within a token, `\ ` yields a literal
    /// space and `\x` for any other `x` yields `x` verbatim (so `\\`
    /// yields a single backslash). Only tokens whose extension is in
    /// `header_exts` are kept; the rule target and the source file itself
    /// are discarded along with anything else. A missing `.d` file is
    /// treated as "no headers known" rather than an error.
    fn parse_dep_file(&self, dep_file_path: &Path) -> Vec<String> {
        let contents = match fs::read(dep_file_path) {
            Ok(bytes) => bytes,
            Err(_) => return Vec::new(),
        };

        let mut tokens = Vec::new();
        let mut chars = contents.iter().peekable();

        loop {
            // Skip whitespace and bare backslashes between tokens.
            while let Some(&&c) = chars.peek() {
                if c.is_ascii_whitespace() || c == b'\\' {
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().is_none() {
                break;
            }

            let mut token = Vec::new();
            while let Some(&&c) = chars.peek() {
                if c.is_ascii_whitespace() {
                    break;
                }
                if c == b'\\' {
                    chars.next();
                    match chars.peek() {
                        Some(&&b' ') => {
                            token.push(b' ');
                            chars.next();
                        }
                        Some(&&next) => {
                            token.push(b'\\');
                            token.push(next);
                            chars.next();
                        }
                        None => {
                            token.push(b'\\');
                            break;
                        }
                    }
                } else {
                    token.push(c);
                    chars.next();
                }
            }

            if !token.is_empty() {
                if let Ok(s) = String::from_utf8(token) {
                    tokens.push(s);
                }
            }
        }

        tokens
            .into_iter()
            .filter(|t| has_header_ext(t, &self.header_exts))
            .collect()
    }
}

fn load_reference_table(db_path: &Path) -> Option<HashMap<String, MtimeTick>> {
    let bytes = fs::read(db_path).ok()?;
    let entries: Vec<DbEntry> = serde_json::from_slice(&bytes).ok()?;

    let mut table = HashMap::with_capacity(entries.len());
    for entry in entries {
        if entry.fpath.is_empty() || entry.ts == 0 {
            return None;
        }
        if table.insert(entry.fpath, entry.ts).is_some() {
            return None;
        }
    }
    Some(table)
}

fn write_if_different(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Ok(existing) = fs::read(path) {
        if existing == bytes {
            return Ok(());
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)
}

/// Convenience for callers that want to assemble a db path from a build
/// directory; not part of the spec'd contract, just a small ergonomic
/// helper kept in this module because it has nowhere else to live.
pub fn default_db_path(build_dir: &Path) -> PathBuf {
    build_dir.join("depdb.json")
}
