//! Specification registry with fingerprint-keyed caching.
//!
//! Loads the primary specification file plus an optional `_local` override,
//! merges them handler-by-handler, and caches the resolved result for the
//! lifetime of the process. The cache key is a fingerprint computed from
//! cheap file metadata, so every access costs a stat rather than a reparse;
//! an edited file is picked up as soon as its fingerprint changes.

use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::UNIX_EPOCH;

use siphasher::sip::SipHasher24;

use crate::{SearchSpec, SpecError, parse};

/// Suffix inserted before the extension to form the override file name.
const LOCAL_SUFFIX: &str = "_local";

/// A resolved, immutable set of handler specifications.
#[derive(Debug, Default)]
pub struct SpecSet {
    /// Handler name to resolved specification.
    specs: HashMap<String, SearchSpec>,
}

impl SpecSet {
    /// Builds a set from already-resolved specifications.
    ///
    /// Most callers obtain a set through [`SpecRegistry::load`]; this
    /// constructor exists for programmatic setups and tests.
    pub fn new(specs: HashMap<String, SearchSpec>) -> Self {
        Self { specs }
    }

    /// Looks up a handler specification.
    ///
    /// Tries an exact name match first, then falls back to a
    /// case-insensitive scan. The fallback tolerates casing drift between
    /// caller code and the spec file. Returns `None` for unknown handlers;
    /// callers typically then treat the handler name as a literal field.
    pub fn get(&self, handler: &str) -> Option<&SearchSpec> {
        if let Some(spec) = self.specs.get(handler) {
            return Some(spec);
        }
        self.specs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(handler))
            .map(|(_, spec)| spec)
    }

    /// Returns an iterator over all known handler names.
    pub fn handlers(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Number of handlers in the set.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True if no handlers are defined.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Cached specification set together with the fingerprint it was built from.
#[derive(Debug)]
struct CacheEntry {
    /// Fingerprint of the source files at build time.
    fingerprint: u64,
    /// The resolved specifications.
    specs: Arc<SpecSet>,
}

/// Loads and caches search specifications.
///
/// The registry owns the cache explicitly; there is no ambient global
/// state. A rebuild is a pure function of on-disk content, so concurrent
/// callers racing past the lock can at worst rebuild redundantly, never
/// produce divergent results.
#[derive(Debug)]
pub struct SpecRegistry {
    /// Path to the primary specification file.
    primary: PathBuf,
    /// Path to the optional local override file (may not exist).
    local: PathBuf,
    /// Fingerprint-checked cache of the last resolved set.
    cache: RwLock<Option<CacheEntry>>,
}

impl SpecRegistry {
    /// Creates a registry for the given primary specification file.
    ///
    /// The override path is derived by inserting `_local` before the
    /// extension (`searchspecs.yaml` -> `searchspecs_local.yaml`).
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        let primary = primary.into();
        let local = local_override_path(&primary);
        Self {
            primary,
            local,
            cache: RwLock::new(None),
        }
    }

    /// Path of the override file consulted on every load.
    pub fn local_path(&self) -> &Path {
        &self.local
    }

    /// Returns the current specification set, reloading if the source
    /// fingerprint has changed since the last call.
    pub fn load(&self) -> Result<Arc<SpecSet>, SpecError> {
        let fingerprint = self.fingerprint()?;

        if let Ok(cache) = self.cache.read()
            && let Some(entry) = cache.as_ref()
            && entry.fingerprint == fingerprint
        {
            return Ok(Arc::clone(&entry.specs));
        }

        let specs = Arc::new(self.rebuild()?);
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(CacheEntry {
                fingerprint,
                specs: Arc::clone(&specs),
            });
        }
        Ok(specs)
    }

    /// Computes the cache fingerprint from file metadata.
    ///
    /// Name, length, and modification time of the primary file and (when
    /// present) the override file all contribute. Content enters the
    /// picture only through the reparse a changed fingerprint triggers.
    fn fingerprint(&self) -> Result<u64, SpecError> {
        let mut hasher = SipHasher24::new();
        hash_file_meta(&self.primary, true, &mut hasher)?;
        hash_file_meta(&self.local, false, &mut hasher)?;
        Ok(hasher.finish())
    }

    /// Parses both files and resolves the merged handler set.
    fn rebuild(&self) -> Result<SpecSet, SpecError> {
        let mut raw = parse::parse_spec_file(&self.primary)?;

        // Merge the override handler-by-handler: an overridden handler
        // replaces the primary definition wholesale, with no deep merge of
        // the nested structures.
        if self.local.exists() {
            for (handler, spec) in parse::parse_spec_file(&self.local)? {
                raw.insert(handler, spec);
            }
        }

        let mut specs = HashMap::with_capacity(raw.len());
        for (handler, spec) in raw {
            let resolved = parse::resolve_spec(&handler, spec)?;
            specs.insert(handler, resolved);
        }
        Ok(SpecSet { specs })
    }
}

/// Derives the `_local` override path for a primary spec file.
fn local_override_path(primary: &Path) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match primary.extension() {
        Some(ext) => format!("{stem}{LOCAL_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{LOCAL_SUFFIX}"),
    };
    primary.with_file_name(name)
}

/// Feeds one file's identity and metadata into the fingerprint hasher.
///
/// A missing optional file hashes as absent; a missing required file is an
/// error surfaced at load time.
fn hash_file_meta(path: &Path, required: bool, hasher: &mut SipHasher24) -> Result<(), SpecError> {
    path.hash(hasher);
    match fs::metadata(path) {
        Ok(meta) => {
            true.hash(hasher);
            meta.len().hash(hasher);
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_nanos());
            mtime.hash(hasher);
            Ok(())
        }
        Err(source) if required => Err(SpecError::Stat {
            path: path.to_path_buf(),
            source,
        }),
        Err(_) => {
            false.hash(hasher);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const PRIMARY: &str = r#"
Title:
  query_fields:
    - field: title
      specs: [[onephrase, 500]]
Author:
  dismax_fields: [author^100]
  filter_query: "format:Book"
"#;

    fn write_specs(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn local_path_derivation() {
        assert_eq!(
            local_override_path(Path::new("/conf/searchspecs.yaml")),
            PathBuf::from("/conf/searchspecs_local.yaml")
        );
        assert_eq!(
            local_override_path(Path::new("specs")),
            PathBuf::from("specs_local")
        );
    }

    #[test]
    fn load_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_specs(dir.path(), "searchspecs.yaml", PRIMARY);
        let registry = SpecRegistry::new(primary);

        let specs = registry.load().unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs.get("Title").is_some());
        assert_eq!(
            specs.get("Author").unwrap().filter_query.as_deref(),
            Some("format:Book")
        );
        assert!(specs.get("Subject").is_none());
    }

    #[test]
    fn case_insensitive_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_specs(dir.path(), "searchspecs.yaml", PRIMARY);
        let registry = SpecRegistry::new(primary);

        let specs = registry.load().unwrap();
        assert!(specs.get("title").is_some());
        assert!(specs.get("AUTHOR").is_some());
    }

    #[test]
    fn cache_returns_same_arc() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_specs(dir.path(), "searchspecs.yaml", PRIMARY);
        let registry = SpecRegistry::new(primary);

        let first = registry.load().unwrap();
        let second = registry.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn changed_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_specs(dir.path(), "searchspecs.yaml", PRIMARY);
        let registry = SpecRegistry::new(&primary);

        let first = registry.load().unwrap();
        assert_eq!(first.len(), 2);

        // Rewrite with an extra handler. Content length differs, so the
        // fingerprint changes even if the mtime resolution is coarse.
        let extended = format!(
            "{PRIMARY}\nSubject:\n  query_fields:\n    - field: topic\n      specs: [[and, 100]]\n"
        );
        fs::write(&primary, extended).unwrap();

        let second = registry.load().unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.get("Subject").is_some());
    }

    #[test]
    fn override_replaces_handler_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_specs(dir.path(), "searchspecs.yaml", PRIMARY);
        write_specs(
            dir.path(),
            "searchspecs_local.yaml",
            r#"
Author:
  query_fields:
    - field: author_local
      specs: [[and, 50]]
"#,
        );

        let registry = SpecRegistry::new(primary);
        let specs = registry.load().unwrap();

        // The override version of Author has no dismax fields or filter
        // query: the primary definition must not leak through.
        let author = specs.get("Author").unwrap();
        assert!(author.dismax_fields.is_empty());
        assert!(author.filter_query.is_none());
        assert_eq!(author.query_fields.len(), 1);

        // Untouched handlers come from the primary file.
        assert!(specs.get("Title").is_some());
    }

    #[test]
    fn missing_primary_is_an_error() {
        let registry = SpecRegistry::new("/nonexistent/searchspecs.yaml");
        assert!(matches!(registry.load(), Err(SpecError::Stat { .. })));
    }
}
