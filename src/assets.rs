//! Asset resolver – read-only lookup of the logo and product images under
//! the uploads root.
//!
//! Both lookups walk the tree recursively in a deterministic order (entries
//! of each directory sorted by file name, depth-first) and return the first
//! match. Nothing is cached between calls and nothing is ever written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First `.png` whose file name contains `logo` (case-insensitive).
    pub fn find_logo(&self) -> Option<PathBuf> {
        let found = self.find_first(|name| name.contains("logo"));
        log::debug!("logo lookup under {}: {:?}", self.root.display(), found);
        found
    }

    /// First `.png` whose file name, lowercased with all whitespace removed,
    /// contains `name` normalised the same way.
    ///
    /// An empty name short-circuits without touching the filesystem. A
    /// whitespace-only name normalises to "" and matches the first `.png`.
    pub fn find_product_image(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let needle = normalise(name);
        let found = self.find_first(|file| normalise(file).contains(&needle));
        log::debug!("product image lookup for {name:?}: {found:?}");
        found
    }

    /// Read a resolved asset.
    pub fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn find_first(&self, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
        if !self.root.is_dir() {
            return None;
        }
        find_in(&self.root, &|name: &str| {
            let lower = name.to_lowercase();
            lower.ends_with(".png") && matches(&lower)
        })
    }
}

fn find_in(dir: &Path, matches: &dyn Fn(&str) -> bool) -> Option<PathBuf> {
    let mut entries: Vec<_> = match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(Result::ok).collect(),
        Err(e) => {
            log::warn!("cannot read {}: {e}", dir.display());
            return None;
        }
    };
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if let Some(found) = find_in(&path, matches) {
                return Some(found);
            }
        } else if path.is_file() {
            let name = entry.file_name();
            if matches(&name.to_string_lossy()) {
                return Some(path);
            }
        }
    }
    None
}

fn normalise(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalisation_strips_whitespace_and_case() {
        assert_eq!(normalise(" Product  X\t"), "productx");
    }

    #[test]
    fn missing_root_finds_nothing() {
        let resolver = AssetResolver::new("/definitely/not/here");
        assert_eq!(resolver.find_logo(), None);
        assert_eq!(resolver.find_product_image("anything"), None);
    }

    #[test]
    fn empty_name_finds_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("photo.png"), b"png").unwrap();
        let resolver = AssetResolver::new(dir.path());
        assert_eq!(resolver.find_product_image(""), None);
    }

    #[test]
    fn whitespace_name_matches_the_first_png() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::write(dir.path().join("photo.png"), b"png").unwrap();
        let resolver = AssetResolver::new(dir.path());
        assert_eq!(resolver.find_product_image("   "), Some(dir.path().join("photo.png")));
    }
}
