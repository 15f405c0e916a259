use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Entries to feed into a `Writer`: each input path paired with the member
/// name it should be stored under (the path relative to the input's own
/// parent, so `create ["a/b"]` stores `b/...`, matching `tar`'s behavior).
pub struct Entry {
    pub disk_path: PathBuf,
    pub member_name: String,
}

fn skip(file_name: &str) -> bool {
    file_name == ".DS_Store" || file_name.starts_with("._")
}

/// Walk `inputs`, skipping macOS metadata cruft, and return every regular
/// file and directory found (inputs themselves included).
pub fn walk(inputs: &[PathBuf]) -> Vec<Entry> {
    let mut entries = Vec::new();
    for input in inputs {
        let base_parent = input.parent().unwrap_or(Path::new(""));
        for dent in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let name = dent.file_name().to_string_lossy();
            if skip(&name) {
                continue;
            }
            let rel = dent
                .path()
                .strip_prefix(base_parent)
                .unwrap_or(dent.path())
                .to_string_lossy()
                .replace('\\', "/");
            if rel.is_empty() {
                continue;
            }
            entries.push(Entry {
                disk_path: dent.path().to_path_buf(),
                member_name: rel,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_macos_metadata() {
        assert!(skip(".DS_Store"));
        assert!(skip("._resource"));
        assert!(!skip("normal.txt"));
    }
}
