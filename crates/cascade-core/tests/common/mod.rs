//! Sandbox project trees for end-to-end tests
//!
//! Builds a throwaway project under the system temp directory from a
//! compact layout description: `"s:stacks/stack-1"` creates a stack
//! directory (optionally `"s:path:description=text"`), `"d:path"` a
//! plain directory. Configuration is appended file by file, so a test
//! can pile several `globals` blocks into one file or spread them over
//! many.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use cascade_core::syntax::DEFAULT_FILENAME;

pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir().join(format!(
            "cascade-sandbox-{}-{}",
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build directories and stacks from layout entries
    pub fn build_tree(&self, layout: &[&str]) {
        for entry in layout {
            match entry.split_once(':') {
                Some(("s", rest)) => {
                    let (path, description) = match rest.split_once(':') {
                        Some((path, extra)) => {
                            let description = extra
                                .strip_prefix("description=")
                                .unwrap_or_else(|| panic!("bad layout entry: {}", entry));
                            (path, Some(description))
                        }
                        None => (rest, None),
                    };
                    self.create_stack(path, description);
                }
                Some(("d", path)) => {
                    std::fs::create_dir_all(self.root.join(path)).unwrap();
                }
                _ => panic!("bad layout entry: {}", entry),
            }
        }
    }

    fn create_stack(&self, rel: &str, description: Option<&str>) {
        let dir = self.root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        let block = match description {
            Some(text) => format!("stack {{\n  description = \"{}\"\n}}\n", text),
            None => "stack {\n}\n".to_string(),
        };
        self.append(rel, DEFAULT_FILENAME, &block);
    }

    /// Append configuration to a file in a directory (created if needed)
    pub fn append(&self, rel_dir: &str, filename: &str, body: &str) {
        let dir = self.root.join(rel_dir.trim_start_matches('/'));
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(filename))
            .unwrap();
        writeln!(file, "{}", body).unwrap();
    }

    /// Append configuration to the conventional file of a directory
    pub fn append_config(&self, rel_dir: &str, body: &str) {
        self.append(rel_dir, DEFAULT_FILENAME, body);
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}
