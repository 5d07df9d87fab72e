//! Stack metadata and project-tree discovery
//!
//! A stack is a directory whose configuration declares a `stack` block.
//! Discovery walks the project tree and yields each stack's metadata:
//! the logical path from the project root, a name (final path segment
//! unless the block overrides it), and a description.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::expr::ExprKind;
use crate::syntax::{self, Block};
use crate::value::Value;

/// Read-only facts about one stack, exposed to expressions as the
/// `cascade` namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMeta {
    /// Logical absolute path from the project root, e.g. `/stacks/web`
    pub path: String,
    /// Stack name; the final path segment unless overridden
    pub name: String,
    /// Free-form description, possibly empty
    pub description: String,
}

impl StackMeta {
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Resolve a metadata field referenced from an expression
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "path" => Some(Value::String(self.path.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "description" => Some(Value::String(self.description.clone())),
            _ => None,
        }
    }
}

/// A discovered stack: its directory on disk plus its metadata
#[derive(Debug, Clone)]
pub struct StackEntry {
    pub dir: PathBuf,
    pub meta: StackMeta,
}

/// Discover every stack under a project root, ordered by logical path
///
/// The root must be an absolute path; relative roots are rejected before
/// any filesystem access. Dot-directories are skipped.
pub fn list_stacks(project_root: &Path) -> Result<Vec<StackEntry>> {
    check_project_root(project_root)?;

    let mut stacks = Vec::new();
    let walker = WalkDir::new(project_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| Error::io(format!("walking project tree: {}", e)))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        if let Some(meta) = stack_meta_of(project_root, dir)? {
            stacks.push(StackEntry {
                dir: dir.to_path_buf(),
                meta,
            });
        }
    }

    stacks.sort_by(|a, b| a.meta.path.cmp(&b.meta.path));
    Ok(stacks)
}

/// Validate a project root path (absolute, no filesystem access)
pub fn check_project_root(project_root: &Path) -> Result<()> {
    if !project_root.is_absolute() {
        return Err(Error::project_root(format!(
            "project root must be an absolute path, got \"{}\"",
            project_root.display()
        )));
    }
    Ok(())
}

/// Logical absolute path of a directory relative to the project root
pub fn logical_path(project_root: &Path, dir: &Path) -> Result<String> {
    let rel = dir.strip_prefix(project_root).map_err(|_| {
        Error::project_root(format!(
            "directory {} is outside the project root {}",
            dir.display(),
            project_root.display()
        ))
    })?;

    let mut logical = String::from("/");
    let mut first = true;
    for component in rel.components() {
        let segment = component.as_os_str().to_string_lossy();
        if !first {
            logical.push('/');
        }
        logical.push_str(&segment);
        first = false;
    }
    Ok(logical)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Read the stack metadata of a directory, if it declares a stack
fn stack_meta_of(project_root: &Path, dir: &Path) -> Result<Option<StackMeta>> {
    let mut stack_block: Option<Block> = None;
    for file in syntax::parse_dir(dir)? {
        for block in file.blocks_named("stack") {
            if stack_block.is_some() {
                return Err(Error::stack_parse(format!(
                    "directory {} declares more than one stack block",
                    dir.display()
                )));
            }
            stack_block = Some(block.clone());
        }
    }

    let Some(block) = stack_block else {
        return Ok(None);
    };

    if !block.labels.is_empty() {
        return Err(Error::stack_parse("stack blocks cannot have labels"));
    }
    if !block.blocks.is_empty() {
        return Err(Error::stack_parse("stack blocks cannot contain blocks"));
    }

    let path = logical_path(project_root, dir)?;
    let default_name = match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => path.clone(),
    };

    let mut name = default_name;
    let mut description = String::new();
    for attr in &block.attrs {
        let text = match &attr.expr.kind {
            ExprKind::Literal(Value::String(s)) => s.clone(),
            _ => {
                return Err(Error::stack_parse(format!(
                    "stack attribute \"{}\" must be a string literal",
                    attr.name
                )))
            }
        };
        match attr.name.as_str() {
            "name" => name = text,
            "description" => description = text,
            other => {
                return Err(Error::stack_parse(format!(
                    "unknown stack attribute \"{}\"",
                    other
                )))
            }
        }
    }

    Ok(Some(StackMeta {
        path,
        name,
        description,
    }))
}
