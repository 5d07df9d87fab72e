//! Error types for cascade
//!
//! Errors are structured: every error carries a kind, optional context
//! (the attribute or config path it relates to), zero or more source
//! ranges, an optional help message, and - for evaluation - a list of
//! related per-attribute errors so callers see every failure at once.

use std::fmt;

/// Result type alias for cascade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cascade operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Attribute or config path the error relates to (e.g. "global.env")
    pub path: Option<String>,
    /// Source ranges pointing into configuration files
    pub ranges: Vec<SourceRange>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
    /// Related sub-errors (per-attribute detail for aggregated failures)
    pub related: Vec<Error>,
}

/// A range in a configuration source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    pub file: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceRange {
    pub fn new(file: impl Into<String>, start_line: usize, start_column: usize) -> Self {
        Self {
            file: file.into(),
            start_line,
            start_column,
            end_line: start_line,
            end_column: start_column,
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_column)
    }
}

/// Categories of errors that can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration file could not be tokenized or parsed
    Syntax,
    /// Structural rejection of a `globals` block (labels, nested blocks)
    GlobalParse,
    /// Same attribute defined by more than one `globals` block at one
    /// directory level
    GlobalRedefined,
    /// Failure while evaluating globals expressions
    GlobalEval,
    /// Structural rejection of a `stack` block
    StackParse,
    /// Project root is unusable (relative path, not a directory)
    ProjectRoot,
    /// Filesystem failure while reading configuration
    Io,
}

impl Error {
    fn new(kind: ErrorKind, cause: Option<String>) -> Self {
        Self {
            kind,
            path: None,
            ranges: Vec::new(),
            help: None,
            cause,
            related: Vec::new(),
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, Some(message.into()))
    }

    /// Create a globals block structural error
    pub fn global_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GlobalParse, Some(message.into()))
    }

    /// Create a redefinition error for a globals attribute
    pub fn global_redefined(name: impl Into<String>, dir: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorKind::GlobalRedefined,
            Some(format!(
                "global \"{}\" defined more than once at {}",
                name,
                dir.into()
            )),
        )
        .with_path(format!("global.{}", name))
        .with_help("each directory level may define a global name only once; move one definition to a deeper directory to override instead")
    }

    /// Create an evaluation error
    pub fn global_eval(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GlobalEval, Some(message.into()))
    }

    /// Create a cycle error naming the participating globals
    pub fn cycle(participants: &[String]) -> Self {
        let chain = participants.join(" -> ");
        Self::new(
            ErrorKind::GlobalEval,
            Some(format!("cyclic reference between globals: {}", chain)),
        )
        .with_help("break the cycle by removing one of the references")
    }

    /// Create a stack block structural error
    pub fn stack_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StackParse, Some(message.into()))
    }

    /// Create a project root error
    pub fn project_root(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProjectRoot, Some(message.into()))
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, Some(message.into()))
    }

    /// Create an aggregate evaluation error from per-attribute errors
    ///
    /// The related list keeps the order the attributes were evaluated in,
    /// so callers see every failure at once in a stable order.
    pub fn aggregate(related: Vec<Error>) -> Self {
        debug_assert!(!related.is_empty());
        if related.len() == 1 {
            return related.into_iter().next().unwrap();
        }
        let mut err = Self::new(
            ErrorKind::GlobalEval,
            Some(format!("{} globals failed to evaluate", related.len())),
        );
        err.related = related;
        err
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a source range to the error
    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.ranges.push(range);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Check the error kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Syntax => write!(f, "syntax error")?,
            ErrorKind::GlobalParse => write!(f, "malformed globals block")?,
            ErrorKind::GlobalRedefined => write!(f, "global redefined")?,
            ErrorKind::GlobalEval => write!(f, "globals evaluation failed")?,
            ErrorKind::StackParse => write!(f, "malformed stack block")?,
            ErrorKind::ProjectRoot => write!(f, "invalid project root")?,
            ErrorKind::Io => write!(f, "I/O error")?,
        }

        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }

        if let Some(path) = &self.path {
            write!(f, "\n  path: {}", path)?;
        }

        for range in &self.ranges {
            write!(f, "\n  at: {}", range)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }

        for sub in &self.related {
            let rendered = sub.to_string();
            for line in rendered.lines() {
                write!(f, "\n    {}", line)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redefined_error_display() {
        let err = Error::global_redefined("env", "/stacks");
        let display = format!("{}", err);

        assert!(display.contains("global redefined"));
        assert!(display.contains("\"env\""));
        assert!(display.contains("/stacks"));
        assert!(display.contains("path: global.env"));
        assert!(display.contains("help:"));
    }

    #[test]
    fn test_cycle_error_display() {
        let err = Error::cycle(&["a".into(), "b".into(), "c".into(), "a".into()]);
        let display = format!("{}", err);

        assert!(display.contains("cyclic reference"));
        assert!(display.contains("a -> b -> c -> a"));
        assert_eq!(err.kind, ErrorKind::GlobalEval);
    }

    #[test]
    fn test_error_with_range() {
        let err = Error::syntax("unexpected token")
            .with_range(SourceRange::new("cascade.cas.hcl", 3, 7));
        let display = format!("{}", err);

        assert!(display.contains("at: cascade.cas.hcl:3:7"));
    }

    #[test]
    fn test_aggregate_flattens_single() {
        let inner = Error::global_eval("undefined global").with_path("global.a");
        let agg = Error::aggregate(vec![inner]);
        assert_eq!(agg.path.as_deref(), Some("global.a"));
        assert!(agg.related.is_empty());
    }

    #[test]
    fn test_aggregate_keeps_detail() {
        let agg = Error::aggregate(vec![
            Error::global_eval("undefined global.x").with_path("global.a"),
            Error::global_eval("undefined global.y").with_path("global.b"),
        ]);
        assert_eq!(agg.kind, ErrorKind::GlobalEval);
        assert_eq!(agg.related.len(), 2);

        let display = format!("{}", agg);
        assert!(display.contains("2 globals failed"));
        assert!(display.contains("global.a"));
        assert!(display.contains("global.b"));
    }
}
