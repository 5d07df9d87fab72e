//! Function registry
//!
//! A fixed palette of pure functions available to globals expressions.
//! Functions receive already-evaluated argument values. Path helpers take
//! the host separator from [`Host`], injected at call time, so tests pin
//! behaviour regardless of platform. `try` is not a function: its arms
//! evaluate lazily, so the evaluator handles it as an expression form.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::value::Value;

/// Host-dependent behaviour injected into path helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    /// Path separator used by `basename` and `dirname`
    pub path_separator: char,
}

impl Host {
    /// The separator of the platform the evaluator runs on
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::unix()
        }
    }

    pub fn unix() -> Self {
        Self {
            path_separator: '/',
        }
    }

    pub fn windows() -> Self {
        Self {
            path_separator: '\\',
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::native()
    }
}

/// Trait for function implementations
pub trait Function: Send + Sync {
    /// Apply the function to evaluated argument values
    fn call(&self, args: &[Value], host: &Host) -> Result<Value>;

    /// Get the name of this function
    fn name(&self) -> &str;
}

/// A simple closure-based function
pub struct FnFunction<F>
where
    F: Fn(&[Value], &Host) -> Result<Value> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnFunction<F>
where
    F: Fn(&[Value], &Host) -> Result<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&[Value], &Host) -> Result<Value> + Send + Sync,
{
    fn call(&self, args: &[Value], host: &Host) -> Result<Value> {
        (self.func)(args, host)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Registry of available functions
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Create a registry with the standard built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_fn("replace", fn_replace);
        registry.register_fn("split", fn_split);
        registry.register_fn("basename", fn_basename);
        registry.register_fn("dirname", fn_dirname);
        registry.register_fn("substr", fn_substr);
        registry
    }

    /// Register a function
    pub fn register(&mut self, function: Arc<dyn Function>) {
        self.functions.insert(function.name().to_string(), function);
    }

    /// Register a closure as a function
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value], &Host) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.register(Arc::new(FnFunction::new(name, func)));
    }

    /// Check if a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Apply a function by name
    pub fn call(&self, name: &str, args: &[Value], host: &Host) -> Result<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| Error::global_eval(format!("unknown function \"{}\"", name)))?;
        function.call(args, host)
    }
}

/// The shared built-in function table
pub fn builtins() -> &'static FunctionRegistry {
    static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::with_builtins);
    &BUILTINS
}

fn want_arity(name: &str, args: &[Value], want: usize) -> Result<()> {
    if args.len() != want {
        return Err(Error::global_eval(format!(
            "{} expects {} arguments, got {}",
            name,
            want,
            args.len()
        )));
    }
    Ok(())
}

fn want_string<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str> {
    args[index].as_str().ok_or_else(|| {
        Error::global_eval(format!(
            "{}: argument {} must be a string, got {}",
            name,
            index + 1,
            args[index].type_name()
        ))
    })
}

fn want_integer(name: &str, args: &[Value], index: usize) -> Result<i64> {
    args[index].as_i64().ok_or_else(|| {
        Error::global_eval(format!(
            "{}: argument {} must be a number, got {}",
            name,
            index + 1,
            args[index].type_name()
        ))
    })
}

/// `replace(s, old, new)`: literal, non-overlapping, left-to-right
fn fn_replace(args: &[Value], _host: &Host) -> Result<Value> {
    want_arity("replace", args, 3)?;
    let s = want_string("replace", args, 0)?;
    let old = want_string("replace", args, 1)?;
    let new = want_string("replace", args, 2)?;
    Ok(Value::String(s.replace(old, new)))
}

/// `split(sep, s)`: list of the substrings between separators
fn fn_split(args: &[Value], _host: &Host) -> Result<Value> {
    want_arity("split", args, 2)?;
    let sep = want_string("split", args, 0)?;
    let s = want_string("split", args, 1)?;
    if sep.is_empty() {
        return Err(Error::global_eval("split: separator cannot be empty"));
    }
    let parts = s
        .split(sep)
        .map(|part| Value::String(part.to_string()))
        .collect();
    Ok(Value::List(parts))
}

/// `basename(p)`: last path element after trimming trailing separators
fn fn_basename(args: &[Value], host: &Host) -> Result<Value> {
    want_arity("basename", args, 1)?;
    let p = want_string("basename", args, 0)?;
    let sep = host.path_separator;

    if p.is_empty() {
        return Ok(Value::String(".".to_string()));
    }
    let trimmed = p.trim_end_matches(sep);
    if trimmed.is_empty() {
        return Ok(Value::String(sep.to_string()));
    }
    let base = match trimmed.rfind(sep) {
        Some(i) => &trimmed[i + sep.len_utf8()..],
        None => trimmed,
    };
    Ok(Value::String(base.to_string()))
}

/// `dirname(p)`: everything before the last path element
fn fn_dirname(args: &[Value], host: &Host) -> Result<Value> {
    want_arity("dirname", args, 1)?;
    let p = want_string("dirname", args, 0)?;
    let sep = host.path_separator;

    if p.is_empty() {
        return Ok(Value::String(".".to_string()));
    }
    let trimmed = p.trim_end_matches(sep);
    if trimmed.is_empty() {
        return Ok(Value::String(sep.to_string()));
    }
    let dir = match trimmed.rfind(sep) {
        None => return Ok(Value::String(".".to_string())),
        Some(i) => trimmed[..i].trim_end_matches(sep),
    };
    if dir.is_empty() {
        return Ok(Value::String(sep.to_string()));
    }
    Ok(Value::String(dir.to_string()))
}

/// `substr(s, offset, length)`: code-point slice; length -1 takes the rest
fn fn_substr(args: &[Value], _host: &Host) -> Result<Value> {
    want_arity("substr", args, 3)?;
    let s = want_string("substr", args, 0)?;
    let offset = want_integer("substr", args, 1)?;
    let length = want_integer("substr", args, 2)?;

    if offset < 0 {
        return Err(Error::global_eval("substr: offset cannot be negative"));
    }
    if length < -1 {
        return Err(Error::global_eval(
            "substr: length must be -1 or non-negative",
        ));
    }

    let chars: Vec<char> = s.chars().collect();
    let offset = offset as usize;
    if offset > chars.len() {
        return Err(Error::global_eval(format!(
            "substr: offset {} is past the end of a {}-character string",
            offset,
            chars.len()
        )));
    }

    let end = if length == -1 {
        chars.len()
    } else {
        offset.saturating_add(length as usize).min(chars.len())
    };
    Ok(Value::String(chars[offset..end].iter().collect()))
}
