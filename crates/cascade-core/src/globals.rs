//! Hierarchical globals: merging and evaluation
//!
//! Loading globals for a stack runs in two phases. The merger walks the
//! ancestor chain from the project root down to the stack directory,
//! ingesting every `globals` block on the way: names defined deeper
//! replace names defined shallower, and defining a name twice at one
//! directory level is an error. The evaluator then resolves the surviving
//! expressions on demand, coloring each attribute Pending, InProgress,
//! or Done so reference cycles are caught instead of looping. No partial
//! result ever escapes: evaluation yields the complete final map or an
//! error aggregating every failed attribute.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result, SourceRange};
use crate::expr::{ExprKind, Expression, Reference, Span, TemplatePart};
use crate::functions::{builtins, FunctionRegistry, Host};
use crate::stack::{check_project_root, StackMeta};
use crate::syntax;
use crate::value::Value;

/// The final globals map of one stack: every attribute fully evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct Globals {
    values: IndexMap<String, Value>,
}

impl Globals {
    /// Look up an attribute by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterate attributes in their definition order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The whole map as an object value (for export)
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Export as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_value())
            .map_err(|e| Error::io(format!("serializing globals: {}", e)))
    }

    /// Export as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value())
            .map_err(|e| Error::io(format!("serializing globals: {}", e)))
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

/// Where a globals attribute was defined
#[derive(Debug, Clone)]
struct Origin {
    dir: String,
    file: String,
    span: Span,
}

impl Origin {
    fn range(&self) -> SourceRange {
        SourceRange {
            file: self.file.clone(),
            start_line: self.span.start_line,
            start_column: self.span.start_column,
            end_line: self.span.end_line,
            end_column: self.span.end_column,
        }
    }
}

/// An unevaluated attribute: the expression that survived merging plus
/// the definition site that won
#[derive(Debug, Clone)]
struct GlobalAttr {
    expr: Expression,
    origin: Origin,
}

/// Load and evaluate the globals of one stack
///
/// Uses the built-in function palette and the native host path
/// separator. `project_root` must be absolute; relative roots are
/// rejected before any filesystem access.
pub fn load_stack_globals(project_root: &Path, stack: &StackMeta) -> Result<Globals> {
    load_stack_globals_with(project_root, stack, builtins(), Host::native())
}

/// Load and evaluate the globals of one stack with an explicit function
/// registry and host
pub fn load_stack_globals_with(
    project_root: &Path,
    stack: &StackMeta,
    functions: &FunctionRegistry,
    host: Host,
) -> Result<Globals> {
    check_project_root(project_root)?;
    let attrs = collect_globals(project_root, &stack.path)?;
    Evaluator::new(attrs, stack, functions, host).run()
}

/// The ancestor chain of a stack, root first, stack directory last
fn ancestor_dirs(project_root: &Path, stack_path: &str) -> Vec<(String, PathBuf)> {
    let mut chain = vec![("/".to_string(), project_root.to_path_buf())];
    let mut logical = String::new();
    let mut dir = project_root.to_path_buf();
    for segment in stack_path.split('/').filter(|s| !s.is_empty()) {
        logical.push('/');
        logical.push_str(segment);
        dir = dir.join(segment);
        chain.push((logical.clone(), dir.clone()));
    }
    chain
}

/// Merge the `globals` blocks along the ancestor chain into the
/// unevaluated map: name -> surviving (expression, origin)
fn collect_globals(
    project_root: &Path,
    stack_path: &str,
) -> Result<IndexMap<String, GlobalAttr>> {
    let mut merged: IndexMap<String, GlobalAttr> = IndexMap::new();

    for (logical_dir, dir) in ancestor_dirs(project_root, stack_path) {
        let mut level: IndexMap<String, GlobalAttr> = IndexMap::new();

        for file in syntax::parse_dir(&dir)? {
            for block in file.blocks_named("globals") {
                if !block.labels.is_empty() {
                    return Err(Error::global_parse("globals blocks cannot have labels")
                        .with_range(block_range(&file.filename, block.span)));
                }
                if let Some(nested) = block.blocks.first() {
                    return Err(Error::global_parse(format!(
                        "globals blocks cannot contain blocks, found \"{}\"",
                        nested.name
                    ))
                    .with_range(block_range(&file.filename, nested.span)));
                }

                for attr in &block.attrs {
                    let origin = Origin {
                        dir: logical_dir.clone(),
                        file: file.filename.clone(),
                        span: attr.span,
                    };
                    if let Some(previous) = level.get(&attr.name) {
                        return Err(Error::global_redefined(&attr.name, &logical_dir)
                            .with_range(previous.origin.range())
                            .with_range(origin.range()));
                    }
                    level.insert(
                        attr.name.clone(),
                        GlobalAttr {
                            expr: attr.expr.clone(),
                            origin,
                        },
                    );
                }
            }
        }

        // deeper definitions replace shallower ones
        for (name, attr) in level {
            merged.insert(name, attr);
        }
    }

    Ok(merged)
}

fn block_range(file: &str, span: Span) -> SourceRange {
    SourceRange {
        file: file.to_string(),
        start_line: span.start_line,
        start_column: span.start_column,
        end_line: span.end_line,
        end_column: span.end_column,
    }
}

/// Evaluation state of one attribute
enum State {
    InProgress,
    Done(Value),
    Failed(Error),
}

/// Demand-driven evaluator over the unevaluated globals map
struct Evaluator<'a> {
    attrs: IndexMap<String, GlobalAttr>,
    meta: &'a StackMeta,
    functions: &'a FunctionRegistry,
    host: Host,
    states: HashMap<String, State>,
    /// Names currently being evaluated, outermost first
    gray: Vec<String>,
}

impl<'a> Evaluator<'a> {
    fn new(
        attrs: IndexMap<String, GlobalAttr>,
        meta: &'a StackMeta,
        functions: &'a FunctionRegistry,
        host: Host,
    ) -> Self {
        Self {
            attrs,
            meta,
            functions,
            host,
            states: HashMap::new(),
            gray: Vec::new(),
        }
    }

    /// Evaluate every attribute; either all succeed or every failure is
    /// reported at once
    fn run(mut self) -> Result<Globals> {
        let names: Vec<String> = self.attrs.keys().cloned().collect();
        let mut values = IndexMap::new();
        let mut errors: Vec<Error> = Vec::new();

        for name in names {
            match self.demand(&name) {
                Ok(value) => {
                    values.insert(name, value);
                }
                Err(err) => {
                    // an attribute failing because its dependency failed
                    // reproduces the dependency's error; report it once
                    let duplicate = errors
                        .iter()
                        .any(|e| e.cause == err.cause && e.path == err.path);
                    if !duplicate {
                        errors.push(err);
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(Error::aggregate(errors));
        }
        Ok(Globals { values })
    }

    /// Evaluate `global.<name>`, memoizing the outcome
    fn demand(&mut self, name: &str) -> Result<Value> {
        match self.states.get(name) {
            Some(State::Done(value)) => return Ok(value.clone()),
            Some(State::Failed(err)) => return Err(err.clone()),
            Some(State::InProgress) => {
                let start = self.gray.iter().position(|n| n == name).unwrap_or(0);
                let mut participants: Vec<String> = self.gray[start..].to_vec();
                participants.push(name.to_string());
                return Err(Error::cycle(&participants));
            }
            None => {}
        }

        let Some(attr) = self.attrs.get(name).cloned() else {
            return Err(Error::global_eval(format!("undefined global.{}", name)));
        };

        self.states.insert(name.to_string(), State::InProgress);
        self.gray.push(name.to_string());
        let result = self.eval_expr(&attr.expr).map_err(|err| {
            if err.path.is_none() {
                err.with_path(format!("global.{}", name))
                    .with_range(attr.origin.range())
            } else {
                err
            }
        });
        self.gray.pop();

        match result {
            Ok(value) => {
                self.states
                    .insert(name.to_string(), State::Done(value.clone()));
                Ok(value)
            }
            Err(err) => {
                self.states
                    .insert(name.to_string(), State::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expression) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Reference(reference) => self.eval_reference(reference),
            ExprKind::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                self.functions.call(name, &values, &self.host)
            }
            ExprKind::Template(parts) => self.eval_template(parts),
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::List(values))
            }
            ExprKind::Object(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value_expr) in entries {
                    map.insert(key.clone(), self.eval_expr(value_expr)?);
                }
                Ok(Value::Object(map))
            }
            ExprKind::Index { base, key } => {
                let base = self.eval_expr(base)?;
                let key = self.eval_expr(key)?;
                index_value(&base, &key)
            }
            ExprKind::Try(arms) => {
                if arms.is_empty() {
                    return Err(Error::global_eval("try expects at least one argument"));
                }
                let mut last_err = None;
                for arm in arms {
                    match self.eval_expr(arm) {
                        Ok(value) => return Ok(value),
                        Err(err) => last_err = Some(err),
                    }
                }
                Err(last_err.unwrap())
            }
        }
    }

    fn eval_reference(&mut self, reference: &Reference) -> Result<Value> {
        match reference.root.as_str() {
            "global" => {
                let Some(first) = reference.path.first() else {
                    return Err(Error::global_eval(
                        "incomplete reference: \"global\" needs an attribute name",
                    ));
                };
                let mut value = self.demand(first)?;
                let mut seen = format!("global.{}", first);
                for segment in &reference.path[1..] {
                    value = descend(&value, segment, &seen)?;
                    seen.push('.');
                    seen.push_str(segment);
                }
                Ok(value)
            }
            "cascade" => {
                let Some(first) = reference.path.first() else {
                    return Err(Error::global_eval(
                        "incomplete reference: \"cascade\" needs a field name",
                    ));
                };
                let mut value = self.meta.field(first).ok_or_else(|| {
                    Error::global_eval(format!("unknown stack metadata \"cascade.{}\"", first))
                })?;
                let mut seen = format!("cascade.{}", first);
                for segment in &reference.path[1..] {
                    value = descend(&value, segment, &seen)?;
                    seen.push('.');
                    seen.push_str(segment);
                }
                Ok(value)
            }
            other => Err(Error::global_eval(format!(
                "unknown namespace \"{}\" in reference {}",
                other, reference
            ))),
        }
    }

    /// Template evaluation
    ///
    /// A template that is exactly one `${...}` with no surrounding text
    /// passes the value through with its type intact. Any other shape
    /// stringifies every part; list and object values refuse.
    fn eval_template(&mut self, parts: &[TemplatePart]) -> Result<Value> {
        if let [TemplatePart::Expr(expr)] = parts {
            return self.eval_expr(expr);
        }

        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Expr(expr) => {
                    let value = self.eval_expr(expr)?;
                    out.push_str(&value.stringify()?);
                }
            }
        }
        Ok(Value::String(out))
    }
}

/// Attribute access on an evaluated value
fn descend(value: &Value, segment: &str, seen: &str) -> Result<Value> {
    match value {
        Value::Object(map) => map.get(segment).cloned().ok_or_else(|| {
            Error::global_eval(format!("{} has no attribute \"{}\"", seen, segment))
        }),
        other => Err(Error::global_eval(format!(
            "cannot access \"{}\": {} is a {}, not an object",
            segment,
            seen,
            other.type_name()
        ))),
    }
}

/// `base[key]` on evaluated values
fn index_value(base: &Value, key: &Value) -> Result<Value> {
    match (base, key) {
        (Value::List(items), Value::Integer(i)) => {
            let index = usize::try_from(*i).map_err(|_| {
                Error::global_eval(format!("index {} is negative", i))
            })?;
            items.get(index).cloned().ok_or_else(|| {
                Error::global_eval(format!(
                    "index {} out of range for list of length {}",
                    index,
                    items.len()
                ))
            })
        }
        (Value::List(_), other) => Err(Error::global_eval(format!(
            "lists are indexed by number, got {}",
            other.type_name()
        ))),
        (Value::Object(map), Value::String(k)) => map
            .get(k)
            .cloned()
            .ok_or_else(|| Error::global_eval(format!("object has no attribute \"{}\"", k))),
        (Value::Object(_), other) => Err(Error::global_eval(format!(
            "objects are indexed by string, got {}",
            other.type_name()
        ))),
        (other, _) => Err(Error::global_eval(format!(
            "value of type {} cannot be indexed",
            other.type_name()
        ))),
    }
}
