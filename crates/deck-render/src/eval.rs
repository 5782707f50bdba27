//! # Component Interpreter
//!
//! Tree-walking evaluator for parsed section code. Every evaluation step,
//! call and element is metered against [`RenderLimits`], so a section that
//! loops through recursion or builds an enormous tree fails with a budget
//! error rather than stalling the host.
//!
//! JSX evaluates eagerly to [`UiNode`]s. Intrinsic lowercase tags become
//! elements after their props are filtered (handlers, `ref`, `key` and raw
//! HTML injection are dropped); capitalised tags must resolve to a component
//! defined by the section or to a primitive from the render scope.

use std::collections::BTreeMap;
use std::rc::Rc;

use deck_core::FieldValues;
use serde_json::Value as Json;

use crate::ast::{
    ArrayItem, BinaryOp, Expr, FunctionBody, FunctionDef, JsxAttr, JsxAttrValue, JsxChild,
    JsxElement, JsxName, LogicalOp, ObjectProp, Pattern, Program, PropKey, Stmt, UnaryOp,
};
use crate::error::{RenderError, RenderLimits};
use crate::html::is_event_handler;
use crate::scope;
use crate::ui::{merge_text, UiNode};
use crate::value::{number_to_string, Builtin, Closure, Env, Primitive, Value};

type EvalResult<T> = Result<T, RenderError>;

/// Tags a section may not emit.
pub const FORBIDDEN_TAGS: &[&str] = &[
    "script", "iframe", "frame", "frameset", "object", "embed", "applet", "style", "base", "link",
    "meta",
];

/// Animation props consumed by `motion.*` elements.
const MOTION_PROPS: &[&str] = &[
    "initial",
    "animate",
    "exit",
    "transition",
    "variants",
    "whileHover",
    "whileTap",
    "whileInView",
    "whileFocus",
    "whileDrag",
    "viewport",
    "layout",
    "layoutId",
    "drag",
    "dragConstraints",
];

enum Flow {
    Normal,
    Return(Value),
}

/// One evaluation of one section.
pub struct Interpreter {
    limits: RenderLimits,
    steps: usize,
    nodes: usize,
    output_bytes: usize,
    depth: usize,
    rendered: Option<Value>,
    scopes: Vec<Env>,
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        for env in &self.scopes {
            env.clear();
        }
    }
}

impl Interpreter {
    pub fn new(limits: RenderLimits) -> Self {
        Self {
            limits,
            steps: 0,
            nodes: 0,
            output_bytes: 0,
            depth: 0,
            rendered: None,
            scopes: Vec::new(),
        }
    }

    /// Execute `program` in a fresh render scope and return what it rendered.
    pub fn run(mut self, program: &Program, fields: &FieldValues) -> EvalResult<Vec<UiNode>> {
        let global = self.scope(None);
        scope::install(&global, fields);
        self.exec_block(&program.body, &global)?;

        let rendered = self.rendered.take().ok_or(RenderError::NoRenderCall)?;
        let nodes = match rendered {
            Value::Function(component) => {
                let props = global.lookup(crate::transform::FIELDS_BINDING).unwrap_or_default();
                let output = self.call_closure(&component, vec![props])?;
                self.to_nodes(output)?
            }
            other => self.to_nodes(other)?,
        };
        Ok(merge_text(nodes))
    }

    // ── Metering ────────────────────────────────────────────────────

    fn step(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(RenderError::BudgetExceeded(format!(
                "more than {} evaluation steps",
                self.limits.max_steps
            )));
        }
        Ok(())
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(RenderError::DepthExceeded(self.limits.max_depth));
        }
        Ok(())
    }

    fn count_node(&mut self) -> EvalResult<()> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(RenderError::BudgetExceeded(format!(
                "more than {} UI nodes",
                self.limits.max_nodes
            )));
        }
        Ok(())
    }

    fn scope(&mut self, parent: Option<&Env>) -> Env {
        let env = match parent {
            Some(parent) => parent.child(),
            None => Env::root(),
        };
        self.scopes.push(env.clone());
        env
    }

    // ── Statements ──────────────────────────────────────────────────

    fn exec_block(&mut self, stmts: &[Stmt], env: &Env) -> EvalResult<Flow> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt {
                if let Some(name) = &def.name {
                    env.define(name, self.closure(def, env));
                }
            }
        }
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: &Env) -> EvalResult<Flow> {
        self.step()?;
        match stmt {
            Stmt::Const(decls) => {
                for decl in decls {
                    let value = match &decl.init {
                        Some(init) => self.eval(init, env)?,
                        None => Value::Undefined,
                    };
                    self.bind(&decl.pattern, value, env)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, env)?.truthy() {
                    self.exec_nested(then, env)
                } else if let Some(otherwise) = otherwise {
                    self.exec_nested(otherwise, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Throw(arg) => {
                let value = self.eval(arg, env)?;
                let message = match &value {
                    Value::Object(props) => props
                        .get("message")
                        .map(Value::to_display)
                        .unwrap_or_else(|| value.to_display()),
                    other => other.to_display(),
                };
                Err(RenderError::Thrown(message))
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => {
                let inner = self.scope(Some(env));
                self.exec_block(stmts, &inner)
            }
        }
    }

    fn exec_nested(&mut self, stmt: &Stmt, env: &Env) -> EvalResult<Flow> {
        match stmt {
            Stmt::Block(_) => self.exec(stmt, env),
            other => {
                let inner = self.scope(Some(env));
                self.exec(other, &inner)
            }
        }
    }

    fn bind(&mut self, pattern: &Pattern, value: Value, env: &Env) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(name) => {
                env.define(name, value);
                Ok(())
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(RenderError::Type(format!(
                        "cannot destructure {}",
                        value.describe()
                    )));
                }
                for (key, binding) in props {
                    let mut item = self.property(&value, key)?;
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = &binding.default {
                            item = self.eval(default, env)?;
                        }
                    }
                    self.bind(&binding.pattern, item, env)?;
                }
                if let Some(rest) = rest {
                    let remaining = match &value {
                        Value::Object(map) => map
                            .iter()
                            .filter(|(k, _)| !props.iter().any(|(p, _)| p == *k))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                        _ => BTreeMap::new(),
                    };
                    env.define(rest, Value::object(remaining));
                }
                Ok(())
            }
            Pattern::Array(items) => {
                let values = match &value {
                    Value::Array(values) => values.as_ref().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::str(&c.to_string())).collect(),
                    other => {
                        return Err(RenderError::Type(format!(
                            "{} is not iterable",
                            other.describe()
                        )))
                    }
                };
                for (i, binding) in items.iter().enumerate() {
                    let Some(binding) = binding else { continue };
                    let mut item = values.get(i).cloned().unwrap_or_default();
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = &binding.default {
                            item = self.eval(default, env)?;
                        }
                    }
                    self.bind(&binding.pattern, item, env)?;
                }
                Ok(())
            }
        }
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn closure(&mut self, def: &Rc<FunctionDef>, env: &Env) -> Value {
        Value::Function(Rc::new(Closure {
            def: Rc::clone(def),
            env: env.clone(),
        }))
    }

    fn lookup(&self, name: &str, env: &Env) -> EvalResult<Value> {
        match env.lookup(name) {
            Some(value) => Ok(value),
            None if scope::is_denied(name) => Err(RenderError::CapabilityDenied(format!(
                "`{name}` is not available to sections"
            ))),
            // Fields referenced by the code but missing from the section.
            None => Ok(Value::Undefined),
        }
    }

    fn check_value_bytes(&self, bytes: usize) -> EvalResult<()> {
        if bytes > self.limits.max_value_bytes {
            return Err(RenderError::BudgetExceeded(format!(
                "value larger than {} bytes",
                self.limits.max_value_bytes
            )));
        }
        Ok(())
    }

    fn footprint(&self, value: &Value) -> usize {
        value.footprint(self.limits.max_value_bytes)
    }

    /// Admit a freshly built value, rejecting it if it materializes past
    /// `max_value_bytes`.
    fn guard(&self, value: Value) -> EvalResult<Value> {
        self.check_value_bytes(self.footprint(&value))?;
        Ok(value)
    }

    fn charge_output(&mut self, bytes: usize) -> EvalResult<()> {
        self.output_bytes = self.output_bytes.saturating_add(bytes);
        if self.output_bytes > self.limits.max_output_bytes {
            return Err(RenderError::BudgetExceeded(format!(
                "rendered output larger than {} bytes",
                self.limits.max_output_bytes
            )));
        }
        Ok(())
    }

    /// Binary operator with string concatenation sized before it allocates.
    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
        if op == BinaryOp::Add {
            self.check_value_bytes(self.footprint(left).saturating_add(self.footprint(right)))?;
        }
        Ok(binary(op, left, right))
    }

    fn eval(&mut self, expr: &Expr, env: &Env) -> EvalResult<Value> {
        self.step()?;
        match expr {
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        let value = self.eval(expr, env)?;
                        self.check_value_bytes(out.len().saturating_add(self.footprint(&value)))?;
                        out.push_str(&value.to_display());
                    }
                }
                Ok(Value::str(&out))
            }
            Expr::Ident(name) => self.lookup(name, env),
            Expr::Array(items) => {
                let items = self.eval_items(items, env)?;
                self.guard(Value::array(items))
            }
            Expr::Object(props) => self.eval_object(props, env),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, env)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.property(&object, property)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let object = self.eval(object, env)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = property_key(&self.eval(index, env)?);
                self.property(&object, &key)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, env),
            Expr::New { callee, args } => {
                let target = self.eval(callee, env)?;
                let args = self.eval_items(args, env)?;
                match target {
                    Value::Builtin(Builtin::ErrorCtor) => self.call_builtin(Builtin::ErrorCtor, args),
                    other => Err(RenderError::Type(format!(
                        "`new` is only supported for Error, not {}",
                        other.describe()
                    ))),
                }
            }
            Expr::Unary { op, arg } => {
                if let (UnaryOp::TypeOf, Expr::Ident(name)) = (op, arg.as_ref()) {
                    let value = env.lookup(name).unwrap_or_default();
                    return Ok(Value::str(value.type_of()));
                }
                let value = self.eval(arg, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::str(value.type_of()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                self.binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, env)
                }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, env)?.truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            Expr::Function(def) => Ok(self.closure(def, env)),
            Expr::Jsx(element) => Ok(Value::Nodes(Rc::new(self.eval_jsx(element, env)?))),
            Expr::Assign { target, op, value } => {
                let mut value = self.eval(value, env)?;
                if let Some(op) = op {
                    let current = self.lookup(target, env)?;
                    value = self.binary(*op, &current, &value)?;
                }
                if !env.assign(target, value.clone()) {
                    return Err(RenderError::Type(format!(
                        "assignment to undeclared variable `{target}`"
                    )));
                }
                Ok(value)
            }
        }
    }

    fn eval_items(&mut self, items: &[ArrayItem], env: &Env) -> EvalResult<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ArrayItem::Item(expr) => out.push(self.eval(expr, env)?),
                ArrayItem::Spread(expr) => match self.eval(expr, env)? {
                    Value::Array(values) => out.extend(values.iter().cloned()),
                    Value::Str(s) => out.extend(s.chars().map(|c| Value::str(&c.to_string()))),
                    other => {
                        return Err(RenderError::Type(format!(
                            "{} is not iterable",
                            other.describe()
                        )))
                    }
                },
            }
        }
        Ok(out)
    }

    fn eval_object(&mut self, props: &[ObjectProp], env: &Env) -> EvalResult<Value> {
        let mut out = BTreeMap::new();
        for prop in props {
            match prop {
                ObjectProp::KeyValue(key, expr) => {
                    let key = match key {
                        PropKey::Static(name) => name.clone(),
                        PropKey::Computed(expr) => property_key(&self.eval(expr, env)?),
                    };
                    let value = self.eval(expr, env)?;
                    out.insert(key, value);
                }
                ObjectProp::Spread(expr) => match self.eval(expr, env)? {
                    Value::Object(map) => {
                        out.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    Value::Array(values) => out.extend(
                        values
                            .iter()
                            .enumerate()
                            .map(|(i, v)| (i.to_string(), v.clone())),
                    ),
                    _ => {}
                },
            }
        }
        self.guard(Value::object(out))
    }

    fn property(&self, object: &Value, key: &str) -> EvalResult<Value> {
        Ok(match object {
            Value::Undefined | Value::Null => {
                return Err(RenderError::Type(format!(
                    "cannot read properties of {} (reading '{key}')",
                    object.describe()
                )))
            }
            Value::Str(s) => match key {
                "length" => Value::Number(s.chars().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::str(&c.to_string()))
                    .unwrap_or_default(),
            },
            Value::Array(items) => match key {
                "length" => Value::Number(items.len() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
            },
            Value::Object(map) => map.get(key).cloned().unwrap_or_default(),
            Value::Primitive(Primitive::MotionNamespace) => {
                Value::Primitive(Primitive::Motion(key.to_string()))
            }
            Value::Primitive(Primitive::IconNamespace)
                if key.starts_with(|c: char| c.is_ascii_uppercase()) =>
            {
                Value::Primitive(Primitive::Icon(key.to_string()))
            }
            _ => Value::Undefined,
        })
    }

    // ── Calls ───────────────────────────────────────────────────────

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[ArrayItem],
        optional: bool,
        env: &Env,
    ) -> EvalResult<Value> {
        if let Expr::Member {
            object,
            property,
            optional: member_optional,
        } = callee
        {
            let receiver = self.eval(object, env)?;
            if *member_optional && receiver.is_nullish() {
                return Ok(Value::Undefined);
            }
            let args = self.eval_items(args, env)?;
            if let Some(result) = self.call_method(&receiver, property, &args)? {
                return Ok(result);
            }
            let function = self.property(&receiver, property)?;
            if optional && function.is_nullish() {
                return Ok(Value::Undefined);
            }
            return self.call_value(&function, args, &format!("{}.{property}", label(object)));
        }

        let function = self.eval(callee, env)?;
        if optional && function.is_nullish() {
            return Ok(Value::Undefined);
        }
        let args = self.eval_items(args, env)?;
        self.call_value(&function, args, &label(callee))
    }

    fn call_value(&mut self, function: &Value, args: Vec<Value>, name: &str) -> EvalResult<Value> {
        match function {
            Value::Function(closure) => self.call_closure(closure, args),
            Value::Builtin(builtin) => {
                let value = self.call_builtin(*builtin, args)?;
                self.guard(value)
            }
            Value::Primitive(_) => Err(RenderError::Type(format!(
                "{name} is a component; render it with JSX"
            ))),
            other => Err(RenderError::Type(format!(
                "{name} is not a function ({})",
                other.describe()
            ))),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        self.enter()?;
        let result = self.invoke(closure, args);
        self.depth -= 1;
        result
    }

    fn invoke(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        let env = self.scope(Some(&closure.env));
        let mut args = args.into_iter();
        for param in &closure.def.params {
            let mut value = args.next().unwrap_or_default();
            if matches!(value, Value::Undefined) {
                if let Some(default) = &param.default {
                    value = self.eval(default, &env)?;
                }
            }
            self.bind(&param.pattern, value, &env)?;
        }
        match &closure.def.body {
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &env)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
            FunctionBody::Expr(expr) => self.eval(expr, &env),
        }
    }

    fn call_callback(&mut self, function: &Value, args: Vec<Value>) -> EvalResult<Value> {
        self.call_value(function, args, "callback")
    }

    fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> EvalResult<Value> {
        let first = args.first().cloned().unwrap_or_default();
        let numbers = || args.iter().map(Value::to_number);
        Ok(match builtin {
            Builtin::Render => {
                self.rendered = Some(first);
                Value::Undefined
            }
            Builtin::UseState => {
                let initial = if first.is_callable() {
                    self.call_callback(&first, Vec::new())?
                } else {
                    first
                };
                Value::array(vec![initial, Value::Builtin(Builtin::Noop)])
            }
            Builtin::UseRef => {
                let mut props = BTreeMap::new();
                props.insert("current".to_string(), first);
                Value::object(props)
            }
            Builtin::UseMemo => {
                if first.is_callable() {
                    self.call_callback(&first, Vec::new())?
                } else {
                    Value::Undefined
                }
            }
            Builtin::UseCallback => first,
            Builtin::Noop => Value::Undefined,
            Builtin::MathMax => Value::Number(numbers().fold(f64::NEG_INFINITY, max_js)),
            Builtin::MathMin => Value::Number(numbers().fold(f64::INFINITY, |a, b| -max_js(-a, -b))),
            Builtin::MathRound => Value::Number((first.to_number() + 0.5).floor()),
            Builtin::MathFloor => Value::Number(first.to_number().floor()),
            Builtin::MathCeil => Value::Number(first.to_number().ceil()),
            Builtin::MathAbs => Value::Number(first.to_number().abs()),
            Builtin::ObjectKeys | Builtin::ObjectValues | Builtin::ObjectEntries => {
                let entries: Vec<(String, Value)> = match &first {
                    Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v.clone()))
                        .collect(),
                    _ => Vec::new(),
                };
                Value::array(
                    entries
                        .into_iter()
                        .map(|(k, v)| match builtin {
                            Builtin::ObjectKeys => Value::str(&k),
                            Builtin::ObjectValues => v,
                            _ => Value::array(vec![Value::str(&k), v]),
                        })
                        .collect(),
                )
            }
            Builtin::ArrayIsArray => Value::Bool(matches!(first, Value::Array(_))),
            Builtin::JsonStringify => match first {
                Value::Undefined => Value::Undefined,
                other => Value::str(&other.to_json().to_string()),
            },
            Builtin::StringCtor => Value::str(&first.to_display()),
            Builtin::NumberCtor => Value::Number(first.to_number()),
            Builtin::BooleanCtor => Value::Bool(first.truthy()),
            Builtin::ParseInt => Value::Number(parse_int(&first.to_display())),
            Builtin::ParseFloat => Value::Number(parse_float(&first.to_display())),
            Builtin::ErrorCtor => {
                let message = if first.is_nullish() {
                    String::new()
                } else {
                    first.to_display()
                };
                let mut props = BTreeMap::new();
                props.insert("name".to_string(), Value::str("Error"));
                props.insert("message".to_string(), Value::str(&message));
                Value::object(props)
            }
        })
    }

    // ── Methods ─────────────────────────────────────────────────────

    /// Built-in methods of strings, arrays and numbers. `None` when the
    /// receiver has no such method.
    fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> EvalResult<Option<Value>> {
        let result = match receiver {
            Value::Str(s) => {
                self.check_value_bytes(self.string_method_bytes(s, name, args))?;
                string_method(s, name, args)
            }
            Value::Array(items) => self.array_method(items, name, args)?,
            Value::Number(n) => match name {
                "toFixed" => {
                    let digits = args.first().map_or(0.0, Value::to_number).clamp(0.0, 20.0);
                    Some(Value::str(&format!("{n:.*}", digits as usize)))
                }
                "toString" | "toLocaleString" => Some(Value::str(&number_to_string(*n))),
                _ => None,
            },
            _ => None,
        };
        result.map(|value| self.guard(value)).transpose()
    }

    /// Upper bound on what a string method may allocate, computed before
    /// running it.
    fn string_method_bytes(&self, s: &str, name: &str, args: &[Value]) -> usize {
        let arg_bytes = args
            .iter()
            .fold(0usize, |acc, arg| acc.saturating_add(self.footprint(arg)));
        match name {
            "replaceAll" => {
                let pattern = args.first().map(Value::to_display).unwrap_or_default();
                let replacement = args.get(1).map_or(0, |v| self.footprint(v));
                let hits = if pattern.is_empty() {
                    s.chars().count() + 1
                } else {
                    s.matches(pattern.as_str()).count()
                };
                s.len().saturating_add(hits.saturating_mul(replacement))
            }
            _ => s.len().saturating_add(arg_bytes),
        }
    }

    fn array_method(
        &mut self,
        items: &Rc<Vec<Value>>,
        name: &str,
        args: &[Value],
    ) -> EvalResult<Option<Value>> {
        let first = args.first().cloned().unwrap_or_default();
        let array = Value::Array(Rc::clone(items));
        let each = |this: &mut Self, f: &mut dyn FnMut(usize, Value) -> bool| -> EvalResult<()> {
            for (i, item) in items.iter().enumerate() {
                let result = this.call_callback(
                    &first,
                    vec![item.clone(), Value::Number(i as f64), array.clone()],
                )?;
                if !f(i, result) {
                    break;
                }
            }
            Ok(())
        };

        Ok(Some(match name {
            "map" => {
                let mut out = Vec::with_capacity(items.len());
                each(self, &mut |_, v| {
                    out.push(v);
                    true
                })?;
                Value::array(out)
            }
            "filter" => {
                let mut keep = Vec::new();
                each(self, &mut |i, v| {
                    if v.truthy() {
                        keep.push(i);
                    }
                    true
                })?;
                Value::array(keep.into_iter().map(|i| items[i].clone()).collect())
            }
            "forEach" => {
                each(self, &mut |_, _| true)?;
                Value::Undefined
            }
            "find" | "findIndex" => {
                let mut found = None;
                each(self, &mut |i, v| {
                    if v.truthy() {
                        found = Some(i);
                    }
                    found.is_none()
                })?;
                match (name, found) {
                    ("find", Some(i)) => items[i].clone(),
                    ("find", None) => Value::Undefined,
                    (_, Some(i)) => Value::Number(i as f64),
                    (_, None) => Value::Number(-1.0),
                }
            }
            "some" => {
                let mut any = false;
                each(self, &mut |_, v| {
                    any = v.truthy();
                    !any
                })?;
                Value::Bool(any)
            }
            "every" => {
                let mut all = true;
                each(self, &mut |_, v| {
                    all = v.truthy();
                    all
                })?;
                Value::Bool(all)
            }
            "reduce" => {
                let mut iter = items.iter().enumerate();
                let mut acc = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iter.next() {
                        Some((_, v)) => v.clone(),
                        None => {
                            return Err(RenderError::Type(
                                "reduce of empty array with no initial value".into(),
                            ))
                        }
                    },
                };
                for (i, item) in iter {
                    acc = self.call_callback(
                        &first,
                        vec![acc, item.clone(), Value::Number(i as f64), array.clone()],
                    )?;
                }
                acc
            }
            "join" => {
                let sep = match &first {
                    Value::Undefined => ",".to_string(),
                    other => other.to_display(),
                };
                self.check_value_bytes(
                    self.footprint(&array)
                        .saturating_add(items.len().saturating_mul(sep.len())),
                )?;
                Value::str(
                    &items
                        .iter()
                        .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                        .collect::<Vec<_>>()
                        .join(&sep),
                )
            }
            "includes" => Value::Bool(items.iter().any(|v| same_value_zero(v, &first))),
            "indexOf" => Value::Number(
                items
                    .iter()
                    .position(|v| v.strict_equals(&first))
                    .map_or(-1.0, |i| i as f64),
            ),
            "slice" => {
                let (start, end) = slice_bounds(items.len(), args);
                Value::array(items[start..end].to_vec())
            }
            "concat" => {
                let mut out = items.as_ref().clone();
                for arg in args {
                    match arg {
                        Value::Array(more) => out.extend(more.iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Value::array(out)
            }
            "reverse" => Value::array(items.iter().rev().cloned().collect()),
            "flat" => {
                let mut out = Vec::new();
                for item in items.iter() {
                    match item {
                        Value::Array(inner) => out.extend(inner.iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Value::array(out)
            }
            _ => return Ok(None),
        }))
    }

    // ── JSX ─────────────────────────────────────────────────────────

    fn eval_jsx(&mut self, element: &JsxElement, env: &Env) -> EvalResult<Vec<UiNode>> {
        self.enter()?;
        let nodes = self.eval_jsx_inner(element, env);
        self.depth -= 1;
        nodes
    }

    fn eval_jsx_inner(&mut self, element: &JsxElement, env: &Env) -> EvalResult<Vec<UiNode>> {
        let tag = match &element.name {
            JsxName::Fragment => return self.eval_children(&element.children, env),
            JsxName::Tag(tag) => tag,
        };

        if is_intrinsic(tag) {
            let props = self.eval_props(&element.attrs, env)?;
            let children = self.eval_children(&element.children, env)?;
            return self.intrinsic(tag, props, children, false);
        }

        let mut parts = tag.split('.');
        let head = parts.next().unwrap_or_default();
        let mut target = match env.lookup(head) {
            Some(value) => value,
            None if scope::is_denied(head) => {
                return Err(RenderError::CapabilityDenied(format!(
                    "`{head}` is not available to sections"
                )))
            }
            None => Value::Undefined,
        };
        for part in parts {
            target = if target.is_nullish() {
                Value::Undefined
            } else {
                self.property(&target, part)?
            };
        }

        match target {
            Value::Function(component) => {
                let mut props = self.eval_props(&element.attrs, env)?;
                let children = self.eval_children(&element.children, env)?;
                if !children.is_empty() {
                    props.insert("children".to_string(), Value::Nodes(Rc::new(children)));
                }
                props.remove("key");
                props.remove("ref");
                let output = self.call_closure(&component, vec![Value::object(props)])?;
                self.to_nodes(output)
            }
            Value::Primitive(Primitive::Fragment | Primitive::Passthrough) => {
                self.eval_children(&element.children, env)
            }
            Value::Primitive(Primitive::Motion(inner)) => {
                if !is_intrinsic(&inner) {
                    return Err(RenderError::CapabilityDenied(format!(
                        "unknown component <{tag}>"
                    )));
                }
                let props = self.eval_props(&element.attrs, env)?;
                let children = self.eval_children(&element.children, env)?;
                self.intrinsic(&inner, props, children, true)
            }
            Value::Primitive(Primitive::Icon(name)) => {
                let props = self.eval_props(&element.attrs, env)?;
                self.icon(&name, &props)
            }
            _ => Err(RenderError::CapabilityDenied(format!(
                "unknown component <{tag}>"
            ))),
        }
    }

    fn eval_props(
        &mut self,
        attrs: &[JsxAttr],
        env: &Env,
    ) -> EvalResult<BTreeMap<String, Value>> {
        let mut props = BTreeMap::new();
        for attr in attrs {
            match attr {
                JsxAttr::Named { name, value } => {
                    let value = match value {
                        JsxAttrValue::None => Value::Bool(true),
                        JsxAttrValue::Str(s) => Value::str(s),
                        JsxAttrValue::Expr(expr) => self.eval(expr, env)?,
                        JsxAttrValue::Element(element) => {
                            Value::Nodes(Rc::new(self.eval_jsx(element, env)?))
                        }
                    };
                    props.insert(name.clone(), value);
                }
                JsxAttr::Spread(expr) => match self.eval(expr, env)? {
                    Value::Object(map) => {
                        props.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    Value::Undefined | Value::Null => {}
                    other => {
                        return Err(RenderError::Type(format!(
                            "cannot spread {} into props",
                            other.describe()
                        )))
                    }
                },
            }
        }
        Ok(props)
    }

    fn eval_children(&mut self, children: &[JsxChild], env: &Env) -> EvalResult<Vec<UiNode>> {
        let mut out = Vec::new();
        for child in children {
            match child {
                JsxChild::Text(text) => {
                    self.count_node()?;
                    out.push(UiNode::text(text.clone()));
                }
                JsxChild::Expr(expr) => {
                    let value = self.eval(expr, env)?;
                    out.extend(self.to_nodes(value)?);
                }
                JsxChild::Element(element) => out.extend(self.eval_jsx(element, env)?),
            }
        }
        Ok(out)
    }

    fn intrinsic(
        &mut self,
        tag: &str,
        props: BTreeMap<String, Value>,
        mut children: Vec<UiNode>,
        motion: bool,
    ) -> EvalResult<Vec<UiNode>> {
        if FORBIDDEN_TAGS.contains(&tag) {
            return Err(RenderError::CapabilityDenied(format!(
                "<{tag}> is not allowed in sections"
            )));
        }
        self.count_node()?;
        let mut attrs = BTreeMap::new();
        for (name, value) in props {
            if name == "children" {
                if children.is_empty() {
                    children = self.to_nodes(value)?;
                }
                continue;
            }
            if matches!(name.as_str(), "key" | "ref" | "dangerouslySetInnerHTML")
                || is_event_handler(&name)
                || (motion && MOTION_PROPS.contains(&name.as_str()))
            {
                continue;
            }
            let json = match value {
                Value::Undefined
                | Value::Function(_)
                | Value::Builtin(_)
                | Value::Primitive(_)
                | Value::Nodes(_) => continue,
                other => {
                    let bytes = self.footprint(&other);
                    self.charge_output(name.len().saturating_add(bytes))?;
                    other.to_json()
                }
            };
            if !json.is_null() {
                attrs.insert(name, json);
            }
        }
        Ok(vec![UiNode::element(tag, attrs, merge_text(children))])
    }

    fn icon(&mut self, name: &str, props: &BTreeMap<String, Value>) -> EvalResult<Vec<UiNode>> {
        self.count_node()?;
        let size = props
            .get("size")
            .map(Value::to_json)
            .filter(|v| v.is_number() || v.is_string())
            .unwrap_or_else(|| Json::from(24));
        let mut attrs = BTreeMap::new();
        attrs.insert("data-icon".to_string(), Json::from(kebab(name)));
        attrs.insert("width".to_string(), size.clone());
        attrs.insert("height".to_string(), size);
        attrs.insert("viewBox".to_string(), Json::from("0 0 24 24"));
        attrs.insert("fill".to_string(), Json::from("none"));
        let stroke = props
            .get("color")
            .filter(|v| matches!(v, Value::Str(_)))
            .map_or_else(|| "currentColor".to_string(), Value::to_display);
        attrs.insert("stroke".to_string(), Json::from(stroke));
        attrs.insert("aria-hidden".to_string(), Json::from("true"));
        for key in ["className", "style"] {
            if let Some(value) = props.get(key) {
                let json = value.to_json();
                if !json.is_null() {
                    attrs.insert(key.to_string(), json);
                }
            }
        }
        Ok(vec![UiNode::element("svg", attrs, Vec::new())])
    }

    /// Convert a value in child position to nodes.
    fn to_nodes(&mut self, value: Value) -> EvalResult<Vec<UiNode>> {
        match value {
            Value::Undefined | Value::Null | Value::Bool(_) => Ok(Vec::new()),
            Value::Number(n) => {
                self.count_node()?;
                Ok(vec![UiNode::text(number_to_string(n))])
            }
            Value::Str(s) => {
                self.count_node()?;
                self.charge_output(s.len())?;
                Ok(vec![UiNode::text(s.to_string())])
            }
            Value::Nodes(nodes) => {
                // Markup held in a variable can be placed many times; each
                // placement is a real copy.
                let bytes = nodes
                    .iter()
                    .fold(0usize, |acc, node| acc.saturating_add(node.measure().1));
                self.charge_output(bytes)?;
                Ok(nodes.as_ref().clone())
            }
            Value::Array(items) => {
                let mut out = Vec::new();
                for item in items.iter() {
                    out.extend(self.to_nodes(item.clone())?);
                }
                Ok(out)
            }
            Value::Object(map) => Err(RenderError::Type(format!(
                "objects are not valid as a UI child (found object with keys {{{}}})",
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
            Value::Function(_) | Value::Builtin(_) | Value::Primitive(_) => Err(
                RenderError::Type("functions are not valid as a UI child".into()),
            ),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn is_intrinsic(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn kebab(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn label(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{property}", label(object)),
        _ => "expression".into(),
    }
}

fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => number_to_string(*n),
        other => other.to_display(),
    }
}

fn max_js(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let stringy = |v: &Value| {
        matches!(
            v,
            Value::Str(_) | Value::Array(_) | Value::Object(_) | Value::Nodes(_)
        )
    };
    match op {
        BinaryOp::Add if stringy(left) || stringy(right) => {
            Value::str(&format!("{}{}", left.to_display(), right.to_display()))
        }
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Lt, Some(o)) => o.is_lt(),
                (BinaryOp::LtEq, Some(o)) => o.is_le(),
                (BinaryOp::Gt, Some(o)) => o.is_gt(),
                (_, Some(o)) => o.is_ge(),
            })
        }
    }
}

/// Resolve JS `slice(start, end)` arguments against `len`.
fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let resolve = |arg: Option<&Value>, default: usize| -> usize {
        match arg {
            None | Some(Value::Undefined) => default,
            Some(v) => {
                let n = v.to_number();
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    len.saturating_sub((-n) as usize)
                } else {
                    (n as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<Value> {
    let arg = |i: usize| args.get(i).map(Value::to_display).unwrap_or_default();
    let chars: Vec<char> = s.chars().collect();
    let char_index = |byte: usize| s[..byte].chars().count() as f64;
    Some(match name {
        "toUpperCase" | "toLocaleUpperCase" => Value::str(&s.to_uppercase()),
        "toLowerCase" | "toLocaleLowerCase" => Value::str(&s.to_lowercase()),
        "trim" => Value::str(s.trim()),
        "trimStart" => Value::str(s.trim_start()),
        "trimEnd" => Value::str(s.trim_end()),
        "toString" => Value::str(s),
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::array(vec![Value::str(s)]),
            Some(sep) => {
                let sep = sep.to_display();
                if sep.is_empty() {
                    Value::array(chars.iter().map(|c| Value::str(&c.to_string())).collect())
                } else {
                    Value::array(s.split(sep.as_str()).map(Value::str).collect())
                }
            }
        },
        "includes" => Value::Bool(s.contains(arg(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(arg(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(arg(0).as_str())),
        "indexOf" => Value::Number(s.find(arg(0).as_str()).map_or(-1.0, char_index)),
        "slice" | "substring" => {
            let (start, end) = if name == "substring" {
                let clamp = |i: usize| {
                    args.get(i)
                        .map(Value::to_number)
                        .filter(|n| !n.is_nan())
                        .map(|n| (n.max(0.0) as usize).min(chars.len()))
                };
                let a = clamp(0).unwrap_or(0);
                let b = clamp(1).unwrap_or(chars.len());
                (a.min(b), a.max(b))
            } else {
                slice_bounds(chars.len(), args)
            };
            Value::str(&chars[start..end].iter().collect::<String>())
        }
        "charAt" => {
            let i = args.first().map_or(0.0, Value::to_number);
            let c = (i >= 0.0).then(|| chars.get(i as usize)).flatten();
            Value::str(&c.map(|c| c.to_string()).unwrap_or_default())
        }
        "replace" => Value::str(&s.replacen(arg(0).as_str(), arg(1).as_str(), 1)),
        "replaceAll" => Value::str(&s.replace(arg(0).as_str(), arg(1).as_str())),
        "concat" => Value::str(&format!("{s}{}", (0..args.len()).map(arg).collect::<String>())),
        _ => return None,
    })
}

fn parse_int(s: &str) -> f64 {
    let t = s.trim_start();
    let (sign, digits) = match t.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, t.strip_prefix('+').unwrap_or(t)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<f64>()
        .map_or(f64::NAN, |n| sign * n)
}

fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in t.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => seen_dot = true,
            '-' | '+' if i == 0 => {}
            _ => break,
        }
    }
    t[..end].parse().unwrap_or(f64::NAN)
}
