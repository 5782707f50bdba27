//! # Component Source Parser
//!
//! Scannerless recursive descent over the transformed section source.
//! Operators are matched longest-first so `=`, `==`, `===` and `=>` never
//! shadow each other. Arrow functions are recognised by backtracking: a
//! parenthesised parameter list is attempted and abandoned if no `=>`
//! follows. Semicolons are optional.
//!
//! JSX text follows the usual whitespace rules: lines are trimmed, blank
//! lines dropped, and the rest joined with single spaces.

use std::rc::Rc;

use crate::ast::{
    ArrayItem, BinaryOp, Binding, Declarator, Expr, FunctionBody, FunctionDef, JsxAttr,
    JsxAttrValue, JsxChild, JsxElement, JsxName, LogicalOp, ObjectProp, Pattern, Program,
    PropKey, Stmt, UnaryOp,
};
use crate::error::RenderError;

/// Syntactic nesting limit, independent of the evaluation depth limit.
const MAX_NESTING: usize = 200;

const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "=>", "+=", "-=", "*=",
    "/=", "++", "--", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
    "!", "?", ":", "=", ".", "&", "|",
];

const RESERVED: &[&str] = &[
    "const", "let", "var", "function", "return", "if", "else", "throw", "new", "typeof", "true",
    "false", "null", "class", "for", "while", "do", "switch", "case", "try", "catch", "finally",
    "import", "export", "async", "await", "yield", "with", "delete", "in", "instanceof", "void",
    "debugger", "break", "continue",
];

type PResult<T> = Result<T, RenderError>;

/// Parse a whole program.
pub fn parse_program(src: &str) -> Result<Program, RenderError> {
    let mut parser = Parser {
        src,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_end() {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    // ── Scanning ────────────────────────────────────────────────────

    fn error(&self, message: impl Into<String>) -> RenderError {
        RenderError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("source nested too deeply"));
        }
        Ok(())
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                self.pos += rest[2..].find("*/").map_or(rest.len(), |end| end + 4);
            } else {
                return;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_trivia();
        self.pos >= self.src.len()
    }

    fn raw_eat(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Longest punctuator at the next token position.
    fn punct(&mut self) -> Option<&'static str> {
        self.skip_trivia();
        let rest = self.rest();
        PUNCTUATORS.iter().copied().find(|p| {
            rest.starts_with(p)
                && !(*p == "?."
                    && rest.as_bytes().get(2).is_some_and(|b| b.is_ascii_digit()))
        })
    }

    fn at(&mut self, p: &str) -> bool {
        self.punct() == Some(p)
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.at(p) {
            self.pos += p.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: &str) -> PResult<()> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{p}`")))
        }
    }

    /// The identifier-like word at the next token position, not consumed.
    fn peek_word(&mut self) -> Option<&'a str> {
        self.skip_trivia();
        let rest = self.rest();
        let bytes = rest.as_bytes();
        if !bytes.first().is_some_and(|b| is_ident_start(*b)) {
            return None;
        }
        let len = bytes.iter().take_while(|b| is_ident_part(**b)).count();
        Some(&rest[..len])
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek_word() == Some(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    /// Any identifier-like word, keywords included (property names).
    fn word(&mut self) -> PResult<String> {
        match self.peek_word() {
            Some(word) => {
                self.pos += word.len();
                Ok(word.to_string())
            }
            None => Err(self.error("expected identifier")),
        }
    }

    /// An identifier usable as a binding name.
    fn binding_ident(&mut self) -> PResult<String> {
        match self.peek_word() {
            Some(word) if RESERVED.contains(&word) => {
                Err(self.error(format!("unexpected keyword `{word}`")))
            }
            _ => self.word(),
        }
    }

    // ── Statements ──────────────────────────────────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.depth -= 1;
        stmt
    }

    fn statement_inner(&mut self) -> PResult<Stmt> {
        if self.eat(";") {
            return Ok(Stmt::Empty);
        }
        if self.eat("{") {
            return Ok(Stmt::Block(self.block_rest()?));
        }
        match self.peek_word() {
            Some(kw @ ("const" | "let" | "var")) => {
                self.pos += kw.len();
                let decls = self.declarators()?;
                self.eat(";");
                Ok(Stmt::Const(decls))
            }
            Some("function") => {
                self.pos += "function".len();
                let def = self.function_rest(true)?;
                Ok(Stmt::Function(Rc::new(def)))
            }
            Some("return") => {
                self.pos += "return".len();
                let arg = if self.at(";") || self.at("}") || self.at_end() {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.eat(";");
                Ok(Stmt::Return(arg))
            }
            Some("if") => {
                self.pos += "if".len();
                self.expect("(")?;
                let test = self.expression()?;
                self.expect(")")?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.eat_word("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    then,
                    otherwise,
                })
            }
            Some("throw") => {
                self.pos += "throw".len();
                let arg = self.expression()?;
                self.eat(";");
                Ok(Stmt::Throw(arg))
            }
            Some(
                kw @ ("class" | "for" | "while" | "do" | "switch" | "try" | "import" | "export"
                | "async" | "await" | "yield" | "with" | "debugger" | "break" | "continue"),
            ) => Err(self.error(format!("unsupported syntax `{kw}`"))),
            _ => {
                let expr = self.expression()?;
                self.eat(";");
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Statements up to and including the closing `}`.
    fn block_rest(&mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            if self.eat("}") {
                return Ok(body);
            }
            if self.at_end() {
                return Err(self.error("unterminated block, expected `}`"));
            }
            body.push(self.statement()?);
        }
    }

    fn declarators(&mut self) -> PResult<Vec<Declarator>> {
        let mut decls = Vec::new();
        loop {
            let pattern = self.pattern()?;
            let init = if self.eat("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            decls.push(Declarator { pattern, init });
            if !self.eat(",") {
                return Ok(decls);
            }
        }
    }

    /// After the `function` keyword.
    fn function_rest(&mut self, require_name: bool) -> PResult<FunctionDef> {
        let name = if self.at("(") {
            if require_name {
                return Err(self.error("expected function name"));
            }
            None
        } else {
            Some(self.binding_ident()?)
        };
        self.expect("(")?;
        let params = self.params_rest()?;
        self.expect("{")?;
        let body = self.block_rest()?;
        Ok(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body),
        })
    }

    // ── Patterns ────────────────────────────────────────────────────

    /// Parameters up to and including the closing `)`.
    fn params_rest(&mut self) -> PResult<Vec<Binding>> {
        let mut params = Vec::new();
        loop {
            if self.eat(")") {
                return Ok(params);
            }
            params.push(self.binding()?);
            if !self.eat(",") {
                self.expect(")")?;
                return Ok(params);
            }
        }
    }

    fn binding(&mut self) -> PResult<Binding> {
        let pattern = self.pattern()?;
        let default = if self.eat("=") {
            Some(self.assignment()?)
        } else {
            None
        };
        Ok(Binding { pattern, default })
    }

    fn pattern(&mut self) -> PResult<Pattern> {
        if self.eat("{") {
            let mut props = Vec::new();
            let mut rest = None;
            loop {
                if self.eat("}") {
                    break;
                }
                if self.eat("...") {
                    rest = Some(self.binding_ident()?);
                    self.eat(",");
                    self.expect("}")?;
                    break;
                }
                let key = self.property_name()?;
                let pattern = if self.eat(":") {
                    self.pattern()?
                } else {
                    Pattern::Ident(key.clone())
                };
                let default = if self.eat("=") {
                    Some(self.assignment()?)
                } else {
                    None
                };
                props.push((key, Binding { pattern, default }));
                if !self.eat(",") {
                    self.expect("}")?;
                    break;
                }
            }
            Ok(Pattern::Object { props, rest })
        } else if self.eat("[") {
            let mut items = Vec::new();
            loop {
                if self.eat("]") {
                    break;
                }
                if self.eat(",") {
                    items.push(None);
                    continue;
                }
                items.push(Some(self.binding()?));
                if !self.eat(",") {
                    self.expect("]")?;
                    break;
                }
            }
            Ok(Pattern::Array(items))
        } else {
            Ok(Pattern::Ident(self.binding_ident()?))
        }
    }

    fn property_name(&mut self) -> PResult<String> {
        self.skip_trivia();
        match self.peek_byte() {
            Some(q @ (b'"' | b'\'')) => self.string_literal(q),
            Some(b) if b.is_ascii_digit() => match self.number()? {
                Expr::Number(n) => Ok(crate::value::number_to_string(n)),
                _ => Err(self.error("expected property name")),
            },
            _ => self.word().map_err(|_| self.error("expected property name")),
        }
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        self.enter()?;
        let expr = self.assignment_inner();
        self.depth -= 1;
        expr
    }

    fn assignment_inner(&mut self) -> PResult<Expr> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }
        let target = self.conditional()?;
        let (token, op) = match self.punct() {
            Some("=") => ("=", None),
            Some("+=") => ("+=", Some(BinaryOp::Add)),
            Some("-=") => ("-=", Some(BinaryOp::Sub)),
            Some("*=") => ("*=", Some(BinaryOp::Mul)),
            Some("/=") => ("/=", Some(BinaryOp::Div)),
            _ => return Ok(target),
        };
        let Expr::Ident(name) = target else {
            return Err(self.error("only plain variables can be assigned"));
        };
        self.pos += token.len();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            target: name,
            op,
            value: Box::new(value),
        })
    }

    /// Parse an arrow function if one starts here; otherwise rewind.
    fn try_arrow(&mut self) -> PResult<Option<Expr>> {
        let (start, depth) = (self.pos, self.depth);
        let params = if self.eat("(") {
            match self.params_rest() {
                Ok(params) => params,
                Err(_) => {
                    self.pos = start;
                    self.depth = depth;
                    return Ok(None);
                }
            }
        } else {
            match self.peek_word() {
                Some(word) if !RESERVED.contains(&word) => {
                    self.pos += word.len();
                    vec![Binding {
                        pattern: Pattern::Ident(word.to_string()),
                        default: None,
                    }]
                }
                _ => return Ok(None),
            }
        };
        if !self.eat("=>") {
            self.pos = start;
            self.depth = depth;
            return Ok(None);
        }
        let body = if self.eat("{") {
            FunctionBody::Block(self.block_rest()?)
        } else {
            FunctionBody::Expr(Box::new(self.assignment()?))
        };
        Ok(Some(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
        }))))
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let test = self.logical_or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let then = self.assignment()?;
        self.expect(":")?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Operator chains build left-deep trees; each link counts as one
    /// level of nesting so evaluation and drop recursion stay bounded.
    fn chained<T>(&mut self, f: impl FnOnce(&mut Self, &mut usize) -> PResult<T>) -> PResult<T> {
        let mut links = 0;
        let result = f(self, &mut links);
        self.depth -= links;
        result
    }

    fn link(&mut self, links: &mut usize) -> PResult<()> {
        self.enter()?;
        *links += 1;
        Ok(())
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        self.chained(|p, links| {
            let mut left = p.logical_and()?;
            loop {
                let op = if p.eat("||") {
                    LogicalOp::Or
                } else if p.eat("??") {
                    LogicalOp::Nullish
                } else {
                    return Ok(left);
                };
                p.link(links)?;
                let right = p.logical_and()?;
                left = Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
        })
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        self.chained(|p, links| {
            let mut left = p.equality()?;
            while p.eat("&&") {
                p.link(links)?;
                let right = p.equality()?;
                left = Expr::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
            Ok(left)
        })
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        self.chained(|p, links| {
            let mut left = next(p)?;
            loop {
                let Some(token) = p.punct() else {
                    return Ok(left);
                };
                let Some((_, op)) = ops.iter().find(|(t, _)| *t == token) else {
                    return Ok(left);
                };
                p.pos += token.len();
                p.link(links)?;
                let right = next(p)?;
                left = Expr::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
        })
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNotEq),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                ("<=", BinaryOp::LtEq),
                (">=", BinaryOp::GtEq),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.punct() {
            Some("!") => Some(UnaryOp::Not),
            Some("-") => Some(UnaryOp::Neg),
            Some("+") => Some(UnaryOp::Plus),
            _ => None,
        };
        let op = match op {
            Some(op) => {
                self.pos += 1;
                op
            }
            None if self.eat_word("typeof") => UnaryOp::TypeOf,
            None => return self.postfix(),
        };
        self.enter()?;
        let arg = self.unary();
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            arg: Box::new(arg?),
        })
    }

    fn postfix(&mut self) -> PResult<Expr> {
        self.chained(Self::postfix_chain)
    }

    fn postfix_chain(&mut self, links: &mut usize) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if matches!(self.punct(), Some("." | "?." | "[" | "(")) {
                self.link(links)?;
            }
            match self.punct() {
                Some(".") => {
                    self.pos += 1;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: self.word()?,
                        optional: false,
                    };
                }
                Some("?.") => {
                    self.pos += 2;
                    expr = if self.eat("(") {
                        Expr::Call {
                            callee: Box::new(expr),
                            args: self.arguments_rest()?,
                            optional: true,
                        }
                    } else if self.eat("[") {
                        let index = self.expression()?;
                        self.expect("]")?;
                        Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: true,
                        }
                    } else {
                        Expr::Member {
                            object: Box::new(expr),
                            property: self.word()?,
                            optional: true,
                        }
                    };
                }
                Some("[") => {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: false,
                    };
                }
                Some("(") => {
                    self.pos += 1;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args: self.arguments_rest()?,
                        optional: false,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Call arguments up to and including the closing `)`.
    fn arguments_rest(&mut self) -> PResult<Vec<ArrayItem>> {
        let mut args = Vec::new();
        loop {
            if self.eat(")") {
                return Ok(args);
            }
            if self.eat("...") {
                args.push(ArrayItem::Spread(self.assignment()?));
            } else {
                args.push(ArrayItem::Item(self.assignment()?));
            }
            if !self.eat(",") {
                self.expect(")")?;
                return Ok(args);
            }
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        self.skip_trivia();
        let Some(b) = self.peek_byte() else {
            return Err(self.error("unexpected end of input"));
        };
        match b {
            b'0'..=b'9' => self.number(),
            b'.' if self
                .src
                .as_bytes()
                .get(self.pos + 1)
                .is_some_and(|b| b.is_ascii_digit()) =>
            {
                self.number()
            }
            b'"' | b'\'' => Ok(Expr::Str(self.string_literal(b)?)),
            b'`' => self.template(),
            b'(' => {
                self.pos += 1;
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            b'[' => {
                self.pos += 1;
                self.array_rest()
            }
            b'{' => {
                self.pos += 1;
                self.object_rest()
            }
            b'<' => Ok(Expr::Jsx(Box::new(self.jsx_element()?))),
            b if is_ident_start(b) => {
                let word = self.word()?;
                match word.as_str() {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    "null" => Ok(Expr::Null),
                    "undefined" => Ok(Expr::Undefined),
                    "function" => Ok(Expr::Function(Rc::new(self.function_rest(false)?))),
                    "new" => self.new_rest(),
                    kw if RESERVED.contains(&kw) => {
                        Err(self.error(format!("unexpected keyword `{kw}`")))
                    }
                    _ => Ok(Expr::Ident(word)),
                }
            }
            _ => {
                let found = self.rest().chars().next().unwrap_or(' ');
                Err(self.error(format!("unexpected `{found}`")))
            }
        }
    }

    fn new_rest(&mut self) -> PResult<Expr> {
        let mut callee = self.primary()?;
        while self.eat(".") {
            callee = Expr::Member {
                object: Box::new(callee),
                property: self.word()?,
                optional: false,
            };
        }
        let args = if self.eat("(") {
            self.arguments_rest()?
        } else {
            Vec::new()
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn array_rest(&mut self) -> PResult<Expr> {
        let mut items = Vec::new();
        loop {
            if self.eat("]") {
                return Ok(Expr::Array(items));
            }
            if self.eat(",") {
                items.push(ArrayItem::Item(Expr::Undefined));
                continue;
            }
            if self.eat("...") {
                items.push(ArrayItem::Spread(self.assignment()?));
            } else {
                items.push(ArrayItem::Item(self.assignment()?));
            }
            if !self.eat(",") {
                self.expect("]")?;
                return Ok(Expr::Array(items));
            }
        }
    }

    fn object_rest(&mut self) -> PResult<Expr> {
        let mut props = Vec::new();
        loop {
            if self.eat("}") {
                return Ok(Expr::Object(props));
            }
            if self.eat("...") {
                props.push(ObjectProp::Spread(self.assignment()?));
            } else if self.eat("[") {
                let key = self.assignment()?;
                self.expect("]")?;
                self.expect(":")?;
                let value = self.assignment()?;
                props.push(ObjectProp::KeyValue(PropKey::Computed(key), value));
            } else {
                let key = self.property_name()?;
                let value = if self.eat(":") {
                    self.assignment()?
                } else if self.eat("(") {
                    let params = self.params_rest()?;
                    self.expect("{")?;
                    let body = self.block_rest()?;
                    Expr::Function(Rc::new(FunctionDef {
                        name: Some(key.clone()),
                        params,
                        body: FunctionBody::Block(body),
                    }))
                } else {
                    Expr::Ident(key.clone())
                };
                props.push(ObjectProp::KeyValue(PropKey::Static(key), value));
            }
            if !self.eat(",") {
                self.expect("}")?;
                return Ok(Expr::Object(props));
            }
        }
    }

    // ── Literals ────────────────────────────────────────────────────

    fn number(&mut self) -> PResult<Expr> {
        let start = self.pos;
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            let digits = rest[2..]
                .bytes()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            self.pos += 2 + digits;
            return u64::from_str_radix(&rest[2..2 + digits], 16)
                .map(|n| Expr::Number(n as f64))
                .map_err(|_| self.error("invalid hex literal"));
        }
        let digits = |p: &mut Self| {
            while matches!(p.peek_byte(), Some(b) if b.is_ascii_digit() || b == b'_') {
                p.pos += 1;
            }
        };
        digits(self);
        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            digits(self);
        }
        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            digits(self);
        }
        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        text.parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| self.error(format!("invalid number `{text}`")))
    }

    /// Character after a backslash; `None` for a line continuation.
    fn escape(&mut self) -> PResult<Option<char>> {
        let Some(c) = self.next_char() else {
            return Err(self.error("unterminated escape"));
        };
        let hex = |p: &mut Self, len: usize| -> PResult<char> {
            let digits = p.rest().get(..len).unwrap_or("");
            let code = u32::from_str_radix(digits, 16).map_err(|_| p.error("invalid escape"))?;
            p.pos += len;
            char::from_u32(code).ok_or_else(|| p.error("invalid code point"))
        };
        Ok(Some(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            'x' => hex(self, 2)?,
            'u' if self.raw_eat(b'{') => {
                let len = self.rest().find('}').ok_or_else(|| self.error("invalid escape"))?;
                let c = hex(self, len)?;
                self.pos += 1;
                c
            }
            'u' => hex(self, 4)?,
            '\n' => return Ok(None),
            other => other,
        }))
    }

    fn string_literal(&mut self, quote: u8) -> PResult<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.next_char() {
                None | Some('\n') => return Err(self.error("unterminated string literal")),
                Some(c) if c as u32 == u32::from(quote) => return Ok(out),
                Some('\\') => out.extend(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn template(&mut self) -> PResult<Expr> {
        self.pos += 1;
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        loop {
            if self.rest().starts_with("${") {
                self.pos += 2;
                quasis.push(std::mem::take(&mut current));
                exprs.push(self.expression()?);
                self.expect("}")?;
                continue;
            }
            match self.next_char() {
                None => return Err(self.error("unterminated template literal")),
                Some('`') => {
                    quasis.push(current);
                    return Ok(Expr::Template { quasis, exprs });
                }
                Some('\\') => current.extend(self.escape()?),
                Some(c) => current.push(c),
            }
        }
    }

    // ── JSX ─────────────────────────────────────────────────────────

    fn jsx_element(&mut self) -> PResult<JsxElement> {
        self.enter()?;
        let element = self.jsx_element_inner();
        self.depth -= 1;
        element
    }

    fn jsx_name(&mut self) -> Option<String> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        if !bytes.first().is_some_and(|b| is_ident_start(*b)) {
            return None;
        }
        let len = bytes
            .iter()
            .take_while(|b| is_ident_part(**b) || matches!(b, b'.' | b'-' | b':'))
            .count();
        self.pos += len;
        Some(rest[..len].to_string())
    }

    fn jsx_element_inner(&mut self) -> PResult<JsxElement> {
        self.pos += 1;
        self.skip_ws();
        if self.raw_eat(b'>') {
            let children = self.jsx_children("")?;
            return Ok(JsxElement {
                name: JsxName::Fragment,
                attrs: Vec::new(),
                children,
            });
        }
        let tag = self
            .jsx_name()
            .ok_or_else(|| self.error("expected JSX tag name"))?;
        let mut attrs = Vec::new();
        loop {
            self.skip_trivia();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(JsxElement {
                    name: JsxName::Tag(tag),
                    attrs,
                    children: Vec::new(),
                });
            }
            if self.raw_eat(b'>') {
                break;
            }
            if self.raw_eat(b'{') {
                self.expect("...")?;
                let spread = self.assignment()?;
                self.expect("}")?;
                attrs.push(JsxAttr::Spread(spread));
                continue;
            }
            let name = self
                .jsx_name()
                .ok_or_else(|| self.error(format!("expected attribute or `>` in <{tag}>")))?;
            self.skip_trivia();
            let value = if self.raw_eat(b'=') {
                self.skip_trivia();
                match self.peek_byte() {
                    Some(q @ (b'"' | b'\'')) => JsxAttrValue::Str(self.jsx_attr_string(q)?),
                    Some(b'{') => {
                        self.pos += 1;
                        let expr = self.assignment()?;
                        self.expect("}")?;
                        JsxAttrValue::Expr(expr)
                    }
                    Some(b'<') => JsxAttrValue::Element(Box::new(self.jsx_element()?)),
                    _ => return Err(self.error(format!("expected value for attribute `{name}`"))),
                }
            } else {
                JsxAttrValue::None
            };
            attrs.push(JsxAttr::Named { name, value });
        }
        let children = self.jsx_children(&tag)?;
        Ok(JsxElement {
            name: JsxName::Tag(tag),
            attrs,
            children,
        })
    }

    fn jsx_attr_string(&mut self, quote: u8) -> PResult<String> {
        self.pos += 1;
        let rest = self.rest();
        let end = rest
            .bytes()
            .position(|b| b == quote)
            .ok_or_else(|| self.error("unterminated attribute string"))?;
        self.pos += end + 1;
        Ok(decode_entities(&rest[..end]))
    }

    /// Children up to and including the closing tag for `tag`.
    fn jsx_children(&mut self, tag: &str) -> PResult<Vec<JsxChild>> {
        let mut children = Vec::new();
        loop {
            match self.peek_byte() {
                None => {
                    let name = if tag.is_empty() { "<>" } else { tag };
                    return Err(self.error(format!("unterminated JSX element <{name}>")));
                }
                Some(b'<') if self.rest().starts_with("</") => {
                    self.pos += 2;
                    self.skip_ws();
                    let closing = self.jsx_name().unwrap_or_default();
                    self.skip_ws();
                    if closing != tag {
                        return Err(self.error(format!(
                            "closing tag </{closing}> does not match <{tag}>"
                        )));
                    }
                    if !self.raw_eat(b'>') {
                        return Err(self.error("expected `>`"));
                    }
                    return Ok(children);
                }
                Some(b'<') => children.push(JsxChild::Element(Box::new(self.jsx_element()?))),
                Some(b'{') => {
                    self.pos += 1;
                    if self.eat("}") {
                        continue;
                    }
                    let expr = self.assignment()?;
                    self.expect("}")?;
                    children.push(JsxChild::Expr(expr));
                }
                Some(_) => {
                    let start = self.pos;
                    while !matches!(self.peek_byte(), None | Some(b'<' | b'{')) {
                        self.pos += 1;
                    }
                    if let Some(text) = normalize_jsx_text(&self.src[start..self.pos]) {
                        children.push(JsxChild::Text(text));
                    }
                }
            }
        }
    }
}

/// Collapse JSX text the way JSX compilers do.
fn normalize_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut piece: &str = line;
        if i != 0 {
            piece = piece.trim_start();
        }
        if i != last {
            piece = piece.trim_end();
        }
        if piece.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(piece);
    }
    (!out.is_empty()).then(|| decode_entities(&out))
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                "copy" => Some('©'),
                "mdash" => Some('—'),
                "ndash" => Some('–'),
                "hellip" => Some('…'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(|c: char| c == 'x' || c == 'X') {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expr {
        let program = parse_program(src).unwrap();
        match program.body.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn operators_are_matched_longest_first() {
        assert!(matches!(
            expr("a === b"),
            Expr::Binary { op: BinaryOp::StrictEq, .. }
        ));
        assert!(matches!(
            expr("a <= b"),
            Expr::Binary { op: BinaryOp::LtEq, .. }
        ));
        assert!(matches!(expr("a ?? b"), Expr::Logical { op: LogicalOp::Nullish, .. }));
        assert!(matches!(expr("a ? .5 : 1"), Expr::Conditional { .. }));
        assert!(matches!(expr("a?.b"), Expr::Member { optional: true, .. }));
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        match expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arrows_backtrack_from_parenthesised_expressions() {
        assert!(matches!(expr("(a, b) => a + b"), Expr::Function(_)));
        assert!(matches!(expr("x => x.trim()"), Expr::Function(_)));
        assert!(matches!(expr("(a + b) * 2"), Expr::Binary { op: BinaryOp::Mul, .. }));
        assert!(matches!(expr("(a)"), Expr::Ident(_)));
    }

    #[test]
    fn destructured_params_with_defaults() {
        let program =
            parse_program("const Card = ({ title = \"Untitled\", tags: [first] }) => first;")
                .unwrap();
        let Stmt::Const(decls) = &program.body[0] else {
            panic!("expected const");
        };
        let Some(Expr::Function(def)) = &decls[0].init else {
            panic!("expected arrow");
        };
        let Pattern::Object { props, .. } = &def.params[0].pattern else {
            panic!("expected object pattern");
        };
        assert_eq!(props[0].0, "title");
        assert!(props[0].1.default.is_some());
        assert!(matches!(props[1].1.pattern, Pattern::Array(_)));
    }

    #[test]
    fn jsx_text_is_normalised() {
        let Expr::Jsx(element) = expr("<p>\n   Hello\n   world &amp; all\n</p>") else {
            panic!("expected jsx");
        };
        assert_eq!(
            element.children,
            vec![JsxChild::Text("Hello world & all".into())]
        );
    }

    #[test]
    fn jsx_member_tags_fragments_and_attrs() {
        let Expr::Jsx(element) =
            expr(r#"<><motion.div className="a" hidden {...rest} style={{ top: 1 }} /></>"#)
        else {
            panic!("expected jsx");
        };
        assert_eq!(element.name, JsxName::Fragment);
        let JsxChild::Element(inner) = &element.children[0] else {
            panic!("expected element child");
        };
        assert_eq!(inner.name, JsxName::Tag("motion.div".into()));
        assert_eq!(inner.attrs.len(), 4);
        assert!(matches!(
            inner.attrs[1],
            JsxAttr::Named {
                value: JsxAttrValue::None,
                ..
            }
        ));
        assert!(matches!(inner.attrs[2], JsxAttr::Spread(_)));
    }

    #[test]
    fn template_literals_split_quasis() {
        let Expr::Template { quasis, exprs } = expr("`mailto:${email}!`") else {
            panic!("expected template");
        };
        assert_eq!(quasis, vec!["mailto:".to_string(), "!".to_string()]);
        assert_eq!(exprs, vec![Expr::Ident("email".into())]);
    }

    #[test]
    fn comments_and_optional_semicolons() {
        let program = parse_program(
            "// leading\nconst a = 1 /* inline */\nconst b = 2;;\nrender(<div>{a + b}</div>)",
        )
        .unwrap();
        assert_eq!(program.body.len(), 4);
    }

    #[test]
    fn mismatched_closing_tag_is_a_syntax_error() {
        let err = parse_program("render(<div><span></div></span>)").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { .. }));
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn unsupported_statements_are_rejected() {
        for src in ["class A {}", "for (;;) {}", "while (true) {}"] {
            let err = parse_program(src).unwrap_err();
            assert!(err.to_string().contains("unsupported syntax"), "{src}");
        }
    }

    #[test]
    fn unterminated_input_reports_offset() {
        let err = parse_program("render(<div>").unwrap_err();
        match err {
            RenderError::Syntax { offset, message } => {
                assert_eq!(offset, 12);
                assert!(message.contains("unterminated JSX element"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let src = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        let err = parse_program(&src).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn entities_decode() {
        assert_eq!(decode_entities("a &lt; b &#65; &#x42; &bogus"), "a < b A B &bogus");
    }
}
