// Copyright 2022 The Epilog Authors

// This file is part of Epilog.

// Epilog is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Epilog is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Epilog.  If not, see <https://www.gnu.org/licenses/>.

//! Lexing and parsing of clauses, queries and terms.
//!
//! The lexer is a set of nom combinators over a located span; tokens carry
//! their line and column for error reporting. On top of the token stream an
//! operator-precedence parser (priority climbing over the standard table,
//! loosest binding first) builds term trees, with `[...]` list sugar
//! desugared to `.`/2 cons cells ending in `[]`.

use std::rc::Rc;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1, take_while_m_n};
use nom::character::complete::{char, digit1, multispace1, not_line_ending};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{pair, tuple};
use nom_locate::LocatedSpan;
use thiserror::Error;

use crate::logic::{Clause, Context, Term, Var};

pub type Span<'a> = LocatedSpan<&'a str>;

type IResult<'a, O> = nom::IResult<Span<'a>, O>;

/// A reported parse error; its display form is the user-facing surface.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("<{line},{column}>: Syntax error: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, column: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokKind {
    Atom(String),
    Var(String),
    Int(i64),
    Float(f64),
    Comma,
    VBar,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Query,
    Rules,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokKind,
    pub line: u32,
    pub column: usize,
}

fn is_period(tok: &Token) -> bool {
    matches!(&tok.kind, TokKind::Atom(name) if name == ".")
}

const SYMBOL_CHARS: &str = "#$&*+-./:<=>?@^~\\";

fn trivia(i: Span) -> IResult<()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('%'), not_line_ending)),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(i)
}

fn decimal(i: Span) -> IResult<TokKind> {
    let (rest, text) = recognize(tuple((opt(char('-')), digit1, char('.'), digit1)))(i)?;
    match text.fragment().parse::<f64>() {
        Ok(v) => Ok((rest, TokKind::Float(v))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Float,
        ))),
    }
}

fn integer(i: Span) -> IResult<TokKind> {
    let (rest, text) = recognize(pair(opt(char('-')), digit1))(i)?;
    match text.fragment().parse::<i64>() {
        Ok(v) => Ok((rest, TokKind::Int(v))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn lower_atom(i: Span) -> IResult<TokKind> {
    let (rest, text) = recognize(pair(
        take_while_m_n(1, 1, |c: char| c.is_ascii_lowercase()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(i)?;
    Ok((rest, TokKind::Atom(text.fragment().to_string())))
}

fn symbolic_atom(i: Span) -> IResult<TokKind> {
    let (rest, text) = take_while1(|c| SYMBOL_CHARS.contains(c))(i)?;
    Ok((rest, TokKind::Atom(text.fragment().to_string())))
}

fn variable(i: Span) -> IResult<TokKind> {
    let (rest, text) = recognize(pair(
        take_while_m_n(1, 1, |c: char| c.is_ascii_uppercase() || c == '_' || c == '$'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
    ))(i)?;
    Ok((rest, TokKind::Var(text.fragment().to_string())))
}

fn escape_char(c: char) -> char {
    match c {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        // covers \\ \' \" \` and leaves unknown escapes unchanged
        other => other,
    }
}

fn quoted_atom(i: Span) -> IResult<TokKind> {
    use nom::InputTake;

    let (body, _) = char('\'')(i)?;
    let mut out = String::new();
    let mut chars = body.fragment().char_indices();
    loop {
        match chars.next() {
            Some((idx, '\'')) => {
                let (rest, _) = body.take_split(idx + 1);
                return Ok((rest, TokKind::Atom(out)));
            }
            Some((_, '\\')) => match chars.next() {
                Some((_, c)) => out.push(escape_char(c)),
                None => break,
            },
            Some((_, c)) => out.push(c),
            None => break,
        }
    }
    Err(nom::Err::Failure(nom::error::Error::new(
        i,
        nom::error::ErrorKind::Char,
    )))
}

// Ordered so that `[]`, `!`, numbers, `?-` and `:-` win over the
// symbolic-atom run that would otherwise swallow their lead characters.
fn token(i: Span) -> IResult<TokKind> {
    alt((
        value(TokKind::Comma, char(',')),
        value(TokKind::VBar, char('|')),
        map(tag("[]"), |_| TokKind::Atom("[]".to_owned())),
        map(char('!'), |_| TokKind::Atom("!".to_owned())),
        value(TokKind::LBracket, char('[')),
        value(TokKind::RBracket, char(']')),
        value(TokKind::LParen, char('(')),
        value(TokKind::RParen, char(')')),
        decimal,
        integer,
        lower_atom,
        value(TokKind::Query, tag("?-")),
        value(TokKind::Rules, tag(":-")),
        symbolic_atom,
        quoted_atom,
        variable,
    ))(i)
}

struct Lexer<'a> {
    rest: Span<'a>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            rest: Span::new(input),
        }
    }

    fn position(&self) -> (u32, usize) {
        (self.rest.location_line(), self.rest.get_column())
    }

    fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        use nom::InputTake;

        if let Ok((rest, ())) = trivia(self.rest) {
            self.rest = rest;
        }
        let fragment = *self.rest.fragment();
        let (line, column) = self.position();
        if fragment.is_empty() {
            return Ok(None);
        }
        if fragment.starts_with("/*") {
            // trivia only skips terminated block comments
            self.rest = self.rest.take_split(fragment.len()).0;
            return Err(SyntaxError::new(line, column, "unterminated comment"));
        }
        match token(self.rest) {
            Ok((rest, kind)) => {
                self.rest = rest;
                Ok(Some(Token { kind, line, column }))
            }
            Err(_) => {
                let message = if fragment.starts_with('\'') {
                    "unterminated quoted atom"
                } else {
                    "unexpected character"
                };
                let width = fragment.chars().next().map_or(0, |c| c.len_utf8());
                self.rest = self.rest.take_split(width).0;
                Err(SyntaxError::new(line, column, message))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assoc {
    Xfx,
    Xfy,
    Yfx,
    Fy,
    Fx,
}

#[derive(Clone, Copy, Debug)]
pub struct Op {
    pub assoc: Assoc,
    pub priority: u32,
}

impl Op {
    fn prefix(self) -> bool {
        matches!(self.assoc, Assoc::Fy | Assoc::Fx)
    }

    fn infix(self) -> bool {
        matches!(self.assoc, Assoc::Xfx | Assoc::Xfy | Assoc::Yfx)
    }

    fn lassoc(self) -> bool {
        self.assoc == Assoc::Yfx
    }

    fn rassoc(self) -> bool {
        self.assoc == Assoc::Xfy
    }

    fn noassoc(self) -> bool {
        matches!(self.assoc, Assoc::Xfx | Assoc::Fx)
    }
}

// The standard table. `:-`, `?-` and `,` are listed for completeness but are
// lexed as punctuation, so expression parsing never reaches them.
const DEFAULT_OPS: &[(&str, Assoc, u32)] = &[
    (":", Assoc::Xfx, 50),
    ("@", Assoc::Xfx, 100),
    ("\\", Assoc::Fy, 200),
    ("-", Assoc::Fy, 200),
    ("^", Assoc::Xfy, 200),
    ("**", Assoc::Xfx, 200),
    ("*", Assoc::Yfx, 400),
    ("/", Assoc::Yfx, 400),
    ("//", Assoc::Yfx, 400),
    ("rem", Assoc::Yfx, 400),
    ("mod", Assoc::Yfx, 400),
    ("<<", Assoc::Yfx, 400),
    (">>", Assoc::Yfx, 400),
    ("+", Assoc::Yfx, 500),
    ("-", Assoc::Yfx, 500),
    ("/\\", Assoc::Yfx, 500),
    ("\\/", Assoc::Yfx, 500),
    ("=", Assoc::Xfx, 700),
    ("\\=", Assoc::Xfx, 700),
    ("==", Assoc::Xfx, 700),
    ("\\==", Assoc::Xfx, 700),
    ("@<", Assoc::Xfx, 700),
    ("@=<", Assoc::Xfx, 700),
    ("@>", Assoc::Xfx, 700),
    ("@>=", Assoc::Xfx, 700),
    ("is", Assoc::Xfx, 700),
    ("=:=", Assoc::Xfx, 700),
    ("=\\=", Assoc::Xfx, 700),
    ("<", Assoc::Xfx, 700),
    ("=<", Assoc::Xfx, 700),
    (">", Assoc::Xfx, 700),
    (">=", Assoc::Xfx, 700),
    ("=..", Assoc::Xfx, 700),
    ("\\+", Assoc::Fy, 900),
    (",", Assoc::Xfy, 1000),
    ("->", Assoc::Xfy, 1050),
    (";", Assoc::Xfy, 1100),
    (":-", Assoc::Fx, 1200),
    (":-", Assoc::Xfx, 1200),
    ("-->", Assoc::Xfx, 1200),
];

/// Operator table: a name may carry one entry per priority (`-` is both
/// prefix at 200 and infix at 500).
pub struct OpTable {
    entries: Vec<(&'static str, Op)>,
    priorities: Vec<u32>,
}

impl Default for OpTable {
    fn default() -> OpTable {
        let entries: Vec<(&'static str, Op)> = DEFAULT_OPS
            .iter()
            .map(|&(name, assoc, priority)| (name, Op { assoc, priority }))
            .collect();
        let mut priorities: Vec<u32> = entries.iter().map(|(_, op)| op.priority).collect();
        priorities.sort_unstable_by(|a, b| b.cmp(a));
        priorities.dedup();
        OpTable {
            entries,
            priorities,
        }
    }
}

impl OpTable {
    fn get(&self, name: &str, priority: u32) -> Option<Op> {
        self.entries
            .iter()
            .find(|(n, op)| *n == name && op.priority == priority)
            .map(|(_, op)| *op)
    }

    fn loosest(&self) -> u32 {
        self.priorities[0]
    }

    fn next_tighter(&self, priority: u32) -> Option<u32> {
        self.priorities.iter().copied().find(|&p| p < priority)
    }
}

enum InfixStep {
    Continue(Rc<Term>),
    Done(Rc<Term>),
}

/// Pull-based parser over the token stream. The interpreter context is
/// passed into each entry point; variable ids come from its scope, which
/// `parse_clause`/`parse_query` reset so each clause gets a dense private id
/// range.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pushback: Vec<Token>,
    ops: OpTable,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(input),
            pushback: Vec::new(),
            ops: OpTable::default(),
        }
    }

    pub(crate) fn get_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        if let Some(tok) = self.pushback.pop() {
            return Ok(Some(tok));
        }
        self.lexer.next_token()
    }

    fn push(&mut self, tok: Token) {
        self.pushback.push(tok);
    }

    fn expected(&self, tok: Option<Token>, message: &str) -> SyntaxError {
        match tok {
            Some(t) => SyntaxError::new(t.line, t.column, message),
            None => {
                let (line, column) = self.lexer.position();
                SyntaxError::new(line, column, message)
            }
        }
    }

    /// Discard tokens through the next top-level `.` so one malformed term
    /// does not poison the rest of the input.
    pub fn skip_to_period(&mut self) {
        loop {
            match self.get_token() {
                Ok(Some(t)) if is_period(&t) => return,
                Ok(Some(_)) => {}
                Ok(None) => return,
                Err(_) => {}
            }
        }
    }

    pub fn parse_expression(&mut self, ctx: &mut Context) -> Result<Option<Rc<Term>>, SyntaxError> {
        let loosest = self.ops.loosest();
        self.parse_exp(ctx, loosest)
    }

    fn parse_exp(
        &mut self,
        ctx: &mut Context,
        priority: u32,
    ) -> Result<Option<Rc<Term>>, SyntaxError> {
        let mut exp = match self.try_prefix(ctx, priority)? {
            Some((term, continues)) => {
                if !continues {
                    return Ok(Some(term));
                }
                term
            }
            None => match self.parse_exp_next(ctx, priority)? {
                Some(term) => term,
                None => return Ok(None),
            },
        };
        loop {
            match self.try_infix(ctx, priority, exp)? {
                InfixStep::Continue(term) => exp = term,
                InfixStep::Done(term) => return Ok(Some(term)),
            }
        }
    }

    /// A prefix operator at this priority, if the next token is one. The
    /// returned flag says whether the infix loop at this level still runs
    /// (`fy` continues, `fx` does not).
    fn try_prefix(
        &mut self,
        ctx: &mut Context,
        priority: u32,
    ) -> Result<Option<(Rc<Term>, bool)>, SyntaxError> {
        let tok = match self.get_token()? {
            Some(t) => t,
            None => return Ok(None),
        };
        if let TokKind::Atom(name) = &tok.kind {
            if let Some(op) = self.ops.get(name, priority) {
                if op.prefix() {
                    let operand = if op.noassoc() {
                        self.parse_exp_next(ctx, priority)?
                    } else {
                        self.parse_exp(ctx, priority)?
                    };
                    let arg = operand.ok_or_else(|| {
                        SyntaxError::new(tok.line, tok.column, "expression expected")
                    })?;
                    let atom = ctx.atoms.atom(name);
                    let term = Rc::new(Term::Compound(atom, vec![arg]));
                    return Ok(Some((term, !op.noassoc())));
                }
            }
        }
        self.push(tok);
        Ok(None)
    }

    fn try_infix(
        &mut self,
        ctx: &mut Context,
        priority: u32,
        lhs: Rc<Term>,
    ) -> Result<InfixStep, SyntaxError> {
        let tok = match self.get_token()? {
            Some(t) => t,
            None => return Ok(InfixStep::Done(lhs)),
        };
        if let TokKind::Atom(name) = &tok.kind {
            if let Some(op) = self.ops.get(name, priority) {
                if op.infix() {
                    let rhs = if op.rassoc() {
                        self.parse_exp(ctx, priority)?
                    } else {
                        self.parse_exp_next(ctx, priority)?
                    };
                    let arg = rhs.ok_or_else(|| {
                        SyntaxError::new(tok.line, tok.column, "expression expected")
                    })?;
                    let atom = ctx.atoms.atom(name);
                    let term = Rc::new(Term::Compound(atom, vec![lhs, arg]));
                    return Ok(if op.lassoc() {
                        InfixStep::Continue(term)
                    } else {
                        InfixStep::Done(term)
                    });
                }
            }
        }
        self.push(tok);
        Ok(InfixStep::Done(lhs))
    }

    fn parse_exp_next(
        &mut self,
        ctx: &mut Context,
        priority: u32,
    ) -> Result<Option<Rc<Term>>, SyntaxError> {
        if let Some(next) = self.ops.next_tighter(priority) {
            return self.parse_exp(ctx, next);
        }
        match self.get_token()? {
            Some(tok) if tok.kind == TokKind::LParen => {
                let inner = self.parse_expression(ctx)?;
                match self.get_token()? {
                    Some(t) if t.kind == TokKind::RParen => Ok(inner),
                    t => Err(self.expected(t, ") expected")),
                }
            }
            Some(tok) => {
                self.push(tok);
                self.parse_term(ctx)
            }
            None => Ok(None),
        }
    }

    pub fn parse_term(&mut self, ctx: &mut Context) -> Result<Option<Rc<Term>>, SyntaxError> {
        let tok = match self.get_token()? {
            Some(t) => t,
            None => return Ok(None),
        };
        match &tok.kind {
            TokKind::LBracket => self.parse_list(ctx).map(Some),
            TokKind::Float(d) => Ok(Some(Rc::new(Term::Float(*d)))),
            TokKind::Int(i) => Ok(Some(Rc::new(Term::Int(*i)))),
            TokKind::Atom(name) => {
                let atom = ctx.atoms.atom(name);
                match self.get_token()? {
                    Some(next) if next.kind == TokKind::LParen => {
                        let args = self.expression_list(ctx)?;
                        if args.is_empty() {
                            return Err(SyntaxError::new(next.line, next.column, "term expected"));
                        }
                        match self.get_token()? {
                            Some(t) if t.kind == TokKind::RParen => {
                                Ok(Some(Rc::new(Term::Compound(atom, args))))
                            }
                            t => Err(self.expected(t, ") expected")),
                        }
                    }
                    Some(next) => {
                        self.push(next);
                        Ok(Some(Rc::new(Term::Atom(atom))))
                    }
                    None => Ok(Some(Rc::new(Term::Atom(atom)))),
                }
            }
            TokKind::Var(name) => {
                let local = ctx.vars.get_id(name);
                Ok(Some(Rc::new(Term::Var(Var {
                    name: name.clone(),
                    local,
                }))))
            }
            _ => {
                self.push(tok);
                Ok(None)
            }
        }
    }

    fn parse_list(&mut self, ctx: &mut Context) -> Result<Rc<Term>, SyntaxError> {
        let head = match self.parse_expression(ctx)? {
            Some(h) => h,
            None => {
                let t = self.get_token()?;
                return Err(self.expected(t, "list parsing error"));
            }
        };
        let tail = match self.get_token()? {
            Some(t) if t.kind == TokKind::RBracket => Rc::new(Term::Atom(ctx.atoms.atom("[]"))),
            Some(t) if t.kind == TokKind::VBar => {
                let tail = self
                    .parse_expression(ctx)?
                    .ok_or_else(|| SyntaxError::new(t.line, t.column, "expression expected"))?;
                match self.get_token()? {
                    Some(r) if r.kind == TokKind::RBracket => tail,
                    r => return Err(self.expected(r, "] expected")),
                }
            }
            Some(t) if t.kind == TokKind::Comma => self.parse_list(ctx)?,
            t => return Err(self.expected(t, "] expected")),
        };
        let cons = ctx.atoms.atom(".");
        Ok(Rc::new(Term::Compound(cons, vec![head, tail])))
    }

    /// Comma-separated expressions; empty only when the first item is
    /// already missing.
    fn expression_list(&mut self, ctx: &mut Context) -> Result<Vec<Rc<Term>>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            match self.parse_expression(ctx)? {
                Some(e) => items.push(e),
                None => {
                    if items.is_empty() {
                        return Ok(items);
                    }
                    let t = self.get_token()?;
                    return Err(self.expected(t, "extra comma at the end"));
                }
            }
            match self.get_token()? {
                Some(t) if t.kind == TokKind::Comma => {}
                Some(t) => {
                    self.push(t);
                    return Ok(items);
                }
                None => return Ok(items),
            }
        }
    }

    fn expect_period(&mut self, message: &str) -> Result<(), SyntaxError> {
        match self.get_token()? {
            Some(t) if is_period(&t) => Ok(()),
            t => Err(self.expected(t, message)),
        }
    }

    /// One clause, or `None` when the input continues with something that is
    /// not a clause (a query, or end of input).
    pub fn parse_clause(&mut self, ctx: &mut Context) -> Result<Option<Clause>, SyntaxError> {
        ctx.vars.clear();
        let head = match self.parse_expression(ctx)? {
            Some(h) => h,
            None => return Ok(None),
        };
        if head.atom().is_none() {
            let t = self.get_token()?;
            return Err(self.expected(t, "predicate expected"));
        }
        let tok = self.get_token()?;
        match tok {
            Some(ref t) if is_period(t) => Ok(Some(Clause::new(head, Vec::new()))),
            Some(ref t) if t.kind == TokKind::Rules => {
                let body = self.expression_list(ctx)?;
                if body.is_empty() {
                    return Err(SyntaxError::new(t.line, t.column, "rule body expected"));
                }
                self.expect_period(". expected")?;
                Ok(Some(Clause::new(head, body)))
            }
            t => Err(self.expected(t, ". or :- expected")),
        }
    }

    /// A `?- G1, ..., Gn.` query, or `None` when the next token does not
    /// start one.
    pub fn parse_query(&mut self, ctx: &mut Context) -> Result<Option<Vec<Rc<Term>>>, SyntaxError> {
        let tok = match self.get_token()? {
            Some(t) => t,
            None => return Ok(None),
        };
        if tok.kind != TokKind::Query {
            self.push(tok);
            return Ok(None);
        }
        ctx.vars.clear();
        let goals = self.expression_list(ctx)?;
        if goals.is_empty() {
            return Err(SyntaxError::new(
                tok.line,
                tok.column,
                "at least 1 goal is expected after ?-",
            ));
        }
        self.expect_period("missing .")?;
        Ok(Some(goals))
    }
}
