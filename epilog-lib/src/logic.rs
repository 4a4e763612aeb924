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

//! Logical structures shared by the parser and the proof engine: terms,
//! clauses, and the id allocators that scope atoms and variables.
//!
//! Terms are immutable trees behind `Rc` handles; the evaluator never deep
//! copies them. Variables carry a clause-local id which the engine shifts by
//! a per-instantiation base, so two activations of the same clause never
//! share a variable key.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

/// Interned id of a symbolic constant.
pub type AtomId = u64;

/// A variable key in the substitution: clause-local id plus scope base.
pub type VarKey = u64;

/// A symbolic constant. Identity is the interned id; the name is kept on the
/// term so rendering needs no table lookup.
#[derive(Clone, Debug)]
pub struct Atom {
    pub id: AtomId,
    pub name: String,
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Atom {}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A named variable with its clause-local id.
///
/// Every occurrence of `_` allocates a distinct id, so wildcards never alias.
#[derive(Clone, Debug, PartialEq)]
pub struct Var {
    pub name: String,
    pub local: u64,
}

impl Var {
    pub fn is_wildcard(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Atom(Atom),
    Int(i64),
    Float(f64),
    Var(Var),
    Compound(Atom, Vec<Rc<Term>>),
}

impl Term {
    /// The atom at the head of an atomic or compound term.
    pub fn atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(a) | Term::Compound(a, _) => Some(a),
            _ => None,
        }
    }

    pub fn var(&self) -> Option<&Var> {
        match self {
            Term::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Rc<Term>] {
        match self {
            Term::Compound(_, args) => args,
            _ => &[],
        }
    }

    pub fn arity(&self) -> usize {
        self.args().len()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(a) => write!(f, "{}", a),
            Term::Int(i) => write!(f, "{}", i),
            Term::Float(d) => write!(f, "{:?}", d),
            Term::Var(v) => write!(f, "{}", v.name),
            Term::Compound(a, args) => {
                write!(f, "{}({})", a, args.iter().format(", "))
            }
        }
    }
}

/// A definite clause: a fact (empty body) or a rule. `nvars` is the largest
/// clause-local variable id in head or body, used to size the scope region a
/// fresh instantiation claims.
#[derive(Clone, Debug)]
pub struct Clause {
    pub head: Rc<Term>,
    pub body: Rc<Vec<Rc<Term>>>,
    pub nvars: u64,
}

impl Clause {
    pub fn new(head: Rc<Term>, body: Vec<Rc<Term>>) -> Clause {
        let nvars = body
            .iter()
            .fold(max_local(&head), |mx, goal| mx.max(max_local(goal)));
        Clause {
            head,
            body: Rc::new(body),
            nvars,
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fact() {
            write!(f, "{}.", self.head)
        } else {
            write!(f, "{} :- {}.", self.head, self.body.iter().format(", "))
        }
    }
}

fn max_local(term: &Term) -> u64 {
    match term {
        Term::Var(v) => v.local,
        Term::Compound(_, args) => args.iter().map(|a| max_local(a)).max().unwrap_or(0),
        _ => 0,
    }
}

/// Collect the named variables of a query in first-occurrence order, keyed
/// by their scoped ids. Wildcards are skipped; solutions never report them.
pub fn scan_vars(term: &Rc<Term>, base: u64, vars: &mut Vec<(VarKey, String)>) {
    match &**term {
        Term::Var(v) => {
            if v.is_wildcard() {
                return;
            }
            let key = base + v.local;
            if !vars.iter().any(|(k, _)| *k == key) {
                vars.push((key, v.name.clone()));
            }
        }
        Term::Compound(_, args) => {
            for arg in args {
                scan_vars(arg, base, vars);
            }
        }
        _ => {}
    }
}

/// Atom interner. Ids start at 1 and never recycle.
#[derive(Default)]
pub struct AtomTable {
    ids: HashMap<String, AtomId>,
    next: AtomId,
}

impl AtomTable {
    pub fn intern(&mut self, name: &str) -> AtomId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        self.next += 1;
        self.ids.insert(name.to_owned(), self.next);
        self.next
    }

    pub fn atom(&mut self, name: &str) -> Atom {
        Atom {
            id: self.intern(name),
            name: name.to_owned(),
        }
    }
}

/// Per-clause variable id allocator. Ids are dense within one clause; the
/// parser clears the scope before each clause or query.
#[derive(Default)]
pub struct VarScope {
    ids: HashMap<String, u64>,
    next: u64,
}

impl VarScope {
    pub fn clear(&mut self) {
        self.ids.clear();
        self.next = 0;
    }

    pub fn get_id(&mut self, name: &str) -> u64 {
        if name == "_" {
            self.next += 1;
            return self.next;
        }
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        self.next += 1;
        self.ids.insert(name.to_owned(), self.next);
        self.next
    }

    /// Number of variables allocated in the current scope.
    pub fn count(&self) -> u64 {
        self.next
    }
}

/// Shared interpreter state threaded through the parser and the engine
/// instead of living in process-wide singletons.
#[derive(Default)]
pub struct Context {
    pub atoms: AtomTable,
    pub vars: VarScope,
}
