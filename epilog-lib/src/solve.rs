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

//! Depth-first SLD resolution with explicit choice points.
//!
//! Every goal invocation is a node; a node's children are the solved body
//! goals of the clause it selected. `solve` produces one solution per call
//! and resumes from the most recent choice point on the next call. The trail
//! on each node guarantees its bindings leave the substitution on every path
//! that discards the node.

use std::collections::HashSet;
use std::io::{self, Write};
use std::rc::Rc;

use crate::builtin::{self, Control};
use crate::logic::{scan_vars, AtomTable, Clause, Term};
use crate::unification::{render, resolve, undo, unify, walk, Substitution, Trail, Value};

/// Candidate-iterator sentinel: the node may not select any further clause.
const EXHAUSTED: usize = usize::MAX;

/// Shared proof state: the clause database, the substitution, and the
/// next-free-base counter. Bases only grow within one proof; the trail keeps
/// stale keys out of the substitution, so they never need reclaiming.
struct Machine<'p> {
    clauses: &'p [Clause],
    atoms: &'p mut AtomTable,
    subst: Substitution,
    top: u64,
}

struct Node {
    /// Goal list this node's goal belongs to (query goals or a clause body).
    goals: Rc<Vec<Rc<Term>>>,
    /// Index of the goal under proof.
    goal: usize,
    /// Scope base under which the goal's variables are interpreted.
    base: u64,
    /// Next clause candidate; `EXHAUSTED` after a cut or a built-in step.
    next_clause: usize,
    /// Keys bound by the most recent successful step at this node.
    trail: Trail,
    children: Vec<Node>,
    flags: Control,
}

impl Node {
    fn new(goals: Rc<Vec<Rc<Term>>>, goal: usize, base: u64) -> Node {
        Node {
            goals,
            goal,
            base,
            next_clause: 0,
            trail: Trail::new(),
            children: Vec::new(),
            flags: Control::None,
        }
    }

    /// The pseudo-node driving a goal list: it owns one child per goal as
    /// they are reached and can never step itself.
    fn root(goals: Rc<Vec<Rc<Term>>>, base: u64) -> Node {
        let first = Node::new(goals.clone(), 0, base);
        Node {
            children: vec![first],
            next_clause: EXHAUSTED,
            ..Node::new(goals, 0, base)
        }
    }

    /// Prove or re-prove the subtree at this node. Returns true when a
    /// solution is available; each later call resumes at the most recent
    /// choice point.
    fn solve(&mut self, m: &mut Machine) -> bool {
        loop {
            if self.children.is_empty() {
                undo(&mut m.subst, &self.trail);
                self.trail.clear();
                if !self.try_step(m) {
                    return false;
                }
                if self.children.is_empty() {
                    return true;
                }
            }
            while !self.children.is_empty() {
                let last = self.children.len() - 1;
                if self.children[last].solve(m) {
                    if self.children[last].flags == Control::Cut {
                        // Commit: neither this goal nor the body goals under
                        // it may backtrack into other clauses.
                        for child in &mut self.children {
                            child.next_clause = EXHAUSTED;
                        }
                        self.next_clause = EXHAUSTED;
                    }
                    let tail = &self.children[last];
                    if tail.goal + 1 < tail.goals.len() {
                        let sibling = Node::new(tail.goals.clone(), tail.goal + 1, tail.base);
                        self.children.push(sibling);
                    } else {
                        return true;
                    }
                } else {
                    self.children.pop();
                }
            }
        }
    }

    /// Advance this node by one step: a built-in invocation or the next
    /// clause whose head unifies with the goal.
    fn try_step(&mut self, m: &mut Machine) -> bool {
        if self.next_clause == EXHAUSTED {
            return false;
        }
        let goal = self.goals[self.goal].clone();
        let view = resolve(&goal, self.base, &m.subst);
        if let Value::Struct(t, struct_base) = &view {
            if let Some(handler) = t.atom().and_then(|a| builtin::lookup(&a.name, t.arity())) {
                // Built-ins offer no clause alternatives to come back to.
                self.next_clause = EXHAUSTED;
                let name = t.atom().map(|a| a.name.clone()).unwrap_or_default();
                return match handler(&name, t.args(), *struct_base, &mut m.subst, m.atoms) {
                    None | Some((Control::Fail, _)) => false,
                    Some((Control::Not, _)) => self.negate(t, *struct_base, m),
                    Some((control, trail)) => {
                        self.flags = control;
                        self.trail = trail;
                        true
                    }
                };
            }
        }
        let clauses = m.clauses;
        while self.next_clause < clauses.len() {
            let index = self.next_clause;
            self.next_clause = index + 1;
            let clause = &clauses[index];
            let fresh_base = m.top;
            m.top += clause.nvars;
            if let Some(trail) = unify(
                &clause.head,
                &goal,
                fresh_base,
                self.base,
                &mut m.subst,
                false,
            ) {
                self.trail = trail;
                self.flags = Control::None;
                if !clause.body.is_empty() {
                    self.children
                        .push(Node::new(clause.body.clone(), 0, fresh_base));
                }
                return true;
            }
        }
        false
    }

    /// Negation as failure: prove the argument against a snapshot of the
    /// substitution, then restore the snapshot unconditionally.
    fn negate(&mut self, goal: &Rc<Term>, base: u64, m: &mut Machine) -> bool {
        let saved = m.subst.clone();
        let argument = goal.args()[0].clone();
        let proved = m.prove(argument, base);
        m.subst = saved;
        if proved {
            return false;
        }
        self.flags = Control::None;
        self.trail = Trail::new();
        true
    }
}

impl<'p> Machine<'p> {
    fn prove(&mut self, goal: Rc<Term>, base: u64) -> bool {
        let goals = Rc::new(vec![goal]);
        let mut root = Node::root(goals, base);
        root.solve(self)
    }
}

/// Run a query against the clause database, writing each distinct solution
/// as `Name=>Value` lines followed by `yes`, and closing with `no` (nothing
/// found) or `no-more`.
///
/// `nvars` is the number of variables the query scope allocated; the query
/// itself runs under base 0 and fresh clause activations start above it.
pub fn solve<W: Write>(
    clauses: &[Clause],
    query: &[Rc<Term>],
    nvars: u64,
    atoms: &mut AtomTable,
    out: &mut W,
) -> io::Result<()> {
    let mut named = Vec::new();
    for goal in query {
        scan_vars(goal, 0, &mut named);
    }
    let mut machine = Machine {
        clauses,
        atoms,
        subst: Substitution::new(),
        top: nvars,
    };
    let goals = Rc::new(query.to_vec());
    let mut root = Node::root(goals, 0);
    let mut printed: HashSet<Vec<String>> = HashSet::new();
    while root.solve(&mut machine) {
        let mut lines = Vec::with_capacity(named.len());
        for (key, name) in &named {
            if let Some(value) = walk(*key, &machine.subst) {
                lines.push(format!("{}=>{}", name, render(&value, &machine.subst)));
            }
        }
        // Identical valuations are reported once.
        if !printed.insert(lines.clone()) {
            continue;
        }
        for line in &lines {
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "yes")?;
    }
    if printed.is_empty() {
        writeln!(out, "no")?;
    } else {
        writeln!(out, "no-more")?;
    }
    Ok(())
}
