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

//! The interpreter session: a clause database seeded with the built-in
//! library, fed by a stream of clauses and queries.
//!
//! Clauses accumulate in source order; a query runs against everything
//! consulted before it. A syntax error is reported and parsing resumes at
//! the next top-level `.`, so one bad term never poisons the rest of the
//! input.

use std::io::{self, Write};

use crate::builtin::PRELUDE;
use crate::logic::{Clause, Context};
use crate::parser::{Parser, SyntaxError};
use crate::solve::solve;

pub struct Session {
    ctx: Context,
    clauses: Vec<Clause>,
}

impl Session {
    pub fn new() -> Session {
        let mut session = Session {
            ctx: Context::default(),
            clauses: Vec::new(),
        };
        session
            .load(PRELUDE)
            .expect("the built-in clause library parses");
        session
    }

    fn load(&mut self, source: &str) -> Result<(), SyntaxError> {
        let mut parser = Parser::new(source);
        while let Some(clause) = parser.parse_clause(&mut self.ctx)? {
            self.clauses.push(clause);
        }
        Ok(())
    }

    /// Parse and execute one source. Solutions go to `out`; syntax errors go
    /// to `err` as `<line,column>: Syntax error: <msg>` lines.
    pub fn consult<W: Write, E: Write>(
        &mut self,
        source: &str,
        out: &mut W,
        err: &mut E,
    ) -> io::Result<()> {
        let mut parser = Parser::new(source);
        loop {
            match parser.parse_clause(&mut self.ctx) {
                Ok(Some(clause)) => {
                    self.clauses.push(clause);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    writeln!(err, "{}", e)?;
                    parser.skip_to_period();
                    continue;
                }
            }
            match parser.parse_query(&mut self.ctx) {
                Ok(Some(goals)) => {
                    let nvars = self.ctx.vars.count();
                    solve(&self.clauses, &goals, nvars, &mut self.ctx.atoms, out)?;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    writeln!(err, "{}", e)?;
                    parser.skip_to_period();
                    continue;
                }
            }
            // Neither a clause nor a query starts here: end of input, or a
            // stray token to report and skip.
            match parser.get_token() {
                Ok(None) => return Ok(()),
                Ok(Some(tok)) => {
                    let e = SyntaxError::new(tok.line, tok.column, "unexpected token");
                    writeln!(err, "{}", e)?;
                    parser.skip_to_period();
                }
                Err(e) => {
                    writeln!(err, "{}", e)?;
                    parser.skip_to_period();
                }
            }
        }
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unification::{render, resolve, Substitution};

    fn run(source: &str) -> (Vec<String>, Vec<String>) {
        let mut session = Session::new();
        let mut out = Vec::new();
        let mut err = Vec::new();
        session.consult(source, &mut out, &mut err).unwrap();
        let lines = |bytes: Vec<u8>| {
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };
        (lines(out), lines(err))
    }

    fn solutions(source: &str) -> Vec<String> {
        let (out, err) = run(source);
        assert_eq!(err, Vec::<String>::new());
        out
    }

    #[test]
    fn facts_rule_and_exhaustive_query() {
        let out = solutions(
            "parent(tom,bob). parent(bob,ann). parent(bob,pat).
             grandparent(X,Z) :- parent(X,Y), parent(Y,Z).
             ?- grandparent(tom, G).",
        );
        assert_eq!(out, vec!["G=>ann", "yes", "G=>pat", "yes", "no-more"]);
    }

    #[test]
    fn arithmetic_recursion() {
        let out = solutions(
            "len([], 0). len([_|T], N) :- len(T, M), N is M + 1.
             ?- len([a,b,c,d], L).",
        );
        assert_eq!(out, vec!["L=>4", "yes", "no-more"]);
    }

    #[test]
    fn cut_commits_the_maximum() {
        let out = solutions(
            "max(X,Y,X) :- X >= Y, !. max(_,Y,Y).
             ?- max(3, 7, M).",
        );
        assert_eq!(out, vec!["M=>7", "yes", "no-more"]);
    }

    #[test]
    fn negation_as_failure() {
        let out = solutions("p(1). p(2). p(3). ?- p(X), \\+ X =:= 2.");
        assert_eq!(out, vec!["X=>1", "yes", "X=>3", "yes", "no-more"]);
    }

    #[test]
    fn occurs_check_rejects_cyclic_equation() {
        let out = solutions("?- X = f(X).");
        assert_eq!(out, vec!["no"]);
    }

    #[test]
    fn list_unification_and_printing() {
        let out = solutions("?- [H|T] = [1,2,3].");
        assert_eq!(out, vec!["H=>1", "T=>[2, 3]", "yes", "no-more"]);
    }

    #[test]
    fn preloaded_member_enumerates() {
        let out = solutions("?- member(X, [1, 2, 3]).");
        assert_eq!(
            out,
            vec!["X=>1", "yes", "X=>2", "yes", "X=>3", "yes", "no-more"]
        );
    }

    #[test]
    fn preloaded_negation_library() {
        let out = solutions("?- \\+ member(5, [1,2,3]).");
        assert_eq!(out, vec!["yes", "no-more"]);
        let out = solutions("?- \\+ member(2, [1,2,3]).");
        assert_eq!(out, vec!["no"]);
        let out = solutions("?- not(member(2, [1,2,3])).");
        assert_eq!(out, vec!["no"]);
    }

    #[test]
    fn preloaded_list_predicates() {
        let out = solutions("?- conc([1,2], [3], L).");
        assert_eq!(out, vec!["L=>[1, 2, 3]", "yes", "no-more"]);
        let out = solutions("?- length([a,b], N).");
        assert_eq!(out, vec!["N=>2", "yes", "no-more"]);
        let out = solutions("?- permutation([1,2], P).");
        assert_eq!(
            out,
            vec!["P=>[1, 2]", "yes", "P=>[2, 1]", "yes", "no-more"]
        );
    }

    #[test]
    fn preloaded_atom_predicates() {
        let out = solutions("?- atom_length(hello, N).");
        assert_eq!(out, vec!["N=>5", "yes", "no-more"]);
        let out = solutions("?- atom_concat(foo, bar, X).");
        assert_eq!(out, vec!["X=>foobar", "yes", "no-more"]);
        let out = solutions("?- sub_atom(hello, 1, 3, S).");
        assert_eq!(out, vec!["S=>ell", "yes", "no-more"]);
    }

    #[test]
    fn preloaded_different() {
        assert_eq!(solutions("?- different(a, b)."), vec!["yes", "no-more"]);
        assert_eq!(solutions("?- different(a, a)."), vec!["no"]);
    }

    #[test]
    fn queries_see_only_earlier_clauses() {
        let out = solutions("p(1). ?- p(X). p(2). ?- p(X).");
        assert_eq!(
            out,
            vec!["X=>1", "yes", "no-more", "X=>1", "yes", "X=>2", "yes", "no-more"]
        );
    }

    #[test]
    fn syntax_errors_resynchronize() {
        let (out, err) = run("p(]. q(a). ?- q(X).");
        assert_eq!(out, vec!["X=>a", "yes", "no-more"]);
        assert_eq!(err.len(), 1);
        assert!(err[0].starts_with("<1,"));
        assert!(err[0].contains("Syntax error"));
    }

    #[test]
    fn stray_tokens_are_reported_and_skipped() {
        let (out, err) = run(") . q(a). ?- q(X).");
        assert_eq!(out, vec!["X=>a", "yes", "no-more"]);
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn overflow_is_a_failure_not_a_panic() {
        let out = solutions("?- X is 9223372036854775807 + 1.");
        assert_eq!(out, vec!["no"]);
    }

    #[test]
    fn printed_lists_reparse_to_the_same_term() {
        let mut ctx = Context::default();
        let subst = Substitution::new();
        let term = {
            let mut parser = Parser::new("[1, 2.5, foo]");
            parser.parse_expression(&mut ctx).unwrap().unwrap()
        };
        let printed = render(&resolve(&term, 0, &subst), &subst);
        assert_eq!(printed, "[1, 2.5, foo]");
        let reparsed = {
            let mut parser = Parser::new(&printed);
            parser.parse_expression(&mut ctx).unwrap().unwrap()
        };
        assert_eq!(term.to_string(), reparsed.to_string());
    }
}
