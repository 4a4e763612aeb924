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

//! Procedural predicates, dispatched by name and arity before the engine
//! consults the clause database, plus the clause library preloaded into
//! every session.
//!
//! A handler reports failure as `None`; success carries a control word for
//! the engine (`Cut` prunes, `Fail` forces failure, `Not` asks the engine to
//! run a negated sub-proof) and the trail of bindings it made.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use lazy_static::lazy_static;

use crate::arith::{self, Num};
use crate::logic::{AtomTable, Term};
use crate::unification::{resolve, unify, unify_values, Substitution, Trail, Value};

/// Control word returned by a handler to the proof engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    None,
    Fail,
    Cut,
    Not,
}

pub type BuiltinFn =
    fn(&str, &[Rc<Term>], u64, &mut Substitution, &mut AtomTable) -> Option<(Control, Trail)>;

lazy_static! {
    static ref BUILTINS: HashMap<(&'static str, usize), BuiltinFn> = {
        let mut table: HashMap<(&'static str, usize), BuiltinFn> = HashMap::new();
        table.insert(("is", 2), builtin_is as BuiltinFn);
        for &op in ["=:=", "=\\=", "<", ">", "=<", ">="].iter() {
            table.insert((op, 2), builtin_compare);
        }
        table.insert(("==", 2), literal_compare);
        table.insert(("!", 0), builtin_cut);
        table.insert(("fail", 0), builtin_fail);
        table.insert(("\\+", 1), builtin_not);
        table.insert(("atom_chars", 2), builtin_atom_chars);
        table
    };
}

/// Look up the handler for a goal head. A goal is a built-in exactly when
/// its head atom plus arity is a key here.
pub fn lookup(name: &str, arity: usize) -> Option<BuiltinFn> {
    BUILTINS.get(&(name, arity)).copied()
}

/// `is/2`: evaluate the right side arithmetically, unify with the left.
fn builtin_is(
    _name: &str,
    args: &[Rc<Term>],
    base: u64,
    subst: &mut Substitution,
    _atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    let result = arith::eval(&args[1], base, subst)?;
    let lhs = resolve(&args[0], base, subst);
    let trail = unify_values(&lhs, &result.into_value(), subst, false)?;
    Some((Control::None, trail))
}

/// Arithmetic comparison: evaluate both sides, compare integers exactly and
/// anything mixed under IEEE float semantics.
fn builtin_compare(
    name: &str,
    args: &[Rc<Term>],
    base: u64,
    subst: &mut Substitution,
    _atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    let l = arith::eval(&args[0], base, subst)?;
    let r = arith::eval(&args[1], base, subst)?;
    let ord = match (l, r) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
        _ => l.as_f64().partial_cmp(&r.as_f64()),
    };
    let holds = match (name, ord) {
        ("=:=", Some(Ordering::Equal)) => true,
        ("=\\=", Some(o)) => o != Ordering::Equal,
        ("<", Some(Ordering::Less)) => true,
        (">", Some(Ordering::Greater)) => true,
        ("=<", Some(Ordering::Less)) | ("=<", Some(Ordering::Equal)) => true,
        (">=", Some(Ordering::Greater)) | (">=", Some(Ordering::Equal)) => true,
        _ => false,
    };
    if holds {
        Some((Control::None, Vec::new()))
    } else {
        None
    }
}

/// `==/2`: structural identity, a unification pass that never binds.
fn literal_compare(
    _name: &str,
    args: &[Rc<Term>],
    base: u64,
    subst: &mut Substitution,
    _atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    unify(&args[0], &args[1], base, base, subst, true)?;
    Some((Control::None, Vec::new()))
}

fn builtin_cut(
    _name: &str,
    _args: &[Rc<Term>],
    _base: u64,
    _subst: &mut Substitution,
    _atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    Some((Control::Cut, Vec::new()))
}

fn builtin_fail(
    _name: &str,
    _args: &[Rc<Term>],
    _base: u64,
    _subst: &mut Substitution,
    _atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    Some((Control::Fail, Vec::new()))
}

/// `\+/1` only emits the control word; the engine owns the sub-proof.
fn builtin_not(
    _name: &str,
    _args: &[Rc<Term>],
    _base: u64,
    _subst: &mut Substitution,
    _atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    Some((Control::Not, Vec::new()))
}

/// `atom_chars/2`: bridge between an atom and its character list, in
/// whichever direction the instantiation allows.
fn builtin_atom_chars(
    _name: &str,
    args: &[Rc<Term>],
    base: u64,
    subst: &mut Substitution,
    atoms: &mut AtomTable,
) -> Option<(Control, Trail)> {
    let lhs = resolve(&args[0], base, subst);
    if let Value::Struct(t, _) = &lhs {
        if t.arity() == 0 {
            let chars = char_list(&t.atom()?.name, atoms);
            let rhs = resolve(&args[1], base, subst);
            let trail = unify_values(&rhs, &Value::Struct(chars, base), subst, false)?;
            return Some((Control::None, trail));
        }
        return None;
    }
    let text = chars_to_string(&resolve(&args[1], base, subst), subst)?;
    let built = Rc::new(Term::Atom(atoms.atom(&text)));
    let trail = unify_values(&lhs, &Value::Struct(built, base), subst, false)?;
    Some((Control::None, trail))
}

fn char_list(name: &str, atoms: &mut AtomTable) -> Rc<Term> {
    let nil = Rc::new(Term::Atom(atoms.atom("[]")));
    name.chars().rev().fold(nil, |tail, c| {
        let head = Rc::new(Term::Atom(atoms.atom(&c.to_string())));
        Rc::new(Term::Compound(atoms.atom("."), vec![head, tail]))
    })
}

/// Read a ground list of one-character atoms back into a string.
fn chars_to_string(value: &Value, subst: &Substitution) -> Option<String> {
    let mut out = String::new();
    let mut cursor = value.clone();
    loop {
        match cursor {
            Value::Struct(ref t, cell_base) => {
                let head = t.atom()?;
                if head.name == "[]" && t.arity() == 0 {
                    return Some(out);
                }
                if head.name != "." || t.arity() != 2 {
                    return None;
                }
                match resolve(&t.args()[0], cell_base, subst) {
                    Value::Struct(c, _) if c.arity() == 0 => {
                        let name = &c.atom()?.name;
                        if name.chars().count() != 1 {
                            return None;
                        }
                        out.push_str(name);
                    }
                    _ => return None,
                }
                cursor = resolve(&t.args()[1], cell_base, subst);
            }
            _ => return None,
        }
    }
}

/// Clause library consulted into every session before user input, the
/// textbook list predicates plus the atom bridges built on `atom_chars/2`.
pub const PRELUDE: &str = r"
A = A.
member(X, [X | _]).
member(X, [_ | Tail]) :- member(X, Tail).
one_member(X, [X | _]) :- !.
one_member(X, [_ | L]) :- member(X, L).
conc([], L, L).
conc([X | L1], L2, [X | L3]) :- conc(L1, L2, L3).
del(X, [X | Tail], Tail).
del(X, [Y | Tail], [Y | Tail1]) :- del(X, Tail, Tail1).
sublist(S, L) :- conc(_, L2, L), conc(S, _, L2).
insert(X, List, BiggerList) :- del(X, BiggerList, List).
permutation([], []).
permutation([X | L], P) :- permutation(L, L1), insert(X, L1, P).
length([], 0).
length([_ | Tail], N) :- length(Tail, N1), N is 1 + N1.
max(X, Y, X) :- X >= Y, !.
max(_, Y, Y).
true.
different(X, X) :- !, fail.
different(_, _).
not(P) :- P, !, fail.
not(_).
atom_length(Atom, Integer) :- atom_chars(Atom, C), length(C, Integer).
atom_concat(Atom1, Atom2, Atom3) :-
    atom_chars(Atom1, C1), atom_chars(Atom2, C2),
    conc(C1, C2, C3), atom_chars(Atom3, C3).
drop([], _, []).
drop(A, 0, A).
drop([_ | T], N, T2) :- N > 0, N1 is N - 1, drop(T, N1, T2).
take([], _, []).
take(_, 0, []).
take([H | T], N, [H | T2]) :- N > 0, N1 is N - 1, take(T, N1, T2).
droptake(A, N, L, S) :- drop(A, N, A1), take(A1, L, S).
sub_atom(A, N, L, S) :- atom_chars(A, C), droptake(C, N, L, C1), atom_chars(S, C1).
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Context, Var};
    use crate::unification::{render, walk};

    fn var(ctx: &mut Context, name: &str) -> Rc<Term> {
        let local = ctx.vars.get_id(name);
        Rc::new(Term::Var(Var {
            name: name.to_owned(),
            local,
        }))
    }

    fn binop(ctx: &mut Context, op: &str, l: Rc<Term>, r: Rc<Term>) -> Rc<Term> {
        Rc::new(Term::Compound(ctx.atoms.atom(op), vec![l, r]))
    }

    #[test]
    fn dispatch_is_keyed_by_name_and_arity() {
        assert!(lookup("is", 2).is_some());
        assert!(lookup("is", 3).is_none());
        assert!(lookup("member", 2).is_none());
        assert!(lookup("!", 0).is_some());
        assert!(lookup("\\+", 1).is_some());
    }

    #[test]
    fn is_evaluates_and_binds() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let sum = binop(&mut ctx, "+", Rc::new(Term::Int(1)), Rc::new(Term::Float(2.0)));
        let mut subst = Substitution::new();
        let handler = lookup("is", 2).unwrap();
        let (control, trail) =
            handler("is", &[x, sum], 0, &mut subst, &mut ctx.atoms).unwrap();
        assert_eq!(control, Control::None);
        assert_eq!(trail, vec![1]);
        assert!(matches!(walk(1, &subst), Some(Value::Float(f)) if f == 3.0));
    }

    #[test]
    fn is_fails_on_unbound_rhs() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let y = var(&mut ctx, "Y");
        let mut subst = Substitution::new();
        let handler = lookup("is", 2).unwrap();
        assert!(handler("is", &[x, y], 0, &mut subst, &mut ctx.atoms).is_none());
    }

    #[test]
    fn comparison_promotes_mixed_operands() {
        let mut ctx = Context::default();
        let mut subst = Substitution::new();
        let handler = lookup("=:=", 2).unwrap();
        let args = [Rc::new(Term::Int(2)), Rc::new(Term::Float(2.0))];
        assert!(handler("=:=", &args, 0, &mut subst, &mut ctx.atoms).is_some());
        let args = [Rc::new(Term::Int(2)), Rc::new(Term::Int(3))];
        assert!(handler("=:=", &args, 0, &mut subst, &mut ctx.atoms).is_none());
        let handler = lookup("=<", 2).unwrap();
        assert!(handler("=<", &args, 0, &mut subst, &mut ctx.atoms).is_some());
    }

    #[test]
    fn structural_identity_never_binds() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let y = var(&mut ctx, "Y");
        let mut subst = Substitution::new();
        let handler = lookup("==", 2).unwrap();
        assert!(handler("==", &[x.clone(), x.clone()], 0, &mut subst, &mut ctx.atoms).is_some());
        assert!(handler("==", &[x, y], 0, &mut subst, &mut ctx.atoms).is_none());
        assert!(subst.is_empty());
    }

    #[test]
    fn control_words() {
        let mut ctx = Context::default();
        let mut subst = Substitution::new();
        let cut = lookup("!", 0).unwrap()("!", &[], 0, &mut subst, &mut ctx.atoms);
        assert_eq!(cut.unwrap().0, Control::Cut);
        let fail = lookup("fail", 0).unwrap()("fail", &[], 0, &mut subst, &mut ctx.atoms);
        assert_eq!(fail.unwrap().0, Control::Fail);
        let not = lookup("\\+", 1).unwrap();
        let arg = [Rc::new(Term::Int(1))];
        assert_eq!(not("\\+", &arg, 0, &mut subst, &mut ctx.atoms).unwrap().0, Control::Not);
    }

    #[test]
    fn atom_chars_forward() {
        let mut ctx = Context::default();
        let abc = Rc::new(Term::Atom(ctx.atoms.atom("abc")));
        let x = var(&mut ctx, "X");
        let mut subst = Substitution::new();
        let handler = lookup("atom_chars", 2).unwrap();
        let (_, trail) =
            handler("atom_chars", &[abc, x], 0, &mut subst, &mut ctx.atoms).unwrap();
        assert_eq!(trail, vec![1]);
        let bound = walk(1, &subst).unwrap();
        assert_eq!(render(&bound, &subst), "[a, b, c]");
    }

    #[test]
    fn atom_chars_backward() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let nil = Rc::new(Term::Atom(ctx.atoms.atom("[]")));
        let chars = ["c", "b", "a"].iter().fold(nil, |tail, c| {
            let head = Rc::new(Term::Atom(ctx.atoms.atom(c)));
            Rc::new(Term::Compound(ctx.atoms.atom("."), vec![head, tail]))
        });
        let mut subst = Substitution::new();
        let handler = lookup("atom_chars", 2).unwrap();
        let (_, trail) =
            handler("atom_chars", &[x, chars], 0, &mut subst, &mut ctx.atoms).unwrap();
        assert_eq!(trail, vec![1]);
        let bound = walk(1, &subst).unwrap();
        assert_eq!(render(&bound, &subst), "abc");
    }

    #[test]
    fn atom_chars_needs_an_instantiated_side() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let y = var(&mut ctx, "Y");
        let mut subst = Substitution::new();
        let handler = lookup("atom_chars", 2).unwrap();
        assert!(handler("atom_chars", &[x, y], 0, &mut subst, &mut ctx.atoms).is_none());
    }
}
