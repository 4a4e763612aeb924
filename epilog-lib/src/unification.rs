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

//! First-order unification with occurs check over scoped variables, plus the
//! substitution map it reads and writes and the renderer that reports bound
//! terms back to the user.
//!
//! A successful unification returns the trail: the list of variable keys it
//! bound. Undoing a trail restores the substitution exactly, which is what
//! the proof engine relies on when it backtracks.

use std::collections::HashMap;
use std::rc::Rc;

use crate::logic::{Term, VarKey};

/// A term resolved against the substitution: either a primitive, a structure
/// (atom or compound) interpreted under a scope base, or a still-unbound
/// variable.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Float(f64),
    Struct(Rc<Term>, u64),
    Unbound(Rc<Term>, u64),
}

impl Value {
    /// The substitution key of an unbound variable view.
    pub fn key(&self) -> Option<VarKey> {
        match self {
            Value::Unbound(t, base) => t.var().map(|v| base + v.local),
            _ => None,
        }
    }

    fn is_wildcard(&self) -> bool {
        match self {
            Value::Unbound(t, _) => t.var().map_or(false, |v| v.is_wildcard()),
            _ => false,
        }
    }
}

/// Sparse variable binding map. A key is bound at most once at a time;
/// rebinding requires removal through the trail first.
pub type Substitution = HashMap<VarKey, Value>;

/// Keys bound since a checkpoint, in binding order.
pub type Trail = Vec<VarKey>;

/// Follow variable chains from `key` to a non-variable value or the last
/// unbound variable. Returns `None` when `key` itself is unbound.
///
/// Terminates because the occurs check keeps the substitution acyclic.
pub fn walk(key: VarKey, subst: &Substitution) -> Option<Value> {
    let value = subst.get(&key)?;
    if let Some(next) = value.key() {
        return walk(next, subst).or_else(|| Some(value.clone()));
    }
    Some(value.clone())
}

/// Build the resolved view of a term under a scope base.
pub fn resolve(term: &Rc<Term>, base: u64, subst: &Substitution) -> Value {
    match &**term {
        Term::Int(i) => Value::Int(*i),
        Term::Float(d) => Value::Float(*d),
        Term::Var(v) => {
            walk(base + v.local, subst).unwrap_or_else(|| Value::Unbound(term.clone(), base))
        }
        _ => Value::Struct(term.clone(), base),
    }
}

fn insert(subst: &mut Substitution, key: VarKey, value: Value) {
    let prev = subst.insert(key, value);
    debug_assert!(prev.is_none(), "variable key {} bound twice", key);
}

/// Remove every key of a trail segment from the substitution.
pub fn undo(subst: &mut Substitution, trail: &[VarKey]) {
    for key in trail {
        let prev = subst.remove(key);
        debug_assert!(prev.is_some(), "trail key {} was not bound", key);
    }
}

/// Does `key` occur anywhere inside `value` after walking?
fn occurs(key: VarKey, value: &Value, subst: &Substitution) -> bool {
    match value {
        Value::Int(_) | Value::Float(_) => false,
        Value::Unbound(..) => value.key() == Some(key),
        Value::Struct(t, base) => t
            .args()
            .iter()
            .any(|child| occurs(key, &resolve(child, *base, subst), subst)),
    }
}

/// Attempt to make two terms equal under the current substitution.
///
/// On success the returned trail lists the keys bound; on failure the
/// substitution is left untouched. With `compare_only` the same traversal
/// runs without ever binding: two unbound variables are identical exactly
/// when their keys match.
pub fn unify(
    a: &Rc<Term>,
    b: &Rc<Term>,
    base_a: u64,
    base_b: u64,
    subst: &mut Substitution,
    compare_only: bool,
) -> Option<Trail> {
    let va = resolve(a, base_a, subst);
    let vb = resolve(b, base_b, subst);
    unify_values(&va, &vb, subst, compare_only)
}

/// Unification over resolved views; this is the entry point built-ins use
/// when one side is a computed primitive rather than a source term.
pub fn unify_values(
    a: &Value,
    b: &Value,
    subst: &mut Substitution,
    compare_only: bool,
) -> Option<Trail> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => (x == y).then(Vec::new),
        (Value::Float(x), Value::Float(y)) => (x == y).then(Vec::new),
        (Value::Unbound(..), _) => bind(a, b, subst, compare_only),
        (_, Value::Unbound(..)) => bind(b, a, subst, compare_only),
        (Value::Struct(ta, base_a), Value::Struct(tb, base_b)) => {
            let (ha, hb) = (ta.atom()?, tb.atom()?);
            if ha.id != hb.id || ta.arity() != tb.arity() {
                return None;
            }
            let mut trail = Trail::new();
            for (ca, cb) in ta.args().iter().zip(tb.args()) {
                match unify(ca, cb, *base_a, *base_b, subst, compare_only) {
                    Some(segment) => trail.extend(segment),
                    None => {
                        undo(subst, &trail);
                        return None;
                    }
                }
            }
            Some(trail)
        }
        _ => None,
    }
}

fn bind(var: &Value, other: &Value, subst: &mut Substitution, compare_only: bool) -> Option<Trail> {
    let key = var.key()?;
    if other.key() == Some(key) {
        return Some(Vec::new());
    }
    if compare_only {
        // A distinct unbound variable is identical to nothing else.
        return None;
    }
    if var.is_wildcard() {
        return Some(Vec::new());
    }
    if occurs(key, other, subst) {
        return None;
    }
    insert(subst, key, other.clone());
    Some(vec![key])
}

const SYMBOL_CHARS: &str = "#$&*+-./:<=>?@^~\\";

fn is_plain_atom(name: &str) -> bool {
    let mut chars = name.chars();
    let plain_ident = match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    plain_ident
        || (!name.is_empty() && name.chars().all(|c| SYMBOL_CHARS.contains(c)))
        || name == "[]"
        || name == "!"
}

fn quote_atom(name: &str) -> String {
    if is_plain_atom(name) {
        return name.to_owned();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('\'');
    for c in name.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Render a resolved value, following bindings through the substitution.
/// Cons cells print with list sugar; unbound variables print as their source
/// names.
pub fn render(value: &Value, subst: &Substitution) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(d) => format!("{:?}", d),
        Value::Unbound(t, _) => t.var().map_or_else(String::new, |v| v.name.clone()),
        Value::Struct(t, base) => match t.atom() {
            Some(head) if head.name == "." && t.arity() == 2 => render_list(t, *base, subst),
            Some(head) if t.arity() == 0 => quote_atom(&head.name),
            Some(head) => {
                let args: Vec<String> = t
                    .args()
                    .iter()
                    .map(|arg| render(&resolve(arg, *base, subst), subst))
                    .collect();
                format!("{}({})", quote_atom(&head.name), args.join(", "))
            }
            None => String::new(),
        },
    }
}

fn render_list(cons: &Rc<Term>, base: u64, subst: &Substitution) -> String {
    let mut out = String::from("[");
    out += &render(&resolve(&cons.args()[0], base, subst), subst);
    let mut tail = resolve(&cons.args()[1], base, subst);
    loop {
        match &tail {
            Value::Struct(t, b) => match t.atom() {
                Some(head) if head.name == "." && t.arity() == 2 => {
                    out += ", ";
                    out += &render(&resolve(&t.args()[0], *b, subst), subst);
                    tail = resolve(&t.args()[1], *b, subst);
                }
                Some(head) if head.name == "[]" && t.arity() == 0 => {
                    out.push(']');
                    return out;
                }
                _ => break,
            },
            _ => break,
        }
    }
    out.push('|');
    out += &render(&tail, subst);
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Context, Var};

    fn atom(ctx: &mut Context, name: &str) -> Rc<Term> {
        Rc::new(Term::Atom(ctx.atoms.atom(name)))
    }

    fn var(ctx: &mut Context, name: &str) -> Rc<Term> {
        let local = ctx.vars.get_id(name);
        Rc::new(Term::Var(Var {
            name: name.to_owned(),
            local,
        }))
    }

    fn compound(ctx: &mut Context, name: &str, args: Vec<Rc<Term>>) -> Rc<Term> {
        Rc::new(Term::Compound(ctx.atoms.atom(name), args))
    }

    fn list(ctx: &mut Context, items: Vec<Rc<Term>>, tail: Rc<Term>) -> Rc<Term> {
        items.into_iter().rev().fold(tail, |acc, item| {
            Rc::new(Term::Compound(ctx.atoms.atom("."), vec![item, acc]))
        })
    }

    #[test]
    fn ground_reflexive() {
        let mut ctx = Context::default();
        let a = atom(&mut ctx, "a");
        let t = compound(&mut ctx, "f", vec![a, Rc::new(Term::Int(1))]);
        let mut subst = Substitution::new();
        let trail = unify(&t, &t, 0, 0, &mut subst, false).unwrap();
        assert!(trail.is_empty());
        assert!(subst.is_empty());
    }

    #[test]
    fn variable_binds_either_side() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let three = Rc::new(Term::Int(3));

        let mut subst = Substitution::new();
        let trail = unify(&x, &three, 0, 0, &mut subst, false).unwrap();
        assert_eq!(trail, vec![1]);
        assert!(matches!(walk(1, &subst), Some(Value::Int(3))));

        let mut subst = Substitution::new();
        assert!(unify(&three, &x, 0, 0, &mut subst, false).is_some());
        assert!(matches!(walk(1, &subst), Some(Value::Int(3))));
    }

    #[test]
    fn occurs_check_rejects_cycle() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let fx = compound(&mut ctx, "f", vec![x.clone()]);
        let mut subst = Substitution::new();
        assert!(unify(&x, &fx, 0, 0, &mut subst, false).is_none());
        assert!(subst.is_empty());
    }

    #[test]
    fn head_and_arity_must_match() {
        let mut ctx = Context::default();
        let a = atom(&mut ctx, "a");
        let b = atom(&mut ctx, "b");
        let fa = compound(&mut ctx, "f", vec![a.clone()]);
        let ga = compound(&mut ctx, "g", vec![a.clone()]);
        let fab = compound(&mut ctx, "f", vec![a, b]);
        let mut subst = Substitution::new();
        assert!(unify(&fa, &ga, 0, 0, &mut subst, false).is_none());
        assert!(unify(&fa, &fab, 0, 0, &mut subst, false).is_none());
    }

    #[test]
    fn failed_child_undoes_partial_trail() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let a = atom(&mut ctx, "a");
        let b = atom(&mut ctx, "b");
        // f(X, a) vs f(b, b): X binds to b, then a/b fails and X unbinds.
        let lhs = compound(&mut ctx, "f", vec![x, a]);
        let rhs = compound(&mut ctx, "f", vec![b.clone(), b]);
        let mut subst = Substitution::new();
        assert!(unify(&lhs, &rhs, 0, 0, &mut subst, false).is_none());
        assert!(subst.is_empty());
    }

    #[test]
    fn walk_follows_variable_chains() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let y = var(&mut ctx, "Y");
        let mut subst = Substitution::new();
        unify(&x, &y, 0, 0, &mut subst, false).unwrap();
        unify(&y, &Rc::new(Term::Int(7)), 0, 0, &mut subst, false).unwrap();
        assert!(matches!(walk(1, &subst), Some(Value::Int(7))));
    }

    #[test]
    fn disjoint_bases_keep_variables_apart() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let mut subst = Substitution::new();
        // Same local id under different bases is two distinct variables.
        let trail = unify(&x, &x, 0, 10, &mut subst, false).unwrap();
        assert_eq!(trail, vec![1]);
    }

    #[test]
    fn wildcard_records_nothing() {
        let mut ctx = Context::default();
        let anon = var(&mut ctx, "_");
        let three = Rc::new(Term::Int(3));
        let mut subst = Substitution::new();
        let trail = unify(&anon, &three, 0, 0, &mut subst, false).unwrap();
        assert!(trail.is_empty());
        assert!(subst.is_empty());
    }

    #[test]
    fn compare_only_never_binds() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let y = var(&mut ctx, "Y");
        let a = atom(&mut ctx, "a");
        let mut subst = Substitution::new();

        assert!(unify(&x, &x, 0, 0, &mut subst, true).is_some());
        assert!(unify(&x, &y, 0, 0, &mut subst, true).is_none());
        assert!(unify(&x, &a, 0, 0, &mut subst, true).is_none());
        let fa = compound(&mut ctx, "f", vec![a.clone()]);
        let fa2 = compound(&mut ctx, "f", vec![a]);
        assert!(unify(&fa, &fa2, 0, 0, &mut subst, true).is_some());
        assert!(subst.is_empty());
    }

    #[test]
    fn compare_only_sees_through_bindings() {
        let mut ctx = Context::default();
        let x = var(&mut ctx, "X");
        let a = atom(&mut ctx, "a");
        let mut subst = Substitution::new();
        unify(&x, &a, 0, 0, &mut subst, false).unwrap();
        // X is now a, so X == a holds.
        assert!(unify(&x, &a, 0, 0, &mut subst, true).is_some());
    }

    #[test]
    fn renders_lists_and_quoted_atoms() {
        let mut ctx = Context::default();
        let nil = atom(&mut ctx, "[]");
        let items = vec![
            Rc::new(Term::Int(1)),
            Rc::new(Term::Int(2)),
            Rc::new(Term::Int(3)),
        ];
        let l = list(&mut ctx, items, nil);
        let subst = Substitution::new();
        assert_eq!(render(&resolve(&l, 0, &subst), &subst), "[1, 2, 3]");

        let t = var(&mut ctx, "T");
        let improper = list(&mut ctx, vec![Rc::new(Term::Int(1))], t);
        assert_eq!(render(&resolve(&improper, 0, &subst), &subst), "[1|T]");

        let odd = atom(&mut ctx, "hello world");
        assert_eq!(render(&resolve(&odd, 0, &subst), &subst), "'hello world'");
        let sym = atom(&mut ctx, "=:=");
        assert_eq!(render(&resolve(&sym, 0, &subst), &subst), "=:=");
    }

    #[test]
    fn renders_floats_with_decimal_point() {
        let subst = Substitution::new();
        assert_eq!(render(&Value::Float(3.0), &subst), "3.0");
        assert_eq!(render(&Value::Int(4), &subst), "4");
    }
}
