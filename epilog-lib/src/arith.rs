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

//! Recursive evaluation of ground arithmetic terms.
//!
//! Mixed operands promote to float; `/` is always float division; `//`,
//! `mod` and the bitwise family stay on integers. Every failure mode
//! (unbound operand, unknown operator, division by zero, overflow,
//! non-finite float result) reports as `None` so the enclosing goal simply
//! fails instead of aborting the proof.

use std::convert::TryFrom;
use std::rc::Rc;

use crate::logic::Term;
use crate::unification::{resolve, Substitution, Value};

/// A computed number, still tagged with its kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(d) => d,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::Int(i),
            Num::Float(d) => Value::Float(d),
        }
    }
}

/// Evaluate a term under the current substitution and scope base.
pub fn eval(term: &Rc<Term>, base: u64, subst: &Substitution) -> Option<Num> {
    eval_value(&resolve(term, base, subst), subst)
}

fn eval_value(value: &Value, subst: &Substitution) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Float(d) => Some(Num::Float(*d)),
        Value::Unbound(..) => None,
        Value::Struct(t, base) => {
            let op = &t.atom()?.name;
            match t.args() {
                [x] => eval_unary(op, eval(x, *base, subst)?),
                [x, y] => {
                    let l = eval(x, *base, subst)?;
                    let r = eval(y, *base, subst)?;
                    eval_binary(op, l, r)
                }
                _ => None,
            }
        }
    }
}

fn finite(d: f64) -> Option<Num> {
    if d.is_finite() {
        Some(Num::Float(d))
    } else {
        None
    }
}

/// Apply the integer op when both operands are integers, otherwise promote
/// both sides to float.
fn promote(
    l: Num,
    r: Num,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Option<Num> {
    match (l, r) {
        (Num::Int(a), Num::Int(b)) => int_op(a, b).map(Num::Int),
        _ => finite(float_op(l.as_f64(), r.as_f64())),
    }
}

fn int_only(l: Num, r: Num, op: fn(i64, i64) -> Option<i64>) -> Option<Num> {
    match (l, r) {
        (Num::Int(a), Num::Int(b)) => op(a, b).map(Num::Int),
        _ => None,
    }
}

fn eval_binary(op: &str, l: Num, r: Num) -> Option<Num> {
    match op {
        "+" => promote(l, r, i64::checked_add, |a, b| a + b),
        "-" => promote(l, r, i64::checked_sub, |a, b| a - b),
        "*" => promote(l, r, i64::checked_mul, |a, b| a * b),
        "/" => {
            let divisor = r.as_f64();
            if divisor == 0.0 {
                return None;
            }
            finite(l.as_f64() / divisor)
        }
        "//" => int_only(l, r, |a, b| if b == 0 { None } else { a.checked_div(b) }),
        // floored: the result takes the divisor's sign
        "mod" => int_only(l, r, |a, b| {
            if b == 0 {
                return None;
            }
            a.checked_rem(b)
                .map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }),
        "rem" => int_only(l, r, |a, b| if b == 0 { None } else { a.checked_rem(b) }),
        "**" | "^" => finite(l.as_f64().powf(r.as_f64())),
        "<<" => int_only(l, r, |a, b| u32::try_from(b).ok().and_then(|s| a.checked_shl(s))),
        ">>" => int_only(l, r, |a, b| u32::try_from(b).ok().and_then(|s| a.checked_shr(s))),
        "/\\" => int_only(l, r, |a, b| Some(a & b)),
        "\\/" => int_only(l, r, |a, b| Some(a | b)),
        _ => None,
    }
}

fn eval_unary(op: &str, x: Num) -> Option<Num> {
    match op {
        "-" => match x {
            Num::Int(i) => i.checked_neg().map(Num::Int),
            Num::Float(d) => Some(Num::Float(-d)),
        },
        "\\" => match x {
            Num::Int(i) => Some(Num::Int(!i)),
            Num::Float(_) => None,
        },
        "abs" => match x {
            Num::Int(i) => i.checked_abs().map(Num::Int),
            Num::Float(d) => Some(Num::Float(d.abs())),
        },
        "sqrt" => finite(x.as_f64().sqrt()),
        "sin" => finite(x.as_f64().sin()),
        "cos" => finite(x.as_f64().cos()),
        "atan" => finite(x.as_f64().atan()),
        "exp" => finite(x.as_f64().exp()),
        "log" => finite(x.as_f64().ln()),
        "floor" => finite(x.as_f64().floor()),
        "ceiling" => finite(x.as_f64().ceil()),
        "truncate" => finite(x.as_f64().trunc()),
        "round" => finite(x.as_f64().round()),
        _ => None,
    }
}
