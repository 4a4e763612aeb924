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

//! Epilog is a resolution-based interpreter for a Prolog-like logic
//! language: definite clauses in, solutions out.
//!
//! The pieces line up with the classic architecture: [`logic`] holds the
//! immutable term model, [`parser`] turns source text into clauses and
//! queries, [`unification`] maintains the substitution that proofs read and
//! write, [`arith`] and [`builtin`] cover the procedural predicates, and
//! [`solve`] is the depth-first resolution engine. [`interpreter::Session`]
//! ties them together for consumers.

pub mod arith;
pub mod builtin;
pub mod interpreter;
pub mod logic;
pub mod parser;
pub mod solve;
pub mod unification;

pub use crate::interpreter::Session;
