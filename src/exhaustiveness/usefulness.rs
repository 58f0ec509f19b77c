//! Usefulness over a pattern matrix (specialize by column, default matrix).
//!
//! A query row is *useful* against a matrix when some value matches the
//! query but no matrix row. Asking whether the all-wildcard row is useful
//! against the arms decides exhaustiveness; asking whether an arm is useful
//! against the arms before it decides reachability. Instead of a yes/no
//! answer the search returns witness rows, capped at `limit`.

use super::lower::{shape_of, Ctor, Pat, Shape};
use super::witness::{self, WitnessPattern};
use super::*;

pub(super) struct Usefulness<'e, 'a> {
    env: &'e TypeEnv<'a>,
    limit: usize,
}

impl<'e, 'a> Usefulness<'e, 'a> {
    pub(super) fn new(env: &'e TypeEnv<'a>, limit: usize) -> Self {
        Usefulness {
            env,
            limit: limit.max(1),
        }
    }

    /// Witness rows (one pattern per column of `tys`) for values matched by
    /// `query` and by none of `rows`. Empty when `query` is not useful.
    pub(super) fn witnesses(
        &self,
        rows: &[Vec<Pat>],
        query: &[Pat],
        tys: &[&'a TypeRef],
    ) -> Vec<Vec<WitnessPattern>> {
        let Some((head, rest)) = query.split_first() else {
            return if rows.is_empty() {
                vec![Vec::new()]
            } else {
                Vec::new()
            };
        };
        let shape = shape_of(self.env, tys[0]);

        match head {
            Pat::Or(alts) => {
                let mut out = Vec::new();
                for alt in alts {
                    let mut q = Vec::with_capacity(query.len());
                    q.push(alt.clone());
                    q.extend_from_slice(rest);
                    out.extend(self.witnesses(rows, &q, tys));
                    if out.len() >= self.limit {
                        break;
                    }
                }
                out.truncate(self.limit);
                out
            }

            Pat::Ctor(ctor, fields) => {
                let mut q = fields.clone();
                q.extend_from_slice(rest);
                self.specialized(rows, &shape, ctor, &q, tys)
            }

            Pat::Wild => {
                let present = head_ctors(rows);
                // Constructors with an empty field type build no value, so
                // they are neither required nor reported.
                let all = shape.ctors().map(|ctors| {
                    ctors
                        .into_iter()
                        .filter(|c| shape.inhabits(self.env, c))
                        .collect::<Vec<_>>()
                });
                match &all {
                    // Uninhabited: there is no value left to cover.
                    Some(all) if all.is_empty() => Vec::new(),
                    Some(all) if all.iter().all(|c| present.contains(&c)) => {
                        let mut out = Vec::new();
                        for ctor in all {
                            let arity = shape.field_types(ctor).len();
                            let mut q = vec![Pat::Wild; arity];
                            q.extend_from_slice(rest);
                            out.extend(self.specialized(rows, &shape, ctor, &q, tys));
                            if out.len() >= self.limit {
                                break;
                            }
                        }
                        out.truncate(self.limit);
                        out
                    }
                    _ => {
                        let default = default_matrix(rows);
                        let tails = self.witnesses(&default, rest, &tys[1..]);
                        if tails.is_empty() {
                            return Vec::new();
                        }
                        // Variants are always named; for other types with no
                        // constructor mentioned at all, `_` says it best.
                        let named = !present.is_empty() || matches!(shape, Shape::Sum { .. });
                        let heads: Vec<WitnessPattern> = match &all {
                            Some(all) if named => all
                                .iter()
                                .filter(|c| !present.contains(c))
                                .map(|c| witness::wild_ctor(&shape, c))
                                .collect(),
                            _ => vec![WitnessPattern::Wildcard],
                        };
                        let mut out = Vec::new();
                        'outer: for head in &heads {
                            for tail in &tails {
                                let mut row = Vec::with_capacity(tail.len() + 1);
                                row.push(head.clone());
                                row.extend(tail.iter().cloned());
                                out.push(row);
                                if out.len() >= self.limit {
                                    break 'outer;
                                }
                            }
                        }
                        out
                    }
                }
            }
        }
    }

    fn specialized(
        &self,
        rows: &[Vec<Pat>],
        shape: &Shape<'a>,
        ctor: &Ctor,
        query: &[Pat],
        tys: &[&'a TypeRef],
    ) -> Vec<Vec<WitnessPattern>> {
        let field_tys = shape.field_types(ctor);
        let arity = field_tys.len();
        let mut sub_tys = field_tys;
        sub_tys.extend_from_slice(&tys[1..]);

        let mut sub_rows = Vec::new();
        for row in rows {
            specialize_row(row, ctor, arity, &mut sub_rows);
        }

        self.witnesses(&sub_rows, query, &sub_tys)
            .into_iter()
            .map(|mut w| {
                let tail = w.split_off(arity.min(w.len()));
                let mut row = Vec::with_capacity(tail.len() + 1);
                row.push(witness::build(shape, ctor, w));
                row.extend(tail);
                row
            })
            .collect()
    }
}

/// Constructors appearing at the head of any row, or-patterns flattened.
fn head_ctors(rows: &[Vec<Pat>]) -> Vec<&Ctor> {
    fn visit<'p>(pat: &'p Pat, out: &mut Vec<&'p Ctor>) {
        match pat {
            Pat::Wild => {}
            Pat::Ctor(ctor, _) => {
                if !out.contains(&ctor) {
                    out.push(ctor);
                }
            }
            Pat::Or(alts) => {
                for alt in alts {
                    visit(alt, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    for row in rows {
        if let Some(head) = row.first() {
            visit(head, &mut out);
        }
    }
    out
}

fn specialize_row(row: &[Pat], ctor: &Ctor, arity: usize, out: &mut Vec<Vec<Pat>>) {
    let Some((head, rest)) = row.split_first() else {
        return;
    };
    match head {
        Pat::Wild => {
            let mut r = vec![Pat::Wild; arity];
            r.extend_from_slice(rest);
            out.push(r);
        }
        Pat::Ctor(c, fields) if c == ctor => {
            let mut r = fields.clone();
            r.extend_from_slice(rest);
            out.push(r);
        }
        Pat::Ctor(..) => {}
        Pat::Or(alts) => {
            for alt in alts {
                let mut r = Vec::with_capacity(row.len());
                r.push(alt.clone());
                r.extend_from_slice(rest);
                specialize_row(&r, ctor, arity, out);
            }
        }
    }
}

/// Rows whose head matches every constructor, with the head dropped.
fn default_matrix(rows: &[Vec<Pat>]) -> Vec<Vec<Pat>> {
    fn visit(head: &Pat, rest: &[Pat], out: &mut Vec<Vec<Pat>>) {
        match head {
            Pat::Wild => out.push(rest.to_vec()),
            Pat::Ctor(..) => {}
            Pat::Or(alts) => {
                for alt in alts {
                    visit(alt, rest, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    for row in rows {
        if let Some((head, rest)) = row.split_first() {
            visit(head, rest, &mut out);
        }
    }
    out
}
