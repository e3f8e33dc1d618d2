// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow linearization: freezes the unit list, checks name uniqueness,
//! and computes the default transitions the declaration left implicit.

use crate::unit::{ForkBehavior, JobBehavior, JoinBehavior, Unit};
use std::collections::HashMap;
use weft_core::{UnitKind, WorkError};

/// The frozen unit list shared by the sequencer and every fork worker.
///
/// After construction all jobs and joins have a `goto` (next unit in
/// declaration order, `"end"` for the last), and every fork has a start
/// point, a paired join, and an end point.
pub struct UnitGraph {
    units: Vec<Unit>,
    index: HashMap<String, usize>,
}

impl UnitGraph {
    pub fn new(mut units: Vec<Unit>) -> Result<Self, WorkError> {
        if units.is_empty() {
            return Err(WorkError::invalid_argument(
                "a workflow needs at least one unit",
            ));
        }

        let mut index = HashMap::new();
        for (pos, unit) in units.iter().enumerate() {
            if index.insert(unit.name().to_string(), pos).is_some() {
                return Err(WorkError::UnitExists(unit.name().to_string()));
            }
        }

        let names: Vec<String> = units.iter().map(|u| u.name().to_string()).collect();
        let kinds: Vec<UnitKind> = units.iter().map(Unit::kind).collect();
        let len = units.len();

        for pos in 0..len {
            match &mut units[pos] {
                Unit::Job(job) => {
                    if job.goto().is_none() {
                        job.set_goto(next_or_end(&names, pos));
                    }
                }
                Unit::Join(join) => {
                    if join.goto().is_none() {
                        join.set_goto(next_or_end(&names, pos));
                    }
                }
                Unit::Fork(fork) => {
                    match fork.start_point() {
                        None => {
                            if pos + 1 >= len {
                                return Err(WorkError::invalid_argument(format!(
                                    "fork '{}' has no unit to start from",
                                    names[pos]
                                )));
                            }
                            fork.set_start_point(names[pos + 1].clone());
                        }
                        Some(point) => {
                            if !index.contains_key(point) {
                                return Err(WorkError::invalid_argument(format!(
                                    "fork '{}': unknown start point '{}'",
                                    names[pos], point
                                )));
                            }
                        }
                    }

                    // Pair with a join: the declared goto, or the nearest
                    // join declared after the fork.
                    let join_pos = match fork.goto() {
                        Some(target) => {
                            let target_pos = index.get(target).copied().ok_or_else(|| {
                                WorkError::invalid_argument(format!(
                                    "fork '{}': unknown goto '{}'",
                                    names[pos], target
                                ))
                            })?;
                            if kinds[target_pos] != UnitKind::Join {
                                return Err(WorkError::invalid_argument(format!(
                                    "fork '{}': goto '{}' is not a join",
                                    names[pos], target
                                )));
                            }
                            target_pos
                        }
                        None => {
                            let found = (pos + 1..len).find(|&i| kinds[i] == UnitKind::Join);
                            let join_pos = found.ok_or_else(|| {
                                WorkError::invalid_argument(format!(
                                    "fork '{}' has no join to pair with",
                                    names[pos]
                                ))
                            })?;
                            fork.set_goto(names[join_pos].clone());
                            join_pos
                        }
                    };

                    match fork.end_point() {
                        None => {
                            if join_pos <= pos + 1 {
                                return Err(WorkError::invalid_argument(format!(
                                    "fork '{}': no units between the fork and join '{}'",
                                    names[pos], names[join_pos]
                                )));
                            }
                            fork.set_end_point(names[join_pos - 1].clone());
                        }
                        Some(point) => {
                            if !index.contains_key(point) {
                                return Err(WorkError::invalid_argument(format!(
                                    "fork '{}': unknown end point '{}'",
                                    names[pos], point
                                )));
                            }
                        }
                    }
                }
                Unit::Decision(_) | Unit::End(_) => {}
            }
        }

        Ok(UnitGraph { units, index })
    }

    /// First unit in declaration order; the default start point.
    pub fn first(&self) -> &Unit {
        &self.units[0]
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.index.get(name).map(|&pos| &self.units[pos])
    }

    /// Transition-target lookup; unknown targets are diagnosed as
    /// invalid-argument so the sequencer can fold them into a bad-request
    /// end instead of looping forever.
    pub fn lookup(&self, name: &str) -> Result<&Unit, WorkError> {
        self.get(name)
            .ok_or_else(|| WorkError::invalid_argument(format!("unknown unit target '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }
}

fn next_or_end(names: &[String], pos: usize) -> String {
    names
        .get(pos + 1)
        .cloned()
        .unwrap_or_else(|| "end".to_string())
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
