use std::collections::{HashMap, HashSet};

use crate::models::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// First row seen for this canonical code.
    New,
    /// A different source line already produced this canonical code.
    Collision,
    /// Same cleaned digits and description as an earlier row; not recorded in the group.
    ExactDuplicate,
}

/// A row that repeated an earlier line verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactDuplicate {
    pub code: String,
    pub row: RawRow,
}

/// Groups raw rows by canonical code, in first-seen order.
#[derive(Debug, Default)]
pub struct Deduplicator {
    index: HashMap<String, usize>,
    groups: Vec<(String, Vec<RawRow>)>,
    seen_lines: HashSet<(String, String)>,
    exact_duplicates: Vec<ExactDuplicate>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `digits` is the cleaned digit string the canonical code was built from.
    pub fn add(&mut self, row: RawRow, digits: &str, code: &str) -> AddOutcome {
        let line_key = (digits.to_string(), row.description.trim().to_string());
        if !self.seen_lines.insert(line_key) {
            self.exact_duplicates.push(ExactDuplicate {
                code: code.to_string(),
                row,
            });
            return AddOutcome::ExactDuplicate;
        }

        match self.index.get(code) {
            Some(&i) => {
                self.groups[i].1.push(row);
                AddOutcome::Collision
            }
            None => {
                self.index.insert(code.to_string(), self.groups.len());
                self.groups.push((code.to_string(), vec![row]));
                AddOutcome::New
            }
        }
    }

    pub fn unique_count(&self) -> usize {
        self.groups.len()
    }

    /// Canonical codes with the first row that produced each, in first-seen order.
    pub fn firsts(&self) -> impl Iterator<Item = (&str, &RawRow)> {
        self.groups
            .iter()
            .filter_map(|(code, rows)| rows.first().map(|r| (code.as_str(), r)))
    }

    /// Groups with more than one row, largest first, ties in first-seen order.
    pub fn collisions(&self) -> impl Iterator<Item = (&str, &[RawRow])> {
        let mut order: Vec<usize> = (0..self.groups.len())
            .filter(|&i| self.groups[i].1.len() > 1)
            .collect();
        // stable sort keeps first-seen order among equal sizes
        order.sort_by(|&a, &b| self.groups[b].1.len().cmp(&self.groups[a].1.len()));
        order.into_iter().map(move |i| {
            let (code, rows) = &self.groups[i];
            (code.as_str(), rows.as_slice())
        })
    }

    pub fn collision_count(&self) -> usize {
        self.groups.iter().filter(|(_, rows)| rows.len() > 1).count()
    }

    pub fn exact_duplicates(&self) -> &[ExactDuplicate] {
        &self.exact_duplicates
    }
}
