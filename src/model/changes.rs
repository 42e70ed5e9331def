//! Sectioned snapshots and the change events that move one snapshot to the next
//!
//! A batch uses stable index semantics: `Delete`, `Update`, `Move::from` and
//! `SectionDelete` address the state *before* the batch, while `Insert`,
//! `Move::to` and `SectionInsert` address the state *after* it. This is the
//! contract incremental list views expect, so the same batch can be replayed
//! against a mirror of the list and against the view on screen.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Store-assigned identity of a record. Increases with insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: RecordId,
    pub value: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Section<T> {
    pub name: String,
    pub items: Vec<Record<T>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent<T> {
    Insert { item: Record<T>, path: IndexPath },
    Delete { path: IndexPath },
    Update { path: IndexPath, item: Record<T> },
    Move { from: IndexPath, to: IndexPath, item: Record<T> },
    SectionInsert { index: usize, name: String },
    SectionDelete { index: usize },
    /// Never valid; a store emitting this is broken.
    SectionMove { from: usize, to: usize },
    /// Never valid; a store emitting this is broken.
    SectionUpdate { index: usize },
}

pub type ChangeBatch<T> = Vec<ChangeEvent<T>>;

/// Ordered sections of records as seen through one view.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<T> {
    sections: Vec<Section<T>>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self { sections: Vec::new() }
    }
}

impl<T> Snapshot<T> {
    /// Group already-sorted records into sections. Sections appear in the
    /// order of their first record; without a key everything lands in one
    /// unnamed section, and an empty input yields no sections at all.
    pub fn from_sorted<I, F>(records: I, section_key: Option<F>) -> Self
    where
        I: IntoIterator<Item = Record<T>>,
        F: Fn(&T) -> String,
    {
        let mut sections: Vec<Section<T>> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for record in records {
            let name = section_key
                .as_ref()
                .map(|key| key(&record.value))
                .unwrap_or_default();
            let index = *by_name.entry(name.clone()).or_insert_with(|| {
                sections.push(Section {
                    name,
                    items: Vec::new(),
                });
                sections.len() - 1
            });
            sections[index].items.push(record);
        }

        Self { sections }
    }

    pub fn sections(&self) -> &[Section<T>] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Rows in `section`; a section that does not exist has none.
    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |s| s.items.len())
    }

    pub fn get(&self, path: IndexPath) -> Option<&Record<T>> {
        self.sections.get(path.section)?.items.get(path.row)
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records().next().is_none()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record<T>> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }
}

impl<T: Clone> Snapshot<T> {
    /// Apply a batch atomically. On error `self` is left untouched.
    pub fn apply(&mut self, batch: &[ChangeEvent<T>]) -> Result<(), ProtocolError> {
        let mut next = self.clone();
        next.apply_in_place(batch)?;
        *self = next;
        Ok(())
    }

    fn apply_in_place(&mut self, batch: &[ChangeEvent<T>]) -> Result<(), ProtocolError> {
        let mut section_deletes = Vec::new();
        let mut section_inserts = Vec::new();
        let mut removals = Vec::new();
        let mut inserts = Vec::new();
        let mut updates = Vec::new();

        for event in batch {
            match event {
                ChangeEvent::Insert { item, path } => inserts.push((*path, item.clone())),
                ChangeEvent::Delete { path } => removals.push(*path),
                ChangeEvent::Update { path, item } => updates.push((*path, item.clone())),
                ChangeEvent::Move { from, to, item } => {
                    removals.push(*from);
                    inserts.push((*to, item.clone()));
                }
                ChangeEvent::SectionInsert { index, name } => {
                    section_inserts.push((*index, name.clone()))
                }
                ChangeEvent::SectionDelete { index } => section_deletes.push(*index),
                ChangeEvent::SectionMove { from, .. } => {
                    return Err(ProtocolError::InvalidSectionChange {
                        kind: "move",
                        index: *from,
                    });
                }
                ChangeEvent::SectionUpdate { index } => {
                    return Err(ProtocolError::InvalidSectionChange {
                        kind: "update",
                        index: *index,
                    });
                }
            }
        }

        // Everything addressed in pre-batch coordinates must exist and be unique.
        let mut seen_rows = HashSet::new();
        for path in removals.iter().chain(updates.iter().map(|(p, _)| p)) {
            if self.get(*path).is_none() {
                return Err(ProtocolError::RowOutOfBounds {
                    path: *path,
                    phase: "pre-batch",
                });
            }
            if !seen_rows.insert(*path) {
                return Err(ProtocolError::DuplicateRow { path: *path });
            }
        }
        let mut seen_sections = HashSet::new();
        for &index in &section_deletes {
            if index >= self.sections.len() {
                return Err(ProtocolError::SectionOutOfBounds {
                    index,
                    phase: "pre-batch",
                });
            }
            if !seen_sections.insert(index) {
                return Err(ProtocolError::DuplicateSection { index });
            }
        }

        for (path, item) in updates {
            self.sections[path.section].items[path.row] = item;
        }

        removals.sort_unstable_by(|a, b| b.cmp(a));
        for path in removals {
            self.sections[path.section].items.remove(path.row);
        }

        section_deletes.sort_unstable_by(|a, b| b.cmp(a));
        for index in section_deletes {
            self.sections.remove(index);
        }

        section_inserts.sort_by_key(|(index, _)| *index);
        let mut seen_sections = HashSet::new();
        for (index, name) in section_inserts {
            if !seen_sections.insert(index) {
                return Err(ProtocolError::DuplicateSection { index });
            }
            if index > self.sections.len() {
                return Err(ProtocolError::SectionOutOfBounds {
                    index,
                    phase: "post-batch",
                });
            }
            self.sections.insert(
                index,
                Section {
                    name,
                    items: Vec::new(),
                },
            );
        }

        inserts.sort_by_key(|(path, _)| *path);
        let mut seen_rows = HashSet::new();
        for (path, item) in inserts {
            if !seen_rows.insert(path) {
                return Err(ProtocolError::DuplicateRow { path });
            }
            let Some(section) = self.sections.get_mut(path.section) else {
                return Err(ProtocolError::SectionOutOfBounds {
                    index: path.section,
                    phase: "post-batch",
                });
            };
            if path.row > section.items.len() {
                return Err(ProtocolError::RowOutOfBounds {
                    path,
                    phase: "post-batch",
                });
            }
            section.items.insert(path.row, item);
        }

        Ok(())
    }
}

impl<T: Clone + PartialEq> Snapshot<T> {
    /// Compute the batch that turns `old` into `new`.
    ///
    /// Records are matched by id. Records that keep their relative order
    /// inside a surviving section stay put (and are updated if their value
    /// changed); every other surviving record becomes a `Move`. Sections whose
    /// relative order changed are deleted and re-inserted, never moved.
    pub fn diff(old: &Snapshot<T>, new: &Snapshot<T>) -> ChangeBatch<T> {
        let mut batch = Vec::new();

        let new_section_index: HashMap<&str, usize> = new
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();

        // Surviving sections, in old order, mapped to their new index.
        let surviving: Vec<(usize, usize)> = old
            .sections
            .iter()
            .enumerate()
            .filter_map(|(i, s)| new_section_index.get(s.name.as_str()).map(|&j| (i, j)))
            .collect();
        let keep = longest_increasing(&surviving.iter().map(|&(_, j)| j).collect::<Vec<_>>());
        let kept: HashMap<usize, usize> = surviving
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(&pair, _)| pair)
            .collect();
        let kept_targets: HashSet<usize> = kept.values().copied().collect();

        for index in 0..old.sections.len() {
            if !kept.contains_key(&index) {
                batch.push(ChangeEvent::SectionDelete { index });
            }
        }
        for (index, section) in new.sections.iter().enumerate() {
            if !kept_targets.contains(&index) {
                batch.push(ChangeEvent::SectionInsert {
                    index,
                    name: section.name.clone(),
                });
            }
        }

        let new_paths: HashMap<RecordId, IndexPath> = paths_by_id(new);
        let old_paths: HashMap<RecordId, IndexPath> = paths_by_id(old);

        let mut moves = Vec::new();
        let mut updates = Vec::new();

        for (section_index, section) in old.sections.iter().enumerate() {
            // (old row, new path) of records that survive into the same kept section.
            let mut candidates: Vec<(usize, IndexPath)> = Vec::new();

            for (row, record) in section.items.iter().enumerate() {
                let from = IndexPath::new(section_index, row);
                let Some(&to) = new_paths.get(&record.id) else {
                    batch.push(ChangeEvent::Delete { path: from });
                    continue;
                };
                if kept.get(&section_index) == Some(&to.section) {
                    candidates.push((row, to));
                } else {
                    moves.push((from, to));
                }
            }

            let stay = longest_increasing(&candidates.iter().map(|(_, to)| to.row).collect::<Vec<_>>());
            for ((row, to), stays) in candidates.into_iter().zip(stay) {
                let from = IndexPath::new(section_index, row);
                if stays {
                    if old.sections[from.section].items[from.row].value
                        != new.sections[to.section].items[to.row].value
                    {
                        updates.push((from, to));
                    }
                } else {
                    moves.push((from, to));
                }
            }
        }

        for (from, to) in moves {
            batch.push(ChangeEvent::Move {
                from,
                to,
                item: new.sections[to.section].items[to.row].clone(),
            });
        }

        for (section_index, section) in new.sections.iter().enumerate() {
            for (row, record) in section.items.iter().enumerate() {
                if !old_paths.contains_key(&record.id) {
                    batch.push(ChangeEvent::Insert {
                        item: record.clone(),
                        path: IndexPath::new(section_index, row),
                    });
                }
            }
        }

        for (from, to) in updates {
            batch.push(ChangeEvent::Update {
                path: from,
                item: new.sections[to.section].items[to.row].clone(),
            });
        }

        batch
    }
}

fn paths_by_id<T>(snapshot: &Snapshot<T>) -> HashMap<RecordId, IndexPath> {
    snapshot
        .sections
        .iter()
        .enumerate()
        .flat_map(|(s, section)| {
            section
                .items
                .iter()
                .enumerate()
                .map(move |(r, record)| (record.id, IndexPath::new(s, r)))
        })
        .collect()
}

/// Mask of one longest strictly increasing subsequence of `seq`.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
    // tails[k] = index into seq of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        if k > 0 {
            prev[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut mask = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        mask[i] = true;
        cursor = prev[i];
    }
    mask
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn rec(id: u64, value: &str) -> Record<String> {
        Record {
            id: RecordId(id),
            value: value.to_string(),
        }
    }

    fn first_letter(value: &String) -> String {
        value.chars().next().map(|c| c.to_string()).unwrap_or_default()
    }

    fn sectioned(records: Vec<Record<String>>) -> Snapshot<String> {
        Snapshot::from_sorted(records, Some(first_letter))
    }

    fn flat(records: Vec<Record<String>>) -> Snapshot<String> {
        Snapshot::from_sorted(records, None::<fn(&String) -> String>)
    }

    #[test]
    fn grouping_follows_first_appearance() {
        let snapshot = sectioned(vec![rec(1, "Berlin"), rec(2, "Bonn"), rec(3, "Cairo")]);
        assert_eq!(snapshot.section_count(), 2);
        assert_eq!(snapshot.sections()[0].name, "B");
        assert_eq!(snapshot.row_count(0), 2);
        assert_eq!(snapshot.row_count(1), 1);
        assert_eq!(snapshot.row_count(7), 0);
        assert!(flat(vec![]).is_empty());
        assert_eq!(flat(vec![]).section_count(), 0);
    }

    #[test]
    fn stable_indices_within_one_batch() {
        let mut snapshot = flat(vec![rec(1, "a"), rec(2, "b"), rec(3, "c")]);
        // Delete rows 0 and 2 of the old state, insert at 1 of the final state.
        let batch = vec![
            ChangeEvent::Delete { path: IndexPath::new(0, 0) },
            ChangeEvent::Delete { path: IndexPath::new(0, 2) },
            ChangeEvent::Insert { item: rec(4, "d"), path: IndexPath::new(0, 1) },
        ];
        snapshot.apply(&batch).unwrap();
        let values: Vec<_> = snapshot.records().map(|r| r.value.as_str()).collect();
        assert_eq!(values, ["b", "d"]);
    }

    #[test]
    fn section_move_is_rejected_without_side_effects() {
        let mut snapshot = sectioned(vec![rec(1, "Berlin"), rec(2, "Cairo")]);
        let before = snapshot.clone();
        let batch = vec![
            ChangeEvent::Delete { path: IndexPath::new(0, 0) },
            ChangeEvent::SectionMove { from: 0, to: 1 },
        ];
        assert_eq!(
            snapshot.apply(&batch),
            Err(ProtocolError::InvalidSectionChange { kind: "move", index: 0 })
        );
        assert_eq!(snapshot, before);
    }

    #[test]
    fn out_of_bounds_and_duplicates_are_rejected() {
        let mut snapshot = flat(vec![rec(1, "a")]);
        let before = snapshot.clone();
        assert!(matches!(
            snapshot.apply(&[ChangeEvent::Delete { path: IndexPath::new(0, 3) }]),
            Err(ProtocolError::RowOutOfBounds { .. })
        ));
        assert!(matches!(
            snapshot.apply(&[
                ChangeEvent::Delete { path: IndexPath::new(0, 0) },
                ChangeEvent::Update { path: IndexPath::new(0, 0), item: rec(1, "b") },
            ]),
            Err(ProtocolError::DuplicateRow { .. })
        ));
        assert!(matches!(
            snapshot.apply(&[ChangeEvent::Insert { item: rec(2, "b"), path: IndexPath::new(0, 5) }]),
            Err(ProtocolError::RowOutOfBounds { .. })
        ));
        assert_eq!(snapshot, before);
    }

    #[test]
    fn diff_emits_move_for_reordered_record() {
        let old = flat(vec![rec(1, "a"), rec(2, "b"), rec(3, "c")]);
        let new = flat(vec![rec(2, "b"), rec(3, "c"), rec(1, "z")]);
        let batch = Snapshot::diff(&old, &new);
        assert_eq!(
            batch,
            vec![ChangeEvent::Move {
                from: IndexPath::new(0, 0),
                to: IndexPath::new(0, 2),
                item: rec(1, "z"),
            }]
        );
    }

    #[test]
    fn diff_emits_update_for_changed_value_in_place() {
        let old = flat(vec![rec(1, "a"), rec(2, "b")]);
        let new = flat(vec![rec(1, "a"), rec(2, "bb")]);
        assert_eq!(
            Snapshot::diff(&old, &new),
            vec![ChangeEvent::Update { path: IndexPath::new(0, 1), item: rec(2, "bb") }]
        );
    }

    #[test]
    fn diff_of_equal_snapshots_is_empty() {
        let snapshot = sectioned(vec![rec(1, "Berlin"), rec(2, "Cairo")]);
        assert!(Snapshot::diff(&snapshot, &snapshot.clone()).is_empty());
    }

    #[test]
    fn last_record_removal_deletes_its_section() {
        let old = sectioned(vec![rec(1, "Berlin"), rec(2, "Cairo")]);
        let new = sectioned(vec![rec(2, "Cairo")]);
        let batch = Snapshot::diff(&old, &new);
        assert!(batch.contains(&ChangeEvent::SectionDelete { index: 0 }));
        assert!(batch.contains(&ChangeEvent::Delete { path: IndexPath::new(0, 0) }));
        let mut mirror = old.clone();
        mirror.apply(&batch).unwrap();
        assert_eq!(mirror, new);
    }

    #[test]
    fn replaying_diffs_reproduces_every_snapshot() {
        const WORDS: [&str; 8] = ["Ankara", "Athens", "Bern", "Berlin", "Cairo", "Dakar", "Delhi", "Dublin"];
        let mut rng = StdRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);

        for key in [true, false] {
            let build = |records: &Vec<Record<String>>| {
                let mut sorted = records.clone();
                sorted.sort_by(|a, b| a.value.cmp(&b.value).then(a.id.cmp(&b.id)));
                if key { sectioned(sorted) } else { flat(sorted) }
            };

            let mut records: Vec<Record<String>> = Vec::new();
            let mut next_id = 0;
            let mut previous = build(&records);
            let mut mirror = Snapshot::default();

            for _ in 0..400 {
                match rng.gen_range(0..3) {
                    0 => {
                        next_id += 1;
                        records.push(rec(next_id, WORDS[rng.gen_range(0..WORDS.len())]));
                    }
                    1 if !records.is_empty() => {
                        records.remove(rng.gen_range(0..records.len()));
                    }
                    _ if !records.is_empty() => {
                        let i = rng.gen_range(0..records.len());
                        records[i].value = WORDS[rng.gen_range(0..WORDS.len())].to_string();
                    }
                    _ => {}
                }
                let current = build(&records);
                let batch = Snapshot::diff(&previous, &current);
                mirror.apply(&batch).unwrap();
                assert_eq!(mirror, current);
                previous = current;
            }
        }
    }
}
