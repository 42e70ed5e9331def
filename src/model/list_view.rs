//! Visible-list state for the terminal host
//!
//! Tracks the shape of the list on screen (rows per section) and keeps the
//! cursor on the same row while change batches reshuffle things around it.

use super::changes::IndexPath;
use super::list_sync::Presentation;

#[derive(Debug, Default)]
struct PendingBatch {
    old_shape: Vec<usize>,
    removed: Vec<IndexPath>,
    inserted: Vec<IndexPath>,
    moved: Vec<(IndexPath, IndexPath)>,
    section_deletes: Vec<usize>,
    section_inserts: Vec<usize>,
    updated: usize,
}

#[derive(Debug, Default)]
pub struct ListViewState {
    shape: Vec<usize>,
    selected: usize,
    batch: Option<PendingBatch>,
}

fn flat_index(shape: &[usize], path: IndexPath) -> usize {
    shape[..path.section.min(shape.len())].iter().sum::<usize>() + path.row
}

fn path_at(shape: &[usize], mut flat: usize) -> Option<IndexPath> {
    for (section, &rows) in shape.iter().enumerate() {
        if flat < rows {
            return Some(IndexPath::new(section, flat));
        }
        flat -= rows;
    }
    None
}

impl ListViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat position of the cursor.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_path(&self) -> Option<IndexPath> {
        path_at(&self.shape, self.selected)
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.len() {
            self.selected += 1;
        }
    }

    fn resolve(&mut self, batch: PendingBatch) {
        let PendingBatch {
            old_shape,
            removed,
            inserted,
            moved,
            section_deletes,
            section_inserts,
            updated,
        } = batch;

        let mut shape = old_shape.clone();
        for path in removed.iter().chain(moved.iter().map(|(from, _)| from)) {
            if let Some(rows) = shape.get_mut(path.section) {
                *rows = rows.saturating_sub(1);
            }
        }
        let mut deletes = section_deletes.clone();
        deletes.sort_unstable_by(|a, b| b.cmp(a));
        for index in deletes {
            if index < shape.len() {
                shape.remove(index);
            }
        }
        let mut inserts = section_inserts;
        inserts.sort_unstable();
        for index in inserts {
            shape.insert(index.min(shape.len()), 0);
        }
        for path in inserted.iter().chain(moved.iter().map(|(_, to)| to)) {
            if let Some(rows) = shape.get_mut(path.section) {
                *rows += 1;
            }
        }

        let old_len: usize = old_shape.iter().sum();
        if old_len > 0 {
            let cursor = path_at(&old_shape, self.selected.min(old_len - 1))
                .unwrap_or_else(|| IndexPath::new(0, 0));

            if let Some((_, to)) = moved.iter().find(|(from, _)| *from == cursor) {
                self.selected = flat_index(&shape, *to);
            } else {
                let mut gone: Vec<usize> = removed
                    .iter()
                    .chain(moved.iter().map(|(from, _)| from))
                    .map(|path| flat_index(&old_shape, *path))
                    .collect();
                for &index in &section_deletes {
                    if let Some(&rows) = old_shape.get(index) {
                        let start = flat_index(&old_shape, IndexPath::new(index, 0));
                        gone.extend(start..start + rows);
                    }
                }
                gone.sort_unstable();
                gone.dedup();

                let old_flat = flat_index(&old_shape, cursor);
                let cursor_gone = gone.binary_search(&old_flat).is_ok();
                let mut position = old_flat - gone.iter().filter(|&&i| i < old_flat).count();

                let mut arrivals: Vec<usize> = inserted
                    .iter()
                    .chain(moved.iter().map(|(_, to)| to))
                    .map(|path| flat_index(&shape, *path))
                    .collect();
                arrivals.sort_unstable();
                for arrival in arrivals {
                    if arrival < position || (!cursor_gone && arrival == position) {
                        position += 1;
                    }
                }
                self.selected = position;
            }
        }

        self.shape = shape;
        self.selected = self.selected.min(self.len().saturating_sub(1));
        if updated > 0 {
            tracing::trace!(updated, "Rows reloaded in place");
        }
    }
}

impl Presentation for ListViewState {
    fn begin_batch(&mut self) {
        self.batch = Some(PendingBatch {
            old_shape: self.shape.clone(),
            ..Default::default()
        });
    }

    fn insert_row(&mut self, path: IndexPath) {
        if let Some(batch) = self.batch.as_mut() {
            batch.inserted.push(path);
        }
    }

    fn delete_row(&mut self, path: IndexPath) {
        if let Some(batch) = self.batch.as_mut() {
            batch.removed.push(path);
        }
    }

    fn update_row(&mut self, _path: IndexPath) {
        if let Some(batch) = self.batch.as_mut() {
            batch.updated += 1;
        }
    }

    fn move_row(&mut self, from: IndexPath, to: IndexPath) {
        if let Some(batch) = self.batch.as_mut() {
            batch.moved.push((from, to));
        }
    }

    fn insert_section(&mut self, index: usize) {
        if let Some(batch) = self.batch.as_mut() {
            batch.section_inserts.push(index);
        }
    }

    fn delete_section(&mut self, index: usize) {
        if let Some(batch) = self.batch.as_mut() {
            batch.section_deletes.push(index);
        }
    }

    fn end_batch(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.resolve(batch);
        }
    }

    fn reload(&mut self, row_counts: &[usize]) {
        self.shape = row_counts.to_vec();
        self.selected = 0;
        self.batch = None;
    }
}
