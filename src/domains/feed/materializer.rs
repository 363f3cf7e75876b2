// Row-to-entity materializer
//
// Joined queries return one row per (parent, child) pair, or a single row
// with NULL child columns for a parent without children. The materializer
// folds that stream back into parents with nested children, keeping parents
// in the order they were first seen.

use std::collections::HashMap;

use crate::error::AppResult;

/// A parent that can receive children.
pub trait Nest<C> {
    fn nest(&mut self, child: C);
}

/// One row of a parent/child join.
pub trait JoinedRow: Sized {
    type Child;
    type Parent: Nest<Self::Child>;

    /// Identity of the parent this row belongs to.
    fn parent_key(&self) -> AppResult<i64>;

    /// Build the parent from this row's parent columns. Only called for the
    /// first row of each parent.
    fn parent(&self) -> AppResult<Self::Parent>;

    /// The child carried by this row, or `None` when its child columns are NULL.
    fn into_child(self) -> AppResult<Option<Self::Child>>;
}

pub struct Materializer<R: JoinedRow> {
    index: HashMap<i64, usize>,
    parents: Vec<R::Parent>,
    rows_seen: usize,
}

impl<R: JoinedRow> Materializer<R> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            parents: Vec::new(),
            rows_seen: 0,
        }
    }

    /// Fold one row in. A parent is created at most once; a child is
    /// appended only when the row carries one.
    pub fn push(&mut self, row: R) -> AppResult<()> {
        self.rows_seen += 1;
        let key = row.parent_key()?;

        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let parent = row.parent()?;
                self.parents.push(parent);
                let slot = self.parents.len() - 1;
                self.index.insert(key, slot);
                slot
            }
        };

        if let Some(child) = row.into_child()? {
            self.parents[slot].nest(child);
        }
        Ok(())
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn into_entities(self) -> Vec<R::Parent> {
        self.parents
    }

    /// `None` when no parent was materialized.
    pub fn into_non_empty(self) -> Option<Vec<R::Parent>> {
        if self.parents.is_empty() {
            None
        } else {
            Some(self.parents)
        }
    }
}

impl<R: JoinedRow> Default for Materializer<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Parent {
        id: i64,
        children: Vec<i64>,
    }

    impl Nest<i64> for Parent {
        fn nest(&mut self, child: i64) {
            self.children.push(child);
        }
    }

    struct Row(i64, Option<i64>);

    impl JoinedRow for Row {
        type Child = i64;
        type Parent = Parent;

        fn parent_key(&self) -> AppResult<i64> {
            Ok(self.0)
        }

        fn parent(&self) -> AppResult<Parent> {
            Ok(Parent {
                id: self.0,
                children: Vec::new(),
            })
        }

        fn into_child(self) -> AppResult<Option<i64>> {
            Ok(self.1)
        }
    }

    fn fold(rows: Vec<Row>) -> Materializer<Row> {
        let mut m = Materializer::new();
        for row in rows {
            m.push(row).unwrap();
        }
        m
    }

    #[test]
    fn test_parent_without_children_is_emitted_once() {
        let m = fold(vec![Row(1, None)]);
        assert_eq!(m.rows_seen(), 1);
        assert_eq!(
            m.into_entities(),
            vec![Parent {
                id: 1,
                children: vec![]
            }]
        );
    }

    #[test]
    fn test_children_are_grouped_without_duplicating_parent() {
        let m = fold(vec![Row(1, Some(10)), Row(1, Some(11)), Row(1, Some(12))]);
        assert_eq!(m.len(), 1);
        assert_eq!(m.into_entities()[0].children, vec![10, 11, 12]);
    }

    #[test]
    fn test_first_seen_order_is_kept() {
        let m = fold(vec![
            Row(3, Some(30)),
            Row(1, None),
            Row(3, Some(31)),
            Row(2, Some(20)),
        ]);
        let ids: Vec<i64> = m.into_entities().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_empty_stream_is_none() {
        let m = fold(vec![]);
        assert!(m.is_empty());
        assert!(m.into_non_empty().is_none());
    }
}
