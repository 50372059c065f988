// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouped-or-flat record sets.
//!
//! A dataset is either a flat list of records ([`DataGroup`]) or a tree of
//! named partitions ([`GroupGroup`]), e.g. one partition per facet value.
//! Ungrouping folds one level at a time until a single flat group remains.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::Scalar;

/// A single data record: named scalar fields.
pub type Datum = HashMap<String, Scalar>;

/// A named flat partition of records.
#[derive(Clone, Debug, Default)]
pub struct DataGroup {
    /// Partition name, e.g. a facet value. Empty for the root dataset.
    pub name: String,
    /// The records in this partition.
    pub data: Vec<Datum>,
}

impl DataGroup {
    /// Creates a named flat group.
    pub fn new(name: impl Into<String>, data: Vec<Datum>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A named group whose children are themselves groups.
///
/// Children are homogeneous: either all flat or all grouped. The groups keep
/// their insertion order, which downstream consumers rely on for stable
/// facet ordering.
#[derive(Clone, Debug, Default)]
pub struct GroupGroup {
    /// Partition name. Empty for the root dataset.
    pub name: String,
    /// The child partitions, in insertion order.
    pub children: Vec<Group>,
}

impl GroupGroup {
    /// Creates a named group of groups.
    pub fn new(name: impl Into<String>, children: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

/// A recursive grouped-or-flat record set.
#[derive(Clone, Debug)]
pub enum Group {
    /// A flat partition.
    Data(DataGroup),
    /// A partition of partitions.
    Group(GroupGroup),
}

impl Group {
    /// A flat group built from plain records.
    pub fn from_records(data: Vec<Datum>) -> Self {
        Self::Data(DataGroup::new("", data))
    }

    /// The partition name.
    pub fn name(&self) -> &str {
        match self {
            Self::Data(g) => &g.name,
            Self::Group(g) => &g.name,
        }
    }

    /// Folds one level of grouping.
    ///
    /// A `GroupGroup` of flat children concatenates their records into a
    /// single flat group; a `GroupGroup` of grouped children recurses one
    /// level into each child. A flat group is returned unchanged.
    pub fn ungroup(self) -> Self {
        let Self::Group(group) = self else {
            return self;
        };

        let flat = group
            .children
            .iter()
            .all(|child| matches!(child, Self::Data(_)));

        if flat {
            let mut data = Vec::new();
            for child in group.children {
                if let Self::Data(child) = child {
                    data.extend(child.data);
                }
            }
            Self::Data(DataGroup::new(group.name, data))
        } else {
            Self::Group(GroupGroup::new(
                group.name,
                group.children.into_iter().map(Self::ungroup).collect(),
            ))
        }
    }

    /// Folds grouping levels until a single flat group remains.
    ///
    /// Idempotent once a flat group is reached.
    pub fn ungroup_all(mut self) -> DataGroup {
        loop {
            match self.ungroup() {
                Self::Data(data) => return data,
                grouped => self = grouped,
            }
        }
    }

    /// Iterates all records depth-first, ignoring the grouping.
    pub fn flat_data(&self) -> FlatData<'_> {
        FlatData {
            stack: alloc::vec![self],
            current: core::slice::Iter::default(),
        }
    }
}

/// Depth-first iterator over every record in a [`Group`].
#[derive(Debug)]
pub struct FlatData<'a> {
    stack: Vec<&'a Group>,
    current: core::slice::Iter<'a, Datum>,
}

impl<'a> Iterator for FlatData<'a> {
    type Item = &'a Datum;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(datum) = self.current.next() {
                return Some(datum);
            }
            match self.stack.pop()? {
                Group::Data(group) => self.current = group.data.iter(),
                Group::Group(group) => {
                    // Reverse keeps depth-first order when popping.
                    self.stack.extend(group.children.iter().rev());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::ToString;
    use alloc::vec;

    use super::*;

    fn datum(value: f64) -> Datum {
        let mut d = Datum::default();
        d.insert("v".to_string(), Scalar::Number(value));
        d
    }

    fn values(group: &DataGroup) -> Vec<f64> {
        group
            .data
            .iter()
            .map(|d| d["v"].as_f64().unwrap())
            .collect()
    }

    #[test]
    fn ungroup_concatenates_flat_children() {
        let group = Group::Group(GroupGroup::new(
            "",
            vec![
                Group::Data(DataGroup::new(
                    "a",
                    vec![datum(1.0), datum(2.0), datum(3.0)],
                )),
                Group::Data(DataGroup::new("b", vec![datum(4.0), datum(5.0)])),
            ],
        ));

        let Group::Data(flat) = group.ungroup() else {
            panic!("expected a flat group");
        };
        assert_eq!(values(&flat), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn nested_groups_ungroup_one_level_at_a_time() {
        let nested = Group::Group(GroupGroup::new(
            "",
            vec![Group::Group(GroupGroup::new(
                "outer",
                vec![
                    Group::Data(DataGroup::new("a", vec![datum(1.0)])),
                    Group::Data(DataGroup::new("b", vec![datum(2.0)])),
                ],
            ))],
        ));

        let once = nested.ungroup();
        let Group::Group(ref g) = once else {
            panic!("one level of grouping should remain");
        };
        assert!(matches!(g.children[0], Group::Data(_)));

        let flat = once.ungroup_all();
        assert_eq!(values(&flat), vec![1.0, 2.0]);
    }

    #[test]
    fn ungroup_all_is_idempotent_on_flat_data() {
        let flat = Group::from_records(vec![datum(1.0)]).ungroup_all();
        let again = Group::Data(flat.clone()).ungroup_all();
        assert_eq!(values(&flat), values(&again));
    }

    #[test]
    fn flat_data_visits_records_depth_first() {
        let group = Group::Group(GroupGroup::new(
            "",
            vec![
                Group::Data(DataGroup::new("a", vec![datum(1.0), datum(2.0)])),
                Group::Group(GroupGroup::new(
                    "g",
                    vec![Group::Data(DataGroup::new("b", vec![datum(3.0)]))],
                )),
            ],
        ));

        let seen: Vec<f64> = group
            .flat_data()
            .map(|d| d["v"].as_f64().unwrap())
            .collect();
        assert_eq!(seen, vec![1.0, 2.0, 3.0]);
    }
}
