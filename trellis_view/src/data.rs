// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The data-source contract and field accessors.
//!
//! Data loading is the host's business. The engine only ever asks a
//! [`Collector`] two questions: "are you complete" and "give me the
//! materialized records". A domain query against an incomplete collector
//! yields an undefined domain rather than an error, so hosts can render
//! placeholder frames while loads are in flight.

extern crate alloc;

use alloc::string::String;

use trellis_core::{Datum, Group, Scalar};

/// A loaded-or-loading dataset attached to a view.
pub trait Collector: core::fmt::Debug {
    /// Whether the underlying load has finished.
    fn is_complete(&self) -> bool;

    /// The materialized records, or `None` until the load completes.
    fn data(&self) -> Option<Group>;
}

/// A collector over records that are already in memory.
///
/// Inline `data.values` specs produce one of these; it is always complete.
#[derive(Clone, Debug)]
pub struct MemoryCollector {
    group: Group,
}

impl MemoryCollector {
    /// Wraps plain records in a complete collector.
    pub fn new(records: alloc::vec::Vec<Datum>) -> Self {
        Self {
            group: Group::from_records(records),
        }
    }

    /// Wraps an already grouped dataset in a complete collector.
    pub fn grouped(group: Group) -> Self {
        Self { group }
    }
}

impl Collector for MemoryCollector {
    fn is_complete(&self) -> bool {
        true
    }

    fn data(&self) -> Option<Group> {
        Some(self.group.clone())
    }
}

/// Extracts a channel's value from a record.
#[derive(Clone, Debug, PartialEq)]
pub enum Accessor {
    /// Look up a named field.
    Field(String),
    /// A constant value, independent of the record.
    ///
    /// Constants live in range space and never contribute to domains.
    Constant(Scalar),
}

impl Accessor {
    /// The value this accessor yields for `datum`.
    pub fn value(&self, datum: &Datum) -> Option<Scalar> {
        match self {
            Self::Field(field) => datum.get(field.as_str()).cloned(),
            Self::Constant(value) => Some(value.clone()),
        }
    }

    /// The field name, if this accessor reads one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Field(field) => Some(field),
            Self::Constant(_) => None,
        }
    }
}
