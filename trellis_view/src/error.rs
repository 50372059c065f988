// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while building, resolving, and decorating a view tree.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use trellis_core::{DomainError, DomainType};

use crate::axis::AxisOrient;
use crate::view::Channel;

/// An error raised by the view engine.
///
/// Every variant carries the hierarchical path of the originating view
/// (names joined by `/`) so that hosts can point at the offending part of a
/// deeply nested spec.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewError {
    /// A spec node matched more than one recognized view shape.
    AmbiguousSpec {
        /// Path of the view being built.
        path: String,
        /// The discriminating keys that were present simultaneously.
        keys: Vec<String>,
    },
    /// A spec node matched none of the recognized view shapes.
    UnrecognizedSpec {
        /// Path of the view being built.
        path: String,
    },
    /// A spec node failed to deserialize into its recognized shape.
    SpecDecode {
        /// Path of the view being built.
        path: String,
        /// The deserializer's message.
        message: String,
    },
    /// An encoding referenced a channel the engine does not know.
    UnknownChannel {
        /// Path of the view being built.
        path: String,
        /// The unrecognized channel name.
        channel: String,
    },
    /// A `resolve` block used a policy outside shared/independent/excluded.
    InvalidPolicy {
        /// Path of the view being built.
        path: String,
        /// The unrecognized policy value.
        policy: String,
    },
    /// An axis `orient` was not one of top/right/bottom/left.
    InvalidOrient {
        /// Path of the view being built.
        path: String,
        /// The unrecognized orient value.
        orient: String,
    },
    /// A channel's `type` was not a known data type.
    InvalidDataType {
        /// Path of the view being built.
        path: String,
        /// The unrecognized type name.
        name: String,
    },
    /// A `width`/`height` value could not be interpreted.
    InvalidSize {
        /// Path of the view being built.
        path: String,
        /// The offending value, rendered as text.
        value: String,
    },
    /// A facet mapping declared both a column and a row field.
    InvalidFacetMapping {
        /// Path of the view being built.
        path: String,
    },
    /// An `import` node reached the builder unresolved.
    ///
    /// Imports are expanded by the host before the tree is built; the core
    /// never fetches specs itself.
    UnresolvedImport {
        /// Path of the view being built.
        path: String,
    },
    /// The view context did not recognize a mark type.
    UnknownMark {
        /// Path of the unit view owning the mark.
        path: String,
        /// The requested mark type.
        kind: String,
    },
    /// A domain was queried on a channel that never declared a data type.
    MissingDataType {
        /// Path of a view contributing to the resolution.
        path: String,
        /// The channel lacking a type.
        channel: Channel,
    },
    /// Two contributions to one resolution declared different data types.
    TypeMismatch {
        /// Path of the view whose contribution conflicted.
        path: String,
        /// The channel being resolved.
        channel: Channel,
        /// The type established by earlier contributions.
        expected: DomainType,
        /// The conflicting type.
        actual: DomainType,
    },
    /// Two axis resolutions claimed the same orientation slot.
    SlotCollision {
        /// Path of the decorated view.
        path: String,
        /// The positional channel being decorated.
        channel: Channel,
        /// The contested orientation.
        orient: AxisOrient,
    },
    /// More axis resolutions than orientation slots for a channel.
    NoFreeSlot {
        /// Path of the decorated view.
        path: String,
        /// The positional channel being decorated.
        channel: Channel,
    },
    /// A domain operation failed (cross-type merge, piecewise mutation, ...).
    Domain {
        /// Path of the view whose domain operation failed.
        path: String,
        /// The underlying domain error.
        source: DomainError,
    },
}

impl core::fmt::Display for ViewError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AmbiguousSpec { path, keys } => {
                write!(f, "{path}: spec matches multiple view shapes: {keys:?}")
            }
            Self::UnrecognizedSpec { path } => {
                write!(
                    f,
                    "{path}: spec matches no recognized view shape \
                     (expected mark, layer, facet, samples, or a concat variant)"
                )
            }
            Self::SpecDecode { path, message } => {
                write!(f, "{path}: invalid spec: {message}")
            }
            Self::UnknownChannel { path, channel } => {
                write!(f, "{path}: unknown encoding channel {channel:?}")
            }
            Self::InvalidPolicy { path, policy } => {
                write!(f, "{path}: invalid resolution policy {policy:?}")
            }
            Self::InvalidOrient { path, orient } => {
                write!(f, "{path}: invalid axis orient {orient:?}")
            }
            Self::InvalidDataType { path, name } => {
                write!(f, "{path}: invalid data type {name:?}")
            }
            Self::InvalidSize { path, value } => {
                write!(f, "{path}: invalid size {value:?}")
            }
            Self::InvalidFacetMapping { path } => {
                write!(f, "{path}: facet mapping must set either column or row, not both")
            }
            Self::UnresolvedImport { path } => {
                write!(f, "{path}: import nodes must be expanded before building the tree")
            }
            Self::UnknownMark { path, kind } => {
                write!(f, "{path}: unknown mark type {kind:?}")
            }
            Self::MissingDataType { path, channel } => {
                write!(f, "{path}: channel {} has no data type", channel.as_str())
            }
            Self::TypeMismatch {
                path,
                channel,
                expected,
                actual,
            } => write!(
                f,
                "{path}: channel {} mixes data types {} and {}",
                channel.as_str(),
                expected.as_str(),
                actual.as_str()
            ),
            Self::SlotCollision {
                path,
                channel,
                orient,
            } => write!(
                f,
                "{path}: axis slot {} for channel {} is already taken",
                orient.as_str(),
                channel.as_str()
            ),
            Self::NoFreeSlot { path, channel } => write!(
                f,
                "{path}: no free axis slot remains for channel {}",
                channel.as_str()
            ),
            Self::Domain { path, source } => write!(f, "{path}: {source}"),
        }
    }
}

impl core::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Domain { source, .. } => Some(source),
            _ => None,
        }
    }
}
