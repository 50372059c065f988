// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf building blocks for the Trellis view-composition engine.
//!
//! This crate holds the value types and algorithms that carry no knowledge of
//! the view hierarchy:
//! - **Geometry**: immutable [`Rect`] and [`Padding`].
//! - **Flex layout**: one-dimensional size resolution inspired by CSS flexbox
//!   ([`map_to_pixel_coords`] and friends).
//! - **Domains**: typed, growable domain accumulators ([`DomainArray`]).
//! - **Groups**: recursive grouped-or-flat record sets ([`Group`]).
//!
//! The view tree, resolution sharing, and rendering live in `trellis_view`.

#![no_std]

extern crate alloc;

mod domain;
mod flex;
#[cfg(not(feature = "std"))]
mod float;
mod group;
mod padding;
mod rect;

pub use domain::{DiscreteDomain, DomainArray, DomainError, DomainType, Scalar, create_domain};
pub use flex::{
    FlexDimensions, FlexOpts, LocSize, SizeDef, SizeInput, is_stretching, map_to_pixel_coords,
    minimum_size,
};
pub use group::{DataGroup, Datum, FlatData, Group, GroupGroup};
pub use padding::Padding;
pub use rect::Rect;
