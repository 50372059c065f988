// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The mark contract between the engine and the host renderer.
//!
//! The engine never draws anything itself. A [`Mark`] is an opaque drawable
//! owned by the host; the engine only schedules calls against it: one
//! [`Mark::prepare_render`] per frame, [`Mark::set_viewport`] whenever the
//! target rectangle changes, and one [`Mark::draw`] per buffered request.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;

use trellis_core::{LocSize, Rect};

use crate::axis::{AxisOrient, AxisScene};

/// A stable identity for a mark, used to group buffered draw requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u64);

impl MarkId {
    /// Creates an id from a raw value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// A drawable primitive owned by a unit view.
///
/// Implementations typically hold GPU resources behind interior mutability;
/// the engine calls every hook through a shared reference.
pub trait Mark: core::fmt::Debug {
    /// The identity used for draw-request batching.
    fn id(&self) -> MarkId;

    /// One-time per-frame setup, invoked once per mark before its requests.
    fn prepare_render(&self);

    /// Points the mark at a new target rectangle.
    ///
    /// Invoked only when the rectangle differs from the previous request's.
    fn set_viewport(&self, coords: Rect);

    /// Draws one buffered request.
    fn draw(&self, options: &RenderingOptions);
}

/// Per-request options threaded from containers down to marks.
#[derive(Clone, Debug, Default)]
pub struct RenderingOptions {
    /// The facet category the request belongs to, if any.
    pub facet_id: Option<String>,
    /// The vertical band of the current sample, in view pixels.
    pub sample_facet: Option<LocSize>,
    /// A rectangle the draw must not paint outside of.
    pub clip_rect: Option<Rect>,
    /// Generated axis geometry, present only for axis-view requests.
    pub axis_scene: Option<Arc<AxisScene>>,
}

/// What kind of mark the builder is asking the host to create.
#[derive(Clone, Copy, Debug)]
pub enum MarkInit<'a> {
    /// A data-encoded mark from a unit view's `mark` property.
    Encoded {
        /// The mark type name, e.g. `"point"` or `"rect"`.
        kind: &'a str,
    },
    /// An axis mark; its geometry arrives via [`RenderingOptions::axis_scene`].
    Axis {
        /// The edge the axis is attached to.
        orient: AxisOrient,
    },
    /// A plot background fill/stroke behind a decorated view.
    Background {
        /// CSS-ish fill color, if any.
        fill: Option<&'a str>,
        /// CSS-ish stroke color, if any.
        stroke: Option<&'a str>,
    },
}
