// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative view trees for `trellis_core`.
//!
//! This crate turns a JSON-compatible spec into a renderable hierarchy:
//! - **Specs** are decoded into a closed set of view shapes (unit, layer,
//!   concat, facet, sample) and built into an arena-backed [`ViewTree`].
//! - **Resolutions** share scales and axes across subtrees per configurable
//!   policies, accumulating domains from every contributing view.
//! - **Decorators** are spliced around axis-bearing views, claiming
//!   orientation slots and reserving the room ticks, labels, and titles
//!   need.
//! - **Rendering** walks the tree once into a buffering context whose flush
//!   replays draw requests grouped by mark, so per-mark setup happens once
//!   per frame.
//!
//! Actual drawing and data loading stay on the host side, behind the
//! [`Mark`], [`Collector`], and [`ViewContext`] traits.

#![no_std]

extern crate alloc;

mod axis;
mod data;
mod decorator;
mod error;
mod factory;
#[cfg(not(feature = "std"))]
mod float;
mod mark;
mod render;
mod resolution;
mod spec;
#[cfg(test)]
mod testing;
mod view;

pub use axis::{
    AxisFragment, AxisOrient, AxisOverrides, AxisProps, AxisScene, HeuristicTextMeasurer,
    TextAnchor, TextBaseline, TextMeasurer, Tick, axis_scene, format_tick, generate_ticks,
    measure_extent,
};
pub use data::{Accessor, Collector, MemoryCollector};
pub use error::ViewError;
pub use factory::ViewContext;
pub use mark::{Mark, MarkId, MarkInit, RenderingOptions};
pub use render::{
    CompositeViewRenderingContext, DeferredViewRenderingContext, LayoutRecorder,
    ViewRenderingContext,
};
pub use resolution::{
    AxisMember, AxisResolution, AxisResolutionId, ResolutionPolicy, ScaleMember, ScaleResolution,
    ScaleResolutionId,
};
pub use spec::{
    AxisDefSpec, ChannelDefSpec, CommonSpec, ConcatSpec, DataSpec, EncodingSpec, FacetDefSpec,
    FacetFieldDefSpec, FacetSpec, ImportDefSpec, ImportSpec, LayerSpec, MarkDefSpec,
    MarkPropsSpec, PaddingSpec, ResolveSpec, SampleDefSpec, SampleSpec, ScaleDefSpec, ShapeError,
    SizeSpec, UnitSpec, ViewBackgroundSpec, ViewSpec,
};
pub use view::{
    AxisInfo, AxisSetting, BackgroundStyle, Channel, ChannelEncoding, ConcatDirection,
    ConcatInfo, DecoratorInfo, FacetInfo, LayerInfo, ResolveMaps, SampleInfo, UnitInfo, View,
    ViewId, ViewKind, ViewTree,
};
