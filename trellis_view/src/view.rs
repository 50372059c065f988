// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The typed view tree.
//!
//! Views live in an arena indexed by [`ViewId`]; children are owned through
//! their ids and each view keeps a non-owning id back to its parent, so
//! upward walks (resolution search, path building) need no reference cycles.
//! The tree is built once from a spec, resolutions and decorators are wired
//! in post-construction passes, and rendering is a read-only traversal.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use hashbrown::HashMap;
use trellis_core::{
    DomainArray, DomainType, FlexDimensions, FlexOpts, Group, LocSize, Padding, Rect, Scalar,
    SizeDef, SizeInput, map_to_pixel_coords,
};

use crate::axis::{AxisOrient, AxisProps, AxisOverrides, Tick, axis_scene, scalar_label};
use crate::data::{Accessor, Collector};
use crate::error::ViewError;
use crate::mark::{Mark, RenderingOptions};
use crate::render::ViewRenderingContext;
use crate::resolution::{
    AxisMember, AxisResolution, AxisResolutionId, ResolutionPolicy, ScaleMember, ScaleResolution,
    ScaleResolutionId, resolution_target,
};

/// A visual channel an encoding can bind to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Horizontal position.
    X,
    /// Vertical position.
    Y,
    /// Mark color.
    Color,
    /// Mark opacity.
    Opacity,
    /// Mark size.
    Size,
    /// Point shape.
    Shape,
    /// Sample identity, consumed by sample views.
    Sample,
}

impl Channel {
    /// Parses a channel name from a spec.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "color" => Some(Self::Color),
            "opacity" => Some(Self::Opacity),
            "size" => Some(Self::Size),
            "shape" => Some(Self::Shape),
            "sample" => Some(Self::Sample),
            _ => None,
        }
    }

    /// The spec-facing channel name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Color => "color",
            Self::Opacity => "opacity",
            Self::Size => "size",
            Self::Shape => "shape",
            Self::Sample => "sample",
        }
    }

    /// Whether the channel is positional and thus can carry an axis.
    pub fn is_positional(&self) -> bool {
        matches!(self, Self::X | Self::Y)
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel's axis configuration after spec decoding.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AxisSetting {
    /// Draw an axis with default properties.
    #[default]
    Default,
    /// The spec set `axis: null`; no axis is generated.
    Disabled,
    /// Draw an axis with the given property overrides.
    Overrides(AxisOverrides),
}

/// The effective encoding of one channel, after inheritance is applied.
#[derive(Clone, Debug)]
pub struct ChannelEncoding {
    /// How values are extracted from data.
    pub accessor: Accessor,
    /// The declared data type, if any.
    pub data_type: Option<DomainType>,
    /// The encoding-level title.
    pub title: Option<String>,
    /// An explicit domain, bypassing data extraction.
    pub explicit_domain: Option<Vec<Scalar>>,
    /// Whether a quantitative domain must include zero.
    pub zero: bool,
    /// The axis configuration.
    pub axis: AxisSetting,
}

/// Index of a view in its tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewId(usize);

impl ViewId {
    /// Builds an id from a raw arena index.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Scale and axis resolution policies declared on a view.
#[derive(Clone, Debug, Default)]
pub struct ResolveMaps {
    /// Per-channel scale policies.
    pub scale: HashMap<Channel, ResolutionPolicy>,
    /// Scale policy for channels not listed explicitly.
    pub scale_default: Option<ResolutionPolicy>,
    /// Per-channel axis policies.
    pub axis: HashMap<Channel, ResolutionPolicy>,
    /// Axis policy for channels not listed explicitly.
    pub axis_default: Option<ResolutionPolicy>,
}

/// Cached per-view layout values, invalidated as a set by the layout
/// broadcast. Slots are explicit fields rather than string keys so a missed
/// invalidation is a visible bug, not a stale lookup.
#[derive(Debug, Default)]
pub(crate) struct LayoutCache {
    size: Cell<Option<FlexDimensions>>,
    axis_extents: Cell<Option<Padding>>,
}

impl LayoutCache {
    fn clear(&self) {
        self.size.set(None);
        self.axis_extents.set(None);
    }
}

/// A unit view's mark binding.
#[derive(Debug)]
pub struct UnitInfo {
    /// The mark this unit draws.
    pub mark: Arc<dyn Mark>,
    /// The mark type name from the spec.
    pub mark_kind: String,
    /// Whether draws clip to the unit's rectangle.
    pub clip: bool,
}

/// A layer view's children, bottom-most first.
#[derive(Debug)]
pub struct LayerInfo {
    /// The overlaid children.
    pub children: Vec<ViewId>,
}

/// The main axis of a concat view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConcatDirection {
    /// Children side by side.
    Horizontal,
    /// Children stacked top to bottom.
    Vertical,
    /// Children in a wrapping grid.
    Grid,
}

/// A concat view's children and layout parameters.
#[derive(Debug)]
pub struct ConcatInfo {
    /// The layout direction.
    pub direction: ConcatDirection,
    /// The children, in layout order.
    pub children: Vec<ViewId>,
    /// Gap between children in pixels.
    pub spacing: f64,
    /// Wrap after this many columns; grid direction only.
    pub columns: Option<usize>,
}

/// A facet view: one child replicated per category value.
#[derive(Debug)]
pub struct FacetInfo {
    /// The replicated child.
    pub child: ViewId,
    /// The field whose distinct values become facets.
    pub field: String,
    /// Wrap after this many columns; `None` stacks vertically.
    pub columns: Option<usize>,
    /// Gap between facet cells in pixels.
    pub spacing: f64,
}

/// A sample view: one child rendered once per sample identity, each pass
/// confined to a horizontal band.
#[derive(Debug)]
pub struct SampleInfo {
    /// The replicated child.
    pub child: ViewId,
    /// Explicit sample identities; when `None` they come from the `sample`
    /// channel's resolved domain.
    pub explicit_samples: Option<Vec<String>>,
    /// Gap between sample bands in pixels.
    pub spacing: f64,
}

/// A decorator spliced around a view that needs axes.
#[derive(Debug)]
pub struct DecoratorInfo {
    /// The decorated view.
    pub child: ViewId,
    /// Axis views by orientation, indexed by [`orient_index`].
    pub axes: [Option<ViewId>; 4],
    /// The background unit, drawn under the child.
    pub background: Option<ViewId>,
}

/// The arena slot an orientation maps to in [`DecoratorInfo::axes`].
pub(crate) fn orient_index(orient: AxisOrient) -> usize {
    match orient {
        AxisOrient::Top => 0,
        AxisOrient::Right => 1,
        AxisOrient::Bottom => 2,
        AxisOrient::Left => 3,
    }
}

/// An axis view generated by a decorator.
#[derive(Debug)]
pub struct AxisInfo {
    /// The axis resolution this view renders.
    pub resolution: AxisResolutionId,
    /// The edge the axis is attached to.
    pub orient: AxisOrient,
    /// The host-provided mark that draws the axis geometry.
    pub mark: Arc<dyn Mark>,
    /// Effective properties, refreshed when data completes.
    pub props: AxisProps,
    /// Generated ticks in domain order.
    pub ticks: Vec<Tick>,
    /// Perpendicular thickness in pixels, excluding the offset gap.
    pub extent: f64,
}

/// The kind-specific payload of a view.
#[derive(Debug)]
pub enum ViewKind {
    /// A leaf owning one mark.
    Unit(UnitInfo),
    /// An overlay of children in one rectangle.
    Layer(LayerInfo),
    /// Children laid out along a main axis.
    Concat(ConcatInfo),
    /// A child replicated per category value.
    Facet(FacetInfo),
    /// A child replicated per sample identity.
    Sample(SampleInfo),
    /// A synthetic wrapper owning axes and a background.
    Decorator(DecoratorInfo),
    /// A synthetic axis strip inside a decorator.
    Axis(AxisInfo),
}

/// Plot background styling from the spec's `view` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackgroundStyle {
    /// Fill color.
    pub fill: Option<String>,
    /// Stroke color.
    pub stroke: Option<String>,
}

/// One node of the view tree.
#[derive(Debug)]
pub struct View {
    /// The view's name; generated from its kind and id when the spec gave
    /// none.
    pub name: String,
    /// The parent view, absent for the root.
    pub(crate) parent: Option<ViewId>,
    /// Kind-specific payload.
    pub kind: ViewKind,
    /// Effective channel encodings; populated on unit views.
    pub encoding: Vec<(Channel, ChannelEncoding)>,
    /// Declared resolution policies.
    pub resolve: ResolveMaps,
    /// Authored width.
    pub width: Option<SizeInput>,
    /// Authored height.
    pub height: Option<SizeInput>,
    /// Space around the view's content.
    pub padding: Padding,
    /// Whether the view renders.
    pub visible: bool,
    /// Plot background styling, consumed when a decorator wraps this view.
    pub background: Option<BackgroundStyle>,
    /// The data source attached at this level, inherited by descendants.
    pub collector: Option<Arc<dyn Collector>>,
    /// Scale resolutions hosted at this view.
    pub(crate) scale_res: HashMap<Channel, ScaleResolutionId>,
    /// Axis resolutions hosted at this view.
    pub(crate) axis_res: HashMap<Channel, AxisResolutionId>,
    pub(crate) cache: LayoutCache,
}

impl View {
    /// A view with the given name, parent, and kind; everything else
    /// defaulted.
    pub fn new(name: impl Into<String>, parent: Option<ViewId>, kind: ViewKind) -> Self {
        Self {
            name: name.into(),
            parent,
            kind,
            encoding: Vec::new(),
            resolve: ResolveMaps::default(),
            width: None,
            height: None,
            padding: Padding::zero(),
            visible: true,
            background: None,
            collector: None,
            scale_res: HashMap::new(),
            axis_res: HashMap::new(),
            cache: LayoutCache::default(),
        }
    }
}

/// The whole view hierarchy plus its resolution arenas.
#[derive(Debug)]
pub struct ViewTree {
    pub(crate) views: Vec<View>,
    pub(crate) root: ViewId,
    pub(crate) scale_resolutions: Vec<ScaleResolution>,
    pub(crate) axis_resolutions: Vec<AxisResolution>,
    device_pixel_ratio: Option<f64>,
}

impl ViewTree {
    /// A tree over the given arena, rooted at `root`.
    pub(crate) fn new(views: Vec<View>, root: ViewId) -> Self {
        Self {
            views,
            root,
            scale_resolutions: Vec::new(),
            axis_resolutions: Vec::new(),
            device_pixel_ratio: None,
        }
    }

    /// The root view.
    pub fn root(&self) -> ViewId {
        self.root
    }

    /// The view behind an id.
    pub fn view(&self, id: ViewId) -> &View {
        &self.views[id.0]
    }

    pub(crate) fn view_mut(&mut self, id: ViewId) -> &mut View {
        &mut self.views[id.0]
    }

    /// The parent of a view, if any.
    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.views[id.0].parent
    }

    /// Enables snapping of flex layouts to device pixel boundaries.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.device_pixel_ratio = Some(ratio);
        self.invalidate_layout();
    }

    /// The children of a view, in declaration order. Decorator children are
    /// listed background first, then the decorated view, then axes.
    pub fn children(&self, id: ViewId) -> Vec<ViewId> {
        match &self.views[id.0].kind {
            ViewKind::Unit(_) | ViewKind::Axis(_) => Vec::new(),
            ViewKind::Layer(info) => info.children.clone(),
            ViewKind::Concat(info) => info.children.clone(),
            ViewKind::Facet(info) => vec![info.child],
            ViewKind::Sample(info) => vec![info.child],
            ViewKind::Decorator(info) => {
                let mut children = Vec::new();
                children.extend(info.background);
                children.push(info.child);
                children.extend(info.axes.iter().flatten());
                children
            }
        }
    }

    /// The hierarchical path of a view: ancestor names joined by `/`.
    pub fn path(&self, id: ViewId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(view) = current {
            names.push(self.views[view.0].name.as_str());
            current = self.views[view.0].parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Finds a view by name, depth-first.
    pub fn find_view(&self, name: &str) -> Option<ViewId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.views[id.0].name == name {
                return Some(id);
            }
            let mut children = self.children(id);
            children.reverse();
            stack.append(&mut children);
        }
        None
    }

    /// The materialized dataset visible to a view.
    ///
    /// Walks up to the nearest ancestor (or self) with a collector. Yields
    /// `None` while the collector is absent or has not completed, so domains
    /// stay undefined rather than partial.
    pub fn collected_data(&self, id: ViewId) -> Option<Group> {
        let mut current = Some(id);
        while let Some(view) = current {
            if let Some(collector) = &self.views[view.0].collector {
                if !collector.is_complete() {
                    return None;
                }
                return collector.data();
            }
            current = self.views[view.0].parent;
        }
        None
    }

    /// Clears every view's cached layout values, depth-first from the root.
    ///
    /// Must be invoked after any structural size change (resize, data
    /// reload, axis refresh) and before the next render.
    pub fn invalidate_layout(&self) {
        self.invalidate_from(self.root);
    }

    fn invalidate_from(&self, id: ViewId) {
        self.views[id.0].cache.clear();
        for child in self.children(id) {
            self.invalidate_from(child);
        }
    }

    // ------------------------------------------------------------------
    // Resolution.

    /// The configured-or-default scale policy of a view for a channel.
    pub(crate) fn scale_policy(&self, id: ViewId, channel: Channel) -> ResolutionPolicy {
        let view = &self.views[id.0];
        if let Some(&policy) = view.resolve.scale.get(&channel) {
            return policy;
        }
        if let Some(policy) = view.resolve.scale_default {
            return policy;
        }
        default_policy(&view.kind, channel)
    }

    /// The configured-or-default axis policy of a view for a channel.
    pub(crate) fn axis_policy(&self, id: ViewId, channel: Channel) -> ResolutionPolicy {
        let view = &self.views[id.0];
        if let Some(&policy) = view.resolve.axis.get(&channel) {
            return policy;
        }
        if let Some(policy) = view.resolve.axis_default {
            return policy;
        }
        default_policy(&view.kind, channel)
    }

    /// Registers every unit view's encodings into scale resolutions hosted
    /// at the levels the sharing policies select.
    pub(crate) fn resolve_scales(&mut self) -> Result<(), ViewError> {
        for index in 0..self.views.len() {
            let id = ViewId(index);
            if !matches!(self.views[index].kind, ViewKind::Unit(_)) {
                continue;
            }
            let encodings = self.views[index].encoding.clone();
            for (channel, encoding) in encodings {
                if encoding.accessor.field().is_none() && encoding.explicit_domain.is_none() {
                    // Constant values need no scale.
                    continue;
                }
                let target =
                    resolution_target(self, id, channel, |tree, view, ch| {
                        tree.scale_policy(view, ch)
                    });
                let resolution = self.scale_resolution_slot(target, channel);
                let path = self.path(id);
                let member = ScaleMember {
                    view: id,
                    channel,
                    accessor: encoding.accessor.clone(),
                    explicit_domain: encoding.explicit_domain.clone(),
                };
                self.scale_resolutions[resolution].push_member(
                    member,
                    encoding.data_type,
                    encoding.zero,
                    &path,
                )?;
            }
        }
        Ok(())
    }

    fn scale_resolution_slot(&mut self, target: ViewId, channel: Channel) -> ScaleResolutionId {
        if let Some(&existing) = self.views[target.0].scale_res.get(&channel) {
            return existing;
        }
        self.scale_resolutions.push(ScaleResolution::default());
        let id = self.scale_resolutions.len() - 1;
        self.views[target.0].scale_res.insert(channel, id);
        id
    }

    /// Registers axis contributions for positional field encodings.
    ///
    /// The walk mirrors scale resolution but only climbs through layers and
    /// never above the channel's scale resolution: a shared axis without a
    /// shared scale would draw ticks that fit none of its members.
    pub(crate) fn resolve_axes(&mut self) -> Result<(), ViewError> {
        for index in 0..self.views.len() {
            let id = ViewId(index);
            if !matches!(self.views[index].kind, ViewKind::Unit(_)) {
                continue;
            }
            let encodings = self.views[index].encoding.clone();
            for (channel, encoding) in encodings {
                if !channel.is_positional() {
                    continue;
                }
                let Some(field) = encoding.accessor.field() else {
                    continue;
                };
                if encoding.axis == AxisSetting::Disabled {
                    continue;
                }
                let scale_target =
                    resolution_target(self, id, channel, |tree, view, ch| {
                        tree.scale_policy(view, ch)
                    });
                let Some(&scale) = self.views[scale_target.0].scale_res.get(&channel) else {
                    continue;
                };

                let mut target = id;
                while target != scale_target {
                    let Some(parent) = self.parent(target) else {
                        break;
                    };
                    if !matches!(self.views[parent.0].kind, ViewKind::Layer(_)) {
                        break;
                    }
                    if self.axis_policy(target, channel) == ResolutionPolicy::Excluded {
                        break;
                    }
                    match self.axis_policy(parent, channel) {
                        ResolutionPolicy::Independent => break,
                        ResolutionPolicy::Shared | ResolutionPolicy::Excluded => target = parent,
                    }
                }

                let resolution = self.axis_resolution_slot(target, channel);
                self.axis_resolutions[resolution].scale = Some(scale);
                let title = encoding.title.clone().or_else(|| Some(field.to_string()));
                let overrides = match &encoding.axis {
                    AxisSetting::Overrides(overrides) => overrides.clone(),
                    _ => AxisOverrides::default(),
                };
                let member = AxisMember {
                    view: id,
                    title,
                    overrides,
                };
                self.axis_resolutions[resolution].push_member(member, channel);
            }
        }
        Ok(())
    }

    fn axis_resolution_slot(&mut self, target: ViewId, channel: Channel) -> AxisResolutionId {
        if let Some(&existing) = self.views[target.0].axis_res.get(&channel) {
            return existing;
        }
        self.axis_resolutions.push(AxisResolution::default());
        let id = self.axis_resolutions.len() - 1;
        self.views[target.0].axis_res.insert(channel, id);
        id
    }

    /// The scale resolution visible to a view on a channel.
    ///
    /// Looks at the view itself first, then each ancestor in turn, so leaves
    /// see the shared resolution hosted above them while anything outside an
    /// excluded subtree never does.
    pub fn scale_resolution(&self, id: ViewId, channel: Channel) -> Option<&ScaleResolution> {
        let mut current = Some(id);
        while let Some(view) = current {
            if let Some(&resolution) = self.views[view.0].scale_res.get(&channel) {
                return Some(&self.scale_resolutions[resolution]);
            }
            current = self.views[view.0].parent;
        }
        None
    }

    /// The axis resolution visible to a view on a channel.
    pub fn axis_resolution(&self, id: ViewId, channel: Channel) -> Option<&AxisResolution> {
        let mut current = Some(id);
        while let Some(view) = current {
            if let Some(&resolution) = self.views[view.0].axis_res.get(&channel) {
                return Some(&self.axis_resolutions[resolution]);
            }
            current = self.views[view.0].parent;
        }
        None
    }

    /// The accumulated scale domain visible to a view on a channel.
    ///
    /// `Ok(None)` means either no resolution exists or some contributor's
    /// data has not completed yet.
    pub fn scale_domain(
        &self,
        id: ViewId,
        channel: Channel,
    ) -> Result<Option<DomainArray>, ViewError> {
        match self.scale_resolution(id, channel) {
            Some(resolution) => resolution.domain(self),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Sizing.

    /// The flexible size of a view, including its own padding.
    pub fn size(&self, id: ViewId) -> FlexDimensions {
        if let Some(cached) = self.views[id.0].cache.size.get() {
            return cached;
        }
        let size = self
            .intrinsic_size(id)
            .add_padding(&self.views[id.0].padding);
        self.views[id.0].cache.size.set(Some(size));
        size
    }

    fn intrinsic_size(&self, id: ViewId) -> FlexDimensions {
        let view = &self.views[id.0];
        let computed = match &view.kind {
            ViewKind::Unit(_) | ViewKind::Layer(_) => {
                FlexDimensions::new(SizeDef::grow(1.0), SizeDef::grow(1.0))
            }
            ViewKind::Concat(info) => self.concat_size(info),
            ViewKind::Facet(info) => self.facet_size(id, info),
            ViewKind::Sample(info) => self.size(info.child),
            ViewKind::Decorator(info) => self
                .size(info.child)
                .add_padding(&self.axis_extents(id)),
            ViewKind::Axis(info) => {
                if info.orient.is_horizontal() {
                    FlexDimensions::new(SizeDef::grow(1.0), SizeDef::px(info.extent))
                } else {
                    FlexDimensions::new(SizeDef::px(info.extent), SizeDef::grow(1.0))
                }
            }
        };
        // Authored sizes override the computed ones per dimension.
        FlexDimensions::new(
            view.width.map(SizeInput::to_size_def).unwrap_or(computed.width),
            view.height
                .map(SizeInput::to_size_def)
                .unwrap_or(computed.height),
        )
    }

    fn concat_size(&self, info: &ConcatInfo) -> FlexDimensions {
        let sizes: Vec<FlexDimensions> = info.children.iter().map(|&c| self.size(c)).collect();
        match info.direction {
            ConcatDirection::Horizontal => FlexDimensions::new(
                sum_size_defs(sizes.iter().map(|s| s.width), info.spacing),
                max_size_def(sizes.iter().map(|s| s.height)),
            ),
            ConcatDirection::Vertical => FlexDimensions::new(
                max_size_def(sizes.iter().map(|s| s.width)),
                sum_size_defs(sizes.iter().map(|s| s.height), info.spacing),
            ),
            ConcatDirection::Grid => {
                let columns = grid_columns(info.columns, sizes.len());
                let (column_defs, row_defs) = grid_track_defs(&sizes, columns);
                FlexDimensions::new(
                    sum_size_defs(column_defs.into_iter(), info.spacing),
                    sum_size_defs(row_defs.into_iter(), info.spacing),
                )
            }
        }
    }

    fn facet_size(&self, id: ViewId, info: &FacetInfo) -> FlexDimensions {
        let child = self.size(info.child);
        let cells = self.facet_values(id, &info.field).len().max(1);
        let columns = info.columns.unwrap_or(1).clamp(1, cells);
        let rows = cells.div_ceil(columns);
        FlexDimensions::new(
            sum_size_defs(core::iter::repeat_n(child.width, columns), info.spacing),
            sum_size_defs(core::iter::repeat_n(child.height, rows), info.spacing),
        )
    }

    /// Distinct values of the facet field in first-seen order, as labels.
    fn facet_values(&self, id: ViewId, field: &str) -> Vec<String> {
        let mut values = Vec::new();
        let Some(group) = self.collected_data(id) else {
            return values;
        };
        for datum in group.flat_data() {
            if let Some(value) = datum.get(field) {
                let label = scalar_label(value);
                if !values.contains(&label) {
                    values.push(label);
                }
            }
        }
        values
    }

    /// The per-side room the decorator's axes occupy, including offsets.
    pub(crate) fn axis_extents(&self, id: ViewId) -> Padding {
        if let Some(cached) = self.views[id.0].cache.axis_extents.get() {
            return cached;
        }
        let ViewKind::Decorator(info) = &self.views[id.0].kind else {
            return Padding::zero();
        };
        let mut extents = Padding::zero();
        for axis in info.axes.iter().flatten() {
            let ViewKind::Axis(axis_info) = &self.views[axis.0].kind else {
                continue;
            };
            let room = axis_info.extent + axis_info.props.offset;
            match axis_info.orient {
                AxisOrient::Top => extents.top += room,
                AxisOrient::Right => extents.right += room,
                AxisOrient::Bottom => extents.bottom += room,
                AxisOrient::Left => extents.left += room,
            }
        }
        self.views[id.0].cache.axis_extents.set(Some(extents));
        extents
    }

    // ------------------------------------------------------------------
    // Rendering.

    /// Renders the whole tree into the given rectangle.
    ///
    /// The traversal itself draws nothing; it pushes draw requests into the
    /// context, which replays them on flush.
    pub fn render(&self, context: &mut dyn ViewRenderingContext, coords: Rect) {
        self.render_view(context, self.root, coords, &RenderingOptions::default());
    }

    fn render_view(
        &self,
        context: &mut dyn ViewRenderingContext,
        id: ViewId,
        coords: Rect,
        options: &RenderingOptions,
    ) {
        let view = &self.views[id.0];
        if !view.visible {
            return;
        }
        context.push_view(id, coords);
        match &view.kind {
            ViewKind::Unit(info) => {
                let mut options = options.clone();
                if info.clip {
                    options.clip_rect = Some(coords);
                }
                context.render_mark(&info.mark, &options);
            }
            ViewKind::Layer(info) => {
                let inner = coords.shrink(&view.padding);
                for &child in &info.children {
                    self.render_view(context, child, inner, options);
                }
            }
            ViewKind::Concat(info) => {
                self.render_concat(context, info, coords.shrink(&view.padding), options);
            }
            ViewKind::Facet(info) => {
                self.render_facet(context, id, info, coords.shrink(&view.padding), options);
            }
            ViewKind::Sample(info) => {
                self.render_sample(context, id, info, coords.shrink(&view.padding), options);
            }
            ViewKind::Decorator(info) => {
                self.render_decorator(context, id, info, coords, options);
            }
            ViewKind::Axis(info) => {
                let scene = axis_scene(&info.props, info.orient, &info.ticks, coords);
                let mut options = options.clone();
                options.axis_scene = Some(Arc::new(scene));
                context.render_mark(&info.mark, &options);
            }
        }
        context.pop_view(id);
    }

    fn flex_opts(&self, spacing: f64) -> FlexOpts {
        FlexOpts {
            spacing,
            device_pixel_ratio: self.device_pixel_ratio,
            ..FlexOpts::default()
        }
    }

    fn render_concat(
        &self,
        context: &mut dyn ViewRenderingContext,
        info: &ConcatInfo,
        inner: Rect,
        options: &RenderingOptions,
    ) {
        let opts = self.flex_opts(info.spacing);
        match info.direction {
            ConcatDirection::Horizontal => {
                let items: Vec<SizeDef> =
                    info.children.iter().map(|&c| self.size(c).width).collect();
                let slots = map_to_pixel_coords(&items, inner.width, &opts);
                for (&child, slot) in info.children.iter().zip(&slots) {
                    let rect =
                        Rect::new(inner.x + slot.location, inner.y, slot.size, inner.height);
                    self.render_view(context, child, rect, options);
                }
            }
            ConcatDirection::Vertical => {
                let items: Vec<SizeDef> =
                    info.children.iter().map(|&c| self.size(c).height).collect();
                let slots = map_to_pixel_coords(&items, inner.height, &opts);
                for (&child, slot) in info.children.iter().zip(&slots) {
                    let rect =
                        Rect::new(inner.x, inner.y + slot.location, inner.width, slot.size);
                    self.render_view(context, child, rect, options);
                }
            }
            ConcatDirection::Grid => {
                let sizes: Vec<FlexDimensions> =
                    info.children.iter().map(|&c| self.size(c)).collect();
                let columns = grid_columns(info.columns, sizes.len());
                let (column_defs, row_defs) = grid_track_defs(&sizes, columns);
                let column_slots = map_to_pixel_coords(&column_defs, inner.width, &opts);
                let row_slots = map_to_pixel_coords(&row_defs, inner.height, &opts);
                for (index, &child) in info.children.iter().enumerate() {
                    let column = &column_slots[index % columns];
                    let row = &row_slots[index / columns];
                    let rect = Rect::new(
                        inner.x + column.location,
                        inner.y + row.location,
                        column.size,
                        row.size,
                    );
                    self.render_view(context, child, rect, options);
                }
            }
        }
    }

    fn render_facet(
        &self,
        context: &mut dyn ViewRenderingContext,
        id: ViewId,
        info: &FacetInfo,
        inner: Rect,
        options: &RenderingOptions,
    ) {
        let values = self.facet_values(id, &info.field);
        if values.is_empty() {
            return;
        }
        let columns = info.columns.unwrap_or(1).clamp(1, values.len());
        let rows = values.len().div_ceil(columns);
        let opts = self.flex_opts(info.spacing);
        let child = self.size(info.child);
        let column_defs = vec![child.width; columns];
        let row_defs = vec![child.height; rows];
        let column_slots = map_to_pixel_coords(&column_defs, inner.width, &opts);
        let row_slots = map_to_pixel_coords(&row_defs, inner.height, &opts);
        for (index, value) in values.iter().enumerate() {
            let column = &column_slots[index % columns];
            let row = &row_slots[index / columns];
            let rect = Rect::new(
                inner.x + column.location,
                inner.y + row.location,
                column.size,
                row.size,
            );
            let mut options = options.clone();
            options.facet_id = Some(value.clone());
            self.render_view(context, info.child, rect, &options);
        }
    }

    fn render_sample(
        &self,
        context: &mut dyn ViewRenderingContext,
        id: ViewId,
        info: &SampleInfo,
        inner: Rect,
        options: &RenderingOptions,
    ) {
        let samples = match &info.explicit_samples {
            Some(samples) => samples.clone(),
            None => self.sample_domain(id),
        };
        if samples.is_empty() {
            return;
        }
        let items = vec![SizeDef::grow(1.0); samples.len()];
        let slots = map_to_pixel_coords(&items, inner.height, &self.flex_opts(info.spacing));
        // The child sees the full rectangle; each pass carries its band so
        // marks can scroll or zoom samples without a re-layout.
        for (sample, slot) in samples.iter().zip(&slots) {
            let mut options = options.clone();
            options.facet_id = Some(sample.clone());
            options.sample_facet = Some(LocSize {
                location: inner.y + slot.location,
                size: slot.size,
            });
            self.render_view(context, info.child, inner, &options);
        }
    }

    /// Sample identities from the `sample` channel's resolved domain.
    fn sample_domain(&self, id: ViewId) -> Vec<String> {
        let Some(resolution) = self.scale_resolution(id, Channel::Sample) else {
            return Vec::new();
        };
        let Ok(Some(domain)) = resolution.domain(self) else {
            return Vec::new();
        };
        domain.iter().map(|value| scalar_label(&value)).collect()
    }

    fn render_decorator(
        &self,
        context: &mut dyn ViewRenderingContext,
        id: ViewId,
        info: &DecoratorInfo,
        coords: Rect,
        options: &RenderingOptions,
    ) {
        let extents = self.axis_extents(id);
        let child_coords = coords.shrink(&extents);
        if let Some(background) = info.background {
            self.render_view(context, background, child_coords, options);
        }
        self.render_view(context, info.child, child_coords, options);
        for axis in info.axes.iter().flatten() {
            let ViewKind::Axis(axis_info) = &self.views[axis.0].kind else {
                continue;
            };
            let offset = axis_info.props.offset;
            let extent = axis_info.extent;
            let strip = match axis_info.orient {
                AxisOrient::Bottom => Rect::new(
                    child_coords.x,
                    child_coords.y2() + offset,
                    child_coords.width,
                    extent,
                ),
                AxisOrient::Top => Rect::new(
                    child_coords.x,
                    child_coords.y - offset - extent,
                    child_coords.width,
                    extent,
                ),
                AxisOrient::Left => Rect::new(
                    child_coords.x - offset - extent,
                    child_coords.y,
                    extent,
                    child_coords.height,
                ),
                AxisOrient::Right => Rect::new(
                    child_coords.x2() + offset,
                    child_coords.y,
                    extent,
                    child_coords.height,
                ),
            };
            self.render_view(context, *axis, strip, options);
        }
    }
}

/// The default policy a view kind applies to a channel.
fn default_policy(kind: &ViewKind, channel: Channel) -> ResolutionPolicy {
    let ViewKind::Concat(info) = kind else {
        return ResolutionPolicy::Shared;
    };
    if !channel.is_positional() {
        return ResolutionPolicy::Shared;
    }
    match (info.direction, channel) {
        (ConcatDirection::Horizontal, Channel::X) => ResolutionPolicy::Shared,
        (ConcatDirection::Vertical, Channel::Y) => ResolutionPolicy::Shared,
        _ => ResolutionPolicy::Independent,
    }
}

fn grid_columns(configured: Option<usize>, items: usize) -> usize {
    configured.unwrap_or(items).clamp(1, items.max(1))
}

/// Per-column and per-row track sizes for a wrapping grid: each track takes
/// the maximum of the cells it holds.
fn grid_track_defs(sizes: &[FlexDimensions], columns: usize) -> (Vec<SizeDef>, Vec<SizeDef>) {
    let rows = sizes.len().div_ceil(columns.max(1));
    let mut column_defs = vec![SizeDef::zero(); columns];
    let mut row_defs = vec![SizeDef::zero(); rows];
    for (index, size) in sizes.iter().enumerate() {
        let column = &mut column_defs[index % columns];
        column.px = column.px.max(size.width.px);
        column.grow = column.grow.max(size.width.grow);
        let row = &mut row_defs[index / columns];
        row.px = row.px.max(size.height.px);
        row.grow = row.grow.max(size.height.grow);
    }
    (column_defs, row_defs)
}

fn sum_size_defs(items: impl Iterator<Item = SizeDef>, spacing: f64) -> SizeDef {
    let mut total = SizeDef::zero();
    let mut count = 0usize;
    for item in items {
        total.px += item.px;
        total.grow += item.grow;
        count += 1;
    }
    if count > 1 {
        total.px += spacing * (count - 1) as f64;
    }
    total
}

fn max_size_def(items: impl Iterator<Item = SizeDef>) -> SizeDef {
    let mut max = SizeDef::zero();
    for item in items {
        max.px = max.px.max(item.px);
        max.grow = max.grow.max(item.grow);
    }
    max
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::data::MemoryCollector;
    use crate::testing::{NullMark, record};

    fn unit(views: &mut Vec<View>, name: &str, parent: Option<ViewId>) -> ViewId {
        let id = ViewId(views.len());
        views.push(View::new(
            name,
            parent,
            ViewKind::Unit(UnitInfo {
                mark: Arc::new(NullMark::new(views.len() as u64)),
                mark_kind: "point".to_string(),
                clip: false,
            }),
        ));
        id
    }

    fn field_encoding(field: &str, data_type: DomainType) -> ChannelEncoding {
        ChannelEncoding {
            accessor: Accessor::Field(field.to_string()),
            data_type: Some(data_type),
            title: None,
            explicit_domain: None,
            zero: false,
            axis: AxisSetting::Default,
        }
    }

    /// A layer with two children, each encoding `y` from an inline dataset.
    fn shared_layer() -> (ViewTree, ViewId, ViewId, ViewId) {
        let mut views = Vec::new();
        views.push(View::new(
            "layer0",
            None,
            ViewKind::Layer(LayerInfo {
                children: Vec::new(),
            }),
        ));
        let root = ViewId(0);
        let a = unit(&mut views, "a", Some(root));
        let b = unit(&mut views, "b", Some(root));
        let ViewKind::Layer(info) = &mut views[0].kind else {
            unreachable!();
        };
        info.children = vec![a, b];
        views[a.0].encoding =
            vec![(Channel::Y, field_encoding("v", DomainType::Quantitative))];
        views[a.0].collector = Some(Arc::new(MemoryCollector::new(vec![
            record(&[("v", 1.0)]),
            record(&[("v", 2.0)]),
        ])));
        views[b.0].encoding =
            vec![(Channel::Y, field_encoding("v", DomainType::Quantitative))];
        views[b.0].collector = Some(Arc::new(MemoryCollector::new(vec![
            record(&[("v", 4.0)]),
            record(&[("v", 5.0)]),
        ])));
        (ViewTree::new(views, root), root, a, b)
    }

    #[test]
    fn channel_names_round_trip() {
        for name in ["x", "y", "color", "opacity", "size", "shape", "sample"] {
            let channel = Channel::from_name(name).unwrap();
            assert_eq!(channel.as_str(), name);
        }
        assert_eq!(Channel::from_name("theta"), None);
        assert!(Channel::X.is_positional());
        assert!(!Channel::Color.is_positional());
    }

    #[test]
    fn shared_resolution_merges_domains() {
        let (mut tree, root, a, b) = shared_layer();
        tree.resolve_scales().unwrap();
        // Both leaves and the container see the same merged interval.
        for id in [root, a, b] {
            let domain = tree.scale_domain(id, Channel::Y).unwrap().unwrap();
            assert_eq!(domain.interval(), Some((1.0, 5.0)));
        }
    }

    #[test]
    fn independent_resolution_stays_at_the_leaves() {
        let (mut tree, root, a, b) = shared_layer();
        tree.view_mut(root)
            .resolve
            .scale
            .insert(Channel::Y, ResolutionPolicy::Independent);
        tree.resolve_scales().unwrap();
        let a_domain = tree.scale_domain(a, Channel::Y).unwrap().unwrap();
        let b_domain = tree.scale_domain(b, Channel::Y).unwrap().unwrap();
        assert_eq!(a_domain.interval(), Some((1.0, 2.0)));
        assert_eq!(b_domain.interval(), Some((4.0, 5.0)));
        assert!(tree.scale_domain(root, Channel::Y).unwrap().is_none());
    }

    #[test]
    fn excluded_container_keeps_its_resolution_invisible_above() {
        // root layer > excluded layer > two units, plus a sibling unit.
        let mut views = Vec::new();
        views.push(View::new(
            "root",
            None,
            ViewKind::Layer(LayerInfo {
                children: Vec::new(),
            }),
        ));
        let root = ViewId(0);
        views.push(View::new(
            "inner",
            Some(root),
            ViewKind::Layer(LayerInfo {
                children: Vec::new(),
            }),
        ));
        let inner = ViewId(1);
        let a = unit(&mut views, "a", Some(inner));
        let b = unit(&mut views, "b", Some(inner));
        let outside = unit(&mut views, "outside", Some(root));
        let ViewKind::Layer(info) = &mut views[root.0].kind else {
            unreachable!();
        };
        info.children = vec![inner, outside];
        let ViewKind::Layer(info) = &mut views[inner.0].kind else {
            unreachable!();
        };
        info.children = vec![a, b];
        for (id, lo, hi) in [(a, 1.0, 2.0), (b, 4.0, 5.0), (outside, 10.0, 20.0)] {
            views[id.0].encoding =
                vec![(Channel::Y, field_encoding("v", DomainType::Quantitative))];
            views[id.0].collector = Some(Arc::new(MemoryCollector::new(vec![
                record(&[("v", lo)]),
                record(&[("v", hi)]),
            ])));
        }
        views[inner.0]
            .resolve
            .scale
            .insert(Channel::Y, ResolutionPolicy::Excluded);

        let mut tree = ViewTree::new(views, root);
        tree.resolve_scales().unwrap();

        // Inside the excluded subtree the two units still merge.
        let merged = tree.scale_domain(a, Channel::Y).unwrap().unwrap();
        assert_eq!(merged.interval(), Some((1.0, 5.0)));
        // The sibling outside never sees the excluded subtree's values.
        let outside_domain = tree.scale_domain(outside, Channel::Y).unwrap().unwrap();
        assert_eq!(outside_domain.interval(), Some((10.0, 20.0)));
        // Nor does the root: the outside unit's resolution climbed there
        // alone.
        let root_domain = tree.scale_domain(root, Channel::Y).unwrap().unwrap();
        assert_eq!(root_domain.interval(), Some((10.0, 20.0)));
    }

    #[test]
    fn conflicting_data_types_are_fatal() {
        let (mut tree, _, _, b) = shared_layer();
        tree.view_mut(b).encoding =
            vec![(Channel::Y, field_encoding("v", DomainType::Nominal))];
        let err = tree.resolve_scales().unwrap_err();
        assert!(matches!(
            err,
            ViewError::TypeMismatch {
                channel: Channel::Y,
                expected: DomainType::Quantitative,
                actual: DomainType::Nominal,
                ..
            }
        ));
    }

    #[test]
    fn incomplete_collector_leaves_the_domain_undefined() {
        let (mut tree, root, _, b) = shared_layer();
        tree.view_mut(b).collector = None;
        tree.resolve_scales().unwrap();
        assert!(tree.scale_domain(root, Channel::Y).unwrap().is_none());
    }

    #[test]
    fn paths_join_ancestor_names() {
        let (tree, _, a, _) = shared_layer();
        assert_eq!(tree.path(a), "layer0/a");
        assert_eq!(tree.find_view("b"), Some(ViewId(2)));
        assert_eq!(tree.find_view("nope"), None);
    }

    #[test]
    fn concat_sums_the_main_axis_and_maxes_the_other() {
        let mut views = Vec::new();
        views.push(View::new(
            "row",
            None,
            ViewKind::Concat(ConcatInfo {
                direction: ConcatDirection::Horizontal,
                children: Vec::new(),
                spacing: 10.0,
                columns: None,
            }),
        ));
        let root = ViewId(0);
        let a = unit(&mut views, "a", Some(root));
        let b = unit(&mut views, "b", Some(root));
        views[a.0].width = Some(SizeInput::Px(100.0));
        views[a.0].height = Some(SizeInput::Px(50.0));
        views[b.0].width = Some(SizeInput::Px(60.0));
        views[b.0].height = Some(SizeInput::Px(80.0));
        let ViewKind::Concat(info) = &mut views[root.0].kind else {
            unreachable!();
        };
        info.children = vec![a, b];
        let tree = ViewTree::new(views, root);
        let size = tree.size(root);
        assert_eq!(size.width.px, 170.0);
        assert_eq!(size.width.grow, 0.0);
        assert_eq!(size.height.px, 80.0);
    }

    #[test]
    fn size_cache_survives_until_invalidated() {
        let (tree, root, a, _) = shared_layer();
        let first = tree.size(root);
        assert_eq!(first, tree.size(root));
        // Mutations behind the cache are invisible until the broadcast.
        tree.views[a.0].cache.size.set(Some(FlexDimensions::new(
            SizeDef::px(1.0),
            SizeDef::px(1.0),
        )));
        tree.invalidate_layout();
        assert_eq!(tree.views[a.0].cache.size.get(), None);
    }
}
