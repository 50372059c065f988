// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The decorator pass: splicing axis-bearing wrappers into a built tree.
//!
//! Runs after resolution. Every unit or layer sitting directly under the
//! root or a concat/facet/sample container gets wrapped in a decorator when
//! its subtree hosts axis resolutions or it declares a background. The
//! decorator owns up to four axis views (one per orientation slot) plus the
//! background unit, and re-parents the wrapped view; it hosts no resolutions
//! itself, so upward lookups pass through it untouched.

extern crate alloc;

use alloc::format;
use alloc::vec::Vec;

use crate::axis::{AxisOrient, AxisProps, TextMeasurer, generate_ticks, measure_extent};
use crate::error::ViewError;
use crate::factory::ViewContext;
use crate::mark::MarkInit;
use crate::resolution::AxisResolutionId;
use crate::view::{
    AxisInfo, Channel, DecoratorInfo, UnitInfo, View, ViewId, ViewKind, ViewTree, orient_index,
};

/// The orientation a [`DecoratorInfo::axes`] slot stands for.
const SLOT_ORIENTS: [AxisOrient; 4] = [
    AxisOrient::Top,
    AxisOrient::Right,
    AxisOrient::Bottom,
    AxisOrient::Left,
];

/// Wraps axis-bearing views in decorators, creating their axis and
/// background children through the host context.
pub(crate) fn decorate(tree: &mut ViewTree, context: &mut dyn ViewContext) -> Result<(), ViewError> {
    let candidates: Vec<ViewId> = (0..tree.views.len())
        .map(ViewId::from_raw)
        .filter(|&id| needs_decoration(tree, id))
        .collect();

    for child in candidates {
        let resolutions = subtree_axis_resolutions(tree, child);
        let background = tree.view(child).background.clone();
        if resolutions.is_empty() && background.is_none() {
            continue;
        }
        let slots = assign_slots(tree, child, &resolutions)?;

        let decorator = ViewId::from_raw(tree.views.len());
        let parent = tree.parent(child);
        let name = format!("decorator{}", tree.views.len());
        tree.views.push(View::new(
            name,
            parent,
            ViewKind::Decorator(DecoratorInfo {
                child,
                axes: [None; 4],
                background: None,
            }),
        ));
        tree.view_mut(child).parent = Some(decorator);
        match parent {
            None => tree.root = decorator,
            Some(parent) => replace_child(tree, parent, child, decorator),
        }

        let path = tree.path(decorator);
        if let Some(style) = background {
            let mark = context.create_mark(
                &path,
                MarkInit::Background {
                    fill: style.fill.as_deref(),
                    stroke: style.stroke.as_deref(),
                },
            )?;
            let id = ViewId::from_raw(tree.views.len());
            tree.views.push(View::new(
                format!("background{}", tree.views.len()),
                Some(decorator),
                ViewKind::Unit(UnitInfo {
                    mark,
                    mark_kind: "background".into(),
                    clip: false,
                }),
            ));
            let ViewKind::Decorator(info) = &mut tree.view_mut(decorator).kind else {
                unreachable!("just pushed a decorator");
            };
            info.background = Some(id);
        }

        for (slot, resolution) in slots.into_iter().enumerate() {
            let Some(resolution) = resolution else {
                continue;
            };
            let orient = SLOT_ORIENTS[slot];
            let mut props = AxisProps::default();
            tree.axis_resolutions[resolution]
                .merged_overrides()
                .apply(&mut props);
            props.title = tree.axis_resolutions[resolution].title();
            let mark = context.create_mark(&path, MarkInit::Axis { orient })?;
            let id = ViewId::from_raw(tree.views.len());
            tree.views.push(View::new(
                format!("axis{}", tree.views.len()),
                Some(decorator),
                ViewKind::Axis(AxisInfo {
                    resolution,
                    orient,
                    mark,
                    props,
                    ticks: Vec::new(),
                    extent: 0.0,
                }),
            ));
            let ViewKind::Decorator(info) = &mut tree.view_mut(decorator).kind else {
                unreachable!("just pushed a decorator");
            };
            info.axes[slot] = Some(id);
        }
    }
    Ok(())
}

/// Whether a view is a decoration candidate: a unit or layer directly under
/// the root or a layout container.
fn needs_decoration(tree: &ViewTree, id: ViewId) -> bool {
    if !matches!(
        tree.view(id).kind,
        ViewKind::Unit(_) | ViewKind::Layer(_)
    ) {
        return false;
    }
    match tree.parent(id) {
        None => true,
        Some(parent) => matches!(
            tree.view(parent).kind,
            ViewKind::Concat(_) | ViewKind::Facet(_) | ViewKind::Sample(_)
        ),
    }
}

/// Axis resolutions hosted in the subtree, in depth-first visit order with
/// x before y at each view.
fn subtree_axis_resolutions(tree: &ViewTree, root: ViewId) -> Vec<(Channel, AxisResolutionId)> {
    let mut found = Vec::new();
    let mut stack = alloc::vec![root];
    while let Some(id) = stack.pop() {
        for channel in [Channel::X, Channel::Y] {
            if let Some(&resolution) = tree.view(id).axis_res.get(&channel) {
                found.push((channel, resolution));
            }
        }
        let mut children = tree.children(id);
        children.reverse();
        stack.append(&mut children);
    }
    found
}

/// Assigns each resolution an orientation slot.
///
/// Resolutions with an explicit orient claim first; the rest fill the free
/// slots of their channel in preferred order (bottom before top, left before
/// right).
fn assign_slots(
    tree: &ViewTree,
    child: ViewId,
    resolutions: &[(Channel, AxisResolutionId)],
) -> Result<[Option<AxisResolutionId>; 4], ViewError> {
    let mut slots: [Option<AxisResolutionId>; 4] = [None; 4];
    let path = tree.path(child);
    let mut pending = Vec::new();

    for &(channel, resolution) in resolutions {
        let merged = tree.axis_resolutions[resolution].merged_overrides();
        let Some(orient) = merged.orient else {
            pending.push((channel, resolution));
            continue;
        };
        if orient.channel() != channel {
            return Err(ViewError::InvalidOrient {
                path,
                orient: orient.as_str().into(),
            });
        }
        let slot = orient_index(orient);
        if slots[slot].is_some() {
            return Err(ViewError::SlotCollision {
                path,
                channel,
                orient,
            });
        }
        slots[slot] = Some(resolution);
    }

    for (channel, resolution) in pending {
        let free = AxisOrient::slots(channel)
            .into_iter()
            .find(|&orient| slots[orient_index(orient)].is_none());
        let Some(orient) = free else {
            return Err(ViewError::NoFreeSlot { path, channel });
        };
        slots[orient_index(orient)] = Some(resolution);
    }
    Ok(slots)
}

fn replace_child(tree: &mut ViewTree, parent: ViewId, old: ViewId, new: ViewId) {
    match &mut tree.view_mut(parent).kind {
        ViewKind::Layer(info) => {
            for child in &mut info.children {
                if *child == old {
                    *child = new;
                }
            }
        }
        ViewKind::Concat(info) => {
            for child in &mut info.children {
                if *child == old {
                    *child = new;
                }
            }
        }
        ViewKind::Facet(info) => info.child = new,
        ViewKind::Sample(info) => info.child = new,
        ViewKind::Unit(_) | ViewKind::Decorator(_) | ViewKind::Axis(_) => {}
    }
}

impl ViewTree {
    /// Recomputes every axis view's ticks and extent from the current scale
    /// domains, then broadcasts a layout invalidation.
    ///
    /// Call after data completes or the tree is resized; axes built before
    /// their data arrives have no ticks and a minimum extent.
    pub fn refresh_axes(&mut self, measurer: &dyn TextMeasurer) -> Result<(), ViewError> {
        let mut updates = Vec::new();
        for index in 0..self.views.len() {
            let ViewKind::Axis(info) = &self.views[index].kind else {
                continue;
            };
            let domain = match self.axis_resolutions[info.resolution].scale {
                Some(scale) => self.scale_resolutions[scale].domain(self)?,
                None => None,
            };
            let ticks = generate_ticks(&info.props, domain.as_ref());
            let extent = measure_extent(&info.props, info.orient, &ticks, measurer);
            updates.push((index, ticks, extent));
        }
        for (index, ticks, extent) in updates {
            let ViewKind::Axis(info) = &mut self.views[index].kind else {
                continue;
            };
            info.ticks = ticks;
            info.extent = extent;
        }
        self.invalidate_layout();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::{String, ToString};
    use alloc::sync::Arc;
    use alloc::vec;

    use trellis_core::DomainType;

    use super::*;
    use crate::axis::{AxisOverrides, HeuristicTextMeasurer};
    use crate::data::{Accessor, Collector, MemoryCollector};
    use crate::mark::Mark;
    use crate::resolution::ResolutionPolicy;
    use crate::testing::{NullMark, record};
    use crate::view::{AxisSetting, ChannelEncoding, LayerInfo};

    /// A context that hands out inert marks and no collectors.
    struct StubContext {
        next_mark: u64,
    }

    impl ViewContext for StubContext {
        fn create_mark(
            &mut self,
            _path: &str,
            _init: MarkInit<'_>,
        ) -> Result<Arc<dyn Mark>, ViewError> {
            self.next_mark += 1;
            Ok(Arc::new(NullMark::new(self.next_mark)))
        }

        fn collector(&mut self, _name: &str) -> Option<Arc<dyn Collector>> {
            None
        }
    }

    fn encoding(field: &str, axis: AxisSetting) -> ChannelEncoding {
        ChannelEncoding {
            accessor: Accessor::Field(field.to_string()),
            data_type: Some(DomainType::Quantitative),
            title: None,
            explicit_domain: None,
            zero: false,
            axis,
        }
    }

    fn unit(views: &mut alloc::vec::Vec<View>, name: &str, parent: Option<ViewId>) -> ViewId {
        let id = ViewId::from_raw(views.len());
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

    fn resolved_unit_tree(axis: AxisSetting) -> (ViewTree, ViewId) {
        let mut views = alloc::vec::Vec::new();
        let root = unit(&mut views, "scatter", None);
        views[0].encoding = vec![
            (Channel::X, encoding("a", AxisSetting::Default)),
            (Channel::Y, encoding("b", axis)),
        ];
        views[0].collector = Some(Arc::new(MemoryCollector::new(vec![
            record(&[("a", 0.0), ("b", 0.0)]),
            record(&[("a", 10.0), ("b", 100.0)]),
        ])));
        let mut tree = ViewTree::new(views, root);
        tree.resolve_scales().unwrap();
        tree.resolve_axes().unwrap();
        (tree, root)
    }

    #[test]
    fn decorator_splices_around_the_root_unit() {
        let (mut tree, unit_id) = resolved_unit_tree(AxisSetting::Default);
        decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap();

        let root = tree.root();
        assert_ne!(root, unit_id);
        let ViewKind::Decorator(info) = &tree.view(root).kind else {
            panic!("expected a decorator at the root");
        };
        assert_eq!(info.child, unit_id);
        assert_eq!(tree.parent(unit_id), Some(root));
        // Default slots: x to the bottom, y to the left.
        assert!(info.axes[orient_index(AxisOrient::Bottom)].is_some());
        assert!(info.axes[orient_index(AxisOrient::Left)].is_some());
        assert!(info.axes[orient_index(AxisOrient::Top)].is_none());
        assert!(info.axes[orient_index(AxisOrient::Right)].is_none());
    }

    #[test]
    fn disabled_axis_never_gets_a_view() {
        let (mut tree, _) = resolved_unit_tree(AxisSetting::Disabled);
        decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap();
        let ViewKind::Decorator(info) = &tree.view(tree.root()).kind else {
            panic!("expected a decorator at the root");
        };
        assert!(info.axes[orient_index(AxisOrient::Left)].is_none());
        assert!(info.axes[orient_index(AxisOrient::Bottom)].is_some());
    }

    #[test]
    fn explicit_orient_claims_its_slot() {
        let mut overrides = AxisOverrides::default();
        overrides.orient = Some(AxisOrient::Top);
        let (mut tree, _) = resolved_unit_tree(AxisSetting::Default);
        // Move the x axis to the top via its resolution's merged overrides.
        let ViewKind::Unit(_) = tree.view(tree.root()).kind else {
            panic!("expected the bare unit");
        };
        let x_res = *tree
            .view(tree.root())
            .axis_res
            .get(&Channel::X)
            .unwrap();
        tree.axis_resolutions[x_res].members[0].overrides = overrides;
        decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap();
        let ViewKind::Decorator(info) = &tree.view(tree.root()).kind else {
            panic!("expected a decorator at the root");
        };
        assert!(info.axes[orient_index(AxisOrient::Top)].is_some());
        assert!(info.axes[orient_index(AxisOrient::Bottom)].is_none());
    }

    /// A layer whose units keep independent y axes: the decorator must fan
    /// them out to the two vertical slots, and a third member has nowhere
    /// left to go.
    fn dual_axis_layer(units: usize) -> ViewTree {
        let mut views = alloc::vec::Vec::new();
        let root = ViewId::from_raw(0);
        views.push(View::new(
            "overlay",
            None,
            ViewKind::Layer(LayerInfo {
                children: alloc::vec::Vec::new(),
            }),
        ));
        let mut children = alloc::vec::Vec::new();
        for index in 0..units {
            let id = unit(&mut views, &format!("u{index}"), Some(root));
            views[id.index()].encoding =
                vec![(Channel::Y, encoding(&format!("f{index}"), AxisSetting::Default))];
            views[id.index()].collector = Some(Arc::new(MemoryCollector::new(vec![record(
                &[(format!("f{index}").as_str(), 1.0)],
            )])));
            children.push(id);
        }
        let ViewKind::Layer(info) = &mut views[0].kind else {
            unreachable!();
        };
        info.children = children;
        let mut tree = ViewTree::new(views, root);
        tree.view_mut(root)
            .resolve
            .axis
            .insert(Channel::Y, ResolutionPolicy::Independent);
        tree.view_mut(root)
            .resolve
            .scale
            .insert(Channel::Y, ResolutionPolicy::Independent);
        tree.resolve_scales().unwrap();
        tree.resolve_axes().unwrap();
        tree
    }

    #[test]
    fn competing_resolutions_fill_both_slots() {
        let mut tree = dual_axis_layer(2);
        decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap();
        let ViewKind::Decorator(info) = &tree.view(tree.root()).kind else {
            panic!("expected a decorator at the root");
        };
        assert!(info.axes[orient_index(AxisOrient::Left)].is_some());
        assert!(info.axes[orient_index(AxisOrient::Right)].is_some());
    }

    #[test]
    fn a_third_competitor_exhausts_the_slots() {
        let mut tree = dual_axis_layer(3);
        let err = decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap_err();
        assert!(matches!(
            err,
            ViewError::NoFreeSlot {
                channel: Channel::Y,
                ..
            }
        ));
    }

    #[test]
    fn colliding_explicit_orients_are_fatal() {
        let mut tree = dual_axis_layer(2);
        for unit_name in ["u0", "u1"] {
            let id = tree.find_view(unit_name).unwrap();
            let resolution = *tree.view(id).axis_res.get(&Channel::Y).unwrap();
            let mut overrides = AxisOverrides::default();
            overrides.orient = Some(AxisOrient::Left);
            tree.axis_resolutions[resolution].members[0].overrides = overrides;
        }
        let err = decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap_err();
        assert!(matches!(
            err,
            ViewError::SlotCollision {
                channel: Channel::Y,
                orient: AxisOrient::Left,
                ..
            }
        ));
    }

    #[test]
    fn refresh_axes_generates_ticks_and_extent() {
        let (mut tree, _) = resolved_unit_tree(AxisSetting::Default);
        decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap();
        tree.refresh_axes(&HeuristicTextMeasurer).unwrap();

        let ViewKind::Decorator(info) = &tree.view(tree.root()).kind else {
            panic!("expected a decorator at the root");
        };
        let left = info.axes[orient_index(AxisOrient::Left)].unwrap();
        let ViewKind::Axis(axis) = &tree.view(left).kind else {
            panic!("expected an axis view");
        };
        assert!(!axis.ticks.is_empty());
        // The y domain is [0, 100]; default clamping keeps at least the
        // minimum extent.
        assert!(axis.extent >= 20.0);
        assert_eq!(axis.props.title, Some(String::from("b")));
    }

    #[test]
    fn background_style_creates_a_background_unit() {
        let (mut tree, _) = resolved_unit_tree(AxisSetting::Default);
        let root = tree.root();
        tree.view_mut(root).background = Some(crate::view::BackgroundStyle {
            fill: Some("white".to_string()),
            stroke: None,
        });
        decorate(&mut tree, &mut StubContext { next_mark: 0 }).unwrap();
        let ViewKind::Decorator(info) = &tree.view(tree.root()).kind else {
            panic!("expected a decorator at the root");
        };
        let background = info.background.unwrap();
        assert!(matches!(tree.view(background).kind, ViewKind::Unit(_)));
        assert_eq!(tree.parent(background), Some(tree.root()));
    }
}
