// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building a typed [`ViewTree`] from a declarative spec.
//!
//! The builder walks the decoded spec top-down, merging inherited encodings,
//! attaching collectors, and asking the host [`ViewContext`] for marks. Pure
//! construction only; resolution and decoration run as separate passes, all
//! three bundled by [`ViewTree::build`].

extern crate alloc;

use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use trellis_core::{Datum, DomainType, Padding, Scalar, SizeInput};

use crate::axis::{AxisOrient, AxisOverrides};
use crate::data::{Accessor, Collector, MemoryCollector};
use crate::decorator::decorate;
use crate::error::ViewError;
use crate::mark::{Mark, MarkInit};
use crate::resolution::ResolutionPolicy;
use crate::spec::{
    AxisDefSpec, ChannelDefSpec, CommonSpec, ConcatSpec, DataSpec, FacetDefSpec, PaddingSpec,
    ResolveSpec, ShapeError, SizeSpec, ViewSpec,
};
use crate::view::{
    AxisSetting, BackgroundStyle, Channel, ChannelEncoding, ConcatDirection, ConcatInfo,
    FacetInfo, LayerInfo, ResolveMaps, SampleInfo, UnitInfo, View, ViewId, ViewKind, ViewTree,
};

/// The host side of tree construction.
///
/// The engine never draws or loads data; it asks the context for a mark per
/// unit view (and per generated axis or background) and for named
/// collectors.
pub trait ViewContext {
    /// Creates a mark for the view at `path`.
    fn create_mark(
        &mut self,
        path: &str,
        init: MarkInit<'_>,
    ) -> Result<Arc<dyn Mark>, ViewError>;

    /// Looks up a named data source.
    fn collector(&mut self, name: &str) -> Option<Arc<dyn Collector>>;
}

impl ViewTree {
    /// Parses a JSON spec and builds the unresolved tree.
    pub fn parse(json: &str, context: &mut dyn ViewContext) -> Result<Self, ViewError> {
        let spec = ViewSpec::parse(json).map_err(|e| shape_error("", e))?;
        Self::from_spec(&spec, context)
    }

    /// Builds the unresolved tree from a decoded spec.
    pub fn from_spec(spec: &ViewSpec, context: &mut dyn ViewContext) -> Result<Self, ViewError> {
        let mut builder = Builder {
            views: Vec::new(),
            context,
        };
        let root = builder.build(spec, None, &[], "")?;
        Ok(Self::new(builder.views, root))
    }

    /// Builds, resolves, and decorates a tree in one step.
    ///
    /// Axis ticks and extents still start empty; call
    /// [`ViewTree::refresh_axes`] once data has completed.
    pub fn build(spec: &ViewSpec, context: &mut dyn ViewContext) -> Result<Self, ViewError> {
        let mut tree = Self::from_spec(spec, context)?;
        tree.resolve_scales()?;
        tree.resolve_axes()?;
        decorate(&mut tree, context)?;
        Ok(tree)
    }
}

fn shape_error(path: &str, error: ShapeError) -> ViewError {
    match error {
        ShapeError::Ambiguous(keys) => ViewError::AmbiguousSpec {
            path: path.into(),
            keys,
        },
        ShapeError::Unrecognized => ViewError::UnrecognizedSpec { path: path.into() },
        ShapeError::Decode(message) => ViewError::SpecDecode {
            path: path.into(),
            message,
        },
    }
}

struct Builder<'a> {
    views: Vec<View>,
    context: &'a mut dyn ViewContext,
}

impl Builder<'_> {
    /// Builds one spec node and its descendants, returning the node's id.
    fn build(
        &mut self,
        spec: &ViewSpec,
        parent: Option<ViewId>,
        inherited: &[(Channel, ChannelEncoding)],
        parent_path: &str,
    ) -> Result<ViewId, ViewError> {
        if matches!(spec, ViewSpec::Import(_)) {
            // Imports are the host's business; an unexpanded one reaching
            // the builder is an authoring error.
            return Err(ViewError::UnresolvedImport {
                path: parent_path.into(),
            });
        }
        let common = spec
            .common()
            .expect("every non-import shape has common fields");

        let id = ViewId::from_raw(self.views.len());
        let name = common
            .name
            .clone()
            .unwrap_or_else(|| format!("{}{}", spec.kind_name(), id.index()));
        let path = if parent_path.is_empty() {
            name.clone()
        } else {
            format!("{parent_path}/{name}")
        };

        let encoding = merge_encodings(inherited, common, &path)?;
        // Placeholder; the kind is filled in after the children exist.
        self.views.push(View::new(
            name,
            parent,
            ViewKind::Layer(LayerInfo {
                children: Vec::new(),
            }),
        ));
        self.fill_common(id, common, &path)?;

        let kind = match spec {
            ViewSpec::Unit(unit) => {
                let mark = self
                    .context
                    .create_mark(&path, MarkInit::Encoded {
                        kind: unit.mark.kind(),
                    })?;
                self.views[id.index()].encoding = encoding;
                ViewKind::Unit(UnitInfo {
                    mark,
                    mark_kind: unit.mark.kind().to_string(),
                    clip: unit.mark.clip(),
                })
            }
            ViewSpec::Layer(layer) => {
                let mut children = Vec::new();
                for child in &layer.layer {
                    children.push(self.build(child, Some(id), &encoding, &path)?);
                }
                ViewKind::Layer(LayerInfo { children })
            }
            ViewSpec::HConcat(concat) => {
                self.concat(concat, id, &encoding, &path, ConcatDirection::Horizontal)?
            }
            ViewSpec::VConcat(concat) => {
                self.concat(concat, id, &encoding, &path, ConcatDirection::Vertical)?
            }
            ViewSpec::Concat(concat) => {
                self.concat(concat, id, &encoding, &path, ConcatDirection::Grid)?
            }
            ViewSpec::Facet(facet) => {
                let child = self.build(&facet.spec, Some(id), &encoding, &path)?;
                let (field, columns) = facet_layout(&facet.facet, facet.columns, &path)?;
                ViewKind::Facet(FacetInfo {
                    child,
                    field,
                    columns,
                    spacing: facet.spacing.unwrap_or(20.0),
                })
            }
            ViewSpec::Sample(sample) => {
                let child = self.build(&sample.spec, Some(id), &encoding, &path)?;
                ViewKind::Sample(SampleInfo {
                    child,
                    explicit_samples: sample
                        .samples
                        .data
                        .as_ref()
                        .map(explicit_samples),
                    spacing: sample.spacing.unwrap_or(5.0),
                })
            }
            ViewSpec::Import(_) => unreachable!("imports rejected above"),
        };
        self.views[id.index()].kind = kind;
        Ok(id)
    }

    fn concat(
        &mut self,
        spec: &ConcatSpec,
        id: ViewId,
        encoding: &[(Channel, ChannelEncoding)],
        path: &str,
        direction: ConcatDirection,
    ) -> Result<ViewKind, ViewError> {
        let mut children = Vec::new();
        for child in &spec.children {
            children.push(self.build(child, Some(id), encoding, path)?);
        }
        Ok(ViewKind::Concat(ConcatInfo {
            direction,
            children,
            spacing: spec.spacing.unwrap_or(10.0),
            columns: spec.columns,
        }))
    }

    /// Applies the shared spec fields onto a freshly pushed view.
    fn fill_common(
        &mut self,
        id: ViewId,
        common: &CommonSpec,
        path: &str,
    ) -> Result<(), ViewError> {
        let collector = match &common.data {
            Some(data) => self.data_collector(data),
            None => None,
        };
        let view = &mut self.views[id.index()];
        view.collector = collector;
        view.width = common
            .width
            .as_ref()
            .map(|size| size_input(size, path))
            .transpose()?;
        view.height = common
            .height
            .as_ref()
            .map(|size| size_input(size, path))
            .transpose()?;
        view.padding = common
            .padding
            .as_ref()
            .map(padding)
            .unwrap_or(Padding::zero());
        view.visible = common.visible.unwrap_or(true);
        view.background = common.view.as_ref().map(|bg| BackgroundStyle {
            fill: bg.fill.clone(),
            stroke: bg.stroke.clone(),
        });
        if let Some(resolve) = &common.resolve {
            self.views[id.index()].resolve = resolve_maps(resolve, path)?;
        }
        Ok(())
    }

    fn data_collector(&mut self, data: &DataSpec) -> Option<Arc<dyn Collector>> {
        if let Some(values) = &data.values {
            let records: Vec<Datum> = values.iter().filter_map(json_datum).collect();
            return Some(Arc::new(MemoryCollector::new(records)));
        }
        data.name
            .as_deref()
            .and_then(|name| self.context.collector(name))
    }
}

/// Merges a view's own encoding block over the inherited one.
///
/// Own channels override inherited ones, `null` entries prune them, and new
/// channels append. Own channels are visited in name order so registration
/// order (and thus axis slot preference) does not depend on hash iteration.
fn merge_encodings(
    inherited: &[(Channel, ChannelEncoding)],
    common: &CommonSpec,
    path: &str,
) -> Result<Vec<(Channel, ChannelEncoding)>, ViewError> {
    let mut merged: Vec<(Channel, ChannelEncoding)> = inherited.to_vec();
    let Some(own) = &common.encoding else {
        return Ok(merged);
    };
    let mut names: Vec<&String> = own.keys().collect();
    names.sort();
    for name in names {
        let channel = Channel::from_name(name).ok_or_else(|| ViewError::UnknownChannel {
            path: path.into(),
            channel: name.clone(),
        })?;
        merged.retain(|(existing, _)| *existing != channel);
        if let Some(def) = &own[name] {
            merged.push((channel, channel_encoding(def, channel, path)?));
        }
    }
    Ok(merged)
}

fn channel_encoding(
    def: &ChannelDefSpec,
    channel: Channel,
    path: &str,
) -> Result<ChannelEncoding, ViewError> {
    let accessor = if let Some(field) = &def.field {
        Accessor::Field(field.clone())
    } else if let Some(value) = &def.value {
        let scalar = json_scalar(value).ok_or_else(|| ViewError::SpecDecode {
            path: path.into(),
            message: format!("channel {channel} has a non-scalar constant value"),
        })?;
        Accessor::Constant(scalar)
    } else {
        return Err(ViewError::SpecDecode {
            path: path.into(),
            message: format!("channel {channel} needs a field or a value"),
        });
    };

    let mut data_type = def
        .data_type
        .as_deref()
        .map(|name| domain_type(name, path))
        .transpose()?;

    let explicit_domain: Option<Vec<Scalar>> = def
        .scale
        .as_ref()
        .and_then(|scale| scale.domain.as_ref())
        .map(|values| values.iter().filter_map(json_scalar).collect());
    // A quantitative domain with anything but [min, max] stops is the
    // piecewise form, e.g. a diverging midpoint.
    if data_type == Some(DomainType::Quantitative)
        && let Some(domain) = &explicit_domain
        && !domain.is_empty()
        && domain.len() != 2
        && domain.iter().all(|v| v.as_f64().is_some())
    {
        data_type = Some(DomainType::Piecewise);
    }

    let axis = match &def.axis {
        None => AxisSetting::Default,
        Some(None) => AxisSetting::Disabled,
        Some(Some(spec)) => AxisSetting::Overrides(axis_overrides(spec, path)?),
    };

    Ok(ChannelEncoding {
        accessor,
        data_type,
        title: def.title.clone(),
        explicit_domain,
        zero: def
            .scale
            .as_ref()
            .and_then(|scale| scale.zero)
            .unwrap_or(false),
        axis,
    })
}

fn axis_overrides(spec: &AxisDefSpec, path: &str) -> Result<AxisOverrides, ViewError> {
    let orient = spec
        .orient
        .as_deref()
        .map(|name| {
            AxisOrient::from_name(name).ok_or_else(|| ViewError::InvalidOrient {
                path: path.into(),
                orient: name.into(),
            })
        })
        .transpose()?;
    Ok(AxisOverrides {
        orient,
        domain: spec.domain,
        ticks: spec.ticks,
        tick_size: spec.tick_size,
        tick_count: spec.tick_count,
        tick_min_step: spec.tick_min_step,
        values: spec.values.clone(),
        labels: spec.labels,
        label_angle: spec.label_angle,
        label_padding: spec.label_padding,
        label_font_size: spec.label_font_size,
        format: spec.format.clone(),
        title: spec.title.clone(),
        title_padding: spec.title_padding,
        title_font_size: spec.title_font_size,
        min_extent: spec.min_extent,
        max_extent: spec.max_extent,
        offset: spec.offset,
    })
}

fn domain_type(name: &str, path: &str) -> Result<DomainType, ViewError> {
    match name {
        "quantitative" => Ok(DomainType::Quantitative),
        "ordinal" => Ok(DomainType::Ordinal),
        "nominal" => Ok(DomainType::Nominal),
        _ => Err(ViewError::InvalidDataType {
            path: path.into(),
            name: name.into(),
        }),
    }
}

fn resolve_maps(spec: &ResolveSpec, path: &str) -> Result<ResolveMaps, ViewError> {
    let mut maps = ResolveMaps::default();
    if let Some(scale) = &spec.scale {
        (maps.scale, maps.scale_default) = policy_map(scale, path)?;
    }
    if let Some(axis) = &spec.axis {
        (maps.axis, maps.axis_default) = policy_map(axis, path)?;
    }
    Ok(maps)
}

type PolicyMap = hashbrown::HashMap<Channel, ResolutionPolicy>;

fn policy_map(
    spec: &hashbrown::HashMap<String, String>,
    path: &str,
) -> Result<(PolicyMap, Option<ResolutionPolicy>), ViewError> {
    let mut map = PolicyMap::new();
    let mut default = None;
    for (key, value) in spec {
        let policy =
            ResolutionPolicy::from_name(value).ok_or_else(|| ViewError::InvalidPolicy {
                path: path.into(),
                policy: value.clone(),
            })?;
        if key == "default" {
            default = Some(policy);
            continue;
        }
        let channel = Channel::from_name(key).ok_or_else(|| ViewError::UnknownChannel {
            path: path.into(),
            channel: key.clone(),
        })?;
        map.insert(channel, policy);
    }
    Ok((map, default))
}

fn facet_layout(
    def: &FacetDefSpec,
    columns: Option<usize>,
    path: &str,
) -> Result<(String, Option<usize>), ViewError> {
    match def {
        FacetDefSpec::Field(field) => Ok((field.field.clone(), columns)),
        FacetDefSpec::Mapping { column, row } => match (column, row) {
            (Some(column), None) => {
                // A column facet spreads horizontally without wrapping.
                Ok((column.field.clone(), Some(usize::MAX)))
            }
            (None, Some(row)) => Ok((row.field.clone(), None)),
            _ => Err(ViewError::InvalidFacetMapping { path: path.into() }),
        },
    }
}

/// Sample identities from an inline sample table, in row order.
fn explicit_samples(data: &DataSpec) -> Vec<String> {
    let mut samples = Vec::new();
    for value in data.values.iter().flatten() {
        if let Some(id) = value.get("sample").and_then(|v| v.as_str())
            && !samples.iter().any(|s| s == id)
        {
            samples.push(id.to_string());
        }
    }
    samples
}

fn size_input(spec: &SizeSpec, path: &str) -> Result<SizeInput, ViewError> {
    match spec {
        SizeSpec::Px(px) => Ok(SizeInput::Px(*px)),
        SizeSpec::Def { px, grow } => Ok(SizeInput::Def(trellis_core::SizeDef {
            px: px.unwrap_or(0.0),
            grow: grow.unwrap_or(0.0),
        })),
        SizeSpec::Keyword(word) if word == "container" => Ok(SizeInput::Container),
        SizeSpec::Keyword(word) => Err(ViewError::InvalidSize {
            path: path.into(),
            value: word.clone(),
        }),
    }
}

fn padding(spec: &PaddingSpec) -> Padding {
    match spec {
        PaddingSpec::Uniform(value) => Padding::uniform(*value),
        PaddingSpec::Sides {
            top,
            right,
            bottom,
            left,
        } => Padding::new(*top, *right, *bottom, *left),
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<Scalar> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number),
        serde_json::Value::String(s) => Some(Scalar::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Scalar::Boolean(*b)),
        _ => None,
    }
}

/// Converts an inline data row into a datum, skipping non-scalar fields.
fn json_datum(value: &serde_json::Value) -> Option<Datum> {
    let object = value.as_object()?;
    let mut datum = Datum::new();
    for (key, field) in object {
        if let Some(scalar) = json_scalar(field) {
            datum.insert(key.clone(), scalar);
        }
    }
    Some(datum)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use trellis_core::Rect;

    use super::*;
    use crate::axis::HeuristicTextMeasurer;
    use crate::render::{DeferredViewRenderingContext, LayoutRecorder};
    use crate::testing::{EventLog, MarkEvent, RecordingMark};

    /// A host context that hands out recording marks and serves named
    /// collectors from a map.
    struct TestContext {
        log: EventLog,
        next_mark: u64,
        collectors: hashbrown::HashMap<String, Arc<dyn Collector>>,
    }

    impl TestContext {
        fn new() -> Self {
            Self {
                log: Rc::new(RefCell::new(Vec::new())),
                next_mark: 0,
                collectors: hashbrown::HashMap::new(),
            }
        }
    }

    impl ViewContext for TestContext {
        fn create_mark(
            &mut self,
            _path: &str,
            _init: MarkInit<'_>,
        ) -> Result<Arc<dyn Mark>, ViewError> {
            self.next_mark += 1;
            Ok(Arc::new(RecordingMark::new(
                self.next_mark,
                Rc::clone(&self.log),
            )))
        }

        fn collector(&mut self, name: &str) -> Option<Arc<dyn Collector>> {
            self.collectors.get(name).cloned()
        }
    }

    const SCATTER: &str = r#"{
        "name": "scatter",
        "mark": "point",
        "data": {"values": [
            {"a": 0, "b": 0},
            {"a": 10, "b": 100}
        ]},
        "encoding": {
            "x": {"field": "a", "type": "quantitative"},
            "y": {"field": "b", "type": "quantitative"}
        }
    }"#;

    #[test]
    fn builds_and_decorates_a_scatter_plot() {
        let mut context = TestContext::new();
        let spec = ViewSpec::parse(SCATTER).unwrap();
        let mut tree = ViewTree::build(&spec, &mut context).unwrap();
        tree.refresh_axes(&HeuristicTextMeasurer).unwrap();

        let unit = tree.find_view("scatter").unwrap();
        assert!(matches!(tree.view(unit).kind, ViewKind::Unit(_)));
        assert!(matches!(
            tree.view(tree.root()).kind,
            ViewKind::Decorator(_)
        ));

        let domain = tree.scale_domain(unit, Channel::Y).unwrap().unwrap();
        assert_eq!(domain.interval(), Some((0.0, 100.0)));

        // Axes reserve room on the bottom and left edges.
        let mut recorder = LayoutRecorder::new();
        tree.render(&mut recorder, Rect::new(0.0, 0.0, 300.0, 200.0));
        let coords = recorder.coords(unit).unwrap();
        assert!(coords.x >= 30.0);
        assert!(coords.y2() <= 170.0);
        assert_eq!(coords.y, 0.0);
    }

    #[test]
    fn parse_errors_carry_structure() {
        let mut context = TestContext::new();
        let err = ViewTree::parse(r#"{"mark": "point", "layer": []}"#, &mut context).unwrap_err();
        let ViewError::AmbiguousSpec { keys, .. } = err else {
            panic!("expected an ambiguity error, got {err:?}");
        };
        assert_eq!(keys, ["mark", "layer"]);

        let err = ViewTree::parse(r#"{"width": 4}"#, &mut context).unwrap_err();
        assert!(matches!(err, ViewError::UnrecognizedSpec { .. }));
    }

    #[test]
    fn imports_must_be_expanded_by_the_host() {
        let mut context = TestContext::new();
        let err = ViewTree::parse(r#"{"import": {"url": "shared.json"}}"#, &mut context)
            .unwrap_err();
        assert!(matches!(err, ViewError::UnresolvedImport { .. }));
    }

    #[test]
    fn encodings_inherit_merge_and_prune() {
        let mut context = TestContext::new();
        let json = r#"{
            "layer": [
                {"name": "base", "mark": "point"},
                {
                    "name": "detail",
                    "mark": "text",
                    "encoding": {
                        "y": null,
                        "color": {"field": "c", "type": "nominal", "axis": null}
                    }
                }
            ],
            "encoding": {
                "x": {"field": "a", "type": "quantitative", "axis": null},
                "y": {"field": "b", "type": "quantitative", "axis": null}
            }
        }"#;
        let spec = ViewSpec::parse(json).unwrap();
        let tree = ViewTree::from_spec(&spec, &mut context).unwrap();

        let base = tree.find_view("base").unwrap();
        let channels: Vec<Channel> =
            tree.view(base).encoding.iter().map(|(c, _)| *c).collect();
        assert_eq!(channels, [Channel::X, Channel::Y]);

        let detail = tree.find_view("detail").unwrap();
        let channels: Vec<Channel> =
            tree.view(detail).encoding.iter().map(|(c, _)| *c).collect();
        assert_eq!(channels, [Channel::X, Channel::Color]);
    }

    #[test]
    fn unknown_channels_and_policies_are_fatal() {
        let mut context = TestContext::new();
        let err = ViewTree::parse(
            r#"{"mark": "point", "encoding": {"theta": {"field": "t"}}}"#,
            &mut context,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ViewError::UnknownChannel { channel, .. } if channel == "theta"
        ));

        let err = ViewTree::parse(
            r#"{"layer": [], "resolve": {"scale": {"x": "merged"}}}"#,
            &mut context,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ViewError::InvalidPolicy { policy, .. } if policy == "merged"
        ));
    }

    #[test]
    fn sizes_accept_container_and_reject_other_keywords() {
        let mut context = TestContext::new();
        let tree =
            ViewTree::parse(r#"{"mark": "point", "width": "container"}"#, &mut context).unwrap();
        assert_eq!(tree.view(tree.root()).width, Some(SizeInput::Container));

        let err =
            ViewTree::parse(r#"{"mark": "point", "width": "huge"}"#, &mut context).unwrap_err();
        assert!(matches!(
            err,
            ViewError::InvalidSize { value, .. } if value == "huge"
        ));
    }

    #[test]
    fn named_data_comes_from_the_context() {
        let mut context = TestContext::new();
        context.collectors.insert(
            "weights".to_string(),
            Arc::new(MemoryCollector::new(vec![crate::testing::record(&[(
                "w", 7.0,
            )])])),
        );
        let tree = ViewTree::parse(
            r#"{
                "mark": "point",
                "data": {"name": "weights"},
                "encoding": {"x": {"field": "w", "type": "quantitative", "axis": null}}
            }"#,
            &mut context,
        )
        .unwrap();
        let group = tree.collected_data(tree.root()).unwrap();
        assert_eq!(group.flat_data().count(), 1);
    }

    #[test]
    fn vconcat_lays_children_along_the_vertical_axis() {
        let mut context = TestContext::new();
        let json = r#"{
            "vconcat": [
                {"name": "top", "mark": "point", "height": 40},
                {"name": "bottom", "mark": "rect", "height": 60}
            ],
            "spacing": 10
        }"#;
        let spec = ViewSpec::parse(json).unwrap();
        let tree = ViewTree::build(&spec, &mut context).unwrap();

        let mut recorder = LayoutRecorder::new();
        tree.render(&mut recorder, Rect::new(0.0, 0.0, 200.0, 110.0));
        let top = recorder.coords(tree.find_view("top").unwrap()).unwrap();
        let bottom = recorder.coords(tree.find_view("bottom").unwrap()).unwrap();
        assert_eq!(top, Rect::new(0.0, 0.0, 200.0, 40.0));
        assert_eq!(bottom, Rect::new(0.0, 50.0, 200.0, 60.0));
    }

    #[test]
    fn sample_replicas_carry_their_identity() {
        let mut context = TestContext::new();
        let json = r#"{
            "samples": {"data": {"values": [
                {"sample": "s1"}, {"sample": "s2"}, {"sample": "s1"}
            ]}},
            "spec": {"name": "track", "mark": "rect"}
        }"#;
        let spec = ViewSpec::parse(json).unwrap();
        let tree = ViewTree::build(&spec, &mut context).unwrap();

        let mut deferred = DeferredViewRenderingContext::new();
        tree.render(&mut deferred, Rect::new(0.0, 0.0, 100.0, 100.0));
        deferred.flush();

        let facets: Vec<Option<String>> = context
            .log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MarkEvent::Draw(_, facet) => Some(facet.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            facets,
            vec![Some("s1".to_string()), Some("s2".to_string())]
        );
        // One mark, one viewport: both passes see the full rectangle.
        let prepares = context
            .log
            .borrow()
            .iter()
            .filter(|e| matches!(e, MarkEvent::Prepare(_)))
            .count();
        assert_eq!(prepares, 1);
    }

    #[test]
    fn facet_replicas_stack_per_category() {
        let mut context = TestContext::new();
        let json = r#"{
            "facet": {"field": "group"},
            "spec": {"name": "cell", "mark": "point"},
            "data": {"values": [
                {"group": "a"}, {"group": "b"}, {"group": "a"}
            ]}
        }"#;
        let spec = ViewSpec::parse(json).unwrap();
        let tree = ViewTree::build(&spec, &mut context).unwrap();

        let mut deferred = DeferredViewRenderingContext::new();
        tree.render(&mut deferred, Rect::new(0.0, 0.0, 100.0, 100.0));
        deferred.flush();

        let facets: Vec<Option<String>> = context
            .log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MarkEvent::Draw(_, facet) => Some(facet.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            facets,
            vec![Some("a".to_string()), Some("b".to_string())]
        );
        // Two stacked cells split the height minus the default spacing.
        let rects: Vec<Rect> = context
            .log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MarkEvent::Viewport(_, rect) => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(rects, vec![
            Rect::new(0.0, 0.0, 100.0, 40.0),
            Rect::new(0.0, 60.0, 100.0, 40.0),
        ]);
    }

    #[test]
    fn multi_stop_quantitative_domains_resolve_as_piecewise() {
        let mut context = TestContext::new();
        let mut tree = ViewTree::parse(
            r#"{
                "name": "diverging",
                "mark": "point",
                "data": {"values": [{"v": 0.25}]},
                "encoding": {
                    "x": {
                        "field": "v",
                        "type": "quantitative",
                        "scale": {"domain": [-1, 0, 1]},
                        "axis": null
                    }
                }
            }"#,
            &mut context,
        )
        .unwrap();
        tree.resolve_scales().unwrap();

        let unit = tree.find_view("diverging").unwrap();
        let domain = tree.scale_domain(unit, Channel::X).unwrap().unwrap();
        assert_eq!(domain.domain_type(), DomainType::Piecewise);
        let stops: Vec<f64> = domain.iter().filter_map(|s| s.as_f64()).collect();
        assert_eq!(stops, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn non_monotonic_explicit_domains_are_domain_errors() {
        let mut context = TestContext::new();
        let mut tree = ViewTree::parse(
            r#"{
                "name": "broken",
                "mark": "point",
                "encoding": {
                    "x": {
                        "field": "v",
                        "type": "quantitative",
                        "scale": {"domain": [1, 2, 2, 3]},
                        "axis": null
                    }
                }
            }"#,
            &mut context,
        )
        .unwrap();
        tree.resolve_scales().unwrap();

        let unit = tree.find_view("broken").unwrap();
        let err = tree.scale_domain(unit, Channel::X).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Domain {
                source: trellis_core::DomainError::NotMonotonic(_),
                ..
            }
        ));
    }

    #[test]
    fn repeated_renders_replay_identically() {
        let mut context = TestContext::new();
        let spec = ViewSpec::parse(SCATTER).unwrap();
        let mut tree = ViewTree::build(&spec, &mut context).unwrap();
        tree.refresh_axes(&HeuristicTextMeasurer).unwrap();

        let mut deferred = DeferredViewRenderingContext::new();
        tree.render(&mut deferred, Rect::new(0.0, 0.0, 300.0, 200.0));
        deferred.flush();
        let first = context.log.borrow().clone();
        context.log.borrow_mut().clear();

        tree.render(&mut deferred, Rect::new(0.0, 0.0, 300.0, 200.0));
        deferred.flush();
        assert_eq!(*context.log.borrow(), first);
    }
}
