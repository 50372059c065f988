// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The declarative spec as authored, before any view semantics.
//!
//! A spec node must match exactly one recognized view shape, discriminated by
//! a single key: `mark`, `layer`, `facet`, `samples`, `hconcat`, `vconcat`,
//! `concat`, or `import`. Matching none or more than one is a parse error
//! rather than a guess. Everything here is plain serde data; the builder in
//! [`crate::factory`] turns it into a typed view tree.

extern crate alloc;

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use serde::{Deserialize, Deserializer};

/// The discriminating keys, in recognition order.
const SHAPE_KEYS: [&str; 8] = [
    "mark", "layer", "facet", "samples", "hconcat", "vconcat", "concat", "import",
];

/// Why a spec node failed to parse.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeError {
    /// More than one discriminating key was present.
    Ambiguous(Vec<String>),
    /// No discriminating key was present.
    Unrecognized,
    /// The node matched a shape but its fields failed to deserialize.
    Decode(String),
}

impl core::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ambiguous(keys) => write!(f, "spec matches multiple view shapes: {keys:?}"),
            Self::Unrecognized => write!(f, "spec matches no recognized view shape"),
            Self::Decode(message) => write!(f, "{message}"),
        }
    }
}

/// One node of the declarative view tree.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewSpec {
    /// A leaf view owning a single mark.
    Unit(UnitSpec),
    /// Overlaid children sharing one rectangle.
    Layer(LayerSpec),
    /// A child replicated per category value.
    Facet(FacetSpec),
    /// A child replicated per sample row.
    Sample(SampleSpec),
    /// Children side by side.
    HConcat(ConcatSpec),
    /// Children stacked vertically.
    VConcat(ConcatSpec),
    /// Children in a wrapping grid.
    Concat(ConcatSpec),
    /// A reference to an external spec, expanded by the host.
    Import(ImportSpec),
}

impl ViewSpec {
    /// Parses a spec from JSON text.
    pub fn parse(json: &str) -> Result<Self, ShapeError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ShapeError::Decode(e.to_string()))?;
        Self::from_value(value)
    }

    /// Recognizes the shape of a JSON value and decodes it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ShapeError> {
        let Some(object) = value.as_object() else {
            return Err(ShapeError::Unrecognized);
        };
        let present: Vec<String> = SHAPE_KEYS
            .iter()
            .filter(|key| object.contains_key(**key))
            .map(|key| (*key).to_owned())
            .collect();
        match present.as_slice() {
            [] => Err(ShapeError::Unrecognized),
            [key] => decode_shape(key, value),
            _ => Err(ShapeError::Ambiguous(present)),
        }
    }

    /// The view-kind word used for generated names and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit(_) => "unit",
            Self::Layer(_) => "layer",
            Self::Facet(_) => "facet",
            Self::Sample(_) => "sample",
            Self::HConcat(_) => "hconcat",
            Self::VConcat(_) => "vconcat",
            Self::Concat(_) => "concat",
            Self::Import(_) => "import",
        }
    }

    /// The shared fields, absent only for imports.
    pub fn common(&self) -> Option<&CommonSpec> {
        match self {
            Self::Unit(s) => Some(&s.common),
            Self::Layer(s) => Some(&s.common),
            Self::Facet(s) => Some(&s.common),
            Self::Sample(s) => Some(&s.common),
            Self::HConcat(s) | Self::VConcat(s) | Self::Concat(s) => Some(&s.common),
            Self::Import(_) => None,
        }
    }
}

fn decode_shape(key: &str, value: serde_json::Value) -> Result<ViewSpec, ShapeError> {
    fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, ShapeError> {
        serde_json::from_value(value).map_err(|e| ShapeError::Decode(e.to_string()))
    }
    Ok(match key {
        "mark" => ViewSpec::Unit(decode(value)?),
        "layer" => ViewSpec::Layer(decode(value)?),
        "facet" => ViewSpec::Facet(decode(value)?),
        "samples" => ViewSpec::Sample(decode(value)?),
        "hconcat" => ViewSpec::HConcat(decode(value)?),
        "vconcat" => ViewSpec::VConcat(decode(value)?),
        "concat" => ViewSpec::Concat(decode(value)?),
        "import" => ViewSpec::Import(decode(value)?),
        _ => unreachable!("key comes from SHAPE_KEYS"),
    })
}

impl<'de> Deserialize<'de> for ViewSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Fields shared by every non-import view shape.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommonSpec {
    /// Optional view name, used in paths and lookups.
    pub name: Option<String>,
    /// Free-form description; not interpreted.
    pub description: Option<String>,
    /// The dataset this view (and its descendants) encode.
    pub data: Option<DataSpec>,
    /// Channel encodings, inherited by descendants.
    pub encoding: Option<EncodingSpec>,
    /// Scale/axis resolution policies for this container.
    pub resolve: Option<ResolveSpec>,
    /// Authored width.
    pub width: Option<SizeSpec>,
    /// Authored height.
    pub height: Option<SizeSpec>,
    /// Space around the view's content.
    pub padding: Option<PaddingSpec>,
    /// Whether the view renders at all.
    pub visible: Option<bool>,
    /// Plot background styling, honored on decorated views.
    pub view: Option<ViewBackgroundSpec>,
}

/// A unit (leaf) view spec.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UnitSpec {
    /// Shared fields.
    #[serde(flatten)]
    pub common: CommonSpec,
    /// The mark this unit draws.
    pub mark: MarkDefSpec,
}

/// A layer view spec.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LayerSpec {
    /// Shared fields.
    #[serde(flatten)]
    pub common: CommonSpec,
    /// The overlaid children, bottom first.
    pub layer: Vec<ViewSpec>,
}

/// A facet view spec.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FacetSpec {
    /// Shared fields.
    #[serde(flatten)]
    pub common: CommonSpec,
    /// What to facet by.
    pub facet: FacetDefSpec,
    /// The replicated child.
    pub spec: Box<ViewSpec>,
    /// Wrap after this many columns.
    pub columns: Option<usize>,
    /// Gap between facet cells in pixels.
    pub spacing: Option<f64>,
}

/// The facet field, as a bare field def or a column/row mapping.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FacetDefSpec {
    /// `facet: {field: ...}`.
    Field(FacetFieldDefSpec),
    /// `facet: {column: {field: ...}}` or `{row: {field: ...}}`.
    Mapping {
        /// Horizontal replication.
        column: Option<FacetFieldDefSpec>,
        /// Vertical replication.
        row: Option<FacetFieldDefSpec>,
    },
}

/// A facet field reference.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FacetFieldDefSpec {
    /// The field whose distinct values become facets.
    pub field: String,
}

/// A sample view spec: one track per sample row.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SampleSpec {
    /// Shared fields.
    #[serde(flatten)]
    pub common: CommonSpec,
    /// Where the sample identities come from.
    pub samples: SampleDefSpec,
    /// The replicated child.
    pub spec: Box<ViewSpec>,
    /// Gap between sample groups in pixels.
    pub spacing: Option<f64>,
}

/// The source of sample identities.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SampleDefSpec {
    /// Explicit sample records; each needs a `sample` field.
    ///
    /// When absent, identities come from the `sample` channel's resolved
    /// domain.
    pub data: Option<DataSpec>,
}

/// An hconcat/vconcat/concat view spec.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ConcatSpec {
    /// Shared fields.
    #[serde(flatten)]
    pub common: CommonSpec,
    /// The children, in layout order.
    #[serde(alias = "hconcat", alias = "vconcat", alias = "concat")]
    pub children: Vec<ViewSpec>,
    /// Wrap after this many columns (generic concat only).
    pub columns: Option<usize>,
    /// Gap between children in pixels.
    pub spacing: Option<f64>,
}

/// An import placeholder.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ImportSpec {
    /// Where the imported spec lives.
    pub import: ImportDefSpec,
}

/// An import target: a URL or a registered template name.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportDefSpec {
    /// A URL to fetch.
    pub url: Option<String>,
    /// A host-registered template name.
    pub name: Option<String>,
}

/// A mark as a bare type name or an object with properties.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MarkDefSpec {
    /// `mark: "point"`.
    Kind(String),
    /// `mark: {type: "point", ...}`.
    Full(MarkPropsSpec),
}

impl MarkDefSpec {
    /// The mark type name.
    pub fn kind(&self) -> &str {
        match self {
            Self::Kind(kind) => kind,
            Self::Full(props) => &props.kind,
        }
    }

    /// Whether draws should clip to the view rectangle.
    pub fn clip(&self) -> bool {
        match self {
            Self::Kind(_) => false,
            Self::Full(props) => props.clip.unwrap_or(false),
        }
    }
}

/// Mark properties beyond the type name.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MarkPropsSpec {
    /// The mark type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether draws should clip to the view rectangle.
    #[serde(default)]
    pub clip: Option<bool>,
}

/// A dataset reference: inline values or a host-registered name.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataSpec {
    /// A name the host resolves to a collector.
    pub name: Option<String>,
    /// Inline records.
    pub values: Option<Vec<serde_json::Value>>,
}

/// Channel name to channel definition. A `null` definition prunes an
/// inherited channel.
pub type EncodingSpec = HashMap<String, Option<ChannelDefSpec>>;

/// One channel's encoding definition.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelDefSpec {
    /// The field to encode.
    pub field: Option<String>,
    /// The data type: quantitative, ordinal, nominal.
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    /// A constant value in range space instead of a field.
    pub value: Option<serde_json::Value>,
    /// Title used for axes; defaults to the field name.
    pub title: Option<String>,
    /// Scale configuration.
    pub scale: Option<ScaleDefSpec>,
    /// Axis configuration; `null` disables the axis entirely.
    #[serde(deserialize_with = "some_nullable")]
    pub axis: Option<Option<AxisDefSpec>>,
}

/// Deserializes a present-but-maybe-null field into `Some(Option<T>)`.
fn some_nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Scale configuration on a channel.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScaleDefSpec {
    /// Explicit domain values, overriding data extraction.
    pub domain: Option<Vec<serde_json::Value>>,
    /// Whether a quantitative domain must include zero.
    pub zero: Option<bool>,
}

/// Axis configuration on a channel. All fields optional; see
/// [`crate::axis::AxisProps`] for defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AxisDefSpec {
    /// Requested orientation slot.
    pub orient: Option<String>,
    /// Whether to draw the domain line.
    pub domain: Option<bool>,
    /// Whether to draw tick marks.
    pub ticks: Option<bool>,
    /// Tick line length.
    pub tick_size: Option<f64>,
    /// Approximate tick count.
    pub tick_count: Option<usize>,
    /// Minimum distance between tick values.
    pub tick_min_step: Option<f64>,
    /// Explicit tick values.
    pub values: Option<Vec<f64>>,
    /// Whether to draw tick labels.
    pub labels: Option<bool>,
    /// Label rotation in degrees.
    pub label_angle: Option<f64>,
    /// Gap between tick end and label.
    pub label_padding: Option<f64>,
    /// Label font size.
    pub label_font_size: Option<f64>,
    /// Tick label format.
    pub format: Option<String>,
    /// Explicit axis title.
    pub title: Option<String>,
    /// Gap between labels and title.
    pub title_padding: Option<f64>,
    /// Title font size.
    pub title_font_size: Option<f64>,
    /// Smallest allowed axis extent.
    pub min_extent: Option<f64>,
    /// Largest allowed axis extent.
    pub max_extent: Option<f64>,
    /// Gap between the plot and the axis strip.
    pub offset: Option<f64>,
}

/// Resolution policies for scales and axes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolveSpec {
    /// Per-channel scale policies; a `default` key covers unlisted channels.
    pub scale: Option<HashMap<String, String>>,
    /// Per-channel axis policies; a `default` key covers unlisted channels.
    pub axis: Option<HashMap<String, String>>,
}

/// An authored size: a number, `"container"`, or `{px, grow}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    /// A fixed pixel size.
    Px(f64),
    /// A size definition with optional absolute and grow parts.
    Def {
        /// Absolute pixels.
        #[serde(default)]
        px: Option<f64>,
        /// Share of the remaining space.
        #[serde(default)]
        grow: Option<f64>,
    },
    /// A keyword, of which only `"container"` is recognized.
    Keyword(String),
}

/// An authored padding: a uniform number or per-side values.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PaddingSpec {
    /// The same padding on all four sides.
    Uniform(f64),
    /// Per-side padding; missing sides are zero.
    Sides {
        /// Top padding.
        #[serde(default)]
        top: f64,
        /// Right padding.
        #[serde(default)]
        right: f64,
        /// Bottom padding.
        #[serde(default)]
        bottom: f64,
        /// Left padding.
        #[serde(default)]
        left: f64,
    },
}

/// Plot background styling.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewBackgroundSpec {
    /// Background fill color.
    pub fill: Option<String>,
    /// Background stroke color.
    pub stroke: Option<String>,
}
