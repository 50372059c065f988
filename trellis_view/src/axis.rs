// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis properties, tick generation, and axis geometry.
//!
//! Axis views do not draw; they lower their resolved properties and the
//! owning scale's domain into an [`AxisScene`] of stroked paths and label
//! placements. The host's axis mark receives the scene through its rendering
//! options and rasterizes it however it likes.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::BezPath;
use peniko::Brush;
use peniko::color::palette::css;
use trellis_core::{DomainArray, Rect, Scalar};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;
use crate::view::Channel;

/// Axis placement, matching Vega's `orient` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisOrient {
    /// A horizontal axis above the plot.
    Top,
    /// A vertical axis to the right of the plot.
    Right,
    /// A horizontal axis below the plot.
    Bottom,
    /// A vertical axis to the left of the plot.
    Left,
}

impl AxisOrient {
    /// The spec-facing name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }

    /// Parses a spec-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    /// The positional channel this orientation serves.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Top | Self::Bottom => Channel::X,
            Self::Left | Self::Right => Channel::Y,
        }
    }

    /// Whether the axis line runs horizontally.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }

    /// The two orientation slots available to a positional channel, in
    /// preferred fill order.
    pub(crate) fn slots(channel: Channel) -> [Self; 2] {
        match channel {
            Channel::Y => [Self::Left, Self::Right],
            _ => [Self::Bottom, Self::Top],
        }
    }
}

/// A minimal text measurement interface used for axis extents.
///
/// Callers can plug in a real text measurement backend (e.g. based on
/// shaping), or use [`HeuristicTextMeasurer`].
pub trait TextMeasurer {
    /// Returns `(width, height)` in the same coordinate system as the views.
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// A tiny heuristic text measurer suitable for tests and early layout.
///
/// It assumes an average glyph width of ~0.6em and height of 1em.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
        let width = 0.6 * font_size * text.chars().count() as f64;
        (width, font_size)
    }
}

/// Fully resolved axis display properties.
///
/// Defaults follow Vega-Lite's axis documentation.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisProps {
    /// Smallest allowed extent perpendicular to the axis.
    pub min_extent: f64,
    /// Largest allowed extent perpendicular to the axis.
    pub max_extent: f64,
    /// Gap between the decorated plot and the axis strip.
    pub offset: f64,
    /// Whether to draw the axis domain line.
    pub domain: bool,
    /// Whether to draw tick marks.
    pub ticks: bool,
    /// Tick line length.
    pub tick_size: f64,
    /// Approximate number of ticks; `None` uses a default of 10.
    pub tick_count: Option<usize>,
    /// Smallest allowed distance between tick values, in data units.
    pub tick_min_step: Option<f64>,
    /// Explicit tick values, overriding generation.
    pub values: Option<Vec<f64>>,
    /// Whether to draw tick labels.
    pub labels: bool,
    /// Tick label rotation in degrees.
    pub label_angle: f64,
    /// Gap between the tick end and the label.
    pub label_padding: f64,
    /// Tick label font size.
    pub label_font_size: f64,
    /// Optional tick label format: `"d"` or `".<n>f"`.
    pub format: Option<String>,
    /// Axis title, resolved from the contributing encodings.
    pub title: Option<String>,
    /// Gap between the labels and the title.
    pub title_padding: f64,
    /// Title font size.
    pub title_font_size: f64,
}

impl Default for AxisProps {
    fn default() -> Self {
        Self {
            min_extent: 20.0,
            max_extent: f64::INFINITY,
            offset: 0.0,
            domain: true,
            ticks: true,
            tick_size: 5.0,
            tick_count: None,
            tick_min_step: None,
            values: None,
            labels: true,
            label_angle: 0.0,
            label_padding: 4.0,
            label_font_size: 10.0,
            format: None,
            title: None,
            title_padding: 3.0,
            title_font_size: 10.0,
        }
    }
}

/// Per-encoding axis property overrides, all optional.
///
/// Contributions to a shared axis merge with a first-non-null-wins rule
/// before being applied on top of [`AxisProps::default`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisOverrides {
    /// Requested orientation slot.
    pub orient: Option<AxisOrient>,
    /// See [`AxisProps::domain`].
    pub domain: Option<bool>,
    /// See [`AxisProps::ticks`].
    pub ticks: Option<bool>,
    /// See [`AxisProps::tick_size`].
    pub tick_size: Option<f64>,
    /// See [`AxisProps::tick_count`].
    pub tick_count: Option<usize>,
    /// See [`AxisProps::tick_min_step`].
    pub tick_min_step: Option<f64>,
    /// See [`AxisProps::values`].
    pub values: Option<Vec<f64>>,
    /// See [`AxisProps::labels`].
    pub labels: Option<bool>,
    /// See [`AxisProps::label_angle`].
    pub label_angle: Option<f64>,
    /// See [`AxisProps::label_padding`].
    pub label_padding: Option<f64>,
    /// See [`AxisProps::label_font_size`].
    pub label_font_size: Option<f64>,
    /// See [`AxisProps::format`].
    pub format: Option<String>,
    /// Explicit axis title; takes precedence over encoding titles.
    pub title: Option<String>,
    /// See [`AxisProps::title_padding`].
    pub title_padding: Option<f64>,
    /// See [`AxisProps::title_font_size`].
    pub title_font_size: Option<f64>,
    /// See [`AxisProps::min_extent`].
    pub min_extent: Option<f64>,
    /// See [`AxisProps::max_extent`].
    pub max_extent: Option<f64>,
    /// See [`AxisProps::offset`].
    pub offset: Option<f64>,
}

impl AxisOverrides {
    /// Fills unset fields from `other`, keeping already-set ones.
    pub fn merge_missing(&mut self, other: &Self) {
        fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(other);
            }
        }
        fill(&mut self.orient, &other.orient);
        fill(&mut self.domain, &other.domain);
        fill(&mut self.ticks, &other.ticks);
        fill(&mut self.tick_size, &other.tick_size);
        fill(&mut self.tick_count, &other.tick_count);
        fill(&mut self.tick_min_step, &other.tick_min_step);
        fill(&mut self.values, &other.values);
        fill(&mut self.labels, &other.labels);
        fill(&mut self.label_angle, &other.label_angle);
        fill(&mut self.label_padding, &other.label_padding);
        fill(&mut self.label_font_size, &other.label_font_size);
        fill(&mut self.format, &other.format);
        fill(&mut self.title, &other.title);
        fill(&mut self.title_padding, &other.title_padding);
        fill(&mut self.title_font_size, &other.title_font_size);
        fill(&mut self.min_extent, &other.min_extent);
        fill(&mut self.max_extent, &other.max_extent);
        fill(&mut self.offset, &other.offset);
    }

    /// Applies the set fields on top of `props`.
    ///
    /// The title is handled by the axis resolution (titles join rather than
    /// override) and is deliberately not applied here.
    pub fn apply(&self, props: &mut AxisProps) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
        set(&mut props.domain, &self.domain);
        set(&mut props.ticks, &self.ticks);
        set(&mut props.tick_size, &self.tick_size);
        props.tick_count = self.tick_count.or(props.tick_count);
        props.tick_min_step = self.tick_min_step.or(props.tick_min_step);
        if self.values.is_some() {
            props.values.clone_from(&self.values);
        }
        set(&mut props.labels, &self.labels);
        set(&mut props.label_angle, &self.label_angle);
        set(&mut props.label_padding, &self.label_padding);
        set(&mut props.label_font_size, &self.label_font_size);
        if self.format.is_some() {
            props.format.clone_from(&self.format);
        }
        set(&mut props.title_padding, &self.title_padding);
        set(&mut props.title_font_size, &self.title_font_size);
        set(&mut props.min_extent, &self.min_extent);
        set(&mut props.max_extent, &self.max_extent);
        set(&mut props.offset, &self.offset);
    }
}

/// A single generated tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    /// Position along the axis as a fraction of its length, `0..=1`.
    ///
    /// Fraction 0 is the domain minimum: the left end of horizontal axes and
    /// the bottom end of vertical ones.
    pub fraction: f64,
    /// The formatted label.
    pub label: String,
}

/// Generates ticks for a resolved domain.
///
/// Quantitative and piecewise domains produce "nice" round values within
/// their interval; discrete domains produce one centered tick per value. An
/// absent or empty domain produces no ticks.
pub fn generate_ticks(props: &AxisProps, domain: Option<&DomainArray>) -> Vec<Tick> {
    let Some(domain) = domain else {
        return Vec::new();
    };
    if domain.is_empty() {
        return Vec::new();
    }

    if let Some((min, max)) = domain.interval() {
        return continuous_ticks(props, min, max);
    }

    let values: Vec<Scalar> = domain.iter().collect();
    let n = values.len();
    values
        .iter()
        .enumerate()
        .map(|(i, value)| Tick {
            fraction: (i as f64 + 0.5) / n as f64,
            label: scalar_label(value),
        })
        .collect()
}

fn continuous_ticks(props: &AxisProps, min: f64, max: f64) -> Vec<Tick> {
    let span = max - min;
    let count = props.tick_count.unwrap_or(10);

    let mut values = match &props.values {
        Some(values) => values.clone(),
        None => {
            let mut ticks = nice_ticks(min, max, count);
            if let Some(min_step) = props.tick_min_step
                && min_step > 0.0
                && tick_step(&ticks) < min_step
                && span > 0.0
            {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "span/min_step is finite, non-negative, and tiny counts are fine"
                )]
                let coarse = ((span / min_step) as usize).max(1);
                ticks = nice_ticks(min, max, coarse);
            }
            ticks
        }
    };
    let step = tick_step(&values);
    values.retain(|v| *v >= min - 1.0e-9 && *v <= max + 1.0e-9);

    values
        .into_iter()
        .map(|v| Tick {
            fraction: if span > 0.0 { (v - min) / span } else { 0.5 },
            label: format_label(props, v, step),
        })
        .collect()
}

fn tick_step(ticks: &[f64]) -> f64 {
    let step = ticks
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(f64::INFINITY, f64::min);
    if step.is_finite() { step } else { 0.0 }
}

fn nice_ticks(mut min: f64, mut max: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if min == max {
        return alloc::vec![min];
    }
    if min > max {
        core::mem::swap(&mut min, &mut max);
    }
    let span = max - min;
    let step0 = span / count.max(1) as f64;
    let step = nice_step(step0);
    if step == 0.0 {
        return alloc::vec![min, max];
    }

    let start = (min / step).ceil() * step;
    let stop = (max / step).floor() * step;

    let n_f = ((stop - start) / step).round();
    let n = if n_f.is_finite() && n_f >= 0.0 {
        let n_f = n_f.min(10_000.0);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "guarded by finite/non-negative checks and capped at 10k"
        )]
        {
            n_f as u64
        }
    } else {
        0
    };
    (0..=n).map(|i| start + step * i as f64).collect()
}

fn nice_step(step: f64) -> f64 {
    if !step.is_finite() || step <= 0.0 {
        return 0.0;
    }
    let power = step.log10().floor();
    let base = 10_f64.powf(power);
    let error = step / base;
    let nice = if error >= 7.5 {
        10.0
    } else if error >= 3.5 {
        5.0
    } else if error >= 1.5 {
        2.0
    } else {
        1.0
    };
    nice * base
}

fn format_label(props: &AxisProps, value: f64, step: f64) -> String {
    if let Some(format) = &props.format
        && let Some(formatted) = format_with(format, value)
    {
        return formatted;
    }
    format_tick(value, step)
}

/// Formats a tick value with a precision derived from the tick step.
pub fn format_tick(value: f64, step: f64) -> String {
    // Normalize negative zero so "-0" never shows up on an axis.
    let value = if value == 0.0 { 0.0 } else { value };
    if step > 0.0 && step.is_finite() && step < 1.0 {
        let digits = (-step.log10()).ceil().clamp(0.0, 6.0);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "clamped to 0..=6 above"
        )]
        let digits = digits as usize;
        alloc::format!("{value:.digits$}")
    } else if value == value.round() && value.abs() < 1.0e15 {
        alloc::format!("{value:.0}")
    } else {
        alloc::format!("{value}")
    }
}

fn format_with(format: &str, value: f64) -> Option<String> {
    if format == "d" {
        return Some(alloc::format!("{:.0}", value.round()));
    }
    let digits = format.strip_prefix('.')?.strip_suffix('f')?;
    let digits: usize = digits.parse().ok()?;
    Some(alloc::format!("{value:.digits$}"))
}

pub(crate) fn scalar_label(value: &Scalar) -> String {
    match value {
        Scalar::Number(n) => format_tick(*n, 0.0),
        Scalar::String(s) => s.clone(),
        Scalar::Boolean(b) => b.to_string(),
    }
}

/// Measures the thickness an axis needs perpendicular to its direction.
///
/// Tick size, label extents (accounting for rotation), and the title strip
/// are summed, then clamped to `minExtent..=maxExtent`.
pub fn measure_extent(
    props: &AxisProps,
    orient: AxisOrient,
    ticks: &[Tick],
    measurer: &dyn TextMeasurer,
) -> f64 {
    let mut extent = if props.ticks { props.tick_size.abs() } else { 0.0 };

    if props.labels {
        let theta = props.label_angle.to_radians();
        let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
        let mut label_extent = 0.0_f64;
        for tick in ticks {
            let (w, h) = measurer.measure(&tick.label, props.label_font_size);
            let e = if orient.is_horizontal() {
                sin * w + cos * h
            } else {
                cos * w + sin * h
            };
            label_extent = label_extent.max(e);
        }
        extent += props.label_padding.max(0.0) + label_extent;
    }

    if props.title.is_some() {
        extent += props.title_padding.max(0.0) + props.title_font_size;
    }

    extent.clamp(props.min_extent.max(0.0), props.max_extent)
}

/// Where a label is anchored horizontally relative to its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    /// The position is the start of the text.
    Start,
    /// The position is the center of the text.
    Middle,
    /// The position is the end of the text.
    End,
}

/// Where a label sits vertically relative to its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextBaseline {
    /// Normal baseline; text extends above the position.
    Alphabetic,
    /// Vertically centered on the position.
    Middle,
    /// Text hangs below the position.
    Hanging,
}

/// One drawable piece of an axis.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisFragment {
    /// A stroked path (domain line or tick marks).
    Path {
        /// The path in view coordinates.
        path: BezPath,
        /// Stroke paint.
        brush: Brush,
        /// Stroke width.
        width: f64,
    },
    /// A text label.
    Label {
        /// The label text.
        text: String,
        /// Horizontal position in view coordinates.
        x: f64,
        /// Vertical position in view coordinates.
        y: f64,
        /// Font size.
        font_size: f64,
        /// Fill paint.
        brush: Brush,
        /// Horizontal anchoring.
        anchor: TextAnchor,
        /// Vertical anchoring.
        baseline: TextBaseline,
        /// Rotation around `(x, y)` in degrees.
        angle: f64,
    },
}

/// Generated axis geometry for one axis strip.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisScene {
    /// The edge the axis is attached to.
    pub orient: AxisOrient,
    /// Drawable pieces in paint order.
    pub fragments: Vec<AxisFragment>,
}

/// Lowers resolved axis properties and ticks into drawable geometry.
///
/// `coords` is the axis strip rectangle, adjacent to the decorated plot; for
/// a bottom axis the plot sits directly above `coords`, and so on.
pub fn axis_scene(props: &AxisProps, orient: AxisOrient, ticks: &[Tick], coords: Rect) -> AxisScene {
    let rule = Brush::Solid(css::GRAY);
    let text = Brush::Solid(css::BLACK);
    let tick_size = props.tick_size.abs();
    let label_gap = if props.ticks { tick_size } else { 0.0 } + props.label_padding.max(0.0);

    let mut fragments = Vec::new();

    // Position of a tick fraction along the axis. Fraction 0 maps to the
    // bottom of vertical axes, matching a y scale's upward direction.
    let along = |fraction: f64| {
        if orient.is_horizontal() {
            coords.x + fraction * coords.width
        } else {
            coords.y2() - fraction * coords.height
        }
    };

    // The strip edge adjacent to the plot.
    let edge = match orient {
        AxisOrient::Bottom => coords.y,
        AxisOrient::Top => coords.y2(),
        AxisOrient::Left => coords.x2(),
        AxisOrient::Right => coords.x,
    };
    // Outward direction, away from the plot.
    let out = match orient {
        AxisOrient::Bottom | AxisOrient::Right => 1.0,
        AxisOrient::Top | AxisOrient::Left => -1.0,
    };

    if props.domain {
        let mut path = BezPath::new();
        if orient.is_horizontal() {
            path.move_to((coords.x, edge));
            path.line_to((coords.x2(), edge));
        } else {
            path.move_to((edge, coords.y));
            path.line_to((edge, coords.y2()));
        }
        fragments.push(AxisFragment::Path {
            path,
            brush: rule.clone(),
            width: 1.0,
        });
    }

    if props.ticks {
        let mut path = BezPath::new();
        for tick in ticks {
            let at = along(tick.fraction);
            if orient.is_horizontal() {
                path.move_to((at, edge));
                path.line_to((at, edge + out * tick_size));
            } else {
                path.move_to((edge, at));
                path.line_to((edge + out * tick_size, at));
            }
        }
        fragments.push(AxisFragment::Path {
            path,
            brush: rule.clone(),
            width: 1.0,
        });
    }

    if props.labels {
        for tick in ticks {
            let at = along(tick.fraction);
            let (x, y, anchor, baseline) = if orient.is_horizontal() {
                let y = edge + out * label_gap;
                let baseline = if out > 0.0 {
                    TextBaseline::Hanging
                } else {
                    TextBaseline::Alphabetic
                };
                (at, y, TextAnchor::Middle, baseline)
            } else {
                let x = edge + out * label_gap;
                let anchor = if out > 0.0 {
                    TextAnchor::Start
                } else {
                    TextAnchor::End
                };
                (x, at, anchor, TextBaseline::Middle)
            };
            fragments.push(AxisFragment::Label {
                text: tick.label.clone(),
                x,
                y,
                font_size: props.label_font_size,
                brush: text.clone(),
                anchor,
                baseline,
                angle: props.label_angle,
            });
        }
    }

    if let Some(title) = &props.title {
        // The title sits in a strip at the outer edge of the axis rectangle,
        // which `measure_extent` reserved after the labels.
        let fragment = match orient {
            AxisOrient::Bottom => AxisFragment::Label {
                text: title.clone(),
                x: (coords.x + coords.x2()) * 0.5,
                y: coords.y2() - props.title_font_size,
                font_size: props.title_font_size,
                brush: text.clone(),
                anchor: TextAnchor::Middle,
                baseline: TextBaseline::Hanging,
                angle: 0.0,
            },
            AxisOrient::Top => AxisFragment::Label {
                text: title.clone(),
                x: (coords.x + coords.x2()) * 0.5,
                y: coords.y + props.title_font_size,
                font_size: props.title_font_size,
                brush: text.clone(),
                anchor: TextAnchor::Middle,
                baseline: TextBaseline::Alphabetic,
                angle: 0.0,
            },
            AxisOrient::Left => AxisFragment::Label {
                text: title.clone(),
                x: coords.x + 0.5 * props.title_font_size,
                y: (coords.y + coords.y2()) * 0.5,
                font_size: props.title_font_size,
                brush: text.clone(),
                anchor: TextAnchor::Middle,
                baseline: TextBaseline::Middle,
                angle: -90.0,
            },
            AxisOrient::Right => AxisFragment::Label {
                text: title.clone(),
                x: coords.x2() - 0.5 * props.title_font_size,
                y: (coords.y + coords.y2()) * 0.5,
                font_size: props.title_font_size,
                brush: text.clone(),
                anchor: TextAnchor::Middle,
                baseline: TextBaseline::Middle,
                angle: 90.0,
            },
        };
        fragments.push(fragment);
    }

    AxisScene { orient, fragments }
}
