// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-dimensional size resolution inspired by CSS flexbox.
//!
//! Items may have an absolute pixel size, a growth weight for distributing the
//! remaining space, or both (an absolute floor plus a share of the leftover).
//! Containers use [`map_to_pixel_coords`] to turn a list of size requests into
//! pixel locations along their main axis. The growth semantics follow CSS
//! `flex-grow`, whose corner cases are described at
//! <https://css-tricks.com/flex-grow-is-weird/>.

extern crate alloc;

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

use crate::Padding;

/// A size request: absolute pixels plus a share of the remaining space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeDef {
    /// Absolute size in pixels.
    pub px: f64,
    /// Share of the remaining space, relative to the sum of all grows.
    pub grow: f64,
}

impl SizeDef {
    /// A fixed pixel size with no growth.
    pub fn px(px: f64) -> Self {
        Self { px, grow: 0.0 }
    }

    /// A purely proportional size.
    pub fn grow(grow: f64) -> Self {
        Self { px: 0.0, grow }
    }

    /// A size that occupies no space and never grows.
    pub fn zero() -> Self {
        Self { px: 0.0, grow: 0.0 }
    }

    /// Returns true if the item neither occupies nor requests any space.
    pub fn is_zero(&self) -> bool {
        self.px == 0.0 && self.grow == 0.0
    }
}

impl Default for SizeDef {
    /// An unset size stretches to fill its container.
    fn default() -> Self {
        Self { px: 0.0, grow: 1.0 }
    }
}

/// A declarative size as authored in a spec.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizeInput {
    /// Fill the container (`{px: 0, grow: 1}`).
    Container,
    /// A fixed pixel size.
    Px(f64),
    /// An explicit size definition.
    Def(SizeDef),
}

impl SizeInput {
    /// Resolves the authored size into a [`SizeDef`].
    pub fn to_size_def(self) -> SizeDef {
        match self {
            Self::Container => SizeDef::default(),
            Self::Px(px) => SizeDef::px(px),
            Self::Def(def) => def,
        }
    }
}

/// A one-dimensional location and size in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocSize {
    /// Distance from the container start.
    pub location: f64,
    /// Extent along the axis.
    pub size: f64,
}

/// Options for [`map_to_pixel_coords`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlexOpts {
    /// Gap between items in pixels. Gaps around zero-sized items collapse.
    pub spacing: f64,
    /// Snap locations and sizes to device pixel boundaries.
    ///
    /// `None` disables the snapping.
    pub device_pixel_ratio: Option<f64>,
    /// Added to every emitted location, e.g. to shift a whole row into its
    /// parent's coordinate space.
    pub offset: f64,
    /// Fill from the end of the container toward the start.
    pub reverse: bool,
}

impl FlexOpts {
    /// Options with the given spacing and everything else defaulted.
    pub fn spacing(spacing: f64) -> Self {
        Self {
            spacing,
            ..Self::default()
        }
    }

    /// Options with the given offset and everything else defaulted.
    pub fn offset(offset: f64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }
}

/// Computes pixel locations and sizes for the given flex items.
///
/// Fixed pixel sizes are honored as-is; the remaining space (clamped at zero)
/// is distributed between items in proportion to their grow weights. Reversed
/// layout mirrors the locations so that the first item ends up at the far end
/// of the container.
///
/// Zero-sized items collapse: they emit `{location, size: 0}` at the current
/// cursor without consuming spacing, so an all-zero input yields all-zero
/// outputs rather than accumulating gaps.
pub fn map_to_pixel_coords(items: &[SizeDef], container_size: f64, opts: &FlexOpts) -> Vec<LocSize> {
    let spacing = opts.spacing;

    let mut total_px = 0.0;
    let mut total_grow = 0.0;
    for item in items {
        total_px += item.px + if item.is_zero() { 0.0 } else { spacing };
        total_grow += item.grow;
    }
    total_px -= spacing;

    let remaining = (container_size - total_px).max(0.0);

    let round = |x: f64| match opts.device_pixel_ratio {
        Some(dpr) => (x * dpr).round() / dpr,
        None => x,
    };

    let mut results = Vec::with_capacity(items.len());
    let mut x = if opts.reverse {
        container_size.max(total_px)
    } else {
        0.0
    };

    for item in items {
        if item.is_zero() {
            results.push(LocSize {
                location: round(x) + opts.offset,
                size: 0.0,
            });
            continue;
        }

        let advance = item.px
            + if total_grow > 0.0 {
                item.grow / total_grow * remaining
            } else {
                0.0
            };

        if opts.reverse {
            x -= advance;
        }

        results.push(LocSize {
            location: round(x) + opts.offset,
            size: round(advance),
        });

        if opts.reverse {
            x -= spacing;
        } else {
            x += advance + spacing;
        }
    }

    results
}

/// Returns the minimum size for the items: the sum of the fixed pixel
/// components plus the inter-item spacing, excluding the final gap.
pub fn minimum_size(items: &[SizeDef], opts: &FlexOpts) -> f64 {
    let mut size = 0.0;
    for item in items {
        size += item.px + if item.is_zero() { 0.0 } else { opts.spacing };
    }
    (size - opts.spacing).max(0.0)
}

/// Returns true if any item has a non-zero grow weight.
///
/// Parents use this to decide whether they may shrink-wrap their content.
pub fn is_stretching(items: &[SizeDef]) -> bool {
    items.iter().any(|item| item.grow != 0.0)
}

/// A width/height pair of size requests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlexDimensions {
    /// Horizontal size request.
    pub width: SizeDef,
    /// Vertical size request.
    pub height: SizeDef,
}

impl FlexDimensions {
    /// Creates a dimension pair.
    pub fn new(width: SizeDef, height: SizeDef) -> Self {
        Self { width, height }
    }

    /// Adds padding to the absolute (px) components of both dimensions.
    pub fn add_padding(self, padding: &Padding) -> Self {
        Self {
            width: SizeDef {
                px: self.width.px + padding.width(),
                grow: self.width.grow,
            },
            height: SizeDef {
                px: self.height.px + padding.height(),
                grow: self.height.grow,
            },
        }
    }
}
