// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An immutable axis-aligned rectangle.

use crate::Padding;

/// An immutable rectangle given by its top-left corner and extents.
///
/// All layout math in Trellis operates on these. Shrinking by a padding
/// clamps the extents at zero so a layout pass can legally collapse a view,
/// but never produces negative dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent. Never negative after a valid layout pass.
    pub width: f64,
    /// Vertical extent. Never negative after a valid layout pass.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle. Extents are clamped at zero.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Right edge (`x + width`).
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Returns a copy moved by the given deltas.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        if dx == 0.0 && dy == 0.0 {
            return *self;
        }
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Returns a copy with a replaced x coordinate.
    pub fn with_x(&self, x: f64) -> Self {
        Self { x, ..*self }
    }

    /// Returns a copy with a replaced y coordinate.
    pub fn with_y(&self, y: f64) -> Self {
        Self { y, ..*self }
    }

    /// Returns a copy with a replaced width. Clamped at zero.
    pub fn with_width(&self, width: f64) -> Self {
        Self {
            width: width.max(0.0),
            ..*self
        }
    }

    /// Returns a copy with a replaced height. Clamped at zero.
    pub fn with_height(&self, height: f64) -> Self {
        Self {
            height: height.max(0.0),
            ..*self
        }
    }

    /// Grows the rectangle outward by the given padding.
    pub fn expand(&self, padding: &Padding) -> Self {
        if padding.is_zero() {
            return *self;
        }
        Self::new(
            self.x - padding.left,
            self.y - padding.top,
            self.width + padding.width(),
            self.height + padding.height(),
        )
    }

    /// Shrinks the rectangle inward by the given padding.
    ///
    /// Extents clamp at zero when the padding exceeds the available space.
    pub fn shrink(&self, padding: &Padding) -> Self {
        if padding.is_zero() {
            return *self;
        }
        Self::new(
            self.x + padding.left,
            self.y + padding.top,
            self.width - padding.width(),
            self.height - padding.height(),
        )
    }

    /// Tests whether the rectangle contains the given point.
    ///
    /// The left/top edges are inclusive, the right/bottom edges exclusive.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }
}

impl From<Rect> for kurbo::Rect {
    fn from(r: Rect) -> Self {
        Self::new(r.x, r.y, r.x2(), r.y2())
    }
}
