// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A four-sided padding value type.

/// Immutable top/right/bottom/left padding in pixels.
///
/// Negative sides are permitted (axes occasionally overhang their plot), but
/// most layout code clamps the resulting rectangle dimensions at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Padding {
    /// Padding above the content.
    pub top: f64,
    /// Padding to the right of the content.
    pub right: f64,
    /// Padding below the content.
    pub bottom: f64,
    /// Padding to the left of the content.
    pub left: f64,
}

impl Padding {
    /// Creates a padding from the four sides, in CSS order.
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Zero padding on every side.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The same padding on every side.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    /// Total horizontal padding (`left + right`).
    pub fn width(&self) -> f64 {
        self.left + self.right
    }

    /// Total vertical padding (`top + bottom`).
    pub fn height(&self) -> f64 {
        self.top + self.bottom
    }

    /// Returns true if every side is zero.
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    /// Side-wise sum of two paddings.
    pub fn add(&self, other: &Self) -> Self {
        Self::new(
            self.top + other.top,
            self.right + other.right,
            self.bottom + other.bottom,
            self.left + other.left,
        )
    }
}
