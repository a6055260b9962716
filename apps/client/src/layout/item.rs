//! Measurable items for the masonry engine.
//!
//! The engine never inspects an item beyond `measure`. Heights are resolved
//! lazily at the fixed column width of the current pass.

/// A card the masonry engine can place.
pub trait MasonryItem {
    /// Rendered height of the item when laid out at `width`.
    fn measure(&self, width: f32) -> f32;
}

impl<F> MasonryItem for F
where
    F: Fn(f32) -> f32,
{
    fn measure(&self, width: f32) -> f32 {
        self(width)
    }
}

/// An item whose height does not depend on the column width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedHeight(pub f32);

impl MasonryItem for FixedHeight {
    fn measure(&self, _width: f32) -> f32 {
        self.0
    }
}

/// An item that scales with the column width, like a cover image.
///
/// `aspect_ratio` is width / height; `extra_height` is added below the scaled
/// block (captions, padding).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio {
    pub aspect_ratio: f32,
    pub extra_height: f32,
}

impl MasonryItem for AspectRatio {
    fn measure(&self, width: f32) -> f32 {
        if self.aspect_ratio > 0.0 && self.aspect_ratio.is_finite() {
            width / self.aspect_ratio + self.extra_height
        } else {
            self.extra_height
        }
    }
}
