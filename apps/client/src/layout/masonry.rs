//! Masonry (waterfall) layout: greedy shortest-column placement.
//!
//! # Algorithm
//! - Column width = (W − S×(C−1)) / C, clamped at zero.
//! - Items are visited in input order, measured at the column width, and
//!   dropped into the column with the smallest accumulated height. Ties go to
//!   the leftmost column.
//! - Placement is final. O(N·C), no sorting, no backtracking.
//!
//! The pass is pure and synchronous. Async callers run it inside
//! `tokio::task::spawn_blocking` when the item count is large.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::LayoutError;
use crate::layout::item::MasonryItem;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// A placement rectangle in layout coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

/// Result of one layout pass. Index-aligned with the input items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub frames: Vec<Rect>,
    /// Column each item was assigned to.
    pub columns: Vec<usize>,
    /// Bounding height of the whole grid, trailing spacing excluded.
    pub total_height: f32,
    pub column_count: usize,
    pub column_width: f32,
    pub spacing: f32,
}

impl LayoutResult {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Column state (lives for a single pass)
// ────────────────────────────────────────────────────────────────────────────

struct ColumnState {
    /// y at which the next item in each column starts.
    next_y: Vec<f32>,
    /// Bottom edge of the last non-empty item in each column.
    bottom: Vec<f32>,
}

impl ColumnState {
    fn new(columns: usize) -> Self {
        Self {
            next_y: vec![0.0; columns],
            bottom: vec![0.0; columns],
        }
    }

    /// Rebuilds the column state a previous pass ended with.
    fn from_result(result: &LayoutResult) -> Self {
        let mut state = Self::new(result.column_count);
        for (frame, &col) in result.frames.iter().zip(&result.columns) {
            if frame.height > 0.0 && frame.max_y() >= state.bottom[col] {
                state.bottom[col] = frame.max_y();
                state.next_y[col] = frame.max_y() + result.spacing;
            }
        }
        state
    }

    /// Index of the shortest column; strict `<` keeps the leftmost on ties.
    fn shortest(&self) -> usize {
        let mut best = 0;
        for (i, &h) in self.next_y.iter().enumerate().skip(1) {
            if h < self.next_y[best] {
                best = i;
            }
        }
        best
    }

    /// Places an item of `height` in `col` and returns its y.
    fn place(&mut self, col: usize, height: f32, spacing: f32) -> f32 {
        let y = self.next_y[col];
        // Zero-height items take a slot but do not advance the column.
        if height > 0.0 {
            self.bottom[col] = y + height;
            self.next_y[col] = y + height + spacing;
        }
        y
    }

    fn bounding_height(&self) -> f32 {
        self.bottom.iter().copied().fold(0.0, f32::max)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Masonry layout configuration: column count and inter-item spacing.
///
/// Spacing applies both between columns and between vertically stacked items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasonryLayout {
    columns: usize,
    spacing: f32,
}

impl MasonryLayout {
    /// Fails fast on a zero column count or a negative/non-finite spacing.
    pub fn new(columns: usize, spacing: f32) -> Result<Self, LayoutError> {
        if columns == 0 {
            return Err(LayoutError::InvalidArgument(
                "column count must be at least 1".to_string(),
            ));
        }
        if !spacing.is_finite() || spacing < 0.0 {
            return Err(LayoutError::InvalidArgument(format!(
                "spacing must be a finite, non-negative number (got {spacing})"
            )));
        }
        Ok(Self { columns, spacing })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Width of a single column for a total available `width`.
    pub fn column_width(&self, width: f32) -> f32 {
        let gaps = self.spacing * (self.columns - 1) as f32;
        ((width - gaps) / self.columns as f32).max(0.0)
    }

    /// Horizontal offset of column `col`.
    pub fn column_x(&self, col: usize, column_width: f32) -> f32 {
        col as f32 * (column_width + self.spacing)
    }

    /// Lays out `items` across the columns of a `width`-wide container.
    pub fn layout<T: MasonryItem>(
        &self,
        items: &[T],
        width: f32,
    ) -> Result<LayoutResult, LayoutError> {
        let column_width = self.checked_column_width(width)?;
        let state = ColumnState::new(self.columns);
        Ok(self.place_all(state, Vec::new(), Vec::new(), items, column_width))
    }

    /// Places `items` after the ones already in `previous`, without
    /// re-measuring them. Equivalent to a full pass over the concatenation
    /// when earlier measurements have not changed.
    pub fn append<T: MasonryItem>(
        &self,
        previous: &LayoutResult,
        items: &[T],
        width: f32,
    ) -> Result<LayoutResult, LayoutError> {
        let column_width = self.checked_column_width(width)?;
        if previous.column_count != self.columns
            || previous.spacing != self.spacing
            || (previous.column_width - column_width).abs() > f32::EPSILON
        {
            return Err(LayoutError::InvalidArgument(format!(
                "previous layout used {} columns of width {} with spacing {}; \
                 cannot append with {} columns of width {} with spacing {}",
                previous.column_count,
                previous.column_width,
                previous.spacing,
                self.columns,
                column_width,
                self.spacing
            )));
        }
        if previous.columns.len() != previous.frames.len()
            || previous.columns.iter().any(|&c| c >= self.columns)
        {
            return Err(LayoutError::InvalidArgument(
                "previous layout has inconsistent column assignments".to_string(),
            ));
        }

        let state = ColumnState::from_result(previous);
        Ok(self.place_all(
            state,
            previous.frames.clone(),
            previous.columns.clone(),
            items,
            column_width,
        ))
    }

    fn checked_column_width(&self, width: f32) -> Result<f32, LayoutError> {
        if !width.is_finite() {
            return Err(LayoutError::InvalidArgument(format!(
                "available width must be finite (got {width})"
            )));
        }
        Ok(self.column_width(width))
    }

    fn place_all<T: MasonryItem>(
        &self,
        mut state: ColumnState,
        mut frames: Vec<Rect>,
        mut columns: Vec<usize>,
        items: &[T],
        column_width: f32,
    ) -> LayoutResult {
        frames.reserve(items.len());
        columns.reserve(items.len());

        for item in items {
            let height = sanitize_height(item.measure(column_width));
            let col = state.shortest();
            let y = state.place(col, height, self.spacing);
            frames.push(Rect {
                x: self.column_x(col, column_width),
                y,
                width: column_width,
                height,
            });
            columns.push(col);
        }

        let total_height = state.bounding_height();
        debug!(
            items = frames.len(),
            columns = self.columns,
            column_width,
            total_height,
            "Masonry layout pass complete"
        );

        LayoutResult {
            frames,
            columns,
            total_height,
            column_count: self.columns,
            column_width,
            spacing: self.spacing,
        }
    }
}

/// Pure-function entry point: one pass with no retained configuration.
pub fn layout_masonry<T: MasonryItem>(
    items: &[T],
    columns: usize,
    spacing: f32,
    width: f32,
) -> Result<LayoutResult, LayoutError> {
    MasonryLayout::new(columns, spacing)?.layout(items, width)
}

/// Negative and non-finite measurements collapse to zero height.
fn sanitize_height(height: f32) -> f32 {
    if !height.is_finite() || height < 0.0 {
        0.0
    } else {
        height
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
