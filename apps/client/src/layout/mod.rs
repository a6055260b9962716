// Masonry grid for the spaces feed.
// Pure and synchronous; large passes run inside tokio::task::spawn_blocking.

pub mod item;
pub mod masonry;

pub use item::{AspectRatio, FixedHeight, MasonryItem};
pub use masonry::{layout_masonry, LayoutResult, MasonryLayout, Rect};
