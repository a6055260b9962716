pub mod space;

pub use space::{CoverImageDto, SpaceCard, SpaceDto};
