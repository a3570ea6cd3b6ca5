//! Icon pipeline: file source → decoded cache → color transform → sized PNG.

pub mod cache;
pub mod resolver;
pub mod source;
pub mod transform;

pub use cache::{BaseImage, IconVariant, ImageTransformCache};
pub use resolver::{IconResolver, MAX_ICON_SIZE, check_size};
pub use source::{DirIconSource, IconSource};
