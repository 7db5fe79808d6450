pub mod aspect;
pub mod caption;
pub mod common;
pub mod image;

pub use aspect::*;
pub use caption::CaptionRequest;
pub use common::*;
pub use image::*;
