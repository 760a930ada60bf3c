pub mod composite;
pub mod decoder;

// Re-export main types
pub use composite::{CompositeFrame, CompositeInput, CompositeRenderer};
pub use decoder::{decode, RasterImage};
