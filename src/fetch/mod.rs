pub mod pipeline;
pub mod request;

pub use pipeline::{FetchEvent, FetchPipeline};
pub use request::{FeatureInfoRequest, LegendRequest, MapRequest};
