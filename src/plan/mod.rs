//! Build plan schema and layer cache keys

pub mod cache;
pub mod schema;

pub use cache::{first_invalidated, layer_keys, CacheError, LayerKey};
pub use schema::{
    BuildPlan, BuildStep, ProcessDescriptor, DEFAULT_BASE_IMAGE, DEFAULT_MANIFEST,
    DEFAULT_SERVER_PROGRAM, DEFAULT_WORKDIR,
};
