//! layerpack-lib: build orchestration for layer packages
//!
//! This crate turns a directory of layer declarations into built artifacts:
//! - `tree`: compiles the layer directory into an ordered, validated tree
//! - `pipeline`: derives a fetch, step and finalize task chain per layer
//! - `execute`: runs the task graph idempotently and in parallel
//! - `clean`: removes outputs so that their tasks run again

pub mod clean;
pub mod consts;
pub mod dataset;
pub mod execute;
pub mod layer;
pub mod output_lock;
pub mod pipeline;
pub mod platform;
pub mod project;
pub mod tree;
pub mod util;
