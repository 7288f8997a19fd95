//! Hydra Extensions
//!
//! Consumers of scene indices that sit at the end of a pipeline.

mod selection_scene_index_observer;

pub use selection_scene_index_observer::*;
