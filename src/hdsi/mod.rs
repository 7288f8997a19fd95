//! Hydra Scene Indices
//!
//! Filtering scene indices that resolve scene data into the form renderers consume.

mod legacy_geom_subset_scene_index;
mod material_override_resolving_scene_index;
mod velocity_motion_resolving_scene_index;

pub use legacy_geom_subset_scene_index::*;
pub use material_override_resolving_scene_index::*;
pub use velocity_motion_resolving_scene_index::*;
