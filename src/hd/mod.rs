//! Hydra
//!
//! Scene indices and the data sources they serve.

mod collection_predicate_library;
mod container_data_source_editor;
mod data_source;
mod data_source_locator;
mod data_source_locator_set;
mod debug;
mod dependency_forwarding_scene_index;
mod filtering_scene_index;
mod flattened_data_source_provider;
mod flattened_primvars_data_source_provider;
mod flattening_scene_index;
mod invalidatable_container_data_source;
mod notice_batching_scene_index;
mod overlay_container_data_source;
mod prim_data_source_overlay_cache;
mod prim_managing_scene_index_observer;
mod retained_data_source;
mod retained_scene_index;
mod scene_index;
mod scene_index_name_registry;
mod scene_index_observer;
mod schema;
pub mod testing;

pub use collection_predicate_library::*;
pub use container_data_source_editor::*;
pub use data_source::*;
pub use data_source_locator::*;
pub use data_source_locator_set::*;
pub use debug::*;
pub use dependency_forwarding_scene_index::*;
pub use filtering_scene_index::*;
pub use flattened_data_source_provider::*;
pub use flattened_primvars_data_source_provider::*;
pub use flattening_scene_index::*;
pub use invalidatable_container_data_source::*;
pub use notice_batching_scene_index::*;
pub use overlay_container_data_source::*;
pub use prim_data_source_overlay_cache::*;
pub use prim_managing_scene_index_observer::*;
pub use retained_data_source::*;
pub use retained_scene_index::*;
pub use scene_index::*;
pub use scene_index_name_registry::*;
pub use scene_index_observer::*;
pub use schema::*;
