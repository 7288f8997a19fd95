use crate::hd::{SceneIndex, SceneIndexHandle};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Weak};

/// Scene indices registered under a name, held weakly.
///
/// Registering a name again replaces the earlier registration.
#[derive(Default)]
pub struct SceneIndexNameRegistry {
	registered: Mutex<BTreeMap<String, Weak<dyn SceneIndex>>>,
}

static INSTANCE: LazyLock<SceneIndexNameRegistry> = LazyLock::new(SceneIndexNameRegistry::new);

impl SceneIndexNameRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// The process-wide registry.
	pub fn instance() -> &'static SceneIndexNameRegistry {
		&INSTANCE
	}

	pub fn register_named_scene_index(&self, name: &str, scene_index: &SceneIndexHandle) {
		tracing::debug!(name, "registering named scene index");
		self.registered
			.lock()
			.insert(name.to_string(), Arc::downgrade(scene_index));
	}

	/// Names of registered scene indices still alive, sorted. Expired entries are dropped.
	pub fn registered_names(&self) -> Vec<String> {
		let mut registered = self.registered.lock();
		registered.retain(|_, scene_index| scene_index.strong_count() > 0);
		registered.keys().cloned().collect()
	}

	pub fn named_scene_index(&self, name: &str) -> Option<SceneIndexHandle> {
		self.registered.lock().get(name)?.upgrade()
	}
}
