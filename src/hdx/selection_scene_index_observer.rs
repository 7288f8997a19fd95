use crate::hd::{
	AddedPrimEntry, DirtiedPrimEntry, RemovedPrimEntry, RenamedPrimEntry, SceneIndex,
	SceneIndexHandle, SceneIndexObserver, SceneIndexObserverHandle, SceneIndexPrimView,
	SelectionsSchema,
};
use crate::sdf;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

static SELECTIONS_LOCATORS: LazyLock<crate::hd::DataSourceLocatorSet> =
	LazyLock::new(|| SelectionsSchema::default_locator().into());

/// Watches a scene index for changes to prim selections.
///
/// The version changes whenever the selection may have changed, so clients can compare
/// it against the version they last saw before recomputing [`Self::selection`].
#[derive(Default)]
pub struct SelectionSceneIndexObserver {
	scene_index: RwLock<Option<SceneIndexHandle>>,
	version: AtomicU64,
}

impl SelectionSceneIndexObserver {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Switches to observing `scene_index`. Setting the scene index already observed does nothing.
	pub fn set_scene_index(self: &Arc<Self>, scene_index: Option<SceneIndexHandle>) {
		let handle: SceneIndexObserverHandle = self.clone();
		let mut current = self.scene_index.write();
		let unchanged = match (current.as_ref(), scene_index.as_ref()) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			(None, None) => true,
			_ => false,
		};
		if unchanged {
			return;
		}

		if let Some(previous) = current.take() {
			previous.remove_observer(&handle);
		}
		if let Some(scene_index) = &scene_index {
			scene_index.add_observer(&handle);
		}
		*current = scene_index;
		drop(current);

		self.bump();
		tracing::debug!(version = self.version(), "selection scene index changed");
	}

	pub fn scene_index(&self) -> Option<SceneIndexHandle> {
		self.scene_index.read().clone()
	}

	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}

	/// The paths of all fully selected prims, in traversal order.
	pub fn selection(&self) -> Vec<sdf::Path> {
		let Some(scene_index) = self.scene_index() else {
			return Vec::new();
		};
		SceneIndexPrimView::new(&*scene_index, &sdf::Path::absolute_root_path())
			.filter(|path| {
				let prim = scene_index.prim(path);
				SelectionsSchema::get_from_parent(prim.data_source.as_ref()).is_fully_selected()
			})
			.collect()
	}

	fn bump(&self) {
		self.version.fetch_add(1, Ordering::AcqRel);
	}
}

impl SceneIndexObserver for SelectionSceneIndexObserver {
	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		if !entries.is_empty() {
			self.bump();
		}
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		if !entries.is_empty() {
			self.bump();
		}
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		if entries
			.iter()
			.any(|entry| entry.dirty_locators.intersects_set(&SELECTIONS_LOCATORS))
		{
			self.bump();
		}
	}

	fn prims_renamed(&self, _sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]) {
		if !entries.is_empty() {
			self.bump();
		}
	}
}
