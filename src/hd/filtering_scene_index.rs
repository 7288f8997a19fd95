use crate::hd::{
	AddedPrimEntry, DirtiedPrimEntry, RemovedPrimEntry, RenamedPrimEntry, SceneIndex,
	SceneIndexBase, SceneIndexHandle, SceneIndexObserver, SceneIndexObserverHandle,
	convert_prims_renamed_to_removed_and_added,
};
use crate::tf;
use std::sync::{Arc, OnceLock, Weak};

/// State shared by scene indices that transform a single input.
pub struct SingleInputFilteringSceneIndexBase {
	base: SceneIndexBase,
	input: SceneIndexHandle,
	forwarder: OnceLock<SceneIndexObserverHandle>,
}

impl SingleInputFilteringSceneIndexBase {
	pub fn new(input: SceneIndexHandle) -> Self {
		Self {
			base: SceneIndexBase::new(),
			input,
			forwarder: OnceLock::new(),
		}
	}

	pub fn base(&self) -> &SceneIndexBase {
		&self.base
	}

	pub fn input_scene_index(&self) -> &SceneIndexHandle {
		&self.input
	}
}

/// A scene index reading from exactly one input and receiving its notices.
///
/// Implementations transform notices and forward them to their own observers. The input's
/// notices arrive through the hooks below once [`connect_filter`] has been called.
pub trait SingleInputFilteringSceneIndex: SceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase;

	fn input_scene_index(&self) -> &SceneIndexHandle {
		self.filtering_base().input_scene_index()
	}

	fn prims_added(&self, sender: &dyn SceneIndex, entries: &[AddedPrimEntry]);

	fn prims_removed(&self, sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]);

	fn prims_dirtied(&self, sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]);

	/// Handles renames as removals followed by additions.
	fn prims_renamed(&self, sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]) {
		let mut removed = Vec::new();
		let mut added = Vec::new();
		convert_prims_renamed_to_removed_and_added(sender, entries, &mut removed, &mut added);
		self.prims_removed(sender, &removed);
		self.prims_added(sender, &added);
	}
}

/// Subscribes `filter` to the notices of its input.
///
/// The input holds the subscription weakly and the filter owns it, so dropping the filter
/// ends it.
pub fn connect_filter<T>(filter: &Arc<T>)
where
	T: SingleInputFilteringSceneIndex + 'static,
{
	let forwarder: SceneIndexObserverHandle = Arc::new(FilteringObserver {
		owner: Arc::downgrade(filter),
	});
	if filter.filtering_base().forwarder.set(forwarder.clone()).is_err() {
		tf::coding_error!("Filtering scene index is already connected to its input");
		return;
	}
	filter.input_scene_index().add_observer(&forwarder);
}

struct FilteringObserver<T> {
	owner: Weak<T>,
}

impl<T> SceneIndexObserver for FilteringObserver<T>
where
	T: SingleInputFilteringSceneIndex + 'static,
{
	fn prims_added(&self, sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		if let Some(owner) = self.owner.upgrade() {
			SingleInputFilteringSceneIndex::prims_added(owner.as_ref(), sender, entries);
		}
	}

	fn prims_removed(&self, sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		if let Some(owner) = self.owner.upgrade() {
			SingleInputFilteringSceneIndex::prims_removed(owner.as_ref(), sender, entries);
		}
	}

	fn prims_dirtied(&self, sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		if let Some(owner) = self.owner.upgrade() {
			SingleInputFilteringSceneIndex::prims_dirtied(owner.as_ref(), sender, entries);
		}
	}

	fn prims_renamed(&self, sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]) {
		if let Some(owner) = self.owner.upgrade() {
			SingleInputFilteringSceneIndex::prims_renamed(owner.as_ref(), sender, entries);
		}
	}
}
