use crate::hd::{
	self, AddedPrimEntry, DirtiedPrimEntry, RemovedPrimEntry, RenamedPrimEntry, SceneIndex,
	SceneIndexBase, SceneIndexHandle, SceneIndexPrim, SingleInputFilteringSceneIndex,
	SingleInputFilteringSceneIndexBase,
};
use crate::sdf;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

enum Batch {
	Added(Vec<AddedPrimEntry>),
	Removed(Vec<RemovedPrimEntry>),
	Dirtied(Vec<DirtiedPrimEntry>),
	Renamed(Vec<RenamedPrimEntry>),
}

/// Passes notices through, or while batching is enabled, holds them back until flushed.
///
/// Held notices keep their order. Consecutive notices of the same kind are merged into one.
pub struct NoticeBatchingSceneIndex {
	base: SingleInputFilteringSceneIndexBase,
	batching_enabled: AtomicBool,
	batches: Mutex<Vec<Batch>>,
}

impl NoticeBatchingSceneIndex {
	pub fn new(input: SceneIndexHandle) -> Arc<Self> {
		let scene_index = Arc::new(Self {
			base: SingleInputFilteringSceneIndexBase::new(input),
			batching_enabled: AtomicBool::new(false),
			batches: Mutex::new(Vec::new()),
		});
		hd::connect_filter(&scene_index);
		scene_index
	}

	pub fn is_batching_enabled(&self) -> bool {
		self.batching_enabled.load(Ordering::Acquire)
	}

	/// Disabling batching flushes the held notices.
	pub fn set_batching_enabled(&self, enabled: bool) {
		let was_enabled = self.batching_enabled.swap(enabled, Ordering::AcqRel);
		if was_enabled && !enabled {
			self.flush();
		}
	}

	pub fn pending_batch_count(&self) -> usize {
		self.batches.lock().len()
	}

	/// Sends the held notices.
	pub fn flush(&self) {
		let batches = std::mem::take(&mut *self.batches.lock());
		if batches.is_empty() {
			return;
		}

		tracing::trace!(count = batches.len(), "flushing notice batches");
		for batch in batches {
			match batch {
				Batch::Added(entries) => self.send_prims_added(&entries),
				Batch::Removed(entries) => self.send_prims_removed(&entries),
				Batch::Dirtied(entries) => self.send_prims_dirtied(&entries),
				Batch::Renamed(entries) => self.send_prims_renamed(&entries),
			}
		}
	}

	/// Appends to the last batch if it has the same kind, else starts a new one.
	fn hold(&self, batch: Batch) {
		let mut batches = self.batches.lock();
		let batch = match batches.last_mut() {
			Some(last) => match (last, batch) {
				(Batch::Added(last), Batch::Added(entries)) => return last.extend(entries),
				(Batch::Removed(last), Batch::Removed(entries)) => return last.extend(entries),
				(Batch::Dirtied(last), Batch::Dirtied(entries)) => return last.extend(entries),
				(Batch::Renamed(last), Batch::Renamed(entries)) => return last.extend(entries),
				(_, batch) => batch,
			},
			None => batch,
		};
		batches.push(batch);
	}
}

impl SceneIndex for NoticeBatchingSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		self.input_scene_index().prim(prim_path)
	}

	fn child_prim_paths(&self, prim_path: &sdf::Path) -> Vec<sdf::Path> {
		self.input_scene_index().child_prim_paths(prim_path)
	}

	fn base(&self) -> &SceneIndexBase {
		self.base.base()
	}

	fn input_scene_indices(&self) -> Vec<SceneIndexHandle> {
		vec![self.input_scene_index().clone()]
	}
}

impl SingleInputFilteringSceneIndex for NoticeBatchingSceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		if self.is_batching_enabled() {
			self.hold(Batch::Added(entries.to_vec()));
		} else {
			self.send_prims_added(entries);
		}
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		if self.is_batching_enabled() {
			self.hold(Batch::Removed(entries.to_vec()));
		} else {
			self.send_prims_removed(entries);
		}
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		if self.is_batching_enabled() {
			self.hold(Batch::Dirtied(entries.to_vec()));
		} else {
			self.send_prims_dirtied(entries);
		}
	}

	fn prims_renamed(&self, _sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]) {
		if self.is_batching_enabled() {
			self.hold(Batch::Renamed(entries.to_vec()));
		} else {
			self.send_prims_renamed(entries);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::testing::{Notice, RecordingObserver};
	use crate::hd::{RetainedAddedPrimEntry, RetainedSceneIndex, SceneIndexObserverHandle};
	use crate::tf;

	fn p(s: &str) -> sdf::Path {
		sdf::Path::from(s)
	}

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn setup() -> (
		Arc<RetainedSceneIndex>,
		Arc<NoticeBatchingSceneIndex>,
		Arc<RecordingObserver>,
	) {
		let input = RetainedSceneIndex::new();
		let batching = NoticeBatchingSceneIndex::new(input.clone());
		let observer = RecordingObserver::new();
		let handle: SceneIndexObserverHandle = observer.clone();
		batching.add_observer(&handle);
		(input, batching, observer)
	}

	fn add(input: &RetainedSceneIndex, path: &str) {
		input.add_prims(&[RetainedAddedPrimEntry::new(p(path), t("mesh"), None)]);
	}

	#[test]
	fn passes_through_when_disabled() {
		let (input, batching, observer) = setup();
		assert!(!batching.is_batching_enabled());
		add(&input, "/A");
		assert_eq!(observer.notices().len(), 1);
	}

	#[test]
	fn merges_adjacent_notices_of_the_same_kind() {
		let (input, batching, observer) = setup();
		batching.set_batching_enabled(true);

		add(&input, "/A");
		add(&input, "/B");
		input.remove_prims(&[RemovedPrimEntry::new(p("/A"))]);
		add(&input, "/C");
		assert!(observer.notices().is_empty());
		assert_eq!(batching.pending_batch_count(), 3);

		batching.flush();
		assert_eq!(
			observer.notices(),
			[
				Notice::Added(vec![
					AddedPrimEntry::new(p("/A"), t("mesh")),
					AddedPrimEntry::new(p("/B"), t("mesh")),
				]),
				Notice::Removed(vec![RemovedPrimEntry::new(p("/A"))]),
				Notice::Added(vec![AddedPrimEntry::new(p("/C"), t("mesh"))]),
			]
		);
		assert_eq!(batching.pending_batch_count(), 0);
	}

	#[test]
	fn disabling_flushes() {
		let (input, batching, observer) = setup();
		batching.set_batching_enabled(true);
		add(&input, "/A");
		batching.set_batching_enabled(false);
		assert_eq!(observer.added_entries(), [AddedPrimEntry::new(p("/A"), t("mesh"))]);

		add(&input, "/B");
		assert_eq!(observer.notices().len(), 2);
	}
}
