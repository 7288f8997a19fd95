use crate::hd::{
	AddedPrimEntry, DirtiedPrimEntry, RemovedPrimEntry, RenamedPrimEntry, SceneIndex,
	SceneIndexHandle, SceneIndexObserver, SceneIndexObserverHandle, SceneIndexPrimView,
	convert_prims_renamed_to_removed_and_added,
};
use crate::sdf;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An object kept in sync with one prim of an observed scene index.
pub trait ManagedPrim: Send + Sync + 'static {
	/// Called for every dirty notice on the prim.
	fn dirty(&self, entry: &DirtiedPrimEntry);

	/// Used by [`PrimManagingSceneIndexObserver::typed_prim`].
	fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

pub type ManagedPrimHandle = Arc<dyn ManagedPrim>;

/// Creates managed prims for added prims.
pub trait PrimFactory: Send + Sync {
	/// Returning `None` leaves the prim unmanaged.
	fn create_prim(&self, entry: &AddedPrimEntry, scene_index: &dyn SceneIndex)
	-> Option<ManagedPrimHandle>;
}

/// Owns one managed prim per prim of a scene index, created through a [`PrimFactory`].
///
/// An added notice for an existing prim replaces its managed prim. Removals drop the
/// managed prims of the whole subtree.
pub struct PrimManagingSceneIndexObserver {
	scene_index: SceneIndexHandle,
	factory: Arc<dyn PrimFactory>,
	prims: RwLock<BTreeMap<sdf::Path, ManagedPrimHandle>>,
}

impl PrimManagingSceneIndexObserver {
	/// Subscribes to `scene_index` and creates managed prims for the prims it already has.
	pub fn new(scene_index: SceneIndexHandle, factory: Arc<dyn PrimFactory>) -> Arc<Self> {
		let observer = Arc::new(Self {
			scene_index: scene_index.clone(),
			factory,
			prims: RwLock::new(BTreeMap::new()),
		});

		let handle: SceneIndexObserverHandle = observer.clone();
		scene_index.add_observer(&handle);

		let existing: Vec<AddedPrimEntry> =
			SceneIndexPrimView::new(&*scene_index, &sdf::Path::absolute_root_path())
				.map(|path| AddedPrimEntry::new(path, scene_index.prim(&path).prim_type))
				.filter(|entry| !entry.prim_type.is_empty())
				.collect();
		observer.add(&existing);

		observer
	}

	pub fn scene_index(&self) -> &SceneIndexHandle {
		&self.scene_index
	}

	pub fn prim(&self, prim_path: &sdf::Path) -> Option<ManagedPrimHandle> {
		self.prims.read().get(prim_path).cloned()
	}

	/// The managed prim at `prim_path` if it is a `T`.
	pub fn typed_prim<T: ManagedPrim>(&self, prim_path: &sdf::Path) -> Option<Arc<T>> {
		self.prim(prim_path)?.into_any().downcast::<T>().ok()
	}

	pub fn prim_paths(&self) -> Vec<sdf::Path> {
		self.prims.read().keys().copied().collect()
	}

	fn add(&self, entries: &[AddedPrimEntry]) {
		for entry in entries {
			let created = if entry.prim_type.is_empty() {
				None
			} else {
				self.factory.create_prim(entry, &*self.scene_index)
			};

			let mut prims = self.prims.write();
			match created {
				Some(prim) => {
					prims.insert(entry.prim_path, prim);
				}
				None => {
					prims.remove(&entry.prim_path);
				}
			}
		}
	}

	fn remove(&self, entries: &[RemovedPrimEntry]) {
		let mut prims = self.prims.write();
		for entry in entries {
			if entry.prim_path.is_absolute_root() {
				prims.clear();
			} else {
				prims.retain(|path, _| !path.has_prefix(&entry.prim_path));
			}
		}
	}
}

impl SceneIndexObserver for PrimManagingSceneIndexObserver {
	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		self.add(entries);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		self.remove(entries);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		for entry in entries {
			// Not held while the prim runs, so it may read back through the observer.
			let prim = self.prims.read().get(&entry.prim_path).cloned();
			if let Some(prim) = prim {
				prim.dirty(entry);
			}
		}
	}

	fn prims_renamed(&self, sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]) {
		let mut removed = Vec::new();
		let mut added = Vec::new();
		convert_prims_renamed_to_removed_and_added(sender, entries, &mut removed, &mut added);
		self.remove(&removed);
		self.add(&added);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::{self, RetainedAddedPrimEntry, RetainedSceneIndex};
	use crate::tf;
	use parking_lot::Mutex;

	fn p(s: &str) -> sdf::Path {
		sdf::Path::from(s)
	}

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	struct TestPrim {
		prim_type: tf::Token,
		dirtied: Mutex<Vec<hd::DataSourceLocatorSet>>,
	}

	impl ManagedPrim for TestPrim {
		fn dirty(&self, entry: &DirtiedPrimEntry) {
			self.dirtied.lock().push(entry.dirty_locators.clone());
		}

		fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
			self
		}
	}

	/// Manages meshes only.
	struct MeshFactory;

	impl PrimFactory for MeshFactory {
		fn create_prim(
			&self,
			entry: &AddedPrimEntry,
			_scene_index: &dyn SceneIndex,
		) -> Option<ManagedPrimHandle> {
			(entry.prim_type == t("mesh")).then(|| {
				Arc::new(TestPrim {
					prim_type: entry.prim_type.clone(),
					dirtied: Mutex::new(Vec::new()),
				}) as ManagedPrimHandle
			})
		}
	}

	fn entry(path: &str, prim_type: &str) -> RetainedAddedPrimEntry {
		RetainedAddedPrimEntry::new(p(path), t(prim_type), None)
	}

	#[test]
	fn populates_from_existing_prims() {
		let scene = RetainedSceneIndex::new();
		scene.add_prims(&[entry("/A", "mesh"), entry("/B", "xform"), entry("/B/C", "mesh")]);
		let observer = PrimManagingSceneIndexObserver::new(scene.clone(), Arc::new(MeshFactory));
		assert_eq!(observer.prim_paths(), [p("/A"), p("/B/C")]);
		let prim = observer.typed_prim::<TestPrim>(&p("/B/C")).expect("managed prim");
		assert_eq!(prim.prim_type, t("mesh"));
	}

	#[test]
	fn follows_added_removed_and_dirtied() {
		let scene = RetainedSceneIndex::new();
		let observer = PrimManagingSceneIndexObserver::new(scene.clone(), Arc::new(MeshFactory));

		scene.add_prims(&[entry("/A", "mesh"), entry("/A/B", "mesh")]);
		let before = observer.prim(&p("/A")).expect("managed prim");

		scene.add_prims(&[entry("/A", "mesh")]);
		let after = observer.prim(&p("/A")).expect("managed prim");
		assert!(!Arc::ptr_eq(&before, &after));

		scene.dirty_prims(&[DirtiedPrimEntry::new(p("/A/B"), hd::DataSourceLocator::from("points").into())]);
		let b = observer.typed_prim::<TestPrim>(&p("/A/B")).expect("managed prim");
		assert_eq!(b.dirtied.lock().len(), 1);

		scene.add_prims(&[entry("/A/B", "xform")]);
		assert!(observer.prim(&p("/A/B")).is_none());

		scene.remove_prims(&[RemovedPrimEntry::new(p("/A"))]);
		assert!(observer.prim_paths().is_empty());
	}

	#[test]
	fn renames_move_managed_prims() {
		let scene = RetainedSceneIndex::new();
		scene.add_prims(&[entry("/A", "mesh"), entry("/A/B", "mesh")]);
		let observer = PrimManagingSceneIndexObserver::new(scene.clone(), Arc::new(MeshFactory));

		scene.rename_prims(&[RenamedPrimEntry::new(p("/A"), p("/Z"))]);
		assert_eq!(observer.prim_paths(), [p("/Z"), p("/Z/B")]);
	}
}
