use crate::hd::{
	AddedPrimEntry, ContainerDataSourceHandle, DirtiedPrimEntry, RemovedPrimEntry,
	RenamedPrimEntry, SceneIndex, SceneIndexBase, SceneIndexPrim,
};
use crate::{sdf, tf};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A prim to add to a [`RetainedSceneIndex`].
#[derive(Clone)]
pub struct RetainedAddedPrimEntry {
	pub prim_path: sdf::Path,
	pub prim_type: tf::Token,
	pub data_source: Option<ContainerDataSourceHandle>,
}

impl RetainedAddedPrimEntry {
	pub fn new(
		prim_path: sdf::Path,
		prim_type: tf::Token,
		data_source: Option<ContainerDataSourceHandle>,
	) -> Self {
		Self {
			prim_path,
			prim_type,
			data_source,
		}
	}
}

#[derive(Default)]
struct Entry {
	prim: SceneIndexPrim,
	children: Vec<sdf::Path>,
}

/// A scene index holding prims in memory, populated by explicit calls.
///
/// Adding a prim below a path that is not present creates the missing ancestors as
/// untyped prims without data.
pub struct RetainedSceneIndex {
	base: SceneIndexBase,
	entries: RwLock<HashMap<sdf::Path, Entry>>,
}

impl RetainedSceneIndex {
	pub fn new() -> Arc<Self> {
		let mut entries = HashMap::new();
		entries.insert(sdf::Path::absolute_root_path(), Entry::default());
		Arc::new(Self {
			base: SceneIndexBase::new(),
			entries: RwLock::new(entries),
		})
	}

	/// Adds or replaces prims and sends a single added notice for them.
	pub fn add_prims(&self, prims: &[RetainedAddedPrimEntry]) {
		let mut added = Vec::with_capacity(prims.len());
		{
			let mut entries = self.entries.write();
			for prim in prims {
				if !prim.prim_path.is_absolute_path() {
					tf::coding_error!("Cannot add prim at non-absolute path <{}>", prim.prim_path);
					continue;
				}
				Self::ensure_entry(&mut entries, prim.prim_path).prim =
					SceneIndexPrim::new(prim.prim_type.clone(), prim.data_source.clone());
				added.push(AddedPrimEntry::new(prim.prim_path, prim.prim_type.clone()));
			}
		}
		self.send_prims_added(&added);
	}

	/// Removes the given prims with their descendants.
	pub fn remove_prims(&self, prims: &[RemovedPrimEntry]) {
		let mut removed = Vec::with_capacity(prims.len());
		{
			let mut entries = self.entries.write();
			for prim in prims {
				if prim.prim_path.is_absolute_root() {
					if let Some(root) = entries.get_mut(&prim.prim_path) {
						let children = std::mem::take(&mut root.children);
						root.prim = SceneIndexPrim::default();
						for child in children {
							Self::remove_subtree(&mut entries, child);
						}
					}
				} else if entries.contains_key(&prim.prim_path) {
					let parent = prim.prim_path.parent_path();
					if let Some(parent) = entries.get_mut(&parent) {
						parent.children.retain(|child| *child != prim.prim_path);
					}
					Self::remove_subtree(&mut entries, prim.prim_path);
				} else {
					continue;
				}
				removed.push(prim.clone());
			}
		}
		self.send_prims_removed(&removed);
	}

	/// Invalidates memoized data of the given prims and forwards the notice.
	pub fn dirty_prims(&self, prims: &[DirtiedPrimEntry]) {
		{
			let entries = self.entries.read();
			for prim in prims {
				let invalidatable = entries
					.get(&prim.prim_path)
					.and_then(|entry| entry.prim.data_source.as_ref());
				if let Some(data_source) = invalidatable
					&& let Some(invalidatable) = data_source.as_invalidatable()
				{
					invalidatable.invalidate(&prim.dirty_locators);
				}
			}
		}
		self.send_prims_dirtied(prims);
	}

	/// Moves subtrees to new paths.
	///
	/// A rename onto an existing prim replaces that prim's subtree.
	pub fn rename_prims(&self, prims: &[RenamedPrimEntry]) {
		let mut renamed = Vec::with_capacity(prims.len());
		{
			let mut entries = self.entries.write();
			for prim in prims {
				let (old, new) = (prim.old_prim_path, prim.new_prim_path);
				if !old.is_prim_path() || !new.is_absolute_path() || !new.is_prim_path() {
					tf::coding_error!("Cannot rename <{}> to <{}>", old, new);
					continue;
				}
				if new.has_prefix(&old) {
					tf::coding_error!("Cannot rename <{}> below itself to <{}>", old, new);
					continue;
				}
				if !entries.contains_key(&old) {
					continue;
				}

				let mut moved = Vec::new();
				Self::take_subtree(&mut entries, old, &mut moved);
				if let Some(parent) = entries.get_mut(&old.parent_path()) {
					parent.children.retain(|child| *child != old);
				}
				if entries.contains_key(&new) {
					if let Some(parent) = entries.get_mut(&new.parent_path()) {
						parent.children.retain(|child| *child != new);
					}
					Self::remove_subtree(&mut entries, new);
				}

				for (path, mut entry) in moved {
					let path = path.replace_prefix(&old, &new);
					for child in &mut entry.children {
						*child = child.replace_prefix(&old, &new);
					}
					entries.insert(path, entry);
				}
				let parent = new.parent_path();
				Self::ensure_entry(&mut entries, parent).children.push(new);
				renamed.push(prim.clone());
			}
		}
		self.send_prims_renamed(&renamed);
	}

	fn ensure_entry(entries: &mut HashMap<sdf::Path, Entry>, path: sdf::Path) -> &mut Entry {
		if !entries.contains_key(&path) {
			let parent = path.parent_path();
			if !parent.is_empty() {
				Self::ensure_entry(entries, parent).children.push(path);
			}
			entries.insert(path, Entry::default());
		}
		entries.entry(path).or_default()
	}

	fn remove_subtree(entries: &mut HashMap<sdf::Path, Entry>, path: sdf::Path) {
		let mut stack = vec![path];
		while let Some(path) = stack.pop() {
			if let Some(entry) = entries.remove(&path) {
				stack.extend(entry.children);
			}
		}
	}

	fn take_subtree(
		entries: &mut HashMap<sdf::Path, Entry>,
		path: sdf::Path,
		taken: &mut Vec<(sdf::Path, Entry)>,
	) {
		let mut stack = vec![path];
		while let Some(path) = stack.pop() {
			if let Some(entry) = entries.remove(&path) {
				stack.extend(entry.children.iter().copied());
				taken.push((path, entry));
			}
		}
	}
}

impl SceneIndex for RetainedSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		self.entries
			.read()
			.get(prim_path)
			.map(|entry| entry.prim.clone())
			.unwrap_or_default()
	}

	fn child_prim_paths(&self, prim_path: &sdf::Path) -> Vec<sdf::Path> {
		self.entries
			.read()
			.get(prim_path)
			.map(|entry| entry.children.clone())
			.unwrap_or_default()
	}

	fn base(&self) -> &SceneIndexBase {
		&self.base
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::testing::{Notice, RecordingObserver};
	use crate::hd::{self, RetainedContainerDataSource, SceneIndexObserverHandle};

	fn p(s: &str) -> sdf::Path {
		sdf::Path::from(s)
	}

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn observed() -> (Arc<RetainedSceneIndex>, Arc<RecordingObserver>) {
		let scene = RetainedSceneIndex::new();
		let observer = RecordingObserver::new();
		let handle: SceneIndexObserverHandle = observer.clone();
		scene.add_observer(&handle);
		(scene, observer)
	}

	#[test]
	fn add_creates_ancestors() {
		let (scene, observer) = observed();
		scene.add_prims(&[RetainedAddedPrimEntry::new(
			p("/A/B"),
			t("mesh"),
			Some(RetainedContainerDataSource::empty()),
		)]);

		assert_eq!(scene.child_prim_paths(&p("/")), [p("/A")]);
		assert_eq!(scene.child_prim_paths(&p("/A")), [p("/A/B")]);
		assert_eq!(scene.prim(&p("/A")).prim_type, tf::Token::empty());
		assert!(!scene.prim(&p("/A")).is_defined());
		assert_eq!(scene.prim(&p("/A/B")).prim_type, t("mesh"));
		assert_eq!(
			observer.notices(),
			[Notice::Added(vec![AddedPrimEntry::new(p("/A/B"), t("mesh"))])]
		);
	}

	#[test]
	fn re_adding_keeps_children() {
		let (scene, _) = observed();
		scene.add_prims(&[
			RetainedAddedPrimEntry::new(p("/A"), t("xform"), None),
			RetainedAddedPrimEntry::new(p("/A/B"), t("mesh"), None),
		]);
		scene.add_prims(&[RetainedAddedPrimEntry::new(p("/A"), t("scope"), None)]);
		assert_eq!(scene.prim(&p("/A")).prim_type, t("scope"));
		assert_eq!(scene.child_prim_paths(&p("/A")), [p("/A/B")]);
	}

	#[test]
	fn remove_is_hierarchical() {
		let (scene, observer) = observed();
		scene.add_prims(&[
			RetainedAddedPrimEntry::new(p("/A/B"), t("mesh"), None),
			RetainedAddedPrimEntry::new(p("/C"), t("mesh"), None),
		]);
		scene.remove_prims(&[
			RemovedPrimEntry::new(p("/A")),
			RemovedPrimEntry::new(p("/Missing")),
		]);

		assert!(scene.prim(&p("/A/B")).prim_type.is_empty());
		assert!(scene.child_prim_paths(&p("/A")).is_empty());
		assert_eq!(scene.child_prim_paths(&p("/")), [p("/C")]);
		assert_eq!(observer.removed_paths(), [p("/A")]);
	}

	#[test]
	fn remove_root_clears_everything() {
		let (scene, _) = observed();
		scene.add_prims(&[RetainedAddedPrimEntry::new(p("/A/B"), t("mesh"), None)]);
		scene.remove_prims(&[RemovedPrimEntry::new(p("/"))]);
		assert!(scene.child_prim_paths(&p("/")).is_empty());
		assert!(scene.prim(&p("/A")).prim_type.is_empty());
	}

	#[test]
	fn rename_moves_subtree() {
		let (scene, observer) = observed();
		scene.add_prims(&[
			RetainedAddedPrimEntry::new(p("/A"), t("xform"), None),
			RetainedAddedPrimEntry::new(p("/A/B"), t("mesh"), None),
		]);
		scene.rename_prims(&[RenamedPrimEntry::new(p("/A"), p("/X/Y"))]);

		assert_eq!(scene.child_prim_paths(&p("/")), [p("/X")]);
		assert_eq!(scene.child_prim_paths(&p("/X")), [p("/X/Y")]);
		assert_eq!(scene.child_prim_paths(&p("/X/Y")), [p("/X/Y/B")]);
		assert_eq!(scene.prim(&p("/X/Y/B")).prim_type, t("mesh"));
		assert!(scene.prim(&p("/A")).prim_type.is_empty());
		assert_eq!(
			observer.notices().last(),
			Some(&Notice::Renamed(vec![RenamedPrimEntry::new(
				p("/A"),
				p("/X/Y")
			)]))
		);
	}

	#[test]
	fn dirty_forwards_entries() {
		let (scene, observer) = observed();
		scene.add_prims(&[RetainedAddedPrimEntry::new(p("/A"), t("mesh"), None)]);
		let entry = DirtiedPrimEntry::new(
			p("/A"),
			hd::DataSourceLocatorSet::from(hd::DataSourceLocator::from("primvars")),
		);
		scene.dirty_prims(std::slice::from_ref(&entry));
		assert_eq!(observer.notices().last(), Some(&Notice::Dirtied(vec![entry])));
	}
}
