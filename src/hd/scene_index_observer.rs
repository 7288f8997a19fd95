use crate::hd::{self, SceneIndex};
use crate::{sdf, tf};
use std::sync::Arc;

/// A prim was added, or its type or data source was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedPrimEntry {
	pub prim_path: sdf::Path,
	pub prim_type: tf::Token,
}

impl AddedPrimEntry {
	pub fn new(prim_path: sdf::Path, prim_type: tf::Token) -> Self {
		Self {
			prim_path,
			prim_type,
		}
	}
}

/// A prim and all of its descendants were removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPrimEntry {
	pub prim_path: sdf::Path,
}

impl RemovedPrimEntry {
	pub fn new(prim_path: sdf::Path) -> Self {
		Self { prim_path }
	}
}

/// Data at `dirty_locators` of a prim changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtiedPrimEntry {
	pub prim_path: sdf::Path,
	pub dirty_locators: hd::DataSourceLocatorSet,
}

impl DirtiedPrimEntry {
	pub fn new(prim_path: sdf::Path, dirty_locators: hd::DataSourceLocatorSet) -> Self {
		Self {
			prim_path,
			dirty_locators,
		}
	}
}

/// A prim and its descendants moved to a new path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedPrimEntry {
	pub old_prim_path: sdf::Path,
	pub new_prim_path: sdf::Path,
}

impl RenamedPrimEntry {
	pub fn new(old_prim_path: sdf::Path, new_prim_path: sdf::Path) -> Self {
		Self {
			old_prim_path,
			new_prim_path,
		}
	}
}

/// Receives change notices from a scene index.
///
/// Notices are delivered synchronously on the thread that made the change. `sender` is the
/// scene index the observer registered with, already reflecting the change.
pub trait SceneIndexObserver: Send + Sync {
	fn prims_added(&self, sender: &dyn SceneIndex, entries: &[AddedPrimEntry]);

	fn prims_removed(&self, sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]);

	fn prims_dirtied(&self, sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]);

	/// Observers without special handling for renames can forward to
	/// [`convert_prims_renamed_to_removed_and_added`].
	fn prims_renamed(&self, sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]);
}

pub type SceneIndexObserverHandle = Arc<dyn SceneIndexObserver>;

/// Expresses renames as a removal of each old path followed by additions of the new subtree.
///
/// The new subtree is read back from `sender`, so this must run after the rename has been
/// applied. Added entries are in depth-first pre-order.
pub fn convert_prims_renamed_to_removed_and_added(
	sender: &dyn SceneIndex,
	renamed_entries: &[RenamedPrimEntry],
	removed_entries: &mut Vec<RemovedPrimEntry>,
	added_entries: &mut Vec<AddedPrimEntry>,
) {
	for entry in renamed_entries {
		if entry.old_prim_path.is_empty() || entry.new_prim_path.is_empty() {
			tf::coding_error!(
				"Rename from <{}> to <{}> involves an empty path",
				entry.old_prim_path,
				entry.new_prim_path
			);
			continue;
		}

		removed_entries.push(RemovedPrimEntry::new(entry.old_prim_path));
		added_entries.extend(
			hd::SceneIndexPrimView::new(sender, &entry.new_prim_path).map(|path| {
				AddedPrimEntry::new(path, sender.prim(&path).prim_type)
			}),
		);
	}
}
