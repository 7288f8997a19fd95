//! Helpers for testing scene index pipelines.

use crate::hd::{
	AddedPrimEntry, DirtiedPrimEntry, RemovedPrimEntry, RenamedPrimEntry, SceneIndex,
	SceneIndexObserver,
};
use crate::sdf;
use parking_lot::Mutex;
use std::sync::Arc;

/// One received notice, with its entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
	Added(Vec<AddedPrimEntry>),
	Removed(Vec<RemovedPrimEntry>),
	Dirtied(Vec<DirtiedPrimEntry>),
	Renamed(Vec<RenamedPrimEntry>),
}

/// An observer that records every notice it receives, in order.
#[derive(Default)]
pub struct RecordingObserver {
	notices: Mutex<Vec<Notice>>,
}

impl RecordingObserver {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn notices(&self) -> Vec<Notice> {
		self.notices.lock().clone()
	}

	pub fn clear(&self) {
		self.notices.lock().clear();
	}

	pub fn added_entries(&self) -> Vec<AddedPrimEntry> {
		self.notices
			.lock()
			.iter()
			.filter_map(|notice| match notice {
				Notice::Added(entries) => Some(entries.clone()),
				_ => None,
			})
			.flatten()
			.collect()
	}

	pub fn removed_paths(&self) -> Vec<sdf::Path> {
		self.notices
			.lock()
			.iter()
			.filter_map(|notice| match notice {
				Notice::Removed(entries) => Some(entries.iter().map(|e| e.prim_path)),
				_ => None,
			})
			.flatten()
			.collect()
	}

	pub fn dirtied_entries(&self) -> Vec<DirtiedPrimEntry> {
		self.notices
			.lock()
			.iter()
			.filter_map(|notice| match notice {
				Notice::Dirtied(entries) => Some(entries.clone()),
				_ => None,
			})
			.flatten()
			.collect()
	}
}

impl SceneIndexObserver for RecordingObserver {
	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		self.notices.lock().push(Notice::Added(entries.to_vec()));
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		self.notices.lock().push(Notice::Removed(entries.to_vec()));
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		self.notices.lock().push(Notice::Dirtied(entries.to_vec()));
	}

	fn prims_renamed(&self, _sender: &dyn SceneIndex, entries: &[RenamedPrimEntry]) {
		self.notices.lock().push(Notice::Renamed(entries.to_vec()));
	}
}
