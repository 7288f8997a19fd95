use crate::hd::{
	self, AddedPrimEntry, ContainerDataSourceHandle, DirtiedPrimEntry, RemovedPrimEntry,
	RenamedPrimEntry, SceneIndexObserver, SceneIndexObserverHandle,
};
use crate::{sdf, tf};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// A prim as seen through a scene index.
///
/// A path the scene index does not know yields an empty type and no data source.
#[derive(Clone, Default)]
pub struct SceneIndexPrim {
	pub prim_type: tf::Token,
	pub data_source: Option<ContainerDataSourceHandle>,
}

impl SceneIndexPrim {
	pub fn new(prim_type: tf::Token, data_source: Option<ContainerDataSourceHandle>) -> Self {
		Self {
			prim_type,
			data_source,
		}
	}

	pub fn is_defined(&self) -> bool {
		self.data_source.is_some()
	}
}

impl std::fmt::Debug for SceneIndexPrim {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("SceneIndexPrim")
			.field("prim_type", &self.prim_type)
			.field(
				"data_source",
				&self.data_source.as_ref().map(|ds| ds.names()),
			)
			.finish()
	}
}

/// A queryable, observable scene namespace.
///
/// `prim` and `child_prim_paths` must be safe to call from several threads at once, but not
/// concurrently with the scene index sending notices.
pub trait SceneIndex: Send + Sync {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim;

	fn child_prim_paths(&self, prim_path: &sdf::Path) -> Vec<sdf::Path>;

	/// Observer bookkeeping shared by every scene index.
	fn base(&self) -> &SceneIndexBase;

	/// Scene indices this one reads from.
	fn input_scene_indices(&self) -> Vec<SceneIndexHandle> {
		Vec::new()
	}

	/// Called by [`SceneIndex::system_message`] after the inputs have handled the message.
	fn on_system_message(
		&self,
		_message_type: &tf::Token,
		_args: Option<&ContainerDataSourceHandle>,
	) {
	}

	/// Delivers a message to every scene index upstream of this one, inputs first.
	fn system_message(&self, message_type: &tf::Token, args: Option<&ContainerDataSourceHandle>) {
		for input in self.input_scene_indices() {
			input.system_message(message_type, args);
		}
		self.on_system_message(message_type, args);
	}

	fn add_observer(&self, observer: &SceneIndexObserverHandle) {
		self.base().add_observer(observer);
	}

	fn remove_observer(&self, observer: &SceneIndexObserverHandle) {
		self.base().remove_observer(observer);
	}

	/// A name for debugging. Defaults to the implementing type's name.
	fn display_name(&self) -> String {
		self.base()
			.display_name()
			.unwrap_or_else(|| short_type_name(std::any::type_name::<Self>()).to_string())
	}

	fn set_display_name(&self, name: &str) {
		self.base().set_display_name(name);
	}

	fn add_tag(&self, tag: &tf::Token) {
		self.base().add_tag(tag);
	}

	fn remove_tag(&self, tag: &tf::Token) {
		self.base().remove_tag(tag);
	}

	fn has_tag(&self, tag: &tf::Token) -> bool {
		self.base().has_tag(tag)
	}

	fn tags(&self) -> Vec<tf::Token> {
		self.base().tags()
	}

	fn send_prims_added(&self, entries: &[AddedPrimEntry])
	where
		Self: Sized,
	{
		self.base().send_prims_added(self, entries);
	}

	fn send_prims_removed(&self, entries: &[RemovedPrimEntry])
	where
		Self: Sized,
	{
		self.base().send_prims_removed(self, entries);
	}

	fn send_prims_dirtied(&self, entries: &[DirtiedPrimEntry])
	where
		Self: Sized,
	{
		self.base().send_prims_dirtied(self, entries);
	}

	fn send_prims_renamed(&self, entries: &[RenamedPrimEntry])
	where
		Self: Sized,
	{
		self.base().send_prims_renamed(self, entries);
	}
}

pub type SceneIndexHandle = Arc<dyn SceneIndex>;

fn short_type_name(name: &str) -> &str {
	let name = name.split('<').next().unwrap_or(name);
	name.rsplit("::").next().unwrap_or(name)
}

/// Observer registry and notice dispatch.
///
/// Observers are held weakly. An observer that has been dropped is skipped and removed the
/// next time no notice is in flight. Observers may add or remove observers, or trigger
/// nested notices, from inside a callback.
#[derive(Default)]
pub struct SceneIndexBase {
	observers: Mutex<Vec<Option<Weak<dyn SceneIndexObserver>>>>,
	notify_depth: AtomicUsize,
	needs_sweep: AtomicBool,
	display_name: RwLock<Option<String>>,
	tags: RwLock<Vec<tf::Token>>,
}

impl SceneIndexBase {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `observer`. Registering the same observer twice is a no-op.
	pub fn add_observer(&self, observer: &SceneIndexObserverHandle) {
		let weak = Arc::downgrade(observer);
		let mut observers = self.observers.lock();
		if observers
			.iter()
			.flatten()
			.any(|existing| Weak::ptr_eq(existing, &weak))
		{
			return;
		}
		observers.push(Some(weak));
	}

	pub fn remove_observer(&self, observer: &SceneIndexObserverHandle) {
		let weak = Arc::downgrade(observer);
		let mut observers = self.observers.lock();
		let Some(index) = observers
			.iter()
			.position(|entry| entry.as_ref().is_some_and(|w| Weak::ptr_eq(w, &weak)))
		else {
			return;
		};

		if self.notify_depth.load(Ordering::Acquire) > 0 {
			// Indices of observers still being notified must stay stable.
			observers[index] = None;
			self.needs_sweep.store(true, Ordering::Release);
		} else {
			observers.remove(index);
		}
	}

	/// True if at least one live observer is registered.
	pub fn is_observed(&self) -> bool {
		self.observers
			.lock()
			.iter()
			.flatten()
			.any(|observer| observer.strong_count() > 0)
	}

	pub fn observer_count(&self) -> usize {
		self.observers
			.lock()
			.iter()
			.flatten()
			.filter(|observer| observer.strong_count() > 0)
			.count()
	}

	pub fn send_prims_added(&self, sender: &dyn hd::SceneIndex, entries: &[AddedPrimEntry]) {
		if entries.is_empty() {
			return;
		}
		tracing::trace!(sender = %sender.display_name(), count = entries.len(), "prims added");
		self.notify(|observer| observer.prims_added(sender, entries));
	}

	pub fn send_prims_removed(&self, sender: &dyn hd::SceneIndex, entries: &[RemovedPrimEntry]) {
		if entries.is_empty() {
			return;
		}
		tracing::trace!(sender = %sender.display_name(), count = entries.len(), "prims removed");
		self.notify(|observer| observer.prims_removed(sender, entries));
	}

	pub fn send_prims_dirtied(&self, sender: &dyn hd::SceneIndex, entries: &[DirtiedPrimEntry]) {
		if entries.is_empty() {
			return;
		}
		tracing::trace!(sender = %sender.display_name(), count = entries.len(), "prims dirtied");
		self.notify(|observer| observer.prims_dirtied(sender, entries));
	}

	pub fn send_prims_renamed(&self, sender: &dyn hd::SceneIndex, entries: &[RenamedPrimEntry]) {
		if entries.is_empty() {
			return;
		}
		tracing::trace!(sender = %sender.display_name(), count = entries.len(), "prims renamed");
		self.notify(|observer| observer.prims_renamed(sender, entries));
	}

	fn notify(&self, mut deliver: impl FnMut(&dyn SceneIndexObserver)) {
		self.notify_depth.fetch_add(1, Ordering::AcqRel);

		// The lock is released while an observer runs so that it may call back into us.
		let mut index = 0;
		loop {
			let entry = {
				let observers = self.observers.lock();
				match observers.get(index) {
					Some(entry) => entry.clone(),
					None => break,
				}
			};
			index += 1;

			match entry.as_ref().map(Weak::upgrade) {
				Some(Some(observer)) => deliver(observer.as_ref()),
				Some(None) => self.needs_sweep.store(true, Ordering::Release),
				None => {}
			}
		}

		if self.notify_depth.fetch_sub(1, Ordering::AcqRel) == 1
			&& self.needs_sweep.swap(false, Ordering::AcqRel)
		{
			self.observers
				.lock()
				.retain(|entry| entry.as_ref().is_some_and(|w| w.strong_count() > 0));
		}
	}

	pub fn display_name(&self) -> Option<String> {
		self.display_name.read().clone()
	}

	pub fn set_display_name(&self, name: &str) {
		*self.display_name.write() = Some(name.to_string());
	}

	pub fn add_tag(&self, tag: &tf::Token) {
		let mut tags = self.tags.write();
		if !tags.contains(tag) {
			tags.push(tag.clone());
		}
	}

	pub fn remove_tag(&self, tag: &tf::Token) {
		self.tags.write().retain(|t| t != tag);
	}

	pub fn has_tag(&self, tag: &tf::Token) -> bool {
		self.tags.read().contains(tag)
	}

	pub fn tags(&self) -> Vec<tf::Token> {
		self.tags.read().clone()
	}
}

/// Depth-first, pre-order walk of the prims at and below a root path.
///
/// Children are visited in the order the scene index reports them.
pub struct SceneIndexPrimView<'a> {
	scene_index: &'a dyn SceneIndex,
	stack: Vec<sdf::Path>,
}

impl<'a> SceneIndexPrimView<'a> {
	pub fn new(scene_index: &'a dyn SceneIndex, root: &sdf::Path) -> Self {
		Self {
			scene_index,
			stack: vec![*root],
		}
	}
}

impl Iterator for SceneIndexPrimView<'_> {
	type Item = sdf::Path;

	fn next(&mut self) -> Option<sdf::Path> {
		let path = self.stack.pop()?;
		let children = self.scene_index.child_prim_paths(&path);
		self.stack.extend(children.into_iter().rev());
		Some(path)
	}
}
