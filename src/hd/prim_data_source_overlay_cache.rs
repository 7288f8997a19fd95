use crate::hd::{
	self, AddedPrimEntry, ContainerDataSource, ContainerDataSourceHandle, DataSource,
	DirtiedPrimEntry, RemovedPrimEntry, SceneIndex, SceneIndexBase, SceneIndexHandle,
	SceneIndexPrim, SingleInputFilteringSceneIndex, SingleInputFilteringSceneIndexBase,
};
use crate::{sdf, tf};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

/// What an overlay attribute is computed from.
#[derive(Debug, Clone, Default)]
pub struct OverlayDependencies {
	/// Locators of the prim's own input data.
	pub on_prim: hd::DataSourceLocatorSet,
	/// Locators of the parent prim's overlaid data, which makes the overlay hierarchical.
	pub on_parent: hd::DataSourceLocatorSet,
	/// If false, the overlay exists only while at least one `on_prim` locator has data.
	pub dependencies_optional: bool,
}

/// Overlay attribute names with their dependencies.
pub type OverlayTopology = BTreeMap<tf::Token, OverlayDependencies>;

/// Computes overlay attributes for [`PrimDataSourceOverlayCache`].
pub trait OverlayDataSourceProvider: Send + Sync {
	/// `parent_overlay_data_source` is the parent's overlaid prim data source, passed only
	/// for overlays with parent dependencies.
	fn compute_overlay_data_source(
		&self,
		prim_path: &sdf::Path,
		name: &tf::Token,
		input_prim_data_source: Option<&ContainerDataSourceHandle>,
		parent_overlay_data_source: Option<&ContainerDataSourceHandle>,
	) -> Option<ContainerDataSourceHandle>;
}

/// Caches prim data sources of an input scene index with lazily computed overlay
/// attributes on top.
///
/// Overlay values are memoized per prim and attribute, and evicted exactly when a dirty
/// notice intersects their declared dependencies.
pub struct PrimDataSourceOverlayCache {
	input: SceneIndexHandle,
	topology: OverlayTopology,
	hierarchical: bool,
	provider: Arc<dyn OverlayDataSourceProvider>,
	cache: DashMap<sdf::Path, Arc<PrimDataSourceOverlay>>,
	this: Weak<PrimDataSourceOverlayCache>,
}

impl PrimDataSourceOverlayCache {
	pub fn new(
		input: SceneIndexHandle,
		topology: OverlayTopology,
		provider: Arc<dyn OverlayDataSourceProvider>,
	) -> Arc<Self> {
		let hierarchical = topology.values().any(|deps| !deps.on_parent.is_empty());
		Arc::new_cyclic(|this| Self {
			input,
			topology,
			hierarchical,
			provider,
			cache: DashMap::new(),
			this: this.clone(),
		})
	}

	pub fn is_hierarchical(&self) -> bool {
		self.hierarchical
	}

	pub fn cached_prim_count(&self) -> usize {
		self.cache.len()
	}

	pub fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		let cached = self.cache.get(prim_path).map(|entry| entry.value().clone());
		if let Some(overlay) = cached {
			return overlay.scene_index_prim();
		}

		let input_prim = self.input.prim(prim_path);
		if input_prim.data_source.is_none() {
			return input_prim;
		}

		if self.hierarchical && prim_path.is_prim_path() {
			self.prim(&prim_path.parent_path());
		}

		let overlay = Arc::new(PrimDataSourceOverlay {
			prim_path: *prim_path,
			input: input_prim,
			cache: self.this.clone(),
			overlays: DashMap::new(),
			present_names: ArcSwapOption::empty(),
		});
		let overlay = self
			.cache
			.entry(*prim_path)
			.or_insert(overlay)
			.value()
			.clone();
		overlay.scene_index_prim()
	}

	/// Drops resynced prims. Overlays of cached descendants that depend on them are evicted
	/// and reported in `additional_dirtied`.
	pub fn handle_prims_added(
		&self,
		entries: &[AddedPrimEntry],
		additional_dirtied: &mut Vec<DirtiedPrimEntry>,
	) {
		for entry in entries {
			if self.cache.remove(&entry.prim_path).is_none() {
				continue;
			}
			tracing::debug!(path = %entry.prim_path, "resynced prim evicted from overlay cache");
			if self.hierarchical {
				self.dirty_descendants(
					entry.prim_path,
					hd::DataSourceLocatorSet::universal(),
					additional_dirtied,
				);
			}
		}
	}

	pub fn handle_prims_removed(&self, entries: &[RemovedPrimEntry]) {
		for entry in entries {
			if entry.prim_path.is_absolute_root() {
				self.cache.clear();
			} else {
				self.cache.retain(|path, _| !path.has_prefix(&entry.prim_path));
			}
		}
	}

	/// Evicts overlays depending on dirtied data. Overlays evicted beyond what `entries`
	/// already names are reported in `additional_dirtied`.
	pub fn handle_prims_dirtied(
		&self,
		entries: &[DirtiedPrimEntry],
		additional_dirtied: &mut Vec<DirtiedPrimEntry>,
	) {
		for entry in entries {
			let cached = self.cache.get(&entry.prim_path).map(|e| e.value().clone());
			let Some(overlay) = cached else {
				continue;
			};

			let evicted = overlay.prim_dirtied(&entry.dirty_locators, &self.topology);
			if !evicted.iter().all(|locator| entry.dirty_locators.contains(locator)) {
				additional_dirtied.push(DirtiedPrimEntry::new(entry.prim_path, evicted.clone()));
			}

			if self.hierarchical {
				let mut changed = entry.dirty_locators.clone();
				changed.insert_set(&evicted);
				self.dirty_descendants(entry.prim_path, changed, additional_dirtied);
			}
		}
	}

	fn dirty_descendants(
		&self,
		root: sdf::Path,
		root_dirty_locators: hd::DataSourceLocatorSet,
		additional_dirtied: &mut Vec<DirtiedPrimEntry>,
	) {
		let mut descendants: Vec<(sdf::Path, Arc<PrimDataSourceOverlay>)> = self
			.cache
			.iter()
			.filter(|entry| *entry.key() != root && entry.key().has_prefix(&root))
			.map(|entry| (*entry.key(), entry.value().clone()))
			.collect();
		descendants.sort_by_cached_key(|(path, _)| path.element_count());

		let mut dirtied: HashMap<sdf::Path, hd::DataSourceLocatorSet> = HashMap::new();
		dirtied.insert(root, root_dirty_locators);
		for (path, overlay) in descendants {
			let Some(parent_dirty_locators) = dirtied.get(&path.parent_path()) else {
				continue;
			};
			let evicted = overlay.parent_dirtied(parent_dirty_locators, &self.topology);
			if evicted.is_empty() {
				continue;
			}
			additional_dirtied.push(DirtiedPrimEntry::new(path, evicted.clone()));
			dirtied.insert(path, evicted);
		}
	}
}

struct PrimDataSourceOverlay {
	prim_path: sdf::Path,
	input: SceneIndexPrim,
	cache: Weak<PrimDataSourceOverlayCache>,
	overlays: DashMap<tf::Token, Option<ContainerDataSourceHandle>>,
	present_names: ArcSwapOption<Vec<tf::Token>>,
}

impl PrimDataSourceOverlay {
	fn scene_index_prim(self: &Arc<Self>) -> SceneIndexPrim {
		SceneIndexPrim::new(self.input.prim_type.clone(), Some(self.clone()))
	}

	fn input_data_source(&self) -> Option<ContainerDataSourceHandle> {
		self.input.data_source.clone()
	}

	fn present_overlay_names(&self, topology: &OverlayTopology) -> Arc<Vec<tf::Token>> {
		if let Some(names) = self.present_names.load_full() {
			return names;
		}

		let input = self.input_data_source();
		let names: Arc<Vec<tf::Token>> = Arc::new(
			topology
				.iter()
				.filter(|(_, deps)| {
					deps.dependencies_optional
						|| deps.on_prim.is_empty()
						|| deps
							.on_prim
							.iter()
							.any(|locator| hd::container_get_opt(input.as_ref(), locator).is_some())
				})
				.map(|(name, _)| name.clone())
				.collect(),
		);
		self.present_names.store(Some(names.clone()));
		names
	}

	fn overlay(
		&self,
		cache: &PrimDataSourceOverlayCache,
		name: &tf::Token,
		deps: &OverlayDependencies,
	) -> Option<ContainerDataSourceHandle> {
		if let Some(memo) = self.overlays.get(name) {
			return memo.value().clone();
		}

		let parent_overlay = if !deps.on_parent.is_empty() && self.prim_path.is_prim_path() {
			cache.prim(&self.prim_path.parent_path()).data_source
		} else {
			None
		};

		let computed = cache.provider.compute_overlay_data_source(
			&self.prim_path,
			name,
			self.input_data_source().as_ref(),
			parent_overlay.as_ref(),
		);
		self.overlays.insert(name.clone(), computed.clone());
		computed
	}

	fn prim_dirtied(
		&self,
		dirty_locators: &hd::DataSourceLocatorSet,
		topology: &OverlayTopology,
	) -> hd::DataSourceLocatorSet {
		let mut evicted = hd::DataSourceLocatorSet::new();
		let mut names_stale = false;
		for (name, deps) in topology {
			let name_locator = hd::DataSourceLocator::from(name);
			if dirty_locators.intersects_set(&deps.on_prim) || dirty_locators.intersects(&name_locator)
			{
				self.overlays.remove(name);
				evicted.insert(name_locator);
				names_stale |= !deps.dependencies_optional;
			}
		}
		if names_stale {
			self.present_names.store(None);
		}
		evicted
	}

	fn parent_dirtied(
		&self,
		parent_dirty_locators: &hd::DataSourceLocatorSet,
		topology: &OverlayTopology,
	) -> hd::DataSourceLocatorSet {
		let mut evicted = hd::DataSourceLocatorSet::new();
		for (name, deps) in topology {
			if parent_dirty_locators.intersects_set(&deps.on_parent) {
				self.overlays.remove(name);
				evicted.insert(hd::DataSourceLocator::from(name));
			}
		}
		evicted
	}
}

impl ContainerDataSource for PrimDataSourceOverlay {
	fn names(&self) -> Vec<tf::Token> {
		let mut names = self
			.input_data_source()
			.map(|input| input.names())
			.unwrap_or_default();
		if let Some(cache) = self.cache.upgrade() {
			for name in self.present_overlay_names(&cache.topology).iter() {
				if !names.contains(name) {
					names.push(name.clone());
				}
			}
		}
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		if let Some(cache) = self.cache.upgrade()
			&& let Some(deps) = cache.topology.get(name)
			&& self.present_overlay_names(&cache.topology).contains(name)
			&& let Some(overlay) = self.overlay(&cache, name, deps)
		{
			return Some(DataSource::Container(overlay));
		}
		self.input_data_source()?.get(name)
	}
}

/// A filtering scene index serving prims through a [`PrimDataSourceOverlayCache`].
pub struct PrimDataSourceOverlaySceneIndex {
	base: SingleInputFilteringSceneIndexBase,
	cache: Arc<PrimDataSourceOverlayCache>,
}

impl PrimDataSourceOverlaySceneIndex {
	pub fn new(
		input: SceneIndexHandle,
		topology: OverlayTopology,
		provider: Arc<dyn OverlayDataSourceProvider>,
	) -> Arc<Self> {
		let scene_index = Arc::new(Self {
			base: SingleInputFilteringSceneIndexBase::new(input.clone()),
			cache: PrimDataSourceOverlayCache::new(input, topology, provider),
		});
		hd::connect_filter(&scene_index);
		scene_index
	}

	pub fn cache(&self) -> &Arc<PrimDataSourceOverlayCache> {
		&self.cache
	}
}

impl SceneIndex for PrimDataSourceOverlaySceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		self.cache.prim(prim_path)
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

impl SingleInputFilteringSceneIndex for PrimDataSourceOverlaySceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		let mut dirtied = Vec::new();
		self.cache.handle_prims_added(entries, &mut dirtied);
		self.send_prims_added(entries);
		self.send_prims_dirtied(&dirtied);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		self.cache.handle_prims_removed(entries);
		self.send_prims_removed(entries);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		let mut dirtied = Vec::new();
		self.cache.handle_prims_dirtied(entries, &mut dirtied);
		if dirtied.is_empty() {
			self.send_prims_dirtied(entries);
		} else {
			let mut all = entries.to_vec();
			all.extend(dirtied);
			self.send_prims_dirtied(&all);
		}
	}
}
