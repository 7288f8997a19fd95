use crate::hd::{
	self, AddedPrimEntry, ContainerDataSource, ContainerDataSourceHandle, DataSource,
	DirtiedPrimEntry, FlattenedDataSourceContext, FlattenedDataSourceProvider,
	FlattenedPrimvarsDataSourceProvider, PRIMVARS_SCHEMA_TOKENS, RemovedPrimEntry, SceneIndex,
	SceneIndexBase, SceneIndexHandle, SceneIndexPrim, SingleInputFilteringSceneIndex,
	SingleInputFilteringSceneIndexBase,
};
use crate::{sdf, tf};
use dashmap::DashMap;
use std::sync::{Arc, Weak};

pub type FlattenedDataSourceProviderHandle = Arc<dyn FlattenedDataSourceProvider>;

/// Serves prims whose top-level containers named by its providers are flattened over
/// namespace.
///
/// Flattened prim data sources are cached per path. Dirty notices invalidate the cached data
/// in place and are extended to cached descendants whose flattened data inherits from the
/// dirtied prim.
pub struct FlatteningSceneIndex {
	base: SingleInputFilteringSceneIndexBase,
	providers: Vec<(tf::Token, FlattenedDataSourceProviderHandle)>,
	provider_locators: hd::DataSourceLocatorSet,
	prims: DashMap<sdf::Path, Arc<FlatteningPrimDataSource>>,
	this: Weak<FlatteningSceneIndex>,
}

impl FlatteningSceneIndex {
	pub fn new<I>(input: SceneIndexHandle, providers: I) -> Arc<Self>
	where
		I: IntoIterator<Item = (tf::Token, FlattenedDataSourceProviderHandle)>,
	{
		let providers: Vec<_> = providers.into_iter().collect();
		let provider_locators = providers
			.iter()
			.map(|(name, _)| hd::DataSourceLocator::from(name))
			.collect();
		let scene_index = Arc::new_cyclic(|this| Self {
			base: SingleInputFilteringSceneIndexBase::new(input),
			providers,
			provider_locators,
			prims: DashMap::new(),
			this: this.clone(),
		});
		hd::connect_filter(&scene_index);
		scene_index
	}

	/// A flattening scene index with only the `primvars` provider.
	pub fn with_primvars(input: SceneIndexHandle) -> Arc<Self> {
		Self::new(
			input,
			[(
				PRIMVARS_SCHEMA_TOKENS.primvars.clone(),
				Arc::new(FlattenedPrimvarsDataSourceProvider) as FlattenedDataSourceProviderHandle,
			)],
		)
	}

	pub fn provider_names(&self) -> Vec<tf::Token> {
		self.providers.iter().map(|(name, _)| name.clone()).collect()
	}

	fn provider(&self, name: &tf::Token) -> Option<&FlattenedDataSourceProviderHandle> {
		self.providers
			.iter()
			.find(|(provider_name, _)| provider_name == name)
			.map(|(_, provider)| provider)
	}

	fn prim_data_source(&self, prim_path: &sdf::Path) -> Option<ContainerDataSourceHandle> {
		self.prim(prim_path).data_source
	}

	/// Rewrites locators dirtied on a prim to those dirtied on its descendants, or returns
	/// an empty set when descendants are unaffected.
	fn descendant_dirty_locators(
		&self,
		dirty_locators: &hd::DataSourceLocatorSet,
	) -> hd::DataSourceLocatorSet {
		let mut result = hd::DataSourceLocatorSet::new();
		for (name, provider) in &self.providers {
			let name_locator = hd::DataSourceLocator::from(name);
			let mut relative = hd::DataSourceLocatorSet::new();
			for locator in dirty_locators.intersection(&name_locator) {
				if locator.element_count() <= 1 {
					relative = hd::DataSourceLocatorSet::universal();
					break;
				}
				relative.insert(locator.remove_first_element());
			}
			if relative.is_empty() {
				continue;
			}

			provider.compute_dirty_locators_for_descendants(&mut relative);
			for locator in &relative {
				result.insert(locator.prepend(name));
			}
		}
		result
	}

	fn dirty_cached_descendants(
		&self,
		root: &sdf::Path,
		dirty_locators: &hd::DataSourceLocatorSet,
		additional_dirtied: &mut Vec<DirtiedPrimEntry>,
	) {
		if dirty_locators.is_empty() {
			return;
		}

		let mut descendants: Vec<(sdf::Path, Arc<FlatteningPrimDataSource>)> = self
			.prims
			.iter()
			.filter(|entry| entry.key() != root && entry.key().has_prefix(root))
			.map(|entry| (*entry.key(), entry.value().clone()))
			.collect();
		descendants.sort_by(|(a, _), (b, _)| a.cmp(b));

		for (path, prim) in descendants {
			prim.invalidate(self, dirty_locators);
			additional_dirtied.push(DirtiedPrimEntry::new(path, dirty_locators.clone()));
		}
	}
}

impl SceneIndex for FlatteningSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		if let Some(cached) = self.prims.get(prim_path).map(|e| e.value().clone()) {
			return cached.scene_index_prim();
		}

		let input_prim = self.input_scene_index().prim(prim_path);
		let Some(input_data_source) = input_prim.data_source.clone() else {
			return input_prim;
		};

		let prim = Arc::new(FlatteningPrimDataSource {
			prim_path: *prim_path,
			prim_type: input_prim.prim_type,
			input: input_data_source,
			scene_index: self.this.clone(),
			flattened: DashMap::new(),
		});
		self.prims
			.entry(*prim_path)
			.or_insert(prim)
			.value()
			.clone()
			.scene_index_prim()
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

impl SingleInputFilteringSceneIndex for FlatteningSceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		let mut dirtied = Vec::new();
		for entry in entries {
			self.prims.remove(&entry.prim_path);
			self.dirty_cached_descendants(&entry.prim_path, &self.provider_locators, &mut dirtied);
		}
		self.send_prims_added(entries);
		self.send_prims_dirtied(&dirtied);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		for entry in entries {
			if entry.prim_path.is_absolute_root() {
				self.prims.clear();
			} else {
				self.prims.retain(|path, _| !path.has_prefix(&entry.prim_path));
			}
		}
		self.send_prims_removed(entries);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		let mut dirtied = entries.to_vec();
		for entry in entries {
			if !entry.dirty_locators.intersects_set(&self.provider_locators) {
				continue;
			}

			if let Some(prim) = self.prims.get(&entry.prim_path).map(|e| e.value().clone()) {
				prim.invalidate(self, &entry.dirty_locators);
			}

			let descendant_locators = self.descendant_dirty_locators(&entry.dirty_locators);
			self.dirty_cached_descendants(&entry.prim_path, &descendant_locators, &mut dirtied);
		}
		self.send_prims_dirtied(&dirtied);
	}
}

struct FlatteningPrimDataSource {
	prim_path: sdf::Path,
	prim_type: tf::Token,
	input: ContainerDataSourceHandle,
	scene_index: Weak<FlatteningSceneIndex>,
	flattened: DashMap<tf::Token, Option<ContainerDataSourceHandle>>,
}

impl FlatteningPrimDataSource {
	fn scene_index_prim(self: &Arc<Self>) -> SceneIndexPrim {
		SceneIndexPrim::new(self.prim_type.clone(), Some(self.clone()))
	}

	fn flattened(
		&self,
		scene_index: &FlatteningSceneIndex,
		name: &tf::Token,
		provider: &FlattenedDataSourceProviderHandle,
	) -> Option<ContainerDataSourceHandle> {
		if let Some(memo) = self.flattened.get(name) {
			return memo.value().clone();
		}

		let flattened_parent_data_source = if self.prim_path.is_prim_path() {
			scene_index
				.prim_data_source(&self.prim_path.parent_path())
				.and_then(|parent| parent.get(name))
				.and_then(DataSource::into_container)
		} else {
			None
		};

		let computed = provider.flattened_data_source(&FlattenedDataSourceContext {
			prim_path: &self.prim_path,
			name,
			input_data_source: self.input.get(name).and_then(DataSource::into_container),
			flattened_parent_data_source,
		});
		self.flattened.insert(name.clone(), computed.clone());
		computed
	}

	/// Discards flattened data touched by `dirty_locators`, invalidating memoizing data
	/// sources in place where only part of them is dirty.
	fn invalidate(&self, scene_index: &FlatteningSceneIndex, dirty_locators: &hd::DataSourceLocatorSet) {
		for (name, _) in &scene_index.providers {
			let name_locator = hd::DataSourceLocator::from(name);
			let mut relative = hd::DataSourceLocatorSet::new();
			let mut whole = false;
			for locator in dirty_locators.intersection(&name_locator) {
				if locator.element_count() <= 1 {
					whole = true;
					break;
				}
				relative.insert(locator.remove_first_element());
			}

			if whole {
				self.flattened.remove(name);
				continue;
			}
			if relative.is_empty() {
				continue;
			}

			let memo = self.flattened.get(name).map(|e| e.value().clone());
			match memo {
				Some(Some(data_source)) => {
					if let Some(invalidatable) = data_source.as_invalidatable() {
						invalidatable.invalidate(&relative);
					} else {
						self.flattened.remove(name);
					}
				}
				Some(None) => {
					self.flattened.remove(name);
				}
				None => {}
			}
		}
	}
}

impl ContainerDataSource for FlatteningPrimDataSource {
	fn names(&self) -> Vec<tf::Token> {
		let mut names = self.input.names();
		if let Some(scene_index) = self.scene_index.upgrade() {
			for name in scene_index.provider_names() {
				if !names.contains(&name) {
					names.push(name);
				}
			}
		}
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		if let Some(scene_index) = self.scene_index.upgrade()
			&& let Some(provider) = scene_index.provider(name)
		{
			return self
				.flattened(&scene_index, name, provider)
				.map(DataSource::Container);
		}
		self.input.get(name)
	}
}
