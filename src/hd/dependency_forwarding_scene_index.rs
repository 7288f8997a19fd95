use crate::hd::{
	self, AddedPrimEntry, DependenciesSchema, DirtiedPrimEntry, RemovedPrimEntry, SceneIndex,
	SceneIndexBase, SceneIndexHandle, SceneIndexPrim, SingleInputFilteringSceneIndex,
	SingleInputFilteringSceneIndexBase,
};
use crate::{sdf, tf};
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Dependency {
	depending_prim_path: sdf::Path,
	name: tf::Token,
	depended_on_locator: hd::DataSourceLocator,
	affected_locator: hd::DataSourceLocator,
}

/// Turns the `__dependencies` prims declare into dirty notices.
///
/// A prim's dependencies are read the first time the prim is pulled through this scene index.
/// From then on, a dirty notice intersecting a depended-on locator also dirties the affected
/// locator of the depending prim, transitively.
pub struct DependencyForwardingSceneIndex {
	base: SingleInputFilteringSceneIndexBase,
	/// Depended-on prim path to the dependencies on it.
	dependents: DashMap<sdf::Path, Vec<Dependency>>,
	/// Depending prim path to the prims it depends on.
	depended_on: DashMap<sdf::Path, Vec<sdf::Path>>,
}

impl DependencyForwardingSceneIndex {
	pub fn new(input: SceneIndexHandle) -> Arc<Self> {
		let scene_index = Arc::new(Self {
			base: SingleInputFilteringSceneIndexBase::new(input),
			dependents: DashMap::new(),
			depended_on: DashMap::new(),
		});
		hd::connect_filter(&scene_index);
		scene_index
	}

	/// Number of prims whose dependencies have been read.
	pub fn tracked_prim_count(&self) -> usize {
		self.depended_on.len()
	}

	fn track(&self, prim_path: &sdf::Path, prim: &SceneIndexPrim) {
		if self.depended_on.contains_key(prim_path) {
			return;
		}
		self.read_dependencies(prim_path, prim);
	}

	fn read_dependencies(&self, prim_path: &sdf::Path, prim: &SceneIndexPrim) {
		let mut on_paths = Vec::new();
		for (name, dependency) in DependenciesSchema::get_from_parent(prim.data_source.as_ref()).entries()
		{
			let on_path = dependency
				.depended_on_prim_path()
				.filter(|path| !path.is_empty())
				.unwrap_or(*prim_path);
			let record = Dependency {
				depending_prim_path: *prim_path,
				name,
				depended_on_locator: dependency
					.depended_on_data_source_locator()
					.unwrap_or_else(hd::DataSourceLocator::empty_locator),
				affected_locator: dependency
					.affected_data_source_locator()
					.unwrap_or_else(hd::DataSourceLocator::empty_locator),
			};
			self.dependents.entry(on_path).or_default().push(record);
			if !on_paths.contains(&on_path) {
				on_paths.push(on_path);
			}
		}
		tracing::trace!(path = %prim_path, count = on_paths.len(), "dependencies read");
		self.depended_on.insert(*prim_path, on_paths);
	}

	fn forget(&self, prim_path: &sdf::Path) {
		let Some((_, on_paths)) = self.depended_on.remove(prim_path) else {
			return;
		};
		for on_path in on_paths {
			if let Some(mut dependencies) = self.dependents.get_mut(&on_path) {
				dependencies.retain(|d| d.depending_prim_path != *prim_path);
			}
		}
		self.dependents.retain(|_, dependencies| !dependencies.is_empty());
	}

	fn refresh(&self, prim_path: &sdf::Path) {
		self.forget(prim_path);
		let prim = self.input_scene_index().prim(prim_path);
		self.read_dependencies(prim_path, &prim);
	}

	/// Adds to `dirtied` everything that depends, directly or not, on the data in `seeds`.
	fn forward_dirtiness(
		&self,
		seeds: Vec<(sdf::Path, hd::DataSourceLocatorSet)>,
		dirtied: &mut Vec<DirtiedPrimEntry>,
	) {
		let dependencies_locator = DependenciesSchema::default_locator();
		let mut visited: HashSet<(sdf::Path, tf::Token)> = HashSet::new();
		let mut queue: VecDeque<_> = seeds.into();

		while let Some((prim_path, dirty_locators)) = queue.pop_front() {
			if dirty_locators.intersects(&dependencies_locator)
				&& self.depended_on.contains_key(&prim_path)
			{
				self.refresh(&prim_path);
			}

			let Some(dependencies) = self.dependents.get(&prim_path).map(|d| d.value().clone())
			else {
				continue;
			};
			for dependency in dependencies {
				if !dirty_locators.intersects(&dependency.depended_on_locator) {
					continue;
				}
				if !visited.insert((dependency.depending_prim_path, dependency.name.clone())) {
					continue;
				}
				let affected = hd::DataSourceLocatorSet::from(dependency.affected_locator);
				dirtied.push(DirtiedPrimEntry::new(dependency.depending_prim_path, affected.clone()));
				queue.push_back((dependency.depending_prim_path, affected));
			}
		}
	}

	/// Dirties every prim with a dependency on a prim at or below one of `roots`.
	fn dirty_dependents_of_subtrees(&self, roots: &[sdf::Path], dirtied: &mut Vec<DirtiedPrimEntry>) {
		let seeds: Vec<_> = self
			.dependents
			.iter()
			.filter(|entry| roots.iter().any(|root| entry.key().has_prefix(root)))
			.map(|entry| (*entry.key(), hd::DataSourceLocatorSet::universal()))
			.collect();
		self.forward_dirtiness(seeds, dirtied);
	}
}

impl SceneIndex for DependencyForwardingSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		let prim = self.input_scene_index().prim(prim_path);
		if prim.data_source.is_some() {
			self.track(prim_path, &prim);
		}
		prim
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

impl SingleInputFilteringSceneIndex for DependencyForwardingSceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		for entry in entries {
			if self.depended_on.contains_key(&entry.prim_path) {
				self.refresh(&entry.prim_path);
			}
		}

		let mut dirtied = Vec::new();
		let seeds = entries
			.iter()
			.map(|entry| (entry.prim_path, hd::DataSourceLocatorSet::universal()))
			.collect();
		self.forward_dirtiness(seeds, &mut dirtied);

		self.send_prims_added(entries);
		self.send_prims_dirtied(&dirtied);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		let roots: Vec<sdf::Path> = entries.iter().map(|entry| entry.prim_path).collect();

		let removed: Vec<sdf::Path> = self
			.depended_on
			.iter()
			.filter(|entry| roots.iter().any(|root| entry.key().has_prefix(root)))
			.map(|entry| *entry.key())
			.collect();
		for prim_path in &removed {
			self.forget(prim_path);
		}

		let mut dirtied = Vec::new();
		self.dirty_dependents_of_subtrees(&roots, &mut dirtied);

		self.send_prims_removed(entries);
		self.send_prims_dirtied(&dirtied);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		let mut dirtied = entries.to_vec();
		let seeds = entries
			.iter()
			.map(|entry| (entry.prim_path, entry.dirty_locators.clone()))
			.collect();
		self.forward_dirtiness(seeds, &mut dirtied);
		self.send_prims_dirtied(&dirtied);
	}
}
