use crate::hd::{
	self, AddedPrimEntry, BasisCurvesSchema, ContainerDataSourceHandle, DirtiedPrimEntry,
	GeomSubsetsSchema, MeshSchema, RemovedPrimEntry, RetainedContainerDataSource, SceneIndex,
	SceneIndexBase, SceneIndexHandle, SceneIndexPrim, SingleInputFilteringSceneIndex,
	SingleInputFilteringSceneIndexBase, GEOMETRY_SCHEMA_TOKENS, PRIM_TYPE_TOKENS,
};
use crate::{sdf, tf};
use dashmap::DashMap;
use std::sync::{Arc, LazyLock};

static GEOM_SUBSETS_LOCATORS: LazyLock<hd::DataSourceLocatorSet> = LazyLock::new(|| {
	[
		MeshSchema::geom_subsets_locator(),
		BasisCurvesSchema::geom_subsets_locator(),
	]
	.into_iter()
	.collect()
});

fn geom_subsets(prim: &SceneIndexPrim) -> GeomSubsetsSchema {
	let data_source = prim.data_source.as_ref();
	if prim.prim_type == PRIM_TYPE_TOKENS.mesh {
		MeshSchema::get_from_parent(data_source).geom_subsets()
	} else if prim.prim_type == PRIM_TYPE_TOKENS.basis_curves {
		BasisCurvesSchema::get_from_parent(data_source).geom_subsets()
	} else {
		GeomSubsetsSchema::default()
	}
}

/// Exposes the `geomSubsets` of meshes and basis curves as child prims of type
/// `geomSubset`, each with a `geomSubset` container.
///
/// Subset names are cached per parent so that edits to a parent's subsets can be sent as
/// added, removed and dirtied subset prims.
pub struct LegacyGeomSubsetSceneIndex {
	base: SingleInputFilteringSceneIndexBase,
	subset_names: DashMap<sdf::Path, Vec<tf::Token>>,
}

impl LegacyGeomSubsetSceneIndex {
	pub fn new(input: SceneIndexHandle) -> Arc<Self> {
		let scene_index = Arc::new(Self {
			base: SingleInputFilteringSceneIndexBase::new(input),
			subset_names: DashMap::new(),
		});
		hd::connect_filter(&scene_index);
		scene_index
	}

	/// Subset names of `parent_path`, sorted. Names taken by a real child are skipped so the
	/// child stays visible.
	fn read_subset_names(&self, parent_path: &sdf::Path) -> Vec<tf::Token> {
		let input = self.input_scene_index();
		let prim = input.prim(parent_path);
		let mut names = geom_subsets(&prim).ids();
		if names.is_empty() {
			return names;
		}
		let children = input.child_prim_paths(parent_path);
		names.retain(|name| {
			let taken = children.contains(&parent_path.append_child(name));
			if taken {
				tf::warning!("Geom subset '{name}' of <{parent_path}> is hidden by a child prim");
			}
			!taken
		});
		names.sort();
		names
	}

	/// Only parents with subsets are cached.
	fn subset_names(&self, parent_path: &sdf::Path) -> Vec<tf::Token> {
		if let Some(names) = self.subset_names.get(parent_path) {
			return names.value().clone();
		}
		let names = self.read_subset_names(parent_path);
		if names.is_empty() {
			return names;
		}
		self.subset_names
			.entry(*parent_path)
			.or_insert(names)
			.value()
			.clone()
	}

	/// Re-reads the subsets of `parent_path`, returning the cached names from before.
	fn refresh_subset_names(&self, parent_path: &sdf::Path) -> (Vec<tf::Token>, Vec<tf::Token>) {
		let names = self.read_subset_names(parent_path);
		let previous = if names.is_empty() {
			self.subset_names.remove(parent_path).map(|(_, names)| names)
		} else {
			self.subset_names.insert(*parent_path, names.clone())
		};
		(previous.unwrap_or_default(), names)
	}

	fn subset_data_source(&self, prim_path: &sdf::Path) -> Option<ContainerDataSourceHandle> {
		let parent_path = prim_path.parent_path();
		let name = prim_path.name_token();
		if !self.subset_names(&parent_path).contains(&name) {
			return None;
		}
		let parent = self.input_scene_index().prim(&parent_path);
		geom_subsets(&parent).geom_subset(&name).container().cloned()
	}
}

impl SceneIndex for LegacyGeomSubsetSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		if prim_path.is_prim_path()
			&& !prim_path.is_absolute_root()
			&& let Some(subset) = self.subset_data_source(prim_path)
		{
			return SceneIndexPrim::new(
				PRIM_TYPE_TOKENS.geom_subset.clone(),
				Some(RetainedContainerDataSource::new([hd::prim_entry(
					&GEOMETRY_SCHEMA_TOKENS.geom_subset,
					subset,
				)])),
			);
		}
		self.input_scene_index().prim(prim_path)
	}

	fn child_prim_paths(&self, prim_path: &sdf::Path) -> Vec<sdf::Path> {
		let mut children = self.input_scene_index().child_prim_paths(prim_path);
		for name in self.subset_names(prim_path) {
			let child = prim_path.append_child(&name);
			if !children.contains(&child) {
				children.push(child);
			}
		}
		children
	}

	fn base(&self) -> &SceneIndexBase {
		self.base.base()
	}

	fn input_scene_indices(&self) -> Vec<SceneIndexHandle> {
		vec![self.input_scene_index().clone()]
	}
}

impl SingleInputFilteringSceneIndex for LegacyGeomSubsetSceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		let mut removed = Vec::new();
		let mut added = entries.to_vec();
		for entry in entries {
			let (previous, names) = self.refresh_subset_names(&entry.prim_path);
			removed.extend(
				previous
					.iter()
					.filter(|name| !names.contains(name))
					.map(|name| RemovedPrimEntry::new(entry.prim_path.append_child(name))),
			);
			added.extend(names.iter().map(|name| {
				AddedPrimEntry::new(
					entry.prim_path.append_child(name),
					PRIM_TYPE_TOKENS.geom_subset.clone(),
				)
			}));
		}

		if !removed.is_empty() {
			self.send_prims_removed(&removed);
		}
		self.send_prims_added(&added);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		for entry in entries {
			if entry.prim_path.is_absolute_root() {
				self.subset_names.clear();
			} else {
				self.subset_names
					.retain(|path, _| !path.has_prefix(&entry.prim_path));
			}
		}
		self.send_prims_removed(entries);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		let mut removed = Vec::new();
		let mut added = Vec::new();
		let mut dirtied = entries.to_vec();
		let subset_locator = hd::DataSourceLocatorSet::from(hd::DataSourceLocator::from(
			&GEOMETRY_SCHEMA_TOKENS.geom_subset,
		));

		for entry in entries {
			if !entry.dirty_locators.intersects_set(&GEOM_SUBSETS_LOCATORS) {
				continue;
			}

			let (previous, names) = self.refresh_subset_names(&entry.prim_path);
			for name in &previous {
				let child = entry.prim_path.append_child(name);
				if names.contains(name) {
					dirtied.push(DirtiedPrimEntry::new(child, subset_locator.clone()));
				} else {
					removed.push(RemovedPrimEntry::new(child));
				}
			}
			added.extend(names.iter().filter(|name| !previous.contains(name)).map(|name| {
				AddedPrimEntry::new(
					entry.prim_path.append_child(name),
					PRIM_TYPE_TOKENS.geom_subset.clone(),
				)
			}));
		}

		if !removed.is_empty() {
			self.send_prims_removed(&removed);
		}
		if !added.is_empty() {
			self.send_prims_added(&added);
		}
		self.send_prims_dirtied(&dirtied);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::testing::{Notice, RecordingObserver};
	use crate::hd::{
		GeomSubsetSchema, RetainedAddedPrimEntry, RetainedSceneIndex, SceneIndexObserverHandle,
		SceneIndexPrimView,
	};
	use parking_lot::Mutex;

	fn p(s: &str) -> sdf::Path {
		sdf::Path::from(s)
	}

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn mesh(subsets: &[(&str, Vec<i32>)]) -> RetainedAddedPrimEntry {
		let subsets = RetainedContainerDataSource::new(subsets.iter().map(|(name, indices)| {
			(
				t(name),
				GeomSubsetSchema::build_retained(
					&GEOMETRY_SCHEMA_TOKENS.type_face_set,
					indices.clone(),
				)
				.into(),
			)
		}));
		RetainedAddedPrimEntry::new(
			p("/Mesh"),
			t("mesh"),
			Some(RetainedContainerDataSource::new([hd::prim_entry(
				&GEOMETRY_SCHEMA_TOKENS.mesh,
				RetainedContainerDataSource::new([hd::prim_entry(
					&GEOMETRY_SCHEMA_TOKENS.geom_subsets,
					subsets,
				)]),
			)])),
		)
	}

	fn setup() -> (
		Arc<RetainedSceneIndex>,
		Arc<LegacyGeomSubsetSceneIndex>,
		Arc<RecordingObserver>,
	) {
		let input = RetainedSceneIndex::new();
		input.add_prims(&[mesh(&[("top", vec![0, 1]), ("bottom", vec![2])])]);
		let scene_index = LegacyGeomSubsetSceneIndex::new(input.clone());
		let observer = RecordingObserver::new();
		let handle: SceneIndexObserverHandle = observer.clone();
		scene_index.add_observer(&handle);
		(input, scene_index, observer)
	}

	#[test]
	fn subsets_are_child_prims() {
		let (_input, scene_index, _observer) = setup();
		let mut paths: Vec<sdf::Path> =
			SceneIndexPrimView::new(&*scene_index, &sdf::Path::absolute_root_path()).collect();
		paths.sort();
		assert_eq!(paths, [p("/"), p("/Mesh"), p("/Mesh/bottom"), p("/Mesh/top")]);

		let prim = scene_index.prim(&p("/Mesh/top"));
		assert_eq!(prim.prim_type, t("geomSubset"));
		let subset = GeomSubsetSchema::get_from_parent(prim.data_source.as_ref());
		assert_eq!(subset.subset_type(), Some(t("typeFaceSet")));
		assert_eq!(
			subset.indices().and_then(|indices| indices.typed_value(0.0)),
			Some(vec![0, 1])
		);

		assert!(!scene_index.prim(&p("/Mesh/side")).is_defined());
		assert_eq!(scene_index.prim(&p("/Mesh")).prim_type, t("mesh"));
	}

	#[test]
	fn resync_adds_subsets_and_removes_stale_ones() {
		let (input, scene_index, observer) = setup();
		scene_index.child_prim_paths(&p("/Mesh"));

		input.add_prims(&[mesh(&[("top", vec![0])])]);
		assert_eq!(
			observer.notices(),
			[
				Notice::Removed(vec![RemovedPrimEntry::new(p("/Mesh/bottom"))]),
				Notice::Added(vec![
					AddedPrimEntry::new(p("/Mesh"), t("mesh")),
					AddedPrimEntry::new(p("/Mesh/top"), t("geomSubset")),
				]),
			]
		);
	}

	/// A mesh whose subsets change without a resync.
	struct EditableMesh {
		base: SceneIndexBase,
		subsets: Mutex<Vec<(&'static str, Vec<i32>)>>,
	}

	impl SceneIndex for EditableMesh {
		fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
			if *prim_path != p("/Mesh") {
				return SceneIndexPrim::default();
			}
			let entry = mesh(&self.subsets.lock());
			SceneIndexPrim::new(entry.prim_type, entry.data_source)
		}

		fn child_prim_paths(&self, prim_path: &sdf::Path) -> Vec<sdf::Path> {
			if prim_path.is_absolute_root() {
				vec![p("/Mesh")]
			} else {
				Vec::new()
			}
		}

		fn base(&self) -> &SceneIndexBase {
			&self.base
		}
	}

	#[test]
	fn dirtied_subsets_are_diffed() {
		let input = Arc::new(EditableMesh {
			base: SceneIndexBase::new(),
			subsets: Mutex::new(vec![("top", vec![0, 1]), ("bottom", vec![2])]),
		});
		let scene_index = LegacyGeomSubsetSceneIndex::new(input.clone());
		let observer = RecordingObserver::new();
		let handle: SceneIndexObserverHandle = observer.clone();
		scene_index.add_observer(&handle);
		assert_eq!(scene_index.child_prim_paths(&p("/Mesh")).len(), 2);

		*input.subsets.lock() = vec![("top", vec![0]), ("side", vec![3])];
		let dirty: hd::DataSourceLocatorSet = hd::DataSourceLocator::from("mesh/geomSubsets").into();
		input.send_prims_dirtied(&[DirtiedPrimEntry::new(p("/Mesh"), dirty.clone())]);

		assert_eq!(
			observer.notices(),
			[
				Notice::Removed(vec![RemovedPrimEntry::new(p("/Mesh/bottom"))]),
				Notice::Added(vec![AddedPrimEntry::new(p("/Mesh/side"), t("geomSubset"))]),
				Notice::Dirtied(vec![
					DirtiedPrimEntry::new(p("/Mesh"), dirty),
					DirtiedPrimEntry::new(
						p("/Mesh/top"),
						hd::DataSourceLocator::from("geomSubset").into()
					),
				]),
			]
		);
		assert!(scene_index.prim(&p("/Mesh/side")).is_defined());
		assert!(!scene_index.prim(&p("/Mesh/bottom")).is_defined());
	}

	#[test]
	fn unrelated_dirties_pass_through() {
		let (input, _scene_index, observer) = setup();
		let dirty: hd::DataSourceLocatorSet = hd::DataSourceLocator::from("primvars").into();
		input.dirty_prims(&[DirtiedPrimEntry::new(p("/Mesh"), dirty.clone())]);
		assert_eq!(
			observer.notices(),
			[Notice::Dirtied(vec![DirtiedPrimEntry::new(p("/Mesh"), dirty)])]
		);
	}

	#[test]
	fn removal_forgets_cached_subsets() {
		let (input, scene_index, observer) = setup();
		scene_index.child_prim_paths(&p("/Mesh"));
		input.remove_prims(&[RemovedPrimEntry::new(p("/Mesh"))]);
		assert_eq!(observer.removed_paths(), [p("/Mesh")]);
		assert!(scene_index.child_prim_paths(&p("/Mesh")).is_empty());
	}

	#[test]
	fn prims_without_subsets_are_not_cached() {
		let (input, scene_index, _observer) = setup();
		input.add_prims(&[
			RetainedAddedPrimEntry::new(p("/Plain"), t("xform"), None),
			RetainedAddedPrimEntry::new(p("/Plain/Child"), t("xform"), None),
		]);
		assert_eq!(scene_index.child_prim_paths(&p("/Plain")), [p("/Plain/Child")]);
		assert!(scene_index.child_prim_paths(&p("/Plain/Child")).is_empty());
		assert!(!scene_index.subset_names.contains_key(&p("/Plain")));
		assert!(!scene_index.subset_names.contains_key(&p("/Plain/Child")));
		assert!(scene_index.subset_names.contains_key(&p("/Mesh")));
	}

	#[test]
	fn subsets_added_by_a_dirty_are_announced() {
		let input = Arc::new(EditableMesh {
			base: SceneIndexBase::new(),
			subsets: Mutex::new(Vec::new()),
		});
		let scene_index = LegacyGeomSubsetSceneIndex::new(input.clone());
		let observer = RecordingObserver::new();
		let handle: SceneIndexObserverHandle = observer.clone();
		scene_index.add_observer(&handle);
		assert!(scene_index.child_prim_paths(&p("/Mesh")).is_empty());

		*input.subsets.lock() = vec![("top", vec![0])];
		let dirty: hd::DataSourceLocatorSet = hd::DataSourceLocator::from("mesh/geomSubsets").into();
		input.send_prims_dirtied(&[DirtiedPrimEntry::new(p("/Mesh"), dirty.clone())]);

		assert_eq!(
			observer.notices(),
			[
				Notice::Added(vec![AddedPrimEntry::new(p("/Mesh/top"), t("geomSubset"))]),
				Notice::Dirtied(vec![DirtiedPrimEntry::new(p("/Mesh"), dirty)]),
			]
		);
		assert_eq!(scene_index.child_prim_paths(&p("/Mesh")), [p("/Mesh/top")]);
	}

	#[test]
	fn real_child_wins_over_subset_with_same_name() {
		let (input, scene_index, _observer) = setup();
		input.add_prims(&[RetainedAddedPrimEntry::new(p("/Mesh/top"), t("xform"), None)]);

		assert_eq!(scene_index.prim(&p("/Mesh/top")).prim_type, t("xform"));
		let mut children = scene_index.child_prim_paths(&p("/Mesh"));
		children.sort();
		assert_eq!(children, [p("/Mesh/bottom"), p("/Mesh/top")]);
		assert_eq!(
			scene_index.subset_names.get(&p("/Mesh")).map(|names| names.value().clone()),
			Some(vec![t("bottom")])
		);
	}
}
