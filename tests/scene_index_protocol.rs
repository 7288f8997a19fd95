use openusd_hydra::hd::testing::{Notice, RecordingObserver};
use openusd_hydra::hd::{
	self, AddedPrimEntry, DirtiedPrimEntry, FlatteningSceneIndex, NoticeBatchingSceneIndex,
	PRIMVAR_SCHEMA_TOKENS, PRIMVARS_SCHEMA_TOKENS, PrimvarSchema, RemovedPrimEntry,
	RenamedPrimEntry, RetainedAddedPrimEntry, RetainedContainerDataSource, RetainedSceneIndex,
	RetainedTypedSampledDataSource, SceneIndex, SceneIndexObserverHandle, SceneIndexPrimView,
};
use openusd_hydra::{sdf, tf, vt};
use std::sync::Arc;

fn p(s: &str) -> sdf::Path {
	sdf::Path::from(s)
}

fn t(s: &str) -> tf::Token {
	tf::Token::new(s)
}

fn l(s: &str) -> hd::DataSourceLocator {
	hd::DataSourceLocator::from(s)
}

fn constant_primvar(name: &str, value: f32) -> hd::ContainerDataSourceHandle {
	RetainedContainerDataSource::new([(
		PRIMVARS_SCHEMA_TOKENS.primvars.clone(),
		RetainedContainerDataSource::new([(
			t(name),
			PrimvarSchema::builder()
				.primvar_value(RetainedTypedSampledDataSource::new(value))
				.interpolation(&PRIMVAR_SCHEMA_TOKENS.constant)
				.build()
				.into(),
		)])
		.into(),
	)])
}

struct Pipeline {
	input: Arc<RetainedSceneIndex>,
	flattening: Arc<FlatteningSceneIndex>,
	batching: Arc<NoticeBatchingSceneIndex>,
	observer: Arc<RecordingObserver>,
}

fn pipeline() -> Pipeline {
	let input = RetainedSceneIndex::new();
	input.add_prims(&[
		RetainedAddedPrimEntry::new(p("/World"), t("xform"), Some(constant_primvar("color", 1.0))),
		RetainedAddedPrimEntry::new(p("/World/Mesh"), t("mesh"), None),
		RetainedAddedPrimEntry::new(p("/World/Mesh/Child"), t("mesh"), None),
	]);
	let flattening = FlatteningSceneIndex::with_primvars(input.clone());
	let batching = NoticeBatchingSceneIndex::new(flattening.clone());
	let observer = RecordingObserver::new();
	let handle: SceneIndexObserverHandle = observer.clone();
	batching.add_observer(&handle);
	Pipeline {
		input,
		flattening,
		batching,
		observer,
	}
}

fn color(scene_index: &dyn SceneIndex, path: &str) -> Option<vt::Value> {
	hd::sampled_value_at(
		scene_index.prim(&p(path)).data_source.as_ref(),
		&l("primvars/color/primvarValue"),
	)
}

#[test]
fn prims_are_pulled_through_the_chain() {
	let pipeline = pipeline();
	let paths: Vec<sdf::Path> =
		SceneIndexPrimView::new(&*pipeline.batching, &sdf::Path::absolute_root_path()).collect();
	assert_eq!(
		paths,
		[p("/"), p("/World"), p("/World/Mesh"), p("/World/Mesh/Child")]
	);
	assert_eq!(pipeline.batching.prim(&p("/World/Mesh")).prim_type, t("mesh"));
	assert_eq!(color(&*pipeline.batching, "/World/Mesh/Child"), Some(vt::Value::new(1.0f32)));
	assert!(!pipeline.batching.prim(&p("/Missing")).is_defined());
	assert_eq!(pipeline.batching.input_scene_indices().len(), 1);
}

#[test]
fn notices_reach_the_end_of_the_chain_in_order() {
	let pipeline = pipeline();
	pipeline
		.input
		.add_prims(&[RetainedAddedPrimEntry::new(p("/World/Light"), t("light"), None)]);
	pipeline
		.input
		.remove_prims(&[RemovedPrimEntry::new(p("/World/Light"))]);

	assert_eq!(
		pipeline.observer.notices(),
		[
			Notice::Added(vec![AddedPrimEntry::new(p("/World/Light"), t("light"))]),
			Notice::Removed(vec![RemovedPrimEntry::new(p("/World/Light"))]),
		]
	);
}

#[test]
fn dirtying_an_ancestor_primvar_dirties_pulled_descendants() {
	let pipeline = pipeline();
	assert!(color(&*pipeline.flattening, "/World/Mesh").is_some());

	pipeline.input.add_prims(&[RetainedAddedPrimEntry::new(
		p("/World"),
		t("xform"),
		Some(constant_primvar("color", 2.0)),
	)]);
	assert_eq!(color(&*pipeline.batching, "/World/Mesh"), Some(vt::Value::new(2.0f32)));

	pipeline.observer.clear();
	pipeline.input.dirty_prims(&[DirtiedPrimEntry::new(
		p("/World"),
		l("primvars/color").into(),
	)]);
	let dirtied: Vec<sdf::Path> = pipeline
		.observer
		.dirtied_entries()
		.iter()
		.map(|entry| entry.prim_path)
		.collect();
	assert!(dirtied.contains(&p("/World")));
	assert!(dirtied.contains(&p("/World/Mesh")));
}

#[test]
fn batching_holds_notices_until_flushed() {
	let pipeline = pipeline();
	pipeline.batching.set_batching_enabled(true);

	pipeline
		.input
		.add_prims(&[RetainedAddedPrimEntry::new(p("/World/A"), t("mesh"), None)]);
	pipeline
		.input
		.add_prims(&[RetainedAddedPrimEntry::new(p("/World/B"), t("mesh"), None)]);
	pipeline
		.input
		.remove_prims(&[RemovedPrimEntry::new(p("/World/A"))]);
	assert!(pipeline.observer.notices().is_empty());
	assert_eq!(pipeline.batching.pending_batch_count(), 2);

	pipeline.batching.set_batching_enabled(false);
	assert_eq!(
		pipeline.observer.notices(),
		[
			Notice::Added(vec![
				AddedPrimEntry::new(p("/World/A"), t("mesh")),
				AddedPrimEntry::new(p("/World/B"), t("mesh")),
			]),
			Notice::Removed(vec![RemovedPrimEntry::new(p("/World/A"))]),
		]
	);
	assert_eq!(pipeline.batching.pending_batch_count(), 0);
}

#[test]
fn renames_degrade_to_removal_and_addition() {
	let pipeline = pipeline();
	pipeline
		.input
		.rename_prims(&[RenamedPrimEntry::new(p("/World/Mesh"), p("/World/Renamed"))]);

	assert_eq!(
		pipeline.observer.notices(),
		[
			Notice::Removed(vec![RemovedPrimEntry::new(p("/World/Mesh"))]),
			Notice::Added(vec![
				AddedPrimEntry::new(p("/World/Renamed"), t("mesh")),
				AddedPrimEntry::new(p("/World/Renamed/Child"), t("mesh")),
			]),
		]
	);
	assert!(pipeline.batching.prim(&p("/World/Renamed/Child")).is_defined());
	assert!(!pipeline.batching.prim(&p("/World/Mesh")).is_defined());
}

#[test]
fn dropped_observers_are_skipped() {
	let pipeline = pipeline();
	let transient = RecordingObserver::new();
	let handle: SceneIndexObserverHandle = transient.clone();
	pipeline.batching.add_observer(&handle);
	drop(handle);
	drop(transient);

	pipeline
		.input
		.add_prims(&[RetainedAddedPrimEntry::new(p("/World/A"), t("mesh"), None)]);
	assert_eq!(pipeline.observer.added_entries().len(), 1);
}
