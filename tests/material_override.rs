use openusd_hydra::hd::testing::RecordingObserver;
use openusd_hydra::hd::{
	self, ContainerDataSourceHandle, DependencyForwardingSceneIndex, DirtiedPrimEntry,
	MATERIAL_OVERRIDE_SCHEMA_TOKENS, MATERIAL_SCHEMA_TOKENS, MaterialInterfaceMappingsSchema,
	MaterialNodeParameterSchema, MaterialNodeSchema, MaterialSchema, RetainedAddedPrimEntry,
	RetainedContainerDataSource, RetainedSampledDataSource, RetainedSceneIndex, SceneIndex,
	SceneIndexObserverHandle,
};
use openusd_hydra::hdsi::MaterialOverrideResolvingSceneIndex;
use openusd_hydra::{sdf, tf, vt};
use std::sync::Arc;

fn p(s: &str) -> sdf::Path {
	sdf::Path::from(s)
}

fn t(s: &str) -> tf::Token {
	tf::Token::new(s)
}

fn container<const N: usize>(entries: [(&str, hd::DataSource); N]) -> ContainerDataSourceHandle {
	RetainedContainerDataSource::new(entries.into_iter().map(|(name, ds)| (t(name), ds)))
}

fn parameter(value: f32) -> hd::DataSource {
	MaterialNodeParameterSchema::build_retained(RetainedSampledDataSource::new(vt::Value::new(value)))
		.into()
}

/// A preview surface whose `opacity` and `roughness` are both driven by the public `Fade`.
fn material(fade: Option<f32>) -> ContainerDataSourceHandle {
	let surface = MaterialNodeSchema::build_retained(
		&t("UsdPreviewSurface"),
		container([
			("opacity", parameter(1.0)),
			("roughness", parameter(0.4)),
			("metallic", parameter(0.0)),
		]),
	);
	let network = RetainedContainerDataSource::new([
		(
			MATERIAL_SCHEMA_TOKENS.nodes.clone(),
			container([("Surface", surface.into())]).into(),
		),
		(
			MATERIAL_SCHEMA_TOKENS.interface_mappings.clone(),
			container([(
				"Fade",
				MaterialInterfaceMappingsSchema::build_mapping_vector(&[
					(t("Surface"), t("opacity")),
					(t("Surface"), t("roughness")),
				])
				.into(),
			)])
			.into(),
		),
	]);

	let mut entries = vec![hd::prim_entry(
		&MATERIAL_SCHEMA_TOKENS.material,
		RetainedContainerDataSource::new([(
			MATERIAL_SCHEMA_TOKENS.universal_render_context.clone(),
			network.into(),
		)]),
	)];
	if let Some(fade) = fade {
		entries.push(hd::prim_entry(
			&MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override,
			RetainedContainerDataSource::new([(
				MATERIAL_OVERRIDE_SCHEMA_TOKENS.interface_values.clone(),
				container([("Fade", parameter(fade))]).into(),
			)]),
		));
	}
	RetainedContainerDataSource::new(entries)
}

struct Scene {
	input: Arc<RetainedSceneIndex>,
	forwarding: Arc<DependencyForwardingSceneIndex>,
	observer: Arc<RecordingObserver>,
}

fn scene(fade: Option<f32>) -> Scene {
	let input = RetainedSceneIndex::new();
	input.add_prims(&[RetainedAddedPrimEntry::new(
		p("/Looks/Glass"),
		t("material"),
		Some(material(fade)),
	)]);
	let resolving = MaterialOverrideResolvingSceneIndex::new(input.clone());
	let forwarding = DependencyForwardingSceneIndex::new(resolving);
	let observer = RecordingObserver::new();
	let handle: SceneIndexObserverHandle = observer.clone();
	forwarding.add_observer(&handle);
	Scene {
		input,
		forwarding,
		observer,
	}
}

fn surface_value(scene_index: &dyn SceneIndex, name: &str) -> Option<vt::Value> {
	let prim = scene_index.prim(&p("/Looks/Glass"));
	MaterialSchema::get_from_parent(prim.data_source.as_ref())
		.material_network(&t("glslfx"))
		.node(&t("Surface"))
		.parameter(&t(name))
		.value()
		.map(|value| value.value(0.0))
}

#[test]
fn override_drives_every_mapped_parameter() {
	let scene = scene(Some(0.25));
	let resolved = &*scene.forwarding;
	assert_eq!(surface_value(resolved, "opacity"), Some(vt::Value::new(0.25f32)));
	assert_eq!(surface_value(resolved, "roughness"), Some(vt::Value::new(0.25f32)));
	assert_eq!(surface_value(resolved, "metallic"), Some(vt::Value::new(0.0f32)));
}

#[test]
fn authored_values_survive_without_override() {
	let scene = scene(None);
	assert_eq!(
		surface_value(&*scene.forwarding, "opacity"),
		Some(vt::Value::new(1.0f32))
	);
}

#[test]
fn editing_the_override_dirties_the_material() {
	let scene = scene(Some(0.25));
	// Dependencies are tracked once the prim has been pulled.
	assert!(scene.forwarding.prim(&p("/Looks/Glass")).is_defined());
	assert_eq!(scene.forwarding.tracked_prim_count(), 1);

	scene.input.dirty_prims(&[DirtiedPrimEntry::new(
		p("/Looks/Glass"),
		hd::DataSourceLocator::from("materialOverride").into(),
	)]);

	let material_locator = MaterialSchema::default_locator();
	let dirtied = scene.observer.dirtied_entries();
	assert!(
		dirtied
			.iter()
			.any(|entry| entry.prim_path == p("/Looks/Glass")
				&& entry.dirty_locators.intersects(&material_locator)),
		"material not dirtied: {dirtied:?}"
	);
}

#[test]
fn resynced_override_is_picked_up() {
	let scene = scene(Some(0.25));
	assert_eq!(
		surface_value(&*scene.forwarding, "opacity"),
		Some(vt::Value::new(0.25f32))
	);

	scene.input.add_prims(&[RetainedAddedPrimEntry::new(
		p("/Looks/Glass"),
		t("material"),
		Some(material(Some(0.75))),
	)]);
	assert_eq!(
		surface_value(&*scene.forwarding, "opacity"),
		Some(vt::Value::new(0.75f32))
	);
}
