use crate::hd::{
	self, AddedPrimEntry, ContainerDataSource, ContainerDataSourceHandle, DataSource,
	DependenciesSchema, DependencySchema, DirtiedPrimEntry, MaterialNetworkSchema,
	MaterialOverrideSchema, OverlayContainerDataSource, RemovedPrimEntry,
	RetainedContainerDataSource, SceneIndex, SceneIndexBase, SceneIndexHandle, SceneIndexPrim,
	SingleInputFilteringSceneIndex, SingleInputFilteringSceneIndexBase,
	DEPENDENCIES_SCHEMA_TOKENS, MATERIAL_SCHEMA_TOKENS, PRIM_TYPE_TOKENS,
};
use crate::{declare_public_tokens, sdf, tf};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

declare_public_tokens!(MaterialOverrideResolvingSceneIndexTokens, MATERIAL_OVERRIDE_RESOLVING_SCENE_INDEX_TOKENS, [
	material_override_dependency: "materialOverrideDependency",
]);

/// Public interface names by node input, by node.
type ReverseInterfaceMappings = HashMap<tf::Token, HashMap<tf::Token, tf::Token>>;

fn reverse_interface_mappings(network: &ContainerDataSourceHandle) -> ReverseInterfaceMappings {
	let mappings = MaterialNetworkSchema::new(Some(network.clone())).interface_mappings();
	let mut reverse = ReverseInterfaceMappings::new();
	for public_name in mappings.public_names() {
		for mapping in mappings.mappings(&public_name) {
			let (Some(node_path), Some(input_name)) = (mapping.node_path(), mapping.input_name())
			else {
				continue;
			};
			reverse
				.entry(node_path)
				.or_default()
				.insert(input_name, public_name.clone());
		}
	}
	reverse
}

/// Parameters of one node, with overridden interface values overlaid.
struct ParametersDataSource {
	input: Option<ContainerDataSourceHandle>,
	public_names: HashMap<tf::Token, tf::Token>,
	interface_values: ContainerDataSourceHandle,
}

impl ParametersDataSource {
	fn override_for(&self, input_name: &tf::Token) -> Option<ContainerDataSourceHandle> {
		let public_name = self.public_names.get(input_name)?;
		self.interface_values
			.get(public_name)
			.and_then(DataSource::into_container)
	}
}

impl ContainerDataSource for ParametersDataSource {
	fn names(&self) -> Vec<tf::Token> {
		let mut names = self
			.input
			.as_ref()
			.map(|input| input.names())
			.unwrap_or_default();
		let mut overridden: Vec<tf::Token> = self
			.public_names
			.keys()
			.filter(|input_name| !names.contains(input_name))
			.filter(|input_name| self.override_for(input_name).is_some())
			.cloned()
			.collect();
		overridden.sort();
		names.extend(overridden);
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let parameter = self.input.as_ref().and_then(|input| input.get(name));
		let Some(override_container) = self.override_for(name) else {
			return parameter;
		};
		match parameter {
			Some(DataSource::Container(parameter)) => Some(DataSource::Container(
				OverlayContainerDataSource::new([override_container, parameter]),
			)),
			None => Some(DataSource::Container(override_container)),
			Some(other) => Some(other),
		}
	}
}

struct NodeDataSource {
	input: ContainerDataSourceHandle,
	public_names: HashMap<tf::Token, tf::Token>,
	interface_values: ContainerDataSourceHandle,
}

impl ContainerDataSource for NodeDataSource {
	fn names(&self) -> Vec<tf::Token> {
		let parameters = &MATERIAL_SCHEMA_TOKENS.parameters;
		let mut names = self.input.names();
		if !names.contains(parameters) && self.get(parameters).is_some() {
			names.push(parameters.clone());
		}
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		if *name != MATERIAL_SCHEMA_TOKENS.parameters {
			return self.input.get(name);
		}
		let parameters = match self.input.get(name) {
			Some(DataSource::Container(parameters)) => Some(parameters),
			None => None,
			other => return other,
		};
		let resolved: ContainerDataSourceHandle = Arc::new(ParametersDataSource {
			input: parameters,
			public_names: self.public_names.clone(),
			interface_values: self.interface_values.clone(),
		});
		if resolved.names().is_empty() {
			return None;
		}
		Some(DataSource::Container(resolved))
	}
}

struct NodesDataSource {
	input: ContainerDataSourceHandle,
	reverse_mappings: Arc<ReverseInterfaceMappings>,
	interface_values: ContainerDataSourceHandle,
}

impl ContainerDataSource for NodesDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.input.names()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let node = self.input.get(name)?;
		let Some(public_names) = self.reverse_mappings.get(name) else {
			return Some(node);
		};
		match node {
			DataSource::Container(node) => Some(DataSource::Container(Arc::new(NodeDataSource {
				input: node,
				public_names: public_names.clone(),
				interface_values: self.interface_values.clone(),
			}))),
			other => Some(other),
		}
	}
}

struct NetworkDataSource {
	input: ContainerDataSourceHandle,
	interface_values: ContainerDataSourceHandle,
	reverse_mappings: OnceLock<Arc<ReverseInterfaceMappings>>,
}

impl NetworkDataSource {
	fn new(input: ContainerDataSourceHandle, interface_values: ContainerDataSourceHandle) -> Self {
		Self {
			input,
			interface_values,
			reverse_mappings: OnceLock::new(),
		}
	}

	fn reverse_mappings(&self) -> &Arc<ReverseInterfaceMappings> {
		self.reverse_mappings
			.get_or_init(|| Arc::new(reverse_interface_mappings(&self.input)))
	}
}

impl ContainerDataSource for NetworkDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.input.names()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let child = self.input.get(name)?;
		if *name != MATERIAL_SCHEMA_TOKENS.nodes {
			return Some(child);
		}
		let DataSource::Container(nodes) = child else {
			return Some(child);
		};
		let reverse_mappings = self.reverse_mappings();
		if reverse_mappings.is_empty() {
			return Some(DataSource::Container(nodes));
		}
		Some(DataSource::Container(Arc::new(NodesDataSource {
			input: nodes,
			reverse_mappings: reverse_mappings.clone(),
			interface_values: self.interface_values.clone(),
		})))
	}
}

/// The `material` container: one network per render context.
struct MaterialDataSource {
	input: ContainerDataSourceHandle,
	interface_values: ContainerDataSourceHandle,
	networks: DashMap<tf::Token, ContainerDataSourceHandle>,
}

impl ContainerDataSource for MaterialDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.input.names()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		if let Some(network) = self.networks.get(name) {
			return Some(DataSource::Container(network.value().clone()));
		}
		match self.input.get(name)? {
			DataSource::Container(network) => {
				let network: ContainerDataSourceHandle =
					Arc::new(NetworkDataSource::new(network, self.interface_values.clone()));
				let network = self
					.networks
					.entry(name.clone())
					.or_insert(network)
					.value()
					.clone();
				Some(DataSource::Container(network))
			}
			other => Some(other),
		}
	}
}

struct MaterialPrimDataSource {
	input: ContainerDataSourceHandle,
	dependencies: ContainerDataSourceHandle,
	material: OnceLock<Option<DataSource>>,
}

impl MaterialPrimDataSource {
	fn new(input: ContainerDataSourceHandle) -> Self {
		let material_locator = hd::DataSourceLocator::from(&MATERIAL_SCHEMA_TOKENS.material);
		let dependencies = DependenciesSchema::build_retained([(
			MATERIAL_OVERRIDE_RESOLVING_SCENE_INDEX_TOKENS
				.material_override_dependency
				.clone(),
			DependencySchema::build_retained(
				sdf::Path::empty_path(),
				MaterialOverrideSchema::default_locator(),
				material_locator,
			),
		)]);
		Self {
			input,
			dependencies,
			material: OnceLock::new(),
		}
	}

	fn resolve_material(&self) -> Option<DataSource> {
		let child = self.input.get(&MATERIAL_SCHEMA_TOKENS.material)?;
		let interface_values = MaterialOverrideSchema::get_from_parent(Some(&self.input))
			.interface_values()
			.filter(|values| !values.names().is_empty());
		match (child, interface_values) {
			(DataSource::Container(material), Some(interface_values)) => {
				Some(DataSource::Container(Arc::new(MaterialDataSource {
					input: material,
					interface_values,
					networks: DashMap::new(),
				})))
			}
			(child, _) => Some(child),
		}
	}
}

impl ContainerDataSource for MaterialPrimDataSource {
	fn names(&self) -> Vec<tf::Token> {
		let mut names = self.input.names();
		if !names.contains(&DEPENDENCIES_SCHEMA_TOKENS.dependencies) {
			names.push(DEPENDENCIES_SCHEMA_TOKENS.dependencies.clone());
		}
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		if *name == DEPENDENCIES_SCHEMA_TOKENS.dependencies {
			let authored = self.input.get(name).and_then(DataSource::into_container);
			return OverlayContainerDataSource::overlaid(Some(self.dependencies.clone()), authored)
				.map(DataSource::Container);
		}

		if *name != MATERIAL_SCHEMA_TOKENS.material {
			return self.input.get(name);
		}
		self.material.get_or_init(|| self.resolve_material()).clone()
	}
}

/// Applies a material's `materialOverride` interface values to the node parameters the
/// interface maps them to.
///
/// An override container is overlaid over the parameter it drives, so fields it does not
/// author keep their original values. Material prims declare a dependency of `material` on
/// `materialOverride`; a [`hd::DependencyForwardingSceneIndex`] downstream turns override
/// edits into dirtied materials.
pub struct MaterialOverrideResolvingSceneIndex {
	base: SingleInputFilteringSceneIndexBase,
}

impl MaterialOverrideResolvingSceneIndex {
	pub fn new(input: SceneIndexHandle) -> Arc<Self> {
		let scene_index = Arc::new(Self {
			base: SingleInputFilteringSceneIndexBase::new(input),
		});
		hd::connect_filter(&scene_index);
		scene_index
	}
}

impl SceneIndex for MaterialOverrideResolvingSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		let mut prim = self.input_scene_index().prim(prim_path);
		if prim.prim_type == PRIM_TYPE_TOKENS.material {
			let input = prim
				.data_source
				.take()
				.unwrap_or_else(RetainedContainerDataSource::empty);
			prim.data_source = Some(Arc::new(MaterialPrimDataSource::new(input)));
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

impl SingleInputFilteringSceneIndex for MaterialOverrideResolvingSceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		self.send_prims_added(entries);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		self.send_prims_removed(entries);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		self.send_prims_dirtied(entries);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::{
		MaterialInterfaceMappingsSchema, MaterialNodeParameterSchema, MaterialNodeSchema,
		MaterialSchema, RetainedAddedPrimEntry, RetainedSceneIndex,
		RetainedTypedSampledDataSource, MATERIAL_OVERRIDE_SCHEMA_TOKENS, prim_entry,
	};
	use crate::{gf, vt};
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn p(s: &str) -> sdf::Path {
		sdf::Path::from(s)
	}

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn color(r: f32, g: f32, b: f32) -> vt::Value {
		vt::Value::new(gf::Vec3f::new(r, g, b))
	}

	fn parameter(value: vt::Value) -> DataSource {
		RetainedContainerDataSource::new([
			(
				MATERIAL_SCHEMA_TOKENS.value.clone(),
				hd::RetainedSampledDataSource::new(value).into(),
			),
			(
				MATERIAL_SCHEMA_TOKENS.color_space.clone(),
				RetainedTypedSampledDataSource::data_source(t("lin_rec709")),
			),
		])
		.into()
	}

	fn material(overrides: Option<vt::Value>) -> ContainerDataSourceHandle {
		let surface = MaterialNodeSchema::build_retained(
			&t("UsdPreviewSurface"),
			RetainedContainerDataSource::new([
				(t("diffuseColor"), parameter(color(0.5, 0.5, 0.5))),
				(t("roughness"), parameter(vt::Value::new(0.3f32))),
			]),
		);
		let network = RetainedContainerDataSource::new([
			(
				MATERIAL_SCHEMA_TOKENS.nodes.clone(),
				RetainedContainerDataSource::new([(t("surf"), surface.into())]).into(),
			),
			(
				MATERIAL_SCHEMA_TOKENS.interface_mappings.clone(),
				RetainedContainerDataSource::new([(
					t("Color"),
					MaterialInterfaceMappingsSchema::build_mapping_vector(&[(
						t("surf"),
						t("diffuseColor"),
					)])
					.into(),
				)])
				.into(),
			),
		]);

		let mut entries = vec![prim_entry(
			&MATERIAL_SCHEMA_TOKENS.material,
			RetainedContainerDataSource::new([(
				MATERIAL_SCHEMA_TOKENS.universal_render_context.clone(),
				network.into(),
			)]),
		)];
		if let Some(value) = overrides {
			entries.push(prim_entry(
				&MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override,
				RetainedContainerDataSource::new([(
					MATERIAL_OVERRIDE_SCHEMA_TOKENS.interface_values.clone(),
					RetainedContainerDataSource::new([(
						t("Color"),
						MaterialNodeParameterSchema::build_retained(hd::RetainedSampledDataSource::new(
							value,
						))
						.into(),
					)])
					.into(),
				)]),
			));
		}
		RetainedContainerDataSource::new(entries)
	}

	fn resolve(prim_type: &str, data_source: ContainerDataSourceHandle) -> Arc<MaterialOverrideResolvingSceneIndex> {
		let input = RetainedSceneIndex::new();
		input.add_prims(&[RetainedAddedPrimEntry::new(
			p("/Looks/Mat"),
			t(prim_type),
			Some(data_source),
		)]);
		MaterialOverrideResolvingSceneIndex::new(input)
	}

	fn surface_parameter(
		scene_index: &MaterialOverrideResolvingSceneIndex,
		name: &str,
	) -> MaterialNodeParameterSchema {
		let prim = scene_index.prim(&p("/Looks/Mat"));
		MaterialSchema::get_from_parent(prim.data_source.as_ref())
			.material_network(&t("ri"))
			.node(&t("surf"))
			.parameter(&t(name))
	}

	#[test]
	fn override_is_overlaid_on_mapped_parameter() {
		let scene_index = resolve("material", material(Some(color(1.0, 0.0, 0.0))));

		let diffuse = surface_parameter(&scene_index, "diffuseColor");
		assert_eq!(diffuse.value().map(|v| v.value(0.0)), Some(color(1.0, 0.0, 0.0)));
		assert_eq!(diffuse.color_space(), Some(t("lin_rec709")));

		let roughness = surface_parameter(&scene_index, "roughness");
		assert_eq!(roughness.value().map(|v| v.value(0.0)), Some(vt::Value::new(0.3f32)));
	}

	#[test]
	fn without_override_values_are_unchanged() {
		let scene_index = resolve("material", material(None));
		let diffuse = surface_parameter(&scene_index, "diffuseColor");
		assert_eq!(diffuse.value().map(|v| v.value(0.0)), Some(color(0.5, 0.5, 0.5)));
	}

	#[test]
	fn only_material_prims_are_resolved() {
		let scene_index = resolve("mesh", material(Some(color(1.0, 0.0, 0.0))));
		let diffuse = surface_parameter(&scene_index, "diffuseColor");
		assert_eq!(diffuse.value().map(|v| v.value(0.0)), Some(color(0.5, 0.5, 0.5)));
		let prim = scene_index.prim(&p("/Looks/Mat"));
		assert!(!DependenciesSchema::get_from_parent(prim.data_source.as_ref()).is_defined());
	}

	#[test]
	fn material_depends_on_its_override() {
		let scene_index = resolve("material", material(None));
		let prim = scene_index.prim(&p("/Looks/Mat"));
		let entries = DependenciesSchema::get_from_parent(prim.data_source.as_ref()).entries();
		assert_eq!(entries.len(), 1);
		let (name, dependency) = &entries[0];
		assert_eq!(*name, t("materialOverrideDependency"));
		assert_eq!(dependency.depended_on_prim_path(), Some(sdf::Path::empty_path()));
		assert_eq!(
			dependency.depended_on_data_source_locator(),
			Some(hd::DataSourceLocator::from("materialOverride"))
		);
		assert_eq!(
			dependency.affected_data_source_locator(),
			Some(hd::DataSourceLocator::from("material"))
		);
	}

	#[test]
	fn override_without_authored_parameter_is_listed() {
		let surface = MaterialNodeSchema::build_retained(
			&t("UsdPreviewSurface"),
			RetainedContainerDataSource::empty(),
		);
		let network = RetainedContainerDataSource::new([
			(
				MATERIAL_SCHEMA_TOKENS.nodes.clone(),
				RetainedContainerDataSource::new([(t("surf"), surface.into())]).into(),
			),
			(
				MATERIAL_SCHEMA_TOKENS.interface_mappings.clone(),
				RetainedContainerDataSource::new([(
					t("Opacity"),
					MaterialInterfaceMappingsSchema::build_mapping_vector(&[(t("surf"), t("opacity"))])
						.into(),
				)])
				.into(),
			),
		]);
		let data_source = RetainedContainerDataSource::new([
			prim_entry(
				&MATERIAL_SCHEMA_TOKENS.material,
				RetainedContainerDataSource::new([(
					MATERIAL_SCHEMA_TOKENS.universal_render_context.clone(),
					network.into(),
				)]),
			),
			prim_entry(
				&MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override,
				RetainedContainerDataSource::new([(
					MATERIAL_OVERRIDE_SCHEMA_TOKENS.interface_values.clone(),
					RetainedContainerDataSource::new([(
						t("Opacity"),
						MaterialNodeParameterSchema::build_retained(RetainedTypedSampledDataSource::new(
							0.5f32,
						))
						.into(),
					)])
					.into(),
				)]),
			),
		]);

		let scene_index = resolve("material", data_source);
		let prim = scene_index.prim(&p("/Looks/Mat"));
		let node = MaterialSchema::get_from_parent(prim.data_source.as_ref())
			.material_network(&t(""))
			.node(&t("surf"));
		assert_eq!(
			node.parameters().map(|parameters| parameters.names()),
			Some(vec![t("opacity")])
		);
		assert_eq!(
			node.parameter(&t("opacity")).value().map(|v| v.value(0.0)),
			Some(vt::Value::new(0.5f32))
		);
	}

	/// A network that counts reads of its interface mappings.
	struct CountingNetwork {
		input: ContainerDataSourceHandle,
		mapping_reads: AtomicUsize,
	}

	impl ContainerDataSource for CountingNetwork {
		fn names(&self) -> Vec<tf::Token> {
			self.input.names()
		}

		fn get(&self, name: &tf::Token) -> Option<DataSource> {
			if *name == MATERIAL_SCHEMA_TOKENS.interface_mappings {
				self.mapping_reads.fetch_add(1, Ordering::Relaxed);
			}
			self.input.get(name)
		}
	}

	#[test]
	fn interface_mappings_are_read_once_per_network() {
		let authored = material(Some(color(1.0, 0.0, 0.0)));
		let network = MaterialSchema::get_from_parent(Some(&authored))
			.material_network(&t(""))
			.container()
			.cloned()
			.expect("network");
		let counting = Arc::new(CountingNetwork {
			input: network,
			mapping_reads: AtomicUsize::new(0),
		});
		let data_source = RetainedContainerDataSource::new([
			prim_entry(
				&MATERIAL_SCHEMA_TOKENS.material,
				RetainedContainerDataSource::new([(
					MATERIAL_SCHEMA_TOKENS.universal_render_context.clone(),
					DataSource::Container(counting.clone()),
				)]),
			),
			(
				MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override.clone(),
				authored
					.get(&MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override)
					.expect("override"),
			),
		]);
		let scene_index = resolve("material", data_source);
		let prim = scene_index.prim(&p("/Looks/Mat"));

		for _ in 0..3 {
			let node = MaterialSchema::get_from_parent(prim.data_source.as_ref())
				.material_network(&t(""))
				.node(&t("surf"));
			assert_eq!(
				node.parameter(&t("diffuseColor")).value().map(|v| v.value(0.0)),
				Some(color(1.0, 0.0, 0.0))
			);
			assert!(node.parameter(&t("roughness")).value().is_some());
		}
		assert_eq!(counting.mapping_reads.load(Ordering::Relaxed), 1);
	}
}
