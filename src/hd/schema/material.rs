use super::{child_container, child_value, container_schema};
use crate::hd::{
	self, ContainerDataSourceHandle, DataSource, RetainedContainerDataSource,
	RetainedSmallVectorDataSource, RetainedTypedSampledDataSource, SampledDataSourceHandle,
	VectorDataSourceHandle,
};
use crate::{declare_public_tokens, sdf, tf};

declare_public_tokens!(MaterialSchemaTokens, MATERIAL_SCHEMA_TOKENS, [
	material: "material",
	universal_render_context: "",

	nodes: "nodes",
	terminals: "terminals",
	interface_mappings: "interfaceMappings",

	parameters: "parameters",
	input_connections: "inputConnections",
	node_identifier: "nodeIdentifier",

	value: "value",
	color_space: "colorSpace",
	type_name: "typeName",

	node_path: "nodePath",
	input_name: "inputName",

	upstream_node_path: "upstreamNodePath",
	upstream_node_output_name: "upstreamNodeOutputName",

	surface: "surface",
	displacement: "displacement",
	volume: "volume",
]);

declare_public_tokens!(MaterialOverrideSchemaTokens, MATERIAL_OVERRIDE_SCHEMA_TOKENS, [
	material_override: "materialOverride",
	interface_values: "interfaceValues",
]);

declare_public_tokens!(MaterialBindingsSchemaTokens, MATERIAL_BINDINGS_SCHEMA_TOKENS, [
	material_bindings: "materialBindings",
	all_purpose: "",
	path: "path",
]);

container_schema!(
	/// The `material` container of a material prim: one network per render context.
	MaterialSchema
);

impl MaterialSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &MATERIAL_SCHEMA_TOKENS.material))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&MATERIAL_SCHEMA_TOKENS.material)
	}

	pub fn render_contexts(&self) -> Vec<tf::Token> {
		self.container
			.as_ref()
			.map(|container| container.names())
			.unwrap_or_default()
	}

	/// The network for `render_context`, falling back to the universal network.
	pub fn material_network(&self, render_context: &tf::Token) -> MaterialNetworkSchema {
		let network = child_container(self.container.as_ref(), render_context).or_else(|| {
			child_container(
				self.container.as_ref(),
				&MATERIAL_SCHEMA_TOKENS.universal_render_context,
			)
		});
		MaterialNetworkSchema::new(network)
	}
}

container_schema!(MaterialNetworkSchema);

impl MaterialNetworkSchema {
	pub fn nodes(&self) -> Option<ContainerDataSourceHandle> {
		child_container(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.nodes)
	}

	pub fn node(&self, name: &tf::Token) -> MaterialNodeSchema {
		MaterialNodeSchema::new(child_container(self.nodes().as_ref(), name))
	}

	pub fn terminals(&self) -> Option<ContainerDataSourceHandle> {
		child_container(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.terminals)
	}

	/// Public interface names, each mapped to the node inputs it drives.
	pub fn interface_mappings(&self) -> MaterialInterfaceMappingsSchema {
		MaterialInterfaceMappingsSchema::new(child_container(
			self.container.as_ref(),
			&MATERIAL_SCHEMA_TOKENS.interface_mappings,
		))
	}
}

container_schema!(MaterialNodeSchema);

impl MaterialNodeSchema {
	pub fn parameters(&self) -> Option<ContainerDataSourceHandle> {
		child_container(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.parameters)
	}

	pub fn parameter(&self, name: &tf::Token) -> MaterialNodeParameterSchema {
		MaterialNodeParameterSchema::new(child_container(self.parameters().as_ref(), name))
	}

	pub fn input_connections(&self) -> Option<ContainerDataSourceHandle> {
		child_container(
			self.container.as_ref(),
			&MATERIAL_SCHEMA_TOKENS.input_connections,
		)
	}

	pub fn node_identifier(&self) -> Option<tf::Token> {
		child_value(
			self.container.as_ref(),
			&MATERIAL_SCHEMA_TOKENS.node_identifier,
		)
	}

	pub fn build_retained(
		node_identifier: &tf::Token,
		parameters: ContainerDataSourceHandle,
	) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([
			(
				MATERIAL_SCHEMA_TOKENS.node_identifier.clone(),
				RetainedTypedSampledDataSource::data_source(node_identifier.clone()),
			),
			(MATERIAL_SCHEMA_TOKENS.parameters.clone(), parameters.into()),
		])
	}
}

container_schema!(MaterialNodeParameterSchema);

impl MaterialNodeParameterSchema {
	pub fn value(&self) -> Option<SampledDataSourceHandle> {
		self.container
			.as_ref()?
			.get(&MATERIAL_SCHEMA_TOKENS.value)?
			.into_sampled()
	}

	pub fn color_space(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.color_space)
	}

	pub fn type_name(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.type_name)
	}

	pub fn build_retained(value: SampledDataSourceHandle) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([(MATERIAL_SCHEMA_TOKENS.value.clone(), value.into())])
	}
}

container_schema!(MaterialInterfaceMappingsSchema);

impl MaterialInterfaceMappingsSchema {
	pub fn public_names(&self) -> Vec<tf::Token> {
		self.container
			.as_ref()
			.map(|container| container.names())
			.unwrap_or_default()
	}

	/// The node inputs driven by `public_name`.
	pub fn mappings(&self, public_name: &tf::Token) -> Vec<MaterialInterfaceMappingSchema> {
		let Some(vector) = self
			.container
			.as_ref()
			.and_then(|container| container.get(public_name))
			.and_then(DataSource::into_vector)
		else {
			return Vec::new();
		};
		(0..vector.num_elements())
			.map(|i| {
				MaterialInterfaceMappingSchema::new(
					vector.element(i).and_then(DataSource::into_container),
				)
			})
			.collect()
	}

	pub fn build_mapping_vector(
		mappings: &[(tf::Token, tf::Token)],
	) -> VectorDataSourceHandle {
		RetainedSmallVectorDataSource::new(mappings.iter().map(|(node_path, input_name)| {
			DataSource::Container(MaterialInterfaceMappingSchema::build_retained(
				node_path,
				input_name,
			))
		}))
	}
}

container_schema!(
	/// One node input driven by a public interface name.
	MaterialInterfaceMappingSchema
);

impl MaterialInterfaceMappingSchema {
	pub fn node_path(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.node_path)
	}

	pub fn input_name(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &MATERIAL_SCHEMA_TOKENS.input_name)
	}

	pub fn build_retained(node_path: &tf::Token, input_name: &tf::Token) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([
			(
				MATERIAL_SCHEMA_TOKENS.node_path.clone(),
				RetainedTypedSampledDataSource::data_source(node_path.clone()),
			),
			(
				MATERIAL_SCHEMA_TOKENS.input_name.clone(),
				RetainedTypedSampledDataSource::data_source(input_name.clone()),
			),
		])
	}
}

container_schema!(
	/// Values overriding the public interface of a material.
	MaterialOverrideSchema
);

impl MaterialOverrideSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(
			parent,
			&MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override,
		))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&MATERIAL_OVERRIDE_SCHEMA_TOKENS.material_override)
	}

	/// Parameter containers keyed by public interface name.
	pub fn interface_values(&self) -> Option<ContainerDataSourceHandle> {
		child_container(
			self.container.as_ref(),
			&MATERIAL_OVERRIDE_SCHEMA_TOKENS.interface_values,
		)
	}

	pub fn interface_value(&self, public_name: &tf::Token) -> MaterialNodeParameterSchema {
		MaterialNodeParameterSchema::new(child_container(
			self.interface_values().as_ref(),
			public_name,
		))
	}
}

container_schema!(MaterialBindingsSchema);

impl MaterialBindingsSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(
			parent,
			&MATERIAL_BINDINGS_SCHEMA_TOKENS.material_bindings,
		))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&MATERIAL_BINDINGS_SCHEMA_TOKENS.material_bindings)
	}

	pub fn purposes(&self) -> Vec<tf::Token> {
		self.container
			.as_ref()
			.map(|container| container.names())
			.unwrap_or_default()
	}

	/// Bound material path for `purpose`, if any.
	pub fn material_path(&self, purpose: &tf::Token) -> Option<sdf::Path> {
		child_value(
			child_container(self.container.as_ref(), purpose).as_ref(),
			&MATERIAL_BINDINGS_SCHEMA_TOKENS.path,
		)
	}

	pub fn build_retained(bindings: &[(tf::Token, sdf::Path)]) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new(bindings.iter().map(|(purpose, path)| {
			(
				purpose.clone(),
				DataSource::Container(RetainedContainerDataSource::new([(
					MATERIAL_BINDINGS_SCHEMA_TOKENS.path.clone(),
					RetainedTypedSampledDataSource::data_source(*path),
				)])),
			)
		}))
	}
}
