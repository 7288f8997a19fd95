use super::{child_container, child_value, container_schema, typed_child};
use crate::hd::{
	self, ContainerDataSourceHandle, DataSource, RetainedContainerDataSource,
	RetainedTypedSampledDataSource, TypedSampledDataSource,
};
use crate::{declare_public_tokens, tf, vt};

declare_public_tokens!(PrimTypeTokens, PRIM_TYPE_TOKENS, [
	mesh: "mesh",
	basis_curves: "basisCurves",
	nurbs_curves: "nurbsCurves",
	nurbs_patch: "nurbsPatch",
	points: "points",
	tet_mesh: "tetMesh",
	instancer: "instancer",
	material: "material",
	geom_subset: "geomSubset",
]);

declare_public_tokens!(GeometrySchemaTokens, GEOMETRY_SCHEMA_TOKENS, [
	mesh: "mesh",
	basis_curves: "basisCurves",
	geom_subsets: "geomSubsets",
	subdivision_scheme: "subdivisionScheme",
	double_sided: "doubleSided",

	geom_subset: "geomSubset",
	type_: "type",
	indices: "indices",
	type_face_set: "typeFaceSet",
	type_point_set: "typePointSet",
	type_curve_set: "typeCurveSet",

	visibility: "visibility",
	purpose: "purpose",
	default_purpose: "default",
	render: "render",
	proxy: "proxy",
	guide: "guide",
]);

container_schema!(MeshSchema);

impl MeshSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &GEOMETRY_SCHEMA_TOKENS.mesh))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&GEOMETRY_SCHEMA_TOKENS.mesh)
	}

	pub fn geom_subsets_locator() -> hd::DataSourceLocator {
		Self::default_locator().append(&GEOMETRY_SCHEMA_TOKENS.geom_subsets)
	}

	pub fn subdivision_scheme(&self) -> Option<tf::Token> {
		child_value(
			self.container.as_ref(),
			&GEOMETRY_SCHEMA_TOKENS.subdivision_scheme,
		)
	}

	pub fn double_sided(&self) -> Option<bool> {
		child_value(self.container.as_ref(), &GEOMETRY_SCHEMA_TOKENS.double_sided)
	}

	pub fn geom_subsets(&self) -> GeomSubsetsSchema {
		GeomSubsetsSchema::new(child_container(
			self.container.as_ref(),
			&GEOMETRY_SCHEMA_TOKENS.geom_subsets,
		))
	}
}

container_schema!(BasisCurvesSchema);

impl BasisCurvesSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &GEOMETRY_SCHEMA_TOKENS.basis_curves))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&GEOMETRY_SCHEMA_TOKENS.basis_curves)
	}

	pub fn geom_subsets_locator() -> hd::DataSourceLocator {
		Self::default_locator().append(&GEOMETRY_SCHEMA_TOKENS.geom_subsets)
	}

	pub fn geom_subsets(&self) -> GeomSubsetsSchema {
		GeomSubsetsSchema::new(child_container(
			self.container.as_ref(),
			&GEOMETRY_SCHEMA_TOKENS.geom_subsets,
		))
	}
}

container_schema!(
	/// Subsets of a gprim keyed by subset name.
	GeomSubsetsSchema
);

impl GeomSubsetsSchema {
	pub fn ids(&self) -> Vec<tf::Token> {
		self.container
			.as_ref()
			.map(|container| container.names())
			.unwrap_or_default()
	}

	pub fn geom_subset(&self, id: &tf::Token) -> GeomSubsetSchema {
		GeomSubsetSchema::new(child_container(self.container.as_ref(), id))
	}
}

container_schema!(GeomSubsetSchema);

impl GeomSubsetSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &GEOMETRY_SCHEMA_TOKENS.geom_subset))
	}

	pub fn subset_type(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &GEOMETRY_SCHEMA_TOKENS.type_)
	}

	pub fn indices(&self) -> Option<TypedSampledDataSource<vt::Array<i32>>> {
		typed_child(self.container.as_ref(), &GEOMETRY_SCHEMA_TOKENS.indices)
	}

	pub fn build_retained(subset_type: &tf::Token, indices: vt::Array<i32>) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([
			(
				GEOMETRY_SCHEMA_TOKENS.type_.clone(),
				RetainedTypedSampledDataSource::data_source(subset_type.clone()),
			),
			(
				GEOMETRY_SCHEMA_TOKENS.indices.clone(),
				RetainedTypedSampledDataSource::data_source(indices),
			),
		])
	}
}

container_schema!(VisibilitySchema);

impl VisibilitySchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &GEOMETRY_SCHEMA_TOKENS.visibility))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&GEOMETRY_SCHEMA_TOKENS.visibility)
	}

	pub fn visibility(&self) -> Option<bool> {
		child_value(self.container.as_ref(), &GEOMETRY_SCHEMA_TOKENS.visibility)
	}

	pub fn build_retained(visible: bool) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([(
			GEOMETRY_SCHEMA_TOKENS.visibility.clone(),
			RetainedTypedSampledDataSource::data_source(visible),
		)])
	}
}

container_schema!(PurposeSchema);

impl PurposeSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &GEOMETRY_SCHEMA_TOKENS.purpose))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&GEOMETRY_SCHEMA_TOKENS.purpose)
	}

	pub fn purpose(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &GEOMETRY_SCHEMA_TOKENS.purpose)
	}

	pub fn build_retained(purpose: &tf::Token) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([(
			GEOMETRY_SCHEMA_TOKENS.purpose.clone(),
			RetainedTypedSampledDataSource::data_source(purpose.clone()),
		)])
	}
}

/// Builds a `{ name: container }` entry list for a prim data source.
pub fn prim_entry(name: &tf::Token, container: ContainerDataSourceHandle) -> (tf::Token, DataSource) {
	(name.clone(), DataSource::Container(container))
}
