use super::{child_container, child_value, container_schema};
use crate::hd::{
	self, ContainerDataSourceHandle, DataSource, RetainedContainerDataSource,
	RetainedTypedSampledDataSource,
};
use crate::{declare_public_tokens, sdf, tf};

declare_public_tokens!(DependenciesSchemaTokens, DEPENDENCIES_SCHEMA_TOKENS, [
	dependencies: "__dependencies",
	depended_on_prim_path: "dependedOnPrimPath",
	depended_on_data_source_locator: "dependedOnDataSourceLocator",
	affected_data_source_locator: "affectedDataSourceLocator",
]);

container_schema!(
	/// Named dependencies a prim declares on data of itself or other prims.
	DependenciesSchema
);

impl DependenciesSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &DEPENDENCIES_SCHEMA_TOKENS.dependencies))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&DEPENDENCIES_SCHEMA_TOKENS.dependencies)
	}

	pub fn entries(&self) -> Vec<(tf::Token, DependencySchema)> {
		let Some(container) = &self.container else {
			return Vec::new();
		};
		container
			.names()
			.into_iter()
			.map(|name| {
				let dependency = DependencySchema::new(child_container(Some(container), &name));
				(name, dependency)
			})
			.collect()
	}

	pub fn build_retained<I>(dependencies: I) -> ContainerDataSourceHandle
	where
		I: IntoIterator<Item = (tf::Token, ContainerDataSourceHandle)>,
	{
		RetainedContainerDataSource::new(
			dependencies
				.into_iter()
				.map(|(name, dependency)| (name, DataSource::Container(dependency))),
		)
	}
}

container_schema!(
	/// When data at `depended_on_data_source_locator` of `depended_on_prim_path` changes, data
	/// at `affected_data_source_locator` of the declaring prim changes too.
	DependencySchema
);

impl DependencySchema {
	/// An absent or empty path refers to the declaring prim.
	pub fn depended_on_prim_path(&self) -> Option<sdf::Path> {
		child_value(
			self.container.as_ref(),
			&DEPENDENCIES_SCHEMA_TOKENS.depended_on_prim_path,
		)
	}

	pub fn depended_on_data_source_locator(&self) -> Option<hd::DataSourceLocator> {
		child_value(
			self.container.as_ref(),
			&DEPENDENCIES_SCHEMA_TOKENS.depended_on_data_source_locator,
		)
	}

	pub fn affected_data_source_locator(&self) -> Option<hd::DataSourceLocator> {
		child_value(
			self.container.as_ref(),
			&DEPENDENCIES_SCHEMA_TOKENS.affected_data_source_locator,
		)
	}

	pub fn build_retained(
		depended_on_prim_path: sdf::Path,
		depended_on_data_source_locator: hd::DataSourceLocator,
		affected_data_source_locator: hd::DataSourceLocator,
	) -> ContainerDataSourceHandle {
		let tokens = &*DEPENDENCIES_SCHEMA_TOKENS;
		RetainedContainerDataSource::new([
			(
				tokens.depended_on_prim_path.clone(),
				RetainedTypedSampledDataSource::data_source(depended_on_prim_path),
			),
			(
				tokens.depended_on_data_source_locator.clone(),
				RetainedTypedSampledDataSource::data_source(depended_on_data_source_locator),
			),
			(
				tokens.affected_data_source_locator.clone(),
				RetainedTypedSampledDataSource::data_source(affected_data_source_locator),
			),
		])
	}
}
