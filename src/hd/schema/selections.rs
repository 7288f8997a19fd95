use super::{child_value, container_schema};
use crate::hd::{
	self, ContainerDataSourceHandle, DataSource, RetainedContainerDataSource,
	RetainedSmallVectorDataSource, RetainedTypedSampledDataSource, VectorDataSourceHandle,
};
use crate::declare_public_tokens;

declare_public_tokens!(SelectionsSchemaTokens, SELECTIONS_SCHEMA_TOKENS, [
	selections: "selections",
	fully_selected: "fullySelected",
]);

/// The `selections` vector of a prim, one entry per way the prim is selected.
#[derive(Clone, Default)]
pub struct SelectionsSchema {
	vector: Option<VectorDataSourceHandle>,
}

impl SelectionsSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self {
			vector: parent
				.and_then(|p| p.get(&SELECTIONS_SCHEMA_TOKENS.selections))
				.and_then(DataSource::into_vector),
		}
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&SELECTIONS_SCHEMA_TOKENS.selections)
	}

	pub fn is_defined(&self) -> bool {
		self.vector.is_some()
	}

	pub fn selections(&self) -> Vec<SelectionSchema> {
		let Some(vector) = &self.vector else {
			return Vec::new();
		};
		(0..vector.num_elements())
			.map(|i| SelectionSchema::new(vector.element(i).and_then(DataSource::into_container)))
			.collect()
	}

	/// True if any entry selects the whole prim.
	pub fn is_fully_selected(&self) -> bool {
		self.selections()
			.iter()
			.any(|selection| selection.fully_selected() == Some(true))
	}

	pub fn build_retained(selections: &[ContainerDataSourceHandle]) -> VectorDataSourceHandle {
		RetainedSmallVectorDataSource::new(selections.iter().cloned().map(DataSource::Container))
	}
}

container_schema!(SelectionSchema);

impl SelectionSchema {
	pub fn fully_selected(&self) -> Option<bool> {
		child_value(
			self.container.as_ref(),
			&SELECTIONS_SCHEMA_TOKENS.fully_selected,
		)
	}

	pub fn build_retained(fully_selected: bool) -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([(
			SELECTIONS_SCHEMA_TOKENS.fully_selected.clone(),
			RetainedTypedSampledDataSource::data_source(fully_selected),
		)])
	}
}
