use super::{child_container, child_value, container_schema, typed_child};
use crate::hd::{
	self, ContainerDataSourceHandle, DataSource, RetainedContainerDataSource,
	RetainedTypedSampledDataSource, SampledDataSourceHandle, TypedSampledDataSource,
};
use crate::{declare_public_tokens, tf, vt};

declare_public_tokens!(PrimvarsSchemaTokens, PRIMVARS_SCHEMA_TOKENS, [
	primvars: "primvars",
	points: "points",
	velocities: "velocities",
	accelerations: "accelerations",
	angular_velocities: "angularVelocities",
	nonlinear_sample_count: "nonlinearSampleCount",
	blur_scale: "blurScale",
	instance_translations: "hydra:instanceTranslations",
	instance_rotations: "hydra:instanceRotations",
	instance_scales: "hydra:instanceScales",
]);

declare_public_tokens!(PrimvarSchemaTokens, PRIMVAR_SCHEMA_TOKENS, [
	primvar_value: "primvarValue",
	indexed_primvar_value: "indexedPrimvarValue",
	indices: "indices",
	interpolation: "interpolation",
	role: "role",

	constant: "constant",
	uniform: "uniform",
	varying: "varying",
	vertex: "vertex",
	face_varying: "faceVarying",
	instance: "instance",
]);

container_schema!(
	/// The `primvars` container of a prim, keyed by primvar name.
	PrimvarsSchema
);

impl PrimvarsSchema {
	pub fn get_from_parent(parent: Option<&ContainerDataSourceHandle>) -> Self {
		Self::new(child_container(parent, &PRIMVARS_SCHEMA_TOKENS.primvars))
	}

	pub fn default_locator() -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(&PRIMVARS_SCHEMA_TOKENS.primvars)
	}

	/// Locator of the value of the primvar `name`, relative to the prim.
	pub fn primvar_value_locator(name: &tf::Token) -> hd::DataSourceLocator {
		hd::DataSourceLocator::new([
			PRIMVARS_SCHEMA_TOKENS.primvars.clone(),
			name.clone(),
			PRIMVAR_SCHEMA_TOKENS.primvar_value.clone(),
		])
	}

	pub fn primvar_names(&self) -> Vec<tf::Token> {
		self.container
			.as_ref()
			.map(|container| container.names())
			.unwrap_or_default()
	}

	pub fn primvar(&self, name: &tf::Token) -> PrimvarSchema {
		PrimvarSchema::new(child_container(self.container.as_ref(), name))
	}
}

container_schema!(
	/// A single primvar.
	PrimvarSchema
);

impl PrimvarSchema {
	pub fn primvar_value(&self) -> Option<SampledDataSourceHandle> {
		self.sampled(&PRIMVAR_SCHEMA_TOKENS.primvar_value)
	}

	pub fn indexed_primvar_value(&self) -> Option<SampledDataSourceHandle> {
		self.sampled(&PRIMVAR_SCHEMA_TOKENS.indexed_primvar_value)
	}

	pub fn indices(&self) -> Option<TypedSampledDataSource<vt::Array<i32>>> {
		typed_child(self.container.as_ref(), &PRIMVAR_SCHEMA_TOKENS.indices)
	}

	pub fn interpolation(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &PRIMVAR_SCHEMA_TOKENS.interpolation)
	}

	pub fn role(&self) -> Option<tf::Token> {
		child_value(self.container.as_ref(), &PRIMVAR_SCHEMA_TOKENS.role)
	}

	pub fn is_indexed(&self) -> bool {
		self.indexed_primvar_value().is_some()
	}

	pub fn is_constant(&self) -> bool {
		self.interpolation().as_ref() == Some(&PRIMVAR_SCHEMA_TOKENS.constant)
	}

	fn sampled(&self, name: &tf::Token) -> Option<SampledDataSourceHandle> {
		self.container.as_ref()?.get(name)?.into_sampled()
	}

	pub fn builder() -> PrimvarSchemaBuilder {
		PrimvarSchemaBuilder::default()
	}
}

#[derive(Default)]
pub struct PrimvarSchemaBuilder {
	primvar_value: Option<SampledDataSourceHandle>,
	indexed_primvar_value: Option<SampledDataSourceHandle>,
	indices: Option<SampledDataSourceHandle>,
	interpolation: Option<tf::Token>,
	role: Option<tf::Token>,
}

impl PrimvarSchemaBuilder {
	pub fn primvar_value(mut self, value: SampledDataSourceHandle) -> Self {
		self.primvar_value = Some(value);
		self
	}

	pub fn indexed_primvar_value(mut self, value: SampledDataSourceHandle) -> Self {
		self.indexed_primvar_value = Some(value);
		self
	}

	pub fn indices(mut self, indices: SampledDataSourceHandle) -> Self {
		self.indices = Some(indices);
		self
	}

	pub fn interpolation(mut self, interpolation: &tf::Token) -> Self {
		self.interpolation = Some(interpolation.clone());
		self
	}

	pub fn role(mut self, role: &tf::Token) -> Self {
		self.role = Some(role.clone());
		self
	}

	pub fn build(self) -> ContainerDataSourceHandle {
		let tokens = &*PRIMVAR_SCHEMA_TOKENS;
		let mut entries: Vec<(tf::Token, DataSource)> = Vec::new();
		if let Some(value) = self.primvar_value {
			entries.push((tokens.primvar_value.clone(), value.into()));
		}
		if let Some(value) = self.indexed_primvar_value {
			entries.push((tokens.indexed_primvar_value.clone(), value.into()));
		}
		if let Some(indices) = self.indices {
			entries.push((tokens.indices.clone(), indices.into()));
		}
		if let Some(interpolation) = self.interpolation {
			entries.push((
				tokens.interpolation.clone(),
				RetainedTypedSampledDataSource::data_source(interpolation),
			));
		}
		if let Some(role) = self.role {
			entries.push((tokens.role.clone(), RetainedTypedSampledDataSource::data_source(role)));
		}
		RetainedContainerDataSource::new(entries)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::RetainedSampledDataSource;

	#[test]
	fn read_built_primvar() {
		let primvars = RetainedContainerDataSource::new([(
			tf::Token::new("displayColor"),
			PrimvarSchema::builder()
				.primvar_value(RetainedSampledDataSource::new(vt::Value::new(1.0f32)))
				.interpolation(&PRIMVAR_SCHEMA_TOKENS.constant)
				.build()
				.into(),
		)]);
		let prim = RetainedContainerDataSource::new([(
			PRIMVARS_SCHEMA_TOKENS.primvars.clone(),
			primvars.into(),
		)]);

		let schema = PrimvarsSchema::get_from_parent(Some(&prim));
		assert!(schema.is_defined());
		assert_eq!(schema.primvar_names(), [tf::Token::new("displayColor")]);

		let primvar = schema.primvar(&tf::Token::new("displayColor"));
		assert!(primvar.is_constant());
		assert!(!primvar.is_indexed());
		assert_eq!(
			primvar.primvar_value().map(|v| v.value(0.0)),
			Some(vt::Value::new(1.0f32))
		);
		assert!(primvar.role().is_none());

		let missing = schema.primvar(&tf::Token::new("missing"));
		assert!(!missing.is_defined());
		assert!(missing.interpolation().is_none());
	}

	#[test]
	fn value_locator() {
		assert_eq!(
			PrimvarsSchema::primvar_value_locator(&PRIMVARS_SCHEMA_TOKENS.points).to_string(),
			"primvars/points/primvarValue"
		);
	}
}
