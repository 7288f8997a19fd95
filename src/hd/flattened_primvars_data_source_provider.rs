use crate::hd::{
	self, ContainerDataSource, ContainerDataSourceHandle, DataSource,
	FlattenedDataSourceContext, FlattenedDataSourceProvider, InvalidatableContainerDataSource,
	PRIMVAR_SCHEMA_TOKENS, PrimvarSchema,
};
use crate::tf;
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::sync::Arc;

/// Flattens `primvars`: a prim sees its own primvars plus the constant primvars of its
/// ancestors, the nearest definition winning.
#[derive(Default)]
pub struct FlattenedPrimvarsDataSourceProvider;

impl FlattenedDataSourceProvider for FlattenedPrimvarsDataSourceProvider {
	fn flattened_data_source(
		&self,
		context: &FlattenedDataSourceContext,
	) -> Option<ContainerDataSourceHandle> {
		Some(Arc::new(FlattenedPrimvarsDataSource::new(
			context.input_data_source.clone(),
			context.flattened_parent_data_source.clone(),
		)))
	}

	fn compute_dirty_locators_for_descendants(&self, locators: &mut hd::DataSourceLocatorSet) {
		// Changing whether a primvar is constant changes what descendants inherit.
		if locators.iter().any(affects_inheritance) {
			*locators = hd::DataSourceLocatorSet::universal();
		}
	}
}

/// True if the locator, relative to `primvars`, may change the set of constant primvars.
fn affects_inheritance(locator: &hd::DataSourceLocator) -> bool {
	locator.element_count() < 2
		|| locator.element(1) == Some(&PRIMVAR_SCHEMA_TOKENS.interpolation)
}

enum PrimvarEntry {
	Present(ContainerDataSourceHandle),
	Absent,
}

pub struct FlattenedPrimvarsDataSource {
	input: Option<ContainerDataSourceHandle>,
	parent: Option<ContainerDataSourceHandle>,
	primvars: DashMap<tf::Token, PrimvarEntry>,
	parent_constant_names: ArcSwapOption<Vec<tf::Token>>,
}

impl FlattenedPrimvarsDataSource {
	pub fn new(
		input: Option<ContainerDataSourceHandle>,
		parent: Option<ContainerDataSourceHandle>,
	) -> Self {
		Self {
			input,
			parent,
			primvars: DashMap::new(),
			parent_constant_names: ArcSwapOption::empty(),
		}
	}

	fn parent_constant_names(&self) -> Arc<Vec<tf::Token>> {
		if let Some(names) = self.parent_constant_names.load_full() {
			return names;
		}

		let names: Arc<Vec<tf::Token>> = Arc::new(match &self.parent {
			Some(parent) => parent
				.names()
				.into_iter()
				.filter(|name| parent_constant_primvar(parent, name).is_some())
				.collect(),
			None => Vec::new(),
		});
		self.parent_constant_names.store(Some(names.clone()));
		names
	}

	fn compute(&self, name: &tf::Token) -> PrimvarEntry {
		let local = self
			.input
			.as_ref()
			.and_then(|input| input.get(name))
			.and_then(DataSource::into_container);
		if let Some(local) = local {
			return PrimvarEntry::Present(local);
		}

		match self
			.parent
			.as_ref()
			.and_then(|parent| parent_constant_primvar(parent, name))
		{
			Some(inherited) => PrimvarEntry::Present(inherited),
			None => PrimvarEntry::Absent,
		}
	}
}

fn parent_constant_primvar(
	parent: &ContainerDataSourceHandle,
	name: &tf::Token,
) -> Option<ContainerDataSourceHandle> {
	let primvar = parent.get(name)?.into_container()?;
	PrimvarSchema::new(Some(primvar.clone()))
		.is_constant()
		.then_some(primvar)
}

impl ContainerDataSource for FlattenedPrimvarsDataSource {
	fn names(&self) -> Vec<tf::Token> {
		let mut names = self
			.input
			.as_ref()
			.map(|input| input.names())
			.unwrap_or_default();
		for name in self.parent_constant_names().iter() {
			if !names.contains(name) {
				names.push(name.clone());
			}
		}
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let entry = match self.primvars.get(name) {
			Some(entry) => match entry.value() {
				PrimvarEntry::Present(primvar) => Some(primvar.clone()),
				PrimvarEntry::Absent => None,
			},
			None => {
				let computed = self.compute(name);
				let primvar = match &computed {
					PrimvarEntry::Present(primvar) => Some(primvar.clone()),
					PrimvarEntry::Absent => None,
				};
				self.primvars.insert(name.clone(), computed);
				primvar
			}
		};
		entry.map(DataSource::Container)
	}

	fn as_invalidatable(&self) -> Option<&dyn InvalidatableContainerDataSource> {
		Some(self)
	}
}

impl InvalidatableContainerDataSource for FlattenedPrimvarsDataSource {
	fn invalidate(&self, dirty_locators: &hd::DataSourceLocatorSet) -> bool {
		let mut any_dirtied = false;
		for locator in dirty_locators {
			match locator.first_element() {
				Some(name) if !affects_inheritance(locator) => {
					any_dirtied |= self.primvars.remove(name).is_some();
				}
				_ => {
					any_dirtied |= !self.primvars.is_empty();
					self.primvars.clear();
					self.parent_constant_names.store(None);
					break;
				}
			}
		}
		any_dirtied
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::{RetainedContainerDataSource, RetainedTypedSampledDataSource};
	use crate::vt;

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn l(s: &str) -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(s)
	}

	fn primvar(value: f32, interpolation: &tf::Token) -> DataSource {
		PrimvarSchema::builder()
			.primvar_value(RetainedTypedSampledDataSource::new(value))
			.interpolation(interpolation)
			.build()
			.into()
	}

	fn flatten(
		input: Option<ContainerDataSourceHandle>,
		parent: Option<ContainerDataSourceHandle>,
	) -> ContainerDataSourceHandle {
		let provider = FlattenedPrimvarsDataSourceProvider;
		provider
			.flattened_data_source(&FlattenedDataSourceContext {
				prim_path: &crate::sdf::Path::from("/A"),
				name: &hd::PRIMVARS_SCHEMA_TOKENS.primvars,
				input_data_source: input,
				flattened_parent_data_source: parent,
			})
			.expect("flattened primvars")
	}

	fn value(container: &ContainerDataSourceHandle, name: &str) -> Option<vt::Value> {
		hd::sampled_value_at(Some(container), &l(&format!("{name}/primvarValue")))
	}

	#[test]
	fn inherits_constant_primvars_only() {
		let tokens = &*PRIMVAR_SCHEMA_TOKENS;
		let parent = RetainedContainerDataSource::new([
			(t("color"), primvar(1.0, &tokens.constant)),
			(t("uv"), primvar(2.0, &tokens.vertex)),
			(t("opacity"), primvar(3.0, &tokens.constant)),
		]);
		let child = RetainedContainerDataSource::new([(t("opacity"), primvar(4.0, &tokens.uniform))]);

		let flattened = flatten(Some(child), Some(flatten(Some(parent), None)));
		assert_eq!(flattened.names(), [t("opacity"), t("color")]);
		assert_eq!(value(&flattened, "color"), Some(vt::Value::new(1.0f32)));
		assert_eq!(value(&flattened, "opacity"), Some(vt::Value::new(4.0f32)));
		assert!(flattened.get(&t("uv")).is_none());
	}

	#[test]
	fn inherits_through_several_levels() {
		let tokens = &*PRIMVAR_SCHEMA_TOKENS;
		let root = flatten(
			Some(RetainedContainerDataSource::new([(t("color"), primvar(1.0, &tokens.constant))])),
			None,
		);
		let middle = flatten(None, Some(root));
		let leaf = flatten(Some(RetainedContainerDataSource::empty()), Some(middle));
		assert_eq!(value(&leaf, "color"), Some(vt::Value::new(1.0f32)));
	}

	#[test]
	fn invalidate_by_name_or_interpolation() {
		let tokens = &*PRIMVAR_SCHEMA_TOKENS;
		let flattened = flatten(
			Some(RetainedContainerDataSource::new([
				(t("a"), primvar(1.0, &tokens.constant)),
				(t("b"), primvar(2.0, &tokens.constant)),
			])),
			None,
		);
		let invalidatable = flattened.as_invalidatable().expect("invalidatable");

		assert!(!invalidatable.invalidate(&l("a/primvarValue").into()));
		flattened.get(&t("a"));
		flattened.get(&t("b"));
		assert!(invalidatable.invalidate(&l("a/primvarValue").into()));
		assert!(!invalidatable.invalidate(&l("a/primvarValue").into()));
		assert!(invalidatable.invalidate(&l("b/interpolation").into()));
		assert!(!invalidatable.invalidate(&hd::DataSourceLocatorSet::universal()));
	}

	#[test]
	fn descendant_dirtiness_escalates() {
		let provider = FlattenedPrimvarsDataSourceProvider;

		let mut value_only: hd::DataSourceLocatorSet = l("a/primvarValue").into();
		provider.compute_dirty_locators_for_descendants(&mut value_only);
		assert_eq!(value_only, hd::DataSourceLocatorSet::from(l("a/primvarValue")));

		let mut interpolation: hd::DataSourceLocatorSet = l("a/interpolation").into();
		provider.compute_dirty_locators_for_descendants(&mut interpolation);
		assert!(interpolation.is_universal());

		let mut whole: hd::DataSourceLocatorSet = l("a").into();
		provider.compute_dirty_locators_for_descendants(&mut whole);
		assert!(whole.is_universal());
	}
}
