use crate::hd::{self, ContainerDataSourceHandle};
use crate::{sdf, tf};

/// What a provider sees when flattening one top-level container of a prim.
pub struct FlattenedDataSourceContext<'a> {
	pub prim_path: &'a sdf::Path,
	/// The top-level name the provider is registered under.
	pub name: &'a tf::Token,
	/// The prim's unflattened container at `name`.
	pub input_data_source: Option<ContainerDataSourceHandle>,
	/// The parent prim's flattened container at `name`.
	pub flattened_parent_data_source: Option<ContainerDataSourceHandle>,
}

/// Computes the flattened form of one top-level container of a prim, combining the prim's
/// own data with what it inherits from its parent.
pub trait FlattenedDataSourceProvider: Send + Sync {
	/// The result may memoize, in which case it should also implement
	/// [`hd::InvalidatableContainerDataSource`].
	fn flattened_data_source(
		&self,
		context: &FlattenedDataSourceContext,
	) -> Option<ContainerDataSourceHandle>;

	/// Given locators dirtied on a prim, relative to the provider's name, rewrites them to
	/// the locators dirtied on every descendant's flattened data source.
	fn compute_dirty_locators_for_descendants(&self, locators: &mut hd::DataSourceLocatorSet);
}
