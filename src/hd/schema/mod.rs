//! Typed readers over the containers of a prim data source.
//!
//! A schema wraps an optional container. Reading from an undefined schema yields `None`
//! everywhere, so lookups chain without checks.

mod dependencies;
mod geometry;
mod material;
mod primvars;
mod selections;

pub use dependencies::*;
pub use geometry::*;
pub use material::*;
pub use primvars::*;
pub use selections::*;

use crate::hd::{ContainerDataSourceHandle, DataSource, TypedSampledDataSource};
use crate::{tf, vt};

/// Defines a schema struct wrapping an optional container.
macro_rules! container_schema {
	($(#[$attr:meta])* $name:ident) => {
		$(#[$attr])*
		#[derive(Clone, Default)]
		pub struct $name {
			container: Option<$crate::hd::ContainerDataSourceHandle>,
		}

		impl $name {
			pub fn new(container: Option<$crate::hd::ContainerDataSourceHandle>) -> Self {
				Self { container }
			}

			pub fn is_defined(&self) -> bool {
				self.container.is_some()
			}

			pub fn container(&self) -> Option<&$crate::hd::ContainerDataSourceHandle> {
				self.container.as_ref()
			}
		}
	};
}

pub(crate) use container_schema;

pub(crate) fn child_container(
	container: Option<&ContainerDataSourceHandle>,
	name: &tf::Token,
) -> Option<ContainerDataSourceHandle> {
	container?.get(name).and_then(DataSource::into_container)
}

pub(crate) fn typed_child<T: vt::ValueType>(
	container: Option<&ContainerDataSourceHandle>,
	name: &tf::Token,
) -> Option<TypedSampledDataSource<T>> {
	TypedSampledDataSource::cast(container?.get(name).as_ref())
}

/// Reads the value of a typed child at offset zero.
pub(crate) fn child_value<T: vt::ValueType>(
	container: Option<&ContainerDataSourceHandle>,
	name: &tf::Token,
) -> Option<T> {
	typed_child::<T>(container, name)?.typed_value(0.0)
}
