use crate::{hd, tf, vt};
use std::marker::PhantomData;
use std::sync::Arc;

/// Shutter offset, in frames relative to the current frame.
pub type Time = f32;

/// A data source whose children are addressed by name.
///
/// Implementations must be safe to read from several threads at once.
pub trait ContainerDataSource: Send + Sync {
	fn names(&self) -> Vec<tf::Token>;

	fn get(&self, name: &tf::Token) -> Option<DataSource>;

	/// Containers that memoize computed children return themselves here so that owners can
	/// discard stale entries.
	fn as_invalidatable(&self) -> Option<&dyn hd::InvalidatableContainerDataSource> {
		None
	}
}

/// A data source whose children are addressed by index.
pub trait VectorDataSource: Send + Sync {
	fn num_elements(&self) -> usize;

	fn element(&self, index: usize) -> Option<DataSource>;
}

/// A possibly time-varying value.
pub trait SampledDataSource: Send + Sync {
	fn value(&self, shutter_offset: Time) -> vt::Value;

	/// Sample times a consumer must evaluate to reconstruct the value over `[start, end]`.
	///
	/// Returns `None` if the value is uniform over the interval, in which case it should be
	/// sampled at offset zero.
	fn contributing_sample_times(&self, start: Time, end: Time) -> Option<Vec<Time>>;
}

pub type ContainerDataSourceHandle = Arc<dyn ContainerDataSource>;
pub type VectorDataSourceHandle = Arc<dyn VectorDataSource>;
pub type SampledDataSourceHandle = Arc<dyn SampledDataSource>;

/// A node in a prim's data tree.
///
/// A missing child is `None` where an `Option<DataSource>` is expected. `Block` is an explicit
/// absence that hides values from weaker layers when data sources are overlaid.
#[derive(Clone)]
pub enum DataSource {
	Container(ContainerDataSourceHandle),
	Vector(VectorDataSourceHandle),
	Sampled(SampledDataSourceHandle),
	Block,
}

impl DataSource {
	pub fn as_container(&self) -> Option<&ContainerDataSourceHandle> {
		match self {
			DataSource::Container(container) => Some(container),
			_ => None,
		}
	}

	pub fn as_vector(&self) -> Option<&VectorDataSourceHandle> {
		match self {
			DataSource::Vector(vector) => Some(vector),
			_ => None,
		}
	}

	pub fn as_sampled(&self) -> Option<&SampledDataSourceHandle> {
		match self {
			DataSource::Sampled(sampled) => Some(sampled),
			_ => None,
		}
	}

	pub fn into_container(self) -> Option<ContainerDataSourceHandle> {
		match self {
			DataSource::Container(container) => Some(container),
			_ => None,
		}
	}

	pub fn into_vector(self) -> Option<VectorDataSourceHandle> {
		match self {
			DataSource::Vector(vector) => Some(vector),
			_ => None,
		}
	}

	pub fn into_sampled(self) -> Option<SampledDataSourceHandle> {
		match self {
			DataSource::Sampled(sampled) => Some(sampled),
			_ => None,
		}
	}

	pub fn is_block(&self) -> bool {
		matches!(self, DataSource::Block)
	}

	/// True if both refer to the same data source instance.
	pub fn ptr_eq(&self, other: &DataSource) -> bool {
		match (self, other) {
			(DataSource::Container(a), DataSource::Container(b)) => {
				Arc::ptr_eq(a, b)
			}
			(DataSource::Vector(a), DataSource::Vector(b)) => Arc::ptr_eq(a, b),
			(DataSource::Sampled(a), DataSource::Sampled(b)) => Arc::ptr_eq(a, b),
			(DataSource::Block, DataSource::Block) => true,
			_ => false,
		}
	}
}

impl From<ContainerDataSourceHandle> for DataSource {
	fn from(container: ContainerDataSourceHandle) -> Self {
		DataSource::Container(container)
	}
}

impl From<VectorDataSourceHandle> for DataSource {
	fn from(vector: VectorDataSourceHandle) -> Self {
		DataSource::Vector(vector)
	}
}

impl From<SampledDataSourceHandle> for DataSource {
	fn from(sampled: SampledDataSourceHandle) -> Self {
		DataSource::Sampled(sampled)
	}
}

impl std::fmt::Debug for DataSource {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			DataSource::Container(container) => {
				write!(f, "Container({:?})", container.names())
			}
			DataSource::Vector(vector) => write!(f, "Vector({})", vector.num_elements()),
			DataSource::Sampled(sampled) => write!(f, "Sampled({})", sampled.value(0.0)),
			DataSource::Block => write!(f, "Block"),
		}
	}
}

/// Walks `locator` down from `container`, returning `container` itself for the empty locator.
pub fn container_get(
	container: &ContainerDataSourceHandle,
	locator: &hd::DataSourceLocator,
) -> Option<DataSource> {
	let mut current = DataSource::Container(container.clone());
	for name in locator {
		current = current.as_container()?.get(name)?;
	}
	Some(current)
}

/// Like [`container_get`] but starting from an optional container.
pub fn container_get_opt(
	container: Option<&ContainerDataSourceHandle>,
	locator: &hd::DataSourceLocator,
) -> Option<DataSource> {
	container_get(container?, locator)
}

/// Sorted union of the contributing sample times of `sources`.
///
/// Returns `None` if no source varies over the interval.
pub fn merged_contributing_sample_times(
	sources: &[SampledDataSourceHandle],
	start: Time,
	end: Time,
) -> Option<Vec<Time>> {
	let mut varying = false;
	let mut merged = Vec::new();
	for source in sources {
		if let Some(times) = source.contributing_sample_times(start, end) {
			varying = true;
			merged.extend(times);
		}
	}

	if !varying {
		return None;
	}

	merged.sort_by(|a, b| a.total_cmp(b));
	merged.dedup();
	Some(merged)
}

/// Typed view of a sampled data source.
pub struct TypedSampledDataSource<T> {
	source: SampledDataSourceHandle,
	_marker: PhantomData<fn() -> T>,
}

impl<T: vt::ValueType> TypedSampledDataSource<T> {
	/// Casts `data_source` if it is sampled and its value at offset zero holds a `T`.
	pub fn cast(data_source: Option<&DataSource>) -> Option<Self> {
		let source = data_source?.as_sampled()?;
		if !source.value(0.0).is_holding::<T>() {
			return None;
		}
		Some(Self {
			source: source.clone(),
			_marker: PhantomData,
		})
	}

	pub fn typed_value(&self, shutter_offset: Time) -> Option<T> {
		self.source.value(shutter_offset).get::<T>()
	}

	pub fn source(&self) -> &SampledDataSourceHandle {
		&self.source
	}
}

impl<T> Clone for TypedSampledDataSource<T> {
	fn clone(&self) -> Self {
		Self {
			source: self.source.clone(),
			_marker: PhantomData,
		}
	}
}

/// Reads the value of the sampled data source at `locator` under `container`, at offset zero.
pub fn sampled_value_at(
	container: Option<&ContainerDataSourceHandle>,
	locator: &hd::DataSourceLocator,
) -> Option<vt::Value> {
	let data_source = container_get_opt(container, locator)?;
	Some(data_source.as_sampled()?.value(0.0))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::{RetainedContainerDataSource, RetainedSampledDataSource};

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn l(s: &str) -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(s)
	}

	fn nested() -> ContainerDataSourceHandle {
		RetainedContainerDataSource::new([(
			t("primvars"),
			RetainedContainerDataSource::new([(
				t("points"),
				RetainedContainerDataSource::new([(
					t("primvarValue"),
					RetainedSampledDataSource::new(vt::Value::new(1.0f32)).into(),
				)])
				.into(),
			)])
			.into(),
		)])
	}

	#[test]
	fn get_walks_locator() {
		let root = nested();
		let value = container_get(&root, &l("primvars/points/primvarValue"))
			.and_then(DataSource::into_sampled)
			.map(|s| s.value(0.0));
		assert_eq!(value, Some(vt::Value::new(1.0f32)));

		let itself = container_get(&root, &l("")).expect("root");
		assert!(itself.ptr_eq(&DataSource::Container(root.clone())));

		assert!(container_get(&root, &l("primvars/missing")).is_none());
		assert!(container_get(&root, &l("primvars/points/primvarValue/deeper")).is_none());
	}

	#[test]
	fn merged_sample_times() {
		let uniform = RetainedSampledDataSource::new(vt::Value::new(1.0f32));
		assert_eq!(
			merged_contributing_sample_times(&[uniform.clone()], -1.0, 1.0),
			None
		);

		let a = hd::RetainedTypedMultisampledDataSource::new([(-1.0, 1.0f32), (0.5, 2.0f32)]);
		let b = hd::RetainedTypedMultisampledDataSource::new([(0.5, 1.0f32), (1.0, 3.0f32)]);
		assert_eq!(
			merged_contributing_sample_times(&[a, uniform, b], -1.0, 1.0),
			Some(vec![-1.0, 0.5, 1.0])
		);
	}

	#[test]
	fn typed_cast_checks_value_type() {
		let source: DataSource = RetainedSampledDataSource::new(vt::Value::new(vec![1, 2])).into();
		assert!(TypedSampledDataSource::<vt::Array<i32>>::cast(Some(&source)).is_some());
		assert!(TypedSampledDataSource::<vt::Array<f32>>::cast(Some(&source)).is_none());
		assert!(TypedSampledDataSource::<f32>::cast(None).is_none());
	}
}
