use crate::hd::{
	ContainerDataSource, ContainerDataSourceHandle, DataSource, SampledDataSource,
	SampledDataSourceHandle, Time, VectorDataSource, VectorDataSourceHandle,
};
use crate::{tf, vt};
use std::sync::Arc;

/// A container holding a fixed set of children.
pub struct RetainedContainerDataSource {
	entries: Vec<(tf::Token, DataSource)>,
}

impl RetainedContainerDataSource {
	/// Later entries replace earlier entries of the same name.
	pub fn new<I>(entries: I) -> ContainerDataSourceHandle
	where
		I: IntoIterator<Item = (tf::Token, DataSource)>,
	{
		let mut retained: Vec<(tf::Token, DataSource)> = Vec::new();
		for (name, data_source) in entries {
			match retained.iter_mut().find(|(existing, _)| *existing == name) {
				Some(entry) => entry.1 = data_source,
				None => retained.push((name, data_source)),
			}
		}
		Arc::new(Self { entries: retained })
	}

	pub fn empty() -> ContainerDataSourceHandle {
		Arc::new(Self {
			entries: Vec::new(),
		})
	}
}

impl ContainerDataSource for RetainedContainerDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.entries.iter().map(|(name, _)| name.clone()).collect()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		self.entries
			.iter()
			.find(|(entry, _)| entry == name)
			.map(|(_, data_source)| data_source.clone())
	}
}

/// A uniform value.
pub struct RetainedSampledDataSource {
	value: vt::Value,
}

impl RetainedSampledDataSource {
	pub fn new(value: vt::Value) -> SampledDataSourceHandle {
		Arc::new(Self { value })
	}
}

impl SampledDataSource for RetainedSampledDataSource {
	fn value(&self, _shutter_offset: Time) -> vt::Value {
		self.value.clone()
	}

	fn contributing_sample_times(&self, _start: Time, _end: Time) -> Option<Vec<Time>> {
		None
	}
}

/// A uniform value of a known type.
pub struct RetainedTypedSampledDataSource<T> {
	value: T,
}

impl<T> RetainedTypedSampledDataSource<T>
where
	T: vt::ValueType + Clone + Send + Sync + 'static,
{
	pub fn new(value: T) -> SampledDataSourceHandle {
		Arc::new(Self { value })
	}

	/// Shorthand for wrapping the handle as a [`DataSource`].
	pub fn data_source(value: T) -> DataSource {
		DataSource::Sampled(Self::new(value))
	}
}

impl<T> SampledDataSource for RetainedTypedSampledDataSource<T>
where
	T: vt::ValueType + Clone + Send + Sync,
{
	fn value(&self, _shutter_offset: Time) -> vt::Value {
		vt::Value::new(self.value.clone())
	}

	fn contributing_sample_times(&self, _start: Time, _end: Time) -> Option<Vec<Time>> {
		None
	}
}

/// A value authored at explicit sample times.
///
/// Evaluating between samples holds the latest sample at or before the requested offset.
/// Offsets before the first sample return the first sample.
pub struct RetainedTypedMultisampledDataSource {
	samples: Vec<(Time, vt::Value)>,
}

impl RetainedTypedMultisampledDataSource {
	pub fn new<I, T>(samples: I) -> SampledDataSourceHandle
	where
		I: IntoIterator<Item = (Time, T)>,
		T: Into<vt::Value>,
	{
		let mut samples: Vec<(Time, vt::Value)> = samples
			.into_iter()
			.map(|(time, value)| (time, value.into()))
			.collect();
		samples.sort_by(|a, b| a.0.total_cmp(&b.0));
		samples.dedup_by(|a, b| a.0 == b.0);
		Arc::new(Self { samples })
	}
}

impl SampledDataSource for RetainedTypedMultisampledDataSource {
	fn value(&self, shutter_offset: Time) -> vt::Value {
		let at_or_before = self
			.samples
			.partition_point(|(time, _)| *time <= shutter_offset);
		let index = at_or_before.saturating_sub(1);
		self.samples
			.get(index)
			.map(|(_, value)| value.clone())
			.unwrap_or_default()
	}

	/// Samples inside `[start, end]` plus the nearest samples outside it on either side. A
	/// single authored sample is reported too, so consumers can learn when it was authored.
	fn contributing_sample_times(&self, start: Time, end: Time) -> Option<Vec<Time>> {
		if self.samples.is_empty() {
			return None;
		}

		let first = self
			.samples
			.partition_point(|(time, _)| *time <= start)
			.saturating_sub(1);
		let last = self
			.samples
			.partition_point(|(time, _)| *time < end)
			.min(self.samples.len() - 1);

		Some(
			self.samples[first..=last.max(first)]
				.iter()
				.map(|(time, _)| *time)
				.collect(),
		)
	}
}

pub struct RetainedSmallVectorDataSource {
	elements: Vec<DataSource>,
}

impl RetainedSmallVectorDataSource {
	pub fn new<I>(elements: I) -> VectorDataSourceHandle
	where
		I: IntoIterator<Item = DataSource>,
	{
		Arc::new(Self {
			elements: elements.into_iter().collect(),
		})
	}
}

impl VectorDataSource for RetainedSmallVectorDataSource {
	fn num_elements(&self) -> usize {
		self.elements.len()
	}

	fn element(&self, index: usize) -> Option<DataSource> {
		self.elements.get(index).cloned()
	}
}
