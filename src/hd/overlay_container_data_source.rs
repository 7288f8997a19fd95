use crate::hd::{ContainerDataSource, ContainerDataSourceHandle, DataSource};
use crate::tf;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;

/// Layers several containers, strongest first.
///
/// Children that are containers in several layers are overlaid recursively. Any other child,
/// including a block, is taken from the strongest layer providing it and hides weaker layers.
pub struct OverlayContainerDataSource {
	containers: SmallVec<[ContainerDataSourceHandle; 4]>,
}

impl OverlayContainerDataSource {
	pub fn new<I>(containers: I) -> ContainerDataSourceHandle
	where
		I: IntoIterator<Item = ContainerDataSourceHandle>,
	{
		Arc::new(Self {
			containers: containers.into_iter().collect(),
		})
	}

	/// Overlays `stronger` over `weaker`, skipping the overlay if either is missing.
	pub fn overlaid(
		stronger: Option<ContainerDataSourceHandle>,
		weaker: Option<ContainerDataSourceHandle>,
	) -> Option<ContainerDataSourceHandle> {
		match (stronger, weaker) {
			(Some(stronger), Some(weaker)) => Some(Self::new([stronger, weaker])),
			(stronger, weaker) => stronger.or(weaker),
		}
	}
}

impl ContainerDataSource for OverlayContainerDataSource {
	fn names(&self) -> Vec<tf::Token> {
		let mut seen = HashSet::new();
		let mut names = Vec::new();
		for container in &self.containers {
			for name in container.names() {
				if seen.insert(name.clone()) {
					names.push(name);
				}
			}
		}
		names
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let mut child_containers: SmallVec<[ContainerDataSourceHandle; 4]> = SmallVec::new();
		for container in &self.containers {
			let Some(child) = container.get(name) else {
				continue;
			};
			match child {
				DataSource::Container(child_container) => child_containers.push(child_container),
				other if child_containers.is_empty() => return Some(other),
				_ => break,
			}
		}

		match child_containers.len() {
			0 => None,
			1 => child_containers.pop().map(DataSource::Container),
			_ => Some(DataSource::Container(Arc::new(Self {
				containers: child_containers,
			}))),
		}
	}
}
