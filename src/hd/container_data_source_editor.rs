use crate::hd::{
	self, ContainerDataSourceHandle, DataSource, OverlayContainerDataSource,
	RetainedContainerDataSource,
};
use crate::tf;

#[derive(Default)]
struct Node {
	/// A value set at this locator, replacing everything below it.
	value: Option<DataSource>,
	/// When set, the node starts from `base` instead of the corresponding child of the
	/// container being edited.
	replaces_base: bool,
	base: Option<ContainerDataSourceHandle>,
	/// Strongest first. Weaker than `children`.
	overlays: Vec<ContainerDataSourceHandle>,
	children: Vec<(tf::Token, Node)>,
}

impl Node {
	fn child_mut(&mut self, name: &tf::Token) -> &mut Node {
		let index = match self.children.iter().position(|(n, _)| n == name) {
			Some(index) => index,
			None => {
				self.children.push((name.clone(), Node::default()));
				self.children.len() - 1
			}
		};
		&mut self.children[index].1
	}

	/// Turns a node holding a value into one that edits it.
	fn edit(&mut self) -> &mut Node {
		if let Some(value) = self.value.take() {
			self.replaces_base = true;
			self.base = value.into_container();
		}
		self
	}

	fn build_data_source(&self, original: Option<&ContainerDataSourceHandle>) -> DataSource {
		match &self.value {
			Some(value) => value.clone(),
			None => DataSource::Container(self.build(original)),
		}
	}

	fn build(&self, original: Option<&ContainerDataSourceHandle>) -> ContainerDataSourceHandle {
		let base = if self.replaces_base {
			self.base.clone()
		} else {
			original.cloned()
		};

		let children = self.children.iter().map(|(name, node)| {
			let original_child = base
				.as_ref()
				.and_then(|b| b.get(name))
				.and_then(DataSource::into_container);
			(name.clone(), node.build_data_source(original_child.as_ref()))
		});

		let mut layers = vec![RetainedContainerDataSource::new(children)];
		layers.extend(self.overlays.iter().cloned());
		layers.extend(base);

		if layers.len() == 1 {
			layers.remove(0)
		} else {
			OverlayContainerDataSource::new(layers)
		}
	}
}

/// Builds a new container from an optional initial container plus edits at locators.
///
/// The initial container is never modified. Setting `None` blocks the value at a locator.
pub struct ContainerDataSourceEditor {
	initial: Option<ContainerDataSourceHandle>,
	root: Node,
}

impl ContainerDataSourceEditor {
	pub fn new(initial: Option<ContainerDataSourceHandle>) -> Self {
		Self {
			initial,
			root: Node::default(),
		}
	}

	pub fn set(
		&mut self,
		locator: &hd::DataSourceLocator,
		data_source: Option<DataSource>,
	) -> &mut Self {
		let Some(last) = locator.last_element() else {
			tf::coding_error!("Cannot set a data source at the empty locator");
			return self;
		};

		let mut node = &mut self.root;
		for name in locator.remove_last_element().iter() {
			node = node.child_mut(name).edit();
		}

		*node.child_mut(last) = Node {
			value: Some(data_source.unwrap_or(DataSource::Block)),
			..Node::default()
		};
		self
	}

	/// Overlays `container` over whatever is at `locator`.
	pub fn overlay(
		&mut self,
		locator: &hd::DataSourceLocator,
		container: ContainerDataSourceHandle,
	) -> &mut Self {
		let mut node = &mut self.root;
		for name in locator {
			node = node.child_mut(name).edit();
		}
		node.overlays.insert(0, container);
		self
	}

	pub fn finish(&self) -> ContainerDataSourceHandle {
		self.root.build(self.initial.as_ref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::RetainedTypedSampledDataSource;
	use crate::vt;

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn l(s: &str) -> hd::DataSourceLocator {
		hd::DataSourceLocator::from(s)
	}

	fn value(container: &ContainerDataSourceHandle, locator: &str) -> Option<vt::Value> {
		hd::sampled_value_at(Some(container), &l(locator))
	}

	#[test]
	fn set_nested_over_initial() {
		let initial = RetainedContainerDataSource::new([(
			t("a"),
			RetainedContainerDataSource::new([
				(t("x"), RetainedTypedSampledDataSource::data_source(1)),
				(t("y"), RetainedTypedSampledDataSource::data_source(2)),
			])
			.into(),
		)]);

		let edited = ContainerDataSourceEditor::new(Some(initial.clone()))
			.set(&l("a/x"), Some(RetainedTypedSampledDataSource::data_source(10)))
			.set(&l("b/c"), Some(RetainedTypedSampledDataSource::data_source(3)))
			.finish();

		assert_eq!(value(&edited, "a/x"), Some(vt::Value::new(10)));
		assert_eq!(value(&edited, "a/y"), Some(vt::Value::new(2)));
		assert_eq!(value(&edited, "b/c"), Some(vt::Value::new(3)));
		assert_eq!(value(&initial, "a/x"), Some(vt::Value::new(1)));
	}

	#[test]
	fn set_none_blocks() {
		let initial = RetainedContainerDataSource::new([(
			t("a"),
			RetainedTypedSampledDataSource::data_source(1),
		)]);
		let edited = ContainerDataSourceEditor::new(Some(initial))
			.set(&l("a"), None)
			.finish();
		assert!(edited.get(&t("a")).is_some_and(|ds| ds.is_block()));
	}

	#[test]
	fn set_below_replaced_value() {
		let mut editor = ContainerDataSourceEditor::new(None);
		editor.set(
			&l("a"),
			Some(
				RetainedContainerDataSource::new([(
					t("y"),
					RetainedTypedSampledDataSource::data_source(2),
				)])
				.into(),
			),
		);
		editor.set(&l("a/x"), Some(RetainedTypedSampledDataSource::data_source(1)));
		let edited = editor.finish();
		assert_eq!(value(&edited, "a/x"), Some(vt::Value::new(1)));
		assert_eq!(value(&edited, "a/y"), Some(vt::Value::new(2)));
	}

	#[test]
	fn overlay_at_locator() {
		let initial = RetainedContainerDataSource::new([(
			t("a"),
			RetainedContainerDataSource::new([
				(t("x"), RetainedTypedSampledDataSource::data_source(1)),
				(t("y"), RetainedTypedSampledDataSource::data_source(2)),
			])
			.into(),
		)]);
		let edited = ContainerDataSourceEditor::new(Some(initial))
			.overlay(
				&l("a"),
				RetainedContainerDataSource::new([(
					t("x"),
					RetainedTypedSampledDataSource::data_source(5),
				)]),
			)
			.finish();
		assert_eq!(value(&edited, "a/x"), Some(vt::Value::new(5)));
		assert_eq!(value(&edited, "a/y"), Some(vt::Value::new(2)));
	}
}
