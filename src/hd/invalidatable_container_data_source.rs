use crate::hd;

/// A container that memoizes computed children.
pub trait InvalidatableContainerDataSource: hd::ContainerDataSource {
	/// Discards memoized children affected by `dirty_locators`, which are relative to this
	/// container. Returns true if anything was discarded.
	fn invalidate(&self, dirty_locators: &hd::DataSourceLocatorSet) -> bool;
}
