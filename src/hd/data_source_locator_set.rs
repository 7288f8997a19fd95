use crate::{hd, tf};
use smallvec::SmallVec;

/// A set of locators with no element being a prefix of another.
///
/// Inserting a locator drops the stored locators it covers, and inserting a locator that is
/// already covered is a no-op. Elements are kept sorted, so a locator's extensions are stored
/// contiguously right after where the locator itself would sort.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct DataSourceLocatorSet {
	locators: SmallVec<[hd::DataSourceLocator; 2]>,
}

impl DataSourceLocatorSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// The set containing the empty locator, which covers every locator.
	pub fn universal() -> Self {
		let mut set = Self::new();
		set.locators.push(hd::DataSourceLocator::empty_locator());
		set
	}

	pub fn is_universal(&self) -> bool {
		self.locators.first().is_some_and(|l| l.is_empty())
	}

	pub fn is_empty(&self) -> bool {
		self.locators.is_empty()
	}

	pub fn len(&self) -> usize {
		self.locators.len()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, hd::DataSourceLocator> {
		self.locators.iter()
	}

	pub fn insert(&mut self, locator: hd::DataSourceLocator) {
		let pos = match self.locators.binary_search(&locator) {
			Ok(_) => return,
			Err(pos) => pos,
		};

		if pos > 0 && locator.has_prefix(&self.locators[pos - 1]) {
			return;
		}

		let covered = self.locators[pos..]
			.iter()
			.take_while(|existing| existing.has_prefix(&locator))
			.count();
		self.locators.drain(pos..pos + covered);
		self.locators.insert(pos, locator);
	}

	pub fn insert_set(&mut self, other: &DataSourceLocatorSet) {
		if other.is_empty() {
			return;
		}

		if self.is_empty() {
			self.locators = other.locators.clone();
			return;
		}

		let mut merged = Self::new();
		let mut a = self.locators.iter().peekable();
		let mut b = other.locators.iter().peekable();
		loop {
			let next = match (a.peek(), b.peek()) {
				(Some(x), Some(y)) if x <= y => a.next(),
				(Some(_), Some(_)) => b.next(),
				(Some(_), None) => a.next(),
				(None, _) => b.next(),
			};
			let Some(next) = next else {
				break;
			};
			merged.push_sorted(next.clone());
		}

		*self = merged;
	}

	/// Insert that is cheap when locators arrive in non-decreasing order.
	///
	/// Out-of-order input is reported as a coding error in debug builds and falls back to a
	/// regular insert, so the set stays correct either way.
	pub fn append(&mut self, locator: hd::DataSourceLocator) {
		match self.locators.last() {
			Some(last) if locator < *last => {
				if cfg!(debug_assertions) {
					tf::coding_error!(
						"Locator {locator} appended after {last}, out of order"
					);
				}
				self.insert(locator);
			}
			_ => self.push_sorted(locator),
		}
	}

	fn push_sorted(&mut self, locator: hd::DataSourceLocator) {
		if let Some(last) = self.locators.last()
			&& locator.has_prefix(last)
		{
			return;
		}
		self.locators.push(locator);
	}

	/// True if some stored locator is a prefix of, or extends, `locator`.
	pub fn intersects(&self, locator: &hd::DataSourceLocator) -> bool {
		let pos = match self.locators.binary_search(locator) {
			Ok(_) => return true,
			Err(pos) => pos,
		};

		(pos > 0 && locator.has_prefix(&self.locators[pos - 1]))
			|| self
				.locators
				.get(pos)
				.is_some_and(|next| next.has_prefix(locator))
	}

	pub fn intersects_set(&self, other: &DataSourceLocatorSet) -> bool {
		if self.is_empty() || other.is_empty() {
			return false;
		}

		if self.is_universal() || other.is_universal() {
			return true;
		}

		let (small, large) = if self.len() <= other.len() {
			(self, other)
		} else {
			(other, self)
		};
		small.iter().any(|locator| large.intersects(locator))
	}

	/// True if some stored locator is a prefix of `locator`.
	pub fn contains(&self, locator: &hd::DataSourceLocator) -> bool {
		match self.locators.binary_search(locator) {
			Ok(_) => true,
			Err(pos) => pos > 0 && locator.has_prefix(&self.locators[pos - 1]),
		}
	}

	/// Locators of this set intersected with `locator`.
	///
	/// If the set contains a prefix of `locator`, yields `locator` alone. Otherwise yields the
	/// stored locators that extend `locator`.
	pub fn intersection<'a>(&'a self, locator: &'a hd::DataSourceLocator) -> Intersection<'a> {
		let pos = match self.locators.binary_search(locator) {
			Ok(_) => return Intersection::Single(Some(locator)),
			Err(pos) => pos,
		};

		if pos > 0 && locator.has_prefix(&self.locators[pos - 1]) {
			return Intersection::Single(Some(locator));
		}

		let end = self.locators[pos..]
			.iter()
			.take_while(|existing| existing.has_prefix(locator))
			.count();
		Intersection::Range(self.locators[pos..pos + end].iter())
	}

	/// Returns the set with `old_prefix` replaced by `new_prefix` in every locator.
	pub fn replace_prefix(
		&self,
		old_prefix: &hd::DataSourceLocator,
		new_prefix: &hd::DataSourceLocator,
	) -> Self {
		if self.is_empty() || !self.intersects(old_prefix) {
			return self.clone();
		}

		self.iter()
			.map(|locator| locator.replace_prefix(old_prefix, new_prefix))
			.collect()
	}
}

pub enum Intersection<'a> {
	Single(Option<&'a hd::DataSourceLocator>),
	Range(std::slice::Iter<'a, hd::DataSourceLocator>),
}

impl<'a> Iterator for Intersection<'a> {
	type Item = &'a hd::DataSourceLocator;

	fn next(&mut self) -> Option<Self::Item> {
		match self {
			Intersection::Single(locator) => locator.take(),
			Intersection::Range(iter) => iter.next(),
		}
	}
}

impl From<hd::DataSourceLocator> for DataSourceLocatorSet {
	fn from(locator: hd::DataSourceLocator) -> Self {
		let mut set = Self::new();
		set.locators.push(locator);
		set
	}
}

impl FromIterator<hd::DataSourceLocator> for DataSourceLocatorSet {
	fn from_iter<I: IntoIterator<Item = hd::DataSourceLocator>>(iter: I) -> Self {
		let mut set = Self::new();
		for locator in iter {
			set.insert(locator);
		}
		set
	}
}

impl Extend<hd::DataSourceLocator> for DataSourceLocatorSet {
	fn extend<I: IntoIterator<Item = hd::DataSourceLocator>>(&mut self, iter: I) {
		for locator in iter {
			self.insert(locator);
		}
	}
}

impl<'a> IntoIterator for &'a DataSourceLocatorSet {
	type Item = &'a hd::DataSourceLocator;
	type IntoIter = std::slice::Iter<'a, hd::DataSourceLocator>;

	fn into_iter(self) -> Self::IntoIter {
		self.locators.iter()
	}
}

impl std::fmt::Display for DataSourceLocatorSet {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{{")?;
		for (i, locator) in self.locators.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{locator}")?;
		}
		write!(f, "}}")
	}
}

impl std::fmt::Debug for DataSourceLocatorSet {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "DataSourceLocatorSet{self}")
	}
}
