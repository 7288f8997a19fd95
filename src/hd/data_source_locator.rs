use crate::tf;
use smallvec::SmallVec;

/// A path into the nested data of a prim, such as `primvars/points/primvarValue`.
///
/// The empty locator addresses the whole prim. All operations return new locators.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataSourceLocator {
	tokens: SmallVec<[tf::Token; 6]>,
}

impl DataSourceLocator {
	pub fn new<I>(tokens: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<tf::Token>,
	{
		Self {
			tokens: tokens.into_iter().map(Into::into).collect(),
		}
	}

	pub fn empty_locator() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	pub fn element_count(&self) -> usize {
		self.tokens.len()
	}

	pub fn element(&self, i: usize) -> Option<&tf::Token> {
		self.tokens.get(i)
	}

	pub fn first_element(&self) -> Option<&tf::Token> {
		self.tokens.first()
	}

	pub fn last_element(&self) -> Option<&tf::Token> {
		self.tokens.last()
	}

	pub fn elements(&self) -> &[tf::Token] {
		&self.tokens
	}

	pub fn iter(&self) -> std::slice::Iter<'_, tf::Token> {
		self.tokens.iter()
	}

	/// Returns a locator with `name` replacing the last element, or this locator if empty.
	pub fn replace_last_element(&self, name: &tf::Token) -> Self {
		let mut result = self.clone();
		if let Some(last) = result.tokens.last_mut() {
			*last = name.clone();
		}
		result
	}

	pub fn remove_last_element(&self) -> Self {
		let mut result = self.clone();
		result.tokens.pop();
		result
	}

	pub fn remove_first_element(&self) -> Self {
		Self {
			tokens: self.tokens.iter().skip(1).cloned().collect(),
		}
	}

	pub fn append(&self, name: &tf::Token) -> Self {
		let mut result = self.clone();
		result.tokens.push(name.clone());
		result
	}

	pub fn append_locator(&self, locator: &DataSourceLocator) -> Self {
		let mut result = self.clone();
		result.tokens.extend(locator.tokens.iter().cloned());
		result
	}

	pub fn prepend(&self, name: &tf::Token) -> Self {
		let mut result = Self::default();
		result.tokens.reserve(self.tokens.len() + 1);
		result.tokens.push(name.clone());
		result.tokens.extend(self.tokens.iter().cloned());
		result
	}

	pub fn prepend_locator(&self, locator: &DataSourceLocator) -> Self {
		locator.append_locator(self)
	}

	/// True if `prefix` is a leading run of this locator. Every locator has the empty prefix.
	pub fn has_prefix(&self, prefix: &DataSourceLocator) -> bool {
		self.tokens.starts_with(&prefix.tokens)
	}

	pub fn common_prefix(&self, other: &DataSourceLocator) -> Self {
		Self {
			tokens: self
				.tokens
				.iter()
				.zip(other.tokens.iter())
				.take_while(|(a, b)| a == b)
				.map(|(a, _)| a.clone())
				.collect(),
		}
	}

	/// Returns this locator with `old_prefix` replaced by `new_prefix`, or unchanged if
	/// `old_prefix` is not a prefix.
	pub fn replace_prefix(
		&self,
		old_prefix: &DataSourceLocator,
		new_prefix: &DataSourceLocator,
	) -> Self {
		if !self.has_prefix(old_prefix) {
			return self.clone();
		}

		let mut result = new_prefix.clone();
		result
			.tokens
			.extend(self.tokens[old_prefix.tokens.len()..].iter().cloned());
		result
	}

	/// True if either locator is a prefix of the other.
	pub fn intersects(&self, other: &DataSourceLocator) -> bool {
		self.has_prefix(other) || other.has_prefix(self)
	}
}

impl From<&tf::Token> for DataSourceLocator {
	fn from(token: &tf::Token) -> Self {
		Self::new([token.clone()])
	}
}

impl From<&str> for DataSourceLocator {
	fn from(s: &str) -> Self {
		Self::new(s.split('/').filter(|segment| !segment.is_empty()))
	}
}

impl std::str::FromStr for DataSourceLocator {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::from(s))
	}
}

impl<'a> IntoIterator for &'a DataSourceLocator {
	type Item = &'a tf::Token;
	type IntoIter = std::slice::Iter<'a, tf::Token>;

	fn into_iter(self) -> Self::IntoIter {
		self.tokens.iter()
	}
}

impl std::fmt::Display for DataSourceLocator {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		for (i, token) in self.tokens.iter().enumerate() {
			if i > 0 {
				write!(f, "/")?;
			}
			write!(f, "{token}")?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for DataSourceLocator {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "DataSourceLocator({self})")
	}
}
