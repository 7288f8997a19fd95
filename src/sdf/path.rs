use super::path_node::*;
use crate::tf;

/// A path value used to locate prims in a scene index.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Path {
	pub(super) prim: PoolHandle,
}

impl Path {
	/// The empty path value.
	pub const fn empty_path() -> Self {
		Self {
			prim: INVALID_NODE_HANDLE,
		}
	}

	/// The absolute path representing the top of the namespace hierarchy.
	pub const fn absolute_root_path() -> Self {
		Self {
			prim: ABSOLUTE_ROOT_NODE_HANDLE,
		}
	}

	/// The relative path representing "self".
	pub const fn reflexive_relative_path() -> Self {
		Self {
			prim: RELATIVE_ROOT_NODE_HANDLE,
		}
	}
}

/// Querying paths.
impl Path {
	/// Returns true if this path is the [`Self::empty_path`].
	pub fn is_empty(&self) -> bool {
		*self == Self::empty_path()
	}

	/// Returns true if this path is the [`Self::absolute_root_path`].
	pub fn is_absolute_root(&self) -> bool {
		*self == Self::absolute_root_path()
	}

	pub fn is_absolute_path(&self) -> bool {
		let pool = PATH_PRIM_PART_POOL.read();
		pool.get(self.prim)
			.is_some_and(|node| node.is_absolute_path())
	}

	/// Returns whether the path identifies a prim.
	pub fn is_prim_path(&self) -> bool {
		!self.is_empty() && !self.is_absolute_root()
	}

	/// Number of name elements, the root counting as zero.
	pub fn element_count(&self) -> usize {
		let pool = PATH_PRIM_PART_POOL.read();
		pool.get(self.prim)
			.map_or(0, |node| node.element_count() as usize)
	}

	/// Return the path that identifies this path's namespace parent.
	///
	/// The parent of a root path is the empty path.
	pub fn parent_path(&self) -> Self {
		let pool = PATH_PRIM_PART_POOL.read();
		match pool.get(self.prim) {
			Some(node) => Self {
				prim: node.parent,
			},
			None => Self::empty_path(),
		}
	}

	/// Return a range for iterating over the ancestors of this path.
	///
	/// The range provides iteration over the prefixes of a path, ordered from longest to shortest.
	/// Starting with the path itself and ending with a single element path, not including the empty/root path.
	pub fn ancestors_range(&self) -> PathAncestorsRange {
		PathAncestorsRange { path: *self }
	}

	/// Returns the name of the prim identified by the path.
	pub fn name(&self) -> String {
		self.name_token().as_str().to_string()
	}

	pub fn name_token(&self) -> tf::Token {
		let pool = PATH_PRIM_PART_POOL.read();
		pool.get(self.prim)
			.map_or_else(tf::Token::empty, |node| node.name().clone())
	}

	/// Returns true if `prefix` is this path or one of its ancestors.
	///
	/// The empty path is never a prefix.
	pub fn has_prefix(&self, prefix: &Path) -> bool {
		if self.is_empty() || prefix.is_empty() {
			return false;
		}

		let pool = PATH_PRIM_PART_POOL.read();
		let (Some(node), Some(prefix_node)) = (pool.get(self.prim), pool.get(prefix.prim)) else {
			return false;
		};

		if node.element_count() < prefix_node.element_count() {
			return false;
		}

		pool.ancestor(self.prim, node.element_count() - prefix_node.element_count()) == prefix.prim
	}

	/// Longest path that is a prefix of both paths.
	pub fn common_prefix(&self, other: &Path) -> Path {
		let pool = PATH_PRIM_PART_POOL.read();
		let (Some(a), Some(b)) = (pool.get(self.prim), pool.get(other.prim)) else {
			return Path::empty_path();
		};

		if a.is_absolute_path() != b.is_absolute_path() {
			return Path::empty_path();
		}

		let count = a.element_count().min(b.element_count());
		let mut a = pool.ancestor(self.prim, a.element_count() - count);
		let mut b = pool.ancestor(other.prim, b.element_count() - count);
		while a != b {
			a = pool.ancestor(a, 1);
			b = pool.ancestor(b, 1);
		}

		Path { prim: a }
	}
}

/// Creating new paths by modifying existing paths.
impl Path {
	/// Creates a path by appending an element for `child_name` to this path.
	pub fn append_child(&self, child_name: &tf::Token) -> Self {
		if self.is_empty() || child_name.is_empty() {
			return Self::empty_path();
		}

		Self {
			prim: find_or_create_path_node(self.prim, child_name),
		}
	}

	/// Returns a path with `old_prefix` replaced by `new_prefix`, or this path unchanged if
	/// `old_prefix` is not a prefix of it.
	pub fn replace_prefix(&self, old_prefix: &Path, new_prefix: &Path) -> Self {
		if !self.has_prefix(old_prefix) {
			return *self;
		}

		if new_prefix.is_empty() {
			return Self::empty_path();
		}

		// One guard only: a second read could wait behind a queued writer.
		let names = {
			let pool = PATH_PRIM_PART_POOL.read();
			let skip = pool
				.get(old_prefix.prim)
				.map_or(0, |node| node.element_count() as usize);
			pool.names(self.prim).into_iter().skip(skip).collect::<Vec<_>>()
		};

		names
			.iter()
			.fold(*new_prefix, |path, name| path.append_child(name))
	}

	fn element_names(&self) -> Vec<tf::Token> {
		PATH_PRIM_PART_POOL.read().names(self.prim)
	}
}

impl Default for Path {
	fn default() -> Self {
		Self::empty_path()
	}
}

impl std::str::FromStr for Path {
	type Err = super::PathParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		super::path_parser::parse_path(s)
	}
}

impl From<&str> for Path {
	fn from(s: &str) -> Self {
		super::path_parser::parse_path(s).unwrap_or_else(|_| Self::empty_path())
	}
}

// Element-wise lexicographic, so a path sorts directly before its descendants.
impl Ord for Path {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		if self.prim == other.prim {
			return std::cmp::Ordering::Equal;
		}

		(self.is_empty(), !self.is_absolute_path(), self.element_names()).cmp(&(
			other.is_empty(),
			!other.is_absolute_path(),
			other.element_names(),
		))
	}
}

impl PartialOrd for Path {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::fmt::Display for Path {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		if self.is_empty() {
			return Ok(());
		}

		let absolute = self.is_absolute_path();
		let names = self.element_names();
		if names.is_empty() {
			return write!(f, "{}", if absolute { "/" } else { "." });
		}

		for (i, name) in names.iter().enumerate() {
			if absolute || i > 0 {
				write!(f, "/")?;
			}
			write!(f, "{name}")?;
		}
		Ok(())
	}
}

pub struct PathAncestorsRange {
	path: Path,
}

impl std::iter::Iterator for PathAncestorsRange {
	type Item = Path;

	fn next(&mut self) -> Option<Self::Item> {
		if self.path.element_count() == 0 {
			return None;
		}

		let current_path = self.path;
		self.path = self.path.parent_path();
		Some(current_path)
	}
}
