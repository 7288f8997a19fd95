use dashmap::DashSet;
use std::sync::{Arc, LazyLock};

static REGISTRY: LazyLock<DashSet<Arc<str>>> = LazyLock::new(DashSet::new);

/// Token for efficient comparison, assignment, and hashing of known strings.
///
/// Tokens are interned in a process-wide registry, so cloning a token is a reference count bump
/// and comparing two tokens usually resolves on the pointer.
#[derive(Clone)]
pub struct Token {
	data: Arc<str>,
}

impl Token {
	pub fn new(name: impl AsRef<str>) -> Self {
		let name = name.as_ref();
		if let Some(existing) = REGISTRY.get(name) {
			return Token {
				data: existing.key().clone(),
			};
		}

		let data: Arc<str> = Arc::from(name);
		REGISTRY.insert(data.clone());
		Token { data }
	}

	pub fn empty() -> Self {
		Self::new("")
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn as_str(&self) -> &str {
		&self.data
	}
}

impl Default for Token {
	fn default() -> Self {
		Self::empty()
	}
}

impl PartialEq for Token {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.data, &other.data) || self.data == other.data
	}
}

impl Eq for Token {}

impl PartialOrd for Token {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Token {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.as_str().cmp(other.as_str())
	}
}

impl std::hash::Hash for Token {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.as_str().hash(state);
	}
}

impl std::borrow::Borrow<str> for Token {
	fn borrow(&self) -> &str {
		self.as_str()
	}
}

impl From<&str> for Token {
	fn from(name: &str) -> Self {
		Token::new(name)
	}
}

impl From<String> for Token {
	fn from(name: String) -> Self {
		Token::new(name)
	}
}

impl std::fmt::Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}", self.data)
	}
}

impl std::fmt::Debug for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{:?}", &*self.data)
	}
}

macro_rules! declare_public_tokens {
	($struct:ident, $static:ident, [$($name:ident: $value:expr),* $(,)?]) => {
		pub struct $struct {
			$(pub $name: $crate::tf::Token,)*
		}

		pub static $static: std::sync::LazyLock<$struct> = std::sync::LazyLock::new(|| {
			$struct {
				$($name: $crate::tf::Token::new($value),)*
			}
		});
	};
}

pub(crate) use declare_public_tokens;
