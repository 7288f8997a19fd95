use crate::{declare_public_tokens, tf};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::LazyLock;

declare_public_tokens!(PathTokens, PATH_TOKENS, [
	empty: "",
	absolute_indicator: "/",
	relative_root: ".",
]);

pub type PoolHandle = u32;

pub const ABSOLUTE_ROOT_NODE_HANDLE: PoolHandle = 0;
pub const RELATIVE_ROOT_NODE_HANDLE: PoolHandle = 1;
pub const INVALID_NODE_HANDLE: PoolHandle = u32::MAX;

pub struct PathNode {
	pub parent: PoolHandle,
	element_count: u16,
	flags: u8,
	name: tf::Token,
}

impl PathNode {
	pub const IS_ABSOLUTE_FLAG: u8 = 1 << 0;

	pub fn is_absolute_path(&self) -> bool {
		self.flags & Self::IS_ABSOLUTE_FLAG != 0
	}

	pub fn element_count(&self) -> u16 {
		self.element_count
	}

	pub fn name(&self) -> &tf::Token {
		if self.element_count == 0 {
			if self.is_absolute_path() {
				&PATH_TOKENS.absolute_indicator
			} else {
				&PATH_TOKENS.relative_root
			}
		} else {
			&self.name
		}
	}
}

/// Interned prim path nodes. Every distinct path maps to exactly one handle, so path equality
/// is handle equality.
pub struct Pool {
	nodes: Vec<PathNode>,
	index: HashMap<(PoolHandle, tf::Token), PoolHandle>,
}

impl Pool {
	pub fn get(&self, handle: PoolHandle) -> Option<&PathNode> {
		self.nodes.get(handle as usize)
	}

	/// Names from the root down to `handle`, root excluded.
	pub fn names(&self, handle: PoolHandle) -> Vec<tf::Token> {
		let mut names = Vec::new();
		let mut cur = handle;
		while let Some(node) = self.get(cur) {
			if node.element_count == 0 {
				break;
			}
			names.push(node.name.clone());
			cur = node.parent;
		}
		names.reverse();
		names
	}

	/// Walks `count` parents up from `handle`.
	pub fn ancestor(&self, handle: PoolHandle, count: u16) -> PoolHandle {
		let mut cur = handle;
		for _ in 0..count {
			match self.get(cur) {
				Some(node) => cur = node.parent,
				None => return INVALID_NODE_HANDLE,
			}
		}
		cur
	}
}

pub static PATH_PRIM_PART_POOL: LazyLock<RwLock<Pool>> = LazyLock::new(|| {
	let nodes = vec![
		PathNode {
			parent: INVALID_NODE_HANDLE,
			element_count: 0,
			flags: PathNode::IS_ABSOLUTE_FLAG,
			name: tf::Token::empty(),
		},
		PathNode {
			parent: INVALID_NODE_HANDLE,
			element_count: 0,
			flags: 0,
			name: tf::Token::empty(),
		},
	];

	RwLock::new(Pool {
		nodes,
		index: HashMap::new(),
	})
});

pub fn find_or_create_path_node(parent: PoolHandle, name: &tf::Token) -> PoolHandle {
	if let Some(handle) = PATH_PRIM_PART_POOL
		.read()
		.index
		.get(&(parent, name.clone()))
	{
		return *handle;
	}

	let mut pool = PATH_PRIM_PART_POOL.write();

	// Another writer may have won the race between the two locks.
	if let Some(handle) = pool.index.get(&(parent, name.clone())) {
		return *handle;
	}

	let Some(parent_node) = pool.get(parent) else {
		return INVALID_NODE_HANDLE;
	};

	let node = PathNode {
		parent,
		element_count: parent_node.element_count + 1,
		flags: parent_node.flags,
		name: name.clone(),
	};

	let handle = pool.nodes.len() as PoolHandle;
	pool.nodes.push(node);
	pool.index.insert((parent, name.clone()), handle);
	handle
}
