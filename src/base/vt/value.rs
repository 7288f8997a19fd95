use crate::{gf, hd, sdf, tf, vt};
use half::f16;
use std::collections::HashMap;

pub type Array<T> = Vec<T>;
pub type Dictionary = HashMap<String, vt::Value>;

/// Type-erased value held by sampled data sources.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
	store: ValueStore,
}

impl Value {
	pub fn new<T: ValueType>(value: T) -> Self {
		Value {
			store: value.store(),
		}
	}

	pub fn empty() -> Self {
		Value {
			store: ValueStore::Empty,
		}
	}

	pub fn is_empty(&self) -> bool {
		matches!(self.store, ValueStore::Empty)
	}

	pub fn get<T: ValueType>(&self) -> Option<T> {
		T::load(&self.store)
	}

	pub fn is_holding<T: ValueType>(&self) -> bool {
		T::holds(&self.store)
	}

	pub fn store(&self) -> &ValueStore {
		&self.store
	}

	/// Number of elements if the value holds an array.
	pub fn array_size(&self) -> Option<usize> {
		match &self.store {
			ValueStore::BoolArray(v) => Some(v.len()),
			ValueStore::IntArray(v) => Some(v.len()),
			ValueStore::FloatArray(v) => Some(v.len()),
			ValueStore::DoubleArray(v) => Some(v.len()),
			ValueStore::Vec3fArray(v) => Some(v.len()),
			ValueStore::Vec3dArray(v) => Some(v.len()),
			ValueStore::Vec4fArray(v) => Some(v.len()),
			ValueStore::QuathArray(v) => Some(v.len()),
			ValueStore::QuatfArray(v) => Some(v.len()),
			ValueStore::TokenArray(v) => Some(v.len()),
			ValueStore::StringArray(v) => Some(v.len()),
			ValueStore::PathArray(v) => Some(v.len()),
			_ => None,
		}
	}
}

impl Default for Value {
	fn default() -> Self {
		Self::empty()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueStore {
	Empty,

	Bool(bool),
	BoolArray(Array<bool>),

	Int(i32),
	IntArray(Array<i32>),

	Half(f16),
	Float(f32),
	FloatArray(Array<f32>),
	Double(f64),
	DoubleArray(Array<f64>),

	Vec2f(gf::Vec2f),

	Vec3f(gf::Vec3f),
	Vec3fArray(Array<gf::Vec3f>),
	Vec3d(gf::Vec3d),
	Vec3dArray(Array<gf::Vec3d>),

	Vec4f(gf::Vec4f),
	Vec4fArray(Array<gf::Vec4f>),

	Quath(gf::Quath),
	QuathArray(Array<gf::Quath>),
	Quatf(gf::Quatf),
	QuatfArray(Array<gf::Quatf>),

	Token(tf::Token),
	TokenArray(Array<tf::Token>),

	String(String),
	StringArray(Array<String>),

	Path(sdf::Path),
	PathArray(Array<sdf::Path>),

	DataSourceLocator(hd::DataSourceLocator),

	Dictionary(Dictionary),
}

pub trait ValueType {
	fn load(store: &ValueStore) -> Option<Self>
	where
		Self: Sized;
	fn holds(store: &ValueStore) -> bool;
	fn store(self) -> ValueStore;
}

macro_rules! impl_value_type_clone {
	($type:ty, $store:ident) => {
		impl ValueType for $type {
			fn load(store: &ValueStore) -> Option<Self> {
				match store {
					ValueStore::$store(v) => Some(v.clone()),
					_ => None,
				}
			}

			fn holds(store: &ValueStore) -> bool {
				matches!(store, ValueStore::$store(_))
			}

			fn store(self) -> ValueStore {
				ValueStore::$store(self)
			}
		}

		impl From<$type> for Value {
			fn from(value: $type) -> Self {
				Value {
					store: ValueStore::$store(value),
				}
			}
		}
	};
}

macro_rules! impl_value_type_deref {
	($type:ty, $store:ident) => {
		impl ValueType for $type {
			fn load(store: &ValueStore) -> Option<Self> {
				match store {
					ValueStore::$store(v) => Some(*v),
					_ => None,
				}
			}

			fn holds(store: &ValueStore) -> bool {
				matches!(store, ValueStore::$store(_))
			}

			fn store(self) -> ValueStore {
				ValueStore::$store(self)
			}
		}

		impl From<$type> for Value {
			fn from(value: $type) -> Self {
				Value {
					store: ValueStore::$store(value),
				}
			}
		}
	};
}

impl_value_type_deref!(bool, Bool);
impl_value_type_clone!(Array<bool>, BoolArray);

impl_value_type_deref!(i32, Int);
impl_value_type_clone!(Array<i32>, IntArray);

impl_value_type_deref!(f16, Half);
impl_value_type_deref!(f32, Float);
impl_value_type_clone!(Array<f32>, FloatArray);
impl_value_type_deref!(f64, Double);
impl_value_type_clone!(Array<f64>, DoubleArray);

impl_value_type_deref!(gf::Vec2f, Vec2f);

impl_value_type_deref!(gf::Vec3f, Vec3f);
impl_value_type_clone!(Array<gf::Vec3f>, Vec3fArray);
impl_value_type_deref!(gf::Vec3d, Vec3d);
impl_value_type_clone!(Array<gf::Vec3d>, Vec3dArray);

impl_value_type_deref!(gf::Vec4f, Vec4f);
impl_value_type_clone!(Array<gf::Vec4f>, Vec4fArray);

impl_value_type_deref!(gf::Quath, Quath);
impl_value_type_clone!(Array<gf::Quath>, QuathArray);
impl_value_type_deref!(gf::Quatf, Quatf);
impl_value_type_clone!(Array<gf::Quatf>, QuatfArray);

impl_value_type_clone!(tf::Token, Token);
impl_value_type_clone!(Array<tf::Token>, TokenArray);

impl_value_type_clone!(String, String);
impl_value_type_clone!(Array<String>, StringArray);

impl_value_type_clone!(sdf::Path, Path);
impl_value_type_clone!(Array<sdf::Path>, PathArray);

impl_value_type_clone!(hd::DataSourceLocator, DataSourceLocator);

impl_value_type_clone!(Dictionary, Dictionary);

fn write_array<T: std::fmt::Display>(
	f: &mut std::fmt::Formatter,
	values: &[T],
) -> std::fmt::Result {
	write!(f, "[")?;
	for (i, value) in values.iter().enumerate() {
		if i > 0 {
			write!(f, ", ")?;
		}
		write!(f, "{value}")?;
	}
	write!(f, "]")
}

impl std::fmt::Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match &self.store {
			ValueStore::Empty => write!(f, "<empty>"),
			ValueStore::Bool(v) => write!(f, "{v}"),
			ValueStore::BoolArray(v) => write_array(f, v),
			ValueStore::Int(v) => write!(f, "{v}"),
			ValueStore::IntArray(v) => write_array(f, v),
			ValueStore::Half(v) => write!(f, "{v}"),
			ValueStore::Float(v) => write!(f, "{v}"),
			ValueStore::FloatArray(v) => write_array(f, v),
			ValueStore::Double(v) => write!(f, "{v}"),
			ValueStore::DoubleArray(v) => write_array(f, v),
			ValueStore::Vec2f(v) => write!(f, "{v}"),
			ValueStore::Vec3f(v) => write!(f, "{v}"),
			ValueStore::Vec3fArray(v) => write_array(f, v),
			ValueStore::Vec3d(v) => write!(f, "{v}"),
			ValueStore::Vec3dArray(v) => write_array(f, v),
			ValueStore::Vec4f(v) => write!(f, "{v}"),
			ValueStore::Vec4fArray(v) => write_array(f, v),
			ValueStore::Quath(v) => write!(f, "{v}"),
			ValueStore::QuathArray(v) => write_array(f, v),
			ValueStore::Quatf(v) => write!(f, "{v}"),
			ValueStore::QuatfArray(v) => write_array(f, v),
			ValueStore::Token(v) => write!(f, "{v}"),
			ValueStore::TokenArray(v) => write_array(f, v),
			ValueStore::String(v) => write!(f, "{v}"),
			ValueStore::StringArray(v) => write_array(f, v),
			ValueStore::Path(v) => write!(f, "{v}"),
			ValueStore::PathArray(v) => write_array(f, v),
			ValueStore::DataSourceLocator(v) => write!(f, "{v}"),
			ValueStore::Dictionary(v) => {
				let mut keys: Vec<&String> = v.keys().collect();
				keys.sort();
				write!(f, "{{")?;
				for (i, key) in keys.into_iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{key}: {}", v[key])?;
				}
				write!(f, "}}")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn load_matching_type_only() {
		let value = Value::new(vec![gf::Vec3f::new(1.0, 2.0, 3.0)]);
		assert!(value.is_holding::<Array<gf::Vec3f>>());
		assert_eq!(value.array_size(), Some(1));
		assert_eq!(value.get::<Array<gf::Quatf>>(), None);
		assert_eq!(
			value.get::<Array<gf::Vec3f>>(),
			Some(vec![gf::Vec3f::new(1.0, 2.0, 3.0)])
		);
	}

	#[test]
	fn display() {
		assert_eq!(Value::new(1.5f32).to_string(), "1.5");
		assert_eq!(Value::from(tf::Token::new("constant")).to_string(), "constant");
		assert_eq!(Value::new(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
		assert_eq!(
			Value::new(gf::Vec3f::new(1.0, 0.0, 0.5)).to_string(),
			"(1, 0, 0.5)"
		);
		assert_eq!(Value::empty().to_string(), "<empty>");
	}
}
