use crate::hd::{
	self, MaterialBindingsSchema, PrimvarsSchema, PurposeSchema, SceneIndex, SceneIndexPrim,
	SceneIndexPrimView, VisibilitySchema,
};
use crate::{sdf, tf};

/// Result of evaluating a collection predicate on one prim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredicateResult {
	pub value: bool,
	/// False if descendants are known to evaluate to the same `value`.
	pub varying: bool,
}

impl PredicateResult {
	fn varying(value: bool) -> Self {
		Self {
			value,
			varying: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
	#[error("unknown predicate function `{0}`")]
	UnknownFunction(String),
	#[error("predicate function `{0}` requires an argument")]
	MissingArgument(&'static str),
	#[error("invalid argument `{argument}` to predicate function `{function}`")]
	InvalidArgument {
		function: &'static str,
		argument: String,
	},
}

/// Predicates over the prims of a scene index, for path expressions and collections.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionPredicate {
	/// `hdType(type)`: the prim has the given type.
	Type(tf::Token),
	/// `hdVisible(visibility = true)`: the prim's visibility equals the argument. A prim
	/// without a visibility opinion is visible.
	Visible(bool),
	/// `hdPurpose(purpose)`: the prim has the given purpose.
	Purpose(tf::Token),
	/// `hdHasDataSource(locator)`: the prim data source has data at the locator.
	HasDataSource(hd::DataSourceLocator),
	/// `hdHasPrimvar(name)`
	HasPrimvar(tf::Token),
	/// `hdHasMaterialBinding(substring)`: a material bound for any purpose has a path
	/// containing the substring.
	HasMaterialBinding(String),
}

impl CollectionPredicate {
	pub const FUNCTION_NAMES: [&'static str; 6] = [
		"hdType",
		"hdVisible",
		"hdPurpose",
		"hdHasDataSource",
		"hdHasPrimvar",
		"hdHasMaterialBinding",
	];

	/// Binds a predicate function by name.
	pub fn from_call(function: &str, argument: Option<&str>) -> Result<Self, PredicateError> {
		let required = |name: &'static str| argument.ok_or(PredicateError::MissingArgument(name));

		Ok(match function {
			"hdType" => Self::Type(tf::Token::new(required("hdType")?)),
			"hdVisible" => Self::Visible(match argument {
				None | Some("true") | Some("1") => true,
				Some("false") | Some("0") => false,
				Some(other) => {
					return Err(PredicateError::InvalidArgument {
						function: "hdVisible",
						argument: other.to_string(),
					});
				}
			}),
			"hdPurpose" => Self::Purpose(tf::Token::new(required("hdPurpose")?)),
			"hdHasDataSource" => {
				Self::HasDataSource(hd::DataSourceLocator::from(required("hdHasDataSource")?))
			}
			"hdHasPrimvar" => Self::HasPrimvar(tf::Token::new(required("hdHasPrimvar")?)),
			"hdHasMaterialBinding" => {
				Self::HasMaterialBinding(required("hdHasMaterialBinding")?.to_string())
			}
			other => return Err(PredicateError::UnknownFunction(other.to_string())),
		})
	}

	pub fn evaluate(&self, prim: &SceneIndexPrim) -> PredicateResult {
		let data_source = prim.data_source.as_ref();
		let value = match self {
			Self::Type(prim_type) => prim.prim_type == *prim_type,
			Self::Visible(visibility) => {
				VisibilitySchema::get_from_parent(data_source)
					.visibility()
					.unwrap_or(true) == *visibility
			}
			Self::Purpose(purpose) => {
				PurposeSchema::get_from_parent(data_source).purpose().as_ref() == Some(purpose)
			}
			Self::HasDataSource(locator) => hd::container_get_opt(data_source, locator).is_some(),
			Self::HasPrimvar(name) => PrimvarsSchema::get_from_parent(data_source)
				.primvar_names()
				.contains(name),
			Self::HasMaterialBinding(substring) => {
				let bindings = MaterialBindingsSchema::get_from_parent(data_source);
				bindings.purposes().iter().any(|purpose| {
					bindings
						.material_path(purpose)
						.is_some_and(|path| path.to_string().contains(substring.as_str()))
				})
			}
		};
		PredicateResult::varying(value)
	}
}

/// Paths at or below `root` whose prims satisfy `predicate`, in depth-first order.
pub fn matching_prim_paths(
	scene_index: &dyn SceneIndex,
	root: &sdf::Path,
	predicate: &CollectionPredicate,
) -> Vec<sdf::Path> {
	SceneIndexPrimView::new(scene_index, root)
		.filter(|path| predicate.evaluate(&scene_index.prim(path)).value)
		.collect()
}
