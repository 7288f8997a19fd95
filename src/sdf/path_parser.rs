use crate::{sdf, tf};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathParseError {
	#[error("Empty path element at offset {offset} in \"{path}\"")]
	EmptyElement { path: String, offset: usize },
	#[error("Invalid character {found:?} at offset {offset} in \"{path}\"")]
	InvalidCharacter {
		path: String,
		offset: usize,
		found: char,
	},
}

fn is_identifier_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_'
}

/// Parses a prim path: `/`, `.`, `/A/B` or `A/B`.
pub fn parse_path(input: &str) -> Result<sdf::Path, PathParseError> {
	match input {
		"" => return Ok(sdf::Path::empty_path()),
		"/" => return Ok(sdf::Path::absolute_root_path()),
		"." => return Ok(sdf::Path::reflexive_relative_path()),
		_ => {}
	}

	let (mut path, body, mut offset) = match input.strip_prefix('/') {
		Some(rest) => (sdf::Path::absolute_root_path(), rest, 1),
		None => (sdf::Path::reflexive_relative_path(), input, 0),
	};

	for element in body.split('/') {
		if element.is_empty() {
			return Err(PathParseError::EmptyElement {
				path: input.to_string(),
				offset,
			});
		}

		if let Some((i, found)) = element.char_indices().find(|(_, c)| !is_identifier_char(*c)) {
			return Err(PathParseError::InvalidCharacter {
				path: input.to_string(),
				offset: offset + i,
				found,
			});
		}

		path = path.append_child(&tf::Token::new(element));
		offset += element.len() + 1;
	}

	Ok(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn valid_paths() {
		assert!(parse_path("").is_ok());
		assert!(parse_path(".").is_ok());
		assert!(parse_path("/").is_ok());
		assert!(parse_path("/root/prim").is_ok());
		assert!(parse_path("my_identifier").is_ok());
		assert!(parse_path("/World/__dependencies_target").is_ok());
	}

	#[test]
	fn invalid_paths() {
		assert_eq!(
			parse_path("/a//b"),
			Err(PathParseError::EmptyElement {
				path: "/a//b".into(),
				offset: 3,
			})
		);
		assert_eq!(
			parse_path("/a/b-c"),
			Err(PathParseError::InvalidCharacter {
				path: "/a/b-c".into(),
				offset: 4,
				found: '-',
			})
		);
		assert!(parse_path("/a/").is_err());
	}
}
