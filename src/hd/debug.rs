use crate::hd::{DataSource, SceneIndex, SceneIndexPrimView};
use crate::sdf;
use std::io::{self, Write};

fn write_indent(writer: &mut dyn Write, indent: usize) -> io::Result<()> {
	write!(writer, "{:width$}", "", width = indent * 2)
}

/// Writes a data source tree, one line per node.
///
/// Container children are listed by sorted name under `[name]` headers and vector elements
/// under `[index]` headers, each one level deeper. Sampled data sources print their value at
/// offset zero. A missing data source prints `NULL` and a block prints `UNKNOWN`.
pub fn debug_print_data_source(
	writer: &mut dyn Write,
	data_source: Option<&DataSource>,
	indent: usize,
) -> io::Result<()> {
	match data_source {
		None => {
			write_indent(writer, indent)?;
			writeln!(writer, "NULL")
		}
		Some(DataSource::Container(container)) => {
			let mut names = container.names();
			names.sort();
			for name in names {
				write_indent(writer, indent)?;
				writeln!(writer, "[{name}]")?;
				debug_print_data_source(writer, container.get(&name).as_ref(), indent + 1)?;
			}
			Ok(())
		}
		Some(DataSource::Vector(vector)) => {
			for i in 0..vector.num_elements() {
				write_indent(writer, indent)?;
				writeln!(writer, "[{i}]")?;
				debug_print_data_source(writer, vector.element(i).as_ref(), indent + 1)?;
			}
			Ok(())
		}
		Some(DataSource::Sampled(sampled)) => {
			write_indent(writer, indent)?;
			writeln!(writer, "{}", sampled.value(0.0))
		}
		Some(DataSource::Block) => {
			write_indent(writer, indent)?;
			writeln!(writer, "UNKNOWN")
		}
	}
}

/// Writes every prim at and below `root` as `<path> (<type>)` followed by its data source.
pub fn debug_print_scene_index(
	writer: &mut dyn Write,
	scene_index: &dyn SceneIndex,
	root: &sdf::Path,
) -> io::Result<()> {
	for path in SceneIndexPrimView::new(scene_index, root) {
		let prim = scene_index.prim(&path);
		writeln!(writer, "{path} ({})", prim.prim_type)?;
		if let Some(data_source) = prim.data_source {
			debug_print_data_source(writer, Some(&DataSource::Container(data_source)), 1)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hd::{
		ContainerDataSourceEditor, RetainedAddedPrimEntry, RetainedContainerDataSource,
		RetainedSceneIndex, RetainedSmallVectorDataSource, RetainedTypedSampledDataSource,
	};
	use crate::tf;

	fn t(s: &str) -> tf::Token {
		tf::Token::new(s)
	}

	fn print(data_source: Option<&DataSource>) -> String {
		let mut out = Vec::new();
		debug_print_data_source(&mut out, data_source, 0).expect("write to vec");
		String::from_utf8(out).expect("utf-8")
	}

	#[test]
	fn prints_sorted_tree() {
		let container = RetainedContainerDataSource::new([
			(t("zeta"), RetainedTypedSampledDataSource::data_source(2i32)),
			(
				t("alpha"),
				DataSource::Vector(RetainedSmallVectorDataSource::new([
					RetainedTypedSampledDataSource::data_source(true),
					DataSource::Block,
				])),
			),
		]);
		assert_eq!(
			print(Some(&DataSource::Container(container))),
			"[alpha]\n  [0]\n    true\n  [1]\n    UNKNOWN\n[zeta]\n  2\n"
		);
		assert_eq!(print(None), "NULL\n");
	}

	#[test]
	fn printing_is_deterministic() {
		let mut editor = ContainerDataSourceEditor::new(None);
		editor.set(
			&"b/c".into(),
			Some(RetainedTypedSampledDataSource::data_source(1.5f32)),
		);
		editor.set(&"a".into(), Some(RetainedTypedSampledDataSource::data_source(t("x"))));
		let container = DataSource::Container(editor.finish());
		assert_eq!(print(Some(&container)), print(Some(&container)));
		assert_eq!(print(Some(&container)), "[a]\n  x\n[b]\n  [c]\n    1.5\n");
	}

	#[test]
	fn prints_scene() {
		let scene = RetainedSceneIndex::new();
		scene.add_prims(&[RetainedAddedPrimEntry::new(
			sdf::Path::from("/A"),
			t("mesh"),
			Some(RetainedContainerDataSource::new([(
				t("size"),
				RetainedTypedSampledDataSource::data_source(2i32),
			)])),
		)]);
		let mut out = Vec::new();
		debug_print_scene_index(&mut out, &*scene, &sdf::Path::from("/A")).expect("write to vec");
		assert_eq!(String::from_utf8(out).expect("utf-8"), "/A (mesh)\n  [size]\n    2\n");
	}
}
