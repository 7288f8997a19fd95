use crate::hd::{
	self, AddedPrimEntry, ContainerDataSource, ContainerDataSourceHandle, DataSource,
	DirtiedPrimEntry, PrimvarsSchema, RemovedPrimEntry, SampledDataSource,
	SampledDataSourceHandle, SceneIndex, SceneIndexBase, SceneIndexHandle, SceneIndexPrim,
	SingleInputFilteringSceneIndex, SingleInputFilteringSceneIndexBase, Time,
	PRIMVARS_SCHEMA_TOKENS, PRIMVAR_SCHEMA_TOKENS, PRIM_TYPE_TOKENS,
};
use crate::{declare_public_tokens, gf, sdf, tf, vt};
use std::sync::{Arc, LazyLock};

declare_public_tokens!(VelocityMotionResolvingSceneIndexTokens, VELOCITY_MOTION_RESOLVING_SCENE_INDEX_TOKENS, [
	fps: "fps",
	velocity_motion_mode: "__velocityMotionMode",

	enable: "enable",
	disable: "disable",
	ignore: "ignore",
	no_acceleration: "noAcceleration",
]);

/// Frames per second used when `input_args` has no `fps`.
pub const DEFAULT_FPS: f32 = 24.0;

/// Samples reported over a shutter interval for motion with accelerations, unless the
/// prim authors `nonlinearSampleCount`.
pub const DEFAULT_NONLINEAR_SAMPLE_COUNT: i32 = 3;

/// Upper bound on authored `nonlinearSampleCount` values.
pub const MAX_NONLINEAR_SAMPLE_COUNT: i32 = 64;

/// Why velocity motion was not applied to a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotionInvalid {
	#[error("source value is not an array of the expected type")]
	SourceType,
	#[error("primvar `{0}` has no value")]
	Missing(tf::Token),
	#[error("primvar `{0}` is not an array of vec3f")]
	WrongType(tf::Token),
	#[error("primvar `{primvar}` has no sample at the source sample time {sample_time}")]
	NotCoTimed { primvar: tf::Token, sample_time: Time },
	#[error("primvar `{primvar}` has {found} values for {expected} source values")]
	TooFewValues {
		primvar: tf::Token,
		found: usize,
		expected: usize,
	},
}

/// How a prim's `__velocityMotionMode` primvar asks velocities to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityMotionMode {
	/// Apply velocities and accelerations.
	Enable,
	/// Hold the value at offset zero for the whole shutter interval.
	Disable,
	/// Pass the authored samples through untouched.
	Ignore,
	/// Apply velocities but not accelerations.
	NoAcceleration,
}

impl VelocityMotionMode {
	pub fn from_token(token: &tf::Token) -> Option<Self> {
		let tokens = &*VELOCITY_MOTION_RESOLVING_SCENE_INDEX_TOKENS;
		if *token == tokens.enable {
			Some(Self::Enable)
		} else if *token == tokens.disable {
			Some(Self::Disable)
		} else if *token == tokens.ignore {
			Some(Self::Ignore)
		} else if *token == tokens.no_acceleration {
			Some(Self::NoAcceleration)
		} else {
			None
		}
	}

	pub fn token(&self) -> tf::Token {
		let tokens = &*VELOCITY_MOTION_RESOLVING_SCENE_INDEX_TOKENS;
		match self {
			Self::Enable => tokens.enable.clone(),
			Self::Disable => tokens.disable.clone(),
			Self::Ignore => tokens.ignore.clone(),
			Self::NoAcceleration => tokens.no_acceleration.clone(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionTarget {
	Positions,
	Rotations,
}

fn is_points_based(prim_type: &tf::Token) -> bool {
	let types = &*PRIM_TYPE_TOKENS;
	[
		&types.mesh,
		&types.basis_curves,
		&types.nurbs_curves,
		&types.nurbs_patch,
		&types.points,
		&types.tet_mesh,
	]
	.contains(&prim_type)
}

fn participates(prim_type: &tf::Token) -> bool {
	is_points_based(prim_type) || *prim_type == PRIM_TYPE_TOKENS.instancer
}

fn motion_target(prim_type: &tf::Token, primvar: &tf::Token) -> Option<MotionTarget> {
	let primvars = &*PRIMVARS_SCHEMA_TOKENS;
	if *prim_type == PRIM_TYPE_TOKENS.instancer {
		if *primvar == primvars.instance_translations {
			Some(MotionTarget::Positions)
		} else if *primvar == primvars.instance_rotations {
			Some(MotionTarget::Rotations)
		} else {
			None
		}
	} else if is_points_based(prim_type) && *primvar == primvars.points {
		Some(MotionTarget::Positions)
	} else {
		None
	}
}

/// Dirtying any of these primvars changes the resolved positions and rotations.
static MOTION_INPUT_LOCATORS: LazyLock<hd::DataSourceLocatorSet> = LazyLock::new(|| {
	let primvars = &*PRIMVARS_SCHEMA_TOKENS;
	[
		&primvars.velocities,
		&primvars.accelerations,
		&primvars.angular_velocities,
		&primvars.nonlinear_sample_count,
		&primvars.blur_scale,
		&VELOCITY_MOTION_RESOLVING_SCENE_INDEX_TOKENS.velocity_motion_mode,
	]
	.into_iter()
	.map(|name| PrimvarsSchema::default_locator().append(name))
	.collect()
});

static RESOLVED_LOCATORS: LazyLock<hd::DataSourceLocatorSet> = LazyLock::new(|| {
	let primvars = &*PRIMVARS_SCHEMA_TOKENS;
	[
		&primvars.points,
		&primvars.instance_translations,
		&primvars.instance_rotations,
	]
	.into_iter()
	.map(PrimvarsSchema::primvar_value_locator)
	.collect()
});

/// Sample time of the source sample the motion is extrapolated from: the latest authored
/// sample at or before offset zero, else the earliest one.
fn source_sample_time(source: &SampledDataSourceHandle) -> Time {
	let Some(times) = source.contributing_sample_times(0.0, 0.0) else {
		return 0.0;
	};
	times
		.iter()
		.copied()
		.filter(|time| *time <= 0.0)
		.max_by(|a, b| a.total_cmp(b))
		.or_else(|| times.iter().copied().min_by(|a, b| a.total_cmp(b)))
		.unwrap_or(0.0)
}

/// Uniform values are valid at any sample time.
fn is_co_timed(source: &SampledDataSourceHandle, sample_time: Time) -> bool {
	match source.contributing_sample_times(0.0, 0.0) {
		None => true,
		Some(times) => times.iter().any(|time| (time - sample_time).abs() < 1e-6),
	}
}

/// Velocities and accelerations read at the source sample time.
struct Motion {
	sample_time: Time,
	velocities: vt::Array<gf::Vec3f>,
	accelerations: Option<vt::Array<gf::Vec3f>>,
}

impl Motion {
	/// `time` is in seconds from the source sample.
	fn translate(&self, positions: &[gf::Vec3f], time: f32) -> vt::Array<gf::Vec3f> {
		let half_time_squared = 0.5 * time * time;
		positions
			.iter()
			.enumerate()
			.map(|(i, position)| {
				let mut moved =
					glam::Vec3::from(*position) + time * glam::Vec3::from(self.velocities[i]);
				if let Some(accelerations) = &self.accelerations {
					moved += half_time_squared * glam::Vec3::from(accelerations[i]);
				}
				moved.into()
			})
			.collect()
	}

	/// Angular velocities are in degrees per second.
	fn rotate(&self, rotations: &[gf::Quatf], time: f32) -> vt::Array<gf::Quatf> {
		rotations
			.iter()
			.zip(&self.velocities)
			.map(|(rotation, angular_velocity)| {
				let angular_velocity = glam::Vec3::from(*angular_velocity);
				let speed = angular_velocity.length();
				if speed == 0.0 {
					return *rotation;
				}
				let increment =
					glam::Quat::from_axis_angle(angular_velocity / speed, (time * speed).to_radians());
				(increment * glam::Quat::from(*rotation)).into()
			})
			.collect()
	}
}

/// The `primvarValue` of a motion-resolved primvar.
struct ResolvedValueDataSource {
	source: SampledDataSourceHandle,
	primvars: ContainerDataSourceHandle,
	target: MotionTarget,
	fps: f32,
}

impl ResolvedValueDataSource {
	fn primvar_value(&self, name: &tf::Token) -> Option<SampledDataSourceHandle> {
		PrimvarsSchema::new(Some(self.primvars.clone()))
			.primvar(name)
			.primvar_value()
	}

	fn mode(&self) -> VelocityMotionMode {
		let Some(token) = self
			.primvar_value(&VELOCITY_MOTION_RESOLVING_SCENE_INDEX_TOKENS.velocity_motion_mode)
			.and_then(|source| source.value(0.0).get::<tf::Token>())
		else {
			return VelocityMotionMode::Enable;
		};
		VelocityMotionMode::from_token(&token).unwrap_or_else(|| {
			tf::warning!("Unknown velocity motion mode '{token}', enabling velocity motion");
			VelocityMotionMode::Enable
		})
	}

	fn blur_scale(&self) -> f32 {
		self.primvar_value(&PRIMVARS_SCHEMA_TOKENS.blur_scale)
			.and_then(|source| source.value(0.0).get::<f32>())
			.map_or(1.0, f32::abs)
	}

	fn nonlinear_sample_count(&self) -> i32 {
		self.primvar_value(&PRIMVARS_SCHEMA_TOKENS.nonlinear_sample_count)
			.and_then(|source| source.value(0.0).get::<i32>())
			.unwrap_or(DEFAULT_NONLINEAR_SAMPLE_COUNT)
			.clamp(DEFAULT_NONLINEAR_SAMPLE_COUNT, MAX_NONLINEAR_SAMPLE_COUNT)
	}

	fn co_timed_vectors(
		&self,
		name: &tf::Token,
		sample_time: Time,
	) -> Result<vt::Array<gf::Vec3f>, MotionInvalid> {
		let source = self
			.primvar_value(name)
			.ok_or_else(|| MotionInvalid::Missing(name.clone()))?;
		if !is_co_timed(&source, sample_time) {
			return Err(MotionInvalid::NotCoTimed {
				primvar: name.clone(),
				sample_time,
			});
		}
		source
			.value(sample_time)
			.get::<vt::Array<gf::Vec3f>>()
			.ok_or_else(|| MotionInvalid::WrongType(name.clone()))
	}

	fn motion(&self, mode: VelocityMotionMode) -> Result<Motion, MotionInvalid> {
		let sample_time = source_sample_time(&self.source);
		let value = self.source.value(sample_time);
		let holds_target = match self.target {
			MotionTarget::Positions => value.is_holding::<vt::Array<gf::Vec3f>>(),
			MotionTarget::Rotations => {
				value.is_holding::<vt::Array<gf::Quatf>>()
					|| value.is_holding::<vt::Array<gf::Quath>>()
			}
		};
		let count = match value.array_size() {
			Some(count) if holds_target => count,
			_ => return Err(MotionInvalid::SourceType),
		};

		let primvars = &*PRIMVARS_SCHEMA_TOKENS;
		let velocity_name = match self.target {
			MotionTarget::Positions => &primvars.velocities,
			MotionTarget::Rotations => &primvars.angular_velocities,
		};
		let velocities = self.co_timed_vectors(velocity_name, sample_time)?;
		if velocities.len() < count {
			return Err(MotionInvalid::TooFewValues {
				primvar: velocity_name.clone(),
				found: velocities.len(),
				expected: count,
			});
		}

		let accelerations = if self.target == MotionTarget::Positions
			&& mode != VelocityMotionMode::NoAcceleration
		{
			match self.co_timed_vectors(&primvars.accelerations, sample_time) {
				Ok(accelerations) if accelerations.len() >= count => Some(accelerations),
				Ok(accelerations) => {
					tf::warning!(
						"{} accelerations for {count} values, applying velocities only",
						accelerations.len()
					);
					None
				}
				Err(_) => None,
			}
		} else {
			None
		};

		Ok(Motion {
			sample_time,
			velocities,
			accelerations,
		})
	}
}

impl SampledDataSource for ResolvedValueDataSource {
	fn value(&self, shutter_offset: Time) -> vt::Value {
		let mode = self.mode();
		match mode {
			VelocityMotionMode::Ignore => return self.source.value(shutter_offset),
			VelocityMotionMode::Disable => return self.source.value(0.0),
			_ => {}
		}

		let blur_scale = self.blur_scale();
		if blur_scale == 0.0 {
			return self.source.value(0.0);
		}

		let motion = match self.motion(mode) {
			Ok(motion) => motion,
			Err(reason) => {
				tracing::debug!(%reason, "velocity motion not applied");
				return self.source.value(shutter_offset);
			}
		};

		let time = (shutter_offset * blur_scale - motion.sample_time) / self.fps;
		let value = self.source.value(motion.sample_time);
		let resolved = match self.target {
			MotionTarget::Positions => value
				.get::<vt::Array<gf::Vec3f>>()
				.map(|positions| vt::Value::new(motion.translate(&positions, time))),
			MotionTarget::Rotations => {
				if let Some(rotations) = value.get::<vt::Array<gf::Quatf>>() {
					Some(vt::Value::new(motion.rotate(&rotations, time)))
				} else {
					value.get::<vt::Array<gf::Quath>>().map(|rotations| {
						let rotations: Vec<gf::Quatf> =
							rotations.into_iter().map(gf::Quatf::from).collect();
						let rotated: vt::Array<gf::Quath> = motion
							.rotate(&rotations, time)
							.into_iter()
							.map(gf::Quath::from)
							.collect();
						vt::Value::new(rotated)
					})
				}
			}
		};
		resolved.unwrap_or(value)
	}

	fn contributing_sample_times(&self, start: Time, end: Time) -> Option<Vec<Time>> {
		let mode = self.mode();
		match mode {
			VelocityMotionMode::Ignore => return self.source.contributing_sample_times(start, end),
			VelocityMotionMode::Disable => return None,
			_ => {}
		}

		if self.blur_scale() == 0.0 {
			return None;
		}

		let motion = match self.motion(mode) {
			Ok(motion) => motion,
			Err(_) => return self.source.contributing_sample_times(start, end),
		};

		if end - start < 1e-10 {
			return Some(vec![start]);
		}

		if motion.accelerations.is_none() {
			return Some(vec![start, end]);
		}

		let intervals = (self.nonlinear_sample_count() - 1) as f32;
		Some(
			(0..=intervals as i32)
				.map(|i| {
					let i = i as f32;
					((intervals - i) / intervals) * start + (i / intervals) * end
				})
				.collect(),
		)
	}
}

/// A primvar whose value is motion-resolved.
struct ResolvedPrimvarDataSource {
	input: ContainerDataSourceHandle,
	primvars: ContainerDataSourceHandle,
	target: MotionTarget,
	fps: f32,
}

impl ContainerDataSource for ResolvedPrimvarDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.input.names()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let child = self.input.get(name)?;
		if *name != PRIMVAR_SCHEMA_TOKENS.primvar_value {
			return Some(child);
		}
		match child {
			DataSource::Sampled(source) => Some(DataSource::Sampled(Arc::new(
				ResolvedValueDataSource {
					source,
					primvars: self.primvars.clone(),
					target: self.target,
					fps: self.fps,
				},
			))),
			other => Some(other),
		}
	}
}

struct PrimvarsDataSource {
	input: ContainerDataSourceHandle,
	prim_type: tf::Token,
	fps: f32,
}

impl ContainerDataSource for PrimvarsDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.input.names()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let child = self.input.get(name)?;
		let Some(target) = motion_target(&self.prim_type, name) else {
			return Some(child);
		};
		match child {
			DataSource::Container(primvar) => Some(DataSource::Container(Arc::new(
				ResolvedPrimvarDataSource {
					input: primvar,
					primvars: self.input.clone(),
					target,
					fps: self.fps,
				},
			))),
			other => Some(other),
		}
	}
}

struct PrimDataSource {
	input: ContainerDataSourceHandle,
	prim_type: tf::Token,
	fps: f32,
}

impl ContainerDataSource for PrimDataSource {
	fn names(&self) -> Vec<tf::Token> {
		self.input.names()
	}

	fn get(&self, name: &tf::Token) -> Option<DataSource> {
		let child = self.input.get(name)?;
		if *name != PRIMVARS_SCHEMA_TOKENS.primvars {
			return Some(child);
		}
		match child {
			DataSource::Container(primvars) => {
				Some(DataSource::Container(Arc::new(PrimvarsDataSource {
					input: primvars,
					prim_type: self.prim_type.clone(),
					fps: self.fps,
				})))
			}
			other => Some(other),
		}
	}
}

/// Resolves authored velocities, accelerations and angular velocities into positions and
/// rotations at each shutter offset.
///
/// Point-based prims have their `points` resolved, instancers their instance translations
/// and rotations. A value is extrapolated from the source sample at or before offset zero,
/// `p + t*v + t²*a/2` for positions, with `t` in seconds derived from `fps`. When the
/// velocities are unusable the authored samples pass through unchanged.
pub struct VelocityMotionResolvingSceneIndex {
	base: SingleInputFilteringSceneIndexBase,
	fps: f32,
}

impl VelocityMotionResolvingSceneIndex {
	/// `input_args` may hold `fps` as a float.
	pub fn new(
		input: SceneIndexHandle,
		input_args: Option<ContainerDataSourceHandle>,
	) -> Arc<Self> {
		let fps = match hd::sampled_value_at(
			input_args.as_ref(),
			&hd::DataSourceLocator::from(&VELOCITY_MOTION_RESOLVING_SCENE_INDEX_TOKENS.fps),
		) {
			None => DEFAULT_FPS,
			Some(value) => match value.get::<f32>() {
				Some(fps) if fps.is_finite() && fps > 0.0 => fps,
				_ => {
					tf::warning!("Invalid fps {value}, using {DEFAULT_FPS}");
					DEFAULT_FPS
				}
			},
		};

		let scene_index = Arc::new(Self {
			base: SingleInputFilteringSceneIndexBase::new(input),
			fps,
		});
		hd::connect_filter(&scene_index);
		scene_index
	}

	pub fn fps(&self) -> f32 {
		self.fps
	}
}

impl SceneIndex for VelocityMotionResolvingSceneIndex {
	fn prim(&self, prim_path: &sdf::Path) -> SceneIndexPrim {
		let mut prim = self.input_scene_index().prim(prim_path);
		if participates(&prim.prim_type)
			&& let Some(input) = prim.data_source.take()
		{
			prim.data_source = Some(Arc::new(PrimDataSource {
				input,
				prim_type: prim.prim_type.clone(),
				fps: self.fps,
			}));
		}
		prim
	}

	fn child_prim_paths(&self, prim_path: &sdf::Path) -> Vec<sdf::Path> {
		self.input_scene_index().child_prim_paths(prim_path)
	}

	fn base(&self) -> &SceneIndexBase {
		self.base.base()
	}

	fn input_scene_indices(&self) -> Vec<SceneIndexHandle> {
		vec![self.input_scene_index().clone()]
	}
}

impl SingleInputFilteringSceneIndex for VelocityMotionResolvingSceneIndex {
	fn filtering_base(&self) -> &SingleInputFilteringSceneIndexBase {
		&self.base
	}

	fn prims_added(&self, _sender: &dyn SceneIndex, entries: &[AddedPrimEntry]) {
		self.send_prims_added(entries);
	}

	fn prims_removed(&self, _sender: &dyn SceneIndex, entries: &[RemovedPrimEntry]) {
		self.send_prims_removed(entries);
	}

	fn prims_dirtied(&self, _sender: &dyn SceneIndex, entries: &[DirtiedPrimEntry]) {
		let entries: Vec<DirtiedPrimEntry> = entries
			.iter()
			.map(|entry| {
				if !entry.dirty_locators.intersects_set(&MOTION_INPUT_LOCATORS) {
					return entry.clone();
				}
				let mut dirty_locators = entry.dirty_locators.clone();
				dirty_locators.insert_set(&RESOLVED_LOCATORS);
				DirtiedPrimEntry::new(entry.prim_path, dirty_locators)
			})
			.collect();
		self.send_prims_dirtied(&entries);
	}
}
