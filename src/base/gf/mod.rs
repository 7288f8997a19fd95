//! Graphics Foundations

use half::f16;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2<T> {
	pub x: T,
	pub y: T,
}

impl<T> Vec2<T> {
	pub fn new(x: T, y: T) -> Self {
		Self { x, y }
	}
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3<T> {
	pub x: T,
	pub y: T,
	pub z: T,
}

impl<T> Vec3<T> {
	pub fn new(x: T, y: T, z: T) -> Self {
		Self { x, y, z }
	}
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec4<T> {
	pub x: T,
	pub y: T,
	pub z: T,
	pub w: T,
}

impl<T> Vec4<T> {
	pub fn new(x: T, y: T, z: T, w: T) -> Self {
		Self { x, y, z, w }
	}
}

pub type Vec2f = Vec2<f32>;
pub type Vec3f = Vec3<f32>;
pub type Vec3d = Vec3<f64>;
pub type Vec4f = Vec4<f32>;

impl From<Vec3f> for Vec3d {
	fn from(v: Vec3f) -> Self {
		Self {
			x: v.x.into(),
			y: v.y.into(),
			z: v.z.into(),
		}
	}
}

impl From<Vec3f> for glam::Vec3 {
	fn from(v: Vec3f) -> Self {
		glam::vec3(v.x, v.y, v.z)
	}
}

impl From<glam::Vec3> for Vec3f {
	fn from(v: glam::Vec3) -> Self {
		Self::new(v.x, v.y, v.z)
	}
}

/// Quaternion with imaginary part `(i, j, k)` and real part `w`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quat<T> {
	pub i: T,
	pub j: T,
	pub k: T,
	pub w: T,
}

impl<T> Quat<T> {
	pub fn new(w: T, i: T, j: T, k: T) -> Self {
		Self { i, j, k, w }
	}
}

pub type Quath = Quat<f16>;
pub type Quatf = Quat<f32>;

impl Quatf {
	pub fn identity() -> Self {
		Self::new(1.0, 0.0, 0.0, 0.0)
	}
}

impl From<Quatf> for glam::Quat {
	fn from(q: Quatf) -> Self {
		glam::Quat::from_xyzw(q.i, q.j, q.k, q.w)
	}
}

impl From<glam::Quat> for Quatf {
	fn from(q: glam::Quat) -> Self {
		Self::new(q.w, q.x, q.y, q.z)
	}
}

impl From<Quath> for Quatf {
	fn from(q: Quath) -> Self {
		Self::new(q.w.into(), q.i.into(), q.j.into(), q.k.into())
	}
}

impl From<Quatf> for Quath {
	fn from(q: Quatf) -> Self {
		Self::new(
			f16::from_f32(q.w),
			f16::from_f32(q.i),
			f16::from_f32(q.j),
			f16::from_f32(q.k),
		)
	}
}

impl<T: std::fmt::Display> std::fmt::Display for Vec2<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "({}, {})", self.x, self.y)
	}
}

impl<T: std::fmt::Display> std::fmt::Display for Vec3<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "({}, {}, {})", self.x, self.y, self.z)
	}
}

impl<T: std::fmt::Display> std::fmt::Display for Vec4<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
	}
}

// Real part first, matching how USD prints quaternions.
impl<T: std::fmt::Display> std::fmt::Display for Quat<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "({}, {}, {}, {})", self.w, self.i, self.j, self.k)
	}
}
