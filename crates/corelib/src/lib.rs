//! Core types: math re-exports, cameras.

pub use glam::{Mat3, Mat4, Vec2, Vec3, vec3};

pub mod camera;
