//! Repository traits for frame store operations.

pub mod frames;

pub use frames::FrameRepo;
