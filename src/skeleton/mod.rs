//! 骨骼系统与物理骨骼模拟器

mod bone;
mod manager;
mod simulator;

pub use bone::Bone;
pub use manager::BoneManager;
pub use simulator::PhysicalBoneSimulator;
