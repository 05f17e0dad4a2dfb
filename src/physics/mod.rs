//! 物理骨骼模块
//!
//! ## 组成
//! | 模块 | 职责 |
//! |------|------|
//! | physical_bone | 物理骨骼节点：变换同步、模拟状态机、关节生命周期 |
//! | joint_data | 五种关节的参数与按路径读写 |
//! | contact_monitor | 接触进入/离开事件 |
//! | backend | 物理后端接口 |
//! | scene | 骨架模拟器与场景树接口 |
//! | rapier_backend | Rapier3D 后端（feature `rapier`） |

pub mod backend;
pub mod config;
pub mod contact_monitor;
pub mod joint_data;
pub mod physical_bone;
pub mod property;
pub mod scene;
pub mod transform;

#[cfg(feature = "rapier")]
mod rapier_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BodyHandle, DirectBodyState, JointHandle, PhysicsBackend};
pub use config::{get_config, reset_config, set_config, PhysicsConfig};
pub use contact_monitor::{ContactEvent, ContactListener, ContactMonitor};
pub use joint_data::{JointData, JointType};
pub use physical_bone::{ForceIntegrator, PhysicalBone, SimulationState};
pub use property::{PropertyInfo, PropertyKind, PropertyValue};
#[cfg(feature = "rapier")]
pub use rapier_backend::{ColliderShape, RapierBackend};
pub use scene::{BoneContext, BoneSimulator, ObjectId, SceneTree, TreeWatch};
