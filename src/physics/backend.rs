//! 物理后端接口
//!
//! 物理骨骼只通过 [`PhysicsBackend`] 访问刚体与关节，不关心具体引擎。
//! 默认实现见 `rapier_backend`（Rapier3D）。
//!
//! | 概念 | 说明 |
//! |------|------|
//! | [`BodyHandle`] | 刚体句柄，由后端分配 |
//! | [`JointHandle`] | 约束句柄，可反复重建为不同类型 |
//! | [`DirectBodyState`] | 每个物理步回传给已注册刚体的状态 |

use glam::{Mat4, Vec3};

use super::scene::ObjectId;

/// 刚体句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// 关节句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub u64);

/// 刚体模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// 静态，不参与模拟
    #[default]
    Static,
    /// 运动学，位置由外部驱动
    Kinematic,
    /// 完整刚体，位置由物理驱动
    Rigid,
}

/// 刚体标量参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyParam {
    Mass,
    Friction,
    Bounce,
    GravityScale,
    LinearDamp,
    AngularDamp,
}

/// 阻尼组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DampMode {
    /// 与区域阻尼相加
    #[default]
    Combine,
    /// 直接替换区域阻尼
    Replace,
}

/// 阻尼作用的通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DampChannel {
    Linear,
    Angular,
}

/// 空间轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// 属性路径中的轴名（`x` / `y` / `z`）
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

/// 关节种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    Pin,
    ConeTwist,
    Hinge,
    Slider,
    Generic6Dof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinParam {
    Bias,
    Damping,
    ImpulseClamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConeTwistParam {
    SwingSpan,
    TwistSpan,
    Bias,
    Softness,
    Relaxation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HingeParam {
    LimitUpper,
    LimitLower,
    LimitBias,
    LimitSoftness,
    LimitRelaxation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HingeFlag {
    UseLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliderParam {
    LinearLimitUpper,
    LinearLimitLower,
    LinearLimitSoftness,
    LinearLimitRestitution,
    LinearLimitDamping,
    AngularLimitUpper,
    AngularLimitLower,
    AngularLimitSoftness,
    AngularLimitRestitution,
    AngularLimitDamping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum G6dofParam {
    LinearLowerLimit,
    LinearUpperLimit,
    LinearLimitSoftness,
    LinearRestitution,
    LinearDamping,
    LinearSpringStiffness,
    LinearSpringDamping,
    LinearSpringEquilibriumPoint,
    AngularLowerLimit,
    AngularUpperLimit,
    AngularLimitSoftness,
    AngularDamping,
    AngularRestitution,
    AngularErp,
    AngularSpringStiffness,
    AngularSpringDamping,
    AngularSpringEquilibriumPoint,
    AngularMotorTargetVelocity,
    AngularMotorForceLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum G6dofFlag {
    EnableLinearLimit,
    EnableAngularLimit,
    EnableLinearSpring,
    EnableAngularSpring,
    EnableMotor,
}

/// 关节标量参数（按关节种类分组）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointParam {
    Pin(PinParam),
    ConeTwist(ConeTwistParam),
    Hinge(HingeParam),
    Slider(SliderParam),
    Generic6Dof(Axis, G6dofParam),
}

impl JointParam {
    /// 该参数所属的关节种类
    pub fn kind(self) -> JointKind {
        match self {
            JointParam::Pin(_) => JointKind::Pin,
            JointParam::ConeTwist(_) => JointKind::ConeTwist,
            JointParam::Hinge(_) => JointKind::Hinge,
            JointParam::Slider(_) => JointKind::Slider,
            JointParam::Generic6Dof(..) => JointKind::Generic6Dof,
        }
    }
}

/// 关节开关参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointFlag {
    Hinge(HingeFlag),
    Generic6Dof(Axis, G6dofFlag),
}

impl JointFlag {
    pub fn kind(self) -> JointKind {
        match self {
            JointFlag::Hinge(_) => JointKind::Hinge,
            JointFlag::Generic6Dof(..) => JointKind::Generic6Dof,
        }
    }
}

/// 单个接触点的上报信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReport {
    /// 碰撞对象的刚体句柄
    pub collider: BodyHandle,
    /// 碰撞对象的身份
    pub collider_object: ObjectId,
    /// 碰撞对象上的形状索引
    pub collider_shape: i32,
    /// 本刚体上的形状索引
    pub local_shape: i32,
}

/// 物理步结束后回传的刚体状态
#[derive(Debug, Clone, PartialEq)]
pub struct DirectBodyState {
    pub body: BodyHandle,
    pub transform: Mat4,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub contacts: Vec<ContactReport>,
}

impl DirectBodyState {
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }
}

/// 物理后端
///
/// 所有方法对失效句柄都应静默忽略（getter 返回默认值），
/// 因为骨骼可能在刚体释放后仍收到迟到的调用。
pub trait PhysicsBackend {
    // ========== 刚体 ==========
    fn body_create(&mut self) -> BodyHandle;
    fn body_free(&mut self, body: BodyHandle);
    /// 记录刚体对应的场景对象，用于接触上报
    fn body_set_object(&mut self, body: BodyHandle, object: ObjectId);

    fn body_set_mode(&mut self, body: BodyHandle, mode: BodyMode);
    fn body_get_mode(&self, body: BodyHandle) -> BodyMode;

    fn body_set_param(&mut self, body: BodyHandle, param: BodyParam, value: f32);
    fn body_get_param(&self, body: BodyHandle, param: BodyParam) -> f32;
    fn body_set_damp_mode(&mut self, body: BodyHandle, channel: DampChannel, mode: DampMode);

    fn body_set_collision_layer(&mut self, body: BodyHandle, layer: u32);
    fn body_get_collision_layer(&self, body: BodyHandle) -> u32;
    fn body_set_collision_mask(&mut self, body: BodyHandle, mask: u32);
    fn body_get_collision_mask(&self, body: BodyHandle) -> u32;
    fn body_set_collision_priority(&mut self, body: BodyHandle, priority: f32);
    fn body_get_collision_priority(&self, body: BodyHandle) -> f32;

    fn body_set_can_sleep(&mut self, body: BodyHandle, can_sleep: bool);
    fn body_set_ccd(&mut self, body: BodyHandle, enabled: bool);
    fn body_set_max_contacts_reported(&mut self, body: BodyHandle, amount: usize);
    fn body_set_omit_force_integration(&mut self, body: BodyHandle, omit: bool);

    fn body_set_transform(&mut self, body: BodyHandle, transform: Mat4);
    fn body_get_transform(&self, body: BodyHandle) -> Mat4;
    fn body_set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    fn body_set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    fn body_apply_central_impulse(&mut self, body: BodyHandle, impulse: Vec3);
    /// `position` 为相对刚体原点的世界空间偏移
    fn body_apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, position: Vec3);

    /// 注册/注销每步状态回传
    fn body_set_state_sync(&mut self, body: BodyHandle, enabled: bool);

    // ========== 关节 ==========
    fn joint_create(&mut self) -> JointHandle;
    fn joint_free(&mut self, joint: JointHandle);
    /// 清除约束，句柄保持有效
    fn joint_clear(&mut self, joint: JointHandle);
    fn joint_kind(&self, joint: JointHandle) -> Option<JointKind>;
    /// 以 `kind` 重建约束；旧约束及其参数全部失效
    fn joint_make(
        &mut self,
        joint: JointHandle,
        kind: JointKind,
        body_a: BodyHandle,
        frame_a: Mat4,
        body_b: BodyHandle,
        frame_b: Mat4,
    );
    fn joint_set_param(&mut self, joint: JointHandle, param: JointParam, value: f32);
    fn joint_get_param(&self, joint: JointHandle, param: JointParam) -> Option<f32>;
    fn joint_set_flag(&mut self, joint: JointHandle, flag: JointFlag, enabled: bool);
    fn joint_get_flag(&self, joint: JointHandle, flag: JointFlag) -> Option<bool>;
}
