//! 关节参数变体
//!
//! 每种关节类型对应一个参数集合，外加一张静态字段表：
//! 属性路径 → 后端参数槽位 / 单位 / 编辑器提示。
//! 读写、枚举和整体推送到后端都由字段表驱动，各变体之间通过 `match` 分派。
//!
//! 角度在内部以弧度存储，对外（属性读写）以角度暴露。

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use super::backend::{
    Axis, ConeTwistParam, G6dofFlag, G6dofParam, HingeFlag, HingeParam, JointFlag, JointHandle,
    JointKind, JointParam, PhysicsBackend, PinParam, SliderParam,
};
use super::property::{PropertyInfo, PropertyKind, PropertyValue};

/// 属性路径前缀
pub const JOINT_CONSTRAINTS_PREFIX: &str = "joint_constraints/";

/// 关节类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointType {
    #[default]
    None,
    Pin,
    Cone,
    Hinge,
    Slider,
    SixDof,
}

impl JointType {
    /// 对应的后端关节种类；`None` 没有约束
    pub fn backend_kind(self) -> Option<JointKind> {
        match self {
            JointType::None => None,
            JointType::Pin => Some(JointKind::Pin),
            JointType::Cone => Some(JointKind::ConeTwist),
            JointType::Hinge => Some(JointKind::Hinge),
            JointType::Slider => Some(JointKind::Slider),
            JointType::SixDof => Some(JointKind::Generic6Dof),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Plain,
    /// 存弧度，读写用角度
    Degrees,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Param(JointParam),
    Flag(JointFlag),
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    slot: Slot,
    unit: Unit,
    hint: Option<&'static str>,
}

impl FieldSpec {
    const fn param(
        name: &'static str,
        param: JointParam,
        unit: Unit,
        hint: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            slot: Slot::Param(param),
            unit,
            hint,
        }
    }

    const fn flag(name: &'static str, flag: JointFlag) -> Self {
        Self {
            name,
            slot: Slot::Flag(flag),
            unit: Unit::Plain,
            hint: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AxisSlot {
    Param(G6dofParam),
    Flag(G6dofFlag),
}

#[derive(Debug, Clone, Copy)]
struct AxisFieldSpec {
    name: &'static str,
    slot: AxisSlot,
    unit: Unit,
    hint: Option<&'static str>,
}

impl AxisFieldSpec {
    const fn param(
        name: &'static str,
        param: G6dofParam,
        unit: Unit,
        hint: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            slot: AxisSlot::Param(param),
            unit,
            hint,
        }
    }

    const fn flag(name: &'static str, flag: G6dofFlag) -> Self {
        Self {
            name,
            slot: AxisSlot::Flag(flag),
            unit: Unit::Plain,
            hint: None,
        }
    }

    fn resolve(&self, axis: Axis) -> FieldSpec {
        let slot = match self.slot {
            AxisSlot::Param(p) => Slot::Param(JointParam::Generic6Dof(axis, p)),
            AxisSlot::Flag(f) => Slot::Flag(JointFlag::Generic6Dof(axis, f)),
        };
        FieldSpec {
            name: self.name,
            slot,
            unit: self.unit,
            hint: self.hint,
        }
    }
}

// ========== 字段表（顺序即推送到后端的顺序）==========

const PIN_FIELDS: &[FieldSpec] = &[
    FieldSpec::param("bias", JointParam::Pin(PinParam::Bias), Unit::Plain, Some("0.01,0.99,0.01")),
    FieldSpec::param(
        "damping",
        JointParam::Pin(PinParam::Damping),
        Unit::Plain,
        Some("0.01,8.0,0.01"),
    ),
    FieldSpec::param(
        "impulse_clamp",
        JointParam::Pin(PinParam::ImpulseClamp),
        Unit::Plain,
        Some("0.0,64.0,0.01"),
    ),
];

const CONE_FIELDS: &[FieldSpec] = &[
    FieldSpec::param(
        "swing_span",
        JointParam::ConeTwist(ConeTwistParam::SwingSpan),
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    FieldSpec::param(
        "twist_span",
        JointParam::ConeTwist(ConeTwistParam::TwistSpan),
        Unit::Degrees,
        Some("-40000,40000,0.1,or_less,or_greater"),
    ),
    FieldSpec::param(
        "bias",
        JointParam::ConeTwist(ConeTwistParam::Bias),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
    FieldSpec::param(
        "softness",
        JointParam::ConeTwist(ConeTwistParam::Softness),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
    FieldSpec::param(
        "relaxation",
        JointParam::ConeTwist(ConeTwistParam::Relaxation),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
];

const HINGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::flag("angular_limit_enabled", JointFlag::Hinge(HingeFlag::UseLimit)),
    FieldSpec::param(
        "angular_limit_upper",
        JointParam::Hinge(HingeParam::LimitUpper),
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_lower",
        JointParam::Hinge(HingeParam::LimitLower),
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_bias",
        JointParam::Hinge(HingeParam::LimitBias),
        Unit::Plain,
        Some("0.01,0.99,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_softness",
        JointParam::Hinge(HingeParam::LimitSoftness),
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_relaxation",
        JointParam::Hinge(HingeParam::LimitRelaxation),
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
];

const SLIDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::param(
        "linear_limit_upper",
        JointParam::Slider(SliderParam::LinearLimitUpper),
        Unit::Plain,
        None,
    ),
    FieldSpec::param(
        "linear_limit_lower",
        JointParam::Slider(SliderParam::LinearLimitLower),
        Unit::Plain,
        None,
    ),
    FieldSpec::param(
        "linear_limit_softness",
        JointParam::Slider(SliderParam::LinearLimitSoftness),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
    FieldSpec::param(
        "linear_limit_restitution",
        JointParam::Slider(SliderParam::LinearLimitRestitution),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
    FieldSpec::param(
        "linear_limit_damping",
        JointParam::Slider(SliderParam::LinearLimitDamping),
        Unit::Plain,
        Some("0,16.0,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_upper",
        JointParam::Slider(SliderParam::AngularLimitUpper),
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_lower",
        JointParam::Slider(SliderParam::AngularLimitLower),
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_softness",
        JointParam::Slider(SliderParam::AngularLimitSoftness),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_restitution",
        JointParam::Slider(SliderParam::AngularLimitRestitution),
        Unit::Plain,
        Some("0.01,16.0,0.01"),
    ),
    FieldSpec::param(
        "angular_limit_damping",
        JointParam::Slider(SliderParam::AngularLimitDamping),
        Unit::Plain,
        Some("0,16.0,0.01"),
    ),
];

const SIX_DOF_AXIS_FIELDS: &[AxisFieldSpec] = &[
    AxisFieldSpec::flag("linear_limit_enabled", G6dofFlag::EnableLinearLimit),
    AxisFieldSpec::param("linear_limit_upper", G6dofParam::LinearUpperLimit, Unit::Plain, None),
    AxisFieldSpec::param("linear_limit_lower", G6dofParam::LinearLowerLimit, Unit::Plain, None),
    AxisFieldSpec::param(
        "linear_limit_softness",
        G6dofParam::LinearLimitSoftness,
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    AxisFieldSpec::flag("linear_spring_enabled", G6dofFlag::EnableLinearSpring),
    AxisFieldSpec::param(
        "linear_spring_stiffness",
        G6dofParam::LinearSpringStiffness,
        Unit::Plain,
        None,
    ),
    AxisFieldSpec::param(
        "linear_spring_damping",
        G6dofParam::LinearSpringDamping,
        Unit::Plain,
        None,
    ),
    AxisFieldSpec::param(
        "linear_equilibrium_point",
        G6dofParam::LinearSpringEquilibriumPoint,
        Unit::Plain,
        None,
    ),
    AxisFieldSpec::param(
        "linear_restitution",
        G6dofParam::LinearRestitution,
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    AxisFieldSpec::param(
        "linear_damping",
        G6dofParam::LinearDamping,
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    AxisFieldSpec::flag("angular_limit_enabled", G6dofFlag::EnableAngularLimit),
    AxisFieldSpec::param(
        "angular_limit_upper",
        G6dofParam::AngularUpperLimit,
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    AxisFieldSpec::param(
        "angular_limit_lower",
        G6dofParam::AngularLowerLimit,
        Unit::Degrees,
        Some("-180,180,0.01"),
    ),
    AxisFieldSpec::param(
        "angular_limit_softness",
        G6dofParam::AngularLimitSoftness,
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    AxisFieldSpec::param(
        "angular_restitution",
        G6dofParam::AngularRestitution,
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    AxisFieldSpec::param(
        "angular_damping",
        G6dofParam::AngularDamping,
        Unit::Plain,
        Some("0.01,16,0.01"),
    ),
    AxisFieldSpec::param("erp", G6dofParam::AngularErp, Unit::Plain, None),
    AxisFieldSpec::flag("angular_spring_enabled", G6dofFlag::EnableAngularSpring),
    AxisFieldSpec::param(
        "angular_spring_stiffness",
        G6dofParam::AngularSpringStiffness,
        Unit::Plain,
        None,
    ),
    AxisFieldSpec::param(
        "angular_spring_damping",
        G6dofParam::AngularSpringDamping,
        Unit::Plain,
        None,
    ),
    AxisFieldSpec::param(
        "angular_equilibrium_point",
        G6dofParam::AngularSpringEquilibriumPoint,
        Unit::Plain,
        None,
    ),
    AxisFieldSpec::flag("angular_motor_enabled", G6dofFlag::EnableMotor),
    AxisFieldSpec::param(
        "target_velocity",
        G6dofParam::AngularMotorTargetVelocity,
        Unit::Plain,
        Some("radians_as_degrees,suffix:°/s"),
    ),
    AxisFieldSpec::param(
        "angular_motor_force_limit",
        G6dofParam::AngularMotorForceLimit,
        Unit::Plain,
        Some("suffix:kg⋅m²/s² (Nm)"),
    ),
];

// ========== 各变体参数 ==========

/// 为参数结构体生成 `参数枚举 → 字段` 的读写访问
macro_rules! field_access {
    ($ty:ident, param: $param:ident { $($pv:ident => $pf:ident),* $(,)? }) => {
        impl $ty {
            fn param(&self, param: $param) -> f32 {
                match param { $($param::$pv => self.$pf,)* }
            }

            fn param_mut(&mut self, param: $param) -> &mut f32 {
                match param { $($param::$pv => &mut self.$pf,)* }
            }
        }
    };
    ($ty:ident, param: $param:ident { $($pv:ident => $pf:ident),* $(,)? },
     flag: $flag:ident { $($fv:ident => $ff:ident),* $(,)? }) => {
        field_access!($ty, param: $param { $($pv => $pf),* });

        impl $ty {
            fn flag(&self, flag: $flag) -> bool {
                match flag { $($flag::$fv => self.$ff,)* }
            }

            fn flag_mut(&mut self, flag: $flag) -> &mut bool {
                match flag { $($flag::$fv => &mut self.$ff,)* }
            }
        }
    };
}

/// 钉关节
#[derive(Debug, Clone, PartialEq)]
pub struct PinJointData {
    pub bias: f32,
    pub damping: f32,
    pub impulse_clamp: f32,
}

impl Default for PinJointData {
    fn default() -> Self {
        Self {
            bias: 0.3,
            damping: 1.0,
            impulse_clamp: 0.0,
        }
    }
}

field_access!(PinJointData, param: PinParam {
    Bias => bias,
    Damping => damping,
    ImpulseClamp => impulse_clamp,
});

/// 锥形扭转关节（角度为弧度）
#[derive(Debug, Clone, PartialEq)]
pub struct ConeJointData {
    pub swing_span: f32,
    pub twist_span: f32,
    pub bias: f32,
    pub softness: f32,
    pub relaxation: f32,
}

impl Default for ConeJointData {
    fn default() -> Self {
        Self {
            swing_span: FRAC_PI_4,
            twist_span: PI,
            bias: 0.3,
            softness: 0.8,
            relaxation: 1.0,
        }
    }
}

field_access!(ConeJointData, param: ConeTwistParam {
    SwingSpan => swing_span,
    TwistSpan => twist_span,
    Bias => bias,
    Softness => softness,
    Relaxation => relaxation,
});

/// 铰链关节（角度为弧度）
#[derive(Debug, Clone, PartialEq)]
pub struct HingeJointData {
    pub angular_limit_enabled: bool,
    pub angular_limit_upper: f32,
    pub angular_limit_lower: f32,
    pub angular_limit_bias: f32,
    pub angular_limit_softness: f32,
    pub angular_limit_relaxation: f32,
}

impl Default for HingeJointData {
    fn default() -> Self {
        Self {
            angular_limit_enabled: false,
            angular_limit_upper: FRAC_PI_2,
            angular_limit_lower: -FRAC_PI_2,
            angular_limit_bias: 0.3,
            angular_limit_softness: 0.9,
            angular_limit_relaxation: 1.0,
        }
    }
}

field_access!(HingeJointData, param: HingeParam {
    LimitUpper => angular_limit_upper,
    LimitLower => angular_limit_lower,
    LimitBias => angular_limit_bias,
    LimitSoftness => angular_limit_softness,
    LimitRelaxation => angular_limit_relaxation,
}, flag: HingeFlag {
    UseLimit => angular_limit_enabled,
});

/// 滑动关节（角度为弧度）
#[derive(Debug, Clone, PartialEq)]
pub struct SliderJointData {
    pub linear_limit_upper: f32,
    pub linear_limit_lower: f32,
    pub linear_limit_softness: f32,
    pub linear_limit_restitution: f32,
    pub linear_limit_damping: f32,
    pub angular_limit_upper: f32,
    pub angular_limit_lower: f32,
    pub angular_limit_softness: f32,
    pub angular_limit_restitution: f32,
    pub angular_limit_damping: f32,
}

impl Default for SliderJointData {
    fn default() -> Self {
        Self {
            linear_limit_upper: 1.0,
            linear_limit_lower: -1.0,
            linear_limit_softness: 1.0,
            linear_limit_restitution: 0.7,
            linear_limit_damping: 1.0,
            angular_limit_upper: 0.0,
            angular_limit_lower: 0.0,
            angular_limit_softness: 1.0,
            angular_limit_restitution: 0.7,
            angular_limit_damping: 1.0,
        }
    }
}

field_access!(SliderJointData, param: SliderParam {
    LinearLimitUpper => linear_limit_upper,
    LinearLimitLower => linear_limit_lower,
    LinearLimitSoftness => linear_limit_softness,
    LinearLimitRestitution => linear_limit_restitution,
    LinearLimitDamping => linear_limit_damping,
    AngularLimitUpper => angular_limit_upper,
    AngularLimitLower => angular_limit_lower,
    AngularLimitSoftness => angular_limit_softness,
    AngularLimitRestitution => angular_limit_restitution,
    AngularLimitDamping => angular_limit_damping,
});

/// 6DOF 关节单轴参数（角度为弧度）
#[derive(Debug, Clone, PartialEq)]
pub struct SixDofAxisData {
    pub linear_limit_enabled: bool,
    pub linear_limit_upper: f32,
    pub linear_limit_lower: f32,
    pub linear_limit_softness: f32,
    pub linear_spring_enabled: bool,
    pub linear_spring_stiffness: f32,
    pub linear_spring_damping: f32,
    pub linear_equilibrium_point: f32,
    pub linear_restitution: f32,
    pub linear_damping: f32,
    pub angular_limit_enabled: bool,
    pub angular_limit_upper: f32,
    pub angular_limit_lower: f32,
    pub angular_limit_softness: f32,
    pub angular_restitution: f32,
    pub angular_damping: f32,
    pub erp: f32,
    pub angular_spring_enabled: bool,
    pub angular_spring_stiffness: f32,
    pub angular_spring_damping: f32,
    pub angular_equilibrium_point: f32,
    pub angular_motor_enabled: bool,
    pub target_velocity: f32,
    pub angular_motor_force_limit: f32,
}

impl Default for SixDofAxisData {
    fn default() -> Self {
        Self {
            linear_limit_enabled: true,
            linear_limit_upper: 0.0,
            linear_limit_lower: 0.0,
            linear_limit_softness: 0.7,
            linear_spring_enabled: false,
            linear_spring_stiffness: 0.0,
            linear_spring_damping: 0.0,
            linear_equilibrium_point: 0.0,
            linear_restitution: 0.5,
            linear_damping: 1.0,
            angular_limit_enabled: true,
            angular_limit_upper: 0.0,
            angular_limit_lower: 0.0,
            angular_limit_softness: 0.5,
            angular_restitution: 0.0,
            angular_damping: 1.0,
            erp: 0.5,
            angular_spring_enabled: false,
            angular_spring_stiffness: 0.0,
            angular_spring_damping: 0.0,
            angular_equilibrium_point: 0.0,
            angular_motor_enabled: false,
            target_velocity: 0.0,
            angular_motor_force_limit: 0.0,
        }
    }
}

field_access!(SixDofAxisData, param: G6dofParam {
    LinearLowerLimit => linear_limit_lower,
    LinearUpperLimit => linear_limit_upper,
    LinearLimitSoftness => linear_limit_softness,
    LinearRestitution => linear_restitution,
    LinearDamping => linear_damping,
    LinearSpringStiffness => linear_spring_stiffness,
    LinearSpringDamping => linear_spring_damping,
    LinearSpringEquilibriumPoint => linear_equilibrium_point,
    AngularLowerLimit => angular_limit_lower,
    AngularUpperLimit => angular_limit_upper,
    AngularLimitSoftness => angular_limit_softness,
    AngularDamping => angular_damping,
    AngularRestitution => angular_restitution,
    AngularErp => erp,
    AngularSpringStiffness => angular_spring_stiffness,
    AngularSpringDamping => angular_spring_damping,
    AngularSpringEquilibriumPoint => angular_equilibrium_point,
    AngularMotorTargetVelocity => target_velocity,
    AngularMotorForceLimit => angular_motor_force_limit,
}, flag: G6dofFlag {
    EnableLinearLimit => linear_limit_enabled,
    EnableAngularLimit => angular_limit_enabled,
    EnableLinearSpring => linear_spring_enabled,
    EnableAngularSpring => angular_spring_enabled,
    EnableMotor => angular_motor_enabled,
});

/// 6DOF 关节
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SixDofJointData {
    pub axis_data: [SixDofAxisData; 3],
}

// ========== 变体 ==========

/// 关节参数（`None` 类型用 `Option<JointData>::None` 表示）
#[derive(Debug, Clone, PartialEq)]
pub enum JointData {
    Pin(PinJointData),
    Cone(ConeJointData),
    Hinge(HingeJointData),
    Slider(SliderJointData),
    SixDof(SixDofJointData),
}

impl JointData {
    /// 以默认参数创建指定类型
    pub fn new(joint_type: JointType) -> Option<Self> {
        match joint_type {
            JointType::None => None,
            JointType::Pin => Some(JointData::Pin(PinJointData::default())),
            JointType::Cone => Some(JointData::Cone(ConeJointData::default())),
            JointType::Hinge => Some(JointData::Hinge(HingeJointData::default())),
            JointType::Slider => Some(JointData::Slider(SliderJointData::default())),
            JointType::SixDof => Some(JointData::SixDof(SixDofJointData::default())),
        }
    }

    pub fn joint_type(&self) -> JointType {
        match self {
            JointData::Pin(_) => JointType::Pin,
            JointData::Cone(_) => JointType::Cone,
            JointData::Hinge(_) => JointType::Hinge,
            JointData::Slider(_) => JointType::Slider,
            JointData::SixDof(_) => JointType::SixDof,
        }
    }

    pub fn kind(&self) -> JointKind {
        match self {
            JointData::Pin(_) => JointKind::Pin,
            JointData::Cone(_) => JointKind::ConeTwist,
            JointData::Hinge(_) => JointKind::Hinge,
            JointData::Slider(_) => JointKind::Slider,
            JointData::SixDof(_) => JointKind::Generic6Dof,
        }
    }

    /// 按属性路径写入本地值
    ///
    /// 返回 `false` 表示该变体没有这个属性（或值类型不符），不是错误。
    pub fn set(&mut self, name: &str, value: &PropertyValue) -> bool {
        self.write(name, value).is_some()
    }

    /// 写入本地值，并在后端约束类型与本变体一致时同步推送
    pub fn set_live(
        &mut self,
        name: &str,
        value: &PropertyValue,
        backend: &mut dyn PhysicsBackend,
        joint: JointHandle,
    ) -> bool {
        let Some(slot) = self.write(name, value) else {
            return false;
        };
        if backend.joint_kind(joint) == Some(self.kind()) {
            self.push_slot(backend, joint, slot);
        }
        true
    }

    fn write(&mut self, name: &str, value: &PropertyValue) -> Option<Slot> {
        let field = self.resolve(name)?;
        match field.slot {
            Slot::Param(param) => {
                let v = value.as_float()?;
                let stored = match field.unit {
                    Unit::Plain => v,
                    Unit::Degrees => v.to_radians(),
                };
                *self.param_mut(param)? = stored;
            }
            Slot::Flag(flag) => {
                let v = value.as_bool()?;
                *self.flag_mut(flag)? = v;
            }
        }
        Some(field.slot)
    }

    fn push_slot(&self, backend: &mut dyn PhysicsBackend, joint: JointHandle, slot: Slot) {
        match slot {
            Slot::Param(param) => {
                if let Some(v) = self.param(param) {
                    backend.joint_set_param(joint, param, v);
                }
            }
            Slot::Flag(flag) => {
                if let Some(v) = self.flag(flag) {
                    backend.joint_set_flag(joint, flag, v);
                }
            }
        }
    }

    /// 按属性路径读取；未知属性返回 `None`
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        let field = self.resolve(name)?;
        self.read(&field)
    }

    /// 当前变体的全部属性
    pub fn property_list(&self) -> Vec<PropertyInfo> {
        let mut list = Vec::new();
        self.for_each_field(|path, field| {
            let kind = match field.slot {
                Slot::Param(_) => PropertyKind::Float,
                Slot::Flag(_) => PropertyKind::Bool,
            };
            list.push(PropertyInfo::new(path, kind, field.hint));
        });
        list
    }

    /// 把全部参数逐项推送到后端（约束刚以本变体的类型重建之后调用）
    pub fn apply(&self, backend: &mut dyn PhysicsBackend, joint: JointHandle) {
        self.for_each_field(|_, field| self.push_slot(backend, joint, field.slot));
    }

    /// 内部存储值（角度为弧度）
    pub fn param(&self, param: JointParam) -> Option<f32> {
        match (self, param) {
            (JointData::Pin(d), JointParam::Pin(p)) => Some(d.param(p)),
            (JointData::Cone(d), JointParam::ConeTwist(p)) => Some(d.param(p)),
            (JointData::Hinge(d), JointParam::Hinge(p)) => Some(d.param(p)),
            (JointData::Slider(d), JointParam::Slider(p)) => Some(d.param(p)),
            (JointData::SixDof(d), JointParam::Generic6Dof(axis, p)) => {
                Some(d.axis_data[axis.index()].param(p))
            }
            _ => None,
        }
    }

    pub fn flag(&self, flag: JointFlag) -> Option<bool> {
        match (self, flag) {
            (JointData::Hinge(d), JointFlag::Hinge(f)) => Some(d.flag(f)),
            (JointData::SixDof(d), JointFlag::Generic6Dof(axis, f)) => {
                Some(d.axis_data[axis.index()].flag(f))
            }
            _ => None,
        }
    }

    fn read(&self, field: &FieldSpec) -> Option<PropertyValue> {
        match field.slot {
            Slot::Param(param) => {
                let v = self.param(param)?;
                Some(PropertyValue::Float(match field.unit {
                    Unit::Plain => v,
                    Unit::Degrees => v.to_degrees(),
                }))
            }
            Slot::Flag(flag) => self.flag(flag).map(PropertyValue::Bool),
        }
    }

    fn param_mut(&mut self, param: JointParam) -> Option<&mut f32> {
        match (self, param) {
            (JointData::Pin(d), JointParam::Pin(p)) => Some(d.param_mut(p)),
            (JointData::Cone(d), JointParam::ConeTwist(p)) => Some(d.param_mut(p)),
            (JointData::Hinge(d), JointParam::Hinge(p)) => Some(d.param_mut(p)),
            (JointData::Slider(d), JointParam::Slider(p)) => Some(d.param_mut(p)),
            (JointData::SixDof(d), JointParam::Generic6Dof(axis, p)) => {
                Some(d.axis_data[axis.index()].param_mut(p))
            }
            _ => None,
        }
    }

    fn flag_mut(&mut self, flag: JointFlag) -> Option<&mut bool> {
        match (self, flag) {
            (JointData::Hinge(d), JointFlag::Hinge(f)) => Some(d.flag_mut(f)),
            (JointData::SixDof(d), JointFlag::Generic6Dof(axis, f)) => {
                Some(d.axis_data[axis.index()].flag_mut(f))
            }
            _ => None,
        }
    }

    fn fields(&self) -> &'static [FieldSpec] {
        match self {
            JointData::Pin(_) => PIN_FIELDS,
            JointData::Cone(_) => CONE_FIELDS,
            JointData::Hinge(_) => HINGE_FIELDS,
            JointData::Slider(_) => SLIDER_FIELDS,
            JointData::SixDof(_) => &[],
        }
    }

    /// 属性路径 → 字段描述
    ///
    /// 普通关节：`joint_constraints/<name>`
    /// 6DOF：`joint_constraints/<x|y|z>/<name>`
    fn resolve(&self, path: &str) -> Option<FieldSpec> {
        let rest = path.strip_prefix(JOINT_CONSTRAINTS_PREFIX)?;
        match self {
            JointData::SixDof(_) => {
                let (axis_name, var_name) = rest.split_once('/')?;
                let axis = Axis::from_name(axis_name)?;
                SIX_DOF_AXIS_FIELDS
                    .iter()
                    .find(|f| f.name == var_name)
                    .map(|f| f.resolve(axis))
            }
            _ => self.fields().iter().find(|f| f.name == rest).copied(),
        }
    }

    fn for_each_field(&self, mut f: impl FnMut(String, &FieldSpec)) {
        match self {
            JointData::SixDof(_) => {
                for axis in Axis::ALL {
                    for axis_field in SIX_DOF_AXIS_FIELDS {
                        let field = axis_field.resolve(axis);
                        let path = format!(
                            "{}{}/{}",
                            JOINT_CONSTRAINTS_PREFIX,
                            axis.name(),
                            field.name
                        );
                        f(path, &field);
                    }
                }
            }
            _ => {
                for field in self.fields() {
                    f(format!("{}{}", JOINT_CONSTRAINTS_PREFIX, field.name), field);
                }
            }
        }
    }
}
