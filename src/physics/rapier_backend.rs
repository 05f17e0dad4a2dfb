//! Rapier3D 物理后端
//!
//! [`PhysicsBackend`] 的默认实现。
//!
//! ## 概念映射
//! | 接口 | Rapier |
//! |------|--------|
//! | BodyHandle | RigidBody + 若干 Collider（每个形状一个） |
//! | JointHandle | ImpulseJoint（GenericJoint），参数变化时重建 |
//! | BodyMode::Static / Kinematic / Rigid | Fixed / KinematicPositionBased / Dynamic |
//! | 接触上报 | NarrowPhase::contact_pairs_with |
//!
//! 碰撞体密度为 0，质量通过 additional mass 设置，与形状无关。

use glam::{Mat4, Quat, Vec3};
use rapier3d::geometry::InteractionTestMode;
use rapier3d::math::{Pose, Rotation, Vector};
use rapier3d::prelude::*;
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::num::NonZeroUsize;

use super::backend::{
    Axis, BodyHandle, BodyMode, BodyParam, ConeTwistParam, ContactReport, DampChannel, DampMode,
    DirectBodyState, G6dofFlag, G6dofParam, HingeFlag, HingeParam, JointFlag, JointHandle,
    JointKind, JointParam, PhysicsBackend, SliderParam,
};
use super::config::get_config;
use super::scene::ObjectId;

/// 碰撞形状
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// 沿 Y 轴，`height` 为两端球心之间的距离
    Capsule { radius: f32, height: f32 },
}

impl ColliderShape {
    fn build(self) -> SharedShape {
        match self {
            ColliderShape::Sphere { radius } => SharedShape::ball(radius),
            ColliderShape::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ColliderShape::Capsule { radius, height } => {
                SharedShape::capsule_y(height / 2.0, radius)
            }
        }
    }
}

/// 后端内部的刚体记录
struct BodyEntry {
    handle: RigidBodyHandle,
    /// 下标即形状索引
    colliders: Vec<ColliderHandle>,
    object: Option<ObjectId>,
    mode: BodyMode,
    mass: f32,
    friction: f32,
    bounce: f32,
    gravity_scale: f32,
    linear_damp: f32,
    angular_damp: f32,
    linear_damp_mode: DampMode,
    angular_damp_mode: DampMode,
    layer: u32,
    mask: u32,
    priority: f32,
    can_sleep: bool,
    max_contacts: usize,
    omit_force_integration: bool,
    state_sync: bool,
}

impl BodyEntry {
    fn new(handle: RigidBodyHandle) -> Self {
        Self {
            handle,
            colliders: Vec::new(),
            object: None,
            mode: BodyMode::Static,
            mass: 1.0,
            friction: 1.0,
            bounce: 0.0,
            gravity_scale: 1.0,
            linear_damp: 0.0,
            angular_damp: 0.0,
            linear_damp_mode: DampMode::Combine,
            angular_damp_mode: DampMode::Combine,
            layer: 1,
            mask: 1,
            priority: 1.0,
            can_sleep: true,
            max_contacts: 0,
            omit_force_integration: false,
            state_sync: false,
        }
    }

    fn interaction_groups(&self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.layer),
            Group::from_bits_truncate(self.mask),
            InteractionTestMode::default(),
        )
    }

    /// 实际生效的阻尼：Combine 叠加区域阻尼
    fn effective_damping(&self, channel: DampChannel) -> f32 {
        if self.omit_force_integration {
            return 0.0;
        }
        let config = get_config();
        let (damp, mode, area) = match channel {
            DampChannel::Linear => (
                self.linear_damp,
                self.linear_damp_mode,
                config.area_linear_damp,
            ),
            DampChannel::Angular => (
                self.angular_damp,
                self.angular_damp_mode,
                config.area_angular_damp,
            ),
        };
        match mode {
            DampMode::Combine => damp + area,
            DampMode::Replace => damp,
        }
    }

    fn effective_gravity_scale(&self) -> f32 {
        if self.omit_force_integration {
            0.0
        } else {
            self.gravity_scale
        }
    }
}

/// 后端内部的关节记录
#[derive(Default)]
struct JointEntry {
    kind: Option<JointKind>,
    body_a: Option<BodyHandle>,
    body_b: Option<BodyHandle>,
    frame_a: Mat4,
    frame_b: Mat4,
    params: HashMap<JointParam, f32>,
    flags: HashMap<JointFlag, bool>,
    rapier: Option<ImpulseJointHandle>,
}

impl JointEntry {
    fn param(&self, param: JointParam) -> f32 {
        self.params.get(&param).copied().unwrap_or(0.0)
    }

    fn flag(&self, flag: JointFlag) -> bool {
        self.flags.get(&flag).copied().unwrap_or(false)
    }

    fn g6dof(&self, axis: Axis, param: G6dofParam) -> f32 {
        self.param(JointParam::Generic6Dof(axis, param))
    }

    fn g6dof_flag(&self, axis: Axis, flag: G6dofFlag) -> bool {
        self.flag(JointFlag::Generic6Dof(axis, flag))
    }

    /// 按当前种类与参数构建 Rapier 关节
    fn build_joint(&self, kind: JointKind) -> GenericJoint {
        const EPSILON: f32 = 0.0001;

        let mut frame_a = self.frame_a;
        let mut frame_b = self.frame_b;
        if kind == JointKind::Hinge {
            // 铰链轴为帧的 Z 轴，Rapier 的旋转自由轴为 X
            let to_x = Mat4::from_quat(Quat::from_rotation_y(-FRAC_PI_2));
            frame_a *= to_x;
            frame_b *= to_x;
        }

        let locked_axes = match kind {
            JointKind::Pin | JointKind::ConeTwist => JointAxesMask::LIN_AXES,
            JointKind::Hinge => JointAxesMask::LOCKED_REVOLUTE_AXES,
            JointKind::Slider => {
                JointAxesMask::LIN_Y
                    | JointAxesMask::LIN_Z
                    | JointAxesMask::ANG_Y
                    | JointAxesMask::ANG_Z
            }
            JointKind::Generic6Dof => {
                let mut mask = JointAxesMask::empty();
                for axis in Axis::ALL {
                    let (lin, ang) = axis_masks(axis);
                    if self.g6dof_flag(axis, G6dofFlag::EnableLinearLimit)
                        && (self.g6dof(axis, G6dofParam::LinearUpperLimit)
                            - self.g6dof(axis, G6dofParam::LinearLowerLimit))
                        .abs()
                            < EPSILON
                    {
                        mask |= lin;
                    }
                    if self.g6dof_flag(axis, G6dofFlag::EnableAngularLimit)
                        && (self.g6dof(axis, G6dofParam::AngularUpperLimit)
                            - self.g6dof(axis, G6dofParam::AngularLowerLimit))
                        .abs()
                            < EPSILON
                    {
                        mask |= ang;
                    }
                }
                mask
            }
        };

        let mut joint = GenericJointBuilder::new(locked_axes)
            .local_frame1(mat4_to_pose(frame_a))
            .local_frame2(mat4_to_pose(frame_b))
            .build();

        // 禁用关节连接的刚体之间的碰撞
        joint.contacts_enabled = false;

        match kind {
            // 偏置、阻尼、冲量上限仅记录
            JointKind::Pin => {}
            JointKind::ConeTwist => {
                let swing = self.param(JointParam::ConeTwist(ConeTwistParam::SwingSpan));
                let twist = self.param(JointParam::ConeTwist(ConeTwistParam::TwistSpan));
                joint.set_limits(JointAxis::AngX, [-twist, twist]);
                joint.set_limits(JointAxis::AngY, [-swing, swing]);
                joint.set_limits(JointAxis::AngZ, [-swing, swing]);
            }
            JointKind::Hinge => {
                if self.flag(JointFlag::Hinge(HingeFlag::UseLimit)) {
                    let lower = self.param(JointParam::Hinge(HingeParam::LimitLower));
                    let upper = self.param(JointParam::Hinge(HingeParam::LimitUpper));
                    if lower <= upper {
                        joint.set_limits(JointAxis::AngX, [lower, upper]);
                    }
                }
            }
            JointKind::Slider => {
                let lower = self.param(JointParam::Slider(SliderParam::LinearLimitLower));
                let upper = self.param(JointParam::Slider(SliderParam::LinearLimitUpper));
                if lower <= upper {
                    joint.set_limits(JointAxis::LinX, [lower, upper]);
                }
                let lower = self.param(JointParam::Slider(SliderParam::AngularLimitLower));
                let upper = self.param(JointParam::Slider(SliderParam::AngularLimitUpper));
                if lower <= upper {
                    joint.set_limits(JointAxis::AngX, [lower, upper]);
                }
            }
            JointKind::Generic6Dof => {
                for axis in Axis::ALL {
                    self.configure_6dof_axis(&mut joint, locked_axes, axis);
                }
            }
        }

        joint
    }

    fn configure_6dof_axis(&self, joint: &mut GenericJoint, locked: JointAxesMask, axis: Axis) {
        let (lin_mask, ang_mask) = axis_masks(axis);
        let (lin_axis, ang_axis) = joint_axes(axis);

        if !locked.contains(lin_mask) {
            if self.g6dof_flag(axis, G6dofFlag::EnableLinearLimit) {
                let lower = self.g6dof(axis, G6dofParam::LinearLowerLimit);
                let upper = self.g6dof(axis, G6dofParam::LinearUpperLimit);
                if lower <= upper {
                    joint.set_limits(lin_axis, [lower, upper]);
                }
            }
            if self.g6dof_flag(axis, G6dofFlag::EnableLinearSpring) {
                joint.set_motor(
                    lin_axis,
                    self.g6dof(axis, G6dofParam::LinearSpringEquilibriumPoint),
                    0.0,
                    self.g6dof(axis, G6dofParam::LinearSpringStiffness),
                    self.g6dof(axis, G6dofParam::LinearSpringDamping),
                );
            }
        }

        if !locked.contains(ang_mask) {
            if self.g6dof_flag(axis, G6dofFlag::EnableAngularLimit) {
                let lower = self.g6dof(axis, G6dofParam::AngularLowerLimit);
                let upper = self.g6dof(axis, G6dofParam::AngularUpperLimit);
                if lower <= upper {
                    joint.set_limits(ang_axis, [lower, upper]);
                }
            }
            // 电机优先于弹簧
            if self.g6dof_flag(axis, G6dofFlag::EnableMotor) {
                joint.set_motor(
                    ang_axis,
                    0.0,
                    self.g6dof(axis, G6dofParam::AngularMotorTargetVelocity),
                    0.0,
                    1.0,
                );
                joint.set_motor_max_force(
                    ang_axis,
                    self.g6dof(axis, G6dofParam::AngularMotorForceLimit),
                );
            } else if self.g6dof_flag(axis, G6dofFlag::EnableAngularSpring) {
                joint.set_motor(
                    ang_axis,
                    self.g6dof(axis, G6dofParam::AngularSpringEquilibriumPoint),
                    0.0,
                    self.g6dof(axis, G6dofParam::AngularSpringStiffness),
                    self.g6dof(axis, G6dofParam::AngularSpringDamping),
                );
            }
        }
    }
}

fn axis_masks(axis: Axis) -> (JointAxesMask, JointAxesMask) {
    match axis {
        Axis::X => (JointAxesMask::LIN_X, JointAxesMask::ANG_X),
        Axis::Y => (JointAxesMask::LIN_Y, JointAxesMask::ANG_Y),
        Axis::Z => (JointAxesMask::LIN_Z, JointAxesMask::ANG_Z),
    }
}

fn joint_axes(axis: Axis) -> (JointAxis, JointAxis) {
    match axis {
        Axis::X => (JointAxis::LinX, JointAxis::AngX),
        Axis::Y => (JointAxis::LinY, JointAxis::AngY),
        Axis::Z => (JointAxis::LinZ, JointAxis::AngZ),
    }
}

/// Rapier 物理世界
pub struct RapierBackend {
    /// 物理流水线
    pub physics_pipeline: PhysicsPipeline,
    /// 积分参数
    pub integration_parameters: IntegrationParameters,
    /// 岛管理器
    pub island_manager: IslandManager,
    /// 宽相检测
    pub broad_phase: DefaultBroadPhase,
    /// 窄相检测
    pub narrow_phase: NarrowPhase,
    /// 刚体集合
    pub rigid_body_set: RigidBodySet,
    /// 碰撞体集合
    pub collider_set: ColliderSet,
    /// 关节集合
    pub impulse_joint_set: ImpulseJointSet,
    /// 多体关节集合
    pub multibody_joint_set: MultibodyJointSet,
    /// CCD 求解器
    pub ccd_solver: CCDSolver,
    /// FPS（用于计算固定时间步长）
    pub fps: f32,
    /// 最大子步数
    pub max_substep_count: i32,
    /// 重力向量
    pub gravity: Vector,

    next_id: u64,
    bodies: HashMap<BodyHandle, BodyEntry>,
    by_rapier: HashMap<RigidBodyHandle, BodyHandle>,
    joints: HashMap<JointHandle, JointEntry>,
}

impl RapierBackend {
    /// 创建新的物理世界
    pub fn new() -> Self {
        let config = get_config();

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = 1.0 / config.physics_fps;
        integration_parameters.num_solver_iterations =
            NonZeroUsize::new(config.solver_iterations).unwrap_or(NonZeroUsize::MIN).get();

        if config.debug_log {
            log::info!(
                "[物理配置] FPS={}, 重力Y={}, 求解器迭代={}",
                config.physics_fps,
                config.gravity_y,
                config.solver_iterations
            );
        }

        Self {
            physics_pipeline: PhysicsPipeline::new(),
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            fps: config.physics_fps,
            max_substep_count: config.max_substep_count,
            gravity: Vector::new(0.0, config.gravity_y, 0.0),
            next_id: 0,
            bodies: HashMap::new(),
            by_rapier: HashMap::new(),
            joints: HashMap::new(),
        }
    }

    /// 设置 FPS
    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
        self.integration_parameters.dt = 1.0 / fps;
    }

    /// 设置重力
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = Vector::new(gravity.x, gravity.y, gravity.z);
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// 当前已建立的 Rapier 约束数
    pub fn active_joint_count(&self) -> usize {
        self.joints.values().filter(|j| j.rapier.is_some()).count()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// 给刚体添加一个形状，返回形状索引
    pub fn add_shape(
        &mut self,
        body: BodyHandle,
        shape: ColliderShape,
        local: Mat4,
    ) -> Option<usize> {
        let entry = self.bodies.get_mut(&body)?;
        let groups = entry.interaction_groups();
        let collider = ColliderBuilder::new(shape.build())
            .position(mat4_to_pose(local))
            .density(0.0)
            .friction(entry.friction)
            .restitution(entry.bounce)
            .collision_groups(groups)
            .solver_groups(groups)
            .build();
        let handle =
            self.collider_set
                .insert_with_parent(collider, entry.handle, &mut self.rigid_body_set);
        entry.colliders.push(handle);
        Some(entry.colliders.len() - 1)
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let handle = self.bodies.get(&body)?.handle;
        self.rigid_body_set.get_mut(handle)
    }

    fn for_each_collider(&mut self, body: BodyHandle, mut f: impl FnMut(&mut Collider)) {
        let Some(entry) = self.bodies.get(&body) else {
            return;
        };
        for handle in &entry.colliders {
            if let Some(collider) = self.collider_set.get_mut(*handle) {
                f(collider);
            }
        }
    }

    fn apply_collision_groups(&mut self, body: BodyHandle) {
        let Some(groups) = self.bodies.get(&body).map(BodyEntry::interaction_groups) else {
            return;
        };
        self.for_each_collider(body, |collider| {
            collider.set_collision_groups(groups);
            collider.set_solver_groups(groups);
        });
    }

    /// 重新计算重力缩放与阻尼（受 omit_force_integration 与阻尼模式影响）
    fn apply_integration(&mut self, body: BodyHandle) {
        let Some(entry) = self.bodies.get(&body) else {
            return;
        };
        let gravity_scale = entry.effective_gravity_scale();
        let linear = entry.effective_damping(DampChannel::Linear);
        let angular = entry.effective_damping(DampChannel::Angular);
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_gravity_scale(gravity_scale, true);
            rb.set_linear_damping(linear);
            rb.set_angular_damping(angular);
        }
    }

    /// 以当前记录重建 Rapier 约束
    fn rebuild_joint(&mut self, joint: JointHandle) {
        let Some(entry) = self.joints.get_mut(&joint) else {
            return;
        };
        if let Some(old) = entry.rapier.take() {
            self.impulse_joint_set.remove(old, true);
        }
        let (Some(kind), Some(a), Some(b)) = (entry.kind, entry.body_a, entry.body_b) else {
            return;
        };
        let (Some(handle_a), Some(handle_b)) = (
            self.bodies.get(&a).map(|e| e.handle),
            self.bodies.get(&b).map(|e| e.handle),
        ) else {
            log::warn!("[物理后端] 关节 {:?} 引用了已释放的刚体", joint);
            return;
        };
        let generic = entry.build_joint(kind);
        entry.rapier = Some(self.impulse_joint_set.insert(handle_a, handle_b, generic, true));
    }

    /// 更新物理模拟
    ///
    /// 使用时间累积器模式：前 N-1 步使用固定 dt，最后一步消化剩余时间。
    /// 返回所有注册了状态回传的刚体的状态。
    pub fn update(&mut self, delta_time: f32) -> Vec<DirectBodyState> {
        let fixed_dt = 1.0 / self.fps;
        let max_steps = self.max_substep_count.max(1);

        // 计算需要多少个固定步
        let needed_steps = (delta_time / fixed_dt).ceil() as i32;

        if needed_steps <= max_steps {
            for _ in 0..needed_steps {
                self.step_once(fixed_dt);
            }
        } else {
            // 帧率过低，前 (max_steps - 1) 步用固定 dt，最后一步用剩余时间
            let fixed_steps = max_steps - 1;
            let remaining = delta_time - fixed_steps as f32 * fixed_dt;
            for _ in 0..fixed_steps {
                self.step_once(fixed_dt);
            }
            self.step_once(remaining);
        }

        self.collect_states()
    }

    /// 执行一个固定步长
    pub fn step(&mut self) -> Vec<DirectBodyState> {
        let dt = 1.0 / self.fps;
        self.step_once(dt);
        self.collect_states()
    }

    fn step_once(&mut self, dt: f32) {
        // 不允许休眠的刚体每步唤醒
        for entry in self.bodies.values() {
            if !entry.can_sleep && entry.mode == BodyMode::Rigid {
                if let Some(rb) = self.rigid_body_set.get_mut(entry.handle) {
                    rb.wake_up(true);
                }
            }
        }

        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    fn collect_states(&self) -> Vec<DirectBodyState> {
        let mut states: Vec<DirectBodyState> = self
            .bodies
            .iter()
            .filter(|(_, entry)| entry.state_sync)
            .filter_map(|(handle, entry)| self.body_state(*handle, entry))
            .collect();
        states.sort_by_key(|s| s.body);
        states
    }

    fn body_state(&self, body: BodyHandle, entry: &BodyEntry) -> Option<DirectBodyState> {
        let rb = self.rigid_body_set.get(entry.handle)?;
        let linvel = rb.linvel();
        let angvel = rb.angvel();
        Some(DirectBodyState {
            body,
            transform: pose_to_mat4(*rb.position()),
            linear_velocity: Vec3::new(linvel.x, linvel.y, linvel.z),
            angular_velocity: Vec3::new(angvel.x, angvel.y, angvel.z),
            contacts: self.contacts_of(entry),
        })
    }

    /// 收集刚体的接触，最多 max_contacts 个
    fn contacts_of(&self, entry: &BodyEntry) -> Vec<ContactReport> {
        let mut contacts = Vec::new();
        if entry.max_contacts == 0 {
            return contacts;
        }

        for (local_shape, collider) in entry.colliders.iter().enumerate() {
            for pair in self.narrow_phase.contact_pairs_with(*collider) {
                if !pair.has_any_active_contact() {
                    continue;
                }
                let other = if pair.collider1 == *collider {
                    pair.collider2
                } else {
                    pair.collider1
                };
                let Some(report) = self.report_for(other, local_shape) else {
                    continue;
                };
                contacts.push(report);
                if contacts.len() >= entry.max_contacts {
                    return contacts;
                }
            }
        }
        contacts
    }

    fn report_for(&self, collider: ColliderHandle, local_shape: usize) -> Option<ContactReport> {
        let parent = self.collider_set.get(collider)?.parent()?;
        let body = *self.by_rapier.get(&parent)?;
        let entry = self.bodies.get(&body)?;
        let collider_shape = entry.colliders.iter().position(|c| *c == collider)?;
        Some(ContactReport {
            collider: body,
            collider_object: entry.object?,
            collider_shape: i32::try_from(collider_shape).ok()?,
            local_shape: i32::try_from(local_shape).ok()?,
        })
    }
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for RapierBackend {
    fn body_create(&mut self) -> BodyHandle {
        let handle = BodyHandle(self.next_handle());
        let rapier = self.rigid_body_set.insert(RigidBodyBuilder::fixed().build());
        let entry = BodyEntry::new(rapier);
        let mass = entry.mass;
        self.bodies.insert(handle, entry);
        self.by_rapier.insert(rapier, handle);

        if let Some(rb) = self.rigid_body_set.get_mut(rapier) {
            rb.set_additional_mass(mass, false);
        }
        self.apply_integration(handle);
        handle
    }

    fn body_free(&mut self, body: BodyHandle) {
        let Some(entry) = self.bodies.remove(&body) else {
            return;
        };
        self.by_rapier.remove(&entry.handle);

        // 关节随刚体一起被 Rapier 移除
        for joint in self.joints.values_mut() {
            if joint.body_a == Some(body) || joint.body_b == Some(body) {
                joint.rapier = None;
            }
        }

        self.rigid_body_set.remove(
            entry.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    fn body_set_object(&mut self, body: BodyHandle, object: ObjectId) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.object = Some(object);
        }
    }

    fn body_set_mode(&mut self, body: BodyHandle, mode: BodyMode) {
        let Some(entry) = self.bodies.get_mut(&body) else {
            return;
        };
        entry.mode = mode;
        let body_type = match mode {
            BodyMode::Static => RigidBodyType::Fixed,
            BodyMode::Kinematic => RigidBodyType::KinematicPositionBased,
            BodyMode::Rigid => RigidBodyType::Dynamic,
        };
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_body_type(body_type, true);
        }
    }

    fn body_get_mode(&self, body: BodyHandle) -> BodyMode {
        self.bodies.get(&body).map(|e| e.mode).unwrap_or_default()
    }

    fn body_set_param(&mut self, body: BodyHandle, param: BodyParam, value: f32) {
        let Some(entry) = self.bodies.get_mut(&body) else {
            return;
        };
        match param {
            BodyParam::Mass => {
                entry.mass = value;
                if let Some(rb) = self.rigid_body_mut(body) {
                    rb.set_additional_mass(value, true);
                }
            }
            BodyParam::Friction => {
                entry.friction = value;
                self.for_each_collider(body, |c| c.set_friction(value));
            }
            BodyParam::Bounce => {
                entry.bounce = value;
                self.for_each_collider(body, |c| c.set_restitution(value));
            }
            BodyParam::GravityScale => {
                entry.gravity_scale = value;
                self.apply_integration(body);
            }
            BodyParam::LinearDamp => {
                entry.linear_damp = value;
                self.apply_integration(body);
            }
            BodyParam::AngularDamp => {
                entry.angular_damp = value;
                self.apply_integration(body);
            }
        }
    }

    fn body_get_param(&self, body: BodyHandle, param: BodyParam) -> f32 {
        let Some(entry) = self.bodies.get(&body) else {
            return 0.0;
        };
        match param {
            BodyParam::Mass => entry.mass,
            BodyParam::Friction => entry.friction,
            BodyParam::Bounce => entry.bounce,
            BodyParam::GravityScale => entry.gravity_scale,
            BodyParam::LinearDamp => entry.linear_damp,
            BodyParam::AngularDamp => entry.angular_damp,
        }
    }

    fn body_set_damp_mode(&mut self, body: BodyHandle, channel: DampChannel, mode: DampMode) {
        let Some(entry) = self.bodies.get_mut(&body) else {
            return;
        };
        match channel {
            DampChannel::Linear => entry.linear_damp_mode = mode,
            DampChannel::Angular => entry.angular_damp_mode = mode,
        }
        self.apply_integration(body);
    }

    fn body_set_collision_layer(&mut self, body: BodyHandle, layer: u32) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.layer = layer;
            self.apply_collision_groups(body);
        }
    }

    fn body_get_collision_layer(&self, body: BodyHandle) -> u32 {
        self.bodies.get(&body).map(|e| e.layer).unwrap_or(0)
    }

    fn body_set_collision_mask(&mut self, body: BodyHandle, mask: u32) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.mask = mask;
            self.apply_collision_groups(body);
        }
    }

    fn body_get_collision_mask(&self, body: BodyHandle) -> u32 {
        self.bodies.get(&body).map(|e| e.mask).unwrap_or(0)
    }

    /// Rapier 没有碰撞优先级，仅记录
    fn body_set_collision_priority(&mut self, body: BodyHandle, priority: f32) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.priority = priority;
        }
    }

    fn body_get_collision_priority(&self, body: BodyHandle) -> f32 {
        self.bodies.get(&body).map(|e| e.priority).unwrap_or(0.0)
    }

    fn body_set_can_sleep(&mut self, body: BodyHandle, can_sleep: bool) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.can_sleep = can_sleep;
        }
        if !can_sleep {
            if let Some(rb) = self.rigid_body_mut(body) {
                rb.wake_up(true);
            }
        }
    }

    fn body_set_ccd(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.enable_ccd(enabled);
        }
    }

    fn body_set_max_contacts_reported(&mut self, body: BodyHandle, amount: usize) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.max_contacts = amount;
        }
    }

    fn body_set_omit_force_integration(&mut self, body: BodyHandle, omit: bool) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.omit_force_integration = omit;
            self.apply_integration(body);
        }
    }

    fn body_set_transform(&mut self, body: BodyHandle, transform: Mat4) {
        let Some(mode) = self.bodies.get(&body).map(|e| e.mode) else {
            return;
        };
        let pose = mat4_to_pose(transform);
        if let Some(rb) = self.rigid_body_mut(body) {
            if mode == BodyMode::Kinematic {
                rb.set_next_kinematic_position(pose);
            } else {
                rb.set_position(pose, true);
            }
        }
    }

    fn body_get_transform(&self, body: BodyHandle) -> Mat4 {
        let Some(entry) = self.bodies.get(&body) else {
            return Mat4::IDENTITY;
        };
        let Some(rb) = self.rigid_body_set.get(entry.handle) else {
            return Mat4::IDENTITY;
        };
        if entry.mode == BodyMode::Kinematic {
            pose_to_mat4(*rb.next_position())
        } else {
            pose_to_mat4(*rb.position())
        }
    }

    fn body_set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_linvel(to_vector(velocity), true);
        }
    }

    fn body_set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_angvel(to_vector(velocity), true);
        }
    }

    fn body_apply_central_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.apply_impulse(to_vector(impulse), true);
        }
    }

    fn body_apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, position: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.apply_impulse(to_vector(impulse), true);
            rb.apply_torque_impulse(to_vector(position.cross(impulse)), true);
        }
    }

    fn body_set_state_sync(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.state_sync = enabled;
        }
    }

    fn joint_create(&mut self) -> JointHandle {
        let handle = JointHandle(self.next_handle());
        self.joints.insert(handle, JointEntry::default());
        handle
    }

    fn joint_free(&mut self, joint: JointHandle) {
        if let Some(entry) = self.joints.remove(&joint) {
            if let Some(rapier) = entry.rapier {
                self.impulse_joint_set.remove(rapier, true);
            }
        }
    }

    fn joint_clear(&mut self, joint: JointHandle) {
        let Some(entry) = self.joints.get_mut(&joint) else {
            return;
        };
        if let Some(rapier) = entry.rapier.take() {
            self.impulse_joint_set.remove(rapier, true);
        }
        *entry = JointEntry::default();
    }

    fn joint_kind(&self, joint: JointHandle) -> Option<JointKind> {
        self.joints.get(&joint).and_then(|j| j.kind)
    }

    fn joint_make(
        &mut self,
        joint: JointHandle,
        kind: JointKind,
        body_a: BodyHandle,
        frame_a: Mat4,
        body_b: BodyHandle,
        frame_b: Mat4,
    ) {
        let Some(entry) = self.joints.get_mut(&joint) else {
            return;
        };
        if let Some(rapier) = entry.rapier.take() {
            self.impulse_joint_set.remove(rapier, true);
        }
        *entry = JointEntry {
            kind: Some(kind),
            body_a: Some(body_a),
            body_b: Some(body_b),
            frame_a,
            frame_b,
            ..Default::default()
        };
        self.rebuild_joint(joint);
    }

    fn joint_set_param(&mut self, joint: JointHandle, param: JointParam, value: f32) {
        let Some(entry) = self.joints.get_mut(&joint) else {
            return;
        };
        if entry.kind != Some(param.kind()) {
            return;
        }
        entry.params.insert(param, value);
        self.rebuild_joint(joint);
    }

    fn joint_get_param(&self, joint: JointHandle, param: JointParam) -> Option<f32> {
        self.joints.get(&joint)?.params.get(&param).copied()
    }

    fn joint_set_flag(&mut self, joint: JointHandle, flag: JointFlag, enabled: bool) {
        let Some(entry) = self.joints.get_mut(&joint) else {
            return;
        };
        if entry.kind != Some(flag.kind()) {
            return;
        }
        entry.flags.insert(flag, enabled);
        self.rebuild_joint(joint);
    }

    fn joint_get_flag(&self, joint: JointHandle, flag: JointFlag) -> Option<bool> {
        self.joints.get(&joint)?.flags.get(&flag).copied()
    }
}

/// 将 glam Mat4 转换为 Rapier Pose（丢弃缩放）
pub fn mat4_to_pose(mat: Mat4) -> Pose {
    let (_, rotation, translation) = mat.to_scale_rotation_translation();
    Pose::from_translation(Vector::new(translation.x, translation.y, translation.z))
        * Pose::from_rotation(Rotation::from_xyzw(rotation.x, rotation.y, rotation.z, rotation.w))
}

/// 将 Rapier Pose 转换为 glam Mat4
pub fn pose_to_mat4(pose: Pose) -> Mat4 {
    let translation = Vec3::new(pose.translation.x, pose.translation.y, pose.translation.z);
    let rot = pose.rotation;
    let rotation = Quat::from_xyzw(rot.x, rot.y, rot.z, rot.w);
    Mat4::from_rotation_translation(rotation, translation)
}

fn to_vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::backend::PinParam;

    fn dynamic_sphere(backend: &mut RapierBackend, position: Vec3, object: ObjectId) -> BodyHandle {
        let body = backend.body_create();
        backend.body_set_object(body, object);
        backend
            .add_shape(body, ColliderShape::Sphere { radius: 0.5 }, Mat4::IDENTITY)
            .unwrap();
        backend.body_set_mode(body, BodyMode::Rigid);
        backend.body_set_transform(body, Mat4::from_translation(position));
        backend.body_set_state_sync(body, true);
        body
    }

    #[test]
    fn test_pose_conversion_keeps_rotation_and_translation() {
        let m = Mat4::from_rotation_translation(
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let back = pose_to_mat4(mat4_to_pose(m));
        assert!(back.abs_diff_eq(m, 1e-5));
    }

    #[test]
    fn test_rigid_body_falls_under_gravity() {
        let mut backend = RapierBackend::new();
        let body = dynamic_sphere(&mut backend, Vec3::new(0.0, 10.0, 0.0), ObjectId(1));

        let states = backend.update(0.5);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].body, body);
        assert!(states[0].transform.w_axis.y < 10.0);
        assert!(states[0].linear_velocity.y < 0.0);
    }

    #[test]
    fn test_static_body_stays_and_is_not_reported() {
        let mut backend = RapierBackend::new();
        let body = backend.body_create();
        backend
            .add_shape(body, ColliderShape::Box { half_extents: Vec3::ONE }, Mat4::IDENTITY)
            .unwrap();
        backend.body_set_transform(body, Mat4::from_translation(Vec3::Y));

        assert!(backend.update(0.1).is_empty());
        assert!((backend.body_get_transform(body).w_axis.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_omit_force_integration_disables_gravity() {
        let mut backend = RapierBackend::new();
        let body = dynamic_sphere(&mut backend, Vec3::new(0.0, 5.0, 0.0), ObjectId(1));
        backend.body_set_omit_force_integration(body, true);

        let states = backend.update(0.5);
        assert!((states[0].transform.w_axis.y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_contacts_reported_with_shape_indices() {
        let mut backend = RapierBackend::new();
        let ground = backend.body_create();
        backend.body_set_object(ground, ObjectId(7));
        backend
            .add_shape(
                ground,
                ColliderShape::Box { half_extents: Vec3::new(5.0, 1.0, 5.0) },
                Mat4::IDENTITY,
            )
            .unwrap();
        backend.body_set_transform(ground, Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));

        let ball = dynamic_sphere(&mut backend, Vec3::new(0.0, 0.4, 0.0), ObjectId(8));
        backend.body_set_max_contacts_reported(ball, 4);

        let states = backend.step();
        let contacts = &states[0].contacts;
        assert!(!contacts.is_empty());
        assert_eq!(contacts[0].collider, ground);
        assert_eq!(contacts[0].collider_object, ObjectId(7));
        assert_eq!((contacts[0].collider_shape, contacts[0].local_shape), (0, 0));

        // 上限为 0 时不上报
        backend.body_set_max_contacts_reported(ball, 0);
        assert!(backend.step()[0].contacts.is_empty());
    }

    #[test]
    fn test_joint_lifecycle() {
        let mut backend = RapierBackend::new();
        let a = dynamic_sphere(&mut backend, Vec3::ZERO, ObjectId(1));
        let b = dynamic_sphere(&mut backend, Vec3::Y, ObjectId(2));
        let joint = backend.joint_create();
        assert_eq!(backend.joint_kind(joint), None);
        assert_eq!(backend.active_joint_count(), 0);

        backend.joint_make(
            joint,
            JointKind::Hinge,
            a,
            Mat4::from_translation(Vec3::Y),
            b,
            Mat4::IDENTITY,
        );
        assert_eq!(backend.joint_kind(joint), Some(JointKind::Hinge));
        assert_eq!(backend.active_joint_count(), 1);

        let upper = JointParam::Hinge(HingeParam::LimitUpper);
        backend.joint_set_param(joint, upper, 0.5);
        backend.joint_set_flag(joint, JointFlag::Hinge(HingeFlag::UseLimit), true);
        assert_eq!(backend.joint_get_param(joint, upper), Some(0.5));
        assert_eq!(backend.active_joint_count(), 1);

        // 种类不符的参数被忽略
        backend.joint_set_param(joint, JointParam::Pin(PinParam::Bias), 0.1);
        assert_eq!(backend.joint_get_param(joint, JointParam::Pin(PinParam::Bias)), None);

        backend.joint_clear(joint);
        assert_eq!(backend.joint_kind(joint), None);
        assert_eq!(backend.active_joint_count(), 0);
        backend.joint_free(joint);
    }

    #[test]
    fn test_free_body_drops_attached_joint() {
        let mut backend = RapierBackend::new();
        let a = dynamic_sphere(&mut backend, Vec3::ZERO, ObjectId(1));
        let b = dynamic_sphere(&mut backend, Vec3::Y, ObjectId(2));
        let joint = backend.joint_create();
        backend.joint_make(joint, JointKind::Pin, a, Mat4::IDENTITY, b, Mat4::IDENTITY);

        backend.body_free(b);
        assert_eq!(backend.body_count(), 1);
        assert_eq!(backend.active_joint_count(), 0);
        assert_eq!(backend.body_get_mode(b), BodyMode::Static);
        backend.joint_free(joint);
    }

    #[test]
    fn test_six_dof_locks_axes_with_equal_limits() {
        let mut entry = JointEntry {
            kind: Some(JointKind::Generic6Dof),
            ..Default::default()
        };
        for axis in Axis::ALL {
            entry
                .flags
                .insert(JointFlag::Generic6Dof(axis, G6dofFlag::EnableLinearLimit), true);
        }
        entry
            .flags
            .insert(JointFlag::Generic6Dof(Axis::Y, G6dofFlag::EnableAngularLimit), true);

        let joint = entry.build_joint(JointKind::Generic6Dof);
        assert!(joint.locked_axes.contains(JointAxesMask::LIN_AXES));
        assert!(joint.locked_axes.contains(JointAxesMask::ANG_Y));
        assert!(!joint.locked_axes.contains(JointAxesMask::ANG_X));
    }
}
