//! 物理骨骼
//!
//! 单根骨骼对应的物理刚体节点，负责：
//! - 变换同步：骨骼姿态 ↔ 节点全局变换 ↔ 后端刚体变换
//! - 模拟状态机：Unbound / KinematicFollow / DynamicSimulate
//! - 关节生命周期：按关节类型与父刚体重建后端约束
//! - 接触监视：见 [`ContactMonitor`]
//!
//! 外部协作者（后端、骨架模拟器、场景树）在每次调用时通过 [`BoneContext`] 注入。
//!
//! ## 每帧流程
//! 1. 未模拟：所有者调用 [`PhysicalBone::update_kinematic_pose`]，刚体跟随骨骼姿态
//! 2. 模拟中：后端步进后回传 [`DirectBodyState`]，所有者转交给
//!    [`PhysicalBone::body_state_changed`]，结果写回骨骼姿态

use glam::{Mat4, Vec3};

use super::backend::{
    BodyHandle, BodyMode, BodyParam, DampChannel, DampMode, DirectBodyState, JointHandle,
    JointKind, PhysicsBackend,
};
use super::config::get_config;
use super::contact_monitor::{ContactEvent, ContactListener, ContactMonitor};
use super::joint_data::{JointData, JointType};
use super::property::{PropertyInfo, PropertyKind, PropertyValue};
use super::scene::{BoneContext, ObjectId, SceneTree};
use super::transform;
use crate::{BonePhysicsError, Result};

/// 属性名：绑定的骨骼
pub const BONE_NAME_PROPERTY: &str = "bone_name";

/// 模拟状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// 没有解析到骨骼
    Unbound,
    /// 刚体跟随骨骼姿态
    KinematicFollow,
    /// 刚体由物理驱动，结果写回骨骼
    DynamicSimulate,
}

/// 自定义积分钩子
///
/// 每个物理步收到后端状态，可以修改节点的全局变换；
/// 修改后的变换会立即推送给后端，并作为本步的最终结果。
pub trait ForceIntegrator {
    fn integrate_forces(&mut self, state: &DirectBodyState, transform: &mut Mat4);
}

impl<F: FnMut(&DirectBodyState, &mut Mat4)> ForceIntegrator for F {
    fn integrate_forces(&mut self, state: &DirectBodyState, transform: &mut Mat4) {
        self(state, transform)
    }
}

/// 把事件分发给全部监听者
struct ListenerFanout<'a>(&'a mut [Box<dyn ContactListener>]);

impl ContactListener for ListenerFanout<'_> {
    fn on_contact_event(&mut self, event: &ContactEvent) {
        for listener in self.0.iter_mut() {
            listener.on_contact_event(event);
        }
    }
}

fn check_range(name: &'static str, value: f32, valid: bool) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(BonePhysicsError::OutOfRange { name, value })
    }
}

/// 物理骨骼
pub struct PhysicalBone {
    object: ObjectId,
    body: BodyHandle,
    joint: JointHandle,
    released: bool,

    // ========== 骨骼绑定 ==========
    bone_name: String,
    /// -1 表示未解析
    bone_id: i32,
    in_tree: bool,

    // ========== 变换 ==========
    global_transform: Mat4,
    /// 模拟时为根变换，不再相对骨架解释
    top_level: bool,
    ignore_transform_notification: bool,
    editor_hint: bool,
    gizmo_move_joint: bool,
    joint_offset: Mat4,
    body_offset: Mat4,
    body_offset_inverse: Mat4,

    joint_data: Option<JointData>,

    // ========== 刚体参数 ==========
    mass: f32,
    friction: f32,
    bounce: f32,
    gravity_scale: f32,
    linear_damp: f32,
    angular_damp: f32,
    linear_damp_mode: DampMode,
    angular_damp_mode: DampMode,
    can_sleep: bool,
    ccd: bool,
    max_contacts_reported: usize,
    custom_integrator: bool,
    collision_layer: u32,
    collision_mask: u32,
    collision_priority: f32,

    // ========== 后端回传 ==========
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    contact_count: usize,

    // ========== 模拟状态 ==========
    simulate_physics: bool,
    internal_simulate_physics: bool,

    // ========== 接触 ==========
    contact_monitor: Option<ContactMonitor>,
    contact_monitor_disable_pending: bool,
    contact_listeners: Vec<Box<dyn ContactListener>>,
    force_integrator: Option<Box<dyn ForceIntegrator>>,
}

impl PhysicalBone {
    /// 创建刚体与关节句柄，刚体初始为静态
    pub fn new(backend: &mut dyn PhysicsBackend, object: ObjectId) -> Self {
        let config = get_config();

        let body = backend.body_create();
        backend.body_set_object(body, object);
        backend.body_set_mode(body, BodyMode::Static);
        backend.body_set_param(body, BodyParam::Mass, config.default_mass);
        backend.body_set_param(body, BodyParam::Friction, config.default_friction);
        backend.body_set_param(body, BodyParam::Bounce, config.default_bounce);
        backend.body_set_param(body, BodyParam::GravityScale, config.default_gravity_scale);
        backend.body_set_collision_layer(body, 1);
        backend.body_set_collision_mask(body, 1);
        backend.body_set_collision_priority(body, 1.0);

        let joint = backend.joint_create();

        if config.debug_log {
            log::debug!("[物理骨骼] 创建 {:?}: 刚体 {:?}, 关节 {:?}", object, body, joint);
        }

        Self {
            object,
            body,
            joint,
            released: false,

            bone_name: String::new(),
            bone_id: -1,
            in_tree: false,

            global_transform: Mat4::IDENTITY,
            top_level: false,
            ignore_transform_notification: false,
            editor_hint: false,
            gizmo_move_joint: false,
            joint_offset: Mat4::IDENTITY,
            body_offset: Mat4::IDENTITY,
            body_offset_inverse: Mat4::IDENTITY,

            joint_data: None,

            mass: config.default_mass,
            friction: config.default_friction,
            bounce: config.default_bounce,
            gravity_scale: config.default_gravity_scale,
            linear_damp: 0.0,
            angular_damp: 0.0,
            linear_damp_mode: DampMode::Combine,
            angular_damp_mode: DampMode::Combine,
            can_sleep: true,
            ccd: false,
            max_contacts_reported: 0,
            custom_integrator: false,
            collision_layer: 1,
            collision_mask: 1,
            collision_priority: 1.0,

            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            contact_count: 0,

            simulate_physics: false,
            internal_simulate_physics: false,

            contact_monitor: None,
            contact_monitor_disable_pending: false,
            contact_listeners: Vec::new(),
            force_integrator: None,
        }
    }

    /// 释放后端句柄并退订所有接触对象
    pub fn release(mut self, backend: &mut dyn PhysicsBackend, scene: &mut dyn SceneTree) {
        if let Some(monitor) = self.contact_monitor.take() {
            monitor.shutdown(scene);
        }
        backend.joint_free(self.joint);
        backend.body_free(self.body);
        self.released = true;
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn joint(&self) -> JointHandle {
        self.joint
    }

    fn bone_index(&self) -> Option<usize> {
        usize::try_from(self.bone_id).ok()
    }

    // ========== 场景通知 ==========

    /// 进入场景树（骨骼已挂到模拟器下）
    pub fn enter_tree(&mut self, ctx: &mut BoneContext<'_>) {
        self.in_tree = true;
        self.update_bone_id(ctx);
        self.reset_to_rest_position(ctx);
        self.reset_physics_simulation_state(ctx);
        self.reload_joint(ctx);
    }

    /// 离开场景树：解绑骨骼、清除关节、停止模拟
    pub fn exit_tree(&mut self, ctx: &mut BoneContext<'_>) {
        if let Some(bone) = self.bone_index() {
            if let Some(simulator) = ctx.simulator_mut() {
                simulator.unbind_physical_bone(bone);
            }
        }
        self.bone_id = -1;
        ctx.backend.joint_clear(self.joint);
        self.stop_physics_simulation(ctx);
        self.in_tree = false;
    }

    pub fn is_inside_tree(&self) -> bool {
        self.in_tree
    }

    /// 节点变换被外部修改（编辑器中反推偏移）
    pub fn transform_changed(&mut self, ctx: &mut BoneContext<'_>) {
        if self.editor_hint && !self.ignore_transform_notification {
            self.update_offset(ctx);
        }
    }

    /// 骨骼层级中父物理骨骼发生变化
    pub fn on_bone_parent_changed(&mut self, ctx: &mut BoneContext<'_>) {
        self.reload_joint(ctx);
    }

    // ========== 变换同步 ==========

    pub fn global_transform(&self) -> Mat4 {
        self.global_transform
    }

    /// 设置全局变换并推送给后端
    pub fn set_global_transform(&mut self, ctx: &mut BoneContext<'_>, transform: Mat4) {
        self.global_transform = transform;
        ctx.backend.body_set_transform(self.body, transform);
        self.transform_changed(ctx);
    }

    /// 相对父节点（骨架）的变换；模拟时为根变换
    pub fn local_transform(&self, ctx: &BoneContext<'_>) -> Mat4 {
        match ctx.skeleton_transform() {
            Some(skeleton) if !self.top_level => skeleton.inverse() * self.global_transform,
            _ => self.global_transform,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.top_level
    }

    /// 按骨骼当前姿态重置刚体位置
    pub fn reset_to_rest_position(&mut self, ctx: &mut BoneContext<'_>) {
        let Some(skeleton) = ctx.skeleton_transform() else {
            return;
        };
        let rest = match (self.bone_index(), ctx.simulator()) {
            (Some(bone), Some(simulator)) => {
                skeleton * simulator.bone_global_pose(bone) * self.body_offset
            }
            _ => skeleton * self.body_offset,
        };
        self.set_global_transform(ctx, transform::orthonormalized(rest));
    }

    /// 未模拟时每帧调用：刚体跟随骨骼
    pub fn update_kinematic_pose(&mut self, ctx: &mut BoneContext<'_>) {
        if self.internal_simulate_physics {
            return;
        }
        self.reset_to_rest_position(ctx);
    }

    /// 编辑器拖动后，根据当前全局变换反推 body_offset 或 joint_offset
    pub fn update_offset(&mut self, ctx: &mut BoneContext<'_>) {
        if !self.editor_hint {
            return;
        }
        let Some(skeleton) = ctx.skeleton_transform() else {
            return;
        };

        let mut bone_transform = skeleton;
        if let (Some(bone), Some(simulator)) = (self.bone_index(), ctx.simulator()) {
            bone_transform *= simulator.bone_global_pose(bone);
        }

        if self.gizmo_move_joint {
            bone_transform *= self.body_offset;
            let offset = bone_transform.inverse() * self.global_transform;
            self.set_joint_offset(ctx, offset);
        } else {
            let offset = bone_transform.inverse() * self.global_transform;
            self.set_body_offset(ctx, offset);
        }
    }

    /// 后端每步回传的状态
    pub fn body_state_changed(&mut self, ctx: &mut BoneContext<'_>, state: &DirectBodyState) {
        if !self.simulate_physics || !self.internal_simulate_physics {
            return;
        }

        let mut overridden: Option<DirectBodyState> = None;
        if let Some(mut integrator) = self.force_integrator.take() {
            self.sync_body_state(state);

            let old_transform = self.global_transform;
            let mut new_transform = old_transform;
            integrator.integrate_forces(state, &mut new_transform);

            if new_transform != old_transform {
                // 推回后端，避免被下面的同步覆盖
                ctx.backend.body_set_transform(self.body, new_transform);
                let mut state = state.clone();
                state.transform = new_transform;
                overridden = Some(state);
            }
            self.force_integrator = Some(integrator);
        }
        let state = overridden.as_ref().unwrap_or(state);

        self.sync_body_state(state);

        if let Some(monitor) = self.contact_monitor.as_mut() {
            let mut listeners = ListenerFanout(&mut self.contact_listeners);
            monitor.process_contacts(&state.contacts, &mut *ctx.scene, &mut listeners);
        }
        self.flush_deferred_contact_monitor(&mut *ctx.scene);

        let Some(skeleton) = ctx.skeleton_transform() else {
            return;
        };
        let Some(bone) = self.bone_index() else {
            return;
        };
        let pose = skeleton.inverse() * (state.transform * self.body_offset_inverse);
        if let Some(simulator) = ctx.simulator_mut() {
            simulator.set_bone_global_pose(bone, pose);
        }
    }

    /// 采用后端状态（不触发变换通知，也不推回后端）
    fn sync_body_state(&mut self, state: &DirectBodyState) {
        self.ignore_transform_notification = true;
        self.global_transform = state.transform;
        self.ignore_transform_notification = false;

        self.contact_count = state.contact_count();
        self.linear_velocity = state.linear_velocity;
        self.angular_velocity = state.angular_velocity;
    }

    // ========== 偏移 ==========

    pub fn joint_offset(&self) -> Mat4 {
        self.joint_offset
    }

    pub fn set_joint_offset(&mut self, ctx: &mut BoneContext<'_>, offset: Mat4) {
        self.joint_offset = offset;
        self.update_joint_offset(ctx);
    }

    /// 关节基的旋转（YXZ 欧拉角，弧度），保留缩放
    pub fn set_joint_rotation(&mut self, ctx: &mut BoneContext<'_>, euler: Vec3) {
        self.joint_offset = transform::with_euler_rotation(self.joint_offset, euler);
        self.update_joint_offset(ctx);
    }

    pub fn joint_rotation(&self) -> Vec3 {
        transform::euler_rotation(self.joint_offset)
    }

    pub fn body_offset(&self) -> Mat4 {
        self.body_offset
    }

    pub fn body_offset_inverse(&self) -> Mat4 {
        self.body_offset_inverse
    }

    pub fn set_body_offset(&mut self, ctx: &mut BoneContext<'_>, offset: Mat4) {
        self.body_offset = offset;
        self.body_offset_inverse = offset.inverse();
        self.update_joint_offset(ctx);
    }

    fn update_joint_offset(&mut self, ctx: &mut BoneContext<'_>) {
        self.fix_joint_offset(ctx);

        self.ignore_transform_notification = true;
        self.reset_to_rest_position(ctx);
        self.ignore_transform_notification = false;

        self.reload_joint(ctx);
    }

    /// 关节原点固定在骨骼原点
    fn fix_joint_offset(&mut self, ctx: &BoneContext<'_>) {
        if ctx.simulator().is_some() {
            self.joint_offset = transform::with_origin(
                self.joint_offset,
                transform::origin(self.body_offset_inverse),
            );
        }
    }

    // ========== 编辑器 ==========

    pub fn set_editor_hint(&mut self, editor_hint: bool) {
        self.editor_hint = editor_hint;
    }

    pub fn set_gizmo_move_joint(&mut self, move_joint: bool) {
        self.gizmo_move_joint = move_joint;
    }

    pub fn global_gizmo_transform(&self) -> Mat4 {
        if self.gizmo_move_joint {
            self.global_transform * self.joint_offset
        } else {
            self.global_transform
        }
    }

    pub fn local_gizmo_transform(&self, ctx: &BoneContext<'_>) -> Mat4 {
        let local = self.local_transform(ctx);
        if self.gizmo_move_joint {
            local * self.joint_offset
        } else {
            local
        }
    }

    // ========== 骨骼绑定 ==========

    pub fn bone_name(&self) -> &str {
        &self.bone_name
    }

    pub fn bone_id(&self) -> i32 {
        self.bone_id
    }

    pub fn set_bone_name(&mut self, ctx: &mut BoneContext<'_>, name: impl Into<String>) {
        self.bone_name = name.into();

        if let Some(old) = self.bone_index() {
            if let Some(simulator) = ctx.simulator_mut() {
                simulator.unbind_physical_bone(old);
            }
        }
        self.bone_id = -1;

        self.update_bone_id(ctx);
        if self.bone_id == -1 && self.internal_simulate_physics {
            self.stop_physics_simulation(ctx);
        }
        self.reset_to_rest_position(ctx);
    }

    /// 按骨骼名重新解析骨骼索引
    pub fn update_bone_id(&mut self, ctx: &mut BoneContext<'_>) {
        let body = self.body;
        let old_bone = self.bone_index();
        let Some(simulator) = ctx.simulator_mut() else {
            return;
        };

        let new_bone = simulator.find_bone(&self.bone_name);
        if new_bone == old_bone {
            return;
        }

        if let Some(old) = old_bone {
            simulator.unbind_physical_bone(old);
        }
        if let Some(bone) = new_bone {
            simulator.bind_physical_bone(bone, body);
            if self.internal_simulate_physics {
                simulator.set_bone_simulating(bone, true);
            }
        }
        self.bone_id = new_bone.and_then(|b| i32::try_from(b).ok()).unwrap_or(-1);

        if self.bone_id == -1 {
            log::warn!("[物理骨骼] 找不到骨骼: {}", self.bone_name);
        }

        self.fix_joint_offset(ctx);
        self.reset_physics_simulation_state(ctx);
    }

    // ========== 模拟状态机 ==========

    pub fn simulate_physics(&self) -> bool {
        self.simulate_physics
    }

    /// 后端实际是否在模拟
    pub fn is_simulating_physics(&self) -> bool {
        self.internal_simulate_physics
    }

    pub fn simulation_state(&self) -> SimulationState {
        if self.internal_simulate_physics {
            SimulationState::DynamicSimulate
        } else if self.bone_id == -1 {
            SimulationState::Unbound
        } else {
            SimulationState::KinematicFollow
        }
    }

    pub fn set_simulate_physics(&mut self, ctx: &mut BoneContext<'_>, simulate: bool) {
        if self.simulate_physics == simulate {
            return;
        }
        self.simulate_physics = simulate;
        self.reset_physics_simulation_state(ctx);
    }

    pub fn reset_physics_simulation_state(&mut self, ctx: &mut BoneContext<'_>) {
        if self.simulate_physics {
            self.start_physics_simulation(ctx);
        } else {
            self.stop_physics_simulation(ctx);
        }
    }

    fn start_physics_simulation(&mut self, ctx: &mut BoneContext<'_>) {
        let active = ctx.simulator().is_some_and(|s| s.is_active());
        if self.internal_simulate_physics || !active || self.bone_id == -1 {
            return;
        }

        self.reset_to_rest_position(ctx);
        self.apply_body_mode(&mut *ctx.backend, BodyMode::Rigid);
        self.apply_collision(
            &mut *ctx.backend,
            self.collision_layer,
            self.collision_mask,
            self.collision_priority,
        );
        ctx.backend.body_set_state_sync(self.body, true);
        self.top_level = true;
        self.internal_simulate_physics = true;
        self.mark_bone_simulating(ctx, true);

        log::debug!("[物理骨骼] 开始模拟: {}", self.bone_name);
    }

    fn stop_physics_simulation(&mut self, ctx: &mut BoneContext<'_>) {
        if let Some(active) = ctx.simulator().map(|s| s.is_active()) {
            if active && self.bone_id != -1 {
                self.apply_body_mode(&mut *ctx.backend, BodyMode::Kinematic);
                self.apply_collision(
                    &mut *ctx.backend,
                    self.collision_layer,
                    self.collision_mask,
                    self.collision_priority,
                );
            } else {
                self.apply_body_mode(&mut *ctx.backend, BodyMode::Static);
                self.apply_collision(&mut *ctx.backend, 0, 0, 1.0);
            }
        }

        if self.internal_simulate_physics {
            ctx.backend.body_set_state_sync(self.body, false);
            self.top_level = false;
            self.internal_simulate_physics = false;
            self.mark_bone_simulating(ctx, false);

            log::debug!("[物理骨骼] 停止模拟: {}", self.bone_name);
        }
    }

    /// 模拟器激活状态变化后重新评估：停用则停止模拟，激活则补上被推迟的模拟请求
    pub fn simulator_active_changed(&mut self, ctx: &mut BoneContext<'_>) {
        if ctx.simulator().is_some_and(|s| s.is_active()) {
            self.reset_physics_simulation_state(ctx);
        } else {
            self.stop_physics_simulation(ctx);
        }
    }

    fn mark_bone_simulating(&self, ctx: &mut BoneContext<'_>, simulating: bool) {
        if let (Some(bone), Some(simulator)) = (self.bone_index(), ctx.simulator_mut()) {
            simulator.set_bone_simulating(bone, simulating);
        }
    }

    fn apply_body_mode(&self, backend: &mut dyn PhysicsBackend, mode: BodyMode) {
        if backend.body_get_mode(self.body) != mode {
            backend.body_set_mode(self.body, mode);
        }
    }

    fn apply_collision(
        &self,
        backend: &mut dyn PhysicsBackend,
        layer: u32,
        mask: u32,
        priority: f32,
    ) {
        if backend.body_get_collision_layer(self.body) != layer {
            backend.body_set_collision_layer(self.body, layer);
        }
        if backend.body_get_collision_mask(self.body) != mask {
            backend.body_set_collision_mask(self.body, mask);
        }
        if backend.body_get_collision_priority(self.body) != priority {
            backend.body_set_collision_priority(self.body, priority);
        }
    }

    // ========== 关节 ==========

    pub fn joint_type(&self) -> JointType {
        self.joint_data
            .as_ref()
            .map_or(JointType::None, JointData::joint_type)
    }

    pub fn joint_data(&self) -> Option<&JointData> {
        self.joint_data.as_ref()
    }

    /// 切换关节类型：旧参数丢弃，新类型使用默认参数，并重建约束
    pub fn set_joint_type(&mut self, ctx: &mut BoneContext<'_>, joint_type: JointType) {
        if joint_type == self.joint_type() {
            return;
        }
        self.joint_data = JointData::new(joint_type);
        self.reload_joint(ctx);
    }

    /// 按当前关节类型、父刚体和偏移重建后端约束
    pub fn reload_joint(&mut self, ctx: &mut BoneContext<'_>) {
        let parent = match (ctx.skeleton_transform(), self.bone_index(), ctx.simulator()) {
            (Some(_), Some(bone), Some(simulator)) => simulator.physical_bone_parent(bone),
            _ => None,
        };

        let (Some(parent), Some(data)) = (parent, self.joint_data.as_ref()) else {
            if get_config().debug_log {
                log::debug!("[物理骨骼] {} 没有父刚体或关节类型，清除约束", self.bone_name);
            }
            ctx.backend.joint_clear(self.joint);
            return;
        };

        let parent_global = ctx.backend.body_get_transform(parent);
        let joint_transform = self.global_transform * self.joint_offset;
        let local_a = transform::orthonormalized(parent_global.inverse() * joint_transform);

        let kind = data.kind();
        let (frame_a, frame_b) = if kind == JointKind::Pin {
            (
                transform::translation_only(local_a),
                transform::translation_only(self.joint_offset),
            )
        } else {
            (local_a, self.joint_offset)
        };

        ctx.backend
            .joint_make(self.joint, kind, parent, frame_a, self.body, frame_b);
        data.apply(&mut *ctx.backend, self.joint);
    }

    // ========== 属性 ==========

    /// 按名称写入属性（`bone_name` 或当前关节的参数路径）
    pub fn set_property(
        &mut self,
        ctx: &mut BoneContext<'_>,
        name: &str,
        value: &PropertyValue,
    ) -> bool {
        if name == BONE_NAME_PROPERTY {
            return match value.as_str() {
                Some(bone_name) => {
                    self.set_bone_name(ctx, bone_name);
                    true
                }
                None => false,
            };
        }

        match self.joint_data.as_mut() {
            Some(data) => data.set_live(name, value, &mut *ctx.backend, self.joint),
            None => false,
        }
    }

    pub fn get_property(&self, name: &str) -> Option<PropertyValue> {
        if name == BONE_NAME_PROPERTY {
            return Some(PropertyValue::String(self.bone_name.clone()));
        }
        self.joint_data.as_ref()?.get(name)
    }

    pub fn property_list(&self, ctx: &BoneContext<'_>) -> Vec<PropertyInfo> {
        let hint = ctx
            .simulator()
            .filter(|s| s.skeleton_global_transform().is_some())
            .map(|s| s.bone_names().join(","));

        let mut list = vec![PropertyInfo::new(
            BONE_NAME_PROPERTY,
            PropertyKind::String,
            hint.as_deref(),
        )];
        if let Some(data) = &self.joint_data {
            list.extend(data.property_list());
        }
        list
    }

    // ========== 刚体参数 ==========

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn set_mass(&mut self, backend: &mut dyn PhysicsBackend, mass: f32) -> Result<()> {
        check_range("mass", mass, mass > 0.0)?;
        self.mass = mass;
        backend.body_set_param(self.body, BodyParam::Mass, mass);
        Ok(())
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn set_friction(&mut self, backend: &mut dyn PhysicsBackend, friction: f32) -> Result<()> {
        check_range("friction", friction, (0.0..=1.0).contains(&friction))?;
        self.friction = friction;
        backend.body_set_param(self.body, BodyParam::Friction, friction);
        Ok(())
    }

    pub fn bounce(&self) -> f32 {
        self.bounce
    }

    pub fn set_bounce(&mut self, backend: &mut dyn PhysicsBackend, bounce: f32) -> Result<()> {
        check_range("bounce", bounce, (0.0..=1.0).contains(&bounce))?;
        self.bounce = bounce;
        backend.body_set_param(self.body, BodyParam::Bounce, bounce);
        Ok(())
    }

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, backend: &mut dyn PhysicsBackend, gravity_scale: f32) {
        self.gravity_scale = gravity_scale;
        backend.body_set_param(self.body, BodyParam::GravityScale, gravity_scale);
    }

    pub fn linear_damp(&self) -> f32 {
        self.linear_damp
    }

    pub fn set_linear_damp(&mut self, backend: &mut dyn PhysicsBackend, damp: f32) -> Result<()> {
        check_range("linear_damp", damp, damp >= 0.0)?;
        self.linear_damp = damp;
        backend.body_set_param(self.body, BodyParam::LinearDamp, damp);
        Ok(())
    }

    pub fn angular_damp(&self) -> f32 {
        self.angular_damp
    }

    pub fn set_angular_damp(&mut self, backend: &mut dyn PhysicsBackend, damp: f32) -> Result<()> {
        check_range("angular_damp", damp, damp >= 0.0)?;
        self.angular_damp = damp;
        backend.body_set_param(self.body, BodyParam::AngularDamp, damp);
        Ok(())
    }

    pub fn linear_damp_mode(&self) -> DampMode {
        self.linear_damp_mode
    }

    pub fn set_linear_damp_mode(&mut self, backend: &mut dyn PhysicsBackend, mode: DampMode) {
        self.linear_damp_mode = mode;
        backend.body_set_damp_mode(self.body, DampChannel::Linear, mode);
    }

    pub fn angular_damp_mode(&self) -> DampMode {
        self.angular_damp_mode
    }

    pub fn set_angular_damp_mode(&mut self, backend: &mut dyn PhysicsBackend, mode: DampMode) {
        self.angular_damp_mode = mode;
        backend.body_set_damp_mode(self.body, DampChannel::Angular, mode);
    }

    pub fn can_sleep(&self) -> bool {
        self.can_sleep
    }

    pub fn set_can_sleep(&mut self, backend: &mut dyn PhysicsBackend, can_sleep: bool) {
        self.can_sleep = can_sleep;
        backend.body_set_can_sleep(self.body, can_sleep);
    }

    pub fn use_ccd(&self) -> bool {
        self.ccd
    }

    pub fn set_use_ccd(&mut self, backend: &mut dyn PhysicsBackend, enabled: bool) {
        self.ccd = enabled;
        backend.body_set_ccd(self.body, enabled);
    }

    pub fn max_contacts_reported(&self) -> usize {
        self.max_contacts_reported
    }

    /// 每个接触都会分配内存，数量不能超过配置的上限
    pub fn set_max_contacts_reported(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        amount: usize,
    ) -> Result<()> {
        let limit = get_config().max_contacts_reported_limit;
        if amount >= limit {
            return Err(BonePhysicsError::TooManyContacts {
                requested: amount,
                limit,
            });
        }
        self.max_contacts_reported = amount;
        backend.body_set_max_contacts_reported(self.body, amount);
        Ok(())
    }

    pub fn contact_count(&self) -> usize {
        self.contact_count
    }

    pub fn is_using_custom_integrator(&self) -> bool {
        self.custom_integrator
    }

    /// 开启后后端不再积分重力与阻尼，由积分钩子负责
    pub fn set_use_custom_integrator(&mut self, backend: &mut dyn PhysicsBackend, enabled: bool) {
        if self.custom_integrator == enabled {
            return;
        }
        self.custom_integrator = enabled;
        backend.body_set_omit_force_integration(self.body, enabled);
    }

    pub fn set_force_integrator(&mut self, integrator: Option<Box<dyn ForceIntegrator>>) {
        self.force_integrator = integrator;
    }

    pub fn collision_layer(&self) -> u32 {
        self.collision_layer
    }

    pub fn set_collision_layer(&mut self, backend: &mut dyn PhysicsBackend, layer: u32) {
        self.collision_layer = layer;
        backend.body_set_collision_layer(self.body, layer);
    }

    pub fn collision_mask(&self) -> u32 {
        self.collision_mask
    }

    pub fn set_collision_mask(&mut self, backend: &mut dyn PhysicsBackend, mask: u32) {
        self.collision_mask = mask;
        backend.body_set_collision_mask(self.body, mask);
    }

    pub fn collision_priority(&self) -> f32 {
        self.collision_priority
    }

    pub fn set_collision_priority(&mut self, backend: &mut dyn PhysicsBackend, priority: f32) {
        self.collision_priority = priority;
        backend.body_set_collision_priority(self.body, priority);
    }

    // ========== 速度与冲量 ==========

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn set_linear_velocity(&mut self, backend: &mut dyn PhysicsBackend, velocity: Vec3) {
        self.linear_velocity = velocity;
        backend.body_set_linear_velocity(self.body, velocity);
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, backend: &mut dyn PhysicsBackend, velocity: Vec3) {
        self.angular_velocity = velocity;
        backend.body_set_angular_velocity(self.body, velocity);
    }

    pub fn apply_central_impulse(&self, backend: &mut dyn PhysicsBackend, impulse: Vec3) {
        backend.body_apply_central_impulse(self.body, impulse);
    }

    /// `position` 为相对刚体原点的世界空间偏移
    pub fn apply_impulse(&self, backend: &mut dyn PhysicsBackend, impulse: Vec3, position: Vec3) {
        backend.body_apply_impulse(self.body, impulse, position);
    }

    // ========== 接触监视 ==========

    pub fn is_contact_monitor_enabled(&self) -> bool {
        self.contact_monitor.is_some()
    }

    pub fn contact_monitor(&self) -> Option<&ContactMonitor> {
        self.contact_monitor.as_ref()
    }

    pub fn add_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.contact_listeners.push(listener);
    }

    /// 开关接触监视；事件派发期间不能关闭
    pub fn set_contact_monitor(&mut self, scene: &mut dyn SceneTree, enabled: bool) -> Result<()> {
        if enabled == self.contact_monitor.is_some() {
            return Ok(());
        }

        if enabled {
            self.contact_monitor = Some(ContactMonitor::new());
            return Ok(());
        }

        if self.contact_monitor.as_ref().is_some_and(ContactMonitor::is_locked) {
            return Err(BonePhysicsError::ContactMonitorLocked);
        }
        if let Some(monitor) = self.contact_monitor.take() {
            monitor.shutdown(scene);
        }
        self.contact_monitor_disable_pending = false;
        Ok(())
    }

    /// 同 [`Self::set_contact_monitor`]，但在派发期间把关闭推迟到本轮派发结束
    pub fn set_contact_monitor_deferred(
        &mut self,
        scene: &mut dyn SceneTree,
        enabled: bool,
    ) -> Result<()> {
        let locked = self
            .contact_monitor
            .as_ref()
            .is_some_and(ContactMonitor::is_locked);
        if locked && !enabled {
            self.contact_monitor_disable_pending = true;
            return Ok(());
        }
        self.contact_monitor_disable_pending = false;
        self.set_contact_monitor(scene, enabled)
    }

    fn flush_deferred_contact_monitor(&mut self, scene: &mut dyn SceneTree) {
        if !self.contact_monitor_disable_pending {
            return;
        }
        if let Err(e) = self.set_contact_monitor(scene, false) {
            log::warn!("[物理骨骼] 延迟关闭接触监视失败: {}", e);
        }
    }

    /// 正在接触的对象
    pub fn colliding_bodies(&self) -> Result<Vec<ObjectId>> {
        self.contact_monitor
            .as_ref()
            .map(ContactMonitor::colliding_bodies)
            .ok_or(BonePhysicsError::ContactMonitorDisabled)
    }

    /// 被跟踪的碰撞对象进入场景树
    pub fn collider_entered_tree(
        &mut self,
        scene: &mut dyn SceneTree,
        object: ObjectId,
    ) -> Result<()> {
        let monitor = self
            .contact_monitor
            .as_mut()
            .ok_or(BonePhysicsError::ContactMonitorDisabled)?;
        let mut listeners = ListenerFanout(&mut self.contact_listeners);
        let result = monitor.collider_entered_tree(object, &mut listeners);
        self.flush_deferred_contact_monitor(scene);
        result
    }

    /// 被跟踪的碰撞对象即将离开场景树
    pub fn collider_exiting_tree(
        &mut self,
        scene: &mut dyn SceneTree,
        object: ObjectId,
    ) -> Result<()> {
        let monitor = self
            .contact_monitor
            .as_mut()
            .ok_or(BonePhysicsError::ContactMonitorDisabled)?;
        let mut listeners = ListenerFanout(&mut self.contact_listeners);
        let result = monitor.collider_exiting_tree(object, &mut listeners);
        self.flush_deferred_contact_monitor(scene);
        result
    }
}

impl Drop for PhysicalBone {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "[物理骨骼] {:?} ({}) 未调用 release 就被丢弃，刚体 {:?} / 关节 {:?} 泄漏",
                self.object,
                self.bone_name,
                self.body,
                self.joint
            );
        }
    }
}
