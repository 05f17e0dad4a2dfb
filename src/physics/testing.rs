//! 测试用的后端 / 场景 / 模拟器替身

use std::collections::{HashMap, HashSet};

use glam::{Mat4, Vec3};

use super::backend::{
    BodyHandle, BodyMode, BodyParam, DampChannel, DampMode, JointFlag, JointHandle, JointKind,
    JointParam, PhysicsBackend,
};
use super::scene::{BoneSimulator, ObjectId, SceneTree, TreeWatch};

/// 记录状态的刚体
#[derive(Debug, Clone, Default)]
pub struct FakeBody {
    pub object: Option<ObjectId>,
    pub mode: BodyMode,
    pub params: HashMap<BodyParam, f32>,
    pub damp_modes: HashMap<DampChannel, DampMode>,
    pub layer: u32,
    pub mask: u32,
    pub priority: f32,
    pub can_sleep: bool,
    pub ccd: bool,
    pub max_contacts: usize,
    pub omit_force_integration: bool,
    pub transform: Mat4,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub impulses: Vec<(Vec3, Vec3)>,
    pub state_sync: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeJoint {
    pub kind: Option<JointKind>,
    pub body_a: Option<BodyHandle>,
    pub body_b: Option<BodyHandle>,
    pub frame_a: Mat4,
    pub frame_b: Mat4,
    pub params: HashMap<JointParam, f32>,
    pub flags: HashMap<JointFlag, bool>,
}

/// 记录每次写调用的后端
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u64,
    pub bodies: HashMap<BodyHandle, FakeBody>,
    pub joints: HashMap<JointHandle, FakeJoint>,
    /// 写调用计数（getter 不计）
    pub calls: usize,
}

impl RecordingBackend {
    pub fn body(&self, body: BodyHandle) -> &FakeBody {
        &self.bodies[&body]
    }

    pub fn joint(&self, joint: JointHandle) -> &FakeJoint {
        &self.joints[&joint]
    }

    /// (参数个数, 开关个数)
    pub fn joint_field_counts(&self, joint: JointHandle) -> (usize, usize) {
        self.joints
            .get(&joint)
            .map(|j| (j.params.len(), j.flags.len()))
            .unwrap_or((0, 0))
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut FakeBody> {
        self.calls += 1;
        self.bodies.get_mut(&body)
    }

    fn joint_mut(&mut self, joint: JointHandle) -> Option<&mut FakeJoint> {
        self.calls += 1;
        self.joints.get_mut(&joint)
    }
}

impl PhysicsBackend for RecordingBackend {
    fn body_create(&mut self) -> BodyHandle {
        self.calls += 1;
        self.next_id += 1;
        let handle = BodyHandle(self.next_id);
        self.bodies.insert(
            handle,
            FakeBody {
                can_sleep: true,
                transform: Mat4::IDENTITY,
                ..Default::default()
            },
        );
        handle
    }

    fn body_free(&mut self, body: BodyHandle) {
        self.calls += 1;
        self.bodies.remove(&body);
    }

    fn body_set_object(&mut self, body: BodyHandle, object: ObjectId) {
        if let Some(b) = self.body_mut(body) {
            b.object = Some(object);
        }
    }

    fn body_set_mode(&mut self, body: BodyHandle, mode: BodyMode) {
        if let Some(b) = self.body_mut(body) {
            b.mode = mode;
        }
    }

    fn body_get_mode(&self, body: BodyHandle) -> BodyMode {
        self.bodies.get(&body).map(|b| b.mode).unwrap_or_default()
    }

    fn body_set_param(&mut self, body: BodyHandle, param: BodyParam, value: f32) {
        if let Some(b) = self.body_mut(body) {
            b.params.insert(param, value);
        }
    }

    fn body_get_param(&self, body: BodyHandle, param: BodyParam) -> f32 {
        self.bodies
            .get(&body)
            .and_then(|b| b.params.get(&param).copied())
            .unwrap_or(0.0)
    }

    fn body_set_damp_mode(&mut self, body: BodyHandle, channel: DampChannel, mode: DampMode) {
        if let Some(b) = self.body_mut(body) {
            b.damp_modes.insert(channel, mode);
        }
    }

    fn body_set_collision_layer(&mut self, body: BodyHandle, layer: u32) {
        if let Some(b) = self.body_mut(body) {
            b.layer = layer;
        }
    }

    fn body_get_collision_layer(&self, body: BodyHandle) -> u32 {
        self.bodies.get(&body).map(|b| b.layer).unwrap_or(0)
    }

    fn body_set_collision_mask(&mut self, body: BodyHandle, mask: u32) {
        if let Some(b) = self.body_mut(body) {
            b.mask = mask;
        }
    }

    fn body_get_collision_mask(&self, body: BodyHandle) -> u32 {
        self.bodies.get(&body).map(|b| b.mask).unwrap_or(0)
    }

    fn body_set_collision_priority(&mut self, body: BodyHandle, priority: f32) {
        if let Some(b) = self.body_mut(body) {
            b.priority = priority;
        }
    }

    fn body_get_collision_priority(&self, body: BodyHandle) -> f32 {
        self.bodies.get(&body).map(|b| b.priority).unwrap_or(0.0)
    }

    fn body_set_can_sleep(&mut self, body: BodyHandle, can_sleep: bool) {
        if let Some(b) = self.body_mut(body) {
            b.can_sleep = can_sleep;
        }
    }

    fn body_set_ccd(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(b) = self.body_mut(body) {
            b.ccd = enabled;
        }
    }

    fn body_set_max_contacts_reported(&mut self, body: BodyHandle, amount: usize) {
        if let Some(b) = self.body_mut(body) {
            b.max_contacts = amount;
        }
    }

    fn body_set_omit_force_integration(&mut self, body: BodyHandle, omit: bool) {
        if let Some(b) = self.body_mut(body) {
            b.omit_force_integration = omit;
        }
    }

    fn body_set_transform(&mut self, body: BodyHandle, transform: Mat4) {
        if let Some(b) = self.body_mut(body) {
            b.transform = transform;
        }
    }

    fn body_get_transform(&self, body: BodyHandle) -> Mat4 {
        self.bodies
            .get(&body)
            .map(|b| b.transform)
            .unwrap_or(Mat4::IDENTITY)
    }

    fn body_set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.linear_velocity = velocity;
        }
    }

    fn body_set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.angular_velocity = velocity;
        }
    }

    fn body_apply_central_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.impulses.push((impulse, Vec3::ZERO));
        }
    }

    fn body_apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, position: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.impulses.push((impulse, position));
        }
    }

    fn body_set_state_sync(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(b) = self.body_mut(body) {
            b.state_sync = enabled;
        }
    }

    fn joint_create(&mut self) -> JointHandle {
        self.calls += 1;
        self.next_id += 1;
        let handle = JointHandle(self.next_id);
        self.joints.insert(handle, FakeJoint::default());
        handle
    }

    fn joint_free(&mut self, joint: JointHandle) {
        self.calls += 1;
        self.joints.remove(&joint);
    }

    fn joint_clear(&mut self, joint: JointHandle) {
        if let Some(j) = self.joint_mut(joint) {
            *j = FakeJoint::default();
        }
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
        if let Some(j) = self.joint_mut(joint) {
            *j = FakeJoint {
                kind: Some(kind),
                body_a: Some(body_a),
                body_b: Some(body_b),
                frame_a,
                frame_b,
                ..Default::default()
            };
        }
    }

    fn joint_set_param(&mut self, joint: JointHandle, param: JointParam, value: f32) {
        if let Some(j) = self.joint_mut(joint) {
            // 与真实后端一致：种类不符的参数被忽略
            if j.kind == Some(param.kind()) {
                j.params.insert(param, value);
            }
        }
    }

    fn joint_get_param(&self, joint: JointHandle, param: JointParam) -> Option<f32> {
        self.joints.get(&joint).and_then(|j| j.params.get(&param).copied())
    }

    fn joint_set_flag(&mut self, joint: JointHandle, flag: JointFlag, enabled: bool) {
        if let Some(j) = self.joint_mut(joint) {
            if j.kind == Some(flag.kind()) {
                j.flags.insert(flag, enabled);
            }
        }
    }

    fn joint_get_flag(&self, joint: JointHandle, flag: JointFlag) -> Option<bool> {
        self.joints.get(&joint).and_then(|j| j.flags.get(&flag).copied())
    }
}

/// 场景树替身
#[derive(Debug, Default)]
pub struct FakeScene {
    /// 对象 → 是否在树中；不在表里的对象不是场景节点
    nodes: HashMap<ObjectId, bool>,
    next_watch: u64,
    watches: HashMap<u64, ObjectId>,
}

impl FakeScene {
    pub fn add_node(&mut self, object: ObjectId, in_tree: bool) {
        self.nodes.insert(object, in_tree);
    }

    pub fn active_watch_count(&self) -> usize {
        self.watches.len()
    }

    pub fn is_watched(&self, object: ObjectId) -> bool {
        self.watches.values().any(|o| *o == object)
    }
}

impl SceneTree for FakeScene {
    fn is_inside_tree(&self, object: ObjectId) -> Option<bool> {
        self.nodes.get(&object).copied()
    }

    fn watch_tree(&mut self, object: ObjectId) -> TreeWatch {
        self.next_watch += 1;
        self.watches.insert(self.next_watch, object);
        TreeWatch(self.next_watch)
    }

    fn unwatch_tree(&mut self, watch: TreeWatch) {
        self.watches.remove(&watch.0);
    }
}

#[derive(Debug, Clone)]
pub struct FakeBone {
    pub name: String,
    pub parent: Option<usize>,
    pub global_pose: Mat4,
}

/// 骨架模拟器替身
#[derive(Debug)]
pub struct FakeSimulator {
    pub skeleton: Option<Mat4>,
    pub active: bool,
    pub bones: Vec<FakeBone>,
    pub bindings: HashMap<usize, BodyHandle>,
    /// 姿态由物理驱动的骨骼
    pub simulating: HashSet<usize>,
}

impl FakeSimulator {
    /// 骨架在原点，骨骼链 root → arm → hand，每节沿 Y 轴 1.0
    pub fn chain() -> Self {
        let names = ["root", "arm", "hand"];
        let bones = names
            .iter()
            .enumerate()
            .map(|(i, name)| FakeBone {
                name: (*name).to_owned(),
                parent: i.checked_sub(1),
                global_pose: Mat4::from_translation(Vec3::new(0.0, i as f32, 0.0)),
            })
            .collect();
        Self {
            skeleton: Some(Mat4::IDENTITY),
            active: true,
            bones,
            bindings: HashMap::new(),
            simulating: HashSet::new(),
        }
    }
}

impl BoneSimulator for FakeSimulator {
    fn skeleton_global_transform(&self) -> Option<Mat4> {
        self.skeleton
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    fn bone_names(&self) -> Vec<String> {
        self.bones.iter().map(|b| b.name.clone()).collect()
    }

    fn bone_global_pose(&self, bone: usize) -> Mat4 {
        self.bones
            .get(bone)
            .map(|b| b.global_pose)
            .unwrap_or(Mat4::IDENTITY)
    }

    fn set_bone_global_pose(&mut self, bone: usize, pose: Mat4) {
        if let Some(b) = self.bones.get_mut(bone) {
            b.global_pose = pose;
        }
    }

    fn bind_physical_bone(&mut self, bone: usize, body: BodyHandle) {
        self.bindings.insert(bone, body);
    }

    fn unbind_physical_bone(&mut self, bone: usize) {
        self.bindings.remove(&bone);
        self.simulating.remove(&bone);
    }

    fn set_bone_simulating(&mut self, bone: usize, simulating: bool) {
        if simulating {
            self.simulating.insert(bone);
        } else {
            self.simulating.remove(&bone);
        }
    }

    fn physical_bone_parent(&self, bone: usize) -> Option<BodyHandle> {
        let mut current = self.bones.get(bone)?.parent;
        while let Some(index) = current {
            if let Some(body) = self.bindings.get(&index) {
                return Some(*body);
            }
            current = self.bones.get(index)?.parent;
        }
        None
    }
}
