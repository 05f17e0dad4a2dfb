//! 接触监视器
//!
//! 把后端每步上报的（无序、形状对级别的）接触列表，
//! 转换为稳定的刚体级 / 形状级进入、离开事件。
//!
//! 被跟踪对象自身进出场景树时，也会补发对应的事件。

use std::collections::BTreeMap;

use super::backend::{BodyHandle, ContactReport};
use super::scene::{ObjectId, SceneTree, TreeWatch};
use crate::{BonePhysicsError, Result};

/// 接触事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    BodyEntered {
        object: ObjectId,
    },
    BodyExited {
        object: ObjectId,
    },
    BodyShapeEntered {
        body: BodyHandle,
        object: ObjectId,
        body_shape: i32,
        local_shape: i32,
    },
    BodyShapeExited {
        body: BodyHandle,
        object: ObjectId,
        body_shape: i32,
        local_shape: i32,
    },
}

/// 接触事件接收者
pub trait ContactListener {
    fn on_contact_event(&mut self, event: &ContactEvent);
}

impl<F: FnMut(&ContactEvent)> ContactListener for F {
    fn on_contact_event(&mut self, event: &ContactEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShapePair {
    body_shape: i32,
    local_shape: i32,
    tagged: bool,
}

impl ShapePair {
    fn matches(&self, body_shape: i32, local_shape: i32) -> bool {
        self.body_shape == body_shape && self.local_shape == local_shape
    }
}

#[derive(Debug)]
struct TrackedBody {
    body: BodyHandle,
    in_tree: bool,
    /// 只有场景节点才有订阅
    watch: Option<TreeWatch>,
    shapes: Vec<ShapePair>,
}

/// 一次增删动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PairAction {
    body: BodyHandle,
    object: ObjectId,
    body_shape: i32,
    local_shape: i32,
}

/// 接触监视器（仅在开启监视时存在）
#[derive(Debug, Default)]
pub struct ContactMonitor {
    locked: bool,
    bodies: BTreeMap<ObjectId, TrackedBody>,
}

impl ContactMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否正在派发事件
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// 当前跟踪的对象数
    pub fn tracked_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_tracking(&self, object: ObjectId) -> bool {
        self.bodies.contains_key(&object)
    }

    /// 某对象当前记录的 (body_shape, local_shape)
    pub fn shape_pairs(&self, object: ObjectId) -> Vec<(i32, i32)> {
        self.bodies
            .get(&object)
            .map(|b| b.shapes.iter().map(|p| (p.body_shape, p.local_shape)).collect())
            .unwrap_or_default()
    }

    /// 当前正在接触的对象
    pub fn colliding_bodies(&self) -> Vec<ObjectId> {
        self.bodies.keys().copied().collect()
    }

    /// 对象是否被记录为位于场景树中
    pub fn is_in_tree(&self, object: ObjectId) -> Option<bool> {
        self.bodies.get(&object).map(|b| b.in_tree)
    }

    /// 对比本步接触列表，派发增删事件
    pub fn process_contacts(
        &mut self,
        contacts: &[ContactReport],
        scene: &mut dyn SceneTree,
        listener: &mut dyn ContactListener,
    ) {
        self.locked = true;

        for tracked in self.bodies.values_mut() {
            for pair in &mut tracked.shapes {
                pair.tagged = false;
            }
        }

        let mut to_add: Vec<PairAction> = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let existing = self.bodies.get_mut(&contact.collider_object).and_then(|tracked| {
                tracked
                    .shapes
                    .iter_mut()
                    .find(|p| p.matches(contact.collider_shape, contact.local_shape))
            });

            match existing {
                Some(pair) => pair.tagged = true,
                None => {
                    let action = PairAction {
                        body: contact.collider,
                        object: contact.collider_object,
                        body_shape: contact.collider_shape,
                        local_shape: contact.local_shape,
                    };
                    if !to_add.contains(&action) {
                        to_add.push(action);
                    }
                }
            }
        }

        let mut to_remove: Vec<PairAction> = Vec::new();
        for (object, tracked) in &self.bodies {
            for pair in tracked.shapes.iter().filter(|p| !p.tagged) {
                to_remove.push(PairAction {
                    body: tracked.body,
                    object: *object,
                    body_shape: pair.body_shape,
                    local_shape: pair.local_shape,
                });
            }
        }

        for action in to_remove {
            self.body_inout(false, action, scene, listener);
        }
        for action in to_add {
            self.body_inout(true, action, scene, listener);
        }

        self.locked = false;
    }

    fn body_inout(
        &mut self,
        added: bool,
        action: PairAction,
        scene: &mut dyn SceneTree,
        listener: &mut dyn ContactListener,
    ) {
        let PairAction {
            body,
            object,
            body_shape,
            local_shape,
        } = action;

        if added {
            let tracked = self.bodies.entry(object).or_insert_with(|| {
                let node_state = scene.is_inside_tree(object);
                let in_tree = node_state == Some(true);
                let watch = node_state.map(|_| scene.watch_tree(object));
                if in_tree {
                    listener.on_contact_event(&ContactEvent::BodyEntered { object });
                }
                TrackedBody {
                    body,
                    in_tree,
                    watch,
                    shapes: Vec::new(),
                }
            });

            tracked.shapes.push(ShapePair {
                body_shape,
                local_shape,
                tagged: false,
            });

            if tracked.in_tree {
                listener.on_contact_event(&ContactEvent::BodyShapeEntered {
                    body,
                    object,
                    body_shape,
                    local_shape,
                });
            }
        } else {
            let Some(tracked) = self.bodies.get_mut(&object) else {
                return;
            };
            tracked.shapes.retain(|p| !p.matches(body_shape, local_shape));
            let in_tree = tracked.in_tree;

            if in_tree {
                listener.on_contact_event(&ContactEvent::BodyShapeExited {
                    body,
                    object,
                    body_shape,
                    local_shape,
                });
            }

            if tracked.shapes.is_empty() {
                if let Some(tracked) = self.bodies.remove(&object) {
                    if let Some(watch) = tracked.watch {
                        scene.unwatch_tree(watch);
                    }
                }
                if in_tree {
                    listener.on_contact_event(&ContactEvent::BodyExited { object });
                }
            }
        }
    }

    /// 被跟踪对象进入场景树：补发刚体与全部形状的进入事件
    pub fn collider_entered_tree(
        &mut self,
        object: ObjectId,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        self.collider_tree_changed(object, true, listener)
    }

    /// 被跟踪对象即将离开场景树：补发离开事件
    pub fn collider_exiting_tree(
        &mut self,
        object: ObjectId,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        self.collider_tree_changed(object, false, listener)
    }

    fn collider_tree_changed(
        &mut self,
        object: ObjectId,
        entering: bool,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        let tracked = self
            .bodies
            .get_mut(&object)
            .ok_or(BonePhysicsError::UntrackedObject(object))?;
        if tracked.in_tree == entering {
            return Err(BonePhysicsError::TreeStateMismatch);
        }
        tracked.in_tree = entering;

        self.locked = true;

        let body = tracked.body;
        if entering {
            listener.on_contact_event(&ContactEvent::BodyEntered { object });
        } else {
            listener.on_contact_event(&ContactEvent::BodyExited { object });
        }
        for pair in &tracked.shapes {
            let (body_shape, local_shape) = (pair.body_shape, pair.local_shape);
            let event = if entering {
                ContactEvent::BodyShapeEntered {
                    body,
                    object,
                    body_shape,
                    local_shape,
                }
            } else {
                ContactEvent::BodyShapeExited {
                    body,
                    object,
                    body_shape,
                    local_shape,
                }
            };
            listener.on_contact_event(&event);
        }

        self.locked = false;
        Ok(())
    }

    /// 关闭监视：退订所有对象
    pub fn shutdown(self, scene: &mut dyn SceneTree) {
        for (_, tracked) in self.bodies {
            if let Some(watch) = tracked.watch {
                scene.unwatch_tree(watch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::testing::FakeScene;

    const A: ObjectId = ObjectId(10);
    const B: ObjectId = ObjectId(20);

    fn contact(object: ObjectId, collider_shape: i32, local_shape: i32) -> ContactReport {
        ContactReport {
            collider: BodyHandle(object.0 + 1000),
            collider_object: object,
            collider_shape,
            local_shape,
        }
    }

    fn step(
        monitor: &mut ContactMonitor,
        scene: &mut FakeScene,
        contacts: &[ContactReport],
    ) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        let mut listener = |e: &ContactEvent| events.push(*e);
        monitor.process_contacts(contacts, scene, &mut listener);
        events
    }

    #[test]
    fn test_new_object_emits_body_then_shape() {
        let mut scene = FakeScene::default();
        scene.add_node(A, true);
        let mut monitor = ContactMonitor::new();

        let events = step(&mut monitor, &mut scene, &[contact(A, 1, 0)]);
        assert_eq!(
            events,
            vec![
                ContactEvent::BodyEntered { object: A },
                ContactEvent::BodyShapeEntered {
                    body: BodyHandle(1010),
                    object: A,
                    body_shape: 1,
                    local_shape: 0,
                },
            ]
        );
        assert_eq!(scene.active_watch_count(), 1);
        assert!(!monitor.is_locked());
    }

    #[test]
    fn test_persisting_pair_emits_nothing() {
        let mut scene = FakeScene::default();
        scene.add_node(A, true);
        scene.add_node(B, true);
        let mut monitor = ContactMonitor::new();

        step(&mut monitor, &mut scene, &[contact(A, 1, 0)]);
        let events = step(&mut monitor, &mut scene, &[contact(A, 1, 0), contact(B, 2, 0)]);

        assert_eq!(
            events,
            vec![
                ContactEvent::BodyEntered { object: B },
                ContactEvent::BodyShapeEntered {
                    body: BodyHandle(1020),
                    object: B,
                    body_shape: 2,
                    local_shape: 0,
                },
            ]
        );
        assert_eq!(monitor.tracked_count(), 2);
    }

    #[test]
    fn test_all_pairs_gone_emits_shape_exits_before_body_exit() {
        let mut scene = FakeScene::default();
        scene.add_node(A, true);
        let mut monitor = ContactMonitor::new();

        step(&mut monitor, &mut scene, &[contact(A, 1, 0), contact(A, 2, 0)]);
        let events = step(&mut monitor, &mut scene, &[]);

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ContactEvent::BodyShapeExited { body_shape: 1, .. }));
        assert!(matches!(events[1], ContactEvent::BodyShapeExited { body_shape: 2, .. }));
        assert_eq!(events[2], ContactEvent::BodyExited { object: A });
        assert!(!monitor.is_tracking(A));
        assert_eq!(scene.active_watch_count(), 0);
    }

    #[test]
    fn test_duplicate_contacts_in_one_step_added_once() {
        let mut scene = FakeScene::default();
        scene.add_node(A, true);
        let mut monitor = ContactMonitor::new();

        let events = step(&mut monitor, &mut scene, &[contact(A, 1, 0), contact(A, 1, 0)]);
        assert_eq!(events.len(), 2);
        assert_eq!(monitor.shape_pairs(A), vec![(1, 0)]);
    }

    #[test]
    fn test_non_node_object_tracked_silently() {
        let mut scene = FakeScene::default();
        let mut monitor = ContactMonitor::new();

        let events = step(&mut monitor, &mut scene, &[contact(A, 0, 0)]);
        assert!(events.is_empty());
        assert!(monitor.is_tracking(A));
        assert_eq!(scene.active_watch_count(), 0);
        assert_eq!(monitor.colliding_bodies(), vec![A]);
        assert_eq!(monitor.is_in_tree(A), Some(false));

        step(&mut monitor, &mut scene, &[]);
        assert!(!monitor.is_tracking(A));
    }

    #[test]
    fn test_object_outside_tree_then_entering() {
        let mut scene = FakeScene::default();
        scene.add_node(A, false);
        let mut monitor = ContactMonitor::new();

        let events = step(&mut monitor, &mut scene, &[contact(A, 3, 1)]);
        assert!(events.is_empty());

        let mut events = Vec::new();
        monitor
            .collider_entered_tree(A, &mut |e: &ContactEvent| events.push(*e))
            .unwrap();
        assert_eq!(
            events,
            vec![
                ContactEvent::BodyEntered { object: A },
                ContactEvent::BodyShapeEntered {
                    body: BodyHandle(1010),
                    object: A,
                    body_shape: 3,
                    local_shape: 1,
                },
            ]
        );
        assert_eq!(monitor.is_in_tree(A), Some(true));
    }

    #[test]
    fn test_tree_notification_errors() {
        let mut scene = FakeScene::default();
        scene.add_node(A, true);
        let mut monitor = ContactMonitor::new();
        let mut ignore = |_: &ContactEvent| {};

        assert!(matches!(
            monitor.collider_exiting_tree(B, &mut ignore),
            Err(BonePhysicsError::UntrackedObject(B))
        ));

        step(&mut monitor, &mut scene, &[contact(A, 1, 0)]);
        assert!(matches!(
            monitor.collider_entered_tree(A, &mut ignore),
            Err(BonePhysicsError::TreeStateMismatch)
        ));
        assert!(monitor.collider_exiting_tree(A, &mut ignore).is_ok());
        assert_eq!(monitor.is_in_tree(A), Some(false));
    }

    #[test]
    fn test_shutdown_unwatches_everything() {
        let mut scene = FakeScene::default();
        scene.add_node(A, true);
        scene.add_node(B, false);
        let mut monitor = ContactMonitor::new();

        step(&mut monitor, &mut scene, &[contact(A, 1, 0), contact(B, 1, 0)]);
        assert_eq!(scene.active_watch_count(), 2);

        monitor.shutdown(&mut scene);
        assert_eq!(scene.active_watch_count(), 0);
    }
}
