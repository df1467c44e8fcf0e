//! Scene: a world of meshes, a camera and the pointer event pipeline.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use engine_core::ecs::Component;
use engine_core::{EntityId, Name, Transform, World};
use serde::Serialize;

use crate::camera::Camera;
use crate::mesh::Mesh;
use crate::observable::Observable;
use crate::picking::{PickingInfo, Ray};
use crate::pointer::{PointerEvent, PointerEventType, PointerId, PointerInfo, PointerInfoPre};
use crate::utility_layer::{PointerArbitration, UtilityLayerRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SceneId(u32);

impl SceneId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        SceneId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Picking and visibility switches of a scene mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshFlags {
    pub is_pickable: bool,
    pub is_enabled: bool,
}

impl Default for MeshFlags {
    fn default() -> Self {
        Self {
            is_pickable: true,
            is_enabled: true,
        }
    }
}

impl Component for MeshFlags {}

/// What happened to one pointer event inside [`Scene::simulate_pointer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerDispatch {
    pub pointer_id: PointerId,
    pub event_type: PointerEventType,
    /// One entry per utility layer, in processing order.
    pub layers: Vec<PointerArbitration>,
    /// A utility layer kept the event from the scene's pointer observers.
    pub consumed_by_layer: bool,
    /// The scene's own pick; `None` when the event was consumed.
    pub scene_pick: Option<PickingInfo>,
    #[serde(skip)]
    pub picked_mesh: Option<EntityId>,
    pub pointer_captured: bool,
}

pub struct Scene {
    id: SceneId,
    pub world: World,
    active_camera: Option<Camera>,
    width: f32,
    height: f32,
    pointer_x: f32,
    pointer_y: f32,
    pointer_captures: HashSet<PointerId>,
    pub on_pre_pointer_observable: Observable<PointerInfoPre>,
    pub on_pointer_observable: Observable<PointerInfo>,
    pub on_dispose_observable: Observable<SceneId>,
    disposed: bool,
}

impl Scene {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            id: SceneId::next(),
            world: World::new(),
            active_camera: None,
            width,
            height,
            pointer_x: 0.0,
            pointer_y: 0.0,
            pointer_captures: HashSet::new(),
            on_pre_pointer_observable: Observable::new(),
            on_pointer_observable: Observable::new(),
            on_dispose_observable: Observable::new(),
            disposed: false,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn active_camera(&self) -> Option<&Camera> {
        self.active_camera.as_ref()
    }

    pub fn set_active_camera(&mut self, camera: Camera) {
        self.active_camera = Some(camera);
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        self.active_camera.as_mut()
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        if let Some(camera) = &mut self.active_camera {
            camera.set_aspect(width / height.max(1.0));
        }
    }

    /// Last pointer position seen by [`Scene::simulate_pointer`].
    pub fn pointer_position(&self) -> (f32, f32) {
        (self.pointer_x, self.pointer_y)
    }

    pub fn add_mesh(&mut self, mesh: Mesh, transform: Transform) -> EntityId {
        let entity = self.world.spawn();
        self.world.insert(entity, Name::new(mesh.name()));
        self.world.insert(entity, transform);
        self.world.insert(entity, MeshFlags::default());
        self.world.insert(entity, mesh);
        entity
    }

    /// First live mesh carrying `name`.
    pub fn find_mesh_by_name(&self, name: &str) -> Option<EntityId> {
        self.world
            .iter_with2::<Name, Mesh>()
            .find(|(_, label, _)| *label == name)
            .map(|(entity, _, _)| entity)
    }

    pub fn mesh(&self, entity: EntityId) -> Option<&Mesh> {
        self.world.get::<Mesh>(entity)
    }

    pub fn set_pickable(&mut self, entity: EntityId, pickable: bool) {
        if let Some(flags) = self.world.get_mut::<MeshFlags>(entity) {
            flags.is_pickable = pickable;
        }
    }

    pub fn set_enabled(&mut self, entity: EntityId, enabled: bool) {
        if let Some(flags) = self.world.get_mut::<MeshFlags>(entity) {
            flags.is_enabled = enabled;
        }
    }

    /// Pick through the active camera at viewport pixel `(x, y)`.
    pub fn pick(&self, x: f32, y: f32) -> PickingInfo {
        match &self.active_camera {
            Some(camera) => self.pick_with_ray(camera.screen_ray(x, y, self.width, self.height)),
            None => PickingInfo::miss(None),
        }
    }

    /// Nearest pickable, enabled mesh along `ray`.
    pub fn pick_with_ray(&self, ray: Ray) -> PickingInfo {
        let mut nearest = PickingInfo::miss(Some(ray));

        for (entity, mesh, transform) in self.world.iter_with2::<Mesh, Transform>() {
            let flags = self.world.get::<MeshFlags>(entity).copied().unwrap_or_default();
            if !flags.is_pickable || !flags.is_enabled {
                continue;
            }

            let world = transform.to_matrix();
            let local_ray = ray.transform(&world.inverse());
            let geometry = mesh.geometry();
            if let Some(bounds) = geometry.extend() {
                if local_ray.intersect_aabb(&bounds).is_none() {
                    continue;
                }
            }
            let Some(positions) = geometry.positions() else {
                continue;
            };
            let Some(local_distance) = local_ray.intersect_triangles(positions, geometry.index_buffer()) else {
                continue;
            };

            let point = world.transform_point3(local_ray.at(local_distance));
            let distance = point.distance(ray.origin);
            if !nearest.hit || distance < nearest.distance {
                nearest = PickingInfo {
                    picked_scene: Some(self.id),
                    ..PickingInfo::hit(ray, distance, entity)
                };
            }
        }
        nearest
    }

    pub fn capture_pointer(&mut self, pointer: PointerId) {
        self.pointer_captures.insert(pointer);
    }

    pub fn release_pointer(&mut self, pointer: PointerId) {
        self.pointer_captures.remove(&pointer);
    }

    pub fn is_pointer_captured(&self, pointer: PointerId) -> bool {
        self.pointer_captures.contains(&pointer)
    }

    /// Run one pointer event through the utility layers and then the scene.
    ///
    /// Layers see the event first and may consume it. Otherwise the scene
    /// picks, notifies its pointer observers, captures the pointer on a
    /// pointer-down that hit a mesh and releases it on pointer-up.
    pub fn simulate_pointer(
        &mut self,
        event: PointerEvent,
        layers: &mut [&mut UtilityLayerRenderer],
    ) -> PointerDispatch {
        self.pointer_x = event.x;
        self.pointer_y = event.y;
        let mask = event.event_type.mask();
        let mut pre = PointerInfoPre::new(event);

        let mut arbitrations = Vec::with_capacity(layers.len());
        for layer in layers.iter_mut() {
            arbitrations.push(layer.process_pre_pointer(self, &mut pre));
        }
        self.on_pre_pointer_observable.notify_observers(&pre, mask);

        let mut dispatch = PointerDispatch {
            pointer_id: event.pointer_id,
            event_type: event.event_type,
            layers: arbitrations,
            consumed_by_layer: pre.skip_on_pointer_observable,
            scene_pick: None,
            picked_mesh: None,
            pointer_captured: self.is_pointer_captured(event.pointer_id),
        };
        if pre.skip_on_pointer_observable {
            log::trace!("{} {:?} consumed by a utility layer", event.pointer_id, event.event_type);
            return dispatch;
        }

        let pick = match pre.ray {
            Some(ray) => self.pick_with_ray(ray),
            None => self.pick(event.x, event.y),
        };
        match event.event_type {
            PointerEventType::Down if pick.hit => self.capture_pointer(event.pointer_id),
            PointerEventType::Up => self.release_pointer(event.pointer_id),
            _ => {}
        }
        self.on_pointer_observable
            .notify_observers(&PointerInfo::new(event, pick), mask);

        dispatch.scene_pick = Some(pick);
        dispatch.picked_mesh = pick.picked_mesh;
        dispatch.pointer_captured = self.is_pointer_captured(event.pointer_id);
        dispatch
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Notify dispose observers, then drop every entity and observer.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.on_dispose_observable.notify_observers(&self.id, crate::observable::MASK_ALL);
        self.world.clear();
        self.pointer_captures.clear();
        self.on_pre_pointer_observable.clear();
        self.on_pointer_observable.clear();
        self.on_dispose_observable.clear();
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("entities", &self.world.entity_count())
            .field("active_camera", &self.active_camera)
            .finish_non_exhaustive()
    }
}
