// crates/engine-wasm/src/lib.rs

use js_sys::Function;
use wasm_bindgen::prelude::*;

use engine_core::{EntityId, Transform};
use engine_renderer::builders::{BoxOptions, DEBUG_FACE_COLORS, create_box};
use engine_renderer::{
    Camera, Mesh, PointerEvent, PositionGizmo, Scene, UtilityLayerOptions, UtilityLayerRegistry, VertexData,
    VertexDataError, VertexKind,
};
use glam::Vec3;

mod utils;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // A second init (e.g. hot reload) keeps the first logger.
    let _ = console_log::init_with_level(log::Level::Debug);
}

fn to_js(err: VertexDataError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// One base scene with its utility layers, driven from JS.
#[wasm_bindgen]
pub struct Engine {
    scene: Scene,
    layers: UtilityLayerRegistry,
    gizmo: Option<PositionGizmo>,
    gizmo_target: Option<EntityId>,
}

#[wasm_bindgen]
impl Engine {
    pub fn create(width: f32, height: f32) -> Engine {
        let mut scene = Scene::new(width, height);
        let mut camera = Camera::new(width / height.max(1.0));
        camera.set_position(Vec3::new(0.0, 2.0, 10.0));
        scene.set_active_camera(camera);
        log::info!("engine created ({width}x{height})");
        Self {
            scene,
            layers: UtilityLayerRegistry::new(),
            gizmo: None,
            gizmo_target: None,
        }
    }

    /// Add a mesh from flat position/normal arrays and an optional index list.
    pub fn create_mesh(
        &mut self,
        name: &str,
        positions: Vec<f32>,
        normals: Option<Vec<f32>>,
        indices: Option<Vec<u32>>,
    ) -> Result<u32, JsValue> {
        let mut data = VertexData::from_positions(positions, indices);
        if let Some(normals) = normals {
            data.set(VertexKind::Normal, normals);
        }
        let mesh = Mesh::from_vertex_data(name, &data, false).map_err(to_js)?;
        let entity = self.scene.add_mesh(mesh, Transform::identity());
        log::debug!("created mesh '{name}' ({entity})");
        Ok(entity.to_u32())
    }

    /// Add a debug-colored box.
    pub fn create_box(&mut self, name: &str, size: f32) -> Result<u32, JsValue> {
        let data = create_box(&BoxOptions {
            size,
            face_colors: Some(DEBUG_FACE_COLORS),
            ..BoxOptions::default()
        });
        let mesh = Mesh::from_vertex_data(name, &data, false).map_err(to_js)?;
        Ok(self.scene.add_mesh(mesh, Transform::identity()).to_u32())
    }

    /// Merge the given meshes into a new one, baking their transforms.
    pub fn merge_meshes(&mut self, ids: Vec<u32>, name: &str) -> Result<u32, JsValue> {
        let sources: Vec<EntityId> = ids.into_iter().map(EntityId::from_u32).collect();
        let merged = utils::merge_scene_meshes(&mut self.scene, &sources, name).map_err(to_js)?;
        Ok(merged.to_u32())
    }

    pub fn delete_mesh(&mut self, id: u32) -> bool {
        self.scene.world.despawn(EntityId::from_u32(id))
    }

    pub fn mesh_name(&self, id: u32) -> Option<String> {
        utils::mesh_name(&self.scene, EntityId::from_u32(id))
    }

    pub fn find_mesh(&self, name: &str) -> Option<u32> {
        self.scene.find_mesh_by_name(name).map(|entity| entity.to_u32())
    }

    pub fn mesh_count(&self) -> usize {
        self.scene.world.entity_count()
    }

    pub fn set_position(&mut self, id: u32, x: f32, y: f32, z: f32) {
        let entity = EntityId::from_u32(id);
        if let Some(transform) = self.scene.world.get_mut::<Transform>(entity) {
            transform.position = Vec3::new(x, y, z);
        }
        if self.gizmo_target == Some(entity) {
            self.sync_gizmo();
        }
    }

    pub fn set_camera(&mut self, px: f32, py: f32, pz: f32, tx: f32, ty: f32, tz: f32) {
        if let Some(camera) = self.scene.active_camera_mut() {
            camera.set_position(Vec3::new(px, py, pz));
            camera.set_target(Vec3::new(tx, ty, tz));
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.scene.set_viewport(width, height);
    }

    pub fn pointer_down(&mut self, pointer_id: u32, x: f32, y: f32) -> Result<JsValue, JsValue> {
        self.dispatch(PointerEvent::down(pointer_id, x, y))
    }

    pub fn pointer_move(&mut self, pointer_id: u32, x: f32, y: f32) -> Result<JsValue, JsValue> {
        self.dispatch(PointerEvent::moved(pointer_id, x, y))
    }

    pub fn pointer_up(&mut self, pointer_id: u32, x: f32, y: f32) -> Result<JsValue, JsValue> {
        self.dispatch(PointerEvent::up(pointer_id, x, y))
    }

    /// Show the position gizmo on `id`.
    pub fn enable_gizmo(&mut self, id: u32) -> Result<(), JsValue> {
        if self.gizmo.is_none() {
            let layer = self.layers.default_keep_depth_layer(&self.scene);
            self.gizmo = Some(PositionGizmo::new(layer).map_err(to_js)?);
        }
        self.gizmo_target = Some(EntityId::from_u32(id));
        self.sync_gizmo();
        Ok(())
    }

    pub fn disable_gizmo(&mut self) {
        if let Some(gizmo) = self.gizmo.take() {
            gizmo.dispose(self.layers.default_keep_depth_layer(&self.scene));
        }
        self.gizmo_target = None;
    }

    /// Axis under the pointer: "x", "y", "z" or "".
    pub fn hovered_axis(&self) -> String {
        let axis = self.gizmo.as_ref().map(PositionGizmo::hovered_axis).unwrap_or_default();
        utils::axis_to_string(axis)
    }

    /// Call `callback(pointerId)` when a pointer leaves the gizmo layer.
    pub fn on_pointer_out(&mut self, callback: Function) {
        let layer = self.layers.default_keep_depth_layer(&self.scene);
        layer.on_pointer_out_observable.add(move |pointer, _| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from(pointer.0)) {
                log::error!("pointer-out callback failed: {err:?}");
            }
        });
    }

    /// Replace the gizmo layer's options with a `UtilityLayerOptions` object;
    /// missing fields take their defaults.
    pub fn set_layer_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options: UtilityLayerOptions = serde_wasm_bindgen::from_value(options)?;
        self.layers.default_keep_depth_layer(&self.scene).options = options;
        Ok(())
    }

    pub fn dispose(&mut self) {
        self.disable_gizmo();
        self.layers.dispose_scene(self.scene.id());
        self.scene.dispose();
    }
}

impl Engine {
    fn dispatch(&mut self, event: PointerEvent) -> Result<JsValue, JsValue> {
        let mut layers = self.layers.layers_mut(self.scene.id());
        let dispatch = self.scene.simulate_pointer(event, &mut layers);
        Ok(serde_wasm_bindgen::to_value(&dispatch)?)
    }

    fn sync_gizmo(&mut self) {
        let (Some(gizmo), Some(target)) = (self.gizmo.as_mut(), self.gizmo_target) else {
            return;
        };
        let Some(position) = self.scene.world.get::<Transform>(target).map(|t| t.position) else {
            return;
        };
        gizmo.attach_to(self.layers.default_keep_depth_layer(&self.scene), position);
    }
}
