//! Overlay scenes drawn on top of a base scene, and the arbitration that
//! decides which of the two receives each pointer event.

use std::collections::HashMap;

use engine_core::EntityId;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::observable::Observable;
use crate::picking::PickingInfo;
use crate::pointer::{PointerEventType, PointerId, PointerInfo, PointerInfoPre};
use crate::scene::{Scene, SceneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UtilityLayerOptions {
    pub picking_enabled: bool,
    /// Also arbitrate wheel, pick and tap events.
    pub process_all_events: bool,
    /// Only pointer-down events are arbitrated; every other event goes
    /// straight to the overlay.
    pub only_check_pointer_down_events: bool,
    /// Let an overlay hit win even when the layer keeps depth.
    pub pick_utility_scene_first: bool,
    /// Draw over the base scene regardless of depth. When false the overlay
    /// is depth-tested against the base scene and arbitration compares
    /// pick distances.
    pub auto_clear_depth_and_stencil: bool,
    /// Take part in pointer arbitration at all.
    pub handle_events: bool,
}

impl Default for UtilityLayerOptions {
    fn default() -> Self {
        Self {
            picking_enabled: true,
            process_all_events: false,
            only_check_pointer_down_events: false,
            pick_utility_scene_first: false,
            auto_clear_depth_and_stencil: true,
            handle_events: true,
        }
    }
}

impl UtilityLayerOptions {
    /// Options of a layer that is occluded by the base scene.
    pub fn keep_depth() -> Self {
        Self {
            auto_clear_depth_and_stencil: false,
            ..Self::default()
        }
    }
}

/// Which pick was handed to the overlay's pointer observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickSource {
    Overlay,
    Base,
}

/// Outcome of one layer's arbitration of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerArbitration {
    pub forwarded: Option<PickSource>,
    /// The event is hidden from the base scene's pointer observers.
    pub consumed: bool,
    /// A trailing pointer-out was emitted before forwarding.
    pub pointer_out: bool,
}

/// Overlay scene bound to a base scene.
pub struct UtilityLayerRenderer {
    utility_scene: Scene,
    original_scene: SceneId,
    pub options: UtilityLayerOptions,
    render_camera: Option<Camera>,
    should_render: bool,
    /// Pointers whose current press belongs to the base scene.
    pointer_captures: HashMap<PointerId, bool>,
    /// Pointers whose last event was forwarded to the overlay.
    last_pointer_events: HashMap<PointerId, bool>,
    /// Base-scene meshes that belong to this layer, e.g. gizmo handles
    /// rendered in the base scene.
    pub main_scene_tracker_predicate: Option<Box<dyn Fn(EntityId) -> bool>>,
    pub on_pointer_out_observable: Observable<PointerId>,
    disposed: bool,
}

impl UtilityLayerRenderer {
    pub fn new(original: &Scene, options: UtilityLayerOptions) -> Self {
        let (width, height) = original.viewport();
        Self {
            utility_scene: Scene::new(width, height),
            original_scene: original.id(),
            options,
            render_camera: None,
            should_render: true,
            pointer_captures: HashMap::new(),
            last_pointer_events: HashMap::new(),
            main_scene_tracker_predicate: None,
            on_pointer_out_observable: Observable::new(),
            disposed: false,
        }
    }

    pub fn utility_scene(&self) -> &Scene {
        &self.utility_scene
    }

    pub fn utility_scene_mut(&mut self) -> &mut Scene {
        &mut self.utility_scene
    }

    pub fn original_scene(&self) -> SceneId {
        self.original_scene
    }

    /// Camera the overlay renders and picks with: the override if one was
    /// set, otherwise the base scene's active camera.
    pub fn get_render_camera<'a>(&'a self, original: &'a Scene) -> Option<&'a Camera> {
        self.render_camera.as_ref().or(original.active_camera())
    }

    pub fn set_render_camera(&mut self, camera: Option<Camera>) {
        self.render_camera = camera;
    }

    pub fn should_render(&self) -> bool {
        self.should_render && !self.disposed
    }

    pub fn set_should_render(&mut self, should_render: bool) {
        self.should_render = should_render;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether the base scene owns `pointer` until its next pointer-up.
    pub fn is_main_owned(&self, pointer: PointerId) -> bool {
        self.pointer_captures.get(&pointer).copied().unwrap_or(false)
    }

    fn tracks(&self, mesh: EntityId) -> bool {
        self.main_scene_tracker_predicate
            .as_ref()
            .is_some_and(|predicate| predicate(mesh))
    }

    /// Hand `pick` to the overlay's pointer observers unless an earlier
    /// layer already consumed the event.
    fn notify(&mut self, pre: &PointerInfoPre, pick: PickingInfo) -> bool {
        if pre.skip_on_pointer_observable {
            return false;
        }
        let info = PointerInfo::new(pre.event, pick);
        self.utility_scene
            .on_pointer_observable
            .notify_observers(&info, pre.event_type().mask());
        true
    }

    /// [`Self::notify`], arming a pointer-out for the pointer.
    fn forward(&mut self, pre: &PointerInfoPre, pick: PickingInfo) -> bool {
        let delivered = self.notify(pre, pick);
        if delivered {
            self.last_pointer_events.insert(pre.pointer_id(), true);
        }
        delivered
    }

    /// Fire the pointer-out owed for a pointer whose last event went to the
    /// overlay.
    fn emit_pending_pointer_out(&mut self, pointer: PointerId) -> bool {
        if self.last_pointer_events.remove(&pointer) != Some(true) {
            return false;
        }
        self.on_pointer_out_observable
            .notify_observers(&pointer, crate::observable::MASK_ALL);
        true
    }

    /// Arbitrate one event of the base scene before the base scene picks.
    ///
    /// May forward the event to the overlay's pointer observers and may set
    /// `pre.skip_on_pointer_observable`. Never clears that flag. A pointer-up
    /// drops every record kept for its pointer.
    pub fn process_pre_pointer(&mut self, original: &Scene, pre: &mut PointerInfoPre) -> PointerArbitration {
        let outcome = self.arbitrate(original, pre);
        if pre.event_type() == PointerEventType::Up {
            let pointer = pre.pointer_id();
            self.pointer_captures.remove(&pointer);
            self.last_pointer_events.remove(&pointer);
        }
        outcome
    }

    fn arbitrate(&mut self, original: &Scene, pre: &mut PointerInfoPre) -> PointerArbitration {
        let mut outcome = PointerArbitration::default();
        if self.disposed || !self.options.handle_events || !self.options.picking_enabled {
            return outcome;
        }
        if original.id() != self.original_scene {
            log::warn!("utility layer of {:?} received an event of {:?}", self.original_scene, original.id());
            return outcome;
        }
        let Some(camera) = self.get_render_camera(original) else {
            return outcome;
        };

        let event_type = pre.event_type();
        let arbitrated = matches!(
            event_type,
            PointerEventType::Move | PointerEventType::Up | PointerEventType::Down | PointerEventType::DoubleTap
        );
        if !arbitrated && !self.options.process_all_events {
            return outcome;
        }

        let pointer = pre.pointer_id();
        if original.is_pointer_captured(pointer) {
            self.pointer_captures.remove(&pointer);
            log::trace!("{pointer} captured by the base scene");
            return outcome;
        }

        let ray = match pre.ray {
            Some(ray) => ray,
            None => {
                let (width, height) = original.viewport();
                let ray = camera.screen_ray(pre.local_x, pre.local_y, width, height);
                if self.render_camera.is_none() {
                    pre.ray = Some(ray);
                }
                ray
            }
        };
        let utility_pick = self.utility_scene.pick_with_ray(ray);

        self.utility_scene
            .on_pre_pointer_observable
            .notify_observers(pre, event_type.mask());

        // No pointer-out is ever emitted in this mode, so nothing is armed.
        if self.options.only_check_pointer_down_events && event_type != PointerEventType::Down {
            if self.notify(pre, utility_pick) {
                outcome.forwarded = Some(PickSource::Overlay);
            }
            outcome.consumed = pre.skip_on_pointer_observable;
            return outcome;
        }

        if self.options.auto_clear_depth_and_stencil || self.options.pick_utility_scene_first {
            if utility_pick.hit {
                if self.forward(pre, utility_pick) {
                    outcome.forwarded = Some(PickSource::Overlay);
                }
                pre.skip_on_pointer_observable = true;
            }
            outcome.consumed = pre.skip_on_pointer_observable;
            log::trace!("{pointer} {event_type:?} overlay arbitration: {outcome:?}");
            return outcome;
        }

        let base_pick = match pre.ray {
            Some(ray) => original.pick_with_ray(ray),
            None => original.pick(pre.local_x, pre.local_y),
        };
        let main_owned = self.is_main_owned(pointer);
        let moving = matches!(event_type, PointerEventType::Move | PointerEventType::Up);

        if let Some(mesh) = base_pick.picked_mesh.filter(|_| utility_pick.distance == 0.0) {
            if self.tracks(mesh) {
                if self.forward(pre, base_pick) {
                    outcome.forwarded = Some(PickSource::Base);
                }
                pre.skip_on_pointer_observable = true;
            } else if event_type == PointerEventType::Down {
                self.pointer_captures.insert(pointer, true);
            } else if moving {
                outcome.pointer_out = self.emit_pending_pointer_out(pointer);
                if self.forward(pre, base_pick) {
                    outcome.forwarded = Some(PickSource::Base);
                }
            }
        } else if !main_owned && (utility_pick.distance < base_pick.distance || base_pick.distance == 0.0) {
            if self.forward(pre, utility_pick) {
                outcome.forwarded = Some(PickSource::Overlay);
            }
            if !pre.skip_on_pointer_observable {
                pre.skip_on_pointer_observable = utility_pick.distance > 0.0;
            }
        } else if !main_owned && utility_pick.distance >= base_pick.distance {
            // Equal distances land here: the base scene wins ties.
            if base_pick.picked_mesh.is_some_and(|mesh| self.tracks(mesh)) {
                if self.forward(pre, base_pick) {
                    outcome.forwarded = Some(PickSource::Base);
                }
                pre.skip_on_pointer_observable = true;
            } else {
                if moving {
                    outcome.pointer_out = self.emit_pending_pointer_out(pointer);
                }
                if self.forward(pre, utility_pick) {
                    outcome.forwarded = Some(PickSource::Overlay);
                }
            }
        }

        outcome.consumed = pre.skip_on_pointer_observable;
        log::trace!(
            "{pointer} {event_type:?} overlay {} / base {}: {outcome:?}",
            utility_pick.distance,
            base_pick.distance
        );
        outcome
    }

    /// Drop arbitration state, observers and the overlay scene.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.pointer_captures.clear();
        self.last_pointer_events.clear();
        self.main_scene_tracker_predicate = None;
        self.on_pointer_out_observable.clear();
        self.utility_scene.dispose();
        log::debug!("utility layer of {:?} disposed", self.original_scene);
    }
}

impl std::fmt::Debug for UtilityLayerRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtilityLayerRenderer")
            .field("original_scene", &self.original_scene)
            .field("options", &self.options)
            .field("pointer_captures", &self.pointer_captures)
            .field("last_pointer_events", &self.last_pointer_events)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct SceneLayers {
    overlay: Option<UtilityLayerRenderer>,
    keep_depth: Option<UtilityLayerRenderer>,
}

/// Shared utility layers, one pair per base scene.
#[derive(Debug, Default)]
pub struct UtilityLayerRegistry {
    scenes: HashMap<SceneId, SceneLayers>,
}

impl UtilityLayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay-mode layer of `scene`, created on first use.
    pub fn default_layer(&mut self, scene: &Scene) -> &mut UtilityLayerRenderer {
        self.scenes
            .entry(scene.id())
            .or_default()
            .overlay
            .get_or_insert_with(|| UtilityLayerRenderer::new(scene, UtilityLayerOptions::default()))
    }

    /// Depth-aware layer of `scene`, created on first use.
    pub fn default_keep_depth_layer(&mut self, scene: &Scene) -> &mut UtilityLayerRenderer {
        self.scenes
            .entry(scene.id())
            .or_default()
            .keep_depth
            .get_or_insert_with(|| UtilityLayerRenderer::new(scene, UtilityLayerOptions::keep_depth()))
    }

    pub fn contains(&self, scene: SceneId) -> bool {
        self.scenes.contains_key(&scene)
    }

    /// Layers of `scene` in arbitration order: overlay first.
    pub fn layers_mut(&mut self, scene: SceneId) -> Vec<&mut UtilityLayerRenderer> {
        match self.scenes.get_mut(&scene) {
            Some(SceneLayers { overlay, keep_depth }) => overlay.iter_mut().chain(keep_depth.iter_mut()).collect(),
            None => Vec::new(),
        }
    }

    /// Dispose and forget the layers of `scene`. Returns how many there were.
    pub fn dispose_scene(&mut self, scene: SceneId) -> usize {
        let Some(layers) = self.scenes.remove(&scene) else {
            return 0;
        };
        let mut disposed = 0;
        for mut layer in [layers.overlay, layers.keep_depth].into_iter().flatten() {
            layer.dispose();
            disposed += 1;
        }
        disposed
    }
}
