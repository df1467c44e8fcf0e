//! Position gizmo: three axis arrows living in a utility layer.

use std::cell::Cell;
use std::rc::Rc;

use engine_core::math::Color4;
use engine_core::{EntityId, Transform};
use glam::{Mat4, Vec3};

use crate::builders::{CylinderOptions, create_cylinder};
use crate::error::Result;
use crate::mesh::Mesh;
use crate::observable::ObserverId;
use crate::pointer::{PointerEventType, PointerInfo};
use crate::utility_layer::UtilityLayerRenderer;
use crate::vertex_data::{MergeOptions, VertexData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoAxis {
    #[default]
    None,
    X,
    Y,
    Z,
}

impl std::str::FromStr for GizmoAxis {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "x" => GizmoAxis::X,
            "y" => GizmoAxis::Y,
            "z" => GizmoAxis::Z,
            _ => GizmoAxis::None,
        })
    }
}

impl GizmoAxis {
    pub fn direction(self) -> Vec3 {
        match self {
            GizmoAxis::X => Vec3::X,
            GizmoAxis::Y => Vec3::Y,
            GizmoAxis::Z => Vec3::Z,
            GizmoAxis::None => Vec3::ZERO,
        }
    }

    pub fn color(self) -> Color4 {
        match self {
            GizmoAxis::X => COLOR_X,
            GizmoAxis::Y => COLOR_Y,
            GizmoAxis::Z => COLOR_Z,
            GizmoAxis::None => COLOR_NONE,
        }
    }

    /// Rotation taking the +Y arrow onto this axis.
    fn orientation(self) -> Mat4 {
        match self {
            GizmoAxis::X => Mat4::from_rotation_z(-std::f32::consts::FRAC_PI_2),
            GizmoAxis::Z => Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2),
            GizmoAxis::Y | GizmoAxis::None => Mat4::IDENTITY,
        }
    }
}

pub const COLOR_X: Color4 = Color4::new(0.9, 0.2, 0.2, 1.0);
pub const COLOR_Y: Color4 = Color4::new(0.2, 0.9, 0.2, 1.0);
pub const COLOR_Z: Color4 = Color4::new(0.2, 0.2, 0.9, 1.0);
const COLOR_NONE: Color4 = Color4::new(0.5, 0.5, 0.5, 0.5);

const SHAFT_LENGTH: f32 = 1.0;
const SHAFT_DIAMETER: f32 = 0.06;
const TIP_LENGTH: f32 = 0.3;
const TIP_DIAMETER: f32 = 0.16;

/// Arrow along `axis`: cylinder shaft from the origin, cone tip at the end.
pub fn create_arrow(axis: GizmoAxis) -> Result<VertexData> {
    let mut shaft = create_cylinder(&CylinderOptions {
        height: SHAFT_LENGTH,
        diameter_top: SHAFT_DIAMETER,
        diameter_bottom: SHAFT_DIAMETER,
        tessellation: 16,
        ..CylinderOptions::default()
    });
    let tip = create_cylinder(&CylinderOptions {
        height: TIP_LENGTH,
        diameter_top: 0.0,
        diameter_bottom: TIP_DIAMETER,
        tessellation: 16,
        ..CylinderOptions::default()
    });

    let orientation = axis.orientation();
    let shaft_at = orientation * Mat4::from_translation(Vec3::Y * SHAFT_LENGTH * 0.5);
    let tip_at = orientation * Mat4::from_translation(Vec3::Y * (SHAFT_LENGTH + TIP_LENGTH * 0.5));
    shaft.merge_transformed(Some(shaft_at), &[(&tip, Some(tip_at))], MergeOptions::default())?;

    let colors = vec![axis.color(); shaft.vertex_count()];
    shaft.set_colors(&colors);
    Ok(shaft)
}

/// Translation handles for the three world axes.
///
/// Hover state follows the layer's forwarded pointer events: a pick on one
/// of the arrows highlights its axis, anything else clears it, and so does
/// the layer's pointer-out.
#[derive(Debug)]
pub struct PositionGizmo {
    handles: [(GizmoAxis, EntityId); 3],
    position: Vec3,
    scale: f32,
    hovered: Rc<Cell<GizmoAxis>>,
    pointer_observer: ObserverId,
    pointer_out_observer: ObserverId,
}

impl PositionGizmo {
    pub fn new(layer: &mut UtilityLayerRenderer) -> Result<Self> {
        let scene = layer.utility_scene_mut();
        let mut spawn = |axis: GizmoAxis| -> Result<(GizmoAxis, EntityId)> {
            let name = format!("gizmo-{axis:?}").to_lowercase();
            let mesh = Mesh::from_vertex_data(name, &create_arrow(axis)?, false)?;
            Ok((axis, scene.add_mesh(mesh, Transform::identity())))
        };
        let handles = [spawn(GizmoAxis::X)?, spawn(GizmoAxis::Y)?, spawn(GizmoAxis::Z)?];

        let scene_id = scene.id();
        let hovered = Rc::new(Cell::new(GizmoAxis::None));
        let sink = Rc::clone(&hovered);
        let pointer_observer = scene.on_pointer_observable.add_with_mask(
            PointerEventType::Move.mask() | PointerEventType::Down.mask(),
            move |info: &PointerInfo, _| {
                let axis = info
                    .pick_info
                    .picked_mesh
                    .filter(|_| info.pick_info.picked_scene == Some(scene_id))
                    .and_then(|mesh| handles.iter().find(|(_, e)| *e == mesh))
                    .map_or(GizmoAxis::None, |(axis, _)| *axis);
                sink.set(axis);
            },
        );
        let sink = Rc::clone(&hovered);
        let pointer_out_observer = layer
            .on_pointer_out_observable
            .add(move |_, _| sink.set(GizmoAxis::None));

        log::debug!("position gizmo created in {scene_id:?}");
        Ok(Self {
            handles,
            position: Vec3::ZERO,
            scale: 1.0,
            hovered,
            pointer_observer,
            pointer_out_observer,
        })
    }

    /// Move the handles to `position`.
    pub fn attach_to(&mut self, layer: &mut UtilityLayerRenderer, position: Vec3) {
        self.position = position;
        self.sync(layer);
    }

    pub fn set_scale(&mut self, layer: &mut UtilityLayerRenderer, scale: f32) {
        self.scale = scale;
        self.sync(layer);
    }

    fn sync(&self, layer: &mut UtilityLayerRenderer) {
        let world = &mut layer.utility_scene_mut().world;
        for (_, entity) in self.handles {
            if let Some(transform) = world.get_mut::<Transform>(entity) {
                *transform = Transform::from_position(self.position).with_scale(Vec3::splat(self.scale));
            }
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn hovered_axis(&self) -> GizmoAxis {
        self.hovered.get()
    }

    pub fn axis_of(&self, entity: EntityId) -> GizmoAxis {
        self.handles
            .iter()
            .find(|(_, e)| *e == entity)
            .map_or(GizmoAxis::None, |(axis, _)| *axis)
    }

    pub fn handle(&self, axis: GizmoAxis) -> Option<EntityId> {
        self.handles.iter().find(|(a, _)| *a == axis).map(|(_, e)| *e)
    }

    /// Remove the handles and observers from `layer`.
    pub fn dispose(self, layer: &mut UtilityLayerRenderer) {
        layer.on_pointer_out_observable.remove(self.pointer_out_observer);
        let scene = layer.utility_scene_mut();
        scene.on_pointer_observable.remove(self.pointer_observer);
        for (_, entity) in self.handles {
            scene.world.despawn(entity);
        }
    }
}
