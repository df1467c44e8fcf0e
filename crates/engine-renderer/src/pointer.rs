//! Pointer events as delivered to scenes and utility layers.

use serde::{Deserialize, Serialize};

use crate::picking::{PickingInfo, Ray};

/// Identifies one pointer (mouse, touch point or pen) across events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerId(pub u32);

impl std::fmt::Display for PointerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pointer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventType {
    Down,
    Up,
    Move,
    Wheel,
    Pick,
    Tap,
    DoubleTap,
}

impl PointerEventType {
    /// Observer mask bit of this event type.
    pub const fn mask(self) -> u32 {
        match self {
            PointerEventType::Down => 0x01,
            PointerEventType::Up => 0x02,
            PointerEventType::Move => 0x04,
            PointerEventType::Wheel => 0x08,
            PointerEventType::Pick => 0x10,
            PointerEventType::Tap => 0x20,
            PointerEventType::DoubleTap => 0x40,
        }
    }
}

/// Raw input event in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub pointer_id: PointerId,
    pub event_type: PointerEventType,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(pointer_id: PointerId, event_type: PointerEventType, x: f32, y: f32) -> Self {
        Self { pointer_id, event_type, x, y }
    }

    pub fn down(pointer_id: u32, x: f32, y: f32) -> Self {
        Self::new(PointerId(pointer_id), PointerEventType::Down, x, y)
    }

    pub fn moved(pointer_id: u32, x: f32, y: f32) -> Self {
        Self::new(PointerId(pointer_id), PointerEventType::Move, x, y)
    }

    pub fn up(pointer_id: u32, x: f32, y: f32) -> Self {
        Self::new(PointerId(pointer_id), PointerEventType::Up, x, y)
    }
}

/// Pre-pick stage of an event.
///
/// Utility layers see this before the owning scene picks. Setting
/// `skip_on_pointer_observable` keeps the event from reaching the scene's
/// own pointer observers.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInfoPre {
    pub event: PointerEvent,
    pub local_x: f32,
    pub local_y: f32,
    pub skip_on_pointer_observable: bool,
    /// World ray for this event. Filled by the first party that computes it.
    pub ray: Option<Ray>,
}

impl PointerInfoPre {
    pub fn new(event: PointerEvent) -> Self {
        Self {
            event,
            local_x: event.x,
            local_y: event.y,
            skip_on_pointer_observable: false,
            ray: None,
        }
    }

    pub fn pointer_id(&self) -> PointerId {
        self.event.pointer_id
    }

    pub fn event_type(&self) -> PointerEventType {
        self.event.event_type
    }
}

/// Picked stage of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInfo {
    pub event: PointerEvent,
    pub pick_info: PickingInfo,
}

impl PointerInfo {
    pub fn new(event: PointerEvent, pick_info: PickingInfo) -> Self {
        Self { event, pick_info }
    }

    pub fn event_type(&self) -> PointerEventType {
        self.event.event_type
    }
}
