//! Helpers behind the JS facade that do not touch `JsValue`.

use engine_core::{EntityId, Name, Transform};
use engine_renderer::{GizmoAxis, MergeOptions, Mesh, Result, Scene, VertexData, VertexDataError};

pub fn axis_to_string(axis: GizmoAxis) -> String {
    match axis {
        GizmoAxis::X => "x".to_string(),
        GizmoAxis::Y => "y".to_string(),
        GizmoAxis::Z => "z".to_string(),
        GizmoAxis::None => "".to_string(),
    }
}

/// Bake the world transforms of `sources` into one new mesh and despawn them.
///
/// Sources that are not live meshes are rejected before anything changes.
pub fn merge_scene_meshes(scene: &mut Scene, sources: &[EntityId], name: &str) -> Result<EntityId> {
    let mut parts = Vec::with_capacity(sources.len());
    for &entity in sources {
        let (Some(mesh), Some(transform)) = (scene.mesh(entity), scene.world.get::<Transform>(entity)) else {
            return Err(VertexDataError::NotAMesh(entity));
        };
        parts.push((VertexData::extract_from(mesh, false, false), transform.to_matrix()));
    }
    let Some(((first, first_matrix), rest)) = parts.split_first() else {
        return Err(VertexDataError::EmptyMerge);
    };

    let others: Vec<(&VertexData, Option<_>)> = rest.iter().map(|(data, matrix)| (data, Some(*matrix))).collect();
    let mut merged = first.clone();
    merged.merge_transformed(Some(*first_matrix), &others, MergeOptions::default())?;

    // Sources are about to go, so their names are free.
    let taken = |candidate: &str| {
        scene
            .world
            .iter_with::<Name>()
            .any(|(entity, label)| *label == candidate && !sources.contains(&entity))
    };
    let name = Name::unique(name, taken);
    let mesh = Mesh::from_vertex_data(name.as_str(), &merged, false)?;
    for &entity in sources {
        scene.world.despawn(entity);
    }
    let entity = scene.add_mesh(mesh, Transform::identity());
    log::debug!("merged {} meshes into '{name}' ({entity})", sources.len());
    Ok(entity)
}

pub fn mesh_name(scene: &Scene, entity: EntityId) -> Option<String> {
    scene.world.get::<Name>(entity).map(|name| name.as_str().to_string())
}
