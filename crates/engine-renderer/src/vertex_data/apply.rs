use std::sync::Arc;

use super::VertexData;
use crate::error::Result;
use crate::geometry::{Geometry, GeometryOwner};
use crate::index_buffer::IndexBuffer;
use crate::mesh::Mesh;
use crate::vertex_kind::VertexKind;

/// One unit of work performed by an [`ApplyTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    Attribute(VertexKind),
    Indices,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Set { updatable: bool },
    Update { update_extends: bool, make_it_unique: bool },
}

/// Incremental bind of vertex data to an owner.
///
/// Every call to `next` performs one whole attribute (or index) bind and
/// yields what it bound. Dropping the task early keeps the binds already
/// done.
pub struct ApplyTask<'a, O: GeometryOwner + ?Sized> {
    data: &'a VertexData,
    owner: &'a mut O,
    mode: Mode,
    steps: std::vec::IntoIter<ApplyStep>,
}

impl<'a, O: GeometryOwner + ?Sized> ApplyTask<'a, O> {
    fn new(data: &'a VertexData, owner: &'a mut O, mode: Mode) -> Self {
        let mut steps: Vec<ApplyStep> = data.kinds().map(ApplyStep::Attribute).collect();
        if matches!(mode, Mode::Set { .. }) || data.indices.is_some() {
            steps.push(ApplyStep::Indices);
        }
        Self {
            data,
            owner,
            mode,
            steps: steps.into_iter(),
        }
    }

    /// Steps not yet performed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    fn bind_attribute(&mut self, kind: VertexKind) {
        let data = self.data;
        let Some(values) = data.get(kind) else {
            return;
        };
        match self.mode {
            Mode::Set { updatable } => self.owner.set_vertices_data(kind, values, updatable),
            Mode::Update { update_extends, make_it_unique } => self.owner.update_vertices_data(
                kind,
                values,
                update_extends && kind == VertexKind::Position,
                make_it_unique,
            ),
        }
    }

    fn bind_indices(&mut self) {
        let total_vertices = Some(self.data.vertex_count());
        match (self.mode, &self.data.indices) {
            (Mode::Set { updatable }, Some(indices)) => {
                self.owner.set_indices(Arc::clone(indices), total_vertices, updatable)
            }
            (Mode::Set { updatable }, None) => {
                self.owner
                    .set_indices(Arc::new(IndexBuffer::default()), total_vertices, updatable)
            }
            (Mode::Update { .. }, Some(indices)) => self.owner.set_indices(Arc::clone(indices), None, false),
            (Mode::Update { .. }, None) => {}
        }
    }
}

impl<O: GeometryOwner + ?Sized> Iterator for ApplyTask<'_, O> {
    type Item = ApplyStep;

    fn next(&mut self) -> Option<ApplyStep> {
        let step = self.steps.next()?;
        match step {
            ApplyStep::Attribute(kind) => self.bind_attribute(kind),
            ApplyStep::Indices => self.bind_indices(),
        }
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.steps.size_hint()
    }
}

impl VertexData {
    /// Validate, then return a task binding this data to `owner` one
    /// attribute at a time.
    pub fn apply_task<'a, O: GeometryOwner + ?Sized>(
        &'a self,
        owner: &'a mut O,
        updatable: bool,
    ) -> Result<ApplyTask<'a, O>> {
        self.checked_before_bind()?;
        Ok(ApplyTask::new(self, owner, Mode::Set { updatable }))
    }

    /// Validate, then return a task updating the buffers `owner` already has.
    pub fn update_task<'a, O: GeometryOwner + ?Sized>(
        &'a self,
        owner: &'a mut O,
        update_extends: bool,
        make_it_unique: bool,
    ) -> Result<ApplyTask<'a, O>> {
        self.checked_before_bind()?;
        Ok(ApplyTask::new(self, owner, Mode::Update { update_extends, make_it_unique }))
    }

    fn checked_before_bind(&self) -> Result<usize> {
        self.validate().inspect_err(|err| log::warn!("vertex data rejected: {err}"))
    }

    /// Bind every present attribute, then the indices.
    pub fn apply_to<O: GeometryOwner + ?Sized>(&self, owner: &mut O, updatable: bool) -> Result<()> {
        let bound = self.apply_task(owner, updatable)?.count();
        log::debug!("applied {bound} buffers ({} vertices)", self.vertex_count());
        Ok(())
    }

    pub fn apply_to_geometry(&self, geometry: &mut Geometry, updatable: bool) -> Result<()> {
        self.apply_to(geometry, updatable)
    }

    pub fn apply_to_mesh(&self, mesh: &mut Mesh, updatable: bool) -> Result<()> {
        self.apply_to(mesh, updatable)
    }

    /// Update the owner's existing buffers, then its indices when present.
    pub fn update<O: GeometryOwner + ?Sized>(
        &self,
        owner: &mut O,
        update_extends: bool,
        make_it_unique: bool,
    ) -> Result<()> {
        let updated = self.update_task(owner, update_extends, make_it_unique)?.count();
        log::debug!("updated {updated} buffers");
        Ok(())
    }

    pub fn update_geometry(&self, geometry: &mut Geometry) -> Result<()> {
        self.update(geometry, false, false)
    }

    pub fn update_mesh(&self, mesh: &mut Mesh, update_extends: bool, make_it_unique: bool) -> Result<()> {
        self.update(mesh, update_extends, make_it_unique)
    }

    /// Read every present buffer and the indices back from `owner`.
    pub fn extract_from<O: GeometryOwner + ?Sized>(owner: &O, copy_when_shared: bool, force_copy: bool) -> Self {
        let mut data = VertexData::new();
        for kind in VertexKind::ALL {
            if let Some(values) = owner.get_vertices_data(kind, copy_when_shared, force_copy) {
                data.set(kind, Arc::unwrap_or_clone(values));
            }
        }
        data.indices = owner
            .get_indices(copy_when_shared, force_copy)
            .filter(|indices| !indices.is_empty());
        data
    }
}
