use crate::models::{EntityIndex, RowStatus};
use std::fmt;

pub type RowHandler = Box<dyn Fn() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tr{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCells {
    pub label: String,
    pub successes: u64,
    pub failures: u64,
}

struct RowBinding {
    entity: EntityIndex,
    handler: RowHandler,
}

pub struct RowHandle {
    id: RowId,
    cells: Option<RowCells>,
    status: Option<RowStatus>,
    binding: Option<RowBinding>,
}

impl RowHandle {
    pub(crate) fn new(id: RowId) -> Self {
        Self {
            id,
            cells: None,
            status: None,
            binding: None,
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn cells(&self) -> Option<&RowCells> {
        self.cells.as_ref()
    }

    pub fn status(&self) -> Option<RowStatus> {
        self.status
    }

    pub fn bound_entity(&self) -> Option<EntityIndex> {
        self.binding.as_ref().map(|binding| binding.entity)
    }

    pub fn activate(&self) -> bool {
        match &self.binding {
            Some(binding) => {
                (binding.handler)();
                true
            }
            None => false,
        }
    }

    pub(crate) fn write_cells(&mut self, cells: RowCells) -> bool {
        if self.cells.as_ref() == Some(&cells) {
            return false;
        }
        self.cells = Some(cells);
        true
    }

    pub(crate) fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn set_status(&mut self, status: RowStatus) {
        self.status = Some(status);
    }

    pub(crate) fn rebind(&mut self, entity: EntityIndex, handler: RowHandler) {
        self.binding = Some(RowBinding { entity, handler });
    }

    pub(crate) fn blank(&mut self) -> bool {
        let had_content = self.cells.is_some() || self.binding.is_some();
        self.cells = None;
        self.status = None;
        self.binding = None;
        had_content
    }
}

impl fmt::Debug for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowHandle")
            .field("id", &self.id)
            .field("cells", &self.cells)
            .field("status", &self.status)
            .field("bound_entity", &self.bound_entity())
            .finish()
    }
}
