use super::row::{RowCells, RowHandle, RowHandler, RowId};
use crate::models::{EntityIndex, RowStatus};
use serde::{Deserialize, Serialize};

pub trait HandlerFactory: Send {
    fn bind(&self, entity: EntityIndex) -> RowHandler;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandlers;

impl HandlerFactory for NoopHandlers {
    fn bind(&self, _entity: EntityIndex) -> RowHandler {
        Box::new(|| {})
    }
}

#[derive(Debug, Clone)]
pub struct RowContent {
    pub entity: EntityIndex,
    pub cells: RowCells,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub cleared: usize,
    pub rows: usize,
}

impl RenderReport {
    pub fn content_changes(&self) -> usize {
        self.created + self.updated + self.cleared
    }
}

#[derive(Debug, Default)]
pub struct ViewReconciler {
    rows: Vec<RowHandle>,
}

impl ViewReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RowHandle] {
        &self.rows
    }

    // Row i mirrors contents[i]; rows past the end are blanked, never removed.
    pub fn reconcile(&mut self, contents: &[RowContent], handlers: &dyn HandlerFactory) -> RenderReport {
        let mut report = RenderReport::default();

        for (position, content) in contents.iter().enumerate() {
            let created = position == self.rows.len();
            if created {
                self.rows.push(RowHandle::new(RowId(position)));
            }

            let row = &mut self.rows[position];
            row.clear_status();
            let changed = row.write_cells(content.cells.clone());
            if created {
                report.created += 1;
            } else if changed {
                report.updated += 1;
            } else {
                report.unchanged += 1;
            }
            row.set_status(RowStatus::classify(content.cells.successes, content.cells.failures));
            row.rebind(content.entity, handlers.bind(content.entity));
        }

        for row in self.rows.iter_mut().skip(contents.len()) {
            if row.blank() {
                report.cleared += 1;
            }
        }

        report.rows = self.rows.len();
        report
    }
}
