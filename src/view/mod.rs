pub mod reconciler;
pub mod row;

pub use reconciler::{HandlerFactory, NoopHandlers, RenderReport, RowContent, ViewReconciler};
pub use row::{RowCells, RowHandle, RowHandler, RowId};
