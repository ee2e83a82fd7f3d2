use std::{future::Future, sync::Arc};

use tokio::sync::OnceCell;

use crate::Controller;

/// Holds at most one controller. Concurrent first callers wait for a single
/// initializer; if that initializer panics the cell stays empty and the next
/// caller runs its own.
pub struct ControllerCell {
    cell: OnceCell<Arc<Controller>>,
}

impl ControllerCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub async fn get_or_init<F, Fut>(&self, init: F) -> Arc<Controller>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Arc<Controller>>,
    {
        Arc::clone(self.cell.get_or_init(init).await)
    }

    pub fn get(&self) -> Option<Arc<Controller>> {
        self.cell.get().cloned()
    }
}

impl Default for ControllerCell {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) static GLOBAL: ControllerCell = ControllerCell::new();
