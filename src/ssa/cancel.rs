//! ssa::cancel — cooperative stop requests for restart loops.
//!
//! A [`CancellationToken`] is a cloneable handle around a shared flag. The
//! orchestrator polls it after each restart; a restart in progress always
//! runs to completion.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; visible to every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
