use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared on/off state of every interceptor. While off, each interceptor
/// forwards straight to the call it wraps.
#[derive(Clone, Default)]
pub struct InterceptorSwitch {
    enabled: Arc<AtomicBool>,
}

impl InterceptorSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
