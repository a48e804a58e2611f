#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationReason {
    Exited,
    Completed,
    AccessDenied,
}

/// Hands control back to the practice listing screen.
pub trait Navigator: Send + Sync {
    fn return_to_listing(&self, reason: NavigationReason);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn return_to_listing(&self, reason: NavigationReason) {
        tracing::info!(?reason, "returning to practice listing");
    }
}
