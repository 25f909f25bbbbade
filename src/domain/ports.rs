/// Receives full/not-full events from a lot each time its sign is recomputed.
///
/// Implementations should not panic. A panicking observer is contained by the
/// lot and does not stop the remaining observers from being notified.
pub trait SecurityObserver: Send + Sync {
    fn on_fullness_changed(&self, is_full: bool);
}
