/// Private interfaces for the canlink node
///
/// Drivers should not use this module.
/// Backward-incompatible changes can be made without major version bump.
use crate::frame::Frame;

pub trait DynamicRx {
    /// Enqueues a frame without blocking. Returns the frame back if there is no free slot.
    fn try_push(&self, frame: Frame) -> Result<(), Frame>;
}
