//! Per-eye resource table.

use super::handles::{ImageHandle, SwapchainHandle};
use crate::engine::{EngineError, EngineResult};

/// One eye's swapchain and the images behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeResource {
    swapchain: SwapchainHandle,
    width: u32,
    height: u32,
    images: Vec<ImageHandle>,
}

impl EyeResource {
    pub fn new(swapchain: SwapchainHandle, width: u32, height: u32, images: Vec<ImageHandle>) -> Self {
        Self {
            swapchain,
            width,
            height,
            images,
        }
    }

    pub fn swapchain(&self) -> SwapchainHandle {
        self.swapchain
    }

    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }
}

/// Per-frame checkout state of one eye.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Checkout {
    /// Image index currently held for rendering.
    acquired: Option<u32>,
    /// Image index released this frame, waiting for composition.
    released: Option<u32>,
}

/// Eye resources plus acquisition bookkeeping.
///
/// The resource list is fixed once built; only whole-table `drain` removes
/// entries.
#[derive(Debug, Default)]
pub struct EyeTable {
    eyes: Vec<EyeResource>,
    checkouts: Vec<Checkout>,
}

impl EyeTable {
    pub fn new(eyes: Vec<EyeResource>) -> Self {
        let checkouts = vec![Checkout::default(); eyes.len()];
        Self { eyes, checkouts }
    }

    pub fn len(&self) -> usize {
        self.eyes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eyes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EyeResource> {
        self.eyes.iter()
    }

    pub fn get(&self, eye: usize) -> EngineResult<&EyeResource> {
        self.eyes.get(eye).ok_or(EngineError::EyeOutOfRange {
            eye,
            count: self.eyes.len(),
        })
    }

    pub fn is_acquired(&self, eye: usize) -> bool {
        self.acquired_index(eye).is_some()
    }

    pub fn acquired_index(&self, eye: usize) -> Option<u32> {
        self.checkouts.get(eye).and_then(|c| c.acquired)
    }

    pub fn released_index(&self, eye: usize) -> Option<u32> {
        self.checkouts.get(eye).and_then(|c| c.released)
    }

    pub fn any_acquired(&self) -> bool {
        self.checkouts.iter().any(|c| c.acquired.is_some())
    }

    pub(crate) fn mark_acquired(&mut self, eye: usize, index: u32) {
        debug_assert!(
            (index as usize) < self.eyes[eye].images.len(),
            "acquired index {index} outside eye {eye} image ring"
        );
        debug_assert!(self.checkouts[eye].acquired.is_none());
        self.checkouts[eye] = Checkout {
            acquired: Some(index),
            released: None,
        };
    }

    /// Moves the eye from "held for rendering" to "ready for composition".
    pub(crate) fn mark_released(&mut self, eye: usize) {
        let c = &mut self.checkouts[eye];
        c.released = c.acquired.take();
    }

    /// Frame boundary: forget every checkout.
    pub(crate) fn reset_checkouts(&mut self) {
        self.checkouts.fill(Checkout::default());
    }

    /// Empties the table, handing back the resources for destruction.
    pub(crate) fn drain(&mut self) -> Vec<EyeResource> {
        self.checkouts.clear();
        std::mem::take(&mut self.eyes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn table(eyes: usize) -> EyeTable {
        let mut keys: SlotMap<SwapchainHandle, ()> = SlotMap::with_key();
        EyeTable::new(
            (0..eyes)
                .map(|i| {
                    EyeResource::new(
                        keys.insert(()),
                        100 + i as u32,
                        200,
                        vec![ImageHandle(1), ImageHandle(2), ImageHandle(3)],
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn get_rejects_out_of_range() {
        let t = table(2);
        assert!(t.get(1).is_ok());
        assert!(matches!(
            t.get(2),
            Err(EngineError::EyeOutOfRange { eye: 2, count: 2 })
        ));
    }

    #[test]
    fn release_moves_index_to_composition_slot() {
        let mut t = table(2);
        t.mark_acquired(1, 2);
        assert!(t.is_acquired(1));
        assert!(!t.is_acquired(0));

        t.mark_released(1);
        assert!(!t.is_acquired(1));
        assert_eq!(t.released_index(1), Some(2));
    }

    #[test]
    fn reset_clears_all_checkouts() {
        let mut t = table(2);
        t.mark_acquired(0, 0);
        t.mark_acquired(1, 1);
        t.mark_released(1);
        t.reset_checkouts();
        assert!(!t.any_acquired());
        assert_eq!(t.released_index(1), None);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn drain_empties_table() {
        let mut t = table(2);
        let eyes = t.drain();
        assert_eq!(eyes.len(), 2);
        assert!(t.is_empty());
        assert!(!t.is_acquired(0));
    }
}
