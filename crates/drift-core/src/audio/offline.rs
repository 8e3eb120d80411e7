//! Offline output: frames are pulled by the caller instead of a device
//!
//! Used for deterministic tests and for rendering a venue to a file.

use crate::graph::Renderer;
use crate::types::StereoBuffer;

pub struct OfflineOutput {
    renderer: Renderer,
}

impl OfflineOutput {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }

    pub fn sample_rate(&self) -> u32 {
        self.renderer.sample_rate()
    }

    /// Render the next `frames` frames and append them to `out`
    pub fn render_into(&mut self, frames: usize, out: &mut StereoBuffer) {
        out.extend_from(&self.render(frames));
    }

    /// Render the next `frames` frames
    pub fn render(&mut self, frames: usize) -> StereoBuffer {
        let mut block = StereoBuffer::silence(frames);
        self.renderer.process(block.as_mut_slice());
        block
    }
}
