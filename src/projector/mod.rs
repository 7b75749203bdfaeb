use common::{Point, Rgb};

mod frame_buffer;
mod render;

pub use frame_buffer::{CloseHandle, FrameBuffer};
pub use render::{RenderLoop, RenderStats, TickOutcome};

/// Something the host window system tells the render loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The user closed the output. The render loop ends, the process does not.
    Quit,
}

/// A display the render loop can draw on. The only primitive is a filled
/// circle; everything else is up to the implementation.
pub trait Surface {
    /// Width and height in pixels
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, color: Rgb);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb);

    /// Show everything drawn since the last `clear`.
    fn present(&mut self) -> anyhow::Result<()>;

    /// Drain pending host events. Called once per frame.
    fn poll_events(&mut self) -> Vec<SurfaceEvent>;
}
