use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use common::{Point, Rgb};

use super::{Surface, SurfaceEvent};

/// An in-memory RGB surface. Drawing goes to a back buffer; `present` copies
/// it to the front buffer that `pixel` reads from.
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    back: Vec<Rgb>,
    front: Vec<Rgb>,
    presented: u64,
    close: CloseHandle,
}

/// Asks a `FrameBuffer` to close, the way a window manager would. Can be
/// cloned and used from any thread.
#[derive(Clone, Debug, Default)]
pub struct CloseHandle {
    requested: Arc<AtomicBool>,
}

impl CloseHandle {
    pub fn close(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = width as usize * height as usize;
        FrameBuffer {
            width,
            height,
            back: vec![Rgb::BLACK; pixels],
            front: vec![Rgb::BLACK; pixels],
            presented: 0,
            close: CloseHandle::default(),
        }
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// A pixel of the last presented frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.front
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Number of non-black pixels in the last presented frame.
    pub fn lit_pixels(&self) -> usize {
        self.front.iter().filter(|pixel| **pixel != Rgb::BLACK).count()
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }
}

impl Surface for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgb) {
        self.back.fill(color);
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb) {
        if !(radius > 0.0 && center.0.is_finite() && center.1.is_finite()) {
            return;
        }

        // Bounding box, clipped to the buffer
        let clip = |value: f64, limit: u32| value.clamp(0.0, limit as f64) as u32;
        let (x0, x1) = (
            clip((center.0 - radius).floor(), self.width),
            clip((center.0 + radius).ceil(), self.width),
        );
        let (y0, y1) = (
            clip((center.1 - radius).floor(), self.height),
            clip((center.1 + radius).ceil(), self.height),
        );

        let radius_squared = radius * radius;
        for y in y0..y1 {
            let dy = y as f64 + 0.5 - center.1;
            let row = y as usize * self.width as usize;
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - center.0;
                if dx * dx + dy * dy <= radius_squared {
                    self.back[row + x as usize] = color;
                }
            }
        }
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.front.copy_from_slice(&self.back);
        self.presented += 1;
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        if self.close.is_requested() {
            vec![SurfaceEvent::Quit]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_is_drawn_after_present() {
        let mut frame = FrameBuffer::new(40, 30);
        frame.fill_circle((20.0, 15.0), 5.0, Rgb::RED);

        assert_eq!(0, frame.lit_pixels());
        frame.present().unwrap();

        assert_eq!(Some(Rgb::RED), frame.pixel(20, 15));
        assert_eq!(Some(Rgb::BLACK), frame.pixel(0, 0));
        // Roughly pi * r^2
        assert!((70..=90).contains(&frame.lit_pixels()));
    }

    #[test]
    fn test_circle_is_clipped_to_the_buffer() {
        let mut frame = FrameBuffer::new(10, 10);
        frame.fill_circle((-3.0, 12.0), 6.0, Rgb::RED);
        frame.fill_circle((5.0, 5.0), f64::NAN, Rgb::RED);
        frame.present().unwrap();

        assert_eq!(Some(Rgb::RED), frame.pixel(0, 9));
        assert_eq!(None, frame.pixel(10, 0));
    }

    #[test]
    fn test_close_handle_reports_quit() {
        let mut frame = FrameBuffer::new(1, 1);
        assert!(frame.poll_events().is_empty());

        frame.close_handle().close();
        assert_eq!(vec![SurfaceEvent::Quit], frame.poll_events());
    }
}
