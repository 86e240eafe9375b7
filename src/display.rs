//! Display sink and the key grid view drawn by the diagnostic runner.

use std::os::fd::AsRawFd;
use std::path::PathBuf;

use crate::key::Key;

/// RGB565 colour of a pressed key cell
pub const PRESSED: u16 = 0xffff;
/// RGB565 colour of a released key cell
pub const RELEASED: u16 = 0x4208;
/// RGB565 background colour
pub const BACKGROUND: u16 = 0x0000;

/// Something that shows a full RGB565 frame.
pub trait DisplaySink {
    /// Size in pixels as `(width, height)`
    fn size(&self) -> (usize, usize);

    /// Fill the whole output with `color`
    fn clear(&mut self, color: u16);

    /// Show `buffer`, which holds `width * height` pixels row by row
    fn present(&mut self, buffer: &[u16]) -> anyhow::Result<()>;
}

pub struct FramebufferConfig {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub bytes_per_pixel: usize,
    pub stride_pixels: usize,
}

/// Represents a memory-mapped RGB565 framebuffer.
pub struct Framebuffer {
    width: usize,
    height: usize,
    ptr: *mut u16,
    /// The number of pixels in a single row of the framebuffer.
    stride: usize,
    size: usize,
}

impl Framebuffer {
    /// Maps the framebuffer device described by `config`.
    pub fn new(config: FramebufferConfig) -> anyhow::Result<Framebuffer> {
        if config.bytes_per_pixel != 2 {
            anyhow::bail!(
                "Unsupported framebuffer depth: {} bytes per pixel",
                config.bytes_per_pixel
            );
        }
        if config.stride_pixels < config.width {
            anyhow::bail!(
                "Framebuffer stride {} is smaller than width {}",
                config.stride_pixels,
                config.width
            );
        }
        // open framebuffer
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.path)
            .map_err(|e| {
                anyhow::anyhow!("Failed to open framebuffer {:?}: {}", config.path, e)
            })?;

        let fd = file.as_raw_fd();

        let size = config.stride_pixels * config.height * config.bytes_per_pixel;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(anyhow::anyhow!("Failed to mmap framebuffer"));
        }
        Ok(Framebuffer {
            width: config.width,
            height: config.height,
            ptr: ptr as *mut u16,
            stride: config.stride_pixels,
            size,
        })
    }
}

impl DisplaySink for Framebuffer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: u16) {
        for y in 0..self.height {
            // rows are `stride` pixels apart inside the mapping
            let row = unsafe {
                std::slice::from_raw_parts_mut(self.ptr.add(y * self.stride), self.width)
            };
            row.fill(color);
        }
    }

    fn present(&mut self, buffer: &[u16]) -> anyhow::Result<()> {
        if buffer.len() != self.width * self.height {
            anyhow::bail!(
                "Frame has {} pixels, framebuffer expects {}",
                buffer.len(),
                self.width * self.height
            );
        }
        for (y, src) in buffer.chunks_exact(self.width).enumerate() {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src.as_ptr(),
                    self.ptr.add(y * self.stride),
                    self.width,
                );
            }
        }
        Ok(())
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.size);
        }
    }
}

/// Square cells, one per key, laid out in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGrid {
    width: usize,
    height: usize,
    columns: usize,
    cell: usize,
    total: usize,
}

impl KeyGrid {
    const GAP: usize = 2;

    /// Fit `total` cells into a `width` x `height` frame
    pub fn new(total: usize, width: usize, height: usize) -> Self {
        let columns = (1..=total.max(1))
            .find(|c| c * c >= total)
            .unwrap_or(1);
        let rows = total.div_ceil(columns).max(1);
        let cell = (width / columns).min(height / rows);
        Self {
            width,
            height,
            columns,
            cell,
            total,
        }
    }

    /// Side of a cell in pixels
    pub fn cell(&self) -> usize {
        self.cell
    }

    /// Top-left pixel of the cell of `key`
    pub fn origin(&self, key: Key) -> Option<(usize, usize)> {
        let index = key.index();
        if index >= self.total {
            return None;
        }
        Some((
            (index % self.columns) * self.cell,
            (index / self.columns) * self.cell,
        ))
    }

    /// Draw every cell into `buffer`, lit when its key is in `pressed`
    pub fn render(&self, pressed: &[Key], buffer: &mut [u16]) {
        buffer.fill(BACKGROUND);
        if self.cell <= Self::GAP * 2 {
            return;
        }
        let inner = self.cell - Self::GAP * 2;
        for index in 0..self.total {
            let Ok(raw) = u16::try_from(index) else {
                break;
            };
            let key = Key::new(raw);
            let Some((x, y)) = self.origin(key) else {
                continue;
            };
            let color = if pressed.contains(&key) {
                PRESSED
            } else {
                RELEASED
            };
            for dy in 0..inner {
                let start = (y + Self::GAP + dy) * self.width + x + Self::GAP;
                if let Some(row) = buffer.get_mut(start..start + inner) {
                    row.fill(color);
                }
            }
        }
    }

    /// Render and hand the frame to `sink`
    pub fn present(&self, pressed: &[Key], sink: &mut dyn DisplaySink) -> anyhow::Result<()> {
        let mut buffer = vec![BACKGROUND; self.width * self.height];
        self.render(pressed, &mut buffer);
        sink.present(&buffer)
    }
}
