//! Terminal image preview widget.
//!
//! Renders an image into the panel using half-block cells: each terminal
//! cell carries two vertically stacked pixels, the upper one as the
//! foreground color of `▀` and the lower one as the background color.
//! The image is sampled nearest-neighbor down (or up) to the letterboxed
//! panel size on every frame; the fitted image itself is never modified.

use image::{DynamicImage, GenericImageView};
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

const UPPER_HALF_BLOCK: &str = "▀";

pub struct ImagePreview<'a> {
    image: &'a DynamicImage,
}

impl<'a> ImagePreview<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        Self { image }
    }
}

/// Mapping from the panel's pixel grid to the source image, letterboxed
/// and centered.
struct SampleGrid {
    x_offset: u32,
    y_offset: u32,
    out_width: u32,
    out_height: u32,
    img_width: u32,
    img_height: u32,
}

impl SampleGrid {
    fn new(img_width: u32, img_height: u32, px_width: u32, px_height: u32) -> Self {
        let scale = f64::min(
            f64::from(px_width) / f64::from(img_width),
            f64::from(px_height) / f64::from(img_height),
        );
        let out_width = ((f64::from(img_width) * scale).round() as u32)
            .clamp(1, px_width);
        let out_height = ((f64::from(img_height) * scale).round() as u32)
            .clamp(1, px_height);
        Self {
            x_offset: (px_width - out_width) / 2,
            y_offset: (px_height - out_height) / 2,
            out_width,
            out_height,
            img_width,
            img_height,
        }
    }

    /// Source pixel for a panel pixel, or `None` in the letterbox bars.
    fn source_at(&self, px: u32, py: u32) -> Option<(u32, u32)> {
        if px < self.x_offset || py < self.y_offset {
            return None;
        }
        let ox = px - self.x_offset;
        let oy = py - self.y_offset;
        if ox >= self.out_width || oy >= self.out_height {
            return None;
        }
        let ix = (u64::from(ox) * u64::from(self.img_width) / u64::from(self.out_width)) as u32;
        let iy = (u64::from(oy) * u64::from(self.img_height) / u64::from(self.out_height)) as u32;
        Some((ix.min(self.img_width - 1), iy.min(self.img_height - 1)))
    }
}

impl Widget for ImagePreview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let (img_width, img_height) = self.image.dimensions();
        if img_width == 0 || img_height == 0 {
            return;
        }

        // Two pixels per cell vertically
        let grid = SampleGrid::new(
            img_width,
            img_height,
            u32::from(area.width),
            u32::from(area.height) * 2,
        );

        for cell_y in 0..area.height {
            for cell_x in 0..area.width {
                let px = u32::from(cell_x);
                let py = u32::from(cell_y) * 2;

                let upper = grid
                    .source_at(px, py)
                    .map(|(x, y)| pixel_color(self.image, x, y));
                let lower = grid
                    .source_at(px, py + 1)
                    .map(|(x, y)| pixel_color(self.image, x, y));

                if upper.is_none() && lower.is_none() {
                    continue;
                }

                let cell = &mut buf[(area.x + cell_x, area.y + cell_y)];
                cell.set_symbol(UPPER_HALF_BLOCK);
                if let Some(color) = upper {
                    cell.set_fg(color);
                }
                if let Some(color) = lower {
                    cell.set_bg(color);
                }
            }
        }
    }
}

fn pixel_color(image: &DynamicImage, x: u32, y: u32) -> Color {
    let pixel = image.get_pixel(x, y);
    Color::Rgb(pixel[0], pixel[1], pixel[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_centers_wide_image() {
        // 100x10 image into a 50x50 pixel grid: width-bound, 50x5 output
        let grid = SampleGrid::new(100, 10, 50, 50);
        assert_eq!(grid.out_width, 50);
        assert_eq!(grid.out_height, 5);
        assert_eq!(grid.x_offset, 0);
        assert_eq!(grid.y_offset, 22);
    }

    #[test]
    fn test_grid_letterbox_bars_are_empty() {
        let grid = SampleGrid::new(100, 10, 50, 50);
        assert_eq!(grid.source_at(0, 0), None);
        assert_eq!(grid.source_at(0, 21), None);
        assert!(grid.source_at(0, 22).is_some());
        assert!(grid.source_at(49, 26).is_some());
        assert_eq!(grid.source_at(0, 27), None);
    }

    #[test]
    fn test_grid_samples_full_source_range() {
        let grid = SampleGrid::new(100, 10, 50, 50);
        assert_eq!(grid.source_at(0, 22), Some((0, 0)));
        let (x, y) = grid.source_at(49, 26).unwrap();
        assert_eq!(y, 8);
        assert_eq!(x, 98);
    }

    #[test]
    fn test_tiny_image_never_collapses() {
        let grid = SampleGrid::new(1, 1, 80, 48);
        assert!(grid.out_width >= 1);
        assert!(grid.out_height >= 1);
        assert!(grid.source_at(grid.x_offset, grid.y_offset).is_some());
    }
}
