use image::{Rgb, RgbImage};

use crate::api::MaskRegion;

const STROKE_WIDTH: u32 = 3;
const STROKE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SCALE: u32 = 3;
const GLYPH_GAP: u32 = 1;

/// A mask region projected into pixel space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedMask {
    pub rect: PixelRect,
    pub label: String,
    /// Where the label is centered, in pixels.
    pub label_center: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Convert normalized mask regions into pixel rectangles for a frame of the
/// given dimensions. Degenerate boxes (zero or negative extent after
/// clamping) are dropped.
pub fn project_masks(regions: &[MaskRegion], width: u32, height: u32) -> Vec<PlacedMask> {
    regions
        .iter()
        .filter_map(|region| project_one(region, width, height))
        .collect()
}

fn project_one(region: &MaskRegion, width: u32, height: u32) -> Option<PlacedMask> {
    let [x_min, y_min, x_max, y_max] = region.bounds;
    let x_min = x_min.clamp(0.0, 1.0);
    let y_min = y_min.clamp(0.0, 1.0);
    let x_max = x_max.clamp(0.0, 1.0);
    let y_max = y_max.clamp(0.0, 1.0);
    if x_max <= x_min || y_max <= y_min {
        return None;
    }

    let x = (x_min * width as f32).round() as u32;
    let y = (y_min * height as f32).round() as u32;
    let w = ((x_max - x_min) * width as f32).round() as u32;
    let h = ((y_max - y_min) * height as f32).round() as u32;
    if w == 0 || h == 0 {
        return None;
    }

    Some(PlacedMask {
        label_center: (x + w / 2, y + h / 2),
        rect: PixelRect { x, y, width: w, height: h },
        label: region.label.clone(),
    })
}

/// Draw stroked rectangles and centered labels onto the frame. Mutates the
/// image buffer only.
pub fn draw_overlay(frame: &mut RgbImage, masks: &[PlacedMask]) {
    for mask in masks {
        stroke_rect(frame, &mask.rect);
        draw_label(frame, &mask.label, mask.label_center);
    }
}

fn stroke_rect(frame: &mut RgbImage, rect: &PixelRect) {
    let right = rect.x + rect.width;
    let bottom = rect.y + rect.height;

    for t in 0..STROKE_WIDTH.min(rect.height) {
        for x in rect.x..right {
            put(frame, x, rect.y + t);
            put(frame, x, bottom - 1 - t);
        }
    }
    for t in 0..STROKE_WIDTH.min(rect.width) {
        for y in rect.y..bottom {
            put(frame, rect.x + t, y);
            put(frame, right - 1 - t, y);
        }
    }
}

fn put(frame: &mut RgbImage, x: u32, y: u32) {
    if x < frame.width() && y < frame.height() {
        frame.put_pixel(x, y, STROKE_COLOR);
    }
}

/// Render the label centered at the given point using the embedded glyph
/// table. Characters without a glyph still advance the cursor so digit
/// spacing stays stable.
fn draw_label(frame: &mut RgbImage, label: &str, center: (u32, u32)) {
    let glyph_count = label.chars().count() as u32;
    if glyph_count == 0 {
        return;
    }

    let advance = (GLYPH_WIDTH + GLYPH_GAP) * GLYPH_SCALE;
    let total_width = glyph_count * advance - GLYPH_GAP * GLYPH_SCALE;
    let total_height = GLYPH_HEIGHT * GLYPH_SCALE;

    let mut cursor_x = center.0.saturating_sub(total_width / 2);
    let origin_y = center.1.saturating_sub(total_height / 2);

    for c in label.chars() {
        if let Some(rows) = glyph_rows(c) {
            draw_glyph(frame, &rows, cursor_x, origin_y);
        }
        cursor_x += advance;
    }
}

fn draw_glyph(frame: &mut RgbImage, rows: &[u8; 7], origin_x: u32, origin_y: u32) {
    for (row_index, row) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if (u32::from(*row) >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                continue;
            }
            let base_x = origin_x + col * GLYPH_SCALE;
            let base_y = origin_y + row_index as u32 * GLYPH_SCALE;
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    put(frame, base_x + dx, base_y + dy);
                }
            }
        }
    }
}

/// 5x7 bitmaps for the day-number digits.
fn glyph_rows(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(bounds: [f32; 4], label: &str) -> MaskRegion {
        serde_json::from_value(serde_json::json!({ "box": bounds, "day": label })).unwrap()
    }

    #[test]
    fn projects_normalized_box_to_pixel_rect() {
        let regions = vec![region([0.1, 0.1, 0.5, 0.5], "1")];
        let placed = project_masks(&regions, 1000, 1000);

        assert_eq!(placed.len(), 1);
        assert_eq!(
            placed[0].rect,
            PixelRect { x: 100, y: 100, width: 400, height: 400 }
        );
        assert_eq!(placed[0].label, "1");
        assert_eq!(placed[0].label_center, (300, 300));
    }

    #[test]
    fn drops_degenerate_boxes() {
        let regions = vec![
            region([0.5, 0.5, 0.5, 0.9], "2"),
            region([0.8, 0.2, 0.4, 0.6], "3"),
        ];
        assert!(project_masks(&regions, 640, 480).is_empty());
    }

    #[test]
    fn clamps_out_of_range_coordinates() {
        let regions = vec![region([-0.5, -0.5, 1.5, 1.5], "4")];
        let placed = project_masks(&regions, 200, 100);

        assert_eq!(placed[0].rect, PixelRect { x: 0, y: 0, width: 200, height: 100 });
    }

    #[test]
    fn stroke_paints_border_not_interior() {
        let mut frame = RgbImage::new(50, 50);
        let placed = PlacedMask {
            rect: PixelRect { x: 10, y: 10, width: 20, height: 20 },
            label: String::new(),
            label_center: (20, 20),
        };
        draw_overlay(&mut frame, &[placed]);

        assert_eq!(*frame.get_pixel(10, 10), Rgb([255, 0, 0]));
        assert_eq!(*frame.get_pixel(12, 20), Rgb([255, 0, 0])); // inner edge of stroke
        assert_eq!(*frame.get_pixel(29, 29), Rgb([255, 0, 0]));
        assert_eq!(*frame.get_pixel(20, 20), Rgb([0, 0, 0])); // interior untouched
        assert_eq!(*frame.get_pixel(5, 5), Rgb([0, 0, 0])); // outside untouched
    }

    #[test]
    fn label_paints_near_its_center() {
        let mut frame = RgbImage::new(200, 200);
        let placed = PlacedMask {
            rect: PixelRect { x: 0, y: 0, width: 200, height: 200 },
            label: "8".into(),
            label_center: (100, 100),
        };
        draw_overlay(&mut frame, &[placed]);

        let painted_near_center = (90..110)
            .flat_map(|x| (90..110).map(move |y| (x, y)))
            .any(|(x, y)| *frame.get_pixel(x, y) == Rgb([255, 0, 0]));
        assert!(painted_near_center);
    }

    #[test]
    fn drawing_out_of_bounds_is_clipped() {
        let mut frame = RgbImage::new(30, 30);
        let placed = PlacedMask {
            rect: PixelRect { x: 20, y: 20, width: 40, height: 40 },
            label: "12".into(),
            label_center: (40, 40),
        };
        // Must not panic even though the rect extends past the frame.
        draw_overlay(&mut frame, &[placed]);
        assert_eq!(*frame.get_pixel(20, 25), Rgb([255, 0, 0]));
    }
}
