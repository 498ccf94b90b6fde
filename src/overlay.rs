//! Landmark overlay rendering.
//!
//! Draws the tracked face onto an RGBA canvas: every mesh point, both iris
//! contours, and the active eye's iris highlighted.

use image::{Pixel, Rgba, RgbaImage};

use crate::geometry::IrisLandmarkSet;
use crate::types::{FaceLandmarks, Laterality, Resolution};

pub const MESH_COLOR: Rgba<u8> = Rgba([0xC0, 0xC0, 0xC0, 0x70]);
pub const IRIS_COLOR: Rgba<u8> = Rgba([0xE0, 0xE0, 0xE0, 0xFF]);
pub const ACTIVE_IRIS_COLOR: Rgba<u8> = Rgba([0xFF, 0x30, 0x30, 0xFF]);
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0xFF]);

/// Render a face onto a fresh canvas.
///
/// Landmarks are normalized, so any canvas size works; pass a scaled-down
/// resolution for previews.
pub fn render_overlay(face: &FaceLandmarks, canvas: Resolution, active: Laterality) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    draw_face(&mut img, face, active);
    img
}

/// Draw a face onto an existing image of any size.
pub fn draw_face(img: &mut RgbaImage, face: &FaceLandmarks, active: Laterality) {
    let (w, h) = img.dimensions();
    let res = Resolution::new(w, h);

    for p in &face.points {
        let (x, y) = p.to_pixels(res);
        blend_pixel(img, x as i32, y as i32, MESH_COLOR);
    }

    for eye in [Laterality::Left, Laterality::Right] {
        let color = if eye == active {
            ACTIVE_IRIS_COLOR
        } else {
            IRIS_COLOR
        };
        draw_iris(img, face, IrisLandmarkSet::for_eye(eye), color);
    }
}

/// Draw the closed iris contour and its center. Missing landmarks are skipped.
pub fn draw_iris(img: &mut RgbaImage, face: &FaceLandmarks, set: IrisLandmarkSet, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    let res = Resolution::new(w, h);
    // Keep line endpoints within one canvas of the visible area.
    let (max_x, max_y) = (2.0 * w as f32, 2.0 * h as f32);
    let pixel = |idx: usize| {
        face.get(idx).map(|p| {
            let (x, y) = p.to_pixels(res);
            (
                x.clamp(-(w as f32), max_x).round() as i32,
                y.clamp(-(h as f32), max_y).round() as i32,
            )
        })
    };

    let contour = set.contour();
    for i in 0..contour.len() {
        let next = contour[(i + 1) % contour.len()];
        if let (Some(a), Some(b)) = (pixel(contour[i]), pixel(next)) {
            draw_line(img, a, b, color);
        }
    }
    if let Some((cx, cy)) = pixel(set.center) {
        draw_circle(img, cx, cy, 1, color);
    }
}

fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    let (img_w, img_h) = img.dimensions();
    if x < 0 || y < 0 || x as u32 >= img_w || y as u32 >= img_h {
        return;
    }
    if color[3] == u8::MAX {
        img.put_pixel(x as u32, y as u32, color);
    } else {
        img.get_pixel_mut(x as u32, y as u32).blend(&color);
    }
}

fn draw_circle(img: &mut RgbaImage, cx: i32, cy: i32, radius: i32, color: Rgba<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                blend_pixel(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn draw_line(img: &mut RgbaImage, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: Rgba<u8>) {
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        blend_pixel(img, x, y, color);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::IRIS_MESH_LANDMARKS;
    use crate::types::Point;

    fn face() -> FaceLandmarks {
        let mut points = vec![Point::new(0.05, 0.05); IRIS_MESH_LANDMARKS];
        for (set, cx) in [(IrisLandmarkSet::LEFT, 0.7), (IrisLandmarkSet::RIGHT, 0.3)] {
            points[set.center] = Point::new(cx, 0.5);
            points[set.lateral] = Point::new(cx + 0.1, 0.5);
            points[set.medial] = Point::new(cx - 0.1, 0.5);
            points[set.superior] = Point::new(cx, 0.4);
            points[set.inferior] = Point::new(cx, 0.6);
        }
        FaceLandmarks::new(points)
    }

    #[test]
    fn active_eye_is_highlighted() {
        let img = render_overlay(&face(), Resolution::new(100, 100), Laterality::Left);
        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(*img.get_pixel(70, 50), ACTIVE_IRIS_COLOR);
        assert_eq!(*img.get_pixel(30, 50), IRIS_COLOR);

        let img = render_overlay(&face(), Resolution::new(100, 100), Laterality::Right);
        assert_eq!(*img.get_pixel(30, 50), ACTIVE_IRIS_COLOR);
    }

    #[test]
    fn mesh_points_are_blended() {
        let img = render_overlay(&face(), Resolution::new(100, 100), Laterality::Left);
        let p = img.get_pixel(5, 5);
        assert!(p[0] > 0 && p[0] <= 0xC0, "mesh pixel {p:?}");
        assert_eq!(*img.get_pixel(99, 0), BACKGROUND);
    }

    #[test]
    fn out_of_frame_iris_points_are_clamped() {
        let mut face = face();
        face.points[IrisLandmarkSet::LEFT.lateral] = Point::new(1e10, 0.5);
        face.points[IrisLandmarkSet::LEFT.superior] = Point::new(-1e10, 0.5);
        face.points[IrisLandmarkSet::LEFT.medial] = Point::new(f32::NAN, f32::INFINITY);

        let img = render_overlay(&face, Resolution::new(64, 64), Laterality::Left);
        assert_eq!(img.dimensions(), (64, 64));
        // the clamped contour still crosses the frame
        assert!(img.pixels().any(|p| *p == ACTIVE_IRIS_COLOR));
    }

    #[test]
    fn short_mesh_draws_without_iris() {
        let mesh = FaceLandmarks::new(vec![Point::new(0.5, 0.5); 10]);
        let img = render_overlay(&mesh, Resolution::new(20, 20), Laterality::Left);
        assert_ne!(*img.get_pixel(10, 10), BACKGROUND);
    }
}
