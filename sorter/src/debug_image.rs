//! Annotated images for checking detections by eye.

use std::io;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use vision::{DetectionResult, Frame, OrderedCorners, Point2D};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTROID_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TRAY_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Draw the bounding box and centroid on a rectified frame.
pub fn annotate_detection(frame: &Frame, detection: &DetectionResult) -> RgbImage {
    let mut image = frame.to_rgb_image();
    if let Some(bbox) = &detection.bounding_box {
        let rect = Rect::at(bbox.x_min as i32, bbox.y_min as i32)
            .of_size(bbox.width.max(1) as u32, bbox.height.max(1) as u32);
        draw_hollow_rect_mut(&mut image, rect, BOX_COLOR);
    }
    if let Some(centroid) = detection.centroid_rectified {
        mark(&mut image, centroid);
    }
    image
}

/// Outline the tray on a full camera frame and mark the mapped centroid.
pub fn annotate_tray(
    frame: &Frame,
    corners: &OrderedCorners,
    detection: Option<&DetectionResult>,
) -> RgbImage {
    let mut image = frame.to_rgb_image();
    let points = corners.as_array();
    for (i, start) in points.iter().enumerate() {
        let end = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            &mut image,
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
            TRAY_COLOR,
        );
    }
    if let Some(centroid) = detection.and_then(|d| d.centroid_full_frame) {
        mark(&mut image, centroid);
    }
    image
}

fn mark(image: &mut RgbImage, at: Point2D) {
    let (x, y) = (at.x.round() as i32, at.y.round() as i32);
    // Thicken the cross so it survives JPEG previews
    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (-1, 0), (0, -1)] {
        draw_cross_mut(image, CENTROID_COLOR, x + dx, y + dy);
    }
}

/// Write `image` as `dir/name`, creating `dir` if needed.
pub fn save(dir: &Path, name: &str, image: &RgbImage) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    image.save(&path).map_err(io::Error::other)?;
    Ok(path)
}
