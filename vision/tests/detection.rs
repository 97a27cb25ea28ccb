//! End-to-end checks of rectification plus detection on synthetic frames.

use vision::{
    build_detector, DetectionError, DetectionStrategy, DetectorConfig, DifferenceDetector, Frame,
    ImageSize, ObjectDetector, Point2D, RectifyTransform, TrayCorners,
};

fn rig_transform() -> RectifyTransform {
    let corners = TrayCorners::new(&[
        Point2D::new(100.0, 50.0),
        Point2D::new(500.0, 60.0),
        Point2D::new(520.0, 420.0),
        Point2D::new(90.0, 400.0),
    ])
    .unwrap();
    RectifyTransform::from_corners(&corners).unwrap()
}

/// Textured full-frame tray so that differencing has something to cancel.
fn textured_scene(size: ImageSize) -> Frame {
    let mut frame = Frame::filled(size, [0, 0, 0]);
    for y in 0..size.height {
        for x in 0..size.width {
            let v = (60 + (x * 7 + y * 3) % 40) as u8;
            frame.set_pixel(x, y, [v, v + 5, v + 10]);
        }
    }
    frame
}

#[test]
fn reference_against_itself_finds_nothing() {
    let transform = rig_transform();
    let reference = transform.warp_frame(&textured_scene(ImageSize::from_width_height(640, 480)));

    for strategy in [DetectionStrategy::Difference, DetectionStrategy::ColorRange] {
        let config = DetectorConfig {
            strategy,
            threshold: 0,
            ..DetectorConfig::default()
        };
        let result = build_detector(&config, None).detect(&reference, &reference).unwrap();
        assert!(!result.found);
        assert_eq!(result.area, 0.0);
        assert_eq!(result.foreground_fraction, 0.0);
    }
}

#[test]
fn white_square_is_found_at_its_center() {
    let transform = rig_transform();
    let reference = transform.warp_frame(&textured_scene(ImageSize::from_width_height(640, 480)));

    // 40x40 square centred on rectified (100, 100)
    let mut live = reference.clone();
    live.fill_rect(80, 80, 40, 40, [255, 255, 255]);

    let config = DetectorConfig {
        min_area: 500.0,
        ..DetectorConfig::default()
    };
    let result = DifferenceDetector::new(config)
        .detect(&reference, &live)
        .unwrap()
        .with_full_frame(&transform);

    assert!(result.found);
    let centroid = result.centroid_rectified.unwrap();
    assert!(
        centroid.distance_to(&Point2D::new(100.0, 100.0)) < 3.0,
        "centroid {centroid}"
    );
    assert!(result.area >= 1600.0);
    let bbox = result.bounding_box.unwrap();
    assert!(bbox.x_min <= 80 && bbox.x_max() >= 120);

    let full = result.centroid_full_frame.unwrap();
    let back = transform.to_rectified(full);
    assert!(back.distance_to(&centroid) < 1e-3);
    // Tray is roughly 430x360 inside a 640x480 frame starting near (100, 50)
    assert!(full.x > 150.0 && full.x < 250.0, "full-frame {full}");
    assert!(full.y > 100.0 && full.y < 200.0, "full-frame {full}");
}

#[test]
fn raising_min_area_never_adds_detections() {
    let transform = rig_transform();
    let reference = transform.warp_frame(&textured_scene(ImageSize::from_width_height(640, 480)));
    let mut live = reference.clone();
    live.fill_rect(30, 30, 12, 12, [255, 255, 255]);
    live.fill_rect(200, 150, 25, 25, [255, 255, 255]);
    live.fill_rect(320, 40, 50, 30, [0, 0, 0]);

    let mut previous = true;
    for min_area in [0.0, 100.0, 400.0, 900.0, 1500.0, 2500.0, 4000.0, 10_000.0] {
        let config = DetectorConfig {
            min_area,
            ..DetectorConfig::default()
        };
        let found = DifferenceDetector::new(config)
            .detect(&reference, &live)
            .unwrap()
            .found;
        assert!(!found || previous, "detection reappeared at min_area {min_area}");
        previous = found;
    }
    assert!(!previous);
}

#[test]
fn mismatched_geometry_fails_fast() {
    let reference = Frame::filled(ImageSize::from_width_height(430, 360), [80, 80, 80]);
    let live = Frame::filled(ImageSize::from_width_height(640, 480), [80, 80, 80]);

    let err = DifferenceDetector::new(DetectorConfig::default())
        .detect(&reference, &live)
        .unwrap_err();
    assert_eq!(
        err,
        DetectionError::GeometryMismatch {
            reference: ImageSize::from_width_height(430, 360),
            live: ImageSize::from_width_height(640, 480),
        }
    );
}
