use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use manga_page_core::quality::{brightness_score, luminance, sharpness_score};
use manga_page_core::{MangaError, QualityConfig, QualityGate, VerdictKind, check};

fn checkerboard(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, y| {
        if (x + y) % 2 == 0 { Luma([255]) } else { Luma([0]) }
    }))
}

fn flat(w: u32, h: u32, v: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([v])))
}

#[test]
fn sharp_bright_frame_is_clear() {
    let v = check(&checkerboard(64, 64), 100.0, 50.0);
    assert!(v.is_usable);
    assert_eq!(v.kind, VerdictKind::Clear);
    assert!(v.reason.starts_with("clear"), "{}", v.reason);
    assert!(v.sharpness > 100.0);
    assert!((v.brightness - 127.5).abs() < 1e-9);
}

#[test]
fn all_black_frame_is_too_dark() {
    let v = check(&flat(32, 32, 0), 100.0, 50.0);
    assert!(!v.is_usable);
    assert_eq!(v.kind, VerdictKind::TooDark);
    assert!(v.reason.starts_with("too dark"), "{}", v.reason);
}

#[test]
fn flat_bright_frame_is_too_blurry() {
    let v = check(&flat(32, 32, 200), 100.0, 50.0);
    assert!(!v.is_usable);
    assert_eq!(v.kind, VerdictKind::TooBlurry);
    assert!(v.reason.starts_with("too blurry"), "{}", v.reason);
    assert_eq!(v.sharpness, 0.0);
}

#[test]
fn scores_exactly_at_threshold_pass() {
    let img = checkerboard(40, 24);
    let s = sharpness_score(&img.to_luma8());
    assert!(check(&img, s, 0.0).is_usable);
    assert!(!check(&img, s * (1.0 + 1e-9) + 1e-9, 0.0).is_usable);

    let gray = flat(16, 16, 50);
    assert_eq!(brightness_score(&gray.to_luma8()), 50.0);
    assert!(check(&gray, 0.0, 50.0).is_usable);
    let dark = check(&gray, 0.0, 50.5);
    assert_eq!(dark.kind, VerdictKind::TooDark);
}

#[test]
fn darkness_is_reported_before_blur() {
    // dark and flat: both checks fail, darkness wins
    let v = check(&flat(16, 16, 10), 100.0, 50.0);
    assert_eq!(v.kind, VerdictKind::TooDark);
}

#[test]
fn gate_uses_default_thresholds() {
    let gate = QualityGate::default();
    assert_eq!(gate.config(), &QualityConfig::default());
    assert_eq!(gate.config().blur_threshold, 100.0);
    assert_eq!(gate.config().brightness_threshold, 50.0);
    assert!(gate.check(&checkerboard(32, 32)).is_usable);
}

#[test]
fn unreadable_path_is_a_load_error() {
    let gate = QualityGate::default();
    let missing = std::env::temp_dir().join("manga_page_no_such_frame.png");
    match gate.check_path(&missing) {
        Err(MangaError::Load { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected Load error, got {other:?}"),
    }

    let garbage = std::env::temp_dir().join(format!("manga_page_garbage_{}.png", std::process::id()));
    std::fs::write(&garbage, b"definitely not a png").expect("write garbage");
    let res = gate.check_path(&garbage);
    let _ = std::fs::remove_file(&garbage);
    assert!(matches!(res, Err(MangaError::Load { .. })));
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let gate = QualityGate::default();
    assert!(matches!(
        gate.check_bytes(b"\x00\x01\x02 nope"),
        Err(MangaError::Decode(_))
    ));
}

#[test]
fn encoded_bytes_are_screened() {
    let mut buf = std::io::Cursor::new(Vec::new());
    checkerboard(32, 32)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode");
    let v = QualityGate::default()
        .check_bytes(buf.get_ref())
        .expect("decode");
    assert!(v.is_usable);
}

#[test]
fn luminance_uses_bt601_weights() {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 1, |x, _| match x {
        0 => Rgb([255, 0, 0]),
        1 => Rgb([0, 255, 0]),
        2 => Rgb([0, 0, 255]),
        _ => Rgb([90, 90, 90]),
    }));
    let gray = luminance(&img);
    let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
    assert_eq!(values, vec![76, 150, 29, 90]);
}

#[test]
fn pure_blue_frame_is_dark_under_default_thresholds() {
    // BT.601 puts saturated blue near 29, well under the 50 default
    let blue = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([0, 0, 255])));
    let v = QualityGate::default().check(&blue);
    assert_eq!(v.kind, VerdictKind::TooDark);
    assert_eq!(v.brightness, 29.0);
}
