use std::path::PathBuf;

use image::{DynamicImage, GrayImage, Luma, Rgb};
use manga_page_core::pipeline::select_evenly;
use manga_page_core::{
    FrameOutcome, InputFrame, MangaError, PageConfig, Style, VerdictKind, page_output_to_json,
    synthesize_page, synthesize_page_from_paths, synthesize_page_from_paths_with,
};

fn sharp(seed: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(64, 48, move |x, y| {
        if (x + y + seed) % 2 == 0 { Luma([250]) } else { Luma([20]) }
    }))
}

fn frame(key: &str, image: DynamicImage) -> InputFrame {
    InputFrame {
        key: key.to_string(),
        image,
    }
}

fn small_page() -> PageConfig {
    PageConfig::builder()
        .with_page_dimensions(300, 420)
        .seed(Some(42))
        .style(Style::EdgePreserve)
        .build()
}

fn batch() -> Vec<InputFrame> {
    vec![
        frame("f0", sharp(0)),
        frame("dark", DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 48, Luma([5])))),
        frame("f1", sharp(1)),
        frame("flat", DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 48, Luma([180])))),
        frame("f2", sharp(0)),
    ]
}

#[test]
fn rejected_frames_are_reported_not_placed() {
    let out = synthesize_page(batch(), &small_page()).expect("page");
    assert_eq!(out.page.dimensions(), (300, 420));
    assert_eq!(out.placed, vec!["f0", "f1", "f2"]);
    assert_eq!(out.panels.len(), 3);
    assert_eq!(out.reports.len(), 5);

    let kinds: Vec<_> = out
        .reports
        .iter()
        .map(|r| match &r.outcome {
            FrameOutcome::Accepted(v) | FrameOutcome::Rejected(v) => v.kind,
            FrameOutcome::Failed { .. } => panic!("no load failures expected"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            VerdictKind::Clear,
            VerdictKind::TooDark,
            VerdictKind::Clear,
            VerdictKind::TooBlurry,
            VerdictKind::Clear
        ]
    );
    let placed: Vec<bool> = out.reports.iter().map(|r| r.placed).collect();
    assert_eq!(placed, vec![true, false, true, false, true]);
}

#[test]
fn layout_matches_standalone_generation() {
    let cfg = small_page();
    let out = synthesize_page(batch(), &cfg).expect("page");
    let direct = manga_page_core::generate_layout(300, 420, 3, Some(42), 0.1, 10, 0.3).expect("layout");
    assert_eq!(out.panels, direct);
    // background shows through the margins
    assert_eq!(out.page.get_pixel(0, 0), &Rgb([255, 255, 255]));
    let stats = out.stats();
    assert_eq!(stats.num_panels, 3);
    assert!(stats.coverage < 1.0 && stats.coverage > 0.5);
}

#[test]
fn max_panels_samples_evenly() {
    let mut cfg = small_page();
    cfg.max_panels = Some(2);
    let out = synthesize_page(batch(), &cfg).expect("page");
    assert_eq!(out.placed, vec!["f0", "f1"]);
    assert_eq!(out.panels.len(), 2);
    assert_eq!(out.reports.iter().filter(|r| r.placed).count(), 2);

    assert_eq!(select_evenly(10, Some(3)), vec![0, 3, 6]);
    assert_eq!(select_evenly(4, Some(9)), vec![0, 1, 2, 3]);
    assert_eq!(select_evenly(5, None), vec![0, 1, 2, 3, 4]);
}

#[test]
fn no_usable_frames_is_empty() {
    let frames = vec![frame(
        "dark",
        DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([0]))),
    )];
    match synthesize_page(frames, &small_page()) {
        Err(MangaError::Empty { reports }) => assert_eq!(reports.len(), 1),
        other => panic!("expected Empty, got {:?}", other.err()),
    }
    match synthesize_page(Vec::new(), &small_page()) {
        Err(MangaError::Empty { reports }) => assert!(reports.is_empty()),
        other => panic!("expected Empty, got {:?}", other.err()),
    }
}

#[test]
fn all_rejected_batch_keeps_every_reason() {
    let frames = vec![
        frame("dark", DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([3])))),
        frame("flat", DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([200])))),
    ];
    let reports = match synthesize_page(frames, &small_page()) {
        Err(MangaError::Empty { reports }) => reports,
        other => panic!("expected Empty, got {:?}", other.err()),
    };
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].key, "dark");
    assert_eq!(reports[1].key, "flat");
    assert!(reports.iter().all(|r| !r.placed));
    match (&reports[0].outcome, &reports[1].outcome) {
        (FrameOutcome::Rejected(a), FrameOutcome::Rejected(b)) => {
            assert_eq!(a.kind, VerdictKind::TooDark);
            assert!(a.reason.starts_with("too dark"), "{}", a.reason);
            assert_eq!(b.kind, VerdictKind::TooBlurry);
            assert!(b.reason.starts_with("too blurry"), "{}", b.reason);
        }
        other => panic!("expected two rejections, got {other:?}"),
    }
}

#[test]
fn all_rejected_paths_keep_load_failures_and_progress() {
    let dir = std::env::temp_dir().join(format!("manga_page_rejected_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    let dark = dir.join("dark.png");
    DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([0])))
        .save(&dark)
        .expect("save");
    let paths: Vec<PathBuf> = vec![dark.clone(), dir.join("missing.png")];

    let mut seen = Vec::new();
    let res = synthesize_page_from_paths_with(&paths, &small_page(), |p| seen.push(p.to_path_buf()));
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(seen, paths);
    let reports = match res {
        Err(MangaError::Empty { reports }) => reports,
        other => panic!("expected Empty, got {:?}", other.err()),
    };
    assert_eq!(reports.len(), 2);
    assert!(matches!(&reports[0].outcome, FrameOutcome::Rejected(v) if v.kind == VerdictKind::TooDark));
    assert!(matches!(&reports[1].outcome, FrameOutcome::Failed { .. }));
}

#[test]
fn invalid_config_is_rejected_before_work() {
    let mut cfg = small_page();
    cfg.max_panels = Some(0);
    assert!(matches!(synthesize_page(batch(), &cfg), Err(MangaError::InvalidConfig(_))));
}

#[test]
fn failed_loads_are_appended_to_reports() {
    let dir = std::env::temp_dir().join(format!("manga_page_pipeline_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    let good = dir.join("good.png");
    sharp(0).save(&good).expect("save");
    let missing = dir.join("missing.png");
    let paths: Vec<PathBuf> = vec![missing.clone(), good.clone()];

    let out = synthesize_page_from_paths(&paths, &small_page()).expect("page");
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(out.placed.len(), 1);
    assert_eq!(out.reports.len(), 2);
    assert!(out.reports[0].placed);
    match &out.reports[1].outcome {
        FrameOutcome::Failed { error } => assert!(error.contains("missing.png"), "{error}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn json_report_describes_page() {
    let out = synthesize_page(batch(), &small_page()).expect("page");
    let v = page_output_to_json(&out);
    assert_eq!(v["page"]["w"], 300);
    assert_eq!(v["page"]["h"], 420);
    let panels = v["panels"].as_array().expect("panels");
    assert_eq!(panels.len(), 3);
    assert_eq!(panels[0]["index"], 0);
    assert_eq!(panels[1]["frame"], "f1");
    let frames = v["frames"].as_array().expect("frames");
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[1]["outcome"]["status"], "rejected");
    assert_eq!(frames[1]["outcome"]["kind"], "too_dark");
    assert_eq!(v["stats"]["num_panels"], 3);
}
