//! End-to-end tests: Markdown in, HTML and image files out.
//!
//! Drives the real `ImageGenerator` through the integration entry point with
//! synthetic images in a temporary `public/` directory.

use image::{ImageEncoder, RgbImage};
use remark_images::config::{GeneratorOverrides, Options, Width};
use remark_images::document::Node;
use remark_images::integration::{BuildCommand, Integration, render_document};
use remark_images::pipeline::{SitePaths, SkipReason};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let writer = std::io::BufWriter::new(fs::File::create(path).unwrap());
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

struct Site {
    _tmp: TempDir,
    paths: SitePaths,
}

fn site_with_image(relative: &str, width: u32, height: u32) -> Site {
    let tmp = TempDir::new().unwrap();
    let paths = SitePaths::new(tmp.path().join("public"), tmp.path().join("dist"));
    write_jpeg(&paths.public_dir.join(relative), width, height);
    Site { _tmp: tmp, paths }
}

fn small_widths() -> Options {
    Options {
        generator: Some(GeneratorOverrides {
            widths: Some(vec![Width::Pixels(100), Width::Pixels(200)]),
            ..GeneratorOverrides::default()
        }),
        ..Options::default()
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn local_image_becomes_picture_with_files_on_disk() {
    let site = site_with_image("images/cat.jpg", 300, 150);
    let pipeline = Integration::new(small_widths())
        .setup(BuildCommand::Build, site.paths.clone())
        .unwrap();

    let doc = render_document(
        &pipeline,
        "# Cats\n\n![a cat](/images/cat.jpg)\n",
        Path::new("src/posts/cats.md"),
    );

    assert_eq!(doc.report.rendered_count(), 1);
    assert!(doc.html.starts_with("<h1>Cats</h1>"));
    assert_eq!(doc.html.matches("<source").count(), 1);
    assert!(doc.html.contains(r#"type="image/jpeg""#));
    assert!(doc.html.contains(
        "/images/cat-100.jpeg 100w, /images/cat-200.jpeg 200w, /images/cat-300.jpeg 300w"
    ));
    assert!(doc.html.contains(r#"src="/images/cat-300.jpeg""#));
    assert!(doc.html.contains(r#"width="300""#));
    assert!(doc.html.contains(r#"height="150""#));
    assert!(doc.html.contains(r#"alt="a cat""#));
    assert!(doc.html.contains(r#"loading="lazy""#));
    assert!(doc.html.contains(r#"decoding="async""#));

    assert_eq!(
        file_names(&site.paths.out_dir.join("images")),
        vec!["cat-100.jpeg", "cat-200.jpeg", "cat-300.jpeg"]
    );
}

#[test]
fn multiple_formats_emit_one_source_each() {
    let site = site_with_image("dog.jpg", 120, 80);
    let options = Options {
        generator: Some(GeneratorOverrides {
            widths: Some(vec![Width::Native]),
            formats: Some(vec!["webp".into(), "jpeg".into()]),
            ..GeneratorOverrides::default()
        }),
        ..Options::default()
    };
    let pipeline = Integration::new(options)
        .setup(BuildCommand::Build, site.paths.clone())
        .unwrap();

    let doc = render_document(&pipeline, "![good dog](dog.jpg)", Path::new("dogs.md"));

    assert_eq!(doc.html.matches("<source").count(), 2);
    let webp = doc.html.find("image/webp").unwrap();
    let jpeg = doc.html.find("image/jpeg").unwrap();
    assert!(webp < jpeg, "sources follow the configured format order");
    assert!(doc.html.contains(r#"src="dog-120.jpeg""#));
    assert!(site.paths.out_dir.join("dog-120.webp").exists());
}

#[test]
fn rebuilding_overwrites_the_same_files() {
    let site = site_with_image("images/cat.jpg", 300, 150);
    let source = "![a cat](/images/cat.jpg)";

    let first = {
        let pipeline = Integration::new(small_widths())
            .setup(BuildCommand::Build, site.paths.clone())
            .unwrap();
        render_document(&pipeline, source, Path::new("a.md")).html
    };
    let second = {
        let pipeline = Integration::new(small_widths())
            .setup(BuildCommand::Build, site.paths.clone())
            .unwrap();
        render_document(&pipeline, source, Path::new("a.md")).html
    };

    assert_eq!(first, second);
    assert_eq!(file_names(&site.paths.out_dir.join("images")).len(), 3);
}

#[test]
fn cached_copies_keep_their_own_filenames() {
    let site = site_with_image("a.jpg", 80, 60);
    fs::copy(
        site.paths.public_dir.join("a.jpg"),
        site.paths.public_dir.join("b.jpg"),
    )
    .unwrap();
    let options = Options {
        generator: Some(GeneratorOverrides {
            widths: Some(vec![Width::Native]),
            cache_enabled: Some(true),
            ..GeneratorOverrides::default()
        }),
        ..Options::default()
    };
    let pipeline = Integration::new(options)
        .setup(BuildCommand::Build, site.paths.clone())
        .unwrap();

    let first = render_document(&pipeline, "![a](a.jpg)", Path::new("one.md"));
    let second = render_document(&pipeline, "![b](b.jpg)", Path::new("two.md"));

    assert!(first.html.contains(r#"src="a-80.jpeg""#));
    assert!(second.html.contains(r#"src="b-80.jpeg""#));
    assert_eq!(
        file_names(&site.paths.out_dir),
        vec!["a-80.jpeg", "b-80.jpeg"]
    );
}

#[test]
fn animated_gif_stays_gif() {
    let tmp = TempDir::new().unwrap();
    let paths = SitePaths::new(tmp.path().join("public"), tmp.path().join("dist"));
    fs::create_dir_all(&paths.public_dir).unwrap();
    {
        use image::codecs::gif::{GifEncoder, Repeat};
        use image::{Delay, Frame, RgbaImage};
        let file = fs::File::create(paths.public_dir.join("loader.gif")).unwrap();
        let mut encoder = GifEncoder::new_with_speed(file, 30);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        encoder
            .encode_frames((0..2u8).map(|i| {
                let buffer = RgbaImage::from_pixel(40, 20, image::Rgba([i * 200, 0, 0, 255]));
                Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(50, 1))
            }))
            .unwrap();
    }
    let pipeline = Integration::new(small_widths())
        .setup(BuildCommand::Build, paths.clone())
        .unwrap();

    let doc = render_document(&pipeline, "![loading](loader.gif)", Path::new("gif.md"));

    assert_eq!(doc.report.rendered_count(), 1);
    assert!(doc.html.contains(r#"type="image/gif""#));
    assert!(doc.html.contains(r#"src="loader-40.gif""#));
    assert!(paths.out_dir.join("loader-40.gif").exists());
}

#[test]
fn failures_and_skips_leave_the_rest_of_the_document_intact() {
    let site = site_with_image("ok.jpg", 64, 64);
    fs::write(site.paths.public_dir.join("broken.jpg"), "not an image").unwrap();
    let pipeline = Integration::default()
        .setup(BuildCommand::Build, site.paths.clone())
        .unwrap();

    let doc = render_document(
        &pipeline,
        "![one](ok.jpg)\n\n![two](broken.jpg)\n\n![](ok.jpg)\n\n![four](missing.jpg)\n",
        Path::new("mixed.md"),
    );

    assert_eq!(doc.report.rendered_count(), 1);
    assert_eq!(doc.report.failed_count(), 2);
    assert_eq!(doc.report.skipped_count(SkipReason::MissingAlt), 1);
    assert_eq!(doc.html.matches("<picture>").count(), 1);
    assert!(doc.html.contains(r#"<img src="broken.jpg" alt="two">"#));
    assert!(doc.html.contains(r#"<img src="missing.jpg" alt="four">"#));
}

#[test]
fn remote_images_are_left_alone_by_default() {
    let site = site_with_image("unused.jpg", 10, 10);
    let pipeline = Integration::default()
        .setup(BuildCommand::Build, site.paths.clone())
        .unwrap();

    let doc = render_document(
        &pipeline,
        "![remote](https://example.com/a.jpg)",
        Path::new("remote.md"),
    );

    assert_eq!(doc.report.skipped_count(SkipReason::RemoteDisabled), 1);
    assert!(
        doc.html
            .contains(r#"<img src="https://example.com/a.jpg" alt="remote">"#)
    );
    assert!(!site.paths.out_dir.exists());
}

#[test]
fn transform_works_on_deserialized_mdast() {
    let site = site_with_image("cat.jpg", 50, 40);
    let pipeline = Integration::new(Options::from_json_str(r#"{"altRequired": false}"#).unwrap())
        .setup(BuildCommand::Build, site.paths.clone())
        .unwrap();

    let mut tree: Node = serde_json::from_str(
        r#"{
            "type": "root",
            "children": [
                {"type": "paragraph", "children": [
                    {"type": "text", "value": "A cat: "},
                    {"type": "image", "url": "cat.jpg"}
                ]}
            ]
        }"#,
    )
    .unwrap();

    let report = pipeline.transform(&mut tree, Path::new("cat.md"));

    assert_eq!(report.rendered_count(), 1);
    match tree.node_at(&[0, 1]) {
        Some(Node::Html { value }) => {
            assert!(value.contains(r#"alt="""#));
            assert!(value.contains("cat-50.jpeg 50w"));
        }
        other => panic!("expected rewritten html node, found {other:?}"),
    }
}

#[test]
fn dev_builds_do_nothing() {
    let site = site_with_image("cat.jpg", 50, 40);
    assert!(
        Integration::default()
            .setup(BuildCommand::Dev, site.paths.clone())
            .is_none()
    );
}
