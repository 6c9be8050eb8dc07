use std::path::{Path, PathBuf};

use scenegen::{AssetStore, ComposerConfig, Compositor};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "scenegen_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &Path, img: image::DynamicImage) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

fn seed_asset_tree(root: &Path) {
    let bg = image::RgbImage::from_fn(64, 48, |x, y| {
        image::Rgb([(x * 3) as u8, 120, (y * 4) as u8])
    });
    write_png(
        &root.join("Backgrounds").join("bg.png"),
        image::DynamicImage::ImageRgb8(bg),
    );

    for (class, shade) in [("Ball", 200u8), ("Cup", 90u8)] {
        let fg = image::RgbaImage::from_pixel(40, 30, image::Rgba([shade, 30, 30, 255]));
        write_png(
            &root.join("EFObjects").join(class).join("1.png"),
            image::DynamicImage::ImageRgba8(fg),
        );
        let mask = image::GrayImage::from_pixel(40, 30, image::Luma([255]));
        write_png(
            &root.join("Mask").join(class).join("1.png"),
            image::DynamicImage::ImageLuma8(mask),
        );
    }
}

fn run_batch(assets: &Path, out: &Path) {
    let cfg = ComposerConfig {
        resolution: (160, 120),
        classes_to_include: vec!["Ball".to_string(), "Cup".to_string()],
        num_scenes: 2,
        max_objects: 3,
        output_dir: out.to_path_buf(),
        asset_dir: assets.to_path_buf(),
        seed: Some(1234),
    };
    let store = AssetStore::open(assets).unwrap();
    let compositor = Compositor::new(cfg, store).unwrap();
    let report = compositor.run().unwrap();
    assert_eq!(report.scenes_written, 2);
    assert_eq!(report.scenes_failed, 0);
}

fn collect_files(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned();
                out.push((rel, std::fs::read(&path).unwrap()));
            }
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[test]
fn fixed_seed_reproduces_every_output_byte_for_byte() {
    let root = temp_dir("determinism");
    let assets = root.join("Data");
    seed_asset_tree(&assets);

    let out_a = root.join("OutputA");
    let out_b = root.join("OutputB");
    run_batch(&assets, &out_a);
    run_batch(&assets, &out_b);

    let files_a = collect_files(&out_a);
    let files_b = collect_files(&out_b);

    let names_a: Vec<&String> = files_a.iter().map(|(n, _)| n).collect();
    let names_b: Vec<&String> = files_b.iter().map(|(n, _)| n).collect();
    assert_eq!(names_a, names_b);
    assert!(files_a.iter().any(|(n, _)| n == "1.jpg"));
    assert!(files_a.iter().any(|(n, _)| n == "2.jpg"));

    for ((name, bytes_a), (_, bytes_b)) in files_a.iter().zip(files_b.iter()) {
        assert_eq!(bytes_a, bytes_b, "output '{name}' differs between runs");
    }

    std::fs::remove_dir_all(&root).ok();
}
