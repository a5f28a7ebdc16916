use ndarray::Array2;
use tempfile::tempdir;

use motioncorr_core::io::image_io::{
    list_sequence, load_image, load_image_sequence, save_image, save_png, save_tiff,
};

#[test]
fn test_tiff_round_trip_keeps_levels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.tiff");
    let image = Array2::from_shape_fn((5, 7), |(r, c)| (r * 1000 + c * 3) as f32);
    save_tiff(image.view(), &path).unwrap();

    let frame = load_image(&path).unwrap();
    assert_eq!(frame.original_bit_depth, 16);
    assert_eq!(frame.data, image);
}

#[test]
fn test_tiff_rounds_and_clamps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clamped.tif");
    let image = Array2::from_shape_vec((1, 4), vec![-4.0f32, 2.6, 70000.0, f32::NAN]).unwrap();
    save_tiff(image.view(), &path).unwrap();

    let frame = load_image(&path).unwrap();
    assert_eq!(frame.data.as_slice().unwrap(), &[0.0, 3.0, 65535.0, 0.0]);
}

#[test]
fn test_png_is_stretched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("preview.png");
    let image = Array2::from_shape_vec((1, 3), vec![10.0f32, 15.0, 20.0]).unwrap();
    save_png(image.view(), &path).unwrap();

    let frame = load_image(&path).unwrap();
    assert_eq!(frame.original_bit_depth, 8);
    assert_eq!(frame.data.as_slice().unwrap(), &[0.0, 128.0, 255.0]);
}

#[test]
fn test_save_image_picks_format_by_extension() {
    let dir = tempdir().unwrap();
    let image = Array2::from_elem((3, 3), 300.0f32);

    let tiff = dir.path().join("out.tiff");
    save_image(image.view(), &tiff).unwrap();
    assert_eq!(load_image(&tiff).unwrap().data[[1, 1]], 300.0);

    let png = dir.path().join("out.png");
    save_image(image.view(), &png).unwrap();
    // Flat image stretches to zero.
    assert_eq!(load_image(&png).unwrap().data[[1, 1]], 0.0);
}

#[test]
fn test_sequence_loads_in_name_order() {
    let dir = tempdir().unwrap();
    for (name, level) in [("b_002.tif", 2.0f32), ("a_001.tif", 1.0), ("c_003.tiff", 3.0)] {
        let image = Array2::from_elem((4, 6), level * 100.0);
        save_tiff(image.view(), &dir.path().join(name)).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let paths = list_sequence(dir.path()).unwrap();
    assert_eq!(paths.len(), 3);

    let stack = load_image_sequence(dir.path()).unwrap();
    assert_eq!(stack.len(), 3);
    assert_eq!(stack.frame_dim(), (4, 6));
    assert_eq!(stack.frame(0)[[0, 0]], 100.0);
    assert_eq!(stack.frame(1)[[3, 5]], 200.0);
    assert_eq!(stack.frame(2)[[2, 2]], 300.0);
}

#[test]
fn test_sequence_rejects_mixed_sizes() {
    let dir = tempdir().unwrap();
    save_tiff(Array2::<f32>::zeros((4, 4)).view(), &dir.path().join("0.tif")).unwrap();
    save_tiff(Array2::<f32>::zeros((4, 5)).view(), &dir.path().join("1.tif")).unwrap();
    assert!(load_image_sequence(dir.path()).is_err());
}

#[test]
fn test_empty_directory_is_error() {
    let dir = tempdir().unwrap();
    assert!(load_image_sequence(dir.path()).is_err());
}
