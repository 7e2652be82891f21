//! Tests for PNG encoding.
//!
//! Images are decoded back with flate2 to check the header, the chosen
//! color type and the scanline payload.

use std::io::Read;

use renderer::png::{create_png, create_png_auto, create_png_indexed};
use renderer::{Canvas, Color, RenderError};

// ============================================================================
// Helper functions
// ============================================================================

struct Chunk {
    kind: [u8; 4],
    data: Vec<u8>,
}

fn chunks(png: &[u8]) -> Vec<Chunk> {
    assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    let mut out = Vec::new();
    let mut pos = 8;
    while pos < png.len() {
        let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
        let kind: [u8; 4] = png[pos + 4..pos + 8].try_into().unwrap();
        let data = png[pos + 8..pos + 8 + len].to_vec();
        let crc = u32::from_be_bytes(png[pos + 8 + len..pos + 12 + len].try_into().unwrap());
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&kind);
        hasher.update(&data);
        assert_eq!(crc, hasher.finalize(), "bad CRC in {:?}", kind);
        out.push(Chunk { kind, data });
        pos += 12 + len;
    }
    out
}

fn color_type(png: &[u8]) -> u8 {
    chunks(png)[0].data[9]
}

fn inflate_idat(png: &[u8]) -> Vec<u8> {
    let idat: Vec<u8> = chunks(png)
        .into_iter()
        .filter(|c| &c.kind == b"IDAT")
        .flat_map(|c| c.data)
        .collect();
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(&idat[..])
        .read_to_end(&mut out)
        .unwrap();
    out
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_rgba_payload_round_trips() {
    let pixels = [
        255, 0, 0, 255, // red
        0, 255, 0, 255, // green
        0, 0, 255, 255, // blue
        255, 255, 0, 255, // yellow
    ];
    let png = create_png(&pixels, 2, 2).unwrap();

    assert_eq!(color_type(&png), 6);
    let raw = inflate_idat(&png);
    // Each row: filter byte + 8 bytes
    assert_eq!(raw.len(), 2 * 9);
    assert_eq!(raw[0], 0);
    assert_eq!(&raw[1..9], &pixels[0..8]);
    assert_eq!(&raw[10..18], &pixels[8..16]);
}

#[test]
fn test_few_colors_use_palette() {
    let pixels = [
        255, 0, 0, 255, //
        0, 255, 0, 128, //
        0, 255, 0, 128, //
        255, 0, 0, 255, //
    ];
    let png = create_png_auto(&pixels, 2, 2).unwrap();

    assert_eq!(color_type(&png), 3);
    let parsed = chunks(&png);
    let plte = parsed.iter().find(|c| &c.kind == b"PLTE").unwrap();
    assert_eq!(plte.data, vec![255, 0, 0, 0, 255, 0]);
    let trns = parsed.iter().find(|c| &c.kind == b"tRNS").unwrap();
    assert_eq!(trns.data, vec![255, 128]);
    assert_eq!(inflate_idat(&png), vec![0, 0, 1, 0, 1, 0]);
}

#[test]
fn test_opaque_palette_has_no_trns() {
    let png = create_png_indexed(1, 1, &[(1, 2, 3, 255)], &[0]).unwrap();
    assert!(chunks(&png).iter().all(|c| &c.kind != b"tRNS"));
}

#[test]
fn test_many_colors_fall_back_to_rgba() {
    let pixels: Vec<u8> = (0..300u32)
        .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 7, 255])
        .collect();
    let png = create_png_auto(&pixels, 300, 1).unwrap();
    assert_eq!(color_type(&png), 6);
}

#[test]
fn test_exactly_256_colors_stay_indexed() {
    let pixels: Vec<u8> = (0..=255u8).flat_map(|g| [g, g, g, 255]).collect();
    let png = create_png_auto(&pixels, 16, 16).unwrap();
    assert_eq!(color_type(&png), 3);
}

#[test]
fn test_zero_dimensions_rejected() {
    assert!(matches!(
        create_png(&[], 0, 0),
        Err(RenderError::InvalidDimensions(_))
    ));
}

// ============================================================================
// Canvas encoding
// ============================================================================

#[test]
fn test_canvas_png_keeps_size_and_background() {
    let canvas = Canvas::new(7, 3, Color::WHITE).unwrap();
    let png = canvas.encode_png().unwrap();

    let ihdr = &chunks(&png)[0].data;
    assert_eq!(u32::from_be_bytes(ihdr[0..4].try_into().unwrap()), 7);
    assert_eq!(u32::from_be_bytes(ihdr[4..8].try_into().unwrap()), 3);
    // Single-color image: palette of one white entry
    let plte = chunks(&png).into_iter().find(|c| &c.kind == b"PLTE").unwrap();
    assert_eq!(plte.data, vec![255, 255, 255]);
}

#[test]
fn test_save_png_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.png");
    Canvas::new(4, 4, Color::BLACK).unwrap().save_png(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
