use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use sha2::{Digest, Sha256};

use crate::config;

/// Edge length of the cover shown in each table row.
pub const COVER_SIZE: u32 = 100;

/// RGBA pixels with their width and height.
pub type Rgba = (Vec<u8>, u32, u32);

/// Load a cover scaled to fit `max_size`. Serves from the disk cache when the
/// file is unchanged; falls back to a grey placeholder if it cannot be read.
pub fn load_cover(path: &Path, max_size: u32) -> Rgba {
    let cache_path = cache_key(path, max_size).and_then(|key| cache_file_path(&key));

    if let Some(cached) = cache_path.as_deref().and_then(read_cached) {
        return cached;
    }

    match decode_cover(path, max_size) {
        Ok(rgba) => {
            if let Some(cache_path) = cache_path {
                save_to_cache(&cache_path, &rgba);
            }
            rgba
        }
        Err(e) => {
            log::warn!("Failed to load cover {}: {}", path.display(), e);
            placeholder(max_size)
        }
    }
}

/// Load covers for several games at once. Order follows `items`.
pub fn load_covers_parallel(items: &[(i64, PathBuf)], max_size: u32) -> Vec<(i64, Rgba)> {
    use rayon::prelude::*;

    items
        .par_iter()
        .map(|(id, path)| (*id, load_cover(path, max_size)))
        .collect()
}

fn decode_cover(path: &Path, max_size: u32) -> image::ImageResult<Rgba> {
    let img = image::open(path)?;
    let img = apply_orientation(img, read_orientation(path));
    let thumb = img.resize(max_size, max_size, FilterType::Triangle);
    let (w, h) = thumb.dimensions();
    Ok((thumb.to_rgba8().into_raw(), w, h))
}

pub fn placeholder(size: u32) -> Rgba {
    let pixels = vec![60u8; (size * size * 4) as usize];
    (pixels, size, size)
}

// --- Disk cache ---

/// Canonical path, file size, mtime and target size, hashed.
fn cache_key(path: &Path, max_size: u32) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_nanos();
    let canonical = std::fs::canonicalize(path).ok()?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(meta.len().to_le_bytes());
    hasher.update(mtime.to_le_bytes());
    hasher.update(max_size.to_le_bytes());
    Some(
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect(),
    )
}

fn cache_file_path(key: &str) -> Option<PathBuf> {
    Some(shard_path(&config::cover_cache_dir()?, key))
}

/// Files are spread over subdirectories named by the first two hex digits
/// of the key.
fn shard_path(root: &Path, key: &str) -> PathBuf {
    let shard = key.get(..2).unwrap_or("00");
    root.join(shard).join(format!("{key}.qoi"))
}

fn read_cached(cache_path: &Path) -> Option<Rgba> {
    let data = std::fs::read(cache_path).ok()?;
    let (header, pixels) = qoi::decode_to_vec(&data).ok()?;
    Some((pixels, header.width, header.height))
}

fn save_to_cache(cache_path: &Path, (rgba, width, height): &Rgba) {
    if let Some(parent) = cache_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match qoi::encode_to_vec(rgba, *width, *height) {
        Ok(data) => {
            if let Err(e) = std::fs::write(cache_path, data) {
                log::warn!("Failed to cache cover {}: {}", cache_path.display(), e);
            }
        }
        Err(e) => log::warn!("Failed to encode cover thumbnail: {}", e),
    }
}

// --- EXIF ---

fn read_orientation(path: &Path) -> u32 {
    let Ok(file) = std::fs::File::open(path) else {
        return 1;
    };
    let mut reader = BufReader::new(file);
    exif::Reader::new()
        .read_from_container(&mut reader)
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
                .value
                .get_uint(0)
        })
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
