use std::fs;
use std::path::{Path, PathBuf};

use image::{io::Reader as ImageReader, DynamicImage, ImageFormat};
use photo_sorter_application::ApplicationError;
use photo_sorter_domain::ImageId;

const THUMBNAIL_EDGE: u32 = 256;

/// JPEG thumbnails cached as `<root>/<image id>.jpg`.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    root: PathBuf,
}

impl ThumbnailCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, image_id: ImageId) -> PathBuf {
        self.root.join(format!("{}.jpg", image_id.get()))
    }

    pub fn ensure(&self, source_path: &Path, image_id: ImageId) -> Result<PathBuf, ApplicationError> {
        let thumb_path = self.path_for(image_id);
        let image = ImageReader::open(source_path)
            .map_err(|error| ApplicationError::Io(error.to_string()))?
            .with_guessed_format()
            .map_err(|error| ApplicationError::Decode(error.to_string()))?
            .decode()
            .map_err(|error| ApplicationError::Decode(error.to_string()))?;

        let thumb = DynamicImage::ImageRgb8(image.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgb8());
        fs::create_dir_all(&self.root).map_err(|error| ApplicationError::Io(error.to_string()))?;
        thumb
            .save_with_format(&thumb_path, ImageFormat::Jpeg)
            .map_err(|error| ApplicationError::Io(error.to_string()))?;

        Ok(thumb_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};
    use tempfile::TempDir;

    fn id(value: i64) -> ImageId {
        ImageId::new(value).expect("id")
    }

    #[test]
    fn creates_bounded_jpeg_thumbnail() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("x.jpg");
        let img = ImageBuffer::from_fn(500, 300, |_x, _y| Rgb([10_u8, 20_u8, 30_u8]));
        img.save(&src).expect("save");

        let cache = ThumbnailCache::new(dir.path().join("thumbs"));
        let out = cache.ensure(&src, id(7)).expect("thumbnail");
        assert_eq!(out, dir.path().join("thumbs").join("7.jpg"));

        let thumb = image::open(&out).expect("decode thumbnail");
        assert_eq!((thumb.width(), thumb.height()), (256, 154));
    }

    #[test]
    fn accepts_images_with_alpha() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("x.png");
        let img = ImageBuffer::from_fn(40, 80, |_x, _y| Rgba([10_u8, 20_u8, 30_u8, 128_u8]));
        img.save(&src).expect("save");

        let cache = ThumbnailCache::new(dir.path());
        let out = cache.ensure(&src, id(1)).expect("thumbnail");
        assert!(out.exists());
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("broken.jpg");
        fs::write(&src, b"not an image").expect("write");

        let cache = ThumbnailCache::new(dir.path().join("thumbs"));
        assert!(cache.ensure(&src, id(2)).is_err());
        assert!(!cache.path_for(id(2)).exists());
    }
}
