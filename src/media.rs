use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{DatasetType, ValidationResult};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mpg"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "sgi", "bmp", "pgm"];
pub const ANNOTATION_EXTENSIONS: &[&str] = &["csv", "json"];

static VIDEO_RE: LazyLock<Regex> = LazyLock::new(|| extension_regex(VIDEO_EXTENSIONS));
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| extension_regex(IMAGE_EXTENSIONS));
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| extension_regex(ANNOTATION_EXTENSIONS));

fn extension_regex(extensions: &[&str]) -> Regex {
    let pattern = format!(r"(?i)\.({})$", extensions.join("|"));
    Regex::new(&pattern).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Image,
    Annotation,
    Other,
}

pub fn file_kind(name: &str) -> FileKind {
    if VIDEO_RE.is_match(name) {
        FileKind::Video
    } else if IMAGE_RE.is_match(name) {
        FileKind::Image
    } else if ANNOTATION_RE.is_match(name) {
        FileKind::Annotation
    } else {
        FileKind::Other
    }
}

/// Offline version of the backend's upload-group check: one video, or any
/// number of images, plus at most one annotation file.
pub fn classify_upload_group(names: &[String]) -> ValidationResult {
    let mut videos = Vec::new();
    let mut images = Vec::new();
    let mut annotations = Vec::new();
    for name in names {
        match file_kind(name) {
            FileKind::Video => videos.push(name.clone()),
            FileKind::Image => images.push(name.clone()),
            FileKind::Annotation => annotations.push(name.clone()),
            FileKind::Other => {}
        }
    }

    let rejection = |message: &str, media: Vec<String>, annotations: Vec<String>| {
        ValidationResult {
            ok: false,
            dataset_type: None,
            media,
            annotations,
            message: message.to_string(),
        }
    };

    if annotations.len() > 1 {
        return rejection(
            "only one annotation file may be uploaded per dataset",
            Vec::new(),
            annotations,
        );
    }
    let (dataset_type, media) = match (videos.len(), images.len()) {
        (0, 0) => {
            return rejection("no supported media files found", Vec::new(), annotations);
        }
        (1, 0) => (DatasetType::Video, videos),
        (0, _) => (DatasetType::ImageSequence, images),
        (_, 0) => {
            return rejection("only one video may be uploaded per dataset", videos, annotations);
        }
        _ => {
            videos.extend(images);
            return rejection("videos and images cannot be mixed", videos, annotations);
        }
    };

    ValidationResult {
        ok: true,
        dataset_type: Some(dataset_type),
        media,
        annotations,
        message: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_case_insensitive() {
        assert_eq!(file_kind("clip.MP4"), FileKind::Video);
        assert_eq!(file_kind("frame_0001.Tiff"), FileKind::Image);
        assert_eq!(file_kind("tracks.csv"), FileKind::Annotation);
        assert_eq!(file_kind("notes.txt"), FileKind::Other);
        assert_eq!(file_kind("mp4"), FileKind::Other);
    }

    #[test]
    fn every_image_extension_is_an_image() {
        for ext in IMAGE_EXTENSIONS {
            assert_eq!(file_kind(&format!("a.{ext}")), FileKind::Image);
        }
    }
}
