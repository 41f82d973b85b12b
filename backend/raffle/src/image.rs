//! # Images
//!
//! Prize photos and avatars live in object storage; only their public URLs are
//! kept on campaigns and profiles.
//!
//! - `prize-images/{user_id}/{millis}-{random}.{ext}`
//! - `avatars/avatars/{user_id}-{random}.{ext}`
use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

use crate::error::ImageError;

pub const PRIZE_BUCKET: &str = "prize-images";
pub const AVATAR_BUCKET: &str = "avatars";

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_PRIZE_IMAGES: usize = 10;

const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const KEY_SUFFIX_LEN: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();

        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }
}

pub fn check_image(content_type: &str, len: usize) -> Result<ImageKind, ImageError> {
    let kind = ImageKind::from_content_type(content_type)
        .ok_or_else(|| ImageError::Type(content_type.to_string()))?;

    if len == 0 {
        return Err(ImageError::Empty);
    }
    if len > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(len));
    }

    Ok(kind)
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..KEY_SUFFIX_LEN)
        .filter_map(|_| KEY_ALPHABET.choose(&mut *rng))
        .map(|b| char::from(*b))
        .collect()
}

/// Keeps the uploaded file's extension when it has a sane one.
fn extension(file_name: Option<&str>, kind: ImageKind) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| kind.extension().to_string())
}

pub fn prize_key<R: Rng + ?Sized>(
    user_id: Uuid,
    file_name: Option<&str>,
    kind: ImageKind,
    now: DateTime<Utc>,
    rng: &mut R,
) -> String {
    format!(
        "{user_id}/{}-{}.{}",
        now.timestamp_millis(),
        random_suffix(rng),
        extension(file_name, kind)
    )
}

pub fn avatar_key<R: Rng + ?Sized>(
    user_id: Uuid,
    file_name: Option<&str>,
    kind: ImageKind,
    rng: &mut R,
) -> String {
    format!(
        "avatars/{user_id}-{}.{}",
        random_suffix(rng),
        extension(file_name, kind)
    )
}

/// Moves the image at `from` to position `to`.
pub fn reorder(urls: &mut Vec<String>, from: usize, to: usize) -> Result<(), ImageError> {
    if from >= urls.len() {
        return Err(ImageError::Index(from));
    }
    if to >= urls.len() {
        return Err(ImageError::Index(to));
    }

    let moved = urls.remove(from);
    urls.insert(to, moved);

    Ok(())
}

pub fn remove(urls: &mut Vec<String>, index: usize) -> Result<String, ImageError> {
    if index >= urls.len() {
        return Err(ImageError::Index(index));
    }

    Ok(urls.remove(index))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_check_image() {
        assert_eq!(check_image("image/png", 10), Ok(ImageKind::Png));
        assert_eq!(check_image("image/jpg", 10), Ok(ImageKind::Jpeg));
        assert_eq!(check_image("image/webp; charset=binary", 10), Ok(ImageKind::Webp));
        assert_eq!(
            check_image("image/gif", 10),
            Err(ImageError::Type("image/gif".to_string()))
        );
        assert_eq!(
            check_image("image/png", MAX_IMAGE_BYTES + 1),
            Err(ImageError::TooLarge(MAX_IMAGE_BYTES + 1))
        );
        assert_eq!(check_image("image/png", 0), Err(ImageError::Empty));
    }

    #[test]
    fn test_prize_key_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let user = Uuid::nil();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let key = prize_key(user, Some("Premio.JPEG"), ImageKind::Jpeg, now, &mut rng);
        let (dir, file) = key.split_once('/').unwrap();

        assert_eq!(dir, user.to_string());
        assert!(file.starts_with("1700000000000-"));
        assert!(file.ends_with(".jpeg"));
        assert_eq!(file.len(), "1700000000000-".len() + 9 + ".jpeg".len());
    }

    #[test]
    fn test_key_falls_back_to_kind_extension() {
        let mut rng = StdRng::seed_from_u64(1);
        let key = avatar_key(Uuid::nil(), Some("no-extension"), ImageKind::Webp, &mut rng);

        assert!(key.starts_with("avatars/"));
        assert!(key.ends_with(".webp"));
    }

    #[test]
    fn test_reorder_and_remove() {
        let mut urls = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        reorder(&mut urls, 0, 2).unwrap();
        assert_eq!(urls, vec!["b", "c", "a"]);

        assert_eq!(reorder(&mut urls, 3, 0), Err(ImageError::Index(3)));
        assert_eq!(remove(&mut urls, 1).unwrap(), "c");
        assert_eq!(urls, vec!["b", "a"]);
    }
}
