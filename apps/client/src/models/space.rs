use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::{AspectRatio, MasonryItem};

/// A space as returned by `GET /spaces`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDto {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub cover_image: Option<CoverImageDto>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverImageDto {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Feed card for one space. Measured by the masonry engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceCard {
    pub id: Uuid,
    pub title: String,
    pub host_name: Option<String>,
    pub cover_url: Option<String>,
    /// width / height of the cover image.
    pub cover_aspect_ratio: Option<f32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
}

impl From<SpaceDto> for SpaceCard {
    fn from(dto: SpaceDto) -> Self {
        let (cover_url, cover_aspect_ratio) = match dto.cover_image {
            Some(img) if img.width > 0 && img.height > 0 => {
                (Some(img.url), Some(img.width as f32 / img.height as f32))
            }
            Some(img) => (Some(img.url), None),
            None => (None, None),
        };
        SpaceCard {
            id: dto.id,
            title: dto.title.trim().to_string(),
            host_name: dto.host_name.filter(|h| !h.trim().is_empty()),
            cover_url,
            cover_aspect_ratio,
            starts_at: dto.starts_at,
            capacity: dto.capacity,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Card metrics (points)
// ────────────────────────────────────────────────────────────────────────────

const CAPTION_PADDING: f32 = 12.0;
const TITLE_LINE_HEIGHT: f32 = 20.0;
const META_LINE_HEIGHT: f32 = 16.0;
/// Average glyph advance of the 15pt title font.
const TITLE_GLYPH_WIDTH: f32 = 8.0;
const TITLE_SPACE_WIDTH: f32 = 4.0;
/// Titles are clamped to two lines with an ellipsis.
const MAX_TITLE_LINES: u32 = 2;

impl SpaceCard {
    fn has_meta_line(&self) -> bool {
        self.host_name.is_some() || self.starts_at.is_some()
    }
}

impl MasonryItem for SpaceCard {
    fn measure(&self, width: f32) -> f32 {
        let text_width = (width - 2.0 * CAPTION_PADDING).max(0.0);
        let lines = title_lines(&self.title, text_width).min(MAX_TITLE_LINES);
        let meta = if self.has_meta_line() {
            META_LINE_HEIGHT
        } else {
            0.0
        };

        // A missing cover has ratio 0, which leaves only the caption block.
        AspectRatio {
            aspect_ratio: self.cover_aspect_ratio.unwrap_or(0.0),
            extra_height: 2.0 * CAPTION_PADDING + lines as f32 * TITLE_LINE_HEIGHT + meta,
        }
        .measure(width)
    }
}

/// Greedy word wrap with a flat glyph width. Words wider than a line take a
/// line of their own. An empty title has zero lines.
fn title_lines(title: &str, max_width: f32) -> u32 {
    let mut lines = 0u32;
    let mut current = 0.0_f32;

    for word in title.split_whitespace() {
        let word_w = word.chars().count() as f32 * TITLE_GLYPH_WIDTH;
        if lines == 0 {
            lines = 1;
            current = word_w;
        } else if current + TITLE_SPACE_WIDTH + word_w > max_width {
            lines += 1;
            current = word_w;
        } else {
            current += TITLE_SPACE_WIDTH + word_w;
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card(title: &str, aspect: Option<f32>) -> SpaceCard {
        SpaceCard {
            id: Uuid::new_v4(),
            title: title.to_string(),
            host_name: None,
            cover_url: None,
            cover_aspect_ratio: aspect,
            starts_at: None,
            capacity: None,
        }
    }

    #[test]
    fn test_dto_decodes_camel_case() {
        let dto: SpaceDto = serde_json::from_value(json!({
            "id": "6f1c3a4e-8d2b-4c55-9a11-0a6b7e3d2f10",
            "title": "  Rooftop board games  ",
            "hostName": "Mina",
            "coverImage": { "url": "https://cdn.example.com/a.jpg", "width": 800, "height": 400 },
            "startsAt": "2026-05-01T18:00:00Z",
            "capacity": 12
        }))
        .unwrap();

        let card = SpaceCard::from(dto);
        assert_eq!(card.title, "Rooftop board games");
        assert_eq!(card.host_name.as_deref(), Some("Mina"));
        assert_eq!(card.cover_aspect_ratio, Some(2.0));
        assert_eq!(card.capacity, Some(12));
    }

    #[test]
    fn test_dto_optional_fields_default() {
        let dto: SpaceDto = serde_json::from_value(json!({
            "id": "6f1c3a4e-8d2b-4c55-9a11-0a6b7e3d2f10",
            "title": "Quiet study room"
        }))
        .unwrap();
        let card = SpaceCard::from(dto);
        assert!(card.cover_url.is_none());
        assert!(card.cover_aspect_ratio.is_none());
        assert!(card.starts_at.is_none());
    }

    #[test]
    fn test_zero_sized_cover_has_no_aspect_ratio() {
        let dto: SpaceDto = serde_json::from_value(json!({
            "id": "6f1c3a4e-8d2b-4c55-9a11-0a6b7e3d2f10",
            "title": "Broken image",
            "coverImage": { "url": "https://cdn.example.com/b.jpg", "width": 0, "height": 0 }
        }))
        .unwrap();
        let card = SpaceCard::from(dto);
        assert!(card.cover_url.is_some());
        assert!(card.cover_aspect_ratio.is_none());
    }

    #[test]
    fn test_title_lines_wraps_greedily() {
        assert_eq!(title_lines("", 100.0), 0);
        // "abcd" = 32pt, "efgh" = 32pt, space 4pt → 68pt on one line
        assert_eq!(title_lines("abcd efgh", 100.0), 1);
        assert_eq!(title_lines("abcd efgh", 60.0), 2);
        assert_eq!(title_lines("abcdefghijklmnop", 40.0), 1, "long word takes one line");
    }

    #[test]
    fn test_measure_scales_cover_with_width() {
        let c = card("Jam", Some(1.0));
        // cover 100 + padding 24 + one title line 20
        assert_eq!(c.measure(100.0), 144.0);
        assert_eq!(c.measure(200.0), 244.0);
    }

    #[test]
    fn test_measure_clamps_title_to_two_lines() {
        let long = "word ".repeat(40);
        let c = card(&long, None);
        assert_eq!(c.measure(120.0), 2.0 * CAPTION_PADDING + 2.0 * TITLE_LINE_HEIGHT);
    }

    #[test]
    fn test_measure_adds_meta_line_when_host_known() {
        let mut c = card("Jam", None);
        let without = c.measure(150.0);
        c.host_name = Some("Mina".to_string());
        assert_eq!(c.measure(150.0) - without, META_LINE_HEIGHT);
    }
}
