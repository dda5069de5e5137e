//! Save-path template rendering
//!
//! Templates interleave literal text with `{FIELD}` placeholders. Fields
//! resolve against the album context first, then the track; the reserved
//! `TRACK_NUMBER` / `TRACK_POSITION` / `NO_TRACK_NUMBER` tokens render
//! the zero-padded track position and suppress automatic numbering.

use regex::Regex;
use std::sync::LazyLock;

use crate::catalog::models::{AlbumContext, TrackDescriptor};
use crate::utils::sanitize::sanitize_component;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]*)\}").unwrap());
static RESIDUAL_UNSAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[?%*|"<>]"#).unwrap());

/// Caller options for one rendering pass.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Prefix the final segment with `"NNN - "` when the template consumed
    /// no numbering token.
    pub number_tracks: bool,
    /// Minimum digits for rendered track positions.
    pub min_digits: usize,
}

fn zero_pad(value: u32, width: usize) -> String {
    format!("{value:0width$}")
}

/// Album title used for substitution.
///
/// When the release spans multiple disks and the context title carries no
/// disc marker, a `" (Disc NN)"` suffix is appended to the substituted
/// value only; the context itself is never modified.
fn substituted_album_title(track: &TrackDescriptor, album: &AlbumContext) -> String {
    if let Some(title) = &album.title {
        let multi_disk = album.disk_count.is_some_and(|count| count > 1);
        if let Some(disk) = track.disk_number {
            if multi_disk && !title.contains("Disc") {
                return format!("{title} (Disc {})", zero_pad(disk, 2));
            }
        }
        return title.clone();
    }
    track.album_title.clone()
}

fn lookup_field(key: &str, track: &TrackDescriptor, album: &AlbumContext) -> Option<String> {
    match key {
        "SNG_TITLE" => Some(track.full_title()),
        "ART_NAME" => Some(track.artist_name.clone()),
        "ALB_TITLE" | "ALB_NAME" => Some(substituted_album_title(track, album)),
        "TITLE" => album.playlist_title.clone(),
        "SNG_ID" => Some(track.id.clone()),
        "ART_ID" => Some(track.artist_id.to_string()),
        _ => None,
    }
}

/// Render a save-path template for one track.
///
/// Substituted values are sanitized; template literal text is not. The
/// returned path carries no extension; the pipeline appends the
/// quality's extension.
pub fn render_layout(
    template: &str,
    track: &TrackDescriptor,
    album: &AlbumContext,
    options: &LayoutOptions,
) -> String {
    // a template starting with a placeholder is relative
    let mut path = if template.starts_with('{') {
        format!("./{template}")
    } else {
        template.to_string()
    };

    let mut number_tracks = options.number_tracks;

    let keys: Vec<String> = PLACEHOLDER
        .captures_iter(&path)
        .map(|captures| captures[1].to_string())
        .collect();

    for key in keys {
        let token = format!("{{{key}}}");
        let rendered = match key.as_str() {
            "TRACK_NUMBER" | "TRACK_POSITION" | "NO_TRACK_NUMBER" => {
                // consumed, even when rendering empty
                number_tracks = false;
                if key == "NO_TRACK_NUMBER" {
                    String::new()
                } else {
                    track
                        .track_position
                        .map(|position| zero_pad(position, options.min_digits))
                        .unwrap_or_default()
                }
            }
            _ => lookup_field(&key, track, album)
                .map(|value| sanitize_component(&value))
                .unwrap_or_default(),
        };
        path = path.replace(&token, &rendered);
    }

    if number_tracks {
        if let Some(position) = track.track_position {
            let (dir, base) = match path.rfind('/') {
                Some(split) => (&path[..split], &path[split + 1..]),
                None => ("", path.as_str()),
            };
            let prefixed = format!("{} - {}", zero_pad(position, options.min_digits), base);
            path = if dir.is_empty() {
                prefixed
            } else {
                format!("{dir}/{prefixed}")
            };
        }
    }

    RESIDUAL_UNSAFE.replace_all(&path, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::tests::track;

    fn options(number_tracks: bool, min_digits: usize) -> LayoutOptions {
        LayoutOptions {
            number_tracks,
            min_digits,
        }
    }

    #[test]
    fn test_auto_numbering_prefixes_final_segment() {
        let track = track("1", "Superheroes");
        let album = AlbumContext::default();

        // large batches widen the prefix to three digits
        let rendered = render_layout(
            "Music/{ALB_NAME}/{ART_NAME}/{SNG_TITLE}",
            &track,
            &album,
            &options(true, 3),
        );
        assert_eq!(rendered, "Music/Discovery/Daft Punk/004 - Superheroes");

        let rendered = render_layout(
            "Music/{ALB_NAME}/{ART_NAME}/{SNG_TITLE}",
            &track,
            &album,
            &options(true, 2),
        );
        assert_eq!(rendered, "Music/Discovery/Daft Punk/04 - Superheroes");
    }

    #[test]
    fn test_numbering_token_suppresses_auto_prefix() {
        let track = track("1", "Superheroes");
        let album = AlbumContext::default();

        let rendered = render_layout(
            "{ALB_NAME}/{ART_NAME}/{TRACK_NUMBER} {SNG_TITLE}",
            &track,
            &album,
            &options(true, 2),
        );
        assert_eq!(rendered, "./Discovery/Daft Punk/04 Superheroes");
    }

    #[test]
    fn test_no_track_number_token_renders_without_prefix() {
        let track = track("1", "Superheroes");
        let album = AlbumContext::default();

        let rendered = render_layout(
            "{ALB_NAME}/{ART_NAME}/{NO_TRACK_NUMBER}{SNG_TITLE}",
            &track,
            &album,
            &options(true, 2),
        );
        assert_eq!(rendered, "./Discovery/Daft Punk/Superheroes");
    }

    #[test]
    fn test_numbering_disabled_or_positionless_leaves_path_alone() {
        let mut track = track("1", "Superheroes");
        let album = AlbumContext::default();

        let rendered = render_layout("Music/{SNG_TITLE}", &track, &album, &options(false, 2));
        assert_eq!(rendered, "Music/Superheroes");

        track.track_position = None;
        let rendered = render_layout("Music/{SNG_TITLE}", &track, &album, &options(true, 2));
        assert_eq!(rendered, "Music/Superheroes");
    }

    #[test]
    fn test_disc_suffix_on_multi_disk_albums() {
        let track = track("1", "Aerodynamic");
        let album = AlbumContext {
            title: Some("Alive".to_string()),
            disk_count: Some(2),
            playlist_title: None,
        };

        let rendered = render_layout("{ALB_TITLE}/{SNG_TITLE}", &track, &album, &options(false, 2));
        assert_eq!(rendered, "./Alive (Disc 01)/Aerodynamic");

        // a title already carrying a disc marker is left alone
        let album = AlbumContext {
            title: Some("Alive Disc 1".to_string()),
            disk_count: Some(2),
            playlist_title: None,
        };
        let rendered = render_layout("{ALB_TITLE}/{SNG_TITLE}", &track, &album, &options(false, 2));
        assert_eq!(rendered, "./Alive Disc 1/Aerodynamic");

        // single-disk releases get no suffix
        let album = AlbumContext {
            title: Some("Alive".to_string()),
            disk_count: Some(1),
            playlist_title: None,
        };
        let rendered = render_layout("{ALB_TITLE}/{SNG_TITLE}", &track, &album, &options(false, 2));
        assert_eq!(rendered, "./Alive/Aerodynamic");
    }

    #[test]
    fn test_album_context_wins_over_track_metadata() {
        let track = track("1", "Intro");
        let album = AlbumContext {
            title: Some("Compilation".to_string()),
            disk_count: None,
            playlist_title: Some("Morning Mix".to_string()),
        };

        let rendered = render_layout(
            "{TITLE}/{ALB_TITLE}/{SNG_TITLE}",
            &track,
            &album,
            &options(false, 2),
        );
        assert_eq!(rendered, "./Morning Mix/Compilation/Intro");

        // without album context, ALB_TITLE falls back to the track
        let rendered = render_layout(
            "{ALB_TITLE}/{SNG_TITLE}",
            &track,
            &AlbumContext::default(),
            &options(false, 2),
        );
        assert_eq!(rendered, "./Discovery/Intro");
    }

    #[test]
    fn test_substituted_values_are_sanitized_but_literals_are_not() {
        let mut track = track("1", "What / Is: Love?");
        track.artist_name = "AC/DC".to_string();
        let album = AlbumContext::default();

        let rendered = render_layout(
            "Library/{ART_NAME}/{SNG_TITLE}",
            &track,
            &album,
            &options(false, 2),
        );
        // field '?'/'/'/':' replaced with '_' by sanitization; the final
        // pass then drops residual unsafe characters from the whole path
        assert_eq!(rendered, "Library/AC_DC/What _ Is_ Love_");
    }

    #[test]
    fn test_unknown_field_renders_empty() {
        let track = track("1", "Intro");
        let rendered = render_layout(
            "Music/{GENRE}{SNG_TITLE}",
            &track,
            &AlbumContext::default(),
            &options(false, 2),
        );
        assert_eq!(rendered, "Music/Intro");
    }

    #[test]
    fn test_final_pass_strips_residual_unsafe_characters() {
        let track = track("1", "Intro");
        let rendered = render_layout(
            " Music?/<{SNG_TITLE}> ",
            &track,
            &AlbumContext::default(),
            &options(false, 2),
        );
        assert_eq!(rendered, "Music/Intro");
    }
}
