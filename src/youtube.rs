//! YouTube reference normalization for the `youtube_id` front matter field.
//!
//! Accepts a bare 11-character video id or a watch / share / embed / shorts /
//! live URL and returns the id. Anything else yields `None`.

use url::Url;

const ID_LEN: usize = 11;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_video_id(s: &str) -> bool {
    s.len() == ID_LEN && s.chars().all(is_id_char)
}

/// Last resort: an id after `v=` or `/`, followed by `?`, `&`, `/` or the end
fn scan_for_id(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    for (start, _) in input.match_indices(['=', '/']) {
        let id_start = start + 1;
        if bytes[start] == b'=' && (start == 0 || bytes[start - 1] != b'v') {
            continue;
        }
        let Some(candidate) = input.get(id_start..id_start + ID_LEN) else {
            continue;
        };
        let terminated = matches!(bytes.get(id_start + ID_LEN), None | Some(b'?') | Some(b'&') | Some(b'/'));
        if terminated && is_video_id(candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Extract an 11-character video id from an id or a YouTube URL
pub fn extract_youtube_id(input: &str) -> Option<String> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }
    if is_video_id(raw) {
        return Some(raw.to_string());
    }

    let url = Url::parse(raw).ok()?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if host == "youtu.be" {
        if let Some(candidate) = segments.first().filter(|c| is_video_id(c)) {
            return Some(candidate.to_string());
        }
    } else if host.ends_with("youtube.com") || host.ends_with("youtube-nocookie.com") {
        let v = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());
        if let Some(v) = v.filter(|v| is_video_id(v)) {
            return Some(v);
        }
        if let [kind, candidate, ..] = segments.as_slice() {
            if matches!(*kind, "embed" | "shorts" | "live") && is_video_id(candidate) {
                return Some(candidate.to_string());
            }
        }
    }

    scan_for_id(raw).map(str::to_string)
}
