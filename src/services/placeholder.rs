// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SVG placeholder images, returned as percent-encoded `data:` URLs.

const WIDTH: u32 = 600;
const HEIGHT: u32 = 400;
const LINE_CHARS: usize = 40;
const MAX_LINES: usize = 4;

/// Background colors for prompt placeholders.
pub const PALETTE: [&str; 6] = ["8B5CF6", "EC4899", "10B981", "3B82F6", "F59E0B", "EF4444"];

const LOCAL_SERVER_COLOR: &str = "F97316";

/// Placeholder for a prompt whose generation failed. Same prompt, same image.
pub fn prompt_placeholder(prompt: &str) -> String {
    let color = palette_color(prompt);
    let lines = wrap(prompt.trim(), LINE_CHARS, MAX_LINES);
    svg_data_url(color, &lines, 50)
}

/// Placeholder shown in place of an image held only by a local generation server.
pub fn local_server_placeholder(filename: &str) -> String {
    let lines = vec![
        "Local server image".to_string(),
        filename.to_string(),
        "Start the generation server to view".to_string(),
    ];
    svg_data_url(LOCAL_SERVER_COLOR, &lines, 40)
}

fn palette_color(prompt: &str) -> &'static str {
    // FNV-1a over the prompt bytes.
    let hash = prompt.bytes().fold(0x811c_9dc5_u32, |h, b| {
        (h ^ u32::from(b)).wrapping_mul(0x0100_0193)
    });
    PALETTE[hash as usize % PALETTE.len()]
}

fn wrap(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push('…');
        }
    }
    lines
}

/// Escape text for use inside SVG markup.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn svg_data_url(color: &str, lines: &[String], center_y_percent: u32) -> String {
    let line_height = 32.0_f32;
    let center_y = HEIGHT as f32 * center_y_percent as f32 / 100.0;
    let first_y = center_y - line_height * (lines.len().saturating_sub(1)) as f32 / 2.0;

    let spans: String = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "<tspan x='50%' y='{}'>{}</tspan>",
                first_y + line_height * i as f32,
                xml_escape(line)
            )
        })
        .collect();

    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}' viewBox='0 0 {w} {h}'>\
         <rect width='{w}' height='{h}' fill='#{color}'/>\
         <text font-family='Arial, sans-serif' font-size='24' fill='white' \
         text-anchor='middle' dominant-baseline='middle'>{spans}</text></svg>",
        w = WIDTH,
        h = HEIGHT,
        color = color,
        spans = spans
    );

    format!("data:image/svg+xml,{}", urlencoding::encode(&svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_url::DataUrl;

    #[test]
    fn test_prompt_placeholder_is_deterministic() {
        let a = prompt_placeholder("sunset sale banner");
        let b = prompt_placeholder("sunset sale banner");
        assert_eq!(a, b);
        assert!(a.starts_with("data:image/svg+xml,"));

        let svg = String::from_utf8(DataUrl::parse(&a).unwrap().bytes).unwrap();
        assert!(svg.contains("sunset sale banner"));
        assert!(svg.contains("width='600'"));
        assert!(PALETTE.iter().any(|c| svg.contains(&format!("fill='#{}'", c))));
    }

    #[test]
    fn test_placeholder_escapes_markup() {
        let url = prompt_placeholder("<b>50% OFF</b> & more");
        let svg = String::from_utf8(DataUrl::parse(&url).unwrap().bytes).unwrap();
        assert!(svg.contains("&lt;b&gt;50% OFF&lt;/b&gt; &amp; more"));
    }

    #[test]
    fn test_wrap_limits_lines() {
        let long = "word ".repeat(100);
        let lines = wrap(&long, 10, 3);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with('…'));
        assert!(wrap("", 10, 3).is_empty());
    }

    #[test]
    fn test_local_server_placeholder_names_file() {
        let url = local_server_placeholder("moksha_1.jpg");
        let svg = String::from_utf8(DataUrl::parse(&url).unwrap().bytes).unwrap();
        assert!(svg.contains("Local server image"));
        assert!(svg.contains("moksha_1.jpg"));
    }
}
