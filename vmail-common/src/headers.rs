/*
 * vMail mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 *  This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 **/
#[inline]
fn has_wsc(input: &str) -> bool {
    input.starts_with(|c| c == ' ' || c == '\t')
}

fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// parse the header section of a raw message, unfolding continuation lines.
///
/// parsing stops at the first empty line, lines without a colon are ignored.
#[must_use]
pub fn parse(raw: &[u8]) -> Vec<(String, String)> {
    let raw = String::from_utf8_lossy(raw);
    let mut headers: Vec<(String, String)> = vec![];

    for line in split_lines(&raw) {
        if line.is_empty() {
            break;
        }
        if has_wsc(line) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    headers
}

/// get the value of the first header named `name` (case-insensitive).
#[must_use]
pub fn get<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// does the raw message contain a header section followed by an empty line ?
#[must_use]
pub fn has_header_section(raw: &[u8]) -> bool {
    let raw = String::from_utf8_lossy(raw);
    let mut lines = split_lines(&raw).peekable();

    match lines.peek() {
        Some(first) if first.contains(':') && !has_wsc(first) => {}
        _ => return false,
    }
    lines.any(str::is_empty)
}

/// does the message carry an attachment ?
///
/// true for a `multipart/mixed` top level content type, or when any part
/// declares an `attachment` content disposition.
#[must_use]
pub fn has_attachment(raw: &[u8]) -> bool {
    let headers = parse(raw);
    if get(&headers, "Content-Type")
        .map(str::to_ascii_lowercase)
        .map_or(false, |value| value.starts_with("multipart/mixed"))
    {
        return true;
    }

    let raw = String::from_utf8_lossy(raw);
    let declared = split_lines(&raw).any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("content-disposition:") && line.contains("attachment")
    });
    declared
}

/// prepend a header to a raw message.
#[must_use]
pub fn prepend(raw: &[u8], name: &str, value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + name.len() + value.len() + 4);
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(raw);
    out
}
