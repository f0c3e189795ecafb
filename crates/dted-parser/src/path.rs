//! Storage layout of cell files under a root directory.

use std::path::PathBuf;

/// Path of a cell relative to a storage root, e.g. `w107/n35.dt2`.
///
/// `lat`/`lng` are the integer south-west corner of the cell.
pub fn relative_path(level: u8, lat: i32, lng: i32) -> PathBuf {
    let dir = format!("{}{:03}", if lng < 0 { 'w' } else { 'e' }, lng.unsigned_abs());
    let file = format!(
        "{}{:02}.dt{}",
        if lat < 0 { 's' } else { 'n' },
        lat.unsigned_abs(),
        level
    );
    PathBuf::from(dir).join(file)
}

/// Inverse of [`relative_path`]: `(level, lat, lng)` from the last two
/// components of a cell path.
///
/// Only the lowercase names [`relative_path`] produces are accepted, since
/// queries open cells by that exact path.
pub fn parse_relative_path(dir: &str, file: &str) -> Option<(u8, i32, i32)> {
    let lng = parse_signed(dir, 'e', 'w', 3)?;

    let (stem, ext) = file.rsplit_once('.')?;
    let level = ext.strip_prefix("dt")?.parse::<u8>().ok()?;
    let lat = parse_signed(stem, 'n', 's', 2)?;

    if !(-90..90).contains(&lat) || !(-180..180).contains(&lng) {
        return None;
    }
    Some((level, lat, lng))
}

fn parse_signed(s: &str, positive: char, negative: char, width: usize) -> Option<i32> {
    let mut chars = s.chars();
    let sign = match chars.next()? {
        c if c == positive => 1,
        c if c == negative => -1,
        _ => return None,
    };
    let digits = chars.as_str();
    if digits.len() != width || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(sign * digits.parse::<i32>().ok()?)
}
