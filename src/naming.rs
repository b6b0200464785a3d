use regex::Regex;
use std::path::Path;
use tokio::fs;

pub const VIDEO_EXTENSION: &str = "mp4";

// Saved copies are named after the folder they land in
pub fn folder_prefix(folder: &Path) -> String {
    folder
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("default")
        .to_string()
}

pub fn file_name_for(prefix: &str, index: u64) -> String {
    format!("{}-{}.{}", prefix, index, VIDEO_EXTENSION)
}

/// Next free index for `<prefix>-<N>.mp4`: one past the highest existing N,
/// so gaps are never refilled. Starts at 0. `None` once the highest index
/// is `u64::MAX` and cannot grow.
pub fn next_index<I, S>(prefix: &str, names: I) -> Option<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let pattern = format!(r"^{}-(\d+)\.{}$", regex::escape(prefix), VIDEO_EXTENSION);
    let Ok(re) = Regex::new(&pattern) else {
        return Some(0);
    };

    names
        .into_iter()
        .filter_map(|name| {
            re.captures(name.as_ref())
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
        .max()
        .map_or(Some(0), |highest| highest.checked_add(1))
}

// Scan the destination folder and return the next file name
pub async fn next_filename(folder: &Path) -> std::io::Result<String> {
    let prefix = folder_prefix(folder);
    let mut names = Vec::new();

    let mut entries = fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    let index = next_index(&prefix, &names).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("no index left after {}-{}.{}", prefix, u64::MAX, VIDEO_EXTENSION),
        )
    })?;
    Ok(file_name_for(&prefix, index))
}
