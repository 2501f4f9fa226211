use url::Url;

/// Location of the exported snapshot relative to the page that hosts the dashboard.
pub const SNAPSHOT_RELATIVE_PATH: &str = "data/snapshot.json";

/// Resolves the snapshot URL for a dashboard served from `page`.
///
/// The dashboard may live under an arbitrary subpath. A page path that does
/// not end in `/` is treated as a file when its last segment contains a dot
/// (`/dash/index.html` → `/dash/`) and as a directory otherwise
/// (`/dash` → `/dash/`).
pub fn snapshot_url(page: &Url) -> Url {
    let mut base = page.path().to_string();
    if !base.ends_with('/') {
        let last_segment = base.rsplit('/').next().unwrap_or_default();
        if last_segment.contains('.') {
            let keep = base.rfind('/').map_or(0, |idx| idx + 1);
            base.truncate(keep);
        } else {
            base.push('/');
        }
    }
    if !base.starts_with('/') {
        base.insert(0, '/');
    }

    let mut url = page.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(&format!("{base}{SNAPSHOT_RELATIVE_PATH}"));
    url
}
