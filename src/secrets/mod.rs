//! Thin typed wrappers over the key/value secrets engines.

pub mod kv1;
pub mod kv2;

pub use kv1::KeyValueV1;
pub use kv2::KeyValueV2;

use crate::config::ConfigError;

fn normalize_mount(mount: &str) -> Result<String, ConfigError> {
    let mount = mount.trim().trim_matches('/');
    if mount.is_empty() {
        return Err(ConfigError::EmptyMountPath);
    }
    Ok(mount.to_string())
}

/// Joins `mount` and `path`, percent-encoding each segment so keys holding
/// `?`, `#` or spaces stay inside the path. Slashes keep separating
/// segments, a trailing one included.
fn join(mount: &str, path: &str) -> String {
    format!("{}/{}", encode_path(mount), encode_path(path.trim_start_matches('/')))
}

fn encode_path(path: &str) -> String {
    path.split('/').map(urlencoding::encode).collect::<Vec<_>>().join("/")
}
