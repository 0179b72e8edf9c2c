//! Bundled migration sources.
//!
//! - `AssetSource` holds its units in memory, ordered by id
//! - `DirSource` reads `*.sql` files from a directory, ordered by file name

mod asset;
mod dir;

pub use asset::AssetSource;
pub use dir::DirSource;

/// Join a scope and a unit name into a unit id.
fn scoped_id(scope: &str, name: &str) -> String {
    let scope = scope.trim_matches('/');
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", scope, name)
    }
}
