//! Build information captured at compile time.

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash (7 chars), or `unknown` outside a checkout.
pub const BUILD_HASH: &str = env!("BUILD_HASH");

const BUILD_DIRTY_STR: &str = env!("BUILD_DIRTY");

fn is_dirty() -> bool {
    BUILD_DIRTY_STR == "true"
}

/// Full version string reported by `--version` and logged at startup.
///
/// Format: `0.3.0 (abc1234)` or `0.3.0 (abc1234*)` if dirty.
#[must_use]
pub fn version_string() -> String {
    if is_dirty() {
        format!("{VERSION} ({BUILD_HASH}*)")
    } else {
        format!("{VERSION} ({BUILD_HASH})")
    }
}
