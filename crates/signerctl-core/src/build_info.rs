//! Build-time metadata embedded by the build script.

/// The git commit hash at build time (short form).
pub const GIT_HASH: &str = env!("SIGNERCTL_GIT_HASH");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("SIGNERCTL_BUILD_PROFILE");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line shown by `signerctl --version`.
///
/// Example: `"0.1.0 (abc1234, release)"`
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SIGNERCTL_GIT_HASH"),
    ", ",
    env!("SIGNERCTL_BUILD_PROFILE"),
    ")"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_version_mentions_parts() {
        assert!(LONG_VERSION.starts_with(VERSION));
        assert!(LONG_VERSION.contains(GIT_HASH));
        assert!(LONG_VERSION.ends_with(&format!("{BUILD_PROFILE})")));
    }

    #[test]
    fn test_build_profile() {
        assert_eq!(BUILD_PROFILE, "debug");
    }
}
