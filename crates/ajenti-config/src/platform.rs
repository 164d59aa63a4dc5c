//! Platform family detection.
//!
//! The daemon adapts some behaviour to the distribution family it runs on. The
//! family is either supplied through `--set-platform` or derived from the
//! `ID` and `ID_LIKE` keys of `/etc/os-release`.

use std::fmt;

/// Location of the os-release file consulted during detection.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

const UNKNOWN: &str = "unknown";

const FAMILIES: &[(&str, &[&str])] = &[
    (
        "debian",
        &["debian", "ubuntu", "linuxmint", "raspbian", "elementary", "pop"],
    ),
    (
        "centos",
        &["centos", "rhel", "fedora", "rocky", "almalinux", "ol", "amzn"],
    ),
    ("arch", &["arch", "manjaro", "endeavouros"]),
    ("gentoo", &["gentoo"]),
    ("suse", &["suse", "sles", "opensuse", "opensuse-leap", "opensuse-tumbleweed"]),
    ("mageia", &["mageia"]),
    ("alpine", &["alpine"]),
];

/// Platform family the daemon runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform(String);

impl Platform {
    /// Builds a platform from an explicit override.
    #[must_use]
    pub fn named(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim().to_lowercase();
        if name.is_empty() {
            Self::unknown()
        } else {
            Self(name)
        }
    }

    /// The fallback family used when detection fails.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN.to_owned())
    }

    /// Resolves the platform, preferring the override when present.
    #[must_use]
    pub fn resolve(overridden: Option<&str>, os_release: Option<&str>) -> Self {
        match overridden {
            Some(name) => Self::named(name),
            None => os_release.map_or_else(Self::unknown, Self::from_os_release),
        }
    }

    /// Maps os-release contents onto a platform family.
    #[must_use]
    pub fn from_os_release(contents: &str) -> Self {
        let id = os_release_value(contents, "ID");
        let like = os_release_value(contents, "ID_LIKE");
        let candidates = id
            .iter()
            .map(String::as_str)
            .chain(like.iter().flat_map(|value| value.split_whitespace()));
        for candidate in candidates {
            if let Some(family) = family_of(candidate) {
                return Self(family.to_owned());
            }
        }
        Self::unknown()
    }

    /// Returns the family name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when detection did not recognise the host.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

fn os_release_value(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (name, value) = line.trim().split_once('=')?;
        (name == key).then(|| {
            value
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_lowercase()
        })
    })
}

fn family_of(distribution: &str) -> Option<&'static str> {
    FAMILIES
        .iter()
        .find(|(_, members)| members.contains(&distribution))
        .map(|(family, _)| *family)
}
