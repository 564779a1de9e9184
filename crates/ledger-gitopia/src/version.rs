//! App version decoding and compatibility policies.
//!
//! After the app name and version are loaded, a session runs a
//! [`CompatibilityPolicy`] before it is handed to the caller. The default
//! [`AcceptAll`] policy lets every version through; [`MinimumVersion`]
//! enforces a per-app floor.

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{COSMOS_APP_NAME, GITOPIA_APP_NAME};
use crate::error::{Error, Result};

/// Version reported by the user app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    /// App mode flag (e.g. test mode).
    pub app_mode: u8,
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl VersionInfo {
    /// Length of the version response.
    pub const LEN: usize = 4;

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(app_mode: u8, major: u8, minor: u8, patch: u8) -> Self {
        Self {
            app_mode,
            major,
            minor,
            patch,
        }
    }

    /// Decodes the first four bytes of a version response.
    ///
    /// Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if fewer than four bytes are present.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_gitopia::VersionInfo;
    ///
    /// let version = VersionInfo::from_response(&[0, 2, 1, 7]).unwrap();
    /// assert_eq!(version, VersionInfo::new(0, 2, 1, 7));
    /// ```
    pub fn from_response(response: &[u8]) -> Result<Self> {
        match response {
            [app_mode, major, minor, patch, ..] => {
                Ok(Self::new(*app_mode, *major, *minor, *patch))
            }
            _ => Err(Error::InvalidResponse(format!(
                "version response is {} bytes long, expected at least {}",
                response.len(),
                Self::LEN
            ))),
        }
    }

    /// Orders two versions by `(major, minor, patch)`, ignoring the app mode.
    #[must_use]
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Decides whether a session may use the app that is running on the device.
pub trait CompatibilityPolicy {
    /// Checks the identified app and its version.
    ///
    /// # Errors
    ///
    /// Returns an error if the app or version must not be used.
    fn check(&self, app_name: &str, version: &VersionInfo) -> Result<()>;
}

/// Accepts every app and version.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CompatibilityPolicy for AcceptAll {
    fn check(&self, _app_name: &str, _version: &VersionInfo) -> Result<()> {
        Ok(())
    }
}

/// Requires a minimum release per app name.
///
/// Apps without an entry are rejected with [`Error::UnsupportedApp`].
///
/// # Example
///
/// ```
/// use ledger_gitopia::{CompatibilityPolicy, MinimumVersion, VersionInfo};
///
/// let policy = MinimumVersion::recommended();
/// assert!(policy.check("Cosmos", &VersionInfo::new(0, 2, 1, 0)).is_ok());
/// assert!(policy.check("Cosmos", &VersionInfo::new(0, 2, 0, 9)).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MinimumVersion {
    minimums: Vec<(String, VersionInfo)>,
}

impl MinimumVersion {
    /// Creates an empty policy that rejects every app.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the policy with the minimums known to work with this driver.
    #[must_use]
    pub fn recommended() -> Self {
        Self::new()
            .require(GITOPIA_APP_NAME, VersionInfo::new(0, 0, 1, 0))
            .require(COSMOS_APP_NAME, VersionInfo::new(0, 2, 1, 0))
    }

    /// Sets the minimum version for `app_name`, replacing any previous entry.
    #[must_use]
    pub fn require(mut self, app_name: &str, minimum: VersionInfo) -> Self {
        self.minimums.retain(|(name, _)| name != app_name);
        self.minimums.push((app_name.to_string(), minimum));
        self
    }
}

impl CompatibilityPolicy for MinimumVersion {
    fn check(&self, app_name: &str, version: &VersionInfo) -> Result<()> {
        let (_, required) = self
            .minimums
            .iter()
            .find(|(name, _)| name == app_name)
            .ok_or_else(|| Error::UnsupportedApp(app_name.to_string()))?;

        if version.cmp_release(required).is_lt() {
            return Err(Error::VersionUnsupported {
                required: *required,
                found: *version,
            });
        }

        Ok(())
    }
}
