use crate::error::Result;

/// Name recorded when a foreground window exists but its process can't be resolved.
pub const UNKNOWN_APP: &str = "Unknown";

/// The application owning the foreground window.
///
/// `name` is the identity key (the executable's file name); `path` is only
/// carried along for display and icon lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppIdentity {
    pub name: String,
    pub path: String,
}

impl AppIdentity {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Builds an identity from a full executable path, keyed by its file name.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        match app_name_from_path(&path) {
            Some(name) => Self { name, path },
            None => Self::unknown(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_APP.to_owned(),
            path: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_APP
    }
}

/// Last component of `path`, splitting on both separator styles.
pub fn app_name_from_path(path: &str) -> Option<String> {
    let name = path.rsplit(|c: char| c == '\\' || c == '/').next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_owned())
    }
}

/// Source of the current foreground application.
///
/// `Ok(None)` means there is no foreground window right now. An error means
/// the OS query itself failed. Neither is fatal to the sampler; both forfeit
/// the tick. A window whose process can't be inspected resolves to
/// [`AppIdentity::unknown`].
pub trait IdentityResolver: Send {
    fn resolve(&mut self) -> Result<Option<AppIdentity>>;
}

impl<R: IdentityResolver + ?Sized> IdentityResolver for Box<R> {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        (**self).resolve()
    }
}

/// Resolver that never sees a foreground window.
///
/// Used when the platform resolver can't be brought up; tracking keeps
/// running but attributes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl IdentityResolver for NullResolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_comes_from_last_path_component() {
        assert_eq!(
            app_name_from_path("C:\\Program Files\\Editor\\editor.exe").as_deref(),
            Some("editor.exe")
        );
        assert_eq!(
            app_name_from_path("/usr/lib/firefox/firefox").as_deref(),
            Some("firefox")
        );
        assert_eq!(app_name_from_path("bare.exe").as_deref(), Some("bare.exe"));
    }

    #[test]
    fn trailing_separator_has_no_name() {
        assert_eq!(app_name_from_path("C:\\tools\\"), None);
        assert_eq!(app_name_from_path(""), None);
    }

    #[test]
    fn from_path_falls_back_to_unknown() {
        let identity = AppIdentity::from_path("/opt/");
        assert!(identity.is_unknown());
        assert!(identity.path.is_empty());

        let identity = AppIdentity::from_path("C:\\a.exe");
        assert_eq!(identity.name, "a.exe");
        assert_eq!(identity.path, "C:\\a.exe");
    }

    #[test]
    fn same_file_name_in_different_directories_shares_identity() {
        let a = AppIdentity::from_path("C:\\one\\tool.exe");
        let b = AppIdentity::from_path("D:\\two\\tool.exe");
        assert_eq!(a.name, b.name);
        assert_ne!(a.path, b.path);
    }

    #[test]
    fn null_resolver_reports_no_window() {
        let mut resolver = NullResolver;
        assert!(resolver.resolve().expect("null resolver never fails").is_none());
    }
}
