//! Native foreground resolvers.
//!
//! Every platform exposes `NativeResolver::connect()`. Where no native
//! implementation exists, `connect` fails and callers fall back to
//! [`NullResolver`].

use crate::identity::{IdentityResolver, NullResolver};

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use self::windows::WindowsResolver as NativeResolver;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use self::linux::X11Resolver as NativeResolver;

#[cfg(not(any(windows, target_os = "linux")))]
mod unsupported;

#[cfg(not(any(windows, target_os = "linux")))]
pub use self::unsupported::UnsupportedResolver as NativeResolver;

/// The platform resolver, or a [`NullResolver`] if it can't be brought up.
/// Tracking keeps running either way.
pub fn native_or_null() -> Box<dyn IdentityResolver> {
    match NativeResolver::connect() {
        Ok(resolver) => Box::new(resolver),
        Err(err) => {
            log::error!("foreground resolver unavailable, nothing will be tracked: {err}");
            Box::new(NullResolver)
        }
    }
}
