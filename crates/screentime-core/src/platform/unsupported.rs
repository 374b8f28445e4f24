use crate::error::{Result, TrackerError};
use crate::identity::{AppIdentity, IdentityResolver};

pub struct UnsupportedResolver;

impl UnsupportedResolver {
    pub fn connect() -> Result<Self> {
        Err(TrackerError::Resolver(format!(
            "no foreground resolver for {}",
            std::env::consts::OS
        )))
    }
}

impl IdentityResolver for UnsupportedResolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        Ok(None)
    }
}
