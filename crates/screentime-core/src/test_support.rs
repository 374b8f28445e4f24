//! Shared test utilities for the tracking core.

#![cfg(test)]

use std::collections::VecDeque;

use crate::error::{Result, TrackerError};
use crate::identity::{AppIdentity, IdentityResolver};

/// One scripted resolver answer.
#[derive(Debug, Clone)]
pub enum Scripted {
    App(AppIdentity),
    NoWindow,
    Fail,
}

impl Scripted {
    pub fn app(name: &str) -> Self {
        Self::App(AppIdentity::new(name, format!("C:\\apps\\{name}")))
    }
}

/// Replays a fixed sequence of answers, then either repeats a fallback
/// identity or reports no window.
pub struct ScriptedResolver {
    script: VecDeque<Scripted>,
    fallback: Option<AppIdentity>,
}

impl ScriptedResolver {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: script.into(),
            fallback: None,
        }
    }

    pub fn repeating(app: AppIdentity) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Some(app),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl IdentityResolver for ScriptedResolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        match self.script.pop_front() {
            Some(Scripted::App(app)) => Ok(Some(app)),
            Some(Scripted::NoWindow) => Ok(None),
            Some(Scripted::Fail) => Err(TrackerError::Resolver("scripted failure".to_owned())),
            None => Ok(self.fallback.clone()),
        }
    }
}
