//! One-way open → sealed lifecycle shared by the configurers.

use usman_core::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SealState {
    /// Still accepting mutation.
    #[default]
    Open,
    /// Frozen; every mutator fails from here on.
    Sealed,
}

impl SealState {
    pub fn is_sealed(&self) -> bool {
        matches!(self, SealState::Sealed)
    }

    /// Fail with [`ConfigError::Sealed`] unless still open.
    pub fn ensure_open(&self, component: &'static str) -> ConfigResult<()> {
        match self {
            SealState::Open => Ok(()),
            SealState::Sealed => Err(ConfigError::sealed(component)),
        }
    }

    /// Move to `Sealed`. There is no way back.
    pub fn seal(&mut self, component: &'static str) -> ConfigResult<()> {
        self.ensure_open(component)?;
        *self = SealState::Sealed;
        tracing::info!(component, "configuration sealed");
        Ok(())
    }
}
