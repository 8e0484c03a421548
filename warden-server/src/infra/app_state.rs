use std::{fmt, sync::Arc};

use warden_core::application::AccountService;

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub accounts: Arc<AccountService>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Arc<Config>, accounts: Arc<AccountService>) -> Self {
        Self { config, accounts }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }
}
