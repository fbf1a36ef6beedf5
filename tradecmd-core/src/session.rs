//! Signed-in session state
//!
//! The dispatcher consults the session for login gating; handlers update it
//! on sign-in and sign-out.

use std::sync::{Arc, RwLock};

use tradecmd_api::Account;

/// Shared handle to the current account, if any
#[derive(Clone, Debug, Default)]
pub struct Session {
    account: Arc<RwLock<Option<Account>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the signed-in account
    pub fn account(&self) -> Option<Account> {
        self.account.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn username(&self) -> Option<String> {
        self.account().map(|a| a.username)
    }

    pub fn is_authenticated(&self) -> bool {
        self.account
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn sign_in(&self, account: Account) {
        *self.account.write().unwrap_or_else(|e| e.into_inner()) = Some(account);
    }

    pub fn sign_out(&self) {
        *self.account.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Update the credit balance after a transaction
    pub fn set_credits(&self, credits: i64) {
        if let Some(account) = self
            .account
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            account.credits = credits;
        }
    }
}
