//! Sign-in state collaborator.
//!
//! # Responsibility
//! - Expose `is_authenticated` / `sign_in` / `sign_out` to the host UI.
//! - Keep the placeholder token in the key/value store so the state
//!   survives restarts.
//!
//! # Invariants
//! - The catalog never depends on this module.
//! - `is_authenticated` is true iff a token is stored.

use crate::kv::{KeyValueStore, KvResult};
use log::info;

/// Key the session token is stored under.
pub const AUTH_TOKEN_KEY: &str = "auth-token";
const DUMMY_TOKEN: &str = "dummy-auth-token";

/// Authentication collaborator contract.
pub trait AuthSession {
    fn is_authenticated(&self) -> KvResult<bool>;
    fn sign_in(&mut self) -> KvResult<()>;
    fn sign_out(&mut self) -> KvResult<()>;
}

/// Placeholder authentication that accepts everyone.
pub struct DummyTokenAuth<S: KeyValueStore> {
    kv: S,
}

impl<S: KeyValueStore> DummyTokenAuth<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }
}

impl<S: KeyValueStore> AuthSession for DummyTokenAuth<S> {
    fn is_authenticated(&self) -> KvResult<bool> {
        Ok(self.kv.get(AUTH_TOKEN_KEY)?.is_some())
    }

    fn sign_in(&mut self) -> KvResult<()> {
        self.kv.set(AUTH_TOKEN_KEY, DUMMY_TOKEN)?;
        info!("event=sign_in module=auth status=ok");
        Ok(())
    }

    fn sign_out(&mut self) -> KvResult<()> {
        self.kv.remove(AUTH_TOKEN_KEY)?;
        info!("event=sign_out module=auth status=ok");
        Ok(())
    }
}
