//! Storage namespaces derived from the signed-in identity.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity used when nobody is signed in.
pub const ANONYMOUS: u64 = 0;

/// Where the current user identity comes from.
///
/// Polled every time the store is (re)configured, so implementations should
/// be cheap.
pub trait IdentityProvider {
    fn current(&self) -> u64;
}

pub type IdentityHandle = Arc<dyn IdentityProvider + Send + Sync>;

/// An identity that never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIdentity(pub u64);
impl IdentityProvider for FixedIdentity {
    fn current(&self) -> u64 {
        self.0
    }
}

/// Switchable at runtime, e.g. on sign-in and sign-out.
impl IdentityProvider for AtomicU64 {
    fn current(&self) -> u64 {
        self.load(Ordering::Acquire)
    }
}

/// Storage namespace of one identity, rendered as `user_<identity>`.
///
/// Every file belonging to the namespace starts with this name followed by a
/// dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace(u64);
impl Namespace {
    pub fn from_identity(identity: u64) -> Self {
        Self(identity)
    }
}
impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "user_{}", self.0)
    }
}
