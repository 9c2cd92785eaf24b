use anyhow::{bail, Result};
use rowbase::RowbaseClient;
use uuid::Uuid;

use crate::branding::BrandingCache;
use crate::config::KvittoConfig;
use crate::feed::ActivityFeed;
use crate::gate::{GateState, SessionGate};

/// Everything a signed-in flow needs, owned in one place instead of living
/// in process globals. The gate owns session state, the cache owns branding,
/// and both are reachable only through this context.
pub struct AppContext {
    pub config: KvittoConfig,
    pub gate: SessionGate,
    pub db: RowbaseClient,
    pub branding: BrandingCache,
    pub feed: ActivityFeed,
}

impl AppContext {
    /// The feed carries its own client clone for background calls; rebind it
    /// whenever the access token changes (sign-in, refresh, sign-out).
    pub fn rebind_feed(&mut self) {
        self.feed = ActivityFeed::new(self.db.clone());
    }

    /// The signed-in user id, or a friendly instruction to sign in.
    pub fn require_user(&self) -> Result<Uuid> {
        if self.gate.state() == GateState::SignedOut {
            bail!("Not signed in. Run `kvitto login` first.");
        }
        match self.gate.session() {
            Some(session) => Ok(session.user.id),
            None => bail!("Not signed in. Run `kvitto login` first."),
        }
    }
}
