use anyhow::Result;
use rowbase::{AuthClient, RowbaseClient, RowbaseUrl};

use crate::branding::BrandingCache;
use crate::config::KvittoConfig;
use crate::context::AppContext;
use crate::feed::ActivityFeed;
use crate::gate::{GateState, SessionGate};
use crate::session_store;

/// Build the app context from config and the cached session.
pub fn build_context(config: KvittoConfig) -> Result<AppContext> {
    let url = RowbaseUrl::new(config.backend_url.clone());
    let auth = AuthClient::new(url.clone(), config.anon_key.clone());
    let cached = session_store::load_session()?;

    let mut db = RowbaseClient::new(url, config.anon_key.clone());
    if let Some(session) = &cached {
        db.set_access_token(Some(session.access_token.clone()));
    }

    let gate = SessionGate::new(auth, cached);
    let feed = ActivityFeed::new(db.clone());

    Ok(AppContext {
        config,
        gate,
        db,
        branding: BrandingCache::new(),
        feed,
    })
}

/// Foreground warm-up: revalidate the session and pull the first activity
/// page. Every step is best-effort; a cold start with no network still
/// reaches the prompt.
pub async fn warm_up(ctx: &mut AppContext) {
    if ctx.gate.state() == GateState::SignedOut {
        return;
    }

    match ctx.gate.handle_foreground(&mut ctx.db).await {
        Ok(state) => tracing::debug!("session revalidated: {state:?}"),
        Err(err) => tracing::warn!("session revalidation failed: {err}"),
    }
    ctx.rebind_feed();

    if ctx.gate.state() == GateState::SignedOut {
        return;
    }

    if let Err(err) = ctx.feed.refresh().await {
        tracing::warn!("could not load activity: {err}");
    }
}
