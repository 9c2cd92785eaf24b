use anyhow::{Context, Result};
use rowbase::{AuthClient, AuthError, RowbaseClient, Session, SignUpOutcome};
use rowbase::domain::ProfileUpsert;
use tokio::sync::watch;

use crate::session_store;

/// Top-level UI switch. Only the gate moves between these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    SignedOut,
    NeedsOnboarding,
    Ready,
}

impl GateState {
    /// Launch state, before any profile check has run: a cached session
    /// shows the signed-in UI immediately, the foreground revalidation
    /// refines it.
    pub fn initial(has_cached_session: bool) -> Self {
        if has_cached_session {
            GateState::Ready
        } else {
            GateState::SignedOut
        }
    }
}

/// Signed-in state for a profile row (missing row = fresh account).
fn state_for_profile(display_name: Option<&str>) -> GateState {
    match display_name {
        Some(name) if !name.trim().is_empty() => GateState::Ready,
        _ => GateState::NeedsOnboarding,
    }
}

/// What a sign-up attempt produced for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpResult {
    Active(GateState),
    ConfirmationSent,
}

/// Owns the session and the signed-in/onboarding state machine. Everything
/// else observes it through the watch channel; nothing else mutates session
/// state.
pub struct SessionGate {
    auth: AuthClient,
    session: Option<Session>,
    state_tx: watch::Sender<GateState>,
}

impl SessionGate {
    pub fn new(auth: AuthClient, cached: Option<Session>) -> Self {
        let (state_tx, _) = watch::channel(GateState::initial(cached.is_some()));
        Self {
            auth,
            session: cached,
            state_tx,
        }
    }

    pub fn state(&self) -> GateState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state_tx.subscribe()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn set_state(&self, state: GateState) {
        self.state_tx.send_replace(state);
    }

    /// Adopt a fresh session: persist it, retarget the data client, and run
    /// the onboarding check.
    async fn install(&mut self, session: Session, db: &mut RowbaseClient) -> Result<GateState> {
        db.set_access_token(Some(session.access_token.clone()));
        session_store::save_session(&session).context("Failed to persist session")?;
        self.session = Some(session);
        let state = self.run_onboarding_check(db).await;
        self.set_state(state);
        Ok(state)
    }

    /// Async profile check deciding needs-onboarding vs ready. A failed
    /// check is non-critical: stay Ready and let the next foreground pass
    /// retry.
    async fn run_onboarding_check(&self, db: &RowbaseClient) -> GateState {
        let Some(session) = &self.session else {
            return GateState::SignedOut;
        };
        match db.fetch_profile(session.user.id).await {
            Ok(profile) => state_for_profile(profile.as_ref().map(|p| p.display_name.as_str())),
            Err(err) => {
                tracing::warn!("profile check failed, keeping signed-in state: {err}");
                GateState::Ready
            }
        }
    }

    pub async fn sign_in(
        &mut self,
        email: &str,
        password: &str,
        db: &mut RowbaseClient,
    ) -> Result<GateState> {
        let session = self.auth.sign_in(email, password).await?;
        self.install(session, db).await
    }

    pub async fn sign_in_with_apple(
        &mut self,
        id_token: &str,
        db: &mut RowbaseClient,
    ) -> Result<GateState> {
        let session = self.auth.sign_in_with_apple(id_token).await?;
        self.install(session, db).await
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        db: &mut RowbaseClient,
    ) -> Result<SignUpResult> {
        match self.auth.sign_up(email, password).await? {
            SignUpOutcome::SignedIn(session) => {
                let state = self.install(session, db).await?;
                Ok(SignUpResult::Active(state))
            }
            SignUpOutcome::ConfirmationSent => Ok(SignUpResult::ConfirmationSent),
        }
    }

    /// Deep-linked email confirmation completion.
    pub async fn confirm_email(
        &mut self,
        token_hash: &str,
        db: &mut RowbaseClient,
    ) -> Result<GateState> {
        let session = self.auth.confirm_email(token_hash).await?;
        self.install(session, db).await
    }

    /// Local sign-out always succeeds; the server call is best-effort.
    pub async fn sign_out(&mut self, db: &mut RowbaseClient) -> Result<()> {
        if let Some(session) = &self.session {
            if let Err(err) = self.auth.sign_out(&session.access_token).await {
                tracing::warn!("server sign-out failed: {err}");
            }
        }
        self.session = None;
        db.set_access_token(None);
        session_store::clear_session().context("Failed to clear session cache")?;
        self.set_state(GateState::SignedOut);
        Ok(())
    }

    /// App-foreground revalidation: refresh the token and re-run the
    /// onboarding check. A dead refresh token signs the user out; a
    /// transport failure keeps the current state for a later retry.
    pub async fn handle_foreground(&mut self, db: &mut RowbaseClient) -> Result<GateState> {
        let Some(session) = self.session.clone() else {
            self.set_state(GateState::SignedOut);
            return Ok(GateState::SignedOut);
        };

        match self.auth.refresh(&session.refresh_token).await {
            Ok(fresh) => self.install(fresh, db).await,
            Err(AuthError::Transport(err)) => {
                tracing::warn!("session revalidation skipped (transport): {err}");
                Ok(self.state())
            }
            Err(err) => {
                tracing::info!("cached session rejected, signing out: {err}");
                self.session = None;
                db.set_access_token(None);
                session_store::clear_session().context("Failed to clear session cache")?;
                self.set_state(GateState::SignedOut);
                Ok(GateState::SignedOut)
            }
        }
    }

    /// NeedsOnboarding → Ready once the display name is saved.
    pub async fn complete_onboarding(
        &mut self,
        display_name: &str,
        db: &RowbaseClient,
    ) -> Result<GateState> {
        let session = self
            .session
            .as_ref()
            .context("Cannot complete onboarding while signed out")?;
        db.upsert_profile(&ProfileUpsert {
            user_id: session.user.id,
            display_name: display_name.trim().to_string(),
        })
        .await
        .context("Failed to save profile")?;
        self.set_state(GateState::Ready);
        Ok(GateState::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_state_follows_cached_session() {
        assert_eq!(GateState::initial(true), GateState::Ready);
        assert_eq!(GateState::initial(false), GateState::SignedOut);
    }

    #[test]
    fn empty_display_name_needs_onboarding() {
        assert_eq!(state_for_profile(None), GateState::NeedsOnboarding);
        assert_eq!(state_for_profile(Some("   ")), GateState::NeedsOnboarding);
        assert_eq!(state_for_profile(Some("Dana")), GateState::Ready);
    }

    #[tokio::test]
    async fn state_changes_are_broadcast() {
        let auth = AuthClient::new(rowbase::RowbaseUrl::new("http://127.0.0.1:1"), "anon");
        let gate = SessionGate::new(auth, None);
        let mut rx = gate.subscribe();
        assert_eq!(*rx.borrow(), GateState::SignedOut);

        gate.set_state(GateState::NeedsOnboarding);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), GateState::NeedsOnboarding);
    }

    #[tokio::test]
    async fn foreground_without_session_stays_signed_out() {
        let url = rowbase::RowbaseUrl::new("http://127.0.0.1:1");
        let auth = AuthClient::new(url.clone(), "anon");
        let mut db = RowbaseClient::new(url, "anon");
        let mut gate = SessionGate::new(auth, None);
        let state = gate.handle_foreground(&mut db).await.unwrap();
        assert_eq!(state, GateState::SignedOut);
    }
}
