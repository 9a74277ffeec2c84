use crate::identity::{Identity, IdentityError};
use crate::oauth2::{ProviderProfile, ProviderTokens};
use crate::userdb::User;

use super::controller::OAuthFlowController;
use super::types::{CallbackError, FlowErrorCode};

fn server_error(e: impl std::fmt::Display) -> CallbackError {
    CallbackError::new(FlowErrorCode::ServerError, e.to_string())
}

impl OAuthFlowController {
    /// Resolve the local user a login callback signs in, creating the user
    /// and the identity binding as needed.
    ///
    /// Order: an existing binding, then a user with the same verified email,
    /// then a new user when registration is open.
    pub(super) async fn resolve_login(
        &self,
        provider: &str,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<User, CallbackError> {
        if let Some(identity) = self
            .identities
            .get_by_provider(provider, &profile.provider_user_id)
            .await
            .map_err(server_error)?
        {
            if let Err(e) = self
                .identities
                .update_login(identity.refreshed(profile, tokens))
                .await
            {
                tracing::warn!(error = %e, "Failed to refresh identity tokens");
            }
            return self.active_owner(&identity).await;
        }

        let (user, created) = match self.user_for_verified_email(profile).await? {
            Some(user) => (user, false),
            None => (self.register_user(provider, profile).await?, true),
        };

        match self
            .identities
            .insert(Identity::new(&user.id, provider, profile, tokens))
            .await
        {
            Ok(_) => {
                tracing::info!(user_id = %user.id, created, "Bound provider identity to user");
                Ok(user)
            }
            Err(IdentityError::AlreadyExists(_)) => {
                // A concurrent callback for the same subject won the insert.
                let winner = self
                    .identities
                    .get_by_provider(provider, &profile.provider_user_id)
                    .await
                    .map_err(server_error)?
                    .ok_or_else(|| {
                        CallbackError::new(
                            FlowErrorCode::IdentityCreationFailed,
                            "conflicting identity vanished",
                        )
                    })?;
                if created && winner.user_id != user.id {
                    self.discard_user(&user).await;
                }
                self.active_owner(&winner).await
            }
            Err(e) if self.config.strict_identity_persistence => {
                if created {
                    self.discard_user(&user).await;
                }
                Err(CallbackError::new(
                    FlowErrorCode::IdentityCreationFailed,
                    e.to_string(),
                ))
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Signing in without a persisted identity");
                Ok(user)
            }
        }
    }

    /// Bind the provider account to `link_user_id`, or refresh the binding
    /// when it already belongs to that user.
    pub(super) async fn resolve_link(
        &self,
        link_user_id: &str,
        provider: &str,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<(), CallbackError> {
        if self
            .users
            .get_user(link_user_id)
            .await
            .map_err(server_error)?
            .is_none()
        {
            return Err(CallbackError::new(
                FlowErrorCode::UserNotFound,
                format!("link target {link_user_id} no longer exists"),
            ));
        }

        if let Some(existing) = self
            .identities
            .get_by_provider(provider, &profile.provider_user_id)
            .await
            .map_err(server_error)?
        {
            return self.refresh_owned(existing, link_user_id, profile, tokens).await;
        }

        match self
            .identities
            .insert(Identity::new(link_user_id, provider, profile, tokens))
            .await
        {
            Ok(_) => Ok(()),
            Err(IdentityError::AlreadyExists(_)) => {
                let existing = self
                    .identities
                    .get_by_provider(provider, &profile.provider_user_id)
                    .await
                    .map_err(server_error)?
                    .ok_or_else(|| {
                        CallbackError::new(
                            FlowErrorCode::IdentityCreationFailed,
                            "conflicting identity vanished",
                        )
                    })?;
                self.refresh_owned(existing, link_user_id, profile, tokens).await
            }
            Err(e) => Err(CallbackError::new(
                FlowErrorCode::IdentityCreationFailed,
                e.to_string(),
            )),
        }
    }

    async fn refresh_owned(
        &self,
        existing: Identity,
        link_user_id: &str,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<(), CallbackError> {
        if existing.user_id != link_user_id {
            return Err(CallbackError::new(
                FlowErrorCode::AlreadyLinked,
                "provider account is bound to another user",
            ));
        }
        self.identities
            .update_login(existing.refreshed(profile, tokens))
            .await
            .map_err(server_error)?;
        Ok(())
    }

    async fn active_owner(&self, identity: &Identity) -> Result<User, CallbackError> {
        let user = self
            .users
            .get_user(&identity.user_id)
            .await
            .map_err(server_error)?
            .ok_or_else(|| {
                CallbackError::new(
                    FlowErrorCode::UserNotFound,
                    format!("identity {} points at a missing user", identity.id),
                )
            })?;
        if user.is_disabled() {
            return Err(CallbackError::new(
                FlowErrorCode::AccountDisabled,
                format!("user {} is disabled", user.id),
            ));
        }
        Ok(user)
    }

    async fn user_for_verified_email(
        &self,
        profile: &ProviderProfile,
    ) -> Result<Option<User>, CallbackError> {
        let Some(email) = profile.verified_email() else {
            return Ok(None);
        };
        let Some(user) = self
            .users
            .get_user_by_email(email)
            .await
            .map_err(server_error)?
        else {
            return Ok(None);
        };
        if user.is_disabled() {
            return Err(CallbackError::new(
                FlowErrorCode::AccountDisabled,
                format!("user {} is disabled", user.id),
            ));
        }
        tracing::info!(user_id = %user.id, "Matched existing user by verified email");
        Ok(Some(user))
    }

    async fn register_user(
        &self,
        provider: &str,
        profile: &ProviderProfile,
    ) -> Result<User, CallbackError> {
        if !self.config.allow_registration {
            return Err(CallbackError::new(
                FlowErrorCode::RegistrationDisabled,
                "registration is closed",
            ));
        }

        // Only a verified email may later serve as an email-match target.
        let email = profile.verified_email().unwrap_or_default().to_string();
        let user = User::new(email, display_name(provider, profile));
        self.users.create_user(user).await.map_err(|e| {
            CallbackError::new(FlowErrorCode::UserCreationFailed, e.to_string())
        })
    }

    /// Best-effort removal of a user created for a login that did not complete.
    async fn discard_user(&self, user: &User) {
        if let Err(e) = self.users.delete_user(&user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to remove orphaned user");
        }
    }
}

/// Profile name, else the email's local part, else `<provider> user`.
fn display_name(provider: &str, profile: &ProviderProfile) -> String {
    if let Some(name) = profile.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if let Some(local) = profile
        .email
        .as_deref()
        .and_then(|e| e.split('@').next())
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        return local.to_string();
    }
    format!("{provider} user")
}
