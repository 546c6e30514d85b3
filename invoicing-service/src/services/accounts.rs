//! Registration, login and password management.

use chrono::{Duration, Utc};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Company, CreateUser, NewActivity, SanitizedUser, UpdateProfile, User};
use crate::services::activity;
use crate::services::email::{EmailMessage, EmailProvider};
use crate::services::jwt::JwtService;
use crate::services::metrics::EMAILS_TOTAL;
use crate::services::store::InvoicingStore;
use crate::services::templates;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// How long a password reset link stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Input for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: Password,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Token issued at login or registration.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthSession {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub expires_in: i64,
    pub user: SanitizedUser,
    pub company: Company,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn random_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn ensure_password_length(password: &Password) -> Result<(), AppError> {
    if password.is_long_enough() {
        Ok(())
    } else {
        Err(AppError::BadRequest(anyhow::anyhow!(
            "Password must be at least {} characters",
            crate::utils::password::MIN_PASSWORD_LENGTH
        )))
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn InvoicingStore>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    app_base_url: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn InvoicingStore>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        app_base_url: String,
    ) -> Self {
        Self {
            store,
            email,
            jwt,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn session(&self, user: User, company: Company) -> Result<AuthSession, AppError> {
        let access_token = self
            .jwt
            .generate_access_token(user.user_id, &user.email)
            .map_err(AppError::InternalError)?;
        Ok(AuthSession {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.expiry_seconds(),
            user: user.into(),
            company,
        })
    }

    async fn company_of(&self, user_id: Uuid) -> Result<Company, AppError> {
        self.store
            .get_company_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))
    }

    /// Send without failing the caller.
    async fn send_best_effort(&self, template: &str, message: EmailMessage) {
        match self.email.send(&message).await {
            Ok(()) => {
                EMAILS_TOTAL.with_label_values(&[template, "sent"]).inc();
            }
            Err(e) => {
                EMAILS_TOTAL.with_label_values(&[template, "failed"]).inc();
                warn!(template, error = %e, "Email not delivered");
            }
        }
    }

    async fn record(&self, activity: NewActivity) {
        activity::record(self.store.as_ref(), activity).await;
    }

    #[instrument(skip(self, input, ip), fields(email = %input.email))]
    pub async fn register(&self, input: NewAccount, ip: Option<String>) -> Result<AuthSession, AppError> {
        ensure_password_length(&input.password)?;
        let email = normalize_email(&input.email);

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!("Email already registered")));
        }

        let password_hash = hash_password(&input.password).map_err(AppError::InternalError)?;
        let verification_token = random_token();

        let create = CreateUser {
            email,
            password_hash: password_hash.into_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            phone: input.phone,
            verification_token: Some(verification_token.clone()),
        };
        let company_name = format!("{} {}", create.first_name, create.last_name);
        let (user, company) = self.store.create_account(&create, &company_name).await?;

        info!(user_id = %user.user_id, company_id = %company.company_id, "Account registered");
        self.record(NewActivity::new(user.user_id, "register").entity("user", user.user_id).ip(ip))
            .await;

        let verify_url = format!("{}/auth/verify?token={}", self.app_base_url, verification_token);
        self.send_best_effort("welcome", templates::welcome_email(&user, &verify_url))
            .await;

        self.session(user, company)
    }

    #[instrument(skip(self, email, password, ip))]
    pub async fn login(&self, email: &str, password: &Password, ip: Option<String>) -> Result<AuthSession, AppError> {
        let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"));

        let user = self
            .store
            .get_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        verify_password(password, &PasswordHashString::new(user.password_hash.clone()))
            .map_err(|_| invalid())?;

        if !user.is_active {
            return Err(AppError::Forbidden(anyhow::anyhow!("Account is disabled")));
        }

        self.store.record_login(user.user_id, Utc::now()).await?;
        let user = self.store.get_user(user.user_id).await?.ok_or_else(invalid)?;
        let company = self.company_of(user.user_id).await?;

        info!(user_id = %user.user_id, "User logged in");
        self.record(NewActivity::new(user.user_id, "login").ip(ip)).await;

        self.session(user, company)
    }

    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<(), AppError> {
        let user = self
            .store
            .get_user_by_verification_token(token)
            .await?
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid verification link")))?;
        self.store.mark_user_verified(user.user_id).await?;
        info!(user_id = %user.user_id, "Email verified");
        Ok(())
    }

    /// Email a reset link. Unknown addresses are ignored silently.
    #[instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.store.get_user_by_email(&normalize_email(email)).await? else {
            return Ok(());
        };

        let token = random_token();
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.store.set_reset_token(user.user_id, &token, expires).await?;

        let reset_url = format!("{}/auth/reset-password?token={}", self.app_base_url, token);
        self.send_best_effort("password_reset", templates::password_reset_email(&user, &reset_url))
            .await;
        Ok(())
    }

    #[instrument(skip(self, token, password))]
    pub async fn reset_password(&self, token: &str, password: &Password) -> Result<(), AppError> {
        ensure_password_length(password)?;
        let invalid = || AppError::BadRequest(anyhow::anyhow!("Invalid or expired reset link"));

        let user = self
            .store
            .get_user_by_reset_token(token)
            .await?
            .ok_or_else(invalid)?;
        match user.reset_token_expires_utc {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(invalid()),
        }

        let hash = hash_password(password).map_err(AppError::InternalError)?;
        self.store.set_password(user.user_id, hash.as_str()).await?;
        info!(user_id = %user.user_id, "Password reset");
        self.record(NewActivity::new(user.user_id, "password_reset").entity("user", user.user_id))
            .await;
        Ok(())
    }

    pub async fn me(&self, user_id: Uuid) -> Result<(SanitizedUser, Company), AppError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
        let company = self.company_of(user_id).await?;
        Ok((user.into(), company))
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(&self, user_id: Uuid, input: &UpdateProfile) -> Result<SanitizedUser, AppError> {
        let user = self
            .store
            .update_profile(user_id, input)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
        Ok(user.into())
    }

    #[instrument(skip(self, current, new, ip))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: &Password,
        new: &Password,
        ip: Option<String>,
    ) -> Result<(), AppError> {
        ensure_password_length(new)?;
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

        verify_password(current, &PasswordHashString::new(user.password_hash.clone()))
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Current password is incorrect")))?;

        let hash = hash_password(new).map_err(AppError::InternalError)?;
        self.store.set_password(user_id, hash.as_str()).await?;

        info!(user_id = %user_id, "Password changed");
        self.record(NewActivity::new(user_id, "password_change").entity("user", user_id).ip(ip))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::email::MockEmailProvider;
    use crate::services::in_memory::InMemoryStore;

    fn service() -> (AccountService, Arc<InMemoryStore>, Arc<MockEmailProvider>) {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(MockEmailProvider::new(true));
        let jwt = JwtService::new(&JwtConfig {
            secret: "test".to_string(),
            expiry_minutes: 60,
        })
        .unwrap();
        (
            AccountService::new(store.clone(), email.clone(), jwt, "http://app.test/".to_string()),
            store,
            email,
        )
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: Password::new("slaptazodis".to_string()),
            first_name: "Ona".to_string(),
            last_name: "Onaitė".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_creates_company_and_sends_welcome() {
        let (service, _, email) = service();
        let session = service.register(account(" Ona@Example.LT "), None).await.unwrap();

        assert_eq!(session.user.email, "ona@example.lt");
        assert_eq!(session.company.name, "Ona Onaitė");
        assert_eq!(session.company.invoice_prefix, "SF");
        let welcome = email.last_message().unwrap();
        assert!(welcome.body_text.contains("http://app.test/auth/verify?token="));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (service, _, _) = service();
        service.register(account("ona@example.lt"), None).await.unwrap();
        let err = service.register(account("ONA@example.lt"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn registration_survives_email_failure() {
        let (service, _, email) = service();
        email.set_failing(true);
        assert!(service.register(account("ona@example.lt"), None).await.is_ok());
    }

    #[tokio::test]
    async fn login_checks_password() {
        let (service, _, _) = service();
        service.register(account("ona@example.lt"), None).await.unwrap();

        let ok = service
            .login("ona@example.lt", &Password::new("slaptazodis".to_string()), None)
            .await
            .unwrap();
        assert!(ok.user.last_login_utc.is_some());

        let err = service
            .login("ona@example.lt", &Password::new("neteisingas".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn reset_flow_replaces_password() {
        let (service, store, _) = service();
        service.register(account("ona@example.lt"), None).await.unwrap();
        service.forgot_password("ona@example.lt").await.unwrap();

        let user = store.get_user_by_email("ona@example.lt").await.unwrap().unwrap();
        let token = user.reset_token.clone().unwrap();
        service
            .reset_password(&token, &Password::new("naujas-slaptazodis".to_string()))
            .await
            .unwrap();

        assert!(service
            .login("ona@example.lt", &Password::new("naujas-slaptazodis".to_string()), None)
            .await
            .is_ok());
        assert!(service
            .reset_password(&token, &Password::new("dar-kitas-123".to_string()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_silent() {
        let (service, _, email) = service();
        service.forgot_password("nobody@example.lt").await.unwrap();
        assert_eq!(email.send_count(), 0);
    }
}
