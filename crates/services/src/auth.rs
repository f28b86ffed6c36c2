use std::sync::Arc;

use remote::{AccountType, AuthClient, AuthSession, Credentials, Registration};

use crate::error::AuthError;

/// Sign-up, sign-in and sign-out against the remote backend.
///
/// Input is checked locally before any request is sent. The service keeps no
/// token of its own; callers hold the returned `AuthSession`.
#[derive(Clone)]
pub struct AuthService {
    client: Arc<dyn AuthClient>,
}

fn required(field: &'static str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value.to_owned())
}

fn email(value: &str) -> Result<String, AuthError> {
    let value = required("email", value)?;
    match value.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(value),
        _ => Err(AuthError::InvalidEmail(value)),
    }
}

impl AuthService {
    #[must_use]
    pub fn new(client: Arc<dyn AuthClient>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingField` or `AuthError::InvalidEmail` for bad
    /// input, `AuthError::Rejected` when the backend refuses the account.
    pub async fn register(
        &self,
        full_name: &str,
        email_address: &str,
        account_type: AccountType,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let registration = Registration {
            full_name: full_name.trim().to_owned(),
            email: email(email_address)?,
            account_type,
            credentials: Credentials::new(
                required("username", &credentials.username)?,
                required("password", &credentials.password)?,
            ),
        };
        self.client.register(&registration).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for a blank username or password and
    /// `AuthError::Rejected` for wrong credentials.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let credentials = Credentials::new(
            required("username", &credentials.username)?,
            required("password", &credentials.password)?,
        );
        let session = self.client.login(&credentials).await?;
        tracing::info!(username = %session.username, "signed in");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingField` without a token, or the backend error.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let token = required("access token", token)?;
        self.client.logout(&token).await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address, or the
    /// backend error.
    pub async fn request_password_reset(&self, email_address: &str) -> Result<(), AuthError> {
        let address = email(email_address)?;
        self.client.request_password_reset(&address).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote::InMemoryBackend;

    fn service(backend: &InMemoryBackend) -> AuthService {
        AuthService::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn register_then_login_issues_a_token() {
        let backend = InMemoryBackend::new();
        let auth = service(&backend);
        auth.register(
            "Ada Lovelace",
            " ada@example.org ",
            AccountType::Student,
            &Credentials::new(" ada ", "engine"),
        )
        .await
        .unwrap();

        let session = auth
            .login(&Credentials::new("ada", "engine"))
            .await
            .unwrap();
        assert_eq!(session.email, "ada@example.org");
        assert!(backend.is_token_active(&session.token).unwrap());

        auth.logout(&session.token).await.unwrap();
        assert!(!backend.is_token_active(&session.token).unwrap());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let backend = InMemoryBackend::new();
        let auth = service(&backend);
        auth.register(
            "",
            "ada@example.org",
            AccountType::Student,
            &Credentials::new("ada", "engine"),
        )
        .await
        .unwrap();

        let err = auth
            .login(&Credentials::new("ada", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected));
    }

    #[tokio::test]
    async fn bad_input_never_reaches_the_backend() {
        let backend = InMemoryBackend::new();
        let auth = service(&backend);

        let err = auth
            .login(&Credentials::new("ada", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("password")));

        let err = auth.request_password_reset("not-an-email").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert!(backend.password_resets().unwrap().is_empty());

        let err = auth.logout("").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingField(_)));
    }

    #[tokio::test]
    async fn password_reset_is_forwarded() {
        let backend = InMemoryBackend::new();
        service(&backend)
            .request_password_reset("ada@example.org")
            .await
            .unwrap();
        assert_eq!(backend.password_resets().unwrap(), ["ada@example.org"]);
    }
}
