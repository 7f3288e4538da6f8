//! Secret service: the boundary every front end talks to.
//!
//! `create`/`fetch`/`exists`/`sweep` are the storage-facing operations and
//! only ever see ciphertext. `seal`/`reveal` add the client half (composition
//! and the retrieval state machine) with the PBKDF2 work moved onto Tokio's
//! blocking pool.

use std::{sync::Arc, time::Duration};

use onceread_core::{
    CreateRequest, EnvelopeDraft, EnvelopeId, Environment, Protection, Retrieval,
    RetrievalStatus, RevealedSecret, SecretError, SecretInput, SecretStore, ShareLink,
    WireEnvelope, compose,
    limits::{MAX_TTL, validate_encrypted_content, validate_ttl},
};
use onceread_crypto::DecryptionError;
use url::Url;

use crate::{error::ServerError, storage::Storage, store::EphemeralStore};

/// Base URL used for share links when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Origin (and optional path prefix) share links are built on
    pub base_url: Url,
    /// Longest lifetime a secret may be created with
    pub max_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let Ok(base_url) = Url::parse(DEFAULT_BASE_URL) else {
            unreachable!("DEFAULT_BASE_URL is a valid absolute URL")
        };
        Self { base_url, max_ttl: MAX_TTL }
    }
}

struct Inner<E: Environment, S: Storage> {
    config: ServiceConfig,
    store: EphemeralStore<E, S>,
}

/// One-time secret service over a storage backend.
///
/// Clone is cheap (Arc) and clones share the store.
pub struct SecretService<E: Environment, S: Storage> {
    inner: Arc<Inner<E, S>>,
}

impl<E: Environment, S: Storage> Clone for SecretService<E, S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Environment, S: Storage> SecretService<E, S> {
    /// Create a service storing envelopes in `storage`.
    pub fn new(env: E, storage: S, config: ServiceConfig) -> Self {
        Self { inner: Arc::new(Inner { config, store: EphemeralStore::new(env, storage) }) }
    }

    /// Active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Underlying store.
    pub fn store(&self) -> &EphemeralStore<E, S> {
        &self.inner.store
    }

    /// Validate a submission and store it.
    ///
    /// Only the shape of the content is checked (base64, size, minimum
    /// sealed length); its plaintext is never available here.
    pub fn create(&self, request: CreateRequest) -> Result<EnvelopeId, SecretError> {
        validate_encrypted_content(&request.encrypted_content)?;
        let ttl = request.ttl();
        validate_ttl(ttl, self.inner.config.max_ttl)?;
        let metadata = request.metadata()?;

        let draft = EnvelopeDraft {
            ciphertext: request.encrypted_content,
            password_protected: request.password_protected,
            metadata,
        };
        self.inner.store.put(draft, ttl)
    }

    /// The single destructive read.
    ///
    /// Malformed, unknown, expired and already-consumed ids are all
    /// `NotFound`.
    pub fn fetch(&self, id: &str) -> Result<WireEnvelope, SecretError> {
        let Ok(id) = id.parse::<EnvelopeId>() else {
            tracing::debug!("fetch with malformed id");
            return Err(SecretError::NotFound);
        };
        self.inner.store.get_and_delete(&id)?.map(WireEnvelope::from).ok_or(SecretError::NotFound)
    }

    /// Whether a live secret exists. Non-destructive; not a reservation.
    pub fn exists(&self, id: &str) -> Result<bool, SecretError> {
        match id.parse::<EnvelopeId>() {
            Ok(id) => Ok(self.inner.store.exists(&id)?),
            Err(_) => Ok(false),
        }
    }

    /// Remove every expired envelope now. Returns how many.
    pub fn sweep(&self) -> Result<usize, SecretError> {
        let now = self.inner.store.env().now();
        let removed = self.inner.store.sweep_expired(now)?;
        tracing::info!(removed, "sweep complete");
        Ok(removed)
    }

    /// Compose, seal and store `input`, returning its id and share link.
    ///
    /// Sealing (one PBKDF2 derivation) runs on the blocking pool.
    pub async fn seal(
        &self,
        input: SecretInput,
        protection: Protection,
        ttl: Duration,
    ) -> Result<(EnvelopeId, ShareLink), ServerError> {
        let env = self.inner.store.env().clone();
        let composed =
            tokio::task::spawn_blocking(move || compose(&env, &input, &protection, ttl)).await??;

        let id = self.create(composed.request.clone())?;
        let link = composed.share_link(self.inner.config.base_url.clone(), id)?;
        Ok((id, link))
    }

    /// Fetch and open the secret behind `link`.
    ///
    /// The secret is consumed by the fetch, before any password is asked
    /// for. `password` is called only when the envelope is password
    /// protected; if it fails, or the password is wrong, the secret is gone.
    pub async fn reveal<P>(
        &self,
        link: &ShareLink,
        password: P,
    ) -> Result<RevealedSecret, ServerError>
    where
        P: FnOnce() -> std::io::Result<String>,
    {
        let mut retrieval = Retrieval::new(link.id(), link.key().map(str::to_string));

        match retrieval.lookup(&self.inner.store)? {
            RetrievalStatus::NotFound => return Err(SecretError::NotFound.into()),
            RetrievalStatus::DecryptionFailed => {
                tracing::debug!(id = %link.id(), "unprotected secret without a link key");
                return Err(SecretError::Decryption(DecryptionError).into());
            },
            RetrievalStatus::PasswordRequired => {
                retrieval.supply_password(password()?)?;
            },
            _ => {},
        }

        let job = retrieval.begin_decrypt()?;
        let outcome = tokio::task::spawn_blocking(move || job.run()).await?;
        if retrieval.finish(outcome)? == RetrievalStatus::DecryptionFailed {
            tracing::debug!(id = %link.id(), "secret consumed but could not be decrypted");
        }

        retrieval
            .into_revealed()
            .ok_or(ServerError::Secret(SecretError::Decryption(DecryptionError)))
    }
}

#[cfg(test)]
mod tests {
    use onceread_core::{FileKind, Metadata, ValidationError};
    use onceread_crypto::{BlobRandomness, seal_with};

    use super::*;
    use crate::{storage::MemoryStorage, test_support::TestEnv};

    fn service() -> (TestEnv, SecretService<TestEnv, MemoryStorage>) {
        let env = TestEnv::default();
        (env.clone(), SecretService::new(env, MemoryStorage::new(), ServiceConfig::default()))
    }

    fn request(ttl: Duration) -> CreateRequest {
        let blob = seal_with(b"hello", b"key", BlobRandomness { salt: [1; 16], nonce: [2; 12] });
        CreateRequest::new(blob, ttl, false, &Metadata::Text)
    }

    #[test]
    fn create_then_fetch_once() {
        let (_, service) = service();
        let id = service.create(request(Duration::from_secs(60))).unwrap();

        let wire = service.fetch(&id.to_string()).unwrap();
        assert_eq!(wire.id, id.to_string());
        assert_eq!(wire.expires_at - wire.created_at, 60_000);
        assert!(matches!(service.fetch(&id.to_string()), Err(SecretError::NotFound)));
    }

    #[test]
    fn create_rejects_ttl_over_configured_max() {
        let env = TestEnv::default();
        let config = ServiceConfig { max_ttl: Duration::from_secs(60), ..ServiceConfig::default() };
        let service = SecretService::new(env, MemoryStorage::new(), config);

        let err = service.create(request(Duration::from_secs(61))).unwrap_err();
        assert!(matches!(err, SecretError::Validation(ValidationError::InvalidTtl { .. })));
        assert!(matches!(
            service.create(request(Duration::ZERO)),
            Err(SecretError::Validation(ValidationError::InvalidTtl { .. }))
        ));
    }

    #[test]
    fn create_rejects_malformed_content() {
        let (_, service) = service();
        let mut req = request(Duration::from_secs(1));
        req.encrypted_content = "not base64!".into();
        assert!(matches!(
            service.create(req),
            Err(SecretError::Validation(ValidationError::MalformedContent))
        ));
    }

    #[test]
    fn create_rejects_file_without_name() {
        let (_, service) = service();
        let mut req = request(Duration::from_secs(1));
        req.message_type = Some("document".into());
        req.file_name = None;
        assert!(matches!(
            service.create(req),
            Err(SecretError::Validation(ValidationError::MissingFileName { .. }))
        ));
        assert!(service.store().storage().is_empty().unwrap());
    }

    #[test]
    fn malformed_ids_are_not_found() {
        let (_, service) = service();
        assert!(matches!(service.fetch("../etc/passwd"), Err(SecretError::NotFound)));
        assert!(!service.exists("nope").unwrap());
    }

    #[test]
    fn sweep_removes_expired() {
        let (env, service) = service();
        service.create(request(Duration::from_millis(5))).unwrap();
        service.create(request(Duration::from_secs(5))).unwrap();

        env.advance(5);
        assert_eq!(service.sweep().unwrap(), 1);
        assert_eq!(service.store().storage().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn seal_then_reveal_with_link_key() {
        let (_, service) = service();
        let (id, link) = service
            .seal(SecretInput::Text("hi there".into()), Protection::LinkKey, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(link.id(), id);
        assert!(link.key().is_some());
        assert!(link.to_url().as_str().starts_with("http://localhost:3000/secret/"));

        let secret = service.reveal(&link, || unreachable!("no prompt")).await.unwrap();
        assert_eq!(secret.as_text(), Some("hi there"));

        let again = service.reveal(&link, || unreachable!("no prompt")).await.unwrap_err();
        assert!(matches!(again, ServerError::Secret(SecretError::NotFound)));
    }

    #[tokio::test]
    async fn password_is_prompted_once_and_wrong_password_destroys() {
        let (_, service) = service();
        let input = SecretInput::File {
            kind: FileKind::Document,
            file_name: "plan.txt".into(),
            file_type: "text/plain".into(),
            bytes: b"launch at dawn".to_vec(),
        };
        let (_, link) = service
            .seal(input, Protection::password("hunter22"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(link.key().is_none());

        let err = service.reveal(&link, || Ok("wrong".to_string())).await.unwrap_err();
        assert!(matches!(err, ServerError::Secret(SecretError::Decryption(_))));

        // Consumed by the failed attempt
        let err = service.reveal(&link, || Ok("hunter22".to_string())).await.unwrap_err();
        assert!(matches!(err, ServerError::Secret(SecretError::NotFound)));
    }

    #[tokio::test]
    async fn missing_link_key_fails_closed() {
        let (_, service) = service();
        let (id, link) = service
            .seal(SecretInput::Text("x".into()), Protection::LinkKey, Duration::from_secs(60))
            .await
            .unwrap();
        let keyless = ShareLink::new(link.base().clone(), id, None).unwrap();

        let err = service.reveal(&keyless, || unreachable!("no prompt")).await.unwrap_err();
        assert!(matches!(err, ServerError::Secret(SecretError::Decryption(_))));
        assert!(!service.exists(&id.to_string()).unwrap());
    }
}
