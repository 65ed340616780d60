//! Migration definitions and the callable action contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::version::Version;

/// The callable performing a migration's effect.
///
/// Actions may be asynchronous; the engine awaits each one to
/// completion before moving to the next entry, so actions never run
/// concurrently with each other. Idempotency of the action itself is
/// the caller's responsibility.
pub type MigrationAction =
    Arc<dyn Fn(MigrationContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Identity of the definition being executed, handed to its action.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    pub version: Version,
    pub name: String,
}

/// Wrap an async closure as a [`MigrationAction`].
pub fn action<F, Fut>(f: F) -> MigrationAction
where
    F: Fn(MigrationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| {
        let fut: BoxFuture<'static, anyhow::Result<()>> = Box::pin(f(ctx));
        fut
    })
}

/// A migration definition: a version, a display name, a content
/// fingerprint, and the action that performs the migration.
///
/// Definitions are immutable once registered. Re-adding the same
/// version to the registry replaces the definition, which is how
/// "update a migration" is expressed; the engine's consistency check
/// flags that when the version has already executed.
#[derive(Clone)]
pub struct Migration {
    version: Version,
    name: String,
    fingerprint: String,
    action: MigrationAction,
}

impl Migration {
    /// Create a definition. The fingerprint defaults to a digest of
    /// the version and name; supply the action's source text via
    /// [`Migration::with_source`] (or an explicit checksum via
    /// [`Migration::with_checksum`]) so edits to the action's logic
    /// are detectable after it has run.
    pub fn new(version: Version, name: impl Into<String>, action: MigrationAction) -> Self {
        let name = name.into();
        let fingerprint = fingerprint_of(&format!("{version}:{name}"));
        Self {
            version,
            name,
            fingerprint,
            action,
        }
    }

    /// Derive the fingerprint from the action's source text.
    pub fn with_source(mut self, source: &str) -> Self {
        self.fingerprint = fingerprint_of(source);
        self
    }

    /// Use a caller-computed checksum as the fingerprint verbatim.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.fingerprint = checksum.into();
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Invoke the action, awaiting its completion.
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let ctx = MigrationContext {
            version: self.version,
            name: self.name.clone(),
        };
        (self.action)(ctx).await
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Stable md5 hex digest used for ledger fingerprints.
pub fn fingerprint_of(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> MigrationAction {
        action(|_ctx| async { Ok(()) })
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint_of("abc"), fingerprint_of("abc"));
        assert_ne!(fingerprint_of("abc"), fingerprint_of("abd"));
        // md5 hex digest is always 32 chars
        assert_eq!(fingerprint_of("").len(), 32);
    }

    #[test]
    fn test_default_fingerprint_from_identity() {
        let v: Version = "1.0.0_1".parse().unwrap();
        let a = Migration::new(v, "add users table", noop());
        let b = Migration::new(v, "add users table", noop());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = Migration::new(v, "drop users table", noop());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_with_source_overrides_fingerprint() {
        let v: Version = "1.0.0_1".parse().unwrap();
        let a = Migration::new(v, "m", noop()).with_source("CREATE TABLE users ()");
        let b = Migration::new(v, "m", noop()).with_source("CREATE TABLE users (id int)");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_with_checksum_verbatim() {
        let v: Version = "1.0.0_1".parse().unwrap();
        let m = Migration::new(v, "m", noop()).with_checksum("cafebabe");
        assert_eq!(m.fingerprint(), "cafebabe");
    }

    #[tokio::test]
    async fn test_action_receives_context() {
        let v: Version = "2.0.0_3".parse().unwrap();
        let m = Migration::new(
            v,
            "check context",
            action(|ctx| async move {
                anyhow::ensure!(ctx.version.to_string() == "2.0.0_3");
                anyhow::ensure!(ctx.name == "check context");
                Ok(())
            }),
        );
        m.run().await.unwrap();
    }
}
