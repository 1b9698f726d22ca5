//! Installable application modules.
//!
//! A [`Module`] is a name plus an async installer that receives the [`App`]
//! and wires whatever it needs into it: routes, sub-routers, background
//! state. Build one directly or through [`Module::builder`]:
//!
//! ```rust
//! use http::Method;
//! use mortar::{App, BoxError, Context, Error, Module, Request, handle, reply};
//!
//! async fn list(_req: Request, ctx: Context) -> Result<(), Error> {
//!     reply(&ctx).json(["widget"])?;
//!     Ok(())
//! }
//!
//! let catalog = Module::builder()
//!     .with_name("catalog")
//!     .with_installer(|app: App| async move {
//!         app.route(Method::GET, "/catalog", handle(list))?;
//!         Ok::<(), BoxError>(())
//!     })
//!     .build()?;
//! assert_eq!(catalog.name(), "catalog");
//! # Ok::<(), mortar::BuildError>(())
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::app::App;
use crate::error::BoxError;

/// Future returned by an installer.
pub type InstallFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'static>>;

type BoxedInstaller = Arc<dyn Fn(App) -> InstallFuture + Send + Sync + 'static>;

/// A named, installable unit of application behavior.
#[derive(Clone)]
pub struct Module {
    name: Arc<str>,
    installer: BoxedInstaller,
}

impl Module {
    pub fn new<F, Fut>(name: impl Into<String>, installer: F) -> Self
    where
        F: Fn(App) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self { name: name.into().into(), installer: erase(installer) }
    }

    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the installer against `app`.
    pub fn install(&self, app: App) -> InstallFuture {
        (self.installer)(app)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish_non_exhaustive()
    }
}

fn erase<F, Fut>(installer: F) -> BoxedInstaller
where
    F: Fn(App) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |app| Box::pin(installer(app)) as InstallFuture)
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("module name is missing")]
    MissingName,

    #[error("module `{0}` has no installer")]
    MissingInstaller(String),
}

/// Assembles a [`Module`]. Each step returns an updated builder.
#[derive(Clone, Default)]
#[must_use]
pub struct ModuleBuilder {
    name: Option<String>,
    installer: Option<BoxedInstaller>,
}

impl ModuleBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_installer<F, Fut>(mut self, installer: F) -> Self
    where
        F: Fn(App) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.installer = Some(erase(installer));
        self
    }

    pub fn build(self) -> Result<Module, BuildError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(BuildError::MissingName)?;
        let installer = self.installer.ok_or_else(|| BuildError::MissingInstaller(name.clone()))?;
        Ok(Module { name: name.into(), installer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sink::MemorySink;

    async fn ok(_app: App) -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn builder_requires_name_and_installer() {
        assert_eq!(Module::builder().with_installer(ok).build().unwrap_err(), BuildError::MissingName);
        assert_eq!(
            Module::builder().with_name("users").build().unwrap_err(),
            BuildError::MissingInstaller("users".into())
        );
        assert_eq!(
            Module::builder().with_name("  ").with_installer(ok).build().unwrap_err(),
            BuildError::MissingName
        );
    }

    #[test]
    fn builder_steps_do_not_affect_earlier_copies() {
        let base = Module::builder().with_installer(ok);
        let users = base.clone().with_name("users").build().unwrap();
        assert_eq!(users.name(), "users");
        assert_eq!(base.build().unwrap_err(), BuildError::MissingName);
    }

    #[tokio::test]
    async fn install_runs_the_installer() {
        let app = App::with_sink(Config::new(), MemorySink::new());
        let failing = Module::new("broken", |_app| async { Err::<(), BoxError>("no database".into()) });
        let err = failing.install(app).await.unwrap_err();
        assert_eq!(err.to_string(), "no database");
    }
}
