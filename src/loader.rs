//! Module registry and loader.
//!
//! The [`Loader`] keeps a name → [`Module`] registry and installs a selection
//! of it into an [`App`].
//!
//! # Which modules load
//!
//! For each `load` call the selection is, in order of precedence:
//!
//! 1. the `MODULES` override from the app's [`Config`](crate::Config), when set;
//! 2. the names passed to `load`, when any;
//! 3. every registered module, in registration order.
//!
//! Names without a registered module are skipped, so one binary can carry a
//! partial registry per deployment.
//!
//! # How they install
//!
//! Installation runs in phases. Every installer in a phase is spawned at once
//! and the phase ends when all of them have finished. [`Loader::load_phased`]
//! adds a first phase for dependencies, which must complete before anything
//! else starts. The first failure of a phase is returned once its siblings
//! have drained; the following phase never starts. Nothing is retried or
//! rolled back.

use std::collections::{HashMap, HashSet};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::error::BoxError;
use crate::module::Module;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unable to install module `{module}`: {source}")]
    Install {
        module: String,
        #[source]
        source: BoxError,
    },

    #[error("installer of module `{module}` panicked: {reason}")]
    Panicked { module: String, reason: String },
}

impl LoadError {
    /// Name of the module that failed.
    pub fn module(&self) -> &str {
        match self {
            Self::Install { module, .. } | Self::Panicked { module, .. } => module,
        }
    }
}

/// Registry of modules plus the app they install into.
pub struct Loader {
    app: App,
    modules: Vec<Module>,
    index: HashMap<String, usize>,
}

impl Loader {
    pub fn new(app: App) -> Self {
        Self { app, modules: Vec::new(), index: HashMap::new() }
    }

    /// Adds modules. A module whose name is already registered replaces the
    /// earlier one and keeps its position.
    pub fn register(mut self, modules: impl IntoIterator<Item = Module>) -> Self {
        for module in modules {
            match self.index.get(module.name()) {
                Some(&pos) => self.modules[pos] = module,
                None => {
                    self.index.insert(module.name().to_owned(), self.modules.len());
                    self.modules.push(module);
                }
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.index.get(name).map(|&pos| &self.modules[pos])
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(Module::name).collect()
    }

    /// The names a `load(names)` call would attempt, duplicates removed.
    pub fn selection<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let selected = if let Some(overridden) = self.app.config().module_override() {
            overridden
        } else if !names.is_empty() {
            names.iter().map(|n| n.as_ref().to_owned()).collect()
        } else {
            self.names().into_iter().map(str::to_owned).collect()
        };
        dedup(selected)
    }

    /// Installs the selection for `names` concurrently.
    ///
    /// Returns the installed module names in completion order.
    pub async fn load<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>, LoadError> {
        self.install_phase(self.selection(names)).await
    }

    /// Installs `depends` first, then the rest of the selection for `names`.
    ///
    /// Dependencies are installed even when the selection does not name them.
    pub async fn load_phased<S, D>(&self, names: &[S], depends: &[D]) -> Result<Vec<String>, LoadError>
    where
        S: AsRef<str>,
        D: AsRef<str>,
    {
        let depends = dedup(depends.iter().map(|d| d.as_ref().to_owned()).collect());
        let mut installed = Vec::new();

        if !depends.is_empty() {
            installed.extend(self.install_phase(depends.clone()).await?);
        }

        let excluded: HashSet<&str> = depends.iter().map(String::as_str).collect();
        let rest = self
            .selection(names)
            .into_iter()
            .filter(|n| !excluded.contains(n.as_str()))
            .collect();
        installed.extend(self.install_phase(rest).await?);

        Ok(installed)
    }

    async fn install_phase(&self, names: Vec<String>) -> Result<Vec<String>, LoadError> {
        let mut tasks = JoinSet::new();
        let mut spawned = Vec::new();

        for name in names {
            let Some(module) = self.get(&name) else {
                debug!(module = %name, "module not registered, skipping");
                continue;
            };
            // The inner task isolates a panicking installer so its name survives.
            let install = tokio::spawn(module.install(self.app.clone()));
            spawned.push(name.clone());
            tasks.spawn(async move { (name, install.await) });
        }

        if spawned.is_empty() {
            return Ok(Vec::new());
        }
        info!(modules = ?spawned, "installing modules");

        let mut installed = Vec::new();
        let mut first_failure = None;

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((name, Ok(Ok(())))) => {
                    debug!(module = %name, "module installed");
                    installed.push(name);
                    continue;
                }
                Ok((module, Ok(Err(source)))) => LoadError::Install { module, source },
                Ok((module, Err(e))) => LoadError::Panicked { module, reason: e.to_string() },
                Err(e) => {
                    warn!("module install task aborted: {e}");
                    continue;
                }
            };

            if first_failure.is_none() {
                first_failure = Some(failure);
            } else {
                warn!(error = %failure, "module failed after an earlier failure in the same phase");
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(installed),
        }
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}
