//! Runtime configuration.
//!
//! Build a [`Config`] explicitly in code and tests, or read it from the
//! process environment with [`Config::from_env`]:
//!
//! | Variable | Effect |
//! |---|---|
//! | `MODULES` | comma-separated module names; overrides what `load` installs |
//! | `APP_ENV` | `test` silences the error translator's request logging |
//! | `STRICT_REPLY` | `true` makes a second send return an error |
//! | `LOG_IGNORE_HEADERS` | comma-separated request headers left out of logs |

use clap::Parser;

/// Settings shared by every request an [`App`](crate::App) serves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Authoritative list of modules to load, when present.
    pub modules: Option<Vec<String>>,
    /// Skip request logging in the error translator (test runs).
    pub quiet: bool,
    /// Make a second [`Reply::send`](crate::Reply::send) an error instead of a no-op.
    pub strict_reply: bool,
    /// Request headers excluded from the logged request snapshot.
    pub ignored_headers: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "mortar", no_binary_name = true)]
struct EnvArgs {
    #[arg(long, env = "MODULES", value_delimiter = ',')]
    modules: Option<Vec<String>>,

    #[arg(long, env = "APP_ENV", default_value = "production")]
    app_env: String,

    #[arg(
        long,
        env = "STRICT_REPLY",
        action = clap::ArgAction::Set,
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new(),
    )]
    strict_reply: bool,

    #[arg(long, env = "LOG_IGNORE_HEADERS", value_delimiter = ',')]
    ignored_headers: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the variables listed in the module docs.
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::from_args(std::iter::empty::<String>())
    }

    /// Like [`from_env`](Self::from_env), with flags (`--modules a,b`,
    /// `--app-env test`, ...) taking precedence over the environment.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args = EnvArgs::try_parse_from(args)?;
        Ok(Self {
            modules: args.modules,
            quiet: args.app_env.eq_ignore_ascii_case("test"),
            strict_reply: args.strict_reply,
            ignored_headers: args.ignored_headers,
        })
    }

    pub fn modules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn strict_reply(mut self, strict: bool) -> Self {
        self.strict_reply = strict;
        self
    }

    pub fn ignore_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_headers.extend(names.into_iter().map(Into::into));
        self
    }

    /// The `modules` override with blank entries dropped, or `None` when
    /// unset. A set override is authoritative even when it names nothing.
    pub(crate) fn module_override(&self) -> Option<Vec<String>> {
        let names = self.modules.as_ref()?;
        Some(
            names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let cfg = Config::from_args([
            "--modules", "users, orders,,",
            "--app-env", "test",
            "--strict-reply", "true",
            "--ignored-headers", "authorization,cookie",
        ])
        .unwrap();

        assert!(cfg.quiet);
        assert!(cfg.strict_reply);
        assert_eq!(cfg.ignored_headers, ["authorization", "cookie"]);
        assert_eq!(cfg.module_override().unwrap(), ["users", "orders"]);
    }

    #[test]
    fn blank_override_selects_nothing() {
        assert_eq!(Config::new().modules([" ", ""]).module_override(), Some(Vec::new()));
        assert_eq!(Config::new().module_override(), None);

        let cfg = Config::from_args(["--modules", ""]).unwrap();
        assert_eq!(cfg.module_override(), Some(Vec::new()));
    }

    #[test]
    fn strict_reply_accepts_boolish_values() {
        for value in ["1", "yes", "on", "true"] {
            assert!(Config::from_args(["--strict-reply", value]).unwrap().strict_reply, "{value}");
        }
        for value in ["0", "no", "off", "false"] {
            assert!(!Config::from_args(["--strict-reply", value]).unwrap().strict_reply, "{value}");
        }
    }
}
