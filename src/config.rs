//! # Run configuration and option-function mutators.
//!
//! [`Config`] is assembled by folding an ordered list of [`Opt`] mutators
//! over the zero value (`Config::default()`). Each mutator is a pure
//! transformation of the configuration; any mutator returning an error
//! aborts the fold and the partial configuration is discarded.
//!
//! The builder enforces **no ordering** between mutators: callers decide
//! precedence by call order (e.g. explicit overrides after
//! [`with_env_defaults`]), and the last mutator to set a field wins.
//!
//! ## Example
//! ```
//! use procvisor::config::{self, Config};
//!
//! let cfg = Config::build([
//!     config::with_exec(["./server", "--listen", ":5000"]),
//!     config::with_url_service("control.example.net:9701", "tok-1", 5000, "app=web"),
//! ]).unwrap();
//!
//! assert_eq!(cfg.exec_args[0], "./server");
//! assert_eq!(cfg.url_labels.as_deref(), Some("app=web"));
//! ```

use std::env;

use crate::error::ConfigError;

/// Deployment identifier variable.
pub const ENV_DEPLOYMENT_ID: &str = "PROCVISOR_DEPLOYMENT_ID";
/// Control-plane server address variable.
pub const ENV_SERVER_ADDR: &str = "PROCVISOR_SERVER_ADDR";
/// Any non-empty value disables transport security.
pub const ENV_SERVER_INSECURE: &str = "PROCVISOR_SERVER_INSECURE";
/// Presence enables the ingress subsystem; the value is the label set.
pub const ENV_URL_LABELS: &str = "PROCVISOR_URL_LABELS";
/// Ingress control endpoint override.
pub const ENV_CONTROL_ADDR: &str = "PROCVISOR_CONTROL_ADDR";
/// Ingress credential; required whenever ingress is enabled.
pub const ENV_TOKEN: &str = "PROCVISOR_TOKEN";
/// Local port the child is expected to listen on.
pub const ENV_PORT: &str = "PORT";

/// Default child listen port when `PORT` is absent.
pub const DEFAULT_PORT: u16 = 5000;
/// Default ingress control endpoint.
pub const DEFAULT_CONTROL_ADDR: &str = "control.run.procvisor.dev";

/// Immutable configuration for one supervision run.
///
/// Built once via [`Config::build`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Deployment this instance belongs to.
    pub deployment_id: String,
    /// Control-plane server address.
    pub server_addr: String,
    /// Disables transport security when dialing the server.
    pub server_insecure: bool,
    /// Child executable and arguments (`exec_args[0]` is the program).
    pub exec_args: Vec<String>,

    /// Ingress credential token.
    pub url_token: String,
    /// Ingress control endpoint.
    pub url_control_addr: String,
    /// Local port the ingress tunnel forwards to.
    pub url_port: u16,
    /// Ingress label set; `None` disables the URL service entirely.
    pub url_labels: Option<String>,

    /// Extra environment entries for the child process.
    ///
    /// Derived defaults (such as a defaulted `PORT`) land here instead of
    /// in the supervisor's own process environment, so only the child
    /// observes them.
    pub child_env: Vec<(String, String)>,
}

impl Config {
    /// Folds `opts` over the zero-valued configuration, in order.
    ///
    /// The first mutator error aborts the fold; no partially-applied
    /// configuration is ever exposed to the caller.
    pub fn build(opts: impl IntoIterator<Item = Opt>) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        for opt in opts {
            (opt.0)(&mut cfg)?;
        }
        Ok(cfg)
    }

    /// Returns `true` when an ingress label set is configured.
    pub fn url_enabled(&self) -> bool {
        self.url_labels.is_some()
    }
}

/// A single configuration mutator.
///
/// Mutators read external sources (the process environment) but only ever
/// write into the configuration value being built.
pub struct Opt(Box<dyn FnOnce(&mut Config) -> Result<(), ConfigError> + Send>);

impl Opt {
    /// Wraps a closure as a mutator.
    pub fn new(f: impl FnOnce(&mut Config) -> Result<(), ConfigError> + Send + 'static) -> Self {
        Self(Box::new(f))
    }
}

impl std::fmt::Debug for Opt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Opt(..)")
    }
}

/// Populates the configuration from well-known environment variables.
///
/// Ingress-related variables are consulted only when [`ENV_URL_LABELS`] is
/// present and non-empty; in that case [`ENV_TOKEN`] must also be present or
/// the build fails with [`ConfigError::MissingCredential`]. A missing
/// `PORT` is defaulted to [`DEFAULT_PORT`] and recorded in
/// [`Config::child_env`] so the child can discover it.
pub fn with_env_defaults() -> Opt {
    Opt::new(|cfg| {
        let labels = env::var(ENV_URL_LABELS).unwrap_or_default();
        if !labels.is_empty() {
            let token = env::var(ENV_TOKEN).unwrap_or_default();
            if token.is_empty() {
                return Err(ConfigError::MissingCredential { var: ENV_TOKEN });
            }

            let port = match env::var(ENV_PORT) {
                Ok(raw) if !raw.is_empty() => {
                    raw.parse::<u16>().map_err(|source| ConfigError::InvalidPort {
                        var: ENV_PORT,
                        value: raw,
                        source,
                    })?
                }
                _ => {
                    // Make the derived default visible to the child without
                    // touching our own process environment.
                    cfg.child_env
                        .push((ENV_PORT.to_string(), DEFAULT_PORT.to_string()));
                    DEFAULT_PORT
                }
            };

            let control_addr = match env::var(ENV_CONTROL_ADDR) {
                Ok(addr) if !addr.is_empty() => addr,
                _ => DEFAULT_CONTROL_ADDR.to_string(),
            };

            cfg.url_labels = Some(labels);
            cfg.url_token = token;
            cfg.url_port = port;
            cfg.url_control_addr = control_addr;
        }

        cfg.deployment_id = env::var(ENV_DEPLOYMENT_ID).unwrap_or_default();
        cfg.server_addr = env::var(ENV_SERVER_ADDR).unwrap_or_default();
        cfg.server_insecure = !env::var(ENV_SERVER_INSECURE).unwrap_or_default().is_empty();
        Ok(())
    })
}

/// Sets the child executable and arguments.
///
/// A relative program name is resolved on the standard executable search
/// path when the child starts.
pub fn with_exec<I, S>(args: I) -> Opt
where
    I: IntoIterator<Item = S> + Send + 'static,
    S: Into<String>,
{
    Opt::new(move |cfg| {
        cfg.exec_args = args.into_iter().map(Into::into).collect();
        Ok(())
    })
}

/// Explicitly enables the URL service with the given parameters.
///
/// Overrides any environment-derived ingress settings applied earlier in
/// the fold.
pub fn with_url_service(
    control_addr: impl Into<String>,
    token: impl Into<String>,
    port: u16,
    labels: impl Into<String>,
) -> Opt {
    let (control_addr, token, labels) = (control_addr.into(), token.into(), labels.into());
    Opt::new(move |cfg| {
        cfg.url_control_addr = control_addr;
        cfg.url_token = token;
        cfg.url_port = port;
        cfg.url_labels = Some(labels);
        Ok(())
    })
}

/// Sets the deployment identifier directly.
pub fn with_deployment_id(id: impl Into<String>) -> Opt {
    let id = id.into();
    Opt::new(move |cfg| {
        cfg.deployment_id = id;
        Ok(())
    })
}

/// Sets the control-plane server address and transport-security flag.
pub fn with_server(addr: impl Into<String>, insecure: bool) -> Opt {
    let addr = addr.into();
    Opt::new(move |cfg| {
        cfg.server_addr = addr;
        cfg.server_insecure = insecure;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            ENV_DEPLOYMENT_ID,
            ENV_SERVER_ADDR,
            ENV_SERVER_INSECURE,
            ENV_URL_LABELS,
            ENV_CONTROL_ADDR,
            ENV_TOKEN,
            ENV_PORT,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn last_mutator_wins_per_field() {
        let cfg = Config::build([
            with_deployment_id("d1"),
            with_exec(["first"]),
            with_exec(["second", "--flag"]),
            with_deployment_id("d2"),
        ])
        .unwrap();

        assert_eq!(cfg.deployment_id, "d2");
        assert_eq!(cfg.exec_args, vec!["second", "--flag"]);
    }

    #[test]
    fn mutator_error_aborts_the_fold() {
        let res = Config::build([
            with_deployment_id("d1"),
            Opt::new(|_| Err(ConfigError::MissingCredential { var: ENV_TOKEN })),
            with_deployment_id("never-applied"),
        ]);

        assert!(matches!(
            res,
            Err(ConfigError::MissingCredential { var: ENV_TOKEN })
        ));
    }

    #[test]
    #[serial]
    fn env_defaults_read_well_known_variables() {
        clear_env();
        env::set_var(ENV_DEPLOYMENT_ID, "dep-7");
        env::set_var(ENV_SERVER_ADDR, "server.internal:9701");
        env::set_var(ENV_SERVER_INSECURE, "1");

        let cfg = Config::build([with_env_defaults()]).unwrap();
        assert_eq!(cfg.deployment_id, "dep-7");
        assert_eq!(cfg.server_addr, "server.internal:9701");
        assert!(cfg.server_insecure);
        assert!(!cfg.url_enabled());
        assert!(cfg.child_env.is_empty());
        clear_env();
    }

    #[test]
    #[serial]
    fn labels_without_token_is_a_missing_credential() {
        clear_env();
        env::set_var(ENV_URL_LABELS, "app=web");

        let res = Config::build([with_env_defaults()]);
        assert!(matches!(
            res,
            Err(ConfigError::MissingCredential { var: ENV_TOKEN })
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn absent_port_is_defaulted_into_child_env() {
        clear_env();
        env::set_var(ENV_URL_LABELS, "app=web");
        env::set_var(ENV_TOKEN, "tok-1");

        let cfg = Config::build([with_env_defaults()]).unwrap();
        assert_eq!(cfg.url_port, DEFAULT_PORT);
        assert_eq!(cfg.url_control_addr, DEFAULT_CONTROL_ADDR);
        assert_eq!(
            cfg.child_env,
            vec![(ENV_PORT.to_string(), DEFAULT_PORT.to_string())]
        );
        // Our own environment stays untouched.
        assert!(env::var(ENV_PORT).is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn explicit_port_is_used_verbatim() {
        clear_env();
        env::set_var(ENV_URL_LABELS, "app=web");
        env::set_var(ENV_TOKEN, "tok-1");
        env::set_var(ENV_PORT, "8080");

        let cfg = Config::build([with_env_defaults()]).unwrap();
        assert_eq!(cfg.url_port, 8080);
        assert!(cfg.child_env.is_empty());
        clear_env();
    }

    #[test]
    #[serial]
    fn garbage_port_fails_the_build() {
        clear_env();
        env::set_var(ENV_URL_LABELS, "app=web");
        env::set_var(ENV_TOKEN, "tok-1");
        env::set_var(ENV_PORT, "not-a-port");

        let res = Config::build([with_env_defaults()]);
        assert!(matches!(res, Err(ConfigError::InvalidPort { .. })));
        clear_env();
    }

    #[test]
    #[serial]
    fn explicit_url_service_overrides_env_defaults() {
        clear_env();
        env::set_var(ENV_URL_LABELS, "app=web");
        env::set_var(ENV_TOKEN, "env-token");

        let cfg = Config::build([
            with_env_defaults(),
            with_url_service("custom.control:1", "explicit-token", 9000, "app=api"),
        ])
        .unwrap();

        assert_eq!(cfg.url_token, "explicit-token");
        assert_eq!(cfg.url_port, 9000);
        assert_eq!(cfg.url_labels.as_deref(), Some("app=api"));
        clear_env();
    }
}
