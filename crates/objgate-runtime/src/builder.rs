//! Assembly of a [`Gateway`] from configuration.
//!
//! ```rust,ignore
//! let gateway = GateBuilder::new()
//!     .config_file("objgate.toml")
//!     .coercion("op", parse_operator())
//!     .root(Root::constructor(make_controller))
//!     .build()?;
//! ```

use std::path::Path;

use objgate_core::{AttrLocator, Transform};
use objgate_framework::{Dispatcher, Root};
use tracing::{debug, info};

use crate::coercion::CoercionRegistry;
use crate::config::{ConfigLoader, ConfigResult, GateConfig, GateSettings, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::runtime::Gateway;

/// Builder for a configured [`Gateway`].
pub struct GateBuilder {
    config_loader: ConfigLoader,
    registry: CoercionRegistry,
    root: Option<Root>,
    init_logging: bool,
}

impl Default for GateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GateBuilder {
    /// Creates a builder searching the current and user config directories,
    /// with the built-in coercions registered.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            registry: CoercionRegistry::with_builtins(),
            root: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration values programmatically.
    pub fn merge(mut self, config: GateConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Replaces the coercion registry.
    pub fn registry(mut self, registry: CoercionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers an additional named coercion.
    pub fn coercion(mut self, name: impl Into<String>, transform: Transform) -> Self {
        self.registry.register(name, transform);
        self
    }

    /// Sets the root object or constructor.
    pub fn root(mut self, root: impl Into<Root>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates the configuration, initializes logging and builds
    /// the gateway.
    pub fn build(self) -> RuntimeResult<Gateway> {
        let root = self.root.ok_or(RuntimeError::MissingRoot)?;
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let dispatcher = Self::from_settings(&config.gate, &self.registry, root)?;
        info!(
            log_level = %config.logging.level,
            sources = ?config.gate.sources,
            "Gateway initialized from configuration"
        );
        Ok(Gateway::new(config, dispatcher))
    }

    /// Assembles a dispatcher from dispatch settings.
    pub fn from_settings(
        settings: &GateSettings,
        registry: &CoercionRegistry,
        root: Root,
    ) -> ConfigResult<Dispatcher> {
        let input = registry.compile(&settings.input)?;
        let output = registry.compile(&settings.output)?;

        let mut builder = Dispatcher::builder()
            .root(root)
            .permissions(&settings.permissions)?
            .sources(settings.sources.iter().cloned())
            .input(input)
            .output(output)
            .constructor_args(settings.constructor_args.iter().cloned())
            .reserved(settings.reserved.clone())
            .cache_size(settings.cache_size);

        if let Some(pattern) = &settings.attr_from_path {
            builder = builder.locator(AttrLocator::path_pattern(pattern)?);
        }

        let mut defaults: Vec<_> = settings.defaults.iter().collect();
        defaults.sort_by(|a, b| a.0.cmp(b.0));
        for (attr, args) in defaults {
            debug!(attr = %attr, count = args.len(), "Registering default arguments");
            builder = builder.defaults(attr.clone(), args.clone());
        }

        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, TransRule};
    use objgate_core::{AttributeSpec, ErrorKind, Request};
    use objgate_framework::{Method, Namespace, Signature};
    use serde_json::{Value, json};

    fn root() -> Root {
        let double = Method::new(Signature::new("double").param("n"), |args| {
            let n: i64 = args.required("n")?;
            Ok(json!(n * 2))
        });
        Root::constant(Namespace::new("Root").method(double).value("name", "root"))
    }

    fn settings() -> GateSettings {
        let input: TransRule =
            serde_json::from_value(json!({"argname": {"n": "int"}})).unwrap();
        let output: TransRule =
            serde_json::from_value(json!({"mode": {"wrapped": "envelope"}})).unwrap();
        GateSettings {
            permissions: AttributeSpec::list(["double"]),
            input,
            output,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_settings() {
        let dispatcher =
            GateBuilder::from_settings(&settings(), &CoercionRegistry::with_builtins(), root())
                .unwrap();

        let request = Request::new().query_string("attr=double&n=21").unwrap();
        assert_eq!(dispatcher.dispatch(&request).unwrap(), json!(42));

        let request = Request::new()
            .query_string("attr=double&n=2&_output_trans=wrapped")
            .unwrap();
        assert_eq!(dispatcher.dispatch(&request).unwrap(), json!({"result": 4}));

        let request = Request::new().route_arg("attr", "name");
        let err = dispatcher.dispatch(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForbiddenAttribute);
    }

    #[test]
    fn test_from_settings_with_defaults_and_path() {
        let mut settings = settings();
        settings.attr_from_path = Some("^/call/([\\w.]+)$".into());
        settings
            .defaults
            .insert("double".into(), serde_json::from_value(json!({"n": 5})).unwrap());

        let dispatcher =
            GateBuilder::from_settings(&settings, &CoercionRegistry::with_builtins(), root())
                .unwrap();
        let request = Request::new().path("/call/double");
        assert_eq!(dispatcher.dispatch(&request).unwrap(), json!(10));
    }

    #[test]
    fn test_unknown_coercion() {
        let mut settings = settings();
        settings.input = TransRule::Named("decimal".into());
        let err = GateBuilder::from_settings(&settings, &CoercionRegistry::with_builtins(), root())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCoercion(_)));
    }

    #[test]
    fn test_name_collision() {
        let mut settings = settings();
        settings.constructor_args = vec!["attr".into()];
        let err = GateBuilder::from_settings(&settings, &CoercionRegistry::with_builtins(), root())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Build(_)));
    }

    #[test]
    fn test_build_requires_root() {
        let err = GateBuilder::new().without_env().without_logging().build().unwrap_err();
        assert!(matches!(err, RuntimeError::MissingRoot));
    }

    #[test]
    fn test_build_from_merged_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = GateConfig {
            gate: settings(),
            ..Default::default()
        };
        let gateway = GateBuilder::new()
            .search_path(dir.path())
            .without_env()
            .without_logging()
            .merge(config)
            .root(root())
            .build()
            .unwrap();

        let request = Request::new().query_string("attr=double&n=4").unwrap();
        let response = gateway.respond(&request);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Value::from(8));
    }
}
