use crate::config::StaxConfig;
use crate::error::{ConfigError, Result};

fn require(field: &str, value: &str, hint: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: field.to_string(),
            hint: hint.to_string(),
        }
        .into());
    }
    Ok(())
}

impl StaxConfig {
    /// Check the configuration for values no build could use.
    pub fn validate(&self) -> Result<()> {
        require(
            "server.entrypoint",
            &self.server.entrypoint,
            "Name the server module, e.g. \"server/index\"",
        )?;
        require(
            "webapp.entrypoint",
            &self.webapp.entrypoint,
            "Name the web-app module, e.g. \"webapp/index\"",
        )?;
        require(
            "server.command",
            &self.server.command,
            "The program that runs the compiled server, e.g. \"node\"",
        )?;
        require(
            "builder.externalModules.bundleOutName",
            &self.builder.external_modules.bundle_out_name,
            "File name of the externals bundle, e.g. \"externals.js\"",
        )?;

        let public_path = &self.builder.public_path;
        if !public_path.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "builder.publicPath".to_string(),
                value: public_path.clone(),
                hint: format!("publicPath must end with '/', e.g. \"{}/\"", public_path),
            }
            .into());
        }

        if let Some(wrapper) = &self.builder.module_resolver_wrapper_function {
            let valid = wrapper
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
                && wrapper
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.');
            if !valid {
                return Err(ConfigError::InvalidValue {
                    field: "builder.moduleResolverWrapperFunction".to_string(),
                    value: wrapper.clone(),
                    hint: "Must be a JavaScript identifier or member path".to_string(),
                }
                .into());
            }
        }

        if self.builder.max_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "builder.maxConcurrency".to_string(),
                value: "0".to_string(),
                hint: "Use at least 1, or omit it to pick from the CPU count".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
