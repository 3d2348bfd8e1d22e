//! Environment variable source: THREADSTORE_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
///
/// `THREADSTORE__STORE__MAX_BODY_LENGTH=500` sets `store.max_body_length`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("THREADSTORE")
            .separator("__")
            .try_parsing(true),
    ))
}
