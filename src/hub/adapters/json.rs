//! JSON encoding of endpoint settings.
//!
//! Two shapes are understood:
//!
//! - the settings document, `{"servers": [{"id", "name", "enabled", "type",
//!   "url", ...}]}`, which round-trips declarations including identities;
//! - the conventional import map, `{"mcpServers": {"<name>": {"url": ...}}}`,
//!   whose entries carry no identity and are assigned fresh ones.

use crate::hub::{
    domain::{
        EndpointAddress, EndpointDeclaration, EndpointId, EndpointName, TransportKind,
        TransportParams,
    },
    ports::{EndpointSettingsError, EndpointSettingsResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Persisted settings document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    servers: Vec<ServerRecord>,
}

/// One declaration in the settings document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerRecord {
    id: String,
    name: String,
    #[serde(default)]
    enabled: bool,
    #[serde(rename = "type")]
    transport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(flatten)]
    params: ParamsRecord,
}

/// Transport parameters shared by both document shapes.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ParamsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    /// Timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
}

/// One entry of an import map, keyed by display name.
#[derive(Debug, Deserialize)]
struct ImportedServer {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    transport: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(flatten)]
    params: ParamsRecord,
}

const fn default_enabled() -> bool {
    true
}

impl ParamsRecord {
    fn into_params(self) -> TransportParams {
        let mut params = TransportParams::new()
            .with_args(self.args)
            .with_env(self.env);
        if let Some(command) = self.command {
            params = params.with_command(command);
        }
        if let Some(seconds) = self.timeout {
            params = params.with_timeout(Duration::from_secs(seconds));
        }
        params
    }

    fn from_params(params: &TransportParams) -> Self {
        Self {
            command: params.command().map(str::to_owned),
            args: params.args().to_vec(),
            env: params.env().clone(),
            timeout: params.timeout().map(|timeout| timeout.as_secs()),
        }
    }
}

fn parse_transport(value: &str) -> EndpointSettingsResult<TransportKind> {
    TransportKind::try_from(value).map_err(EndpointSettingsError::invalid_document)
}

fn parse_address(url: Option<String>) -> EndpointSettingsResult<Option<EndpointAddress>> {
    Ok(url
        .filter(|value| !value.trim().is_empty())
        .map(EndpointAddress::new)
        .transpose()?)
}

impl ServerRecord {
    fn into_declaration(self) -> EndpointSettingsResult<EndpointDeclaration> {
        let mut declaration = EndpointDeclaration::new(
            EndpointId::new(self.id)?,
            EndpointName::new(self.name)?,
            parse_transport(&self.transport)?,
        )
        .with_enabled(self.enabled)
        .with_params(self.params.into_params());
        declaration.set_address(parse_address(self.url)?);
        Ok(declaration)
    }

    fn from_declaration(declaration: &EndpointDeclaration) -> Self {
        Self {
            id: declaration.id().as_str().to_owned(),
            name: declaration.name().as_str().to_owned(),
            enabled: declaration.is_enabled(),
            transport: declaration.transport().as_str().to_owned(),
            url: declaration
                .address()
                .map(|address| address.as_str().to_owned()),
            params: ParamsRecord::from_params(declaration.params()),
        }
    }
}

/// Parses a settings document into declarations, preserving order.
///
/// # Errors
///
/// Returns [`EndpointSettingsError::InvalidDocument`] when the text is not a
/// valid document and [`EndpointSettingsError::Domain`] when an entry fails
/// validation.
pub fn parse_settings_document(text: &str) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
    let document: SettingsDocument =
        serde_json::from_str(text).map_err(EndpointSettingsError::invalid_document)?;
    document
        .servers
        .into_iter()
        .map(ServerRecord::into_declaration)
        .collect()
}

/// Renders declarations as a pretty-printed settings document.
///
/// # Errors
///
/// Returns [`EndpointSettingsError::InvalidDocument`] when serialization
/// fails.
pub fn render_settings_document(
    declarations: &[EndpointDeclaration],
) -> EndpointSettingsResult<String> {
    let document = SettingsDocument {
        servers: declarations
            .iter()
            .map(ServerRecord::from_declaration)
            .collect(),
    };
    serde_json::to_string_pretty(&document).map_err(EndpointSettingsError::invalid_document)
}

/// Converts an import map into new declarations with generated identities.
///
/// Accepts either the bare map of servers or an object wrapping it under
/// `mcpServers`. An entry without an explicit `type` is treated as `sse`
/// when it has a `url` and as `stdio` otherwise. Imported entries are
/// enabled unless they say otherwise.
///
/// # Errors
///
/// Returns [`EndpointSettingsError::InvalidDocument`] when the value is not a
/// map of server objects and [`EndpointSettingsError::Domain`] when an entry
/// fails validation.
pub fn declarations_from_import(value: &Value) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
    let servers = value.get("mcpServers").unwrap_or(value).clone();
    let imported: BTreeMap<String, ImportedServer> =
        serde_json::from_value(servers).map_err(EndpointSettingsError::invalid_document)?;

    imported
        .into_iter()
        .map(|(name, server)| -> EndpointSettingsResult<EndpointDeclaration> {
            let transport = match server.transport.as_deref() {
                Some(kind) => parse_transport(kind)?,
                None if server.url.is_some() => TransportKind::Sse,
                None => TransportKind::Stdio,
            };
            let mut declaration = EndpointDeclaration::new(
                EndpointId::generate(),
                EndpointName::new(name)?,
                transport,
            )
            .with_enabled(server.enabled)
            .with_params(server.params.into_params());
            declaration.set_address(parse_address(server.url)?);
            Ok(declaration)
        })
        .collect()
}
