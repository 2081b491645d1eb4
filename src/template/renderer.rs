/// Handlebars rendering of the kind config and registry manifest
use handlebars::Handlebars;
use serde::Serialize;

use super::LOCAL_REGISTRY_TEMPLATE;
use crate::error::{Error, Result};

const KIND_CONFIG_TEMPLATE_NAME: &str = "kind.config.yaml";
const LOCAL_REGISTRY_TEMPLATE_NAME: &str = "local-registry.yaml";

/// Data available to the kind config template
#[derive(Debug, Serialize)]
struct KindConfigData<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct LocalRegistryData {
    port: u16,
}

/// Render the kind config template with the detected host address
pub fn render_cluster_config(template: &str, host_ip: &str) -> Result<String> {
    render(
        KIND_CONFIG_TEMPLATE_NAME,
        template,
        &KindConfigData { address: host_ip },
    )
}

/// Render the registry discovery ConfigMap for a registry on the given port
pub fn render_registry_manifest(port: u16) -> Result<String> {
    render(
        LOCAL_REGISTRY_TEMPLATE_NAME,
        LOCAL_REGISTRY_TEMPLATE,
        &LocalRegistryData { port },
    )
}

fn render<T: Serialize>(name: &str, template: &str, data: &T) -> Result<String> {
    let mut registry = Handlebars::new();
    // YAML output, missing fields are errors
    registry.set_strict_mode(true);
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string(name, template)
        .map_err(|e| Error::TemplateParse(Box::new(e)))?;

    registry.render(name, data).map_err(|e| Error::TemplateExec {
        name: name.to_string(),
        source: Box::new(e),
    })
}
