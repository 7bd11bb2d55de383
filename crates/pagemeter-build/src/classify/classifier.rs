//! Rendering-strategy classification of compiled pages.

use super::artifact::{
    AmpMode, ArtifactDescriptor, ArtifactLoader, DefaultExport, LoadError, NoRuntimeConfig,
    RuntimeConfigInjector, StaticPathEntry, StaticPathsProvider,
};
use super::route::{is_dynamic_route, RouteRegex};
use pagemeter_core::{Error, PageClassification, ParamsShapeViolation, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Characters `encodeURIComponent` escapes.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Route key of the custom app bundle, used in errors about it.
const APP_PAGE: &str = "/_app";

/// Loads page bundles and decides how each page renders.
pub struct ArtifactClassifier {
    loader: Arc<dyn ArtifactLoader>,
    runtime: Arc<dyn RuntimeConfigInjector>,
}

impl ArtifactClassifier {
    /// Classifier that installs runtime config through `runtime` before each load.
    pub fn new(loader: Arc<dyn ArtifactLoader>, runtime: Arc<dyn RuntimeConfigInjector>) -> Self {
        Self { loader, runtime }
    }

    /// Classifier for loaders that don't read runtime config.
    pub fn with_loader(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self::new(loader, Arc::new(NoRuntimeConfig))
    }

    /// Classifies `page` from its server bundle.
    ///
    /// Returns `Ok(None)` when the bundle does not exist. Every other problem
    /// is an error naming the page.
    pub async fn classify(
        &self,
        page: &str,
        server_bundle: &Path,
        runtime_config: &Value,
    ) -> Result<Option<PageClassification>> {
        self.runtime.set_config(runtime_config);

        let descriptor = match self.loader.load(server_bundle).await {
            Ok(descriptor) => descriptor,
            Err(LoadError::NotFound(path)) => {
                debug!(page, bundle = %path.display(), "no server bundle, skipping classification");
                return Ok(None);
            }
            Err(LoadError::Failed(message)) => {
                return Err(Error::ArtifactLoad {
                    page: page.to_string(),
                    message,
                })
            }
        };

        let classification = classify_artifact(page, &descriptor).await?;
        debug!(
            page,
            is_static = classification.is_static,
            is_prerendered = classification.is_prerendered,
            "classified page"
        );
        Ok(Some(classification))
    }

    /// Whether the custom `_app` overrides the default `getInitialProps`.
    pub async fn has_custom_app_initial_props(
        &self,
        app_bundle: &Path,
        runtime_config: &Value,
    ) -> Result<bool> {
        self.runtime.set_config(runtime_config);

        let descriptor = self
            .loader
            .load(app_bundle)
            .await
            .map_err(|e| Error::ArtifactLoad {
                page: APP_PAGE.to_string(),
                message: e.to_string(),
            })?;

        Ok(descriptor.app_initial_props_overridden)
    }
}

impl fmt::Debug for ArtifactClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactClassifier").finish_non_exhaustive()
    }
}

/// Classifies an already loaded bundle.
pub async fn classify_artifact(
    page: &str,
    descriptor: &ArtifactDescriptor,
) -> Result<PageClassification> {
    let page_error = || page.to_string();

    if descriptor.default_export != DefaultExport::Component {
        return Err(Error::InvalidExport { page: page_error() });
    }

    if descriptor.has_legacy_static_params {
        return Err(Error::DeprecatedApi { page: page_error() });
    }

    if descriptor.has_initial_props && descriptor.has_static_props {
        return Err(Error::ConflictingDataStrategy { page: page_error() });
    }

    let prerender_paths = match &descriptor.static_paths {
        None => None,
        Some(_) if !descriptor.has_static_props || !is_dynamic_route(page) => {
            return Err(Error::InvalidStaticPathsUsage { page: page_error() });
        }
        Some(provider) => Some(expand_static_paths(page, provider.as_ref()).await?),
    };

    Ok(PageClassification {
        is_static: !descriptor.has_static_props && !descriptor.has_initial_props,
        is_hybrid_amp: descriptor.config.amp == AmpMode::Hybrid,
        prerender_paths,
        is_prerendered: descriptor.has_static_props,
    })
}

/// Turns the provider's entries into concrete paths, in order.
async fn expand_static_paths(page: &str, provider: &dyn StaticPathsProvider) -> Result<Vec<String>> {
    let route = RouteRegex::new(page)?;

    let entries = provider
        .static_paths()
        .await
        .map_err(|e| Error::StaticPaths {
            page: page.to_string(),
            message: e.to_string(),
        })?;

    entries
        .iter()
        .map(|entry| match entry {
            StaticPathEntry::Path(path) => {
                if route.matches(path).is_none() {
                    return Err(Error::PathMismatch {
                        page: page.to_string(),
                        path: path.clone(),
                    });
                }
                Ok(path.clone())
            }
            StaticPathEntry::Object(object) => build_path(page, &route, object),
        })
        .collect()
}

fn build_path(page: &str, route: &RouteRegex, entry: &Map<String, Value>) -> Result<String> {
    let shape_error = |invalid_keys: Vec<String>, violation| Error::InvalidParamsShape {
        page: page.to_string(),
        invalid_keys,
        expected_shape: expected_shape(route.param_names()),
        violation,
    };

    let outer: Vec<String> = entry.keys().filter(|k| *k != "params").cloned().collect();
    if !outer.is_empty() {
        return Err(shape_error(outer, ParamsShapeViolation::OutsideParams));
    }

    let empty = Map::new();
    let params = match entry.get("params") {
        Some(Value::Object(params)) => params,
        _ => &empty,
    };

    let unknown: Vec<String> = params
        .keys()
        .filter(|k| !route.param_names().contains(*k))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(shape_error(unknown, ParamsShapeViolation::UnknownParams));
    }

    let mut built = page.to_string();
    for name in route.param_names() {
        let value = match params.get(name) {
            Some(Value::String(value)) => value,
            _ => {
                return Err(Error::MissingParam {
                    page: page.to_string(),
                    param: name.clone(),
                })
            }
        };

        let encoded = utf8_percent_encode(value, URI_COMPONENT).to_string();
        built = built.replacen(&format!("[{}]", name), &encoded, 1);
    }

    Ok(built)
}

/// `{ params: { id: ..., slug: ... } }`
fn expected_shape(params: &[String]) -> String {
    let fields: Vec<String> = params.iter().map(|p| format!("{}: ...", p)).collect();
    format!("{{ params: {{ {} }} }}", fields.join(", "))
}
