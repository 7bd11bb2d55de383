//! Page classification: how a compiled page renders, and which concrete
//! paths a dynamic page prerenders.

pub mod artifact;
pub mod classifier;
pub mod route;

pub use artifact::{
    AmpMode, ArtifactConfig, ArtifactDescriptor, ArtifactLoader, DefaultExport,
    DescriptorFileLoader, LoadError, NoRuntimeConfig, ProviderError, RuntimeConfigInjector,
    SharedRuntimeConfig, StaticPathEntry, StaticPathsProvider,
};
pub use classifier::{classify_artifact, ArtifactClassifier};
pub use route::{is_dynamic_route, RouteRegex};
