pub mod adzuna;
pub mod arbeitnow;
pub mod cleaner;
pub mod factory;
pub mod http;
pub mod normalize;
pub mod remoteok;

pub use adzuna::{AdzunaAdapter, AdzunaCredentials};
pub use arbeitnow::ArbeitnowAdapter;
pub use cleaner::DescriptionCleaner;
pub use factory::{ProviderCredentials, build_adapters};
pub use http::HttpClient;
pub use remoteok::RemoteOkAdapter;
