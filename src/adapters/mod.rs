// Adapters layer: concrete implementations of the domain ports that talk to
// external services.

pub mod duckduckgo;
pub mod nominatim;

pub use duckduckgo::DuckDuckGoSearch;
pub use nominatim::NominatimGeocoder;
