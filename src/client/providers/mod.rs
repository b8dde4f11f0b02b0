pub mod europe_pmc;
pub mod pubmed;
pub mod scopus;
pub mod traits;

pub use europe_pmc::EuropePmcProvider;
pub use pubmed::PubMedProvider;
pub use scopus::ScopusProvider;
pub use traits::{ProviderError, ProviderResult, SourceConfig, SourceProvider, Termination};
