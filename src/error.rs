use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("malformed taxonomy document: {0}")]
    MalformedTaxonomy(String),
}
