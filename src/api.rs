pub mod price_source;
pub mod ree;
