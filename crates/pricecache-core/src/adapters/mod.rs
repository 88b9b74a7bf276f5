mod synthetic;

pub use synthetic::SyntheticFetcher;
