pub mod cbr;

pub use cbr::CbrRateProvider;
