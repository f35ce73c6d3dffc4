pub mod cryptocompare;

pub use cryptocompare::CryptoCompare;
