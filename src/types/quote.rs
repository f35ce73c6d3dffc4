use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Quote {
            symbol: symbol.into(),
            price,
        }
    }
}

/// One row of the gateway's top list. Rank is 1-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedQuote {
    pub rank: usize,
    pub symbol: String,
    pub price: f64,
}
