use crate::types::quote::Quote;

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTarget {
    pub bid: Quote,
    pub ask: Quote,
}
