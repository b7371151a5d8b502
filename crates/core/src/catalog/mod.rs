pub mod http;
pub mod fixed;

use crate::domain::Stock;

pub use fixed::StaticCatalog;
pub use http::HttpCatalog;

/// Source of the tracked universe.
///
/// Implementations never fail to the caller: on an upstream error they degrade to the last
/// good list, or to an empty list when nothing was ever fetched. An empty result means
/// "retry later", not "the universe is empty".
#[async_trait::async_trait]
pub trait SymbolCatalog: Send + Sync {
    fn catalog_name(&self) -> &'static str;

    /// Constituents in stable index order.
    async fn list_symbols(&self) -> Vec<Stock>;
}

pub(crate) fn validate_stock(stock: &Stock) -> anyhow::Result<()> {
    anyhow::ensure!(!stock.symbol.trim().is_empty(), "symbol must be non-empty");
    anyhow::ensure!(!stock.name.trim().is_empty(), "name must be non-empty");
    anyhow::ensure!(
        stock.price.is_finite() && stock.change.is_finite() && stock.change_percent.is_finite(),
        "price fields must be finite for {}",
        stock.symbol
    );
    Ok(())
}
