use std::collections::HashSet;

use crate::feed::{FeedError, Snapshot, SnapshotFetcher};

/// Assets tracked for the life of the process, in upstream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetCatalog {
    assets: Vec<String>,
}

impl AssetCatalog {
    /// One fetch, every asset in the coin list. Assets listed upstream later
    /// stay invisible until restart.
    pub async fn discover<F: SnapshotFetcher + ?Sized>(fetcher: &F) -> Result<Self, FeedError> {
        let snapshot = fetcher.fetch_snapshot().await?;
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut seen = HashSet::new();
        let assets = snapshot
            .assets()
            .filter(|a| seen.insert(*a))
            .map(str::to_string)
            .collect();
        Self { assets }
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_upstream_order_and_drops_duplicates() {
        let snap = Snapshot::parse(
            r#"{"data":{"calculationTime":1,"coins":[
                {"asset":"USDT","totalBorrowInUsdt":1,"totalRepayInUsdt":1},
                {"asset":"BTC","totalBorrowInUsdt":1,"totalRepayInUsdt":1},
                {"asset":"USDT","totalBorrowInUsdt":2,"totalRepayInUsdt":2}]}}"#,
        )
        .unwrap();
        let cat = AssetCatalog::from_snapshot(&snap);
        assert_eq!(cat.assets(), &["USDT".to_string(), "BTC".to_string()]);
        assert_eq!(cat.len(), 2);
    }
}
