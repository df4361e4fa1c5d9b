//! cabundle-operator - mirror published CA bundles into cluster ConfigMaps.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cabundle_operator::run().await
}
