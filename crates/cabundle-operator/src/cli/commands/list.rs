//! `cabundle-operator list` - Show what a listing publishes.

use anyhow::Result;
use cabundle_core::ResourceId;
use cabundle_fetch::listing;
use cabundle_fetch::ListingEntry;

use super::Context;
use crate::cli::args::ListArgs;
use crate::output::{render_listing, ListingRow};

pub async fn execute(ctx: Context, args: ListArgs) -> Result<()> {
    let base = listing::base_url(&args.url)?;
    let entries = ctx.fetcher()?.list(&base).await?;

    let rows: Vec<ListingRow> = entries.into_iter().map(row).collect();
    println!("{}", render_listing(&rows, ctx.output_format, ctx.color())?);

    Ok(())
}

fn row(entry: ListingEntry) -> ListingRow {
    ListingRow {
        resource: ResourceId::from_logical_name(&entry.name).to_string(),
        logical_name: entry.name,
        url: entry.url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_maps_name_to_resource() {
        let entry = ListingEntry {
            name: "Issuing_CA.crt".into(),
            url: "https://pki.example.com/bundles/Issuing_CA.crt".parse().unwrap(),
        };
        let row = row(entry);
        assert_eq!(row.resource, "issuing-ca");
        assert_eq!(row.logical_name, "Issuing_CA.crt");
    }
}
