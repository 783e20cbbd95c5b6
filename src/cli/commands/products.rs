//! List products command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::{CatalogService, SeaOrmCatalogService};

pub async fn cmd_list_products(config: &Config, title: Option<&str>) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let catalog = SeaOrmCatalogService::new(store);

    let products = catalog.list(title).await?;

    if products.is_empty() {
        match title {
            Some(t) => println!("No products with a title containing \"{t}\"."),
            None => println!("The catalog is empty."),
        }
        return Ok(());
    }

    println!("Products ({} total)", products.len());
    println!("{:-<70}", "");

    for product in products {
        println!("• {} [{:.2}]", product.title, product.price);
        println!(
            "  ID: {} | Author: {} | Genre: {} | Images: {}",
            product.id,
            product.author.as_deref().unwrap_or("-"),
            product.genre.as_deref().unwrap_or("-"),
            product.images.len()
        );
        println!(
            "  Added: {}",
            product.date_of_created.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
