//! # Database Module
//!
//! Postgres persistence for the two catalog tables, `products` and
//! `exclusive_products`. Both share one column layout, so every operation
//! takes the [`ProductTable`] it targets.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::product::{Category, ProductDraft, ProductTable};

/// A persisted catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProduct {
    pub id: i64,
    pub table: ProductTable,
    pub draft: ProductDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, name, plan, validity, price, description, tags, features, \
                       category, subcategory, image, created_at, updated_at";

/// Create both catalog tables and their indexes if they do not exist
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    for table in [ProductTable::Products, ProductTable::ExclusiveProducts] {
        let name = table.table_name();
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {name} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                plan TEXT NOT NULL DEFAULT 'unknown',
                validity TEXT NOT NULL DEFAULT 'unknown',
                price BIGINT NULL CHECK (price IS NULL OR price >= 0),
                description TEXT NOT NULL DEFAULT '',
                tags TEXT[] NOT NULL DEFAULT '{{}}',
                features TEXT[] NOT NULL DEFAULT '{{}}',
                category TEXT NOT NULL,
                subcategory TEXT NOT NULL DEFAULT 'unknown',
                image TEXT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create {name} table"))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{name}_created_at ON {name}(created_at DESC)"
        ))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create {name} created_at index"))?;
    }

    info!("Database schema initialized successfully");
    Ok(())
}

fn row_to_product(row: &PgRow, table: ProductTable) -> Result<StoredProduct> {
    let category: String = row.try_get("category")?;
    let draft = ProductDraft {
        name: row.try_get("name")?,
        plan: row.try_get("plan")?,
        validity: row.try_get("validity")?,
        price: row.try_get("price")?,
        description: row.try_get("description")?,
        tags: row.try_get("tags")?,
        features: row.try_get("features")?,
        category: Category::infer(Some(category.as_str()), ""),
        subcategory: row.try_get("subcategory")?,
        image: row.try_get("image")?,
    };
    Ok(StoredProduct {
        id: row.try_get("id")?,
        table,
        draft,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a draft and return the new row id
pub async fn insert_product(pool: &PgPool, table: ProductTable, draft: &ProductDraft) -> Result<i64> {
    let name = table.table_name();
    debug!(table = name, product = %draft.name, "Inserting product");

    let row = sqlx::query(&format!(
        "INSERT INTO {name} (name, plan, validity, price, description, tags, features, category, subcategory, image)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING id"
    ))
    .bind(&draft.name)
    .bind(&draft.plan)
    .bind(&draft.validity)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.tags)
    .bind(&draft.features)
    .bind(draft.category.as_str())
    .bind(&draft.subcategory)
    .bind(&draft.image)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to insert into {name}"))?;

    let id: i64 = row.get(0);
    info!(table = name, id, "Product saved");
    Ok(id)
}

/// Fetch one product by id
pub async fn get_product(pool: &PgPool, table: ProductTable, id: i64) -> Result<Option<StoredProduct>> {
    let name = table.table_name();
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM {name} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to read product {id} from {name}"))?;

    row.map(|row| row_to_product(&row, table)).transpose()
}

/// Overwrite every field of an existing product; `false` when it does not exist
pub async fn update_product(
    pool: &PgPool,
    table: ProductTable,
    id: i64,
    draft: &ProductDraft,
) -> Result<bool> {
    let name = table.table_name();
    let result = sqlx::query(&format!(
        "UPDATE {name} SET name = $1, plan = $2, validity = $3, price = $4, description = $5,
             tags = $6, features = $7, category = $8, subcategory = $9, image = $10,
             updated_at = NOW()
         WHERE id = $11"
    ))
    .bind(&draft.name)
    .bind(&draft.plan)
    .bind(&draft.validity)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.tags)
    .bind(&draft.features)
    .bind(draft.category.as_str())
    .bind(&draft.subcategory)
    .bind(&draft.image)
    .bind(id)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to update product {id} in {name}"))?;

    let updated = result.rows_affected() > 0;
    info!(table = name, id, updated, "Product update");
    Ok(updated)
}

/// Delete a product; `false` when it did not exist
pub async fn delete_product(pool: &PgPool, table: ProductTable, id: i64) -> Result<bool> {
    let name = table.table_name();
    let result = sqlx::query(&format!("DELETE FROM {name} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete product {id} from {name}"))?;

    let deleted = result.rows_affected() > 0;
    info!(table = name, id, deleted, "Product delete");
    Ok(deleted)
}

/// Most recently created products, newest first
pub async fn list_recent_products(
    pool: &PgPool,
    table: ProductTable,
    limit: i64,
) -> Result<Vec<StoredProduct>> {
    let name = table.table_name();
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM {name} ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit.max(0))
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to list products from {name}"))?;

    rows.iter().map(|row| row_to_product(row, table)).collect()
}
