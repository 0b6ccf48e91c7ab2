//! Synthetic e-commerce dataset for the benchmark queries.
//!
//! Generates users, categories, products, orders, and wishlists at three
//! scales as CSV files ready for `LOAD CSV`. Every row draws from its own
//! RNG seeded by (master seed, table, row index), so rows can be built in
//! parallel and the same seed always yields byte-identical files.
//!
//! # Layout
//!
//! ```text
//! <root>/dataset_<scale>/
//!   categories.csv   category_id,name,description
//!   products.csv     product_id,name,price,brand,rating,category_id
//!   users.csv        user_id,name,email,registration_date
//!   orders.csv       order_id,user_id,product_id,timestamp,quantity,total_price
//!   wishlists.csv    wishlist_id,user_id,product_id,added_on
//!   import.cypher    LOAD CSV statements for the files above
//!   manifest.json    scale, seed, row counts, SHA-256 per table
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use csv::{ReaderBuilder, WriterBuilder};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{BenchError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const IMPORT_FILE: &str = "import.cypher";

/// Dataset size preset.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Small,
    Medium,
    Large,
}

/// Row counts per table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleCounts {
    pub users: usize,
    pub products: usize,
    pub categories: usize,
    pub orders: usize,
    pub wishlists: usize,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Small, Scale::Medium, Scale::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Small => "small",
            Scale::Medium => "medium",
            Scale::Large => "large",
        }
    }

    pub fn counts(&self) -> ScaleCounts {
        match self {
            Scale::Small => ScaleCounts {
                users: 400,
                products: 100,
                categories: 10,
                orders: 440,
                wishlists: 50,
            },
            Scale::Medium => ScaleCounts {
                users: 4_000,
                products: 1_000,
                categories: 15,
                orders: 4_500,
                wishlists: 500,
            },
            Scale::Large => ScaleCounts {
                users: 40_000,
                products: 10_000,
                categories: 20,
                orders: 40_000,
                wishlists: 10_000,
            },
        }
    }

    pub fn dir_name(&self) -> String {
        format!("dataset_{}", self.as_str())
    }
}

/// Configuration for dataset generation.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub scale: Scale,
    pub seed: u64,
    /// Orders and wishlists fall in this year; registrations span its decade.
    pub anchor_year: i32,
    /// Overrides the preset counts (used by tests and benches).
    pub counts: Option<ScaleCounts>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            scale: Scale::Small,
            seed: 42,
            anchor_year: 2025,
            counts: None,
        }
    }
}

impl GenerateConfig {
    pub fn counts(&self) -> ScaleCounts {
        self.counts.unwrap_or_else(|| self.scale.counts())
    }
}

struct CategoryProfile {
    name: &'static str,
    description: &'static str,
    brands: &'static [&'static str],
    products: &'static [&'static str],
    price_range: (f64, f64),
}

const CATEGORY_PROFILES: [CategoryProfile; 5] = [
    CategoryProfile {
        name: "Electronics",
        description: "Devices such as phones, laptops, and home appliances.",
        brands: &["Samsung", "Apple", "Sony", "LG", "Dell", "HP", "Asus"],
        products: &[
            "Smartphone",
            "Laptop",
            "Headphones",
            "Tablet",
            "Smartwatch",
            "Camera",
            "TV",
        ],
        price_range: (100.0, 2500.0),
    },
    CategoryProfile {
        name: "Books",
        description: "Printed and digital reading materials.",
        brands: &["Penguin", "HarperCollins", "O'Reilly", "Vintage", "Macmillan"],
        products: &["Novel", "Textbook", "Comics", "Biography", "Cookbook"],
        price_range: (5.0, 100.0),
    },
    CategoryProfile {
        name: "Clothing",
        description: "Fashion and apparel for men and women.",
        brands: &["Nike", "Adidas", "Zara", "H&M", "Uniqlo"],
        products: &["T-shirt", "Jeans", "Jacket", "Dress", "Sneakers"],
        price_range: (15.0, 300.0),
    },
    CategoryProfile {
        name: "Home",
        description: "Household essentials and furniture.",
        brands: &["IKEA", "Philips", "Bosch", "Dyson", "Panasonic"],
        products: &["Vacuum Cleaner", "Lamp", "Microwave", "Blender", "Air Purifier"],
        price_range: (25.0, 700.0),
    },
    CategoryProfile {
        name: "Beauty",
        description: "Personal care and cosmetic products.",
        brands: &["L'Oreal", "Nivea", "Dove", "Clinique", "Maybelline"],
        products: &["Shampoo", "Perfume", "Lipstick", "Face Cream", "Body Lotion"],
        price_range: (5.0, 150.0),
    },
];

const EXTRA_CATEGORIES: [&str; 15] = [
    "Garden", "Sports", "Toys", "Automotive", "Grocery", "Music", "Office", "Pets", "Jewelry",
    "Tools", "Baby", "Outdoors", "Games", "Health", "Travel",
];

const FIRST_NAMES: [&str; 20] = [
    "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry", "Ivy", "Jack", "Kate",
    "Leo", "Mia", "Noah", "Olivia", "Paul", "Quinn", "Ruby", "Sam", "Tina",
];

const LAST_NAMES: [&str; 20] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin",
];

const EMAIL_DOMAINS: [&str; 4] = ["gmail.com", "yahoo.com", "outlook.com", "example.com"];

const WORDS: [&str; 16] = [
    "Nova", "Prime", "Classic", "Lite", "Pro", "Max", "Air", "Edge", "Flex", "Core", "Pulse",
    "Vista", "Echo", "Aura", "Zen", "Spark",
];

const COMPANY_SUFFIXES: [&str; 4] = ["Ltd", "Inc", "Group", "and Sons"];

const SENTENCE_NOUNS: [&str; 8] = [
    "goods", "supplies", "essentials", "gear", "items", "accessories", "products", "equipment",
];

#[derive(Clone, Copy)]
enum Table {
    Products,
    Users,
    Orders,
    Wishlists,
}

impl Table {
    fn salt(self) -> u64 {
        match self {
            Table::Products => 0x5052_4f44,
            Table::Users => 0x5553_4552,
            Table::Orders => 0x4f52_4453,
            Table::Wishlists => 0x5749_5348,
        }
    }
}

fn per_row_seed(master_seed: u64, table: Table, index: usize) -> u64 {
    (master_seed ^ table.salt())
        .wrapping_add(index as u64)
        .wrapping_mul(0x517cc1b727220a95)
}

fn row_rng(master_seed: u64, table: Table, index: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(per_row_seed(master_seed, table, index))
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &'a [&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub category_id: usize,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_id: usize,
    pub name: String,
    pub price: f64,
    pub brand: String,
    pub rating: f64,
    pub category_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub user_id: usize,
    pub name: String,
    pub email: String,
    pub registration_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: usize,
    pub user_id: usize,
    pub product_id: usize,
    pub timestamp: NaiveDateTime,
    pub quantity: u32,
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistRow {
    pub wishlist_id: usize,
    pub user_id: usize,
    pub product_id: usize,
    pub added_on: NaiveDate,
}

/// All tables of one dataset, in id order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub categories: Vec<CategoryRow>,
    pub products: Vec<ProductRow>,
    pub users: Vec<UserRow>,
    pub orders: Vec<OrderRow>,
    pub wishlists: Vec<WishlistRow>,
}

/// Date windows derived from the anchor year.
struct Calendar {
    decade_start: NaiveDate,
    year_start: NaiveDate,
    year_start_at_midnight: NaiveDateTime,
    decade_days: i64,
    year_days: i64,
}

impl Calendar {
    fn new(anchor_year: i32) -> Result<Self> {
        let invalid = || BenchError::config(format!("invalid anchor year {anchor_year}"));
        let decade_start =
            NaiveDate::from_ymd_opt(anchor_year - anchor_year.rem_euclid(10), 1, 1)
                .ok_or_else(invalid)?;
        let year_start = NaiveDate::from_ymd_opt(anchor_year, 1, 1).ok_or_else(invalid)?;
        let year_end = NaiveDate::from_ymd_opt(anchor_year, 12, 31).ok_or_else(invalid)?;
        let year_start_at_midnight = year_start.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        Ok(Self {
            decade_start,
            year_start,
            year_start_at_midnight,
            decade_days: (year_end - decade_start).num_days(),
            year_days: (year_end - year_start).num_days(),
        })
    }

    fn date_this_decade<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        self.decade_start + Duration::days(rng.gen_range(0..=self.decade_days))
    }

    fn date_this_year<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        self.year_start + Duration::days(rng.gen_range(0..=self.year_days))
    }

    fn datetime_this_year<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDateTime {
        let secs = rng.gen_range(0..(self.year_days + 1) * 86_400);
        self.year_start_at_midnight + Duration::seconds(secs)
    }
}

fn generate_categories(count: usize, seed: u64) -> Vec<CategoryRow> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            if let Some(profile) = CATEGORY_PROFILES.get(i) {
                return CategoryRow {
                    category_id: i,
                    name: profile.name.to_string(),
                    description: profile.description.to_string(),
                };
            }
            let extra = i - CATEGORY_PROFILES.len();
            let base = EXTRA_CATEGORIES[extra % EXTRA_CATEGORIES.len()];
            let name = match extra / EXTRA_CATEGORIES.len() {
                0 => base.to_string(),
                n => format!("{base} {}", n + 1),
            };
            let description = format!(
                "{} {} for everyday {}.",
                pick(&mut rng, &WORDS),
                pick(&mut rng, &SENTENCE_NOUNS),
                base.to_lowercase()
            );
            CategoryRow {
                category_id: i,
                name,
                description,
            }
        })
        .collect()
}

fn generate_product(seed: u64, index: usize, categories: &[CategoryRow]) -> ProductRow {
    let mut rng = row_rng(seed, Table::Products, index);
    let category_id = rng.gen_range(0..categories.len());
    let suffix = pick(&mut rng, &WORDS);

    let (name, brand, price) = match CATEGORY_PROFILES.get(category_id) {
        Some(profile) => {
            let (lo, hi) = profile.price_range;
            (
                format!("{} {}", pick(&mut rng, profile.products), suffix),
                pick(&mut rng, profile.brands).to_string(),
                round_to(rng.gen_range(lo..=hi), 2),
            )
        }
        None => (
            suffix.to_string(),
            format!(
                "{} {}",
                pick(&mut rng, &LAST_NAMES),
                pick(&mut rng, &COMPANY_SUFFIXES)
            ),
            round_to(rng.gen_range(5.0..=500.0), 2),
        ),
    };

    ProductRow {
        product_id: index,
        name,
        price,
        brand,
        rating: round_to(rng.gen_range(1.0..=5.0), 1),
        category_id,
    }
}

fn generate_user(seed: u64, index: usize, calendar: &Calendar) -> UserRow {
    let mut rng = row_rng(seed, Table::Users, index);
    let first = pick(&mut rng, &FIRST_NAMES);
    let last = pick(&mut rng, &LAST_NAMES);
    let email = format!(
        "{}.{}{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        rng.gen_range(1..1000),
        pick(&mut rng, &EMAIL_DOMAINS)
    );
    UserRow {
        user_id: index,
        name: format!("{first} {last}"),
        email,
        registration_date: calendar.date_this_decade(&mut rng),
    }
}

fn generate_order(seed: u64, index: usize, counts: &ScaleCounts, calendar: &Calendar) -> OrderRow {
    let mut rng = row_rng(seed, Table::Orders, index);
    let quantity: u32 = rng.gen_range(1..=3);
    let unit_price = round_to(rng.gen_range(5.0..=500.0), 2);
    OrderRow {
        order_id: index,
        user_id: rng.gen_range(0..counts.users),
        product_id: rng.gen_range(0..counts.products),
        timestamp: calendar.datetime_this_year(&mut rng),
        quantity,
        total_price: round_to(f64::from(quantity) * unit_price, 2),
    }
}

fn generate_wishlist(
    seed: u64,
    index: usize,
    counts: &ScaleCounts,
    calendar: &Calendar,
) -> WishlistRow {
    let mut rng = row_rng(seed, Table::Wishlists, index);
    WishlistRow {
        wishlist_id: index,
        user_id: rng.gen_range(0..counts.users),
        product_id: rng.gen_range(0..counts.products),
        added_on: calendar.date_this_year(&mut rng),
    }
}

/// Builds every table in memory.
pub fn generate_dataset(config: &GenerateConfig) -> Result<Dataset> {
    let counts = config.counts();
    if counts.users == 0 || counts.products == 0 || counts.categories == 0 {
        return Err(BenchError::config(
            "users, products, and categories must each have at least one row",
        ));
    }
    let calendar = Calendar::new(config.anchor_year)?;
    let seed = config.seed;

    let categories = generate_categories(counts.categories, seed);
    let products = (0..counts.products)
        .into_par_iter()
        .map(|i| generate_product(seed, i, &categories))
        .collect();
    let users = (0..counts.users)
        .into_par_iter()
        .map(|i| generate_user(seed, i, &calendar))
        .collect();
    let orders = (0..counts.orders)
        .into_par_iter()
        .map(|i| generate_order(seed, i, &counts, &calendar))
        .collect();
    let wishlists = (0..counts.wishlists)
        .into_par_iter()
        .map(|i| generate_wishlist(seed, i, &counts, &calendar))
        .collect();

    Ok(Dataset {
        categories,
        products,
        users,
        orders,
        wishlists,
    })
}

/// One table as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub file: String,
    pub rows: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub scale: Scale,
    pub seed: u64,
    pub anchor_year: i32,
    pub generator_version: String,
    pub tables: Vec<TableEntry>,
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    let mut s = String::with_capacity(64);
    for b in digest {
        s.push_str(&format!("{b:02x}"));
    }
    Ok(s)
}

fn write_table<T: Serialize>(dir: &Path, file: &str, rows: &[T]) -> Result<TableEntry> {
    let path = dir.join(file);
    let mut writer = WriterBuilder::new().from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    drop(writer);
    Ok(TableEntry {
        file: file.to_string(),
        rows: rows.len(),
        sha256: sha256_file(&path)?,
    })
}

/// Generates a dataset under `root/dataset_<scale>/` and returns its manifest.
pub fn write_dataset(root: &Path, config: &GenerateConfig) -> Result<(PathBuf, DatasetManifest)> {
    let dataset = generate_dataset(config)?;
    let dir = root.join(config.scale.dir_name());
    fs::create_dir_all(&dir)?;

    let tables = vec![
        write_table(&dir, "categories.csv", &dataset.categories)?,
        write_table(&dir, "products.csv", &dataset.products)?,
        write_table(&dir, "users.csv", &dataset.users)?,
        write_table(&dir, "orders.csv", &dataset.orders)?,
        write_table(&dir, "wishlists.csv", &dataset.wishlists)?,
    ];
    fs::write(dir.join(IMPORT_FILE), import_script(config.scale))?;

    let manifest = DatasetManifest {
        scale: config.scale,
        seed: config.seed,
        anchor_year: config.anchor_year,
        generator_version: env!("CARGO_PKG_VERSION").to_string(),
        tables,
    };
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    Ok((dir, manifest))
}

/// `LOAD CSV` statements that import a generated dataset into Neo4j.
pub fn import_script(scale: Scale) -> String {
    let d = scale.dir_name();
    format!(
        r#"LOAD CSV WITH HEADERS FROM 'file:///{d}/users.csv' AS row
CREATE (:User {{
    user_id: toInteger(row.user_id),
    name: row.name,
    email: row.email,
    registration_date: date(row.registration_date)
}});

LOAD CSV WITH HEADERS FROM 'file:///{d}/categories.csv' AS row
CREATE (:Category {{
    category_id: toInteger(row.category_id),
    name: row.name,
    description: row.description
}});

LOAD CSV WITH HEADERS FROM 'file:///{d}/products.csv' AS row
MATCH (c:Category {{category_id: toInteger(row.category_id)}})
CREATE (p:Product {{
    product_id: toInteger(row.product_id),
    name: row.name,
    price: toFloat(row.price),
    brand: row.brand,
    rating: toFloat(row.rating)
}})
CREATE (p)-[:BELONGS_TO]->(c);

LOAD CSV WITH HEADERS FROM 'file:///{d}/orders.csv' AS row
MATCH (u:User {{user_id: toInteger(row.user_id)}}),
      (p:Product {{product_id: toInteger(row.product_id)}})
CREATE (u)-[:PLACED {{
    order_id: toInteger(row.order_id),
    timestamp: datetime(row.timestamp),
    quantity: toInteger(row.quantity),
    total_price: toFloat(row.total_price)
}}]->(p);

LOAD CSV WITH HEADERS FROM 'file:///{d}/wishlists.csv' AS row
MATCH (u:User {{user_id: toInteger(row.user_id)}}),
      (p:Product {{product_id: toInteger(row.product_id)}})
CREATE (u)-[:WISHLISTED {{added_on: date(row.added_on)}}]->(p);
"#
    )
}

pub fn read_manifest(dir: &Path) -> Result<DatasetManifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(BenchError::Dataset {
            path: dir.to_path_buf(),
            reason: format!("no {MANIFEST_FILE} found"),
        });
    }
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

fn collect_csv_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut out = BTreeMap::new();
    for entry in walkdir::WalkDir::new(dir).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| BenchError::Dataset {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let is_csv = entry.path().extension().and_then(|e| e.to_str()) == Some("csv");
        if entry.file_type().is_file() && is_csv {
            let name = entry.file_name().to_string_lossy().to_string();
            out.insert(name, entry.path().to_path_buf());
        }
    }
    Ok(out)
}

/// Re-hashes every table listed in the manifest.
pub fn verify_dataset(dir: &Path) -> Result<DatasetManifest> {
    let manifest = read_manifest(dir)?;
    let mut files = collect_csv_files(dir)?;

    for table in &manifest.tables {
        let path = files.remove(&table.file).ok_or_else(|| BenchError::Dataset {
            path: dir.to_path_buf(),
            reason: format!("{} is listed in the manifest but missing", table.file),
        })?;
        let actual = sha256_file(&path)?;
        if actual != table.sha256 {
            return Err(BenchError::Dataset {
                path,
                reason: format!("sha256 mismatch: manifest {}, file {actual}", table.sha256),
            });
        }
        info!(file = %table.file, rows = table.rows, "verified");
    }
    for extra in files.keys() {
        warn!(file = %extra, "csv file not listed in manifest");
    }
    Ok(manifest)
}

/// Reads an integer id column, e.g. `user_id` from `users.csv`.
pub fn read_id_column(path: &Path, column: &str) -> Result<Vec<i64>> {
    let dataset_err = |reason: String| BenchError::Dataset {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = ReaderBuilder::new().from_path(path)?;
    let idx = reader
        .headers()?
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| dataset_err(format!("no `{column}` column")))?;

    let mut ids = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw = record.get(idx).unwrap_or_default().trim();
        let id = raw
            .parse::<i64>()
            .map_err(|e| dataset_err(format!("row {}: {raw:?} is not an id ({e})", line + 1)))?;
        ids.push(id);
    }
    Ok(ids)
}
