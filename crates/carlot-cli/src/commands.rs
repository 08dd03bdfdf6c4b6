//! Subcommands and their plain-text output.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use carlot_core::utils::{format_price, truncate_string};
use carlot_core::{Car, CarPage, CarPatch, Config, Inventory, KeyValueStore, NewCar, Query, RemoteSource, Source};

/// Column widths for the list table
const ID_WIDTH: usize = 24;
const BRAND_WIDTH: usize = 12;
const MODEL_WIDTH: usize = 16;
const COLOR_WIDTH: usize = 10;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List cars one page at a time
    List {
        /// Only cars of this brand (exact, case-insensitive); "all" for every brand
        #[arg(long, short)]
        brand: Option<String>,

        /// Only cars whose brand or model contains this text
        #[arg(long, short)]
        search: Option<String>,

        #[arg(long, short, default_value_t = 1)]
        page: usize,

        /// Cars per page (defaults to the configured page size)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Show one car from local storage
    Show { id: String },

    /// Add a car
    Add(CarArgs),

    /// Change fields of a car in local storage
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditArgs,
    },

    /// Delete a car
    Delete { id: String },

    /// List the brands in local storage
    Brands,

    /// Check whether the API is reachable
    Status,

    /// Show the effective settings
    Config {
        /// Write the effective settings (including --api-url/--data-dir) to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Args)]
pub struct CarArgs {
    #[arg(long)]
    brand: String,
    #[arg(long)]
    model: String,
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
    #[arg(long)]
    color: String,
    #[arg(long, allow_negative_numbers = true)]
    price: f64,
    #[arg(long)]
    vin: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Image URL; repeat for more images, in display order
    #[arg(long = "thumbnail")]
    thumbnails: Vec<String>,
}

impl CarArgs {
    /// The create payload, rejected if it breaks the car rules
    fn validated(self) -> Result<NewCar> {
        let car = self.into_new_car();
        if let Err(e) = car.validate() {
            bail!("Invalid car: {}", e);
        }
        Ok(car)
    }

    fn into_new_car(self) -> NewCar {
        let mut car = NewCar {
            brand: self.brand,
            model: self.model,
            year: self.year,
            color: self.color,
            price: self.price,
            vin: self.vin,
            description: self.description,
            thumbnails: None,
        };
        for url in &self.thumbnails {
            car.add_thumbnail(url);
        }
        car
    }
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    year: Option<i32>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    price: Option<f64>,
    #[arg(long)]
    vin: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Replace the images; repeat for more, in display order
    #[arg(long = "thumbnail")]
    thumbnails: Vec<String>,
}

impl EditArgs {
    fn validated(self) -> Result<CarPatch> {
        let patch = self.into_patch();
        if patch == CarPatch::default() {
            bail!("Nothing to change: pass at least one field to edit");
        }
        if let Err(e) = patch.validate() {
            bail!("Invalid change: {}", e);
        }
        Ok(patch)
    }

    fn into_patch(self) -> CarPatch {
        CarPatch {
            brand: self.brand,
            model: self.model,
            year: self.year,
            color: self.color,
            price: self.price,
            vin: self.vin,
            description: self.description,
            thumbnails: (!self.thumbnails.is_empty()).then_some(self.thumbnails),
        }
    }
}

pub async fn run<R, S>(inventory: &Inventory<R, S>, config: &Config, command: Command) -> Result<()>
where
    R: RemoteSource,
    S: KeyValueStore,
{
    match command {
        Command::List {
            brand,
            search,
            page,
            limit,
        } => {
            let mut query = Query::new(page, limit.unwrap_or_else(|| config.page_size()));
            query.brand = brand;
            query.search = search;

            let result = inventory.fetch_collection(&query).await;
            print!("{}", render_page(&result, query.page));
        }
        Command::Show { id } => match inventory.get_car(&id) {
            Some(car) => print!("{}", render_car(&car)),
            None => bail!("Car not found: {}", id),
        },
        Command::Add(args) => {
            let stored = inventory.create_car(args.validated()?).await;
            println!("{}", added_message(stored.source));
            print!("{}", render_car(&stored.value));
        }
        Command::Edit { id, changes } => {
            let patch = changes.validated()?;
            if !inventory.update_car(&id, patch) {
                bail!("Car not found in local storage: {}", id);
            }
            println!("Car updated successfully (in local storage)");
        }
        Command::Delete { id } => match inventory.delete_car(&id).await {
            Some(source) => println!("{}", deleted_message(source)),
            None => bail!("Failed to delete car {}: not found in the API or local storage", id),
        },
        Command::Brands => {
            for brand in inventory.brands() {
                println!("{}", brand);
            }
        }
        Command::Status => {
            let status = inventory.check_status().await;
            println!("Data source: {}", status.state);
            println!("Last checked: {}", status.checked_at.format("%H:%M:%S UTC"));
            if status.is_online() {
                println!("Connected to API. Data is synchronized.");
            } else {
                println!("Using local storage as fallback. Data will be saved locally.");
            }
        }
        Command::Config { save } => {
            print!("{}", render_config(config)?);
            if save {
                config.save()?;
                println!("Saved to {}", Config::config_path()?.display());
            }
        }
    }
    Ok(())
}

fn added_message(source: Source) -> String {
    match source {
        Source::Remote => "Car added successfully via API".to_string(),
        Source::Local => "Car added successfully (saved to local storage)".to_string(),
    }
}

fn deleted_message(source: Source) -> String {
    match source {
        Source::Remote => "Car deleted successfully via API".to_string(),
        Source::Local => "Car deleted successfully (from local storage)".to_string(),
    }
}

fn render_config(config: &Config) -> Result<String> {
    let mut out = format!("API URL:         {}\n", config.api_url());
    out.push_str(&format!("Local storage:   {}\n", config.storage_dir()?.display()));
    out.push_str(&format!("Request timeout: {}s\n", config.request_timeout().as_secs()));
    out.push_str(&format!("Page size:       {}\n", config.page_size()));
    Ok(out)
}

fn render_page(result: &CarPage, page: usize) -> String {
    let source = if result.using_local_storage {
        Source::Local
    } else {
        Source::Remote
    };
    let mut out = format!("Data source: {}\n", source);

    if result.cars.is_empty() {
        out.push_str("No cars found\n");
    } else {
        out.push_str(&format!(
            "{:<ID_WIDTH$} {:<BRAND_WIDTH$} {:<MODEL_WIDTH$} {:>4} {:<COLOR_WIDTH$} {:>12}\n",
            "ID", "BRAND", "MODEL", "YEAR", "COLOR", "PRICE"
        ));
        for car in &result.cars {
            out.push_str(&render_row(car));
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "Page {} of {} ({} cars)\n",
        page.max(1),
        result.total_pages,
        result.total_cars
    ));
    out
}

fn render_row(car: &Car) -> String {
    format!(
        "{:<ID_WIDTH$} {:<BRAND_WIDTH$} {:<MODEL_WIDTH$} {:>4} {:<COLOR_WIDTH$} {:>12}",
        truncate_string(&car.id, ID_WIDTH),
        truncate_string(&car.brand, BRAND_WIDTH),
        truncate_string(&car.model, MODEL_WIDTH),
        car.year,
        truncate_string(&car.color, COLOR_WIDTH),
        format_price(car.price),
    )
}

fn render_car(car: &Car) -> String {
    let mut out = format!("{} ({})\n", car.display_name(), car.id);
    out.push_str(&format!("  Year:  {}\n", car.year));
    out.push_str(&format!("  Color: {}\n", car.color));
    out.push_str(&format!("  Price: {}\n", format_price(car.price)));
    if let Some(ref vin) = car.vin {
        out.push_str(&format!("  VIN:   {}\n", vin));
    }
    if let Some(ref description) = car.description {
        out.push_str(&format!("  {}\n", description));
    }
    let thumbnails = car.thumbnails();
    if thumbnails.is_empty() {
        out.push_str("  No images available\n");
    } else {
        for (i, url) in thumbnails.iter().enumerate() {
            out.push_str(&format!("  Image {}: {}\n", i + 1, url));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camry() -> Car {
        Car {
            id: "1".to_string(),
            brand: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2023,
            color: "Silver".to_string(),
            price: 28000.0,
            vin: Some("1HGBH41JXMN109186".to_string()),
            description: None,
            thumbnails: None,
        }
    }

    #[test]
    fn test_car_args_dedupe_thumbnails() {
        let args = CarArgs {
            brand: "Kia".to_string(),
            model: "Soul".to_string(),
            year: 2021,
            color: "Green".to_string(),
            price: 18000.0,
            vin: None,
            description: None,
            thumbnails: vec!["a.jpg".to_string(), "b.jpg".to_string(), "a.jpg".to_string()],
        };
        let car = args.into_new_car();
        assert_eq!(car.thumbnails, Some(vec!["a.jpg".to_string(), "b.jpg".to_string()]));
    }

    #[test]
    fn test_edit_args_without_thumbnails_keeps_images() {
        let args = EditArgs {
            brand: None,
            model: None,
            year: None,
            color: None,
            price: Some(1.0),
            vin: None,
            description: None,
            thumbnails: vec![],
        };
        let patch = args.into_patch();
        assert_eq!(patch.price, Some(1.0));
        assert_eq!(patch.thumbnails, None);
    }

    fn soul_args() -> CarArgs {
        CarArgs {
            brand: "Kia".to_string(),
            model: "Soul".to_string(),
            year: 2021,
            color: "Green".to_string(),
            price: 18000.0,
            vin: None,
            description: None,
            thumbnails: vec![],
        }
    }

    fn empty_edit() -> EditArgs {
        EditArgs {
            brand: None,
            model: None,
            year: None,
            color: None,
            price: None,
            vin: None,
            description: None,
            thumbnails: vec![],
        }
    }

    #[test]
    fn test_add_rejects_invalid_car() {
        assert!(soul_args().validated().is_ok());

        let args = CarArgs {
            brand: String::new(),
            ..soul_args()
        };
        let err = args.validated().unwrap_err();
        assert_eq!(err.to_string(), "Invalid car: Brand is required");

        assert!(CarArgs { year: 1, ..soul_args() }.validated().is_err());
        assert!(CarArgs { price: -5.0, ..soul_args() }.validated().is_err());
    }

    #[test]
    fn test_edit_rejects_empty_and_invalid_changes() {
        assert!(empty_edit().validated().is_err());

        let args = EditArgs {
            year: Some(1899),
            ..empty_edit()
        };
        assert!(args.validated().unwrap_err().to_string().starts_with("Invalid change: Year must be between 1900"));

        let args = EditArgs {
            price: Some(0.0),
            ..empty_edit()
        };
        assert_eq!(args.validated().unwrap().price, Some(0.0));
    }

    #[test]
    fn test_render_config() {
        let config = Config {
            api_url: Some("http://localhost:8080/cars".to_string()),
            data_dir: Some(std::path::PathBuf::from("/data")),
            request_timeout_secs: Some(5),
            page_size: None,
        };
        let out = render_config(&config).expect("render");
        assert!(out.contains("API URL:         http://localhost:8080/cars\n"));
        assert!(out.contains("Request timeout: 5s\n"));
        assert!(out.contains("Page size:       5\n"));
        assert!(out.contains("localhost_8080"));
    }

    #[test]
    fn test_render_page_reports_source() {
        let page = CarPage {
            cars: vec![camry()],
            total_cars: 6,
            total_pages: 2,
            using_local_storage: true,
        };
        let out = render_page(&page, 1);
        assert!(out.starts_with("Data source: local storage\n"));
        assert!(out.contains("$28,000"));
        assert!(out.ends_with("Page 1 of 2 (6 cars)\n"));
    }

    #[test]
    fn test_render_empty_page() {
        let page = CarPage {
            cars: vec![],
            total_cars: 0,
            total_pages: 0,
            using_local_storage: false,
        };
        let out = render_page(&page, 1);
        assert!(out.starts_with("Data source: API\n"));
        assert!(out.contains("No cars found"));
    }

    #[test]
    fn test_render_car_without_images() {
        let out = render_car(&camry());
        assert!(out.starts_with("Toyota Camry (1)\n"));
        assert!(out.contains("VIN:   1HGBH41JXMN109186"));
        assert!(out.contains("No images available"));
    }
}
