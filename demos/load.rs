use rtprops::{ConfigLoader, PropertyStore};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AppConfig {
    app: AppSection,
    database: DatabaseSection,
}

#[derive(Debug, Deserialize)]
struct AppSection {
    name: String,
    debug: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
    url: String,
}

fn main() -> Result<(), rtprops::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // RTPROPS_DEMO__ENV=prod cargo run --example load
    let mut ambient = PropertyStore::new();
    ambient.set("env", "dev");

    let report = ConfigLoader::builder()
        .with_ambient(ambient)
        .with_env("RTPROPS_DEMO", "__")
        .build()
        .load_file_report("demos/conf/default.conf")?;

    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }

    let store = report.store;
    println!("{store}");

    let port: i32 = store.require("database.port")?;
    println!("Database port: {port}");

    let config: AppConfig = store.deserialize()?;
    println!("App: {} (debug={})", config.app.name, config.app.debug);
    println!("Database URL: {}", config.database.url);

    Ok(())
}
