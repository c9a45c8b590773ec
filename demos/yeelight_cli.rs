//! CLI application for controlling Yeelight bulbs through the driver.
//!
//! Every command runs the same path a host platform would: search, register the
//! device, then call capability setters.
//!
//! Run with: cargo run --example yeelight_cli -- --help

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use yeelight_driver::{
    Capability, CapabilityValue, DeviceIdentity, DiscoveryAdapter, Driver, DriverConfig, Host,
    LiveHandle, YeelightDiscovery,
};

#[derive(Parser)]
#[command(name = "yeelight-cli")]
#[command(about = "Control Yeelight bulbs from the command line", long_about = None)]
struct Cli {
    /// Device id of the bulb, as printed by `discover` (not required for discover)
    #[arg(short, long, global = true)]
    id: Option<String>,

    /// How long to listen for search replies, in seconds
    #[arg(short, long, global = true, default_value = "3")]
    listen: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all bulbs on the network
    Discover,

    /// Print the cached state of the bulb
    Status,

    /// Turn the bulb on
    On,

    /// Turn the bulb off
    Off,

    /// Set brightness (0.0-1.0)
    Dim { level: f64 },

    /// Set hue and saturation (0.0-1.0 each)
    Color { hue: f64, saturation: f64 },

    /// Set color temperature (0.0 cold to 1.0 warm)
    Temperature { temperature: f64 },

    /// Switch between `color` and `temperature` mode
    Mode { mode: String },

    /// Start or stop an endless hue cycle
    Loop {
        #[arg(long)]
        stop: bool,
    },

    /// Print property pushes from the bulb until interrupted
    Listen,
}

/// Prints what the driver reports to the host.
struct PrintingHost;

impl Host for PrintingHost {
    fn set_available(&self, identity: &DeviceIdentity) {
        println!("[{}] available", identity);
    }

    fn set_unavailable(&self, identity: &DeviceIdentity, reason: &str) {
        println!("[{}] unavailable: {}", identity, reason);
    }

    fn realtime(&self, identity: &DeviceIdentity, capability: Capability, value: CapabilityValue) {
        println!("[{}] {} -> {:?}", identity, capability, value);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = DriverConfig {
        search_listen: Duration::from_secs(cli.listen),
        ..DriverConfig::default()
    };
    let discovery = Arc::new(YeelightDiscovery::new(&config));
    let target = config.search_target.clone();
    let driver = Driver::new(Arc::clone(&discovery), Arc::new(PrintingHost), config);

    println!("Searching for bulbs ({}s)...", cli.listen);
    discovery.search(&target).await?;

    if let Commands::Discover = cli.command {
        let bulbs = discovery.get_all();
        if bulbs.is_empty() {
            println!("No bulbs found on the network.");
            return Ok(());
        }
        println!("\nFound {} bulb(s):", bulbs.len());
        for bulb in bulbs {
            let ad = bulb.advertisement();
            println!(
                "  id: {:20}  addr: {:21}  model: {:10}  name: {}",
                bulb.id(),
                bulb.addr().to_string(),
                ad.model.unwrap_or_default(),
                ad.name.unwrap_or_default()
            );
        }
        return Ok(());
    }

    // All other commands require a device id
    let id = cli.id.ok_or("device id is required for this command. Use --id <ID>")?;
    let identity = DeviceIdentity::new(&id);
    driver.added(&identity);
    if !driver.registry().contains(&identity) {
        return Err(format!("bulb {} did not answer the search", id).into());
    }

    // Let the initial property query land.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let lights = driver.capabilities();

    match cli.command {
        Commands::Discover => unreachable!(),

        Commands::Status => {
            let state = driver.registry().state(&identity)?;
            println!("\n{}", serde_json::to_string_pretty(&state)?);
            println!("flow: {:?}", lights.flow(&identity)?);
        }

        Commands::On => {
            lights.set_onoff(&identity, true).await?;
            println!("Bulb turned ON");
        }

        Commands::Off => {
            lights.set_onoff(&identity, false).await?;
            println!("Bulb turned OFF");
        }

        Commands::Dim { level } => {
            let applied = lights.set_dim(&identity, level).await?;
            println!("Brightness set to {}", applied);
        }

        Commands::Color { hue, saturation } => {
            lights.set_light_hue(&identity, hue).await?;
            lights.set_light_saturation(&identity, saturation).await?;
            println!("Color set");
        }

        Commands::Temperature { temperature } => {
            lights.set_light_temperature(&identity, temperature).await?;
            println!("Temperature set");
        }

        Commands::Mode { mode } => {
            let applied = lights.set_light_mode(&identity, &mode).await?;
            println!("Mode set to {}", applied);
        }

        Commands::Loop { stop } => {
            if stop {
                lights.stop_color_loop(&identity).await?;
                println!("Color loop stopped");
            } else {
                lights.start_color_loop(&identity).await?;
                println!("Color loop started");
            }
        }

        Commands::Listen => {
            let bulb = driver.registry().handle(&identity)?;
            let mut notifications = bulb.notifications();
            // Opens the connection pushes arrive on.
            bulb.get_values().await?;
            println!("Listening for property pushes... (Press Ctrl+C to stop)\n");
            while let Ok(props) = notifications.recv().await {
                println!("{}", serde_json::to_string_pretty(&props)?);
            }
        }
    }

    Ok(())
}
