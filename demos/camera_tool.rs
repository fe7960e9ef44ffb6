use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use isapi_client::{ExposureMode, IrcutFilterType, IsapiClient, StatusConvention};

/// Command line access to one camera's ISAPI interface.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Camera address, e.g. 192.168.1.64 or https://camera.lab
    #[arg(long, env = "ISAPI_HOST")]
    host: String,

    #[arg(long, env = "ISAPI_USERNAME", default_value = "admin")]
    username: String,

    /// Environment variable holding the password
    #[arg(long, default_value = "ISAPI_PASSWORD")]
    password_env: String,

    /// Use HTTPS when the address has no scheme
    #[arg(long)]
    https: bool,

    /// Accept any server certificate
    #[arg(long)]
    insecure: bool,

    /// PEM CA certificate to trust
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    channel: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check reachability and credentials
    Check,
    /// Save the image settings document, pretty printed
    Dump { output: PathBuf },
    /// Replace all image settings from a file
    Restore { input: PathBuf },
    /// Print the permitted shutter speeds
    ShutterLevels {
        #[arg(long, default_value = "image_channels.xml")]
        cache: PathBuf,
    },
    /// Adjust color levels
    Color {
        #[arg(long)]
        brightness: Option<u32>,
        #[arg(long)]
        contrast: Option<u32>,
        #[arg(long)]
        saturation: Option<u32>,
        #[arg(long)]
        sharpness: Option<u32>,
    },
    Shutter { level: String },
    Gain { level: u32 },
    /// auto, day, night, schedule or eventTrigger
    Ircut { mode: String },
    /// manual, p-iris-auto or p-iris-manual
    Exposure {
        mode: String,
        #[arg(long)]
        iris: Option<u32>,
    },
    /// Write an arbitrary XML document to an endpoint
    Put {
        endpoint: String,
        input: PathBuf,
        /// Expect status code 0 instead of 1
        #[arg(long)]
        bulk: bool,
    },
    Certificates,
    Snapshot {
        output: PathBuf,
        /// Measure the capture rate over this many snapshots instead
        #[arg(long)]
        rate: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let mut builder = IsapiClient::builder()
        .host(&cli.host)
        .username(&cli.username)
        .password_from_env(&cli.password_env)?;
    if cli.https {
        builder = builder.https();
    }
    if let Some(ca) = cli.ca_cert {
        builder = builder.ca_certificate(ca);
    }
    if cli.insecure {
        builder = builder.insecure();
    }
    let client = builder.build()?;
    let image = client.image();
    let channel = cli.channel;

    match cli.command {
        Command::Check => {
            let status = client.check_connection().await?;
            println!("{}: {status:?}", client.base_url());
        }
        Command::Dump { output } => {
            image.channels().await?.save_pretty(&output).await?;
        }
        Command::Restore { input } => {
            let status = image.update_channels_from_file(&input).await?;
            println!("{} {}", status.status_code, status.status_string);
        }
        Command::ShutterLevels { cache } => {
            for level in image.shutter_levels(&cache).await? {
                println!("{level}");
            }
        }
        Command::Color { brightness, contrast, saturation, sharpness } => {
            let mut adjustment = image.set_image_adjustment(channel);
            if let Some(level) = brightness {
                adjustment = adjustment.brightness(level);
            }
            if let Some(level) = contrast {
                adjustment = adjustment.contrast(level);
            }
            if let Some(level) = saturation {
                adjustment = adjustment.saturation(level);
            }
            if let Some(level) = sharpness {
                adjustment = adjustment.sharpness(level);
            }
            for status in adjustment.send().await? {
                println!("{:?}: {}", status.request_url, status.status_string);
            }
        }
        Command::Shutter { level } => {
            image.set_shutter(channel, level).await?;
        }
        Command::Gain { level } => {
            image.set_gain(channel, level).await?;
        }
        Command::Ircut { mode } => {
            image.set_ircut_filter(channel, IrcutFilterType::from(mode.as_str())).await?;
        }
        Command::Exposure { mode, iris } => {
            let mode = match mode.as_str() {
                "manual" => ExposureMode::Manual,
                "p-iris-auto" => ExposureMode::PIrisAuto,
                "p-iris-manual" => ExposureMode::PIrisManual { iris_level: iris },
                other => return Err(format!("unknown exposure mode {other}").into()),
            };
            image.set_exposure(channel, mode).await?;
        }
        Command::Put { endpoint, input, bulk } => {
            let xml = tokio::fs::read_to_string(&input).await?;
            let convention =
                if bulk { StatusConvention::Bulk } else { StatusConvention::SingleAttribute };
            let status = client.put_xml(&endpoint, xml, convention).await?;
            println!("{} {}", status.status_code, status.status_string);
        }
        Command::Certificates => {
            let certificates = client.certificates().list().await?;
            println!("{:<12} {:<30} {:<22} {}", "ID", "Subject", "Expires", "Status");
            println!("{}", "-".repeat(80));
            for cert in certificates {
                println!(
                    "{:<12} {:<30} {:<22} {}",
                    cert.custom_id,
                    cert.subject_dn.unwrap_or_default(),
                    cert.end_date.unwrap_or_default(),
                    cert.status.unwrap_or_default()
                );
            }
        }
        Command::Snapshot { output, rate } => match rate {
            Some(count) => match client.streaming().measure_snapshot_rate(channel, count).await? {
                Some(rate) => println!(
                    "{} samples: min {:.2} fps, max {:.2} fps, mean {:.2} fps",
                    rate.samples, rate.min_fps, rate.max_fps, rate.mean_fps
                ),
                None => println!("no snapshot succeeded"),
            },
            None => client.streaming().save_snapshot(channel, &output).await?,
        },
    }

    Ok(())
}
