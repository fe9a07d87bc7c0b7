//! Tonearm CLI
//!
//! Remote control for an MPD daemon: playback, volume, library listing and
//! status from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tonearm_rpc::{ClientConfig, Column, MpdClient, PlaybackStatus};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tonearm - MPD remote control
#[derive(Parser)]
#[command(name = "tonearm")]
#[command(about = "Remote control for the MPD music daemon")]
#[command(version)]
#[command(after_help = "\
Examples:
  tonearm play 0              Play the first song in the queue
  tonearm pause               Toggle pause
  tonearm volume up           Raise the volume by 5
  tonearm ls                  List every file in the library
  tonearm list artist         List all artists
  tonearm status              Show playback status
  tonearm --host mpd.lan add 'jazz/so_what.flac'

Connection settings are read from the config file, then MPD_HOST / MPD_PORT,
then --host / --port.
")]
struct Cli {
    /// Daemon host (overrides config and `MPD_HOST`)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Daemon port (overrides config and `MPD_PORT`)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log protocol traffic to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start playback at a queue position
    Play {
        /// Queue position, starting at 0
        index: u32,
    },

    /// Stop playback
    Stop,

    /// Play the next song in the queue
    Next,

    /// Toggle pause (uses the daemon's current state)
    Pause,

    /// List all files below a path in the library
    Ls {
        /// Library path (defaults to the root)
        path: Option<String>,
    },

    /// List all values of a tag
    List {
        /// One of: Artist, Album, Title, Track, Genre, Date
        column: String,
    },

    /// Show playback status
    Status {
        /// Print every raw status field
        #[arg(long)]
        raw: bool,
    },

    /// Add a file to the queue
    Add {
        /// File path relative to the music directory
        file: String,
    },

    /// Rescan the music directory
    Update,

    /// Change the volume
    Volume {
        #[command(subcommand)]
        command: VolumeCommand,
    },
}

#[derive(Subcommand)]
enum VolumeCommand {
    /// Raise the volume by 5
    Up,

    /// Lower the volume by 5
    Down,

    /// Set the volume
    Set {
        /// Volume, 0-100
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: u8,
    },
}

/// Set up logging to stderr. `RUST_LOG` takes precedence over `--verbose`.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tonearm={default_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn resolve_config(host: Option<String>, port: Option<u16>) -> Result<ClientConfig> {
    let mut config = ClientConfig::discover().context("Failed to load configuration")?;

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    debug!("Using daemon at {}", config.address());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = resolve_config(cli.host, cli.port)?;
    let address = config.address();
    let mut client = MpdClient::connect(config)
        .await
        .with_context(|| format!("Failed to connect to MPD at {address}"))?;

    match cli.command {
        Commands::Play { index } => client.play(index).await?,
        Commands::Stop => client.stop().await?,
        Commands::Next => client.next().await?,
        Commands::Pause => run_pause(&mut client).await?,
        Commands::Ls { path } => run_ls(&client, path.as_deref()).await?,
        Commands::List { column } => run_list(&client, &column).await?,
        Commands::Status { raw } => run_status(&client, raw).await?,
        Commands::Add { file } => client.add(&file).await?,
        Commands::Update => client.update().await?,
        Commands::Volume { command } => run_volume(&mut client, command).await?,
    }

    Ok(())
}

/// A fresh client knows nothing about the daemon, so sync before toggling
async fn run_pause(client: &mut MpdClient) -> Result<()> {
    client
        .sync_state()
        .await
        .context("Failed to read playback state")?;
    client.pause().await?;
    println!("{}", if client.is_paused() { "Paused" } else { "Playing" });
    Ok(())
}

async fn run_ls(client: &MpdClient, path: Option<&str>) -> Result<()> {
    let files = client.list_all(path).await.context("listall failed")?;
    for file in files {
        println!("{file}");
    }
    Ok(())
}

async fn run_list(client: &MpdClient, column: &str) -> Result<()> {
    let values = client
        .list_column(column)
        .await
        .with_context(|| format!("list {column} failed (supported: {})", Column::supported()))?;
    for value in values {
        println!("{value}");
    }
    Ok(())
}

async fn run_status(client: &MpdClient, raw: bool) -> Result<()> {
    let map = client.status().await.context("Status request failed")?;

    if raw {
        let mut fields: Vec<_> = map.iter().collect();
        fields.sort();
        for (key, value) in fields {
            println!("{key}: {value}");
        }
        return Ok(());
    }

    let status = PlaybackStatus::from_map(&map);
    println!("State: {:?}", status.state);
    match status.volume {
        Some(volume) => println!("Volume: {volume}%"),
        None => println!("Volume: n/a"),
    }
    if let Some(song) = status.song {
        println!("Song: #{song}");
    }
    if let Some(elapsed) = status.elapsed {
        let secs = elapsed.as_secs();
        println!("Elapsed: {}:{:02}", secs / 60, secs % 60);
    }
    println!(
        "Repeat: {}  Random: {}  Single: {}  Consume: {}",
        on_off(status.repeat),
        on_off(status.random),
        on_off(status.single),
        on_off(status.consume)
    );
    Ok(())
}

async fn run_volume(client: &mut MpdClient, command: VolumeCommand) -> Result<()> {
    match command {
        VolumeCommand::Set { volume } => client.set_volume(volume).await?,
        VolumeCommand::Up => {
            sync_volume(client).await?;
            client.volume_up().await?;
        }
        VolumeCommand::Down => {
            sync_volume(client).await?;
            client.volume_down().await?;
        }
    }
    println!("Volume: {}%", client.volume());
    Ok(())
}

/// Steps are relative to the cached volume, which starts out unknown
async fn sync_volume(client: &mut MpdClient) -> Result<()> {
    client
        .sync_state()
        .await
        .context("Failed to read current volume")?;
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tonearm", "status", "--host", "mpd.lan", "--port", "6601"])
            .unwrap();
        assert_eq!(cli.host.as_deref(), Some("mpd.lan"));
        assert_eq!(cli.port, Some(6601));
        assert!(matches!(cli.command, Commands::Status { raw: false }));
    }

    #[test]
    fn test_parse_volume_set_range() {
        let cli = Cli::try_parse_from(["tonearm", "volume", "set", "70"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Volume {
                command: VolumeCommand::Set { volume: 70 }
            }
        ));

        assert!(Cli::try_parse_from(["tonearm", "volume", "set", "101"]).is_err());
    }

    #[test]
    fn test_parse_ls_optional_path() {
        let cli = Cli::try_parse_from(["tonearm", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::Ls { path: None }));

        let cli = Cli::try_parse_from(["tonearm", "ls", "jazz"]).unwrap();
        assert!(matches!(cli.command, Commands::Ls { path: Some(ref p) } if p == "jazz"));
    }
}
