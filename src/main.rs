use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use morse_flow::codec;
use morse_flow::message::{MorseMessage, Timing};
use morse_flow::runtime::{
    spawn_playback_runtime, spawn_silent_runtime, PlaybackController, PlaybackEvent,
};
use morse_flow::settings::Settings;
use morse_flow::trainer::{dictionary_lines, Trainer};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "morseflow", about = "Morse code translator and player")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate text to Morse
    Encode {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Translate Morse to text
    Decode {
        #[arg(required = true, allow_hyphen_values = true)]
        morse: Vec<String>,
    },
    /// Translate and play text as Morse tones
    Play {
        #[arg(required = true, allow_hyphen_values = true)]
        text: Vec<String>,
        /// Input is already Morse
        #[arg(long)]
        morse: bool,
        /// Speed in words per minute (overrides config)
        #[arg(long, conflicts_with = "dot_ms")]
        wpm: Option<u32>,
        /// Dot length in milliseconds (overrides config)
        #[arg(long)]
        dot_ms: Option<u64>,
        /// Tone frequency in Hz (overrides config)
        #[arg(short, long)]
        frequency: Option<f32>,
        /// Keep time without making sound
        #[arg(long)]
        mute: bool,
    },
    /// Show the Morse dictionary
    Dict,
    /// Interactive translate/play shell
    Shell {
        #[arg(long)]
        mute: bool,
    },
    /// Playback configuration
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Show current configuration
    Show,
    /// Set dot length in milliseconds
    Dot { ms: u64 },
    /// Set speed in words per minute
    Wpm { wpm: u32 },
    /// Set tone frequency in Hz
    Frequency { hz: f32 },
    /// Set volume (0.0–1.0)
    Volume { volume: f32 },
    /// Release the audio device after this many idle seconds (0 = never)
    IdleSuspend { seconds: f32 },
    /// Restore defaults
    Reset,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&settings_path);

    match cli.command {
        Commands::Encode { text } => {
            println!("{}", codec::encode(&text.join(" ")));
        }
        Commands::Decode { morse } => {
            println!("{}", codec::decode(&morse.join(" ")));
        }
        Commands::Play {
            text,
            morse,
            wpm,
            dot_ms,
            frequency,
            mute,
        } => {
            let input = text.join(" ");
            let encoded = if morse { input } else { codec::encode(&input) };
            let message = MorseMessage::parse(&encoded);
            if message.is_empty() {
                println!("Nothing to play.");
                return Ok(());
            }

            let mut config = settings.runtime_config();
            if let Some(wpm) = wpm {
                config.timing = Timing::from_wpm(wpm);
            }
            if let Some(ms) = dot_ms {
                config.timing = Timing::from_dot_ms(ms);
            }
            if let Some(hz) = frequency {
                config.shape.frequency_hz = hz;
            }

            println!(
                "Playing: {} [{:.1}s at {} ms/dot]",
                encoded,
                message.duration(config.timing).as_secs_f32(),
                config.timing.dot.as_millis()
            );

            let controller = spawn_runtime(config, mute);
            let (done_tx, done_rx) = mpsc::channel();
            controller
                .play(message, move || {
                    let _ = done_tx.send(());
                })
                .context("cannot start playback")?;
            done_rx
                .recv()
                .context("playback ended without completing")?;
            controller.shutdown();
            println!("Done.");
        }
        Commands::Dict => {
            for line in dictionary_lines() {
                println!("{}", line);
            }
        }
        Commands::Shell { mute } => {
            let controller = spawn_runtime(settings.runtime_config(), mute);
            run_shell(Trainer::new(controller.clone()))?;
            controller.shutdown();
        }
        Commands::Config { action } => {
            match action {
                ConfigCmd::Show => {
                    println!("Settings file: {}", settings_path.display());
                    println!(
                        "Dot: {} ms (~{} wpm) | Frequency: {} Hz | Volume: {} | Decay floor: {}",
                        settings.dot_ms,
                        settings.wpm(),
                        settings.frequency_hz,
                        settings.volume,
                        settings.decay_floor
                    );
                    if settings.idle_suspend_secs > 0.0 {
                        println!("Idle suspend: {}s", settings.idle_suspend_secs);
                    } else {
                        println!("Idle suspend: off");
                    }
                    return Ok(());
                }
                ConfigCmd::Dot { ms } => settings.dot_ms = ms,
                ConfigCmd::Wpm { wpm } => {
                    if wpm == 0 {
                        bail!("speed must be > 0 wpm");
                    }
                    settings.set_wpm(wpm);
                }
                ConfigCmd::Frequency { hz } => settings.frequency_hz = hz,
                ConfigCmd::Volume { volume } => settings.volume = volume,
                ConfigCmd::IdleSuspend { seconds } => settings.idle_suspend_secs = seconds,
                ConfigCmd::Reset => settings = Settings::new(),
            }
            settings.validate().map_err(anyhow::Error::msg)?;
            settings.save_to(&settings_path).map_err(anyhow::Error::msg)?;
            println!("Saved to {}.", settings_path.display());
        }
    }
    Ok(())
}

fn spawn_runtime(config: morse_flow::runtime::RuntimeConfig, mute: bool) -> PlaybackController {
    let on_event = |evt: PlaybackEvent| match evt {
        PlaybackEvent::PlayError(e) => log::error!("{}", e),
        other => log::info!("{:?}", other),
    };
    if mute {
        spawn_silent_runtime(config, on_event)
    } else {
        spawn_playback_runtime(config, on_event)
    }
}

fn run_shell(mut trainer: Trainer) -> anyhow::Result<()> {
    println!("morseflow shell. Type :help for commands.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            trainer.stop();
            break;
        }
        let out = trainer.handle_line(&line);
        for l in &out.lines {
            println!("{}", l);
        }
        if out.quit {
            break;
        }
    }
    Ok(())
}
