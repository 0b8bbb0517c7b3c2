use clap::{Parser, Subcommand};

use ime_cli::commands::{config_ops, key_ops};
use ime_core::key_event::CompositionMode;
use ime_core::keymap::KeyboardLayout;

#[derive(Parser)]
#[command(name = "imetool", about = "IME front-end diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate host key events (JSON lines) into engine key events
    Replay {
        /// Input file (stdin when omitted)
        file: Option<String>,
        #[command(flatten)]
        opts: TranslateArgs,
    },
    /// Translate a single key tap
    Translate {
        /// Key label, e.g. "a" or "Enter"
        key: String,
        /// Physical key code, e.g. "KeyA"
        code: String,
        #[arg(long)]
        alt: bool,
        #[arg(long)]
        ctrl: bool,
        #[arg(long)]
        shift: bool,
        #[command(flatten)]
        opts: TranslateArgs,
    },
    /// Print the default settings TOML
    SettingsExport,
    /// Validate a settings TOML file
    SettingsValidate {
        /// Settings file
        file: String,
    },
    /// Show the keyboard layout configured for a host engine id
    Layout {
        /// Host engine id
        engine_id: String,
        /// Settings file (defaults when omitted)
        #[arg(long)]
        settings: Option<String>,
    },
}

#[derive(clap::Args)]
struct TranslateArgs {
    /// Keyboard layout (us or jp)
    #[arg(long, default_value = "us")]
    layout: KeyboardLayout,
    /// Kana input
    #[arg(long)]
    kana: bool,
    /// Composition mode to stamp, e.g. HIRAGANA
    #[arg(long, value_parser = parse_mode)]
    mode: Option<CompositionMode>,
}

impl TranslateArgs {
    fn options(&self) -> key_ops::ReplayOptions {
        key_ops::ReplayOptions {
            layout: self.layout,
            kana: self.kana,
            mode: self.mode,
        }
    }
}

fn parse_mode(s: &str) -> Result<CompositionMode, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_uppercase()))
        .map_err(|_| format!("unknown composition mode: {s}"))
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay { file, opts } => key_ops::replay_cmd(file.as_deref(), &opts.options()),
        Command::Translate {
            key,
            code,
            alt,
            ctrl,
            shift,
            opts,
        } => key_ops::key_cmd(&key, &code, (alt, ctrl, shift), &opts.options()),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
        Command::Layout {
            engine_id,
            settings,
        } => config_ops::settings_layout(settings.as_deref(), &engine_id),
    }
}
