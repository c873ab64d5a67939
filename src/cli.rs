use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP transcription service
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overrides the config file
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List providers and their models
    Models,

    /// Translate a local WebVTT file
    Translate {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,

        /// Target language code
        #[arg(short, long, default_value = "en")]
        target_lang: String,

        /// Model provider
        #[arg(long, default_value = "openai")]
        provider: String,

        /// Translation model
        #[arg(short, long, default_value = "gpt-4o-mini")]
        model: String,

        /// API key for the provider
        #[arg(long)]
        api_key: String,

        /// Override the provider's API base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Write the default configuration to a file
    Config {
        /// Output path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_translate() {
        let args = Args::try_parse_from([
            "subfuse", "translate", "-i", "in.vtt", "-o", "out.vtt", "-t", "ja", "--api-key", "sk-test-123456",
        ])
        .unwrap();
        match args.command {
            Commands::Translate { target_lang, provider, model, .. } => {
                assert_eq!(target_lang, "ja");
                assert_eq!(provider, "openai");
                assert_eq!(model, "gpt-4o-mini");
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let args = Args::try_parse_from(["subfuse", "-v", "serve", "--port", "9000"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Serve { host: None, port: Some(9000) }));
    }
}
