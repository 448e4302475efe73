use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use sd_generate::api::ApiClient;
use sd_generate::config::Config;
use sd_generate::controller::{FormController, Outcome};
use sd_generate::render::render_to_file;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sd-generate")]
#[command(about = "Generate images with a remote Stable Diffusion backend")]
struct CliArgs {
    /// Backend base URL (overrides BACKEND_URL).
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Bearer token (overrides API_KEY).
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a prompt and save the generated image.
    Generate {
        /// Text describing the image.
        prompt: String,

        /// Number of inference steps (20-100).
        #[arg(long, default_value_t = 60)]
        steps: u32,

        /// Guidance scale (1.0-20.0, step 0.5).
        #[arg(long, default_value_t = 7.0, value_parser = parse_guidance_arg)]
        guidance: f64,

        /// Output file; the extension is detected when omitted.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Ask the backend whether the model is loaded.
    Health,
}

fn parse_guidance_arg(input: &str) -> std::result::Result<f64, String> {
    input
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("Invalid guidance scale '{}'. Expected a number", input))
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "generated_{}",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sd_generate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env_with(args.backend_url, args.api_key) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let client = ApiClient::new(&config)?;
    let mut controller = FormController::new(Box::new(client));

    match args.command {
        Command::Health => match controller.check_health().await {
            Ok(health) => {
                println!(
                    "status: {}, model_loaded: {}",
                    health.status, health.model_loaded
                );
                Ok(())
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                std::process::exit(1);
            }
        },
        Command::Generate {
            prompt,
            steps,
            guidance,
            output,
        } => {
            let inputs = controller.inputs_mut();
            inputs.set_prompt(prompt);
            if inputs.set_num_steps(steps) != steps {
                warn!("Steps clamped to {}", inputs.num_steps());
            }
            if inputs.set_guidance_scale(guidance) != guidance {
                warn!("Guidance scale adjusted to {}", inputs.guidance_scale());
            }

            let outcome = match controller.submit().await {
                Ok(outcome) => outcome,
                Err(rejected) => {
                    error!("{}", rejected);
                    std::process::exit(2);
                }
            };

            let image = match outcome {
                Outcome::Success { image } => image,
                Outcome::Failure { message, .. } => {
                    error!("{}", message);
                    std::process::exit(1);
                }
            };

            let output = output.unwrap_or_else(default_output_path);
            match render_to_file(&image, &output) {
                Ok(rendered) => {
                    info!("Generation completed successfully");
                    println!("{}", rendered.path.display());
                    Ok(())
                }
                Err(e) => {
                    error!("Could not render image: {}", e);
                    controller.report_render_failure();
                    if let Some(message) = controller.error() {
                        error!("{}", message);
                    }
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_guidance_arg_valid() {
        assert_eq!(parse_guidance_arg("7.5").unwrap(), 7.5);
    }

    #[test]
    fn test_parse_guidance_arg_invalid() {
        let err = parse_guidance_arg("NaN").unwrap_err();
        assert!(err.contains("Expected a number"));
        assert!(parse_guidance_arg("high").is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let args = CliArgs::try_parse_from([
            "sd-generate",
            "--backend-url",
            "http://localhost:8000",
            "generate",
            "a red fox",
            "--steps",
            "30",
        ])
        .unwrap();

        assert_eq!(args.backend_url.as_deref(), Some("http://localhost:8000"));
        match args.command {
            Command::Generate {
                prompt,
                steps,
                guidance,
                output,
            } => {
                assert_eq!(prompt, "a red fox");
                assert_eq!(steps, 30);
                assert_eq!(guidance, 7.0);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
