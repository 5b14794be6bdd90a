use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    println!("{}", style("🔧 PDF Tutor Configuration Setup").bold().cyan());
    println!();

    let mut config = load_existing_config()?;

    println!("{}", style("Ollama Configuration").bold().yellow());
    println!("Configure your local Ollama instance for embeddings and generation.");
    println!();

    configure_ollama(&mut config.ollama)?;

    println!();
    println!("{}", style("Vector Store Configuration").bold().yellow());

    let collection: String = Input::new()
        .with_prompt("Base collection name")
        .default(config.store.collection.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Collection name cannot be empty")
            } else if !input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                Err("Collection name may only contain letters, digits, '_' and '-'")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.store.collection = collection;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per study/test query")
        .default(config.store.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Must retrieve at least one chunk")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.store.top_k = top_k;

    let min_score: f32 = Input::new()
        .with_prompt("Minimum similarity score (0.0 - 1.0)")
        .default(config.store.min_score)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Score must be between 0.0 and 1.0")
            }
        })
        .interact_text()?;
    config.store.min_score = min_score;

    println!();
    println!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama)? {
        println!("{}", style("✓ Ollama connection successful!").green());
    } else {
        println!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        println!("You can continue, but make sure Ollama is running before ingesting documents.");
    }

    println!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        println!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = Config::config_file_path().context("Failed to get config file path")?;
        println!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        println!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Ollama Settings:").bold().yellow());
    println!("  Host: {}", style(&config.ollama.host).cyan());
    println!("  Port: {}", style(config.ollama.port).cyan());
    println!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    println!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
    println!("  Quiz Model: {}", style(&config.ollama.quiz_model).cyan());

    println!();
    println!("{}", style("Vector Store Settings:").bold().yellow());
    println!(
        "  Base Collection: {}",
        style(&config.store.collection).cyan()
    );
    println!("  Top K: {}", style(config.store.top_k).cyan());
    println!("  Min Score: {}", style(config.store.min_score).cyan());

    println!();
    println!("{}", style("Chunking Settings:").bold().yellow());
    println!(
        "  Chunk Size: {}",
        style(config.chunking.chunk_size).cyan()
    );
    println!(
        "  Chunk Overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );

    println!();
    match config.ollama_url() {
        Ok(url) => println!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => println!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    let config_path = Config::config_file_path().context("Failed to get config file path")?;
    println!();
    println!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            println!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            println!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model (summaries and outlines)")
        .default(ollama.chat_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    let quiz_model: String = Input::new()
        .with_prompt("Quiz model")
        .default(ollama.quiz_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    ollama.host = host;
    ollama.port = port;
    ollama.embedding_model = embedding_model;
    ollama.chat_model = chat_model;
    ollama.quiz_model = quiz_model;

    Ok(())
}

fn non_empty_model(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn test_ollama_connection(ollama: &OllamaConfig) -> Result<bool> {
    let url = format!("http://{}:{}/api/version", ollama.host, ollama.port);

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
