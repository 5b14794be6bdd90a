use clap::{Parser, Subcommand};
use pdf_tutor::Result;
use pdf_tutor::commands::{
    delete_document, list_documents, show_outline, show_status, study_passage, test_passage,
    upload_document,
};
use pdf_tutor::config::{run_interactive_config, show_config};
use pdf_tutor::pipeline::Difficulty;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-tutor")]
#[command(about = "A PDF tutoring tool: ingest a document, then study and quiz yourself on it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a PDF: extract, chunk, embed, index, and outline it
    Upload {
        /// Path to the PDF file
        pdf: PathBuf,
    },
    /// Print the stored outline for a document
    Outline {
        /// Document ID or name (default: the most recently ingested document)
        document: Option<String>,
    },
    /// Generate a study summary for a passage
    Study {
        /// Passage to study, e.g. a section pasted from the outline
        passage: String,
    },
    /// Generate multiple-choice test questions for a passage
    Test {
        /// Passage to be quizzed on
        passage: String,
        /// Question difficulty
        #[arg(long, value_enum, default_value_t = Difficulty::Intermediate)]
        difficulty: Difficulty,
    },
    /// List all ingested documents
    List,
    /// Delete a document and its vector collection
    Delete {
        /// Document ID or name to delete
        document: String,
    },
    /// Show connectivity and pipeline status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Upload { pdf } => {
            upload_document(pdf).await?;
        }
        Commands::Outline { document } => {
            show_outline(document).await?;
        }
        Commands::Study { passage } => {
            study_passage(passage).await?;
        }
        Commands::Test {
            passage,
            difficulty,
        } => {
            test_passage(passage, difficulty).await?;
        }
        Commands::List => {
            list_documents().await?;
        }
        Commands::Delete { document } => {
            delete_document(document).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["pdf-tutor", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::List);
        }
    }

    #[test]
    fn upload_command_with_path() {
        let cli = Cli::try_parse_from(["pdf-tutor", "upload", "notes.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Upload { pdf } = parsed.command {
                assert_eq!(pdf, PathBuf::from("notes.pdf"));
            }
        }
    }

    #[test]
    fn upload_command_requires_path() {
        let cli = Cli::try_parse_from(["pdf-tutor", "upload"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn test_command_default_difficulty() {
        let cli = Cli::try_parse_from(["pdf-tutor", "test", "cell structure"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Test {
                passage,
                difficulty,
            } = parsed.command
            {
                assert_eq!(passage, "cell structure");
                assert_eq!(difficulty, Difficulty::Intermediate);
            }
        }
    }

    #[test]
    fn test_command_with_difficulty() {
        let cli = Cli::try_parse_from([
            "pdf-tutor",
            "test",
            "cell structure",
            "--difficulty",
            "hard",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Test { difficulty, .. } = parsed.command {
                assert_eq!(difficulty, Difficulty::Hard);
            }
        }
    }

    #[test]
    fn test_command_rejects_unknown_difficulty() {
        let cli = Cli::try_parse_from([
            "pdf-tutor",
            "test",
            "cell structure",
            "--difficulty",
            "impossible",
        ]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }

    #[test]
    fn outline_document_is_optional() {
        let cli = Cli::try_parse_from(["pdf-tutor", "outline"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Outline { document } = parsed.command {
                assert_eq!(document, None);
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["pdf-tutor", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["pdf-tutor", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["pdf-tutor", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
