//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand, ValueEnum};

use crate::model::{SignupRequest, TagDraft};

/// Signup command arguments.
#[derive(Debug, Args)]
pub struct SignupCommand {
    /// Phone number; becomes your login
    #[arg(long)]
    pub phone: String,

    /// Password (at least 6 characters)
    #[arg(long)]
    pub password: String,

    /// Given name
    #[arg(long)]
    pub name: String,

    /// Family name
    #[arg(long)]
    pub surname: String,

    /// Your child's school
    #[arg(long)]
    pub school: String,
}

impl SignupCommand {
    /// The request this command submits.
    #[must_use]
    pub fn to_request(&self) -> SignupRequest {
        SignupRequest {
            phone: self.phone.clone(),
            secret: self.password.clone(),
            name: self.name.clone(),
            surname: self.surname.clone(),
            school: self.school.clone(),
        }
    }
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Phone number used at signup
    #[arg(long)]
    pub phone: String,

    /// Password
    #[arg(long)]
    pub password: String,
}

/// Tag management commands.
#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// Register a tag for a child
    Create {
        /// Child's full name
        #[arg(long)]
        name: String,

        /// Grade, 0 to 12
        #[arg(long)]
        grade: String,

        /// Class letter
        #[arg(long = "class", value_name = "LETTER")]
        class_name: String,

        /// Number the finder should contact
        #[arg(long)]
        parent_phone: String,
    },

    /// List your tags
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show a tag with its link; defaults to the tag created last
    Show {
        /// Tag code
        code: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Render a printable QR code for a tag
    Qr {
        /// Tag code; defaults to the tag created last
        code: Option<String>,

        /// Image format
        #[arg(short, long, value_enum, default_value = "text")]
        format: QrFormatArg,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl TagCommand {
    /// The draft submitted by `tag create`, if this is one.
    #[must_use]
    pub fn draft(&self) -> Option<TagDraft> {
        match self {
            Self::Create {
                name,
                grade,
                class_name,
                parent_phone,
            } => Some(TagDraft::new(
                name.as_str(),
                grade.as_str(),
                class_name.as_str(),
                parent_phone.as_str(),
            )),
            _ => None,
        }
    }
}

/// Finder lookup commands.
#[derive(Debug, Subcommand)]
pub enum FindCommand {
    /// Look up a tag by the six-character code printed on it
    Code {
        /// Tag code
        code: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Look up a tag from the text of a scanned QR code
    Link {
        /// Scanned text
        text: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Contact command arguments.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("tag").required(true).args(["code", "link"])))]
pub struct ContactCommand {
    /// Tag code
    #[arg(long)]
    pub code: Option<String>,

    /// Scanned link
    #[arg(long)]
    pub link: Option<String>,

    /// Where or how you found the item
    #[arg(long, default_value = "")]
    pub context: String,

    /// Ask the configured drafting program to write the message
    #[arg(long)]
    pub draft: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// QR image format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QrFormatArg {
    /// SVG document
    Svg,
    /// Terminal block characters
    Text,
}

impl From<QrFormatArg> for crate::links::QrFormat {
    fn from(arg: QrFormatArg) -> Self {
        match arg {
            QrFormatArg::Svg => Self::Svg,
            QrFormatArg::Text => Self::Text,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
