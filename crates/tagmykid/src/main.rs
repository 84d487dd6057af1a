//! `tagmykid` - CLI for tagmykid
//!
//! This binary provides the command-line interface for parents managing tags
//! and for finders looking them up.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;

use tagmykid::cli::{
    Cli, Command, ConfigCommand, ContactCommand, FindCommand, OutputFormat, TagCommand,
};
use tagmykid::contact::{self, MessageDrafter};
use tagmykid::links::{self, DeepLink};
use tagmykid::resolver::scan::{self, ScanOutcome};
use tagmykid::session::FileSlots;
use tagmykid::storage::{self, IdentityStore};
use tagmykid::{
    init_logging, Config, Error, Field, FinderView, SessionManager, Tag, TagRegistry, TagResolver,
};

type Sessions<'a> = SessionManager<&'a dyn IdentityStore, FileSlots>;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    let Some(error) = err.downcast_ref::<Error>() else {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    };

    if error.is_user_error() {
        eprintln!("{error}");
    } else if error.is_resolution_failure() {
        eprintln!("{error}");
        eprintln!("Check the code printed on the tag and try again.");
    } else {
        eprintln!("error: {err:#}");
    }
    ExitCode::from(error.exit_code())
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Configuration commands work even when the configuration is broken
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(cli.config, config_cmd);
    }

    let config = Config::load_from(cli.config.clone())?;
    let store = storage::open(config.storage.backend, &config.accounts_path())?;
    let accounts: &dyn IdentityStore = &*store;
    let mut sessions = SessionManager::open(accounts, FileSlots::new(config.session_dir()))?;

    match cli.command {
        Command::Signup(cmd) => {
            let session = sessions.signup(&cmd.to_request())?;
            println!(
                "Welcome, {} {}! Signed in as {}.",
                session.name, session.surname, session.phone
            );
        }
        Command::Login(cmd) => {
            let session = sessions.login(cmd.phone.trim(), &cmd.password)?;
            println!("Signed in as {} {}.", session.name, session.surname);
        }
        Command::Logout => {
            sessions.logout()?;
            println!("Signed out.");
        }
        Command::Whoami => handle_whoami(&sessions),
        Command::Tag(tag_cmd) => handle_tag(&config, &sessions, tag_cmd)?,
        Command::Find(find_cmd) => handle_find(&TagResolver::new(accounts), find_cmd)?,
        Command::Contact(contact_cmd) => {
            handle_contact(&config, &TagResolver::new(accounts), &contact_cmd)?;
        }
        Command::Config(_) => unreachable!("handled before loading configuration"),
    }
    Ok(())
}

fn handle_whoami(sessions: &Sessions<'_>) {
    match sessions.current_session() {
        Some(session) => {
            println!("{} {}", session.name, session.surname);
            println!("  Phone:   {}", session.phone);
            println!("  School:  {}", session.school);
            println!(
                "  Since:   {}",
                session.established_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => println!("Not signed in."),
    }
}

fn handle_tag(config: &Config, sessions: &Sessions<'_>, cmd: TagCommand) -> anyhow::Result<()> {
    let registry = TagRegistry::new(*sessions.accounts())
        .with_code_attempts(config.registry.code_attempts);
    let session = sessions.current_session();

    match cmd {
        TagCommand::Create { .. } => {
            let draft = cmd
                .draft()
                .context("tag create carries no tag details")?;
            let tag = registry.create_tag(session, &draft)?;
            sessions.stage_tag(&tag)?;
            println!("Created tag {} for {}.", tag.code, tag.name);
            print_tag_links(config, &tag)?;
        }
        TagCommand::List { format } => {
            let tags = registry.list_tags(session)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
                OutputFormat::Plain if tags.is_empty() => println!("No tags yet."),
                OutputFormat::Plain => {
                    for tag in &tags {
                        println!(
                            "{}  {:<24} Grade {} {}  {}",
                            tag.code, tag.name, tag.grade, tag.class_name, tag.school
                        );
                    }
                }
            }
        }
        TagCommand::Show { code, format } => {
            let tag = own_tag(sessions, &registry, code.as_deref())?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tag)?),
                OutputFormat::Plain => {
                    print_view(&FinderView::from(tag.clone()));
                    print_tag_links(config, &tag)?;
                }
            }
        }
        TagCommand::Qr {
            code,
            format,
            output,
        } => {
            let tag = own_tag(sessions, &registry, code.as_deref())?;
            let link = DeepLink::for_tag(&config.links.base_url, &tag)?;
            let rendered = links::render_qr(link.as_str(), format.into())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote QR code for {} to {}.", tag.code, path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }
    Ok(())
}

// With no code, the tag staged by the last `tag create` is used.
fn own_tag(
    sessions: &Sessions<'_>,
    registry: &TagRegistry<&dyn IdentityStore>,
    code: Option<&str>,
) -> anyhow::Result<Tag> {
    let session = sessions.current_session();
    if let Some(code) = code {
        return Ok(registry.find_own_tag(session, code)?);
    }
    if session.is_none() {
        return Err(Error::Unauthenticated.into());
    }
    match sessions.pending_tag()? {
        Some(tag) => Ok(tag),
        None => bail!("no tag created in this session; pass a tag code"),
    }
}

fn print_tag_links(config: &Config, tag: &Tag) -> anyhow::Result<()> {
    let link = DeepLink::for_tag(&config.links.base_url, tag)?;
    println!("  Link:     {link}");
    println!(
        "  QR image: {}",
        links::qr_service_url(
            &config.links.qr_service_url,
            config.links.qr_size,
            link.as_str()
        )
    );
    Ok(())
}

fn print_view(view: &FinderView) {
    println!("{}", view.name);
    println!("  School:   {}", view.school);
    println!("  Grade:    {} {}", view.grade, view.class_name);
    println!("  Tag code: {}", view.code);
}

fn resolve_scanned(
    resolver: &TagResolver<&dyn IdentityStore>,
    text: &str,
) -> anyhow::Result<FinderView> {
    match scan::extract_payload(text) {
        ScanOutcome::Payload(payload) => Ok(resolver.resolve_link(&payload)?),
        outcome => bail!(outcome.user_message().unwrap_or("unrecognized QR code")),
    }
}

fn handle_find(
    resolver: &TagResolver<&dyn IdentityStore>,
    cmd: FindCommand,
) -> anyhow::Result<()> {
    let (view, format) = match cmd {
        FindCommand::Code { code, format } => (resolver.resolve_code(&code)?, format),
        FindCommand::Link { text, format } => (resolve_scanned(resolver, &text)?, format),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Plain => {
            println!("This item belongs to:");
            print_view(&view);
        }
    }
    Ok(())
}

fn handle_contact(
    config: &Config,
    resolver: &TagResolver<&dyn IdentityStore>,
    cmd: &ContactCommand,
) -> anyhow::Result<()> {
    let view = match (&cmd.code, &cmd.link) {
        (Some(code), _) => resolver.resolve_code(code)?,
        (None, Some(link)) => resolve_scanned(resolver, link)?,
        (None, None) => bail!("pass --code or --link"),
    };

    let drafter = config.drafter();
    let context = if cmd.draft {
        if cmd.context.trim().is_empty() {
            return Err(Error::validation(
                Field::Context,
                "describe where or how you found the item",
            )
            .into());
        }
        if drafter.is_none() {
            warn!("No drafting command configured, using the default message");
        }
        cmd.context.as_str()
    } else {
        ""
    };

    let message = contact::compose_message(
        drafter.as_ref().map(|d| d as &dyn MessageDrafter),
        &view,
        context,
    );
    println!("{}", message.text);
    println!();
    println!("{}", config.contact_bridge().link_for(&view, &message.text));
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Accounts:           {}", config.accounts_path().display());
                println!("  Session directory:  {}", config.session_dir().display());
                println!();
                println!("[Registry]");
                println!("  Code attempts:      {}", config.registry.code_attempts);
                println!();
                println!("[Links]");
                println!("  Base URL:           {}", config.links.base_url);
                println!("  QR service:         {}", config.links.qr_service_url);
                println!("  QR size:            {}", config.links.qr_size);
                println!();
                println!("[Contact]");
                println!("  Messaging URL:      {}", config.contact.messaging_url);
                println!("  Country code:       {}", config.contact.country_code);
                println!("  Trunk prefix:       {}", config.contact.trunk_prefix);
                println!();
                println!("[Drafting]");
                match config.drafter() {
                    Some(drafter) => println!("  Command:            {}", drafter.program()),
                    None => println!("  Command:            (disabled)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
