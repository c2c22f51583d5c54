mod args;
mod commands;

use crate::args::{Command, ContextParams};
use agri_query::context::{Context, ContextName};
use agri_query::{cache, Error, InternalError};
use args::Args;
use clap::Parser;
use colored::Colorize;
use commands::Target;
use std::process::exit;

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(error) = run(args) {
        eprintln!("{intro}: {error}", intro = "error".bold().red());
        exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let target = || Target::resolve(args.database.clone(), args.join);

    match args.command {
        Command::CreateContext(context) => create_context(context),
        Command::UseContext { ref name } => use_context(name.clone()),
        Command::ListContexts => list_contexts(),
        Command::Tables => commands::inspect::tables(target()?),
        Command::Columns { ref table } => commands::inspect::columns(target()?, table),
        Command::Neighbors { ref table } => commands::inspect::neighbors(target()?, table),
        Command::Build => commands::build::build(target()?),
        Command::Run {
            ref name,
            ref export,
        } => commands::saved::run(target()?, name, export.as_deref()),
        Command::Show { ref name } => commands::saved::show(target()?, name),
        Command::Saved => commands::saved::list(),
    }
}

fn create_context(params: ContextParams) -> Result<(), Error> {
    let use_it = params.use_it;
    let new_context: Context = params.into();

    validate_new_context(&new_context)?;

    cache::write(&new_context)?;

    println!("Created new context {}.", new_context.name.to_string().bold());

    if use_it {
        use_context(new_context.name.into())?;
    } else {
        println!(
            "Switch to it by running {}.",
            format!("agq use-context {}", new_context.name).bold()
        );
    }

    Ok(())
}

fn validate_new_context(context: &Context) -> Result<(), Error> {
    if !context.store.path.is_file() {
        Err(InternalError(format!(
            "{} is not a file. Contexts need an existing SQLite database",
            context.store
        )))?;
    }

    Ok(())
}

fn use_context(name: String) -> Result<(), Error> {
    let context_name: ContextName = name.into();

    if !cache::exists::<Context, _>(&context_name)? {
        Err(InternalError(format!(
            "There is no context named {context_name}. See agq list-contexts"
        )))?;
    }

    cache::write(&context_name)?;

    println!("Switched to context {}.", context_name.to_string().bold());

    Ok(())
}

fn list_contexts() -> Result<(), Error> {
    // There may not be a current context yet.
    let current_context = ContextName::current().ok();
    let known_contexts: Vec<Context> = cache::read_all()?;

    if known_contexts.is_empty() {
        println!("No contexts yet. Create one with agq create-context.");

        return Ok(());
    }

    println!("Available contexts:");
    for context in &known_contexts {
        println!(
            "{}{}: {} ({:?})",
            if current_context.as_ref() == Some(&context.name) {
                " * ".bold()
            } else {
                "   ".into()
            },
            context.name.to_string().bold(),
            context.store,
            context.join_strategy
        )
    }

    Ok(())
}
