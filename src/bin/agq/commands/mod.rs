use crate::args::JoinArg;
use agri_query::analyze::StoreParams;
use agri_query::context::Context;
use agri_query::{Error, InternalError, JoinStrategy, Session};
use colored::Colorize;
use log::debug;
use std::future::Future;
use std::path::PathBuf;
use tokio::runtime::Builder;

pub mod build;
pub mod inspect;
pub mod saved;

/// The store to work on, and how to join tables in it.
pub struct Target {
    pub store: StoreParams,
    pub strategy: JoinStrategy,
}

impl Target {
    /// Command line flags win over the current context.
    pub fn resolve(database: Option<PathBuf>, join: Option<JoinArg>) -> Result<Target, Error> {
        let context = Context::current();

        let store = match (database, &context) {
            (Some(path), _) => StoreParams::new(path),
            (None, Ok(context)) => context.store.clone(),
            (None, Err(error)) => {
                debug!("no usable context: {error}");

                return Err(InternalError(
                    "No database to work on. Pass --database, or create a context with \
                     agq create-context"
                        .to_string(),
                )
                .into());
            }
        };

        let strategy = match (join, &context) {
            (Some(join), _) => join.into(),
            (None, Ok(context)) => context.join_strategy,
            (None, Err(_)) => JoinStrategy::default(),
        };

        Ok(Target { store, strategy })
    }

    pub async fn open_session(&self) -> Result<Session, Error> {
        Session::open(self.store.clone(), self.strategy).await
    }
}

/// Runs a future to completion. sqlx is async only, but nothing here needs more than one thread.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, Error> {
    let tokio = Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;

    Ok(tokio.block_on(future))
}

pub fn warn(message: impl std::fmt::Display) {
    eprintln!("{}: {message}", "warning".bold().yellow());
}
