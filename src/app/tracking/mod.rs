mod history;
mod list;
mod notify;
mod reconcile;
mod service;

pub(crate) use history::*;
pub(crate) use list::*;
pub(crate) use notify::*;
#[cfg(test)]
pub(crate) use reconcile::*;
pub(crate) use service::*;
