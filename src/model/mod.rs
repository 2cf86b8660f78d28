//! Lavalink wire types: tracks and search results, events pushed by a node,
//! and commands sent to one.

mod event;
mod outgoing;
mod track;

pub use self::{event::*, outgoing::*, track::*};
