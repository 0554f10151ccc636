//! A virtual media player that queues cloud music tracks onto any playback
//! device.
//!
//! Each [`Player`](player::Player) keeps a synthetic position clock, a
//! reconciled track duration, a shuffled queue and a scheduler that decides
//! when to advance to the next track. Players run on their own
//! [`Session`](session::Session) task and are driven by one process-wide
//! [`Ticker`](ticker::Ticker).
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod catalog;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod events;
pub mod player;
pub mod queue;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod shuffle;
pub mod signal;
pub mod ticker;
pub mod track;
pub mod transport;
