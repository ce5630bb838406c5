// botwatch: bot-or-human classification for social media accounts
//
// This is the library root. Each module corresponds to a major subsystem
// of the train-and-serve pipeline; `features` is the contract both halves
// share.

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod service;
pub mod status;
pub mod training;

#[cfg(feature = "web")]
pub mod web;
