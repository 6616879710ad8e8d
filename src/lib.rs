//! # dashsim - LTE adaptive video streaming scenario composer
//!
//! This library composes reproducible experiments in which adaptive video
//! clients stream over an LTE radio access network while optional background
//! load competes for capacity.
//!
//! ## Overview
//!
//! A scenario is a set of base stations and clients placed in space (on a
//! line, or randomly inside buildings), an evolved packet core with a single
//! remote host serving video segments, one adaptive streaming session per
//! client, optional downlink/uplink/peer load flows, and measurement
//! collectors. The composer computes all of this up front and hands it to a
//! simulation engine, which then runs to a fixed stop time.
//!
//! ## Architecture
//!
//! - `config`: typed YAML scenario configuration and validation
//! - `config_loader`: configuration file loading and CLI overrides
//! - `placement`: building geometry, position planning, position log
//! - `ip`: client and backhaul address plans
//! - `topology`: node creation, attachment, addressing and routes
//! - `flows`: video and generic flow planning with port allocation
//! - `policy`: per-client streaming policy and start scheduling
//! - `trace`: output layout, collector wiring, trace files
//! - `engine`: the simulation engine seam and the scenario document engine
//! - `orchestrator`: runs the phases in order and drives the engine
//! - `utils`: duration parsing and formatting
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dashsim::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("scenario.yaml"))?;
//! let report = orchestrator::run_scenario(&config)?;
//!
//! // report.artifacts lists the scenario document, the run summary and the
//! // trace files under {output_dir}/{policy}/{clients}/
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Configuration Format
//!
//! Every section has defaults, so only the differences need to be written:
//!
//! ```yaml
//! general:
//!   simulation_id: 3
//!   output_dir: dash-log-files
//!
//! network:
//!   access_points: 2
//!   clients: 8
//!   distance: 60
//!
//! placement:
//!   mode: building_random
//!
//! buildings:
//!   - { x_min: 0, x_max: 40, y_min: 10, y_max: 28, z_min: 0, z_max: 18,
//!       floors: 6, rooms_x: 8, rooms_y: 3 }
//!
//! flows:
//!   peer: true
//!   packet_interval: 100ms
//!
//! streaming:
//!   policy_cycle: [panda, festive]
//! ```
//!
//! ## Error Handling
//!
//! Library modules return typed errors (`ScenarioError`, `ValidationError`,
//! `EngineError`). The orchestrator and the binary wrap them with
//! `color_eyre` context.

pub mod config;
pub mod config_loader;
pub mod engine;
pub mod error;
pub mod flows;
pub mod ip;
pub mod orchestrator;
pub mod placement;
pub mod policy;
pub mod topology;
pub mod trace;
pub mod utils;

pub use error::ScenarioError;
