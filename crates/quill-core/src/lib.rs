//! # quill-core
//!
//! Foundation types for the Quill knowledge-base service.
//!
//! This crate provides the shared vocabulary the other quill crates depend on:
//!
//! - **Envelopes**: [`envelope::Envelope`] (one addressed outbound unit)
//!   plus the [`envelope::UpdateType`] discriminator and constructor functions
//! - **Manifests**: [`manifest::Manifest`] nesting group → item →
//!   [`manifest::FileRecord`], each with an ordered [`manifest::EventStream`]
//! - **Stages**: [`progress::Stage`] and the fixed progress lookup table
//! - **Control frames**: [`control::ControlFrame`], inbound session commands
//! - **Constants**: upload frame marker, storage ceiling, default group key
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other quill crates.

#![deny(unsafe_code)]

pub mod constants;
pub mod control;
pub mod envelope;
pub mod manifest;
pub mod progress;
