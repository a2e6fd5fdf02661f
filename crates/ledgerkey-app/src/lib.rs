// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod combobox;
pub mod errors;
pub mod form;
pub mod ids;
pub mod keys;
pub mod modal;
pub mod model;
pub mod palette;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod shortcuts;

pub use combobox::*;
pub use errors::*;
pub use form::*;
pub use ids::*;
pub use keys::*;
pub use modal::*;
pub use model::*;
pub use palette::*;
pub use runtime::*;
pub use sequencer::*;
pub use session::*;
pub use shortcuts::*;
