//! AI model backends for tabsplit.
//!
//! Each backend implements the three capability traits from
//! `tabsplit_core` — [`tabsplit_core::ReceiptExtractor`],
//! [`tabsplit_core::CommandInterpreter`], and
//! [`tabsplit_core::SplitAuditor`] — over its provider's HTTP API.
//! [`selection::build_from_config`] picks the backend named in the
//! configuration, so the backing model can be swapped without touching the
//! core algorithms.

pub mod anthropic;
pub mod openai_compat;
pub mod prompts;
pub mod selection;

mod payload;

pub use anthropic::AnthropicModel;
pub use openai_compat::OpenAiCompatModel;
pub use selection::{ModelServices, build_from_config};
