//! Headless engine for a multi-step host onboarding wizard.
//!
//! The wizard walks an operator through picking a monitoring template,
//! naming the host, installing the agent, filling interfaces and template
//! macros, and saving the result. This crate owns all of that logic and
//! leaves drawing and HTTP to the embedder:
//!
//! ```text
//! InitialData → Wizard::open → render() → RenderedStep ─┐
//!                     ▲                                  │ FormView
//!                     └── input()/blur()/next().await ◄──┘
//! ```
//!
//! The state lives in a [`store::ReactiveStore`], validated by a
//! [`validate::ValidationEngine`] whose rules are declared per step in a
//! [`rules::RuleBook`] (in code or from YAML). Side effects go through the
//! async [`api::WizardBackend`] trait.
//!
//! # Quick Start
//!
//! ```rust
//! use host_wizard::paths::{input_name_to_path, path_to_input_name};
//! use host_wizard::store::ReactiveStore;
//! use serde_json::json;
//!
//! assert_eq!(input_name_to_path("macros[0][value]"), "macros.0.value");
//! assert_eq!(path_to_input_name("macros.0.value"), "macros[0][value]");
//!
//! let mut store = ReactiveStore::default();
//! assert!(store.set("host", json!("  web01 ")));
//! assert_eq!(store.get_str("host"), "web01");
//! assert!(!store.set("host", json!("web01")));
//! ```
//!
//! # Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cel-eval` | yes     | CEL expressions for conditional required-ness via the [`cel`] crate. Enables [`validate::DefaultConditionEvaluator`]. |

pub mod api;
pub mod binder;
pub mod config;
pub mod enums;
pub mod error;
pub mod macros;
pub mod paths;
pub mod psk;
pub mod render;
pub mod rules;
pub mod sequencer;
pub mod store;
pub mod types;
pub mod validate;
pub mod wizard;

pub use error::*;
pub use types::*;

pub use api::WizardBackend;
pub use config::{InitialData, WizardOptions};
pub use enums::Step;
pub use rules::parse_rule_book;
pub use wizard::{CancelOutcome, CloseHandle, Transition, Wizard};

/// Built-in rules extended by the rules of a YAML rule book.
///
/// Paths declared in `yaml` replace built-in declarations of the same step.
///
/// # Errors
///
/// Returns [`WizardError::Rules`] when the YAML document is malformed.
pub fn load_rules(yaml: &str, options: &WizardOptions) -> Result<rules::RuleBook, WizardError> {
    let custom = parse_rule_book(yaml)?;
    let mut book = wizard::default_rule_book(options)?;
    book.extend(custom);
    Ok(book)
}
